//! Product publishing and discovery endpoints.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use gardenswap_catalog::{DiscoveryFilter, Listing, SortOrder, Viewer};
use gardenswap_database::{
    CreateProductRequest, Product, ProductCategory, TransactionKind, UpdateProductRequest,
};
use gardenswap_geo::Coordinates;

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(discover).post(create_product))
        .route(
            "/api/products/:id",
            get(get_product).patch(update_product).delete(delete_product),
        )
        .route("/api/users/:id/products", get(products_of_user))
}

/// Discovery query parameters. List-valued parameters arrive
/// comma-separated, e.g. `categories=herbs,seeds&kinds=exchange,free`.
#[derive(Debug, Default, Deserialize)]
struct DiscoveryQuery {
    categories: Option<String>,
    search: Option<String>,
    max_distance_km: Option<f64>,
    kinds: Option<String>,
    include_own: Option<bool>,
    sort: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListingResponse {
    product: ProductResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    producer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    producer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    distance_km: Option<f64>,
}

#[derive(Debug, Serialize)]
struct ProductResponse {
    id: String,
    name: String,
    description: String,
    category: ProductCategory,
    image_urls: Vec<String>,
    for_exchange: bool,
    for_sale: bool,
    is_free: bool,
    created_at: String,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.public_id,
            name: product.name,
            description: product.description,
            category: product.category,
            image_urls: product.image_urls,
            for_exchange: product.listing.for_exchange,
            for_sale: product.listing.for_sale,
            is_free: product.listing.is_free,
            created_at: product.created_at,
        }
    }
}

impl From<Listing> for ListingResponse {
    fn from(listing: Listing) -> Self {
        Self {
            producer_id: listing.producer_public_id,
            producer_name: listing.producer_name,
            distance_km: listing.distance_km,
            product: listing.product.into(),
        }
    }
}

impl DiscoveryQuery {
    fn into_filter(self, default_max_distance_km: f64) -> Result<DiscoveryFilter, ApiError> {
        let categories = self
            .categories
            .as_deref()
            .map(parse_csv::<ProductCategory>)
            .unwrap_or_default();

        let transaction_kinds = match self.kinds.as_deref() {
            Some(raw) => parse_kinds(raw)?,
            None => Vec::new(),
        };

        let sort = match self.sort.as_deref() {
            None | Some("newest") => SortOrder::Newest,
            Some("oldest") => SortOrder::Oldest,
            Some("distance") => SortOrder::Distance,
            Some(other) => {
                return Err(ApiError::bad_request(format!("unknown sort order: {other}")))
            }
        };

        Ok(DiscoveryFilter {
            categories,
            search: self.search,
            max_distance_km: Some(self.max_distance_km.unwrap_or(default_max_distance_km)),
            transaction_kinds,
            include_own: self.include_own.unwrap_or(false),
            sort,
        })
    }
}

fn parse_csv<T: for<'a> From<&'a str>>(raw: &str) -> Vec<T> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(T::from)
        .collect()
}

fn parse_kinds(raw: &str) -> Result<Vec<TransactionKind>, ApiError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match part {
            "exchange" => Ok(TransactionKind::Exchange),
            "sale" => Ok(TransactionKind::Sale),
            "free" => Ok(TransactionKind::Free),
            other => Err(ApiError::bad_request(format!(
                "unknown transaction kind: {other}"
            ))),
        })
        .collect()
}

async fn discover(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DiscoveryQuery>,
) -> Result<Json<Vec<ListingResponse>>, ApiError> {
    let user = state.authenticate(&headers).await?;
    let profile = state.profiles.profile(user.id).await?;

    let viewer = Viewer {
        user_id: user.id,
        location: profile
            .location
            .as_ref()
            .map(|location| Coordinates::new(location.latitude, location.longitude)),
    };
    let filter = query.into_filter(state.discovery_defaults.max_distance_km)?;

    let listings = state.discovery.search(viewer, &filter).await?;
    Ok(Json(listings.into_iter().map(Into::into).collect()))
}

async fn create_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let user = state.authenticate(&headers).await?;
    let product = state.products.publish(user.id, payload).await?;
    Ok(Json(product.into()))
}

async fn get_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(public_id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    state.authenticate(&headers).await?;
    let product = state.products.get(&public_id).await?;
    Ok(Json(product.into()))
}

async fn update_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(public_id): Path<String>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    let user = state.authenticate(&headers).await?;
    let product = state.products.update(user.id, &public_id, payload).await?;
    Ok(Json(product.into()))
}

async fn delete_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(public_id): Path<String>,
) -> Result<(), ApiError> {
    let user = state.authenticate(&headers).await?;
    state.products.remove(user.id, &public_id).await?;
    Ok(())
}

async fn products_of_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(public_id): Path<String>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    state.authenticate(&headers).await?;
    let producer = state.profiles.profile_by_public_id(&public_id).await?;
    let products = state.products.products_of(producer.id).await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_categories_parse_leniently() {
        let categories = parse_csv::<ProductCategory>("herbs, seeds,,");
        assert_eq!(categories, vec![ProductCategory::Herbs, ProductCategory::Seeds]);
    }

    #[test]
    fn unknown_kind_is_a_bad_request() {
        assert!(parse_kinds("exchange,free").is_ok());
        assert!(parse_kinds("exchange,barter").is_err());
    }

    #[test]
    fn query_defaults_to_the_configured_radius() {
        let filter = DiscoveryQuery::default().into_filter(100.0).unwrap();
        assert_eq!(filter.max_distance_km, Some(100.0));
        assert!(filter.categories.is_empty());
        assert_eq!(filter.sort, SortOrder::Newest);
        assert!(!filter.include_own);
    }
}
