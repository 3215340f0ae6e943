//! Exchange negotiation endpoints.

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use gardenswap_database::{Exchange, ExchangeOffer, ExchangeReview};

use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/exchanges", get(list_exchanges).post(request_exchange))
        .route("/api/exchanges/:id", get(get_exchange))
        .route("/api/exchanges/:id/accept", post(accept_exchange))
        .route("/api/exchanges/:id/reject", post(reject_exchange))
        .route("/api/exchanges/:id/complete", post(complete_exchange))
        .route("/api/exchanges/:id/review", post(review_exchange))
}

#[derive(Debug, Deserialize)]
struct RequestExchangeBody {
    product_id: String,
    #[serde(default)]
    offer: ExchangeOffer,
}

#[derive(Debug, Deserialize)]
struct ReviewBody {
    rating: u8,
    comment: Option<String>,
}

#[derive(Debug, Serialize)]
struct ExchangeResponse {
    id: String,
    status: String,
    product_id: i64,
    requester_id: i64,
    owner_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    chat_id: Option<i64>,
    offer: ExchangeOffer,
    #[serde(skip_serializing_if = "Option::is_none")]
    requester_review: Option<ExchangeReview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    owner_review: Option<ExchangeReview>,
    created_at: String,
}

impl From<Exchange> for ExchangeResponse {
    fn from(exchange: Exchange) -> Self {
        Self {
            id: exchange.public_id,
            status: exchange.status.as_str().to_string(),
            product_id: exchange.product_id,
            requester_id: exchange.requester_id,
            owner_id: exchange.owner_id,
            chat_id: exchange.chat_id,
            offer: exchange.offer,
            requester_review: exchange.requester_review,
            owner_review: exchange.owner_review,
            created_at: exchange.created_at,
        }
    }
}

async fn request_exchange(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RequestExchangeBody>,
) -> Result<Json<ExchangeResponse>, ApiError> {
    let user = state.authenticate(&headers).await?;
    let exchange = state
        .exchanges
        .request(user.id, &payload.product_id, payload.offer)
        .await?;
    Ok(Json(exchange.into()))
}

async fn list_exchanges(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ExchangeResponse>>, ApiError> {
    let user = state.authenticate(&headers).await?;
    let exchanges = state.exchanges.exchanges_for(user.id).await?;
    Ok(Json(exchanges.into_iter().map(Into::into).collect()))
}

async fn get_exchange(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(public_id): Path<String>,
) -> Result<Json<ExchangeResponse>, ApiError> {
    let user = state.authenticate(&headers).await?;
    let exchange = state.exchanges.get(&public_id).await?;
    if exchange.party_of(user.id).is_none() {
        return Err(gardenswap_database::ExchangeError::NotAParty.into());
    }
    Ok(Json(exchange.into()))
}

async fn accept_exchange(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(public_id): Path<String>,
) -> Result<Json<ExchangeResponse>, ApiError> {
    let user = state.authenticate(&headers).await?;
    let exchange = state.exchanges.accept(user.id, &public_id).await?;
    Ok(Json(exchange.into()))
}

async fn reject_exchange(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(public_id): Path<String>,
) -> Result<Json<ExchangeResponse>, ApiError> {
    let user = state.authenticate(&headers).await?;
    let exchange = state.exchanges.reject(user.id, &public_id).await?;
    Ok(Json(exchange.into()))
}

async fn complete_exchange(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(public_id): Path<String>,
) -> Result<Json<ExchangeResponse>, ApiError> {
    let user = state.authenticate(&headers).await?;
    let exchange = state.exchanges.complete(user.id, &public_id).await?;
    Ok(Json(exchange.into()))
}

async fn review_exchange(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(public_id): Path<String>,
    Json(payload): Json<ReviewBody>,
) -> Result<Json<ExchangeResponse>, ApiError> {
    let user = state.authenticate(&headers).await?;
    let exchange = state
        .exchanges
        .review(user.id, &public_id, payload.rating, payload.comment)
        .await?;
    Ok(Json(exchange.into()))
}
