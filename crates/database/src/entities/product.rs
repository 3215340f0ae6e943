use serde::{Deserialize, Serialize};

/// A published garden product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Database primary key
    pub id: i64,
    /// Publicly accessible identifier
    pub public_id: String,
    pub name: String,
    pub description: String,
    pub category: ProductCategory,
    pub image_urls: Vec<String>,
    /// How the owner is willing to hand the product over
    pub listing: ListingFlags,
    /// Owning user (database id)
    pub user_id: i64,
    pub status: ProductStatus,
    pub created_at: String,
    pub updated_at: String,
}

/// Product category used for store-side feed filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductCategory {
    Vegetables,
    Fruits,
    Herbs,
    Seeds,
    Seedlings,
    Flowers,
    Tools,
    Other,
}

impl ProductCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::Vegetables => "vegetables",
            ProductCategory::Fruits => "fruits",
            ProductCategory::Herbs => "herbs",
            ProductCategory::Seeds => "seeds",
            ProductCategory::Seedlings => "seedlings",
            ProductCategory::Flowers => "flowers",
            ProductCategory::Tools => "tools",
            ProductCategory::Other => "other",
        }
    }

    pub const ALL: [ProductCategory; 8] = [
        ProductCategory::Vegetables,
        ProductCategory::Fruits,
        ProductCategory::Herbs,
        ProductCategory::Seeds,
        ProductCategory::Seedlings,
        ProductCategory::Flowers,
        ProductCategory::Tools,
        ProductCategory::Other,
    ];
}

impl From<&str> for ProductCategory {
    fn from(s: &str) -> Self {
        match s {
            "vegetables" => ProductCategory::Vegetables,
            "fruits" => ProductCategory::Fruits,
            "herbs" => ProductCategory::Herbs,
            "seeds" => ProductCategory::Seeds,
            "seedlings" => ProductCategory::Seedlings,
            "flowers" => ProductCategory::Flowers,
            "tools" => ProductCategory::Tools,
            _ => ProductCategory::Other,
        }
    }
}

/// Transaction flags on a listing. A product may carry several at once.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ListingFlags {
    pub for_exchange: bool,
    pub for_sale: bool,
    pub is_free: bool,
}

impl ListingFlags {
    pub fn any(&self) -> bool {
        self.for_exchange || self.for_sale || self.is_free
    }

    /// Whether the listing matches at least one of the requested kinds.
    pub fn matches_any(&self, kinds: &[TransactionKind]) -> bool {
        kinds.iter().any(|kind| match kind {
            TransactionKind::Exchange => self.for_exchange,
            TransactionKind::Sale => self.for_sale,
            TransactionKind::Free => self.is_free,
        })
    }
}

/// One way a product can change hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Exchange,
    Sale,
    Free,
}

/// Product lifecycle status; deletion is soft.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Deleted,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Active => "active",
            ProductStatus::Deleted => "deleted",
        }
    }
}

impl From<&str> for ProductStatus {
    fn from(s: &str) -> Self {
        match s {
            "deleted" => ProductStatus::Deleted,
            _ => ProductStatus::Active,
        }
    }
}

/// Request to publish a new product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub category: ProductCategory,
    #[serde(default)]
    pub image_urls: Vec<String>,
    pub listing: ListingFlags,
}

impl CreateProductRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("product name cannot be empty".to_string());
        }
        if self.name.len() > 120 {
            return Err("product name too long (max 120 characters)".to_string());
        }
        if self.description.len() > 2000 {
            return Err("description too long (max 2000 characters)".to_string());
        }
        if !self.listing.any() {
            return Err("a product needs at least one transaction type".to_string());
        }
        if self.image_urls.len() > 6 {
            return Err("too many images (max 6)".to_string());
        }
        Ok(())
    }
}

/// Partial product update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<ProductCategory>,
    pub image_urls: Option<Vec<String>>,
    pub listing: Option<ListingFlags>,
}

impl UpdateProductRequest {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref name) = self.name {
            if name.trim().is_empty() {
                return Err("product name cannot be empty".to_string());
            }
            if name.len() > 120 {
                return Err("product name too long (max 120 characters)".to_string());
            }
        }
        if let Some(ref description) = self.description {
            if description.len() > 2000 {
                return Err("description too long (max 2000 characters)".to_string());
            }
        }
        if let Some(listing) = self.listing {
            if !listing.any() {
                return Err("a product needs at least one transaction type".to_string());
            }
        }
        if let Some(ref image_urls) = self.image_urls {
            if image_urls.len() > 6 {
                return Err("too many images (max 6)".to_string());
            }
        }
        Ok(())
    }
}

impl Product {
    pub fn is_active(&self) -> bool {
        matches!(self.status, ProductStatus::Active)
    }

    /// Case-insensitive match against name and description.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.name.to_lowercase().contains(&term) || self.description.to_lowercase().contains(&term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> CreateProductRequest {
        CreateProductRequest {
            name: "Cherry tomatoes".to_string(),
            description: "Sweet, home grown".to_string(),
            category: ProductCategory::Vegetables,
            image_urls: vec!["https://example.com/tomatoes.jpg".to_string()],
            listing: ListingFlags {
                for_exchange: true,
                for_sale: false,
                is_free: false,
            },
        }
    }

    #[test]
    fn create_request_validation() {
        assert!(valid_request().validate().is_ok());

        let mut no_name = valid_request();
        no_name.name = "  ".to_string();
        assert!(no_name.validate().is_err());

        let mut no_kind = valid_request();
        no_kind.listing = ListingFlags::default();
        assert!(no_kind.validate().is_err());
    }

    #[test]
    fn category_round_trip() {
        for category in ProductCategory::ALL {
            assert_eq!(ProductCategory::from(category.as_str()), category);
        }
        assert_eq!(ProductCategory::from("mystery"), ProductCategory::Other);
    }

    #[test]
    fn listing_matches_any() {
        let listing = ListingFlags {
            for_exchange: true,
            for_sale: false,
            is_free: true,
        };

        assert!(listing.matches_any(&[TransactionKind::Exchange]));
        assert!(listing.matches_any(&[TransactionKind::Sale, TransactionKind::Free]));
        assert!(!listing.matches_any(&[TransactionKind::Sale]));
        assert!(!listing.matches_any(&[]));
    }

    #[test]
    fn search_is_case_insensitive() {
        let product = Product {
            id: 1,
            public_id: "p1".to_string(),
            name: "Basil seedlings".to_string(),
            description: "Genovese variety".to_string(),
            category: ProductCategory::Seedlings,
            image_urls: Vec::new(),
            listing: ListingFlags {
                for_exchange: true,
                ..Default::default()
            },
            user_id: 1,
            status: ProductStatus::Active,
            created_at: String::new(),
            updated_at: String::new(),
        };

        assert!(product.matches_search("BASIL"));
        assert!(product.matches_search("genovese"));
        assert!(!product.matches_search("mint"));
    }
}
