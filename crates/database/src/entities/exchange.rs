use serde::{Deserialize, Serialize};

use crate::types::now_rfc3339;

/// A negotiation between two users over a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exchange {
    /// Database primary key
    pub id: i64,
    /// Publicly accessible identifier
    pub public_id: String,
    pub product_id: i64,
    pub requester_id: i64,
    pub owner_id: i64,
    /// Chat opened for this negotiation
    pub chat_id: Option<i64>,
    pub status: ExchangeStatus,
    pub offer: ExchangeOffer,
    /// Review left by the requester about the owner
    pub requester_review: Option<ExchangeReview>,
    /// Review left by the owner about the requester
    pub owner_review: Option<ExchangeReview>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExchangeStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
}

impl ExchangeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeStatus::Pending => "pending",
            ExchangeStatus::Accepted => "accepted",
            ExchangeStatus::Rejected => "rejected",
            ExchangeStatus::Completed => "completed",
        }
    }

    /// Legal status transitions: pending -> accepted|rejected,
    /// accepted -> completed.
    pub fn can_transition_to(&self, next: ExchangeStatus) -> bool {
        matches!(
            (self, next),
            (ExchangeStatus::Pending, ExchangeStatus::Accepted)
                | (ExchangeStatus::Pending, ExchangeStatus::Rejected)
                | (ExchangeStatus::Accepted, ExchangeStatus::Completed)
        )
    }

    pub fn is_open(&self) -> bool {
        matches!(self, ExchangeStatus::Pending | ExchangeStatus::Accepted)
    }
}

impl From<&str> for ExchangeStatus {
    fn from(s: &str) -> Self {
        match s {
            "accepted" => ExchangeStatus::Accepted,
            "rejected" => ExchangeStatus::Rejected,
            "completed" => ExchangeStatus::Completed,
            _ => ExchangeStatus::Pending,
        }
    }
}

/// What the requester puts on the table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExchangeOffer {
    /// Products the requester offers in return (may be empty for free items)
    #[serde(default)]
    pub offered_product_ids: Vec<i64>,
    pub message: Option<String>,
}

impl ExchangeOffer {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref message) = self.message {
            if message.len() > 1000 {
                return Err("offer message too long (max 1000 characters)".to_string());
            }
        }
        if self.offered_product_ids.len() > 10 {
            return Err("too many offered products (max 10)".to_string());
        }
        Ok(())
    }
}

/// A review one party leaves about the other after completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeReview {
    /// Rating from 1 to 5
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: String,
}

impl ExchangeReview {
    pub fn new(rating: u8, comment: Option<String>) -> Self {
        Self {
            rating,
            comment,
            created_at: now_rfc3339(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(1..=5).contains(&self.rating) {
            return Err("rating must be between 1 and 5".to_string());
        }
        if let Some(ref comment) = self.comment {
            if comment.len() > 500 {
                return Err("review comment too long (max 500 characters)".to_string());
            }
        }
        Ok(())
    }
}

/// The side of an exchange a user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeParty {
    Requester,
    Owner,
}

impl Exchange {
    /// Which side of the exchange `user_id` is on, if any.
    pub fn party_of(&self, user_id: i64) -> Option<ExchangeParty> {
        if user_id == self.requester_id {
            Some(ExchangeParty::Requester)
        } else if user_id == self.owner_id {
            Some(ExchangeParty::Owner)
        } else {
            None
        }
    }

    /// The other side's user id.
    pub fn counterparty_of(&self, user_id: i64) -> Option<i64> {
        match self.party_of(user_id)? {
            ExchangeParty::Requester => Some(self.owner_id),
            ExchangeParty::Owner => Some(self.requester_id),
        }
    }

    pub fn review_of(&self, party: ExchangeParty) -> Option<&ExchangeReview> {
        match party {
            ExchangeParty::Requester => self.requester_review.as_ref(),
            ExchangeParty::Owner => self.owner_review.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_exchange() -> Exchange {
        let now = now_rfc3339();
        Exchange {
            id: 1,
            public_id: "x1".to_string(),
            product_id: 10,
            requester_id: 2,
            owner_id: 3,
            chat_id: None,
            status: ExchangeStatus::Pending,
            offer: ExchangeOffer::default(),
            requester_review: None,
            owner_review: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[test]
    fn status_transitions() {
        use ExchangeStatus::*;

        assert!(Pending.can_transition_to(Accepted));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Accepted.can_transition_to(Completed));

        assert!(!Rejected.can_transition_to(Accepted));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Completed));
    }

    #[test]
    fn party_resolution() {
        let exchange = sample_exchange();

        assert_eq!(exchange.party_of(2), Some(ExchangeParty::Requester));
        assert_eq!(exchange.party_of(3), Some(ExchangeParty::Owner));
        assert_eq!(exchange.party_of(99), None);

        assert_eq!(exchange.counterparty_of(2), Some(3));
        assert_eq!(exchange.counterparty_of(3), Some(2));
        assert_eq!(exchange.counterparty_of(99), None);
    }

    #[test]
    fn review_validation() {
        assert!(ExchangeReview::new(5, None).validate().is_ok());
        assert!(ExchangeReview::new(0, None).validate().is_err());
        assert!(ExchangeReview::new(6, None).validate().is_err());

        let long_comment = "x".repeat(501);
        assert!(ExchangeReview::new(3, Some(long_comment)).validate().is_err());
    }

    #[test]
    fn offer_round_trips_through_json() {
        let offer = ExchangeOffer {
            offered_product_ids: vec![4, 8],
            message: Some("my basil for your tomatoes?".to_string()),
        };

        let json = serde_json::to_string(&offer).unwrap();
        let back: ExchangeOffer = serde_json::from_str(&json).unwrap();
        assert_eq!(offer, back);
    }
}
