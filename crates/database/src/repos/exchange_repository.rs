//! Exchange repository.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::entities::exchange::{
    Exchange, ExchangeOffer, ExchangeParty, ExchangeReview, ExchangeStatus,
};
use crate::types::{new_public_id, now_rfc3339, ExchangeError, ExchangeResult};

const EXCHANGE_COLUMNS: &str = "id, public_id, product_id, requester_id, owner_id, chat_id, \
     status, offer, requester_review, owner_review, created_at, updated_at";

/// Repository for exchange rows.
#[derive(Clone)]
pub struct ExchangeRepository {
    pool: SqlitePool,
}

impl ExchangeRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        product_id: i64,
        requester_id: i64,
        owner_id: i64,
        offer: &ExchangeOffer,
    ) -> ExchangeResult<Exchange> {
        let now = now_rfc3339();
        let public_id = new_public_id();
        let offer_json =
            serde_json::to_string(offer).map_err(|e| ExchangeError::DatabaseError(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO exchanges (public_id, product_id, requester_id, owner_id, offer, \
             created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(product_id)
        .bind(requester_id)
        .bind(owner_id)
        .bind(&offer_json)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let exchange_id = result.last_insert_rowid();
        self.find_by_id(exchange_id).await?.ok_or_else(|| {
            ExchangeError::DatabaseError("failed to read back created exchange".to_string())
        })
    }

    pub async fn find_by_id(&self, id: i64) -> ExchangeResult<Option<Exchange>> {
        let row = sqlx::query(&format!(
            "SELECT {EXCHANGE_COLUMNS} FROM exchanges WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_exchange).transpose()
    }

    pub async fn find_by_public_id(&self, public_id: &str) -> ExchangeResult<Option<Exchange>> {
        let row = sqlx::query(&format!(
            "SELECT {EXCHANGE_COLUMNS} FROM exchanges WHERE public_id = ?"
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_exchange).transpose()
    }

    /// Exchanges the user participates in, newest first.
    pub async fn find_for_user(&self, user_id: i64) -> ExchangeResult<Vec<Exchange>> {
        let rows = sqlx::query(&format!(
            "SELECT {EXCHANGE_COLUMNS} FROM exchanges \
             WHERE requester_id = ? OR owner_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_exchange).collect()
    }

    /// An open (pending or accepted) exchange by this requester for this
    /// product, used to block duplicate requests.
    pub async fn find_open_for_product_and_requester(
        &self,
        product_id: i64,
        requester_id: i64,
    ) -> ExchangeResult<Option<Exchange>> {
        let row = sqlx::query(&format!(
            "SELECT {EXCHANGE_COLUMNS} FROM exchanges \
             WHERE product_id = ? AND requester_id = ? AND status IN ('pending', 'accepted') \
             LIMIT 1"
        ))
        .bind(product_id)
        .bind(requester_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_exchange).transpose()
    }

    pub async fn set_chat(&self, exchange_id: i64, chat_id: i64) -> ExchangeResult<()> {
        sqlx::query("UPDATE exchanges SET chat_id = ?, updated_at = ? WHERE id = ?")
            .bind(chat_id)
            .bind(now_rfc3339())
            .bind(exchange_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_status(
        &self,
        exchange_id: i64,
        status: ExchangeStatus,
    ) -> ExchangeResult<Exchange> {
        sqlx::query("UPDATE exchanges SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(now_rfc3339())
            .bind(exchange_id)
            .execute(&self.pool)
            .await?;

        self.find_by_id(exchange_id)
            .await?
            .ok_or(ExchangeError::ExchangeNotFound)
    }

    /// Store one party's review on the exchange row.
    pub async fn set_review(
        &self,
        exchange_id: i64,
        party: ExchangeParty,
        review: &ExchangeReview,
    ) -> ExchangeResult<Exchange> {
        let column = match party {
            ExchangeParty::Requester => "requester_review",
            ExchangeParty::Owner => "owner_review",
        };
        let review_json =
            serde_json::to_string(review).map_err(|e| ExchangeError::DatabaseError(e.to_string()))?;

        sqlx::query(&format!(
            "UPDATE exchanges SET {column} = ?, updated_at = ? WHERE id = ?"
        ))
        .bind(&review_json)
        .bind(now_rfc3339())
        .bind(exchange_id)
        .execute(&self.pool)
        .await?;

        self.find_by_id(exchange_id)
            .await?
            .ok_or(ExchangeError::ExchangeNotFound)
    }

    /// Reject every open exchange a departing user is involved in. Returns
    /// the number of affected rows.
    pub async fn reject_open_for_user(&self, user_id: i64) -> ExchangeResult<u64> {
        let result = sqlx::query(
            "UPDATE exchanges SET status = 'rejected', updated_at = ? \
             WHERE (requester_id = ? OR owner_id = ?) AND status IN ('pending', 'accepted')",
        )
        .bind(now_rfc3339())
        .bind(user_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

fn map_exchange(row: &SqliteRow) -> ExchangeResult<Exchange> {
    let get_err = |e: sqlx::Error| ExchangeError::DatabaseError(e.to_string());

    let offer_json: String = row.try_get("offer").map_err(get_err)?;
    let offer: ExchangeOffer = serde_json::from_str(&offer_json)
        .map_err(|e| ExchangeError::DatabaseError(format!("corrupt offer payload: {e}")))?;

    let requester_review = parse_review(row.try_get("requester_review").map_err(get_err)?)?;
    let owner_review = parse_review(row.try_get("owner_review").map_err(get_err)?)?;

    Ok(Exchange {
        id: row.try_get("id").map_err(get_err)?,
        public_id: row.try_get("public_id").map_err(get_err)?,
        product_id: row.try_get("product_id").map_err(get_err)?,
        requester_id: row.try_get("requester_id").map_err(get_err)?,
        owner_id: row.try_get("owner_id").map_err(get_err)?,
        chat_id: row.try_get("chat_id").map_err(get_err)?,
        status: ExchangeStatus::from(
            row.try_get::<String, _>("status").map_err(get_err)?.as_str(),
        ),
        offer,
        requester_review,
        owner_review,
        created_at: row.try_get("created_at").map_err(get_err)?,
        updated_at: row.try_get("updated_at").map_err(get_err)?,
    })
}

fn parse_review(json: Option<String>) -> ExchangeResult<Option<ExchangeReview>> {
    json.map(|value| {
        serde_json::from_str(&value)
            .map_err(|e| ExchangeError::DatabaseError(format!("corrupt review payload: {e}")))
    })
    .transpose()
}
