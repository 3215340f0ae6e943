//! Exchange negotiation workflow.

use sqlx::SqlitePool;
use tracing::info;

use gardenswap_database::{
    ChatRepository, CreateNotificationRequest, Exchange, ExchangeError, ExchangeOffer,
    ExchangeParty, ExchangeRepository, ExchangeResult, ExchangeReview, ExchangeStatus,
    NotificationKind, ProductRepository, UserRepository,
};
use gardenswap_users::NotificationService;

/// Activity points awarded to each party when an exchange completes.
const COMPLETION_POINTS: i64 = 10;

/// Service driving an exchange from request to completion and reviews.
pub struct ExchangeService {
    exchanges: ExchangeRepository,
    products: ProductRepository,
    chats: ChatRepository,
    users: UserRepository,
    notifications: NotificationService,
}

impl ExchangeService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            exchanges: ExchangeRepository::new(pool.clone()),
            products: ProductRepository::new(pool.clone()),
            chats: ChatRepository::new(pool.clone()),
            users: UserRepository::new(pool.clone()),
            notifications: NotificationService::new(pool),
        }
    }

    /// Open an exchange on another user's product. Also opens the chat
    /// between the two parties and notifies the owner.
    pub async fn request(
        &self,
        requester_id: i64,
        product_public_id: &str,
        offer: ExchangeOffer,
    ) -> ExchangeResult<Exchange> {
        if let Err(reason) = offer.validate() {
            return Err(ExchangeError::ValidationFailed(reason));
        }

        let product = self
            .products
            .find_by_public_id(product_public_id)
            .await
            .map_err(|e| ExchangeError::DatabaseError(e.to_string()))?
            .filter(|product| product.is_active())
            .ok_or(ExchangeError::ProductNotFound)?;

        if product.user_id == requester_id {
            return Err(ExchangeError::OwnProduct);
        }

        if self
            .exchanges
            .find_open_for_product_and_requester(product.id, requester_id)
            .await?
            .is_some()
        {
            return Err(ExchangeError::AlreadyRequested);
        }

        let exchange = self
            .exchanges
            .create(product.id, requester_id, product.user_id, &offer)
            .await?;

        let chat = self
            .chats
            .create(&[requester_id, product.user_id], Some(exchange.id))
            .await
            .map_err(|e| ExchangeError::DatabaseError(e.to_string()))?;
        self.exchanges.set_chat(exchange.id, chat.id).await?;

        info!(
            exchange = %exchange.public_id,
            product = %product.public_id,
            requester = requester_id,
            "exchange requested"
        );

        self.notifications
            .dispatch(CreateNotificationRequest::about(
                product.user_id,
                requester_id,
                NotificationKind::ExchangeRequested,
                exchange.public_id.clone(),
                "exchange",
            ))
            .await;

        self.exchanges
            .find_by_id(exchange.id)
            .await?
            .ok_or(ExchangeError::ExchangeNotFound)
    }

    /// Owner accepts a pending exchange.
    pub async fn accept(&self, owner_id: i64, public_id: &str) -> ExchangeResult<Exchange> {
        self.transition_as_owner(owner_id, public_id, ExchangeStatus::Accepted)
            .await
    }

    /// Owner rejects a pending exchange.
    pub async fn reject(&self, owner_id: i64, public_id: &str) -> ExchangeResult<Exchange> {
        self.transition_as_owner(owner_id, public_id, ExchangeStatus::Rejected)
            .await
    }

    /// Either party marks an accepted exchange completed. Both sides receive
    /// activity points.
    pub async fn complete(&self, user_id: i64, public_id: &str) -> ExchangeResult<Exchange> {
        let exchange = self.get(public_id).await?;
        let counterparty = exchange
            .counterparty_of(user_id)
            .ok_or(ExchangeError::NotAParty)?;

        if !exchange.status.can_transition_to(ExchangeStatus::Completed) {
            return Err(ExchangeError::InvalidTransition {
                from: exchange.status.as_str().to_string(),
                to: ExchangeStatus::Completed.as_str().to_string(),
            });
        }

        let exchange = self
            .exchanges
            .set_status(exchange.id, ExchangeStatus::Completed)
            .await?;

        for party in [user_id, counterparty] {
            // Points are part of the completion, not best-effort.
            self.users
                .add_points(party, COMPLETION_POINTS)
                .await
                .map_err(|e| ExchangeError::DatabaseError(e.to_string()))?;
        }

        info!(exchange = %exchange.public_id, "exchange completed");

        self.notifications
            .dispatch(CreateNotificationRequest::about(
                counterparty,
                user_id,
                NotificationKind::ExchangeCompleted,
                exchange.public_id.clone(),
                "exchange",
            ))
            .await;

        Ok(exchange)
    }

    /// Leave a review about the counterparty of a completed exchange. The
    /// rating folds into the counterparty's reputation aggregate.
    pub async fn review(
        &self,
        user_id: i64,
        public_id: &str,
        rating: u8,
        comment: Option<String>,
    ) -> ExchangeResult<Exchange> {
        let review = ExchangeReview::new(rating, comment);
        if let Err(reason) = review.validate() {
            return Err(ExchangeError::ValidationFailed(reason));
        }

        let exchange = self.get(public_id).await?;
        let party = exchange.party_of(user_id).ok_or(ExchangeError::NotAParty)?;

        if exchange.status != ExchangeStatus::Completed {
            return Err(ExchangeError::InvalidTransition {
                from: exchange.status.as_str().to_string(),
                to: "reviewed".to_string(),
            });
        }
        if exchange.review_of(party).is_some() {
            return Err(ExchangeError::AlreadyReviewed);
        }

        let counterparty = exchange
            .counterparty_of(user_id)
            .ok_or(ExchangeError::NotAParty)?;

        let exchange = self.exchanges.set_review(exchange.id, party, &review).await?;

        self.users
            .apply_review(counterparty, rating)
            .await
            .map_err(|e| ExchangeError::DatabaseError(e.to_string()))?;

        self.notifications
            .dispatch(CreateNotificationRequest::about(
                counterparty,
                user_id,
                NotificationKind::ReviewReceived,
                exchange.public_id.clone(),
                "exchange",
            ))
            .await;

        Ok(exchange)
    }

    pub async fn get(&self, public_id: &str) -> ExchangeResult<Exchange> {
        self.exchanges
            .find_by_public_id(public_id)
            .await?
            .ok_or(ExchangeError::ExchangeNotFound)
    }

    /// Exchanges the user is a party to, newest first.
    pub async fn exchanges_for(&self, user_id: i64) -> ExchangeResult<Vec<Exchange>> {
        self.exchanges.find_for_user(user_id).await
    }

    async fn transition_as_owner(
        &self,
        owner_id: i64,
        public_id: &str,
        next: ExchangeStatus,
    ) -> ExchangeResult<Exchange> {
        let exchange = self.get(public_id).await?;

        match exchange.party_of(owner_id) {
            Some(ExchangeParty::Owner) => {}
            Some(ExchangeParty::Requester) => return Err(ExchangeError::NotOwner),
            None => return Err(ExchangeError::NotAParty),
        }

        if !exchange.status.can_transition_to(next) {
            return Err(ExchangeError::InvalidTransition {
                from: exchange.status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }

        let exchange = self.exchanges.set_status(exchange.id, next).await?;

        info!(exchange = %exchange.public_id, status = next.as_str(), "exchange transitioned");

        let kind = match next {
            ExchangeStatus::Accepted => NotificationKind::ExchangeAccepted,
            _ => NotificationKind::ExchangeRejected,
        };
        self.notifications
            .dispatch(CreateNotificationRequest::about(
                exchange.requester_id,
                owner_id,
                kind,
                exchange.public_id.clone(),
                "exchange",
            ))
            .await;

        Ok(exchange)
    }
}
