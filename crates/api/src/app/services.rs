//! Shared request state and the storage helpers handlers build on.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use billforge_auth::{Hs256Jwt, User};
use billforge_core::{Document, DocumentId, UserId};
use billforge_infra::{Repositories, StoreError, repositories::Store};
use billforge_inventory::{InventoryItem, StockMovement, apply_movements, net};
use billforge_invoicing::Invoice;
use billforge_parties::{Party, PartyId, PartyKind};
use billforge_purchasing::{Purchase, PurchaseReturn};
use billforge_reports::Books;
use billforge_sales::{Sale, SalesReturn};

use crate::app::errors::ApiError;
use crate::context::UserContext;
use crate::middleware::SESSION_COOKIE;

const DEFAULT_TOKEN_TTL_HOURS: i64 = 168;

pub struct AppServices {
    pub repos: Repositories,
    pub jwt: Arc<Hs256Jwt>,
    pub cookie_secure: bool,
}

impl AppServices {
    pub fn new(repos: Repositories, jwt: Hs256Jwt, cookie_secure: bool) -> Self {
        Self {
            repos,
            jwt: Arc::new(jwt),
            cookie_secure,
        }
    }

    /// In-memory storage with the default token lifetime.
    pub fn in_memory(jwt_secret: &[u8]) -> Self {
        let jwt = Hs256Jwt::new(jwt_secret, chrono::Duration::hours(DEFAULT_TOKEN_TTL_HOURS));
        Self::new(Repositories::in_memory(), jwt, false)
    }

    pub fn session_cookie(&self, token: &str) -> String {
        self.cookie(token, self.jwt.ttl().num_seconds())
    }

    pub fn expired_session_cookie(&self) -> String {
        self.cookie("", 0)
    }

    fn cookie(&self, value: &str, max_age: i64) -> String {
        let mut cookie = format!("{SESSION_COOKIE}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age}");
        if self.cookie_secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// The caller's account. A valid token for a removed account is unauthorized.
    pub async fn account(&self, ctx: &UserContext) -> Result<User, ApiError> {
        self.repos
            .users
            .get(ctx.user_id())
            .await?
            .ok_or_else(|| ApiError::Unauthorized("account no longer exists".to_string()))
    }

    /// Load a party named on a form. Unknown ids and parties of the wrong kind
    /// are validation errors, not 404s: the resource being written exists.
    pub async fn referenced_party(
        &self,
        owner: UserId,
        id: Option<PartyId>,
        kind: PartyKind,
    ) -> Result<Option<Party>, ApiError> {
        let Some(id) = id else {
            return Ok(None);
        };
        match self.repos.parties.get(owner, id.document_id()).await? {
            Some(party) if party.kind() == kind => Ok(Some(party)),
            _ => Err(ApiError::validation(format!("unknown {} {id}", kind.as_str()))),
        }
    }

    /// Validate every movement, then write the affected items in one batch.
    pub async fn apply_stock(
        &self,
        owner: UserId,
        movements: &[StockMovement],
        now: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        if net(movements)?.is_empty() {
            return Ok(());
        }
        let items: HashMap<_, _> = self
            .repos
            .items
            .list(owner)
            .await?
            .into_iter()
            .map(|item| (item.id_typed(), item))
            .collect();
        let changed = apply_movements(&items, movements, now)?;
        if !changed.is_empty() {
            self.repos.items.update_all(changed).await?;
        }
        Ok(())
    }

    /// Apply stock movements, then run `write`. When the write fails the
    /// movements are reversed.
    pub async fn with_stock<T>(
        &self,
        owner: UserId,
        movements: &[StockMovement],
        now: DateTime<Utc>,
        write: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, ApiError> {
        self.apply_stock(owner, movements, now).await?;
        match write.await {
            Ok(value) => Ok(value),
            Err(err) => {
                let reverse: Vec<StockMovement> = movements
                    .iter()
                    .map(|m| StockMovement {
                        item_id: m.item_id,
                        delta: -m.delta,
                    })
                    .collect();
                if let Err(revert) = self.apply_stock(owner, &reverse, now).await {
                    tracing::error!(%owner, error = %revert, "failed to revert stock after a failed write");
                }
                Err(err.into())
            }
        }
    }

    /// Every document the reports aggregate over.
    pub async fn books(&self, owner: UserId) -> Result<LoadedBooks, ApiError> {
        let repos = &self.repos;
        let (invoices, sales, sales_returns, purchases, purchase_returns, items) = tokio::try_join!(
            repos.invoices.list(owner),
            repos.sales.list(owner),
            repos.sales_returns.list(owner),
            repos.purchases.list(owner),
            repos.purchase_returns.list(owner),
            repos.items.list(owner),
        )?;
        Ok(LoadedBooks {
            invoices,
            sales,
            sales_returns,
            purchases,
            purchase_returns,
            items,
        })
    }
}

/// Fetch an owner's document or fail with a 404 naming `what`.
pub async fn load<D: Document>(store: &Store<D>, owner: UserId, id: DocumentId, what: &str) -> Result<D, ApiError> {
    store
        .get(owner, id)
        .await?
        .ok_or_else(|| ApiError::not_found(what))
}

/// Delete an owner's document, failing with a 404 naming `what`.
pub async fn remove<D: Document>(store: &Store<D>, owner: UserId, id: DocumentId, what: &str) -> Result<(), ApiError> {
    store.delete(owner, id).await.map_err(|e| match e {
        StoreError::NotFound => ApiError::not_found(what),
        other => other.into(),
    })
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Owned documents behind a [`Books`] view.
#[derive(Debug, Default)]
pub struct LoadedBooks {
    pub invoices: Vec<Invoice>,
    pub sales: Vec<Sale>,
    pub sales_returns: Vec<SalesReturn>,
    pub purchases: Vec<Purchase>,
    pub purchase_returns: Vec<PurchaseReturn>,
    pub items: Vec<InventoryItem>,
}

impl LoadedBooks {
    pub fn books(&self) -> Books<'_> {
        Books {
            invoices: &self.invoices,
            sales: &self.sales,
            sales_returns: &self.sales_returns,
            purchases: &self.purchases,
            purchase_returns: &self.purchase_returns,
            items: &self.items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billforge_core::Money;
    use billforge_gst::LineItem;
    use billforge_inventory::{InventoryItemId, ItemInput, outbound};

    fn services() -> AppServices {
        AppServices::in_memory(b"test-secret")
    }

    async fn stocked(services: &AppServices, owner: UserId, quantity: i64) -> InventoryItem {
        let input = ItemInput {
            name: "Notebook".into(),
            sale_price: Some(Money::from_rupees(50)),
            quantity: Some(quantity),
            ..Default::default()
        };
        let item = InventoryItem::create(owner, InventoryItemId::generate(), &input, Utc::now()).unwrap();
        services.repos.items.insert(item).await.unwrap()
    }

    fn line(item: &InventoryItem, quantity: i64) -> LineItem {
        LineItem {
            description: item.name().into(),
            item_id: Some(item.document_id()),
            hsn: None,
            quantity,
            unit: None,
            unit_price: item.sale_price(),
            discount_percent: Default::default(),
            gst_rate: Default::default(),
        }
    }

    #[test]
    fn cookie_attributes() {
        let mut services = services();
        assert_eq!(
            services.session_cookie("abc"),
            "token=abc; HttpOnly; SameSite=Lax; Path=/; Max-Age=604800"
        );
        services.cookie_secure = true;
        assert!(services.expired_session_cookie().ends_with("Max-Age=0; Secure"));
    }

    #[tokio::test]
    async fn failed_write_reverts_stock() {
        let services = services();
        let owner = UserId::new();
        let item = stocked(&services, owner, 5).await;
        let moves = outbound(&[line(&item, 3)]);

        let result: Result<(), ApiError> = services
            .with_stock(owner, &moves, Utc::now(), async { Err(StoreError::Conflict("stale".into())) })
            .await;
        assert!(matches!(result, Err(ApiError::Conflict(_))));

        let stored = services.repos.items.require(owner, item.document_id()).await.unwrap();
        assert_eq!(stored.quantity(), 5);
    }

    #[tokio::test]
    async fn insufficient_stock_writes_nothing() {
        let services = services();
        let owner = UserId::new();
        let plenty = stocked(&services, owner, 10).await;
        let scarce = stocked(&services, owner, 1).await;
        let moves = outbound(&[line(&plenty, 4), line(&scarce, 2)]);

        let err = services.apply_stock(owner, &moves, Utc::now()).await.unwrap_err();
        assert!(matches!(err, ApiError::Invariant(_)));

        let stored = services.repos.items.require(owner, plenty.document_id()).await.unwrap();
        assert_eq!(stored.quantity(), 10);
    }

    #[tokio::test]
    async fn referenced_party_must_exist_with_the_right_kind() {
        let services = services();
        let owner = UserId::new();
        let err = services
            .referenced_party(owner, Some(PartyId::generate()), PartyKind::Customer)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(services.referenced_party(owner, None, PartyKind::Customer).await.unwrap().is_none());
    }
}
