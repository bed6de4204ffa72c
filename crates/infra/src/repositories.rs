//! One handle per collection, shared by every request.

use std::sync::Arc;

use sqlx::PgPool;

use billforge_core::Document;
use billforge_inventory::InventoryItem;
use billforge_invoicing::Invoice;
use billforge_parties::Party;
use billforge_purchasing::{Purchase, PurchaseReturn};
use billforge_sales::{Sale, SalesReturn};

use crate::document_store::{DocumentStore, InMemoryDocumentStore, PostgresDocumentStore};
use crate::users::{InMemoryUserDirectory, PostgresUserDirectory, UserDirectory};

pub type Store<D> = Arc<dyn DocumentStore<D>>;

#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserDirectory>,
    pub parties: Store<Party>,
    pub items: Store<InventoryItem>,
    pub invoices: Store<Invoice>,
    pub sales: Store<Sale>,
    pub sales_returns: Store<SalesReturn>,
    pub purchases: Store<Purchase>,
    pub purchase_returns: Store<PurchaseReturn>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        fn store<D: Document>() -> Store<D> {
            Arc::new(InMemoryDocumentStore::<D>::new())
        }
        Self {
            users: Arc::new(InMemoryUserDirectory::new()),
            parties: store(),
            items: store(),
            invoices: store(),
            sales: store(),
            sales_returns: store(),
            purchases: store(),
            purchase_returns: store(),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        fn store<D: Document>(pool: &PgPool) -> Store<D> {
            Arc::new(PostgresDocumentStore::<D>::new(pool.clone()))
        }
        Self {
            users: Arc::new(PostgresUserDirectory::new(pool.clone())),
            parties: store(&pool),
            items: store(&pool),
            invoices: store(&pool),
            sales: store(&pool),
            sales_returns: store(&pool),
            purchases: store(&pool),
            purchase_returns: store(&pool),
        }
    }
}
