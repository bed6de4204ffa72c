use axum::{
    Router,
    routing::{get, post},
};

pub mod auth;
pub mod customers;
pub mod dashboard;
pub mod inventory;
pub mod invoices;
pub mod purchases;
pub mod sales;
pub mod system;
pub mod tax;

/// Endpoints reachable without a session.
pub fn public_router() -> Router {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
}

/// Router for all authenticated (owner-scoped) endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/auth/me", get(auth::me).put(auth::update_me))
        .nest("/customers", customers::router())
        .nest("/inventory", inventory::router())
        .nest("/invoices", invoices::router())
        .nest("/sales", sales::router())
        .nest("/purchases", purchases::router())
        .nest("/tax", tax::router())
        .route("/dashboard", get(dashboard::dashboard))
}
