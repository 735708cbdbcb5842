use axum::Router;
use axum::routing::post;

use crate::state::AppState;

pub mod addresses;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod payments;
pub mod products;
pub mod wishlist;

// Build the API router without binding state; it is provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/users", auth::router())
        .nest("/products", products::router())
        .merge(catalog::router())
        .nest("/cart", cart::router())
        .route("/checkout", post(orders::checkout))
        .nest("/orders", orders::router())
        .nest("/payments", payments::router())
        .nest("/addresses", addresses::router())
        .nest("/wishlist", wishlist::router())
}
