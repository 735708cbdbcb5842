use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, CartView, UpdateCartItemRequest},
    error::AppResult,
    middleware::{auth::MaybeAuthUser, session::CartSession},
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(view_cart).post(add_to_cart))
        .route("/{item_id}", patch(update_item).delete(remove_item))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    params(
        ("x-cart-session" = Option<String>, Header, description = "Anonymous cart session id")
    ),
    responses(
        (status = 200, description = "Resolved cart for the caller", body = ApiResponse<CartView>)
    ),
    security(("bearer_auth" = []), ()),
    tag = "Cart"
)]
pub async fn view_cart(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    CartSession(session): CartSession,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::view_cart(&state, user.as_ref(), session.as_deref()).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart",
    request_body = AddToCartRequest,
    params(
        ("x-cart-session" = Option<String>, Header, description = "Anonymous cart session id")
    ),
    responses(
        (status = 200, description = "Item added, quantities merged on re-add", body = ApiResponse<CartView>),
        (status = 400, description = "Invalid quantity"),
        (status = 404, description = "Unknown product"),
    ),
    security(("bearer_auth" = []), ()),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    CartSession(session): CartSession,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::add_to_cart(&state, user.as_ref(), session.as_deref(), payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/cart/{item_id}",
    params(
        ("item_id" = Uuid, Path, description = "Cart item id"),
        ("x-cart-session" = Option<String>, Header, description = "Anonymous cart session id")
    ),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Quantity updated; zero or less removes the line", body = ApiResponse<CartView>),
        (status = 404, description = "Item not in the caller's cart"),
    ),
    security(("bearer_auth" = []), ()),
    tag = "Cart"
)]
pub async fn update_item(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    CartSession(session): CartSession,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<UpdateCartItemRequest>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp =
        cart_service::update_cart_item(&state, user.as_ref(), session.as_deref(), item_id, payload)
            .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart/{item_id}",
    params(
        ("item_id" = Uuid, Path, description = "Cart item id"),
        ("x-cart-session" = Option<String>, Header, description = "Anonymous cart session id")
    ),
    responses(
        (status = 200, description = "Item removed", body = ApiResponse<CartView>),
        (status = 404, description = "Item not in the caller's cart"),
    ),
    security(("bearer_auth" = []), ()),
    tag = "Cart"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    CartSession(session): CartSession,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp =
        cart_service::remove_cart_item(&state, user.as_ref(), session.as_deref(), item_id).await?;
    Ok(Json(resp))
}
