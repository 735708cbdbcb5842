use std::collections::HashMap;

use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set, SqlErr,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::cart::{AddToCartRequest, CartItemView, CartView, UpdateCartItemRequest},
    entity::{
        cart_items::{
            ActiveModel as CartItemActive, Column as CartItemCol, Entity as CartItems,
            Model as CartItemModel,
        },
        carts::{ActiveModel as CartActive, Column as CartCol, Entity as Carts, Model as CartModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    services::product_service::product_view,
    state::AppState,
};

/// Upper bound for a single cart line. Also keeps quantity arithmetic well
/// away from i32 overflow: two capped lines can always be summed safely.
pub const MAX_LINE_QUANTITY: i32 = 10_000;

/// Resolve the acting cart for a request per the caller's identity.
///
/// Authenticated callers get their user cart (created lazily); if they also
/// carry a session id whose cart still has items, that cart is merged in and
/// deleted, so running the merge twice cannot double-count. Anonymous callers
/// get the session cart, minting a fresh session id when none was supplied.
///
/// Returns the cart plus the session id the client must echo back while
/// anonymous.
pub async fn resolve_cart(
    state: &AppState,
    user: Option<&AuthUser>,
    session: Option<&str>,
) -> AppResult<(CartModel, Option<String>)> {
    match user {
        Some(user) => {
            let cart = get_or_create_user_cart(&state.orm, user.user_id).await?;
            let cart = match session {
                Some(sid) => merge_session_cart(state, user, sid, cart).await?,
                None => cart,
            };
            Ok((cart, None))
        }
        None => {
            let sid = match session {
                Some(sid) => sid.to_string(),
                None => Uuid::new_v4().simple().to_string(),
            };
            let cart = get_or_create_session_cart(&state.orm, &sid).await?;
            Ok((cart, Some(sid)))
        }
    }
}

async fn get_or_create_user_cart<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
) -> AppResult<CartModel> {
    if let Some(cart) = Carts::find()
        .filter(CartCol::UserId.eq(user_id))
        .one(conn)
        .await?
    {
        return Ok(cart);
    }

    let insert = CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(Some(user_id)),
        session_id: Set(None),
        created_at: NotSet,
    }
    .insert(conn)
    .await;

    match insert {
        Ok(cart) => Ok(cart),
        // Concurrent first touch; the unique index makes the other winner visible.
        Err(err) if is_unique_violation(&err) => Carts::find()
            .filter(CartCol::UserId.eq(user_id))
            .one(conn)
            .await?
            .ok_or(AppError::NotFound),
        Err(err) => Err(err.into()),
    }
}

async fn get_or_create_session_cart<C: ConnectionTrait>(
    conn: &C,
    session_id: &str,
) -> AppResult<CartModel> {
    if let Some(cart) = Carts::find()
        .filter(CartCol::SessionId.eq(session_id))
        .one(conn)
        .await?
    {
        return Ok(cart);
    }

    let insert = CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(None),
        session_id: Set(Some(session_id.to_string())),
        created_at: NotSet,
    }
    .insert(conn)
    .await;

    match insert {
        Ok(cart) => Ok(cart),
        Err(err) if is_unique_violation(&err) => Carts::find()
            .filter(CartCol::SessionId.eq(session_id))
            .one(conn)
            .await?
            .ok_or(AppError::NotFound),
        Err(err) => Err(err.into()),
    }
}

/// Fold a session cart into the user cart: matching products add quantities,
/// the rest move over, and the emptied session cart is deleted.
async fn merge_session_cart(
    state: &AppState,
    user: &AuthUser,
    session_id: &str,
    user_cart: CartModel,
) -> AppResult<CartModel> {
    let session_cart = Carts::find()
        .filter(CartCol::SessionId.eq(session_id))
        .filter(CartCol::UserId.is_null())
        .one(&state.orm)
        .await?;
    let Some(session_cart) = session_cart else {
        return Ok(user_cart);
    };

    let txn = state.orm.begin().await?;

    let session_items = CartItems::find()
        .filter(CartItemCol::CartId.eq(session_cart.id))
        .all(&txn)
        .await?;

    for item in session_items {
        let existing = match item.product_id {
            Some(product_id) => {
                CartItems::find()
                    .filter(CartItemCol::CartId.eq(user_cart.id))
                    .filter(CartItemCol::ProductId.eq(product_id))
                    .one(&txn)
                    .await?
            }
            None => None,
        };

        match existing {
            Some(target) => {
                // Both sides already respect the line cap, so the sum cannot
                // overflow; the clamp keeps the merged line within it too.
                let quantity = target
                    .quantity
                    .saturating_add(item.quantity)
                    .min(MAX_LINE_QUANTITY);
                let mut active: CartItemActive = target.into();
                active.quantity = Set(quantity);
                active.update(&txn).await?;
                CartItems::delete_by_id(item.id).exec(&txn).await?;
            }
            None => {
                let mut active: CartItemActive = item.into();
                active.cart_id = Set(user_cart.id);
                active.update(&txn).await?;
            }
        }
    }

    Carts::delete_by_id(session_cart.id).exec(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "cart_merge",
        Some("carts"),
        Some(serde_json::json!({ "session_id": session_id, "cart_id": user_cart.id })),
    )
    .await;

    Ok(user_cart)
}

pub async fn view_cart(
    state: &AppState,
    user: Option<&AuthUser>,
    session: Option<&str>,
) -> AppResult<ApiResponse<CartView>> {
    let (cart, sid) = resolve_cart(state, user, session).await?;
    let view = build_cart_view(state, &cart, sid).await?;
    Ok(ApiResponse::success("OK", view, Some(Meta::empty())))
}

pub async fn add_to_cart(
    state: &AppState,
    user: Option<&AuthUser>,
    session: Option<&str>,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }
    if payload.quantity > MAX_LINE_QUANTITY {
        return Err(AppError::BadRequest(format!(
            "quantity must be at most {MAX_LINE_QUANTITY}"
        )));
    }

    let product = Products::find_by_id(payload.product_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let (cart, sid) = resolve_cart(state, user, session).await?;

    upsert_item(state, cart.id, product.id, product.price, payload.quantity).await?;

    audit::record(
        &state.pool,
        user.map(|u| u.user_id),
        "cart_add",
        Some("cart_items"),
        Some(serde_json::json!({
            "cart_id": cart.id,
            "product_id": product.id,
            "quantity": payload.quantity,
        })),
    )
    .await;

    let view = build_cart_view(state, &cart, sid).await?;
    Ok(ApiResponse::success("Added to cart", view, None))
}

/// Increment-or-insert on the unique (cart, product) pair. A concurrent
/// insert loses the race on the unique index and is retried as an update
/// instead of trusting the earlier existence check.
async fn upsert_item(
    state: &AppState,
    cart_id: Uuid,
    product_id: Uuid,
    unit_price: Decimal,
    quantity: i32,
) -> AppResult<CartItemModel> {
    if let Some(existing) = find_pair(&state.orm, cart_id, product_id).await? {
        return bump_quantity(&state.orm, existing, quantity).await;
    }

    let insert = CartItemActive {
        id: Set(Uuid::new_v4()),
        cart_id: Set(cart_id),
        product_id: Set(Some(product_id)),
        quantity: Set(quantity),
        price_snapshot: Set(unit_price),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await;

    match insert {
        Ok(item) => Ok(item),
        Err(err) if is_unique_violation(&err) => {
            let existing = find_pair(&state.orm, cart_id, product_id)
                .await?
                .ok_or(AppError::NotFound)?;
            bump_quantity(&state.orm, existing, quantity).await
        }
        Err(err) => Err(err.into()),
    }
}

async fn find_pair<C: ConnectionTrait>(
    conn: &C,
    cart_id: Uuid,
    product_id: Uuid,
) -> AppResult<Option<CartItemModel>> {
    Ok(CartItems::find()
        .filter(CartItemCol::CartId.eq(cart_id))
        .filter(CartItemCol::ProductId.eq(product_id))
        .one(conn)
        .await?)
}

async fn bump_quantity<C: ConnectionTrait>(
    conn: &C,
    item: CartItemModel,
    delta: i32,
) -> AppResult<CartItemModel> {
    let quantity = checked_line_quantity(item.quantity, delta)?;
    let mut active: CartItemActive = item.into();
    active.quantity = Set(quantity);
    Ok(active.update(conn).await?)
}

/// Guarded quantity arithmetic: overflow and anything past the line cap are
/// client errors, never a wrapped negative row.
fn checked_line_quantity(current: i32, delta: i32) -> AppResult<i32> {
    match current.checked_add(delta) {
        Some(quantity) if quantity <= MAX_LINE_QUANTITY => Ok(quantity),
        _ => Err(AppError::BadRequest(format!(
            "quantity must be at most {MAX_LINE_QUANTITY}"
        ))),
    }
}

pub async fn update_cart_item(
    state: &AppState,
    user: Option<&AuthUser>,
    session: Option<&str>,
    item_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartView>> {
    let (cart, sid) = resolve_cart(state, user, session).await?;

    // Scoped to the caller's own cart; foreign item ids read as missing.
    let item = CartItems::find_by_id(item_id)
        .filter(CartItemCol::CartId.eq(cart.id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let new_quantity = match (payload.quantity, payload.delta) {
        (Some(q), _) => q,
        // An underflowing negative delta just means "remove the line".
        (None, Some(d)) => match item.quantity.checked_add(d) {
            Some(q) => q,
            None if d < 0 => 0,
            None => {
                return Err(AppError::BadRequest(format!(
                    "quantity must be at most {MAX_LINE_QUANTITY}"
                )));
            }
        },
        (None, None) => {
            return Err(AppError::BadRequest(
                "quantity or delta is required".to_string(),
            ));
        }
    };

    if new_quantity > MAX_LINE_QUANTITY {
        return Err(AppError::BadRequest(format!(
            "quantity must be at most {MAX_LINE_QUANTITY}"
        )));
    }

    if new_quantity <= 0 {
        CartItems::delete_by_id(item.id).exec(&state.orm).await?;
    } else {
        let mut active: CartItemActive = item.into();
        active.quantity = Set(new_quantity);
        active.update(&state.orm).await?;
    }

    audit::record(
        &state.pool,
        user.map(|u| u.user_id),
        "cart_update",
        Some("cart_items"),
        Some(serde_json::json!({ "item_id": item_id, "quantity": new_quantity })),
    )
    .await;

    let view = build_cart_view(state, &cart, sid).await?;
    Ok(ApiResponse::success("Cart updated", view, None))
}

pub async fn remove_cart_item(
    state: &AppState,
    user: Option<&AuthUser>,
    session: Option<&str>,
    item_id: Uuid,
) -> AppResult<ApiResponse<CartView>> {
    let (cart, sid) = resolve_cart(state, user, session).await?;

    let result = CartItems::delete_many()
        .filter(CartItemCol::Id.eq(item_id))
        .filter(CartItemCol::CartId.eq(cart.id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        user.map(|u| u.user_id),
        "cart_remove",
        Some("cart_items"),
        Some(serde_json::json!({ "item_id": item_id })),
    )
    .await;

    let view = build_cart_view(state, &cart, sid).await?;
    Ok(ApiResponse::success("Removed from cart", view, None))
}

async fn build_cart_view(
    state: &AppState,
    cart: &CartModel,
    session_id: Option<String>,
) -> AppResult<CartView> {
    let items = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart.id))
        .all(&state.orm)
        .await?;

    let product_ids: Vec<Uuid> = items.iter().filter_map(|i| i.product_id).collect();
    let products = if product_ids.is_empty() {
        Vec::new()
    } else {
        Products::find()
            .filter(ProdCol::Id.is_in(product_ids))
            .all(&state.orm)
            .await?
    };
    let by_id: HashMap<Uuid, _> = products.into_iter().map(|p| (p.id, p)).collect();

    let mut views = Vec::with_capacity(items.len());
    let mut total = Decimal::ZERO;
    for item in items {
        let product = item.product_id.and_then(|id| by_id.get(&id));

        // Back-fill a zero snapshot from the live product; once set it is
        // never re-derived, protecting against mid-cart price changes.
        let snapshot = if item.price_snapshot == Decimal::ZERO {
            if let Some(product) = product {
                let price = product.price;
                let mut active: CartItemActive = item.clone().into();
                active.price_snapshot = Set(price);
                active.update(&state.orm).await?;
                price
            } else {
                Decimal::ZERO
            }
        } else {
            item.price_snapshot
        };

        let line_total = snapshot * Decimal::from(item.quantity);
        total += line_total;
        views.push(CartItemView {
            id: item.id,
            product: product.cloned().map(product_view),
            quantity: item.quantity,
            price_snapshot: snapshot,
            line_total,
        });
    }

    Ok(CartView {
        id: cart.id,
        session_id,
        items: views,
        total,
    })
}

fn is_unique_violation(err: &sea_orm::DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
