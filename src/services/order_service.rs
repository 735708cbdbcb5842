use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::orders::{OrderList, OrderWithItems, UpdateItemStatusRequest, UpdateOrderStatusRequest},
    entity::{
        cart_items::{Column as CartItemCol, Entity as CartItems},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        },
        products::{Column as ProdCol, Entity as Products},
        vendors::Entity as Vendors,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_customer},
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::cart_service::resolve_cart,
    state::AppState,
};

pub const ORDER_STATUSES: [&str; 9] = [
    "pending",
    "processing",
    "confirmed",
    "packed",
    "shipped",
    "out_for_delivery",
    "delivered",
    "cancelled",
    "returned",
];

/// Convert the caller's non-empty cart into an immutable order snapshot.
///
/// Order, line items and the cart clear all happen in one transaction: any
/// invalid line aborts the whole checkout with nothing persisted. The cart is
/// cleared here, not at payment verification, so a retried checkout cannot
/// re-order the same items.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    session: Option<&str>,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_customer(user)?;

    let (cart, _) = resolve_cart(state, Some(user), session).await?;

    let txn = state.orm.begin().await?;

    let items = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart.id))
        .lock(LockType::Update)
        .all(&txn)
        .await?;

    if items.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let product_ids: Vec<Uuid> = items.iter().filter_map(|i| i.product_id).collect();
    let products = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .lock(LockType::Update)
        .all(&txn)
        .await?;
    let by_id: HashMap<Uuid, _> = products.into_iter().map(|p| (p.id, p)).collect();

    // Point-in-time totals: live price wins, snapshot is the fallback.
    let mut lines = Vec::with_capacity(items.len());
    let mut total = Decimal::ZERO;
    for item in &items {
        let product = item
            .product_id
            .and_then(|id| by_id.get(&id))
            .ok_or_else(|| {
                AppError::BadRequest(format!("Cart item {} has no attached product", item.id))
            })?;

        if item.quantity <= 0 {
            return Err(AppError::BadRequest("Cart has invalid quantity".into()));
        }

        let unit_price = if product.price.is_zero() {
            item.price_snapshot
        } else {
            product.price
        };
        let line_total = unit_price * Decimal::from(item.quantity);
        total += line_total;
        lines.push((product.clone(), item.quantity, unit_price, line_total));
    }

    let order_id = Uuid::new_v4();
    let order = OrderActive {
        id: Set(order_id),
        user_id: Set(user.user_id),
        invoice_no: Set(build_invoice_no()),
        price: Set(total),
        paid_status: Set(false),
        order_status: Set("processing".into()),
        order_date: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut order_items = Vec::with_capacity(lines.len());
    for (product, qty, unit_price, line_total) in lines {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(Some(product.id)),
            item_status: Set("pending".into()),
            title: Set(product.title.clone()),
            image: Set(Some(product.image.clone())),
            qty: Set(qty),
            price: Set(unit_price),
            total: Set(line_total),
        }
        .insert(&txn)
        .await?;
        order_items.push(order_item_view(item));
    }

    CartItems::delete_many()
        .filter(CartItemCol::CartId.eq(cart.id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "checkout",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "invoice_no": order.invoice_no })),
    )
    .await;

    Ok(ApiResponse::success(
        "Order created",
        OrderWithItems {
            order: order_view(order),
            items: order_items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all();
    if !user.is_admin() {
        condition = condition.add(OrderCol::UserId.eq(user.user_id));
    }
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::OrderStatus.eq(status.clone()));
    }

    let mut finder = Orders::find().filter(condition);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::OrderDate),
        SortOrder::Desc => finder.order_by_desc(OrderCol::OrderDate),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_view)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Orders",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?;

    ensure_order_viewer(state, user, &order, &items).await?;

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order_view(order),
            items: items.into_iter().map(order_item_view).collect(),
        },
        Some(Meta::empty()),
    ))
}

/// Owner, admin, or a vendor with at least one of their products in the order.
async fn ensure_order_viewer(
    state: &AppState,
    user: &AuthUser,
    order: &OrderModel,
    items: &[OrderItemModel],
) -> AppResult<()> {
    if user.is_admin() || order.user_id == user.user_id {
        return Ok(());
    }
    if user.is_vendor() {
        for item in items {
            if item_belongs_to_vendor(state, item, user.user_id).await? {
                return Ok(());
            }
        }
    }
    Err(AppError::Forbidden)
}

async fn item_belongs_to_vendor(
    state: &AppState,
    item: &OrderItemModel,
    user_id: Uuid,
) -> AppResult<bool> {
    let Some(product_id) = item.product_id else {
        return Ok(false);
    };
    let Some(product) = Products::find_by_id(product_id).one(&state.orm).await? else {
        return Ok(false);
    };
    let Some(vendor_id) = product.vendor_id else {
        return Ok(false);
    };
    let Some(vendor) = Vendors::find_by_id(vendor_id).one(&state.orm).await? else {
        return Ok(false);
    };
    Ok(vendor.user_id == Some(user_id))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    validate_order_status(&payload.order_status)?;

    let existing = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: OrderActive = existing.into();
    active.order_status = Set(payload.order_status);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_status_update",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "status": order.order_status })),
    )
    .await;

    Ok(ApiResponse::success(
        "Order updated",
        order_view(order),
        Some(Meta::empty()),
    ))
}

/// Admin may update any line; a vendor only lines carrying their products.
pub async fn update_item_status(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: UpdateItemStatusRequest,
) -> AppResult<ApiResponse<OrderItem>> {
    validate_order_status(&payload.item_status)?;

    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let item = OrderItems::find_by_id(payload.item_id)
        .filter(OrderItemCol::OrderId.eq(order.id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if !user.is_admin() {
        if !user.is_vendor() || !item_belongs_to_vendor(state, &item, user.user_id).await? {
            return Err(AppError::Forbidden);
        }
    }

    let item_id = item.id;
    let mut active: OrderItemActive = item.into();
    active.item_status = Set(payload.item_status);
    let item = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "order_item_status_update",
        Some("order_items"),
        Some(serde_json::json!({ "order_id": order.id, "item_id": item_id, "status": item.item_status })),
    )
    .await;

    Ok(ApiResponse::success(
        "Item updated",
        order_item_view(item),
        Some(Meta::empty()),
    ))
}

fn validate_order_status(status: &str) -> Result<(), AppError> {
    if ORDER_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(AppError::BadRequest("Invalid order status".into()))
    }
}

/// 12 uppercase hex chars from a v4 uuid; the column is unique, so the
/// negligible collision chance surfaces as an insert error instead of a
/// silent reuse.
fn build_invoice_no() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    hex[..12].to_uppercase()
}

pub fn order_view(model: OrderModel) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        invoice_no: model.invoice_no,
        price: model.price,
        paid_status: model.paid_status,
        order_status: model.order_status,
        order_date: model.order_date.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

pub fn order_item_view(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        item_status: model.item_status,
        title: model.title,
        image: model.image,
        qty: model.qty,
        price: model.price,
        total: model.total,
    }
}
