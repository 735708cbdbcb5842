use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Product;

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

/// Either an absolute quantity or a signed delta; a result of zero or less
/// removes the line.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartItemRequest {
    pub quantity: Option<i32>,
    pub delta: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemView {
    pub id: Uuid,
    pub product: Option<Product>,
    pub quantity: i32,
    #[schema(value_type = f64)]
    pub price_snapshot: Decimal,
    #[schema(value_type = f64)]
    pub line_total: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub id: Uuid,
    /// Echo this back via the `x-cart-session` header while anonymous.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub items: Vec<CartItemView>,
    #[schema(value_type = f64)]
    pub total: Decimal,
}
