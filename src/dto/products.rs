use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Product, Tag};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub title: String,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    #[schema(value_type = f64)]
    pub price: Decimal,
    #[schema(value_type = Option<f64>)]
    pub old_price: Option<Decimal>,
    pub status: Option<String>,
    pub featured: Option<bool>,
    pub category_id: Option<Uuid>,
    /// Admins may create on behalf of a vendor; vendors are pinned to their own record.
    pub vendor_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub title: Option<String>,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub old_price: Option<Decimal>,
    pub status: Option<String>,
    pub featured: Option<bool>,
    pub category_id: Option<Uuid>,
}

#[derive(Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<Product>,
}

#[derive(Serialize, ToSchema)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub images: Vec<String>,
    pub tags: Vec<Tag>,
}
