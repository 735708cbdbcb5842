use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Category, Tag, Vendor};

#[derive(Serialize, ToSchema)]
pub struct CategoryList {
    pub items: Vec<Category>,
}

#[derive(Serialize, ToSchema)]
pub struct TagList {
    pub items: Vec<Tag>,
}

#[derive(Serialize, ToSchema)]
pub struct VendorList {
    pub items: Vec<Vendor>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateVendorRequest {
    pub title: String,
    pub image: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub contact: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateVendorRequest {
    pub title: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub contact: Option<String>,
}
