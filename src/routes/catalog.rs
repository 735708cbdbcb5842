use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::catalog::{CategoryList, CreateVendorRequest, TagList, UpdateVendorRequest, VendorList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Category, Tag, Vendor},
    response::ApiResponse,
    routes::params::Pagination,
    services::catalog_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/categories/{id}", get(get_category))
        .route("/tags", get(list_tags))
        .route("/vendors", get(list_vendors).post(create_vendor))
        .route(
            "/vendors/{id}",
            get(get_vendor).put(update_vendor).delete(delete_vendor),
        )
}

#[utoipa::path(
    get,
    path = "/api/categories",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "Category listing", body = ApiResponse<CategoryList>)
    ),
    tag = "Catalog"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    let resp = catalog_service::list_categories(&state, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(
        ("id" = Uuid, Path, description = "Category id")
    ),
    responses(
        (status = 200, description = "Category detail", body = ApiResponse<Category>),
        (status = 404, description = "Unknown category"),
    ),
    tag = "Catalog"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let resp = catalog_service::get_category(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/tags",
    responses(
        (status = 200, description = "All tags", body = ApiResponse<TagList>)
    ),
    tag = "Catalog"
)]
pub async fn list_tags(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<TagList>>> {
    let resp = catalog_service::list_tags(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/vendors",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "Vendor listing", body = ApiResponse<VendorList>),
        (status = 403, description = "Customers cannot browse vendors"),
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn list_vendors(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<VendorList>>> {
    let resp = catalog_service::list_vendors(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/vendors/{id}",
    params(
        ("id" = Uuid, Path, description = "Vendor id")
    ),
    responses(
        (status = 200, description = "Vendor detail", body = ApiResponse<Vendor>),
        (status = 403, description = "Customers cannot browse vendors"),
        (status = 404, description = "Unknown vendor"),
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn get_vendor(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vendor>>> {
    let resp = catalog_service::get_vendor(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/vendors",
    request_body = CreateVendorRequest,
    responses(
        (status = 200, description = "Vendor created, linked to the caller", body = ApiResponse<Vendor>),
        (status = 403, description = "Vendor or admin only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn create_vendor(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateVendorRequest>,
) -> AppResult<Json<ApiResponse<Vendor>>> {
    let resp = catalog_service::create_vendor(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/vendors/{id}",
    params(
        ("id" = Uuid, Path, description = "Vendor id")
    ),
    request_body = UpdateVendorRequest,
    responses(
        (status = 200, description = "Vendor updated", body = ApiResponse<Vendor>),
        (status = 403, description = "Owner or admin only"),
        (status = 404, description = "Unknown vendor"),
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn update_vendor(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateVendorRequest>,
) -> AppResult<Json<ApiResponse<Vendor>>> {
    let resp = catalog_service::update_vendor(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/vendors/{id}",
    params(
        ("id" = Uuid, Path, description = "Vendor id")
    ),
    responses(
        (status = 200, description = "Vendor deleted", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Owner or admin only"),
        (status = 404, description = "Unknown vendor"),
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn delete_vendor(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = catalog_service::delete_vendor(&state, &user, id).await?;
    Ok(Json(resp))
}
