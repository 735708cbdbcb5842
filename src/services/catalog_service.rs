use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use uuid::Uuid;

use crate::{
    audit,
    dto::catalog::{CategoryList, CreateVendorRequest, TagList, UpdateVendorRequest, VendorList},
    entity::vendors::{ActiveModel as VendorActive, Entity as Vendors, Model as VendorModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_not_customer, ensure_vendor_or_admin},
    models::{Category, Tag, Vendor},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn list_categories(
    state: &AppState,
    pagination: Pagination,
) -> AppResult<ApiResponse<CategoryList>> {
    let (page, limit, offset) = pagination.normalize();
    let items = sqlx::query_as::<_, Category>(
        "SELECT * FROM categories ORDER BY title LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM categories")
        .fetch_one(&state.pool)
        .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(meta),
    ))
}

pub async fn get_category(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Category>> {
    let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Category", category, None))
}

pub async fn list_tags(state: &AppState) -> AppResult<ApiResponse<TagList>> {
    let items = sqlx::query_as::<_, Tag>("SELECT * FROM tags ORDER BY name")
        .fetch_all(&state.pool)
        .await?;
    Ok(ApiResponse::success("Tags", TagList { items }, None))
}

pub async fn list_vendors(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<VendorList>> {
    ensure_not_customer(user)?;
    let (page, limit, offset) = pagination.normalize();
    let items =
        sqlx::query_as::<_, Vendor>("SELECT * FROM vendors ORDER BY title LIMIT $1 OFFSET $2")
            .bind(limit)
            .bind(offset)
            .fetch_all(&state.pool)
            .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM vendors")
        .fetch_one(&state.pool)
        .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success(
        "Vendors",
        VendorList { items },
        Some(meta),
    ))
}

pub async fn get_vendor(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Vendor>> {
    ensure_not_customer(user)?;
    let vendor = sqlx::query_as::<_, Vendor>("SELECT * FROM vendors WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Vendor", vendor, None))
}

pub async fn create_vendor(
    state: &AppState,
    user: &AuthUser,
    payload: CreateVendorRequest,
) -> AppResult<ApiResponse<Vendor>> {
    ensure_vendor_or_admin(user)?;

    // A vendor record created through the API is linked to its creator.
    let vendor = VendorActive {
        id: Set(Uuid::new_v4()),
        title: Set(payload.title),
        image: Set(payload.image.unwrap_or_else(|| "default.jpg".to_string())),
        description: Set(payload.description),
        address: Set(payload.address.unwrap_or_default()),
        contact: Set(payload.contact.unwrap_or_default()),
        user_id: Set(Some(user.user_id)),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "vendor_create",
        Some("vendors"),
        Some(serde_json::json!({ "vendor_id": vendor.id })),
    )
    .await;

    Ok(ApiResponse::success(
        "Vendor created",
        vendor_view(vendor),
        Some(Meta::empty()),
    ))
}

pub async fn update_vendor(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateVendorRequest,
) -> AppResult<ApiResponse<Vendor>> {
    let existing = Vendors::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    ensure_vendor_owner_or_admin(user, &existing)?;

    let mut active: VendorActive = existing.into();
    if let Some(title) = payload.title {
        active.title = Set(title);
    }
    if let Some(image) = payload.image {
        active.image = Set(image);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(address) = payload.address {
        active.address = Set(address);
    }
    if let Some(contact) = payload.contact {
        active.contact = Set(contact);
    }
    let vendor = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "vendor_update",
        Some("vendors"),
        Some(serde_json::json!({ "vendor_id": vendor.id })),
    )
    .await;

    Ok(ApiResponse::success(
        "Vendor updated",
        vendor_view(vendor),
        Some(Meta::empty()),
    ))
}

pub async fn delete_vendor(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let existing = Vendors::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    ensure_vendor_owner_or_admin(user, &existing)?;

    Vendors::delete_by_id(id).exec(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "vendor_delete",
        Some("vendors"),
        Some(serde_json::json!({ "vendor_id": id })),
    )
    .await;

    Ok(ApiResponse::success(
        "Vendor deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

fn ensure_vendor_owner_or_admin(user: &AuthUser, vendor: &VendorModel) -> AppResult<()> {
    if user.is_admin() || vendor.user_id == Some(user.user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

fn vendor_view(model: VendorModel) -> Vendor {
    Vendor {
        id: model.id,
        title: model.title,
        image: model.image,
        description: model.description,
        address: model.address,
        contact: model.contact,
        user_id: model.user_id,
    }
}
