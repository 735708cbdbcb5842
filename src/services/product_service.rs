use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::products::{CreateProductRequest, ProductDetail, ProductList, UpdateProductRequest},
    entity::{
        cart_items::{Column as CartItemCol, Entity as CartItems},
        products::{
            ActiveModel as ProductActive, Column as ProdCol, Entity as Products,
            Model as ProductModel,
        },
        vendors::{Column as VendorCol, Entity as Vendors},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_vendor_or_admin},
    models::{Product, Tag},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

const PRODUCT_STATUSES: [&str; 5] = [
    "active",
    "out_of_stock",
    "inactive",
    "coming_soon",
    "discontinued",
];

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(ProdCol::Title).ilike(pattern.clone()))
                .add(Expr::col(ProdCol::Brand).ilike(pattern)),
        );
    }

    if let Some(category) = query.category {
        condition = condition.add(ProdCol::CategoryId.eq(category));
    }

    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(ProdCol::Status.eq(status.clone()));
    }

    if let Some(featured) = query.featured {
        condition = condition.add(ProdCol::Featured.eq(featured));
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(ProdCol::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(ProdCol::Price.lte(max_price));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::Date);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::Date => ProdCol::CreatedAt,
        ProductSortBy::Price => ProdCol::Price,
        ProductSortBy::Title => ProdCol::Title,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(product_view)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<ProductDetail>> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let images = product
        .find_related(crate::entity::ProductImages)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|img| img.image)
        .collect();

    let tags = product
        .find_related(crate::entity::Tags)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|tag| Tag {
            id: tag.id,
            name: tag.name,
        })
        .collect();

    let detail = ProductDetail {
        product: product_view(product),
        images,
        tags,
    };
    Ok(ApiResponse::success("Product", detail, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_vendor_or_admin(user)?;

    let status = payload.status.unwrap_or_else(|| "active".to_string());
    validate_product_status(&status)?;

    // Vendors always publish under their own vendor record; only admins may
    // pick an arbitrary one.
    let vendor_id = if user.is_admin() {
        payload.vendor_id
    } else {
        let vendor = Vendors::find()
            .filter(VendorCol::UserId.eq(user.user_id))
            .one(&state.orm)
            .await?
            .ok_or_else(|| AppError::BadRequest("No vendor record for this user".into()))?;
        Some(vendor.id)
    };

    let id = Uuid::new_v4();
    let sku = build_sku(id);

    let product = ProductActive {
        id: Set(id),
        title: Set(payload.title),
        brand: Set(payload.brand),
        description: Set(payload.description),
        image: Set(payload.image.unwrap_or_else(|| "default.jpg".to_string())),
        price: Set(payload.price),
        old_price: Set(payload.old_price),
        status: Set(status),
        featured: Set(payload.featured.unwrap_or(false)),
        sku: Set(sku),
        vendor_id: Set(vendor_id),
        category_id: Set(payload.category_id),
        user_id: Set(Some(user.user_id)),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        product_view(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    ensure_product_owner_or_admin(state, user, &existing).await?;

    if let Some(status) = payload.status.as_deref() {
        validate_product_status(status)?;
    }

    let mut active: ProductActive = existing.into();
    if let Some(title) = payload.title {
        active.title = Set(title);
    }
    if let Some(brand) = payload.brand {
        active.brand = Set(Some(brand));
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(image) = payload.image {
        active.image = Set(image);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(old_price) = payload.old_price {
        active.old_price = Set(Some(old_price));
    }
    if let Some(status) = payload.status {
        active.status = Set(status);
    }
    if let Some(featured) = payload.featured {
        active.featured = Set(featured);
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(Some(category_id));
    }
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await;

    Ok(ApiResponse::success(
        "Product updated",
        product_view(product),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    ensure_product_owner_or_admin(state, user, &existing).await?;

    // Live carts hold a protected reference; completed orders only keep a
    // denormalized copy, so they do not block deletion.
    let in_carts = CartItems::find()
        .filter(CartItemCol::ProductId.eq(id))
        .count(&state.orm)
        .await?;
    if in_carts > 0 {
        return Err(AppError::BadRequest(
            "Product is referenced by live carts".into(),
        ));
    }

    let result = Products::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        Some(user.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await;

    Ok(ApiResponse::success(
        "Product deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

async fn ensure_product_owner_or_admin(
    state: &AppState,
    user: &AuthUser,
    product: &ProductModel,
) -> AppResult<()> {
    if user.is_admin() {
        return Ok(());
    }
    let Some(vendor_id) = product.vendor_id else {
        return Err(AppError::Forbidden);
    };
    let vendor = Vendors::find_by_id(vendor_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::Forbidden)?;
    if vendor.user_id == Some(user.user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

fn validate_product_status(status: &str) -> Result<(), AppError> {
    if PRODUCT_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(AppError::BadRequest("Invalid product status".into()))
    }
}

fn build_sku(id: Uuid) -> String {
    let hex = id.simple().to_string();
    format!("sku{}", &hex[..8])
}

pub fn product_view(model: ProductModel) -> Product {
    Product {
        id: model.id,
        title: model.title,
        brand: model.brand,
        description: model.description,
        image: model.image,
        price: model.price,
        old_price: model.old_price,
        status: model.status,
        featured: model.featured,
        sku: model.sku,
        vendor_id: model.vendor_id,
        category_id: model.category_id,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
