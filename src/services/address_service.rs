use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::addresses::{AddressList, CreateAddressRequest, UpdateAddressRequest},
    entity::addresses::{
        ActiveModel as AddressActive, Column as AddrCol, Entity as Addresses, Model as AddressModel,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Address,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn list_addresses(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AddressList>> {
    let items = Addresses::find()
        .filter(AddrCol::UserId.eq(user.user_id))
        .order_by_desc(AddrCol::IsDefault)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(address_view)
        .collect();

    Ok(ApiResponse::success("Addresses", AddressList { items }, None))
}

pub async fn create_address(
    state: &AppState,
    user: &AuthUser,
    payload: CreateAddressRequest,
) -> AppResult<ApiResponse<Address>> {
    if payload.address.trim().is_empty() {
        return Err(AppError::BadRequest("address is required".into()));
    }

    let address = AddressActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        address: Set(payload.address),
        is_default: Set(false),
    }
    .insert(&state.orm)
    .await?;

    let address = if payload.is_default {
        set_default_inner(state, user, address.id).await?
    } else {
        address
    };

    audit::record(
        &state.pool,
        Some(user.user_id),
        "address_create",
        Some("addresses"),
        Some(serde_json::json!({ "address_id": address.id })),
    )
    .await;

    Ok(ApiResponse::success(
        "Address created",
        address_view(address),
        Some(Meta::empty()),
    ))
}

pub async fn update_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateAddressRequest,
) -> AppResult<ApiResponse<Address>> {
    let existing = find_owned(state, user, id).await?;

    let mut active: AddressActive = existing.into();
    if let Some(address) = payload.address {
        active.address = Set(address);
    }
    let address = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Address updated",
        address_view(address),
        Some(Meta::empty()),
    ))
}

pub async fn delete_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    // Ownership check doubles as the existence check.
    find_owned(state, user, id).await?;
    Addresses::delete_by_id(id).exec(&state.orm).await?;

    Ok(ApiResponse::success(
        "Address deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Make this the user's single default: every other default is unset in the
/// same transaction, so exactly one remains whatever the starting state.
pub async fn set_default_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Address>> {
    let address = set_default_inner(state, user, id).await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "address_set_default",
        Some("addresses"),
        Some(serde_json::json!({ "address_id": id })),
    )
    .await;

    Ok(ApiResponse::success(
        "Default address set",
        address_view(address),
        Some(Meta::empty()),
    ))
}

async fn set_default_inner(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<AddressModel> {
    let existing = find_owned(state, user, id).await?;

    let txn = state.orm.begin().await?;

    Addresses::update_many()
        .col_expr(AddrCol::IsDefault, Expr::value(false))
        .filter(AddrCol::UserId.eq(user.user_id))
        .filter(AddrCol::Id.ne(id))
        .exec(&txn)
        .await?;

    let mut active: AddressActive = existing.into();
    active.is_default = Set(true);
    let address = active.update(&txn).await?;

    txn.commit().await?;
    Ok(address)
}

async fn find_owned(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<AddressModel> {
    Addresses::find_by_id(id)
        .filter(AddrCol::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

fn address_view(model: AddressModel) -> Address {
    Address {
        id: model.id,
        user_id: model.user_id,
        address: model.address,
        is_default: model.is_default,
    }
}
