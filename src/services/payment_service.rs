use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};

use crate::{
    audit,
    dto::payments::{CreatePaymentRequest, PaymentIntent, VerifyPaymentRequest},
    entity::{
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        payments::{ActiveModel as PaymentActive, Entity as Payments, Model as PaymentModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Payment,
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Create a gateway-side order for the caller's order and persist a pending
/// payment record. The charge is always the order's frozen total converted to
/// minor units, never a fixed amount.
pub async fn create_intent(
    state: &AppState,
    user: &AuthUser,
    payload: CreatePaymentRequest,
) -> AppResult<ApiResponse<PaymentIntent>> {
    // Scoped lookup; another user's order id reads as missing.
    let order = Orders::find_by_id(payload.order_id)
        .filter(OrderCol::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if order.paid_status {
        return Err(AppError::BadRequest("Order is already paid".into()));
    }

    let amount_minor = (order.price * Decimal::from(100))
        .round()
        .to_i64()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("order total out of range")))?;

    let gateway_order = state
        .gateway
        .create_order(amount_minor, &order.invoice_no)
        .await?;

    let payment = PaymentActive {
        id: Set(uuid::Uuid::new_v4()),
        order_id: Set(order.id),
        gateway_order_id: Set(gateway_order.id.clone()),
        gateway_payment_id: Set(None),
        gateway_signature: Set(None),
        status: Set("pending".into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "payment_intent",
        Some("payments"),
        Some(serde_json::json!({
            "payment_id": payment.id,
            "order_id": order.id,
            "amount": amount_minor,
        })),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment intent created",
        PaymentIntent {
            gateway_key: state.gateway.key_id().to_string(),
            gateway_order_id: gateway_order.id,
            amount: gateway_order.amount,
            currency: gateway_order.currency,
            payment_id: payment.id,
        },
        Some(Meta::empty()),
    ))
}

/// Reconcile the gateway callback. A valid signature flips the payment to
/// success and the order to paid/confirmed in one transaction; a bad one is
/// recorded as failed without touching the order. Re-verifying an already
/// successful payment is a no-op.
pub async fn verify(
    state: &AppState,
    user: &AuthUser,
    payload: VerifyPaymentRequest,
) -> AppResult<ApiResponse<Payment>> {
    let payment = Payments::find_by_id(payload.payment_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let order = Orders::find_by_id(payment.order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if order.user_id != user.user_id {
        return Err(AppError::NotFound);
    }

    // Idempotence guard: a repeated callback for a settled payment must not
    // re-apply any side effect.
    if payment.status == "success" {
        return Ok(ApiResponse::success(
            "Payment already verified",
            payment_view(payment),
            Some(Meta::empty()),
        ));
    }

    let signature_ok = payload.gateway_order_id == payment.gateway_order_id
        && state.gateway.verify_signature(
            &payment.gateway_order_id,
            &payload.gateway_payment_id,
            &payload.gateway_signature,
        );

    if !signature_ok {
        let payment_id = payment.id;
        let mut active: PaymentActive = payment.into();
        active.status = Set("failed".into());
        active.update(&state.orm).await?;

        audit::record(
            &state.pool,
            Some(user.user_id),
            "payment_failed",
            Some("payments"),
            Some(serde_json::json!({ "payment_id": payment_id, "order_id": order.id })),
        )
        .await;

        return Err(AppError::SignatureMismatch);
    }

    let txn = state.orm.begin().await?;

    let mut payment_active: PaymentActive = payment.into();
    payment_active.status = Set("success".into());
    payment_active.gateway_payment_id = Set(Some(payload.gateway_payment_id));
    payment_active.gateway_signature = Set(Some(payload.gateway_signature));
    let payment = payment_active.update(&txn).await?;

    let mut order_active: OrderActive = order.into();
    order_active.paid_status = Set(true);
    order_active.order_status = Set("confirmed".into());
    order_active.updated_at = Set(Utc::now().into());
    let order = order_active.update(&txn).await?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "payment_verified",
        Some("payments"),
        Some(serde_json::json!({ "payment_id": payment.id, "order_id": order.id })),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment verified",
        payment_view(payment),
        Some(Meta::empty()),
    ))
}

pub fn payment_view(model: PaymentModel) -> Payment {
    Payment {
        id: model.id,
        order_id: model.order_id,
        gateway_order_id: model.gateway_order_id,
        gateway_payment_id: model.gateway_payment_id,
        status: model.status,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
