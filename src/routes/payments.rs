use axum::{Json, Router, extract::State, routing::post};

use crate::{
    dto::payments::{CreatePaymentRequest, PaymentIntent, VerifyPaymentRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Payment,
    response::ApiResponse,
    services::payment_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_payment))
        .route("/verify", post(verify_payment))
}

#[utoipa::path(
    post,
    path = "/api/payments/create",
    request_body = CreatePaymentRequest,
    responses(
        (status = 200, description = "Gateway order created, payment pending", body = ApiResponse<PaymentIntent>),
        (status = 400, description = "Order already paid"),
        (status = 404, description = "Order not found for this user"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn create_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreatePaymentRequest>,
) -> AppResult<Json<ApiResponse<PaymentIntent>>> {
    let resp = payment_service::create_intent(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payments/verify",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment verified; order marked paid", body = ApiResponse<Payment>),
        (status = 400, description = "Signature mismatch; payment marked failed"),
        (status = 404, description = "Payment not found for this user"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<VerifyPaymentRequest>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let resp = payment_service::verify(&state, &user, payload).await?;
    Ok(Json(resp))
}
