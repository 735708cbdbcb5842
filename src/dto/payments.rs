use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePaymentRequest {
    pub order_id: Uuid,
}

/// Everything the client needs to hand to the gateway checkout widget.
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentIntent {
    pub gateway_key: String,
    pub gateway_order_id: String,
    /// Charge amount in minor units (e.g. paise).
    pub amount: i64,
    pub currency: String,
    pub payment_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    pub payment_id: Uuid,
    pub gateway_payment_id: String,
    pub gateway_order_id: String,
    pub gateway_signature: String,
}
