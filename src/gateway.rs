use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
};

type HmacSha256 = Hmac<Sha256>;

const GATEWAY_ORDERS_URL: &str = "https://api.razorpay.com/v1/orders";

/// Razorpay-style payment gateway client. In sandbox mode gateway orders are
/// fabricated locally so the whole payment flow runs without network access;
/// signature verification is identical in both modes.
#[derive(Clone)]
pub struct PaymentGateway {
    key_id: String,
    key_secret: String,
    currency: String,
    sandbox: bool,
    http: reqwest::Client,
}

#[derive(Debug, Clone)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Deserialize)]
struct GatewayOrderResponse {
    id: String,
    amount: i64,
    currency: String,
}

impl PaymentGateway {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            key_id: config.gateway_key_id.clone(),
            key_secret: config.gateway_key_secret.clone(),
            currency: config.gateway_currency.clone(),
            sandbox: config.gateway_sandbox,
            http: reqwest::Client::new(),
        }
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Create a gateway-side order for `amount` minor units (e.g. paise).
    pub async fn create_order(&self, amount: i64, receipt: &str) -> AppResult<GatewayOrder> {
        if self.sandbox {
            let suffix = Uuid::new_v4().simple().to_string();
            return Ok(GatewayOrder {
                id: format!("order_{}", &suffix[..14]),
                amount,
                currency: self.currency.clone(),
            });
        }

        let body = serde_json::json!({
            "amount": amount,
            "currency": self.currency,
            "receipt": receipt,
            "payment_capture": 1,
        });

        let response = self
            .http
            .post(GATEWAY_ORDERS_URL)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|err| AppError::Gateway(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::Gateway(format!(
                "order create failed: {status}: {text}"
            )));
        }

        let order: GatewayOrderResponse = response
            .json()
            .await
            .map_err(|err| AppError::Gateway(err.to_string()))?;

        Ok(GatewayOrder {
            id: order.id,
            amount: order.amount,
            currency: order.currency,
        })
    }

    /// Verify the callback signature: HMAC-SHA256 over "order_id|payment_id"
    /// with the key secret, hex encoded. Comparison is constant time.
    pub fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let payload = format!("{order_id}|{payment_id}");
        let mut mac = match HmacSha256::new_from_slice(self.key_secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return false,
        };
        mac.update(payload.as_bytes());

        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        mac.verify_slice(&expected).is_ok()
    }

    /// Sign the way the gateway does; used by the sandbox flow and tests.
    pub fn sign(&self, order_id: &str, payment_id: &str) -> String {
        let payload = format!("{order_id}|{payment_id}");
        let mut mac = HmacSha256::new_from_slice(self.key_secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox_gateway() -> PaymentGateway {
        PaymentGateway {
            key_id: "rzp_test_abc".into(),
            key_secret: "topsecret".into(),
            currency: "INR".into(),
            sandbox: true,
            http: reqwest::Client::new(),
        }
    }

    #[test]
    fn valid_signature_is_accepted() {
        let gw = sandbox_gateway();
        let sig = gw.sign("order_123", "pay_456");
        assert!(gw.verify_signature("order_123", "pay_456", &sig));
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let gw = sandbox_gateway();
        let mut sig = gw.sign("order_123", "pay_456");
        let flipped = if sig.ends_with('0') { "1" } else { "0" };
        sig.truncate(sig.len() - 1);
        sig.push_str(flipped);
        assert!(!gw.verify_signature("order_123", "pay_456", &sig));
    }

    #[test]
    fn signature_binds_both_identifiers() {
        let gw = sandbox_gateway();
        let sig = gw.sign("order_123", "pay_456");
        assert!(!gw.verify_signature("order_999", "pay_456", &sig));
        assert!(!gw.verify_signature("order_123", "pay_999", &sig));
    }

    #[test]
    fn non_hex_signature_is_rejected() {
        let gw = sandbox_gateway();
        assert!(!gw.verify_signature("order_123", "pay_456", "not-hex!"));
    }

    #[tokio::test]
    async fn sandbox_orders_carry_amount_and_currency() {
        let gw = sandbox_gateway();
        let order = gw.create_order(13000, "AB12CD34EF56").await.unwrap();
        assert!(order.id.starts_with("order_"));
        assert_eq!(order.amount, 13000);
        assert_eq!(order.currency, "INR");
    }
}
