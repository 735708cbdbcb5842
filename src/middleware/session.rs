use axum::extract::FromRequestParts;

use crate::error::AppError;

pub const CART_SESSION_HEADER: &str = "x-cart-session";

/// Anonymous cart identity. Clients echo back the session id returned by the
/// first cart response via the `x-cart-session` header; a missing header
/// means a fresh session will be minted when the cart is first touched.
#[derive(Debug, Clone)]
pub struct CartSession(pub Option<String>);

impl<S> FromRequestParts<S> for CartSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .headers
            .get(CART_SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        Ok(CartSession(session))
    }
}
