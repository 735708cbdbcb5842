use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{dto::auth::Claims, error::AppError};

/// Authorization context resolved from the bearer token, passed explicitly
/// into every service call that needs it.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    /// Profile role: "customer" or "vendor".
    pub role: String,
    /// Staff/superuser flag; admin capability is this flag, not a role.
    pub is_staff: bool,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.is_staff
    }

    pub fn is_vendor(&self) -> bool {
        self.role == "vendor"
    }
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

pub fn ensure_vendor_or_admin(user: &AuthUser) -> Result<(), AppError> {
    if user.is_admin() || user.is_vendor() {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

pub fn ensure_customer(user: &AuthUser) -> Result<(), AppError> {
    if !user.is_admin() && user.role == "customer" {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// Vendor listing is hidden from customers but open to vendors and admins.
pub fn ensure_not_customer(user: &AuthUser) -> Result<(), AppError> {
    if user.is_admin() || user.role != "customer" {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

fn decode_bearer(parts: &axum::http::request::Parts) -> Result<AuthUser, AppError> {
    let auth_header = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

    if !auth_str.starts_with("Bearer ") {
        return Err(AppError::Unauthorized("Invalid Authorization scheme".into()));
    }
    let token = auth_str.trim_start_matches("Bearer ").trim();

    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    if decoded.claims.kind != "access" {
        return Err(AppError::Unauthorized("Not an access token".into()));
    }

    let user_id = Uuid::parse_str(&decoded.claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;

    Ok(AuthUser {
        user_id,
        role: decoded.claims.role.clone(),
        is_staff: decoded.claims.staff,
    })
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        decode_bearer(parts)
    }
}

/// Optional variant for routes open to anonymous callers (cart, checkout
/// resolution). A missing header is anonymous; a present-but-bad token is
/// still an error.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        if parts.headers.get(header::AUTHORIZATION).is_none() {
            return Ok(MaybeAuthUser(None));
        }
        decode_bearer(parts).map(|user| MaybeAuthUser(Some(user)))
    }
}
