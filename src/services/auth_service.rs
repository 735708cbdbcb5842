use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use password_hash::rand_core::OsRng;
use rand::Rng;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit,
    dto::auth::{
        Claims, LoginResponse, OtpLoginRequest, PasswordLoginRequest, RefreshRequest,
        RefreshResponse, RequestOtpRequest, RequestOtpResponse, SignupRequest, SignupResponse,
        TokenPair, UserList,
    },
    entity::otps::{ActiveModel as OtpActive, Column as OtpCol, Entity as Otps},
    entity::profiles::ActiveModel as ProfileActive,
    entity::users::ActiveModel as UserActive,
    entity::vendors::ActiveModel as VendorActive,
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::UserView,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

const OTP_EXPIRY_MINUTES: i64 = 5;
const ACCESS_TTL_HOURS: i64 = 1;
const REFRESH_TTL_DAYS: i64 = 7;

#[derive(FromRow)]
struct AuthRow {
    id: Uuid,
    email: String,
    username: String,
    password_hash: String,
    is_staff: bool,
    is_superuser: bool,
    date_joined: DateTime<Utc>,
    role: String,
}

/// Create the user, their profile and (for vendors) a vendor stub in one
/// explicit step; there is no hidden post-save hook doing this elsewhere.
pub async fn signup(
    state: &AppState,
    payload: SignupRequest,
) -> AppResult<ApiResponse<SignupResponse>> {
    let SignupRequest {
        email,
        username,
        password,
        role,
    } = payload;

    if role != "customer" && role != "vendor" {
        return Err(AppError::BadRequest("role must be customer or vendor".into()));
    }
    if email.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest("email and password are required".into()));
    }

    let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(email.as_str())
        .fetch_optional(&state.pool)
        .await?;
    if exists.is_some() {
        return Err(AppError::BadRequest("Email is already taken".into()));
    }

    let password_hash = hash_password(&password)?;
    let user_id = Uuid::new_v4();

    let txn = state.orm.begin().await?;

    UserActive {
        id: Set(user_id),
        email: Set(email.clone()),
        username: Set(username.clone()),
        password_hash: Set(password_hash),
        is_staff: Set(false),
        is_superuser: Set(false),
        date_joined: NotSet,
    }
    .insert(&txn)
    .await?;

    ProfileActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        role: Set(role.clone()),
        address: Set(String::new()),
        phone: Set(String::new()),
    }
    .insert(&txn)
    .await?;

    if role == "vendor" {
        VendorActive {
            id: Set(Uuid::new_v4()),
            title: Set(username.clone()),
            image: Set("default.jpg".into()),
            description: Set(None),
            address: Set(String::new()),
            contact: Set(String::new()),
            user_id: Set(Some(user_id)),
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    audit::record(
        &state.pool,
        Some(user_id),
        "user_signup",
        Some("users"),
        Some(serde_json::json!({ "user_id": user_id, "role": role })),
    )
    .await;

    let user = fetch_user_by_email(state, &email).await?.ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("user missing right after signup"))
    })?;

    Ok(ApiResponse::success(
        "User created",
        SignupResponse {
            user: user_view(user),
        },
        None,
    ))
}

pub async fn request_otp(
    state: &AppState,
    payload: RequestOtpRequest,
) -> AppResult<ApiResponse<RequestOtpResponse>> {
    let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32));

    OtpActive {
        id: Set(Uuid::new_v4()),
        email: Set(payload.email.clone()),
        code: Set(code.clone()),
        is_used: Set(false),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    // Stands in for the mail delivery the deployment wires up.
    tracing::info!(email = %payload.email, "OTP issued");

    let dev_otp = state.config.expose_dev_otp.then_some(code);
    Ok(ApiResponse::success(
        "OTP sent",
        RequestOtpResponse {
            detail: "OTP sent".into(),
            dev_otp,
        },
        None,
    ))
}

pub async fn login_with_otp(
    state: &AppState,
    payload: OtpLoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let otp = Otps::find()
        .filter(OtpCol::Email.eq(payload.email.as_str()))
        .filter(OtpCol::Code.eq(payload.otp.as_str()))
        .filter(OtpCol::IsUsed.eq(false))
        .order_by_desc(OtpCol::CreatedAt)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid or expired OTP".into()))?;

    let age = Utc::now() - otp.created_at.with_timezone(&Utc);
    if age > Duration::minutes(OTP_EXPIRY_MINUTES) {
        return Err(AppError::BadRequest("Invalid or expired OTP".into()));
    }

    // Single use: burn the code inside the success path.
    let mut active: OtpActive = otp.into();
    active.is_used = Set(true);
    active.update(&state.orm).await?;

    let user = fetch_user_by_email(state, &payload.email)
        .await?
        .ok_or_else(|| AppError::BadRequest("No account for this email".into()))?;

    finish_login(state, user).await
}

pub async fn login_with_password(
    state: &AppState,
    payload: PasswordLoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let user = fetch_user_by_email(state, &payload.email)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid email or password".into()))?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;
    if Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::BadRequest("Invalid email or password".into()));
    }

    finish_login(state, user).await
}

pub async fn refresh(
    state: &AppState,
    payload: RefreshRequest,
) -> AppResult<ApiResponse<RefreshResponse>> {
    let decoded = decode::<Claims>(
        &payload.refresh,
        &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired refresh token".into()))?;

    if decoded.claims.kind != "refresh" {
        return Err(AppError::Unauthorized("Not a refresh token".into()));
    }

    let access = issue_token(
        &state.config.jwt_secret,
        &decoded.claims.sub,
        &decoded.claims.role,
        decoded.claims.staff,
        "access",
        Duration::hours(ACCESS_TTL_HOURS),
    )?;

    Ok(ApiResponse::success(
        "Token refreshed",
        RefreshResponse { access },
        None,
    ))
}

async fn finish_login(state: &AppState, user: AuthRow) -> AppResult<ApiResponse<LoginResponse>> {
    let is_staff = user.is_staff || user.is_superuser;
    let sub = user.id.to_string();

    let access = issue_token(
        &state.config.jwt_secret,
        &sub,
        &user.role,
        is_staff,
        "access",
        Duration::hours(ACCESS_TTL_HOURS),
    )?;
    let refresh = issue_token(
        &state.config.jwt_secret,
        &sub,
        &user.role,
        is_staff,
        "refresh",
        Duration::days(REFRESH_TTL_DAYS),
    )?;

    audit::record(
        &state.pool,
        Some(user.id),
        "user_login",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse {
            tokens: TokenPair { access, refresh },
            role: user.role,
        },
        None,
    ))
}

/// Staff-only account directory, newest first.
pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();

    let items = sqlx::query_as::<_, UserView>(
        r#"
        SELECT u.id, u.email, u.username, u.is_staff, u.is_superuser, u.date_joined, p.role
        FROM users u
        JOIN profiles p ON p.user_id = u.id
        ORDER BY u.date_joined DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(&state.pool)
        .await?;

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("Users", UserList { items }, Some(meta)))
}

async fn fetch_user_by_email(state: &AppState, email: &str) -> AppResult<Option<AuthRow>> {
    let row = sqlx::query_as::<_, AuthRow>(
        r#"
        SELECT u.id, u.email, u.username, u.password_hash,
               u.is_staff, u.is_superuser, u.date_joined, p.role
        FROM users u
        JOIN profiles p ON p.user_id = u.id
        WHERE u.email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(&state.pool)
    .await?;
    Ok(row)
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

fn issue_token(
    secret: &str,
    sub: &str,
    role: &str,
    staff: bool,
    kind: &str,
    ttl: Duration,
) -> AppResult<String> {
    let exp = (Utc::now() + ttl).timestamp() as usize;
    let claims = Claims {
        sub: sub.to_string(),
        role: role.to_string(),
        staff,
        kind: kind.to_string(),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn user_view(row: AuthRow) -> UserView {
    UserView {
        id: row.id,
        email: row.email,
        username: row.username,
        is_staff: row.is_staff,
        is_superuser: row.is_superuser,
        date_joined: row.date_joined,
        role: row.role,
    }
}
