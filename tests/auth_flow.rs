mod common;

use greenbasket_api::{
    dto::auth::{
        OtpLoginRequest, PasswordLoginRequest, RefreshRequest, RequestOtpRequest, SignupRequest,
    },
    error::AppError,
    routes::params::Pagination,
    services::auth_service,
};
use uuid::Uuid;

// Flow: signup -> OTP login -> password login -> refresh; vendor signup also
// provisions the vendor record.
#[tokio::test]
async fn signup_and_login_paths() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run auth flow tests.");
        return Ok(());
    };
    let state = common::setup_state(&database_url).await?;

    let resp = auth_service::signup(
        &state,
        SignupRequest {
            email: "new@example.com".into(),
            username: "newbie".into(),
            password: "hunter2hunter2".into(),
            role: "customer".into(),
        },
    )
    .await?;
    let user = resp.data.unwrap().user;
    assert_eq!(user.role, "customer");
    assert!(!user.is_staff);

    // Same email twice is rejected.
    let dup = auth_service::signup(
        &state,
        SignupRequest {
            email: "new@example.com".into(),
            username: "newbie2".into(),
            password: "hunter2hunter2".into(),
            role: "customer".into(),
        },
    )
    .await;
    assert!(matches!(dup, Err(AppError::BadRequest(_))));

    // Admin is a staff flag, never a signup role.
    let bad_role = auth_service::signup(
        &state,
        SignupRequest {
            email: "sneaky@example.com".into(),
            username: "sneaky".into(),
            password: "hunter2hunter2".into(),
            role: "admin".into(),
        },
    )
    .await;
    assert!(matches!(bad_role, Err(AppError::BadRequest(_))));

    // Vendor signup provisions the vendor record up front.
    auth_service::signup(
        &state,
        SignupRequest {
            email: "stall@example.com".into(),
            username: "stallholder".into(),
            password: "hunter2hunter2".into(),
            role: "vendor".into(),
        },
    )
    .await?;
    let vendor_rows: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM vendors v JOIN users u ON v.user_id = u.id WHERE u.email = $1",
    )
    .bind("stall@example.com")
    .fetch_one(&state.pool)
    .await?;
    assert_eq!(vendor_rows.0, 1);

    // OTP round trip; the test config echoes the code back.
    let otp = auth_service::request_otp(
        &state,
        RequestOtpRequest {
            email: "new@example.com".into(),
        },
    )
    .await?
    .data
    .unwrap()
    .dev_otp
    .expect("dev otp exposed in test config");
    assert_eq!(otp.len(), 6);

    let login = auth_service::login_with_otp(
        &state,
        OtpLoginRequest {
            email: "new@example.com".into(),
            otp: otp.clone(),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(login.role, "customer");

    // Codes are single use.
    let reuse = auth_service::login_with_otp(
        &state,
        OtpLoginRequest {
            email: "new@example.com".into(),
            otp,
        },
    )
    .await;
    assert!(matches!(reuse, Err(AppError::BadRequest(_))));

    let login = auth_service::login_with_password(
        &state,
        PasswordLoginRequest {
            email: "new@example.com".into(),
            password: "hunter2hunter2".into(),
        },
    )
    .await?
    .data
    .unwrap();

    let wrong = auth_service::login_with_password(
        &state,
        PasswordLoginRequest {
            email: "new@example.com".into(),
            password: "wrong".into(),
        },
    )
    .await;
    assert!(matches!(wrong, Err(AppError::BadRequest(_))));

    // Refresh accepts only refresh tokens.
    let refreshed = auth_service::refresh(
        &state,
        RefreshRequest {
            refresh: login.tokens.refresh.clone(),
        },
    )
    .await?;
    assert!(refreshed.data.unwrap().access.contains('.'));

    let wrong_kind = auth_service::refresh(
        &state,
        RefreshRequest {
            refresh: login.tokens.access,
        },
    )
    .await;
    assert!(matches!(wrong_kind, Err(AppError::Unauthorized(_))));

    let garbage = auth_service::refresh(
        &state,
        RefreshRequest {
            refresh: format!("not-a-token-{}", Uuid::new_v4()),
        },
    )
    .await;
    assert!(matches!(garbage, Err(AppError::Unauthorized(_))));

    // The account directory is staff-only.
    let staff = common::create_user(&state, "desk@example.com", "customer", true).await?;
    let listed = auth_service::list_users(
        &state,
        &staff,
        Pagination {
            page: None,
            per_page: None,
        },
    )
    .await?;
    let users = listed.data.unwrap();
    assert!(users.items.iter().any(|u| u.email == "new@example.com"));
    assert!(users.items.iter().any(|u| u.email == "stall@example.com"));
    assert_eq!(
        listed.meta.unwrap().total,
        Some(users.items.len() as i64)
    );

    let customer = common::create_user(&state, "plain@example.com", "customer", false).await?;
    let denied = auth_service::list_users(
        &state,
        &customer,
        Pagination {
            page: None,
            per_page: None,
        },
    )
    .await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    Ok(())
}
