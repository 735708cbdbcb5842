#![allow(dead_code)]

use greenbasket_api::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    entity::{
        products::{ActiveModel as ProductActive, Model as ProductModel},
        profiles::ActiveModel as ProfileActive,
        users::ActiveModel as UserActive,
    },
    middleware::auth::AuthUser,
    state::AppState,
};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use uuid::Uuid;

/// Integration tests need a real Postgres; return None to let callers skip.
pub fn database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
}

pub fn test_config(database_url: &str) -> AppConfig {
    AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "test-secret".into(),
        gateway_key_id: "rzp_test_sandbox".into(),
        gateway_key_secret: "sandbox_secret".into(),
        gateway_currency: "INR".into(),
        gateway_sandbox: true,
        expose_dev_otp: true,
    }
}

pub async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE order_items, orders, payments, cart_items, carts, wishlist_items, \
         addresses, audit_logs, product_tags, product_images, products, vendors, tags, \
         categories, otps, profiles, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(AppState::new(pool, orm, test_config(database_url)))
}

pub async fn create_user(
    state: &AppState,
    email: &str,
    role: &str,
    is_staff: bool,
) -> anyhow::Result<AuthUser> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        username: Set(email.split('@').next().unwrap_or(email).to_string()),
        password_hash: Set("dummy".into()),
        is_staff: Set(is_staff),
        is_superuser: Set(false),
        date_joined: NotSet,
    }
    .insert(&state.orm)
    .await?;

    ProfileActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.id),
        role: Set(role.to_string()),
        address: Set(String::new()),
        phone: Set(String::new()),
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role: role.to_string(),
        is_staff,
    })
}

pub async fn create_product(
    state: &AppState,
    title: &str,
    price: &str,
) -> anyhow::Result<ProductModel> {
    let price: Decimal = price.parse()?;
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        title: Set(title.to_string()),
        brand: Set(None),
        description: Set(None),
        image: Set("default.jpg".into()),
        price: Set(price),
        old_price: Set(None),
        status: Set("active".into()),
        featured: Set(false),
        sku: Set(format!("test{}", &Uuid::new_v4().simple().to_string()[..8])),
        vendor_id: Set(None),
        category_id: Set(None),
        user_id: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(product)
}
