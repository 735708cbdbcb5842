use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use greenbasket_api::{config::AppConfig, db::create_pool};
use rust_decimal::Decimal;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    // Admin capability is the staff flag; the profile role stays in the
    // customer/vendor domain.
    let admin_id = ensure_user(&pool, "admin@greenbasket.dev", "admin123", "customer", true).await?;
    let vendor_user_id =
        ensure_user(&pool, "vendor@greenbasket.dev", "vendor123", "vendor", false).await?;
    ensure_user(
        &pool,
        "customer@greenbasket.dev",
        "customer123",
        "customer",
        false,
    )
    .await?;

    let category_id = ensure_category(&pool, "Groceries").await?;
    let vendor_id = ensure_vendor(&pool, vendor_user_id, "Green Basket Farms").await?;
    seed_products(&pool, vendor_id, category_id).await?;

    println!("Seed completed. Admin ID: {admin_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
    is_staff: bool,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = existing {
        println!("User {email} already present");
        return Ok(id);
    }

    let user_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO users (id, email, username, password_hash, is_staff, is_superuser)
        VALUES ($1, $2, $3, $4, $5, FALSE)
        "#,
    )
    .bind(user_id)
    .bind(email)
    .bind(email.split('@').next().unwrap_or(email))
    .bind(password_hash)
    .bind(is_staff)
    .execute(pool)
    .await?;

    sqlx::query("INSERT INTO profiles (id, user_id, role) VALUES ($1, $2, $3)")
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(role)
        .execute(pool)
        .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn ensure_category(pool: &sqlx::PgPool, title: &str) -> anyhow::Result<Uuid> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM categories WHERE title = $1")
        .bind(title)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = existing {
        return Ok(id);
    }

    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO categories (id, title) VALUES ($1, $2)")
        .bind(id)
        .bind(title)
        .execute(pool)
        .await?;
    Ok(id)
}

async fn ensure_vendor(pool: &sqlx::PgPool, user_id: Uuid, title: &str) -> anyhow::Result<Uuid> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM vendors WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    if let Some((id,)) = existing {
        return Ok(id);
    }

    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO vendors (id, title, user_id) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(title)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(id)
}

async fn seed_products(
    pool: &sqlx::PgPool,
    vendor_id: Uuid,
    category_id: Uuid,
) -> anyhow::Result<()> {
    let products = [
        ("Organic Bananas", "FreshFarm", "129.00"),
        ("Basmati Rice 5kg", "Daawat", "550.00"),
        ("Cold Pressed Olive Oil", "Figaro", "899.00"),
        ("Whole Wheat Atta 10kg", "Aashirvaad", "475.00"),
    ];

    for (idx, (title, brand, price)) in products.iter().enumerate() {
        let sku = format!("seed{idx:04}");
        let price: Decimal = price.parse()?;
        sqlx::query(
            r#"
            INSERT INTO products (id, title, brand, price, sku, vendor_id, category_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (sku) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(brand)
        .bind(price)
        .bind(sku)
        .bind(vendor_id)
        .bind(category_id)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
