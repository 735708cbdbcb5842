mod common;

use greenbasket_api::{
    dto::{
        cart::AddToCartRequest,
        orders::{UpdateItemStatusRequest, UpdateOrderStatusRequest},
    },
    entity::products::{ActiveModel as ProductActive, Entity as Products},
    error::AppError,
    services::{cart_service, order_service},
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use uuid::Uuid;

// Flow: customer checks out a cart; the order freezes what the cart saw and
// survives later catalog edits; admin drives the status machine.
#[tokio::test]
async fn checkout_freezes_cart_into_order() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run order flow tests.");
        return Ok(());
    };
    let state = common::setup_state(&database_url).await?;

    let rice = common::create_product(&state, "Basmati Rice 5kg", "50.00").await?;
    let oil = common::create_product(&state, "Olive Oil 1l", "30.00").await?;
    let customer = common::create_user(&state, "buyer@example.com", "customer", false).await?;
    let admin = common::create_user(&state, "admin@example.com", "customer", true).await?;

    cart_service::add_to_cart(
        &state,
        Some(&customer),
        None,
        AddToCartRequest {
            product_id: rice.id,
            quantity: 2,
        },
    )
    .await?;
    cart_service::add_to_cart(
        &state,
        Some(&customer),
        None,
        AddToCartRequest {
            product_id: oil.id,
            quantity: 1,
        },
    )
    .await?;

    let resp = order_service::checkout(&state, &customer, None).await?;
    let created = resp.data.unwrap();
    assert_eq!(created.order.price, Decimal::new(13000, 2));
    assert!(!created.order.paid_status);
    assert_eq!(created.order.order_status, "processing");
    assert_eq!(created.order.invoice_no.len(), 12);
    assert_eq!(
        created.order.invoice_no,
        created.order.invoice_no.to_uppercase()
    );
    assert_eq!(created.items.len(), 2);
    for item in &created.items {
        assert_eq!(item.item_status, "pending");
    }
    let rice_line = created
        .items
        .iter()
        .find(|i| i.product_id == Some(rice.id))
        .unwrap();
    assert_eq!(rice_line.qty, 2);
    assert_eq!(rice_line.total, Decimal::new(10000, 2));

    // Checkout empties the cart inside the same transaction.
    let cart = cart_service::view_cart(&state, Some(&customer), None)
        .await?
        .data
        .unwrap();
    assert!(cart.items.is_empty());

    // A second checkout on the now-empty cart is rejected.
    let again = order_service::checkout(&state, &customer, None).await;
    assert!(matches!(again, Err(AppError::BadRequest(_))));

    // Catalog edits after checkout do not rewrite order history.
    let mut active: ProductActive = rice.clone().into();
    active.title = Set("Renamed Rice".into());
    active.price = Set(Decimal::new(99900, 2));
    active.update(&state.orm).await?;
    Products::delete_by_id(oil.id).exec(&state.orm).await?;

    let resp = order_service::get_order(&state, &customer, created.order.id).await?;
    let fetched = resp.data.unwrap();
    assert_eq!(fetched.order.price, Decimal::new(13000, 2));
    let rice_line = fetched
        .items
        .iter()
        .find(|i| i.product_id == Some(rice.id))
        .unwrap();
    assert_eq!(rice_line.title, "Basmati Rice 5kg");
    assert_eq!(rice_line.price, Decimal::new(5000, 2));
    let oil_line = fetched
        .items
        .iter()
        .find(|i| i.title == "Olive Oil 1l")
        .unwrap();
    assert!(oil_line.product_id.is_none());
    assert_eq!(oil_line.total, Decimal::new(3000, 2));

    // Only staff move the order status; the owner cannot.
    let denied = order_service::update_order_status(
        &state,
        &customer,
        created.order.id,
        UpdateOrderStatusRequest {
            order_status: "shipped".into(),
        },
    )
    .await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    let resp = order_service::update_order_status(
        &state,
        &admin,
        created.order.id,
        UpdateOrderStatusRequest {
            order_status: "shipped".into(),
        },
    )
    .await?;
    assert_eq!(resp.data.unwrap().order_status, "shipped");

    let bad = order_service::update_order_status(
        &state,
        &admin,
        created.order.id,
        UpdateOrderStatusRequest {
            order_status: "teleported".into(),
        },
    )
    .await;
    assert!(matches!(bad, Err(AppError::BadRequest(_))));

    let resp = order_service::update_item_status(
        &state,
        &admin,
        created.order.id,
        UpdateItemStatusRequest {
            item_id: rice_line.id,
            item_status: "packed".into(),
        },
    )
    .await?;
    assert_eq!(resp.data.unwrap().item_status, "packed");

    // A cart line with no attached product aborts the whole checkout:
    // no order is written and every cart line survives the rollback.
    cart_service::add_to_cart(
        &state,
        Some(&customer),
        None,
        AddToCartRequest {
            product_id: rice.id,
            quantity: 1,
        },
    )
    .await?;
    let cart = cart_service::view_cart(&state, Some(&customer), None)
        .await?
        .data
        .unwrap();
    sqlx::query(
        r#"
        INSERT INTO cart_items (id, cart_id, product_id, quantity, price_snapshot)
        VALUES ($1, $2, NULL, 1, $3)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(cart.id)
    .bind(Decimal::new(500, 2))
    .execute(&state.pool)
    .await?;

    let orders_before: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
        .fetch_one(&state.pool)
        .await?;

    let orphaned = order_service::checkout(&state, &customer, None).await;
    assert!(matches!(orphaned, Err(AppError::BadRequest(_))));

    let orders_after: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(orders_after.0, orders_before.0);

    let lines: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cart_items WHERE cart_id = $1")
        .bind(cart.id)
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(lines.0, 2);

    Ok(())
}
