mod common;

use greenbasket_api::{
    dto::cart::{AddToCartRequest, UpdateCartItemRequest},
    entity::products::ActiveModel as ProductActive,
    error::AppError,
    services::cart_service::{self, MAX_LINE_QUANTITY},
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

// Flow: anonymous shopper builds a cart, signs in, and the session cart folds
// into the user cart exactly once.
#[tokio::test]
async fn anonymous_cart_merges_into_user_cart() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run cart flow tests.");
        return Ok(());
    };
    let state = common::setup_state(&database_url).await?;

    let apples = common::create_product(&state, "Apples 1kg", "50.00").await?;
    let milk = common::create_product(&state, "Milk 1l", "30.00").await?;
    let user = common::create_user(&state, "shopper@example.com", "customer", false).await?;

    // First anonymous add mints a session id.
    let resp = cart_service::add_to_cart(
        &state,
        None,
        None,
        AddToCartRequest {
            product_id: apples.id,
            quantity: 2,
        },
    )
    .await?;
    let cart = resp.data.unwrap();
    let session = cart.session_id.clone().expect("anonymous session id");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 2);
    assert_eq!(cart.items[0].line_total, Decimal::new(10000, 2));

    // Re-adding the same product bumps the existing line instead of adding one.
    let resp = cart_service::add_to_cart(
        &state,
        None,
        Some(&session),
        AddToCartRequest {
            product_id: apples.id,
            quantity: 1,
        },
    )
    .await?;
    let cart = resp.data.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 3);

    cart_service::add_to_cart(
        &state,
        None,
        Some(&session),
        AddToCartRequest {
            product_id: milk.id,
            quantity: 1,
        },
    )
    .await?;

    // A negative delta shrinks the line; hitting zero deletes it.
    let resp = cart_service::view_cart(&state, None, Some(&session)).await?;
    let apples_item = resp
        .data
        .unwrap()
        .items
        .into_iter()
        .find(|i| i.product.as_ref().is_some_and(|p| p.id == apples.id))
        .unwrap();
    let resp = cart_service::update_cart_item(
        &state,
        None,
        Some(&session),
        apples_item.id,
        UpdateCartItemRequest {
            quantity: None,
            delta: Some(-1),
        },
    )
    .await?;
    let cart = resp.data.unwrap();
    let apples_line = cart
        .items
        .iter()
        .find(|i| i.product.as_ref().is_some_and(|p| p.id == apples.id))
        .unwrap();
    assert_eq!(apples_line.quantity, 2);

    // Removing an unknown item is a 404, not a silent no-op.
    let missing = cart_service::remove_cart_item(&state, None, Some(&session), Uuid::new_v4()).await;
    assert!(matches!(missing, Err(AppError::NotFound)));

    // The signed-in user already has milk in their own cart.
    cart_service::add_to_cart(
        &state,
        Some(&user),
        None,
        AddToCartRequest {
            product_id: milk.id,
            quantity: 1,
        },
    )
    .await?;

    // First authenticated request with the session header folds the carts.
    let resp = cart_service::view_cart(&state, Some(&user), Some(&session)).await?;
    let cart = resp.data.unwrap();
    assert!(cart.session_id.is_none());
    assert_eq!(cart.items.len(), 2);
    let milk_line = cart
        .items
        .iter()
        .find(|i| i.product.as_ref().is_some_and(|p| p.id == milk.id))
        .unwrap();
    assert_eq!(milk_line.quantity, 2);
    assert_eq!(cart.total, Decimal::new(16000, 2));

    // Replaying the merge must not double-count: the session cart is gone.
    let resp = cart_service::view_cart(&state, Some(&user), Some(&session)).await?;
    let cart = resp.data.unwrap();
    assert_eq!(cart.total, Decimal::new(16000, 2));

    // A later price change does not rewrite captured snapshots.
    let mut active: ProductActive = apples.clone().into();
    active.price = Set(Decimal::new(9900, 2));
    active.update(&state.orm).await?;

    let resp = cart_service::view_cart(&state, Some(&user), None).await?;
    let cart = resp.data.unwrap();
    let apples_line = cart
        .items
        .iter()
        .find(|i| i.product.as_ref().is_some_and(|p| p.id == apples.id))
        .unwrap();
    assert_eq!(apples_line.price_snapshot, Decimal::new(5000, 2));
    assert_eq!(cart.total, Decimal::new(16000, 2));

    // Quantities are capped; oversized requests are client errors, never a
    // wrapped negative row.
    let crate_of_rice = common::create_product(&state, "Bulk Rice Crate", "10.00").await?;
    let oversized = cart_service::add_to_cart(
        &state,
        Some(&user),
        None,
        AddToCartRequest {
            product_id: crate_of_rice.id,
            quantity: i32::MAX,
        },
    )
    .await;
    assert!(matches!(oversized, Err(AppError::BadRequest(_))));

    let resp = cart_service::add_to_cart(
        &state,
        Some(&user),
        None,
        AddToCartRequest {
            product_id: crate_of_rice.id,
            quantity: MAX_LINE_QUANTITY,
        },
    )
    .await?;
    let full_line = resp
        .data
        .unwrap()
        .items
        .into_iter()
        .find(|i| i.product.as_ref().is_some_and(|p| p.id == crate_of_rice.id))
        .unwrap();
    assert_eq!(full_line.quantity, MAX_LINE_QUANTITY);

    // Re-adding on a full line is rejected instead of overflowing.
    let bump = cart_service::add_to_cart(
        &state,
        Some(&user),
        None,
        AddToCartRequest {
            product_id: crate_of_rice.id,
            quantity: 1,
        },
    )
    .await;
    assert!(matches!(bump, Err(AppError::BadRequest(_))));

    let overflow_delta = cart_service::update_cart_item(
        &state,
        Some(&user),
        None,
        full_line.id,
        UpdateCartItemRequest {
            quantity: None,
            delta: Some(i32::MAX),
        },
    )
    .await;
    assert!(matches!(overflow_delta, Err(AppError::BadRequest(_))));

    let cart = cart_service::view_cart(&state, Some(&user), None)
        .await?
        .data
        .unwrap();
    let line = cart.items.iter().find(|i| i.id == full_line.id).unwrap();
    assert_eq!(line.quantity, MAX_LINE_QUANTITY);

    Ok(())
}
