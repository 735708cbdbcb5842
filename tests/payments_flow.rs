mod common;

use greenbasket_api::{
    dto::{
        cart::AddToCartRequest,
        payments::{CreatePaymentRequest, VerifyPaymentRequest},
    },
    error::AppError,
    services::{cart_service, order_service, payment_service},
};

// Flow: checkout -> gateway intent -> signed callback flips order to paid;
// a tampered callback marks the payment failed and leaves the order alone.
#[tokio::test]
async fn payment_verification_settles_order() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        eprintln!(
            "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run payment flow tests."
        );
        return Ok(());
    };
    let state = common::setup_state(&database_url).await?;

    let hamper = common::create_product(&state, "Festive Hamper", "130.00").await?;
    let customer = common::create_user(&state, "payer@example.com", "customer", false).await?;
    let stranger = common::create_user(&state, "other@example.com", "customer", false).await?;

    cart_service::add_to_cart(
        &state,
        Some(&customer),
        None,
        AddToCartRequest {
            product_id: hamper.id,
            quantity: 1,
        },
    )
    .await?;
    let order = order_service::checkout(&state, &customer, None)
        .await?
        .data
        .unwrap()
        .order;

    // Another user's order id reads as missing, not forbidden.
    let foreign = payment_service::create_intent(
        &state,
        &stranger,
        CreatePaymentRequest { order_id: order.id },
    )
    .await;
    assert!(matches!(foreign, Err(AppError::NotFound)));

    // The charge is the frozen order total in minor units.
    let intent = payment_service::create_intent(
        &state,
        &customer,
        CreatePaymentRequest { order_id: order.id },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(intent.amount, 13_000);
    assert_eq!(intent.currency, "INR");
    assert!(intent.gateway_order_id.starts_with("order_"));

    // Gateway callback with a valid signature settles everything.
    let signature = state.gateway.sign(&intent.gateway_order_id, "pay_abc123");
    let verified = payment_service::verify(
        &state,
        &customer,
        VerifyPaymentRequest {
            payment_id: intent.payment_id,
            gateway_payment_id: "pay_abc123".into(),
            gateway_order_id: intent.gateway_order_id.clone(),
            gateway_signature: signature.clone(),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(verified.status, "success");
    assert_eq!(verified.gateway_payment_id.as_deref(), Some("pay_abc123"));

    let settled = order_service::get_order(&state, &customer, order.id)
        .await?
        .data
        .unwrap()
        .order;
    assert!(settled.paid_status);
    assert_eq!(settled.order_status, "confirmed");

    // Replaying the callback is a no-op, not a double-settle.
    let replay = payment_service::verify(
        &state,
        &customer,
        VerifyPaymentRequest {
            payment_id: intent.payment_id,
            gateway_payment_id: "pay_abc123".into(),
            gateway_order_id: intent.gateway_order_id.clone(),
            gateway_signature: signature,
        },
    )
    .await?;
    assert_eq!(replay.detail, "Payment already verified");

    // Second order with a forged signature.
    cart_service::add_to_cart(
        &state,
        Some(&customer),
        None,
        AddToCartRequest {
            product_id: hamper.id,
            quantity: 2,
        },
    )
    .await?;
    let order2 = order_service::checkout(&state, &customer, None)
        .await?
        .data
        .unwrap()
        .order;
    let intent2 = payment_service::create_intent(
        &state,
        &customer,
        CreatePaymentRequest { order_id: order2.id },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(intent2.amount, 26_000);

    let forged = payment_service::verify(
        &state,
        &customer,
        VerifyPaymentRequest {
            payment_id: intent2.payment_id,
            gateway_payment_id: "pay_evil".into(),
            gateway_order_id: intent2.gateway_order_id.clone(),
            gateway_signature: "deadbeef".into(),
        },
    )
    .await;
    assert!(matches!(forged, Err(AppError::SignatureMismatch)));

    let (status,): (String,) = sqlx::query_as("SELECT status FROM payments WHERE id = $1")
        .bind(intent2.payment_id)
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(status, "failed");

    let untouched = order_service::get_order(&state, &customer, order2.id)
        .await?
        .data
        .unwrap()
        .order;
    assert!(!untouched.paid_status);
    assert_eq!(untouched.order_status, "processing");

    Ok(())
}
