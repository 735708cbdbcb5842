mod common;

use greenbasket_api::{
    dto::addresses::{CreateAddressRequest, UpdateAddressRequest},
    error::AppError,
    services::address_service,
};
use uuid::Uuid;

// However the default is assigned, at most one address per user carries it.
#[tokio::test]
async fn default_address_is_exclusive() -> anyhow::Result<()> {
    let Some(database_url) = common::database_url() else {
        eprintln!(
            "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run address flow tests."
        );
        return Ok(());
    };
    let state = common::setup_state(&database_url).await?;

    let user = common::create_user(&state, "resident@example.com", "customer", false).await?;
    let other = common::create_user(&state, "neighbour@example.com", "customer", false).await?;

    let home = address_service::create_address(
        &state,
        &user,
        CreateAddressRequest {
            address: "12 Garden Lane".into(),
            is_default: true,
        },
    )
    .await?
    .data
    .unwrap();
    assert!(home.is_default);

    let office = address_service::create_address(
        &state,
        &user,
        CreateAddressRequest {
            address: "4th Floor, Tech Park".into(),
            is_default: false,
        },
    )
    .await?
    .data
    .unwrap();
    assert!(!office.is_default);

    // Switching the default unsets the previous one in the same transaction.
    let office = address_service::set_default_address(&state, &user, office.id)
        .await?
        .data
        .unwrap();
    assert!(office.is_default);

    let items = address_service::list_addresses(&state, &user)
        .await?
        .data
        .unwrap()
        .items;
    assert_eq!(items.len(), 2);
    assert_eq!(items.iter().filter(|a| a.is_default).count(), 1);
    assert!(!items.iter().find(|a| a.id == home.id).unwrap().is_default);

    // Creating another default address also flips the flag over.
    let cabin = address_service::create_address(
        &state,
        &user,
        CreateAddressRequest {
            address: "Hillside Cabin 7".into(),
            is_default: true,
        },
    )
    .await?
    .data
    .unwrap();
    assert!(cabin.is_default);
    let items = address_service::list_addresses(&state, &user)
        .await?
        .data
        .unwrap()
        .items;
    assert_eq!(items.iter().filter(|a| a.is_default).count(), 1);

    // Another user's addresses are invisible, and empty payloads are rejected.
    let foreign = address_service::update_address(
        &state,
        &other,
        home.id,
        UpdateAddressRequest {
            address: Some("Hijacked".into()),
        },
    )
    .await;
    assert!(matches!(foreign, Err(AppError::NotFound)));

    let blank = address_service::create_address(
        &state,
        &user,
        CreateAddressRequest {
            address: "   ".into(),
            is_default: false,
        },
    )
    .await;
    assert!(matches!(blank, Err(AppError::BadRequest(_))));

    let missing = address_service::delete_address(&state, &user, Uuid::new_v4()).await;
    assert!(matches!(missing, Err(AppError::NotFound)));

    // The other user's own list is untouched by all of the above.
    let items = address_service::list_addresses(&state, &other)
        .await?
        .data
        .unwrap()
        .items;
    assert!(items.is_empty());

    Ok(())
}
