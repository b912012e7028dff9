mod common;

use assert_matches::assert_matches;
use bloomshop_api::{
    entities::user::UserRole,
    errors::ServiceError,
    services::cart::AddToCartInput,
    services::catalog::UpdateFlowerInput,
};
use common::TestApp;
use rust_decimal_macros::dec;
use uuid::Uuid;

#[tokio::test]
async fn add_item_captures_the_current_catalog_price() {
    let app = TestApp::new().await;
    let user = app.seed_user(UserRole::Customer).await;
    let tulip = app.seed_flower("Tulip Bundle", dec!(12.50), 10).await;

    let row = app
        .state
        .services
        .cart
        .add_item(
            user.id,
            AddToCartInput {
                flower_id: tulip.id,
                quantity: 2,
            },
        )
        .await
        .unwrap();

    assert_eq!(row.quantity, 2);
    assert_eq!(row.unit_price.round_dp(2), dec!(12.50));
}

#[tokio::test]
async fn repeated_add_merges_into_one_row() {
    let app = TestApp::new().await;
    let user = app.seed_user(UserRole::Customer).await;
    let tulip = app.seed_flower("Tulip Bundle", dec!(12.50), 10).await;
    let cart = &app.state.services.cart;

    cart.add_item(
        user.id,
        AddToCartInput {
            flower_id: tulip.id,
            quantity: 2,
        },
    )
    .await
    .unwrap();

    // Reprice the catalog between the two adds.
    app.state
        .services
        .catalog
        .update_flower(
            tulip.id,
            UpdateFlowerInput {
                name: tulip.name.clone(),
                description: tulip.description.clone(),
                price: dec!(15.00),
                stock: tulip.stock,
                image: tulip.image.clone(),
                category: tulip.category,
            },
        )
        .await
        .unwrap();

    let merged = cart
        .add_item(
            user.id,
            AddToCartInput {
                flower_id: tulip.id,
                quantity: 1,
            },
        )
        .await
        .unwrap();

    // One row, summed quantity, original captured price.
    assert_eq!(merged.quantity, 3);
    assert_eq!(merged.unit_price.round_dp(2), dec!(12.50));
    assert_eq!(cart.item_count(user.id).await.unwrap(), 1);
}

#[tokio::test]
async fn add_item_rejects_unknown_flower_and_bad_quantity() {
    let app = TestApp::new().await;
    let user = app.seed_user(UserRole::Customer).await;
    let tulip = app.seed_flower("Tulip Bundle", dec!(12.50), 10).await;
    let cart = &app.state.services.cart;

    let err = cart
        .add_item(
            user.id,
            AddToCartInput {
                flower_id: Uuid::new_v4(),
                quantity: 1,
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let err = cart
        .add_item(
            user.id,
            AddToCartInput {
                flower_id: tulip.id,
                quantity: 0,
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    assert_eq!(cart.item_count(user.id).await.unwrap(), 0);
}

#[tokio::test]
async fn list_items_joins_the_catalog_record() {
    let app = TestApp::new().await;
    let user = app.seed_user(UserRole::Customer).await;
    let orchid = app.seed_flower("Orchid Plant", dec!(30.00), 4).await;

    app.state
        .services
        .cart
        .add_item(
            user.id,
            AddToCartInput {
                flower_id: orchid.id,
                quantity: 1,
            },
        )
        .await
        .unwrap();

    let lines = app.state.services.cart.list_items(user.id).await.unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].item.flower_id, orchid.id);
    assert_eq!(
        lines[0].flower.as_ref().map(|f| f.name.as_str()),
        Some("Orchid Plant")
    );
}

#[tokio::test]
async fn remove_and_clear_delete_rows() {
    let app = TestApp::new().await;
    let user = app.seed_user(UserRole::Customer).await;
    let rose = app.seed_flower("Red Rose Bouquet", dec!(10.00), 10).await;
    let lily = app.seed_flower("Lily Arrangement", dec!(5.00), 10).await;
    let cart = &app.state.services.cart;

    for flower_id in [rose.id, lily.id] {
        cart.add_item(
            user.id,
            AddToCartInput {
                flower_id,
                quantity: 1,
            },
        )
        .await
        .unwrap();
    }

    cart.remove_item(user.id, rose.id).await.unwrap();
    assert_eq!(cart.item_count(user.id).await.unwrap(), 1);

    // Removing the same row twice is a 404.
    let err = cart.remove_item(user.id, rose.id).await.unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    assert_eq!(cart.clear(user.id).await.unwrap(), 1);
    assert_eq!(cart.item_count(user.id).await.unwrap(), 0);
    assert!(cart.list_items(user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn carts_are_scoped_per_user() {
    let app = TestApp::new().await;
    let alice = app.seed_user(UserRole::Customer).await;
    let bob = app.seed_user(UserRole::Customer).await;
    let rose = app.seed_flower("Red Rose Bouquet", dec!(10.00), 10).await;
    let cart = &app.state.services.cart;

    cart.add_item(
        alice.id,
        AddToCartInput {
            flower_id: rose.id,
            quantity: 3,
        },
    )
    .await
    .unwrap();

    assert_eq!(cart.item_count(alice.id).await.unwrap(), 1);
    assert_eq!(cart.item_count(bob.id).await.unwrap(), 0);

    cart.clear(bob.id).await.unwrap();
    assert_eq!(cart.item_count(alice.id).await.unwrap(), 1);
}
