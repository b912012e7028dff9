mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use bloomshop_api::{entities::user::UserRole, services::cart::AddToCartInput};
use common::TestApp;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app
        .router
        .clone()
        .oneshot(request)
        .await
        .expect("router error");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn json_request(method: Method, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn register_login_me_roundtrip() {
    let app = TestApp::new().await;

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/register",
            None,
            json!({
                "username": "daisy",
                "email": "daisy@example.com",
                "password": "petals123",
                "phone": "012345678"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert!(body["token"].as_str().is_some());

    // Duplicate email conflicts.
    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/register",
            None,
            json!({
                "username": "daisy2",
                "email": "daisy@example.com",
                "password": "petals123"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/login",
            None,
            json!({"email": "daisy@example.com", "password": "petals123"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, get_request("/api/auth/me", Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["email"], "daisy@example.com");
}

#[tokio::test]
async fn login_failure_is_generic() {
    let app = TestApp::new().await;
    let user = app.seed_user(UserRole::Customer).await;

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/login",
            None,
            json!({"email": user.email, "password": "wrong-password"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let message = body["message"].as_str().unwrap_or_default();
    assert!(
        message.contains("Invalid email or password"),
        "credential failures must not reveal which part was wrong: {message}"
    );

    // Unknown email yields the same response.
    let (status2, body2) = send(
        &app,
        json_request(
            Method::POST,
            "/api/auth/login",
            None,
            json!({"email": "nobody@example.com", "password": "wrong-password"}),
        ),
    )
    .await;
    assert_eq!(status2, status);
    assert_eq!(body2["message"], body["message"]);
}

#[tokio::test]
async fn catalog_is_public_but_cart_is_not() {
    let app = TestApp::new().await;
    app.seed_flower("Sunflower Jar", dec!(8.00), 5).await;

    let (status, body) = send(&app, get_request("/api/flowers", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let user = app.seed_user(UserRole::Customer).await;
    let (status, _) = send(&app, get_request(&format!("/api/cart/{}", user.id), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn users_cannot_read_each_others_resources() {
    let app = TestApp::new().await;
    let alice = app.seed_user(UserRole::Customer).await;
    let bob = app.seed_user(UserRole::Customer).await;
    let alice_token = app.token_for(&alice);

    let (status, _) = send(
        &app,
        get_request(&format!("/api/orders/{}", bob.id), Some(&alice_token)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Admins may read anyone's.
    let admin = app.seed_user(UserRole::Admin).await;
    let admin_token = app.token_for(&admin);
    let (status, _) = send(
        &app,
        get_request(&format!("/api/orders/{}", bob.id), Some(&admin_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admin_routes_require_the_admin_role() {
    let app = TestApp::new().await;
    let customer = app.seed_user(UserRole::Customer).await;
    let admin = app.seed_user(UserRole::Admin).await;

    let (status, _) = send(&app, get_request("/api/admin/orders", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        get_request("/api/admin/orders", Some(&app.token_for(&customer))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        get_request("/api/admin/orders", Some(&app.token_for(&admin))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn http_checkout_creates_an_order() {
    let app = TestApp::new().await;
    let user = app.seed_user(UserRole::Customer).await;
    let token = app.token_for(&user);
    let address = app.seed_address(user.id).await;
    let rose = app.seed_flower("Red Rose Bouquet", dec!(10.00), 20).await;

    app.state
        .services
        .cart
        .add_item(
            user.id,
            AddToCartInput {
                flower_id: rose.id,
                quantity: 2,
            },
        )
        .await
        .unwrap();

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/orders",
            Some(&token),
            json!({
                "user_id": user.id,
                "shipping_address_id": address.id,
                "cart_items": [{"flower_id": rose.id, "quantity": 2, "unit_price": "10.00"}],
                "total_price": "20.00"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    let order_id = body["order_id"].as_str().expect("order id in response");

    // The order shows up in the user's history with its line items.
    let (status, body) = send(
        &app,
        get_request(&format!("/api/orders/{}", user.id), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let orders = body["data"].as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["order"]["id"], order_id);
    assert_eq!(orders[0]["items"].as_array().unwrap().len(), 1);

    // And the cart badge is back to zero.
    let (status, body) = send(
        &app,
        get_request(&format!("/api/cart/cart-quantity/{}", user.id), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], 0);
}

#[tokio::test]
async fn admin_moves_order_and_payment_status_over_http() {
    let app = TestApp::new().await;
    let user = app.seed_user(UserRole::Customer).await;
    let admin = app.seed_user(UserRole::Admin).await;
    let admin_token = app.token_for(&admin);
    let address = app.seed_address(user.id).await;
    let rose = app.seed_flower("Red Rose Bouquet", dec!(10.00), 20).await;

    app.state
        .services
        .cart
        .add_item(
            user.id,
            AddToCartInput {
                flower_id: rose.id,
                quantity: 1,
            },
        )
        .await
        .unwrap();
    let (_, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/orders",
            Some(&app.token_for(&user)),
            json!({
                "user_id": user.id,
                "shipping_address_id": address.id,
                "cart_items": [{"flower_id": rose.id, "quantity": 1, "unit_price": "10.00"}]
            }),
        ),
    )
    .await;
    let order_id = body["order_id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        json_request(
            Method::PUT,
            &format!("/api/admin/orders/{}/status", order_id),
            Some(&admin_token),
            json!({"status": "shipped"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["order_status"], "shipped");

    let (status, body) = send(
        &app,
        json_request(
            Method::PUT,
            &format!("/api/admin/orders/{}/payment-status", order_id),
            Some(&admin_token),
            json!({"payment_status": "completed"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["payment_status"], "completed");

    // An out-of-enum value is rejected at deserialization.
    let (status, _) = send(
        &app,
        json_request(
            Method::PUT,
            &format!("/api/admin/orders/{}/status", order_id),
            Some(&admin_token),
            json!({"status": "teleported"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn admin_flower_crud_over_http() {
    let app = TestApp::new().await;
    let admin = app.seed_user(UserRole::Admin).await;
    let token = app.token_for(&admin);

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/admin/flowers",
            Some(&token),
            json!({
                "name": "Orchid Plant",
                "description": "Potted phalaenopsis",
                "price": "30.00",
                "stock": 4,
                "category": "orchids"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let flower_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        json_request(
            Method::PUT,
            &format!("/api/admin/flowers/{}", flower_id),
            Some(&token),
            json!({
                "name": "Orchid Plant",
                "description": "Potted phalaenopsis",
                "price": "27.50",
                "stock": 3,
                "category": "orchids"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stock"], 3);

    let (status, _) = send(
        &app,
        Request::builder()
            .method(Method::DELETE)
            .uri(format!("/api/admin/flowers/{}", flower_id))
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, get_request(&format!("/api/flowers/{}", flower_id), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
