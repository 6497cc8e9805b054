mod common;

use common::{dec, dec_str, spawn_app};
use reqwest::StatusCode;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set};
use serde_json::{json, Value};
use storefront::entities::session;

#[tokio::test]
async fn test_cart_totals_for_two_units() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let category = app.create_category(&admin, "Bread").await;
    let product = app.create_product(&admin, category, "Baranka", "100000").await;

    let user = app.user_token().await;
    assert_eq!(app.add_to_cart(&user, product, 2, false).await, StatusCode::OK);

    let cart = app.cart(&user).await;
    assert_eq!(cart["total_item_count"], 2);
    assert_eq!(dec(&cart["total_price"]), dec_str("238000.00"));
    assert_eq!(dec(&cart["subtotal"]), dec_str("200000.00"));
    assert_eq!(dec(&cart["tax_total"]), dec_str("38000.00"));
    assert_eq!(cart["total_price"], "238000.00");

    let item = &cart["items"][0];
    assert_eq!(item["product_id"], product);
    assert_eq!(dec(&item["price"]), dec_str("119000"));
    assert_eq!(dec(&item["tax_amount"]), dec_str("19000"));
}

#[tokio::test]
async fn test_cart_accumulates_and_overrides() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let category = app.create_category(&admin, "Bread").await;
    let product = app.create_product(&admin, category, "Baranka", "10").await;
    let user = app.user_token().await;

    app.add_to_cart(&user, product, 2, false).await;
    app.add_to_cart(&user, product, 3, false).await;
    let cart = app.cart(&user).await;
    assert_eq!(cart["items"][0]["quantity"], 5);

    app.add_to_cart(&user, product, 1, true).await;
    let cart = app.cart(&user).await;
    assert_eq!(cart["items"][0]["quantity"], 1);
    assert_eq!(cart["total_item_count"], 1);
}

#[tokio::test]
async fn test_cart_rejects_bad_requests() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let category = app.create_category(&admin, "Bread").await;
    let product = app.create_product(&admin, category, "Baranka", "10").await;
    let user = app.user_token().await;

    assert_eq!(
        app.add_to_cart(&user, product, 0, false).await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        app.add_to_cart(&user, product, 21, false).await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        app.add_to_cart(&user, 9999, 1, false).await,
        StatusCode::NOT_FOUND
    );

    let response = app
        .client
        .get(app.url("/api/cart"))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cart_keeps_first_price_snapshot() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let category = app.create_category(&admin, "Bread").await;
    let product = app.create_product(&admin, category, "Baranka", "100").await;
    let user = app.user_token().await;

    app.add_to_cart(&user, product, 1, false).await;

    let response = app
        .patch(&format!("/api/admin/product/{product}"), &admin)
        .json(&json!({ "unit_price": "200" }))
        .send()
        .await
        .expect("Failed to send patch request");
    assert_eq!(response.status(), StatusCode::OK);

    app.add_to_cart(&user, product, 1, false).await;
    let cart = app.cart(&user).await;
    let item = &cart["items"][0];
    assert_eq!(item["quantity"], 2);
    assert_eq!(dec(&item["price"]), dec_str("119.00"));
    assert_eq!(dec(&cart["total_price"]), dec_str("238.00"));
    // Subtotals follow the live catalog price.
    assert_eq!(dec(&item["unit_price"]), dec_str("200.00"));
    assert_eq!(dec(&cart["subtotal"]), dec_str("400.00"));
}

#[tokio::test]
async fn test_cart_remove_and_clear() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let category = app.create_category(&admin, "Bread").await;
    let first = app.create_product(&admin, category, "Baranka", "10").await;
    let second = app.create_product(&admin, category, "Sushka", "20").await;
    let user = app.user_token().await;

    app.add_to_cart(&user, first, 1, false).await;

    // Removing a product that is not in the cart changes nothing.
    let response = app
        .delete(&format!("/api/cart/{second}"), &user)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.cart(&user).await["total_item_count"], 1);

    let response = app.delete("/api/cart/9999", &user).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    app.add_to_cart(&user, second, 2, false).await;
    let response = app
        .delete(&format!("/api/cart/{first}"), &user)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cart = app.cart(&user).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
    assert_eq!(cart["items"][0]["product_id"], second);

    let response = app.delete("/api/cart", &user).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cart = app.cart(&user).await;
    assert_eq!(cart["total_item_count"], 0);
    assert_eq!(dec(&cart["total_price"]), dec_str("0"));
}

#[tokio::test]
async fn test_cart_prunes_unavailable_products() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let category = app.create_category(&admin, "Bread").await;
    let kept = app.create_product(&admin, category, "Baranka", "100000").await;
    let hidden = app.create_product(&admin, category, "Sushka", "50").await;
    let deleted = app.create_product(&admin, category, "Bublik", "70").await;
    let user = app.user_token().await;

    app.add_to_cart(&user, kept, 2, false).await;
    app.add_to_cart(&user, hidden, 1, false).await;
    app.add_to_cart(&user, deleted, 3, false).await;

    let response = app
        .patch(&format!("/api/admin/product/{hidden}"), &admin)
        .json(&json!({ "is_active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = app
        .delete(&format!("/api/admin/product/{deleted}"), &admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let cart = app.cart(&user).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
    assert_eq!(cart["total_item_count"], 2);
    assert_eq!(dec(&cart["total_price"]), dec_str("238000.00"));
    assert_eq!(dec(&cart["total"]), dec_str("238000.00"));
}

#[tokio::test]
async fn test_cart_skips_corrupt_entries() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let category = app.create_category(&admin, "Bread").await;
    let product = app.create_product(&admin, category, "Baranka", "100000").await;
    let user = app.user_token().await;

    app.add_to_cart(&user, product, 2, false).await;

    let stored = session::Entity::find()
        .one(&app.db)
        .await
        .unwrap()
        .expect("Session row missing");
    let mut data: Value = serde_json::from_str(&stored.data).unwrap();
    data["cart"]["not-a-number"] = json!({ "quantity": 1, "price": "1.00" });
    data["cart"]["4242"] = json!({ "quantity": "many", "price": "1.00" });
    data["cart"]["4343"] = json!({ "quantity": 1, "price": "cheap" });
    let mut active = stored.into_active_model();
    active.data = Set(data.to_string());
    active.update(&app.db).await.unwrap();

    let cart = app.cart(&user).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
    assert_eq!(cart["total_item_count"], 2);
    assert_eq!(dec(&cart["total_price"]), dec_str("238000.00"));

    // The cart stays usable after the bad entries were dropped.
    assert_eq!(app.add_to_cart(&user, product, 1, false).await, StatusCode::OK);
    assert_eq!(app.cart(&user).await["total_item_count"], 3);
}

#[tokio::test]
async fn test_carts_are_per_session() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let category = app.create_category(&admin, "Bread").await;
    let product = app.create_product(&admin, category, "Baranka", "10").await;

    let first = app.user_token().await;
    app.add_to_cart(&first, product, 2, false).await;

    let second = app.user_token().await;
    assert_eq!(app.cart(&second).await["total_item_count"], 0);
    assert_eq!(app.cart(&first).await["total_item_count"], 2);
}
