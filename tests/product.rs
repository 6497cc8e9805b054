mod common;

use common::{dec, dec_str, spawn_app};
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn test_create_product_computes_prices() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let category = app.create_category(&admin, "Bread").await;

    let response = app
        .post("/api/admin/product", &admin)
        .json(&json!({
            "name": "Baranka",
            "unit_price": "100000",
            "category_id": category
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response.json::<Value>().await.unwrap();
    let product = &body["product"];
    assert_eq!(product["unit_price"], "100000.00");
    assert_eq!(dec(&product["tax_percentage"]), dec_str("19"));
    assert_eq!(dec(&product["tax_amount"]), dec_str("19000.00"));
    assert_eq!(dec(&product["price_with_tax"]), dec_str("119000.00"));
    assert_eq!(product["is_active"], true);
}

#[tokio::test]
async fn test_product_rounding_is_half_up() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let category = app.create_category(&admin, "Bread").await;

    let response = app
        .post("/api/admin/product", &admin)
        .json(&json!({
            "name": "Sushka",
            "unit_price": "0.50",
            "tax_percentage": "5",
            "category_id": category
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response.json::<Value>().await.unwrap();
    assert_eq!(dec(&body["product"]["tax_amount"]), dec_str("0.03"));
    assert_eq!(dec(&body["product"]["price_with_tax"]), dec_str("0.53"));
}

#[tokio::test]
async fn test_create_product_validation() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let category = app.create_category(&admin, "Bread").await;

    let invalid = [
        json!({ "name": "Cheap", "unit_price": "0.001", "category_id": category }),
        json!({ "name": "Free", "unit_price": "0", "category_id": category }),
        json!({ "name": "Taxed", "unit_price": "10", "tax_percentage": "150", "category_id": category }),
        json!({ "name": "Negative", "unit_price": "10", "tax_percentage": "-1", "category_id": category }),
        json!({ "name": "Orphan", "unit_price": "10" }),
        json!({ "name": "", "unit_price": "10", "category_id": category }),
    ];

    for payload in invalid {
        let response = app
            .post("/api/admin/product", &admin)
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{payload}");
    }

    let response = app
        .post("/api/admin/product", &admin)
        .json(&json!({ "name": "Lost", "unit_price": "10", "category_id": 9999 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = app
        .get("/api/admin/product", &admin)
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_patch_product_revalidates_prices() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let category = app.create_category(&admin, "Bread").await;
    let product = app.create_product(&admin, category, "Baranka", "10").await;
    let path = format!("/api/admin/product/{product}");

    let response = app
        .patch(&path, &admin)
        .json(&json!({ "unit_price": "0.001" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .patch(&path, &admin)
        .json(&json!({ "tax_percentage": "101" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .patch(&path, &admin)
        .json(&json!({ "unit_price": "20", "name": "Big baranka" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = app.get(&path, &admin).send().await.unwrap().json::<Value>().await.unwrap();
    assert_eq!(body["name"], "Big baranka");
    assert_eq!(dec(&body["price_with_tax"]), dec_str("23.80"));
}

#[tokio::test]
async fn test_public_catalog_hides_inactive_products() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let bread = app.create_category(&admin, "Bread").await;
    let cakes = app.create_category(&admin, "Cakes").await;
    let baranka = app.create_product(&admin, bread, "Baranka", "10").await;
    let sushka = app.create_product(&admin, bread, "Sushka", "5").await;
    let cake = app.create_product(&admin, cakes, "Napoleon", "30").await;

    let response = app
        .patch(&format!("/api/admin/product/{sushka}"), &admin)
        .json(&json!({ "is_active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = app
        .client
        .get(app.url("/api/product"))
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["pages"], 1);

    let body = app
        .client
        .get(app.url(&format!("/api/product?category={bread}")))
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], baranka);

    let body = app
        .client
        .get(app.url("/api/product?search=Napo"))
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], cake);

    let response = app
        .client
        .get(app.url(&format!("/api/product/{sushka}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .client
        .get(app.url(&format!("/api/product/{baranka}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.json::<Value>().await.unwrap();
    assert_eq!(body["product"]["name"], "Baranka");
    assert!(body["related"].as_array().unwrap().is_empty());

    // The admin listing still shows everything.
    let body = app
        .get("/api/admin/product", &admin)
        .send()
        .await
        .unwrap()
        .json::<Value>()
        .await
        .unwrap();
    assert_eq!(body["items"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_blank_product_name_is_rejected() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let category = app.create_category(&admin, "Bread").await;
    let product = app.create_product(&admin, category, "Baranka", "10").await;
    let path = format!("/api/admin/product/{product}");

    let response = app
        .post("/api/admin/product", &admin)
        .json(&json!({ "name": "   ", "unit_price": "10", "category_id": category }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .patch(&path, &admin)
        .json(&json!({ "name": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = app.get(&path, &admin).send().await.unwrap().json::<Value>().await.unwrap();
    assert_eq!(body["name"], "Baranka");
}
