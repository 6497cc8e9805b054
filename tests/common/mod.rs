#![allow(dead_code)]

use reqwest::{Client, RequestBuilder, StatusCode};
use rust_decimal::Decimal;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::{json, Value};
use std::str::FromStr;

use storefront::{build_app, config::AppConfig};

pub const PASSWORD: &str = "Secret15";

pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub db: DatabaseConnection,
}

/// Serves the whole router on an ephemeral port backed by a fresh in-memory
/// database with the `admin` and `user` accounts seeded.
pub async fn spawn_app() -> TestApp {
    let config = AppConfig {
        database_url: "sqlite::memory:".to_string(),
        secret: "test-secret".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        cart_session_key: "cart".to_string(),
        admin_password: Some(PASSWORD.to_string()),
        user_password: Some(PASSWORD.to_string()),
    };

    // A single connection keeps every query on the same in-memory database.
    let mut options = ConnectOptions::new(config.database_url.clone());
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");

    let app = build_app(db.clone(), config)
        .await
        .expect("Failed to build app");

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let address = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server crashed");
    });

    TestApp {
        address,
        client: Client::new(),
        db,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub fn get(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(token)
    }

    pub fn post(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(token)
    }

    pub fn patch(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.patch(self.url(path)).bearer_auth(token)
    }

    pub fn delete(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.delete(self.url(path)).bearer_auth(token)
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let login_response = self
            .client
            .post(self.url("/login"))
            .json(&json!({
                "username": username,
                "password": password
            }))
            .send()
            .await
            .expect("Failed to send login request");

        assert_eq!(login_response.status(), StatusCode::OK);

        let login_body = login_response
            .json::<Value>()
            .await
            .expect("Failed to parse login response JSON");

        login_body["token"]
            .as_str()
            .expect("Token not found in login response")
            .to_string()
    }

    pub async fn admin_token(&self) -> String {
        self.login("admin", PASSWORD).await
    }

    pub async fn user_token(&self) -> String {
        self.login("user", PASSWORD).await
    }

    pub async fn create_category(&self, admin: &str, name: &str) -> i32 {
        let response = self
            .post("/api/admin/category", admin)
            .json(&json!({ "name": name, "description": "Test category" }))
            .send()
            .await
            .expect("Failed to send create category request");
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = response.json::<Value>().await.unwrap();
        body["id"].as_i64().expect("Category id missing") as i32
    }

    pub async fn create_product(
        &self,
        admin: &str,
        category_id: i32,
        name: &str,
        unit_price: &str,
    ) -> i32 {
        let response = self
            .post("/api/admin/product", admin)
            .json(&json!({
                "name": name,
                "description": "A test product",
                "unit_price": unit_price,
                "tax_percentage": "19",
                "category_id": category_id,
                "stock": 5
            }))
            .send()
            .await
            .expect("Failed to send create product request");
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = response.json::<Value>().await.unwrap();
        body["product"]["id"].as_i64().expect("Product id missing") as i32
    }

    pub async fn add_to_cart(&self, token: &str, product_id: i32, quantity: u32, override_quantity: bool) -> StatusCode {
        self.post("/api/cart", token)
            .json(&json!({
                "product_id": product_id,
                "quantity": quantity,
                "override": override_quantity
            }))
            .send()
            .await
            .expect("Failed to send add to cart request")
            .status()
    }

    pub async fn cart(&self, token: &str) -> Value {
        let response = self
            .get("/api/cart", token)
            .send()
            .await
            .expect("Failed to send get cart request");
        assert_eq!(response.status(), StatusCode::OK);
        response.json::<Value>().await.unwrap()
    }
}

pub fn dec(value: &Value) -> Decimal {
    let text = value
        .as_str()
        .unwrap_or_else(|| panic!("Expected a decimal string, got {value}"));
    Decimal::from_str(text).unwrap()
}

pub fn dec_str(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}
