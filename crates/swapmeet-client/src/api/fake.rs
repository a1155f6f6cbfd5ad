//! In-process gateway used by the unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Notify;

use swapmeet_types::MAX_IMAGE_CHARS;
use swapmeet_types::api::{AuthResponse, LoginRequest, RegisterRequest};
use swapmeet_types::models::{Condition, NewProduct, Owner, Product, ProductStatus, UserInfo};

use super::MarketApi;
use crate::MarketError;

pub(crate) const FAKE_TOKEN: &str = "fake-token";
pub(crate) const FAKE_PASSWORD: &str = "correct-horse-battery";

pub(crate) struct FakeApi {
    products: Mutex<Vec<Product>>,
    offline: AtomicBool,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    list_gate: Option<Notify>,
}

impl FakeApi {
    pub(crate) fn new(products: Vec<Product>) -> Self {
        Self {
            products: Mutex::new(products),
            offline: AtomicBool::new(false),
            list_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            list_gate: None,
        }
    }

    /// `list_products` parks until [`FakeApi::open_gate`] is called.
    pub(crate) fn gated(products: Vec<Product>) -> Self {
        Self {
            list_gate: Some(Notify::new()),
            ..Self::new(products)
        }
    }

    pub(crate) fn open_gate(&self) {
        if let Some(gate) = &self.list_gate {
            gate.notify_one();
        }
    }

    pub(crate) fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<(), MarketError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(MarketError::Transport("Could not reach the server".into()));
        }
        Ok(())
    }

    fn auth_response(&self, username: &str) -> AuthResponse {
        AuthResponse {
            success: true,
            token: FAKE_TOKEN.to_string(),
            user: UserInfo {
                id: format!("user-{}", username),
                username: username.to_string(),
                email: Some(format!("{}@example.com", username)),
            },
        }
    }
}

/// A listing with a distinct title, price and timestamp; `age` in minutes.
pub(crate) fn product(id: &str, age: i64) -> Product {
    Product {
        id: id.to_string(),
        title: format!("Product {}", id),
        description: format!("Description of product {}", id),
        category: "Electronics".to_string(),
        condition: Condition::Good,
        price: 10.0 + age as f64,
        image_url: format!("https://example.com/{}.jpg", id),
        owner: Owner {
            id: Some("seller-1".to_string()),
            username: "seller".to_string(),
        },
        created_at: Utc::now() - Duration::minutes(age),
        status: ProductStatus::Available,
    }
}

#[async_trait]
impl MarketApi for FakeApi {
    async fn list_products(&self) -> Result<Vec<Product>, MarketError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.list_gate {
            gate.notified().await;
        }
        self.check_online()?;
        Ok(self.products.lock().unwrap().clone())
    }

    async fn get_product(&self, id: &str) -> Result<Option<Product>, MarketError> {
        self.check_online()?;
        Ok(self
            .products
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn create_product(
        &self,
        token: &str,
        new: &NewProduct,
    ) -> Result<Product, MarketError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        if token != FAKE_TOKEN {
            return Err(MarketError::Unauthorized("Not authorized, please sign in".into()));
        }
        if new.image_url.len() > MAX_IMAGE_CHARS {
            return Err(MarketError::ImageTooLarge);
        }

        let mut products = self.products.lock().unwrap();
        let product = Product {
            id: format!("server-{}", products.len() + 1),
            title: new.title.clone(),
            description: new.description.clone(),
            category: new.category.clone(),
            condition: new.condition,
            price: new.price,
            image_url: new.image_url.clone(),
            owner: Owner {
                id: Some("user-tester".to_string()),
                username: "tester".to_string(),
            },
            created_at: Utc::now(),
            status: ProductStatus::Available,
        };
        products.insert(0, product.clone());
        Ok(product)
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, MarketError> {
        self.check_online()?;
        if request.password != FAKE_PASSWORD {
            return Err(MarketError::Unauthorized("Invalid username or password".into()));
        }
        Ok(self.auth_response(&request.username))
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, MarketError> {
        self.check_online()?;
        Ok(self.auth_response(&request.username))
    }
}
