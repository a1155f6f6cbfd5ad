//! The request/response boundary between the client core and the gateway.

mod http;

#[cfg(test)]
pub(crate) mod fake;

use std::sync::Arc;

use async_trait::async_trait;

use swapmeet_types::api::{AuthResponse, LoginRequest, RegisterRequest};
use swapmeet_types::models::{NewProduct, Product};

use crate::MarketError;

pub use http::HttpMarketApi;

/// Gateway operations the catalog and session depend on.
#[async_trait]
pub trait MarketApi: Send + Sync {
    /// Every listing in server order.
    async fn list_products(&self) -> Result<Vec<Product>, MarketError>;

    /// `Ok(None)` when the gateway reports the product as not found.
    async fn get_product(&self, id: &str) -> Result<Option<Product>, MarketError>;

    /// Submit a listing under the account that owns `token`.
    async fn create_product(&self, token: &str, product: &NewProduct)
    -> Result<Product, MarketError>;

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, MarketError>;

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, MarketError>;
}

#[async_trait]
impl<T: MarketApi + ?Sized> MarketApi for Arc<T> {
    async fn list_products(&self) -> Result<Vec<Product>, MarketError> {
        (**self).list_products().await
    }

    async fn get_product(&self, id: &str) -> Result<Option<Product>, MarketError> {
        (**self).get_product(id).await
    }

    async fn create_product(
        &self,
        token: &str,
        product: &NewProduct,
    ) -> Result<Product, MarketError> {
        (**self).create_product(token, product).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, MarketError> {
        (**self).login(request).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, MarketError> {
        (**self).register(request).await
    }
}
