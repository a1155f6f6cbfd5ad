use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use swapmeet_types::api::{
    AuthResponse, LoginRequest, MessageResponse, ProductListResponse, ProductResponse,
    RegisterRequest,
};
use swapmeet_types::models::{NewProduct, Product};

use super::MarketApi;
use crate::{ClientConfig, MarketError};

/// [`MarketApi`] over the REST gateway.
#[derive(Debug, Clone)]
pub struct HttpMarketApi {
    client: Client,
    base_url: String,
}

impl HttpMarketApi {
    pub fn new(config: &ClientConfig) -> Result<Self, MarketError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| MarketError::Transport(format!("Cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl MarketApi for HttpMarketApi {
    async fn list_products(&self) -> Result<Vec<Product>, MarketError> {
        let resp = self
            .client
            .get(format!("{}/products", self.base_url))
            .send()
            .await?;

        let body: ProductListResponse = read_json(resp).await?;
        if !body.success {
            return Err(MarketError::Transport("Failed to fetch products".into()));
        }
        debug!("Fetched {} products", body.products.len());
        Ok(body.products)
    }

    async fn get_product(&self, id: &str) -> Result<Option<Product>, MarketError> {
        let resp = self
            .client
            .get(product_url(&self.base_url, id)?)
            .send()
            .await?;

        match read_json::<ProductResponse>(resp).await {
            Ok(body) if body.success => Ok(body.product),
            Ok(_) => Ok(None),
            Err(MarketError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_product(
        &self,
        token: &str,
        product: &NewProduct,
    ) -> Result<Product, MarketError> {
        let resp = self
            .client
            .post(format!("{}/products", self.base_url))
            .header("Authorization", format!("Bearer {}", token))
            .json(product)
            .send()
            .await?;

        let body: ProductResponse = read_json(resp).await?;
        match body.product {
            Some(product) if body.success => Ok(product),
            _ => Err(MarketError::Transport("Failed to add product".into())),
        }
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, MarketError> {
        let resp = self
            .client
            .post(format!("{}/auth/login", self.base_url))
            .json(request)
            .send()
            .await?;
        read_json(resp).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, MarketError> {
        let resp = self
            .client
            .post(format!("{}/auth/register", self.base_url))
            .json(request)
            .send()
            .await?;
        read_json(resp).await
    }
}

/// `{base}/products/{id}` with `id` percent-encoded as one path segment.
fn product_url(base_url: &str, id: &str) -> Result<Url, MarketError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| MarketError::Transport(format!("Invalid API URL '{}': {}", base_url, e)))?;
    url.path_segments_mut()
        .map_err(|_| MarketError::Transport(format!("Invalid API URL '{}'", base_url)))?
        .pop_if_empty()
        .push("products")
        .push(id);
    Ok(url)
}

/// Decode a success body, or turn a failure status into the matching error
/// using the gateway's `{success:false, message}` body when it has one.
async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, MarketError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json::<T>().await?);
    }

    if status == StatusCode::PAYLOAD_TOO_LARGE {
        return Err(MarketError::ImageTooLarge);
    }

    let message = resp
        .json::<MessageResponse>()
        .await
        .ok()
        .map(|body| body.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("Request failed ({})", status));
    warn!("Gateway answered {}: {}", status, message);

    Err(match status {
        StatusCode::NOT_FOUND => MarketError::NotFound(message),
        StatusCode::UNAUTHORIZED => MarketError::Unauthorized(message),
        _ => MarketError::Transport(message),
    })
}
