//! Client-local trades: buying moves a product from the catalog into the
//! ledger, selling moves it back as a fresh listing. Nothing here is sent to
//! the gateway and the ledger dies with the session.
//!
//! Lock order is ledger, then catalog. The catalog never takes the ledger
//! lock, so holding both for the duration of a transition keeps it atomic.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{error, info};
use uuid::Uuid;

use swapmeet_types::models::{Owner, Product, ProductStatus, Trade, TradeStatus};

use crate::{CatalogStore, MarketApi, MarketError, Session};

/// Owner name given to listings re-created without a signed-in user.
pub const UNKNOWN_OWNER: &str = "Unknown User";

#[derive(Debug, Default)]
pub struct TradeLedger {
    trades: Mutex<Vec<Trade>>,
}

impl TradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `product_id` through the gateway, then drop it from the local
    /// catalog and record a trade for it.
    pub async fn buy<A: MarketApi>(
        &self,
        catalog: &CatalogStore<A>,
        product_id: &str,
    ) -> Result<Trade, MarketError> {
        let product = catalog
            .get(product_id)
            .await
            .inspect_err(|e| error!("Error resolving product {}: {}", product_id, e))?
            .ok_or_else(|| MarketError::NotFound("Product not found".into()))?;

        let trade = snapshot(&product, product_id, Utc::now());

        let mut trades = self.lock();
        catalog.remove_local(product_id);
        trades.insert(0, trade.clone());

        info!("Bought '{}' as trade {}", trade.product_name, trade.id);
        Ok(trade)
    }

    /// Turn a trade back into an available listing owned by the current
    /// user. The listing gets a new identifier.
    pub fn sell<A: MarketApi>(
        &self,
        catalog: &CatalogStore<A>,
        session: &Session,
        trade_id: &str,
    ) -> Result<Product, MarketError> {
        let mut trades = self.lock();
        let pos = trades
            .iter()
            .position(|t| t.id == trade_id)
            .ok_or_else(|| MarketError::NotFound("Trade not found".into()))?;
        let trade = trades.remove(pos);

        let owner = match session.user() {
            Some(user) => Owner {
                id: Some(user.id),
                username: user.username,
            },
            None => Owner {
                id: None,
                username: UNKNOWN_OWNER.to_string(),
            },
        };
        let product = relist(trade, owner, Utc::now());
        catalog.prepend_local(product.clone());

        info!("Re-listed '{}' as {}", product.title, product.id);
        Ok(product)
    }

    /// Every trade, newest first.
    pub fn trades(&self) -> Vec<Trade> {
        self.lock().clone()
    }

    pub fn get(&self, trade_id: &str) -> Option<Trade> {
        self.lock().iter().find(|t| t.id == trade_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Trade>> {
        self.trades.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn local_id() -> String {
    Uuid::now_v7().to_string()
}

fn snapshot(product: &Product, product_id: &str, at: DateTime<Utc>) -> Trade {
    Trade {
        id: local_id(),
        product_id: product_id.to_string(),
        product_name: product.title.clone(),
        price: product.price,
        purchase_date: at,
        status: TradeStatus::Purchased,
        image: product.image_url.clone(),
        description: product.description.clone(),
        category: product.category.clone(),
        condition: product.condition,
        owner: product.owner.clone(),
    }
}

fn relist(trade: Trade, owner: Owner, at: DateTime<Utc>) -> Product {
    Product {
        id: local_id(),
        title: trade.product_name,
        description: trade.description,
        category: trade.category,
        condition: trade.condition,
        price: trade.price,
        image_url: trade.image,
        owner,
        created_at: at,
        status: ProductStatus::Available,
    }
}
