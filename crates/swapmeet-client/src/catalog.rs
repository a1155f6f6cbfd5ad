//! Session-local cache of the product catalog.
//!
//! The list is fetched lazily on first [`CatalogStore::list`] and mutated only
//! after the gateway confirms a write, or by the trade ledger. The lock is
//! never held across an `.await`, so a fetch that completes after a local
//! mutation overwrites it (last write wins).

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info};

use swapmeet_types::MAX_IMAGE_CHARS;
use swapmeet_types::models::{NewProduct, Product};

use crate::{MarketApi, MarketError, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadPhase {
    Unloaded,
    Loading,
    Ready,
}

/// What a caller rendering the catalog gets to see.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogView {
    /// The initial fetch is still in flight.
    Loading,
    Ready(Vec<Product>),
}

impl CatalogView {
    pub fn products(&self) -> &[Product] {
        match self {
            CatalogView::Loading => &[],
            CatalogView::Ready(products) => products,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, CatalogView::Loading)
    }
}

struct CatalogState {
    products: Vec<Product>,
    phase: LoadPhase,
    last_error: Option<MarketError>,
}

pub struct CatalogStore<A> {
    api: A,
    state: Mutex<CatalogState>,
}

impl<A: MarketApi> CatalogStore<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            state: Mutex::new(CatalogState {
                products: Vec::new(),
                phase: LoadPhase::Unloaded,
                last_error: None,
            }),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// The current sequence in server order. The first call fetches it;
    /// callers arriving while that fetch is in flight get
    /// [`CatalogView::Loading`]. A failed initial fetch yields an empty list
    /// and is kept in [`CatalogStore::last_error`].
    pub async fn list(&self) -> CatalogView {
        {
            let mut state = self.lock();
            match state.phase {
                LoadPhase::Ready => return CatalogView::Ready(state.products.clone()),
                LoadPhase::Loading => return CatalogView::Loading,
                LoadPhase::Unloaded => state.phase = LoadPhase::Loading,
            }
        }

        let result = self.api.list_products().await;

        let mut state = self.lock();
        match result {
            Ok(products) => {
                debug!("Catalog loaded with {} products", products.len());
                state.products = products;
                state.last_error = None;
            }
            Err(e) => {
                error!("Error fetching products: {}", e);
                state.last_error = Some(e);
            }
        }
        state.phase = LoadPhase::Ready;
        CatalogView::Ready(state.products.clone())
    }

    /// Re-fetch the list. On failure the local sequence is left as it was.
    pub async fn refresh(&self) -> Result<Vec<Product>, MarketError> {
        match self.api.list_products().await {
            Ok(products) => {
                let mut state = self.lock();
                state.products = products.clone();
                state.phase = LoadPhase::Ready;
                state.last_error = None;
                Ok(products)
            }
            Err(e) => {
                error!("Error refreshing products: {}", e);
                let mut state = self.lock();
                if state.phase == LoadPhase::Unloaded {
                    state.phase = LoadPhase::Ready;
                }
                state.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Submit a listing as the signed-in user. The returned product is put at
    /// the front of the local sequence only once the gateway has accepted it.
    pub async fn create(
        &self,
        session: &Session,
        product: NewProduct,
    ) -> Result<Product, MarketError> {
        if product.image_url.len() > MAX_IMAGE_CHARS {
            return Err(MarketError::ImageTooLarge);
        }
        let token = session
            .token()
            .ok_or_else(|| MarketError::Unauthorized("Please sign in to list a product".into()))?;

        let created = self
            .api
            .create_product(&token, &product)
            .await
            .inspect_err(|e| error!("Error adding product: {}", e))?;

        info!("Listed product {} '{}'", created.id, created.title);
        self.prepend_local(created.clone());
        Ok(created)
    }

    /// Fetch one product from the gateway; `Ok(None)` when it does not exist.
    pub async fn get(&self, id: &str) -> Result<Option<Product>, MarketError> {
        self.api.get_product(id).await
    }

    /// Look `id` up in the local sequence without touching the network.
    pub fn find_local(&self, id: &str) -> Option<Product> {
        self.lock().products.iter().find(|p| p.id == id).cloned()
    }

    /// Snapshot of the local sequence, whether or not it has been loaded.
    pub fn products(&self) -> Vec<Product> {
        self.lock().products.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().phase == LoadPhase::Loading
    }

    pub fn last_error(&self) -> Option<MarketError> {
        self.lock().last_error.clone()
    }

    pub(crate) fn remove_local(&self, id: &str) -> Option<Product> {
        let mut state = self.lock();
        let pos = state.products.iter().position(|p| p.id == id)?;
        Some(state.products.remove(pos))
    }

    pub(crate) fn prepend_local(&self, product: Product) {
        self.lock().products.insert(0, product);
    }

    fn lock(&self) -> MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
