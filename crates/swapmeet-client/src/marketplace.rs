use tracing::{info, instrument};

use swapmeet_types::models::{Product, Trade};

use crate::imaging::{ImagePipeline, ImageSource, ProcessedImage};
use crate::session::AuthUser;
use crate::{
    CatalogStore, CatalogView, ClientConfig, HttpMarketApi, ListingDraft, MarketApi, MarketError,
    Session, TradeLedger,
};

/// Everything one user session needs: who is signed in, the catalog they
/// see, the trades they made and the image pipeline feeding new listings.
/// Build one per session and pass it by reference.
pub struct Marketplace<A> {
    session: Session,
    catalog: CatalogStore<A>,
    ledger: TradeLedger,
    images: ImagePipeline,
}

impl Marketplace<HttpMarketApi> {
    /// A marketplace talking to the gateway described by `config`.
    pub fn connect(config: &ClientConfig) -> Result<Self, MarketError> {
        info!("Using marketplace API at {}", config.api_url);
        Ok(Self::new(HttpMarketApi::new(config)?))
    }
}

impl<A: MarketApi> Marketplace<A> {
    pub fn new(api: A) -> Self {
        Self::with_image_pipeline(api, ImagePipeline::default())
    }

    pub fn with_image_pipeline(api: A, images: ImagePipeline) -> Self {
        Self {
            session: Session::new(),
            catalog: CatalogStore::new(api),
            ledger: TradeLedger::new(),
            images,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn catalog(&self) -> &CatalogStore<A> {
        &self.catalog
    }

    pub fn ledger(&self) -> &TradeLedger {
        &self.ledger
    }

    pub fn images(&self) -> &ImagePipeline {
        &self.images
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<AuthUser, MarketError> {
        self.session
            .login(self.catalog.api(), username, password)
            .await
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthUser, MarketError> {
        self.session
            .register(self.catalog.api(), username, email, password)
            .await
    }

    /// End the session. Trades are session-local and go with it.
    pub fn logout(&self) {
        self.session.logout();
        self.ledger.clear();
    }

    pub async fn products(&self) -> CatalogView {
        self.catalog.list().await
    }

    pub fn trades(&self) -> Vec<Trade> {
        self.ledger.trades()
    }

    /// First stage of picking an image for a new listing.
    pub async fn attach_image(&self, source: ImageSource) -> Result<ProcessedImage, MarketError> {
        self.images.ingest(source).await
    }

    /// Validate the form, shrink its image for submission and publish it.
    #[instrument(skip_all, fields(title = %draft.title))]
    pub async fn create_listing(&self, draft: &ListingDraft) -> Result<Product, MarketError> {
        let mut product = draft.validate()?;
        self.require_session()?;

        product.image_url = self.images.finalize(&product.image_url).await?.data_url;
        self.catalog.create(&self.session, product).await
    }

    pub async fn buy(&self, product_id: &str) -> Result<Trade, MarketError> {
        self.require_session()?;
        self.ledger.buy(&self.catalog, product_id).await
    }

    pub fn sell(&self, trade_id: &str) -> Result<Product, MarketError> {
        self.ledger.sell(&self.catalog, &self.session, trade_id)
    }

    fn require_session(&self) -> Result<(), MarketError> {
        if self.session.is_authenticated() {
            Ok(())
        } else {
            Err(MarketError::Unauthorized("Please sign in first".into()))
        }
    }
}
