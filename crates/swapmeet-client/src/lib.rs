//! Client core of the SwapMeet marketplace.
//!
//! A [`Marketplace`] bundles the per-session state: the [`Session`], the
//! [`CatalogStore`] caching listings fetched through a [`MarketApi`], the
//! client-local [`TradeLedger`] and the [`imaging::ImagePipeline`] that prepares
//! pictures for new listings.

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod imaging;
pub mod ledger;
pub mod listing;
pub mod marketplace;
pub mod session;

pub use api::{HttpMarketApi, MarketApi};
pub use catalog::{CatalogStore, CatalogView};
pub use config::ClientConfig;
pub use error::{FieldError, MarketError, ValidationErrors};
pub use ledger::TradeLedger;
pub use listing::ListingDraft;
pub use marketplace::Marketplace;
pub use session::{AuthUser, Session};
