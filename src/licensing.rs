//! Product tiers and the store licensing oracle
//!
//! The controller only ever asks "which tier, and can you purchase" — the
//! store itself is an external collaborator behind [`StoreBackend`]. Tier
//! lookups are cached until invalidated, mirroring how the add-on license
//! query behaves.

#![allow(dead_code)]

use log::{error, info, warn};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{LifeTimerError, LifeTimerResult};

/// Licensing level gating feature limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductTier {
    Free,
    ProLifetime,
    ProSubscription,
    /// The separately-packaged paid build; never consults the store.
    Plus,
}

pub const PRO_LIFETIME_PRODUCT_ID: &str = "9N1WWH32P6TX";
pub const PRO_SUBSCRIPTION_PRODUCT_ID: &str = "9N22J7L5H53P";

/// Outcome of a store purchase request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseStatus {
    Succeeded,
    AlreadyPurchased,
    NotPurchased,
}

/// The store-facing side of licensing: tier query and purchase UI.
pub trait StoreBackend: Send + Sync {
    fn query_tier(&self) -> LifeTimerResult<ProductTier>;
    fn request_purchase(&self, product_id: &str) -> LifeTimerResult<PurchaseStatus>;
}

/// Read-only capability oracle the controller consults for gating decisions.
pub trait LicenseOracle: Send + Sync {
    fn tier(&self) -> ProductTier;
    fn invalidate_cache(&self);
    /// Re-query the backend unless the cached value is still trusted.
    fn refresh(&self);
    fn perform_purchase(&self, product_id: &str) -> LifeTimerResult<PurchaseStatus>;

    fn is_free_version(&self) -> bool {
        self.tier() == ProductTier::Free
    }
}

/// Caching oracle over a [`StoreBackend`].
pub struct StoreLicense {
    backend: Box<dyn StoreBackend>,
    cached_tier: RwLock<ProductTier>,
    use_cached: AtomicBool,
}

impl StoreLicense {
    pub fn new(backend: Box<dyn StoreBackend>) -> Self {
        Self {
            backend,
            cached_tier: RwLock::new(ProductTier::Free),
            use_cached: AtomicBool::new(false),
        }
    }

    /// The Plus build ships pre-licensed and skips store queries entirely.
    pub fn forced_plus() -> Self {
        let license = Self::new(Box::new(ForcedTierBackend::new(ProductTier::Plus)));
        *license.cached_tier.write() = ProductTier::Plus;
        license.use_cached.store(true, Ordering::SeqCst);
        license
    }
}

impl LicenseOracle for StoreLicense {
    fn tier(&self) -> ProductTier {
        *self.cached_tier.read()
    }

    fn invalidate_cache(&self) {
        self.use_cached.store(false, Ordering::SeqCst);
    }

    fn refresh(&self) {
        if self.use_cached.load(Ordering::SeqCst) {
            return;
        }

        match self.backend.query_tier() {
            Ok(tier) => {
                info!("License check completed: {:?}", tier);
                *self.cached_tier.write() = tier;
            }
            Err(e) => {
                // A failed license check never locks the user out of the app.
                error!("Error checking product version: {}", e);
                warn!("Defaulting to free version");
                *self.cached_tier.write() = ProductTier::Free;
            }
        }
        self.use_cached.store(true, Ordering::SeqCst);
    }

    fn perform_purchase(&self, product_id: &str) -> LifeTimerResult<PurchaseStatus> {
        info!("Attempting store purchase of {}", product_id);
        self.backend.request_purchase(product_id)
    }
}

/// Backend with a fixed tier and no purchasable products. Used by the Plus
/// build and by sideloaded (non-store-packaged) installs.
pub struct ForcedTierBackend {
    tier: ProductTier,
}

impl ForcedTierBackend {
    pub fn new(tier: ProductTier) -> Self {
        Self { tier }
    }
}

impl StoreBackend for ForcedTierBackend {
    fn query_tier(&self) -> LifeTimerResult<ProductTier> {
        Ok(self.tier)
    }

    fn request_purchase(&self, _product_id: &str) -> LifeTimerResult<PurchaseStatus> {
        Err(LifeTimerError::Store(
            "store purchases are not available in this build".to_string(),
        ))
    }
}
