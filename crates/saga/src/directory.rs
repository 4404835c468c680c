//! Vendor directory trait and in-memory implementation.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use domain::VendorId;
use tokio::sync::RwLock;

/// Resolves vendor ids submitted with a cart.
#[async_trait]
pub trait VendorDirectory: Send + Sync {
    /// Returns true if the vendor exists and may receive orders.
    async fn vendor_exists(&self, vendor_id: VendorId) -> bool;
}

#[derive(Debug, Default)]
struct DirectoryState {
    vendors: HashSet<VendorId>,
    /// When set, every well-formed vendor id resolves.
    permissive: bool,
}

/// In-memory vendor directory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVendorDirectory {
    state: Arc<RwLock<DirectoryState>>,
}

impl InMemoryVendorDirectory {
    /// Creates an empty directory that resolves no vendor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a directory that resolves any well-formed vendor id.
    pub fn permissive() -> Self {
        Self {
            state: Arc::new(RwLock::new(DirectoryState {
                vendors: HashSet::new(),
                permissive: true,
            })),
        }
    }

    /// Creates a directory that resolves exactly the given vendors.
    pub fn with_vendors(vendors: impl IntoIterator<Item = VendorId>) -> Self {
        Self {
            state: Arc::new(RwLock::new(DirectoryState {
                vendors: vendors.into_iter().collect(),
                permissive: false,
            })),
        }
    }

    pub async fn register(&self, vendor_id: VendorId) {
        self.state.write().await.vendors.insert(vendor_id);
    }

    pub async fn remove(&self, vendor_id: VendorId) {
        self.state.write().await.vendors.remove(&vendor_id);
    }
}

#[async_trait]
impl VendorDirectory for InMemoryVendorDirectory {
    async fn vendor_exists(&self, vendor_id: VendorId) -> bool {
        let state = self.state.read().await;
        state.permissive || state.vendors.contains(&vendor_id)
    }
}
