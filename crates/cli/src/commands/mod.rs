//! Command implementations.

pub mod cart;
pub mod checkout;

use np_cart::CartConfig;
use np_cart::context::CartContext;
use np_cart::storage::FileStorage;

/// Open this process's context over the configured storage directory.
pub fn open_context(config: &CartConfig) -> CartContext<FileStorage> {
    let storage = match config.storage_quota_bytes {
        Some(quota) => FileStorage::with_quota(&config.storage_dir, quota),
        None => FileStorage::new(&config.storage_dir),
    };
    CartContext::new(storage, &config.settings)
}
