//! Process-level initialization.
//!
//! This module provides functions to initialize the resources a run sets
//! up once and shares:
//! - Logger
//! - TLS crypto provider
//! - DNS resolver for endpoint host names
//! - Concurrency semaphore
//!
//! All initialization functions return proper error types where failure is
//! possible.

mod logger;
mod resolver;

use std::sync::Arc;

use rustls::crypto::{ring::default_provider, CryptoProvider};
use tokio::sync::Semaphore;

// Re-export public API
pub use logger::init_logger_with;
pub use resolver::init_resolver;

/// Initializes a semaphore for controlling concurrency.
///
/// The semaphore limits how many probe jobs run at the same time; it is
/// shared across all spawned tasks.
pub fn init_semaphore(count: usize) -> Arc<Semaphore> {
    Arc::new(Semaphore::new(count))
}

/// Initializes the crypto provider for TLS operations.
///
/// Configures the global crypto provider for `rustls`. This must be called
/// before any TLS configuration is built.
pub fn init_crypto_provider() {
    // The return value is ignored because reinstalling the provider is harmless
    let _ = CryptoProvider::install_default(default_provider());
}
