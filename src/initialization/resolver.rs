//! DNS resolver initialization.
//!
//! The probe uses this resolver for one thing only: turning an endpoint
//! host name into an address to dial. It is not the resolver under test.

use std::sync::Arc;
use std::time::Duration;

use hickory_resolver::TokioAsyncResolver;

/// Initializes the resolver for endpoint host name lookups.
///
/// Uses the default upstream configuration with tuned timeouts: lookups
/// fail after `DNS_TIMEOUT_SECS` seconds and `DNS_ATTEMPTS` attempts.
/// `ndots` is 0 so endpoint hosts are treated as absolute and no search
/// domain is appended.
pub fn init_resolver() -> Arc<TokioAsyncResolver> {
    use hickory_resolver::config::{ResolverConfig, ResolverOpts};

    let mut opts = ResolverOpts::default();
    opts.timeout = Duration::from_secs(crate::config::DNS_TIMEOUT_SECS);
    opts.attempts = crate::config::DNS_ATTEMPTS;
    opts.ndots = 0;

    Arc::new(TokioAsyncResolver::tokio(ResolverConfig::default(), opts))
}
