/// Re-export `Config` from `storefront-core` for use within this crate.
///
/// All environment-variable parsing lives in `storefront-core` so it can be
/// shared with integration tests without depending on the full server.
pub use storefront_core::config::Config;
