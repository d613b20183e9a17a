mod app;
mod fetcher;
pub mod fixtures;

pub use app::{TestApp, test_epoch};
pub use fetcher::FakeFetcher;

/// Install a fmt subscriber for test output, filtered by `RUST_LOG`. Safe to
/// call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
