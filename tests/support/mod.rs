#![allow(dead_code)]

pub mod fixtures;
pub mod mock_playstate_client;
pub mod mock_proxy;

pub use fixtures::*;
pub use mock_playstate_client::{MockPlaystateClient, ReportCall};
pub use mock_proxy::MockProxy;

/// Initialize tracing for tests with proper test output handling
pub fn tracing_init() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
