//! HTTP request handlers for the Tapestry gateway.

pub mod editor;
pub mod health;
pub mod me;
pub mod metrics;

pub use editor::get_editor_session;
pub use health::health_check;
pub use me::get_me;
pub use metrics::metrics_handler;
