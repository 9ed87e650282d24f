//! # Emporium Storefront API
//!
//! HTTP front for the cart pricing engine and the order lifecycle.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Storefront API                                 │
//! │                                                                         │
//! │  HTTP ───► routes ───► service::Storefront ───► emporium-core           │
//! │                              │      │           (pricing, lifecycle)    │
//! │                              │      └─────────► emporium-db (SQLite)    │
//! │                              ▼                                          │
//! │                        collaborators                                    │
//! │                 payments · inventory · notifier                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod collaborators;
pub mod config;
pub mod error;
pub mod locks;
pub mod routes;
pub mod service;
pub mod state;

pub use config::AppConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use routes::router;
pub use service::Storefront;
pub use state::AppState;
