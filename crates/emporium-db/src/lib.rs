//! # emporium-db: Database Layer for Emporium
//!
//! SQLite storage behind the storefront: catalog view, coupons, orders with
//! their transition history, and the inventory movement ledger.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Emporium Data Flow                               │
//! │                                                                         │
//! │  CheckoutService (storefront-api)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   emporium-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌─────────────────┐    ┌──────────────┐ │   │
//! │  │   │   Database    │    │  Repositories   │    │  Migrations  │ │   │
//! │  │   │   (pool.rs)   │    │ ProductRepo     │    │  (embedded)  │ │   │
//! │  │   │ SqlitePool    │◄───│ CouponRepo      │    │ 001_init.sql │ │   │
//! │  │   │               │    │ OrderRepo       │    │              │ │   │
//! │  │   │               │    │ InventoryRepo   │    │              │ │   │
//! │  │   └───────────────┘    └─────────────────┘    └──────────────┘ │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database (storefront.db)                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use emporium_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("storefront.db")).await?;
//! let order = db.orders().get_by_id(order_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::coupon::CouponRepository;
pub use repository::inventory::{InventoryRepository, MovementKind};
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
