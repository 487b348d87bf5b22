//! maildrip Storage - Campaign persistence
//!
//! This crate provides the campaign record model and the campaign store
//! abstraction, with PostgreSQL and in-memory backends.

pub mod db;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod store;

pub use db::DatabasePool;
pub use memory::MemoryCampaignStore;
pub use models::*;
pub use postgres::PgCampaignStore;
pub use store::CampaignStore;
