//! maildrip Core - Scheduled campaign delivery engine
//!
//! This crate provides the delivery queue, the retry/backoff/expiry policy,
//! the dispatch loop that drives delivery attempts, and the clients for the
//! email transport and delivery credentials.

pub mod credentials;
pub mod scheduler;
pub mod transport;

pub use credentials::{AccessCredentials, CredentialProvider, StaticCredentials};
pub use scheduler::{DeliveryError, DeliveryQueue, Dispatcher, Disposition, QueueEntry, RetryPolicy};
pub use transport::{
    EmailTransport, HttpEmailTransport, SendRequest, SendResponse, TransportError,
};
