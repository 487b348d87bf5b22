//! Scheduled campaign delivery
//!
//! Discovery, queue admission, retry/backoff/expiry evaluation, and the
//! dispatch loop that drives delivery attempts.

mod dispatcher;
mod policy;
mod queue;

pub use dispatcher::{DeliveryError, Dispatcher};
pub use policy::{Disposition, RetryPolicy};
pub use queue::{DeliveryQueue, QueueEntry};
