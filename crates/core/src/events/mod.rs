//! Domain events module.
//!
//! Provides domain event types and the sink trait for emitting events
//! after successful mutations and recomputations. Hosts implement the sink
//! to forward events to logs, queues, or caches.

mod domain_event;
mod sink;

pub use domain_event::*;
pub use sink::*;
