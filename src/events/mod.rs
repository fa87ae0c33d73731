//! Lifecycle events and the event bus.
//!
//! The engine reports progress through a closed set of events carrying only
//! names, counts and durations. Listeners can render progress bars, stream
//! results to disk or feed dashboards without ever touching live engine
//! state.

mod bus;
mod types;

pub use bus::{EventBus, EventListener, MAX_QUEUE_SIZE};
pub use types::Event;
