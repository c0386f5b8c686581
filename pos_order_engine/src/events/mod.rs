//! Order lifecycle events.
//!
//! Two independent delivery paths leave the engine after every successful state change:
//! * [`hooks`](EventHooks) are in-process async callbacks, each running on its own queue.
//! * [`fanout`](ChannelHub) pushes serialized events to connected client sessions on their staff or customer channel.
//!
//! Neither path can fail or delay the operation that triggered it.
mod channel;
mod event_types;
mod fanout;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use fanout::{ChannelHub, Delivery, EventPublisher, FanoutChannel, NullPublisher, SessionId, Subscription};
pub use hooks::{EventHandlers, EventHooks, EventProducers};
