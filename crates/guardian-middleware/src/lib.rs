//! `guardian-middleware` – Plumbing between the guardian's components.
//!
//! Routes frames and warnings without caring about their meaning.
//!
//! # Modules
//!
//! - [`bus`] – Headless, typed, topic-based publish/subscribe event bus built
//!   on Tokio broadcast channels.
//! - [`sink`] – [`WarningSink`]: the fire-and-forget outbound seam the
//!   collision pipeline publishes through.
//! - [`latest`] – [`LatestObserved`]: last-value-wins polling reader used by
//!   the periodic safety monitor.

pub mod bus;
pub mod latest;
pub mod sink;

pub use bus::{EventBus, Topic, TopicReceiver};
pub use latest::LatestObserved;
pub use sink::WarningSink;
