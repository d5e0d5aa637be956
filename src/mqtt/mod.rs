//! MQTT connection supervision.
//!
//! One supervisor owns one logical broker connection: connect, subscribe,
//! publish, heartbeat emission, and the reconnect/debounce smoothing that
//! keeps transient drops from flickering through the UI.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                     supervisor task                        │
//! │  ┌──────────┐   ┌───────────┐   ┌────────────────────────┐ │
//! │  │ rumqttc  │──▶│ LinkState │──▶│ LinkEvent channel      │─┼──▶ TUI (MqttSource)
//! │  │ eventloop│   │ (debounce,│   └────────────────────────┘ │
//! │  └──────────┘   │  failover)│   ┌────────────────────────┐ │
//! │                 └───────────┘   │ Command channel        │◀┼─── TUI (MqttHandle)
//! │                                 └────────────────────────┘ │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`LinkState`] is a pure state machine so the debounce and failover
//! rules are unit-testable without a broker; the task in
//! [`supervisor`] merely feeds it transport outcomes and acts on its
//! decisions.

mod link;
mod supervisor;

pub use link::{LinkState, LinkStatus, DEFAULT_DEBOUNCE_MS};
pub use supervisor::{LinkError, MqttHandle, MqttSource, MqttSupervisor, PublishBody};
