//! Event notification over WebSocket
//!
//! Currently the only event is transaction irreversibility.

pub mod channel;
pub mod types;

pub use channel::{EventNotificationChannel, EventReceiver};
pub use types::{
    ChannelState, EventName, EventRequest, EventResponse, TxIrreversibility,
    TxIrreversibilityParameters,
};
