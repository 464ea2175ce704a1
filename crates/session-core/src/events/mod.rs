//! Domain events

mod account_event;

pub use account_event::{AccountChange, AccountEvent};
