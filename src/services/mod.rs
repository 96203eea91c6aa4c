//! Domain services layered over the store.
//!
//! These own validation and the status transition rules; the `db` layer only
//! moves rows. Notification delivery failures are logged and swallowed here,
//! a lost message never blocks a state change that already happened.

pub mod meetings;
pub mod requests;
