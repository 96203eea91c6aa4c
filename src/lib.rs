//! meetflow: meeting request coordination with background reminders.
//!
//! The crate is organized in three layers:
//! - `db` wraps the SQLite store (requests, meetings, reminder records)
//! - `services` owns validation and status transitions
//! - `reminder` runs the background reconciliation loop
//!
//! `meetflowd` wires these together into a daemon; the library surface is
//! also usable directly from an embedding application.

pub mod db;
pub mod error;
pub mod migrations;
pub mod notify;
pub mod reminder;
pub mod services;
pub mod state;
pub mod types;

pub use db::MeetingDb;
pub use error::{ErrorKind, ErrorResponse, WorkflowError};
pub use notify::{LogNotifier, Notification, Notifier, NotifyError};
pub use reminder::ReminderScheduler;
