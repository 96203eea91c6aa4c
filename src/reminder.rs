//! Background reminder scheduler.
//!
//! Every tick the scheduler reconciles the database against wall-clock time:
//! confirmed meetings more than the grace period past their start are marked
//! completed, and reminders are sent for meetings whose lead times fall due
//! inside the current tick window. Sent reminders are persisted per
//! (meeting, recipient, lead time), so a reminder fires at most once even
//! across restarts or overlapping processes.
//!
//! Tick processing is a pure function of `(database, now, config)`. The async
//! loop just supplies wall-clock instants and a fresh connection per tick, so
//! a long-lived daemon never pins one connection across hours of idling.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;

use crate::db::{Meeting, MeetingDb};
use crate::notify::{self, Notifier};
use crate::types::SchedulerConfig;

/// What a single tick did. Logged each pass and asserted on in tests.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub reminders_sent: usize,
    pub meetings_completed: usize,
    pub failures: usize,
}

/// Whether the lead time for this meeting falls due right now. The window is
/// [scheduled_at - lead, scheduled_at - lead + tick), sized to the tick so
/// exactly one pass sees each (meeting, lead time) pair.
fn reminder_due(
    scheduled_at: DateTime<Utc>,
    lead_minutes: i64,
    now: DateTime<Utc>,
    tick_minutes: i64,
) -> bool {
    let reminder_time = scheduled_at - Duration::minutes(lead_minutes);
    now >= reminder_time && now < reminder_time + Duration::minutes(tick_minutes)
}

fn send_due_reminders(
    db: &MeetingDb,
    notifier: &dyn Notifier,
    meeting: &Meeting,
    config: &SchedulerConfig,
    now: DateTime<Utc>,
    outcome: &mut TickOutcome,
) -> Result<(), crate::db::DbError> {
    for &lead_minutes in &config.lead_times_minutes {
        if !reminder_due(meeting.scheduled_at, lead_minutes, now, config.tick_minutes) {
            continue;
        }
        let reminder_time = meeting.scheduled_at - Duration::minutes(lead_minutes);

        for recipient in meeting.participants() {
            if db.sent_reminder_exists(&meeting.id, recipient, lead_minutes)? {
                continue;
            }

            let notification = notify::reminder_notification(meeting, recipient, lead_minutes);
            match notifier.send(&notification) {
                Ok(()) => {
                    db.record_sent_reminder(
                        &meeting.id,
                        recipient,
                        lead_minutes,
                        reminder_time,
                        now,
                    )?;
                    outcome.reminders_sent += 1;
                    log::info!(
                        "Sent {}-minute reminder for meeting {} to {}",
                        lead_minutes,
                        meeting.id,
                        recipient
                    );
                }
                Err(e) => {
                    // No record is written, so delivery can retry while the
                    // window is still open
                    outcome.failures += 1;
                    log::warn!(
                        "Failed to send {}-minute reminder for meeting {} to {}: {}",
                        lead_minutes,
                        meeting.id,
                        recipient,
                        e
                    );
                }
            }
        }
    }
    Ok(())
}

/// One reconciliation pass at a fixed instant.
pub fn process_tick(
    db: &MeetingDb,
    notifier: &dyn Notifier,
    config: &SchedulerConfig,
    now: DateTime<Utc>,
) -> Result<TickOutcome, crate::db::DbError> {
    let mut outcome = TickOutcome::default();

    outcome.meetings_completed = db.complete_overdue_meetings(now, config.completion_grace_hours)?;
    if outcome.meetings_completed > 0 {
        log::info!(
            "Auto-completed {} overdue meeting(s)",
            outcome.meetings_completed
        );
    }

    let candidates = db.active_meetings_in_window(now, config.lookahead_hours)?;
    for meeting in &candidates {
        // One broken meeting must not starve the rest of the pass
        if let Err(e) = send_due_reminders(db, notifier, meeting, config, now, &mut outcome) {
            outcome.failures += 1;
            log::error!("Reminder pass failed for meeting {}: {}", meeting.id, e);
        }
    }

    Ok(outcome)
}

/// Owns the tick loop. Opens a fresh connection per tick and stops cleanly
/// when the stop channel flips.
pub struct ReminderScheduler {
    db_path: PathBuf,
    config: SchedulerConfig,
    notifier: Arc<dyn Notifier>,
}

impl ReminderScheduler {
    pub fn new(db_path: PathBuf, config: SchedulerConfig, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            db_path,
            config,
            notifier,
        }
    }

    /// Run until `stop` observes a change. The tick in flight finishes before
    /// the loop exits.
    pub async fn run(self, mut stop: watch::Receiver<bool>) {
        if !self.config.enabled {
            log::info!("Reminder scheduler disabled by config");
            return;
        }

        let tick = std::time::Duration::from_secs((self.config.tick_minutes * 60) as u64);
        log::info!(
            "Reminder scheduler started: tick every {}m, lead times {:?}",
            self.config.tick_minutes,
            self.config.lead_times_minutes
        );

        loop {
            match MeetingDb::open_at(self.db_path.clone()) {
                Ok(db) => {
                    match process_tick(&db, self.notifier.as_ref(), &self.config, Utc::now()) {
                        Ok(outcome) => {
                            if outcome.reminders_sent > 0 || outcome.failures > 0 {
                                log::info!(
                                    "Tick done: {} sent, {} completed, {} failures",
                                    outcome.reminders_sent,
                                    outcome.meetings_completed,
                                    outcome.failures
                                );
                            }
                        }
                        Err(e) => log::error!("Scheduler tick failed: {}", e),
                    }
                }
                Err(e) => log::error!("Scheduler could not open database: {}", e),
            }

            tokio::select! {
                _ = tokio::time::sleep(tick) => {}
                _ = stop.changed() => {
                    log::info!("Reminder scheduler stopping");
                    break;
                }
            }
        }
    }
}
