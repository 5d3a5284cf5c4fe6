use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::engine::{now_ms, Engine, EngineError};
use crate::limits::REMINDER_WINDOW_MS;
use crate::model::Booking;
use crate::notify::ReminderSender;
use crate::observability;

/// Outcome of one reminder sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    /// Bookings due for a reminder this tick.
    pub examined: usize,
    /// Bookings whose reminder flag was advanced.
    pub reminded: usize,
    /// Individual sends that failed (logged, not retried).
    pub failed_sends: usize,
}

/// One sweep: find bookings starting within the reminder window whose flag
/// is unset, mail every group member, then mark the booking. The flag only
/// moves one way; a booking that fails mid-processing stays unmarked and is
/// retried on the next tick.
pub async fn run_sweep_once(
    engine: &Engine,
    sender: &dyn ReminderSender,
) -> Result<SweepReport, EngineError> {
    let now = now_ms();
    let due = engine
        .store
        .unreminded_bookings_between(now, now + REMINDER_WINDOW_MS)
        .await?;

    let mut report = SweepReport { examined: due.len(), ..Default::default() };
    for booking in due {
        match remind_booking(engine, sender, &booking).await {
            Ok(failures) => {
                report.reminded += 1;
                report.failed_sends += failures;
            }
            Err(e) => {
                // Contained per booking; the rest of the batch still runs.
                tracing::error!("sweep skipped booking {}: {e}", booking.id);
            }
        }
    }
    Ok(report)
}

/// Mail each member once, then flip the flag. Send failures are counted but
/// never block marking — the flag records that delivery was attempted.
async fn remind_booking(
    engine: &Engine,
    sender: &dyn ReminderSender,
    booking: &Booking,
) -> Result<usize, EngineError> {
    let room = engine.require_room(booking.room_id).await?;
    let members = engine.store.members_of_group(booking.group_id).await?;

    let mut failures = 0usize;
    for member in &members {
        match sender
            .send_reminder(&member.email, &member.first_name, &room.name, booking.span.start)
            .await
        {
            Ok(()) => {
                metrics::counter!(observability::REMINDERS_SENT_TOTAL).increment(1);
            }
            Err(e) => {
                failures += 1;
                metrics::counter!(observability::REMINDER_SEND_FAILURES_TOTAL).increment(1);
                tracing::warn!("reminder to {} for booking {} failed: {e}", member.email, booking.id);
            }
        }
    }

    let mut marked = booking.clone();
    marked.reminder_sent = true;
    engine.store.update_booking(marked).await?;
    Ok(failures)
}

/// Background task that sweeps on a fixed interval for the lifetime of the
/// process. The shutdown token is observed inside the wait, so cancellation
/// never sits out a sleeping tick.
pub async fn run_sweeper(
    engine: Arc<Engine>,
    sender: Arc<dyn ReminderSender>,
    period: Duration,
    shutdown: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.cancelled() => {
                info!("reminder sweeper stopping");
                return;
            }
        }

        let sweep_start = std::time::Instant::now();
        match run_sweep_once(&engine, sender.as_ref()).await {
            Ok(report) => info!(
                "sweep done: {} due, {} reminded, {} failed sends",
                report.examined, report.reminded, report.failed_sends
            ),
            Err(e) => tracing::error!("reminder sweep failed: {e}"),
        }
        metrics::counter!(observability::SWEEP_RUNS_TOTAL).increment(1);
        metrics::histogram!(observability::SWEEP_DURATION_SECONDS)
            .record(sweep_start.elapsed().as_secs_f64());
    }
}
