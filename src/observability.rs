use std::net::SocketAddr;

use crate::engine::EngineError;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: bookings accepted by the rule engine.
pub const BOOKINGS_ACCEPTED_TOTAL: &str = "aula_bookings_accepted_total";

/// Counter: bookings rejected. Labels: reason.
pub const BOOKINGS_REJECTED_TOTAL: &str = "aula_bookings_rejected_total";

/// Counter: bookings cancelled.
pub const CANCELLATIONS_TOTAL: &str = "aula_cancellations_total";

// ── Sweeper metrics ─────────────────────────────────────────────

/// Counter: reminder sweeps executed.
pub const SWEEP_RUNS_TOTAL: &str = "aula_sweep_runs_total";

/// Histogram: duration of one sweep in seconds.
pub const SWEEP_DURATION_SECONDS: &str = "aula_sweep_duration_seconds";

/// Counter: reminder emails handed to the sender.
pub const REMINDERS_SENT_TOTAL: &str = "aula_reminders_sent_total";

/// Counter: reminder sends that failed (logged, not retried).
pub const REMINDER_SEND_FAILURES_TOTAL: &str = "aula_reminder_send_failures_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Map a rejection to a short label for metrics.
pub fn rejection_label(err: &EngineError) -> &'static str {
    match err {
        EngineError::NotFound(_) => "not_found",
        EngineError::TooLong { .. } => "too_long",
        EngineError::InPast => "in_past",
        EngineError::UserConflict(_) => "user_conflict",
        EngineError::GroupConflict(_) => "group_conflict",
        EngineError::GroupQuota(_) => "group_quota",
        EngineError::SmartboardConflict(_) => "smartboard_conflict",
        EngineError::CancelWindow { .. } => "cancel_window",
        EngineError::NameTooLong(_) => "name_too_long",
        EngineError::AlreadyOwnsGroup(_) => "already_owns_group",
        EngineError::MembershipLimit(_) => "membership_limit",
        EngineError::DuplicateInvitation(_) => "duplicate_invitation",
        EngineError::AlreadyMember(_) => "already_member",
        EngineError::NotMember(_) => "not_member",
        EngineError::Forbidden(_) => "forbidden",
        EngineError::Store(_) => "store",
    }
}
