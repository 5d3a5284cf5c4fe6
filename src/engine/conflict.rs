use crate::limits::*;
use crate::model::*;

use super::EngineError;

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as Ms
}

/// Shape checks that need no stored state: duration cap and no-past-start.
pub(crate) fn validate_candidate(span: &Span, now: Ms) -> Result<(), EngineError> {
    if span.duration_ms() > MAX_BOOKING_DURATION_MS {
        return Err(EngineError::TooLong { limit_ms: MAX_BOOKING_DURATION_MS });
    }
    if span.start < now {
        return Err(EngineError::InPast);
    }
    Ok(())
}

/// No booking by the same user may overlap the candidate interval.
pub(crate) fn check_user_overlap(existing: &[Booking], span: &Span) -> Result<(), EngineError> {
    match existing.iter().find(|b| b.span.overlaps(span)) {
        Some(b) => Err(EngineError::UserConflict(b.id)),
        None => Ok(()),
    }
}

/// No booking by the same group may overlap the candidate interval.
pub(crate) fn check_group_overlap(existing: &[Booking], span: &Span) -> Result<(), EngineError> {
    match existing.iter().find(|b| b.span.overlaps(span)) {
        Some(b) => Err(EngineError::GroupConflict(b.id)),
        None => Ok(()),
    }
}

/// A group holds at most `MAX_LIVE_BOOKINGS_PER_GROUP` bookings whose end is
/// still in the future. Cancelled bookings are deleted, so they free quota.
pub(crate) fn check_group_quota(group_bookings: &[Booking], now: Ms) -> Result<(), EngineError> {
    let live = group_bookings.iter().filter(|b| b.is_live(now)).count();
    if live >= MAX_LIVE_BOOKINGS_PER_GROUP {
        return Err(EngineError::GroupQuota(MAX_LIVE_BOOKINGS_PER_GROUP));
    }
    Ok(())
}

/// Smartboard use on a room is mutually exclusive across overlapping bookings.
pub(crate) fn check_smartboard(
    room_bookings: &[Booking],
    span: &Span,
    uses_smartboard: bool,
) -> Result<(), EngineError> {
    if !uses_smartboard {
        return Ok(());
    }
    match room_bookings
        .iter()
        .find(|b| b.uses_smartboard && b.span.overlaps(span))
    {
        Some(b) => Err(EngineError::SmartboardConflict(b.id)),
        None => Ok(()),
    }
}

/// Who may cancel: an admin, the booking's creator, or a teacher with at
/// least the advance-notice window left before the start (boundary inclusive).
pub(crate) fn check_cancel_allowed(
    booking: &Booking,
    actor: &Actor,
    now: Ms,
) -> Result<(), EngineError> {
    if actor.is_admin() || booking.created_by == actor.user_id {
        return Ok(());
    }
    if actor.role == Role::Teacher {
        if booking.span.start - now >= TEACHER_CANCEL_NOTICE_MS {
            return Ok(());
        }
        return Err(EngineError::CancelWindow {
            required_notice_ms: TEACHER_CANCEL_NOTICE_MS,
        });
    }
    Err(EngineError::Forbidden("cancel another user's booking"))
}
