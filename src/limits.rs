use crate::model::Ms;

/// A booking may last at most two hours.
pub const MAX_BOOKING_DURATION_MS: Ms = 2 * 60 * 60 * 1000;

/// A group holds at most this many bookings whose end is still in the future.
pub const MAX_LIVE_BOOKINGS_PER_GROUP: usize = 3;

/// A student belongs to at most this many groups, the owned one included.
pub const MAX_GROUPS_PER_USER: usize = 3;

/// Teachers may cancel foreign bookings only this far ahead of the start.
pub const TEACHER_CANCEL_NOTICE_MS: Ms = 3 * 24 * 60 * 60 * 1000;

/// Reminders go out for bookings starting within this window.
pub const REMINDER_WINDOW_MS: Ms = 24 * 60 * 60 * 1000;

/// Default pause between reminder sweeps.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 30 * 60;

pub const MAX_NAME_LEN: usize = 256;
