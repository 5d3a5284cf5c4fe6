use ulid::Ulid;

use crate::model::Ms;
use crate::store::StoreError;

/// Outcome of a rule-evaluated operation. Every rejected rule has its own
/// variant so callers can surface a precise failure, never a generic
/// exception. Only `Store` represents an infrastructure fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    NotFound(Ulid),
    /// Booking longer than the allowed maximum.
    TooLong { limit_ms: Ms },
    /// Booking starts in the past.
    InPast,
    /// Overlaps another booking by the same user (conflicting booking id).
    UserConflict(Ulid),
    /// Overlaps another booking by the same group.
    GroupConflict(Ulid),
    /// The group already holds the maximum number of live bookings.
    GroupQuota(usize),
    /// Smartboard already claimed by an overlapping booking on this room.
    SmartboardConflict(Ulid),
    /// Teacher cancellation attempted inside the advance-notice window.
    CancelWindow { required_notice_ms: Ms },
    /// Name field exceeds the stored column width.
    NameTooLong(usize),
    /// The acting user already created a group.
    AlreadyOwnsGroup(Ulid),
    /// The user already belongs to the maximum number of groups.
    MembershipLimit(usize),
    /// A pending invitation for this (group, user) pair already exists.
    DuplicateInvitation(Ulid),
    AlreadyMember(Ulid),
    NotMember(Ulid),
    /// Actor lacks the role or ownership the operation requires.
    Forbidden(&'static str),
    /// Persistence failure bubbled up from the entity store.
    Store(String),
}

impl EngineError {
    /// Business-rule rejection, as opposed to missing entity, missing
    /// permission, or storage fault. Recoverable and shown to the user.
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            EngineError::NotFound(_) | EngineError::Forbidden(_) | EngineError::Store(_)
        )
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound(id) => write!(f, "not found: {id}"),
            EngineError::TooLong { limit_ms } => {
                write!(f, "booking exceeds maximum duration of {limit_ms}ms")
            }
            EngineError::InPast => write!(f, "booking starts in the past"),
            EngineError::UserConflict(id) => {
                write!(f, "overlaps a booking by the same user: {id}")
            }
            EngineError::GroupConflict(id) => {
                write!(f, "overlaps a booking by the same group: {id}")
            }
            EngineError::GroupQuota(max) => {
                write!(f, "group already holds {max} upcoming bookings")
            }
            EngineError::SmartboardConflict(id) => {
                write!(f, "smartboard already claimed by booking: {id}")
            }
            EngineError::CancelWindow { required_notice_ms } => {
                write!(f, "cancellation requires {required_notice_ms}ms advance notice")
            }
            EngineError::NameTooLong(limit) => {
                write!(f, "name longer than {limit} characters")
            }
            EngineError::AlreadyOwnsGroup(id) => {
                write!(f, "user already created group: {id}")
            }
            EngineError::MembershipLimit(max) => {
                write!(f, "user already belongs to {max} groups")
            }
            EngineError::DuplicateInvitation(id) => {
                write!(f, "pending invitation already exists: {id}")
            }
            EngineError::AlreadyMember(id) => write!(f, "already a member of group: {id}"),
            EngineError::NotMember(id) => write!(f, "not a member of group: {id}"),
            EngineError::Forbidden(what) => write!(f, "forbidden: {what}"),
            EngineError::Store(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Store(e.0)
    }
}
