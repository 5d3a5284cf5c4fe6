mod conflict;
mod error;
mod membership;
mod mutations;
mod queries;

pub use error::EngineError;
pub use queries::GroupOverview;

pub(crate) use conflict::now_ms;

use std::sync::Arc;

use ulid::Ulid;

use crate::model::*;
use crate::store::EntityStore;

/// Rule engine for room bookings and group membership. Holds no entity state
/// of its own; every decision reads current rows from the store, evaluates
/// the pure rule functions, then writes.
///
/// Checks are read-then-write with no compare-and-swap: two concurrent
/// attempts for the same slot can both pass validation. Callers needing
/// strict exclusion must serialize writes in front of the store.
pub struct Engine {
    pub(crate) store: Arc<dyn EntityStore>,
}

impl Engine {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    pub(crate) async fn require_user(&self, id: Ulid) -> Result<User, EngineError> {
        self.store.user(id).await?.ok_or(EngineError::NotFound(id))
    }

    pub(crate) async fn require_room(&self, id: Ulid) -> Result<Room, EngineError> {
        self.store.room(id).await?.ok_or(EngineError::NotFound(id))
    }

    pub(crate) async fn require_group(&self, id: Ulid) -> Result<Group, EngineError> {
        self.store.group(id).await?.ok_or(EngineError::NotFound(id))
    }

    pub(crate) async fn require_booking(&self, id: Ulid) -> Result<Booking, EngineError> {
        self.store.booking(id).await?.ok_or(EngineError::NotFound(id))
    }
}
