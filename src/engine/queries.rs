use ulid::Ulid;

use crate::model::*;

use super::conflict::now_ms;
use super::{Engine, EngineError};

/// A group with its foreign relations resolved: member user rows and the
/// group's bookings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOverview {
    pub group: Group,
    pub members: Vec<User>,
    pub bookings: Vec<Booking>,
}

impl Engine {
    pub async fn rooms(&self) -> Result<Vec<Room>, EngineError> {
        let mut rooms = self.store.list_rooms().await?;
        rooms.sort_by(|a, b| (&a.building, a.floor, &a.name).cmp(&(&b.building, b.floor, &b.name)));
        Ok(rooms)
    }

    pub async fn group_overview(&self, group_id: Ulid) -> Result<GroupOverview, EngineError> {
        let group = self.require_group(group_id).await?;
        let members = self.store.members_of_group(group_id).await?;
        let mut bookings = self.store.bookings_for_group(group_id).await?;
        bookings.sort_by_key(|b| b.span.start);
        Ok(GroupOverview { group, members, bookings })
    }

    pub async fn pending_invitations_for(
        &self,
        user_id: Ulid,
    ) -> Result<Vec<GroupInvitation>, EngineError> {
        Ok(self.store.pending_invitations_for_user(user_id).await?)
    }

    /// Bookings the user created that have not ended yet, soonest first.
    pub async fn upcoming_bookings_for_user(
        &self,
        user_id: Ulid,
    ) -> Result<Vec<Booking>, EngineError> {
        let now = now_ms();
        let mut bookings = self.store.bookings_for_user(user_id).await?;
        bookings.retain(|b| b.is_live(now));
        bookings.sort_by_key(|b| b.span.start);
        Ok(bookings)
    }

    /// Free sub-spans of `window` on a room after subtracting its bookings.
    pub async fn room_free_slots(
        &self,
        room_id: Ulid,
        window: Span,
    ) -> Result<Vec<Span>, EngineError> {
        self.require_room(room_id).await?;
        let mut busy: Vec<Span> = self
            .store
            .bookings_for_room(room_id)
            .await?
            .iter()
            .filter(|b| b.span.overlaps(&window))
            .map(|b| Span::new(b.span.start.max(window.start), b.span.end.min(window.end)))
            .collect();
        busy.sort_by_key(|s| s.start);
        let busy = merge_overlapping(&busy);
        Ok(subtract_intervals(&[window], &busy))
    }
}

/// Merge sorted overlapping/adjacent intervals into disjoint intervals.
pub(crate) fn merge_overlapping(sorted: &[Span]) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::new();
    for &span in sorted {
        if let Some(last) = merged.last_mut()
            && span.start <= last.end
        {
            last.end = last.end.max(span.end);
            continue;
        }
        merged.push(span);
    }
    merged
}

/// Subtract sorted disjoint `to_remove` intervals from sorted `base` intervals.
pub(crate) fn subtract_intervals(base: &[Span], to_remove: &[Span]) -> Vec<Span> {
    let mut result = Vec::new();
    let mut ri = 0;

    for &b in base {
        let mut current_start = b.start;
        let current_end = b.end;

        while ri < to_remove.len() && to_remove[ri].end <= current_start {
            ri += 1;
        }

        let mut j = ri;
        while j < to_remove.len() && to_remove[j].start < current_end {
            let r = &to_remove[j];
            if r.start > current_start {
                result.push(Span::new(current_start, r.start));
            }
            current_start = current_start.max(r.end);
            j += 1;
        }

        if current_start < current_end {
            result.push(Span::new(current_start, current_end));
        }
    }

    result
}
