use async_trait::async_trait;
use dashmap::DashMap;
use ulid::Ulid;

use crate::model::*;

/// Opaque storage failure. The engine surfaces these as a generic storage
/// error; they carry no business meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError(pub String);

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "store error: {}", self.0)
    }
}

impl std::error::Error for StoreError {}

/// Relational store consumed by the rule engine. Implementations own
/// persistence, indexing, and transaction semantics; the engine only reads
/// and writes whole rows. Absence is `Ok(None)`, not an error.
#[async_trait]
pub trait EntityStore: Send + Sync {
    // ── Users ────────────────────────────────────────────────
    async fn insert_user(&self, user: User) -> Result<(), StoreError>;
    async fn user(&self, id: Ulid) -> Result<Option<User>, StoreError>;
    async fn delete_user(&self, id: Ulid) -> Result<(), StoreError>;

    // ── Rooms ────────────────────────────────────────────────
    async fn insert_room(&self, room: Room) -> Result<(), StoreError>;
    async fn room(&self, id: Ulid) -> Result<Option<Room>, StoreError>;
    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError>;
    async fn delete_room(&self, id: Ulid) -> Result<(), StoreError>;

    // ── Groups ───────────────────────────────────────────────
    async fn insert_group(&self, group: Group) -> Result<(), StoreError>;
    async fn group(&self, id: Ulid) -> Result<Option<Group>, StoreError>;
    /// The group a user created, if any. A user creates at most one.
    async fn group_created_by(&self, user_id: Ulid) -> Result<Option<Group>, StoreError>;
    async fn delete_group(&self, id: Ulid) -> Result<(), StoreError>;

    // ── Memberships ──────────────────────────────────────────
    async fn insert_membership(&self, membership: Membership) -> Result<(), StoreError>;
    async fn delete_membership(&self, group_id: Ulid, user_id: Ulid) -> Result<(), StoreError>;
    async fn memberships_for_user(&self, user_id: Ulid) -> Result<Vec<Membership>, StoreError>;
    async fn memberships_for_group(&self, group_id: Ulid) -> Result<Vec<Membership>, StoreError>;
    async fn is_member(&self, group_id: Ulid, user_id: Ulid) -> Result<bool, StoreError>;
    /// Members with their user rows included (booking → group → members).
    async fn members_of_group(&self, group_id: Ulid) -> Result<Vec<User>, StoreError>;

    // ── Invitations ──────────────────────────────────────────
    async fn insert_invitation(&self, invitation: GroupInvitation) -> Result<(), StoreError>;
    async fn invitation(&self, id: Ulid) -> Result<Option<GroupInvitation>, StoreError>;
    async fn update_invitation(&self, invitation: GroupInvitation) -> Result<(), StoreError>;
    async fn delete_invitation(&self, id: Ulid) -> Result<(), StoreError>;
    async fn pending_invitation(
        &self,
        group_id: Ulid,
        user_id: Ulid,
    ) -> Result<Option<GroupInvitation>, StoreError>;
    async fn pending_invitations_for_user(
        &self,
        user_id: Ulid,
    ) -> Result<Vec<GroupInvitation>, StoreError>;
    async fn invitations_for_group(
        &self,
        group_id: Ulid,
    ) -> Result<Vec<GroupInvitation>, StoreError>;
    /// All invitations addressed to a user, any status (for cascade deletes).
    async fn invitations_for_user(
        &self,
        user_id: Ulid,
    ) -> Result<Vec<GroupInvitation>, StoreError>;

    // ── Bookings ─────────────────────────────────────────────
    async fn insert_booking(&self, booking: Booking) -> Result<(), StoreError>;
    async fn booking(&self, id: Ulid) -> Result<Option<Booking>, StoreError>;
    async fn update_booking(&self, booking: Booking) -> Result<(), StoreError>;
    async fn delete_booking(&self, id: Ulid) -> Result<(), StoreError>;
    async fn bookings_for_user(&self, user_id: Ulid) -> Result<Vec<Booking>, StoreError>;
    async fn bookings_for_group(&self, group_id: Ulid) -> Result<Vec<Booking>, StoreError>;
    async fn bookings_for_room(&self, room_id: Ulid) -> Result<Vec<Booking>, StoreError>;
    /// Bookings with `start` in `(after, until]` and the reminder flag unset.
    async fn unreminded_bookings_between(
        &self,
        after: Ms,
        until: Ms,
    ) -> Result<Vec<Booking>, StoreError>;
}

/// In-memory store backed by `DashMap`, used by tests and the worker binary.
/// A production deployment swaps in a database-backed implementation.
pub struct MemoryStore {
    users: DashMap<Ulid, User>,
    rooms: DashMap<Ulid, Room>,
    groups: DashMap<Ulid, Group>,
    memberships: DashMap<(Ulid, Ulid), Membership>,
    invitations: DashMap<Ulid, GroupInvitation>,
    bookings: DashMap<Ulid, Booking>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            rooms: DashMap::new(),
            groups: DashMap::new(),
            memberships: DashMap::new(),
            invitations: DashMap::new(),
            bookings: DashMap::new(),
        }
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn insert_user(&self, user: User) -> Result<(), StoreError> {
        self.users.insert(user.id, user);
        Ok(())
    }

    async fn user(&self, id: Ulid) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(&id).map(|e| e.value().clone()))
    }

    async fn delete_user(&self, id: Ulid) -> Result<(), StoreError> {
        self.users.remove(&id);
        Ok(())
    }

    async fn insert_room(&self, room: Room) -> Result<(), StoreError> {
        self.rooms.insert(room.id, room);
        Ok(())
    }

    async fn room(&self, id: Ulid) -> Result<Option<Room>, StoreError> {
        Ok(self.rooms.get(&id).map(|e| e.value().clone()))
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, StoreError> {
        Ok(self.rooms.iter().map(|e| e.value().clone()).collect())
    }

    async fn delete_room(&self, id: Ulid) -> Result<(), StoreError> {
        self.rooms.remove(&id);
        Ok(())
    }

    async fn insert_group(&self, group: Group) -> Result<(), StoreError> {
        self.groups.insert(group.id, group);
        Ok(())
    }

    async fn group(&self, id: Ulid) -> Result<Option<Group>, StoreError> {
        Ok(self.groups.get(&id).map(|e| e.value().clone()))
    }

    async fn group_created_by(&self, user_id: Ulid) -> Result<Option<Group>, StoreError> {
        Ok(self
            .groups
            .iter()
            .find(|e| e.value().creator_id == user_id)
            .map(|e| e.value().clone()))
    }

    async fn delete_group(&self, id: Ulid) -> Result<(), StoreError> {
        self.groups.remove(&id);
        Ok(())
    }

    async fn insert_membership(&self, membership: Membership) -> Result<(), StoreError> {
        self.memberships
            .insert((membership.group_id, membership.user_id), membership);
        Ok(())
    }

    async fn delete_membership(&self, group_id: Ulid, user_id: Ulid) -> Result<(), StoreError> {
        self.memberships.remove(&(group_id, user_id));
        Ok(())
    }

    async fn memberships_for_user(&self, user_id: Ulid) -> Result<Vec<Membership>, StoreError> {
        Ok(self
            .memberships
            .iter()
            .filter(|e| e.value().user_id == user_id)
            .map(|e| *e.value())
            .collect())
    }

    async fn memberships_for_group(&self, group_id: Ulid) -> Result<Vec<Membership>, StoreError> {
        Ok(self
            .memberships
            .iter()
            .filter(|e| e.value().group_id == group_id)
            .map(|e| *e.value())
            .collect())
    }

    async fn is_member(&self, group_id: Ulid, user_id: Ulid) -> Result<bool, StoreError> {
        Ok(self.memberships.contains_key(&(group_id, user_id)))
    }

    async fn members_of_group(&self, group_id: Ulid) -> Result<Vec<User>, StoreError> {
        let mut members = Vec::new();
        for entry in self.memberships.iter() {
            if entry.value().group_id == group_id
                && let Some(user) = self.users.get(&entry.value().user_id)
            {
                members.push(user.value().clone());
            }
        }
        Ok(members)
    }

    async fn insert_invitation(&self, invitation: GroupInvitation) -> Result<(), StoreError> {
        self.invitations.insert(invitation.id, invitation);
        Ok(())
    }

    async fn invitation(&self, id: Ulid) -> Result<Option<GroupInvitation>, StoreError> {
        Ok(self.invitations.get(&id).map(|e| e.value().clone()))
    }

    async fn update_invitation(&self, invitation: GroupInvitation) -> Result<(), StoreError> {
        self.invitations.insert(invitation.id, invitation);
        Ok(())
    }

    async fn delete_invitation(&self, id: Ulid) -> Result<(), StoreError> {
        self.invitations.remove(&id);
        Ok(())
    }

    async fn pending_invitation(
        &self,
        group_id: Ulid,
        user_id: Ulid,
    ) -> Result<Option<GroupInvitation>, StoreError> {
        Ok(self
            .invitations
            .iter()
            .find(|e| {
                let inv = e.value();
                inv.group_id == group_id
                    && inv.user_id == user_id
                    && inv.status == InviteStatus::Pending
            })
            .map(|e| e.value().clone()))
    }

    async fn pending_invitations_for_user(
        &self,
        user_id: Ulid,
    ) -> Result<Vec<GroupInvitation>, StoreError> {
        Ok(self
            .invitations
            .iter()
            .filter(|e| e.value().user_id == user_id && e.value().status == InviteStatus::Pending)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn invitations_for_group(
        &self,
        group_id: Ulid,
    ) -> Result<Vec<GroupInvitation>, StoreError> {
        Ok(self
            .invitations
            .iter()
            .filter(|e| e.value().group_id == group_id)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn invitations_for_user(
        &self,
        user_id: Ulid,
    ) -> Result<Vec<GroupInvitation>, StoreError> {
        Ok(self
            .invitations
            .iter()
            .filter(|e| e.value().user_id == user_id)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn insert_booking(&self, booking: Booking) -> Result<(), StoreError> {
        self.bookings.insert(booking.id, booking);
        Ok(())
    }

    async fn booking(&self, id: Ulid) -> Result<Option<Booking>, StoreError> {
        Ok(self.bookings.get(&id).map(|e| e.value().clone()))
    }

    async fn update_booking(&self, booking: Booking) -> Result<(), StoreError> {
        self.bookings.insert(booking.id, booking);
        Ok(())
    }

    async fn delete_booking(&self, id: Ulid) -> Result<(), StoreError> {
        self.bookings.remove(&id);
        Ok(())
    }

    async fn bookings_for_user(&self, user_id: Ulid) -> Result<Vec<Booking>, StoreError> {
        Ok(self
            .bookings
            .iter()
            .filter(|e| e.value().created_by == user_id)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn bookings_for_group(&self, group_id: Ulid) -> Result<Vec<Booking>, StoreError> {
        Ok(self
            .bookings
            .iter()
            .filter(|e| e.value().group_id == group_id)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn bookings_for_room(&self, room_id: Ulid) -> Result<Vec<Booking>, StoreError> {
        Ok(self
            .bookings
            .iter()
            .filter(|e| e.value().room_id == room_id)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn unreminded_bookings_between(
        &self,
        after: Ms,
        until: Ms,
    ) -> Result<Vec<Booking>, StoreError> {
        Ok(self
            .bookings
            .iter()
            .filter(|e| {
                let b = e.value();
                !b.reminder_sent && b.span.start > after && b.span.start <= until
            })
            .map(|e| e.value().clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn booking(start: Ms, end: Ms, reminder_sent: bool) -> Booking {
        Booking {
            id: Ulid::new(),
            room_id: Ulid::new(),
            group_id: Ulid::new(),
            created_by: Ulid::new(),
            span: Span::new(start, end),
            uses_smartboard: false,
            reminder_sent,
        }
    }

    #[tokio::test]
    async fn membership_is_deduplicated_by_composite_key() {
        let store = MemoryStore::new();
        let (g, u) = (Ulid::new(), Ulid::new());
        let m = Membership { group_id: g, user_id: u };
        store.insert_membership(m).await.unwrap();
        store.insert_membership(m).await.unwrap();
        assert_eq!(store.memberships_for_user(u).await.unwrap().len(), 1);
        assert!(store.is_member(g, u).await.unwrap());
        store.delete_membership(g, u).await.unwrap();
        assert!(!store.is_member(g, u).await.unwrap());
    }

    #[tokio::test]
    async fn pending_invitation_lookup_ignores_resolved() {
        let store = MemoryStore::new();
        let (g, u) = (Ulid::new(), Ulid::new());
        store
            .insert_invitation(GroupInvitation {
                id: Ulid::new(),
                group_id: g,
                user_id: u,
                status: InviteStatus::Declined,
            })
            .await
            .unwrap();
        assert!(store.pending_invitation(g, u).await.unwrap().is_none());

        let pending = GroupInvitation {
            id: Ulid::new(),
            group_id: g,
            user_id: u,
            status: InviteStatus::Pending,
        };
        store.insert_invitation(pending.clone()).await.unwrap();
        assert_eq!(store.pending_invitation(g, u).await.unwrap(), Some(pending));
    }

    #[tokio::test]
    async fn unreminded_window_bounds_are_half_open() {
        let store = MemoryStore::new();
        let b_at_after = booking(1000, 2000, false); // start == after → excluded
        let b_inside = booking(1500, 2500, false);
        let b_at_until = booking(3000, 4000, false); // start == until → included
        let b_past_until = booking(3001, 4001, false);
        let b_reminded = booking(1500, 2500, true);
        for b in [&b_at_after, &b_inside, &b_at_until, &b_past_until, &b_reminded] {
            store.insert_booking(b.clone()).await.unwrap();
        }

        let hits = store.unreminded_bookings_between(1000, 3000).await.unwrap();
        let ids: Vec<Ulid> = hits.iter().map(|b| b.id).collect();
        assert!(ids.contains(&b_inside.id));
        assert!(ids.contains(&b_at_until.id));
        assert!(!ids.contains(&b_at_after.id));
        assert!(!ids.contains(&b_past_until.id));
        assert!(!ids.contains(&b_reminded.id));
    }

    #[tokio::test]
    async fn members_of_group_joins_user_rows() {
        let store = MemoryStore::new();
        let g = Ulid::new();
        let user = User {
            id: Ulid::new(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@uni.example".into(),
            role: Role::Student,
        };
        store.insert_user(user.clone()).await.unwrap();
        store
            .insert_membership(Membership { group_id: g, user_id: user.id })
            .await
            .unwrap();
        // Dangling membership row without a user is skipped, not an error.
        store
            .insert_membership(Membership { group_id: g, user_id: Ulid::new() })
            .await
            .unwrap();

        let members = store.members_of_group(g).await.unwrap();
        assert_eq!(members, vec![user]);
    }
}
