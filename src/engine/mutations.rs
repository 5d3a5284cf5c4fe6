use tracing::info;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::conflict::{
    check_cancel_allowed, check_group_overlap, check_group_quota, check_smartboard,
    check_user_overlap, now_ms, validate_candidate,
};
use super::membership::{
    check_can_create_group, check_can_invite, check_can_kick, check_membership_limit,
};
use super::{Engine, EngineError};

fn validate_name(name: &str) -> Result<(), EngineError> {
    if name.len() > MAX_NAME_LEN {
        return Err(EngineError::NameTooLong(MAX_NAME_LEN));
    }
    Ok(())
}

impl Engine {
    // ── Bookings ─────────────────────────────────────────────

    /// Evaluate the full booking rule-set for a candidate and persist it if
    /// every rule passes. Returns the new booking id.
    pub async fn try_create_booking(
        &self,
        actor: Actor,
        group_id: Ulid,
        room_id: Ulid,
        span: Span,
        uses_smartboard: bool,
    ) -> Result<Ulid, EngineError> {
        let result = self
            .create_booking_inner(actor, group_id, room_id, span, uses_smartboard)
            .await;
        match &result {
            Ok(id) => {
                metrics::counter!(observability::BOOKINGS_ACCEPTED_TOTAL).increment(1);
                info!("booking {id} accepted: room {room_id}, group {group_id}");
            }
            Err(e) => {
                metrics::counter!(
                    observability::BOOKINGS_REJECTED_TOTAL,
                    "reason" => observability::rejection_label(e)
                )
                .increment(1);
                tracing::debug!("booking rejected for group {group_id}: {e}");
            }
        }
        result
    }

    async fn create_booking_inner(
        &self,
        actor: Actor,
        group_id: Ulid,
        room_id: Ulid,
        span: Span,
        uses_smartboard: bool,
    ) -> Result<Ulid, EngineError> {
        self.require_group(group_id).await?;
        self.require_room(room_id).await?;
        if !self.store.is_member(group_id, actor.user_id).await? {
            return Err(EngineError::NotMember(group_id));
        }

        let now = now_ms();
        validate_candidate(&span, now)?;

        let user_bookings = self.store.bookings_for_user(actor.user_id).await?;
        check_user_overlap(&user_bookings, &span)?;

        let group_bookings = self.store.bookings_for_group(group_id).await?;
        check_group_overlap(&group_bookings, &span)?;
        check_group_quota(&group_bookings, now)?;

        let room_bookings = self.store.bookings_for_room(room_id).await?;
        check_smartboard(&room_bookings, &span, uses_smartboard)?;

        let id = Ulid::new();
        self.store
            .insert_booking(Booking {
                id,
                room_id,
                group_id,
                created_by: actor.user_id,
                span,
                uses_smartboard,
                reminder_sent: false,
            })
            .await?;
        Ok(id)
    }

    /// Admin cancels any booking; the creator their own; a teacher any
    /// booking with the advance-notice window left. Deletes the row, so the
    /// slot and the group quota are freed immediately.
    pub async fn try_cancel_booking(
        &self,
        actor: Actor,
        booking_id: Ulid,
    ) -> Result<(), EngineError> {
        let booking = self.require_booking(booking_id).await?;
        check_cancel_allowed(&booking, &actor, now_ms())?;
        self.store.delete_booking(booking_id).await?;
        metrics::counter!(observability::CANCELLATIONS_TOTAL).increment(1);
        info!("booking {booking_id} cancelled by {}", actor.user_id);
        Ok(())
    }

    // ── Groups & membership ──────────────────────────────────

    /// Create a group owned by the acting student, who becomes its first
    /// member. The owned group counts toward the membership limit.
    pub async fn try_create_group(&self, actor: Actor, name: &str) -> Result<Ulid, EngineError> {
        validate_name(name)?;
        let owned = self.store.group_created_by(actor.user_id).await?;
        check_can_create_group(&actor, owned.as_ref())?;
        let memberships = self.store.memberships_for_user(actor.user_id).await?;
        check_membership_limit(memberships.len())?;

        let id = Ulid::new();
        self.store
            .insert_group(Group {
                id,
                name: name.to_string(),
                creator_id: actor.user_id,
            })
            .await?;
        self.store
            .insert_membership(Membership { group_id: id, user_id: actor.user_id })
            .await?;
        info!("group {id} created by {}", actor.user_id);
        Ok(id)
    }

    /// The group creator invites another user. Duplicate pending invitations
    /// and existing members are rejected.
    pub async fn try_invite(
        &self,
        actor: Actor,
        group_id: Ulid,
        user_id: Ulid,
    ) -> Result<Ulid, EngineError> {
        let group = self.require_group(group_id).await?;
        if group.creator_id != actor.user_id {
            return Err(EngineError::Forbidden("only the group creator invites"));
        }
        self.require_user(user_id).await?;

        let target_is_member = self.store.is_member(group_id, user_id).await?;
        let pending = self.store.pending_invitation(group_id, user_id).await?;
        check_can_invite(&group, target_is_member, pending.as_ref())?;

        let id = Ulid::new();
        self.store
            .insert_invitation(GroupInvitation {
                id,
                group_id,
                user_id,
                status: InviteStatus::Pending,
            })
            .await?;
        Ok(id)
    }

    /// The invitee joins the group. The membership limit is enforced here,
    /// at acceptance time, not when the invitation was sent.
    pub async fn try_accept_invite(
        &self,
        actor: Actor,
        invitation_id: Ulid,
    ) -> Result<(), EngineError> {
        let mut invitation = self.require_pending_invitation(invitation_id).await?;
        if invitation.user_id != actor.user_id {
            return Err(EngineError::Forbidden("respond to another user's invitation"));
        }
        let group_id = invitation.group_id;
        self.require_group(group_id).await?;
        if self.store.is_member(group_id, actor.user_id).await? {
            return Err(EngineError::AlreadyMember(group_id));
        }
        let memberships = self.store.memberships_for_user(actor.user_id).await?;
        check_membership_limit(memberships.len())?;

        invitation.status = InviteStatus::Accepted;
        self.store.update_invitation(invitation).await?;
        self.store
            .insert_membership(Membership { group_id, user_id: actor.user_id })
            .await?;
        info!("user {} joined group {group_id}", actor.user_id);
        Ok(())
    }

    pub async fn try_decline_invite(
        &self,
        actor: Actor,
        invitation_id: Ulid,
    ) -> Result<(), EngineError> {
        let mut invitation = self.require_pending_invitation(invitation_id).await?;
        if invitation.user_id != actor.user_id {
            return Err(EngineError::Forbidden("respond to another user's invitation"));
        }
        invitation.status = InviteStatus::Declined;
        self.store.update_invitation(invitation).await?;
        Ok(())
    }

    /// The group creator withdraws a pending invitation.
    pub async fn try_cancel_invitation(
        &self,
        actor: Actor,
        invitation_id: Ulid,
    ) -> Result<(), EngineError> {
        let invitation = self.require_pending_invitation(invitation_id).await?;
        let group = self.require_group(invitation.group_id).await?;
        if group.creator_id != actor.user_id {
            return Err(EngineError::Forbidden("only the group creator withdraws invitations"));
        }
        self.store.delete_invitation(invitation_id).await?;
        Ok(())
    }

    /// The creator removes another member. Self-removal goes through
    /// `try_leave_group`.
    pub async fn try_kick_member(
        &self,
        actor: Actor,
        group_id: Ulid,
        user_id: Ulid,
    ) -> Result<(), EngineError> {
        let group = self.require_group(group_id).await?;
        check_can_kick(&group, &actor, user_id)?;
        if !self.store.is_member(group_id, user_id).await? {
            return Err(EngineError::NotMember(group_id));
        }
        self.store.delete_membership(group_id, user_id).await?;
        info!("user {user_id} removed from group {group_id} by {}", actor.user_id);
        Ok(())
    }

    /// A member leaves. The creator cannot leave their own group; they delete
    /// it instead.
    pub async fn try_leave_group(&self, actor: Actor, group_id: Ulid) -> Result<(), EngineError> {
        let group = self.require_group(group_id).await?;
        if group.creator_id == actor.user_id {
            return Err(EngineError::Forbidden("creator cannot leave; delete the group"));
        }
        if !self.store.is_member(group_id, actor.user_id).await? {
            return Err(EngineError::NotMember(group_id));
        }
        self.store.delete_membership(group_id, actor.user_id).await?;
        Ok(())
    }

    /// Delete a group and its dependents. The cascade is orchestrated here,
    /// not left to the store: bookings, memberships, and invitations go
    /// first, then the group row.
    pub async fn try_delete_group(&self, actor: Actor, group_id: Ulid) -> Result<(), EngineError> {
        let group = self.require_group(group_id).await?;
        if group.creator_id != actor.user_id && !actor.is_admin() {
            return Err(EngineError::Forbidden("only the creator or an admin deletes a group"));
        }
        self.cascade_delete_group(group_id).await?;
        info!("group {group_id} deleted by {}", actor.user_id);
        Ok(())
    }

    pub(crate) async fn cascade_delete_group(&self, group_id: Ulid) -> Result<(), EngineError> {
        for booking in self.store.bookings_for_group(group_id).await? {
            self.store.delete_booking(booking.id).await?;
        }
        for membership in self.store.memberships_for_group(group_id).await? {
            self.store
                .delete_membership(membership.group_id, membership.user_id)
                .await?;
        }
        for invitation in self.store.invitations_for_group(group_id).await? {
            self.store.delete_invitation(invitation.id).await?;
        }
        self.store.delete_group(group_id).await?;
        Ok(())
    }

    // ── Users & rooms ────────────────────────────────────────

    /// Signup/seed path; no permission gate. Role is fixed here for good.
    pub async fn create_user(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        role: Role,
    ) -> Result<Ulid, EngineError> {
        validate_name(first_name)?;
        validate_name(last_name)?;
        let id = Ulid::new();
        self.store
            .insert_user(User {
                id,
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                email: email.to_string(),
                role,
            })
            .await?;
        Ok(id)
    }

    /// Admin removes an account: their owned group (full group cascade),
    /// remaining memberships, invitations, and created bookings go with it.
    pub async fn try_delete_user(&self, actor: Actor, user_id: Ulid) -> Result<(), EngineError> {
        if !actor.is_admin() {
            return Err(EngineError::Forbidden("only admins delete users"));
        }
        self.require_user(user_id).await?;

        if let Some(owned) = self.store.group_created_by(user_id).await? {
            self.cascade_delete_group(owned.id).await?;
        }
        for membership in self.store.memberships_for_user(user_id).await? {
            self.store
                .delete_membership(membership.group_id, membership.user_id)
                .await?;
        }
        for invitation in self.store.invitations_for_user(user_id).await? {
            self.store.delete_invitation(invitation.id).await?;
        }
        for booking in self.store.bookings_for_user(user_id).await? {
            self.store.delete_booking(booking.id).await?;
        }
        self.store.delete_user(user_id).await?;
        info!("user {user_id} deleted by admin {}", actor.user_id);
        Ok(())
    }

    pub async fn try_create_room(
        &self,
        actor: Actor,
        name: &str,
        kind: RoomKind,
        building: &str,
        floor: i32,
    ) -> Result<Ulid, EngineError> {
        if !actor.is_admin() {
            return Err(EngineError::Forbidden("only admins create rooms"));
        }
        validate_name(name)?;
        let id = Ulid::new();
        self.store
            .insert_room(Room {
                id,
                name: name.to_string(),
                kind,
                building: building.to_string(),
                floor,
            })
            .await?;
        Ok(id)
    }

    /// Admin removes a room; its bookings cascade.
    pub async fn try_delete_room(&self, actor: Actor, room_id: Ulid) -> Result<(), EngineError> {
        if !actor.is_admin() {
            return Err(EngineError::Forbidden("only admins delete rooms"));
        }
        self.require_room(room_id).await?;
        for booking in self.store.bookings_for_room(room_id).await? {
            self.store.delete_booking(booking.id).await?;
        }
        self.store.delete_room(room_id).await?;
        info!("room {room_id} deleted by admin {}", actor.user_id);
        Ok(())
    }

    async fn require_pending_invitation(
        &self,
        id: Ulid,
    ) -> Result<GroupInvitation, EngineError> {
        // A resolved invitation no longer exists as far as callers are
        // concerned; it reads as not-found.
        let invitation = self
            .store
            .invitation(id)
            .await?
            .ok_or(EngineError::NotFound(id))?;
        if invitation.status != InviteStatus::Pending {
            return Err(EngineError::NotFound(id));
        }
        Ok(invitation)
    }
}
