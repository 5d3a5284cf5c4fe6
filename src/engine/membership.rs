use crate::limits::*;
use crate::model::*;

use super::EngineError;

/// Only students form groups, and each student creates at most one.
pub(crate) fn check_can_create_group(
    actor: &Actor,
    owned: Option<&Group>,
) -> Result<(), EngineError> {
    if actor.role != Role::Student {
        return Err(EngineError::Forbidden("only students create groups"));
    }
    if let Some(g) = owned {
        return Err(EngineError::AlreadyOwnsGroup(g.id));
    }
    Ok(())
}

/// A user belongs to at most `MAX_GROUPS_PER_USER` groups, owned included.
pub(crate) fn check_membership_limit(membership_count: usize) -> Result<(), EngineError> {
    if membership_count >= MAX_GROUPS_PER_USER {
        return Err(EngineError::MembershipLimit(MAX_GROUPS_PER_USER));
    }
    Ok(())
}

/// Invitation preconditions: not already a member, no pending duplicate.
pub(crate) fn check_can_invite(
    group: &Group,
    target_is_member: bool,
    pending: Option<&GroupInvitation>,
) -> Result<(), EngineError> {
    if target_is_member {
        return Err(EngineError::AlreadyMember(group.id));
    }
    if let Some(inv) = pending {
        return Err(EngineError::DuplicateInvitation(inv.id));
    }
    Ok(())
}

/// Only the creator removes members, and never themselves through this path.
pub(crate) fn check_can_kick(
    group: &Group,
    actor: &Actor,
    target_user_id: ulid::Ulid,
) -> Result<(), EngineError> {
    if group.creator_id != actor.user_id {
        return Err(EngineError::Forbidden("only the group creator removes members"));
    }
    if target_user_id == actor.user_id {
        return Err(EngineError::Forbidden("creator cannot kick self; delete the group"));
    }
    Ok(())
}
