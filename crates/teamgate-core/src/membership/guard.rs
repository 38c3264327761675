use crate::model::{Channel, ChannelType, User, UserId};

use super::{DenyReason, GroupMembershipResolver, GuardError, MembershipDecision};

/// Decides whether `target` may be added to `channel`.
///
/// The channel type is a hard gate evaluated first; the group constraint is
/// only consulted for channels that accept ad-hoc members. The resolver is
/// not called for unconstrained channels.
pub async fn can_add_member<R: GroupMembershipResolver>(
    channel: &Channel,
    target: &User,
    resolver: &R,
) -> Result<MembershipDecision, GuardError> {
    if channel.channel_type.has_fixed_participants() {
        return Ok(MembershipDecision::Deny(DenyReason::UnsupportedChannelType(
            channel.channel_type,
        )));
    }

    if channel.is_group_constrained() {
        let candidates = [target.id];
        let allowed = resolver.resolve_allowed(channel, &candidates).await?;
        let denied: Vec<UserId> = candidates
            .iter()
            .filter(|id| !allowed.contains(*id))
            .copied()
            .collect();
        if !denied.is_empty() {
            return Ok(MembershipDecision::Deny(DenyReason::GroupConstraintDenied {
                denied,
            }));
        }
    }

    Ok(MembershipDecision::Allow)
}

/// Decides whether `target` may be removed from `channel`.
///
/// Human members of group-synced channels are managed by the sync; bots are
/// not subject to it and may always be removed.
pub fn can_remove_member(channel: &Channel, target: &User) -> MembershipDecision {
    if !matches!(channel.channel_type, ChannelType::Open | ChannelType::Private) {
        return MembershipDecision::Deny(DenyReason::UnsupportedChannelType(
            channel.channel_type,
        ));
    }

    if channel.is_group_constrained() && !target.is_bot {
        return MembershipDecision::Deny(DenyReason::GroupConstraintDenied {
            denied: vec![target.id],
        });
    }

    MembershipDecision::Allow
}
