mod guard;

pub use guard::{can_add_member, can_remove_member};

use std::collections::HashSet;
use std::fmt;
use std::future::Future;

use crate::model::{Channel, ChannelType, UserId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    #[error("group policy evaluation failed: {0}")]
    PolicyEvaluation(String),
}

/// Why a membership mutation was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    UnsupportedChannelType(ChannelType),
    GroupConstraintDenied { denied: Vec<UserId> },
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::UnsupportedChannelType(channel_type) => {
                write!(f, "operation not supported on {channel_type} channels")
            }
            DenyReason::GroupConstraintDenied { denied } if denied.is_empty() => {
                write!(f, "channel membership is managed by group sync")
            }
            DenyReason::GroupConstraintDenied { denied } => {
                let ids: Vec<String> = denied.iter().map(ToString::to_string).collect();
                write!(f, "users not permitted by group sync: {}", ids.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipDecision {
    Allow,
    Deny(DenyReason),
}

impl MembershipDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, MembershipDecision::Allow)
    }

    pub fn into_result(self) -> Result<(), DenyReason> {
        match self {
            MembershipDecision::Allow => Ok(()),
            MembershipDecision::Deny(reason) => Err(reason),
        }
    }
}

/// Reports which candidates group-sync policy permits in a channel.
pub trait GroupMembershipResolver: Send + Sync {
    fn resolve_allowed(
        &self,
        channel: &Channel,
        candidates: &[UserId],
    ) -> impl Future<Output = Result<HashSet<UserId>, GuardError>> + Send;
}
