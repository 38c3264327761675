use teamgate_core::membership::{DenyReason, GuardError};
use teamgate_core::model::{ChannelType, ModelError, UserId};
use teamgate_storage::StorageError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    InvalidParam(#[from] ModelError),

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("operation not supported on {0} channels")]
    UnsupportedChannelType(ChannelType),

    #[error("{}", format_group_denial(.denied))]
    GroupConstraintDenied { denied: Vec<UserId> },

    #[error("missing permission '{permission}'")]
    PermissionDenied { permission: String },

    #[error(transparent)]
    PolicyEvaluation(#[from] GuardError),

    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl ApiError {
    pub fn permission_denied(permission: &str) -> Self {
        Self::PermissionDenied {
            permission: permission.to_string(),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity, id } => ApiError::NotFound { entity, id },
            other => ApiError::Storage(other),
        }
    }
}

impl From<DenyReason> for ApiError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::UnsupportedChannelType(channel_type) => {
                ApiError::UnsupportedChannelType(channel_type)
            }
            DenyReason::GroupConstraintDenied { denied } => {
                ApiError::GroupConstraintDenied { denied }
            }
        }
    }
}

fn format_group_denial(denied: &[UserId]) -> String {
    if denied.is_empty() {
        return "channel membership is managed by group sync".to_string();
    }
    let ids: Vec<String> = denied.iter().map(ToString::to_string).collect();
    format!("users not permitted by group sync: {}", ids.join(", "))
}
