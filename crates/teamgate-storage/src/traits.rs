use std::collections::HashSet;
use std::future::Future;

use teamgate_core::model::{Channel, ChannelId, ChannelMember, RoleId, User, UserId};
use teamgate_core::role::Role;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    #[error("{entity} '{id}' already exists")]
    AlreadyExists { entity: &'static str, id: String },
    #[error("built-in role '{0}' cannot be deleted")]
    BuiltInRoleProtected(String),
    #[error("internal storage error: {0}")]
    Internal(String),
}

impl StorageError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn already_exists(entity: &'static str, id: impl ToString) -> Self {
        Self::AlreadyExists {
            entity,
            id: id.to_string(),
        }
    }
}

pub trait ChannelStore: Send + Sync {
    fn fetch_channel(
        &self,
        id: &ChannelId,
    ) -> impl Future<Output = Result<Channel, StorageError>> + Send;

    fn create_channel(
        &self,
        channel: &Channel,
    ) -> impl Future<Output = Result<Channel, StorageError>> + Send;

    fn update_channel(
        &self,
        channel: &Channel,
    ) -> impl Future<Output = Result<Channel, StorageError>> + Send;
}

pub trait UserStore: Send + Sync {
    fn fetch_user(&self, id: &UserId) -> impl Future<Output = Result<User, StorageError>> + Send;
}

pub trait MembershipStore: Send + Sync {
    fn add_member(
        &self,
        user: &User,
        channel: &Channel,
    ) -> impl Future<Output = Result<ChannelMember, StorageError>> + Send;

    fn remove_member(
        &self,
        user_id: &UserId,
        channel: &Channel,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn fetch_member(
        &self,
        channel_id: &ChannelId,
        user_id: &UserId,
    ) -> impl Future<Output = Result<ChannelMember, StorageError>> + Send;

    /// Returns the subset of `candidates` that group sync permits in `channel`.
    fn resolve_group_allowed(
        &self,
        channel: &Channel,
        candidates: &[UserId],
    ) -> impl Future<Output = Result<HashSet<UserId>, StorageError>> + Send;
}

pub trait RoleStore: Send + Sync {
    fn fetch_role(&self, id: &RoleId) -> impl Future<Output = Result<Role, StorageError>> + Send;

    fn fetch_role_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Role, StorageError>> + Send;

    fn fetch_roles_by_names(
        &self,
        names: &[String],
    ) -> impl Future<Output = Result<Vec<Role>, StorageError>> + Send;

    fn create_role(&self, role: &Role) -> impl Future<Output = Result<Role, StorageError>> + Send;

    fn update_role(&self, role: &Role) -> impl Future<Output = Result<Role, StorageError>> + Send;

    fn delete_role(&self, id: &RoleId) -> impl Future<Output = Result<Role, StorageError>> + Send;
}
