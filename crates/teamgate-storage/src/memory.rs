use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use teamgate_core::model::{Channel, ChannelId, ChannelMember, RoleId, User, UserId};
use teamgate_core::role::Role;

use crate::traits::{ChannelStore, MembershipStore, RoleStore, StorageError, UserStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    pub protect_built_in_roles: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            protect_built_in_roles: true,
        }
    }
}

#[derive(Debug, Default)]
struct InnerState {
    channels: HashMap<ChannelId, Channel>,
    users: HashMap<UserId, User>,
    members: HashSet<ChannelMember>,
    group_allowed: HashMap<ChannelId, HashSet<UserId>>,
    roles: HashMap<RoleId, Role>,
}

impl InnerState {
    fn role_name_taken(&self, name: &str, except: Option<&RoleId>) -> bool {
        self.roles
            .values()
            .any(|r| r.name == name && Some(&r.id) != except)
    }
}

/// Process-local store backing every collaborator trait.
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<InnerState>>,
    options: StoreOptions,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: StoreOptions) -> Self {
        Self {
            state: Arc::default(),
            options,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, InnerState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Internal(format!("store lock poisoned: {e}")))
    }

    fn seed(&self) -> MutexGuard<'_, InnerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_user(&self, user: User) {
        self.seed().users.insert(user.id, user);
    }

    pub fn insert_channel(&self, channel: Channel) {
        self.seed().channels.insert(channel.id, channel);
    }

    pub fn insert_role(&self, role: Role) {
        self.seed().roles.insert(role.id, role);
    }

    pub fn insert_member(&self, member: ChannelMember) {
        self.seed().members.insert(member);
    }

    /// Marks `users` as synced into `channel` by group membership.
    pub fn allow_group_members(
        &self,
        channel_id: ChannelId,
        users: impl IntoIterator<Item = UserId>,
    ) {
        self.seed()
            .group_allowed
            .entry(channel_id)
            .or_default()
            .extend(users);
    }

    pub fn is_member(&self, channel_id: &ChannelId, user_id: &UserId) -> bool {
        self.seed()
            .members
            .contains(&ChannelMember::new(*channel_id, *user_id))
    }

    pub fn member_count(&self) -> usize {
        self.seed().members.len()
    }

    pub fn stored_role(&self, id: &RoleId) -> Option<Role> {
        self.seed().roles.get(id).cloned()
    }

    pub fn stored_channel(&self, id: &ChannelId) -> Option<Channel> {
        self.seed().channels.get(id).cloned()
    }
}

impl ChannelStore for InMemoryStore {
    async fn fetch_channel(&self, id: &ChannelId) -> Result<Channel, StorageError> {
        let state = self.lock()?;
        state
            .channels
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("channel", id))
    }

    async fn create_channel(&self, channel: &Channel) -> Result<Channel, StorageError> {
        let mut state = self.lock()?;

        if state.channels.contains_key(&channel.id) {
            return Err(StorageError::already_exists("channel", channel.id));
        }
        if state.channels.values().any(|c| c.name == channel.name) {
            return Err(StorageError::already_exists("channel", &channel.name));
        }

        state.channels.insert(channel.id, channel.clone());
        Ok(channel.clone())
    }

    async fn update_channel(&self, channel: &Channel) -> Result<Channel, StorageError> {
        let mut state = self.lock()?;

        if state
            .channels
            .values()
            .any(|c| c.name == channel.name && c.id != channel.id)
        {
            return Err(StorageError::already_exists("channel", &channel.name));
        }

        let stored = state
            .channels
            .get_mut(&channel.id)
            .ok_or_else(|| StorageError::not_found("channel", channel.id))?;
        *stored = channel.clone();
        Ok(stored.clone())
    }
}

impl UserStore for InMemoryStore {
    async fn fetch_user(&self, id: &UserId) -> Result<User, StorageError> {
        let state = self.lock()?;
        state
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("user", id))
    }
}

impl MembershipStore for InMemoryStore {
    async fn add_member(
        &self,
        user: &User,
        channel: &Channel,
    ) -> Result<ChannelMember, StorageError> {
        let mut state = self.lock()?;

        if !state.channels.contains_key(&channel.id) {
            return Err(StorageError::not_found("channel", channel.id));
        }
        if !state.users.contains_key(&user.id) {
            return Err(StorageError::not_found("user", user.id));
        }

        let member = ChannelMember::new(channel.id, user.id);
        if !state.members.insert(member) {
            return Err(StorageError::already_exists(
                "channel member",
                format!("{}/{}", channel.id, user.id),
            ));
        }
        Ok(member)
    }

    async fn remove_member(&self, user_id: &UserId, channel: &Channel) -> Result<(), StorageError> {
        let mut state = self.lock()?;

        let member = ChannelMember::new(channel.id, *user_id);
        if !state.members.remove(&member) {
            return Err(StorageError::not_found(
                "channel member",
                format!("{}/{}", channel.id, user_id),
            ));
        }
        Ok(())
    }

    async fn fetch_member(
        &self,
        channel_id: &ChannelId,
        user_id: &UserId,
    ) -> Result<ChannelMember, StorageError> {
        let state = self.lock()?;

        let member = ChannelMember::new(*channel_id, *user_id);
        if state.members.contains(&member) {
            Ok(member)
        } else {
            Err(StorageError::not_found(
                "channel member",
                format!("{channel_id}/{user_id}"),
            ))
        }
    }

    async fn resolve_group_allowed(
        &self,
        channel: &Channel,
        candidates: &[UserId],
    ) -> Result<HashSet<UserId>, StorageError> {
        let state = self.lock()?;

        let Some(allowed) = state.group_allowed.get(&channel.id) else {
            return Ok(HashSet::new());
        };
        Ok(candidates
            .iter()
            .filter(|id| allowed.contains(*id))
            .copied()
            .collect())
    }
}

impl RoleStore for InMemoryStore {
    async fn fetch_role(&self, id: &RoleId) -> Result<Role, StorageError> {
        let state = self.lock()?;
        state
            .roles
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("role", id))
    }

    async fn fetch_role_by_name(&self, name: &str) -> Result<Role, StorageError> {
        let state = self.lock()?;
        state
            .roles
            .values()
            .find(|r| r.name == name)
            .cloned()
            .ok_or_else(|| StorageError::not_found("role", name))
    }

    async fn fetch_roles_by_names(&self, names: &[String]) -> Result<Vec<Role>, StorageError> {
        let state = self.lock()?;
        let mut roles: Vec<Role> = state
            .roles
            .values()
            .filter(|r| names.contains(&r.name))
            .cloned()
            .collect();
        roles.sort_by_key(|r| names.iter().position(|n| *n == r.name));
        Ok(roles)
    }

    async fn create_role(&self, role: &Role) -> Result<Role, StorageError> {
        let mut state = self.lock()?;

        if state.roles.contains_key(&role.id) {
            return Err(StorageError::already_exists("role", role.id));
        }
        if state.role_name_taken(&role.name, None) {
            return Err(StorageError::already_exists("role", &role.name));
        }

        state.roles.insert(role.id, role.clone());
        Ok(role.clone())
    }

    async fn update_role(&self, role: &Role) -> Result<Role, StorageError> {
        let mut state = self.lock()?;

        if state.role_name_taken(&role.name, Some(&role.id)) {
            return Err(StorageError::already_exists("role", &role.name));
        }

        let stored = state
            .roles
            .get_mut(&role.id)
            .ok_or_else(|| StorageError::not_found("role", role.id))?;
        *stored = role.clone();
        Ok(stored.clone())
    }

    async fn delete_role(&self, id: &RoleId) -> Result<Role, StorageError> {
        let mut state = self.lock()?;

        let role = state
            .roles
            .get(id)
            .ok_or_else(|| StorageError::not_found("role", id))?;
        if role.built_in && self.options.protect_built_in_roles {
            tracing::debug!(role = %role.name, "refusing to delete built-in role");
            return Err(StorageError::BuiltInRoleProtected(role.name.clone()));
        }

        state
            .roles
            .remove(id)
            .ok_or_else(|| StorageError::not_found("role", id))
    }
}
