use std::collections::HashMap;
use std::sync::LazyLock;

use serde::Serialize;

use crate::model::ModelError;

pub const MANAGE_SYSTEM: &str = "manage_system";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionScope {
    System,
    Team,
    Channel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Permission {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub scope: PermissionScope,
}

const fn permission(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    scope: PermissionScope,
) -> Permission {
    Permission {
        id,
        name,
        description,
        scope,
    }
}

use PermissionScope::{Channel, System, Team};

#[rustfmt::skip]
const DEFINITIONS: &[Permission] = &[
    permission("invite_user", "Invite user", "Invite users to a team", Team),
    permission("add_user_to_team", "Add user to team", "Add users to a team", Team),
    permission("remove_user_from_team", "Remove user from team", "Remove users from a team", Team),
    permission("use_slash_commands", "Use slash commands", "Run slash commands", Channel),
    permission("manage_slash_commands", "Manage slash commands", "Create, edit and delete own slash commands", Team),
    permission("manage_others_slash_commands", "Manage others' slash commands", "Edit and delete slash commands created by others", Team),
    permission("create_public_channel", "Create public channels", "Create public channels", Team),
    permission("create_private_channel", "Create private channels", "Create private channels", Team),
    permission("manage_public_channel_members", "Manage public channel members", "Add and remove public channel members", Channel),
    permission("manage_private_channel_members", "Manage private channel members", "Add and remove private channel members", Channel),
    permission("manage_public_channel_properties", "Manage public channel properties", "Update public channel name, header and purpose", Channel),
    permission("manage_private_channel_properties", "Manage private channel properties", "Update private channel name, header and purpose", Channel),
    permission("delete_public_channel", "Delete public channels", "Archive public channels", Channel),
    permission("delete_private_channel", "Delete private channels", "Archive private channels", Channel),
    permission("read_channel", "Read channel", "Read channel contents", Channel),
    permission("read_public_channel", "Read public channel", "Read public channel contents", Team),
    permission("list_team_channels", "List team channels", "List the channels of a team", Team),
    permission("join_public_channels", "Join public channels", "Join public channels", Team),
    permission("create_direct_channel", "Create direct channels", "Start direct conversations", System),
    permission("create_group_channel", "Create group channels", "Start group conversations", System),
    permission("create_post", "Create post", "Post messages", Channel),
    permission("create_post_public", "Create public post", "Post in channels the user is not a member of", Channel),
    permission("edit_post", "Edit post", "Edit own posts", Channel),
    permission("edit_others_posts", "Edit others' posts", "Edit posts of other users", Channel),
    permission("delete_post", "Delete post", "Delete own posts", Channel),
    permission("delete_others_posts", "Delete others' posts", "Delete posts of other users", Channel),
    permission("add_reaction", "Add reaction", "Add emoji reactions", Channel),
    permission("remove_reaction", "Remove reaction", "Remove own reactions", Channel),
    permission("remove_others_reactions", "Remove others' reactions", "Remove reactions of other users", Channel),
    permission("upload_file", "Upload file", "Attach files to posts", Channel),
    permission("get_public_link", "Get public link", "Create public links to files", System),
    permission("use_channel_mentions", "Use channel mentions", "Notify a whole channel with @channel", Channel),
    permission("use_group_mentions", "Use group mentions", "Notify a group with a group mention", Channel),
    permission("create_team", "Create team", "Create new teams", System),
    permission("manage_team", "Manage team", "Update team settings", Team),
    permission("view_team", "View team", "View a team", Team),
    permission("list_public_teams", "List public teams", "List teams open to everyone", System),
    permission("join_public_teams", "Join public teams", "Join teams open to everyone", System),
    permission("manage_team_roles", "Manage team roles", "Assign team roles", Team),
    permission("manage_channel_roles", "Manage channel roles", "Assign channel roles", Channel),
    permission("manage_roles", "Manage roles", "Assign system roles", System),
    permission("assign_system_admin_role", "Assign system admin role", "Grant the system admin role", System),
    permission("manage_webhooks", "Manage webhooks", "Create, edit and delete own webhooks", Team),
    permission("manage_others_webhooks", "Manage others' webhooks", "Edit and delete webhooks of other users", Team),
    permission("manage_oauth", "Manage OAuth applications", "Register own OAuth applications", System),
    permission("manage_system_wide_oauth", "Manage all OAuth applications", "Manage OAuth applications of all users", System),
    permission("edit_other_users", "Edit other users", "Edit profiles of other users", System),
    permission("permanent_delete_user", "Permanently delete user", "Delete users and their content", System),
    permission("view_members", "View members", "List users of the system", System),
    permission("create_user_access_token", "Create access token", "Create personal access tokens", System),
    permission("read_user_access_token", "Read access tokens", "List personal access tokens", System),
    permission("revoke_user_access_token", "Revoke access token", "Revoke personal access tokens", System),
    permission("create_bot", "Create bot", "Create bot accounts", System),
    permission("read_bots", "Read bots", "List own bot accounts", System),
    permission("read_others_bots", "Read others' bots", "List bot accounts of other users", System),
    permission("manage_bots", "Manage bots", "Update own bot accounts", System),
    permission("manage_others_bots", "Manage others' bots", "Update bot accounts of other users", System),
    permission("manage_jobs", "Manage jobs", "Create and cancel background jobs", System),
    permission(MANAGE_SYSTEM, "Manage system", "Full administrative access", System),
];

static GLOBAL: LazyLock<PermissionCatalog> =
    LazyLock::new(|| PermissionCatalog::from_definitions(DEFINITIONS));

/// Immutable registry of every permission the system knows about.
///
/// The process-wide instance is built on first use and never changes, so it
/// can be shared by reference without locking.
#[derive(Debug)]
pub struct PermissionCatalog {
    permissions: Vec<Permission>,
    index: HashMap<&'static str, usize>,
}

impl PermissionCatalog {
    pub fn global() -> &'static PermissionCatalog {
        &GLOBAL
    }

    fn from_definitions(definitions: &[Permission]) -> Self {
        let mut permissions = Vec::with_capacity(definitions.len());
        let mut index = HashMap::with_capacity(definitions.len());
        for def in definitions {
            if index.contains_key(def.id) {
                continue;
            }
            index.insert(def.id, permissions.len());
            permissions.push(def.clone());
        }
        Self { permissions, index }
    }

    pub fn all(&self) -> &[Permission] {
        &self.permissions
    }

    pub fn get(&self, id: &str) -> Option<&Permission> {
        self.index.get(id).map(|&i| &self.permissions[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Rejects any identifier not present in the catalog, listing all of them.
    pub fn validate<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> Result<(), ModelError> {
        let unknown: Vec<&str> = ids.into_iter().filter(|id| !self.contains(id)).collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(ModelError::invalid(
                "permissions",
                format!("unknown permissions: {}", unknown.join(", ")),
            ))
        }
    }
}
