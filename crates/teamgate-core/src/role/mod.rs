mod validation;

pub use validation::{RoleLimits, clean_role_names, is_valid_role_name, validate_role};

use serde::{Deserialize, Serialize};

use crate::model::RoleId;

/// A named permission bundle.
///
/// `permissions` is an ordered set: construction and patching keep the first
/// occurrence of every identifier and drop later duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub permissions: Vec<String>,
    pub scheme_managed: bool,
    pub built_in: bool,
}

impl Role {
    pub fn new<I, P>(
        name: impl Into<String>,
        display_name: impl Into<String>,
        permissions: I,
    ) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            id: RoleId::generate(),
            name: name.into(),
            display_name: display_name.into(),
            description: String::new(),
            permissions: dedup_ordered(permissions.into_iter().map(Into::into)),
            scheme_managed: false,
            built_in: false,
        }
    }

    pub fn built_in(mut self) -> Self {
        self.built_in = true;
        self
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }

    pub fn apply_patch(&mut self, patch: &RolePatch) {
        if let Some(ref display_name) = patch.display_name {
            self.display_name = display_name.clone();
        }
        if let Some(ref description) = patch.description {
            self.description = description.clone();
        }
        if let Some(ref permissions) = patch.permissions {
            self.permissions = dedup_ordered(permissions.iter().cloned());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolePatch {
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
}

impl RolePatch {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.description.is_none() && self.permissions.is_none()
    }
}

fn dedup_ordered(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_role_deduplicates_permissions_in_order() {
        let role = Role::new(
            "channel_moderator",
            "Channel Moderator",
            ["create_post", "add_reaction", "create_post"],
        );

        assert_eq!(role.permissions, vec!["create_post", "add_reaction"]);
        assert!(!role.built_in);
    }

    #[test]
    fn has_permission_checks_membership() {
        let role = Role::new("system_admin", "System Admin", ["manage_system"]);

        assert!(role.has_permission("manage_system"));
        assert!(!role.has_permission("create_post"));
    }

    #[test]
    fn patch_overwrites_only_present_fields() {
        let mut role = Role::new("team_user", "Team User", ["view_team"]);
        role.description = "default team member".to_string();

        role.apply_patch(&RolePatch {
            permissions: Some(vec!["view_team".to_string(), "create_post".to_string()]),
            ..Default::default()
        });

        assert_eq!(role.display_name, "Team User");
        assert_eq!(role.description, "default team member");
        assert_eq!(role.permissions, vec!["view_team", "create_post"]);
    }

    #[test]
    fn patch_with_empty_permission_list_clears_permissions() {
        let mut role = Role::new("team_user", "Team User", ["view_team"]);

        role.apply_patch(&RolePatch {
            permissions: Some(vec![]),
            ..Default::default()
        });

        assert!(role.permissions.is_empty());
    }

    #[test]
    fn patch_never_touches_identity() {
        let mut role = Role::new("team_user", "Team User", ["view_team"]).built_in();
        let id = role.id;

        role.apply_patch(&RolePatch {
            display_name: Some("Member".to_string()),
            ..Default::default()
        });

        assert_eq!(role.id, id);
        assert_eq!(role.name, "team_user");
        assert!(role.built_in);
    }

    #[test]
    fn role_patch_deserializes_partial_payload() {
        let patch: RolePatch =
            serde_json::from_str(r#"{"permissions": ["create_post"]}"#).unwrap();

        assert_eq!(patch.display_name, None);
        assert_eq!(patch.permissions, Some(vec!["create_post".to_string()]));
        assert!(!patch.is_empty());
        assert!(RolePatch::default().is_empty());
    }
}
