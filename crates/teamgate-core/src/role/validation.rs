use super::Role;
use crate::model::ModelError;
use crate::permissions::PermissionCatalog;

const MAX_ROLE_NAME_LEN: usize = 64;
const MAX_ROLE_DISPLAY_NAME_LEN: usize = 128;
const MAX_ROLE_DESCRIPTION_LEN: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleLimits {
    pub max_permissions: usize,
}

impl Default for RoleLimits {
    fn default() -> Self {
        Self {
            max_permissions: 512,
        }
    }
}

/// Role names are lowercase ASCII letters, digits and `_`.
pub fn is_valid_role_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_ROLE_NAME_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

pub fn validate_role(
    role: &Role,
    catalog: &PermissionCatalog,
    limits: &RoleLimits,
) -> Result<(), ModelError> {
    if !is_valid_role_name(&role.name) {
        return Err(ModelError::invalid(
            "name",
            format!("'{}' is not a valid role name", role.name),
        ));
    }

    let display_len = role.display_name.chars().count();
    if display_len == 0 || display_len > MAX_ROLE_DISPLAY_NAME_LEN {
        return Err(ModelError::invalid(
            "display_name",
            format!("must be 1..={MAX_ROLE_DISPLAY_NAME_LEN} characters"),
        ));
    }

    if role.description.chars().count() > MAX_ROLE_DESCRIPTION_LEN {
        return Err(ModelError::invalid(
            "description",
            format!("exceeds {MAX_ROLE_DESCRIPTION_LEN} characters"),
        ));
    }

    if role.permissions.len() > limits.max_permissions {
        return Err(ModelError::invalid(
            "permissions",
            format!(
                "{} permissions exceeds limit of {}",
                role.permissions.len(),
                limits.max_permissions
            ),
        ));
    }

    catalog.validate(role.permissions.iter().map(String::as_str))
}

/// Trims every name and rejects the batch if any of them is malformed.
pub fn clean_role_names(names: &[String]) -> Result<Vec<String>, ModelError> {
    if names.is_empty() {
        return Err(ModelError::invalid("rolenames", "at least one name is required"));
    }

    names
        .iter()
        .map(|raw| {
            let name = raw.trim();
            if is_valid_role_name(name) {
                Ok(name.to_string())
            } else {
                Err(ModelError::invalid(
                    "rolename",
                    format!("'{name}' is not a valid role name"),
                ))
            }
        })
        .collect()
}
