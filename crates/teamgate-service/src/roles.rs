use std::sync::Arc;

use teamgate_core::model::{ModelError, RoleId};
use teamgate_core::permissions::{MANAGE_SYSTEM, PermissionCatalog};
use teamgate_core::role::{
    Role, RoleLimits, RolePatch, clean_role_names, is_valid_role_name, validate_role,
};
use teamgate_storage::RoleStore;

use crate::audit::AuditRecorder;
use crate::authz::{ActorContext, PermissionChecker};
use crate::error::ApiError;

/// Role lifecycle gated on the system-management permission.
pub struct RoleAuthority<S: RoleStore, P: PermissionChecker> {
    store: Arc<S>,
    checker: Arc<P>,
    catalog: &'static PermissionCatalog,
    limits: RoleLimits,
    audit: AuditRecorder,
}

impl<S: RoleStore, P: PermissionChecker> RoleAuthority<S, P> {
    pub fn new(store: Arc<S>, checker: Arc<P>, audit: AuditRecorder) -> Self {
        Self {
            store,
            checker,
            catalog: PermissionCatalog::global(),
            limits: RoleLimits::default(),
            audit,
        }
    }

    pub fn with_limits(mut self, limits: RoleLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Creates a custom role. Built-in and scheme-managed flags are never
    /// taken from the caller.
    pub async fn create(&self, actor: &ActorContext, mut role: Role) -> Result<Role, ApiError> {
        role.built_in = false;
        role.scheme_managed = false;

        let mut audit = self.audit.open("createRole", actor);
        audit.add_meta("role", &role);

        self.require_manage_system(actor)?;
        validate_role(&role, self.catalog, &self.limits)?;

        let created = self.store.create_role(&role).await?;

        audit.mark_success();
        audit.add_meta("role", &created);
        audit.log_activity(&format!("name={}", created.name));

        Ok(created)
    }

    /// Applies `patch` to the stored role.
    ///
    /// The current role is fetched and patched in memory before the
    /// permission check, so a denied attempt still records what it would
    /// have changed. Nothing is persisted on denial.
    pub async fn patch(
        &self,
        actor: &ActorContext,
        role_id: &str,
        patch: &RolePatch,
    ) -> Result<Role, ApiError> {
        let role_id = RoleId::parse(role_id, "role_id")?;

        let mut audit = self.audit.open("patchRole", actor);

        let mut role = self.store.fetch_role(&role_id).await?;
        audit.add_meta("role", &role);
        audit.add_meta("patch", patch);

        role.apply_patch(patch);

        self.require_manage_system(actor)?;
        validate_role(&role, self.catalog, &self.limits)?;

        let patched = self.store.update_role(&role).await?;

        audit.mark_success();
        audit.add_meta("role", &patched);
        audit.log_activity(&format!("name={}", patched.name));

        Ok(patched)
    }

    pub async fn delete(&self, actor: &ActorContext, role_id: &str) -> Result<Role, ApiError> {
        let role_id = RoleId::parse(role_id, "role_id")?;

        let mut audit = self.audit.open("deleteRole", actor);

        let role = self.store.fetch_role(&role_id).await?;
        audit.add_meta("role", &role);

        self.require_manage_system(actor)?;

        let deleted = self.store.delete_role(&role.id).await?;

        audit.mark_success();
        audit.add_meta("role", &deleted);
        audit.log_activity(&format!("name={}", deleted.name));

        Ok(deleted)
    }

    pub async fn get_role(&self, role_id: &str) -> Result<Role, ApiError> {
        let role_id = RoleId::parse(role_id, "role_id")?;
        Ok(self.store.fetch_role(&role_id).await?)
    }

    pub async fn get_role_by_name(&self, name: &str) -> Result<Role, ApiError> {
        let name = name.trim();
        if !is_valid_role_name(name) {
            return Err(ModelError::invalid(
                "role_name",
                format!("'{name}' is not a valid role name"),
            )
            .into());
        }
        Ok(self.store.fetch_role_by_name(name).await?)
    }

    /// Unknown names are skipped; results follow the order of `names`.
    pub async fn get_roles_by_names(&self, names: &[String]) -> Result<Vec<Role>, ApiError> {
        let names = clean_role_names(names)?;
        Ok(self.store.fetch_roles_by_names(&names).await?)
    }

    fn require_manage_system(&self, actor: &ActorContext) -> Result<(), ApiError> {
        if self.checker.has_permission(actor, MANAGE_SYSTEM) {
            Ok(())
        } else {
            tracing::debug!(actor = %actor, permission = MANAGE_SYSTEM, "permission check failed");
            Err(ApiError::permission_denied(MANAGE_SYSTEM))
        }
    }
}
