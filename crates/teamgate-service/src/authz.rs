use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use teamgate_core::model::UserId;

/// Who is performing a privileged operation.
///
/// Local actors come from the trusted local administration channel and carry
/// no user or session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActorContext {
    pub user_id: Option<UserId>,
    pub session_id: Option<String>,
    pub client_addr: Option<String>,
    pub local: bool,
}

impl ActorContext {
    pub fn local() -> Self {
        Self {
            user_id: None,
            session_id: None,
            client_addr: None,
            local: true,
        }
    }

    pub fn session(user_id: UserId, session_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id),
            session_id: Some(session_id.into()),
            client_addr: None,
            local: false,
        }
    }

    pub fn with_client_addr(mut self, addr: impl Into<String>) -> Self {
        self.client_addr = Some(addr.into());
        self
    }
}

impl fmt::Display for ActorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.user_id, self.local) {
            (Some(user_id), _) => write!(f, "user:{user_id}"),
            (None, true) => f.write_str("local"),
            (None, false) => f.write_str("anonymous"),
        }
    }
}

pub trait PermissionChecker: Send + Sync {
    fn has_permission(&self, actor: &ActorContext, permission: &str) -> bool;
}

impl<F> PermissionChecker for F
where
    F: Fn(&ActorContext, &str) -> bool + Send + Sync,
{
    fn has_permission(&self, actor: &ActorContext, permission: &str) -> bool {
        self(actor, permission)
    }
}

/// Static per-user permission grants.
#[derive(Debug, Clone, Default)]
pub struct GrantTable {
    grants: HashMap<UserId, HashSet<String>>,
    trust_local: bool,
}

impl GrantTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local actors hold every permission.
    pub fn trusting_local(mut self) -> Self {
        self.trust_local = true;
        self
    }

    pub fn grant<I, P>(mut self, user_id: UserId, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.grants
            .entry(user_id)
            .or_default()
            .extend(permissions.into_iter().map(Into::into));
        self
    }
}

impl PermissionChecker for GrantTable {
    fn has_permission(&self, actor: &ActorContext, permission: &str) -> bool {
        if actor.local {
            return self.trust_local;
        }
        actor
            .user_id
            .and_then(|id| self.grants.get(&id))
            .is_some_and(|perms| perms.contains(permission))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teamgate_core::permissions::MANAGE_SYSTEM;

    #[test]
    fn actor_display_prefers_user() {
        let user = UserId::generate();

        assert_eq!(
            ActorContext::session(user, "s1").to_string(),
            format!("user:{user}")
        );
        assert_eq!(ActorContext::local().to_string(), "local");
    }

    #[test]
    fn grant_table_checks_user_grants() {
        let admin = UserId::generate();
        let member = UserId::generate();
        let table = GrantTable::new().grant(admin, [MANAGE_SYSTEM]);

        assert!(table.has_permission(&ActorContext::session(admin, "s1"), MANAGE_SYSTEM));
        assert!(!table.has_permission(&ActorContext::session(member, "s2"), MANAGE_SYSTEM));
        assert!(!table.has_permission(&ActorContext::session(admin, "s1"), "create_team"));
    }

    #[test]
    fn grant_table_local_trust_is_opt_in() {
        let local = ActorContext::local();

        assert!(!GrantTable::new().has_permission(&local, MANAGE_SYSTEM));
        assert!(GrantTable::new().trusting_local().has_permission(&local, MANAGE_SYSTEM));
    }

    #[test]
    fn closures_are_checkers() {
        let deny_all = |_: &ActorContext, _: &str| false;

        assert!(!deny_all.has_permission(&ActorContext::local(), MANAGE_SYSTEM));
    }

    #[test]
    fn client_addr_is_recorded() {
        let actor = ActorContext::session(UserId::generate(), "s1").with_client_addr("10.0.0.7");

        assert_eq!(actor.client_addr.as_deref(), Some("10.0.0.7"));
    }
}
