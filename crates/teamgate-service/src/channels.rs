use std::sync::Arc;

use teamgate_core::membership::{can_add_member, can_remove_member};
use teamgate_core::model::{Channel, ChannelId, ChannelMember, ChannelPatch, UserId};
use teamgate_storage::{ChannelStore, MembershipStore, UserStore};

use crate::adapter::StoreGroupResolver;
use crate::audit::AuditRecorder;
use crate::authz::ActorContext;
use crate::error::ApiError;

/// Channel administration on the trusted local surface.
///
/// Callers are already authorized; every mutation is still audited.
pub struct ChannelAdmin<S> {
    store: Arc<S>,
    audit: AuditRecorder,
}

impl<S> ChannelAdmin<S>
where
    S: ChannelStore + UserStore + MembershipStore,
{
    pub fn new(store: Arc<S>, audit: AuditRecorder) -> Self {
        Self { store, audit }
    }

    pub async fn add_member(
        &self,
        actor: &ActorContext,
        channel_id: &str,
        user_id: &str,
    ) -> Result<ChannelMember, ApiError> {
        let channel_id = ChannelId::parse(channel_id, "channel_id")?;
        let user_id = UserId::parse(user_id, "user_id")?;

        let mut audit = self.audit.open("addChannelMember", actor);

        let channel = self.store.fetch_channel(&channel_id).await?;
        audit.add_meta("channel", &channel);

        let user = self.store.fetch_user(&user_id).await?;

        let resolver = StoreGroupResolver::new(Arc::clone(&self.store));
        can_add_member(&channel, &user, &resolver)
            .await?
            .into_result()?;

        let member = self.store.add_member(&user, &channel).await?;

        audit.mark_success();
        audit.add_meta("add_user_id", &user.id);
        audit.log_activity(&format!("name={} user_id={}", channel.name, user.id));

        Ok(member)
    }

    pub async fn remove_member(
        &self,
        actor: &ActorContext,
        channel_id: &str,
        user_id: &str,
    ) -> Result<(), ApiError> {
        let channel_id = ChannelId::parse(channel_id, "channel_id")?;
        let user_id = UserId::parse(user_id, "user_id")?;

        let mut audit = self.audit.open("removeChannelMember", actor);

        let channel = self.store.fetch_channel(&channel_id).await?;
        audit.add_meta("channel", &channel);

        let user = self.store.fetch_user(&user_id).await?;
        audit.add_meta("remove_user_id", &user.id);

        can_remove_member(&channel, &user).into_result()?;

        self.store.remove_member(&user.id, &channel).await?;

        audit.mark_success();
        audit.log_activity(&format!("name={} user_id={}", channel.name, user.id));

        Ok(())
    }

    pub async fn create_channel(
        &self,
        actor: &ActorContext,
        channel: Channel,
    ) -> Result<Channel, ApiError> {
        let mut audit = self.audit.open("createChannel", actor);
        audit.add_meta("channel", &channel);

        if channel.channel_type.has_fixed_participants() {
            return Err(ApiError::UnsupportedChannelType(channel.channel_type));
        }
        channel.validate()?;

        let created = self.store.create_channel(&channel).await?;

        audit.mark_success();
        audit.add_meta("channel", &created);
        audit.log_activity(&format!("name={}", created.name));

        Ok(created)
    }

    pub async fn patch_channel(
        &self,
        actor: &ActorContext,
        channel_id: &str,
        patch: &ChannelPatch,
    ) -> Result<Channel, ApiError> {
        let channel_id = ChannelId::parse(channel_id, "channel_id")?;

        let mut audit = self.audit.open("patchChannel", actor);

        let mut channel = self.store.fetch_channel(&channel_id).await?;
        audit.add_meta("channel", &channel);
        audit.add_meta("patch", patch);

        channel.apply_patch(patch);
        channel.validate()?;

        let patched = self.store.update_channel(&channel).await?;

        audit.mark_success();
        audit.add_meta("channel", &patched);
        audit.log_activity(&format!("name={}", patched.name));

        Ok(patched)
    }

    pub async fn get_member(
        &self,
        channel_id: &str,
        user_id: &str,
    ) -> Result<ChannelMember, ApiError> {
        let channel_id = ChannelId::parse(channel_id, "channel_id")?;
        let user_id = UserId::parse(user_id, "user_id")?;

        Ok(self.store.fetch_member(&channel_id, &user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditStatus, MemoryAuditSink};
    use std::collections::HashSet;
    use teamgate_core::membership::GuardError;
    use teamgate_core::model::{ChannelType, User};
    use teamgate_storage::{InMemoryStore, StorageError};

    /// Delegates to an in-memory store but cannot reach group sync.
    struct GroupSyncDown {
        inner: InMemoryStore,
    }

    impl ChannelStore for GroupSyncDown {
        async fn fetch_channel(&self, id: &ChannelId) -> Result<Channel, StorageError> {
            self.inner.fetch_channel(id).await
        }

        async fn create_channel(&self, channel: &Channel) -> Result<Channel, StorageError> {
            self.inner.create_channel(channel).await
        }

        async fn update_channel(&self, channel: &Channel) -> Result<Channel, StorageError> {
            self.inner.update_channel(channel).await
        }
    }

    impl UserStore for GroupSyncDown {
        async fn fetch_user(&self, id: &UserId) -> Result<User, StorageError> {
            self.inner.fetch_user(id).await
        }
    }

    impl MembershipStore for GroupSyncDown {
        async fn add_member(
            &self,
            user: &User,
            channel: &Channel,
        ) -> Result<ChannelMember, StorageError> {
            self.inner.add_member(user, channel).await
        }

        async fn remove_member(
            &self,
            user_id: &UserId,
            channel: &Channel,
        ) -> Result<(), StorageError> {
            self.inner.remove_member(user_id, channel).await
        }

        async fn fetch_member(
            &self,
            channel_id: &ChannelId,
            user_id: &UserId,
        ) -> Result<ChannelMember, StorageError> {
            self.inner.fetch_member(channel_id, user_id).await
        }

        async fn resolve_group_allowed(
            &self,
            _channel: &Channel,
            _candidates: &[UserId],
        ) -> Result<HashSet<UserId>, StorageError> {
            Err(StorageError::Internal("ldap unreachable".to_string()))
        }
    }

    fn make_admin() -> (ChannelAdmin<InMemoryStore>, Arc<InMemoryStore>, Arc<MemoryAuditSink>) {
        let store = Arc::new(InMemoryStore::new());
        let sink = Arc::new(MemoryAuditSink::new());
        let admin = ChannelAdmin::new(Arc::clone(&store), AuditRecorder::new(sink.clone()));
        (admin, store, sink)
    }

    fn seed_channel(
        store: &InMemoryStore,
        channel_type: ChannelType,
        constrained: bool,
    ) -> Channel {
        let channel = Channel::new("town-square", "Town Square", channel_type)
            .with_group_constraint(constrained);
        store.insert_channel(channel.clone());
        channel
    }

    fn seed_user(store: &InMemoryStore, user: User) -> User {
        store.insert_user(user.clone());
        user
    }

    // --- add_member ---

    #[tokio::test]
    async fn add_member_to_open_channel_succeeds() {
        let (admin, store, sink) = make_admin();
        let channel = seed_channel(&store, ChannelType::Open, false);
        let user = seed_user(&store, User::new("alice"));

        let member = admin
            .add_member(
                &ActorContext::local(),
                &channel.id.to_string(),
                &user.id.to_string(),
            )
            .await
            .unwrap();

        assert_eq!(member, ChannelMember::new(channel.id, user.id));
        assert!(store.is_member(&channel.id, &user.id));

        let record = sink.last().unwrap();
        assert_eq!(record.action, "addChannelMember");
        assert_eq!(record.status, AuditStatus::Success);
        assert_eq!(
            record.meta("add_user_id"),
            Some(&serde_json::json!(user.id.to_string()))
        );
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn add_member_denied_by_group_constraint_persists_nothing() {
        let (admin, store, sink) = make_admin();
        let channel = seed_channel(&store, ChannelType::Private, true);
        let user = seed_user(&store, User::new("mallory"));

        let err = admin
            .add_member(
                &ActorContext::local(),
                &channel.id.to_string(),
                &user.id.to_string(),
            )
            .await
            .unwrap_err();

        assert!(
            matches!(
                err,
                ApiError::GroupConstraintDenied { ref denied } if denied == &vec![user.id]
            ),
            "expected GroupConstraintDenied, got: {err:?}"
        );
        assert_eq!(store.member_count(), 0);

        let record = sink.last().unwrap();
        assert_eq!(record.status, AuditStatus::Fail);
        assert!(record.meta("channel").is_some());
        assert!(record.meta("add_user_id").is_none());
    }

    #[tokio::test]
    async fn add_member_allowed_by_group_sync() {
        let (admin, store, sink) = make_admin();
        let channel = seed_channel(&store, ChannelType::Private, true);
        let user = seed_user(&store, User::new("alice"));
        store.allow_group_members(channel.id, [user.id]);

        admin
            .add_member(
                &ActorContext::local(),
                &channel.id.to_string(),
                &user.id.to_string(),
            )
            .await
            .unwrap();

        assert!(store.is_member(&channel.id, &user.id));
        assert_eq!(sink.last().unwrap().status, AuditStatus::Success);
    }

    #[tokio::test]
    async fn add_member_rejects_direct_channels() {
        let (admin, store, sink) = make_admin();
        let channel = seed_channel(&store, ChannelType::Direct, false);
        let user = seed_user(&store, User::new("alice"));

        let err = admin
            .add_member(
                &ActorContext::local(),
                &channel.id.to_string(),
                &user.id.to_string(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApiError::UnsupportedChannelType(ChannelType::Direct)
        ));
        assert_eq!(sink.last().unwrap().status, AuditStatus::Fail);
    }

    #[tokio::test]
    async fn add_member_with_malformed_id_is_not_audited() {
        let (admin, _store, sink) = make_admin();

        let err = admin
            .add_member(&ActorContext::local(), "not-a-uuid", "")
            .await
            .unwrap_err();

        assert!(
            matches!(err, ApiError::InvalidParam(ref e) if e.field() == "channel_id"),
            "expected InvalidParam, got: {err:?}"
        );
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn add_member_unknown_channel_is_not_found() {
        let (admin, store, sink) = make_admin();
        let user = seed_user(&store, User::new("alice"));

        let err = admin
            .add_member(
                &ActorContext::local(),
                &ChannelId::generate().to_string(),
                &user.id.to_string(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::NotFound { entity: "channel", .. }));
        let record = sink.last().unwrap();
        assert_eq!(record.status, AuditStatus::Fail);
        assert!(record.meta.is_empty());
    }

    #[tokio::test]
    async fn add_member_twice_passes_store_error_through() {
        let (admin, store, sink) = make_admin();
        let channel = seed_channel(&store, ChannelType::Open, false);
        let user = seed_user(&store, User::new("alice"));
        let (cid, uid) = (channel.id.to_string(), user.id.to_string());

        admin
            .add_member(&ActorContext::local(), &cid, &uid)
            .await
            .unwrap();
        let err = admin
            .add_member(&ActorContext::local(), &cid, &uid)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApiError::Storage(StorageError::AlreadyExists { .. })
        ));
        let statuses: Vec<AuditStatus> = sink.records().iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec![AuditStatus::Success, AuditStatus::Fail]);
    }

    #[tokio::test]
    async fn add_member_resolver_failure_is_policy_evaluation() {
        let inner = InMemoryStore::new();
        let channel = seed_channel(&inner, ChannelType::Private, true);
        let user = seed_user(&inner, User::new("alice"));
        inner.allow_group_members(channel.id, [user.id]);
        let store = Arc::new(GroupSyncDown {
            inner: inner.clone(),
        });
        let sink = Arc::new(MemoryAuditSink::new());
        let admin = ChannelAdmin::new(store, AuditRecorder::new(sink.clone()));

        let err = admin
            .add_member(
                &ActorContext::local(),
                &channel.id.to_string(),
                &user.id.to_string(),
            )
            .await
            .unwrap_err();

        assert!(
            matches!(
                err,
                ApiError::PolicyEvaluation(GuardError::PolicyEvaluation(ref msg))
                    if msg.contains("ldap unreachable")
            ),
            "expected PolicyEvaluation, got: {err:?}"
        );
        assert_eq!(inner.member_count(), 0);
        assert_eq!(sink.len(), 1);
        let record = sink.last().unwrap();
        assert_eq!(record.status, AuditStatus::Fail);
        assert!(record.meta("add_user_id").is_none());
    }

    // --- remove_member ---

    #[tokio::test]
    async fn remove_member_from_open_channel_succeeds() {
        let (admin, store, sink) = make_admin();
        let channel = seed_channel(&store, ChannelType::Open, false);
        let user = seed_user(&store, User::new("alice"));
        store.insert_member(ChannelMember::new(channel.id, user.id));

        admin
            .remove_member(
                &ActorContext::local(),
                &channel.id.to_string(),
                &user.id.to_string(),
            )
            .await
            .unwrap();

        assert!(!store.is_member(&channel.id, &user.id));
        let record = sink.last().unwrap();
        assert_eq!(record.action, "removeChannelMember");
        assert_eq!(record.status, AuditStatus::Success);
        assert_eq!(
            record.meta("remove_user_id"),
            Some(&serde_json::json!(user.id.to_string()))
        );
    }

    #[tokio::test]
    async fn remove_human_from_group_constrained_channel_is_denied() {
        let (admin, store, sink) = make_admin();
        let channel = seed_channel(&store, ChannelType::Private, true);
        let user = seed_user(&store, User::new("alice"));
        store.insert_member(ChannelMember::new(channel.id, user.id));

        let err = admin
            .remove_member(
                &ActorContext::local(),
                &channel.id.to_string(),
                &user.id.to_string(),
            )
            .await
            .unwrap_err();

        assert!(
            matches!(
                err,
                ApiError::GroupConstraintDenied { ref denied } if denied == &vec![user.id]
            ),
            "expected GroupConstraintDenied, got: {err:?}"
        );
        assert!(store.is_member(&channel.id, &user.id));
        assert_eq!(sink.last().unwrap().status, AuditStatus::Fail);
    }

    #[tokio::test]
    async fn remove_bot_from_group_constrained_channel_succeeds() {
        let (admin, store, _sink) = make_admin();
        let channel = seed_channel(&store, ChannelType::Private, true);
        let bot = seed_user(&store, User::bot("builder"));
        store.insert_member(ChannelMember::new(channel.id, bot.id));

        admin
            .remove_member(
                &ActorContext::local(),
                &channel.id.to_string(),
                &bot.id.to_string(),
            )
            .await
            .unwrap();

        assert!(!store.is_member(&channel.id, &bot.id));
    }

    #[tokio::test]
    async fn remove_from_group_message_channel_is_unsupported() {
        let (admin, store, _sink) = make_admin();
        let channel = seed_channel(&store, ChannelType::Group, false);
        let user = seed_user(&store, User::new("alice"));

        let err = admin
            .remove_member(
                &ActorContext::local(),
                &channel.id.to_string(),
                &user.id.to_string(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApiError::UnsupportedChannelType(ChannelType::Group)
        ));
    }

    // --- create / patch ---

    #[tokio::test]
    async fn create_channel_records_stored_channel() {
        let (admin, store, sink) = make_admin();
        let channel = Channel::new("release", "Release", ChannelType::Open);

        let created = admin
            .create_channel(&ActorContext::local(), channel.clone())
            .await
            .unwrap();

        assert_eq!(store.stored_channel(&channel.id), Some(created.clone()));
        let record = sink.last().unwrap();
        assert_eq!(record.action, "createChannel");
        assert_eq!(record.status, AuditStatus::Success);
        assert_eq!(record.meta("channel"), Some(&serde_json::to_value(&created).unwrap()));
    }

    #[tokio::test]
    async fn create_direct_channel_is_unsupported() {
        let (admin, store, sink) = make_admin();
        let channel = Channel::new("dm", "DM", ChannelType::Direct);

        let err = admin
            .create_channel(&ActorContext::local(), channel.clone())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApiError::UnsupportedChannelType(ChannelType::Direct)
        ));
        assert!(store.stored_channel(&channel.id).is_none());
        assert_eq!(sink.last().unwrap().status, AuditStatus::Fail);
    }

    #[tokio::test]
    async fn create_channel_with_invalid_name_is_invalid_param() {
        let (admin, _store, sink) = make_admin();
        let channel = Channel::new("Not Valid", "Bad", ChannelType::Open);

        let err = admin
            .create_channel(&ActorContext::local(), channel)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::InvalidParam(ref e) if e.field() == "name"));
        assert_eq!(sink.last().unwrap().status, AuditStatus::Fail);
    }

    #[tokio::test]
    async fn patch_channel_overwrites_before_image() {
        let (admin, store, sink) = make_admin();
        let channel = seed_channel(&store, ChannelType::Open, false);
        let patch = ChannelPatch {
            display_name: Some("Lobby".to_string()),
            ..ChannelPatch::default()
        };

        let patched = admin
            .patch_channel(&ActorContext::local(), &channel.id.to_string(), &patch)
            .await
            .unwrap();

        assert_eq!(patched.display_name, "Lobby");
        assert_eq!(patched.name, channel.name);

        let record = sink.last().unwrap();
        assert_eq!(record.status, AuditStatus::Success);
        let keys: Vec<&str> = record.meta.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["channel", "patch"]);
        assert_eq!(record.meta("channel").unwrap()["display_name"], "Lobby");
    }

    #[tokio::test]
    async fn failed_patch_keeps_before_image() {
        let (admin, store, sink) = make_admin();
        let channel = seed_channel(&store, ChannelType::Open, false);
        let patch = ChannelPatch {
            name: Some("-bad".to_string()),
            ..ChannelPatch::default()
        };

        let err = admin
            .patch_channel(&ActorContext::local(), &channel.id.to_string(), &patch)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::InvalidParam(_)));
        assert_eq!(store.stored_channel(&channel.id), Some(channel.clone()));
        let record = sink.last().unwrap();
        assert_eq!(record.status, AuditStatus::Fail);
        assert_eq!(record.meta("channel").unwrap()["name"], "town-square");
    }

    // --- reads ---

    #[tokio::test]
    async fn get_member_is_not_audited() {
        let (admin, store, sink) = make_admin();
        let channel = seed_channel(&store, ChannelType::Open, false);
        let user = seed_user(&store, User::new("alice"));
        store.insert_member(ChannelMember::new(channel.id, user.id));

        let member = admin
            .get_member(&channel.id.to_string(), &user.id.to_string())
            .await
            .unwrap();

        assert_eq!(member.user_id, user.id);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn get_member_for_non_member_is_not_found() {
        let (admin, store, _sink) = make_admin();
        let channel = seed_channel(&store, ChannelType::Open, false);

        let err = admin
            .get_member(&channel.id.to_string(), &UserId::generate().to_string())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ApiError::NotFound {
                entity: "channel member",
                ..
            }
        ));
    }
}
