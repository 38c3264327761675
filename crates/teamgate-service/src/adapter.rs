use std::collections::HashSet;
use std::sync::Arc;

use teamgate_core::membership::{GroupMembershipResolver, GuardError};
use teamgate_core::model::{Channel, UserId};
use teamgate_storage::MembershipStore;

/// Answers group-sync questions from the membership store.
pub struct StoreGroupResolver<S: MembershipStore> {
    store: Arc<S>,
}

impl<S: MembershipStore> StoreGroupResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

impl<S: MembershipStore> GroupMembershipResolver for StoreGroupResolver<S> {
    async fn resolve_allowed(
        &self,
        channel: &Channel,
        candidates: &[UserId],
    ) -> Result<HashSet<UserId>, GuardError> {
        self.store
            .resolve_group_allowed(channel, candidates)
            .await
            .map_err(|e| GuardError::PolicyEvaluation(e.to_string()))
    }
}
