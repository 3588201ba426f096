//! Invite verification adapters

use crate::ports::outbound::InviteVerifier;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{MatchId, PlayerId};
use std::collections::HashSet;

/// Everyone is invited everywhere.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenInvites;

#[async_trait]
impl InviteVerifier for OpenInvites {
    async fn is_invited(&self, _match_id: &MatchId, _player: &PlayerId) -> bool {
        true
    }
}

/// Explicit per-match invitations.
#[derive(Default)]
pub struct AllowListInvites {
    allowed: RwLock<HashSet<(MatchId, PlayerId)>>,
}

impl AllowListInvites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invite(&self, match_id: &MatchId, player: &PlayerId) {
        self.allowed
            .write()
            .insert((match_id.clone(), player.clone()));
    }

    pub fn revoke(&self, match_id: &MatchId, player: &PlayerId) {
        self.allowed
            .write()
            .remove(&(match_id.clone(), player.clone()));
    }
}

#[async_trait]
impl InviteVerifier for AllowListInvites {
    async fn is_invited(&self, match_id: &MatchId, player: &PlayerId) -> bool {
        self.allowed
            .read()
            .contains(&(match_id.clone(), player.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allow_list() {
        let invites = AllowListInvites::new();
        let (m, p) = (MatchId::from("m1"), PlayerId::from("bob"));
        assert!(!invites.is_invited(&m, &p).await);
        invites.invite(&m, &p);
        assert!(invites.is_invited(&m, &p).await);
        invites.revoke(&m, &p);
        assert!(!invites.is_invited(&m, &p).await);
        assert!(OpenInvites.is_invited(&m, &p).await);
    }
}
