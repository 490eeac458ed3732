//! Enrolling and removing tracked accounts.

use osrs_hiscores::{normalize_account_key, AccountType, HiscoresError};

use crate::error::{LeaderboardError, Result};
use crate::model::Member;
use crate::provider::StatsProvider;
use crate::store::Store;

#[derive(Debug, Clone, Default)]
pub struct Enrollment {
    pub username: String,
    pub account_type: AccountType,
    pub chat_user_id: Option<String>,
    pub chat_username: Option<String>,
}

fn require_group(store: &dyn Store, group_id: &str) -> Result<()> {
    match store.group(group_id)? {
        Some(_) => Ok(()),
        None => Err(LeaderboardError::GroupNotFound(group_id.to_string())),
    }
}

/// Add or update a member. Keyed on the normalized account name, so
/// re-enrolling with different casing or spacing updates the existing row.
///
/// With a `verify` provider the account must resolve on the hiscores first.
pub async fn enroll_member(
    store: &dyn Store,
    verify: Option<&dyn StatsProvider>,
    group_id: &str,
    enrollment: Enrollment,
) -> Result<Member> {
    require_group(store, group_id)?;
    let member = Member::new(group_id, &enrollment.username, enrollment.account_type)
        .with_chat_user(enrollment.chat_user_id, enrollment.chat_username);
    if member.account_key.is_empty() {
        return Err(LeaderboardError::AccountNotFound(enrollment.username));
    }

    if let Some(provider) = verify {
        match provider.lookup(&member.account_key).await {
            Ok(_) => {}
            Err(HiscoresError::NotFound(_)) => {
                return Err(LeaderboardError::AccountNotFound(member.display_name))
            }
            Err(e) => return Err(e.into()),
        }
    }

    store.put_member(&member)?;
    tracing::info!(
        %group_id,
        account = %member.account_key,
        account_type = %member.account_type,
        "member enrolled"
    );
    Ok(member)
}

pub fn remove_member(store: &dyn Store, group_id: &str, username: &str) -> Result<Member> {
    let key = normalize_account_key(username);
    let removed = store
        .remove_member(group_id, &key)?
        .ok_or_else(|| LeaderboardError::MemberNotFound {
            group: group_id.to_string(),
            account: key.clone(),
        })?;
    tracing::info!(%group_id, account = %key, "member removed");
    Ok(removed)
}

pub fn list_members(store: &dyn Store, group_id: &str) -> Result<Vec<Member>> {
    require_group(store, group_id)?;
    store.members(group_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TrackedGroup;
    use crate::store::RedbStore;
    use crate::testing::FakeProvider;
    use chrono::Utc;
    use tempfile::TempDir;

    fn store() -> (TempDir, RedbStore) {
        let dir = TempDir::new().unwrap();
        let store = RedbStore::open(&dir.path().join("r.redb")).unwrap();
        store
            .put_group(&TrackedGroup {
                id: "g1".into(),
                name: "Clan".into(),
                channel_id: "c1".into(),
                schedule: "0 19 * * SUN".into(),
                activities: vec!["Woodcutting".into()],
                edit_in_place: true,
                enabled: true,
                updated_at: Utc::now(),
            })
            .unwrap();
        (dir, store)
    }

    fn enrollment(name: &str) -> Enrollment {
        Enrollment {
            username: name.into(),
            ..Enrollment::default()
        }
    }

    #[tokio::test]
    async fn enroll_remove_round_trip_uses_one_key() {
        let (_dir, store) = store();
        let member = enroll_member(&store, None, "g1", enrollment("Zezima The Great"))
            .await
            .unwrap();
        assert_eq!(member.account_key, "zezima_the_great");

        enroll_member(&store, None, "g1", enrollment("ZEZIMA the great"))
            .await
            .unwrap();
        assert_eq!(list_members(&store, "g1").unwrap().len(), 1);

        let removed = remove_member(&store, "g1", " zezima The Great ").unwrap();
        assert_eq!(removed.account_key, "zezima_the_great");
        assert!(list_members(&store, "g1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn verification_rejects_unknown_accounts() {
        let (_dir, store) = store();
        let provider = FakeProvider::new().with_account("Zezima", 1, 1);

        let err = enroll_member(&store, Some(&provider), "g1", enrollment("Nobody"))
            .await
            .unwrap_err();
        assert!(matches!(err, LeaderboardError::AccountNotFound(_)));

        enroll_member(&store, Some(&provider), "g1", enrollment("zezima"))
            .await
            .unwrap();
        assert_eq!(provider.lookups("zezima"), 1);
    }

    #[tokio::test]
    async fn unknown_group_and_member_are_errors() {
        let (_dir, store) = store();
        let err = enroll_member(&store, None, "g2", enrollment("Zezima"))
            .await
            .unwrap_err();
        assert!(matches!(err, LeaderboardError::GroupNotFound(_)));

        let err = remove_member(&store, "g1", "Zezima").unwrap_err();
        assert!(err.to_string().contains("zezima"));
    }
}
