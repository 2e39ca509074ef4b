//! Discovery service
//!
//! Finds other users who share interests or hobbies with the caller.
//! Matching over-fetches junction rows, groups them per user, keeps users
//! with at least one shared entry and ranks by shared count.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::config::DiscoveryConfig;
use crate::data::{Database, Hobby, Interest, User};
use crate::error::AppError;
use crate::metrics::DISCOVERY_RESULTS;

/// A catalog row that can be matched on its id
pub trait CatalogEntry: Clone {
    fn entry_id(&self) -> &str;
}

impl CatalogEntry for Interest {
    fn entry_id(&self) -> &str {
        &self.id
    }
}

impl CatalogEntry for Hobby {
    fn entry_id(&self) -> &str {
        &self.id
    }
}

/// Entries grouped under one candidate user
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedEntries<T> {
    pub user_id: String,
    pub shared: Vec<T>,
    pub all: Vec<T>,
}

/// Group `(user_id, entry)` rows per user in first-seen order.
///
/// Every entry lands in `all`; entries whose id is in `own_ids` also land
/// in `shared`. Duplicate entries for the same user are dropped.
pub fn group_by_member<T: CatalogEntry>(
    rows: impl IntoIterator<Item = (String, T)>,
    own_ids: &HashSet<&str>,
) -> Vec<GroupedEntries<T>> {
    let mut groups: Vec<GroupedEntries<T>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (user_id, entry) in rows {
        let slot = match index.get(&user_id) {
            Some(&slot) => slot,
            None => {
                index.insert(user_id.clone(), groups.len());
                groups.push(GroupedEntries {
                    user_id,
                    shared: Vec::new(),
                    all: Vec::new(),
                });
                groups.len() - 1
            }
        };

        let group = &mut groups[slot];
        if group.all.iter().any(|e| e.entry_id() == entry.entry_id()) {
            continue;
        }
        if own_ids.contains(entry.entry_id()) {
            group.shared.push(entry.clone());
        }
        group.all.push(entry);
    }

    groups
}

/// Keep users sharing at least one entry, rank by shared count and truncate.
///
/// The sort is stable, so users with equal counts keep first-seen order.
pub fn rank_shared_matches<T: CatalogEntry>(
    rows: impl IntoIterator<Item = (String, T)>,
    own_ids: &HashSet<&str>,
    limit: usize,
) -> Vec<GroupedEntries<T>> {
    let mut groups: Vec<_> = group_by_member(rows, own_ids)
        .into_iter()
        .filter(|group| !group.shared.is_empty())
        .collect();
    groups.sort_by(|a, b| b.shared.len().cmp(&a.shared.len()));
    groups.truncate(limit);
    groups
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestMatch {
    #[serde(flatten)]
    pub user: User,
    pub shared_interests: Vec<Interest>,
    pub all_interests: Vec<Interest>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HobbyMatch {
    #[serde(flatten)]
    pub user: User,
    pub shared_hobbies: Vec<Hobby>,
    pub all_hobbies: Vec<Hobby>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestSearchHit {
    #[serde(flatten)]
    pub user: User,
    pub interests: Vec<Interest>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HobbySearchHit {
    #[serde(flatten)]
    pub user: User,
    pub hobbies: Vec<Hobby>,
}

/// Replace each group's `all` list with the user's full list.
fn replace_all_lists<T: CatalogEntry>(
    groups: &mut [GroupedEntries<T>],
    full_rows: impl IntoIterator<Item = (String, T)>,
) {
    let mut full: HashMap<String, Vec<T>> = HashMap::new();
    for (user_id, entry) in full_rows {
        full.entry(user_id).or_default().push(entry);
    }
    for group in groups.iter_mut() {
        if let Some(entries) = full.remove(&group.user_id) {
            group.all = entries;
        }
    }
}

/// Discovery service
pub struct DiscoveryService {
    db: Arc<Database>,
    config: DiscoveryConfig,
}

impl DiscoveryService {
    pub fn new(db: Arc<Database>, config: DiscoveryConfig) -> Self {
        Self { db, config }
    }

    async fn users_for<T>(
        &self,
        groups: &[GroupedEntries<T>],
    ) -> Result<HashMap<String, User>, AppError> {
        let ids: Vec<String> = groups.iter().map(|g| g.user_id.clone()).collect();
        self.db.get_users_by_ids(&ids).await
    }

    /// Users sharing at least one interest with `user_id`, most shared first.
    ///
    /// Returns an empty list when the caller has no interests.
    pub async fn users_with_shared_interests(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<InterestMatch>, AppError> {
        let limit = self.config.effective_limit(limit);
        let own = self.db.get_user_interest_ids(user_id).await?;
        if own.is_empty() {
            DISCOVERY_RESULTS.with_label_values(&["interests"]).observe(0.0);
            return Ok(Vec::new());
        }

        let row_limit = limit.saturating_mul(self.config.interest_overfetch_factor) as i64;
        let rows = self
            .db
            .get_member_interest_rows(&own, user_id, Some(row_limit))
            .await?;

        let own_ids: HashSet<&str> = own.iter().map(String::as_str).collect();
        let mut groups = rank_shared_matches(
            rows.into_iter().map(|row| (row.member_id, row.interest)),
            &own_ids,
            limit,
        );

        if self.config.include_full_interest_list {
            let ids: Vec<String> = groups.iter().map(|g| g.user_id.clone()).collect();
            let full = self.db.get_interest_rows_for_users(&ids).await?;
            replace_all_lists(
                &mut groups,
                full.into_iter().map(|row| (row.member_id, row.interest)),
            );
        }

        let mut users = self.users_for(&groups).await?;
        let matches: Vec<InterestMatch> = groups
            .into_iter()
            .filter_map(|group| {
                let user = users.remove(&group.user_id)?;
                Some(InterestMatch {
                    user,
                    shared_interests: group.shared,
                    all_interests: group.all,
                })
            })
            .collect();

        DISCOVERY_RESULTS
            .with_label_values(&["interests"])
            .observe(matches.len() as f64);
        tracing::debug!(user_id = %user_id, matches = matches.len(), "Interest matching finished");
        Ok(matches)
    }

    /// Users who share at least one hobby with `user_id`, ranked like
    /// interest matches. `hobby_partners_only` restricts candidates to
    /// rows open to partners.
    pub async fn users_with_shared_hobbies(
        &self,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<HobbyMatch>, AppError> {
        let limit = self.config.effective_limit(limit);
        let own = self.db.get_user_hobby_ids(user_id).await?;
        if own.is_empty() {
            DISCOVERY_RESULTS.with_label_values(&["hobbies"]).observe(0.0);
            return Ok(Vec::new());
        }

        let row_limit = limit.saturating_mul(self.config.hobby_overfetch_factor) as i64;
        let rows = self
            .db
            .get_member_hobby_rows(
                &own,
                user_id,
                self.config.hobby_partners_only,
                Some(row_limit),
            )
            .await?;

        let own_ids: HashSet<&str> = own.iter().map(String::as_str).collect();
        let mut groups = rank_shared_matches(
            rows.into_iter().map(|row| (row.member_id, row.hobby)),
            &own_ids,
            limit,
        );

        if self.config.include_full_interest_list {
            let ids: Vec<String> = groups.iter().map(|g| g.user_id.clone()).collect();
            let full = self.db.get_hobby_rows_for_users(&ids).await?;
            replace_all_lists(
                &mut groups,
                full.into_iter().map(|row| (row.member_id, row.hobby)),
            );
        }

        let mut users = self.users_for(&groups).await?;
        let matches: Vec<HobbyMatch> = groups
            .into_iter()
            .filter_map(|group| {
                let user = users.remove(&group.user_id)?;
                Some(HobbyMatch {
                    user,
                    shared_hobbies: group.shared,
                    all_hobbies: group.all,
                })
            })
            .collect();

        DISCOVERY_RESULTS
            .with_label_values(&["hobbies"])
            .observe(matches.len() as f64);
        Ok(matches)
    }

    /// Every other user holding any of `interest_ids`, unranked.
    pub async fn search_users_by_interests(
        &self,
        interest_ids: &[String],
        exclude_user_id: &str,
    ) -> Result<Vec<InterestSearchHit>, AppError> {
        let rows = self
            .db
            .get_member_interest_rows(interest_ids, exclude_user_id, None)
            .await?;

        let wanted: HashSet<&str> = interest_ids.iter().map(String::as_str).collect();
        let groups = group_by_member(
            rows.into_iter().map(|row| (row.member_id, row.interest)),
            &wanted,
        );

        let mut users = self.users_for(&groups).await?;
        Ok(groups
            .into_iter()
            .filter_map(|group| {
                let user = users.remove(&group.user_id)?;
                Some(InterestSearchHit {
                    user,
                    interests: group.all,
                })
            })
            .collect())
    }

    /// Every other user holding any of `hobby_ids`, unranked.
    pub async fn search_users_by_hobbies(
        &self,
        hobby_ids: &[String],
        exclude_user_id: &str,
    ) -> Result<Vec<HobbySearchHit>, AppError> {
        let rows = self
            .db
            .get_member_hobby_rows(hobby_ids, exclude_user_id, false, None)
            .await?;

        let wanted: HashSet<&str> = hobby_ids.iter().map(String::as_str).collect();
        let groups = group_by_member(
            rows.into_iter().map(|row| (row.member_id, row.hobby)),
            &wanted,
        );

        let mut users = self.users_for(&groups).await?;
        Ok(groups
            .into_iter()
            .filter_map(|group| {
                let user = users.remove(&group.user_id)?;
                Some(HobbySearchHit {
                    user,
                    hobbies: group.all,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn interest(id: &str) -> Interest {
        Interest {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            icon: None,
            color: None,
            member_count: 0,
            created_at: Utc::now(),
        }
    }

    fn row(user: &str, entry: &str) -> (String, Interest) {
        (user.to_string(), interest(entry))
    }

    fn ids(group: &GroupedEntries<Interest>) -> Vec<&str> {
        group.shared.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn ranks_by_shared_count_descending() {
        let own: HashSet<&str> = ["a", "b", "c"].into_iter().collect();
        let rows = vec![
            row("u1", "a"),
            row("u2", "a"),
            row("u2", "b"),
            row("u3", "a"),
            row("u3", "b"),
            row("u3", "c"),
        ];

        let ranked = rank_shared_matches(rows, &own, 10);
        let order: Vec<&str> = ranked.iter().map(|g| g.user_id.as_str()).collect();
        assert_eq!(order, vec!["u3", "u2", "u1"]);
        assert_eq!(ids(&ranked[0]), vec!["a", "b", "c"]);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let own: HashSet<&str> = ["a"].into_iter().collect();
        let rows = vec![row("u2", "a"), row("u1", "a"), row("u3", "a")];

        let ranked = rank_shared_matches(rows, &own, 10);
        let order: Vec<&str> = ranked.iter().map(|g| g.user_id.as_str()).collect();
        assert_eq!(order, vec!["u2", "u1", "u3"]);
    }

    #[test]
    fn drops_users_without_shared_entries_and_truncates() {
        let own: HashSet<&str> = ["a"].into_iter().collect();
        let rows = vec![row("u1", "x"), row("u2", "a"), row("u3", "a")];

        let ranked = rank_shared_matches(rows, &own, 1);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].user_id, "u2");
    }

    #[test]
    fn prefiltered_rows_make_all_equal_shared() {
        let own: HashSet<&str> = ["hiking"].into_iter().collect();
        let ranked = rank_shared_matches(vec![row("b", "hiking")], &own, 10);

        assert_eq!(ranked[0].shared.len(), 1);
        assert_eq!(ranked[0].all.len(), 1);
        assert_eq!(ranked[0].all[0].id, "hiking");
    }

    #[test]
    fn duplicate_rows_are_counted_once() {
        let own: HashSet<&str> = ["a"].into_iter().collect();
        let grouped = group_by_member(vec![row("u1", "a"), row("u1", "a")], &own);
        assert_eq!(grouped[0].shared.len(), 1);
        assert_eq!(grouped[0].all.len(), 1);
    }

    #[test]
    fn full_lists_replace_all_but_not_shared() {
        let own: HashSet<&str> = ["a"].into_iter().collect();
        let mut ranked = rank_shared_matches(vec![row("u1", "a")], &own, 10);
        replace_all_lists(&mut ranked, vec![row("u1", "a"), row("u1", "z")]);

        assert_eq!(ids(&ranked[0]), vec!["a"]);
        assert_eq!(ranked[0].all.len(), 2);
    }
}
