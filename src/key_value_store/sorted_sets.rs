use std::{
    cmp::Ordering,
    collections::{BTreeSet, HashMap},
};

use super::{lists::normalize_range, KeyType, KeyValueStore, StoreError};

/// Members ordered by score, ties broken by member bytes.
#[derive(Debug, Clone, Default)]
pub struct SortedSet {
    scores: HashMap<String, f64>,
    ordered: BTreeSet<ScoredMember>,
}

#[derive(Debug, Clone)]
struct ScoredMember {
    score: f64,
    member: String,
}

impl PartialEq for ScoredMember {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ScoredMember {}

impl PartialOrd for ScoredMember {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScoredMember {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.member.as_bytes().cmp(other.member.as_bytes()))
    }
}

impl SortedSet {
    /// Inserts or updates `member`. Returns `true` when the member is new.
    pub fn insert(&mut self, member: String, score: f64) -> bool {
        let previous = self.scores.insert(member.clone(), score);

        if let Some(previous) = previous {
            self.ordered.remove(&ScoredMember {
                score: previous,
                member: member.clone(),
            });
        }

        self.ordered.insert(ScoredMember { score, member });

        previous.is_none()
    }

    pub fn remove(&mut self, member: &str) -> bool {
        match self.scores.remove(member) {
            Some(score) => {
                self.ordered.remove(&ScoredMember {
                    score,
                    member: member.to_string(),
                });
                true
            }
            None => false,
        }
    }

    pub fn score(&self, member: &str) -> Option<f64> {
        self.scores.get(member).copied()
    }

    pub fn rank(&self, member: &str) -> Option<usize> {
        let score = self.score(member)?;
        let target = ScoredMember {
            score,
            member: member.to_string(),
        };

        Some(self.ordered.range(..target).count())
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Members with their scores, in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.ordered
            .iter()
            .map(|entry| (entry.member.as_str(), entry.score))
    }
}

impl KeyValueStore {
    /// Inserts or updates each score/member pair and returns how many members were new.
    pub async fn zadd(&self, key: &str, members: Vec<(f64, String)>) -> Result<usize, StoreError> {
        let mut sorted_sets = self.sorted_sets.write().await;
        self.claim(key, KeyType::SortedSet, None).await?;

        let sorted_set = sorted_sets.entry(key.to_string()).or_default();
        let added = members
            .into_iter()
            .filter(|(score, member)| sorted_set.insert(member.clone(), *score))
            .count();

        self.touch(key).await;

        Ok(added)
    }

    pub async fn zscore(&self, key: &str, member: &str) -> Result<Option<f64>, StoreError> {
        self.with_sorted_set(key, |sorted_set| sorted_set.score(member))
            .await
            .map(Option::flatten)
    }

    pub async fn zrank(&self, key: &str, member: &str) -> Result<Option<usize>, StoreError> {
        self.with_sorted_set(key, |sorted_set| sorted_set.rank(member))
            .await
            .map(Option::flatten)
    }

    pub async fn zcard(&self, key: &str) -> Result<usize, StoreError> {
        self.with_sorted_set(key, SortedSet::len)
            .await
            .map(Option::unwrap_or_default)
    }

    /// Members between ranks `start` and `stop`, inclusive, with the same index
    /// rules as `LRANGE`.
    pub async fn zrange(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, StoreError> {
        let members = self
            .with_sorted_set(key, |sorted_set| {
                match normalize_range(sorted_set.len(), start, stop) {
                    Some((start, stop)) => sorted_set
                        .iter()
                        .skip(start)
                        .take(stop - start + 1)
                        .map(|(member, _)| member.to_string())
                        .collect(),
                    None => Vec::new(),
                }
            })
            .await?;

        Ok(members.unwrap_or_default())
    }

    pub async fn zrem(&self, key: &str, members: &[String]) -> Result<usize, StoreError> {
        let mut sorted_sets = self.sorted_sets.write().await;

        let Some(sorted_set) = sorted_sets.get_mut(key) else {
            self.check_type(key, KeyType::SortedSet).await?;
            return Ok(0);
        };

        let removed = members
            .iter()
            .filter(|member| sorted_set.remove(member))
            .count();

        if sorted_set.is_empty() {
            sorted_sets.remove(key);
            self.release(key, KeyType::SortedSet).await;
        }

        if removed > 0 {
            self.touch(key).await;
        }

        Ok(removed)
    }

    async fn with_sorted_set<T>(
        &self,
        key: &str,
        read: impl FnOnce(&SortedSet) -> T,
    ) -> Result<Option<T>, StoreError> {
        let sorted_sets = self.sorted_sets.read().await;

        match sorted_sets.get(key) {
            Some(sorted_set) => Ok(Some(read(sorted_set))),
            None => {
                self.check_type(key, KeyType::SortedSet).await?;
                Ok(None)
            }
        }
    }
}
