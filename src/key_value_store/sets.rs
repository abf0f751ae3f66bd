use std::collections::BTreeSet;

use super::{KeyType, KeyValueStore, StoreError};

impl KeyValueStore {
    /// Adds members, compared by value, and returns how many were new.
    pub async fn sadd(&self, key: &str, members: Vec<String>) -> Result<usize, StoreError> {
        let mut sets = self.sets.write().await;
        self.claim(key, KeyType::Set, None).await?;

        let set = sets.entry(key.to_string()).or_default();
        let added = members
            .into_iter()
            .filter(|member| set.insert(member.clone()))
            .count();

        if set.is_empty() {
            sets.remove(key);
            self.release(key, KeyType::Set).await;
        }

        if added > 0 {
            self.touch(key).await;
        }

        Ok(added)
    }

    pub async fn srem(&self, key: &str, members: &[String]) -> Result<usize, StoreError> {
        let mut sets = self.sets.write().await;

        let Some(set) = sets.get_mut(key) else {
            self.check_type(key, KeyType::Set).await?;
            return Ok(0);
        };

        let removed = members.iter().filter(|member| set.remove(*member)).count();

        if set.is_empty() {
            sets.remove(key);
            self.release(key, KeyType::Set).await;
        }

        if removed > 0 {
            self.touch(key).await;
        }

        Ok(removed)
    }

    pub async fn smembers(&self, key: &str) -> Result<BTreeSet<String>, StoreError> {
        let sets = self.sets.read().await;

        match sets.get(key) {
            Some(set) => Ok(set.clone()),
            None => {
                self.check_type(key, KeyType::Set).await?;
                Ok(BTreeSet::new())
            }
        }
    }

    pub async fn sismember(&self, key: &str, member: &str) -> Result<bool, StoreError> {
        Ok(self.smembers(key).await?.contains(member))
    }

    pub async fn scard(&self, key: &str) -> Result<usize, StoreError> {
        Ok(self.smembers(key).await?.len())
    }

    pub async fn sunion(&self, keys: &[String]) -> Result<BTreeSet<String>, StoreError> {
        let mut union = BTreeSet::new();

        for key in keys {
            union.extend(self.smembers(key).await?);
        }

        Ok(union)
    }

    /// Members present in every set. A missing key is an empty set, so it empties
    /// the result.
    pub async fn sinter(&self, keys: &[String]) -> Result<BTreeSet<String>, StoreError> {
        let mut intersection: Option<BTreeSet<String>> = None;

        for key in keys {
            let members = self.smembers(key).await?;

            intersection = Some(match intersection {
                Some(current) => current.intersection(&members).cloned().collect(),
                None => members,
            });
        }

        Ok(intersection.unwrap_or_default())
    }
}
