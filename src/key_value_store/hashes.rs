use super::{KeyType, KeyValueStore, StoreError};

impl KeyValueStore {
    /// Sets each field/value pair and returns how many fields were new.
    pub async fn hset(&self, key: &str, pairs: Vec<(String, String)>) -> Result<usize, StoreError> {
        let mut hashes = self.hashes.write().await;
        self.claim(key, KeyType::Hash, None).await?;

        let hash = hashes.entry(key.to_string()).or_default();
        let mut added = 0;

        for (field, value) in pairs {
            if hash.insert(field, value).is_none() {
                added += 1;
            }
        }

        self.touch(key).await;

        Ok(added)
    }

    pub async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let hashes = self.hashes.read().await;

        match hashes.get(key) {
            Some(hash) => Ok(hash.get(field).cloned()),
            None => {
                self.check_type(key, KeyType::Hash).await?;
                Ok(None)
            }
        }
    }

    pub async fn hdel(&self, key: &str, fields: &[String]) -> Result<usize, StoreError> {
        let mut hashes = self.hashes.write().await;

        let Some(hash) = hashes.get_mut(key) else {
            self.check_type(key, KeyType::Hash).await?;
            return Ok(0);
        };

        let removed = fields
            .iter()
            .filter(|field| hash.remove(field.as_str()).is_some())
            .count();

        if hash.is_empty() {
            hashes.remove(key);
            self.release(key, KeyType::Hash).await;
        }

        if removed > 0 {
            self.touch(key).await;
        }

        Ok(removed)
    }

    pub async fn hexists(&self, key: &str, field: &str) -> Result<bool, StoreError> {
        Ok(self.hget(key, field).await?.is_some())
    }

    pub async fn hlen(&self, key: &str) -> Result<usize, StoreError> {
        Ok(self.hgetall(key).await?.len())
    }

    pub async fn hkeys(&self, key: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .hgetall(key)
            .await?
            .into_iter()
            .map(|(field, _)| field)
            .collect())
    }

    pub async fn hvals(&self, key: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .hgetall(key)
            .await?
            .into_iter()
            .map(|(_, value)| value)
            .collect())
    }

    /// All field/value pairs, ordered by field.
    pub async fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>, StoreError> {
        let hashes = self.hashes.read().await;

        match hashes.get(key) {
            Some(hash) => Ok(hash
                .iter()
                .map(|(field, value)| (field.clone(), value.clone()))
                .collect()),
            None => {
                self.check_type(key, KeyType::Hash).await?;
                Ok(Vec::new())
            }
        }
    }
}
