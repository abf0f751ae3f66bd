use tokio::time::Instant;

use super::{KeyType, KeyValueStore, StoreError};

#[derive(Debug, Clone, PartialEq)]
pub struct StringValue {
    pub data: String,
    pub expiration: Option<Instant>,
}

impl StringValue {
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expiration.is_some_and(|expiration| expiration <= now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SetCondition {
    /// Only write when the key does not exist.
    Nx,
    /// Only write when the key already exists.
    Xx,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SetExpiration {
    #[default]
    Clear,
    Keep,
    At(Instant),
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SetOptions {
    pub condition: Option<SetCondition>,
    pub get: bool,
    pub expiration: SetExpiration,
}

#[derive(Debug, PartialEq)]
pub enum SetOutcome {
    Written { previous: Option<String> },
    Skipped { previous: Option<String> },
}

impl KeyValueStore {
    /// Reads a string, purging it first if its TTL has passed.
    pub async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();

        let expired = match self.strings.read().await.get(key) {
            Some(value) if !value.is_expired(now) => return Ok(Some(value.data.clone())),
            Some(_) => true,
            None => false,
        };

        if expired {
            let mut strings = self.strings.write().await;

            if strings.get(key).is_some_and(|value| value.is_expired(now)) {
                strings.remove(key);
                self.release_if_expired(key, now).await;
            }
        }

        self.check_type(key, KeyType::String).await?;

        Ok(None)
    }

    pub async fn set(
        &self,
        key: &str,
        data: String,
        options: SetOptions,
    ) -> Result<SetOutcome, StoreError> {
        let mut exists_elsewhere = false;

        if let Some(kind) = self.owner_of(key).await.filter(|kind| *kind != KeyType::String) {
            if options.get {
                return Err(StoreError::WrongType);
            }

            if options.condition == Some(SetCondition::Nx) {
                return Ok(SetOutcome::Skipped { previous: None });
            }

            self.remove_from_namespace(kind, key).await;
            exists_elsewhere = true;
        }

        let now = Instant::now();
        let mut strings = self.strings.write().await;
        let current = strings.get(key).filter(|value| !value.is_expired(now));
        let previous = current.map(|value| value.data.clone());
        let exists = current.is_some() || exists_elsewhere;

        let condition_met = match options.condition {
            Some(SetCondition::Nx) => !exists,
            Some(SetCondition::Xx) => exists,
            None => true,
        };

        if !condition_met {
            return Ok(SetOutcome::Skipped { previous });
        }

        let expiration = match options.expiration {
            SetExpiration::Clear => None,
            SetExpiration::Keep => current.and_then(|value| value.expiration),
            SetExpiration::At(instant) => Some(instant),
        };

        self.claim(key, KeyType::String, expiration).await?;
        strings.insert(key.to_string(), StringValue { data, expiration });
        self.touch(key).await;

        Ok(SetOutcome::Written { previous })
    }

    /// Increments the integer stored at `key`. A missing or empty value counts as 0.
    pub async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let now = Instant::now();
        let mut strings = self.strings.write().await;
        let current = strings.get(key).filter(|value| !value.is_expired(now));

        let number = match current.map(|value| value.data.as_str()) {
            None | Some("") => 0,
            Some(data) => data.parse::<i64>().map_err(|_| StoreError::NotAnInteger)?,
        };

        let incremented = number.checked_add(1).ok_or(StoreError::Overflow)?;
        let expiration = current.and_then(|value| value.expiration);

        self.claim(key, KeyType::String, expiration).await?;
        strings.insert(
            key.to_string(),
            StringValue {
                data: incremented.to_string(),
                expiration,
            },
        );
        self.touch(key).await;

        Ok(incremented)
    }

    async fn release_if_expired(&self, key: &str, now: Instant) {
        let mut owners = self.owners.write().await;

        if owners
            .get(key)
            .is_some_and(|owner| owner.kind == KeyType::String && !owner.is_live(now))
        {
            owners.remove(key);
        }
    }
}
