use crate::blocking::{WaitKind, WaiterRegistration};

use super::{KeyType, KeyValueStore, StoreError};

#[derive(Debug, PartialEq)]
pub struct PushOutcome {
    /// Length of the list right after the push, before any waiter was served.
    pub length: usize,
    /// Number of pushed values handed straight to blocked clients.
    pub served: usize,
}

#[derive(Debug)]
pub enum BlockingPop<'a> {
    Popped { key: String, value: String },
    Registered(WaiterRegistration<'a>),
    Empty,
}

impl KeyValueStore {
    /// Pushes `values` onto the list at `key`, then serves blocked clients from the
    /// head of the list while still holding the lists lock.
    pub async fn push(
        &self,
        key: &str,
        values: Vec<String>,
        front: bool,
    ) -> Result<PushOutcome, StoreError> {
        let mut lists = self.lists.write().await;
        self.claim(key, KeyType::List, None).await?;

        let list = lists.entry(key.to_string()).or_default();

        for value in values {
            if front {
                list.push_front(value);
            } else {
                list.push_back(value);
            }
        }

        let length = list.len();
        self.touch(key).await;

        let mut served = 0;

        while let Some(value) = list.pop_front() {
            match self.blocking.hand_off(key, value) {
                Ok(()) => served += 1,
                Err(value) => {
                    list.push_front(value);
                    break;
                }
            }
        }

        if list.is_empty() {
            lists.remove(key);
            self.release(key, KeyType::List).await;
        }

        for _ in 0..served {
            self.touch(key).await;
        }

        Ok(PushOutcome { length, served })
    }

    /// Pops up to `count` values (one when `count` is `None`) from the head, or from
    /// the tail when `from_back` is set. `None` means the key does not exist.
    pub async fn pop(
        &self,
        key: &str,
        count: Option<usize>,
        from_back: bool,
    ) -> Result<Option<Vec<String>>, StoreError> {
        let mut lists = self.lists.write().await;

        let Some(list) = lists.get_mut(key) else {
            self.check_type(key, KeyType::List).await?;
            return Ok(None);
        };

        let count = count.unwrap_or(1).min(list.len());
        let mut popped = Vec::with_capacity(count);

        for _ in 0..count {
            let value = if from_back {
                list.pop_back()
            } else {
                list.pop_front()
            };

            popped.extend(value);
        }

        if list.is_empty() {
            lists.remove(key);
            self.release(key, KeyType::List).await;
        }

        self.touch(key).await;

        Ok(Some(popped))
    }

    /// Pops from the first non-empty list among `keys`, in argument order. When all
    /// of them are empty and `register` is set, registers a waiter on every key
    /// before the lists lock is released.
    pub async fn pop_front_or_register(
        &self,
        keys: &[String],
        register: bool,
    ) -> Result<BlockingPop<'_>, StoreError> {
        let mut lists = self.lists.write().await;

        for key in keys {
            let Some(list) = lists.get_mut(key) else {
                self.check_type(key, KeyType::List).await?;
                continue;
            };

            if let Some(value) = list.pop_front() {
                if list.is_empty() {
                    lists.remove(key);
                    self.release(key, KeyType::List).await;
                }

                self.touch(key).await;

                return Ok(BlockingPop::Popped {
                    key: key.clone(),
                    value,
                });
            }
        }

        if register {
            return Ok(BlockingPop::Registered(
                self.blocking.register(WaitKind::List, keys),
            ));
        }

        Ok(BlockingPop::Empty)
    }

    /// Returns the elements between `start` and `stop`, inclusive. Negative indexes
    /// count from the end of the list.
    pub async fn range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>, StoreError> {
        let lists = self.lists.read().await;

        let Some(list) = lists.get(key) else {
            self.check_type(key, KeyType::List).await?;
            return Ok(Vec::new());
        };

        Ok(match normalize_range(list.len(), start, stop) {
            Some((start, stop)) => list.range(start..=stop).cloned().collect(),
            None => Vec::new(),
        })
    }

    pub async fn len(&self, key: &str) -> Result<usize, StoreError> {
        let lists = self.lists.read().await;

        match lists.get(key) {
            Some(list) => Ok(list.len()),
            None => {
                self.check_type(key, KeyType::List).await?;
                Ok(0)
            }
        }
    }
}

/// Resolves an inclusive index range over a sequence of `length` items.
///
/// Negative indexes become `length + index`, a start still below zero becomes 0
/// and a stop past the end is clamped to the last item.
///
/// # Returns
///
/// * `Some((start, stop))` - Valid inclusive bounds
/// * `None` - The range selects nothing
///
/// # Examples
///
/// ```ignore
/// assert_eq!(normalize_range(5, -2, -1), Some((3, 4)));
/// assert_eq!(normalize_range(5, 2, 9), Some((2, 4)));
/// assert_eq!(normalize_range(5, 3, 1), None);
/// ```
pub fn normalize_range(length: usize, start: i64, stop: i64) -> Option<(usize, usize)> {
    let length = i64::try_from(length).ok()?;

    if length == 0 {
        return None;
    }

    let resolve = |index: i64| if index < 0 { length + index } else { index };
    let start = resolve(start).max(0);
    let stop = resolve(stop).min(length - 1);

    if start > stop || start >= length {
        return None;
    }

    Some((usize::try_from(start).ok()?, usize::try_from(stop).ok()?))
}
