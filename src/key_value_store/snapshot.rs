use std::collections::{BTreeMap, BTreeSet};

use tokio::time::Instant;

use super::{KeyType, KeyValueStore, Owner, SortedSet, StreamEntry, StringValue};

/// A point-in-time copy of every namespace, in key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub strings: BTreeMap<String, String>,
    pub lists: BTreeMap<String, Vec<String>>,
    pub hashes: BTreeMap<String, BTreeMap<String, String>>,
    pub sets: BTreeMap<String, BTreeSet<String>>,
    pub sorted_sets: BTreeMap<String, Vec<(String, f64)>>,
    pub streams: BTreeMap<String, Vec<StreamEntry>>,
}

impl Snapshot {
    pub fn key_count(&self) -> usize {
        self.strings.len()
            + self.lists.len()
            + self.hashes.len()
            + self.sets.len()
            + self.sorted_sets.len()
            + self.streams.len()
    }

    fn keys(&self) -> impl Iterator<Item = (&String, KeyType)> {
        self.strings
            .keys()
            .map(|key| (key, KeyType::String))
            .chain(self.lists.keys().map(|key| (key, KeyType::List)))
            .chain(self.hashes.keys().map(|key| (key, KeyType::Hash)))
            .chain(self.sets.keys().map(|key| (key, KeyType::Set)))
            .chain(self.sorted_sets.keys().map(|key| (key, KeyType::SortedSet)))
            .chain(self.streams.keys().map(|key| (key, KeyType::Stream)))
    }
}

impl KeyValueStore {
    /// Copies the store one namespace at a time, holding only that namespace's
    /// read lock while copying it. Expired strings are left out.
    pub async fn snapshot(&self) -> Snapshot {
        let now = Instant::now();
        let mut snapshot = Snapshot::default();

        snapshot.strings = self
            .strings
            .read()
            .await
            .iter()
            .filter(|(_, value)| !value.is_expired(now))
            .map(|(key, value)| (key.clone(), value.data.clone()))
            .collect();

        snapshot.lists = self
            .lists
            .read()
            .await
            .iter()
            .map(|(key, list)| (key.clone(), list.iter().cloned().collect()))
            .collect();

        snapshot.hashes = self
            .hashes
            .read()
            .await
            .iter()
            .map(|(key, hash)| (key.clone(), hash.clone()))
            .collect();

        snapshot.sets = self
            .sets
            .read()
            .await
            .iter()
            .map(|(key, set)| (key.clone(), set.clone()))
            .collect();

        snapshot.sorted_sets = self
            .sorted_sets
            .read()
            .await
            .iter()
            .map(|(key, sorted_set)| {
                let members = sorted_set
                    .iter()
                    .map(|(member, score)| (member.to_string(), score))
                    .collect();

                (key.clone(), members)
            })
            .collect();

        snapshot.streams = self
            .streams
            .read()
            .await
            .iter()
            .map(|(key, entries)| (key.clone(), entries.clone()))
            .collect();

        snapshot
    }

    /// Replaces the whole dataset with `snapshot`. Every key that existed before or
    /// exists after gets a version bump, so pending `WATCH`es see the change.
    pub async fn load_snapshot(&self, snapshot: Snapshot) {
        let mut touched: BTreeSet<String> = self.owners.read().await.keys().cloned().collect();
        touched.extend(snapshot.keys().map(|(key, _)| key.clone()));

        let owners: Vec<(String, KeyType)> = snapshot
            .keys()
            .map(|(key, kind)| (key.clone(), kind))
            .collect();

        *self.strings.write().await = snapshot
            .strings
            .into_iter()
            .map(|(key, data)| {
                (
                    key,
                    StringValue {
                        data,
                        expiration: None,
                    },
                )
            })
            .collect();

        *self.lists.write().await = snapshot
            .lists
            .into_iter()
            .map(|(key, list)| (key, list.into()))
            .collect();

        *self.hashes.write().await = snapshot.hashes.into_iter().collect();
        *self.sets.write().await = snapshot.sets.into_iter().collect();

        *self.sorted_sets.write().await = snapshot
            .sorted_sets
            .into_iter()
            .map(|(key, members)| {
                let mut sorted_set = SortedSet::default();

                for (member, score) in members {
                    sorted_set.insert(member, score);
                }

                (key, sorted_set)
            })
            .collect();

        *self.streams.write().await = snapshot.streams.into_iter().collect();

        *self.owners.write().await = owners
            .into_iter()
            .map(|(key, kind)| {
                (
                    key,
                    Owner {
                        kind,
                        expiration: None,
                    },
                )
            })
            .collect();

        let mut versions = self.versions.write().await;

        for key in touched {
            *versions.entry(key).or_insert(0) += 1;
        }

        drop(versions);
        self.mark_saved(self.dirty());
    }
}
