//! Registry of clients suspended in `BLPOP` or `XREAD BLOCK`.
//!
//! Waiters are queued per key in arrival order. A list push hands its values
//! directly to the oldest list waiters, and each served waiter is removed from every
//! key it was registered on, so a value is delivered at most once. A stream append
//! only signals `Ready` to the stream waiters of that key and they re-scan the stream
//! themselves.
//!
//! The registry lock is a plain `std::sync::RwLock` because it is never held across
//! an await point and it has to be usable from `Drop`.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, RwLock,
    },
};

use tokio::{
    sync::mpsc::{self, error::TrySendError},
    time::{timeout_at, Instant},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaitKind {
    List,
    Stream,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Wake {
    /// A value popped on behalf of the waiter.
    Value { key: String, value: String },
    /// New data may be available and the waiter should look again.
    Ready,
}

#[derive(Debug)]
struct Waiter {
    id: u64,
    kind: WaitKind,
    keys: Vec<String>,
    sender: mpsc::Sender<Wake>,
}

#[derive(Debug, Default)]
pub struct BlockingCoordinator {
    next_id: AtomicU64,
    waiters: RwLock<HashMap<String, VecDeque<Arc<Waiter>>>>,
    /// Values handed to waiters that went away before taking them.
    stranded: Mutex<Vec<(String, String)>>,
}

impl BlockingCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a waiter on every key in `keys`.
    ///
    /// Callers register while still holding the namespace lock they used to find
    /// the keys empty, so no push can slip in between the check and the registration.
    /// The waiter stays registered until the returned registration is dropped or
    /// served.
    pub fn register(&self, kind: WaitKind, keys: &[String]) -> WaiterRegistration<'_> {
        let (sender, receiver) = mpsc::channel(1);
        let waiter = Arc::new(Waiter {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            kind,
            keys: keys.to_vec(),
            sender,
        });

        if let Ok(mut waiters) = self.waiters.write() {
            for key in keys {
                let queue = waiters.entry(key.clone()).or_default();

                if !queue.iter().any(|queued| queued.id == waiter.id) {
                    queue.push_back(Arc::clone(&waiter));
                }
            }
        }

        WaiterRegistration {
            coordinator: self,
            waiter,
            receiver,
        }
    }

    /// Offers `value`, popped from the list at `key`, to the oldest list waiter on
    /// that key.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - A waiter accepted the value and has been unregistered from all its keys
    /// * `Err(value)` - No waiter could take the value, so it goes back to the caller
    pub fn hand_off(&self, key: &str, value: String) -> Result<(), String> {
        let Ok(mut waiters) = self.waiters.write() else {
            return Err(value);
        };

        let mut value = value;

        loop {
            let Some(waiter) = Self::next_waiter(&mut waiters, key, WaitKind::List) else {
                return Err(value);
            };

            Self::remove_waiter(&mut waiters, &waiter);

            let wake = Wake::Value {
                key: key.to_string(),
                value,
            };

            match waiter.sender.try_send(wake) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(Wake::Value { value: rejected, .. }))
                | Err(TrySendError::Closed(Wake::Value { value: rejected, .. })) => {
                    value = rejected;
                }
                Err(_) => return Ok(()),
            }
        }
    }

    /// Takes every value that was handed off but never delivered, oldest first.
    /// The caller puts them back at the head of their lists.
    pub fn take_stranded(&self) -> Vec<(String, String)> {
        self.stranded
            .lock()
            .map(|mut stranded| std::mem::take(&mut *stranded))
            .unwrap_or_default()
    }

    fn strand(&self, key: String, value: String) {
        if let Err(value) = self.hand_off(&key, value) {
            if let Ok(mut stranded) = self.stranded.lock() {
                stranded.push((key, value));
            }
        }
    }

    /// Wakes every stream waiter on `key`. They stay registered and re-scan.
    pub fn notify_stream(&self, key: &str) {
        let Ok(waiters) = self.waiters.read() else {
            return;
        };

        if let Some(queue) = waiters.get(key) {
            for waiter in queue.iter().filter(|waiter| waiter.kind == WaitKind::Stream) {
                let _ = waiter.sender.try_send(Wake::Ready);
            }
        }
    }

    /// Number of waiters currently registered on `key`.
    pub fn waiting_on(&self, key: &str) -> usize {
        self.waiters
            .read()
            .map(|waiters| waiters.get(key).map_or(0, VecDeque::len))
            .unwrap_or(0)
    }

    fn next_waiter(
        waiters: &mut HashMap<String, VecDeque<Arc<Waiter>>>,
        key: &str,
        kind: WaitKind,
    ) -> Option<Arc<Waiter>> {
        waiters
            .get(key)?
            .iter()
            .find(|waiter| waiter.kind == kind)
            .cloned()
    }

    fn remove_waiter(waiters: &mut HashMap<String, VecDeque<Arc<Waiter>>>, waiter: &Waiter) {
        for key in &waiter.keys {
            if let Some(queue) = waiters.get_mut(key) {
                queue.retain(|queued| queued.id != waiter.id);

                if queue.is_empty() {
                    waiters.remove(key);
                }
            }
        }
    }

    fn unregister(&self, waiter: &Waiter) {
        if let Ok(mut waiters) = self.waiters.write() {
            Self::remove_waiter(&mut waiters, waiter);
        }
    }
}

/// A waiter's handle on its registration. Dropping it unregisters the waiter from
/// every key, which covers both timeouts and clients that disconnect mid-wait. A
/// value handed off but never received goes to the next waiter on its key, or is
/// kept for [`BlockingCoordinator::take_stranded`].
#[derive(Debug)]
pub struct WaiterRegistration<'a> {
    coordinator: &'a BlockingCoordinator,
    waiter: Arc<Waiter>,
    receiver: mpsc::Receiver<Wake>,
}

impl WaiterRegistration<'_> {
    /// Suspends until woken or until `deadline` passes. `None` as a deadline waits
    /// forever. Returns `None` on timeout.
    pub async fn wait(&mut self, deadline: Option<Instant>) -> Option<Wake> {
        match deadline {
            Some(deadline) => timeout_at(deadline, self.receiver.recv())
                .await
                .ok()
                .flatten(),
            None => self.receiver.recv().await,
        }
    }

    /// Unregisters and returns a wake that raced in just before the unregistration,
    /// if any. A value handed off at that moment must not be lost.
    pub fn finish(mut self) -> Option<Wake> {
        self.coordinator.unregister(&self.waiter);
        self.receiver.try_recv().ok()
    }
}

impl Drop for WaiterRegistration<'_> {
    fn drop(&mut self) {
        self.coordinator.unregister(&self.waiter);

        if let Ok(Wake::Value { key, value }) = self.receiver.try_recv() {
            self.coordinator.strand(key, value);
        }
    }
}
