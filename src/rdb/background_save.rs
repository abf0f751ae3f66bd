use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{interval, Instant, MissedTickBehavior},
};
use tracing::{error, info};

use crate::{
    rdb::{save_store, RdbError},
    state::State,
};

const TICK: Duration = Duration::from_secs(1);

/// Tracks when the last save finished and whether one is running right now.
#[derive(Debug)]
pub struct SaveScheduler {
    saving: AtomicBool,
    last_save: Mutex<Instant>,
}

impl Default for SaveScheduler {
    fn default() -> Self {
        Self {
            saving: AtomicBool::new(false),
            last_save: Mutex::new(Instant::now()),
        }
    }
}

impl SaveScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::SeqCst)
    }

    pub async fn last_save(&self) -> Instant {
        *self.last_save.lock().await
    }

    /// Claims the single save slot.
    fn begin(&self) -> Result<(), RdbError> {
        self.saving
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(|_| RdbError::SaveInProgress)
    }

    async fn finish(&self, succeeded: bool) {
        if succeeded {
            *self.last_save.lock().await = Instant::now();
        }

        self.saving.store(false, Ordering::SeqCst);
    }
}

/// Whether enough time and enough changes have accumulated for an automatic save.
fn should_save(since_last_save: Duration, dirty: u64, save_seconds: u64, save_changes: u64) -> bool {
    since_last_save >= Duration::from_secs(save_seconds) && dirty >= save_changes
}

/// Runs a save in a background task unless one is already running.
///
/// # Returns
///
/// * `Ok(JoinHandle)` - The save task, which logs its own outcome
/// * `Err(RdbError::SaveInProgress)` - Another save holds the slot
pub fn start_background_save(state: &Arc<State>) -> Result<JoinHandle<()>, RdbError> {
    state.saver.begin()?;

    let state = Arc::clone(state);

    Ok(tokio::spawn(async move {
        info!("background saving started");

        let result = save_store(&state.store, &state.config).await;

        if let Err(error) = &result {
            error!(%error, "background saving failed");
        }

        state.saver.finish(result.is_ok()).await;
    }))
}

/// Runs a save on the caller's task, holding the same slot as background saves.
///
/// # Returns
///
/// * `Ok(())` - The snapshot is on disk
/// * `Err(RdbError::SaveInProgress)` - Another save holds the slot
/// * `Err(RdbError)` - The snapshot could not be written
pub async fn save_now(state: &Arc<State>) -> Result<(), RdbError> {
    state.saver.begin()?;

    let result = save_store(&state.store, &state.config).await;
    state.saver.finish(result.is_ok()).await;

    result
}

/// Checks the save policy once per second for as long as the server runs.
pub fn spawn_background_saver(state: Arc<State>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if state.saver.is_saving() {
                continue;
            }

            let since_last_save = state.saver.last_save().await.elapsed();
            let dirty = state.store.dirty();

            if should_save(
                since_last_save,
                dirty,
                state.config.save_seconds,
                state.config.save_changes,
            ) {
                info!(dirty, "save policy met, saving");
                let _ = start_background_save(&state);
            }
        }
    })
}
