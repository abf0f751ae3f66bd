use std::path::Path;

use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info};

use crate::{
    config::ServerConfig,
    key_value_store::{KeyValueStore, Snapshot},
    rdb::{RdbEncoder, RdbError, RdbParser},
};

/// Writes `bytes` to the temporary snapshot path, flushes it to disk and renames it
/// over the real snapshot. A crash before the rename leaves the previous snapshot
/// in place.
pub async fn save_rdb_file(config: &ServerConfig, bytes: &[u8]) -> Result<(), RdbError> {
    let temporary_path = config.temporary_snapshot_path();
    let final_path = config.snapshot_path();

    let result = async {
        let mut file = fs::File::create(&temporary_path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temporary_path, &final_path).await
    }
    .await;

    if let Err(error) = result {
        let _ = fs::remove_file(&temporary_path).await;
        return Err(error.into());
    }

    debug!(path = %final_path.display(), bytes = bytes.len(), "snapshot written");

    Ok(())
}

/// Reads and decodes the snapshot at `path`. A missing file is not an error and
/// yields `None`.
pub async fn load_rdb_file(path: &Path) -> Result<Option<Snapshot>, RdbError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(error.into()),
    };

    RdbParser::parse(&bytes).map(Some)
}

/// Snapshots `store` and saves it. On success the dirty counter drops by the number
/// of mutations the snapshot covers.
pub async fn save_store(store: &KeyValueStore, config: &ServerConfig) -> Result<(), RdbError> {
    let covered = store.dirty();
    let snapshot = store.snapshot().await;
    let bytes = RdbEncoder::encode(&snapshot);

    save_rdb_file(config, &bytes).await?;
    store.mark_saved(covered);

    info!(
        keys = snapshot.key_count(),
        path = %config.snapshot_path().display(),
        "DB saved on disk"
    );

    Ok(())
}
