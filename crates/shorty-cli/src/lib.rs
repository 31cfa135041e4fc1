//! Helpers shared by the `assetctl` binary.

use anyhow::Context;
use bytes::Bytes;
use serde::Serialize;
use shorty_core::{AppError, AssetMetadata, Config, ErrorMetadata, LogLevel};
use shorty_db::{setup_database, PgMetadataRepository};
use shorty_infra::{AssetReconciler, ReconcilerConfig};
use shorty_services::{
    create_blob_store, create_metadata_cache, AssetStorage, DedupOutcome, DedupResolver,
    LoggingDeletionQueue,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Fully wired asset storage stack
pub struct AssetStack {
    pub storage: AssetStorage,
    pub dedup: DedupResolver,
    pub reconciler: AssetReconciler,
}

/// Connect every backend named by the configuration.
pub async fn connect(config: &Config) -> anyhow::Result<AssetStack> {
    let pool = setup_database(config)
        .await
        .context("Failed to set up database")?;
    let repository = Arc::new(PgMetadataRepository::new(pool));
    let blobs = create_blob_store(config)
        .await
        .context("Failed to create blob store")?;
    let cache = create_metadata_cache(config).context("Failed to create metadata cache")?;

    let storage = AssetStorage::from_config(config, repository, blobs, cache);
    let dedup = DedupResolver::new(storage.repository(), storage.digest());
    let reconciler = AssetReconciler::new(
        storage.clone(),
        Arc::new(LoggingDeletionQueue),
        ReconcilerConfig::from_config(config),
    );

    Ok(AssetStack {
        storage,
        dedup,
        reconciler,
    })
}

/// One input file of a `put` and the asset now holding its content
#[derive(Debug, Serialize)]
pub struct StoredFile {
    pub file: String,
    /// True when no new blob was written for this file.
    pub reused: bool,
    pub asset: AssetMetadata,
}

enum Placement {
    Existing(AssetMetadata),
    New(usize),
    SameAs(usize),
}

/// Store `files` in `bucket`, in input order.
///
/// With a resolver, content already stored in the bucket is reused, and a
/// file repeating the content of an earlier file in the same call shares
/// that file's new asset.
pub async fn store_files(
    storage: &AssetStorage,
    dedup: Option<&DedupResolver>,
    bucket: &str,
    files: Vec<(String, Vec<u8>)>,
) -> anyhow::Result<Vec<StoredFile>> {
    let mut placements = Vec::with_capacity(files.len());
    let mut blobs = Vec::new();
    let mut seen: HashMap<(i64, String), usize> = HashMap::new();

    for (name, content) in files {
        if let Some(dedup) = dedup {
            match dedup.resolve(bucket, &content).await? {
                DedupOutcome::Existing(record) => {
                    placements.push((name, Placement::Existing(record)));
                    continue;
                }
                DedupOutcome::Missing { size, hash } => {
                    if let Some(&index) = seen.get(&(size, hash.clone())) {
                        placements.push((name, Placement::SameAs(index)));
                        continue;
                    }
                    seen.insert((size, hash), blobs.len());
                }
            }
        }
        placements.push((name, Placement::New(blobs.len())));
        blobs.push(Bytes::from(content));
    }

    let saved = storage.save_assets(bucket, blobs).await?;
    let saved_at = |index: usize| {
        saved
            .get(index)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("missing saved asset #{}", index))
    };

    let mut stored = Vec::with_capacity(placements.len());
    for (file, placement) in placements {
        let (reused, asset) = match placement {
            Placement::Existing(record) => (true, record),
            Placement::New(index) => (false, saved_at(index)?),
            Placement::SameAs(index) => (true, saved_at(index)?),
        };
        if !reused {
            tracing::info!(
                file = %file,
                asset_id = %asset.id,
                size = %format_size(asset.size),
                "Stored asset"
            );
        }
        stored.push(StoredFile {
            file,
            reused,
            asset,
        });
    }
    Ok(stored)
}

/// Log a failed command and return the message to show the user.
///
/// Asset errors are reported through their client message; the full source
/// chain only goes to the log.
pub fn describe_error(err: &anyhow::Error) -> String {
    match err.downcast_ref::<AppError>() {
        Some(app) => {
            match app.log_level() {
                LogLevel::Debug => {
                    tracing::debug!(code = app.error_code(), "{}", app.detailed_message())
                }
                LogLevel::Error => {
                    tracing::error!(code = app.error_code(), "{}", app.detailed_message())
                }
            }
            format!("{} ({})", app.client_message(), app.error_code())
        }
        None => format!("{:#}", err),
    }
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Human-readable byte count, e.g. `1.5 KiB`.
pub fn format_size(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
