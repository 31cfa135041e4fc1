//! Asset metadata repository: the `assets` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shorty_core::{AppError, AssetMetadata, AssetStatus};
use sqlx::{PgPool, Postgres, QueryBuilder};

const ASSET_COLUMNS: &str = "id, resource_id, size, hash, bucket, status, created_at";

/// Position in a stale-asset listing: the last row of the previous page.
///
/// Listings are ordered by `(created_at, id)`, so the pair is unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleCursor {
    pub created_at: DateTime<Utc>,
    pub id: String,
}

impl From<&AssetMetadata> for StaleCursor {
    fn from(record: &AssetMetadata) -> Self {
        Self {
            created_at: record.created_at,
            id: record.id.clone(),
        }
    }
}

/// Durable store of asset metadata.
#[async_trait]
pub trait MetadataRepository: Send + Sync {
    /// Insert all records in one transaction.
    ///
    /// Fails, and inserts nothing, unless every record is written. An empty
    /// batch is a no-op.
    async fn save_metadata_batch(&self, records: &[AssetMetadata]) -> Result<(), AppError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<AssetMetadata>, AppError>;

    /// Find a `created` record in `bucket` with the same size and hash.
    async fn get_duplicate(
        &self,
        bucket: &str,
        size: i64,
        hash: &str,
    ) -> Result<Option<AssetMetadata>, AppError>;

    /// Move the given records to `status`.
    ///
    /// Only rows currently in the predecessor of `status` change. Returns the
    /// number of rows updated.
    async fn set_status(&self, status: AssetStatus, ids: &[String]) -> Result<u64, AppError>;

    /// Records in `status` created before `older_than`, ordered by
    /// `(created_at, id)` and starting strictly after `after` when given.
    async fn list_stale_assets(
        &self,
        status: AssetStatus,
        older_than: DateTime<Utc>,
        after: Option<&StaleCursor>,
        limit: i64,
    ) -> Result<Vec<AssetMetadata>, AppError>;
}

/// PostgreSQL implementation of [`MetadataRepository`].
#[derive(Clone)]
pub struct PgMetadataRepository {
    pool: PgPool,
}

impl PgMetadataRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MetadataRepository for PgMetadataRepository {
    #[tracing::instrument(skip(self, records), fields(db.table = "assets", count = records.len()))]
    async fn save_metadata_batch(&self, records: &[AssetMetadata]) -> Result<(), AppError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO assets (id, resource_id, size, hash, bucket, status, created_at) ",
        );
        builder.push_values(records, |mut row, record| {
            row.push_bind(record.id.clone())
                .push_bind(record.resource_id.clone())
                .push_bind(record.size)
                .push_bind(record.hash.clone())
                .push_bind(record.bucket.clone())
                .push_bind(record.status)
                .push_bind(record.created_at);
        });

        let result = builder.build().execute(&mut *tx).await?;

        if result.rows_affected() != records.len() as u64 {
            tx.rollback().await?;
            tracing::error!(
                expected = records.len(),
                inserted = result.rows_affected(),
                "Not all asset rows were inserted"
            );
            return Err(AppError::Internal(format!(
                "inserted {} of {} asset rows",
                result.rows_affected(),
                records.len()
            )));
        }

        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "assets", db.record_id = %id))]
    async fn get_by_id(&self, id: &str) -> Result<Option<AssetMetadata>, AppError> {
        let row = sqlx::query_as::<Postgres, AssetMetadata>(&format!(
            "SELECT {} FROM assets WHERE id = $1",
            ASSET_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    #[tracing::instrument(skip(self, hash), fields(db.table = "assets"))]
    async fn get_duplicate(
        &self,
        bucket: &str,
        size: i64,
        hash: &str,
    ) -> Result<Option<AssetMetadata>, AppError> {
        let row = sqlx::query_as::<Postgres, AssetMetadata>(&format!(
            r#"
            SELECT {}
            FROM assets
            WHERE bucket = $1 AND size = $2 AND hash = $3 AND status = $4
            ORDER BY created_at ASC
            LIMIT 1
            "#,
            ASSET_COLUMNS
        ))
        .bind(bucket)
        .bind(size)
        .bind(hash)
        .bind(AssetStatus::Created)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    #[tracing::instrument(skip(self, ids), fields(db.table = "assets", status = %status, count = ids.len()))]
    async fn set_status(&self, status: AssetStatus, ids: &[String]) -> Result<u64, AppError> {
        let predecessor = status.predecessor().ok_or_else(|| {
            AppError::InvalidInput(format!("assets cannot transition to {}", status))
        })?;

        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            UPDATE assets
            SET status = $1, updated_at = NOW()
            WHERE id = ANY($2) AND status = $3
            "#,
        )
        .bind(status)
        .bind(ids)
        .bind(predecessor)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() != ids.len() as u64 {
            tracing::warn!(
                requested = ids.len(),
                updated = result.rows_affected(),
                "Some assets were not in the expected status and were left unchanged"
            );
        }

        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self, after), fields(db.table = "assets", status = %status))]
    async fn list_stale_assets(
        &self,
        status: AssetStatus,
        older_than: DateTime<Utc>,
        after: Option<&StaleCursor>,
        limit: i64,
    ) -> Result<Vec<AssetMetadata>, AppError> {
        let mut query = format!(
            "SELECT {} FROM assets WHERE status = $1 AND created_at < $2",
            ASSET_COLUMNS
        );
        let mut bind_index = 3;

        if after.is_some() {
            query.push_str(&format!(
                " AND (created_at, id) > (${}, ${})",
                bind_index,
                bind_index + 1
            ));
            bind_index += 2;
        }

        query.push_str(&format!(
            " ORDER BY created_at ASC, id ASC LIMIT ${}",
            bind_index
        ));

        let mut query_builder = sqlx::query_as::<Postgres, AssetMetadata>(&query)
            .bind(status)
            .bind(older_than);
        if let Some(cursor) = after {
            query_builder = query_builder.bind(cursor.created_at).bind(cursor.id.as_str());
        }

        let rows = query_builder.bind(limit).fetch_all(&self.pool).await?;
        Ok(rows)
    }
}
