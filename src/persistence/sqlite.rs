//! SQLite implementation of the event store.
//!
//! Schema lives in `migrations/` and is applied on open. Webhook history is
//! trimmed to the retention limit inside the insert transaction; indicator
//! rows are keyed by record id and upserted, so re-ingesting a webhook with
//! the same id replaces its indicator.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};

use super::{EventStore, RetentionLimits, assign_id};
use crate::domain::{IndicatorRecord, RecordId, WebhookRecord};
use crate::error::GatewayError;
use crate::normalize::format_timestamp;

const INDICATOR_COLUMNS: &str = "id, event, ticker, exchange, timeframe, condition, price, \
     mvrvz_btc, mvrvz_eth, message, source, primary_asset, triggered_at, received_at, raw_payload";

/// SQLite-backed event store using `sqlx::SqlitePool`.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    webhook_limit: usize,
    location: String,
}

impl SqliteStore {
    /// Opens (creating if needed) the database file at `path` and applies
    /// the schema. The parent directory is created as well.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] if the directory cannot be
    /// created, the database cannot be opened, or migrations fail.
    pub async fn open(path: &Path, limits: RetentionLimits) -> Result<Self, GatewayError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                GatewayError::PersistenceError(format!(
                    "cannot create {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self::from_pool(pool, limits, path.display().to_string());
        store.migrate().await?;
        tracing::info!(path = %path.display(), "sqlite store ready");
        Ok(store)
    }

    /// Opens a private in-memory database, mainly for tests.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] if the database cannot be
    /// created or migrations fail.
    pub async fn in_memory(limits: RetentionLimits) -> Result<Self, GatewayError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // The database lives as long as its single connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self::from_pool(pool, limits, ":memory:".to_string());
        store.migrate().await?;
        Ok(store)
    }

    /// Wraps an existing pool. The schema is not applied; call
    /// [`SqliteStore::migrate`] if needed.
    #[must_use]
    pub fn from_pool(pool: SqlitePool, limits: RetentionLimits, location: String) -> Self {
        Self {
            pool,
            webhook_limit: limits.webhook,
            location,
        }
    }

    /// Applies pending schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PersistenceError`] on migration failure.
    pub async fn migrate(&self) -> Result<(), GatewayError> {
        sqlx::migrate!().run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl EventStore for SqliteStore {
    async fn save_webhook(&self, record: &WebhookRecord) -> Result<(), GatewayError> {
        let payload = serde_json::to_string(&record.payload)
            .map_err(|e| GatewayError::Internal(e.to_string()))?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO webhook_events (id, event, triggered_at, received_at, payload) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(record.id.as_str())
        .bind(&record.event)
        .bind(record.triggered_at.as_deref())
        .bind(format_timestamp(&record.received_at))
        .bind(payload)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM webhook_events WHERE seq NOT IN \
             (SELECT seq FROM webhook_events ORDER BY seq DESC LIMIT ?)",
        )
        .bind(sql_limit(self.webhook_limit))
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn latest_webhook(&self) -> Result<Option<WebhookRecord>, GatewayError> {
        Ok(self.webhook_history(1).await?.into_iter().next())
    }

    async fn webhook_history(&self, limit: usize) -> Result<Vec<WebhookRecord>, GatewayError> {
        let rows = sqlx::query(
            "SELECT id, event, triggered_at, received_at, payload FROM webhook_events \
             ORDER BY seq DESC LIMIT ?",
        )
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(|row| decode_row(row, webhook_from_row)).collect())
    }

    async fn save_indicator(
        &self,
        record: IndicatorRecord,
    ) -> Result<IndicatorRecord, GatewayError> {
        let record = assign_id(record);
        sqlx::query(&format!(
            "INSERT INTO indicator_events ({INDICATOR_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
                event = excluded.event, \
                ticker = excluded.ticker, \
                exchange = excluded.exchange, \
                timeframe = excluded.timeframe, \
                condition = excluded.condition, \
                price = excluded.price, \
                mvrvz_btc = excluded.mvrvz_btc, \
                mvrvz_eth = excluded.mvrvz_eth, \
                message = excluded.message, \
                source = excluded.source, \
                primary_asset = excluded.primary_asset, \
                triggered_at = excluded.triggered_at, \
                received_at = excluded.received_at, \
                raw_payload = excluded.raw_payload"
        ))
        .bind(record.id.as_deref())
        .bind(record.event.as_deref())
        .bind(record.ticker.as_deref())
        .bind(record.exchange.as_deref())
        .bind(record.timeframe.as_deref())
        .bind(record.condition.as_deref())
        .bind(record.price)
        .bind(record.mvrvz_btc)
        .bind(record.mvrvz_eth)
        .bind(record.message.as_deref())
        .bind(record.source.as_deref())
        .bind(record.primary_asset.as_deref())
        .bind(record.triggered_at.as_deref())
        .bind(record.received_at.as_deref())
        .bind(&record.raw_payload)
        .execute(&self.pool)
        .await?;
        Ok(record)
    }

    async fn latest_indicator(&self) -> Result<Option<IndicatorRecord>, GatewayError> {
        Ok(self.indicator_history(1).await?.into_iter().next())
    }

    async fn indicator_history(
        &self,
        limit: usize,
    ) -> Result<Vec<IndicatorRecord>, GatewayError> {
        let rows = sqlx::query(&format!(
            "SELECT {INDICATOR_COLUMNS} FROM indicator_events \
             ORDER BY COALESCE(received_at, triggered_at) DESC, rowid DESC LIMIT ?"
        ))
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().filter_map(|row| decode_row(row, indicator_from_row)).collect())
    }

    fn description(&self) -> String {
        format!("sqlite ({})", self.location)
    }

    fn is_durable(&self) -> bool {
        self.location != ":memory:"
    }
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Skips rows that no longer decode instead of failing the whole read.
fn decode_row<T>(
    row: &SqliteRow,
    decode: fn(&SqliteRow) -> Result<T, GatewayError>,
) -> Option<T> {
    match decode(row) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(error = %e, "skipping malformed row");
            None
        }
    }
}

fn webhook_from_row(row: &SqliteRow) -> Result<WebhookRecord, GatewayError> {
    let id: String = row.try_get("id")?;
    let received_at: String = row.try_get("received_at")?;
    let received_at = DateTime::parse_from_rfc3339(&received_at)
        .map_err(|e| GatewayError::PersistenceError(format!("bad received_at: {e}")))?
        .with_timezone(&Utc);
    let payload: String = row.try_get("payload")?;
    let payload = serde_json::from_str(&payload)
        .map_err(|e| GatewayError::PersistenceError(format!("bad payload: {e}")))?;

    Ok(WebhookRecord {
        id: RecordId::from_client(Some(id.as_str())),
        event: row.try_get("event")?,
        triggered_at: row.try_get("triggered_at")?,
        received_at,
        payload,
    })
}

fn indicator_from_row(row: &SqliteRow) -> Result<IndicatorRecord, GatewayError> {
    Ok(IndicatorRecord {
        id: row.try_get("id")?,
        event: row.try_get("event")?,
        ticker: row.try_get("ticker")?,
        exchange: row.try_get("exchange")?,
        timeframe: row.try_get("timeframe")?,
        condition: row.try_get("condition")?,
        price: row.try_get("price")?,
        mvrvz_btc: row.try_get("mvrvz_btc")?,
        mvrvz_eth: row.try_get("mvrvz_eth")?,
        message: row.try_get("message")?,
        source: row.try_get("source")?,
        primary_asset: row.try_get("primary_asset")?,
        triggered_at: row.try_get("triggered_at")?,
        received_at: row.try_get("received_at")?,
        raw_payload: row.try_get("raw_payload")?,
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::WebhookEnvelope;
    use serde_json::json;

    async fn store(webhook: usize) -> SqliteStore {
        let limits = RetentionLimits {
            webhook,
            indicator: 200,
        };
        let Ok(store) = SqliteStore::in_memory(limits).await else {
            panic!("in-memory sqlite should open");
        };
        store
    }

    fn webhook(event: &str, id: &str) -> WebhookRecord {
        let Ok(envelope) =
            WebhookEnvelope::from_value(json!({"event": event, "id": id, "data": {"ticker": "BTC"}}))
        else {
            panic!("valid envelope");
        };
        envelope.into_record(Utc::now())
    }

    fn indicator(id: &str, ticker: &str, received_at: &str) -> IndicatorRecord {
        IndicatorRecord {
            id: Some(id.to_string()),
            ticker: Some(ticker.to_string()),
            price: Some(2520.45),
            received_at: Some(received_at.to_string()),
            raw_payload: r#"{"ticker":"X"}"#.to_string(),
            ..IndicatorRecord::default()
        }
    }

    #[tokio::test]
    async fn webhook_round_trips_through_sqlite() {
        let store = store(20).await;
        let record = webhook("alert", "abc123");
        assert!(store.save_webhook(&record).await.is_ok());

        let Ok(Some(latest)) = store.latest_webhook().await else {
            panic!("expected a stored webhook");
        };
        assert_eq!(latest, record);
    }

    #[tokio::test]
    async fn webhook_history_is_trimmed_on_insert() {
        let store = store(2).await;
        for (event, id) in [("a", "1"), ("b", "2"), ("c", "3")] {
            assert!(store.save_webhook(&webhook(event, id)).await.is_ok());
        }
        let history = store.webhook_history(10).await.unwrap_or_default();
        let events: Vec<&str> = history.iter().map(|r| r.event.as_str()).collect();
        assert_eq!(events, ["c", "b"]);
    }

    #[tokio::test]
    async fn indicators_upsert_and_order_by_recency() {
        let store = store(20).await;
        let saves = [
            indicator("a", "BTC", "2024-01-01T00:00:00.000Z"),
            indicator("b", "ETH", "2024-01-02T00:00:00.000Z"),
            indicator("a", "SOL", "2024-01-03T00:00:00.000Z"),
        ];
        for record in saves {
            assert!(store.save_indicator(record).await.is_ok());
        }

        let history = store.indicator_history(10).await.unwrap_or_default();
        assert_eq!(history.len(), 2);
        let Some(first) = history.first() else {
            panic!("expected records");
        };
        assert_eq!(first.id.as_deref(), Some("a"));
        assert_eq!(first.ticker.as_deref(), Some("SOL"));
        assert_eq!(first.price, Some(2520.45));
        assert_eq!(first.mvrvz_btc, None);

        let Ok(Some(latest)) = store.latest_indicator().await else {
            panic!("expected latest indicator");
        };
        assert_eq!(&latest, first);
    }

    #[tokio::test]
    async fn indicator_without_id_gets_generated_id() {
        let store = store(20).await;
        let Ok(saved) = store.save_indicator(IndicatorRecord::default()).await else {
            panic!("save should succeed");
        };
        let Some(id) = saved.id else {
            panic!("id should be assigned");
        };
        assert!(uuid::Uuid::parse_str(&id).is_ok());
    }

    #[tokio::test]
    async fn in_memory_database_is_not_durable() {
        let store = store(20).await;
        assert!(!store.is_durable());
        assert_eq!(store.description(), "sqlite (:memory:)");
    }
}
