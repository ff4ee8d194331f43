//! Aggregation reader
//!
//! Read side of the store: time-bucketed series and technique roll-ups for
//! the dashboard. Works purely off persisted rows; rows may have been
//! written out of arrival order under concurrent load, so every query
//! sorts by timestamp.

use chrono::{DateTime, Timelike, Utc};
use gw_rules::techniques::tactic_for_rule;
use gw_types::AppResult;
use rusqlite::params;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::db::GatewayDb;

/// Bucket width for the usage and blocked-count series, in seconds
const BUCKET_SECS: i64 = 300;
/// Window for the usage series, in seconds
const USAGE_WINDOW_SECS: i64 = 3600;
/// Row cap for incident-backed listings and series
const LISTING_LIMIT: i64 = 500;
/// Sample payloads are cut off beyond this many characters
const SAMPLE_MAX_CHARS: usize = 250;

/// One 5-minute bucket of request outcomes
#[derive(Debug, Clone, Serialize)]
pub struct UsageBucket {
    pub time: String,
    pub total: i64,
    pub success: i64,
    pub errors: i64,
}

/// One 5-minute bucket of blocked requests
#[derive(Debug, Clone, Serialize)]
pub struct BlockedBucket {
    pub time: String,
    pub blocked: i64,
}

/// Per-rule roll-up joined against the technique table
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechniqueRollup {
    pub id: String,
    pub name: String,
    pub tactic: String,
    pub count: i64,
    pub last_seen: String,
    pub description: String,
    pub example: String,
}

/// Raw incident row for the admin listing
#[derive(Debug, Clone, Serialize)]
pub struct IncidentRow {
    pub id: i64,
    pub timestamp: String,
    pub ip: String,
    pub payload: String,
    pub rule_triggered: String,
    pub status: String,
}

/// External sensor alert row
#[derive(Debug, Clone, Serialize)]
pub struct AlertRow {
    pub id: i64,
    pub timestamp: String,
    pub source: String,
    pub signature: String,
    pub category: String,
    pub severity: i64,
}

/// Read-only queries over the persisted data.
#[derive(Clone)]
pub struct Reader {
    db: GatewayDb,
}

impl Reader {
    pub fn new(db: GatewayDb) -> Self {
        Self { db }
    }

    /// Request outcomes from the last hour in 5-minute buckets aligned to
    /// 5-minute marks, ordered by time.
    pub async fn api_usage(&self) -> AppResult<Vec<UsageBucket>> {
        let cutoff = Utc::now().timestamp() - USAGE_WINDOW_SECS;
        let rows = self
            .db
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT (timestamp / 300) * 300 AS bucket,
                            COUNT(CASE WHEN status = 'success' THEN 1 END) AS success,
                            COUNT(CASE WHEN status = 'error' THEN 1 END) AS errors
                     FROM requests
                     WHERE timestamp > ?1
                     GROUP BY bucket
                     ORDER BY bucket",
                )?;
                let rows = stmt.query_map(params![cutoff], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?))
                })?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await?;

        Ok(rows
            .into_iter()
            .map(|(bucket, success, errors)| UsageBucket {
                time: format_bucket(bucket),
                total: success + errors,
                success,
                errors,
            })
            .collect())
    }

    /// The most recent incidents bucketed by wall-clock `HH:MM`, floored
    /// to 5 minutes, sorted by time key.
    pub async fn blocked_buckets(&self) -> AppResult<Vec<BlockedBucket>> {
        let timestamps = self
            .db
            .with_conn(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT timestamp FROM incidents ORDER BY timestamp DESC, id DESC LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![LISTING_LIMIT], |row| row.get::<_, i64>(0))?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await?;

        let mut buckets: BTreeMap<String, i64> = BTreeMap::new();
        for ts in timestamps {
            if let Some(dt) = DateTime::<Utc>::from_timestamp(ts, 0) {
                let minute = (dt.minute() / 5) * 5;
                let key = format!("{:02}:{:02}", dt.hour(), minute);
                *buckets.entry(key).or_insert(0) += 1;
            }
        }

        Ok(buckets
            .into_iter()
            .map(|(time, blocked)| BlockedBucket { time, blocked })
            .collect())
    }

    /// Incidents grouped by triggering rule, joined against the static
    /// tactic table, sorted by count descending and capped at `limit`.
    pub async fn technique_rollup(&self, limit: usize) -> AppResult<Vec<TechniqueRollup>> {
        let rows = self
            .db
            .with_conn(move |conn| {
                // The bare payload/ip columns come from the max-timestamp
                // row (SQLite guarantee for a lone min/max aggregate).
                let mut stmt = conn.prepare(
                    "SELECT rule_triggered, COUNT(*) AS count, MAX(timestamp) AS last_seen,
                            payload, ip
                     FROM incidents
                     GROUP BY rule_triggered
                     ORDER BY count DESC
                     LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![limit as i64], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                })?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await?;

        Ok(rows
            .into_iter()
            .map(|(rule, count, last_seen, payload, ip)| {
                let (technique_id, tactic) = tactic_for_rule(&rule);
                TechniqueRollup {
                    id: technique_id.to_string(),
                    tactic: tactic.to_string(),
                    count,
                    last_seen: format_timestamp(last_seen),
                    description: format!("Latest detection of {} from {}", rule, ip),
                    example: truncate_sample(&payload),
                    name: rule,
                }
            })
            .collect())
    }

    /// The most recent incidents, newest first.
    pub async fn recent_incidents(&self) -> AppResult<Vec<IncidentRow>> {
        self.db
            .with_conn(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, timestamp, ip, payload, rule_triggered, status
                     FROM incidents
                     ORDER BY timestamp DESC, id DESC
                     LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![LISTING_LIMIT], |row| {
                    Ok(IncidentRow {
                        id: row.get(0)?,
                        timestamp: format_timestamp(row.get(1)?),
                        ip: row.get(2)?,
                        payload: row.get(3)?,
                        rule_triggered: row.get(4)?,
                        status: row.get(5)?,
                    })
                })?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await
    }

    /// The most recent external sensor alerts, newest first.
    pub async fn recent_suricata_alerts(&self, limit: usize) -> AppResult<Vec<AlertRow>> {
        self.db
            .with_conn(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, timestamp, source, signature, category, severity
                     FROM suricata_alerts
                     ORDER BY timestamp DESC, id DESC
                     LIMIT ?1",
                )?;
                let rows = stmt.query_map(params![limit as i64], |row| {
                    Ok(AlertRow {
                        id: row.get(0)?,
                        timestamp: format_timestamp(row.get(1)?),
                        source: row.get(2)?,
                        signature: row.get(3)?,
                        category: row.get(4)?,
                        severity: row.get(5)?,
                    })
                })?;
                rows.collect::<rusqlite::Result<Vec<_>>>()
            })
            .await
    }
}

fn format_bucket(bucket: i64) -> String {
    DateTime::<Utc>::from_timestamp(bucket, 0)
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_default()
}

fn format_timestamp(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_default()
}

fn truncate_sample(payload: &str) -> String {
    if payload.chars().count() > SAMPLE_MAX_CHARS {
        let cut: String = payload.chars().take(SAMPLE_MAX_CHARS).collect();
        format!("{}...", cut)
    } else {
        payload.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, GatewayDb) {
        let dir = tempfile::tempdir().unwrap();
        let db = GatewayDb::open(dir.path().join("gw.db")).unwrap();
        (dir, db)
    }

    fn insert_request(db: &GatewayDb, ts: i64, status: &str) {
        db.conn
            .lock()
            .execute(
                "INSERT INTO requests (timestamp, status, client_ip) VALUES (?1, ?2, '10.0.0.1')",
                params![ts, status],
            )
            .unwrap();
    }

    fn insert_incident(db: &GatewayDb, ts: i64, rule: &str, payload: &str) {
        db.conn
            .lock()
            .execute(
                "INSERT INTO incidents (timestamp, ip, payload, rule_triggered, status)
                 VALUES (?1, '10.0.0.9', ?2, ?3, 'open')",
                params![ts, payload, rule],
            )
            .unwrap();
    }

    #[tokio::test]
    async fn test_usage_buckets_sum_and_alignment() {
        let (_dir, db) = test_db();
        let reader = Reader::new(db.clone());
        let now = Utc::now().timestamp();

        // Two buckets inside the window.
        insert_request(&db, now - 100, "success");
        insert_request(&db, now - 100, "success");
        insert_request(&db, now - 100, "error");
        insert_request(&db, now - 700, "success");
        // Outside the one-hour window; must not appear.
        insert_request(&db, now - 7200, "error");

        let buckets = reader.api_usage().await.unwrap();
        assert_eq!(buckets.len(), 2);

        for bucket in &buckets {
            assert_eq!(bucket.total, bucket.success + bucket.errors);

            // Bucket boundaries align to 5-minute marks.
            let minute: u32 = bucket.time[3..5].parse().unwrap();
            assert_eq!(minute % 5, 0);
        }

        let total: i64 = buckets.iter().map(|b| b.total).sum();
        assert_eq!(total, 4);

        // Ordered by time.
        assert!(buckets[0].time <= buckets[1].time);
    }

    #[tokio::test]
    async fn test_usage_empty_window() {
        let (_dir, db) = test_db();
        let reader = Reader::new(db);
        assert!(reader.api_usage().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blocked_buckets_count_incidents() {
        let (_dir, db) = test_db();
        let reader = Reader::new(db.clone());

        // Three incidents in the same 5-minute bucket, one in another.
        let base = 1_700_000_100; // 13:35:00 UTC
        insert_incident(&db, base, "SQL Injection", "a");
        insert_incident(&db, base + 60, "SQL Injection", "b");
        insert_incident(&db, base + 120, "XSS", "c");
        insert_incident(&db, base + 900, "XSS", "d");

        let buckets = reader.blocked_buckets().await.unwrap();
        assert_eq!(buckets.len(), 2);
        let total: i64 = buckets.iter().map(|b| b.blocked).sum();
        assert_eq!(total, 4);
        assert!(buckets.iter().any(|b| b.blocked == 3));
    }

    #[tokio::test]
    async fn test_technique_rollup_counts_and_mapping() {
        let (_dir, db) = test_db();
        let reader = Reader::new(db.clone());

        insert_incident(&db, 1000, "SQL Injection", "payload one");
        insert_incident(&db, 2000, "SQL Injection", "payload two");
        insert_incident(&db, 3000, "SQL Injection", "payload three");
        insert_incident(&db, 1500, "CustomRule", "odd payload");

        let rollup = reader.technique_rollup(10).await.unwrap();
        assert_eq!(rollup.len(), 2);

        // Sorted by count descending.
        assert_eq!(rollup[0].name, "SQL Injection");
        assert_eq!(rollup[0].count, 3);
        assert_eq!(rollup[0].id, "T1190");
        assert_eq!(rollup[0].tactic, "Execution");
        // The sample comes from the most recent incident.
        assert_eq!(rollup[0].example, "payload three");
        assert!(rollup[0].description.contains("SQL Injection"));

        assert_eq!(rollup[1].name, "CustomRule");
        assert_eq!(rollup[1].id, "Unknown");
        assert_eq!(rollup[1].tactic, "Unmapped");
    }

    #[tokio::test]
    async fn test_technique_rollup_respects_limit() {
        let (_dir, db) = test_db();
        let reader = Reader::new(db.clone());

        insert_incident(&db, 1000, "A", "x");
        insert_incident(&db, 2000, "B", "y");
        insert_incident(&db, 3000, "C", "z");

        let rollup = reader.technique_rollup(2).await.unwrap();
        assert_eq!(rollup.len(), 2);
    }

    #[tokio::test]
    async fn test_long_sample_payload_is_truncated() {
        let (_dir, db) = test_db();
        let reader = Reader::new(db.clone());

        let long_payload = "A".repeat(400);
        insert_incident(&db, 1000, "SQL Injection", &long_payload);

        let rollup = reader.technique_rollup(10).await.unwrap();
        assert_eq!(rollup[0].example.chars().count(), 253);
        assert!(rollup[0].example.ends_with("..."));
    }

    #[tokio::test]
    async fn test_recent_incidents_newest_first() {
        let (_dir, db) = test_db();
        let reader = Reader::new(db.clone());

        insert_incident(&db, 1000, "SQL Injection", "old");
        insert_incident(&db, 3000, "XSS", "new");
        insert_incident(&db, 2000, "Path Traversal", "middle");

        let incidents = reader.recent_incidents().await.unwrap();
        assert_eq!(incidents.len(), 3);
        assert_eq!(incidents[0].payload, "new");
        assert_eq!(incidents[1].payload, "middle");
        assert_eq!(incidents[2].payload, "old");
        assert_eq!(incidents[0].status, "open");
    }

    #[tokio::test]
    async fn test_recent_alerts_limit_and_order() {
        let (_dir, db) = test_db();
        let reader = Reader::new(db.clone());

        for i in 0..5 {
            db.conn
                .lock()
                .execute(
                    "INSERT INTO suricata_alerts (timestamp, source, signature, category, severity)
                     VALUES (?1, '10.1.1.1', 'SURICATA alert', 'Suricata Alert', 2)",
                    params![1000 + i],
                )
                .unwrap();
        }

        let alerts = reader.recent_suricata_alerts(3).await.unwrap();
        assert_eq!(alerts.len(), 3);
        assert!(alerts[0].timestamp >= alerts[1].timestamp);
    }
}
