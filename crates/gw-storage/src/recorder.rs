//! Incident & telemetry recorder
//!
//! Write side of the store. Everything here is fire-and-forget from the
//! gateway's point of view: callers log a failed write and move on, because
//! serving the verdict matters more than a complete audit trail. The three
//! writes behind an incident are deliberately not one transaction; partial
//! persistence under failure is accepted.

use chrono::{DateTime, Utc};
use gw_rules::techniques::technique_for_rule;
use gw_types::{AppError, AppResult};
use rusqlite::params;
use tracing::{error, info, warn};

use crate::db::GatewayDb;

/// Writes incidents, request outcomes, technique mappings, and external
/// alerts.
#[derive(Clone)]
pub struct Recorder {
    db: GatewayDb,
}

impl Recorder {
    pub fn new(db: GatewayDb) -> Self {
        Self { db }
    }

    /// Record a blocked request: one incident row, zero or one technique
    /// row derived from the rule name, and an `error` request outcome.
    ///
    /// The technique and outcome writes are best-effort; their failures are
    /// logged here and never reach the caller.
    pub async fn record_incident(
        &self,
        ip: &str,
        payload: &str,
        rule: &str,
    ) -> AppResult<i64> {
        if rule.is_empty() {
            return Err(AppError::Storage(
                "Refusing to record an incident without a rule name".to_string(),
            ));
        }

        let ts = Utc::now().timestamp();
        let (ip_owned, payload_owned, rule_owned) =
            (ip.to_string(), payload.to_string(), rule.to_string());

        let incident_id = self
            .db
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO incidents (timestamp, ip, payload, rule_triggered, status)
                     VALUES (?1, ?2, ?3, ?4, 'open')",
                    params![ts, ip_owned, payload_owned, rule_owned],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        warn!(
            "Incident logged (id={}) - rule: {} from {}",
            incident_id, rule, ip
        );

        if let Some(technique) = technique_for_rule(rule) {
            let result = self
                .db
                .with_conn(move |conn| {
                    conn.execute(
                        "INSERT INTO ttps
                         (timestamp, incident_id, technique_id, technique_name, description)
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![
                            Utc::now().timestamp(),
                            incident_id,
                            technique.technique_id,
                            technique.technique_name,
                            technique.description,
                        ],
                    )?;
                    Ok(())
                })
                .await;
            match result {
                Ok(()) => info!(
                    "Logged technique mapping {} for incident {}",
                    technique.technique_id, incident_id
                ),
                Err(e) => error!("Failed to log technique mapping: {}", e),
            }
        }

        if let Err(e) = self.insert_outcome("error", ip).await {
            error!("Failed to log request outcome: {}", e);
        }

        Ok(incident_id)
    }

    /// Record an allowed request.
    pub async fn record_success(&self, client_ip: &str) -> AppResult<()> {
        self.insert_outcome("success", client_ip).await
    }

    async fn insert_outcome(&self, status: &'static str, client_ip: &str) -> AppResult<()> {
        let ts = Utc::now().timestamp();
        let ip_owned = client_ip.to_string();
        self.db
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO requests (timestamp, status, client_ip) VALUES (?1, ?2, ?3)",
                    params![ts, status, ip_owned],
                )?;
                Ok(())
            })
            .await
    }

    /// Record an alert fed in by an external network sensor.
    pub async fn record_suricata_alert(
        &self,
        timestamp: DateTime<Utc>,
        source: &str,
        signature: &str,
        category: &str,
        severity: i64,
    ) -> AppResult<()> {
        let ts = timestamp.timestamp();
        let (source_owned, signature_owned, category_owned) = (
            source.to_string(),
            signature.to_string(),
            category.to_string(),
        );
        self.db
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO suricata_alerts (timestamp, source, signature, category, severity)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![ts, source_owned, signature_owned, category_owned, severity],
                )?;
                Ok(())
            })
            .await?;
        info!("Suricata alert logged: {} ({})", signature, category);
        Ok(())
    }

    /// Mark an incident as handled. Returns whether a row with that id
    /// exists; repeating the call is harmless.
    pub async fn mark_handled(&self, incident_id: i64) -> AppResult<bool> {
        let updated = self
            .db
            .with_conn(move |conn| {
                conn.execute(
                    "UPDATE incidents SET status = 'handled' WHERE id = ?1",
                    params![incident_id],
                )
            })
            .await?;

        if updated > 0 {
            info!("Incident {} marked as handled", incident_id);
        }
        Ok(updated > 0)
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

    fn count(db: &GatewayDb, sql: &str) -> i64 {
        db.conn.lock().query_row(sql, [], |row| row.get(0)).unwrap()
    }

    #[tokio::test]
    async fn test_sql_rule_creates_one_ttp_row() {
        let (_dir, db) = test_db();
        let recorder = Recorder::new(db.clone());

        let id = recorder
            .record_incident("10.0.0.1", "' OR 1=1 --", "SQLInjection")
            .await
            .unwrap();
        assert_eq!(id, 1);

        assert_eq!(count(&db, "SELECT COUNT(*) FROM incidents"), 1);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM ttps"), 1);

        let (incident_id, technique_id): (i64, String) = db
            .conn
            .lock()
            .query_row(
                "SELECT incident_id, technique_id FROM ttps",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(incident_id, id);
        assert_eq!(technique_id, "T1190");
    }

    #[tokio::test]
    async fn test_xss_rule_maps_to_scripting_technique() {
        let (_dir, db) = test_db();
        let recorder = Recorder::new(db.clone());

        recorder
            .record_incident("10.0.0.2", "<script>alert(1)</script>", "XSS")
            .await
            .unwrap();

        let technique_id: String = db
            .conn
            .lock()
            .query_row("SELECT technique_id FROM ttps", [], |row| row.get(0))
            .unwrap();
        assert_eq!(technique_id, "T1059.007");
    }

    #[tokio::test]
    async fn test_unmapped_rule_creates_no_ttp_rows() {
        let (_dir, db) = test_db();
        let recorder = Recorder::new(db.clone());

        recorder
            .record_incident("10.0.0.3", "../../etc/passwd", "PathTraversal")
            .await
            .unwrap();

        assert_eq!(count(&db, "SELECT COUNT(*) FROM incidents"), 1);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM ttps"), 0);
    }

    #[tokio::test]
    async fn test_incident_also_records_error_outcome() {
        let (_dir, db) = test_db();
        let recorder = Recorder::new(db.clone());

        recorder
            .record_incident("10.0.0.4", "payload", "SomeRule")
            .await
            .unwrap();

        assert_eq!(
            count(&db, "SELECT COUNT(*) FROM requests WHERE status = 'error'"),
            1
        );
        assert_eq!(
            count(&db, "SELECT COUNT(*) FROM requests WHERE status = 'success'"),
            0
        );
    }

    #[tokio::test]
    async fn test_record_success() {
        let (_dir, db) = test_db();
        let recorder = Recorder::new(db.clone());

        recorder.record_success("10.0.0.5").await.unwrap();

        let (status, ip): (String, String) = db
            .conn
            .lock()
            .query_row("SELECT status, client_ip FROM requests", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(status, "success");
        assert_eq!(ip, "10.0.0.5");
    }

    #[tokio::test]
    async fn test_empty_rule_name_is_rejected() {
        let (_dir, db) = test_db();
        let recorder = Recorder::new(db.clone());

        let result = recorder.record_incident("10.0.0.6", "payload", "").await;
        assert!(result.is_err());
        assert_eq!(count(&db, "SELECT COUNT(*) FROM incidents"), 0);
    }

    #[tokio::test]
    async fn test_mark_handled_is_idempotent() {
        let (_dir, db) = test_db();
        let recorder = Recorder::new(db.clone());

        let id = recorder
            .record_incident("10.0.0.7", "payload", "SQLInjection")
            .await
            .unwrap();

        assert!(recorder.mark_handled(id).await.unwrap());
        let status: String = db
            .conn
            .lock()
            .query_row("SELECT status FROM incidents WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(status, "handled");

        // Second call also succeeds and leaves the status alone.
        assert!(recorder.mark_handled(id).await.unwrap());
        let status: String = db
            .conn
            .lock()
            .query_row("SELECT status FROM incidents WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(status, "handled");
    }

    #[tokio::test]
    async fn test_mark_handled_unknown_id() {
        let (_dir, db) = test_db();
        let recorder = Recorder::new(db);

        assert!(!recorder.mark_handled(9999).await.unwrap());
    }

    #[tokio::test]
    async fn test_suricata_alert_row() {
        let (_dir, db) = test_db();
        let recorder = Recorder::new(db.clone());

        recorder
            .record_suricata_alert(
                Utc::now(),
                "192.168.1.50",
                "SURICATA HTTP unable to match response to request",
                "Suricata Alert",
                2,
            )
            .await
            .unwrap();

        let (source, severity): (String, i64) = db
            .conn
            .lock()
            .query_row(
                "SELECT source, severity FROM suricata_alerts",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(source, "192.168.1.50");
        assert_eq!(severity, 2);
    }
}
