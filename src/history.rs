use crate::detector::AnalysisResult;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;

/// One stored analysis record.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub id: i64,
    pub user_id: String,
    pub email_content: String,
    pub prediction: bool,
    pub confidence: f64,
    pub timestamp: DateTime<Utc>,
    pub features: String,
    pub risk_score: u32,
}

/// SQLite-backed per-user analysis history.
///
/// Append-only inserts, retrieval ordered newest-first, per-user bulk
/// delete. Storage failures are the caller's to handle and must never block
/// a scoring result from being returned.
pub struct HistoryStore {
    conn: Connection,
}

impl HistoryStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create history directory: {}", parent.display())
                })?;
            }
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open history database: {}", db_path.display()))?;
        Self::init_schema(&conn)?;
        Ok(HistoryStore { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::init_schema(&conn)?;
        Ok(HistoryStore { conn })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS email_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                email_content TEXT NOT NULL,
                prediction INTEGER NOT NULL,
                confidence REAL NOT NULL,
                timestamp TEXT NOT NULL,
                features TEXT,
                risk_score INTEGER
            )",
            [],
        )?;
        Ok(())
    }

    /// Append one analysis record for a user. Returns the new row id.
    pub fn add_entry(
        &self,
        user_id: &str,
        email_content: &str,
        result: &AnalysisResult,
    ) -> Result<i64> {
        let features =
            serde_json::to_string(&result.reasons).context("Failed to serialize reasons")?;
        let confidence = f64::from(result.risk_score) / 100.0;
        self.conn
            .execute(
                "INSERT INTO email_history
                 (user_id, email_content, prediction, confidence, timestamp, features, risk_score)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    user_id,
                    email_content,
                    result.is_phishing,
                    confidence,
                    Utc::now().to_rfc3339(),
                    features,
                    result.risk_score,
                ],
            )
            .context("Failed to insert history entry")?;
        Ok(self.conn.last_insert_rowid())
    }

    /// All records for a user, newest first.
    pub fn user_history(&self, user_id: &str) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, email_content, prediction, confidence, timestamp, features, risk_score
             FROM email_history
             WHERE user_id = ?1
             ORDER BY timestamp DESC, id DESC",
        )?;

        let entries = stmt
            .query_map([user_id], |row| {
                let timestamp: String = row.get(5)?;
                let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(
                            5,
                            rusqlite::types::Type::Text,
                            Box::new(e),
                        )
                    })?
                    .with_timezone(&Utc);
                Ok(HistoryEntry {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    email_content: row.get(2)?,
                    prediction: row.get(3)?,
                    confidence: row.get(4)?,
                    timestamp,
                    features: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
                    risk_score: row.get::<_, Option<u32>>(7)?.unwrap_or(0),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(entries)
    }

    /// Delete every record belonging to a user. Returns the rows removed.
    pub fn clear_user(&self, user_id: &str) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM email_history WHERE user_id = ?1", [user_id])
            .context("Failed to clear history")?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use crate::detector::ScoringEngine;

    fn engine() -> ScoringEngine {
        ScoringEngine::new(ScoringConfig::default()).unwrap()
    }

    #[test]
    fn test_add_and_retrieve_entries() {
        let store = HistoryStore::open_in_memory().unwrap();
        let engine = engine();

        let phish = engine.analyze("URGENT: verify your account at http://secure-login.example");
        let clean = engine.analyze("Let's have lunch tomorrow");

        store.add_entry("alice", "phish body", &phish).unwrap();
        store.add_entry("alice", "clean body", &clean).unwrap();
        store.add_entry("bob", "other body", &clean).unwrap();

        let history = store.user_history("alice").unwrap();
        assert_eq!(history.len(), 2);
        // Newest first.
        assert_eq!(history[0].email_content, "clean body");
        assert_eq!(history[1].email_content, "phish body");

        assert!(history[1].prediction);
        assert_eq!(history[1].risk_score, phish.risk_score);
        assert!((history[1].confidence - f64::from(phish.risk_score) / 100.0).abs() < 1e-9);

        let reasons: Vec<String> = serde_json::from_str(&history[1].features).unwrap();
        assert_eq!(reasons, phish.reasons);
    }

    #[test]
    fn test_history_is_per_user() {
        let store = HistoryStore::open_in_memory().unwrap();
        let result = engine().analyze("free prize");
        store.add_entry("alice", "a", &result).unwrap();

        assert!(store.user_history("bob").unwrap().is_empty());
        assert_eq!(store.user_history("alice").unwrap().len(), 1);
    }

    #[test]
    fn test_clear_user_removes_only_that_user() {
        let store = HistoryStore::open_in_memory().unwrap();
        let result = engine().analyze("free prize");
        store.add_entry("alice", "a", &result).unwrap();
        store.add_entry("alice", "b", &result).unwrap();
        store.add_entry("bob", "c", &result).unwrap();

        let removed = store.clear_user("alice").unwrap();
        assert_eq!(removed, 2);
        assert!(store.user_history("alice").unwrap().is_empty());
        assert_eq!(store.user_history("bob").unwrap().len(), 1);
    }

    #[test]
    fn test_clear_missing_user_is_noop() {
        let store = HistoryStore::open_in_memory().unwrap();
        assert_eq!(store.clear_user("nobody").unwrap(), 0);
    }
}
