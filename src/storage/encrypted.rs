//! SQLite-backed audit store. The sanitized event snapshot is AES-GCM encrypted at rest
//! when a secret is supplied; decision columns stay queryable in plaintext.

use super::{AuditRecord, AuditSink};
use crate::error::AuditError;
use crate::event::SanitizedEvent;
use crate::response::ActionOutcome;
use crate::risk::{RiskAssessment, RiskBand};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use rand::RngCore;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS audit (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        recorded_at TEXT NOT NULL,
        session_id TEXT NOT NULL,
        event TEXT NOT NULL,
        encrypted INTEGER NOT NULL,
        risk INTEGER NOT NULL,
        band TEXT NOT NULL,
        reasons TEXT NOT NULL,
        verified INTEGER NOT NULL,
        blocked INTEGER NOT NULL,
        credentials_rotated INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_audit_recorded_at ON audit(recorded_at);
    CREATE INDEX IF NOT EXISTS idx_audit_session ON audit(session_id);
"#;

const SELECT_COLUMNS: &str = "SELECT id, recorded_at, event, encrypted, risk, band, reasons, \
     verified, blocked, credentials_rotated FROM audit";

fn derive_key(seed: &[u8]) -> [u8; KEY_LEN] {
    use ring::digest;
    let mut out = [0u8; KEY_LEN];
    let h = digest::digest(&digest::SHA256, seed);
    out[..h.as_ref().len().min(KEY_LEN)].copy_from_slice(h.as_ref());
    out
}

fn encrypt(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<String, AuditError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| AuditError::Encrypt)?;
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);
    let ciphertext = cipher
        .encrypt((&nonce).into(), plaintext)
        .map_err(|_| AuditError::Encrypt)?;
    let mut out = nonce.to_vec();
    out.extend(ciphertext);
    Ok(BASE64.encode(&out))
}

fn decrypt(key: &[u8; KEY_LEN], encoded: &str) -> Result<Vec<u8>, AuditError> {
    let raw = BASE64
        .decode(encoded)
        .map_err(|e| AuditError::Decrypt(e.to_string()))?;
    if raw.len() < NONCE_LEN {
        return Err(AuditError::Decrypt("payload too short".into()));
    }
    let (nonce, ct) = raw.split_at(NONCE_LEN);
    let cipher =
        Aes256Gcm::new_from_slice(key).map_err(|e| AuditError::Decrypt(format!("{:?}", e)))?;
    cipher
        .decrypt(nonce.into(), ct)
        .map_err(|_| AuditError::Decrypt("authentication failed".into()))
}

fn parse_band(s: &str) -> Result<RiskBand, AuditError> {
    match s {
        "low" => Ok(RiskBand::Low),
        "medium" => Ok(RiskBand::Medium),
        "high" => Ok(RiskBand::High),
        other => Err(AuditError::Corrupt(format!("unknown band {other}"))),
    }
}

/// Audit row as read back; `outcome.blocked` reflects later manual releases.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredAudit {
    pub id: i64,
    pub record: AuditRecord,
}

struct AuditRow {
    id: i64,
    recorded_at: String,
    event: String,
    encrypted: bool,
    risk: u8,
    band: String,
    reasons: String,
    verified: bool,
    blocked: bool,
    credentials_rotated: bool,
}

impl AuditRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            recorded_at: row.get(1)?,
            event: row.get(2)?,
            encrypted: row.get(3)?,
            risk: row.get(4)?,
            band: row.get(5)?,
            reasons: row.get(6)?,
            verified: row.get(7)?,
            blocked: row.get(8)?,
            credentials_rotated: row.get(9)?,
        })
    }
}

pub struct SqliteAuditStore {
    conn: Mutex<Connection>,
    key: Option<[u8; KEY_LEN]>,
}

impl SqliteAuditStore {
    /// Open or create the audit DB at path. With a secret, event snapshots are encrypted.
    pub fn open(path: &Path, secret: Option<&[u8]>) -> Result<Self, AuditError> {
        let store = Self::init(Connection::open(path)?, secret)?;
        info!(path = %path.display(), encrypted = store.key.is_some(), "audit store opened");
        Ok(store)
    }

    pub fn open_in_memory(secret: Option<&[u8]>) -> Result<Self, AuditError> {
        Self::init(Connection::open_in_memory()?, secret)
    }

    fn init(conn: Connection, secret: Option<&[u8]>) -> Result<Self, AuditError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
            key: secret.map(derive_key),
        })
    }

    /// Read one record by id (decrypting the event snapshot).
    pub fn get_record(&self, id: i64) -> Result<Option<StoredAudit>, AuditError> {
        let row = {
            let conn = self.conn.lock().map_err(|_| AuditError::Poisoned)?;
            let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))?;
            let mut rows = stmt.query(params![id])?;
            let row = match rows.next()? {
                Some(row) => AuditRow::from_row(row)?,
                None => return Ok(None),
            };
            row
        };
        self.decode(row).map(Some)
    }

    /// Most recent records, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<StoredAudit>, AuditError> {
        let rows = {
            let conn = self.conn.lock().map_err(|_| AuditError::Poisoned)?;
            let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY id DESC LIMIT ?1"))?;
            let limit = i64::try_from(limit).unwrap_or(i64::MAX);
            let rows = stmt
                .query_map(params![limit], AuditRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };
        rows.into_iter().map(|r| self.decode(r)).collect()
    }

    /// Manual release by an administrator. Returns whether a blocked row was released.
    pub fn release_block(&self, id: i64) -> Result<bool, AuditError> {
        let conn = self.conn.lock().map_err(|_| AuditError::Poisoned)?;
        let n = conn.execute(
            "UPDATE audit SET blocked = 0 WHERE id = ?1 AND blocked = 1",
            params![id],
        )?;
        if n > 0 {
            info!(id, "audit block released");
        }
        Ok(n > 0)
    }

    fn decode(&self, row: AuditRow) -> Result<StoredAudit, AuditError> {
        let event_json = if row.encrypted {
            let key = self
                .key
                .as_ref()
                .ok_or_else(|| AuditError::Decrypt("store opened without a secret".into()))?;
            let plain = decrypt(key, &row.event)?;
            String::from_utf8(plain).map_err(|e| AuditError::Corrupt(e.to_string()))?
        } else {
            row.event
        };
        let event: SanitizedEvent = serde_json::from_str(&event_json)?;
        let reasons: Vec<String> = serde_json::from_str(&row.reasons)?;
        let recorded_at = DateTime::parse_from_rfc3339(&row.recorded_at)
            .map_err(|e| AuditError::Corrupt(e.to_string()))?
            .with_timezone(&Utc);

        Ok(StoredAudit {
            id: row.id,
            record: AuditRecord {
                event,
                assessment: RiskAssessment {
                    risk: row.risk,
                    band: parse_band(&row.band)?,
                },
                reasons,
                outcome: ActionOutcome {
                    verified: row.verified,
                    blocked: row.blocked,
                    credentials_rotated: row.credentials_rotated,
                },
                recorded_at,
            },
        })
    }
}

impl AuditSink for SqliteAuditStore {
    fn persist(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let event_json = serde_json::to_string(&record.event)?;
        let (event, encrypted) = match &self.key {
            Some(key) => (encrypt(key, event_json.as_bytes())?, true),
            None => (event_json, false),
        };
        let reasons = serde_json::to_string(&record.reasons)?;

        self.conn.lock().map_err(|_| AuditError::Poisoned)?.execute(
            "INSERT INTO audit (recorded_at, session_id, event, encrypted, risk, band, reasons, \
             verified, blocked, credentials_rotated) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.recorded_at.to_rfc3339(),
                record.event.session_id,
                event,
                encrypted,
                record.assessment.risk,
                record.assessment.band.as_str(),
                reasons,
                record.outcome.verified,
                record.outcome.blocked,
                record.outcome.credentials_rotated,
            ],
        )?;
        Ok(())
    }
}
