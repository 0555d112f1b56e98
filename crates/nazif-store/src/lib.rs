// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use nazif_app::{DraftPayload, QuoteDraft, QuoteId};
use rusqlite::{Connection, OptionalExtension, params};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::warn;

pub const APP_NAME: &str = "nazif";

const DRAFT_SLOT: &str = "draft";
const EDIT_ID_SLOT: &str = "edit_id";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS draft_slots (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
";

/// Single-slot persistence for the in-progress quote. There is exactly one
/// draft and at most one edit marker; saving overwrites without prompting.
pub struct DraftStore {
    conn: Connection,
}

impl DraftStore {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_store_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open draft store at {}", path.display()))?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory draft store")?;
        configure_connection(&conn)?;
        Ok(Self { conn })
    }

    pub fn raw_connection(&self) -> &Connection {
        &self.conn
    }

    pub fn bootstrap(&self) -> Result<()> {
        self.conn
            .execute_batch(SCHEMA)
            .context("create draft store schema")
    }

    /// Overwrites the draft slot. Local saves are unconditional; drafts are
    /// persisted even when they would not pass archive validation.
    pub fn save_draft(&self, draft: &QuoteDraft) -> Result<()> {
        let payload = draft.to_payload();
        let encoded = serde_json::to_string(&payload).context("encode draft payload")?;
        self.put_slot(DRAFT_SLOT, &encoded)
    }

    /// Best-effort variant for autosave paths where a failed write must not
    /// interrupt editing.
    pub fn save_draft_best_effort(&self, draft: &QuoteDraft) {
        if let Err(error) = self.save_draft(draft) {
            warn!(%error, "draft autosave failed");
        }
    }

    /// Loads the saved draft, if any. A slot written with an unknown payload
    /// version is ignored rather than half-parsed.
    pub fn load_draft(&self) -> Result<Option<QuoteDraft>> {
        let Some(encoded) = self.get_slot(DRAFT_SLOT)? else {
            return Ok(None);
        };
        let payload: DraftPayload =
            serde_json::from_str(&encoded).context("decode draft payload")?;
        if !payload.is_current_version() {
            warn!(version = payload.version, "ignoring draft with unknown payload version");
            return Ok(None);
        }
        Ok(Some(QuoteDraft::from_payload(&payload)))
    }

    pub fn clear_draft(&self) -> Result<()> {
        self.delete_slot(DRAFT_SLOT)
    }

    pub fn save_edit_id(&self, id: QuoteId) -> Result<()> {
        self.put_slot(EDIT_ID_SLOT, &id.get().to_string())
    }

    pub fn load_edit_id(&self) -> Result<Option<QuoteId>> {
        let Some(raw) = self.get_slot(EDIT_ID_SLOT)? else {
            return Ok(None);
        };
        let value: i64 = raw
            .trim()
            .parse()
            .with_context(|| format!("edit marker {raw:?} is not an id"))?;
        Ok(Some(QuoteId::new(value)))
    }

    pub fn clear_edit_id(&self) -> Result<()> {
        self.delete_slot(EDIT_ID_SLOT)
    }

    fn put_slot(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO draft_slots (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (key) DO UPDATE SET value = ?2, updated_at = ?3",
                params![key, value, now_rfc3339()?],
            )
            .with_context(|| format!("write slot {key}"))?;
        Ok(())
    }

    fn get_slot(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM draft_slots WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("read slot {key}"))
    }

    fn delete_slot(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM draft_slots WHERE key = ?1", params![key])
            .with_context(|| format!("clear slot {key}"))?;
        Ok(())
    }
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

pub fn default_store_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("NAZIF_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set NAZIF_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("nazif.db"))
}

pub fn validate_store_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "database path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}
