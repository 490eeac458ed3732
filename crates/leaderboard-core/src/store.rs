//! Persistent storage for groups, members and the message ledger.
//!
//! # Table design
//!
//! Three redb tables, each keyed by a UTF-8 string and holding a JSON value:
//!
//! ```text
//! groups    "<group_id>"                      → TrackedGroup
//! members   "<group_id>\x1f<account_key>"     → Member
//! messages  "<group_id>\x1f<activity_key>"    → PostedMessage
//! ```
//!
//! The unit-separator byte sorts below every printable character, so a range
//! scan starting at `"<group_id>\x1f"` visits exactly that group's rows
//! before any other group's.
//!
//! # Sharing the file
//!
//! redb takes an exclusive lock for as long as a `Database` is open. The
//! store opens the file for each operation and closes it straight after, so
//! a serving scheduler and one-off CLI commands can use the same file. An
//! open that finds the lock taken is retried with a short backoff before
//! giving up.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use redb::{Database, DatabaseError, TableDefinition};
use serde::de::DeserializeOwned;

use crate::error::{store_err, Result};
use crate::model::{Member, PostedMessage, TrackedGroup};

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// CRUD surface the pipeline depends on. Implementations must be safe to
/// share across tasks.
pub trait Store: Send + Sync {
    fn put_group(&self, group: &TrackedGroup) -> Result<()>;
    fn group(&self, id: &str) -> Result<Option<TrackedGroup>>;
    fn groups(&self) -> Result<Vec<TrackedGroup>>;

    /// Insert or replace, keyed by `(group_id, account_key)`.
    fn put_member(&self, member: &Member) -> Result<()>;
    fn remove_member(&self, group_id: &str, account_key: &str) -> Result<Option<Member>>;
    fn members(&self, group_id: &str) -> Result<Vec<Member>>;

    fn posted_message(&self, group_id: &str, activity: &str) -> Result<Option<PostedMessage>>;
    /// Insert or replace, keyed by `(group_id, activity)`.
    fn put_posted_message(&self, message: &PostedMessage) -> Result<()>;
    fn remove_posted_message(&self, group_id: &str, activity: &str) -> Result<bool>;
    /// All ledger rows for a group, ordered by position.
    fn posted_messages(&self, group_id: &str) -> Result<Vec<PostedMessage>>;
}

// ---------------------------------------------------------------------------
// Table definitions and key helpers
// ---------------------------------------------------------------------------

/// Key: composite string (see module docs). Value: JSON-encoded row.
type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;

const GROUPS: JsonTable = TableDefinition::new("groups");
const MEMBERS: JsonTable = TableDefinition::new("members");
const MESSAGES: JsonTable = TableDefinition::new("messages");

const SEP: char = '\u{1f}';

fn group_prefix(group_id: &str) -> String {
    format!("{group_id}{SEP}")
}

fn member_key(group_id: &str, account_key: &str) -> String {
    format!("{group_id}{SEP}{account_key}")
}

/// Activity names match case-insensitively everywhere, so the ledger key
/// is folded the same way.
fn message_key(group_id: &str, activity: &str) -> String {
    format!("{group_id}{SEP}{}", activity.trim().to_lowercase())
}

// ---------------------------------------------------------------------------
// RedbStore
// ---------------------------------------------------------------------------

const OPEN_ATTEMPTS: u32 = 100;
const OPEN_BACKOFF: Duration = Duration::from_millis(50);

/// [`Store`] backed by a single redb file.
pub struct RedbStore {
    path: PathBuf,
    /// Serializes this handle's own operations so they never race each
    /// other for the file lock.
    local: Mutex<()>,
}

/// An open database plus the handle-local guard that allowed opening it.
struct Session<'a> {
    db: Database,
    _local: MutexGuard<'a, ()>,
}

impl RedbStore {
    /// Open or create the database at `path`, creating all tables.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let store = Self {
            path: path.to_path_buf(),
            local: Mutex::new(()),
        };
        {
            let session = store.session()?;
            let wt = session.db.begin_write().map_err(store_err)?;
            wt.open_table(GROUPS).map_err(store_err)?;
            wt.open_table(MEMBERS).map_err(store_err)?;
            wt.open_table(MESSAGES).map_err(store_err)?;
            wt.commit().map_err(store_err)?;
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the file for one operation, waiting while another handle or
    /// process holds it.
    fn session(&self) -> Result<Session<'_>> {
        let local = self.local.lock().unwrap_or_else(|e| e.into_inner());
        let mut attempt = 1;
        loop {
            match Database::create(&self.path) {
                Ok(db) => return Ok(Session { db, _local: local }),
                Err(DatabaseError::DatabaseAlreadyOpen) if attempt < OPEN_ATTEMPTS => {
                    if attempt == 1 {
                        tracing::debug!(path = %self.path.display(), "database busy, waiting");
                    }
                    attempt += 1;
                    std::thread::sleep(OPEN_BACKOFF);
                }
                Err(e) => return Err(store_err(e)),
            }
        }
    }

    fn put(&self, table: JsonTable, key: &str, value: &[u8]) -> Result<()> {
        let session = self.session()?;
        let wt = session.db.begin_write().map_err(store_err)?;
        {
            let mut t = wt.open_table(table).map_err(store_err)?;
            t.insert(key, value).map_err(store_err)?;
        }
        wt.commit().map_err(store_err)?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, table: JsonTable, key: &str) -> Result<Option<T>> {
        let session = self.session()?;
        let rt = session.db.begin_read().map_err(store_err)?;
        let t = rt.open_table(table).map_err(store_err)?;
        match t.get(key).map_err(store_err)? {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }

    fn remove<T: DeserializeOwned>(&self, table: JsonTable, key: &str) -> Result<Option<T>> {
        let session = self.session()?;
        let wt = session.db.begin_write().map_err(store_err)?;
        let removed = {
            let mut t = wt.open_table(table).map_err(store_err)?;
            let old = t.remove(key).map_err(store_err)?;
            match old {
                Some(v) => Some(serde_json::from_slice::<T>(v.value())?),
                None => None,
            }
        };
        wt.commit().map_err(store_err)?;
        Ok(removed)
    }

    /// Every value whose key starts with `prefix`, in key order.
    fn scan_prefix<T: DeserializeOwned>(&self, table: JsonTable, prefix: &str) -> Result<Vec<T>> {
        let session = self.session()?;
        let rt = session.db.begin_read().map_err(store_err)?;
        let t = rt.open_table(table).map_err(store_err)?;
        let mut out = Vec::new();
        for entry in t.range(prefix..).map_err(store_err)? {
            let (k, v) = entry.map_err(store_err)?;
            if !k.value().starts_with(prefix) {
                break;
            }
            out.push(serde_json::from_slice(v.value())?);
        }
        Ok(out)
    }
}

impl Store for RedbStore {
    fn put_group(&self, group: &TrackedGroup) -> Result<()> {
        let value = serde_json::to_vec(group)?;
        self.put(GROUPS, &group.id, &value)
    }

    fn group(&self, id: &str) -> Result<Option<TrackedGroup>> {
        self.get(GROUPS, id)
    }

    fn groups(&self) -> Result<Vec<TrackedGroup>> {
        self.scan_prefix(GROUPS, "")
    }

    fn put_member(&self, member: &Member) -> Result<()> {
        let value = serde_json::to_vec(member)?;
        self.put(
            MEMBERS,
            &member_key(&member.group_id, &member.account_key),
            &value,
        )
    }

    fn remove_member(&self, group_id: &str, account_key: &str) -> Result<Option<Member>> {
        self.remove(MEMBERS, &member_key(group_id, account_key))
    }

    fn members(&self, group_id: &str) -> Result<Vec<Member>> {
        self.scan_prefix(MEMBERS, &group_prefix(group_id))
    }

    fn posted_message(&self, group_id: &str, activity: &str) -> Result<Option<PostedMessage>> {
        self.get(MESSAGES, &message_key(group_id, activity))
    }

    fn put_posted_message(&self, message: &PostedMessage) -> Result<()> {
        let value = serde_json::to_vec(message)?;
        self.put(
            MESSAGES,
            &message_key(&message.group_id, &message.activity),
            &value,
        )
    }

    fn remove_posted_message(&self, group_id: &str, activity: &str) -> Result<bool> {
        Ok(self
            .remove::<PostedMessage>(MESSAGES, &message_key(group_id, activity))?
            .is_some())
    }

    fn posted_messages(&self, group_id: &str) -> Result<Vec<PostedMessage>> {
        let mut rows: Vec<PostedMessage> = self.scan_prefix(MESSAGES, &group_prefix(group_id))?;
        rows.sort_by_key(|m| m.position);
        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
