use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

const SOURCE_COLUMNS: &str =
    "ms.id, ms.name, ms.created_by, ms.source_type, ms.size_bytes, ms.external_link, ms.created_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// An in-memory database, initialised and ready for use.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;
        Ok(store)
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_source_type(s: &str) -> SourceType {
    SourceType::parse(s).unwrap_or_else(|| {
        tracing::error!("Invalid source type in database: '{}'", s);
        SourceType::File
    })
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Maps a row selected with [`SOURCE_COLUMNS`]; scopes are filled in later.
fn source_from_row(row: &Row<'_>) -> rusqlite::Result<MemorySource> {
    Ok(MemorySource {
        id: row.get(0)?,
        scope_ids: Vec::new(),
        name: row.get(1)?,
        created_by: row.get(2)?,
        source_type: parse_source_type(&row.get::<_, String>(3)?),
        size_bytes: row.get(4)?,
        external_link: row.get(5)?,
        created_at: parse_datetime(&row.get::<_, String>(6)?),
    })
}

fn load_scopes(conn: &Connection, source_id: &str) -> Result<Vec<ScopeId>> {
    let mut stmt = conn.prepare(
        "SELECT scope_id FROM memory_source_scopes WHERE source_id = ?1 ORDER BY position",
    )?;
    let rows = stmt.query_map(params![source_id], |row| row.get::<_, String>(0))?;

    let mut scopes = Vec::new();
    for raw in rows {
        let raw = raw?;
        match ScopeId::parse(&raw) {
            Some(scope) => scopes.push(scope),
            None => tracing::error!("Invalid scope id in database for source {}", source_id),
        }
    }
    Ok(scopes)
}

fn with_scopes(conn: &Connection, mut sources: Vec<MemorySource>) -> Result<Vec<MemorySource>> {
    for source in &mut sources {
        source.scope_ids = load_scopes(conn, &source.id)?;
    }
    Ok(sources)
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // Memory source operations

    fn create_memory_source(&self, source: &MemorySource) -> Result<()> {
        if source.scope_ids.is_empty() {
            return Err(Error::Validation(
                "memory source must carry at least one scope".to_string(),
            ));
        }

        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            "INSERT INTO memory_sources (id, name, created_by, source_type, size_bytes, external_link, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                source.id,
                source.name,
                source.created_by,
                source.source_type.as_str(),
                source.size_bytes,
                source.external_link,
                format_datetime(&source.created_at),
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => return Err(Error::AlreadyExists),
            Err(e) => return Err(Error::from(e)),
        }

        {
            let mut stmt = tx.prepare(
                "INSERT INTO memory_source_scopes (source_id, position, scope_id) VALUES (?1, ?2, ?3)",
            )?;
            for (position, scope) in source.scope_ids.iter().enumerate() {
                stmt.execute(params![source.id, position as i64, scope.as_str()])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn get_memory_source(&self, id: &str) -> Result<Option<MemorySource>> {
        let conn = self.conn();
        let source = conn
            .query_row(
                &format!("SELECT {SOURCE_COLUMNS} FROM memory_sources ms WHERE ms.id = ?1"),
                params![id],
                source_from_row,
            )
            .optional()?;

        match source {
            Some(mut source) => {
                source.scope_ids = load_scopes(&conn, &source.id)?;
                Ok(Some(source))
            }
            None => Ok(None),
        }
    }

    fn delete_memory_source(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM memory_sources WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn find_by_scope_ids(
        &self,
        scope_ids: &[ScopeId],
        include_global: bool,
    ) -> Result<Vec<MemorySource>> {
        let mut wanted: Vec<&str> = scope_ids.iter().map(ScopeId::as_str).collect();
        if include_global && !wanted.contains(&GLOBAL_SCOPE) {
            wanted.push(GLOBAL_SCOPE);
        }
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (1..=wanted.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {SOURCE_COLUMNS} FROM memory_sources ms
             WHERE ms.id IN (SELECT source_id FROM memory_source_scopes WHERE scope_id IN ({placeholders}))
             ORDER BY ms.created_at, ms.id"
        );

        let conn = self.conn();
        let sources = {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(wanted.iter()), source_from_row)?;
            rows.collect::<std::result::Result<Vec<_>, _>>()?
        };
        with_scopes(&conn, sources)
    }

    fn find_by_chat_id(&self, chat_id: &str) -> Result<Vec<MemorySource>> {
        let Some(scope) = ScopeId::parse(chat_id) else {
            return Ok(Vec::new());
        };
        self.find_by_scope_ids(&[scope], false)
    }

    // Chat operations

    fn create_chat(&self, chat: &Chat) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO chats (id, title, created_at) VALUES (?1, ?2, ?3)",
            params![chat.id, chat.title, format_datetime(&chat.created_at)],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::AlreadyExists),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_chat(&self, id: &str) -> Result<Option<Chat>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, title, created_at FROM chats WHERE id = ?1",
            params![id],
            |row| {
                Ok(Chat {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    // Participant operations

    fn add_participant(&self, participant: &ChatParticipant) -> Result<bool> {
        let result = self.conn().execute(
            "INSERT OR IGNORE INTO chat_participants (chat_id, user_id, joined_at)
             VALUES (?1, ?2, ?3)",
            params![
                participant.chat_id,
                participant.user_id,
                format_datetime(&participant.joined_at),
            ],
        );

        match result {
            Ok(rows) => Ok(rows > 0),
            // Foreign key failure: the chat does not exist
            Err(e) if is_constraint_violation(&e) => Err(Error::NotFound),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn is_user_in_chat(&self, user_id: &str, chat_id: &str) -> Result<bool> {
        let conn = self.conn();
        let found: Option<i32> = conn
            .query_row(
                "SELECT 1 FROM chat_participants WHERE chat_id = ?1 AND user_id = ?2",
                params![chat_id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn list_participants(&self, chat_id: &str) -> Result<Vec<ChatParticipant>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT chat_id, user_id, joined_at FROM chat_participants
             WHERE chat_id = ?1 ORDER BY joined_at, user_id",
        )?;

        let rows = stmt.query_map(params![chat_id], |row| {
            Ok(ChatParticipant {
                chat_id: row.get(0)?,
                user_id: row.get(1)?,
                joined_at: parse_datetime(&row.get::<_, String>(2)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use tempfile::TempDir;

    use super::*;

    fn source(id: &str, scopes: &[&str], offset_secs: i64) -> MemorySource {
        MemorySource {
            id: id.to_string(),
            scope_ids: scopes.iter().map(|s| ScopeId::parse(s).unwrap()).collect(),
            name: format!("{id}.txt"),
            created_by: "u1".to_string(),
            source_type: SourceType::File,
            size_bytes: 42,
            external_link: None,
            created_at: Utc::now() + Duration::seconds(offset_secs),
        }
    }

    fn chat(id: &str) -> Chat {
        Chat {
            id: id.to_string(),
            title: "Planning".to_string(),
            created_at: Utc::now(),
        }
    }

    fn participant(chat_id: &str, user_id: &str) -> ChatParticipant {
        ChatParticipant {
            chat_id: chat_id.to_string(),
            user_id: user_id.to_string(),
            joined_at: Utc::now(),
        }
    }

    #[test]
    fn test_initialize_creates_tables() {
        let temp = TempDir::new().unwrap();
        let store = SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();

        let conn = store.conn();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"chats".to_string()));
        assert!(tables.contains(&"chat_participants".to_string()));
        assert!(tables.contains(&"memory_sources".to_string()));
        assert!(tables.contains(&"memory_source_scopes".to_string()));
    }

    #[test]
    fn test_memory_source_crud_keeps_scope_order() {
        let store = SqliteStore::in_memory().unwrap();
        let src = source("s1", &["g2", GLOBAL_SCOPE, "g1"], 0);
        store.create_memory_source(&src).unwrap();

        let fetched = store.get_memory_source("s1").unwrap().unwrap();
        assert_eq!(fetched.scope_ids, src.scope_ids);
        assert_eq!(fetched.source_type, SourceType::File);
        assert_eq!(fetched.size_bytes, 42);

        let dup = store.create_memory_source(&src);
        assert!(matches!(dup, Err(Error::AlreadyExists)));

        assert!(store.delete_memory_source("s1").unwrap());
        assert!(!store.delete_memory_source("s1").unwrap());
        assert!(store.get_memory_source("s1").unwrap().is_none());
    }

    #[test]
    fn test_memory_source_requires_scopes() {
        let store = SqliteStore::in_memory().unwrap();
        let result = store.create_memory_source(&source("s1", &[], 0));
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn test_find_by_scope_ids() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .create_memory_source(&source("global", &[GLOBAL_SCOPE], 0))
            .unwrap();
        store
            .create_memory_source(&source("chat", &["chat-1", "g1"], 1))
            .unwrap();
        store
            .create_memory_source(&source("team", &["g1"], 2))
            .unwrap();
        store
            .create_memory_source(&source("other", &["g9"], 3))
            .unwrap();

        let ids = |sources: Vec<MemorySource>| -> Vec<String> {
            sources.into_iter().map(|s| s.id).collect()
        };

        let g1 = vec![ScopeId::parse("g1").unwrap()];
        assert_eq!(ids(store.find_by_scope_ids(&g1, false).unwrap()), vec!["chat", "team"]);
        assert_eq!(
            ids(store.find_by_scope_ids(&g1, true).unwrap()),
            vec!["global", "chat", "team"]
        );
        assert_eq!(ids(store.find_by_chat_id("chat-1").unwrap()), vec!["chat"]);
        assert!(store.find_by_scope_ids(&[], false).unwrap().is_empty());

        let chat = store.find_by_chat_id("chat-1").unwrap();
        assert_eq!(chat[0].scope_ids.len(), 2);
    }

    #[test]
    fn test_participants() {
        let store = SqliteStore::in_memory().unwrap();
        store.create_chat(&chat("c1")).unwrap();
        assert!(matches!(store.create_chat(&chat("c1")), Err(Error::AlreadyExists)));

        assert!(store.add_participant(&participant("c1", "u1")).unwrap());
        assert!(!store.add_participant(&participant("c1", "u1")).unwrap());
        assert!(store.add_participant(&participant("c1", "u2")).unwrap());

        assert!(store.is_user_in_chat("u1", "c1").unwrap());
        assert!(!store.is_user_in_chat("u3", "c1").unwrap());
        assert!(!store.is_user_in_chat("u1", "c2").unwrap());
        assert_eq!(store.list_participants("c1").unwrap().len(), 2);

        let missing = store.add_participant(&participant("nope", "u1"));
        assert!(matches!(missing, Err(Error::NotFound)));

        assert_eq!(store.get_chat("c1").unwrap().unwrap().title, "Planning");
        assert!(store.get_chat("c2").unwrap().is_none());
    }
}
