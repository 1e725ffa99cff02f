pub const SCHEMA: &str = r#"
-- Chats own a participant roster; chat ids double as scope ids
CREATE TABLE IF NOT EXISTS chats (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS chat_participants (
    chat_id TEXT NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL,
    joined_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (chat_id, user_id)
);

-- Imported documents and links; scopes are written once at import time
CREATE TABLE IF NOT EXISTS memory_sources (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    created_by TEXT NOT NULL,
    source_type TEXT NOT NULL CHECK (source_type IN ('file', 'web')),
    size_bytes INTEGER NOT NULL DEFAULT 0,
    external_link TEXT,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Ordered scope list per memory source
CREATE TABLE IF NOT EXISTS memory_source_scopes (
    source_id TEXT NOT NULL REFERENCES memory_sources(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    scope_id TEXT NOT NULL,
    PRIMARY KEY (source_id, position)
);

CREATE INDEX IF NOT EXISTS idx_chat_participants_user ON chat_participants(user_id);
CREATE INDEX IF NOT EXISTS idx_memory_source_scopes_scope ON memory_source_scopes(scope_id);
CREATE INDEX IF NOT EXISTS idx_memory_sources_created_by ON memory_sources(created_by);
"#;
