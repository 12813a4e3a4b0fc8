pub const SCHEMA: &str = r#"
-- sources table
CREATE TABLE IF NOT EXISTS sources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    title TEXT NOT NULL,
    url TEXT NOT NULL,
    is_enabled INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(user_id, url)
);

CREATE INDEX IF NOT EXISTS idx_sources_user_id ON sources(user_id);

-- articles table (ingested once, shared across users)
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id INTEGER NOT NULL REFERENCES sources(id) ON DELETE CASCADE,
    title TEXT NOT NULL,
    url TEXT NOT NULL UNIQUE,
    content TEXT,
    discovered_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_articles_source_id ON articles(source_id);

-- interests table
CREATE TABLE IF NOT EXISTS interests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    category TEXT NOT NULL,
    description TEXT,
    weight REAL NOT NULL DEFAULT 1.0,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(user_id, category)
);

CREATE INDEX IF NOT EXISTS idx_interests_user_id ON interests(user_id);

-- exclusions table
CREATE TABLE IF NOT EXISTS exclusions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    category TEXT NOT NULL,
    description TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(user_id, category)
);

CREATE INDEX IF NOT EXISTS idx_exclusions_user_id ON exclusions(user_id);

-- embeddings table (at most one row per (ref_type, ref_id))
CREATE TABLE IF NOT EXISTS embeddings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    ref_type TEXT NOT NULL CHECK (ref_type IN ('interest', 'exclusion', 'article')),
    ref_id INTEGER NOT NULL,
    source_text TEXT NOT NULL,
    vector TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(ref_type, ref_id)
);

-- user_articles table (per-user relevance state)
CREATE TABLE IF NOT EXISTS user_articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    article_id INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
    relevance_score REAL,
    relevance_reason TEXT,
    is_serendipity INTEGER NOT NULL DEFAULT 0,
    digest_id INTEGER REFERENCES digests(id),
    digest_tier TEXT CHECK (digest_tier IN ('recommended', 'serendipity', 'bonus')),
    sentiment TEXT CHECK (sentiment IN ('liked', 'neutral', 'disliked')),
    is_bookmarked INTEGER NOT NULL DEFAULT 0,
    is_archived INTEGER NOT NULL DEFAULT 0,
    scored_at TEXT,
    UNIQUE(user_id, article_id)
);

CREATE INDEX IF NOT EXISTS idx_user_articles_user_id ON user_articles(user_id);
CREATE INDEX IF NOT EXISTS idx_user_articles_digest_id ON user_articles(digest_id);

-- feedback_events table
CREATE TABLE IF NOT EXISTS feedback_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    article_id INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
    action TEXT NOT NULL CHECK (action IN ('liked', 'neutral', 'disliked')),
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_feedback_events_user_id ON feedback_events(user_id, created_at DESC);

-- source_trust table
CREATE TABLE IF NOT EXISTS source_trust (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    source_id INTEGER NOT NULL REFERENCES sources(id) ON DELETE CASCADE,
    factor REAL NOT NULL DEFAULT 1.0,
    sample_size INTEGER NOT NULL DEFAULT 0,
    computed_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(user_id, source_id)
);

-- digests table
CREATE TABLE IF NOT EXISTS digests (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    provider TEXT NOT NULL,
    article_count INTEGER NOT NULL,
    generated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_digests_user_id ON digests(user_id);

-- learned_preferences table
CREATE TABLE IF NOT EXISTS learned_preferences (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    statement TEXT NOT NULL,
    confidence REAL NOT NULL,
    derived_from INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_learned_preferences_user_id ON learned_preferences(user_id);
"#;
