use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{
    Article, Digest, DigestTier, Embedding, Exclusion, FeedbackAction, FeedbackSample, Interest,
    LearnedPreference, NewArticle, NewExclusion, NewInterest, NewSource, RefType, Source,
    SourceFeedbackCounts, SourceTrust, UserArticle,
};

use super::schema::SCHEMA;

pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Source operations

    pub async fn insert_source(&self, source: NewSource) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO sources (user_id, title, url) VALUES (?1, ?2, ?3)",
                    params![source.user_id, source.title, source.url],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    pub async fn get_enabled_sources(&self, user_id: i64) -> Result<Vec<Source>> {
        let sources = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, title, url, is_enabled FROM sources WHERE user_id = ?1 AND is_enabled = 1 ORDER BY title",
                )?;
                let sources = stmt
                    .query_map(params![user_id], |row| Ok(source_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(sources)
            })
            .await?;
        Ok(sources)
    }

    // Article operations

    /// Upserts by url. RETURNING gives the existing row's id when the
    /// conflict branch fires, where last_insert_rowid would be stale.
    pub async fn insert_article(&self, article: NewArticle) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                let id = conn.query_row(
                    r#"INSERT INTO articles (source_id, title, url, content)
                       VALUES (?1, ?2, ?3, ?4)
                       ON CONFLICT(url) DO UPDATE SET
                           title = excluded.title,
                           content = excluded.content
                       RETURNING id"#,
                    params![article.source_id, article.title, article.url, article.content],
                    |row| row.get(0),
                )?;
                Ok(id)
            })
            .await?;
        Ok(id)
    }

    /// Articles from the user's enabled sources that have never been
    /// scored, plus rows cleared by a digest reset (score and reason
    /// both null). Excluded rows keep a reason and are skipped.
    pub async fn get_unscored_articles(&self, user_id: i64) -> Result<Vec<Article>> {
        let articles = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT a.id, a.source_id, a.title, a.url, a.content, a.discovered_at
                       FROM articles a
                       JOIN sources s ON a.source_id = s.id AND s.user_id = ?1 AND s.is_enabled = 1
                       LEFT JOIN user_articles ua ON ua.article_id = a.id AND ua.user_id = ?1
                       WHERE ua.id IS NULL
                          OR (ua.relevance_score IS NULL AND ua.relevance_reason IS NULL AND ua.is_archived = 0)
                       ORDER BY a.discovered_at DESC"#,
                )?;
                let articles = stmt
                    .query_map(params![user_id], |row| Ok(article_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }

    // Interest / exclusion operations

    pub async fn insert_interest(&self, interest: NewInterest) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO interests (user_id, category, description, weight) VALUES (?1, ?2, ?3, ?4)",
                    params![interest.user_id, interest.category, interest.description, interest.weight],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    pub async fn get_active_interests(&self, user_id: i64) -> Result<Vec<Interest>> {
        let interests = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, category, description, weight, is_active, created_at FROM interests WHERE user_id = ?1 AND is_active = 1 ORDER BY weight DESC, category",
                )?;
                let interests = stmt
                    .query_map(params![user_id], |row| Ok(interest_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(interests)
            })
            .await?;
        Ok(interests)
    }

    pub async fn insert_exclusion(&self, exclusion: NewExclusion) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO exclusions (user_id, category, description) VALUES (?1, ?2, ?3)",
                    params![exclusion.user_id, exclusion.category, exclusion.description],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    pub async fn get_active_exclusions(&self, user_id: i64) -> Result<Vec<Exclusion>> {
        let exclusions = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, category, description, is_active, created_at FROM exclusions WHERE user_id = ?1 AND is_active = 1 ORDER BY category",
                )?;
                let exclusions = stmt
                    .query_map(params![user_id], |row| Ok(exclusion_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(exclusions)
            })
            .await?;
        Ok(exclusions)
    }

    pub async fn count_active_exclusions(&self, user_id: i64) -> Result<usize> {
        let count = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM exclusions WHERE user_id = ?1 AND is_active = 1",
                    params![user_id],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await?;
        Ok(count as usize)
    }

    // Embedding operations

    pub async fn upsert_embedding(
        &self,
        ref_type: RefType,
        ref_id: i64,
        source_text: String,
        vector: &[f32],
    ) -> Result<()> {
        let vector_json = serde_json::to_string(vector)?;
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO embeddings (ref_type, ref_id, source_text, vector)
                       VALUES (?1, ?2, ?3, ?4)
                       ON CONFLICT(ref_type, ref_id) DO UPDATE SET
                           source_text = excluded.source_text,
                           vector = excluded.vector,
                           created_at = datetime('now')"#,
                    params![ref_type.as_str(), ref_id, source_text, vector_json],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_embedding(&self, ref_type: RefType, ref_id: i64) -> Result<Option<Embedding>> {
        let embedding = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, ref_type, ref_id, source_text, vector, created_at FROM embeddings WHERE ref_type = ?1 AND ref_id = ?2",
                )?;
                let embedding = stmt
                    .query_row(params![ref_type.as_str(), ref_id], |row| {
                        Ok(embedding_from_row(row))
                    })
                    .optional()?;
                Ok(embedding)
            })
            .await?;
        Ok(embedding)
    }

    // UserArticle operations

    pub async fn save_score(
        &self,
        user_id: i64,
        article_id: i64,
        score: f64,
        reason: String,
        is_serendipity: bool,
    ) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO user_articles (user_id, article_id, relevance_score, relevance_reason, is_serendipity, scored_at)
                       VALUES (?1, ?2, ?3, ?4, ?5, datetime('now'))
                       ON CONFLICT(user_id, article_id) DO UPDATE SET
                           relevance_score = excluded.relevance_score,
                           relevance_reason = excluded.relevance_reason,
                           is_serendipity = excluded.is_serendipity,
                           scored_at = excluded.scored_at"#,
                    params![user_id, article_id, score, reason, is_serendipity],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Records an exclusion veto: the row exists so future runs skip
    /// the article, but the score stays null and the article never
    /// becomes a digest candidate.
    pub async fn mark_excluded(&self, user_id: i64, article_id: i64, category: String) -> Result<()> {
        let reason = format!("Excluded: {}", category);
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO user_articles (user_id, article_id, relevance_score, relevance_reason)
                       VALUES (?1, ?2, NULL, ?3)
                       ON CONFLICT(user_id, article_id) DO UPDATE SET
                           relevance_score = NULL,
                           relevance_reason = excluded.relevance_reason"#,
                    params![user_id, article_id, reason],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_user_article(
        &self,
        user_id: i64,
        article_id: i64,
    ) -> Result<Option<UserArticle>> {
        let row = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE user_id = ?1 AND article_id = ?2",
                    USER_ARTICLE_SELECT
                ))?;
                let row = stmt
                    .query_row(params![user_id, article_id], |row| {
                        Ok(user_article_from_row(row))
                    })
                    .optional()?;
                Ok(row)
            })
            .await?;
        Ok(row)
    }

    pub async fn set_archived(&self, user_id: i64, article_id: i64, archived: bool) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE user_articles SET is_archived = ?1 WHERE user_id = ?2 AND article_id = ?3",
                    params![archived, user_id, article_id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Scored, unarchived rows with no digest yet, best first.
    pub async fn get_digest_candidates(&self, user_id: i64) -> Result<Vec<UserArticle>> {
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE user_id = ?1 AND relevance_score IS NOT NULL AND is_archived = 0 AND digest_id IS NULL ORDER BY relevance_score DESC",
                    USER_ARTICLE_SELECT
                ))?;
                let rows = stmt
                    .query_map(params![user_id], |row| Ok(user_article_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(rows)
    }

    pub async fn get_digest_members(&self, digest_id: i64) -> Result<Vec<UserArticle>> {
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE digest_id = ?1 ORDER BY relevance_score DESC",
                    USER_ARTICLE_SELECT
                ))?;
                let rows = stmt
                    .query_map(params![digest_id], |row| Ok(user_article_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(rows)
    }

    // Feedback operations

    pub async fn record_feedback(
        &self,
        user_id: i64,
        article_id: i64,
        action: FeedbackAction,
    ) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO feedback_events (user_id, article_id, action) VALUES (?1, ?2, ?3)",
                    params![user_id, article_id, action.as_str()],
                )?;
                conn.execute(
                    "UPDATE user_articles SET sentiment = ?1 WHERE user_id = ?2 AND article_id = ?3",
                    params![action.as_str(), user_id, article_id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn count_feedback(&self, user_id: i64) -> Result<i64> {
        let count = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM feedback_events WHERE user_id = ?1",
                    params![user_id],
                    |row| row.get(0),
                )?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }

    /// Per-source feedback tallies over a trailing window, keyed by
    /// source id. Sources with no feedback in the window are absent.
    pub async fn source_feedback_counts(
        &self,
        user_id: i64,
        window_days: u32,
    ) -> Result<HashMap<i64, SourceFeedbackCounts>> {
        let window = format!("-{} days", window_days);
        let counts = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT a.source_id,
                              SUM(CASE WHEN f.action = 'liked' THEN 1 ELSE 0 END),
                              SUM(CASE WHEN f.action = 'neutral' THEN 1 ELSE 0 END),
                              SUM(CASE WHEN f.action = 'disliked' THEN 1 ELSE 0 END)
                       FROM feedback_events f
                       JOIN articles a ON f.article_id = a.id
                       WHERE f.user_id = ?1 AND f.created_at >= datetime('now', ?2)
                       GROUP BY a.source_id"#,
                )?;
                let counts = stmt
                    .query_map(params![user_id, window], |row| {
                        Ok(SourceFeedbackCounts {
                            source_id: row.get(0)?,
                            liked: row.get(1)?,
                            neutral: row.get(2)?,
                            disliked: row.get(3)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(counts)
            })
            .await?;
        Ok(counts.into_iter().map(|c| (c.source_id, c)).collect())
    }

    pub async fn recent_feedback(&self, user_id: i64, limit: usize) -> Result<Vec<FeedbackSample>> {
        let samples = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT f.action, a.title, s.title, ua.relevance_reason
                       FROM feedback_events f
                       JOIN articles a ON f.article_id = a.id
                       JOIN sources s ON a.source_id = s.id
                       LEFT JOIN user_articles ua ON ua.article_id = f.article_id AND ua.user_id = f.user_id
                       WHERE f.user_id = ?1
                       ORDER BY f.created_at DESC, f.id DESC
                       LIMIT ?2"#,
                )?;
                let samples = stmt
                    .query_map(params![user_id, limit as i64], |row| {
                        let action: String = row.get(0)?;
                        Ok(FeedbackSample {
                            action: FeedbackAction::parse(&action)
                                .unwrap_or(FeedbackAction::Neutral),
                            article_title: row.get(1)?,
                            source_title: row.get(2)?,
                            relevance_reason: row.get(3)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(samples)
            })
            .await?;
        Ok(samples)
    }

    // Source trust operations

    pub async fn upsert_source_trust(
        &self,
        user_id: i64,
        source_id: i64,
        factor: f64,
        sample_size: i64,
    ) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO source_trust (user_id, source_id, factor, sample_size, computed_at)
                       VALUES (?1, ?2, ?3, ?4, datetime('now'))
                       ON CONFLICT(user_id, source_id) DO UPDATE SET
                           factor = excluded.factor,
                           sample_size = excluded.sample_size,
                           computed_at = excluded.computed_at"#,
                    params![user_id, source_id, factor, sample_size],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_source_trust_rows(&self, user_id: i64) -> Result<Vec<SourceTrust>> {
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, source_id, factor, sample_size, computed_at FROM source_trust WHERE user_id = ?1 ORDER BY source_id",
                )?;
                let rows = stmt
                    .query_map(params![user_id], |row| {
                        Ok(SourceTrust {
                            id: row.get(0).unwrap(),
                            user_id: row.get(1).unwrap(),
                            source_id: row.get(2).unwrap(),
                            factor: row.get(3).unwrap(),
                            sample_size: row.get(4).unwrap(),
                            computed_at: datetime_column(row, 5),
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(rows)
    }

    /// Trust factors keyed by source id. Sources without a row score
    /// at the neutral 1.0.
    pub async fn get_trust_factors(&self, user_id: i64) -> Result<HashMap<i64, f64>> {
        let factors = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT source_id, factor FROM source_trust WHERE user_id = ?1",
                )?;
                let factors = stmt
                    .query_map(params![user_id], |row| {
                        Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?))
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(factors)
            })
            .await?;
        Ok(factors.into_iter().collect())
    }

    // Digest operations

    /// Creates the digest row and stamps every member in one
    /// transaction. A member that already belongs to a digest fails
    /// the whole transaction rather than being stolen.
    pub async fn create_digest(
        &self,
        user_id: i64,
        provider: String,
        assignments: Vec<(i64, DigestTier)>,
    ) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO digests (user_id, provider, article_count) VALUES (?1, ?2, ?3)",
                    params![user_id, provider, assignments.len() as i64],
                )?;
                let digest_id = tx.last_insert_rowid();
                for (user_article_id, tier) in &assignments {
                    let changed = tx.execute(
                        "UPDATE user_articles SET digest_id = ?1, digest_tier = ?2 WHERE id = ?3 AND digest_id IS NULL",
                        params![digest_id, tier.as_str(), user_article_id],
                    )?;
                    if changed != 1 {
                        return Err(rusqlite::Error::StatementChangedRows(changed).into());
                    }
                }
                tx.commit()?;
                Ok(digest_id)
            })
            .await?;
        Ok(id)
    }

    pub async fn get_digest(&self, digest_id: i64) -> Result<Option<Digest>> {
        let digest = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, provider, article_count, generated_at FROM digests WHERE id = ?1",
                )?;
                let digest = stmt
                    .query_row(params![digest_id], |row| Ok(digest_from_row(row)))
                    .optional()?;
                Ok(digest)
            })
            .await?;
        Ok(digest)
    }

    pub async fn get_latest_digest(&self, user_id: i64) -> Result<Option<Digest>> {
        let digest = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, provider, article_count, generated_at FROM digests WHERE user_id = ?1 ORDER BY id DESC LIMIT 1",
                )?;
                let digest = stmt
                    .query_row(params![user_id], |row| Ok(digest_from_row(row)))
                    .optional()?;
                Ok(digest)
            })
            .await?;
        Ok(digest)
    }

    /// Detaches every member and deletes the digest row. Non-archived
    /// members lose their scoring state and become eligible for a
    /// fresh pass; archived members keep score and reason.
    pub async fn reset_digest(&self, digest_id: i64) -> Result<usize> {
        let detached = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let fresh = tx.execute(
                    r#"UPDATE user_articles
                       SET digest_id = NULL, digest_tier = NULL, relevance_score = NULL,
                           relevance_reason = NULL, is_serendipity = 0, scored_at = NULL
                       WHERE digest_id = ?1 AND is_archived = 0"#,
                    params![digest_id],
                )?;
                let archived = tx.execute(
                    "UPDATE user_articles SET digest_id = NULL, digest_tier = NULL WHERE digest_id = ?1 AND is_archived = 1",
                    params![digest_id],
                )?;
                tx.execute("DELETE FROM digests WHERE id = ?1", params![digest_id])?;
                tx.commit()?;
                Ok(fresh + archived)
            })
            .await?;
        Ok(detached)
    }

    // Learned preference operations

    /// Replaces the user's distilled preferences wholesale. The
    /// distillation re-reads the full recent feedback window, so merge
    /// semantics are never needed.
    pub async fn replace_learned_preferences(
        &self,
        user_id: i64,
        preferences: Vec<(String, f64, i64)>,
    ) -> Result<()> {
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "DELETE FROM learned_preferences WHERE user_id = ?1",
                    params![user_id],
                )?;
                for (statement, confidence, derived_from) in &preferences {
                    tx.execute(
                        "INSERT INTO learned_preferences (user_id, statement, confidence, derived_from) VALUES (?1, ?2, ?3, ?4)",
                        params![user_id, statement, confidence, derived_from],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_learned_preferences(&self, user_id: i64) -> Result<Vec<LearnedPreference>> {
        let preferences = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, statement, confidence, derived_from, created_at FROM learned_preferences WHERE user_id = ?1 ORDER BY confidence DESC",
                )?;
                let preferences = stmt
                    .query_map(params![user_id], |row| Ok(preference_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(preferences)
            })
            .await?;
        Ok(preferences)
    }
}

const USER_ARTICLE_SELECT: &str = "SELECT id, user_id, article_id, relevance_score, relevance_reason, is_serendipity, digest_id, digest_tier, sentiment, is_bookmarked, is_archived, scored_at FROM user_articles";

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn datetime_column(row: &Row, idx: usize) -> DateTime<Utc> {
    row.get::<_, String>(idx)
        .ok()
        .and_then(|s| parse_datetime(&s))
        .unwrap_or_else(Utc::now)
}

fn source_from_row(row: &Row) -> Source {
    Source {
        id: row.get(0).unwrap(),
        user_id: row.get(1).unwrap(),
        title: row.get(2).unwrap(),
        url: row.get(3).unwrap(),
        is_enabled: row.get::<_, i64>(4).unwrap() != 0,
    }
}

fn article_from_row(row: &Row) -> Article {
    Article {
        id: row.get(0).unwrap(),
        source_id: row.get(1).unwrap(),
        title: row.get(2).unwrap(),
        url: row.get(3).unwrap(),
        content: row.get(4).unwrap(),
        discovered_at: datetime_column(row, 5),
    }
}

fn interest_from_row(row: &Row) -> Interest {
    Interest {
        id: row.get(0).unwrap(),
        user_id: row.get(1).unwrap(),
        category: row.get(2).unwrap(),
        description: row.get(3).unwrap(),
        weight: row.get(4).unwrap(),
        is_active: row.get::<_, i64>(5).unwrap() != 0,
        created_at: datetime_column(row, 6),
    }
}

fn exclusion_from_row(row: &Row) -> Exclusion {
    Exclusion {
        id: row.get(0).unwrap(),
        user_id: row.get(1).unwrap(),
        category: row.get(2).unwrap(),
        description: row.get(3).unwrap(),
        is_active: row.get::<_, i64>(4).unwrap() != 0,
        created_at: datetime_column(row, 5),
    }
}

fn embedding_from_row(row: &Row) -> Embedding {
    let ref_type: String = row.get(1).unwrap();
    let vector_json: String = row.get(4).unwrap();
    Embedding {
        id: row.get(0).unwrap(),
        ref_type: RefType::parse(&ref_type).unwrap_or(RefType::Article),
        ref_id: row.get(2).unwrap(),
        source_text: row.get(3).unwrap(),
        vector: serde_json::from_str(&vector_json).unwrap_or_default(),
        created_at: datetime_column(row, 5),
    }
}

fn user_article_from_row(row: &Row) -> UserArticle {
    UserArticle {
        id: row.get(0).unwrap(),
        user_id: row.get(1).unwrap(),
        article_id: row.get(2).unwrap(),
        relevance_score: row.get(3).unwrap(),
        relevance_reason: row.get(4).unwrap(),
        is_serendipity: row.get::<_, i64>(5).unwrap() != 0,
        digest_id: row.get(6).unwrap(),
        digest_tier: row
            .get::<_, Option<String>>(7)
            .unwrap()
            .and_then(|s| DigestTier::parse(&s)),
        sentiment: row
            .get::<_, Option<String>>(8)
            .unwrap()
            .and_then(|s| FeedbackAction::parse(&s)),
        is_bookmarked: row.get::<_, i64>(9).unwrap() != 0,
        is_archived: row.get::<_, i64>(10).unwrap() != 0,
        scored_at: row
            .get::<_, Option<String>>(11)
            .unwrap()
            .and_then(|s| parse_datetime(&s)),
    }
}

fn digest_from_row(row: &Row) -> Digest {
    Digest {
        id: row.get(0).unwrap(),
        user_id: row.get(1).unwrap(),
        provider: row.get(2).unwrap(),
        article_count: row.get(3).unwrap(),
        generated_at: datetime_column(row, 4),
    }
}

fn preference_from_row(row: &Row) -> LearnedPreference {
    LearnedPreference {
        id: row.get(0).unwrap(),
        user_id: row.get(1).unwrap(),
        statement: row.get(2).unwrap(),
        confidence: row.get(3).unwrap(),
        derived_from: row.get(4).unwrap(),
        created_at: datetime_column(row, 5),
    }
}
