//! # Postgres store
//!
//! Maps the relational schema in `migrations/` onto the domain models.
//! Multi-row writes (idea + relations, vote + counter, cascading delete)
//! each run inside one transaction.

mod query;

use std::collections::HashMap;

use async_trait::async_trait;
use domains::{
    DomainError, Idea, IdeaId, IdeaPage, IdeaStatus, IdeaQuery, IdeaRelations, IdeaRepository,
    ProfileRepository, ReconcileOutcome, Report, ReportRepository, Result, Tag, TagId,
    TagRepository, TechStackId, TechStackItem, TechStackRepository, UserId, UserProfile, Vote,
    VoteAction, VoteOutcome, VoteRepository,
};
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, info};

use query::{count_query, listing_query, IDEA_COLUMNS};

/// Serialization failures, deadlocks and lock timeouts are worth retrying.
const TRANSIENT_CODES: [&str; 3] = ["40001", "40P01", "55P03"];

pub(crate) fn db_error(e: sqlx::Error) -> DomainError {
    match &e {
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some(code) if TRANSIENT_CODES.contains(&code) => DomainError::TransientStore(e.to_string()),
            Some("23505") | Some("23503") => DomainError::Conflict(db.message().to_string()),
            _ => DomainError::Internal(e.to_string()),
        },
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            DomainError::TransientStore(e.to_string())
        }
        _ => DomainError::Internal(e.to_string()),
    }
}

fn corrupt(column: &str, value: impl std::fmt::Display) -> DomainError {
    DomainError::Internal(format!("unexpected {column} '{value}' in stored row"))
}

fn idea_from_row(row: &PgRow) -> Result<Idea> {
    let difficulty: String = row.try_get("difficulty").map_err(db_error)?;
    let status: String = row.try_get("status").map_err(db_error)?;
    let upvotes: i32 = row.try_get("upvotes").map_err(db_error)?;
    Ok(Idea {
        id: row.try_get("id").map_err(db_error)?,
        title: row.try_get("title").map_err(db_error)?,
        short_description: row.try_get("short_description").map_err(db_error)?,
        full_description: row.try_get("full_description").map_err(db_error)?,
        difficulty: difficulty.parse().map_err(|_| corrupt("difficulty", &difficulty))?,
        upvotes: u32::try_from(upvotes).map_err(|_| corrupt("upvotes", upvotes))?,
        status: status.parse().map_err(|_| corrupt("status", &status))?,
        user_id: row.try_get("user_id").map_err(db_error)?,
        created_at: row.try_get("created_at").map_err(db_error)?,
        updated_at: row.try_get("updated_at").map_err(db_error)?,
    })
}

fn profile_from_row(row: &PgRow) -> Result<UserProfile> {
    Ok(UserProfile {
        id: row.try_get("id").map_err(db_error)?,
        full_name: row.try_get("full_name").map_err(db_error)?,
        avatar_url: row.try_get("avatar_url").map_err(db_error)?,
        created_at: row.try_get("created_at").map_err(db_error)?,
        updated_at: row.try_get("updated_at").map_err(db_error)?,
    })
}

fn counter(value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| corrupt("vote count", value))
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(db_error)?;
        info!(max_connections, "connected to postgres");
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DomainError::Internal(format!("migration failed: {e}")))?;
        info!("database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs an idea select whose only parameter is `$1 = id`.
    async fn fetch_ideas(&self, sql: &str, id: uuid::Uuid) -> Result<Vec<Idea>> {
        sqlx::query(sql)
            .bind(id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .iter()
            .map(idea_from_row)
            .collect()
    }
}

async fn write_relations(conn: &mut PgConnection, id: IdeaId, relations: IdeaRelations) -> Result<()> {
    if !relations.tag_ids.is_empty() {
        sqlx::query("INSERT INTO idea_tags (idea_id, tag_id) SELECT $1, UNNEST($2::bigint[]) ON CONFLICT DO NOTHING")
            .bind(id)
            .bind(relations.tag_ids)
            .execute(&mut *conn)
            .await
            .map_err(db_error)?;
    }
    if !relations.tech_stack_ids.is_empty() {
        sqlx::query(
            "INSERT INTO idea_tech_stacks (idea_id, tech_stack_id) SELECT $1, UNNEST($2::bigint[]) ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(relations.tech_stack_ids)
        .execute(&mut *conn)
        .await
        .map_err(db_error)?;
    }
    Ok(())
}

#[async_trait]
impl IdeaRepository for PgStore {
    async fn query_ideas(&self, query: &IdeaQuery) -> Result<IdeaPage> {
        let rows = listing_query(query)
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        let total_count = match rows.first() {
            Some(row) => row.try_get::<i64, _>("total_count").map_err(db_error)?,
            None if query.offset == 0 => 0,
            None => count_query(query)
                .build_query_scalar::<i64>()
                .fetch_one(&self.pool)
                .await
                .map_err(db_error)?,
        };
        Ok(IdeaPage {
            rows: rows.iter().map(idea_from_row).collect::<Result<_>>()?,
            total_count: u64::try_from(total_count).unwrap_or(0),
        })
    }

    async fn find_idea(&self, id: IdeaId) -> Result<Option<Idea>> {
        let sql = format!("SELECT {IDEA_COLUMNS} FROM ideas i WHERE i.id = $1");
        Ok(self.fetch_ideas(&sql, id).await?.into_iter().next())
    }

    async fn find_ideas(&self, ids: &[IdeaId]) -> Result<Vec<Idea>> {
        let sql = format!(
            "SELECT {IDEA_COLUMNS} FROM ideas i WHERE i.id = ANY($1) ORDER BY i.created_at DESC, i.id ASC"
        );
        sqlx::query(&sql)
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .iter()
            .map(idea_from_row)
            .collect()
    }

    async fn ideas_by_author(&self, user_id: UserId) -> Result<Vec<Idea>> {
        let sql = format!(
            "SELECT {IDEA_COLUMNS} FROM ideas i WHERE i.user_id = $1 ORDER BY i.created_at DESC, i.id ASC"
        );
        self.fetch_ideas(&sql, user_id).await
    }

    async fn related_ideas(&self, id: IdeaId, limit: u32) -> Result<Vec<Idea>> {
        let sql = format!(
            "SELECT {IDEA_COLUMNS} FROM ideas i \
             WHERE i.status = 'published' AND i.id <> $1 AND ( \
               EXISTS (SELECT 1 FROM idea_tags a JOIN idea_tags b ON a.tag_id = b.tag_id \
                       WHERE a.idea_id = $1 AND b.idea_id = i.id) \
               OR EXISTS (SELECT 1 FROM idea_tech_stacks a JOIN idea_tech_stacks b ON a.tech_stack_id = b.tech_stack_id \
                          WHERE a.idea_id = $1 AND b.idea_id = i.id)) \
             ORDER BY i.upvotes DESC, i.id ASC LIMIT $2"
        );
        sqlx::query(&sql)
            .bind(id)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?
            .iter()
            .map(idea_from_row)
            .collect()
    }

    async fn all_idea_ids(&self) -> Result<Vec<IdeaId>> {
        sqlx::query_scalar("SELECT id FROM ideas ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn count_ideas(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ideas")
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn insert_idea(&self, idea: Idea, relations: IdeaRelations) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // 1. Idea row
        sqlx::query(
            "INSERT INTO ideas (id, title, short_description, full_description, difficulty, upvotes, status, user_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(idea.id)
        .bind(&idea.title)
        .bind(&idea.short_description)
        .bind(&idea.full_description)
        .bind(idea.difficulty.as_str())
        .bind(i32::try_from(idea.upvotes).map_err(|_| corrupt("upvotes", idea.upvotes))?)
        .bind(idea.status.as_str())
        .bind(idea.user_id)
        .bind(idea.created_at)
        .bind(idea.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;

        // 2. Relations
        write_relations(&mut tx, idea.id, relations).await?;

        tx.commit().await.map_err(db_error)?;
        debug!(idea_id = %idea.id, "idea inserted");
        Ok(())
    }

    async fn replace_idea(&self, idea: Idea, relations: IdeaRelations) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        let updated = sqlx::query(
            "UPDATE ideas SET title = $2, short_description = $3, full_description = $4, \
             difficulty = $5, status = $6, updated_at = $7 WHERE id = $1",
        )
        .bind(idea.id)
        .bind(&idea.title)
        .bind(&idea.short_description)
        .bind(&idea.full_description)
        .bind(idea.difficulty.as_str())
        .bind(idea.status.as_str())
        .bind(idea.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?;
        if updated.rows_affected() == 0 {
            return Err(DomainError::not_found("Idea", idea.id));
        }

        for sql in [
            "DELETE FROM idea_tags WHERE idea_id = $1",
            "DELETE FROM idea_tech_stacks WHERE idea_id = $1",
        ] {
            sqlx::query(sql)
                .bind(idea.id)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
        }
        write_relations(&mut tx, idea.id, relations).await?;

        tx.commit().await.map_err(db_error)
    }

    async fn delete_idea(&self, id: IdeaId) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        for sql in [
            "DELETE FROM votes WHERE idea_id = $1",
            "DELETE FROM idea_tags WHERE idea_id = $1",
            "DELETE FROM idea_tech_stacks WHERE idea_id = $1",
            "DELETE FROM reports WHERE idea_id = $1",
        ] {
            sqlx::query(sql)
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
        }
        let deleted = sqlx::query("DELETE FROM ideas WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?
            .rows_affected();
        tx.commit().await.map_err(db_error)?;
        Ok(deleted > 0)
    }
}

#[async_trait]
impl TagRepository for PgStore {
    async fn list_tags(&self) -> Result<Vec<Tag>> {
        let rows = sqlx::query("SELECT id, name, color FROM tags ORDER BY name, id")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        rows.iter().map(tag_from_row).collect()
    }

    async fn find_tags(&self, ids: &[TagId]) -> Result<Vec<Tag>> {
        let rows = sqlx::query("SELECT id, name, color FROM tags WHERE id = ANY($1) ORDER BY name, id")
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        rows.iter().map(tag_from_row).collect()
    }

    async fn tag_ids_for_idea(&self, idea_id: IdeaId) -> Result<Vec<TagId>> {
        sqlx::query_scalar("SELECT tag_id FROM idea_tags WHERE idea_id = $1 ORDER BY tag_id")
            .bind(idea_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn insert_tag(&self, name: &str, color: &str) -> Result<Tag> {
        let id: i64 = sqlx::query_scalar("INSERT INTO tags (name, color) VALUES ($1, $2) RETURNING id")
            .bind(name)
            .bind(color)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(Tag {
            id,
            name: name.to_string(),
            color: color.to_string(),
        })
    }
}

fn tag_from_row(row: &PgRow) -> Result<Tag> {
    Ok(Tag {
        id: row.try_get("id").map_err(db_error)?,
        name: row.try_get("name").map_err(db_error)?,
        color: row.try_get("color").map_err(db_error)?,
    })
}

fn tech_from_row(row: &PgRow) -> Result<TechStackItem> {
    Ok(TechStackItem {
        id: row.try_get("id").map_err(db_error)?,
        name: row.try_get("name").map_err(db_error)?,
    })
}

#[async_trait]
impl TechStackRepository for PgStore {
    async fn list_tech_stacks(&self) -> Result<Vec<TechStackItem>> {
        let rows = sqlx::query("SELECT id, name FROM tech_stacks ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        rows.iter().map(tech_from_row).collect()
    }

    async fn find_tech_stacks(&self, ids: &[TechStackId]) -> Result<Vec<TechStackItem>> {
        let rows = sqlx::query("SELECT id, name FROM tech_stacks WHERE id = ANY($1) ORDER BY name")
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        rows.iter().map(tech_from_row).collect()
    }

    async fn tech_stack_ids_for_idea(&self, idea_id: IdeaId) -> Result<Vec<TechStackId>> {
        sqlx::query_scalar(
            "SELECT tech_stack_id FROM idea_tech_stacks WHERE idea_id = $1 ORDER BY tech_stack_id",
        )
        .bind(idea_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn upsert_tech_stacks(&self, names: &[String]) -> Result<Vec<TechStackItem>> {
        let mut distinct: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            if !distinct.contains(name) {
                distinct.push(name.clone());
            }
        }
        if distinct.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query("INSERT INTO tech_stacks (name) SELECT UNNEST($1::text[]) ON CONFLICT (name) DO NOTHING")
            .bind(&distinct)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        let rows = sqlx::query("SELECT id, name FROM tech_stacks WHERE name = ANY($1)")
            .bind(&distinct)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        let by_name: HashMap<String, TechStackId> = rows
            .iter()
            .map(tech_from_row)
            .map(|r| r.map(|t| (t.name, t.id)))
            .collect::<Result<_>>()?;
        distinct
            .into_iter()
            .map(|name| match by_name.get(&name) {
                Some(id) => Ok(TechStackItem { id: *id, name }),
                None => Err(DomainError::Internal(format!("tech stack '{name}' vanished during upsert"))),
            })
            .collect()
    }
}

#[async_trait]
impl VoteRepository for PgStore {
    async fn find_vote(&self, user_id: UserId, idea_id: IdeaId) -> Result<Option<Vote>> {
        let row = sqlx::query("SELECT user_id, idea_id, created_at FROM votes WHERE user_id = $1 AND idea_id = $2")
            .bind(user_id)
            .bind(idea_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(|r| {
            Ok(Vote {
                user_id: r.try_get("user_id").map_err(db_error)?,
                idea_id: r.try_get("idea_id").map_err(db_error)?,
                created_at: r.try_get("created_at").map_err(db_error)?,
            })
        })
        .transpose()
    }

    async fn voted_idea_ids(&self, user_id: UserId) -> Result<Vec<IdeaId>> {
        sqlx::query_scalar("SELECT idea_id FROM votes WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn toggle_vote(&self, user_id: UserId, idea_id: IdeaId) -> Result<VoteOutcome> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // 1. Lock the idea row; concurrent toggles on it queue here
        let locked: Option<(String, UserId)> =
            sqlx::query_as("SELECT status, user_id FROM ideas WHERE id = $1 FOR UPDATE")
                .bind(idea_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error)?;
        match locked {
            Some((status, author)) if status == IdeaStatus::Published.as_str() || author == user_id => {}
            _ => return Err(DomainError::not_found("Idea", idea_id)),
        }

        // 2. Flip membership
        let removed = sqlx::query("DELETE FROM votes WHERE user_id = $1 AND idea_id = $2")
            .bind(user_id)
            .bind(idea_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?
            .rows_affected()
            > 0;
        let (action, delta) = if removed {
            (VoteAction::Removed, -1)
        } else {
            sqlx::query("INSERT INTO votes (user_id, idea_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
                .bind(user_id)
                .bind(idea_id)
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
            (VoteAction::Added, 1)
        };

        // 3. Move the counter relative to the stored value
        let upvotes: i32 = sqlx::query_scalar(
            "UPDATE ideas SET upvotes = GREATEST(upvotes + $2, 0) WHERE id = $1 RETURNING upvotes",
        )
        .bind(idea_id)
        .bind(delta)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error)?;

        tx.commit().await.map_err(db_error)?;
        Ok(VoteOutcome {
            action,
            upvotes: counter(i64::from(upvotes))?,
        })
    }

    async fn reconcile_upvotes(&self, idea_id: IdeaId) -> Result<ReconcileOutcome> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;
        let previous: i32 = sqlx::query_scalar("SELECT upvotes FROM ideas WHERE id = $1 FOR UPDATE")
            .bind(idea_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?
            .ok_or_else(|| DomainError::not_found("Idea", idea_id))?;
        let actual: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE idea_id = $1")
            .bind(idea_id)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;
        let actual = counter(actual)?;
        sqlx::query("UPDATE ideas SET upvotes = $2 WHERE id = $1")
            .bind(idea_id)
            .bind(i32::try_from(actual).map_err(|_| corrupt("vote count", actual))?)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        tx.commit().await.map_err(db_error)?;

        Ok(ReconcileOutcome {
            idea_id,
            previous: counter(i64::from(previous))?,
            actual,
        })
    }
}

#[async_trait]
impl ProfileRepository for PgStore {
    async fn find_profile(&self, id: UserId) -> Result<Option<UserProfile>> {
        sqlx::query("SELECT id, full_name, avatar_url, created_at, updated_at FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .as_ref()
            .map(profile_from_row)
            .transpose()
    }

    async fn upsert_profile(&self, profile: UserProfile) -> Result<UserProfile> {
        let row = sqlx::query(
            "INSERT INTO profiles (id, full_name, avatar_url, created_at, updated_at) VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (id) DO UPDATE SET full_name = EXCLUDED.full_name, avatar_url = EXCLUDED.avatar_url, \
             updated_at = EXCLUDED.updated_at \
             RETURNING id, full_name, avatar_url, created_at, updated_at",
        )
        .bind(profile.id)
        .bind(&profile.full_name)
        .bind(&profile.avatar_url)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;
        profile_from_row(&row)
    }
}

#[async_trait]
impl ReportRepository for PgStore {
    async fn insert_report(&self, report: Report) -> Result<()> {
        // The subselect locks the idea row against a concurrent delete.
        let inserted = sqlx::query(
            "INSERT INTO reports (id, idea_id, user_id, reason, description, status, created_at, updated_at) \
             SELECT $1, i.id, $3, $4, $5, $6, $7, $8 FROM ideas i WHERE i.id = $2 FOR SHARE",
        )
        .bind(report.id)
        .bind(report.idea_id)
        .bind(report.user_id)
        .bind(report.reason.as_str())
        .bind(&report.description)
        .bind(report.status.as_str())
        .bind(report.created_at)
        .bind(report.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?
        .rows_affected();
        if inserted == 0 {
            return Err(DomainError::not_found("Idea", report.idea_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_exhaustion_is_transient() {
        assert!(db_error(sqlx::Error::PoolTimedOut).is_retryable());
        assert!(db_error(sqlx::Error::PoolClosed).is_retryable());
    }

    #[test]
    fn test_decode_problems_are_internal() {
        let err = db_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, DomainError::Internal(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_counter_rejects_negative_counts() {
        assert_eq!(counter(3).unwrap(), 3);
        assert!(counter(-1).is_err());
    }
}
