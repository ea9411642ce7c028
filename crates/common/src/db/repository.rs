//! Repository pattern for database operations
//!
//! All data access goes through here: entity queries for simple
//! lookups, raw SQL statements for the aggregate listings, and
//! transactions wherever a check-then-act sequence must be atomic.

use crate::config::{QuotaConfig, ScoringConfig};
use crate::db::models::*;
use crate::db::query::{name_tokens, CommentSort, LecturerSort, SortDirection};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use chrono::{Months, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    FromQueryResult, IsolationLevel, NotSet, PaginatorTrait, QueryFilter, Set, Statement,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;
use uuid::Uuid;

/// Lecturer row with its aggregated marks, as returned by the listings
#[derive(Debug, Clone, Serialize, Deserialize, FromQueryResult)]
pub struct LecturerView {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: String,
    pub avatar_link: Option<String>,
    pub timetable_id: i64,
    /// Approved, non-deleted comments backing the averages
    pub approved_count: i64,
    pub mark_kindness: Option<f64>,
    pub mark_freebie: Option<f64>,
    pub mark_clarity: Option<f64>,
    pub mark_general: Option<f64>,
    pub mark_weighted: Option<f64>,
    pub mark_kindness_weighted: Option<f64>,
    pub mark_freebie_weighted: Option<f64>,
    pub mark_clarity_weighted: Option<f64>,
    pub rank: Option<i64>,
}

/// Comment with its reaction aggregates and per-viewer flags
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentView {
    pub comment: Comment,
    pub like_count: i64,
    pub dislike_count: i64,
    pub is_liked: bool,
    pub is_disliked: bool,
}

/// One page of the comment listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentPage {
    pub comments: Vec<CommentView>,
    pub total: u64,
}

/// Filters for the lecturer listing
#[derive(Debug, Clone, Default)]
pub struct LecturerQuery {
    pub name: Option<String>,
    pub subject: Option<String>,
    pub order_by: Option<LecturerSort>,
    pub direction: SortDirection,
    pub limit: u64,
    pub offset: u64,
    /// Expose soft-deleted rows; internal callers only
    pub include_deleted: bool,
}

/// Filters for the comment listing
#[derive(Debug, Clone, Default)]
pub struct CommentQuery {
    pub lecturer_id: Option<i64>,
    pub user_id: Option<i64>,
    pub subject: Option<String>,
    /// PENDING-only listing for moderators
    pub unreviewed: bool,
    pub order_by: Option<CommentSort>,
    pub direction: SortDirection,
    pub limit: u64,
    pub offset: u64,
    /// Expose soft-deleted rows; internal callers only
    pub include_deleted: bool,
}

/// Fields updatable on a lecturer; `None` leaves the field untouched
#[derive(Debug, Clone, Default)]
pub struct LecturerPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub avatar_link: Option<Option<String>>,
    pub timetable_id: Option<i64>,
}

/// Fields updatable through comment self-edit
#[derive(Debug, Clone, Default)]
pub struct CommentPatch {
    pub subject: Option<String>,
    pub text: Option<String>,
    pub mark_kindness: Option<i32>,
    pub mark_freebie: Option<i32>,
    pub mark_clarity: Option<i32>,
}

/// A validated comment submission
#[derive(Debug, Clone)]
pub struct NewComment {
    pub lecturer_id: i64,
    pub user_id: i64,
    pub subject: Option<String>,
    pub text: String,
    pub mark_kindness: i32,
    pub mark_freebie: i32,
    pub mark_clarity: i32,
    pub is_anonymous: bool,
    /// Trusted import path: skips quotas and lands as APPROVED
    pub import: bool,
}

/// Lecturer listing SELECT. $1 is the global mean, $2 the prior weight;
/// the weighted columns are rendered by [`scoring::weighted_mark_sql`]
/// so the shrinkage arithmetic lives in one place.
fn lecturer_stats_select() -> &'static str {
    static SQL: OnceLock<String> = OnceLock::new();
    SQL.get_or_init(|| {
        let weighted =
            |avg: &str| crate::scoring::weighted_mark_sql(avg, "s.approved_count", "$1", "$2");
        format!(
            r#"
    SELECT
        l.id,
        l.first_name,
        l.last_name,
        l.middle_name,
        l.avatar_link,
        l.timetable_id,
        COALESCE(s.approved_count, 0) AS approved_count,
        s.mark_kindness,
        s.mark_freebie,
        s.mark_clarity,
        s.mark_general,
        {mark_weighted} AS mark_weighted,
        {kindness_weighted} AS mark_kindness_weighted,
        {freebie_weighted} AS mark_freebie_weighted,
        {clarity_weighted} AS mark_clarity_weighted,
        r.rank
    FROM lecturer l
    LEFT JOIN (
        SELECT
            c.lecturer_id,
            COUNT(*) AS approved_count,
            AVG(c.mark_kindness::float8) AS mark_kindness,
            AVG(c.mark_freebie::float8) AS mark_freebie,
            AVG(c.mark_clarity::float8) AS mark_clarity,
            AVG((c.mark_kindness + c.mark_freebie + c.mark_clarity)::float8 / 3.0) AS mark_general
        FROM comment c
        WHERE c.review_status = 'approved' AND c.is_deleted = FALSE
        GROUP BY c.lecturer_id
    ) s ON s.lecturer_id = l.id
    LEFT JOIN lecturer_rating r ON r.id = l.id
"#,
            mark_weighted = weighted("s.mark_general"),
            kindness_weighted = weighted("s.mark_kindness"),
            freebie_weighted = weighted("s.mark_freebie"),
            clarity_weighted = weighted("s.mark_clarity"),
        )
    })
}

const COMMENT_AGG_SELECT: &str = r#"
    SELECT
        c.uuid,
        c.user_id,
        c.create_ts,
        c.update_ts,
        c.subject,
        c.text,
        c.mark_kindness,
        c.mark_freebie,
        c.mark_clarity,
        c.approved_by,
        c.lecturer_id,
        c.review_status,
        c.is_deleted,
        COALESCE(SUM(CASE WHEN r.reaction = 'like' THEN 1 ELSE 0 END), 0) AS like_count,
        COALESCE(SUM(CASE WHEN r.reaction = 'dislike' THEN 1 ELSE 0 END), 0) AS dislike_count,
        COALESCE(SUM(CASE WHEN r.reaction = 'like' THEN 1 ELSE 0 END), 0)
          - COALESCE(SUM(CASE WHEN r.reaction = 'dislike' THEN 1 ELSE 0 END), 0) AS like_diff,
        (c.mark_kindness + c.mark_freebie + c.mark_clarity)::float8 / 3.0 AS mark_general
    FROM comment c
    LEFT JOIN comment_reaction r ON r.comment_uuid = c.uuid
"#;

#[derive(Debug, FromQueryResult)]
struct CommentAggRow {
    uuid: Uuid,
    user_id: Option<i64>,
    create_ts: sea_orm::prelude::DateTimeUtc,
    update_ts: sea_orm::prelude::DateTimeUtc,
    subject: Option<String>,
    text: String,
    mark_kindness: i32,
    mark_freebie: i32,
    mark_clarity: i32,
    approved_by: Option<i64>,
    lecturer_id: i64,
    review_status: ReviewStatus,
    is_deleted: bool,
    like_count: i64,
    dislike_count: i64,
}

impl CommentAggRow {
    fn into_view(self, reaction: Option<ReactionKind>) -> CommentView {
        CommentView {
            comment: Comment {
                uuid: self.uuid,
                user_id: self.user_id,
                create_ts: self.create_ts,
                update_ts: self.update_ts,
                subject: self.subject,
                text: self.text,
                mark_kindness: self.mark_kindness,
                mark_freebie: self.mark_freebie,
                mark_clarity: self.mark_clarity,
                approved_by: self.approved_by,
                lecturer_id: self.lecturer_id,
                review_status: self.review_status,
                is_deleted: self.is_deleted,
            },
            like_count: self.like_count,
            dislike_count: self.dislike_count,
            is_liked: reaction == Some(ReactionKind::Like),
            is_disliked: reaction == Some(ReactionKind::Dislike),
        }
    }
}

/// Start of a rolling window of `months` ending now
fn window_start(months: u32) -> Result<sea_orm::prelude::DateTimeUtc> {
    Utc::now()
        .checked_sub_months(Months::new(months))
        .ok_or_else(|| AppError::Internal {
            message: format!("Rolling window of {} months is out of range", months),
        })
}

/// A quota of `limit` admits exactly `limit` submissions per window;
/// the check runs against the count of already-accepted ones.
fn quota_reached(accepted: u64, limit: u32) -> bool {
    accepted >= u64::from(limit)
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Lecturer Operations
    // ========================================================================

    /// Create a new lecturer; duplicate timetable_id among live rows is a conflict
    pub async fn create_lecturer(
        &self,
        first_name: String,
        last_name: String,
        middle_name: String,
        avatar_link: Option<String>,
        timetable_id: i64,
    ) -> Result<Lecturer> {
        let existing = LecturerEntity::find()
            .filter(LecturerColumn::TimetableId.eq(timetable_id))
            .filter(LecturerColumn::IsDeleted.eq(false))
            .one(self.conn())
            .await?;
        if existing.is_some() {
            return Err(AppError::AlreadyExists {
                object: "lecturer",
                id: timetable_id.to_string(),
            });
        }

        let lecturer = LecturerActiveModel {
            id: NotSet,
            first_name: Set(first_name),
            last_name: Set(last_name),
            middle_name: Set(middle_name),
            avatar_link: Set(avatar_link),
            timetable_id: Set(timetable_id),
            is_deleted: Set(false),
        };

        lecturer.insert(self.conn()).await.map_err(Into::into)
    }

    /// Find a live lecturer by ID
    pub async fn find_lecturer(&self, id: i64) -> Result<Option<Lecturer>> {
        LecturerEntity::find_by_id(id)
            .filter(LecturerColumn::IsDeleted.eq(false))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Get a live lecturer by ID or fail with NotFound
    pub async fn get_lecturer(&self, id: i64) -> Result<Lecturer> {
        self.find_lecturer(id)
            .await?
            .ok_or_else(|| AppError::ObjectNotFound {
                object: "lecturer",
                id: id.to_string(),
            })
    }

    /// Single lecturer with aggregated marks
    pub async fn lecturer_stats(
        &self,
        id: i64,
        scoring: &ScoringConfig,
    ) -> Result<LecturerView> {
        let mu = self.mean_mark_general().await?;
        let mut values: Vec<sea_orm::Value> =
            vec![mu.into(), scoring.mean_mark_general_weight.into()];
        values.push(id.into());

        let sql = format!(
            "{} WHERE l.is_deleted = FALSE AND l.id = $3",
            lecturer_stats_select()
        );
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, &sql, values);

        LecturerView::find_by_statement(stmt)
            .one(self.conn())
            .await?
            .ok_or_else(|| AppError::ObjectNotFound {
                object: "lecturer",
                id: id.to_string(),
            })
    }

    /// List lecturers with aggregated marks, filters and sorting
    pub async fn list_lecturers(
        &self,
        query: &LecturerQuery,
        scoring: &ScoringConfig,
    ) -> Result<(Vec<LecturerView>, u64)> {
        let mu = self.mean_mark_general().await?;

        let mut values: Vec<sea_orm::Value> =
            vec![mu.into(), scoring.mean_mark_general_weight.into()];
        let where_sql = Self::lecturer_filter_sql(query, &mut values);

        let order = query
            .order_by
            .map(|k| format!("{} {} NULLS LAST, ", k.as_sql(), query.direction.as_sql()))
            .unwrap_or_default();

        values.push((query.limit as i64).into());
        let limit_idx = values.len();
        values.push((query.offset as i64).into());
        let offset_idx = values.len();

        let sql = format!(
            "{} WHERE {} ORDER BY {}l.last_name ASC, l.id ASC LIMIT ${} OFFSET ${}",
            lecturer_stats_select(),
            where_sql,
            order,
            limit_idx,
            offset_idx
        );
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, &sql, values);
        let rows = LecturerView::find_by_statement(stmt).all(self.conn()).await?;

        // Count query shares the filters but not the aggregates
        let mut count_values: Vec<sea_orm::Value> = Vec::new();
        let count_where = Self::lecturer_filter_sql(query, &mut count_values);
        let count_sql = format!("SELECT COUNT(*) AS total FROM lecturer l WHERE {}", count_where);
        let count_stmt =
            Statement::from_sql_and_values(DbBackend::Postgres, &count_sql, count_values);
        let total = self
            .conn()
            .query_one(count_stmt)
            .await?
            .map(|row| row.try_get::<i64>("", "total"))
            .transpose()?
            .unwrap_or(0);

        Ok((rows, total.max(0) as u64))
    }

    fn lecturer_filter_sql(query: &LecturerQuery, values: &mut Vec<sea_orm::Value>) -> String {
        let mut conds = if query.include_deleted {
            vec!["TRUE".to_string()]
        } else {
            vec!["l.is_deleted = FALSE".to_string()]
        };

        if let Some(ref name) = query.name {
            for token in name_tokens(name) {
                values.push(format!("%{}%", token).into());
                let n = values.len();
                conds.push(format!(
                    "(l.first_name ILIKE ${n} OR l.last_name ILIKE ${n} OR l.middle_name ILIKE ${n})"
                ));
            }
        }

        if let Some(ref subject) = query.subject {
            values.push(format!("%{}%", subject).into());
            let n = values.len();
            conds.push(format!(
                "EXISTS (SELECT 1 FROM comment sc WHERE sc.lecturer_id = l.id \
                 AND sc.review_status = 'approved' AND sc.is_deleted = FALSE \
                 AND sc.subject ILIKE ${n})"
            ));
        }

        conds.join(" AND ")
    }

    /// Update lecturer fields; a no-op patch is a conflict
    pub async fn update_lecturer(&self, id: i64, patch: LecturerPatch) -> Result<Lecturer> {
        let lecturer = self.get_lecturer(id).await?;

        let changed = patch
            .first_name
            .as_ref()
            .is_some_and(|v| *v != lecturer.first_name)
            || patch
                .last_name
                .as_ref()
                .is_some_and(|v| *v != lecturer.last_name)
            || patch
                .middle_name
                .as_ref()
                .is_some_and(|v| *v != lecturer.middle_name)
            || patch
                .avatar_link
                .as_ref()
                .is_some_and(|v| *v != lecturer.avatar_link)
            || patch.timetable_id.is_some_and(|v| v != lecturer.timetable_id);
        if !changed {
            return Err(AppError::UpdateError {
                message: format!("Nothing to update for lecturer {}.", id),
            });
        }

        if let Some(timetable_id) = patch.timetable_id {
            let conflict = LecturerEntity::find()
                .filter(LecturerColumn::TimetableId.eq(timetable_id))
                .filter(LecturerColumn::IsDeleted.eq(false))
                .filter(LecturerColumn::Id.ne(id))
                .one(self.conn())
                .await?;
            if conflict.is_some() {
                return Err(AppError::AlreadyExists {
                    object: "lecturer",
                    id: timetable_id.to_string(),
                });
            }
        }

        let mut active: LecturerActiveModel = lecturer.into();
        if let Some(v) = patch.first_name {
            active.first_name = Set(v);
        }
        if let Some(v) = patch.last_name {
            active.last_name = Set(v);
        }
        if let Some(v) = patch.middle_name {
            active.middle_name = Set(v);
        }
        if let Some(v) = patch.avatar_link {
            active.avatar_link = Set(v);
        }
        if let Some(v) = patch.timetable_id {
            active.timetable_id = Set(v);
        }

        active.update(self.conn()).await.map_err(Into::into)
    }

    /// Soft-delete a lecturer and cascade in one transaction:
    /// flag the lecturer, soft-delete its comments, drop its activity rows.
    pub async fn delete_lecturer(&self, id: i64) -> Result<()> {
        let txn = self.conn().begin().await?;

        let lecturer = LecturerEntity::find_by_id(id)
            .filter(LecturerColumn::IsDeleted.eq(false))
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::ObjectNotFound {
                object: "lecturer",
                id: id.to_string(),
            })?;

        let mut active: LecturerActiveModel = lecturer.into();
        active.is_deleted = Set(true);
        active.update(&txn).await?;

        CommentEntity::update_many()
            .col_expr(CommentColumn::IsDeleted, Expr::value(true))
            .filter(CommentColumn::LecturerId.eq(id))
            .exec(&txn)
            .await?;

        SubmissionActivityEntity::delete_many()
            .filter(SubmissionActivityColumn::LecturerId.eq(id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }

    // ========================================================================
    // Comment Operations
    // ========================================================================

    /// Create a comment.
    ///
    /// Quota check, activity insert and comment insert run in one
    /// serializable transaction so concurrent submissions cannot slip
    /// past the rolling-window limits.
    pub async fn create_comment(&self, new: NewComment, quotas: &QuotaConfig) -> Result<Comment> {
        let txn = self
            .conn()
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await?;

        LecturerEntity::find_by_id(new.lecturer_id)
            .filter(LecturerColumn::IsDeleted.eq(false))
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::ObjectNotFound {
                object: "lecturer",
                id: new.lecturer_id.to_string(),
            })?;

        let now = Utc::now();

        if !new.import {
            let global_start = window_start(quotas.comment_frequency_months)?;
            let global = SubmissionActivityEntity::find()
                .filter(SubmissionActivityColumn::UserId.eq(new.user_id))
                .filter(SubmissionActivityColumn::CreateTs.gte(global_start))
                .count(&txn)
                .await?;
            if quota_reached(global, quotas.comment_limit) {
                return Err(AppError::TooManyCommentRequests {
                    window_months: quotas.comment_frequency_months,
                    limit: quotas.comment_limit,
                });
            }

            let lecturer_start = window_start(quotas.comment_lecturer_frequency_months)?;
            let per_lecturer = SubmissionActivityEntity::find()
                .filter(SubmissionActivityColumn::UserId.eq(new.user_id))
                .filter(SubmissionActivityColumn::LecturerId.eq(new.lecturer_id))
                .filter(SubmissionActivityColumn::CreateTs.gte(lecturer_start))
                .count(&txn)
                .await?;
            if quota_reached(per_lecturer, quotas.comment_to_lecturer_limit) {
                return Err(AppError::TooManyCommentsToLecturer {
                    window_months: quotas.comment_lecturer_frequency_months,
                    limit: quotas.comment_to_lecturer_limit,
                });
            }

            // Activity records the real author even for anonymous comments
            let activity = SubmissionActivityActiveModel {
                id: NotSet,
                user_id: Set(new.user_id),
                lecturer_id: Set(new.lecturer_id),
                create_ts: Set(now),
                update_ts: Set(now),
                is_deleted: Set(false),
            };
            activity.insert(&txn).await?;
        }

        let status = if new.import {
            ReviewStatus::Approved
        } else {
            ReviewStatus::Pending
        };

        let comment = CommentActiveModel {
            uuid: Set(Uuid::new_v4()),
            user_id: Set(if new.is_anonymous { None } else { Some(new.user_id) }),
            create_ts: Set(now),
            update_ts: Set(now),
            subject: Set(new.subject),
            text: Set(new.text),
            mark_kindness: Set(new.mark_kindness),
            mark_freebie: Set(new.mark_freebie),
            mark_clarity: Set(new.mark_clarity),
            approved_by: Set(None),
            lecturer_id: Set(new.lecturer_id),
            review_status: Set(status),
            is_deleted: Set(false),
        };
        let comment = comment.insert(&txn).await?;

        txn.commit().await?;
        Ok(comment)
    }

    /// Find a live comment by UUID
    pub async fn find_comment(&self, uuid: Uuid) -> Result<Option<Comment>> {
        CommentEntity::find_by_id(uuid)
            .filter(CommentColumn::IsDeleted.eq(false))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Get a live comment by UUID or fail with NotFound
    pub async fn get_comment(&self, uuid: Uuid) -> Result<Comment> {
        self.find_comment(uuid)
            .await?
            .ok_or_else(|| AppError::ObjectNotFound {
                object: "comment",
                id: uuid.to_string(),
            })
    }

    /// Single comment with reaction aggregates and viewer flags
    pub async fn comment_view(&self, uuid: Uuid, viewer: Option<i64>) -> Result<CommentView> {
        let comment = self.get_comment(uuid).await?;

        let like_count = CommentReactionEntity::find()
            .filter(CommentReactionColumn::CommentUuid.eq(uuid))
            .filter(CommentReactionColumn::Reaction.eq(ReactionKind::Like))
            .count(self.conn())
            .await?;
        let dislike_count = CommentReactionEntity::find()
            .filter(CommentReactionColumn::CommentUuid.eq(uuid))
            .filter(CommentReactionColumn::Reaction.eq(ReactionKind::Dislike))
            .count(self.conn())
            .await?;

        let own = match viewer {
            Some(user_id) => {
                CommentReactionEntity::find()
                    .filter(CommentReactionColumn::CommentUuid.eq(uuid))
                    .filter(CommentReactionColumn::UserId.eq(user_id))
                    .one(self.conn())
                    .await?
            }
            None => None,
        };
        let own_kind = own.map(|r| r.reaction);

        Ok(CommentView {
            comment,
            like_count: like_count as i64,
            dislike_count: dislike_count as i64,
            is_liked: own_kind == Some(ReactionKind::Like),
            is_disliked: own_kind == Some(ReactionKind::Dislike),
        })
    }

    /// List comments with reaction aggregates, filters and sorting
    pub async fn list_comments(
        &self,
        query: &CommentQuery,
        viewer: Option<i64>,
    ) -> Result<CommentPage> {
        let mut values: Vec<sea_orm::Value> = Vec::new();
        let where_sql = Self::comment_filter_sql(query, &mut values);

        let order = query
            .order_by
            .map(|k| format!("{} {} NULLS LAST, ", k.as_sql(), query.direction.as_sql()))
            .unwrap_or_default();

        values.push((query.limit as i64).into());
        let limit_idx = values.len();
        values.push((query.offset as i64).into());
        let offset_idx = values.len();

        let sql = format!(
            "{} WHERE {} GROUP BY c.uuid ORDER BY {}c.uuid ASC LIMIT ${} OFFSET ${}",
            COMMENT_AGG_SELECT, where_sql, order, limit_idx, offset_idx
        );
        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, &sql, values);
        let rows = CommentAggRow::find_by_statement(stmt).all(self.conn()).await?;

        let mut count_values: Vec<sea_orm::Value> = Vec::new();
        let count_where = Self::comment_filter_sql(query, &mut count_values);
        let count_sql = format!("SELECT COUNT(*) AS total FROM comment c WHERE {}", count_where);
        let count_stmt =
            Statement::from_sql_and_values(DbBackend::Postgres, &count_sql, count_values);
        let total = self
            .conn()
            .query_one(count_stmt)
            .await?
            .map(|row| row.try_get::<i64>("", "total"))
            .transpose()?
            .unwrap_or(0);

        // Viewer flags for the listed page only
        let mut own: HashMap<Uuid, ReactionKind> = HashMap::new();
        if let Some(user_id) = viewer {
            let uuids: Vec<Uuid> = rows.iter().map(|r| r.uuid).collect();
            if !uuids.is_empty() {
                let reactions = CommentReactionEntity::find()
                    .filter(CommentReactionColumn::UserId.eq(user_id))
                    .filter(CommentReactionColumn::CommentUuid.is_in(uuids))
                    .all(self.conn())
                    .await?;
                for r in reactions {
                    own.insert(r.comment_uuid, r.reaction);
                }
            }
        }

        let comments = rows
            .into_iter()
            .map(|row| {
                let kind = own.get(&row.uuid).copied();
                row.into_view(kind)
            })
            .collect();

        Ok(CommentPage {
            comments,
            total: total.max(0) as u64,
        })
    }

    fn comment_filter_sql(query: &CommentQuery, values: &mut Vec<sea_orm::Value>) -> String {
        let mut conds = if query.include_deleted {
            vec!["TRUE".to_string()]
        } else {
            vec!["c.is_deleted = FALSE".to_string()]
        };

        if query.unreviewed {
            conds.push("c.review_status = 'pending'".to_string());
        } else {
            conds.push("c.review_status = 'approved'".to_string());
        }

        if let Some(lecturer_id) = query.lecturer_id {
            values.push(lecturer_id.into());
            conds.push(format!("c.lecturer_id = ${}", values.len()));
        }
        if let Some(user_id) = query.user_id {
            values.push(user_id.into());
            conds.push(format!("c.user_id = ${}", values.len()));
        }
        if let Some(ref subject) = query.subject {
            values.push(format!("%{}%", subject).into());
            conds.push(format!("c.subject ILIKE ${}", values.len()));
        }

        conds.join(" AND ")
    }

    /// Author self-edit; resets the comment to PENDING
    pub async fn update_own_comment(
        &self,
        user_id: i64,
        uuid: Uuid,
        patch: CommentPatch,
    ) -> Result<Comment> {
        let comment = self.get_comment(uuid).await?;

        // Anonymous comments have no author and cannot be edited
        if comment.user_id != Some(user_id) {
            return Err(AppError::ForbiddenAction { object: "comment" });
        }

        let changed = patch
            .subject
            .as_ref()
            .is_some_and(|v| Some(v) != comment.subject.as_ref())
            || patch.text.as_ref().is_some_and(|v| *v != comment.text)
            || patch
                .mark_kindness
                .is_some_and(|v| v != comment.mark_kindness)
            || patch.mark_freebie.is_some_and(|v| v != comment.mark_freebie)
            || patch.mark_clarity.is_some_and(|v| v != comment.mark_clarity);
        if !changed {
            return Err(AppError::UpdateError {
                message: format!("Nothing to update for comment {}.", uuid),
            });
        }

        let mut active: CommentActiveModel = comment.into();
        if let Some(v) = patch.subject {
            active.subject = Set(Some(v));
        }
        if let Some(v) = patch.text {
            active.text = Set(v);
        }
        if let Some(v) = patch.mark_kindness {
            active.mark_kindness = Set(v);
        }
        if let Some(v) = patch.mark_freebie {
            active.mark_freebie = Set(v);
        }
        if let Some(v) = patch.mark_clarity {
            active.mark_clarity = Set(v);
        }
        active.review_status = Set(ReviewStatus::Pending);
        active.update_ts = Set(Utc::now());

        active.update(self.conn()).await.map_err(Into::into)
    }

    /// Moderator review; re-review is allowed and last-write-wins
    pub async fn review_comment(
        &self,
        uuid: Uuid,
        status: ReviewStatus,
        reviewer: i64,
    ) -> Result<Comment> {
        let comment = self.get_comment(uuid).await?;

        let mut active: CommentActiveModel = comment.into();
        active.review_status = Set(status);
        active.approved_by = Set(Some(reviewer));
        active.update_ts = Set(Utc::now());

        active.update(self.conn()).await.map_err(Into::into)
    }

    /// Soft-delete a comment
    pub async fn delete_comment(&self, uuid: Uuid) -> Result<()> {
        let comment = self.get_comment(uuid).await?;

        let mut active: CommentActiveModel = comment.into();
        active.is_deleted = Set(true);
        active.update_ts = Set(Utc::now());
        active.update(self.conn()).await?;

        Ok(())
    }

    // ========================================================================
    // Reaction Operations
    // ========================================================================

    /// Toggle a reaction: none -> insert, other kind -> swap, same kind -> remove.
    ///
    /// [`ReactionKind::toggle`] decides the next state from the current
    /// row inside one transaction; the unique index on
    /// (user_id, comment_uuid) makes the upsert atomic.
    pub async fn react(
        &self,
        user_id: i64,
        comment_uuid: Uuid,
        kind: ReactionKind,
    ) -> Result<CommentView> {
        self.get_comment(comment_uuid).await?;

        let txn = self.conn().begin().await?;

        let current = CommentReactionEntity::find()
            .filter(CommentReactionColumn::UserId.eq(user_id))
            .filter(CommentReactionColumn::CommentUuid.eq(comment_uuid))
            .one(&txn)
            .await?
            .map(|row| row.reaction);

        match ReactionKind::toggle(current, kind) {
            None => {
                CommentReactionEntity::delete_many()
                    .filter(CommentReactionColumn::UserId.eq(user_id))
                    .filter(CommentReactionColumn::CommentUuid.eq(comment_uuid))
                    .exec(&txn)
                    .await?;
            }
            Some(next) => {
                txn.execute(Statement::from_sql_and_values(
                    DbBackend::Postgres,
                    r#"
                    INSERT INTO comment_reaction (uuid, user_id, comment_uuid, reaction, created_at, edited_at)
                    VALUES ($1, $2, $3, $4, NOW(), NOW())
                    ON CONFLICT (user_id, comment_uuid)
                    DO UPDATE SET reaction = EXCLUDED.reaction, edited_at = NOW()
                    "#,
                    vec![
                        Uuid::new_v4().into(),
                        user_id.into(),
                        comment_uuid.into(),
                        next.as_str().into(),
                    ],
                ))
                .await?;
            }
        }

        txn.commit().await?;

        self.comment_view(comment_uuid, Some(user_id)).await
    }

    // ========================================================================
    // Scoring Support
    // ========================================================================

    /// Mean of per-lecturer mean marks over lecturers with at least one
    /// approved comment; 0.0 when there are none.
    pub async fn mean_mark_general(&self) -> Result<f64> {
        let stmt = Statement::from_string(
            DbBackend::Postgres,
            r#"
            SELECT COALESCE(AVG(lecturer_mean), 0.0)::float8 AS mean
            FROM (
                SELECT AVG((mark_kindness + mark_freebie + mark_clarity)::float8 / 3.0) AS lecturer_mean
                FROM comment
                WHERE review_status = 'approved' AND is_deleted = FALSE
                GROUP BY lecturer_id
            ) per_lecturer
            "#,
        );

        let mean = self
            .conn()
            .query_one(stmt)
            .await?
            .map(|row| row.try_get::<f64>("", "mean"))
            .transpose()?
            .unwrap_or(0.0);

        Ok(mean)
    }

    /// Number of accepted submissions by a user, anonymous ones included.
    /// Drives the first-comment achievement.
    pub async fn user_submission_count(&self, user_id: i64) -> Result<u64> {
        SubmissionActivityEntity::find()
            .filter(SubmissionActivityColumn::UserId.eq(user_id))
            .count(self.conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Cached Ranking Operations
    // ========================================================================

    /// Read the analytics-pipeline ranking snapshot for a lecturer
    pub async fn cached_ranking(&self, lecturer_id: i64) -> Result<Option<CachedRanking>> {
        CachedRankingEntity::find_by_id(lecturer_id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    /// Upsert a ranking snapshot row; cache-hydration entry point
    pub async fn upsert_cached_ranking(&self, snapshot: CachedRanking) -> Result<()> {
        let active = CachedRankingActiveModel {
            id: Set(snapshot.id),
            mark_weighted: Set(snapshot.mark_weighted),
            mark_kindness_weighted: Set(snapshot.mark_kindness_weighted),
            mark_clarity_weighted: Set(snapshot.mark_clarity_weighted),
            mark_freebie_weighted: Set(snapshot.mark_freebie_weighted),
            rank: Set(snapshot.rank),
            update_ts: Set(snapshot.update_ts),
        };

        CachedRankingEntity::insert(active)
            .on_conflict(
                OnConflict::column(CachedRankingColumn::Id)
                    .update_columns([
                        CachedRankingColumn::MarkWeighted,
                        CachedRankingColumn::MarkKindnessWeighted,
                        CachedRankingColumn::MarkClarityWeighted,
                        CachedRankingColumn::MarkFreebieWeighted,
                        CachedRankingColumn::Rank,
                        CachedRankingColumn::UpdateTs,
                    ])
                    .to_owned(),
            )
            .exec(self.conn())
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_start_is_in_the_past() {
        let start = window_start(10).unwrap();
        assert!(start < Utc::now());

        let ten = window_start(10).unwrap();
        let six = window_start(6).unwrap();
        assert!(ten < six);
    }

    #[test]
    fn test_comment_filter_sql_numbers_parameters() {
        let query = CommentQuery {
            lecturer_id: Some(7),
            user_id: Some(42),
            subject: Some("physics".into()),
            unreviewed: false,
            ..Default::default()
        };
        let mut values = Vec::new();
        let sql = Repository::comment_filter_sql(&query, &mut values);

        assert!(sql.contains("c.is_deleted = FALSE"));
        assert!(sql.contains("c.review_status = 'approved'"));
        assert!(sql.contains("c.lecturer_id = $1"));
        assert!(sql.contains("c.user_id = $2"));
        assert!(sql.contains("c.subject ILIKE $3"));
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn test_include_deleted_drops_visibility_predicate() {
        let query = CommentQuery {
            include_deleted: true,
            ..Default::default()
        };
        let mut values = Vec::new();
        let sql = Repository::comment_filter_sql(&query, &mut values);
        assert!(!sql.contains("is_deleted"));
    }

    #[test]
    fn test_unreviewed_filter_is_pending_only() {
        let query = CommentQuery {
            unreviewed: true,
            ..Default::default()
        };
        let mut values = Vec::new();
        let sql = Repository::comment_filter_sql(&query, &mut values);

        assert!(sql.contains("c.review_status = 'pending'"));
        assert!(!sql.contains("approved"));
    }

    #[test]
    fn test_lecturer_filter_sql_tokenizes_names() {
        let query = LecturerQuery {
            name: Some("Иванов Иван".into()),
            subject: Some("Math".into()),
            ..Default::default()
        };
        // mu and w occupy $1 and $2 in the listing statement
        let mut values: Vec<sea_orm::Value> = vec![0.0f64.into(), 0.75f64.into()];
        let sql = Repository::lecturer_filter_sql(&query, &mut values);

        assert!(sql.contains("l.first_name ILIKE $3"));
        assert!(sql.contains("l.first_name ILIKE $4"));
        assert!(sql.contains("sc.subject ILIKE $5"));
        assert_eq!(values.len(), 5);
    }

    #[test]
    fn test_lecturer_select_uses_shared_weighted_formula() {
        let sql = lecturer_stats_select();
        let rendered = crate::scoring::weighted_mark_sql(
            "s.mark_general",
            "s.approved_count",
            "$1",
            "$2",
        );
        assert!(sql.contains(&format!("{} AS mark_weighted", rendered)));
        assert!(sql.contains("AS mark_kindness_weighted"));
        assert!(sql.contains("AS mark_freebie_weighted"));
        assert!(sql.contains("AS mark_clarity_weighted"));
    }

    #[test]
    fn test_quota_boundary() {
        let limit = 5;

        // Submissions 1..=5 pass; the check before each sees the count
        // of previously accepted ones
        for accepted in 0..5 {
            assert!(!quota_reached(accepted, limit));
        }

        // The sixth submission in the window is rejected
        assert!(quota_reached(5, limit));
        assert!(quota_reached(6, limit));

        // A zero limit admits nothing
        assert!(quota_reached(0, 0));
    }

    #[test]
    fn test_query_defaults_hide_deleted() {
        // Handlers build queries with struct update syntax; the defaults
        // must never expose soft-deleted rows.
        assert!(!CommentQuery::default().include_deleted);
        assert!(!LecturerQuery::default().include_deleted);
    }

    fn agg_row() -> CommentAggRow {
        CommentAggRow {
            uuid: Uuid::new_v4(),
            user_id: Some(1),
            create_ts: Utc::now(),
            update_ts: Utc::now(),
            subject: None,
            text: "отличный лектор".into(),
            mark_kindness: 1,
            mark_freebie: 0,
            mark_clarity: 2,
            approved_by: None,
            lecturer_id: 7,
            review_status: ReviewStatus::Approved,
            is_deleted: false,
            like_count: 3,
            dislike_count: 1,
        }
    }

    #[test]
    fn test_viewer_reaction_flags() {
        let none = agg_row().into_view(None);
        assert!(!none.is_liked && !none.is_disliked);

        let liked = agg_row().into_view(Some(ReactionKind::Like));
        assert!(liked.is_liked && !liked.is_disliked);

        let disliked = agg_row().into_view(Some(ReactionKind::Dislike));
        assert!(!disliked.is_liked && disliked.is_disliked);
        assert_eq!(disliked.like_count, 3);
        assert_eq!(disliked.dislike_count, 1);
    }
}
