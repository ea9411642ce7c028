//! Comment lifecycle handlers
//!
//! Submission, listing, self-edit, moderation review and soft delete.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::handlers::StatusResponse;
use crate::AppState;
use lectorate_common::{
    auth::{scopes, AuthContext, MaybeAuth},
    db::models::ReviewStatus,
    db::query::{parse_single_sort, CommentSort, SortDirection},
    db::{CommentPatch, CommentQuery, CommentView, NewComment, Repository},
    errors::{AppError, Result},
    metrics, validation,
};

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

/// Serialized comment as returned by every comment endpoint
#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub uuid: Uuid,
    pub user_id: Option<i64>,
    pub create_ts: chrono::DateTime<chrono::Utc>,
    pub update_ts: chrono::DateTime<chrono::Utc>,
    pub subject: Option<String>,
    pub text: String,
    pub mark_kindness: i32,
    pub mark_freebie: i32,
    pub mark_clarity: i32,
    pub mark_general: f64,
    pub lecturer_id: i64,
    pub review_status: ReviewStatus,
    pub like_count: i64,
    pub dislike_count: i64,
    pub is_liked: bool,
    pub is_disliked: bool,
}

impl From<CommentView> for CommentResponse {
    fn from(view: CommentView) -> Self {
        let c = view.comment;
        Self {
            uuid: c.uuid,
            user_id: c.user_id,
            create_ts: c.create_ts,
            update_ts: c.update_ts,
            mark_general: lectorate_common::scoring::mark_general(
                c.mark_kindness,
                c.mark_freebie,
                c.mark_clarity,
            ),
            subject: c.subject,
            text: c.text,
            mark_kindness: c.mark_kindness,
            mark_freebie: c.mark_freebie,
            mark_clarity: c.mark_clarity,
            lecturer_id: c.lecturer_id,
            review_status: c.review_status,
            like_count: view.like_count,
            dislike_count: view.dislike_count,
            is_liked: view.is_liked,
            is_disliked: view.is_disliked,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentParams {
    pub lecturer_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub subject: Option<String>,
    pub text: String,
    pub mark_kindness: i32,
    pub mark_freebie: i32,
    pub mark_clarity: i32,
    #[serde(default)]
    pub is_anonymous: bool,
}

/// Submit a comment for moderation.
///
/// Holders of the import scope bypass the quotas and land as APPROVED.
pub async fn create_comment(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(params): Query<CreateCommentParams>,
    Json(request): Json<CreateCommentRequest>,
) -> Result<Json<CommentResponse>> {
    let max_symbols = state.config.comments.max_comment_length;
    validation::validate_marks(
        request.mark_kindness,
        request.mark_freebie,
        request.mark_clarity,
    )?;
    validation::validate_text(&request.text, max_symbols)?;
    validation::validate_subject(request.subject.as_deref(), max_symbols)?;

    let import = auth.has_scope(scopes::COMMENT_IMPORT);

    let repo = Repository::new(state.db.clone());
    let comment = repo
        .create_comment(
            NewComment {
                lecturer_id: params.lecturer_id,
                user_id: auth.user_id,
                subject: request.subject,
                text: request.text,
                mark_kindness: request.mark_kindness,
                mark_freebie: request.mark_freebie,
                mark_clarity: request.mark_clarity,
                is_anonymous: request.is_anonymous,
                import,
            },
            &state.config.quotas,
        )
        .await
        .inspect_err(|e| {
            match e {
                AppError::TooManyCommentRequests { .. } => metrics::record_rate_limited("global"),
                AppError::TooManyCommentsToLecturer { .. } => {
                    metrics::record_rate_limited("lecturer")
                }
                _ => {}
            };
        })?;

    metrics::record_comment_created(import);
    tracing::info!(
        comment_uuid = %comment.uuid,
        lecturer_id = comment.lecturer_id,
        import,
        "Comment submitted"
    );

    // First submission triggers the achievement, entirely off the
    // request path: the comment is already committed, so a failed
    // lookup here is logged and must not surface to the caller.
    if !import {
        if let Some(notifier) = state.notifier.clone() {
            let user_id = auth.user_id;
            let gate_repo = Repository::new(state.db.clone());
            tokio::spawn(async move {
                match gate_repo.user_submission_count(user_id).await {
                    Ok(accepted) if is_first_submission(accepted) => {
                        metrics::record_achievement_awarded();
                        notifier.award_first_comment(user_id).await;
                    }
                    Ok(_) => {}
                    Err(err) => tracing::warn!(
                        user_id,
                        error = %err,
                        "First-comment achievement check failed"
                    ),
                }
            });
        }
    }

    Ok(Json(CommentResponse::from(CommentView {
        comment,
        like_count: 0,
        dislike_count: 0,
        is_liked: false,
        is_disliked: false,
    })))
}

/// Fetch a single comment by UUID
pub async fn get_comment(
    State(state): State<AppState>,
    MaybeAuth(viewer): MaybeAuth,
    Path(uuid): Path<Uuid>,
) -> Result<Json<CommentResponse>> {
    let repo = Repository::new(state.db.clone());
    let view = repo
        .comment_view(uuid, viewer.map(|a| a.user_id))
        .await?;
    Ok(Json(view.into()))
}

#[derive(Debug, Deserialize)]
pub struct CommentListParams {
    pub lecturer_id: Option<i64>,
    pub user_id: Option<i64>,
    pub subject: Option<String>,
    pub order_by: Option<String>,
    #[serde(default)]
    pub asc_order: bool,
    #[serde(default)]
    pub unreviewed: bool,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct CommentListResponse {
    pub comments: Vec<CommentResponse>,
    pub limit: u64,
    pub offset: u64,
    pub total: u64,
}

/// List comments with filters, sorting and pagination.
///
/// `unreviewed=true` is the moderation queue: PENDING comments only,
/// gated by the review scope. The public listing shows APPROVED only.
pub async fn list_comments(
    State(state): State<AppState>,
    MaybeAuth(viewer): MaybeAuth,
    Query(params): Query<CommentListParams>,
) -> Result<Json<CommentListResponse>> {
    if params.unreviewed {
        viewer
            .as_ref()
            .ok_or_else(|| AppError::Unauthorized {
                message: "Authentication required for the moderation queue".to_string(),
            })?
            .require_scope(scopes::COMMENT_REVIEW, "comment")?;
    }

    let order_by: Option<CommentSort> = parse_single_sort(params.order_by.as_deref())?;
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0);

    let query = CommentQuery {
        lecturer_id: params.lecturer_id,
        user_id: params.user_id,
        subject: params.subject,
        unreviewed: params.unreviewed,
        order_by,
        direction: SortDirection::from_asc_order(params.asc_order),
        limit,
        offset,
        ..Default::default()
    };

    let repo = Repository::new(state.db.clone());
    let page = repo
        .list_comments(&query, viewer.map(|a| a.user_id))
        .await?;

    if page.comments.is_empty() {
        return Err(AppError::ObjectNotFound {
            object: "comment",
            id: "query".to_string(),
        });
    }

    Ok(Json(CommentListResponse {
        comments: page.comments.into_iter().map(Into::into).collect(),
        limit,
        offset,
        total: page.total,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCommentRequest {
    pub subject: Option<String>,
    pub text: Option<String>,
    pub mark_kindness: Option<i32>,
    pub mark_freebie: Option<i32>,
    pub mark_clarity: Option<i32>,
}

/// Author self-edit; the comment goes back to PENDING
pub async fn update_comment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(uuid): Path<Uuid>,
    Json(request): Json<UpdateCommentRequest>,
) -> Result<Json<CommentResponse>> {
    let max_symbols = state.config.comments.max_comment_length;
    for mark in [request.mark_kindness, request.mark_freebie, request.mark_clarity]
        .into_iter()
        .flatten()
    {
        if !validation::is_valid_mark(mark) {
            return Err(AppError::WrongMark);
        }
    }
    if let Some(ref text) = request.text {
        validation::validate_text(text, max_symbols)?;
    }
    validation::validate_subject(request.subject.as_deref(), max_symbols)?;

    let repo = Repository::new(state.db.clone());
    let comment = repo
        .update_own_comment(
            auth.user_id,
            uuid,
            CommentPatch {
                subject: request.subject,
                text: request.text,
                mark_kindness: request.mark_kindness,
                mark_freebie: request.mark_freebie,
                mark_clarity: request.mark_clarity,
            },
        )
        .await?;

    let view = repo.comment_view(comment.uuid, Some(auth.user_id)).await?;
    Ok(Json(view.into()))
}

#[derive(Debug, Deserialize)]
pub struct ReviewParams {
    pub review_status: String,
}

/// Moderator decision on a pending (or previously reviewed) comment
pub async fn review_comment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(uuid): Path<Uuid>,
    Query(params): Query<ReviewParams>,
) -> Result<Json<CommentResponse>> {
    auth.require_scope(scopes::COMMENT_REVIEW, "comment")?;

    let status = match ReviewStatus::review_target(&params.review_status) {
        Some(status) => status,
        None => {
            return Err(AppError::Validation {
                message: format!(
                    "Unknown review status '{}'. Allowed: approved, dismissed",
                    params.review_status
                ),
            })
        }
    };

    let repo = Repository::new(state.db.clone());
    let comment = repo.review_comment(uuid, status, auth.user_id).await?;

    metrics::record_comment_reviewed(&params.review_status);
    tracing::info!(
        comment_uuid = %comment.uuid,
        reviewer = auth.user_id,
        status = %params.review_status,
        "Comment reviewed"
    );

    let view = repo.comment_view(comment.uuid, Some(auth.user_id)).await?;
    Ok(Json(view.into()))
}

/// Soft-delete a comment
pub async fn delete_comment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(uuid): Path<Uuid>,
) -> Result<Json<StatusResponse>> {
    auth.require_scope(scopes::COMMENT_DELETE, "comment")?;

    let repo = Repository::new(state.db.clone());
    repo.delete_comment(uuid).await?;

    tracing::info!(comment_uuid = %uuid, deleted_by = auth.user_id, "Comment deleted");
    Ok(Json(StatusResponse::success(format!(
        "Comment {} deleted",
        uuid
    ))))
}

/// The achievement fires on the user's first accepted submission only
fn is_first_submission(accepted: u64) -> bool {
    accepted == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_achievement_fires_only_on_first_submission() {
        assert!(!is_first_submission(0));
        assert!(is_first_submission(1));
        assert!(!is_first_submission(2));
        assert!(!is_first_submission(100));
    }
}
