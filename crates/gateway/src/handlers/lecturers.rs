//! Lecturer management handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::handlers::comments::CommentResponse;
use crate::handlers::StatusResponse;
use crate::AppState;
use lectorate_common::{
    auth::{scopes, AuthContext, MaybeAuth},
    db::models::Lecturer,
    db::query::{parse_single_sort, LecturerSort, SortDirection},
    db::{CommentQuery, LecturerPatch, LecturerQuery, LecturerView, Repository},
    errors::{AppError, Result},
};

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;
/// Cap on comments embedded through `info=comments`
const EMBEDDED_COMMENTS_LIMIT: u64 = 1000;

/// Which optional blocks a lecturer response should carry
#[derive(Debug, Clone, Copy, Default)]
struct InfoFlags {
    comments: bool,
    marks: bool,
}

impl InfoFlags {
    fn parse(raw: Option<&str>) -> Result<Self> {
        let mut flags = InfoFlags::default();
        let Some(raw) = raw else { return Ok(flags) };
        for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part {
                "comments" => flags.comments = true,
                "mark" => flags.marks = true,
                other => {
                    return Err(AppError::Validation {
                        message: format!("Unknown info block '{other}'. Allowed: comments, mark"),
                    })
                }
            }
        }
        Ok(flags)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateLecturerRequest {
    #[validate(length(min = 1, max = 255))]
    pub first_name: String,

    #[validate(length(min = 1, max = 255))]
    pub last_name: String,

    #[validate(length(max = 255))]
    #[serde(default)]
    pub middle_name: String,

    #[serde(default)]
    pub avatar_link: Option<String>,

    pub timetable_id: i64,
}

#[derive(Debug, Serialize)]
pub struct LecturerResponse {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: String,
    pub avatar_link: Option<String>,
    pub timetable_id: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments_count: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark_kindness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark_freebie: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark_clarity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark_general: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark_weighted: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark_kindness_weighted: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark_freebie_weighted: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mark_clarity_weighted: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<CommentResponse>>,
}

impl LecturerResponse {
    fn from_model(lecturer: Lecturer) -> Self {
        Self {
            id: lecturer.id,
            first_name: lecturer.first_name,
            last_name: lecturer.last_name,
            middle_name: lecturer.middle_name,
            avatar_link: lecturer.avatar_link,
            timetable_id: lecturer.timetable_id,
            comments_count: None,
            mark_kindness: None,
            mark_freebie: None,
            mark_clarity: None,
            mark_general: None,
            mark_weighted: None,
            mark_kindness_weighted: None,
            mark_freebie_weighted: None,
            mark_clarity_weighted: None,
            rank: None,
            comments: None,
        }
    }

    fn from_view(view: LecturerView, flags: InfoFlags) -> Self {
        let mut response = Self {
            id: view.id,
            first_name: view.first_name,
            last_name: view.last_name,
            middle_name: view.middle_name,
            avatar_link: view.avatar_link,
            timetable_id: view.timetable_id,
            comments_count: None,
            mark_kindness: None,
            mark_freebie: None,
            mark_clarity: None,
            mark_general: None,
            mark_weighted: None,
            mark_kindness_weighted: None,
            mark_freebie_weighted: None,
            mark_clarity_weighted: None,
            rank: None,
            comments: None,
        };
        if flags.marks {
            response.comments_count = Some(view.approved_count);
            response.mark_kindness = view.mark_kindness;
            response.mark_freebie = view.mark_freebie;
            response.mark_clarity = view.mark_clarity;
            response.mark_general = view.mark_general;
            response.mark_weighted = view.mark_weighted;
            response.mark_kindness_weighted = view.mark_kindness_weighted;
            response.mark_freebie_weighted = view.mark_freebie_weighted;
            response.mark_clarity_weighted = view.mark_clarity_weighted;
            response.rank = view.rank;
        }
        response
    }
}

/// Register a lecturer
pub async fn create_lecturer(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(request): Json<CreateLecturerRequest>,
) -> Result<Json<LecturerResponse>> {
    auth.require_scope(scopes::LECTURER_CREATE, "lecturer")?;
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
    })?;

    let repo = Repository::new(state.db.clone());
    let lecturer = repo
        .create_lecturer(
            request.first_name,
            request.last_name,
            request.middle_name,
            request.avatar_link,
            request.timetable_id,
        )
        .await?;

    tracing::info!(
        lecturer_id = lecturer.id,
        timetable_id = lecturer.timetable_id,
        "Lecturer created"
    );
    Ok(Json(LecturerResponse::from_model(lecturer)))
}

#[derive(Debug, Deserialize)]
pub struct LecturerInfoParams {
    pub info: Option<String>,
}

/// Fetch a single lecturer, optionally with marks and approved comments
pub async fn get_lecturer(
    State(state): State<AppState>,
    MaybeAuth(viewer): MaybeAuth,
    Path(id): Path<i64>,
    Query(params): Query<LecturerInfoParams>,
) -> Result<Json<LecturerResponse>> {
    let flags = InfoFlags::parse(params.info.as_deref())?;
    let repo = Repository::new(state.db.clone());

    let mut response = if flags.marks {
        let view = repo.lecturer_stats(id, &state.config.scoring).await?;
        LecturerResponse::from_view(view, flags)
    } else {
        LecturerResponse::from_model(repo.get_lecturer(id).await?)
    };

    if flags.comments {
        response.comments = Some(
            embedded_comments(&repo, id, viewer.as_ref().map(|a| a.user_id)).await?,
        );
    }

    Ok(Json(response))
}

async fn embedded_comments(
    repo: &Repository,
    lecturer_id: i64,
    viewer: Option<i64>,
) -> Result<Vec<CommentResponse>> {
    let query = CommentQuery {
        lecturer_id: Some(lecturer_id),
        limit: EMBEDDED_COMMENTS_LIMIT,
        ..Default::default()
    };
    let page = repo.list_comments(&query, viewer).await?;
    Ok(page.comments.into_iter().map(Into::into).collect())
}

#[derive(Debug, Deserialize)]
pub struct LecturerListParams {
    pub name: Option<String>,
    pub subject: Option<String>,
    pub info: Option<String>,
    pub order_by: Option<String>,
    #[serde(default)]
    pub asc_order: bool,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct LecturerListResponse {
    pub lecturers: Vec<LecturerResponse>,
    pub limit: u64,
    pub offset: u64,
    pub total: u64,
}

/// List lecturers with name/subject filters, sorting and pagination
pub async fn list_lecturers(
    State(state): State<AppState>,
    MaybeAuth(viewer): MaybeAuth,
    Query(params): Query<LecturerListParams>,
) -> Result<Json<LecturerListResponse>> {
    let flags = InfoFlags::parse(params.info.as_deref())?;
    let order_by: Option<LecturerSort> = parse_single_sort(params.order_by.as_deref())?;
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0);

    let query = LecturerQuery {
        name: params.name,
        subject: params.subject,
        order_by,
        direction: SortDirection::from_asc_order(params.asc_order),
        limit,
        offset,
        ..Default::default()
    };

    let repo = Repository::new(state.db.clone());
    let (views, total) = repo.list_lecturers(&query, &state.config.scoring).await?;

    if views.is_empty() {
        return Err(AppError::ObjectNotFound {
            object: "lecturer",
            id: "query".to_string(),
        });
    }

    let viewer_id = viewer.as_ref().map(|a| a.user_id);
    let mut lecturers = Vec::with_capacity(views.len());
    for view in views {
        let id = view.id;
        let mut response = LecturerResponse::from_view(view, flags);
        if flags.comments {
            response.comments = Some(embedded_comments(&repo, id, viewer_id).await?);
        }
        lecturers.push(response);
    }

    Ok(Json(LecturerListResponse {
        lecturers,
        limit,
        offset,
        total,
    }))
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateLecturerRequest {
    #[validate(length(min = 1, max = 255))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 255))]
    pub last_name: Option<String>,

    #[validate(length(max = 255))]
    pub middle_name: Option<String>,

    pub avatar_link: Option<String>,

    pub timetable_id: Option<i64>,
}

/// Update lecturer fields
pub async fn update_lecturer(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
    Json(request): Json<UpdateLecturerRequest>,
) -> Result<Json<LecturerResponse>> {
    auth.require_scope(scopes::LECTURER_UPDATE, "lecturer")?;
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
    })?;

    let repo = Repository::new(state.db.clone());
    let lecturer = repo
        .update_lecturer(
            id,
            LecturerPatch {
                first_name: request.first_name,
                last_name: request.last_name,
                middle_name: request.middle_name,
                avatar_link: request.avatar_link.map(Some),
                timetable_id: request.timetable_id,
            },
        )
        .await?;

    tracing::info!(lecturer_id = id, "Lecturer updated");
    Ok(Json(LecturerResponse::from_model(lecturer)))
}

/// Soft-delete a lecturer together with its comments and activity rows
pub async fn delete_lecturer(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(id): Path<i64>,
) -> Result<Json<StatusResponse>> {
    auth.require_scope(scopes::LECTURER_DELETE, "lecturer")?;

    let repo = Repository::new(state.db.clone());
    repo.delete_lecturer(id).await?;

    tracing::info!(lecturer_id = id, deleted_by = auth.user_id, "Lecturer deleted");
    Ok(Json(StatusResponse::success(format!(
        "Lecturer {} deleted",
        id
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_flags_parsing() {
        let both = InfoFlags::parse(Some("comments,mark")).unwrap();
        assert!(both.comments && both.marks);

        let none = InfoFlags::parse(None).unwrap();
        assert!(!none.comments && !none.marks);

        assert!(InfoFlags::parse(Some("comments,likes")).is_err());
    }
}
