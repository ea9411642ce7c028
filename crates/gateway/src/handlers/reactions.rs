//! Reaction toggle handlers
//!
//! PUT semantics: the same call flips the reaction on, swaps it, or
//! removes it, depending on what the user had before.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::handlers::comments::CommentResponse;
use crate::AppState;
use lectorate_common::{
    auth::AuthContext,
    db::models::ReactionKind,
    db::Repository,
    errors::Result,
    metrics,
};

/// Toggle a like on a comment
pub async fn like_comment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(uuid): Path<Uuid>,
) -> Result<Json<CommentResponse>> {
    react(state, auth, uuid, ReactionKind::Like).await
}

/// Toggle a dislike on a comment
pub async fn dislike_comment(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(uuid): Path<Uuid>,
) -> Result<Json<CommentResponse>> {
    react(state, auth, uuid, ReactionKind::Dislike).await
}

async fn react(
    state: AppState,
    auth: AuthContext,
    uuid: Uuid,
    kind: ReactionKind,
) -> Result<Json<CommentResponse>> {
    let repo = Repository::new(state.db.clone());
    let view = repo.react(auth.user_id, uuid, kind).await?;

    metrics::record_reaction(kind.as_str());
    tracing::debug!(
        comment_uuid = %uuid,
        user_id = auth.user_id,
        kind = kind.as_str(),
        like_count = view.like_count,
        dislike_count = view.dislike_count,
        "Reaction toggled"
    );

    Ok(Json(view.into()))
}
