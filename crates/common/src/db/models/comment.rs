//! Comment entity
//!
//! Keyed by UUID so moderation and edit links stay stable across
//! soft-delete. `mark_general` is derived, never stored.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Moderation state of a comment
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "dismissed")]
    Dismissed,
}

impl ReviewStatus {
    /// Parse a moderator decision. Only APPROVED and DISMISSED are
    /// reachable through review; PENDING is entry-only and restored
    /// solely by an author edit.
    pub fn review_target(raw: &str) -> Option<ReviewStatus> {
        match raw {
            "approved" => Some(ReviewStatus::Approved),
            "dismissed" => Some(ReviewStatus::Dismissed),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,

    /// Author; `None` means the comment was left anonymously
    pub user_id: Option<i64>,

    pub create_ts: DateTimeUtc,

    pub update_ts: DateTimeUtc,

    #[sea_orm(column_type = "Text", nullable)]
    pub subject: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub text: String,

    pub mark_kindness: i32,

    pub mark_freebie: i32,

    pub mark_clarity: i32,

    /// Moderator who last reviewed this comment
    pub approved_by: Option<i64>,

    pub lecturer_id: i64,

    pub review_status: ReviewStatus,

    pub is_deleted: bool,
}

impl Model {
    /// Derived arithmetic mean of the three marks
    pub fn mark_general(&self) -> f64 {
        crate::scoring::mark_general(self.mark_kindness, self.mark_freebie, self.mark_clarity)
    }

    /// Visible in public listings iff approved and not soft-deleted
    pub fn is_public(&self) -> bool {
        self.review_status == ReviewStatus::Approved && !self.is_deleted
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::lecturer::Entity",
        from = "Column::LecturerId",
        to = "super::lecturer::Column::Id"
    )]
    Lecturer,

    #[sea_orm(has_many = "super::comment_reaction::Entity", on_delete = "Cascade")]
    Reactions,
}

impl Related<super::lecturer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lecturer.def()
    }
}

impl Related<super::comment_reaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn comment(k: i32, f: i32, c: i32, status: ReviewStatus, deleted: bool) -> Model {
        Model {
            uuid: Uuid::new_v4(),
            user_id: Some(1),
            create_ts: Utc::now(),
            update_ts: Utc::now(),
            subject: None,
            text: "text".into(),
            mark_kindness: k,
            mark_freebie: f,
            mark_clarity: c,
            approved_by: None,
            lecturer_id: 1,
            review_status: status,
            is_deleted: deleted,
        }
    }

    #[test]
    fn test_mark_general_tracks_edits() {
        let mut m = comment(1, 1, 1, ReviewStatus::Pending, false);
        assert_eq!(m.mark_general(), 1.0);
        m.mark_freebie = -2;
        assert!((m.mark_general() - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_moderation_transition_table() {
        // Reviewers can move a comment to exactly two states,
        // regardless of where it currently sits
        assert_eq!(
            ReviewStatus::review_target("approved"),
            Some(ReviewStatus::Approved)
        );
        assert_eq!(
            ReviewStatus::review_target("dismissed"),
            Some(ReviewStatus::Dismissed)
        );

        // PENDING is not a review decision, and unknown inputs are
        // rejected rather than defaulted
        assert_eq!(ReviewStatus::review_target("pending"), None);
        assert_eq!(ReviewStatus::review_target("deleted"), None);
        assert_eq!(ReviewStatus::review_target("Approved"), None);
        assert_eq!(ReviewStatus::review_target(""), None);
    }

    #[test]
    fn test_public_visibility_rule() {
        assert!(comment(0, 0, 0, ReviewStatus::Approved, false).is_public());
        assert!(!comment(0, 0, 0, ReviewStatus::Pending, false).is_public());
        assert!(!comment(0, 0, 0, ReviewStatus::Dismissed, false).is_public());
        assert!(!comment(0, 0, 0, ReviewStatus::Approved, true).is_public());
    }
}
