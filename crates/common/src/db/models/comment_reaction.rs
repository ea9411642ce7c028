//! Comment reaction entity
//!
//! At most one reaction per (user, comment) pair, enforced by a unique
//! index. Cascades with its comment.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Reaction kind
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    #[sea_orm(string_value = "like")]
    Like,
    #[sea_orm(string_value = "dislike")]
    Dislike,
}

impl ReactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Like => "like",
            ReactionKind::Dislike => "dislike",
        }
    }

    /// Stored reaction after a toggle request, given the viewer's
    /// current one. Repeating the same kind clears it, anything else
    /// sets the requested kind.
    pub fn toggle(current: Option<ReactionKind>, requested: ReactionKind) -> Option<ReactionKind> {
        match current {
            Some(existing) if existing == requested => None,
            _ => Some(requested),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comment_reaction")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub uuid: Uuid,

    pub user_id: i64,

    pub comment_uuid: Uuid,

    pub reaction: ReactionKind,

    pub created_at: DateTimeUtc,

    pub edited_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::comment::Entity",
        from = "Column::CommentUuid",
        to = "super::comment::Column::Uuid",
        on_delete = "Cascade"
    )]
    Comment,
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_state_table() {
        use ReactionKind::{Dislike, Like};

        // No reaction yet: the requested kind is set
        assert_eq!(ReactionKind::toggle(None, Like), Some(Like));
        assert_eq!(ReactionKind::toggle(None, Dislike), Some(Dislike));

        // Same kind again: cleared
        assert_eq!(ReactionKind::toggle(Some(Like), Like), None);
        assert_eq!(ReactionKind::toggle(Some(Dislike), Dislike), None);

        // Opposite kind: swapped, never both at once
        assert_eq!(ReactionKind::toggle(Some(Like), Dislike), Some(Dislike));
        assert_eq!(ReactionKind::toggle(Some(Dislike), Like), Some(Like));
    }
}
