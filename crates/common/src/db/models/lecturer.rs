//! Lecturer entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lecturer")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(column_type = "Text")]
    pub first_name: String,

    #[sea_orm(column_type = "Text")]
    pub last_name: String,

    #[sea_orm(column_type = "Text")]
    pub middle_name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub avatar_link: Option<String>,

    /// External timetable reference; unique among non-deleted lecturers
    /// (partial unique index, enforced in the migration)
    pub timetable_id: i64,

    pub is_deleted: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,

    #[sea_orm(has_many = "super::lecturer_user_comment::Entity")]
    SubmissionActivity,

    #[sea_orm(has_one = "super::lecturer_rating::Entity")]
    CachedRanking,
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::lecturer_user_comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SubmissionActivity.def()
    }
}

impl Related<super::lecturer_rating::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CachedRanking.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
