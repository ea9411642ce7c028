//! Cached ranking snapshot entity
//!
//! Overwritten wholesale by the external analytics pipeline; this service
//! only reads it, apart from the generic upsert used by cache hydration.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lecturer_rating")]
pub struct Model {
    /// Lecturer identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i64,

    /// Weighted lecturer mark, computed downstream
    pub mark_weighted: Option<f64>,

    pub mark_kindness_weighted: Option<f64>,

    pub mark_clarity_weighted: Option<f64>,

    pub mark_freebie_weighted: Option<f64>,

    /// Position in the global ranking, computed downstream
    pub rank: Option<i64>,

    pub update_ts: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::lecturer::Entity",
        from = "Column::Id",
        to = "super::lecturer::Column::Id"
    )]
    Lecturer,
}

impl Related<super::lecturer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lecturer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
