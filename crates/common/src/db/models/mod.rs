//! SeaORM entity models
//!
//! Database entities for the rating engine

mod comment;
mod comment_reaction;
mod lecturer;
mod lecturer_rating;
mod lecturer_user_comment;

pub use lecturer::{
    ActiveModel as LecturerActiveModel,
    Column as LecturerColumn,
    Entity as LecturerEntity,
    Model as Lecturer,
};

pub use comment::{
    ActiveModel as CommentActiveModel,
    Column as CommentColumn,
    Entity as CommentEntity,
    Model as Comment,
    ReviewStatus,
};

pub use comment_reaction::{
    ActiveModel as CommentReactionActiveModel,
    Column as CommentReactionColumn,
    Entity as CommentReactionEntity,
    Model as CommentReaction,
    ReactionKind,
};

pub use lecturer_user_comment::{
    ActiveModel as SubmissionActivityActiveModel,
    Column as SubmissionActivityColumn,
    Entity as SubmissionActivityEntity,
    Model as SubmissionActivity,
};

pub use lecturer_rating::{
    ActiveModel as CachedRankingActiveModel,
    Column as CachedRankingColumn,
    Entity as CachedRankingEntity,
    Model as CachedRanking,
};
