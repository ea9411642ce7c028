//! Typed search/filter/sort parameters
//!
//! Sort keys are closed enums resolved to SQL expressions through an
//! explicit table; unknown keys and multi-key requests are rejected at
//! the boundary instead of failing inside the query layer.

use crate::errors::{AppError, Result};
use std::str::FromStr;

/// Sort direction; listings default to descending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl Default for SortDirection {
    fn default() -> Self {
        SortDirection::Desc
    }
}

impl SortDirection {
    pub fn from_asc_order(asc_order: bool) -> Self {
        if asc_order { SortDirection::Asc } else { SortDirection::Desc }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Sort keys accepted by the lecturer listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LecturerSort {
    MarkWeighted,
    MarkKindness,
    MarkFreebie,
    MarkClarity,
    MarkGeneral,
    Rank,
    LastName,
}

impl LecturerSort {
    /// Column alias inside the lecturer stats query
    pub fn as_sql(&self) -> &'static str {
        match self {
            LecturerSort::MarkWeighted => "mark_weighted",
            LecturerSort::MarkKindness => "mark_kindness",
            LecturerSort::MarkFreebie => "mark_freebie",
            LecturerSort::MarkClarity => "mark_clarity",
            LecturerSort::MarkGeneral => "mark_general",
            LecturerSort::Rank => "rank",
            LecturerSort::LastName => "last_name",
        }
    }
}

impl FromStr for LecturerSort {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mark_weighted" => Ok(LecturerSort::MarkWeighted),
            "mark_kindness" => Ok(LecturerSort::MarkKindness),
            "mark_freebie" => Ok(LecturerSort::MarkFreebie),
            "mark_clarity" => Ok(LecturerSort::MarkClarity),
            "mark_general" => Ok(LecturerSort::MarkGeneral),
            "rank" => Ok(LecturerSort::Rank),
            "last_name" => Ok(LecturerSort::LastName),
            other => Err(AppError::Validation {
                message: format!(
                    "Unknown sort key '{other}'. Allowed: mark_weighted, mark_kindness, \
                     mark_freebie, mark_clarity, mark_general, rank, last_name"
                ),
            }),
        }
    }
}

/// Sort keys accepted by the comment listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentSort {
    CreateTs,
    MarkGeneral,
    LikeDiff,
}

impl CommentSort {
    /// Column alias inside the comment aggregate query
    pub fn as_sql(&self) -> &'static str {
        match self {
            CommentSort::CreateTs => "create_ts",
            CommentSort::MarkGeneral => "mark_general",
            CommentSort::LikeDiff => "like_diff",
        }
    }
}

impl FromStr for CommentSort {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "create_ts" => Ok(CommentSort::CreateTs),
            "mark_general" => Ok(CommentSort::MarkGeneral),
            "like_diff" => Ok(CommentSort::LikeDiff),
            other => Err(AppError::Validation {
                message: format!(
                    "Unknown sort key '{other}'. Allowed: create_ts, mark_general, like_diff"
                ),
            }),
        }
    }
}

/// Parse the `order_by` query parameter into at most one sort key.
///
/// Exactly one key is supported per request; passing several is a
/// validation error, not a silent pick-first.
pub fn parse_single_sort<T>(raw: Option<&str>) -> Result<Option<T>>
where
    T: FromStr<Err = AppError>,
{
    let Some(raw) = raw else { return Ok(None) };
    let keys: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .collect();
    match keys.as_slice() {
        [] => Ok(None),
        [single] => single.parse().map(Some),
        _ => Err(AppError::Validation {
            message: "Exactly one sort key is supported per request".to_string(),
        }),
    }
}

/// Split a name query into lowercase tokens.
///
/// Every token must match at least one of the three name fields; the
/// AND-across-tokens, OR-across-fields predicate is assembled in SQL.
pub fn name_tokens(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|t| t.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_lecturer_sort_keys() {
        assert_eq!("mark_weighted".parse::<LecturerSort>().unwrap(), LecturerSort::MarkWeighted);
        assert_eq!("rank".parse::<LecturerSort>().unwrap(), LecturerSort::Rank);
        assert_eq!("last_name".parse::<LecturerSort>().unwrap(), LecturerSort::LastName);
    }

    #[test]
    fn test_unknown_sort_key_rejected() {
        assert!("uuid; DROP TABLE lecturer".parse::<LecturerSort>().is_err());
        assert!("first_name".parse::<LecturerSort>().is_err());
        assert!("".parse::<CommentSort>().is_err());
    }

    #[test]
    fn test_single_sort_enforced() {
        let one: Option<CommentSort> = parse_single_sort(Some("create_ts")).unwrap();
        assert_eq!(one, Some(CommentSort::CreateTs));

        let none: Option<CommentSort> = parse_single_sort(None).unwrap();
        assert_eq!(none, None);

        let err = parse_single_sort::<CommentSort>(Some("create_ts,like_diff"));
        assert!(err.is_err());
    }

    #[test]
    fn test_name_tokenization() {
        assert_eq!(name_tokens("  Иванов  Иван "), vec!["иванов", "иван"]);
        assert_eq!(name_tokens("Smith"), vec!["smith"]);
        assert!(name_tokens("   ").is_empty());
    }

    #[test]
    fn test_direction_mapping() {
        assert_eq!(SortDirection::from_asc_order(true).as_sql(), "ASC");
        assert_eq!(SortDirection::from_asc_order(false).as_sql(), "DESC");
    }
}
