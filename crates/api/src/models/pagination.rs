//! Limit/offset paging shared by every list endpoint.

use serde::{Deserialize, Serialize};

/// A clamped page window.
///
/// A missing or non-positive limit falls back to [`Pagination::DEFAULT_LIMIT`];
/// larger limits are capped at [`Pagination::MAX_LIMIT`]. Negative offsets
/// become zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    pub const DEFAULT_LIMIT: i64 = 10;
    pub const MAX_LIMIT: i64 = 100;

    #[must_use]
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        let limit = match limit {
            Some(limit) if limit > 0 => limit.min(Self::MAX_LIMIT),
            _ => Self::DEFAULT_LIMIT,
        };
        Self {
            limit,
            offset: offset.unwrap_or(0).max(0),
        }
    }

    /// Offset and limit as `usize`, for slicing in-memory collections.
    #[must_use]
    pub fn bounds(&self) -> (usize, usize) {
        (
            usize::try_from(self.offset).unwrap_or(usize::MAX),
            usize::try_from(self.limit).unwrap_or(usize::MAX),
        )
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(None, None)
    }
}
