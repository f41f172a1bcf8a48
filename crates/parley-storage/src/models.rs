// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types and timestamp encoding for the `turns` table.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use parley_core::{ParleyError, Role, Turn, UserId};

/// A `turns` row as stored, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRow {
    pub id: i64,
    pub user_id: String,
    pub role: String,
    pub content: String,
    pub created_at: String,
}

impl TurnRow {
    /// Decodes the row into a [`Turn`]. `content` is taken as-is.
    pub fn into_turn(self) -> Result<Turn, ParleyError> {
        let role = Role::from_str(&self.role).map_err(|e| ParleyError::Storage {
            source: format!("turn {} has invalid role `{}`: {e}", self.id, self.role).into(),
        })?;
        Ok(Turn {
            user_id: UserId(self.user_id),
            role,
            content: self.content,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

/// Fixed-width UTC encoding; lexicographic order equals chronological order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, ParleyError> {
    DateTime::parse_from_rfc3339(s)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| ParleyError::Storage {
            source: Box::new(e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_are_fixed_width_and_sortable() {
        let a = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let b = a + chrono::Duration::microseconds(1);
        let (fa, fb) = (format_timestamp(&a), format_timestamp(&b));
        assert_eq!(fa, "2026-01-02T03:04:05.000000Z");
        assert_eq!(fa.len(), fb.len());
        assert!(fa < fb);
        assert_eq!(parse_timestamp(&fb).unwrap(), b);
    }

    #[test]
    fn invalid_role_is_a_storage_error() {
        let row = TurnRow {
            id: 1,
            user_id: "u".into(),
            role: "system".into(),
            content: "x".into(),
            created_at: "2026-01-02T03:04:05.000000Z".into(),
        };
        assert!(matches!(row.into_turn(), Err(ParleyError::Storage { .. })));
    }
}
