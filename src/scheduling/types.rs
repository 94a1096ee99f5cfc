/// Domain types shared by the scheduling engine

use chrono::NaiveTime;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};
use std::fmt;

// Type aliases for clarity
pub type InstructorId = i64;
pub type OfferingId = i64;
pub type RequestId = i64;
pub type RoomId = i64;
pub type SlotId = i64;
pub type BlockId = i64;

/// A weekday as used in preferences, working-day lists, and block cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    pub fn as_str(&self) -> &'static str {
        match self {
            Day::Monday => "monday",
            Day::Tuesday => "tuesday",
            Day::Wednesday => "wednesday",
            Day::Thursday => "thursday",
            Day::Friday => "friday",
            Day::Saturday => "saturday",
            Day::Sunday => "sunday",
        }
    }

    pub fn parse(s: &str) -> Option<Day> {
        match s {
            "monday" => Some(Day::Monday),
            "tuesday" => Some(Day::Tuesday),
            "wednesday" => Some(Day::Wednesday),
            "thursday" => Some(Day::Thursday),
            "friday" => Some(Day::Friday),
            "saturday" => Some(Day::Saturday),
            "sunday" => Some(Day::Sunday),
            _ => None,
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for Day {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Day {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        Day::parse(s).ok_or(FromSqlError::InvalidType)
    }
}

/// Room categories; lab offerings are only placed in lab rooms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    Lecture,
    Lab,
    Seminar,
}

impl RoomKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomKind::Lecture => "lecture",
            RoomKind::Lab => "lab",
            RoomKind::Seminar => "seminar",
        }
    }

    pub fn parse(s: &str) -> Option<RoomKind> {
        match s {
            "lecture" => Some(RoomKind::Lecture),
            "lab" => Some(RoomKind::Lab),
            "seminar" => Some(RoomKind::Seminar),
            _ => None,
        }
    }
}

impl ToSql for RoomKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for RoomKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        RoomKind::parse(s).ok_or(FromSqlError::InvalidType)
    }
}

/// Lifecycle of a course request: pending until claimed, accepted until
/// undone or reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
        }
    }
}

impl ToSql for RequestStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for RequestStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "pending" => Ok(RequestStatus::Pending),
            "accepted" => Ok(RequestStatus::Accepted),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// Preference payload bound to a request at acceptance time.
///
/// `days` and `slot_ids` keep the order the instructor supplied; the planner
/// consumes them day-major and places one block per declared slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotPreferences {
    pub days: Vec<Day>,
    pub slot_ids: Vec<SlotId>,
}

impl SlotPreferences {
    /// Every (day, slot) pair the payload selects, day-major order.
    pub fn cells(&self) -> impl Iterator<Item = (Day, SlotId)> + '_ {
        self.days
            .iter()
            .flat_map(|day| self.slot_ids.iter().map(move |slot| (*day, *slot)))
    }
}

/// Operating-hours configuration driving slot generation. Loaded explicitly
/// per invocation; never treated as ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingsSpec {
    pub opening_time: NaiveTime,
    pub closing_time: NaiveTime,
    pub slot_minutes: u32,
    pub break_minutes: u32,
    pub working_days: Vec<Day>,
    pub shift: String,
}

/// Scope selector for bulk state clearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetScope {
    Slots,
    Assignments,
    Full,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_round_trip() {
        for day in [
            Day::Monday,
            Day::Tuesday,
            Day::Wednesday,
            Day::Thursday,
            Day::Friday,
            Day::Saturday,
            Day::Sunday,
        ] {
            assert_eq!(Day::parse(day.as_str()), Some(day));
        }
        assert_eq!(Day::parse("MONDAY"), None);
    }

    #[test]
    fn test_preference_cells_day_major() {
        let prefs = SlotPreferences {
            days: vec![Day::Monday, Day::Tuesday],
            slot_ids: vec![1, 2],
        };
        let cells: Vec<_> = prefs.cells().collect();
        assert_eq!(
            cells,
            vec![
                (Day::Monday, 1),
                (Day::Monday, 2),
                (Day::Tuesday, 1),
                (Day::Tuesday, 2),
            ]
        );
    }
}
