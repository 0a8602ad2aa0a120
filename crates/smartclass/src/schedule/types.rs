//! Records exchanged with the timetable service.
//!
//! Field names follow the service's snake_case JSON. Display fields the
//! service fills from lookups fall back to the same placeholders it uses
//! (`"Unknown"`, `"N/A"`) so a raw, un-enriched entry still decodes.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

/// Zero-padded 24h wall-clock value, e.g. `09:00` or `23:59`.
static CLOCK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[01]\d|2[0-3]):[0-5]\d$").unwrap());
/// Slot key form, e.g. `11:15-12:15`.
static SLOT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2}:\d{2})-(\d{2}:\d{2})$").unwrap());

/// Canonical slot bounds shown by the grid view. The gaps at 11:00-11:15 and
/// 13:15-14:00 are breaks, not missing data.
pub const CANONICAL_SLOTS: [(&str, &str); 7] = [
    ("09:00", "10:00"),
    ("10:00", "11:00"),
    ("11:15", "12:15"),
    ("12:15", "13:15"),
    ("14:00", "15:00"),
    ("15:00", "16:00"),
    ("16:00", "17:00"),
];

/// Teaching day. There are no Sunday classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Day {
    /// Canonical day order.
    pub const ALL: [Day; 6] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
            Day::Saturday => "Saturday",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised when validating clock values and slot bounds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    #[error("`{value}` is not a zero-padded HH:MM clock time")]
    InvalidClock { value: String },

    #[error("interval {start}-{end} does not end after it starts")]
    EmptyInterval { start: String, end: String },

    #[error("`{value}` is not a slot of the form HH:MM-HH:MM")]
    InvalidSlot { value: String },
}

/// Returns true if `value` is a zero-padded 24h `HH:MM` time.
pub fn is_clock_time(value: &str) -> bool {
    CLOCK_REGEX.is_match(value)
}

fn check_interval(start: &str, end: &str) -> Result<(), EntryError> {
    for value in [start, end] {
        if !is_clock_time(value) {
            return Err(EntryError::InvalidClock {
                value: value.to_string(),
            });
        }
    }
    // Zero-padded HH:MM compares correctly as plain strings.
    if start >= end {
        return Err(EntryError::EmptyInterval {
            start: start.to_string(),
            end: end.to_string(),
        });
    }
    Ok(())
}

/// A time interval used as a grid column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: String,
    pub end: String,
}

impl TimeSlot {
    /// Creates a slot, checking both bounds.
    pub fn new(start: &str, end: &str) -> Result<Self, EntryError> {
        check_interval(start, end)?;
        Ok(Self {
            start: start.to_string(),
            end: end.to_string(),
        })
    }

    /// Parses the `HH:MM-HH:MM` key form.
    pub fn parse(key: &str) -> Result<Self, EntryError> {
        let caps = SLOT_REGEX
            .captures(key.trim())
            .ok_or_else(|| EntryError::InvalidSlot {
                value: key.to_string(),
            })?;
        Self::new(&caps[1], &caps[2])
    }

    /// The canonical slot list, in display order.
    pub fn canonical() -> Vec<TimeSlot> {
        CANONICAL_SLOTS
            .iter()
            .map(|(start, end)| TimeSlot {
                start: start.to_string(),
                end: end.to_string(),
            })
            .collect()
    }

    pub fn key(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

fn unknown() -> String {
    "Unknown".to_string()
}

fn not_available() -> String {
    "N/A".to_string()
}

/// One scheduled class occurrence for a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub batch_id: String,
    #[serde(default)]
    pub subject_id: String,
    #[serde(default)]
    pub time_slot_id: String,

    pub day: Day,
    pub start_time: String,
    pub end_time: String,

    #[serde(default = "not_available")]
    pub subject_code: String,
    #[serde(default = "unknown")]
    pub subject_name: String,
    pub faculty_id: String,
    #[serde(default = "unknown")]
    pub faculty_name: String,
    pub room_id: String,
    #[serde(default = "unknown")]
    pub room_name: String,
    #[serde(default = "unknown")]
    pub room_type: String,
}

impl ScheduleEntry {
    /// Checks the clock format of both bounds and that the entry ends after
    /// it starts.
    pub fn validate(&self) -> Result<(), EntryError> {
        check_interval(&self.start_time, &self.end_time)
    }

    /// Key used to match the entry against a grid slot.
    pub fn slot_key(&self) -> String {
        format!("{}-{}", self.start_time, self.end_time)
    }

    /// Two entries overlap when they share a day and their half-open
    /// `[start, end)` intervals intersect.
    pub fn overlaps(&self, other: &ScheduleEntry) -> bool {
        self.day == other.day
            && self.start_time < other.end_time
            && other.start_time < self.end_time
    }
}

/// A cohort of students sharing a department, semester and timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,
    pub name: String,
    pub department: String,
    pub semester: u8,
    #[serde(default)]
    pub student_count: u32,
    /// Subject ids taught to this batch
    #[serde(default)]
    pub subjects: Vec<String>,
}

/// Classification of an assignment against the current time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentStatus {
    Active,
    Overdue,
}

/// Assignment listed for a batch, enriched with subject and faculty names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "flexible_utc")]
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub batch_id: String,
    #[serde(default = "unknown")]
    pub subject_name: String,
    #[serde(default = "not_available")]
    pub subject_code: String,
    #[serde(default = "unknown")]
    pub faculty_name: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "flexible_utc::optional"
    )]
    pub created_at: Option<DateTime<Utc>>,
}

impl Assignment {
    /// Active while the due date is still ahead of `now`.
    pub fn status(&self, now: DateTime<Utc>) -> AssignmentStatus {
        if self.due_date > now {
            AssignmentStatus::Active
        } else {
            AssignmentStatus::Overdue
        }
    }
}

/// A generated timetable covering every batch of a department and semester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timetable {
    pub id: String,
    pub name: String,
    pub department: String,
    pub semester: u8,
    #[serde(default)]
    pub entries: Vec<ScheduleEntry>,
    #[serde(with = "flexible_utc")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub capacity: u32,
    /// "Classroom", "Laboratory" or "Auditorium"
    pub room_type: String,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default = "available")]
    pub available: bool,
}

fn available() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faculty {
    pub id: String,
    pub name: String,
    pub department: String,
    /// Subject ids this member can teach
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub max_hours_per_day: u32,
    #[serde(default)]
    pub max_hours_per_week: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubjectType {
    Theory,
    Practical,
    Tutorial,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub code: String,
    pub department: String,
    pub semester: u8,
    pub subject_type: SubjectType,
    #[serde(default)]
    pub hours_per_week: u32,
    #[serde(default)]
    pub requires_lab: bool,
}

/// Timestamps arrive either as RFC 3339 with an offset or as naive ISO
/// timestamps once the service has round-tripped them through storage.
/// Naive values are UTC.
pub(crate) mod flexible_utc {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Ok(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|e| format!("unrecognized timestamp `{raw}`: {e}"))
    }

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub mod optional {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(value) => super::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| super::parse(&raw).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
