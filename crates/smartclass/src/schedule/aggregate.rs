/// Faculty and room summaries derived from a batch's schedule entries
use super::types::ScheduleEntry;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// A faculty member and the distinct subjects they teach in the entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacultySummary {
    pub faculty_id: String,
    pub faculty_name: String,
    /// Distinct subject names, in order of first appearance
    pub subjects: Vec<String>,
}

/// A room and the distinct subjects held in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSummary {
    pub room_id: String,
    pub room_name: String,
    pub room_type: String,
    /// Distinct subject names, in order of first appearance
    pub subjects: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiscrepancyScope {
    Faculty,
    Room,
}

/// Two entries share an id but disagree on a display field. The first
/// entry's value is the one kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameDiscrepancy {
    pub scope: DiscrepancyScope,
    pub id: String,
    pub field: &'static str,
    pub kept: String,
    pub seen: String,
}

/// Entries sharing one key, in first-appearance order.
struct Group<'a> {
    first: &'a ScheduleEntry,
    subjects: Vec<String>,
    seen_subjects: HashSet<&'a str>,
}

fn group_by<'a>(entries: &'a [ScheduleEntry], key: FieldAccessor) -> Vec<Group<'a>> {
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    let mut groups: Vec<Group<'a>> = Vec::new();

    for entry in entries {
        let slot = *index.entry(key(entry)).or_insert_with(|| {
            groups.push(Group {
                first: entry,
                subjects: Vec::new(),
                seen_subjects: HashSet::new(),
            });
            groups.len() - 1
        });

        let group = &mut groups[slot];
        if group.seen_subjects.insert(entry.subject_name.as_str()) {
            group.subjects.push(entry.subject_name.clone());
        }
    }

    groups
}

/// Deduplicates faculty by `faculty_id`.
///
/// Output follows the order in which each faculty id first appears. The first
/// entry for an id supplies `faculty_name`; later disagreements are logged.
pub fn derive_faculty(entries: &[ScheduleEntry]) -> Vec<FacultySummary> {
    for d in faculty_discrepancies(entries) {
        warn!(faculty_id = %d.id, kept = %d.kept, seen = %d.seen, "Inconsistent faculty name");
    }

    group_by(entries, faculty_id)
        .into_iter()
        .map(|group| FacultySummary {
            faculty_id: group.first.faculty_id.clone(),
            faculty_name: group.first.faculty_name.clone(),
            subjects: group.subjects,
        })
        .collect()
}

/// Deduplicates rooms by `room_id`, with the same ordering and first-wins
/// rules as [`derive_faculty`].
pub fn derive_rooms(entries: &[ScheduleEntry]) -> Vec<RoomSummary> {
    for d in room_discrepancies(entries) {
        warn!(
            room_id = %d.id,
            field = d.field,
            kept = %d.kept,
            seen = %d.seen,
            "Inconsistent room details"
        );
    }

    group_by(entries, room_id)
        .into_iter()
        .map(|group| RoomSummary {
            room_id: group.first.room_id.clone(),
            room_name: group.first.room_name.clone(),
            room_type: group.first.room_type.clone(),
            subjects: group.subjects,
        })
        .collect()
}

/// Every faculty and room display-field disagreement in `entries`.
pub fn name_discrepancies(entries: &[ScheduleEntry]) -> Vec<NameDiscrepancy> {
    let mut all = faculty_discrepancies(entries);
    all.extend(room_discrepancies(entries));
    all
}

fn faculty_discrepancies(entries: &[ScheduleEntry]) -> Vec<NameDiscrepancy> {
    collect_discrepancies(
        entries,
        DiscrepancyScope::Faculty,
        faculty_id,
        &[("faculty_name", faculty_name as FieldAccessor)],
    )
}

fn room_discrepancies(entries: &[ScheduleEntry]) -> Vec<NameDiscrepancy> {
    collect_discrepancies(
        entries,
        DiscrepancyScope::Room,
        room_id,
        &[
            ("room_name", room_name as FieldAccessor),
            ("room_type", room_type as FieldAccessor),
        ],
    )
}

type FieldAccessor = fn(&ScheduleEntry) -> &str;

fn faculty_id(e: &ScheduleEntry) -> &str {
    &e.faculty_id
}

fn faculty_name(e: &ScheduleEntry) -> &str {
    &e.faculty_name
}

fn room_id(e: &ScheduleEntry) -> &str {
    &e.room_id
}

fn room_name(e: &ScheduleEntry) -> &str {
    &e.room_name
}

fn room_type(e: &ScheduleEntry) -> &str {
    &e.room_type
}

fn collect_discrepancies(
    entries: &[ScheduleEntry],
    scope: DiscrepancyScope,
    key: FieldAccessor,
    fields: &[(&'static str, FieldAccessor)],
) -> Vec<NameDiscrepancy> {
    let mut first_seen: HashMap<&str, &ScheduleEntry> = HashMap::new();
    let mut found = Vec::new();

    for entry in entries {
        let first = *first_seen.entry(key(entry)).or_insert(entry);
        for &(field, value) in fields {
            let (kept, seen) = (value(first), value(entry));
            if kept != seen {
                found.push(NameDiscrepancy {
                    scope,
                    id: key(entry).to_string(),
                    field,
                    kept: kept.to_string(),
                    seen: seen.to_string(),
                });
            }
        }
    }

    found
}
