//! Read-only views built from one consistent state snapshot.

use super::state::{AdminInventory, BatchSchedule, ViewStatus};
use crate::schedule::{
    agenda, derive_faculty, derive_rooms, name_discrepancies, synthesize_canonical, Assignment,
    AssignmentStatus, Batch, DayAgenda, FacultySummary, Grid, NameDiscrepancy, RoomSummary,
    ScheduleEntry, Timetable,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedAssignment {
    pub assignment: Assignment,
    pub status: AssignmentStatus,
}

/// Everything the student dashboard shows for the selected batch.
#[derive(Debug, Clone, Serialize)]
pub struct StudentView {
    pub batch: Option<Batch>,
    pub grid: Grid,
    pub faculty: Vec<FacultySummary>,
    pub rooms: Vec<RoomSummary>,
    pub agenda: Vec<DayAgenda>,
    pub assignments: Vec<ClassifiedAssignment>,
    pub timetable_status: ViewStatus,
    pub assignments_status: ViewStatus,
    /// False when the batch has no active timetable yet
    pub generated: bool,
    pub discrepancies: Vec<NameDiscrepancy>,
}

impl StudentView {
    pub(crate) fn build(
        batch: Option<Batch>,
        schedule: &BatchSchedule,
        timetable_status: ViewStatus,
        assignments: &[Assignment],
        assignments_status: ViewStatus,
        now: DateTime<Utc>,
    ) -> Self {
        let entries = &schedule.entries;
        Self {
            batch: batch.or_else(|| schedule.batch_info.clone()),
            grid: synthesize_canonical(entries),
            faculty: derive_faculty(entries),
            rooms: derive_rooms(entries),
            agenda: agenda(entries),
            assignments: assignments
                .iter()
                .map(|assignment| ClassifiedAssignment {
                    status: assignment.status(now),
                    assignment: assignment.clone(),
                })
                .collect(),
            timetable_status,
            assignments_status,
            generated: schedule.generated,
            discrepancies: name_discrepancies(entries),
        }
    }

    pub fn active_assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.with_status(AssignmentStatus::Active)
    }

    pub fn overdue_assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.with_status(AssignmentStatus::Overdue)
    }

    fn with_status(&self, status: AssignmentStatus) -> impl Iterator<Item = &Assignment> {
        self.assignments
            .iter()
            .filter(move |a| a.status == status)
            .map(|a| &a.assignment)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InventoryCounts {
    pub rooms: usize,
    pub faculty: usize,
    pub subjects: usize,
    pub batches: usize,
    pub timetables: usize,
}

/// Grid statistics for one generated timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimetableSummary {
    pub id: String,
    pub name: String,
    pub department: String,
    pub semester: u8,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub entries: usize,
    pub batches: usize,
    /// Cells holding an entry, summed over every batch grid
    pub placed: usize,
    pub unplaced: usize,
    pub conflicts: usize,
    pub overlaps: usize,
}

impl TimetableSummary {
    /// A timetable covers every batch of its department, and different
    /// batches legitimately share a slot, so each batch gets its own grid.
    pub fn from_timetable(timetable: &Timetable) -> Self {
        let mut by_batch: BTreeMap<&str, Vec<ScheduleEntry>> = BTreeMap::new();
        for entry in &timetable.entries {
            by_batch
                .entry(entry.batch_id.as_str())
                .or_default()
                .push(entry.clone());
        }

        let mut summary = Self {
            id: timetable.id.clone(),
            name: timetable.name.clone(),
            department: timetable.department.clone(),
            semester: timetable.semester,
            is_active: timetable.is_active,
            created_at: timetable.created_at,
            entries: timetable.entries.len(),
            batches: by_batch.len(),
            placed: 0,
            unplaced: 0,
            conflicts: 0,
            overlaps: 0,
        };
        for entries in by_batch.values() {
            let grid: Grid = synthesize_canonical(entries);
            summary.placed += grid.occupied_cells();
            summary.unplaced += grid.unplaced_count();
            summary.conflicts += grid.conflicts().len();
            summary.overlaps += grid.overlaps().len();
        }
        summary
    }
}

/// Admin dashboard: inventory counts and per-timetable statistics.
#[derive(Debug, Clone, Serialize)]
pub struct AdminView {
    pub counts: InventoryCounts,
    pub timetables: Vec<TimetableSummary>,
    /// Active timetable for the selected department and semester
    pub active: Option<TimetableSummary>,
    pub department: String,
    pub semester: u8,
    pub status: ViewStatus,
    pub discrepancies: Vec<NameDiscrepancy>,
}

impl AdminView {
    pub(crate) fn build(
        inventory: &AdminInventory,
        status: ViewStatus,
        department: &str,
        semester: u8,
    ) -> Self {
        let timetables: Vec<TimetableSummary> = inventory
            .timetables
            .iter()
            .map(TimetableSummary::from_timetable)
            .collect();
        let active = timetables
            .iter()
            .find(|t| t.is_active && t.department == department && t.semester == semester)
            .cloned();
        let all_entries: Vec<ScheduleEntry> = inventory
            .timetables
            .iter()
            .flat_map(|t| t.entries.iter().cloned())
            .collect();

        Self {
            counts: InventoryCounts {
                rooms: inventory.rooms.len(),
                faculty: inventory.faculty.len(),
                subjects: inventory.subjects.len(),
                batches: inventory.batches.len(),
                timetables: inventory.timetables.len(),
            },
            timetables,
            active,
            department: department.to_string(),
            semester,
            status,
            discrepancies: name_discrepancies(&all_entries),
        }
    }
}
