//! Versioned session state owned by the orchestrator.
//!
//! Every fetch is tagged with the version it was issued under. Student
//! fetches carry `selection_version`, admin refreshes carry `admin_epoch`.
//! A result lands only while its version is still current.

use crate::schedule::{Assignment, Batch, Faculty, Room, ScheduleEntry, Subject, Timetable};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    Landing,
    Admin,
    Student,
}

/// Freshness of one view's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViewStatus {
    /// Never loaded, or the last load failed with nothing to fall back on
    Empty,
    /// A fetch is in flight
    Loading,
    Fresh,
    /// The last refresh failed; the data shown is from an earlier fetch
    Stale,
}

/// Immutable data from one fetch plus its freshness.
#[derive(Debug, Clone)]
pub struct Snapshot<T> {
    data: Arc<T>,
    status: ViewStatus,
    fetched_at: Option<DateTime<Utc>>,
}

impl<T: Default> Default for Snapshot<T> {
    fn default() -> Self {
        Self {
            data: Arc::new(T::default()),
            status: ViewStatus::Empty,
            fetched_at: None,
        }
    }
}

impl<T: Default> Snapshot<T> {
    pub fn data(&self) -> Arc<T> {
        Arc::clone(&self.data)
    }

    pub fn status(&self) -> ViewStatus {
        self.status
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }

    /// Swaps in the result of a successful fetch.
    pub fn replace(&mut self, data: T) {
        self.data = Arc::new(data);
        self.status = ViewStatus::Fresh;
        self.fetched_at = Some(Utc::now());
    }

    /// Drops the data and waits for a fetch for a different subject.
    pub fn reset_loading(&mut self) {
        *self = Self {
            status: ViewStatus::Loading,
            ..Self::default()
        };
    }

    /// Keeps the data while a refresh of the same subject is in flight.
    pub fn mark_loading(&mut self) {
        self.status = ViewStatus::Loading;
    }

    /// Records a failed fetch without touching the data.
    pub fn mark_failed(&mut self) {
        self.status = if self.fetched_at.is_some() {
            ViewStatus::Stale
        } else {
            ViewStatus::Empty
        };
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Schedule of the selected batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSchedule {
    pub entries: Vec<ScheduleEntry>,
    pub batch_info: Option<Batch>,
    /// False when the service has no active timetable for the batch
    pub generated: bool,
}

/// Everything the admin dashboard lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminInventory {
    pub rooms: Vec<Room>,
    pub faculty: Vec<Faculty>,
    pub subjects: Vec<Subject>,
    pub batches: Vec<Batch>,
    pub timetables: Vec<Timetable>,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub role: Role,
    /// Bumped on every batch selection change
    pub selection_version: u64,
    /// Bumped on every admin refresh
    pub admin_epoch: u64,
    /// Bumped on every roster load
    pub roster_epoch: u64,
    pub roster: Snapshot<Vec<Batch>>,
    pub selected_batch: Option<String>,
    pub timetable: Snapshot<BatchSchedule>,
    pub assignments: Snapshot<Vec<Assignment>>,
    pub admin: Snapshot<AdminInventory>,
    /// Admin target for generate and clear
    pub department: String,
    pub semester: u8,
}

impl SessionState {
    pub fn new(department: impl Into<String>, semester: u8) -> Self {
        Self {
            role: Role::Landing,
            selection_version: 0,
            admin_epoch: 0,
            roster_epoch: 0,
            roster: Snapshot::default(),
            selected_batch: None,
            timetable: Snapshot::default(),
            assignments: Snapshot::default(),
            admin: Snapshot::default(),
            department: department.into(),
            semester,
        }
    }

    pub fn in_roster(&self, batch_id: &str) -> bool {
        self.roster.data.iter().any(|batch| batch.id == batch_id)
    }

    pub fn selected(&self) -> Option<Batch> {
        let id = self.selected_batch.as_deref()?;
        self.roster.data.iter().find(|batch| batch.id == id).cloned()
    }

    /// Stores a fresh roster and returns the batch that should be selected:
    /// the current one if it is still listed, else the first, else none.
    pub fn apply_roster(&mut self, batches: Vec<Batch>) -> Option<String> {
        let keep = self
            .selected_batch
            .as_ref()
            .filter(|id| batches.iter().any(|batch| &batch.id == *id))
            .cloned();
        let next = keep.or_else(|| batches.first().map(|batch| batch.id.clone()));
        self.roster.replace(batches);
        next
    }

    /// Switches the selection and invalidates every student fetch still in
    /// flight. Returns the new selection version.
    ///
    /// Re-selecting the current batch keeps its data on screen while the
    /// refetch runs; any other batch starts from empty views.
    pub fn begin_selection(&mut self, batch_id: Option<String>) -> u64 {
        self.selection_version += 1;
        match (&batch_id, &self.selected_batch) {
            (Some(next), Some(current)) if next == current => {
                self.timetable.mark_loading();
                self.assignments.mark_loading();
            }
            (Some(_), _) => {
                self.timetable.reset_loading();
                self.assignments.reset_loading();
            }
            (None, _) => {
                self.timetable.clear();
                self.assignments.clear();
            }
        }
        self.selected_batch = batch_id;
        self.selection_version
    }

    pub fn is_current(&self, version: u64) -> bool {
        self.selection_version == version
    }

    /// Starts an admin refresh. Returns the epoch the results must match.
    pub fn begin_admin_refresh(&mut self) -> u64 {
        self.admin_epoch += 1;
        self.admin.mark_loading();
        self.admin_epoch
    }

    pub fn is_current_admin(&self, epoch: u64) -> bool {
        self.admin_epoch == epoch
    }

    /// Starts a roster load. Returns the epoch the roster must match.
    pub fn begin_roster_load(&mut self) -> u64 {
        self.roster_epoch += 1;
        self.roster.mark_loading();
        self.roster_epoch
    }

    pub fn is_current_roster(&self, epoch: u64) -> bool {
        self.roster_epoch == epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(id: &str) -> Batch {
        Batch {
            id: id.to_string(),
            name: format!("CS-{id}"),
            department: "Computer Science".to_string(),
            semester: 3,
            student_count: 40,
            subjects: Vec::new(),
        }
    }

    #[test]
    fn test_snapshot_status_transitions() {
        let mut snapshot: Snapshot<Vec<u32>> = Snapshot::default();
        assert_eq!(snapshot.status(), ViewStatus::Empty);

        snapshot.mark_failed();
        assert_eq!(snapshot.status(), ViewStatus::Empty);

        snapshot.replace(vec![1, 2]);
        assert_eq!(snapshot.status(), ViewStatus::Fresh);
        assert!(snapshot.fetched_at().is_some());

        snapshot.mark_loading();
        snapshot.mark_failed();
        assert_eq!(snapshot.status(), ViewStatus::Stale);
        assert_eq!(*snapshot.data(), vec![1, 2]);

        snapshot.reset_loading();
        assert_eq!(snapshot.status(), ViewStatus::Loading);
        assert!(snapshot.data().is_empty());
    }

    #[test]
    fn test_roster_keeps_selection_or_falls_back_to_first() {
        let mut state = SessionState::new("Computer Science", 3);
        assert_eq!(
            state.apply_roster(vec![batch("a"), batch("b")]),
            Some("a".to_string())
        );

        state.begin_selection(Some("b".to_string()));
        assert_eq!(
            state.apply_roster(vec![batch("a"), batch("b")]),
            Some("b".to_string())
        );
        assert_eq!(state.apply_roster(vec![batch("c")]), Some("c".to_string()));
        assert_eq!(state.apply_roster(Vec::new()), None);
    }

    #[test]
    fn test_new_selection_invalidates_older_versions() {
        let mut state = SessionState::new("Computer Science", 3);
        let first = state.begin_selection(Some("a".to_string()));
        let second = state.begin_selection(Some("b".to_string()));

        assert!(!state.is_current(first));
        assert!(state.is_current(second));
        assert_eq!(state.timetable.status(), ViewStatus::Loading);

        state.begin_selection(None);
        assert_eq!(state.timetable.status(), ViewStatus::Empty);
        assert!(state.selected_batch.is_none());
    }

    #[test]
    fn test_roster_epochs_supersede_each_other() {
        let mut state = SessionState::new("Computer Science", 3);
        let older = state.begin_roster_load();
        let newer = state.begin_roster_load();
        assert!(!state.is_current_roster(older));
        assert!(state.is_current_roster(newer));
        assert_eq!(state.roster.status(), ViewStatus::Loading);
    }
}
