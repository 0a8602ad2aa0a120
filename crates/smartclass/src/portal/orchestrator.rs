//! Selection and fetch orchestration.
//!
//! The orchestrator owns the [`SessionState`] and is the only writer. Every
//! remote call is issued with the version it belongs to and its result is
//! applied only while that version is still current, so a slow reply for an
//! earlier selection can never overwrite a newer one.

use super::error::PortalError;
use super::notice::NoticeBoard;
use super::state::{AdminInventory, BatchSchedule, Role, SessionState};
use super::view::{AdminView, StudentView};
use crate::gateway::config::PortalConfig;
use crate::gateway::error::GatewayError;
use crate::gateway::{BatchTimetable, ClearResponse, Gateway, NO_ACTIVE_TIMETABLE};
use crate::schedule::{Assignment, Timetable};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::Rng;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// What happened to one fetch result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied { count: usize },
    /// The selection moved on before the result arrived
    Discarded,
    Failed(GatewayError),
}

/// Result of the two-fetch student refresh for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRefresh {
    pub batch_id: String,
    pub version: u64,
    pub timetable: FetchOutcome,
    pub assignments: FetchOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterOutcome {
    Selected(StudentRefresh),
    /// The roster has no batches, so nothing is selected
    Empty,
    /// A newer roster load started while this one was in flight
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// The id is not in the last fetched roster; nothing changed
    Unknown,
    Selected(StudentRefresh),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Applied,
    /// A newer admin refresh started while this one was in flight
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClearOutcome {
    Cleared {
        message: String,
        deleted_count: Option<u64>,
    },
    NothingToClear,
}

pub struct Orchestrator {
    gateway: Arc<dyn Gateway>,
    state: RwLock<SessionState>,
    notices: NoticeBoard,
}

impl Orchestrator {
    pub fn new(gateway: Arc<dyn Gateway>, config: &PortalConfig) -> Self {
        Self {
            gateway,
            state: RwLock::new(SessionState::new(
                config.default_department.clone(),
                config.default_semester,
            )),
            notices: NoticeBoard::new(config.notice_ttl()),
        }
    }

    pub fn notices(&self) -> &NoticeBoard {
        &self.notices
    }

    pub fn role(&self) -> Role {
        self.state.read().role
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.state.read().clone()
    }

    pub fn go_home(&self) {
        self.state.write().role = Role::Landing;
    }

    /// Switches to the admin dashboard and loads its lists.
    pub async fn enter_admin(&self) -> Result<RefreshOutcome, PortalError> {
        self.state.write().role = Role::Admin;
        self.refresh_admin().await
    }

    /// Fetches the five admin lists concurrently and applies them as one
    /// group. If any fetch fails the previous lists stay, marked stale.
    pub async fn refresh_admin(&self) -> Result<RefreshOutcome, PortalError> {
        self.require(Role::Admin)?;
        let correlation_id = generate_correlation_id();
        let epoch = self.state.write().begin_admin_refresh();
        let start = Instant::now();

        info!(
            correlation_id = %correlation_id,
            epoch,
            "Refreshing admin data"
        );

        let gateway = &self.gateway;
        let result = futures::try_join!(
            gateway.list_rooms(),
            gateway.list_faculty(),
            gateway.list_subjects(),
            gateway.list_batches(),
            gateway.list_timetables(),
        )
        .map(
            |(rooms, faculty, subjects, batches, timetables)| AdminInventory {
                rooms,
                faculty,
                subjects,
                batches,
                timetables,
            },
        );

        match self.apply_admin(epoch, result) {
            Some(Ok(())) => {
                info!(
                    correlation_id = %correlation_id,
                    epoch,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Admin data refreshed"
                );
                Ok(RefreshOutcome::Applied)
            }
            Some(Err(e)) => {
                error!(
                    correlation_id = %correlation_id,
                    epoch,
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Admin refresh failed"
                );
                self.notices.error(format!("Failed to load data: {e}"));
                Err(e.into())
            }
            None => {
                debug!(
                    correlation_id = %correlation_id,
                    epoch,
                    "Discarding superseded admin refresh"
                );
                Ok(RefreshOutcome::Discarded)
            }
        }
    }

    /// Switches to the student dashboard: reloads the roster, settles the
    /// selection and fetches its data.
    ///
    /// Only the latest roster load may touch the roster or the selection.
    pub async fn enter_student(&self) -> Result<RosterOutcome, PortalError> {
        let epoch = {
            let mut state = self.state.write();
            state.role = Role::Student;
            state.begin_roster_load()
        };

        let result = self.gateway.list_batches().await;

        let (batch_id, version) = {
            let mut state = self.state.write();
            if !state.is_current_roster(epoch) {
                debug!(
                    epoch,
                    current = state.roster_epoch,
                    "Discarding superseded roster load"
                );
                return Ok(RosterOutcome::Discarded);
            }
            match result {
                Ok(batches) => {
                    let next = state.apply_roster(batches);
                    let version = state.begin_selection(next.clone());
                    (next, version)
                }
                Err(e) => {
                    state.roster.mark_failed();
                    drop(state);
                    warn!(epoch, error = %e, "Failed to load batch roster");
                    self.notices.error(format!("Failed to load batches: {e}"));
                    return Err(e.into());
                }
            }
        };

        match batch_id {
            Some(batch_id) => Ok(RosterOutcome::Selected(
                self.fetch_student(&batch_id, version).await,
            )),
            None => {
                info!(epoch, "Roster is empty, nothing to select");
                Ok(RosterOutcome::Empty)
            }
        }
    }

    /// Selects a batch from the roster and fetches its timetable and
    /// assignments. Ids missing from the roster leave the selection as is.
    pub async fn select_batch(&self, batch_id: &str) -> Result<SelectOutcome, PortalError> {
        let version = {
            let mut state = self.state.write();
            if state.role != Role::Student {
                return Err(PortalError::WrongRole {
                    expected: Role::Student,
                    actual: state.role,
                });
            }
            if !state.in_roster(batch_id) {
                debug!(batch_id = %batch_id, "Ignoring selection of unknown batch");
                return Ok(SelectOutcome::Unknown);
            }
            state.begin_selection(Some(batch_id.to_string()))
        };

        Ok(SelectOutcome::Selected(
            self.fetch_student(batch_id, version).await,
        ))
    }

    pub fn select_department(&self, department: &str) -> Result<(), PortalError> {
        self.require(Role::Admin)?;
        self.state.write().department = department.to_string();
        Ok(())
    }

    pub fn select_semester(&self, semester: u8) -> Result<(), PortalError> {
        self.require(Role::Admin)?;
        self.state.write().semester = check_semester(semester)?;
        Ok(())
    }

    /// Generates and activates a timetable, then reloads the admin lists.
    ///
    /// A refusal from the service is returned unchanged and nothing is
    /// activated.
    pub async fn generate(
        &self,
        department: &str,
        semester: u8,
    ) -> Result<Timetable, PortalError> {
        self.require(Role::Admin)?;
        let semester = check_semester(semester)?;
        let correlation_id = generate_correlation_id();
        let start = Instant::now();

        info!(
            correlation_id = %correlation_id,
            department = %department,
            semester,
            "Generating timetable"
        );

        let timetable = match self.gateway.generate_timetable(department, semester).await {
            Ok(timetable) => timetable,
            Err(e) => {
                error!(
                    correlation_id = %correlation_id,
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Timetable generation failed"
                );
                self.notices.error(e.to_string());
                return Err(e.into());
            }
        };

        self.notices.success(format!(
            "Timetable generated successfully with {} entries!",
            timetable.entries.len()
        ));

        if let Err(source) = self.gateway.activate_timetable(&timetable.id).await {
            let err = PortalError::Activation {
                timetable_id: timetable.id.clone(),
                source,
            };
            error!(
                correlation_id = %correlation_id,
                timetable_id = %timetable.id,
                error = %err,
                "Timetable activation failed"
            );
            self.notices.error(err.to_string());
            // The inactive timetable is stored regardless.
            self.refresh_after_change(&correlation_id).await;
            return Err(err);
        }

        info!(
            correlation_id = %correlation_id,
            timetable_id = %timetable.id,
            entries = timetable.entries.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Timetable generated and activated"
        );

        self.refresh_after_change(&correlation_id).await;
        Ok(timetable)
    }

    /// Deletes the timetables of one department and semester.
    pub async fn clear_current(
        &self,
        department: &str,
        semester: u8,
    ) -> Result<ClearOutcome, PortalError> {
        self.require(Role::Admin)?;
        let semester = check_semester(semester)?;
        let correlation_id = generate_correlation_id();
        info!(
            correlation_id = %correlation_id,
            department = %department,
            semester,
            "Clearing schedule"
        );

        let outcome = self.settle_clear(self.gateway.clear_schedule(department, semester).await)?;
        self.refresh_after_change(&correlation_id).await;
        Ok(outcome)
    }

    /// Deletes every timetable.
    pub async fn clear_all(&self) -> Result<ClearOutcome, PortalError> {
        self.require(Role::Admin)?;
        let correlation_id = generate_correlation_id();
        info!(correlation_id = %correlation_id, "Clearing all schedules");

        let outcome = self.settle_clear(self.gateway.clear_all_schedules().await)?;
        self.refresh_after_change(&correlation_id).await;
        Ok(outcome)
    }

    /// Loads the service's demonstration data set.
    pub async fn init_sample_data(&self) -> Result<(), PortalError> {
        self.require(Role::Admin)?;
        let correlation_id = generate_correlation_id();
        info!(correlation_id = %correlation_id, "Initializing sample data");

        if let Err(e) = self.gateway.init_sample_data().await {
            self.notices.error(e.to_string());
            return Err(e.into());
        }
        self.notices.success("Sample data initialized successfully!");
        self.refresh_after_change(&correlation_id).await;
        Ok(())
    }

    /// Builds the student dashboard from the current state.
    pub fn student_view(&self, now: DateTime<Utc>) -> StudentView {
        let (batch, schedule, timetable_status, assignments, assignments_status) = {
            let state = self.state.read();
            (
                state.selected(),
                state.timetable.data(),
                state.timetable.status(),
                state.assignments.data(),
                state.assignments.status(),
            )
        };
        StudentView::build(
            batch,
            &schedule,
            timetable_status,
            &assignments,
            assignments_status,
            now,
        )
    }

    /// Builds the admin dashboard from the current state.
    pub fn admin_view(&self) -> AdminView {
        let (inventory, status, department, semester) = {
            let state = self.state.read();
            (
                state.admin.data(),
                state.admin.status(),
                state.department.clone(),
                state.semester,
            )
        };
        AdminView::build(&inventory, status, &department, semester)
    }

    /// Issues exactly the two student fetches for `batch_id` and applies
    /// each one on its own.
    async fn fetch_student(&self, batch_id: &str, version: u64) -> StudentRefresh {
        let correlation_id = generate_correlation_id();
        let start = Instant::now();
        info!(
            correlation_id = %correlation_id,
            batch_id = %batch_id,
            version,
            "Fetching batch timetable and assignments"
        );

        let timetable = async {
            let result = self.gateway.batch_timetable(batch_id).await;
            self.apply_timetable(batch_id, version, &correlation_id, result)
        };
        let assignments = async {
            let result = self.gateway.batch_assignments(batch_id).await;
            self.apply_assignments(batch_id, version, &correlation_id, result)
        };
        let (timetable, assignments) = futures::join!(timetable, assignments);

        info!(
            correlation_id = %correlation_id,
            batch_id = %batch_id,
            version,
            duration_ms = start.elapsed().as_millis() as u64,
            "Batch fetches settled"
        );

        StudentRefresh {
            batch_id: batch_id.to_string(),
            version,
            timetable,
            assignments,
        }
    }

    fn apply_timetable(
        &self,
        batch_id: &str,
        version: u64,
        correlation_id: &str,
        result: Result<BatchTimetable, GatewayError>,
    ) -> FetchOutcome {
        let schedule = match result {
            Ok(reply) => Ok(BatchSchedule {
                generated: !reply.timetable.is_empty(),
                entries: reply.timetable,
                batch_info: reply.batch_info,
            }),
            // No active timetable yet is a normal state, not a failure. Any
            // other 404 (e.g. the batch itself is gone) is.
            Err(GatewayError::NotFound { message }) if is_no_active_timetable(&message) => {
                debug!(
                    correlation_id = %correlation_id,
                    batch_id = %batch_id,
                    message = %message,
                    "No active timetable for batch"
                );
                Ok(BatchSchedule::default())
            }
            Err(e) => Err(e),
        };

        let failed = {
            let mut state = self.state.write();
            if !state.is_current(version) {
                debug!(
                    correlation_id = %correlation_id,
                    batch_id = %batch_id,
                    version,
                    current = state.selection_version,
                    "Discarding stale timetable result"
                );
                return FetchOutcome::Discarded;
            }
            match schedule {
                Ok(schedule) => {
                    let count = schedule.entries.len();
                    state.timetable.replace(schedule);
                    return FetchOutcome::Applied { count };
                }
                Err(e) => {
                    state.timetable.mark_failed();
                    e
                }
            }
        };

        warn!(
            correlation_id = %correlation_id,
            batch_id = %batch_id,
            error = %failed,
            "Failed to load batch timetable"
        );
        self.notices
            .error(format!("Failed to load timetable: {failed}"));
        FetchOutcome::Failed(failed)
    }

    fn apply_assignments(
        &self,
        batch_id: &str,
        version: u64,
        correlation_id: &str,
        result: Result<Vec<Assignment>, GatewayError>,
    ) -> FetchOutcome {
        let failed = {
            let mut state = self.state.write();
            if !state.is_current(version) {
                debug!(
                    correlation_id = %correlation_id,
                    batch_id = %batch_id,
                    version,
                    current = state.selection_version,
                    "Discarding stale assignments result"
                );
                return FetchOutcome::Discarded;
            }
            match result {
                Ok(assignments) => {
                    let count = assignments.len();
                    state.assignments.replace(assignments);
                    return FetchOutcome::Applied { count };
                }
                Err(e) => {
                    state.assignments.mark_failed();
                    e
                }
            }
        };

        warn!(
            correlation_id = %correlation_id,
            batch_id = %batch_id,
            error = %failed,
            "Failed to load assignments"
        );
        self.notices
            .error(format!("Failed to load assignments: {failed}"));
        FetchOutcome::Failed(failed)
    }

    /// Applies an admin refresh. `None` means the epoch moved on and the
    /// result was dropped.
    fn apply_admin(
        &self,
        epoch: u64,
        result: Result<AdminInventory, GatewayError>,
    ) -> Option<Result<(), GatewayError>> {
        let mut state = self.state.write();
        if !state.is_current_admin(epoch) {
            return None;
        }
        Some(match result {
            Ok(inventory) => {
                state.admin.replace(inventory);
                Ok(())
            }
            Err(e) => {
                state.admin.mark_failed();
                Err(e)
            }
        })
    }

    fn settle_clear(
        &self,
        result: Result<ClearResponse, GatewayError>,
    ) -> Result<ClearOutcome, PortalError> {
        match result {
            Ok(reply) if reply.deleted_count == Some(0) => {
                self.notices.success("Nothing to clear");
                Ok(ClearOutcome::NothingToClear)
            }
            Ok(reply) => {
                self.notices.success(reply.message.clone());
                Ok(ClearOutcome::Cleared {
                    message: reply.message,
                    deleted_count: reply.deleted_count,
                })
            }
            Err(GatewayError::NotFound { message }) => {
                debug!(message = %message, "Nothing to clear");
                self.notices.success("Nothing to clear");
                Ok(ClearOutcome::NothingToClear)
            }
            Err(e) => {
                error!(error = %e, "Clearing schedules failed");
                self.notices.error(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Reloads the admin lists after a successful mutation. A failure here
    /// is already reported by `refresh_admin` and does not undo the change.
    async fn refresh_after_change(&self, correlation_id: &str) {
        if let Err(e) = self.refresh_admin().await {
            warn!(
                correlation_id = %correlation_id,
                error = %e,
                "Admin refresh after change failed"
            );
        }
    }

    fn require(&self, expected: Role) -> Result<(), PortalError> {
        let actual = self.state.read().role;
        if actual == expected {
            Ok(())
        } else {
            Err(PortalError::WrongRole { expected, actual })
        }
    }
}

fn is_no_active_timetable(message: &str) -> bool {
    message
        .to_ascii_lowercase()
        .starts_with(&NO_ACTIVE_TIMETABLE.to_ascii_lowercase())
}

fn check_semester(semester: u8) -> Result<u8, PortalError> {
    if (1..=8).contains(&semester) {
        Ok(semester)
    } else {
        Err(PortalError::InvalidSemester(semester))
    }
}

/// Generates a short id to tie together the log lines of one operation.
fn generate_correlation_id() -> String {
    let random: u32 = rand::thread_rng().gen();
    format!("{:08x}", random)
}
