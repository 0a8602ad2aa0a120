//! The seam to the remote timetable service.
//!
//! The service is a black box that owns generation and storage. The portal
//! only consumes the operations on [`Gateway`]; [`client::HttpGateway`] is
//! the production implementation.

pub mod client;
pub mod config;
pub mod error;

#[cfg(test)]
pub(crate) mod fake;

use crate::schedule::{Assignment, Batch, Faculty, Room, ScheduleEntry, Subject, Timetable};
use async_trait::async_trait;
use error::GatewayError;
use serde::{Deserialize, Serialize};

/// 404 reason the student timetable endpoint gives for a batch that exists
/// but has no active timetable yet.
pub const NO_ACTIVE_TIMETABLE: &str = "No active timetable found";

/// Reply of the student timetable endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTimetable {
    /// Entries of the active timetable that belong to the batch
    #[serde(default)]
    pub timetable: Vec<ScheduleEntry>,
    #[serde(default)]
    pub batch_info: Option<Batch>,
}

/// Reply of the clear endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearResponse {
    pub message: String,
    /// Number of timetables removed, when the service reports it
    #[serde(default)]
    pub deleted_count: Option<u64>,
}

/// Operations the portal consumes from the timetable service.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn list_rooms(&self) -> Result<Vec<Room>, GatewayError>;

    async fn list_faculty(&self) -> Result<Vec<Faculty>, GatewayError>;

    async fn list_subjects(&self) -> Result<Vec<Subject>, GatewayError>;

    async fn list_batches(&self) -> Result<Vec<Batch>, GatewayError>;

    async fn list_timetables(&self) -> Result<Vec<Timetable>, GatewayError>;

    /// Entries of the active timetable for one batch, enriched with names.
    async fn batch_timetable(&self, batch_id: &str) -> Result<BatchTimetable, GatewayError>;

    async fn batch_assignments(&self, batch_id: &str) -> Result<Vec<Assignment>, GatewayError>;

    /// Asks the service to generate a timetable. A refusal (e.g. missing
    /// prerequisite data) comes back as [`GatewayError::Rejected`].
    async fn generate_timetable(
        &self,
        department: &str,
        semester: u8,
    ) -> Result<Timetable, GatewayError>;

    async fn activate_timetable(&self, timetable_id: &str) -> Result<(), GatewayError>;

    async fn clear_schedule(
        &self,
        department: &str,
        semester: u8,
    ) -> Result<ClearResponse, GatewayError>;

    async fn clear_all_schedules(&self) -> Result<ClearResponse, GatewayError>;

    /// Replaces the service's data with its demonstration data set.
    async fn init_sample_data(&self) -> Result<(), GatewayError>;
}
