//! Selection state, fetch orchestration and the views built on top.

mod error;
mod notice;
mod orchestrator;
mod state;
mod view;

pub use error::PortalError;
pub use notice::{Notice, NoticeBoard, NoticeLevel};
pub use orchestrator::{
    ClearOutcome, FetchOutcome, Orchestrator, RefreshOutcome, RosterOutcome, SelectOutcome,
    StudentRefresh,
};
pub use state::{AdminInventory, BatchSchedule, Role, SessionState, Snapshot, ViewStatus};
pub use view::{
    AdminView, ClassifiedAssignment, InventoryCounts, StudentView, TimetableSummary,
};
