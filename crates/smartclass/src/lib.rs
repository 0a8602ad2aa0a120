//! Timetable grid synthesis and client data-consistency layer for the
//! SmartClass scheduler.
//!
//! - [`schedule`] turns raw schedule entries into a canonical day x slot grid
//!   and derives faculty/room summaries from the same entries.
//! - [`gateway`] is the seam to the remote timetable service, with a
//!   `reqwest` implementation.
//! - [`portal`] owns the selection state and decides which fetches run, in
//!   which order, and which results are still allowed to land.

pub mod gateway;
pub mod portal;
pub mod schedule;

pub use gateway::config::PortalConfig;
pub use gateway::error::GatewayError;
pub use gateway::{client::HttpGateway, Gateway};
pub use portal::{Orchestrator, PortalError};
