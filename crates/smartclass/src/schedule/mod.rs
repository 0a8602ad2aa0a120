/// Schedule model, grid synthesis and derived summaries
mod aggregate;
mod grid;
mod types;

pub use aggregate::{
    derive_faculty, derive_rooms, name_discrepancies, DiscrepancyScope, FacultySummary,
    NameDiscrepancy, RoomSummary,
};
pub use grid::{
    agenda, synthesize, synthesize_canonical, Cell, CellConflict, DayAgenda, Grid, GridRow,
    Overlap,
};
pub use types::*;
