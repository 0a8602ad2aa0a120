//! Day x slot grid synthesis.
//!
//! A grid is a pure view over one snapshot of entries. Cells never silently
//! overwrite each other: the first entry to reach a cell is placed, every
//! later one is kept as a conflict on that cell. Entries that fit no cell are
//! kept in `unplaced`, so the grid always accounts for every input entry.

use super::types::{Day, ScheduleEntry, TimeSlot};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

/// A single (day, slot) position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Cell {
    placed: Option<ScheduleEntry>,
    conflicting: Vec<ScheduleEntry>,
}

impl Cell {
    /// The entry shown in this cell (first in input order).
    pub fn placed(&self) -> Option<&ScheduleEntry> {
        self.placed.as_ref()
    }

    /// Later entries that mapped to the same cell.
    pub fn conflicting(&self) -> &[ScheduleEntry] {
        &self.conflicting
    }

    pub fn is_empty(&self) -> bool {
        self.placed.is_none()
    }

    pub fn has_conflict(&self) -> bool {
        !self.conflicting.is_empty()
    }

    /// Number of input entries that landed in this cell.
    pub fn occupancy(&self) -> usize {
        usize::from(self.placed.is_some()) + self.conflicting.len()
    }

    fn push(&mut self, entry: &ScheduleEntry) {
        if self.placed.is_none() {
            self.placed = Some(entry.clone());
        } else {
            self.conflicting.push(entry.clone());
        }
    }
}

/// All cells of one day, in slot order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridRow {
    pub day: Day,
    pub cells: Vec<Cell>,
}

/// Double-booking of a single cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellConflict<'a> {
    pub day: Day,
    pub slot: &'a TimeSlot,
    pub placed: &'a ScheduleEntry,
    pub conflicting: &'a [ScheduleEntry],
}

/// Two entries on the same day whose intervals intersect without sharing a
/// cell, e.g. `09:30-10:30` against `09:00-10:00`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overlap {
    pub day: Day,
    pub first: ScheduleEntry,
    pub second: ScheduleEntry,
}

/// Day-major grid of cells plus everything that could not be placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grid {
    slots: Vec<TimeSlot>,
    rows: Vec<GridRow>,
    unplaced: Vec<ScheduleEntry>,
    overlaps: Vec<Overlap>,
}

impl Grid {
    pub fn days(&self) -> impl Iterator<Item = Day> + '_ {
        self.rows.iter().map(|row| row.day)
    }

    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    pub fn rows(&self) -> &[GridRow] {
        &self.rows
    }

    /// Looks up a cell by day and slot key (`"09:00-10:00"`).
    pub fn cell(&self, day: Day, slot_key: &str) -> Option<&Cell> {
        let col = self.slots.iter().position(|slot| slot.key() == slot_key)?;
        self.rows
            .iter()
            .find(|row| row.day == day)
            .and_then(|row| row.cells.get(col))
    }

    /// Entries whose day or bounds match no cell.
    pub fn unplaced(&self) -> &[ScheduleEntry] {
        &self.unplaced
    }

    pub fn unplaced_count(&self) -> usize {
        self.unplaced.len()
    }

    /// Sum of cell occupancy over the whole grid.
    pub fn total_occupancy(&self) -> usize {
        self.cells().map(Cell::occupancy).sum()
    }

    /// Number of cells with a placed entry.
    pub fn occupied_cells(&self) -> usize {
        self.cells().filter(|cell| !cell.is_empty()).count()
    }

    /// Every double-booked cell, in grid order.
    pub fn conflicts(&self) -> Vec<CellConflict<'_>> {
        let mut conflicts = Vec::new();
        for row in &self.rows {
            for (slot, cell) in self.slots.iter().zip(&row.cells) {
                if let (Some(placed), true) = (cell.placed(), cell.has_conflict()) {
                    conflicts.push(CellConflict {
                        day: row.day,
                        slot,
                        placed,
                        conflicting: cell.conflicting(),
                    });
                }
            }
        }
        conflicts
    }

    pub fn has_conflicts(&self) -> bool {
        self.cells().any(Cell::has_conflict)
    }

    pub fn overlaps(&self) -> &[Overlap] {
        &self.overlaps
    }

    /// True when no cell holds an entry and nothing was left unplaced.
    pub fn is_empty(&self) -> bool {
        self.unplaced.is_empty() && self.cells().all(Cell::is_empty)
    }

    fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.rows.iter().flat_map(|row| row.cells.iter())
    }
}

/// Builds the grid for `entries` over the given days and slots.
///
/// An entry lands in a cell only when its day is one of `days` and its
/// `"{start}-{end}"` key equals a slot key exactly.
pub fn synthesize(entries: &[ScheduleEntry], days: &[Day], slots: &[TimeSlot]) -> Grid {
    let mut rows: Vec<GridRow> = days
        .iter()
        .map(|&day| GridRow {
            day,
            cells: vec![Cell::default(); slots.len()],
        })
        .collect();

    let mut index: HashMap<(Day, String), (usize, usize)> = HashMap::new();
    for (row, &day) in days.iter().enumerate() {
        for (col, slot) in slots.iter().enumerate() {
            index.entry((day, slot.key())).or_insert((row, col));
        }
    }

    let mut unplaced = Vec::new();
    // Position each entry landed in, for overlap detection below.
    let mut positions: Vec<Option<(usize, usize)>> = Vec::with_capacity(entries.len());

    for entry in entries {
        if let Err(e) = entry.validate() {
            warn!(entry_id = %entry.id, day = %entry.day, error = %e, "Invalid schedule entry");
        }

        match index.get(&(entry.day, entry.slot_key())) {
            Some(&(row, col)) => {
                let cell = &mut rows[row].cells[col];
                if !cell.is_empty() {
                    warn!(
                        day = %entry.day,
                        slot = %entry.slot_key(),
                        entry_id = %entry.id,
                        "Grid cell already occupied, keeping first entry"
                    );
                }
                cell.push(entry);
                positions.push(Some((row, col)));
            }
            None => {
                debug!(
                    day = %entry.day,
                    slot = %entry.slot_key(),
                    entry_id = %entry.id,
                    "Entry matches no grid slot"
                );
                unplaced.push(entry.clone());
                positions.push(None);
            }
        }
    }

    let overlaps = find_overlaps(entries, &positions);

    Grid {
        slots: slots.to_vec(),
        rows,
        unplaced,
        overlaps,
    }
}

/// [`synthesize`] over [`Day::ALL`] and [`TimeSlot::canonical`].
pub fn synthesize_canonical(entries: &[ScheduleEntry]) -> Grid {
    synthesize(entries, &Day::ALL, &TimeSlot::canonical())
}

fn find_overlaps(
    entries: &[ScheduleEntry],
    positions: &[Option<(usize, usize)>],
) -> Vec<Overlap> {
    let mut overlaps = Vec::new();
    for i in 0..entries.len() {
        if entries[i].validate().is_err() {
            continue;
        }
        for j in (i + 1)..entries.len() {
            if entries[j].validate().is_err() {
                continue;
            }
            // Same-cell collisions are reported as cell conflicts instead.
            let same_cell = positions[i].is_some() && positions[i] == positions[j];
            if !same_cell && entries[i].overlaps(&entries[j]) {
                overlaps.push(Overlap {
                    day: entries[i].day,
                    first: entries[i].clone(),
                    second: entries[j].clone(),
                });
            }
        }
    }
    overlaps
}

/// Entries of one day, ordered by start time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayAgenda {
    pub day: Day,
    pub entries: Vec<ScheduleEntry>,
}

/// Groups entries by canonical day, each day sorted by start time. Entries
/// keep their input order when start times tie.
pub fn agenda(entries: &[ScheduleEntry]) -> Vec<DayAgenda> {
    Day::ALL
        .iter()
        .map(|&day| {
            let mut day_entries: Vec<ScheduleEntry> =
                entries.iter().filter(|e| e.day == day).cloned().collect();
            day_entries.sort_by(|a, b| a.start_time.cmp(&b.start_time));
            DayAgenda {
                day,
                entries: day_entries,
            }
        })
        .collect()
}
