// Snapshot persistence for the spreadsheet engine

pub mod snapshot;

pub use snapshot::{load, save, SnapshotError};
