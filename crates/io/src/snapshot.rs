// JSON snapshot format
//
// {
//   "cells": {
//     "A1": { "stringForm": "5" },
//     "B1": { "stringForm": "=A1+2" }
//   },
//   "Version": "default"
// }
//
// Each cell is stored as its edit-line string form, so loading is a replay:
// every string form is fed back through `set_contents_of_cell`, which
// rebuilds contents, values, and the dependency graph in one pass.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use gridcore_engine::{Spreadsheet, SpreadsheetError};

/// Failure while saving or loading a snapshot. A failed save never marks
/// the spreadsheet clean; a failed load never yields a spreadsheet at all.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("version mismatch: expected `{expected}`, found `{found}`")]
    VersionMismatch { expected: String, found: String },

    #[error("replaying cell {cell}: {source}")]
    Replay {
        cell: String,
        source: SpreadsheetError,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    /// BTreeMap keeps the on-disk cell order and the replay order stable.
    #[serde(default)]
    cells: BTreeMap<String, CellRecord>,

    #[serde(rename = "Version")]
    version: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CellRecord {
    #[serde(rename = "stringForm")]
    string_form: String,
}

/// Write the spreadsheet to `path` and clear its dirty flag. The flag is
/// only cleared after the bytes are written.
pub fn save(spreadsheet: &mut Spreadsheet, path: &Path) -> Result<(), SnapshotError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &snapshot_of(spreadsheet))?;
    // Surface buffered write errors here; dropping the writer would
    // swallow them and wrongly mark the store clean.
    writer.flush()?;
    spreadsheet.mark_saved();
    Ok(())
}

/// Read a snapshot from `path` and replay it into a fresh spreadsheet with
/// the given name policies. The file's version tag must equal
/// `expected_version`. The returned spreadsheet is clean.
pub fn load<N, V>(
    path: &Path,
    expected_version: &str,
    normalize: N,
    is_valid: V,
) -> Result<Spreadsheet, SnapshotError>
where
    N: Fn(&str) -> String + 'static,
    V: Fn(&str) -> bool + 'static,
{
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let snapshot: SnapshotFile = serde_json::from_reader(reader)?;

    if snapshot.version != expected_version {
        return Err(SnapshotError::VersionMismatch {
            expected: expected_version.to_string(),
            found: snapshot.version,
        });
    }

    let mut spreadsheet = Spreadsheet::with_policies(snapshot.version, normalize, is_valid);
    for (name, record) in &snapshot.cells {
        spreadsheet
            .set_contents_of_cell(name, &record.string_form)
            .map_err(|source| SnapshotError::Replay {
                cell: name.clone(),
                source,
            })?;
    }
    spreadsheet.mark_saved();
    Ok(spreadsheet)
}

fn snapshot_of(spreadsheet: &Spreadsheet) -> SnapshotFile {
    SnapshotFile {
        cells: spreadsheet
            .cell_records()
            .map(|(name, string_form)| {
                (
                    name.to_string(),
                    CellRecord {
                        string_form: string_form.to_string(),
                    },
                )
            })
            .collect(),
        version: spreadsheet.version().to_string(),
    }
}
