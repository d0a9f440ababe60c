//! Snapshot and link-log file I/O
//!
//! Files are opened per call and closed when the handle drops, including on
//! early return from a parse error.

use crate::{Result, RunConfig, ToolError};
use chrono::{DateTime, Utc};
use cluster_analysis::{parse_log, ParsedLog};
use orbital_mechanics::{SatelliteId, SatellitePosition, Snapshot, SnapshotSequence};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const MANIFEST_FILE: &str = "manifest.json";

/// Summary written next to the snapshot files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub generated_at: DateTime<Utc>,
    pub config: RunConfig,
    pub satellites: usize,
    pub snapshot_files: Vec<String>,
}

/// Write one snapshot as "x y z" lines in ascending id order.
pub fn write_snapshot_to<W: Write>(writer: &mut W, snapshot: &Snapshot) -> Result<()> {
    for (_, pos) in &snapshot.positions {
        writeln!(writer, "{} {} {}", pos.x, pos.y, pos.z)?;
    }
    Ok(())
}

/// Write `snapshot` to `dir/<step:03>` and return the path.
pub fn write_snapshot(dir: impl AsRef<Path>, snapshot: &Snapshot) -> Result<PathBuf> {
    let path = dir.as_ref().join(snapshot.file_name());
    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);
    write_snapshot_to(&mut writer, snapshot)?;
    writer.flush()?;
    Ok(path)
}

/// Drain `sequence` into `dir`, one file per step, then write the manifest.
///
/// Snapshots are dropped as soon as they are on disk.
pub fn write_snapshot_sequence(
    dir: impl AsRef<Path>,
    sequence: SnapshotSequence,
    config: &RunConfig,
) -> Result<RunManifest> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let satellites = sequence.state().len();
    let mut snapshot_files = Vec::with_capacity(sequence.steps());

    for snapshot in sequence {
        let snapshot = snapshot?;
        let path = write_snapshot(dir, &snapshot)?;
        debug!("Wrote {:?} (t = {:.0} s)", path, snapshot.elapsed_s);
        snapshot_files.push(snapshot.file_name());
    }

    let manifest = RunManifest {
        generated_at: Utc::now(),
        config: config.clone(),
        satellites,
        snapshot_files,
    };

    let file = File::create(dir.join(MANIFEST_FILE))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &manifest)?;
    writer.flush()?;

    info!(
        "Wrote {} snapshots of {} satellites to {:?}",
        manifest.snapshot_files.len(),
        satellites,
        dir
    );

    Ok(manifest)
}

/// Parse snapshot text. The n-th non-blank line is satellite id n.
pub fn parse_snapshot(text: &str) -> Result<Vec<(SatelliteId, SatellitePosition)>> {
    let mut positions = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 3 {
            return Err(ToolError::MalformedSnapshot {
                line: idx + 1,
                reason: format!("expected 3 values, found {}", fields.len()),
            });
        }

        let mut xyz = [0.0f64; 3];
        for (slot, raw) in xyz.iter_mut().zip(&fields) {
            *slot = raw.parse().map_err(|_| ToolError::MalformedSnapshot {
                line: idx + 1,
                reason: format!("invalid number {:?}", raw),
            })?;
        }

        let id = SatelliteId(positions.len() as u32 + 1);
        positions.push((id, SatellitePosition::new(xyz[0], xyz[1], xyz[2])));
    }

    Ok(positions)
}

pub fn read_snapshot(path: impl AsRef<Path>) -> Result<Vec<(SatelliteId, SatellitePosition)>> {
    let path = path.as_ref();
    debug!("Reading snapshot {:?}", path);
    let text = fs::read_to_string(path)?;
    parse_snapshot(&text)
}

/// Read a link/cluster log. Invalid UTF-8 is replaced rather than rejected,
/// the affected lines then count as skipped.
pub fn read_link_log(path: impl AsRef<Path>) -> Result<ParsedLog> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let log = parse_log(&String::from_utf8_lossy(&bytes));

    info!(
        "Loaded {} designations and {} links from {:?} ({} lines skipped)",
        log.designations.len(),
        log.links.len(),
        path,
        log.skipped_count()
    );

    Ok(log)
}
