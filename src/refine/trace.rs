//! Per-cycle goodness-of-fit trace of a refinement run.

use crate::goodness::GoodnessOfFit;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Fits with a weighted R-factor at or above this are traced as invalid.
pub const TRACE_INVALID_RWP: f64 = 1.0e5;

/// One row of the trace
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Cycle index; 0 is the starting state
    pub cycle: usize,

    /// Current fit at the end of the cycle, `None` when degenerate
    pub fit: Option<GoodnessOfFit>,

    /// Best fit seen up to and including this cycle
    pub best: GoodnessOfFit,
}

/// Ordered trace of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitTrace {
    entries: Vec<TraceEntry>,
}

impl FitTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Append the state at the end of `cycle`
    pub fn record(&mut self, cycle: usize, fit: GoodnessOfFit, best: GoodnessOfFit) {
        let fit = if fit.rwp < TRACE_INVALID_RWP && fit.rwp.is_finite() {
            Some(fit)
        } else {
            None
        };
        self.entries.push(TraceEntry { cycle, fit, best });
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TraceEntry> {
        self.entries.iter()
    }

    /// Default export file name, `r_trace_<entries>.dat`
    pub fn default_file_name(&self) -> String {
        format!("r_trace_{}.dat", self.entries.len())
    }

    /// Write the trace as a `cycle Rwp Rp` table; degenerate rows read `-1 -1`
    pub fn write_table<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for entry in &self.entries {
            match entry.fit {
                Some(fit) => writeln!(writer, "{:>15}{:>15.5e}{:>15.5e}", entry.cycle, fit.rwp, fit.rp)?,
                None => writeln!(writer, "{:>15}{:>15}{:>15}", entry.cycle, -1, -1)?,
            }
        }
        Ok(())
    }

    /// Write the trace table to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_table(&mut writer)?;
        writer.flush()
    }
}
