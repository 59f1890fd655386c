//! Per-layer outcome of an export run

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerStatus {
    Written { features: usize },
    WriteFailed { reason: String },
}

/// Outcome for one flattened layer, under its deduplicated name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerOutcome {
    pub name: String,
    pub status: LayerStatus,
}

impl LayerOutcome {
    pub fn written(name: impl Into<String>, features: usize) -> Self {
        Self {
            name: name.into(),
            status: LayerStatus::Written { features },
        }
    }

    pub fn failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: LayerStatus::WriteFailed {
                reason: reason.into(),
            },
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self.status, LayerStatus::Written { .. })
    }
}

impl fmt::Display for LayerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            LayerStatus::Written { features } => {
                write!(f, "{}: saved ({} features)", self.name, features)
            }
            LayerStatus::WriteFailed { reason } => write!(f, "{}: failed ({})", self.name, reason),
        }
    }
}

/// Summary of an export, in flatten order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportReport {
    pub output: PathBuf,
    pub outcomes: Vec<LayerOutcome>,
    /// False when no layer could be written and no container was created
    pub container_written: bool,
}

impl ExportReport {
    pub fn written(&self) -> impl Iterator<Item = &LayerOutcome> {
        self.outcomes.iter().filter(|o| o.is_written())
    }

    pub fn failed(&self) -> impl Iterator<Item = &LayerOutcome> {
        self.outcomes.iter().filter(|o| !o.is_written())
    }

    pub fn written_count(&self) -> usize {
        self.written().count()
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    /// Human readable summary, one line per layer.
    pub fn summary(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ExportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            writeln!(f, "{outcome}")?;
        }
        Ok(())
    }
}
