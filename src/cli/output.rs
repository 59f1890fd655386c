//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::Colorize;

use crate::application::{ExportReport, LayerStatus};

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print warning (yellow "Warning:" prefix) to stderr
pub fn warning(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

/// Print section header (cyan bold)
pub fn header(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Print plain output (no color, for data)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg);
}

/// Print the per-layer export summary followed by a totals line.
pub fn report(report: &ExportReport) {
    header(&format!("Export to {}", report.output.display()));
    for outcome in &report.outcomes {
        match &outcome.status {
            LayerStatus::Written { features } => println!(
                "  {} {} ({} features)",
                "✓".green(),
                outcome.name,
                features
            ),
            LayerStatus::WriteFailed { reason } => println!(
                "  {} {}: {}",
                "✗".red(),
                outcome.name,
                reason.as_str().dimmed()
            ),
        }
    }

    let totals = format!(
        "{} written, {} failed",
        report.written_count(),
        report.failed_count()
    );
    if report.container_written {
        println!("{}: {}", "Done".green(), totals);
    } else {
        warning(&format!("nothing exported ({totals})"));
    }
}
