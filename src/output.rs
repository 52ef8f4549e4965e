//! Report rendering.

pub mod json;
pub mod table;

use anyhow::Result;

use crate::capacity::assemble::CapacityReport;
use crate::config::OutputFormat;

/// Print `report` to stdout in the requested format.
pub fn print_report(report: &CapacityReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            table::print_table(report);
            Ok(())
        }
        OutputFormat::Json => json::print_json(report),
    }
}
