use anyhow::Result;

use crate::capacity::assemble::CapacityReport;

pub fn render_json(report: &CapacityReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(&report.structured())?)
}

pub fn print_json(report: &CapacityReport) -> Result<()> {
    println!("{}", render_json(report)?);
    Ok(())
}
