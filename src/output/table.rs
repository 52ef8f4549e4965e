//! Capacity table rendering.
//!
//! Columns are dynamic (two per requested namespace), so rows are built
//! with `tabled::builder::Builder` instead of a `Tabled` derive.

use colored::Colorize;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::capacity::assemble::CapacityReport;

pub fn render_table(report: &CapacityReport) -> String {
    let flat = report.flat_table();

    let mut builder = Builder::default();
    builder.push_record(flat.headers);
    for row in flat.rows {
        builder.push_record(row);
    }

    let mut table = builder.build();
    table.with(Style::sharp());
    table.to_string()
}

pub fn print_table(report: &CapacityReport) {
    if report.rows.is_empty() {
        println!("No capacity rows.");
        return;
    }

    let clusters = {
        let mut names: Vec<&str> = report.rows.iter().map(|r| r.summary.cluster.as_str()).collect();
        names.dedup();
        names.len()
    };

    println!(
        "{} {} cluster(s), {} row(s)",
        "HyperPod capacity:".bold(),
        clusters,
        report.rows.len()
    );
    println!("{}", render_table(report));
}
