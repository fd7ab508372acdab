//! Rendering of dry-run inventories and deletion reports

use clap::ValueEnum;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use fleetsweep_core::{Inventory, OutcomeEntry, RunSummary};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
}

const REPORT_HEADER: [&str; 5] = ["Identifier", "Resource Type", "Region", "Status", "Error"];

fn status(entry: &OutcomeEntry) -> &'static str {
    if entry.is_success() { "Deleted" } else { "Failed" }
}

fn error_text(entry: &OutcomeEntry) -> String {
    entry.error.as_ref().map(|e| e.to_string()).unwrap_or_default()
}

/// Deletion outcomes, one row per identifier, in ledger order
pub fn render_report(entries: &[OutcomeEntry], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Table => Ok(report_table(entries)),
        OutputFormat::Csv => report_csv(entries),
    }
}

fn report_table(entries: &[OutcomeEntry]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(REPORT_HEADER.iter().map(|h| Cell::new(*h)));

    for entry in entries {
        let status_cell = if entry.is_success() {
            Cell::new(status(entry)).fg(Color::Green)
        } else {
            Cell::new(status(entry)).fg(Color::Red)
        };
        table.add_row(vec![
            Cell::new(&entry.identifier),
            Cell::new(&entry.resource_type),
            Cell::new(&entry.region),
            status_cell,
            Cell::new(error_text(entry)),
        ]);
    }

    table.to_string()
}

fn report_csv(entries: &[OutcomeEntry]) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(REPORT_HEADER)?;
    for entry in entries {
        writer.write_record([
            entry.identifier.as_str(),
            entry.resource_type.as_str(),
            entry.region.as_str(),
            status(entry),
            error_text(entry).as_str(),
        ])?;
    }
    finish_csv(writer)
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> anyhow::Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("CSV の書き出しに失敗しました: {}", e.error()))?;
    Ok(String::from_utf8(bytes)?)
}

/// Per-kind totals of a run
pub fn render_summary(summary: &RunSummary) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_header(vec!["Resource Type", "Deleted", "Failed"]);
    for (kind, counts) in &summary.by_resource_type {
        table.add_row(vec![
            Cell::new(kind),
            Cell::new(counts.succeeded),
            Cell::new(counts.failed),
        ]);
    }
    table.to_string()
}

/// Identifiers a run would delete
pub fn render_inventory(inventory: &Inventory, format: OutputFormat) -> anyhow::Result<String> {
    let rows = inventory.found.iter().flat_map(|((region, kind), ids)| {
        ids.iter()
            .map(move |id| [id.as_str(), kind.as_str(), region.as_str()])
    });

    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL_CONDENSED)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["Identifier", "Resource Type", "Region"]);
            for row in rows {
                table.add_row(row.to_vec());
            }
            Ok(table.to_string())
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            writer.write_record(["Identifier", "Resource Type", "Region"])?;
            for row in rows {
                writer.write_record(row)?;
            }
            finish_csv(writer)
        }
    }
}
