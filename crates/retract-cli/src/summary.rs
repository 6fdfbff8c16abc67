use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};

use retract_model::{PersonLinkage, RetractionConfig};

use crate::types::{DeactivatedRunSummary, FilesRunSummary, WarehouseRunSummary};

pub fn print_warehouse_summary(summary: &WarehouseRunSummary) {
    println!("Project: {}", summary.project);
    println!("Pid source: {}", summary.pid_source);
    if summary.dry_run {
        println!("Dry run: no scripts written");
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Dataset"),
        header_cell("Category"),
        header_cell("Statements"),
        header_cell("Sandbox tables"),
        header_cell("Missing tables"),
    ]);
    apply_table_style(&mut table);
    for index in 2..=4 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for dataset in &summary.datasets {
        table.add_row(vec![
            Cell::new(&dataset.dataset),
            Cell::new(dataset.category),
            count_cell(dataset.statements),
            count_cell(dataset.sandbox_tables),
            count_cell(dataset.missing_tables),
        ]);
    }
    println!("{table}");
    for script in &summary.scripts {
        println!("Script: {}", script.display());
    }
    if let Some(report) = &summary.report {
        println!("Plan report: {}", report.display());
    }
}

pub fn print_deactivated_summary(summary: &DeactivatedRunSummary) {
    println!("Project: {}", summary.project);
    println!("Ticket: {}", summary.ticket);
    println!("Roster records: {}", summary.roster_count);
    if summary.dry_run {
        println!("Dry run: no scripts written");
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Dataset"),
        header_cell("Category"),
        header_cell("Tables"),
        header_cell("Statements"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);
    for dataset in &summary.datasets {
        table.add_row(vec![
            Cell::new(&dataset.dataset),
            Cell::new(dataset.category),
            count_cell(dataset.tables),
            count_cell(dataset.statements),
        ]);
    }
    println!("{table}");
    if let Some(script) = &summary.script {
        println!("Script: {}", script.display());
    }
    if let Some(report) = &summary.report {
        println!("Plan report: {}", report.display());
    }
}

pub fn print_files_summary(summary: &FilesRunSummary) {
    println!("Site: {}", summary.hpo_id);
    println!("Bucket: {}", summary.bucket);
    println!("Pids: {}", summary.pid_count);
    println!("Folders processed: {}", summary.report.folders_processed);
    if summary.report.files.is_empty() {
        println!("No retractable files touched.");
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Folder"),
        header_cell("File"),
        header_cell("Removed"),
        header_cell("Rewritten"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Center);
    for file in &summary.report.files {
        table.add_row(vec![
            Cell::new(&file.folder),
            Cell::new(&file.file),
            count_cell(file.records_removed),
            flag_cell(file.reuploaded),
        ]);
    }
    println!("{table}");
}

pub fn print_tables(config: &RetractionConfig) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Table"),
        header_cell("Linkage"),
        header_cell("Source"),
        header_cell("File pid column"),
    ]);
    apply_table_style(&mut table);
    for rule in &config.tables {
        let linkage = match rule.linkage {
            PersonLinkage::Direct => "person_id",
            PersonLinkage::FactRelationship => "fact_relationship",
            PersonLinkage::None => "excluded",
        };
        let source = if rule.rdr_sourced { "RDR" } else { "EHR" };
        let file_column = match rule.file_pid_column {
            Some(column) => format!("{column:?}").to_lowercase(),
            None => "-".to_string(),
        };
        table.add_row(vec![
            Cell::new(&rule.name),
            Cell::new(linkage),
            Cell::new(source),
            Cell::new(file_column),
        ]);
    }
    println!("{table}");
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(comfy_table::Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn count_cell(value: usize) -> Cell {
    if value > 0 {
        Cell::new(value)
    } else {
        Cell::new(value).fg(comfy_table::Color::DarkGrey)
    }
}

fn flag_cell(set: bool) -> Cell {
    if set {
        Cell::new("✓")
            .fg(comfy_table::Color::Green)
            .add_attribute(Attribute::Bold)
    } else {
        Cell::new("-").fg(comfy_table::Color::DarkGrey)
    }
}
