use crate::error::Result;
use crate::types::{KpiObservation, OUTPUT_COLUMNS};
use rust_xlsxwriter::Workbook;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub const SHEET_NAME: &str = "Sheet1";

/// Header row plus one record per row.
pub fn write_csv_to<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    write_csv_to(File::create(path)?, rows)
}

/// One-sheet workbook: header row, then one row per observation.
pub fn write_xlsx(path: &Path, rows: &[KpiObservation]) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, name) in OUTPUT_COLUMNS.iter().enumerate() {
        sheet.write_string(0, col as u16, *name)?;
    }
    for (i, o) in rows.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, o.stage_id.as_str())?;
        sheet.write_string(row, 1, o.kpi_name.as_str())?;
        sheet.write_number(row, 2, f64::from(o.kpi_value))?;
        sheet.write_number(row, 3, f64::from(o.year))?;
        sheet.write_string(row, 4, o.stage_number.as_str())?;
        sheet.write_string(row, 5, o.country.as_str())?;
        sheet.write_string(row, 6, o.status.as_str())?;
        sheet.write_string(row, 7, o.alias.as_str())?;
        sheet.write_string(row, 8, o.sector.as_str())?;
        sheet.write_string(row, 9, o.subsector.as_str())?;
    }
    workbook.save(path)?;
    Ok(())
}

/// Long table to `path`, as a workbook for `.xlsx` and CSV otherwise.
pub fn write_observations(path: &Path, rows: &[KpiObservation]) -> Result<()> {
    let is_xlsx = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"));
    if is_xlsx {
        write_xlsx(path, rows)
    } else {
        write_csv(path, rows)
    }
}

/// First `max_rows` rows as a markdown table.
pub fn render_table<T: Tabled + Clone>(rows: &[T], max_rows: usize) -> String {
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table_rows<T: Tabled + Clone>(rows: &[T], max_rows: usize) {
    println!("{}\n", render_table(rows, max_rows));
}
