use crate::config::Source;
use crate::dates::normalize_row;
use crate::error::{Result, SchemaError};
use crate::types::{RawRow, StageRecord, REQUIRED_COLUMNS};
use csv::{ByteRecord, ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub malformed_rows: usize,
    pub unparsed_dates: usize,
    pub latin1_cells: usize,
}

/// Every required column must appear exactly once, under its sheet header or
/// its alias.
pub fn check_schema(headers: &StringRecord) -> std::result::Result<(), SchemaError> {
    let mut err = SchemaError::default();
    for c in &REQUIRED_COLUMNS {
        match headers.iter().filter(|h| *h == c.header || *h == c.alias).count() {
            0 => err.missing.push(c.header.to_string()),
            1 => {}
            _ => err.duplicated.push(c.header.to_string()),
        }
    }
    if err.missing.is_empty() && err.duplicated.is_empty() {
        Ok(())
    } else {
        Err(err)
    }
}

// Exports from older Spanish-locale tools arrive as Latin-1; such a cell is
// re-read byte for byte instead of costing the whole row.
fn decode_cell(bytes: &[u8]) -> (String, bool) {
    match std::str::from_utf8(bytes) {
        Ok(s) => (s.to_string(), false),
        Err(_) => (bytes.iter().map(|&b| char::from(b)).collect(), true),
    }
}

fn decode_record(raw: &ByteRecord) -> (StringRecord, usize) {
    let mut reencoded = 0;
    let cells: Vec<String> = raw
        .iter()
        .map(|b| {
            let (cell, latin1) = decode_cell(b);
            reencoded += usize::from(latin1);
            cell
        })
        .collect();
    (StringRecord::from(cells), reencoded)
}

pub fn load_from_reader<R: Read>(reader: R) -> Result<(Vec<StageRecord>, LoadReport)> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(reader);
    let (headers, _) = decode_record(rdr.byte_headers()?);
    check_schema(&headers)?;

    let mut report = LoadReport::default();
    let mut records = Vec::new();
    for result in rdr.byte_records() {
        report.total_rows += 1;
        let raw = match result.and_then(|b| {
            let (row, reencoded) = decode_record(&b);
            report.latin1_cells += reencoded;
            row.deserialize::<RawRow>(Some(&headers))
        }) {
            Ok(r) => r,
            Err(e) => {
                warn!(row = report.total_rows, error = %e, "skipping malformed row");
                report.malformed_rows += 1;
                continue;
            }
        };
        let (record, errors) = normalize_row(&raw);
        for e in &errors {
            debug!(stage_id = %record.stage_id, "{}", e);
        }
        report.unparsed_dates += errors.len();
        records.push(record);
    }
    report.loaded_rows = records.len();
    if report.latin1_cells > 0 {
        debug!(cells = report.latin1_cells, "decoded non-UTF-8 cells as Latin-1");
    }

    info!(
        rows = report.total_rows,
        loaded = report.loaded_rows,
        malformed = report.malformed_rows,
        unparsed_dates = report.unparsed_dates,
        "stage table loaded"
    );
    Ok((records, report))
}

pub fn load_from_path(path: &Path) -> Result<(Vec<StageRecord>, LoadReport)> {
    info!(path = %path.display(), "reading stage CSV");
    load_from_reader(File::open(path)?)
}

pub fn load_from_url(url: &str) -> Result<(Vec<StageRecord>, LoadReport)> {
    info!(%url, "fetching stage CSV");
    let body = reqwest::blocking::get(url)?.error_for_status()?.bytes()?;
    load_from_reader(body.as_ref())
}

pub fn load(source: &Source) -> Result<(Vec<StageRecord>, LoadReport)> {
    match source {
        Source::Path(p) => load_from_path(p),
        Source::Url(u) => load_from_url(u),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KpiError;
    use chrono::NaiveDate;
    use std::io::Write;

    const HEADER: &str = "IDEtapa,NoEtapa,Pais,EstadoColumnaGOP,Alias,Sector,SubSector,Fecha CartaConsulta,FechaAprobacion,FechaVigencia,FechaElegibilidad,FechadePrimerDesembolso\n";

    #[test]
    fn loads_sheet_headers() {
        let csv = format!(
            "{HEADER}ST-1,1,Panama,Active,Ports,Transport,Maritime,10/01/2020,10/04/2020,,bad,01/05/2021\n"
        );
        let (records, report) = load_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.stage_id, "ST-1");
        assert_eq!(r.subsector, "Maritime");
        assert_eq!(r.approval, NaiveDate::from_ymd_opt(2020, 4, 10));
        assert_eq!(r.effectiveness, None);
        assert_eq!(r.eligibility, None);
        assert_eq!(r.first_disbursement, NaiveDate::from_ymd_opt(2021, 5, 1));
        assert_eq!(report.unparsed_dates, 1);
        assert_eq!(report.loaded_rows, 1);
    }

    #[test]
    fn accepts_snake_case_aliases_and_extra_columns() {
        let csv = "stage_id,stage_number,country,status,alias,sector,subsector,consultation_letter,approval,effectiveness,eligibility,first_disbursement,notes\n\
                   S9,2,Chile,Closed,Water,Energy,Hydro,2020-01-10,2020-04-10,,,,hello\n";
        let (records, _) = load_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(records[0].country, "Chile");
        assert_eq!(records[0].consultation_letter, NaiveDate::from_ymd_opt(2020, 1, 10));
    }

    #[test]
    fn missing_columns_is_a_schema_error() {
        let csv = "IDEtapa,NoEtapa,Pais\nST-1,1,Peru\n";
        match load_from_reader(csv.as_bytes()) {
            Err(KpiError::Schema(e)) => {
                assert_eq!(e.missing.len(), 9);
                assert!(e.missing.contains(&"FechaAprobacion".to_string()));
                assert!(e.duplicated.is_empty());
            }
            other => panic!("expected schema error, got {:?}", other.map(|(r, _)| r.len())),
        }
    }

    #[test]
    fn header_and_alias_together_is_a_schema_error() {
        let csv = format!(
            "stage_id,{HEADER}S1,ST-1,1,Peru,Active,A,B,C,10/01/2020,10/04/2020,,,\n"
        );
        match load_from_reader(csv.as_bytes()) {
            Err(KpiError::Schema(e)) => {
                assert_eq!(e.duplicated, vec!["IDEtapa".to_string()]);
                assert!(e.missing.is_empty());
            }
            other => panic!("expected schema error, got {:?}", other.map(|(r, _)| r.len())),
        }
    }

    #[test]
    fn repeated_header_is_a_schema_error() {
        let csv = format!("Pais,{HEADER}");
        assert!(matches!(
            load_from_reader(csv.as_bytes()),
            Err(KpiError::Schema(SchemaError { duplicated, .. })) if duplicated == vec!["Pais".to_string()]
        ));
    }

    #[test]
    fn latin1_cell_keeps_the_row() {
        let mut csv = HEADER.as_bytes().to_vec();
        csv.extend_from_slice(b"ST-5,1,Per\xfa,Active,A,B,C,10/01/2020,10/04/2020,,,\n");
        let (records, report) = load_from_reader(csv.as_slice()).unwrap();
        assert_eq!(report.malformed_rows, 0);
        assert_eq!(report.latin1_cells, 1);
        assert_eq!(records[0].country, "Perú");
        assert_eq!(records[0].approval, NaiveDate::from_ymd_opt(2020, 4, 10));
    }

    #[test]
    fn whitespace_in_metadata_is_kept_and_distinguishes_rows() {
        let csv = format!(
            "{HEADER}ST-6,1,Peru,Active,Roads ,B,C,10/01/2020,10/04/2020,,,\n\
             ST-6,1,Peru,Active,Roads,B,C,10/01/2020,10/04/2020,,,\n"
        );
        let (records, _) = load_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(records[0].alias, "Roads ");
        let (obs, report) = crate::kpi::run(records);
        assert_eq!(report.duplicates_removed, 0);
        assert_eq!(obs.len(), 2);
        assert!(obs.iter().any(|o| o.alias == "Roads "));
    }

    #[test]
    fn empty_input_is_a_schema_error() {
        assert!(matches!(load_from_reader("".as_bytes()), Err(KpiError::Schema(_))));
    }

    #[test]
    fn short_rows_become_absent_fields() {
        let csv = format!("{HEADER}ST-2,1,Peru\n");
        let (records, report) = load_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(records[0].country, "Peru");
        assert_eq!(records[0].approval, None);
        assert_eq!(report.malformed_rows, 0);
    }

    #[test]
    fn sheet_to_long_table() {
        let row = "ST-4,1,Peru,Active,A,B,C,10/01/2020,10/04/2020,,01/06/2021,01/05/2021\n";
        let csv = format!("{HEADER}{row}{row}");
        let (records, _) = load_from_reader(csv.as_bytes()).unwrap();
        let (obs, report) = crate::kpi::run(records);
        assert_eq!(report.duplicates_removed, 1);
        assert_eq!(report.dropped_negative, 1);
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].kpi_value, 3);
        assert_eq!(obs[0].year, 2020);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{HEADER}ST-3,1,Haiti,Active,A,B,C,,,,,\n").unwrap();
        let (records, _) = load(&Source::Path(file.path().to_path_buf())).unwrap();
        assert_eq!(records.len(), 1);
    }
}
