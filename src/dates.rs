// Date normalization for milestone cells.
//
// The sheet is exported with day/month/year dates, but hand-edited rows drift
// into ISO dates, two-digit years, timestamps and spelled-out months. Anything
// we can't read becomes an absent date for that field only.
use crate::error::FieldParseError;
use crate::types::{Milestone, RawRow, StageRecord};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

/// Layout the sheet is published with.
pub const STRICT_FORMAT: &str = "%d/%m/%Y";

const LENIENT_DATE_FORMATS: &[&str] = &[
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d/%m/%y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
];

const LENIENT_DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// A milestone cell before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawDate<'a> {
    Text(&'a str),
    Date(NaiveDate),
    Missing,
}

impl<'a> From<Option<&'a str>> for RawDate<'a> {
    fn from(value: Option<&'a str>) -> Self {
        match value {
            Some(s) => RawDate::Text(s),
            None => RawDate::Missing,
        }
    }
}

impl From<NaiveDate> for RawDate<'_> {
    fn from(value: NaiveDate) -> Self {
        RawDate::Date(value)
    }
}

// `%Y` happily reads "20" as year 20; such a hit means the cell used a
// two-digit year and a later format should get a go at it.
fn plausible(d: NaiveDate) -> Option<NaiveDate> {
    (d.year() >= 1000).then_some(d)
}

fn parse_lenient(s: &str) -> Option<NaiveDate> {
    LENIENT_DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok().and_then(plausible))
        .or_else(|| {
            LENIENT_DATETIME_FORMATS.iter().find_map(|f| {
                NaiveDateTime::parse_from_str(s, f)
                    .ok()
                    .and_then(|dt| plausible(dt.date()))
            })
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(s)
                .ok()
                .and_then(|dt| plausible(dt.date_naive()))
        })
}

/// Parse one text cell. Blank text is absent, not an error.
pub fn parse_date(field: &'static str, s: &str) -> Result<Option<NaiveDate>, FieldParseError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(s, STRICT_FORMAT)
        .ok()
        .and_then(plausible)
        .or_else(|| parse_lenient(s))
        .map(Some)
        .ok_or_else(|| FieldParseError {
            field,
            value: s.to_string(),
        })
}

pub fn normalize(field: &'static str, raw: RawDate<'_>) -> Result<Option<NaiveDate>, FieldParseError> {
    match raw {
        RawDate::Text(s) => parse_date(field, s),
        RawDate::Date(d) => Ok(Some(d)),
        RawDate::Missing => Ok(None),
    }
}

// Metadata is carried verbatim; only date cells are trimmed.
fn text(v: &Option<String>) -> String {
    v.clone().unwrap_or_default()
}

/// Turn a raw CSV row into a `StageRecord`.
///
/// Never fails: each unreadable date is returned alongside the record so the
/// caller can log and count it.
pub fn normalize_row(raw: &RawRow) -> (StageRecord, Vec<FieldParseError>) {
    let mut errors = Vec::new();
    let mut date = |m: Milestone, cell: &Option<String>| {
        normalize(m.field_name(), cell.as_deref().into()).unwrap_or_else(|e| {
            errors.push(e);
            None
        })
    };

    let consultation_letter = date(Milestone::ConsultationLetter, &raw.consultation_letter);
    let approval = date(Milestone::Approval, &raw.approval);
    let effectiveness = date(Milestone::Effectiveness, &raw.effectiveness);
    let eligibility = date(Milestone::Eligibility, &raw.eligibility);
    let first_disbursement = date(Milestone::FirstDisbursement, &raw.first_disbursement);

    let record = StageRecord {
        stage_id: text(&raw.stage_id),
        stage_number: text(&raw.stage_number),
        country: text(&raw.country),
        status: text(&raw.status),
        alias: text(&raw.alias),
        sector: text(&raw.sector),
        subsector: text(&raw.subsector),
        consultation_letter,
        approval,
        effectiveness,
        eligibility,
        first_disbursement,
    };
    (record, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_day_first_layout() {
        assert_eq!(parse_date("approval", "10/04/2020"), Ok(Some(ymd(2020, 4, 10))));
        assert_eq!(parse_date("approval", " 1/2/2021 "), Ok(Some(ymd(2021, 2, 1))));
    }

    #[test]
    fn falls_back_to_lenient_layouts() {
        assert_eq!(parse_date("approval", "2020-04-10"), Ok(Some(ymd(2020, 4, 10))));
        assert_eq!(parse_date("approval", "10-04-2020"), Ok(Some(ymd(2020, 4, 10))));
        assert_eq!(parse_date("approval", "10/04/20"), Ok(Some(ymd(2020, 4, 10))));
        assert_eq!(
            parse_date("approval", "2020-04-10 13:45:00"),
            Ok(Some(ymd(2020, 4, 10)))
        );
        assert_eq!(
            parse_date("approval", "2020-04-10T00:00:00Z"),
            Ok(Some(ymd(2020, 4, 10)))
        );
        assert_eq!(parse_date("approval", "10 April 2020"), Ok(Some(ymd(2020, 4, 10))));
        assert_eq!(parse_date("approval", "Apr 10, 2020"), Ok(Some(ymd(2020, 4, 10))));
    }

    #[test]
    fn blank_is_absent_not_error() {
        assert_eq!(parse_date("approval", ""), Ok(None));
        assert_eq!(parse_date("approval", "   "), Ok(None));
        assert_eq!(normalize("approval", RawDate::Missing), Ok(None));
    }

    #[test]
    fn garbage_reports_field_and_value() {
        let err = parse_date("eligibility", "pending").unwrap_err();
        assert_eq!(err.field, "eligibility");
        assert_eq!(err.value, "pending");
        assert!(parse_date("eligibility", "31/02/2020").is_err());
    }

    #[test]
    fn typed_dates_pass_through() {
        let d = ymd(2019, 12, 31);
        assert_eq!(normalize("approval", d.into()), Ok(Some(d)));
    }

    #[test]
    fn bad_cell_keeps_the_row() {
        let raw = RawRow {
            stage_id: Some(" ST-1 ".into()),
            country: Some("Honduras".into()),
            consultation_letter: Some("10/01/2020".into()),
            approval: Some("not a date".into()),
            effectiveness: Some("".into()),
            ..Default::default()
        };
        let (record, errors) = normalize_row(&raw);
        assert_eq!(record.stage_id, " ST-1 ");
        assert_eq!(record.country, "Honduras");
        assert_eq!(record.stage_number, "");
        assert_eq!(record.consultation_letter, Some(ymd(2020, 1, 10)));
        assert_eq!(record.approval, None);
        assert_eq!(record.effectiveness, None);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "approval");
    }
}
