// Stage KPI pipeline: dedupe -> month durations -> wide-to-long -> filter.
use crate::types::{KpiName, KpiObservation, StageRecord};
use chrono::{Datelike, Months, NaiveDate};
use std::collections::HashSet;
use tracing::{debug, info};

/// Whole calendar months from `earlier` to `later`, or `None` if either
/// endpoint is absent.
///
/// Counts like a calendar, not by days: the partial month is truncated toward
/// zero, and month ends clip (Jan 31 to Feb 29 is one month). Goes negative
/// when `later` precedes `earlier`.
pub fn months_between(later: Option<NaiveDate>, earlier: Option<NaiveDate>) -> Option<i32> {
    let (later, earlier) = (later?, earlier?);
    let mut months = (later.year() - earlier.year()) * 12 + later.month() as i32
        - earlier.month() as i32;

    if months > 0 {
        let reached = earlier.checked_add_months(Months::new(months.unsigned_abs()));
        if reached.map_or(true, |d| d > later) {
            months -= 1;
        }
    } else if months < 0 {
        let reached = earlier.checked_sub_months(Months::new(months.unsigned_abs()));
        if reached.map_or(true, |d| d < later) {
            months += 1;
        }
    }
    Some(months)
}

/// Collapse rows identical in every field, keeping first-seen order.
pub fn dedupe(records: Vec<StageRecord>) -> Vec<StageRecord> {
    let mut seen: HashSet<StageRecord> = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|r| seen.insert(r.clone()))
        .collect()
}

/// A stage with its four KPI columns: the wide layout.
#[derive(Debug, Clone)]
pub struct StageKpis<'a> {
    pub record: &'a StageRecord,
    pub values: [Option<i32>; 4],
}

impl StageKpis<'_> {
    pub fn value(&self, kpi: KpiName) -> Option<i32> {
        self.values[kpi as usize]
    }
}

pub fn compute_kpis(record: &StageRecord) -> StageKpis<'_> {
    let values = KpiName::ALL.map(|kpi| {
        let (earlier, later) = kpi.endpoints();
        months_between(record.milestone(later), record.milestone(earlier))
    });
    StageKpis { record, values }
}

/// Why a wide KPI cell did not become an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dropped {
    Absent,
    Negative,
}

/// Build the observation for one KPI of one stage.
///
/// The year comes straight from the KPI's later milestone on the same row.
pub fn observation(kpis: &StageKpis<'_>, kpi: KpiName) -> Result<KpiObservation, Dropped> {
    let r = kpis.record;
    let (_, later) = kpi.endpoints();
    let months = kpis.value(kpi).ok_or(Dropped::Absent)?;
    let year = r.milestone(later).ok_or(Dropped::Absent)?.year();
    let kpi_value = u32::try_from(months).map_err(|_| Dropped::Negative)?;

    Ok(KpiObservation {
        stage_id: r.stage_id.clone(),
        kpi_name: kpi,
        kpi_value,
        year,
        stage_number: r.stage_number.clone(),
        country: r.country.clone(),
        status: r.status.clone(),
        alias: r.alias.clone(),
        sector: r.sector.clone(),
        subsector: r.subsector.clone(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub input_rows: usize,
    pub duplicates_removed: usize,
    pub observations: usize,
    pub dropped_absent: usize,
    pub dropped_negative: usize,
}

/// Run the whole transformation over an in-memory stage table.
///
/// Output is sorted by stage, KPI and year so repeated exports diff cleanly.
pub fn run(records: Vec<StageRecord>) -> (Vec<KpiObservation>, PipelineReport) {
    let mut report = PipelineReport {
        input_rows: records.len(),
        ..Default::default()
    };

    let stages = dedupe(records);
    report.duplicates_removed = report.input_rows - stages.len();
    if report.duplicates_removed > 0 {
        debug!(count = report.duplicates_removed, "collapsed duplicate rows");
    }

    let mut out = Vec::with_capacity(stages.len() * KpiName::ALL.len());
    for stage in &stages {
        let kpis = compute_kpis(stage);
        for kpi in KpiName::ALL {
            match observation(&kpis, kpi) {
                Ok(obs) => out.push(obs),
                Err(Dropped::Absent) => report.dropped_absent += 1,
                Err(Dropped::Negative) => {
                    debug!(stage_id = %stage.stage_id, kpi = %kpi, "negative duration dropped");
                    report.dropped_negative += 1;
                }
            }
        }
    }

    out.sort_by(|a, b| {
        a.stage_id
            .cmp(&b.stage_id)
            .then(a.kpi_name.cmp(&b.kpi_name))
            .then(a.year.cmp(&b.year))
            .then(a.kpi_value.cmp(&b.kpi_value))
    });
    report.observations = out.len();

    info!(
        stages = stages.len(),
        observations = report.observations,
        absent = report.dropped_absent,
        negative = report.dropped_negative,
        "KPI pipeline finished"
    );
    (out, report)
}
