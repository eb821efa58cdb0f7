use crate::types::{KpiName, KpiObservation, KpiSummaryRow};
use crate::util::{average, format_number, median};
use std::collections::BTreeMap;

/// Average and median months per (year, KPI), ordered by year then KPI.
pub fn generate_kpi_summary(data: &[KpiObservation]) -> Vec<KpiSummaryRow> {
    let mut groups: BTreeMap<(i32, KpiName), Vec<f64>> = BTreeMap::new();
    for o in data {
        groups
            .entry((o.year, o.kpi_name))
            .or_default()
            .push(f64::from(o.kpi_value));
    }

    groups
        .into_iter()
        .map(|((year, kpi_name), months)| KpiSummaryRow {
            year,
            kpi_name,
            observations: months.len(),
            avg_months: format_number(average(&months), 2),
            median_months: format_number(median(months), 1),
        })
        .collect()
}
