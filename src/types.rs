use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::Tabled;

/// One CSV row exactly as the stage sheet exports it.
///
/// Every cell is optional text; typing happens in the normalizer so a bad
/// date never rejects the whole row.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRow {
    #[serde(rename = "IDEtapa", alias = "stage_id")]
    pub stage_id: Option<String>,
    #[serde(rename = "NoEtapa", alias = "stage_number")]
    pub stage_number: Option<String>,
    #[serde(rename = "Pais", alias = "country")]
    pub country: Option<String>,
    #[serde(rename = "EstadoColumnaGOP", alias = "status")]
    pub status: Option<String>,
    #[serde(rename = "Alias", alias = "alias")]
    pub alias: Option<String>,
    #[serde(rename = "Sector", alias = "sector")]
    pub sector: Option<String>,
    #[serde(rename = "SubSector", alias = "subsector")]
    pub subsector: Option<String>,
    #[serde(rename = "Fecha CartaConsulta", alias = "consultation_letter")]
    pub consultation_letter: Option<String>,
    #[serde(rename = "FechaAprobacion", alias = "approval")]
    pub approval: Option<String>,
    #[serde(rename = "FechaVigencia", alias = "effectiveness")]
    pub effectiveness: Option<String>,
    #[serde(rename = "FechaElegibilidad", alias = "eligibility")]
    pub eligibility: Option<String>,
    #[serde(rename = "FechadePrimerDesembolso", alias = "first_disbursement")]
    pub first_disbursement: Option<String>,
}

/// A required input column: the sheet header plus the snake_case alias.
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub header: &'static str,
    pub alias: &'static str,
}

pub const REQUIRED_COLUMNS: [Column; 12] = [
    Column { header: "IDEtapa", alias: "stage_id" },
    Column { header: "NoEtapa", alias: "stage_number" },
    Column { header: "Pais", alias: "country" },
    Column { header: "EstadoColumnaGOP", alias: "status" },
    Column { header: "Alias", alias: "alias" },
    Column { header: "Sector", alias: "sector" },
    Column { header: "SubSector", alias: "subsector" },
    Column { header: "Fecha CartaConsulta", alias: "consultation_letter" },
    Column { header: "FechaAprobacion", alias: "approval" },
    Column { header: "FechaVigencia", alias: "effectiveness" },
    Column { header: "FechaElegibilidad", alias: "eligibility" },
    Column { header: "FechadePrimerDesembolso", alias: "first_disbursement" },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Milestone {
    ConsultationLetter,
    Approval,
    Effectiveness,
    Eligibility,
    FirstDisbursement,
}

impl Milestone {
    /// Field name used in logs and parse errors.
    pub fn field_name(self) -> &'static str {
        match self {
            Milestone::ConsultationLetter => "consultation_letter",
            Milestone::Approval => "approval",
            Milestone::Effectiveness => "effectiveness",
            Milestone::Eligibility => "eligibility",
            Milestone::FirstDisbursement => "first_disbursement",
        }
    }
}

/// A stage after date normalization. Dates are either valid or `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StageRecord {
    pub stage_id: String,
    pub stage_number: String,
    pub country: String,
    pub status: String,
    pub alias: String,
    pub sector: String,
    pub subsector: String,
    pub consultation_letter: Option<NaiveDate>,
    pub approval: Option<NaiveDate>,
    pub effectiveness: Option<NaiveDate>,
    pub eligibility: Option<NaiveDate>,
    pub first_disbursement: Option<NaiveDate>,
}

impl StageRecord {
    pub fn milestone(&self, m: Milestone) -> Option<NaiveDate> {
        match m {
            Milestone::ConsultationLetter => self.consultation_letter,
            Milestone::Approval => self.approval,
            Milestone::Effectiveness => self.effectiveness,
            Milestone::Eligibility => self.eligibility,
            Milestone::FirstDisbursement => self.first_disbursement,
        }
    }
}

/// A KPI is named after the later of its two milestones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum KpiName {
    Approval,
    Effectiveness,
    Eligibility,
    FirstDisbursement,
}

impl KpiName {
    pub const ALL: [KpiName; 4] = [
        KpiName::Approval,
        KpiName::Effectiveness,
        KpiName::Eligibility,
        KpiName::FirstDisbursement,
    ];

    /// `(earlier, later)` milestone pair the duration is measured between.
    pub fn endpoints(self) -> (Milestone, Milestone) {
        match self {
            KpiName::Approval => (Milestone::ConsultationLetter, Milestone::Approval),
            KpiName::Effectiveness => (Milestone::Approval, Milestone::Effectiveness),
            KpiName::Eligibility => (Milestone::Effectiveness, Milestone::Eligibility),
            KpiName::FirstDisbursement => (Milestone::Eligibility, Milestone::FirstDisbursement),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            KpiName::Approval => "Approval",
            KpiName::Effectiveness => "Effectiveness",
            KpiName::Eligibility => "Eligibility",
            KpiName::FirstDisbursement => "FirstDisbursement",
        }
    }
}

impl fmt::Display for KpiName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Long-table column order, as written to every export.
pub const OUTPUT_COLUMNS: [&str; 10] = [
    "stage_id",
    "kpi_name",
    "kpi_value",
    "year",
    "stage_number",
    "country",
    "status",
    "alias",
    "sector",
    "subsector",
];

/// One row of the long table. Field order is the export column order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Tabled)]
pub struct KpiObservation {
    pub stage_id: String,
    pub kpi_name: KpiName,
    pub kpi_value: u32,
    pub year: i32,
    pub stage_number: String,
    pub country: String,
    pub status: String,
    pub alias: String,
    pub sector: String,
    pub subsector: String,
}

/// Months per (year, KPI), the series a chart plots.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct KpiSummaryRow {
    pub year: i32,
    pub kpi_name: KpiName,
    pub observations: usize,
    pub avg_months: String,
    pub median_months: String,
}
