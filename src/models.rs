//! Data models for the reporting client.
//!
//! This module contains the row types fetched from the reporting views,
//! the shared program enumeration, and the derived aggregate and report
//! records rendered by the views.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Treatment program category.
///
/// Variant order is the display priority used everywhere programs are
/// listed. Names the backend sends that are not one of the five known
/// programs are kept verbatim in `Other` and order after every known
/// program (alphabetically among themselves).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProgramCategory {
    Detox,
    Residential,
    SudIop,
    PsychIop,
    Aftercare,
    Other(String),
}

impl ProgramCategory {
    /// The five known programs in priority order.
    pub const KNOWN: [ProgramCategory; 5] = [
        ProgramCategory::Detox,
        ProgramCategory::Residential,
        ProgramCategory::SudIop,
        ProgramCategory::PsychIop,
        ProgramCategory::Aftercare,
    ];

    /// Name as stored in the reporting views.
    pub fn as_str(&self) -> &str {
        match self {
            ProgramCategory::Detox => "Detox",
            ProgramCategory::Residential => "Residential",
            ProgramCategory::SudIop => "SUD IOP",
            ProgramCategory::PsychIop => "Psych IOP",
            ProgramCategory::Aftercare => "Aftercare",
            ProgramCategory::Other(name) => name,
        }
    }

    /// Whether this is one of the five known programs.
    pub fn is_known(&self) -> bool {
        !matches!(self, ProgramCategory::Other(_))
    }
}

impl fmt::Display for ProgramCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ProgramCategory {
    fn from(s: &str) -> Self {
        match s.trim() {
            "Detox" => ProgramCategory::Detox,
            "Residential" => ProgramCategory::Residential,
            "SUD IOP" => ProgramCategory::SudIop,
            "Psych IOP" => ProgramCategory::PsychIop,
            "Aftercare" => ProgramCategory::Aftercare,
            _ => ProgramCategory::Other(s.to_string()),
        }
    }
}

impl From<String> for ProgramCategory {
    fn from(s: String) -> Self {
        ProgramCategory::from(s.as_str())
    }
}

impl From<ProgramCategory> for String {
    fn from(program: ProgramCategory) -> Self {
        match program {
            ProgramCategory::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

/// Outcome tag of a discharge event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DischargeClass {
    /// Against medical advice.
    Ama,
    /// Administrative discharge.
    Admin,
    Successful,
    Other(String),
}

impl DischargeClass {
    pub fn as_str(&self) -> &str {
        match self {
            DischargeClass::Ama => "AMA",
            DischargeClass::Admin => "Admin",
            DischargeClass::Successful => "Successful",
            DischargeClass::Other(name) => name,
        }
    }

    /// Target share (percent) shown next to each class gauge.
    pub fn target_percent(&self) -> Option<f64> {
        match self {
            DischargeClass::Ama => Some(20.0),
            DischargeClass::Admin => Some(10.0),
            DischargeClass::Successful => Some(70.0),
            DischargeClass::Other(_) => None,
        }
    }
}

impl fmt::Display for DischargeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for DischargeClass {
    fn from(s: String) -> Self {
        match s.as_str() {
            "AMA" => DischargeClass::Ama,
            "Admin" => DischargeClass::Admin,
            "Successful" => DischargeClass::Successful,
            _ => DischargeClass::Other(s),
        }
    }
}

impl From<DischargeClass> for String {
    fn from(class: DischargeClass) -> Self {
        match class {
            DischargeClass::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

/// One row of the daily census view: one program on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Calendar day of the census snapshot.
    #[serde(rename = "census_date", alias = "date")]
    pub date: NaiveDate,
    /// Program the row belongs to.
    #[serde(alias = "program")]
    pub program_category: ProgramCategory,
    /// Point-in-time occupancy.
    #[serde(default)]
    pub census: Option<f64>,
    /// Flow counts. Views may report them as floats or as negative
    /// adjustments; both are accepted.
    #[serde(default, deserialize_with = "lenient_count")]
    pub admissions: Option<i64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub transfer_in: Option<i64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub transfer_out: Option<i64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub discharges: Option<i64>,
}

/// Any JSON number (or null) as a whole count, rounded to the nearest integer.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.map(|v| v.round() as i64))
}

/// One row of the discharges view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DischargeRecord {
    pub casefile_id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub discharge_class: DischargeClass,
    pub program_category: ProgramCategory,
    pub discharge_date: NaiveDate,
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// A range is usable when it does not end before it starts.
    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Sums of the four patient-flow metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowTotals {
    pub admissions: i64,
    pub transfer_in: i64,
    pub transfer_out: i64,
    pub discharges: i64,
}

impl FlowTotals {
    /// Adds one row's flow metrics, counting missing values as zero.
    pub fn add_row(&mut self, row: &ReportRow) {
        self.admissions += row.admissions.unwrap_or(0);
        self.transfer_in += row.transfer_in.unwrap_or(0);
        self.transfer_out += row.transfer_out.unwrap_or(0);
        self.discharges += row.discharges.unwrap_or(0);
    }
}

impl std::ops::AddAssign for FlowTotals {
    fn add_assign(&mut self, other: Self) {
        self.admissions += other.admissions;
        self.transfer_in += other.transfer_in;
        self.transfer_out += other.transfer_out;
        self.discharges += other.discharges;
    }
}

/// Whole-range aggregate over a set of census rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    /// Mean of the per-day census sums.
    pub census: f64,
    #[serde(flatten)]
    pub flows: FlowTotals,
}

/// Aggregate for one program over a set of census rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramAggregate {
    pub program: ProgramCategory,
    pub average_census: f64,
    #[serde(flatten)]
    pub flows: FlowTotals,
}

/// Discharge counts per class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DischargeSummary {
    pub total: usize,
    pub ama: usize,
    pub admin: usize,
    pub successful: usize,
}

/// Percentage of discharges per class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassShares {
    pub ama: f64,
    pub admin: f64,
    pub successful: f64,
}

/// Discharge class mix within one program (one stacked bar).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramDischargeMix {
    pub program: ProgramCategory,
    pub total: usize,
    pub shares: ClassShares,
}

/// One page of a client-side sliced list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// 1-based page number.
    pub page: usize,
    pub page_count: usize,
    pub total: usize,
    pub items: Vec<T>,
}

/// Metadata shared by every rendered report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Reporting view the rows came from.
    pub source_view: String,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Number of rows fetched.
    pub row_count: usize,
    /// Signed-in user, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

/// Single-date census snapshot (one card per row).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyReport {
    pub metadata: ReportMetadata,
    pub date: NaiveDate,
    /// Distinct programs present, in priority order.
    pub programs: Vec<ProgramCategory>,
    pub totals: DailyAggregate,
    pub rows: Vec<ReportRow>,
}

/// Census trends over a date range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CensusReport {
    pub metadata: ReportMetadata,
    pub range: DateRange,
    pub overall: DailyAggregate,
    pub programs: Vec<ProgramAggregate>,
}

/// Discharge trends over a date range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DischargeReport {
    pub metadata: ReportMetadata,
    pub range: DateRange,
    /// Program filter applied to the query.
    pub selected_programs: Vec<ProgramCategory>,
    pub summary: DischargeSummary,
    pub shares: ClassShares,
    pub by_program: Vec<ProgramDischargeMix>,
    pub table: Page<DischargeRecord>,
}
