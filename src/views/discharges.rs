//! Discharge trends view.
//!
//! Fetches the discharge events in a date range for the selected programs
//! and derives the class totals, the share gauges, the per-program class
//! mix and one page of the discharge table.

use tracing::info;

use super::{Loaded, ViewContext};
use crate::analysis::{class_mix_by_program, paginate, summarize_discharges};
use crate::backend::ViewQuery;
use crate::models::{DateRange, DischargeRecord, DischargeReport, ProgramCategory, ReportMetadata};

/// Columns read from the discharges view.
const COLUMNS: [&str; 5] = [
    "casefile_id",
    "full_name",
    "discharge_class",
    "program_category",
    "discharge_date",
];

/// Filters for one discharge trends invocation.
#[derive(Debug, Clone)]
pub struct DischargeFilter {
    pub range: DateRange,
    /// Programs to include; empty selects every known program.
    pub programs: Vec<ProgramCategory>,
    pub page: usize,
    pub page_size: usize,
}

impl DischargeFilter {
    /// Programs actually queried, in priority order.
    pub fn selected_programs(&self) -> Vec<ProgramCategory> {
        let mut programs = if self.programs.is_empty() {
            ProgramCategory::KNOWN.to_vec()
        } else {
            self.programs.clone()
        };
        programs.sort();
        programs.dedup();
        programs
    }
}

pub fn query(view: &str, filter: &DischargeFilter) -> ViewQuery {
    let programs = filter.selected_programs();
    ViewQuery::new(view)
        .select(&COLUMNS)
        .between("discharge_date", &filter.range)
        .in_list("program_category", programs.iter().map(|p| p.as_str()))
}

pub fn build(
    metadata: ReportMetadata,
    filter: &DischargeFilter,
    records: &[DischargeRecord],
) -> DischargeReport {
    let summary = summarize_discharges(records);

    DischargeReport {
        metadata,
        range: filter.range,
        selected_programs: filter.selected_programs(),
        summary,
        shares: summary.shares(),
        by_program: class_mix_by_program(records),
        table: paginate(records, filter.page, filter.page_size),
    }
}

pub async fn load(
    ctx: &ViewContext<'_>,
    filter: &DischargeFilter,
) -> Loaded<DischargeReport, DischargeRecord> {
    let view = &ctx.config.views.discharges;
    info!(
        "Loading discharges for {} ({} programs)",
        filter.range,
        filter.selected_programs().len()
    );

    let rows: Vec<DischargeRecord> = ctx.fetch_rows(query(view, filter)).await;
    let report = build(ctx.metadata(view, rows.len()), filter, &rows);

    Loaded { report, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn filter(programs: Vec<ProgramCategory>) -> DischargeFilter {
        DischargeFilter {
            range: DateRange::new(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
            ),
            programs,
            page: 1,
            page_size: 5,
        }
    }

    fn metadata(rows: usize) -> ReportMetadata {
        ReportMetadata {
            source_view: "vw_discharges".to_string(),
            generated_at: Utc::now(),
            row_count: rows,
            user: None,
        }
    }

    #[test]
    fn test_default_selection_is_all_known_programs() {
        assert_eq!(filter(Vec::new()).selected_programs(), ProgramCategory::KNOWN.to_vec());
    }

    #[test]
    fn test_selection_is_ordered_and_deduplicated() {
        let f = filter(vec![
            ProgramCategory::Aftercare,
            ProgramCategory::Detox,
            ProgramCategory::Aftercare,
        ]);
        assert_eq!(
            f.selected_programs(),
            vec![ProgramCategory::Detox, ProgramCategory::Aftercare]
        );
    }

    #[test]
    fn test_query() {
        let q = query("vw_discharges", &filter(vec![ProgramCategory::SudIop]));
        assert_eq!(
            q.to_string(),
            "vw_discharges?select=casefile_id,full_name,discharge_class,program_category,discharge_date\
             &discharge_date=gte.2024-01-01&discharge_date=lte.2024-01-07\
             &program_category=in.(\"SUD IOP\")"
        );
    }

    #[test]
    fn test_build_from_fixture() {
        let records: Vec<DischargeRecord> =
            serde_json::from_str(include_str!("../../fixtures/discharges.json")).unwrap();
        let report = build(metadata(records.len()), &filter(Vec::new()), &records);

        assert_eq!(report.summary.total, 8);
        assert_eq!(report.summary.ama, 2);
        assert_eq!(report.summary.admin, 1);
        assert_eq!(report.summary.successful, 4);
        assert!((report.shares.successful - 50.0).abs() < 1e-9);

        assert_eq!(report.by_program[0].program, ProgramCategory::Detox);
        assert_eq!(report.by_program[0].total, 3);

        assert_eq!(report.table.total, 8);
        assert_eq!(report.table.page_count, 2);
        assert_eq!(report.table.items.len(), 5);
        assert_eq!(report.table.items[0].casefile_id, "1042:3");
    }

    #[test]
    fn test_build_with_no_records() {
        let report = build(metadata(0), &filter(Vec::new()), &[]);
        assert_eq!(report.summary.total, 0);
        assert_eq!(report.shares.ama, 0.0);
        assert!(report.by_program.is_empty());
        assert_eq!(report.table.page_count, 0);
    }
}
