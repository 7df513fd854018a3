//! Census trends view.

use tracing::info;

use super::{Loaded, ViewContext};
use crate::analysis::{compute_overall_aggregate, compute_program_aggregates};
use crate::backend::ViewQuery;
use crate::models::{CensusReport, DateRange, ReportMetadata, ReportRow};

pub fn query(view: &str, range: &DateRange) -> ViewQuery {
    ViewQuery::new(view).between("census_date", range)
}

pub fn build(metadata: ReportMetadata, range: DateRange, rows: &[ReportRow]) -> CensusReport {
    CensusReport {
        metadata,
        range,
        overall: compute_overall_aggregate(rows),
        programs: compute_program_aggregates(rows),
    }
}

pub async fn load(ctx: &ViewContext<'_>, range: DateRange) -> Loaded<CensusReport, ReportRow> {
    let view = &ctx.config.views.daily_census;
    info!("Loading census trends for {}", range);

    let rows: Vec<ReportRow> = ctx.fetch_rows(query(view, &range)).await;
    let report = build(ctx.metadata(view, rows.len()), range, &rows);

    Loaded { report, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProgramCategory;
    use chrono::{NaiveDate, Utc};

    fn fixture() -> Vec<ReportRow> {
        serde_json::from_str(include_str!("../../fixtures/daily_census.json")).unwrap()
    }

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        )
    }

    #[test]
    fn test_query() {
        assert_eq!(
            query("vw_daily_census", &range()).to_string(),
            "vw_daily_census?select=*&census_date=gte.2024-01-01&census_date=lte.2024-01-03"
        );
    }

    #[test]
    fn test_build_from_fixture() {
        let rows = fixture();
        let metadata = ReportMetadata {
            source_view: "vw_daily_census".to_string(),
            generated_at: Utc::now(),
            row_count: rows.len(),
            user: Some("staff@example.com".to_string()),
        };

        let report = build(metadata, range(), &rows);

        // Daily sums 55, 67 and 4 over three dates.
        assert!((report.overall.census - 42.0).abs() < 1e-9);
        assert_eq!(report.overall.flows.admissions, 15);
        assert_eq!(report.overall.flows.discharges, 9);

        let programs: Vec<_> = report.programs.iter().map(|p| p.program.clone()).collect();
        assert_eq!(
            programs,
            vec![
                ProgramCategory::Detox,
                ProgramCategory::Residential,
                ProgramCategory::SudIop,
                ProgramCategory::PsychIop,
                ProgramCategory::Aftercare,
                ProgramCategory::Other("Adolescent".to_string()),
            ]
        );

        let detox = &report.programs[0];
        assert!((detox.average_census - 23.0 / 3.0).abs() < 1e-9);
        assert_eq!(detox.flows.admissions, 9);
        assert_eq!(detox.flows.transfer_out, 3);
    }
}
