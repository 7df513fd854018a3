//! Census aggregation.
//!
//! Both functions are pure: they derive aggregates freshly from the rows
//! they are given and never fail. Empty input yields zero-valued results.

use crate::models::{DailyAggregate, FlowTotals, ProgramAggregate, ProgramCategory, ReportRow};
use std::collections::BTreeMap;

/// Aggregate a whole row set: mean daily census plus grand flow totals.
///
/// Census is summed per distinct date first, so two programs reported on
/// the same day contribute one combined value to the mean.
pub fn compute_overall_aggregate(rows: &[ReportRow]) -> DailyAggregate {
    let mut daily_census: BTreeMap<chrono::NaiveDate, f64> = BTreeMap::new();
    let mut flows = FlowTotals::default();

    for row in rows {
        *daily_census.entry(row.date).or_default() += row.census.unwrap_or(0.0);
        flows.add_row(row);
    }

    DailyAggregate {
        census: mean(daily_census.values().copied(), daily_census.len()),
        flows,
    }
}

/// Aggregate per program, ordered by program priority.
pub fn compute_program_aggregates(rows: &[ReportRow]) -> Vec<ProgramAggregate> {
    // BTreeMap keyed by ProgramCategory yields priority order directly.
    let mut grouped: BTreeMap<&ProgramCategory, Vec<&ReportRow>> = BTreeMap::new();

    for row in rows {
        grouped.entry(&row.program_category).or_default().push(row);
    }

    grouped
        .into_iter()
        .map(|(program, program_rows)| {
            let mut flows = FlowTotals::default();
            for row in &program_rows {
                flows.add_row(row);
            }

            ProgramAggregate {
                program: program.clone(),
                average_census: mean(
                    program_rows.iter().map(|r| r.census.unwrap_or(0.0)),
                    program_rows.len(),
                ),
                flows,
            }
        })
        .collect()
}

/// Distinct programs present in a row set, in priority order.
pub fn programs_present(rows: &[ReportRow]) -> Vec<ProgramCategory> {
    let mut programs: Vec<ProgramCategory> =
        rows.iter().map(|r| r.program_category.clone()).collect();
    programs.sort();
    programs.dedup();
    programs
}

fn mean(values: impl Iterator<Item = f64>, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        values.sum::<f64>() / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn row(date: &str, program: &str, census: f64, admissions: i64, discharges: i64) -> ReportRow {
        ReportRow {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            program_category: ProgramCategory::from(program),
            census: Some(census),
            admissions: Some(admissions),
            transfer_in: None,
            transfer_out: None,
            discharges: Some(discharges),
        }
    }

    fn sample_rows() -> Vec<ReportRow> {
        vec![
            row("2024-01-01", "Detox", 10.0, 2, 1),
            row("2024-01-01", "Residential", 5.0, 1, 0),
            row("2024-01-02", "Detox", 8.0, 0, 2),
        ]
    }

    #[test]
    fn test_empty_input() {
        let overall = compute_overall_aggregate(&[]);
        assert_eq!(overall, DailyAggregate::default());
        assert_eq!(overall.census, 0.0);
        assert!(compute_program_aggregates(&[]).is_empty());
    }

    #[test]
    fn test_overall_aggregate_example() {
        let overall = compute_overall_aggregate(&sample_rows());

        assert_eq!(overall.flows.admissions, 3);
        assert_eq!(overall.flows.discharges, 3);
        assert_eq!(overall.flows.transfer_in, 0);
        assert_eq!(overall.flows.transfer_out, 0);
        // (15 + 8) / 2 days, not / 3 rows
        assert!((overall.census - 11.5).abs() < 1e-10);
    }

    #[test]
    fn test_program_aggregates_example() {
        let programs = compute_program_aggregates(&sample_rows());

        assert_eq!(programs.len(), 2);
        assert_eq!(programs[0].program, ProgramCategory::Detox);
        assert!((programs[0].average_census - 9.0).abs() < 1e-10);
        assert_eq!(programs[0].flows.admissions, 2);
        assert_eq!(programs[0].flows.discharges, 3);

        assert_eq!(programs[1].program, ProgramCategory::Residential);
        assert!((programs[1].average_census - 5.0).abs() < 1e-10);
        assert_eq!(programs[1].flows.admissions, 1);
        assert_eq!(programs[1].flows.discharges, 0);
    }

    #[test]
    fn test_program_order_is_priority_not_appearance() {
        let rows = vec![
            row("2024-01-01", "Aftercare", 3.0, 0, 0),
            row("2024-01-01", "Psych IOP", 4.0, 0, 0),
            row("2024-01-01", "Residential", 5.0, 0, 0),
            row("2024-01-01", "SUD IOP", 6.0, 0, 0),
            row("2024-01-01", "Detox", 7.0, 0, 0),
        ];

        let order: Vec<_> = compute_program_aggregates(&rows)
            .into_iter()
            .map(|p| p.program)
            .collect();

        assert_eq!(order, ProgramCategory::KNOWN.to_vec());
    }

    #[test]
    fn test_unknown_program_sorts_last() {
        let rows = vec![
            row("2024-01-01", "Unknown", 1.0, 4, 0),
            row("2024-01-01", "Detox", 2.0, 1, 0),
            row("2024-01-01", "Aftercare", 3.0, 0, 0),
        ];

        let programs = compute_program_aggregates(&rows);

        assert_eq!(programs.len(), 3);
        assert_eq!(programs[0].program, ProgramCategory::Detox);
        assert_eq!(programs[1].program, ProgramCategory::Aftercare);
        assert_eq!(
            programs[2].program,
            ProgramCategory::Other("Unknown".to_string())
        );
        assert_eq!(programs[2].flows.admissions, 4);
    }

    #[test]
    fn test_program_totals_sum_to_overall() {
        let mut rows = sample_rows();
        rows.push(ReportRow {
            transfer_in: Some(2),
            transfer_out: Some(1),
            ..row("2024-01-03", "Unknown", 2.0, 5, 1)
        });
        rows.push(row("2024-01-03", "Psych IOP", 6.0, 1, 1));

        let overall = compute_overall_aggregate(&rows);
        let mut summed = FlowTotals::default();
        for program in compute_program_aggregates(&rows) {
            summed += program.flows;
        }

        assert_eq!(summed, overall.flows);
    }

    #[test]
    fn test_missing_census_counts_as_zero() {
        let mut rows = sample_rows();
        rows[1].census = None;

        let overall = compute_overall_aggregate(&rows);
        // (10 + 8) / 2
        assert!((overall.census - 9.0).abs() < 1e-10);

        let programs = compute_program_aggregates(&rows);
        assert_eq!(programs[1].average_census, 0.0);
    }

    #[test]
    fn test_programs_present() {
        let programs = programs_present(&sample_rows());
        assert_eq!(
            programs,
            vec![ProgramCategory::Detox, ProgramCategory::Residential]
        );
    }
}
