//! Markdown and JSON report generation.
//!
//! Each view's report renders to a Markdown document built from the same
//! sections: metadata, headline totals, per-program breakdown and footer.

use crate::models::{
    CensusReport, ClassShares, DailyAggregate, DailyReport, DischargeClass, DischargeReport,
    FlowTotals, ProgramAggregate, ProgramDischargeMix, ReportMetadata, ReportRow,
};
use anyhow::Result;
use serde::Serialize;

/// Width of the text gauges in characters.
const GAUGE_WIDTH: usize = 20;

/// A report that can be rendered as Markdown.
pub trait MarkdownReport {
    fn to_markdown(&self) -> String;
}

impl MarkdownReport for DailyReport {
    fn to_markdown(&self) -> String {
        generate_daily_markdown(self)
    }
}

impl MarkdownReport for CensusReport {
    fn to_markdown(&self) -> String {
        generate_census_markdown(self)
    }
}

impl MarkdownReport for DischargeReport {
    fn to_markdown(&self) -> String {
        generate_discharge_markdown(self)
    }
}

/// Generate the single-day census report.
pub fn generate_daily_markdown(report: &DailyReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Daily Census: {}\n\n", report.date));
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_totals_section("Totals", &report.totals));

    output.push_str("## Programs\n\n");
    if report.rows.is_empty() {
        output.push_str("No census rows were reported for this date.\n\n");
    } else {
        for row in &report.rows {
            output.push_str(&generate_program_card(row));
        }
    }

    output.push_str(&generate_footer());
    output
}

/// Generate the census trends report.
pub fn generate_census_markdown(report: &CensusReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Census Trends: {}\n\n", report.range));
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_totals_section("Overall", &report.overall));
    output.push_str(&generate_program_table(&report.programs));
    output.push_str(&generate_footer());

    output
}

/// Generate the discharge trends report.
pub fn generate_discharge_markdown(report: &DischargeReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Discharge Trends: {}\n\n", report.range));
    output.push_str(&generate_metadata_section(&report.metadata));

    let programs: Vec<&str> = report.selected_programs.iter().map(|p| p.as_str()).collect();
    output.push_str(&format!("**Programs:** {}\n\n", programs.join(", ")));

    output.push_str("## Discharges\n\n");
    output.push_str("| Total | AMA | Admin | Successful |\n");
    output.push_str("|:---:|:---:|:---:|:---:|\n");
    output.push_str(&format!(
        "| **{}** | {} | {} | {} |\n\n",
        report.summary.total, report.summary.ama, report.summary.admin, report.summary.successful
    ));

    output.push_str(&generate_gauge_section(&report.shares));
    output.push_str(&generate_mix_section(&report.by_program));
    output.push_str(&generate_discharge_table(report));
    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** `{}`\n", metadata.source_view));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Rows:** {}\n", metadata.row_count));
    if let Some(ref user) = metadata.user {
        section.push_str(&format!("- **User:** {}\n", user));
    }
    section.push('\n');

    section
}

fn generate_totals_section(title: &str, totals: &DailyAggregate) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", title));
    section.push_str("| Census | Admissions | Transfers In | Transfers Out | Discharges |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| **{:.1}** | {} |\n\n",
        totals.census,
        flow_cells(&totals.flows)
    ));

    section
}

/// One card per census row.
fn generate_program_card(row: &ReportRow) -> String {
    let mut card = String::new();

    card.push_str(&format!("### {}\n\n", row.program_category));
    card.push_str(&format!("- **Census:** {}\n", format_census(row.census)));
    card.push_str(&format!("- **Admissions:** {}\n", format_count(row.admissions)));
    card.push_str(&format!("- **Transfers In:** {}\n", format_count(row.transfer_in)));
    card.push_str(&format!("- **Transfers Out:** {}\n", format_count(row.transfer_out)));
    card.push_str(&format!("- **Discharges:** {}\n\n", format_count(row.discharges)));

    card
}

fn generate_program_table(programs: &[ProgramAggregate]) -> String {
    let mut section = String::new();

    section.push_str("## By Program\n\n");
    if programs.is_empty() {
        section.push_str("No census rows were reported in this range.\n\n");
        return section;
    }

    section.push_str(
        "| Program | Avg Census | Admissions | Transfers In | Transfers Out | Discharges |\n",
    );
    section.push_str("|:---|:---:|:---:|:---:|:---:|:---:|\n");
    for program in programs {
        section.push_str(&format!(
            "| {} | {:.1} | {} |\n",
            program.program,
            program.average_census,
            flow_cells(&program.flows)
        ));
    }
    section.push('\n');

    section
}

/// Share of each class next to its target.
fn generate_gauge_section(shares: &ClassShares) -> String {
    let mut section = String::new();

    section.push_str("## Discharge Mix vs Target\n\n");
    section.push_str("```\n");
    for class in [
        DischargeClass::Ama,
        DischargeClass::Admin,
        DischargeClass::Successful,
    ] {
        let share = shares.for_class(&class).unwrap_or(0.0);
        let target = class.target_percent().unwrap_or(0.0);
        section.push_str(&format!(
            "{:<11} {} {:>5.1}%  (target {:.0}%)\n",
            class.as_str(),
            gauge(share),
            share,
            target
        ));
    }
    section.push_str("```\n\n");

    section
}

/// Per-program class mix (each row sums to 100%).
fn generate_mix_section(mix: &[ProgramDischargeMix]) -> String {
    if mix.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Discharge Mix by Program\n\n");
    section.push_str("| Program | Discharges | AMA | Admin | Successful |\n");
    section.push_str("|:---|:---:|:---:|:---:|:---:|\n");
    for bar in mix {
        section.push_str(&format!(
            "| {} | {} | {:.1}% | {:.1}% | {:.1}% |\n",
            bar.program, bar.total, bar.shares.ama, bar.shares.admin, bar.shares.successful
        ));
    }
    section.push('\n');

    section
}

fn generate_discharge_table(report: &DischargeReport) -> String {
    let mut section = String::new();
    let table = &report.table;

    section.push_str("## Discharge Records\n\n");
    if table.total == 0 {
        section.push_str("No discharges in this range.\n\n");
        return section;
    }

    section.push_str(&format!(
        "*Page {} of {} ({} records)*\n\n",
        table.page, table.page_count, table.total
    ));

    if table.items.is_empty() {
        section.push_str("No records on this page.\n\n");
        return section;
    }

    section.push_str("| Casefile | Name | Program | Class | Date |\n");
    section.push_str("|:---|:---|:---|:---|:---:|\n");
    for record in &table.items {
        section.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            record.casefile_id,
            escape_cell(record.full_name.as_deref().unwrap_or("")),
            record.program_category,
            record.discharge_class,
            record.discharge_date
        ));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    format!(
        "---\n\n*Report generated by purpose-dash v{}*\n",
        env!("CARGO_PKG_VERSION")
    )
}

fn flow_cells(flows: &FlowTotals) -> String {
    format!(
        "{} | {} | {} | {}",
        flows.admissions, flows.transfer_in, flows.transfer_out, flows.discharges
    )
}

fn format_census(census: Option<f64>) -> String {
    census.map_or_else(|| "-".to_string(), |c| format!("{}", c))
}

fn format_count(count: Option<i64>) -> String {
    count.map_or_else(|| "-".to_string(), |c| c.to_string())
}

fn gauge(percent: f64) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * GAUGE_WIDTH as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(GAUGE_WIDTH - filled))
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

/// Generate a JSON report.
pub fn generate_json_report<T: Serialize>(report: &T) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{
        class_mix_by_program, compute_overall_aggregate, compute_program_aggregates, paginate,
        summarize_discharges,
    };
    use crate::models::{DateRange, DischargeRecord, ProgramCategory};
    use chrono::{NaiveDate, Utc};

    fn metadata(view: &str, rows: usize) -> ReportMetadata {
        ReportMetadata {
            source_view: view.to_string(),
            generated_at: Utc::now(),
            row_count: rows,
            user: Some("staff@example.com".to_string()),
        }
    }

    fn range() -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
        )
    }

    fn census_rows() -> Vec<ReportRow> {
        serde_json::from_str(include_str!("../../fixtures/daily_census.json")).unwrap()
    }

    fn discharge_report(page: usize) -> DischargeReport {
        let records: Vec<DischargeRecord> =
            serde_json::from_str(include_str!("../../fixtures/discharges.json")).unwrap();
        let summary = summarize_discharges(&records);

        DischargeReport {
            metadata: metadata("vw_discharges", records.len()),
            range: range(),
            selected_programs: ProgramCategory::KNOWN.to_vec(),
            summary,
            shares: summary.shares(),
            by_program: class_mix_by_program(&records),
            table: paginate(&records, page, 5),
        }
    }

    #[test]
    fn test_generate_census_markdown() {
        let rows = census_rows();
        let report = CensusReport {
            metadata: metadata("vw_daily_census", rows.len()),
            range: range(),
            overall: compute_overall_aggregate(&rows),
            programs: compute_program_aggregates(&rows),
        };

        let markdown = report.to_markdown();

        assert!(markdown.contains("# Census Trends: 2024-01-01 to 2024-01-07"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("`vw_daily_census`"));
        assert!(markdown.contains("staff@example.com"));
        assert!(markdown.contains("| **42.0** | 15 |"));

        let detox = markdown.find("| Detox |").unwrap();
        let aftercare = markdown.find("| Aftercare |").unwrap();
        let adolescent = markdown.find("| Adolescent |").unwrap();
        assert!(detox < aftercare && aftercare < adolescent);
    }

    #[test]
    fn test_generate_daily_markdown() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let rows: Vec<ReportRow> = census_rows().into_iter().filter(|r| r.date == date).collect();
        let report = DailyReport {
            metadata: metadata("vw_daily_census", rows.len()),
            date,
            programs: vec![ProgramCategory::Detox],
            totals: compute_overall_aggregate(&rows),
            rows,
        };

        let markdown = generate_daily_markdown(&report);

        assert!(markdown.contains("# Daily Census: 2024-01-03"));
        assert!(markdown.contains("### Detox"));
        assert!(markdown.contains("- **Census:** -"));
        assert!(markdown.contains("- **Transfers In:** -"));
    }

    #[test]
    fn test_daily_markdown_without_rows() {
        let report = DailyReport {
            metadata: metadata("vw_daily_census", 0),
            date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            programs: Vec::new(),
            totals: DailyAggregate::default(),
            rows: Vec::new(),
        };

        let markdown = generate_daily_markdown(&report);
        assert!(markdown.contains("No census rows were reported"));
        assert!(markdown.contains("| **0.0** | 0 | 0 | 0 | 0 |"));
    }

    #[test]
    fn test_generate_discharge_markdown() {
        let markdown = discharge_report(1).to_markdown();

        assert!(markdown.contains("| **8** | 2 | 1 | 4 |"));
        assert!(markdown.contains("(target 70%)"));
        assert!(markdown.contains("## Discharge Mix by Program"));
        assert!(markdown.contains("*Page 1 of 2 (8 records)*"));
        assert!(markdown.contains("| 1042:3 | Jordan Avery | Residential | Successful | 2024-01-01 |"));
        assert!(!markdown.contains("1188:1"));
    }

    #[test]
    fn test_discharge_markdown_past_last_page() {
        let markdown = discharge_report(9).to_markdown();
        assert!(markdown.contains("No records on this page."));
    }

    #[test]
    fn test_gauge() {
        assert_eq!(gauge(0.0), format!("[{}]", "-".repeat(GAUGE_WIDTH)));
        assert_eq!(gauge(100.0), format!("[{}]", "#".repeat(GAUGE_WIDTH)));
        assert_eq!(gauge(50.0).matches('#').count(), GAUGE_WIDTH / 2);
        assert_eq!(gauge(140.0), gauge(100.0));
    }

    #[test]
    fn test_generate_json_report() {
        let json = generate_json_report(&discharge_report(1)).unwrap();

        assert!(json.contains("\"summary\""));
        assert!(json.contains("\"by_program\""));
        assert!(json.contains("\"casefile_id\": \"1042:3\""));
        assert!(json.contains("\"program_category\": \"SUD IOP\""));
    }
}
