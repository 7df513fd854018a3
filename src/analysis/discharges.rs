//! Discharge statistics.
//!
//! Class counts, percentage splits, the per-program 100%-stacked class mix
//! and client-side paging of the discharge table.

use crate::models::{
    ClassShares, DischargeClass, DischargeRecord, DischargeSummary, Page, ProgramCategory,
    ProgramDischargeMix,
};
use std::collections::BTreeMap;

/// Count discharges per class. Unrecognized classes count toward `total` only.
pub fn summarize_discharges<'a, I>(records: I) -> DischargeSummary
where
    I: IntoIterator<Item = &'a DischargeRecord>,
{
    let mut summary = DischargeSummary::default();

    for record in records {
        summary.total += 1;
        match record.discharge_class {
            DischargeClass::Ama => summary.ama += 1,
            DischargeClass::Admin => summary.admin += 1,
            DischargeClass::Successful => summary.successful += 1,
            DischargeClass::Other(_) => {}
        }
    }

    summary
}

impl DischargeSummary {
    /// Share of each class as a percentage of all discharges.
    pub fn shares(&self) -> ClassShares {
        ClassShares {
            ama: percent(self.ama, self.total),
            admin: percent(self.admin, self.total),
            successful: percent(self.successful, self.total),
        }
    }
}

impl ClassShares {
    /// Share for a given class; `None` for unrecognized classes.
    pub fn for_class(&self, class: &DischargeClass) -> Option<f64> {
        match class {
            DischargeClass::Ama => Some(self.ama),
            DischargeClass::Admin => Some(self.admin),
            DischargeClass::Successful => Some(self.successful),
            DischargeClass::Other(_) => None,
        }
    }
}

/// Class mix per program, ordered by program priority.
pub fn class_mix_by_program(records: &[DischargeRecord]) -> Vec<ProgramDischargeMix> {
    let mut grouped: BTreeMap<&ProgramCategory, Vec<&DischargeRecord>> = BTreeMap::new();

    for record in records {
        grouped
            .entry(&record.program_category)
            .or_default()
            .push(record);
    }

    grouped
        .into_iter()
        .map(|(program, program_records)| {
            let summary = summarize_discharges(program_records.iter().copied());
            ProgramDischargeMix {
                program: program.clone(),
                total: summary.total,
                shares: summary.shares(),
            }
        })
        .collect()
}

/// Slice one page (1-based) out of a list.
///
/// Page numbers below 1 are treated as 1; pages past the end are empty.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page = page.max(1);
    let page_size = page_size.max(1);
    let total = items.len();
    let page_count = total.div_ceil(page_size);

    let start = (page - 1).saturating_mul(page_size);
    let slice = if start >= total {
        Vec::new()
    } else {
        items[start..(start + page_size).min(total)].to_vec()
    };

    Page {
        page,
        page_count,
        total,
        items: slice,
    }
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}
