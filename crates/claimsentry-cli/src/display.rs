//! Terminal rendering of run summaries and paged anomaly feeds.

use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use claimsentry_core::schema::feed;
use claimsentry_core::{Detector, RunStatus, RunSummary, project};

pub const PAGE_SIZE: usize = 15;

/// Feed columns shown by `show`; the full row is too wide for a terminal.
const PAGE_COLUMNS: &[&str] = &[
    feed::TYPOLOGY,
    feed::REASON,
    "date_soin",
    "jour",
    "id_structure",
    "structure_nom",
    "id_beneficiaire",
    "beneficiaire_nom",
    "montant_execute",
    "tarif_officiel",
    "ecart_montant",
    "nb_actes_7j",
    "nb_ecarts_pos_7j",
    "nb_structures",
];

// ── Run summary ──

pub fn format_summary(summary: &RunSummary, run_dir: &Path) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Window start: {}", summary.window_start);
    match summary.status {
        RunStatus::NoData => {
            let _ = writeln!(
                out,
                "No data: the window holds no transactions or no act lines."
            );
        }
        RunStatus::Completed => {
            for detector in Detector::ALL {
                let count = summary.counts.get(detector.tag()).copied().unwrap_or(0);
                let _ = writeln!(out, "  {:<6} {:>8}", detector.tag(), count);
            }
            let _ = writeln!(out, "  {:<6} {:>8}", "total", summary.total);
        }
    }
    let _ = writeln!(out, "Exports: {}", run_dir.display());
    out
}

pub fn print_summary(summary: &RunSummary, run_dir: &Path) {
    print!("{}", format_summary(summary, run_dir));
}

// ── Paging ──

/// Number of pages for `total` rows; an empty feed still has one page.
pub fn page_count(total: usize, per_page: usize) -> usize {
    total.div_ceil(per_page).max(1)
}

/// Offset and length of 1-based `page`, or `None` when it is out of range.
pub fn page_bounds(total: usize, page: usize, per_page: usize) -> Option<(usize, usize)> {
    if page == 0 || page > page_count(total, per_page) {
        return None;
    }
    let start = (page - 1) * per_page;
    Some((start, per_page.min(total - start)))
}

/// Render one page of the consolidated feed as a table.
pub fn format_page(batches: &[RecordBatch], page: usize) -> anyhow::Result<String> {
    let schema = batches
        .first()
        .map(|b| b.schema())
        .unwrap_or_else(|| Arc::new(feed::anomaly_schema()));
    let all = concat_batches(&schema, batches)?;
    let total = all.num_rows();
    let pages = page_count(total, PAGE_SIZE);
    let (offset, len) = page_bounds(total, page, PAGE_SIZE)
        .ok_or_else(|| anyhow::anyhow!("page {page} out of range (1..={pages})"))?;

    let slice = project(&all, PAGE_COLUMNS)?.slice(offset, len);
    let table = pretty_format_batches(&[slice])?;
    Ok(format!("{table}\nPage {page}/{pages} ({total} anomalies)"))
}

pub fn print_page(batches: &[RecordBatch], page: usize) -> anyhow::Result<()> {
    println!("{}", format_page(batches, page)?);
    Ok(())
}
