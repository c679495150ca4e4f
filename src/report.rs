// src/report.rs
//! Run artifact: one workbook `<output_dir>/nsm_recommendations_<date>.xlsx`
//! with a `summary` and a `details` sheet.
//!
//! Summary rows are filled by action (increase green, decrease red). Numbers
//! are stored as numbers on both sheets; missing or non-finite values stay
//! blank.

use anyhow::{Context, Result};
use rust_xlsxwriter::{Color, Format, FormatPattern, Workbook, Worksheet, XlsxError};
use std::path::PathBuf;
use tokio::fs;
use tracing::info;

use crate::decision::Action;
use crate::pipeline::{ComparisonRow, Recommendation, SummaryRow};

pub const SUMMARY_SHEET: &str = "summary";
pub const DETAILS_SHEET: &str = "details";

pub const INCREASE_FILL: u32 = 0xC6EFCE;
pub const DECREASE_FILL: u32 = 0xFFC7CE;

const SUMMARY_HEADER: &[&str] = &[
    "zone",
    "time_block",
    "old_nsm",
    "recommended_nsm",
    "delta_nsm",
    "avg_dynamic_surge_level_y",
    "action",
];

const DETAIL_TAIL: &[&str] = &[
    "score_y",
    "score_4wk",
    "score_diff",
    "best_nsm",
    "old_nsm",
    "recommended_nsm",
    "action",
    "reason_for_change",
    "delta_nsm",
    "z_cater",
    "z_bsr",
];

/// Background of a summary row, as `0xRRGGBB`.
pub fn row_fill(action: Action) -> Option<u32> {
    match action {
        Action::Increase => Some(INCREASE_FILL),
        Action::Decrease => Some(DECREASE_FILL),
        Action::NoChange | Action::NoChangeLowVolume | Action::NoData => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Text(String),
    Number(Option<f64>),
}

fn num(v: Option<f64>) -> Cell {
    Cell::Number(v.filter(|x| x.is_finite()))
}

fn text(s: impl Into<String>) -> Cell {
    Cell::Text(s.into())
}

fn summary_cells(row: &SummaryRow) -> Vec<Cell> {
    vec![
        text(row.zone.as_str()),
        text(row.time_block.to_string()),
        num(row.old_nsm),
        num(row.recommended_nsm),
        num(row.delta_nsm),
        num(row.avg_dynamic_surge_level_y),
        text(row.action.as_str()),
    ]
}

fn detail_cells(row: &ComparisonRow, metric_columns: &[String]) -> Vec<Cell> {
    let mut cells = Vec::with_capacity(2 + metric_columns.len() + DETAIL_TAIL.len());
    cells.push(text(row.zone.as_str()));
    cells.push(text(row.time_block.to_string()));
    cells.extend(metric_columns.iter().map(|c| num(row.metric(c))));
    let d = &row.decision;
    cells.extend([
        num(row.scores.score_y),
        num(row.scores.score_4wk),
        num(row.scores.score_diff),
        num(row.best_nsm),
        num(d.old_nsm),
        num(d.recommended_nsm),
        text(d.action.as_str()),
        text(d.reason.as_str()),
        num(row.delta_nsm),
        num(d.z_cater),
        num(d.z_bsr),
    ]);
    cells
}

fn write_header(ws: &mut Worksheet, names: &[&str]) -> Result<(), XlsxError> {
    for (col, name) in (0u16..).zip(names) {
        ws.write_string(0, col, *name)?;
    }
    Ok(())
}

fn write_row(
    ws: &mut Worksheet,
    row: u32,
    cells: &[Cell],
    format: Option<&Format>,
) -> Result<(), XlsxError> {
    for (col, cell) in (0u16..).zip(cells) {
        match (cell, format) {
            (Cell::Text(s), Some(f)) => {
                ws.write_string_with_format(row, col, s.as_str(), f)?;
            }
            (Cell::Text(s), None) => {
                ws.write_string(row, col, s.as_str())?;
            }
            (Cell::Number(Some(x)), Some(f)) => {
                ws.write_number_with_format(row, col, *x, f)?;
            }
            (Cell::Number(Some(x)), None) => {
                ws.write_number(row, col, *x)?;
            }
            // Blank cells still carry the row fill.
            (Cell::Number(None), Some(f)) => {
                ws.write_blank(row, col, f)?;
            }
            (Cell::Number(None), None) => {}
        }
    }
    Ok(())
}

fn fill_format(rgb: u32) -> Format {
    Format::new()
        .set_pattern(FormatPattern::Solid)
        .set_background_color(Color::RGB(rgb))
}

/// Render both sheets into xlsx bytes.
pub fn workbook_bytes(rec: &Recommendation) -> Result<Vec<u8>> {
    let mut wb = Workbook::new();

    let summary = wb.add_worksheet();
    summary.set_name(SUMMARY_SHEET)?;
    write_header(summary, SUMMARY_HEADER)?;
    for (row, s) in (1u32..).zip(&rec.summary) {
        let fill = row_fill(s.action).map(fill_format);
        write_row(summary, row, &summary_cells(s), fill.as_ref())?;
    }

    let details = wb.add_worksheet();
    details.set_name(DETAILS_SHEET)?;
    let mut header: Vec<&str> = vec!["zone", "time_block"];
    header.extend(rec.metric_columns.iter().map(String::as_str));
    header.extend_from_slice(DETAIL_TAIL);
    write_header(details, &header)?;
    for (row, d) in (1u32..).zip(&rec.details) {
        write_row(details, row, &detail_cells(d, &rec.metric_columns), None)?;
    }

    wb.save_to_buffer().context("rendering report workbook")
}

/// Writes the per-run workbook.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn artifact_path(&self, rec: &Recommendation) -> PathBuf {
        self.output_dir.join(format!(
            "nsm_recommendations_{}.xlsx",
            rec.reference_date.format("%Y-%m-%d")
        ))
    }

    /// Write the workbook; returns its path.
    pub async fn write(&self, rec: &Recommendation) -> Result<PathBuf> {
        let bytes = workbook_bytes(rec)?;
        fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("creating {}", self.output_dir.display()))?;

        let path = self.artifact_path(rec);
        fs::write(&path, &bytes)
            .await
            .with_context(|| format!("writing {}", path.display()))?;

        info!(path = %path.display(), summary = rec.summary.len(), details = rec.details.len(), "report written");
        Ok(path)
    }
}
