use std::collections::BTreeMap;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use log::debug;
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::data::model::{LoanDataset, COL_LOAN_AMOUNT, COL_LOAN_STATUS, COL_TERM};

// ---------------------------------------------------------------------------
// Chart kinds
// ---------------------------------------------------------------------------

/// The three fixed chart kinds.  The selector strings are part of the HTTP
/// interface; anything else is rejected rather than falling back to a
/// default chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    ApprovalOutcome,
    LoanAmountDistribution,
    LoanTermDistribution,
}

impl ChartKind {
    pub const ALL: [ChartKind; 3] = [
        ChartKind::ApprovalOutcome,
        ChartKind::LoanAmountDistribution,
        ChartKind::LoanTermDistribution,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::ApprovalOutcome => "approved-vs-denied",
            ChartKind::LoanAmountDistribution => "loan-amount-distribution",
            ChartKind::LoanTermDistribution => "loan-term-distribution",
        }
    }
}

impl FromStr for ChartKind {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ChartError::UnknownKind(s.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("unknown chart type: {0}")]
    UnknownKind(String),

    #[error("cannot render charts from an empty dataset")]
    EmptyDataset,

    #[error("no usable values in column '{0}'")]
    NoData(&'static str),

    #[error("chart rendering failed: {0}")]
    Render(String),

    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

// ---------------------------------------------------------------------------
// Data shaping
// ---------------------------------------------------------------------------

/// Loan-amount histogram bin edges.  Eight half-open ranges plus a final
/// open-ended `$40000+` bin.
pub const AMOUNT_BIN_EDGES: [f64; 9] = [
    0.0, 5000.0, 10000.0, 15000.0, 20000.0, 25000.0, 30000.0, 35000.0, 40000.0,
];

/// (approved, denied) counts of `loan_status`.
pub fn approval_counts(dataset: &LoanDataset) -> (usize, usize) {
    let mut approved = 0;
    let mut denied = 0;
    for record in &dataset.records {
        match record.number(COL_LOAN_STATUS) {
            Some(v) if v == 1.0 => approved += 1,
            Some(v) if v == 0.0 => denied += 1,
            _ => {}
        }
    }
    (approved, denied)
}

/// Count numeric `loan_amnt` values per bin.  Each numeric value lands in
/// exactly one bin; non-numeric cells are excluded.
pub fn amount_bin_counts(dataset: &LoanDataset) -> Vec<usize> {
    let mut counts = vec![0usize; AMOUNT_BIN_EDGES.len()];
    for record in &dataset.records {
        let Some(amount) = record.number(COL_LOAN_AMOUNT) else {
            continue;
        };
        if amount < AMOUNT_BIN_EDGES[0] {
            continue;
        }
        let idx = AMOUNT_BIN_EDGES
            .iter()
            .rposition(|&edge| amount >= edge)
            .unwrap_or(0);
        counts[idx] += 1;
    }
    counts
}

/// Display labels for the amount bins (`$0 - $4999` … `$40000+`).
pub fn amount_bin_labels() -> Vec<String> {
    AMOUNT_BIN_EDGES
        .iter()
        .enumerate()
        .map(|(i, &edge)| match AMOUNT_BIN_EDGES.get(i + 1) {
            Some(&next) => format!("${} - ${}", edge as i64, next as i64 - 1),
            None => format!("${}+", edge as i64),
        })
        .collect()
}

/// Occurrences of each distinct trimmed, non-empty `term` value, in sorted
/// label order.
pub fn term_counts(dataset: &LoanDataset) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for record in &dataset.records {
        let Some(term) = record.text(COL_TERM) else {
            continue;
        };
        let term = term.trim();
        if term.is_empty() {
            continue;
        }
        *counts.entry(term.to_string()).or_insert(0) += 1;
    }
    counts
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

const CHART_WIDTH: u32 = 400;
const CHART_HEIGHT: u32 = 400;

const BLUE: RGBColor = RGBColor(0x36, 0xa2, 0xeb);
const PINK: RGBColor = RGBColor(0xff, 0x63, 0x84);

/// The three base64-encoded chart PNGs served together.
#[derive(Debug, Clone, Serialize)]
pub struct ChartImages {
    pub chart1: String,
    pub chart2: String,
    pub chart3: String,
}

/// Render one chart to PNG bytes.
pub fn render_chart(dataset: &LoanDataset, kind: ChartKind) -> Result<Vec<u8>, ChartError> {
    if dataset.is_empty() {
        return Err(ChartError::EmptyDataset);
    }
    debug!("rendering chart '{}'", kind.as_str());

    let mut buffer = vec![0u8; (CHART_WIDTH * CHART_HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (CHART_WIDTH, CHART_HEIGHT))
            .into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        match kind {
            ChartKind::ApprovalOutcome => draw_approval_pie(&root, dataset)?,
            ChartKind::LoanAmountDistribution => draw_amount_histogram(&root, dataset)?,
            ChartKind::LoanTermDistribution => draw_term_bars(&root, dataset)?,
        }
        root.present().map_err(draw_err)?;
    }

    encode_png(&buffer)
}

/// Render all three charts and encode them as base64, ready for the
/// `/api/chart-images` payload.
pub fn render_all(dataset: &LoanDataset) -> Result<ChartImages, ChartError> {
    let encode = |kind| render_chart(dataset, kind).map(|png| BASE64.encode(png));

    Ok(ChartImages {
        chart1: encode(ChartKind::ApprovalOutcome)?,
        chart2: encode(ChartKind::LoanAmountDistribution)?,
        chart3: encode(ChartKind::LoanTermDistribution)?,
    })
}

/// Base64 for a single rendered chart.
pub fn encode_base64(png: &[u8]) -> String {
    BASE64.encode(png)
}

fn draw_approval_pie(
    root: &DrawingArea<BitMapBackend, Shift>,
    dataset: &LoanDataset,
) -> Result<(), ChartError> {
    let (approved, denied) = approval_counts(dataset);
    if approved + denied == 0 {
        return Err(ChartError::NoData(COL_LOAN_STATUS));
    }

    let area = root
        .titled("Approved vs Denied", ("sans-serif", 22))
        .map_err(draw_err)?;

    let center = (CHART_WIDTH as i32 / 2, CHART_HEIGHT as i32 / 2);
    let radius = 120.0;
    let sizes = [approved as f64, denied as f64];
    let colors = [BLUE, PINK];
    let labels = ["Approved", "Denied"];

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.label_style(("sans-serif", 16).into_font());
    pie.percentages(("sans-serif", 14).into_font().color(&WHITE));
    area.draw(&pie).map_err(draw_err)?;

    // Raw counts under the pie center, next to the percentages.
    area.draw(&Text::new(
        format!("Approved: {approved}"),
        (center.0 - 20, center.1 + 40),
        ("sans-serif", 16).into_font().color(&BLACK),
    ))
    .map_err(draw_err)?;
    area.draw(&Text::new(
        format!("Denied: {denied}"),
        (center.0 - 20, center.1 + 60),
        ("sans-serif", 16).into_font().color(&BLACK),
    ))
    .map_err(draw_err)?;

    Ok(())
}

fn draw_amount_histogram(
    root: &DrawingArea<BitMapBackend, Shift>,
    dataset: &LoanDataset,
) -> Result<(), ChartError> {
    let counts = amount_bin_counts(dataset);
    let labels = amount_bin_labels();
    draw_bars(root, "Loan Amount Distribution", &labels, &counts, PINK)
}

fn draw_term_bars(
    root: &DrawingArea<BitMapBackend, Shift>,
    dataset: &LoanDataset,
) -> Result<(), ChartError> {
    let counts = term_counts(dataset);
    let labels: Vec<String> = counts.keys().cloned().collect();
    let values: Vec<usize> = counts.values().copied().collect();
    draw_bars(root, "Loan Term Distribution", &labels, &values, BLUE)
}

/// One bar per label, drawn as a rectangle series.  An empty label set
/// yields an empty frame rather than an error: the source data may simply
/// lack the column.
fn draw_bars(
    root: &DrawingArea<BitMapBackend, Shift>,
    title: &str,
    labels: &[String],
    counts: &[usize],
    color: RGBColor,
) -> Result<(), ChartError> {
    let x_max = counts.len().max(1) as i32;
    let y_max = counts.iter().copied().max().unwrap_or(0).max(1) as i32;

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(36)
        .y_label_area_size(40)
        .build_cartesian_2d(0..x_max, 0..y_max)
        .map_err(draw_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(counts.len().max(1))
        .x_label_formatter(&|x| {
            labels
                .get(*x as usize)
                .cloned()
                .unwrap_or_default()
        })
        .y_desc("Loans")
        .label_style(("sans-serif", 10))
        .draw()
        .map_err(draw_err)?;

    chart
        .draw_series(counts.iter().enumerate().map(|(i, &count)| {
            Rectangle::new([(i as i32, 0), (i as i32 + 1, count as i32)], color.filled())
        }))
        .map_err(draw_err)?;

    Ok(())
}

fn encode_png(rgb: &[u8]) -> Result<Vec<u8>, ChartError> {
    let mut png = Vec::new();
    PngEncoder::new(&mut png).write_image(
        rgb,
        CHART_WIDTH,
        CHART_HEIGHT,
        ExtendedColorType::Rgb8,
    )?;
    Ok(png)
}

fn draw_err<E: std::fmt::Display>(err: E) -> ChartError {
    ChartError::Render(err.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap as Map;

    use crate::data::model::{FieldValue, Record};

    use super::*;

    fn record(pairs: &[(&str, FieldValue)]) -> Record {
        let fields: Map<String, FieldValue> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        Record::new(fields)
    }

    fn dataset(records: Vec<Record>) -> LoanDataset {
        LoanDataset {
            records,
            columns: Vec::new(),
        }
    }

    #[test]
    fn selector_strings_round_trip() {
        for kind in ChartKind::ALL {
            assert_eq!(kind.as_str().parse::<ChartKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_selector_is_rejected() {
        let err = "credit-score-over-time".parse::<ChartKind>().unwrap_err();
        assert!(matches!(err, ChartError::UnknownKind(s) if s == "credit-score-over-time"));
    }

    #[test]
    fn approval_counts_ignore_other_values() {
        let ds = dataset(vec![
            record(&[(COL_LOAN_STATUS, FieldValue::Number(1.0))]),
            record(&[(COL_LOAN_STATUS, FieldValue::Number(1.0))]),
            record(&[(COL_LOAN_STATUS, FieldValue::Number(0.0))]),
            record(&[(COL_LOAN_STATUS, FieldValue::Text("unknown".into()))]),
        ]);
        assert_eq!(approval_counts(&ds), (2, 1));
    }

    #[test]
    fn amount_bins_partition_numeric_values() {
        let amounts = [0.0, 4999.0, 5000.0, 17500.0, 39999.0, 40000.0, 125000.0];
        let mut records: Vec<Record> = amounts
            .iter()
            .map(|&a| record(&[(COL_LOAN_AMOUNT, FieldValue::Number(a))]))
            .collect();
        records.push(record(&[(COL_LOAN_AMOUNT, FieldValue::Text("n/a".into()))]));
        let ds = dataset(records);

        let counts = amount_bin_counts(&ds);
        assert_eq!(counts.len(), AMOUNT_BIN_EDGES.len());
        // Each numeric value in exactly one bin; the text value in none.
        assert_eq!(counts.iter().sum::<usize>(), amounts.len());
        assert_eq!(counts[0], 2); // 0 and 4999
        assert_eq!(counts[1], 1); // 5000
        assert_eq!(counts[3], 1); // 17500
        assert_eq!(counts[7], 1); // 39999
        assert_eq!(counts[8], 2); // 40000 and 125000
    }

    #[test]
    fn amount_bin_labels_match_edges() {
        let labels = amount_bin_labels();
        assert_eq!(labels[0], "$0 - $4999");
        assert_eq!(labels[7], "$35000 - $39999");
        assert_eq!(labels[8], "$40000+");
    }

    #[test]
    fn term_counts_trim_and_skip_blanks() {
        let ds = dataset(vec![
            record(&[(COL_TERM, FieldValue::Text(" 36 months ".into()))]),
            record(&[(COL_TERM, FieldValue::Text("36 months".into()))]),
            record(&[(COL_TERM, FieldValue::Text("60 months".into()))]),
            record(&[(COL_TERM, FieldValue::Text("".into()))]),
            record(&[]),
        ]);
        let counts = term_counts(&ds);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts["36 months"], 2);
        assert_eq!(counts["60 months"], 1);
    }

    #[test]
    fn empty_dataset_cannot_render() {
        let ds = dataset(Vec::new());
        let err = render_chart(&ds, ChartKind::ApprovalOutcome).unwrap_err();
        assert!(matches!(err, ChartError::EmptyDataset));
    }
}
