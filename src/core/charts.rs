//! Chart rendering for labelled numeric series.
//!
//! Charts are an optional attachment on top of the textual answer; every
//! failure here is reported as `FormattingError` and swallowed upstream.

use crate::errors::FormattingError;
use crate::infrastructure::entities::ResultSet;
use plotters::prelude::*;

const WIDTH: u32 = 900;
const HEIGHT: u32 = 540;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChartKind {
    Line,
    Bar,
}

/// Decides whether (and how) the result should be charted, from the shape
/// of the data and the wording of the question.
pub fn chart_kind(question: &str, rows: &ResultSet) -> Option<ChartKind> {
    rows.as_series()?;

    let trend_words = ["推移", "トレンド", "変化"];
    if trend_words.iter().any(|w| question.contains(w)) {
        return Some(ChartKind::Line);
    }

    let comparison_words = ["比較", "割合", "分布"];
    if comparison_words.iter().any(|w| question.contains(w)) {
        return Some(ChartKind::Bar);
    }

    Some(ChartKind::Bar)
}

/// Renders the series into an in-memory PNG.
pub fn render(kind: ChartKind, rows: &ResultSet) -> Result<Vec<u8>, FormattingError> {
    let series = rows
        .as_series()
        .ok_or_else(|| FormattingError::Chart("result is not a labelled series".to_owned()))?;

    let y_label = rows
        .columns
        .get(1)
        .cloned()
        .unwrap_or_else(|| "value".to_owned());

    let mut rgb = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut rgb, (WIDTH, HEIGHT)).into_drawing_area();
        draw(&root, kind, &series, &y_label)?;
        root.present()
            .map_err(|e| FormattingError::Chart(e.to_string()))?;
    }

    encode_png(&rgb)
}

fn draw<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    kind: ChartKind,
    series: &[(String, f64)],
    y_label: &str,
) -> Result<(), FormattingError> {
    let chart_err = |e: &dyn std::fmt::Display| FormattingError::Chart(e.to_string());

    root.fill(&WHITE).map_err(|e| chart_err(&e))?;

    let n = series.len();
    let max = series
        .iter()
        .map(|(_, v)| *v)
        .fold(f64::MIN, f64::max)
        .max(1.0);
    let labels: Vec<String> = series.iter().map(|(l, _)| l.clone()).collect();

    let mut chart = ChartBuilder::on(root)
        .margin(24)
        .x_label_area_size(48)
        .y_label_area_size(72)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..max * 1.1)
        .map_err(|e| chart_err(&e))?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n.min(12))
        .x_label_formatter(&|x: &f64| {
            let idx = x.round();
            if idx < 0.0 {
                return String::new();
            }
            labels.get(idx as usize).cloned().unwrap_or_default()
        })
        .y_desc(y_label)
        .draw()
        .map_err(|e| chart_err(&e))?;

    match kind {
        ChartKind::Line => {
            chart
                .draw_series(LineSeries::new(
                    series.iter().enumerate().map(|(i, (_, v))| (i as f64, *v)),
                    BLUE.stroke_width(2),
                ))
                .map_err(|e| chart_err(&e))?;
            chart
                .draw_series(
                    series
                        .iter()
                        .enumerate()
                        .map(|(i, (_, v))| Circle::new((i as f64, *v), 4, BLUE.filled())),
                )
                .map_err(|e| chart_err(&e))?;
        }
        ChartKind::Bar => {
            chart
                .draw_series(series.iter().enumerate().map(|(i, (_, v))| {
                    Rectangle::new(
                        [(i as f64 - 0.35, 0.0), (i as f64 + 0.35, *v)],
                        BLUE.mix(0.6).filled(),
                    )
                }))
                .map_err(|e| chart_err(&e))?;
        }
    }

    Ok(())
}

fn encode_png(rgb: &[u8]) -> Result<Vec<u8>, FormattingError> {
    use image::codecs::png::PngEncoder;
    use image::{ExtendedColorType, ImageEncoder};

    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(rgb, WIDTH, HEIGHT, ExtendedColorType::Rgb8)
        .map_err(|e| FormattingError::Chart(e.to_string()))?;
    Ok(png)
}
