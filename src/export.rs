//! One-shot session report rendering.
//!
//! An export bundles a buffer snapshot, its statistics and a chart of the
//! value sequence into one self-contained HTML artifact: title, stats block,
//! inline SVG chart, then one `index: value` line per sample. The document
//! is built fully in memory and written via a temp file + rename, so either
//! a complete report lands on disk or none does.

use std::path::Path;

use chrono::Local;
use plotters::prelude::*;
use tracing::info;

use crate::error::{AppResult, FlowError};
use crate::sample::Sample;
use crate::stats::Stats;

const CHART_SIZE: (u32, u32) = (800, 400);

/// A rendered session report. Immutable after creation.
pub struct Report {
    pub title: String,
    pub generated_at: chrono::DateTime<Local>,
    pub stats: Stats,
    pub samples: Vec<Sample>,
    pub chart_svg: String,
}

/// Render a report from a buffer snapshot.
///
/// Fails with [`FlowError::Export`] on an empty buffer or when the chart
/// cannot be built; no partial report is ever produced.
pub fn render(title: &str, samples: &[Sample], stats: &Stats) -> AppResult<Report> {
    if samples.is_empty() {
        return Err(FlowError::Export("nothing to export: buffer is empty".into()));
    }

    let chart_svg = draw_chart(title, samples)?;
    Ok(Report {
        title: title.to_string(),
        generated_at: Local::now(),
        stats: *stats,
        samples: samples.to_vec(),
        chart_svg,
    })
}

fn draw_chart(title: &str, samples: &[Sample]) -> AppResult<String> {
    let x_max = samples
        .last()
        .map(|s| s.elapsed_secs)
        .unwrap_or_default()
        .max(1.0);
    let (mut y_min, mut y_max) = samples.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(lo, hi), s| (lo.min(s.value), hi.max(s.value)),
    );
    // Flat signals still need a visible band
    if (y_max - y_min).abs() < f64::EPSILON {
        y_min -= 1.0;
        y_max += 1.0;
    }

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(export_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 20))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(0f64..x_max, y_min..y_max)
            .map_err(export_err)?;

        chart
            .configure_mesh()
            .x_desc("Time (s)")
            .y_desc("Flow rate")
            .draw()
            .map_err(export_err)?;

        chart
            .draw_series(LineSeries::new(
                samples.iter().map(|s| (s.elapsed_secs, s.value)),
                &BLUE,
            ))
            .map_err(export_err)?;

        root.present().map_err(export_err)?;
    }
    Ok(svg)
}

fn export_err<E: std::fmt::Display>(e: E) -> FlowError {
    FlowError::Export(format!("chart rendering failed: {e}"))
}

impl Report {
    /// Serialize the fixed-layout document.
    pub fn to_html(&self) -> String {
        use std::fmt::Write;

        let mut doc = String::with_capacity(self.chart_svg.len() + self.samples.len() * 24 + 1024);
        let _ = write!(
            doc,
            "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n<body>\n<h1>{}</h1>\n<p>generated: {}</p>\n",
            self.title,
            self.title,
            self.generated_at.format("%Y-%m-%d %H:%M:%S")
        );
        let _ = write!(
            doc,
            "<pre class=\"stats\">\nsamples: {}\nmean: {:.6}\nmin: {:.6}\nmax: {:.6}\npeak: {:.6}\n</pre>\n",
            self.samples.len(),
            self.stats.mean,
            self.stats.min,
            self.stats.max,
            self.stats.peak
        );
        doc.push_str(&self.chart_svg);
        doc.push_str("\n<pre class=\"samples\">\n");
        for (i, s) in self.samples.iter().enumerate() {
            let _ = writeln!(doc, "{}: {}", i, s.value);
        }
        doc.push_str("</pre>\n</body>\n</html>\n");
        doc
    }

    /// Write the artifact to `path`. The document is staged next to the
    /// target and renamed into place so readers never observe a partial
    /// file.
    pub fn write_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let staged = path.with_extension("tmp");
        std::fs::write(&staged, self.to_html())?;
        std::fs::rename(&staged, path)?;
        info!(path = %path.display(), samples = self.samples.len(), "report written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(n: usize) -> Vec<Sample> {
        (0..n)
            .map(|i| Sample::new(i as f64, 10.0 + (i as f64 * 0.7).sin()))
            .collect()
    }

    #[test]
    fn empty_buffer_is_an_export_error() {
        let result = render("t", &[], &Stats::default());
        assert!(matches!(result, Err(FlowError::Export(_))));
    }

    #[test]
    fn report_embeds_chart_and_samples() {
        let samples = snapshot(20);
        let stats = crate::stats::compute(&samples);
        let report = render("Session", &samples, &stats).unwrap();
        let html = report.to_html();

        assert!(html.contains("<svg"));
        assert!(html.contains("samples: 20"));
        assert!(html.contains("19: "));
    }

    #[test]
    fn single_sample_renders() {
        let samples = snapshot(1);
        let stats = crate::stats::compute(&samples);
        assert!(render("Session", &samples, &stats).is_ok());
    }

    #[test]
    fn write_creates_complete_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.html");

        let samples = snapshot(5);
        let stats = crate::stats::compute(&samples);
        let report = render("Session", &samples, &stats).unwrap();
        report.write_to(&path).unwrap();

        let body = std::fs::read_to_string(&path).unwrap();
        assert!(body.ends_with("</html>\n"));
        assert!(!path.with_extension("tmp").exists());
    }
}
