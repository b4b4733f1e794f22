//! Chart rendering (Vega-Lite)
//!
//! Each [`GroupFigure`] becomes one chart row of three linked panels:
//! - median vs skewness
//! - `median_log10` vs skewness
//! - histogram of the raw values, filtered by the brush drawn on either
//!   scatter panel
//!
//! Rows are stacked vertically in the order they are pushed, and the whole
//! chart is written as a standalone HTML page embedding the Vega-Lite
//! specification.

pub mod colors;

use crate::summary::{FigureTable, GroupFigure};
use crate::{Error, Result};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tracing::info;

const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

const SCATTER_SIZE: u32 = 400;
const HISTOGRAM_WIDTH: u32 = 700;
const HISTOGRAM_MAX_BINS: u32 = 50;
const UNSELECTED_COLOR: &str = "lightgray";

/// Base-10 logarithm of positive medians; zero, negative and NaN medians pass through
#[must_use]
pub fn median_log10(median: f64) -> f64 {
    if median > 0.0 {
        median.log10()
    } else {
        median
    }
}

/// Smallest and largest finite value, if any
fn finite_domain(values: impl Iterator<Item = f64>) -> Option<[f64; 2]> {
    values.filter(|v| v.is_finite()).fold(None, |domain, v| match domain {
        None => Some([v, v]),
        Some([lo, hi]) => Some([lo.min(v), hi.max(v)]),
    })
}

fn axis(field: &str, domain: Option<[f64; 2]>) -> Value {
    let mut axis = json!({ "field": field, "type": "quantitative" });
    if let Some(domain) = domain {
        axis["scale"] = json!({ "domain": domain });
    }
    axis
}

/// Data values of a figure, `median_log10` included
fn data_values(figure: &FigureTable) -> Vec<Value> {
    figure
        .rows()
        .iter()
        .map(|row| {
            json!({
                "sample_name": row.sample_name,
                "variable": row.variable,
                "value": row.value,
                "median": row.median,
                "skewness": row.skewness,
                "median_log10": median_log10(row.median),
            })
        })
        .collect()
}

/// Vertically stacked chart rows
#[derive(Debug, Clone, Default)]
pub struct Chart {
    rows: Vec<Value>,
    brushes: Vec<Value>,
}

impl Chart {
    /// Create an empty chart
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no row was added
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append the three-panel row of one group
    pub fn push(&mut self, group: &GroupFigure) {
        let index = self.rows.len();
        let brush = format!("brush_{index}");
        let median_view = format!("median_{index}");
        let log_view = format!("median_log10_{index}");

        let figure = &group.figure;
        let (domain, range) = colors::palette(figure.rows().iter().map(|r| r.variable.as_str()));
        let color_scale = json!({ "domain": domain, "range": range });

        let medians = || figure.rows().iter().map(|r| r.median);
        let skewness_axis = axis(
            "skewness",
            finite_domain(figure.rows().iter().map(|r| r.skewness)),
        );
        let brushed_color = json!({
            "condition": {
                "param": brush,
                "field": "variable",
                "type": "nominal",
                "scale": color_scale,
                "legend": null,
            },
            "value": UNSELECTED_COLOR,
        });
        let point = json!({ "type": "point", "filled": true, "size": 100 });

        let median_panel = json!({
            "name": median_view,
            "mark": point,
            "encoding": {
                "x": axis("median", finite_domain(medians())),
                "y": skewness_axis,
                "color": brushed_color,
                "tooltip": [{ "field": "variable", "type": "nominal" }],
            },
            "width": SCATTER_SIZE,
            "height": SCATTER_SIZE,
        });
        let log_panel = json!({
            "name": log_view,
            "mark": point,
            "encoding": {
                "x": axis("median_log10", finite_domain(medians().map(median_log10))),
                "y": skewness_axis,
                "color": brushed_color,
                "tooltip": [{ "field": "variable", "type": "nominal" }],
            },
            "width": SCATTER_SIZE,
            "height": SCATTER_SIZE,
        });
        let histogram_panel = json!({
            "mark": { "type": "bar", "opacity": 0.7 },
            "transform": [{ "filter": { "param": brush } }],
            "encoding": {
                "x": {
                    "field": "value",
                    "type": "quantitative",
                    "bin": { "maxbins": HISTOGRAM_MAX_BINS },
                },
                "y": { "aggregate": "count", "type": "quantitative", "stack": null },
                "color": {
                    "field": "variable",
                    "type": "nominal",
                    "scale": color_scale,
                    "legend": null,
                },
            },
            "width": HISTOGRAM_WIDTH,
            "height": SCATTER_SIZE,
        });

        self.brushes.push(json!({
            "name": brush,
            "select": { "type": "interval" },
            "views": [median_view, log_view],
        }));
        self.rows.push(json!({
            "title": { "text": group.title() },
            "data": { "values": data_values(figure) },
            "hconcat": [median_panel, log_panel, histogram_panel],
        }));
    }

    /// Full Vega-Lite specification
    #[must_use]
    pub fn to_spec(&self) -> Value {
        json!({
            "$schema": VEGA_LITE_SCHEMA,
            "params": self.brushes,
            "vconcat": self.rows,
        })
    }

    /// Standalone HTML page rendering the chart
    ///
    /// # Errors
    /// Returns error if the chart is empty or cannot be serialized
    pub fn to_html(&self) -> Result<String> {
        if self.is_empty() {
            return Err(Error::Render("chart has no rows".to_string()));
        }
        // Keep `</script>` inside string values from closing the tag
        let spec = serde_json::to_string(&self.to_spec())?.replace("</", "<\\/");
        Ok(HTML_TEMPLATE.replace("{spec}", &spec))
    }

    /// Write the HTML page, creating parent directories as needed
    ///
    /// # Errors
    /// Returns error if the chart is empty or the file cannot be written
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let html = self.to_html()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, html)?;
        info!(path = %path.display(), rows = self.len(), "wrote distributions chart");
        Ok(())
    }
}

const HTML_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>Metadata distributions</title>
  <script src="https://cdn.jsdelivr.net/npm/vega@5"></script>
  <script src="https://cdn.jsdelivr.net/npm/vega-lite@5"></script>
  <script src="https://cdn.jsdelivr.net/npm/vega-embed@6"></script>
</head>
<body>
  <div id="vis"></div>
  <script type="text/javascript">
    const spec = {spec};
    vegaEmbed("#vis", spec, { mode: "vega-lite" }).catch(console.error);
  </script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::FigureRow;

    fn row(sample: &str, variable: &str, value: f64, median: f64, skewness: f64) -> FigureRow {
        FigureRow {
            sample_name: sample.to_string(),
            variable: variable.to_string(),
            value: Some(value),
            median,
            skewness,
        }
    }

    fn group(name: &str) -> GroupFigure {
        GroupFigure {
            table_path: "md.tsv".to_string(),
            strata: "site".to_string(),
            group: name.to_string(),
            figure: FigureTable::new(vec![
                row("s1", "ph", 7.0, 6.5, 0.1),
                row("s2", "ph", 6.0, 6.5, 0.1),
                row("s1", "depth", -2.0, -1.0, f64::NAN),
                row("s2", "depth", 0.0, -1.0, f64::NAN),
            ]),
        }
    }

    #[test]
    fn test_median_log10_quirk() {
        assert!((median_log10(100.0) - 2.0).abs() < 1e-12);
        assert!((median_log10(-3.0) + 3.0).abs() < f64::EPSILON);
        assert!(median_log10(0.0).abs() < f64::EPSILON);
        assert!(median_log10(f64::NAN).is_nan());
    }

    #[test]
    fn test_rows_stack_in_push_order() {
        let mut chart = Chart::new();
        chart.push(&group("gut"));
        chart.push(&group("skin"));

        let spec = chart.to_spec();
        let rows = spec["vconcat"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["title"]["text"], json!(["md.tsv", "site", "gut"]));
        assert_eq!(rows[1]["title"]["text"], json!(["md.tsv", "site", "skin"]));
        assert_eq!(rows[0]["hconcat"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_each_row_has_own_brush() {
        let mut chart = Chart::new();
        chart.push(&group("gut"));
        chart.push(&group("skin"));

        let spec = chart.to_spec();
        let params = spec["params"].as_array().unwrap();
        assert_eq!(params[0]["name"], "brush_0");
        assert_eq!(params[1]["views"], json!(["median_1", "median_log10_1"]));
        assert_eq!(
            spec["vconcat"][1]["hconcat"][2]["transform"][0]["filter"]["param"],
            "brush_1"
        );
    }

    #[test]
    fn test_data_values_carry_log_median_and_null_nan() {
        let mut chart = Chart::new();
        chart.push(&group("gut"));
        let values = &chart.to_spec()["vconcat"][0]["data"]["values"];

        assert_eq!(values[2]["median_log10"], json!(-1.0));
        assert!(values[2]["skewness"].is_null());
        let log = values[0]["median_log10"].as_f64().unwrap();
        assert!((log - 6.5f64.log10()).abs() < 1e-12);
    }

    #[test]
    fn test_color_scale_deterministic() {
        let mut chart = Chart::new();
        chart.push(&group("gut"));
        let histogram = &chart.to_spec()["vconcat"][0]["hconcat"][2];
        let scale = &histogram["encoding"]["color"]["scale"];
        assert_eq!(scale["domain"], json!(["depth", "ph"]));
        assert_eq!(scale["range"], json!(["#8000ff", "#ff0000"]));
    }

    #[test]
    fn test_domain_skips_non_finite() {
        let mut chart = Chart::new();
        chart.push(&group("gut"));
        let median_panel = &chart.to_spec()["vconcat"][0]["hconcat"][0];
        assert_eq!(median_panel["encoding"]["x"]["scale"]["domain"], json!([-1.0, 6.5]));
        assert!(median_panel["encoding"]["y"]["scale"]["domain"] == json!([0.1, 0.1]));
    }

    #[test]
    fn test_empty_chart_not_rendered() {
        let chart = Chart::new();
        assert!(chart.to_html().is_err());
    }

    #[test]
    fn test_html_embeds_chart() {
        let mut chart = Chart::new();
        chart.push(&group("</script>"));
        let html = chart.to_html().unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(r##"vegaEmbed("#vis", spec"##));
        assert!(html.trim_end().ends_with("</html>"));
        assert!(html.contains("brush_0"));
        assert!(!html.contains("\"</script>\""));
    }
}
