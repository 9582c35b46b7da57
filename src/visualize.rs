//! Per-region annual rainfall charts.
//!
//! Charts are SVG so rendering needs no system fonts. The values drawn are
//! taken as given; the moving average is computed upstream in
//! [`crate::analysis::utility::trailing_mean`].

use plotters::prelude::*;
use std::path::Path;

use crate::analysis::utility::trailing_mean;
use crate::error::{PipelineError, Result};
use crate::types::PeriodTotal;

/// Window of the trailing moving average drawn over the annual totals.
pub const MOVING_AVERAGE_WINDOW: usize = 3;

const CHART_SIZE: (u32, u32) = (1000, 600);

/// Everything drawn on one region's chart.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSeries {
    pub region: String,
    pub points: Vec<(i32, f64)>,
    pub moving_average: Vec<(i32, f64)>,
}

impl PlotSeries {
    /// Builds the chart data from a region's annual totals, sorted by year.
    pub fn from_annual(region: &str, annual: &[PeriodTotal]) -> Self {
        let mut points: Vec<(i32, f64)> = annual.iter().map(|t| (t.year, t.total_value)).collect();
        points.sort_by_key(|p| p.0);

        let values: Vec<f64> = points.iter().map(|p| p.1).collect();
        let moving_average = points
            .iter()
            .map(|p| p.0)
            .zip(trailing_mean(&values, MOVING_AVERAGE_WINDOW))
            .collect();

        PlotSeries {
            region: region.to_string(),
            points,
            moving_average,
        }
    }

    pub fn title(&self) -> String {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => format!(
                "Annual Rainfall Trend for {} ({}-{})",
                self.region, first.0, last.0
            ),
            _ => format!("Annual Rainfall Trend for {}", self.region),
        }
    }
}

/// File name of a region's chart: lowercased region plus a fixed suffix.
pub fn plot_file_name(region: &str) -> String {
    format!("{}_annual_rainfall.svg", region.to_lowercase())
}

/// Renders `series` to an SVG file at `path`, replacing any existing file.
pub fn render_annual_chart(series: &PlotSeries, path: &Path) -> Result<()> {
    if series.points.is_empty() {
        return Err(PipelineError::Render(format!(
            "no annual totals to plot for {}",
            series.region
        )));
    }
    draw(series, path)
        .map_err(|e| PipelineError::Render(format!("{}: {e}", path.display())))
}

fn draw(series: &PlotSeries, path: &Path) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let first_year = series.points[0].0;
    let last_year = series.points[series.points.len() - 1].0;
    let x_range = if first_year < last_year {
        first_year..last_year
    } else {
        (first_year - 1)..(last_year + 1)
    };

    let all_values = series
        .points
        .iter()
        .chain(series.moving_average.iter())
        .map(|p| p.1);
    let y_max = all_values.clone().fold(f64::MIN, f64::max);
    let y_min = all_values.fold(0.0, f64::min);
    let y_max = if y_max > y_min { y_max * 1.1 } else { y_min + 1.0 };

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(series.title(), ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Year")
        .y_desc("Annual Rainfall (mm)")
        .draw()?;

    chart
        .draw_series(LineSeries::new(series.points.iter().copied(), &BLUE))?
        .label("Annual total")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

    chart.draw_series(
        series
            .points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 3, BLUE.filled())),
    )?;

    chart
        .draw_series(DashedLineSeries::new(
            series.moving_average.clone(),
            6,
            4,
            RED.stroke_width(2),
        ))?
        .label(format!("{MOVING_AVERAGE_WINDOW}-year moving average"))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
