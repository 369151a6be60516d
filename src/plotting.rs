use plotters::prelude::*;
use std::fs::create_dir_all;
use std::path::Path;

use crate::error::{InjectError, Result};
use crate::pipeline::InjectionResult;

fn plot_err<E: std::fmt::Display>(e: E) -> InjectError {
    InjectError::Plot(e.to_string())
}

/// Input vs output on one chart; a debugging aid only.
pub fn plot_comparison(result: &InjectionResult, out_path: &Path) -> Result<()> {
    // Make sure the output folder exists
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }

    let n = result.y.len();
    if n == 0 {
        return Err(InjectError::Plot("nothing to plot".to_string()));
    }

    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for &v in result.y.iter().chain(result.y_hat.iter()) {
        if v.is_finite() {
            if v < y_min { y_min = v; }
            if v > y_max { y_max = v; }
        }
    }
    if !y_min.is_finite() {
        return Err(InjectError::Plot("series has no finite values".to_string()));
    }
    // Add a small pad to avoid clipping
    let pad = 0.05 * (y_max - y_min).max(1e-6);
    y_min -= pad;
    y_max += pad;

    let root = BitMapBackend::new(out_path, (1400, 500)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let caption = format!(
        "{} .. {}  |  anomalous steps: {}",
        result.timestamps[0],
        result.timestamps[n - 1],
        result.anomalous_steps()
    );
    let mut chart = ChartBuilder::on(&root)
        .margin(15)
        .set_left_and_bottom_label_area_size(50)
        .caption(caption, ("sans-serif", 18))
        .build_cartesian_2d(0f64..(n - 1).max(1) as f64, y_min..y_max)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("step")
        .y_desc("value")
        .label_style(("sans-serif", 12))
        .draw()
        .map_err(plot_err)?;

    let input = result.y.iter().enumerate().map(|(i, &v)| (i as f64, v));
    chart
        .draw_series(LineSeries::new(input, BLUE.stroke_width(1)))
        .map_err(plot_err)?
        .label("input")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

    let output = result.y_hat.iter().enumerate().map(|(i, &v)| (i as f64, v));
    chart
        .draw_series(LineSeries::new(output, RED.stroke_width(1)))
        .map_err(plot_err)?
        .label("output")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_err)?;

    root.present().map_err(plot_err)?;
    Ok(())
}
