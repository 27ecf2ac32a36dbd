use crate::engine::error::EngineError;
use plotters::prelude::*;
use std::path::Path;

const SIZE: (u32, u32) = (900, 450);

/// Draws a per-residue shielding trace (delta against residue ordinal) as SVG.
pub fn plot_trace(path: &Path, title: &str, deltas: &[f64]) -> Result<(), EngineError> {
    draw(path, title, deltas).map_err(|reason| EngineError::Plot {
        path: path.to_path_buf(),
        reason,
    })
}

fn draw(path: &Path, title: &str, deltas: &[f64]) -> Result<(), String> {
    if deltas.is_empty() {
        return Err("no residues to plot".into());
    }
    let x_max = deltas.len().max(2) - 1;
    let (y_min, y_max) = value_range(deltas);

    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| e.to_string())?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 18))
        .margin(15)
        .x_label_area_size(35)
        .y_label_area_size(55)
        .build_cartesian_2d(0..x_max, y_min..y_max)
        .map_err(|e| e.to_string())?;

    chart
        .configure_mesh()
        .x_desc("Residue")
        .y_desc("Delta SASA (nm^2)")
        .draw()
        .map_err(|e| e.to_string())?;

    chart
        .draw_series(LineSeries::new(deltas.iter().copied().enumerate(), &BLUE))
        .map_err(|e| e.to_string())?;

    root.present().map_err(|e| e.to_string())
}

/// Axis range spanning zero and every value, padded by a tenth of its span.
fn value_range(values: &[f64]) -> (f64, f64) {
    let (low, high) = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let pad = ((high - low) * 0.1).max(1e-3);
    let low = if low < 0.0 { low - pad } else { 0.0 };
    (low, high + pad)
}
