pub mod line;
pub mod pipeline;
pub mod sasa;
pub mod shield;
pub mod traj;

use crate::error::Result;
use glycoshield::engine::error::EngineError;
use glycoshield::engine::tasks::sasa::{SeriesStatus, ShieldingReport};
use glycoshield::engine::tasks::shield::ShieldOutput;
use tracing::warn;

/// Prints one line per series and fails when any series produced no data.
fn report_series(report: &ShieldingReport) -> Result<()> {
    for series in &report.series {
        let table = series
            .outputs
            .table
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {} probe {:.3} nm ({}): {:?}, {} frame(s) used, {} skipped -> {}",
            series.structure,
            series.probe_radius,
            series.mode,
            series.status,
            series.frames_used.len(),
            series.frames_skipped.len(),
            table
        );
        if series.status == SeriesStatus::Partial {
            warn!(
                structure = %series.structure,
                probe_radius = series.probe_radius,
                skipped = ?series.frames_skipped,
                "Series built from a subset of the requested frames."
            );
        }
    }

    let invalid: Vec<String> = report
        .invalid()
        .map(|s| format!("{} (probe {:.3} nm)", s.structure, s.probe_radius))
        .collect();
    if !invalid.is_empty() {
        return Err(EngineError::Data(format!(
            "No frame could be computed for: {}",
            invalid.join(", ")
        ))
        .into());
    }
    Ok(())
}

fn report_sites(output: &ShieldOutput) {
    for site in &output.sites {
        println!(
            "  {}:{} occupancy {}/{} ({:.1}%) -> {}",
            site.chain_id,
            site.anchor,
            site.occupancy.accepted,
            site.occupancy.attempted,
            site.occupancy.fraction() * 100.0,
            site.trajectory_path.display()
        );
    }
    println!("maxframe: {}", output.min_frame_count());
}
