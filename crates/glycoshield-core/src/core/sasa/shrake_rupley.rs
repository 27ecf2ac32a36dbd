use super::{KernelError, SurfaceAreaComputer, validate_request};
use crate::core::models::frame::Frame;
use crate::core::models::structure::Structure;
use kiddo::{KdTree, SquaredEuclidean};
use std::f64::consts::PI;

const ANGSTROM_PER_NM: f64 = 10.0;
const ANGSTROM2_PER_NM2: f64 = 100.0;

/// Generates `n` nearly uniform unit vectors on a golden-angle spiral.
fn golden_spiral(n: usize) -> Vec<[f64; 3]> {
    let golden_angle = PI * (3.0 - 5.0_f64.sqrt());
    (0..n)
        .map(|i| {
            let y = 1.0 - (2.0 * i as f64 + 1.0) / n as f64;
            let radius = (1.0 - y * y).max(0.0).sqrt();
            let theta = golden_angle * i as f64;
            [theta.cos() * radius, y, theta.sin() * radius]
        })
        .collect()
}

#[inline]
fn distance_squared(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    dx * dx + dy * dy + dz * dz
}

/// Shrake-Rupley dot-surface kernel.
///
/// Each selected atom is represented by a sphere of its van der Waals radius
/// plus the probe radius; the accessible fraction of `n_dots` test points on
/// that sphere scales the sphere area. Neighbour candidates come from a k-d
/// tree over the selected atoms only.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShrakeRupley;

impl ShrakeRupley {
    pub fn new() -> Self {
        Self
    }
}

impl SurfaceAreaComputer for ShrakeRupley {
    fn atom_areas(
        &self,
        structure: &Structure,
        frame: &Frame,
        atom_indices: &[usize],
        probe_radius: f64,
        n_dots: usize,
    ) -> Result<Vec<f64>, KernelError> {
        validate_request(structure, frame, atom_indices, probe_radius, n_dots)?;
        if atom_indices.is_empty() {
            return Ok(Vec::new());
        }

        let probe = probe_radius * ANGSTROM_PER_NM;
        let mut coords: Vec<[f64; 3]> = Vec::with_capacity(atom_indices.len());
        let mut radii: Vec<f64> = Vec::with_capacity(atom_indices.len());
        for &index in atom_indices {
            let position = frame.positions()[index];
            let atom = structure
                .atom(index)
                .ok_or(KernelError::AtomIndexOutOfRange {
                    index,
                    count: structure.atom_count(),
                })?;
            coords.push([position.x, position.y, position.z]);
            radii.push(atom.vdw_radius() + probe);
        }

        let max_radius = radii.iter().copied().fold(0.0_f64, f64::max);
        let kdtree: KdTree<f64, 3> = (&coords).into();
        let sphere = golden_spiral(n_dots);

        let mut areas = Vec::with_capacity(coords.len());
        for (i, center) in coords.iter().enumerate() {
            let radius = radii[i];
            let reach = radius + max_radius;
            let neighbours: Vec<usize> = kdtree
                .within_unsorted::<SquaredEuclidean>(center, reach * reach)
                .into_iter()
                .map(|n| n.item as usize)
                .filter(|&j| j != i && distance_squared(center, &coords[j]) < (radius + radii[j]).powi(2))
                .collect();

            let accessible = sphere
                .iter()
                .filter(|dot| {
                    let point = [
                        center[0] + dot[0] * radius,
                        center[1] + dot[1] * radius,
                        center[2] + dot[2] * radius,
                    ];
                    neighbours
                        .iter()
                        .all(|&j| distance_squared(&point, &coords[j]) >= radii[j] * radii[j])
                })
                .count();

            let sphere_area = 4.0 * PI * radius * radius;
            areas.push(sphere_area * accessible as f64 / n_dots as f64 / ANGSTROM2_PER_NM2);
        }
        Ok(areas)
    }
}
