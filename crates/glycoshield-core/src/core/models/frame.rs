use nalgebra::Point3;

/// Atomic coordinates (Angstroms) of one trajectory frame, in topology order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frame {
    positions: Vec<Point3<f64>>,
}

impl Frame {
    pub fn new(positions: Vec<Point3<f64>>) -> Self {
        Self { positions }
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub fn position(&self, atom_index: usize) -> Option<&Point3<f64>> {
        self.positions.get(atom_index)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn is_finite(&self) -> bool {
        self.positions
            .iter()
            .all(|p| p.x.is_finite() && p.y.is_finite() && p.z.is_finite())
    }

    /// Collects the coordinates of the given atoms into a new frame.
    pub fn select(&self, atom_indices: &[usize]) -> Frame {
        Frame::new(
            atom_indices
                .iter()
                .filter_map(|&i| self.positions.get(i).copied())
                .collect(),
        )
    }

    pub fn concat(&self, other: &Frame) -> Frame {
        let mut positions = self.positions.clone();
        positions.extend_from_slice(&other.positions);
        Frame::new(positions)
    }
}

impl From<Vec<Point3<f64>>> for Frame {
    fn from(positions: Vec<Point3<f64>>) -> Self {
        Self::new(positions)
    }
}
