use super::atom::AtomKind;
use serde::Serialize;
use std::fmt;
use std::ops::Range;

/// Identifies a residue uniquely within a structure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ResidueKey {
    pub chain_id: char,
    pub segment: String,
    pub number: isize,
}

impl ResidueKey {
    pub fn new(chain_id: char, segment: &str, number: isize) -> Self {
        Self {
            chain_id,
            segment: segment.to_string(),
            number,
        }
    }
}

impl fmt::Display for ResidueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segment.is_empty() {
            write!(f, "{}:{}", self.chain_id, self.number)
        } else {
            write!(f, "{}/{}:{}", self.chain_id, self.segment, self.number)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Residue {
    pub key: ResidueKey,
    pub name: String,
    pub kind: AtomKind,
    pub(crate) atoms: Range<usize>, // Contiguous atom indices in the parent structure
}

impl Residue {
    pub fn atoms(&self) -> Range<usize> {
        self.atoms.clone()
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn residue_key_display_includes_segment_only_when_present() {
        assert_eq!(ResidueKey::new('A', "", 12).to_string(), "A:12");
        assert_eq!(ResidueKey::new('B', "463", 2).to_string(), "B/463:2");
    }

    #[test]
    fn residue_keys_order_by_chain_then_segment_then_number() {
        let mut keys = vec![
            ResidueKey::new('B', "", 1),
            ResidueKey::new('A', "463", 1),
            ResidueKey::new('A', "", 10),
            ResidueKey::new('A', "", 2),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                ResidueKey::new('A', "", 2),
                ResidueKey::new('A', "", 10),
                ResidueKey::new('A', "463", 1),
                ResidueKey::new('B', "", 1),
            ]
        );
    }
}
