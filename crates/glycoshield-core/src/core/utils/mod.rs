//! Geometry helpers and static residue/atom identifier tables.

pub mod geometry;
pub mod identifiers;
