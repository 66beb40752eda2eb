//! Recoverable problems found by the kernels.

use kiln_diagnostics::{Category, DiagnosticCode, Severity};
use std::fmt;

/// A degenerate or suspicious input reported by a kernel. The kernel still
/// produces a result.
#[derive(Clone, Debug, PartialEq)]
pub enum KernelWarning {
    /// A triangle with a repeated vertex was set aside.
    DegenerateTriangle {
        /// Index of the triangle in the input.
        index: usize,
        /// Its vertices.
        triangle: [u32; 3],
    },
    /// A vertex has no bone weight above zero.
    ZeroWeightVertex {
        /// The vertex.
        vertex: u32,
    },
    /// Points that ended up inside the hull or on its surface.
    DiscardedHullPoints {
        /// How many were discarded.
        count: usize,
    },
    /// Degenerate vertices inserted while stitching strips.
    Stitches {
        /// Number of stitch vertices.
        count: usize,
    },
    /// A triangle's own bones exceed the partition bound; its vertices were
    /// trimmed to the strongest bones.
    BoneBoundExceeded {
        /// Index of the triangle in the input.
        triangle: usize,
        /// Bones the triangle needed.
        bones: usize,
        /// The bound.
        bound: usize,
    },
    /// The computed mass is zero.
    ZeroMass,
    /// The mesh is wound inside out.
    MisWound,
    /// The points span fewer than three dimensions.
    ReducedHull {
        /// Dimension of the hull: 0, 1 or 2.
        dimension: u8,
    },
    /// A vertex had more influences than allowed.
    VertexBonesTrimmed {
        /// The vertex.
        vertex: u32,
        /// Influences before trimming.
        from: usize,
        /// Influences kept.
        to: usize,
    },
}

impl KernelWarning {
    /// Diagnostic code for this warning.
    pub fn code(&self) -> DiagnosticCode {
        let number = match self {
            KernelWarning::DegenerateTriangle { .. } => 201,
            KernelWarning::ZeroWeightVertex { .. } => 202,
            KernelWarning::DiscardedHullPoints { .. } => 203,
            KernelWarning::Stitches { .. } => 204,
            KernelWarning::BoneBoundExceeded { .. } => 205,
            KernelWarning::ZeroMass => 206,
            KernelWarning::MisWound => 207,
            KernelWarning::ReducedHull { .. } => 208,
            KernelWarning::VertexBonesTrimmed { .. } => 209,
        };
        DiagnosticCode::new(Category::Kernel, number)
    }

    /// Severity used when the warning becomes a diagnostic.
    pub fn severity(&self) -> Severity {
        match self {
            KernelWarning::DiscardedHullPoints { .. } | KernelWarning::Stitches { .. } => {
                Severity::Note
            }
            _ => Severity::Warning,
        }
    }
}

impl fmt::Display for KernelWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelWarning::DegenerateTriangle { index, triangle } => write!(
                f,
                "degenerate triangle {index} ({}, {}, {})",
                triangle[0], triangle[1], triangle[2]
            ),
            KernelWarning::ZeroWeightVertex { vertex } => {
                write!(f, "vertex {vertex} has no bone weights")
            }
            KernelWarning::DiscardedHullPoints { count } => {
                write!(f, "{count} interior or coplanar points discarded")
            }
            KernelWarning::Stitches { count } => write!(f, "{count} stitch vertices inserted"),
            KernelWarning::BoneBoundExceeded {
                triangle,
                bones,
                bound,
            } => write!(
                f,
                "triangle {triangle} uses {bones} bones, more than the partition bound of {bound}"
            ),
            KernelWarning::ZeroMass => f.write_str("mass is zero"),
            KernelWarning::MisWound => f.write_str("mesh is wound inside out"),
            KernelWarning::ReducedHull { dimension } => {
                write!(f, "points span only {dimension} dimension(s)")
            }
            KernelWarning::VertexBonesTrimmed { vertex, from, to } => {
                write!(f, "vertex {vertex} trimmed from {from} to {to} bones")
            }
        }
    }
}
