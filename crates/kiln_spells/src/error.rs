//! Error types for spells and the engine.

use kiln_geometry::PartitionError;
use kiln_graph::{BlockKind, GraphError};

/// A failure raised by a spell at one block. The engine records it and
/// treats the block as unchanged.
#[derive(Debug, thiserror::Error)]
pub enum SpellError {
    /// The spell panicked.
    #[error("spell panicked: {0}")]
    Panicked(String),

    /// The spell tried to change a block's kind.
    #[error("cannot turn a {expected} block into a {found} block")]
    KindChanged {
        /// Kind of the block.
        expected: BlockKind,
        /// Kind of the payload the spell produced.
        found: BlockKind,
    },

    /// The block's data cannot be processed.
    #[error("{0}")]
    Invalid(String),

    /// The skin partitioner rejected its input.
    #[error(transparent)]
    Partition(#[from] PartitionError),

    /// A graph operation failed.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Errors that stop a run before or while it walks the graph.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A mutating spell was requested in dry-run mode.
    #[error("spell '{0}' modifies blocks and cannot run in dry-run mode")]
    MutatingSpellInDryRun(String),

    /// No spell with this name is registered.
    #[error("unknown spell '{0}'")]
    UnknownSpell(String),

    /// A spell with this name is already registered.
    #[error("spell '{0}' is already registered")]
    DuplicateSpell(String),

    /// A block kind filter names no known kind.
    #[error("unknown block kind '{0}'")]
    UnknownBlockKind(String),

    /// Applying an effect to the graph failed.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = SpellError::KindChanged {
            expected: BlockKind::Geometry,
            found: BlockKind::Node,
        };
        assert_eq!(err.to_string(), "cannot turn a Geometry block into a Node block");
        let err = EngineError::MutatingSpellInDryRun("opt_stripify".into());
        assert_eq!(
            err.to_string(),
            "spell 'opt_stripify' modifies blocks and cannot run in dry-run mode"
        );
    }
}
