//! `check_readwrite`: serializes the graph, reloads it, and compares.

use kiln_diagnostics::Diagnostic;
use kiln_graph::{load, serialize, BlockId, Graph};

use crate::codes::READWRITE_MISMATCH;
use crate::{Effect, Spell, SpellContext, SpellError};

/// Checks that the graph survives a write and a reload with the same blocks
/// in write order.
pub struct CheckReadWrite;

impl CheckReadWrite {
    fn compare(graph: &Graph) -> Result<(), String> {
        let bytes = serialize(graph).map_err(|e| e.to_string())?;
        let reloaded = load(&bytes).map_err(|e| format!("reload failed: {e}"))?.graph;
        let order = graph.write_order().map_err(|e| e.to_string())?;
        if order.len() != reloaded.len() {
            return Err(format!(
                "wrote {} blocks but read back {}",
                order.len(),
                reloaded.len()
            ));
        }
        for (index, (old, (_, new))) in order.iter().zip(reloaded.iter()).enumerate() {
            if graph.payload(*old) != Some(new.payload()) {
                return Err(format!(
                    "block {old} ({}) differs after reload at position {index}",
                    new.kind()
                ));
            }
        }
        if graph.roots().len() != reloaded.roots().len() {
            return Err(format!(
                "wrote {} roots but read back {}",
                graph.roots().len(),
                reloaded.roots().len()
            ));
        }
        Ok(())
    }
}

impl Spell for CheckReadWrite {
    fn name(&self) -> &str {
        "check_readwrite"
    }

    fn description(&self) -> &str {
        "serialize and reload the file, comparing every block"
    }

    fn reads_only(&self) -> bool {
        true
    }

    fn cast(
        &self,
        _graph: &Graph,
        _block: BlockId,
        _ctx: &SpellContext<'_>,
    ) -> Result<Effect, SpellError> {
        // The comparison covers the whole file at exit.
        Ok(Effect::SkipSubtree)
    }

    fn file_exit(&self, graph: &Graph, ctx: &SpellContext<'_>) {
        match Self::compare(graph) {
            Ok(()) => log::debug!("read/write check passed for {} blocks", graph.len()),
            Err(reason) => ctx.emit(Diagnostic::error(
                READWRITE_MISMATCH,
                reason,
                ctx.file_location(),
            )),
        }
    }
}
