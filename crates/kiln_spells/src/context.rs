//! Per-file state handed to every spell.

use kiln_config::{KernelConfig, ZeroWeightMode};
use kiln_diagnostics::{Diagnostic, DiagnosticSink, Location};
use kiln_geometry::{KernelWarning, PartitionOptions, ZeroWeightPolicy, DEFAULT_CACHE_SIZE};
use kiln_graph::{BlockId, Graph};

/// Kernel parameters shared by the built-in spells.
#[derive(Clone, Debug, PartialEq)]
pub struct SpellOptions {
    /// Simulated post-transform cache size.
    pub cache_size: usize,
    /// Join strips produced by `opt_stripify` into one.
    pub stitch_strips: bool,
    /// Bounds for `fix_skin_partition`. The root bone of the zero-weight
    /// policy is replaced by each skin's own root bone.
    pub partition: PartitionOptions,
    /// Point merge distance for `fix_convex_hull`.
    pub hull_precision: f64,
}

impl Default for SpellOptions {
    fn default() -> Self {
        Self::from(&KernelConfig::default())
    }
}

impl From<&KernelConfig> for SpellOptions {
    fn from(k: &KernelConfig) -> Self {
        let bound = |n: usize| (n > 0).then_some(n);
        Self {
            cache_size: if k.cache_size == 0 { DEFAULT_CACHE_SIZE } else { k.cache_size },
            stitch_strips: k.stitch_strips,
            partition: PartitionOptions {
                max_bones_per_partition: k.max_bones_per_partition,
                max_vertices_per_partition: bound(k.max_vertices_per_partition),
                max_triangles_per_partition: bound(k.max_triangles_per_partition),
                max_bones_per_vertex: bound(k.max_bones_per_vertex),
                stripify: k.stripify_partitions,
                stitch_strips: k.stitch_strips,
                pad_bones: k.pad_bones,
                zero_weight: match k.zero_weight {
                    ZeroWeightMode::RootBone => ZeroWeightPolicy::AssignRootBone(0),
                    ZeroWeightMode::DropTriangles => ZeroWeightPolicy::DropTriangles,
                },
            },
            hull_precision: k.hull_precision,
        }
    }
}

/// What a spell may see of the file being processed besides the graph.
#[derive(Clone, Copy)]
pub struct SpellContext<'a> {
    file: Option<&'a str>,
    sink: &'a DiagnosticSink,
    options: &'a SpellOptions,
}

impl<'a> SpellContext<'a> {
    /// Creates a context that reports into `sink`.
    pub fn new(sink: &'a DiagnosticSink, options: &'a SpellOptions) -> Self {
        Self {
            file: None,
            sink,
            options,
        }
    }

    /// Attaches the file name to every location built from this context.
    pub fn with_file(mut self, file: &'a str) -> Self {
        self.file = Some(file);
        self
    }

    /// The file being processed, if known.
    pub fn file(&self) -> Option<&'a str> {
        self.file
    }

    /// Kernel parameters.
    pub fn options(&self) -> &'a SpellOptions {
        self.options
    }

    /// The diagnostics sink for this file.
    pub fn sink(&self) -> &'a DiagnosticSink {
        self.sink
    }

    /// Location of `block`, with its ownership path.
    pub fn location(&self, graph: &Graph, block: BlockId) -> Location {
        let loc = Location::block(block.as_raw()).with_path(graph.path(block));
        match self.file {
            Some(file) => loc.with_file(file),
            None => loc,
        }
    }

    /// Location of the file as a whole.
    pub fn file_location(&self) -> Location {
        match self.file {
            Some(file) => Location::NONE.with_file(file),
            None => Location::NONE,
        }
    }

    /// Emits a diagnostic.
    pub fn emit(&self, diag: Diagnostic) {
        self.sink.emit(diag);
    }

    /// Emits a kernel warning raised while processing `block`.
    pub fn kernel_warning(&self, graph: &Graph, block: BlockId, warning: &KernelWarning) {
        self.sink.emit(Diagnostic::new(
            warning.severity(),
            warning.code(),
            warning.to_string(),
            self.location(graph, block),
        ));
    }
}
