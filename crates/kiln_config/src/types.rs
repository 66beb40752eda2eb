//! Configuration types deserialized from `kiln.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};

/// The top-level configuration parsed from `kiln.toml`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct KilnConfig {
    /// Batch driver defaults.
    #[serde(default)]
    pub toaster: ToasterConfig,
    /// Geometry kernel parameters.
    #[serde(default)]
    pub kernels: KernelConfig,
}

/// Defaults for a toaster run.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ToasterConfig {
    /// Worker threads; unset means available parallelism.
    pub jobs: Option<usize>,
    /// Spell pipeline, by name, in order.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub spells: Vec<String>,
    /// File name patterns to process; empty means every file.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub include: Vec<String>,
    /// File name patterns to skip.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub exclude: Vec<String>,
    /// Block kinds spells may visit; empty means all kinds.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub include_blocks: Vec<String>,
    /// Block kinds spells never visit.
    #[serde(default, deserialize_with = "deserialize_string_or_vec")]
    pub exclude_blocks: Vec<String>,
    /// Prepended to output file stems.
    #[serde(default)]
    pub prefix: String,
    /// Appended to output file stems.
    #[serde(default)]
    pub suffix: String,
}

/// How the skin partitioner treats vertices without any positive weight.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ZeroWeightMode {
    /// Bind the vertex fully to the skin's root bone.
    #[default]
    RootBone,
    /// Leave every triangle touching the vertex out of the partition.
    DropTriangles,
}

/// Parameters handed to the geometry kernels.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct KernelConfig {
    /// Simulated post-transform cache size.
    pub cache_size: usize,
    /// Join strips into one with degenerate stitches.
    pub stitch_strips: bool,
    /// Bones per skin partition.
    pub max_bones_per_partition: usize,
    /// Vertices per skin partition; 0 means unbounded.
    pub max_vertices_per_partition: usize,
    /// Triangles per skin partition; 0 means unbounded.
    pub max_triangles_per_partition: usize,
    /// Influences kept per vertex; 0 means unbounded.
    pub max_bones_per_vertex: usize,
    /// Give every vertex of a partition the same number of influences.
    pub pad_bones: bool,
    /// Also emit strips for each skin partition.
    pub stripify_partitions: bool,
    /// Policy for weightless vertices.
    pub zero_weight: ZeroWeightMode,
    /// Distance under which hull points are merged.
    pub hull_precision: f64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            cache_size: 32,
            stitch_strips: true,
            max_bones_per_partition: 4,
            max_vertices_per_partition: 0,
            max_triangles_per_partition: 0,
            max_bones_per_vertex: 4,
            pad_bones: false,
            stripify_partitions: false,
            zero_weight: ZeroWeightMode::RootBone,
            hull_precision: 1e-4,
        }
    }
}

/// Deserializes a field that can be either a single string or a list of strings.
///
/// Allows `spells = "dump"` as shorthand for `spells = ["dump"]`.
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}
