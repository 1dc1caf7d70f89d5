use super::GmshError;
use crate::mesh::region::{PhysicalId, TaggedBlock};
use crate::mesh::Mesh;

use nalgebra::Point3;
use std::collections::{BTreeMap, HashMap};

/// Everything read from a Gmsh file that is needed to build a [Mesh]
///
/// The record is filled in by the section readers, in file order:
/// * `$MeshFormat` sets `version`
/// * `$PhysicalNames` fills `physical_names`
/// * `$Entities` fills `entities`, resolving physical names that were already read
/// * `$Nodes` fills `nodes`, `node_tags` and `node_rows`
/// * `$Elements` fills `blocks`, resolving entities and node tags that were already read
#[derive(Debug, Default)]
pub struct MeshDescription {
    /// Display string of the declared format (ex: "MSH 4.1 ASCII")
    pub version: Option<String>,
    /// (dimension, physical tag) => physical name
    pub physical_names: BTreeMap<(usize, i64), String>,
    /// (dimension, entity tag) => physical id
    pub entities: BTreeMap<(usize, i64), PhysicalId>,
    /// Node coordinates in the order they were read
    pub nodes: Vec<Point3<f64>>,
    /// Declared node tags, parallel to `nodes`
    pub node_tags: Vec<usize>,
    /// node tag => row in `nodes`
    pub node_rows: HashMap<usize, usize>,
    /// Element blocks of positive dimension, holding rows of `nodes`
    pub blocks: Vec<TaggedBlock>,
}

impl MeshDescription {
    /// Partition the element blocks into regions and build the final [Mesh]
    pub fn into_mesh(self) -> Result<Mesh, GmshError> {
        let version = self.version.ok_or(GmshError::MissingSection("MeshFormat"))?;
        if self.nodes.is_empty() {
            return Err(GmshError::MissingSection("Nodes"));
        }
        if self.blocks.is_empty() {
            return Err(GmshError::MissingSection("Elements"));
        }

        Ok(Mesh::new(version, self.nodes, self.node_tags, self.blocks))
    }
}
