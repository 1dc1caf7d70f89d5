use super::MeshError;
use crate::elements::connectivity::ConnectivityTable;

#[cfg(feature = "json_export")]
use json::{object, JsonValue};
use log::debug;
use nalgebra::Point3;
use rayon::prelude::*;
use std::fmt;
use std::str::FromStr;

/// The user-assigned identifier of a group of elements
///
/// Resolves to the declared physical name when the mesh file provides one.
/// Entities that belong to no physical group are identified by their own (dimension, tag) pair,
/// which never aliases a physical group number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PhysicalId {
    Number(i64),
    Name(String),
    Entity { dim: usize, tag: i64 },
}

impl PhysicalId {
    /// Use the declared physical name when there is one
    pub(crate) fn resolve(id: i64, name: Option<&String>) -> Self {
        match name {
            Some(name) => Self::Name(name.clone()),
            None => Self::Number(id),
        }
    }

    /// Does this id match the given region name?
    ///
    /// Numeric ids match their decimal representation. Entity ids match their displayed form
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Name(n) => n == name,
            Self::Number(id) => name.parse::<i64>().map_or(false, |n| n == *id),
            Self::Entity { .. } => self.to_string() == name,
        }
    }
}

impl fmt::Display for PhysicalId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Number(id) => write!(f, "{}", id),
            Self::Name(name) => write!(f, "{}", name),
            Self::Entity { dim, tag } => write!(f, "entity({}, {})", dim, tag),
        }
    }
}

#[cfg(feature = "json_export")]
impl From<&PhysicalId> for JsonValue {
    fn from(id: &PhysicalId) -> Self {
        match id {
            PhysicalId::Number(id) => JsonValue::from(*id),
            PhysicalId::Name(name) => JsonValue::from(name.as_str()),
            PhysicalId::Entity { .. } => JsonValue::from(id.to_string()),
        }
    }
}

/// Internal regions hold the mesh's highest dimensional elements. Everything else lies on a boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionClass {
    Internal,
    Boundary,
}

impl FromStr for RegionClass {
    type Err = MeshError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "i" | "internal" => Ok(Self::Internal),
            "b" | "boundary" => Ok(Self::Boundary),
            _ => Err(MeshError::InvalidRegionClass(s.to_string())),
        }
    }
}

impl fmt::Display for RegionClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Internal => write!(f, "internal"),
            Self::Boundary => write!(f, "boundary"),
        }
    }
}

/// All the elements sharing one physical id and one [RegionClass]
///
/// A `Region` owns its element blocks and the sorted set of global node indices those blocks reference.
/// The blocks' connectivity is expressed in the region's local node space: local index `i` corresponds to
/// global node `node_tags()[i]`.
#[derive(Debug, Clone)]
pub struct Region {
    class: RegionClass,
    physical_id: PhysicalId,
    blocks: Vec<ConnectivityTable>,
    node_tags: Vec<usize>,
}

impl Region {
    /// Build a region from blocks holding global node indices, and rewrite them in terms of local indices
    pub fn new(class: RegionClass, physical_id: PhysicalId, mut blocks: Vec<ConnectivityTable>) -> Self {
        assert!(
            !blocks.is_empty(),
            "Region {} has no element blocks; Cannot construct Region!",
            physical_id
        );

        let mut node_tags: Vec<usize> = blocks
            .iter()
            .flat_map(|block| block.indices().iter().copied())
            .collect();
        node_tags.sort_unstable();
        node_tags.dedup();

        let translator = Translator { tags: &node_tags };
        for block in blocks.iter_mut() {
            block.renumber(|global| {
                translator
                    .local(global)
                    .unwrap_or_else(|| unreachable!("node {} was collected from this block", global))
            });
        }

        debug!(
            "built {} region '{}': {} blocks, {} nodes",
            class,
            physical_id,
            blocks.len(),
            node_tags.len()
        );

        Self {
            class,
            physical_id,
            blocks,
            node_tags,
        }
    }

    pub fn class(&self) -> RegionClass {
        self.class
    }

    pub fn physical_id(&self) -> &PhysicalId {
        &self.physical_id
    }

    /// Number of nodes referenced by this region's elements
    pub fn node_count(&self) -> usize {
        self.node_tags.len()
    }

    /// The sorted, duplicate free global node indices referenced by this region
    pub fn node_tags(&self) -> &[usize] {
        &self.node_tags
    }

    /// The element blocks in order of appearance in the mesh file
    pub fn blocks(&self) -> &[ConnectivityTable] {
        &self.blocks
    }

    pub fn n_elements(&self) -> usize {
        self.blocks.iter().map(|b| b.n_elements()).sum()
    }

    /// Dimension of the region's elements
    pub fn dim(&self) -> usize {
        self.blocks[0].dim()
    }

    /// The mapping between global node indices and this region's local node indices
    pub fn translator(&self) -> Translator<'_> {
        Translator {
            tags: &self.node_tags,
        }
    }

    /// Gather the coordinates of this region's nodes from the global node table (in local index order)
    pub fn node_coords(&self, nodes: &[Point3<f64>]) -> Vec<Point3<f64>> {
        self.node_tags.iter().map(|tag| nodes[*tag]).collect()
    }

    /// Flattened connectivity, offsets and cell types for unstructured-grid export
    pub fn vtk_cells(&self) -> VtkCells {
        let n_elements = self.n_elements();
        let mut cells = VtkCells {
            connectivity: Vec::with_capacity(self.blocks.iter().map(|b| b.indices().len()).sum()),
            offsets: Vec::with_capacity(n_elements),
            cell_types: Vec::with_capacity(n_elements),
        };

        let mut offset = 0;
        for block in self.blocks.iter() {
            let npe = block.nodes_per_element();
            let cell_type = block.elem_type().vtk_cell_type();
            cells.connectivity.extend_from_slice(block.indices());
            for _ in 0..block.n_elements() {
                offset += npe;
                cells.offsets.push(offset);
                cells.cell_types.push(cell_type);
            }
        }

        cells
    }

    /// Produce a Json Object that describes this Region
    #[cfg(feature = "json_export")]
    pub fn to_json(&self) -> JsonValue {
        object! {
            "class": self.class.to_string(),
            "id": JsonValue::from(&self.physical_id),
            "node_tags": self.node_tags.clone(),
            "blocks": JsonValue::from(self.blocks.iter().map(|b| b.to_json()).collect::<Vec<_>>()),
        }
    }
}

/// Monotone bijection between a region's sorted global node indices and local indices `0..n`
#[derive(Debug, Clone, Copy)]
pub struct Translator<'r> {
    tags: &'r [usize],
}

impl<'r> Translator<'r> {
    /// Local index of a global node, if the region references it
    pub fn local(&self, global: usize) -> Option<usize> {
        self.tags.binary_search(&global).ok()
    }

    /// Global index of a local node
    pub fn global(&self, local: usize) -> Option<usize> {
        self.tags.get(local).copied()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Cell arrays in the layout expected by VTK unstructured grids
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VtkCells {
    /// Node indices of every cell, flattened in element-major order
    pub connectivity: Vec<usize>,
    /// Cumulative node count at the end of each cell
    pub offsets: Vec<usize>,
    pub cell_types: Vec<u8>,
}

/// An element block read from a mesh file, tagged with its resolved physical id
#[derive(Debug, Clone)]
pub struct TaggedBlock {
    pub physical_id: PhysicalId,
    pub table: ConnectivityTable,
}

/// Partition element blocks into internal and boundary regions
///
/// Blocks of the highest dimension present become internal regions; all others become boundary regions.
/// Within each class, blocks sharing a physical id are merged into one region, and regions are ordered
/// by the first appearance of their id. Returns `[internal, boundary]`.
pub fn build_regions(blocks: Vec<TaggedBlock>) -> [Vec<Region>; 2] {
    let max_dim = match blocks.iter().map(|b| b.table.dim()).max() {
        Some(dim) => dim,
        None => return [Vec::new(), Vec::new()],
    };

    let (internal, boundary): (Vec<TaggedBlock>, Vec<TaggedBlock>) =
        blocks.into_iter().partition(|b| b.table.dim() == max_dim);

    [
        build_class(RegionClass::Internal, internal),
        build_class(RegionClass::Boundary, boundary),
    ]
}

fn build_class(class: RegionClass, blocks: Vec<TaggedBlock>) -> Vec<Region> {
    group_by_first_appearance(blocks)
        .into_par_iter()
        .map(|(physical_id, tables)| Region::new(class, physical_id, tables))
        .collect()
}

// stable grouping: one group per distinct id, in order of first appearance
fn group_by_first_appearance(blocks: Vec<TaggedBlock>) -> Vec<(PhysicalId, Vec<ConnectivityTable>)> {
    let mut groups: Vec<(PhysicalId, Vec<ConnectivityTable>)> = Vec::new();

    for TaggedBlock { physical_id, table } in blocks {
        match groups.iter_mut().find(|(id, _)| *id == physical_id) {
            Some((_, tables)) => tables.push(table),
            None => groups.push((physical_id, vec![table])),
        }
    }

    groups
}
