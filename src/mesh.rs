/// Regions of a Mesh, and the algorithm used to partition element blocks into them
pub mod region;

use crate::elements::connectivity::ConnectivityTable;
use region::{build_regions, Region, RegionClass, TaggedBlock};

#[cfg(feature = "json_export")]
use json::{object, JsonValue};
use nalgebra::Point3;
use smallvec::SmallVec;
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[cfg(feature = "json_export")]
use std::fs::File;
#[cfg(feature = "json_export")]
use std::io::BufWriter;

/// Errors produced when looking up data in a constructed [Mesh]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeshError {
    #[error("No region named <{0}> found!")]
    UnknownRegion(String),
    #[error("{class} region {index} doesn't exist; Mesh only has {count} {class} regions!")]
    RegionIndexOutOfRange {
        class: RegionClass,
        index: usize,
        count: usize,
    },
    #[error("<{0}> is not a region class; expected 'i', 'internal', 'b' or 'boundary'")]
    InvalidRegionClass(String),
    #[error("Element block {block} doesn't exist; region only has {count} blocks!")]
    BlockIndexOutOfRange { block: usize, count: usize },
    #[error("Element {element} doesn't exist; block only has {count} elements!")]
    ElementIndexOutOfRange { element: usize, count: usize },
}

/// A finite element mesh, partitioned into internal and boundary [Region]s
///
/// The mesh owns the global node table (in the order the nodes were read from file) and two ordered
/// sequences of regions. Internal regions hold the highest dimensional elements found in the mesh file;
/// lower dimensional elements are gathered into boundary regions. Regions are ordered by the first
/// appearance of their physical id in the file.
///
/// Each region's element connectivity refers to its own compact node space. Use [Region::node_tags]
/// (or [Mesh::region_node_coords]) to relate local node indices back to the global node table.
///
/// A `Mesh` is not modified after construction.
#[derive(Debug, Clone)]
pub struct Mesh {
    version: String,
    nodes: Vec<Point3<f64>>,
    node_tags: Vec<usize>,
    internal: Vec<Region>,
    boundary: Vec<Region>,
}

impl Mesh {
    /// Build a mesh from a global node table and a sequence of element blocks holding global node indices
    ///
    /// `node_tags` are the node tags declared in the mesh file, in the same order as `nodes`
    pub fn new(
        version: impl Into<String>,
        nodes: Vec<Point3<f64>>,
        node_tags: Vec<usize>,
        blocks: Vec<TaggedBlock>,
    ) -> Self {
        assert!(
            blocks
                .iter()
                .flat_map(|b| b.table.indices())
                .all(|idx| *idx < nodes.len()),
            "Element blocks reference nodes outside of the node table; Cannot construct Mesh!"
        );

        let [internal, boundary] = build_regions(blocks);

        Self {
            version: version.into(),
            nodes,
            node_tags,
            internal,
            boundary,
        }
    }

    /// Read a Gmsh (MSH 4.1 ASCII) mesh file
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        Ok(crate::io::gmsh::read(path)?)
    }

    /// Description of the format the mesh was read from (ex: "MSH 4.1 ASCII")
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The global node table
    pub fn nodes(&self) -> &[Point3<f64>] {
        &self.nodes
    }

    /// The node tags declared in the mesh file, parallel to [Mesh::nodes]
    pub fn node_tags(&self) -> &[usize] {
        &self.node_tags
    }

    /// Get the total number of nodes in the mesh, or the number of nodes in one region
    pub fn node_count(&self, region: Option<(RegionClass, usize)>) -> Result<usize, MeshError> {
        match region {
            Some((class, index)) => self.region(class, index).map(|r| r.node_count()),
            None => Ok(self.nodes.len()),
        }
    }

    pub fn regions(&self, class: RegionClass) -> &[Region] {
        match class {
            RegionClass::Internal => &self.internal,
            RegionClass::Boundary => &self.boundary,
        }
    }

    pub fn internal_regions(&self) -> &[Region] {
        &self.internal
    }

    pub fn boundary_regions(&self) -> &[Region] {
        &self.boundary
    }

    /// Iterate over all regions: boundary regions first, then internal regions
    pub fn all_regions(&self) -> impl Iterator<Item = &Region> + '_ {
        self.boundary.iter().chain(self.internal.iter())
    }

    /// Retrieve a region by class and index
    pub fn region(&self, class: RegionClass, index: usize) -> Result<&Region, MeshError> {
        let regions = self.regions(class);
        regions.get(index).ok_or(MeshError::RegionIndexOutOfRange {
            class,
            index,
            count: regions.len(),
        })
    }

    /// Find the class and index of a region by its physical name (or id)
    ///
    /// Boundary regions are searched before internal regions
    pub fn region_by_name(&self, name: &str) -> Result<(RegionClass, usize), MeshError> {
        [RegionClass::Boundary, RegionClass::Internal]
            .into_iter()
            .find_map(|class| {
                self.regions(class)
                    .iter()
                    .position(|r| r.physical_id().matches(name))
                    .map(|index| (class, index))
            })
            .ok_or_else(|| MeshError::UnknownRegion(name.to_string()))
    }

    /// Find the index of a boundary region by its physical name (or id)
    pub fn boundary_index(&self, name: &str) -> Result<usize, MeshError> {
        self.boundary
            .iter()
            .position(|r| r.physical_id().matches(name))
            .ok_or_else(|| MeshError::UnknownRegion(name.to_string()))
    }

    /// Get the coordinates of a region's nodes, in the region's local node order
    pub fn region_node_coords(
        &self,
        class: RegionClass,
        index: usize,
    ) -> Result<Vec<Point3<f64>>, MeshError> {
        Ok(self.region(class, index)?.node_coords(&self.nodes))
    }

    /// Get the coordinates of the nodes of one element
    pub fn element_coords(
        &self,
        (class, index): (RegionClass, usize),
        block: usize,
        element: usize,
    ) -> Result<SmallVec<[Point3<f64>; 4]>, MeshError> {
        let region = self.region(class, index)?;
        let table = block_of(region, block)?;
        let locals = table.element(element).ok_or(MeshError::ElementIndexOutOfRange {
            element,
            count: table.n_elements(),
        })?;

        Ok(locals
            .iter()
            .map(|local| self.nodes[region.node_tags()[*local]])
            .collect())
    }

    /// Plain text summary of the mesh
    pub fn describe(&self) -> String {
        let mut summary = format!("{}\nnodes: {}\n", self.version, self.nodes.len());
        for (class, regions) in [
            (RegionClass::Internal, &self.internal),
            (RegionClass::Boundary, &self.boundary),
        ] {
            summary.push_str(&format!("{} regions:\n", class));
            for (index, region) in regions.iter().enumerate() {
                summary.push_str(&format!(
                    "  [{}] {} ({} nodes, {} elements)\n",
                    index,
                    region.physical_id(),
                    region.node_count(),
                    region.n_elements()
                ));
            }
        }
        summary
    }

    /// Produce a Json Object that describes this Mesh
    #[cfg(feature = "json_export")]
    pub fn to_json(&self) -> JsonValue {
        object! {
            "version": self.version.as_str(),
            "nodes": JsonValue::from(self.nodes.iter().map(|p| vec![p.x, p.y, p.z]).collect::<Vec<_>>()),
            "node_tags": self.node_tags.clone(),
            "internal": JsonValue::from(self.internal.iter().map(|r| r.to_json()).collect::<Vec<_>>()),
            "boundary": JsonValue::from(self.boundary.iter().map(|r| r.to_json()).collect::<Vec<_>>()),
        }
    }

    /// Print the mesh to a JSON file specified by path.
    #[cfg(feature = "json_export")]
    pub fn export_to_json(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let f = File::create(path.as_ref())?;
        let mut w = BufWriter::new(&f);

        self.to_json().write_pretty(&mut w, 4)?;

        Ok(())
    }
}

fn block_of(region: &Region, block: usize) -> Result<&ConnectivityTable, MeshError> {
    region
        .blocks()
        .get(block)
        .ok_or(MeshError::BlockIndexOutOfRange {
            block,
            count: region.blocks().len(),
        })
}

impl fmt::Display for Mesh {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}
