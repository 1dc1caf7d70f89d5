//! Read unstructured Finite Element meshes from Gmsh files, and partition them into regions.
//!
//! A [Mesh] owns the global node table and two ordered sets of [Region]s:
//! * *internal* regions, holding the mesh's highest dimensional elements
//! * *boundary* regions, holding all lower dimensional elements
//!
//! Elements are grouped into regions by their physical id. Each region's connectivity is renumbered
//! into a compact local node space that covers only the nodes the region references.
//!
//! ```no_run
//! use fem_regions::{Mesh, RegionClass};
//!
//! let mesh = Mesh::from_file("./test_input/two_materials.msh")?;
//! let (class, index) = mesh.region_by_name("walls")?;
//! let walls = mesh.region(class, index)?;
//! assert_eq!(class, RegionClass::Boundary);
//! println!("'walls' touches {} nodes", walls.node_count());
//! # Ok::<(), fem_regions::Error>(())
//! ```

/// Element types and connectivity tables
pub mod elements;
/// Mesh file input
pub mod io;
/// The region-partitioned Mesh
pub mod mesh;

pub use elements::{connectivity::ConnectivityTable, ElemType};
pub use io::gmsh::GmshError;
pub use mesh::region::{PhysicalId, Region, RegionClass, Translator, VtkCells};
pub use mesh::{Mesh, MeshError};

use thiserror::Error;

/// Any error produced by this crate
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Gmsh(#[from] GmshError),
    #[error(transparent)]
    Mesh(#[from] MeshError),
}

pub type Result<T> = std::result::Result<T, Error>;
