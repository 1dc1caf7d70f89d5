/// Fixed-width tables of element node indices
pub mod connectivity;

use std::fmt;
use thiserror::Error;

/// Gmsh element-type code of a 2-node line
pub const GMSH_LINE_2: i32 = 1;
/// Gmsh element-type code of a 3-node triangle
pub const GMSH_TRIANGLE_3: i32 = 2;
/// Gmsh element-type code of a 4-node quadrilateral
pub const GMSH_QUADRANGLE_4: i32 = 3;
/// Gmsh element-type code of a 1-node point
pub const GMSH_POINT_1: i32 = 15;

/// The element-type code could not be found in the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Element type {0} is not supported; expected one of: 1 (line), 2 (triangle), 3 (quadrangle), 15 (point)")]
pub struct UnsupportedElementType(pub i32);

/// The closed set of (first order) element topologies understood by the mesh reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElemType {
    /// Degenerate 0D element. Contributes no topology
    Point,
    /// 2-node line
    Line2,
    /// 3-node triangle
    Tri3,
    /// 4-node quadrilateral
    Quad4,
}

/// Registry entry for one element type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElemTypeInfo {
    pub dim: usize,
    pub node_count: usize,
    pub elem_type: ElemType,
}

// (gmsh code, dimension, nodes per element, type)
static REGISTRY: [(i32, usize, usize, ElemType); 4] = [
    (GMSH_LINE_2, 1, 2, ElemType::Line2),
    (GMSH_TRIANGLE_3, 2, 3, ElemType::Tri3),
    (GMSH_QUADRANGLE_4, 2, 4, ElemType::Quad4),
    (GMSH_POINT_1, 0, 0, ElemType::Point),
];

/// Look up the dimension, node count and [ElemType] associated with a Gmsh element-type code
pub fn describe(type_code: i32) -> Result<ElemTypeInfo, UnsupportedElementType> {
    REGISTRY
        .iter()
        .find(|(code, ..)| *code == type_code)
        .map(|&(_, dim, node_count, elem_type)| ElemTypeInfo {
            dim,
            node_count,
            elem_type,
        })
        .ok_or(UnsupportedElementType(type_code))
}

impl ElemType {
    pub fn from_gmsh_code(type_code: i32) -> Result<Self, UnsupportedElementType> {
        describe(type_code).map(|info| info.elem_type)
    }

    fn entry(&self) -> &'static (i32, usize, usize, ElemType) {
        REGISTRY
            .iter()
            .find(|(.., elem_type)| elem_type == self)
            .unwrap_or_else(|| unreachable!("every ElemType has a registry entry"))
    }

    /// The Gmsh element-type code
    pub fn gmsh_code(&self) -> i32 {
        self.entry().0
    }

    /// Topological dimension
    pub fn dim(&self) -> usize {
        self.entry().1
    }

    /// Number of node indices stored per element
    ///
    /// `Point`s report zero, as they carry no connectivity
    pub fn node_count(&self) -> usize {
        self.entry().2
    }

    /// The matching VTK cell type code
    pub fn vtk_cell_type(&self) -> u8 {
        match self {
            Self::Point => 1,
            Self::Line2 => 3,
            Self::Tri3 => 5,
            Self::Quad4 => 9,
        }
    }
}

impl TryFrom<i32> for ElemType {
    type Error = UnsupportedElementType;

    fn try_from(type_code: i32) -> Result<Self, Self::Error> {
        Self::from_gmsh_code(type_code)
    }
}

impl fmt::Display for ElemType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Point => write!(f, "Point"),
            Self::Line2 => write!(f, "Line2"),
            Self::Tri3 => write!(f, "Tri3"),
            Self::Quad4 => write!(f, "Quad4"),
        }
    }
}
