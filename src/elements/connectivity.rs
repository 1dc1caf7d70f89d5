use super::ElemType;
#[cfg(feature = "json_export")]
use json::{object, JsonValue};

/// A table of same-type elements. Each row holds the node indices of one element.
///
/// Rows are stored contiguously in element-major order. The indices refer to the global
/// node table while a mesh file is being read, and to the owning [Region](crate::mesh::region::Region)'s
/// local node space once the `Mesh` has been built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivityTable {
    elem_type: ElemType,
    n_elements: usize,
    indices: Vec<usize>,
}

impl ConnectivityTable {
    /// Construct an empty table with room for `n_elements` rows
    pub fn with_capacity(elem_type: ElemType, n_elements: usize) -> Self {
        Self {
            elem_type,
            n_elements: 0,
            indices: Vec::with_capacity(n_elements * elem_type.node_count()),
        }
    }

    /// Construct a table from flattened, element-major node indices
    ///
    /// Returns `None` if the number of indices is not a multiple of the element type's node count
    pub fn from_flat(elem_type: ElemType, indices: Vec<usize>) -> Option<Self> {
        let npe = elem_type.node_count();
        match npe {
            0 if indices.is_empty() => Some(Self {
                elem_type,
                n_elements: 0,
                indices,
            }),
            0 => None,
            _ if indices.len() % npe == 0 => Some(Self {
                elem_type,
                n_elements: indices.len() / npe,
                indices,
            }),
            _ => None,
        }
    }

    /// Append one element to the end of the table
    pub fn push_element(&mut self, node_indices: &[usize]) {
        assert_eq!(
            node_indices.len(),
            self.elem_type.node_count(),
            "{} elements must have {} nodes; Cannot add element with {} nodes!",
            self.elem_type,
            self.elem_type.node_count(),
            node_indices.len(),
        );
        self.indices.extend_from_slice(node_indices);
        self.n_elements += 1;
    }

    pub fn elem_type(&self) -> ElemType {
        self.elem_type
    }

    pub fn dim(&self) -> usize {
        self.elem_type.dim()
    }

    pub fn nodes_per_element(&self) -> usize {
        self.elem_type.node_count()
    }

    pub fn n_elements(&self) -> usize {
        self.n_elements
    }

    pub fn is_empty(&self) -> bool {
        self.n_elements == 0
    }

    /// Get the node indices of one element
    pub fn element(&self, elem_idx: usize) -> Option<&[usize]> {
        if elem_idx < self.n_elements {
            let npe = self.nodes_per_element();
            Some(&self.indices[elem_idx * npe..(elem_idx + 1) * npe])
        } else {
            None
        }
    }

    /// Iterate over the rows of the table
    pub fn elements(&self) -> impl Iterator<Item = &[usize]> + '_ {
        let npe = self.nodes_per_element();
        (0..self.n_elements).map(move |i| &self.indices[i * npe..(i + 1) * npe])
    }

    /// All node indices, flattened in element-major order
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Replace every node index in the table with `f(index)`
    pub(crate) fn renumber<F>(&mut self, mut f: F)
    where
        F: FnMut(usize) -> usize,
    {
        for idx in self.indices.iter_mut() {
            *idx = f(*idx);
        }
    }

    /// Produce a Json Object that describes this table
    #[cfg(feature = "json_export")]
    pub fn to_json(&self) -> JsonValue {
        object! {
            "type": self.elem_type.gmsh_code(),
            "elements": JsonValue::from(self.elements().map(|row| row.to_vec()).collect::<Vec<_>>()),
        }
    }
}
