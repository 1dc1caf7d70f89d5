//! Gmsh mesh file input.
//!
//! Reads the ASCII variant of the MSH 4.1 format. A file is a sequence of sections, each opened by a
//! `$<Name>` line and closed by a matching `$End<Name>` line. The following sections are understood:
//!
//! * `$MeshFormat`: format version (required)
//! * `$PhysicalNames`: names of physical groups (optional)
//! * `$Entities`: maps geometric entities to physical groups (required to resolve element blocks)
//! * `$Nodes`: node coordinates (required)
//! * `$Elements`: element connectivity (required)
//!
//! All other sections are skipped. Supported element types are 2-node lines, 3-node triangles and
//! 4-node quadrangles. Point elements are accepted but discarded.
//!
//! ## Example
//! ```no_run
//! use fem_regions::io::gmsh;
//!
//! let mesh = gmsh::read("./test_input/unit_square.msh").unwrap();
//! println!("{}", mesh);
//! ```

/// The intermediate record populated by the section readers
pub mod description;
mod sections;

pub use description::MeshDescription;

use crate::elements::UnsupportedElementType;
use crate::mesh::Mesh;

use log::{debug, info, warn};
use smallvec::SmallVec;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// The MSH format version this reader is written against
pub const SUPPORTED_VERSION: &str = "4.1";

/// Errors produced while reading a Gmsh file. Any of these aborts the read.
#[derive(Debug, Error)]
pub enum GmshError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A section was not closed by the expected marker
    #[error("Expected <{expected}>, got: <{found}>")]
    MalformedSection { expected: String, found: String },

    /// A line does not have the expected number or type of fields
    #[error("Malformed line {line_no} in ${section} section: <{line}>")]
    MalformedLine {
        section: &'static str,
        line_no: usize,
        line: String,
    },

    #[error("Unexpected end of file in ${section} section")]
    UnexpectedEof { section: &'static str },

    #[error("Section ${0} is never closed")]
    UnterminatedSection(String),

    #[error(transparent)]
    UnsupportedElementType(#[from] UnsupportedElementType),

    #[error("Unsupported file type {0}; only ASCII (0) mesh files can be read")]
    UnsupportedFileType(i32),

    #[error("Elements reference entity {tag} of dimension {dim}, which is not declared in the $Entities section")]
    UnknownEntity { dim: usize, tag: i64 },

    #[error("Elements reference node {0}, which is not declared in the $Nodes section")]
    UnknownNode(usize),

    #[error("${section} section declares {expected} {item}, but {found} were read")]
    CountMismatch {
        section: &'static str,
        item: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Missing section: ${0}")]
    MissingSection(&'static str),
}

/// Read a Gmsh mesh file and build a [Mesh] from it
pub fn read(path: impl AsRef<Path>) -> Result<Mesh, GmshError> {
    let file = File::open(path.as_ref())?;
    read_from(BufReader::new(file))
}

/// Read a Gmsh mesh from any buffered source and build a [Mesh] from it
pub fn read_from<R: BufRead>(reader: R) -> Result<Mesh, GmshError> {
    let mesh = read_description(reader)?.into_mesh()?;

    info!(
        "read {} mesh: {} nodes, {} internal regions, {} boundary regions",
        mesh.version(),
        mesh.node_count(None).unwrap_or_default(),
        mesh.internal_regions().len(),
        mesh.boundary_regions().len()
    );

    Ok(mesh)
}

/// Run the section readers over a Gmsh file without building a [Mesh]
pub fn read_description<R: BufRead>(reader: R) -> Result<MeshDescription, GmshError> {
    let mut cursor = LineCursor::new(reader);
    let mut desc = MeshDescription::default();

    while let Some(line) = cursor.next_line()? {
        if line.trim().is_empty() {
            continue;
        }

        // openers are matched exactly, like closing markers
        match line.strip_prefix('$') {
            Some(name) => match Section::from_name(name) {
                Some(section) => {
                    debug!("reading ${} section (line {})", section, cursor.line_no());
                    section.read(&mut cursor, &mut desc)?;
                }
                None => {
                    warn!("skipping unknown section ${}", name);
                    skip_section(&mut cursor, name)?;
                }
            },
            None => return Err(cursor.malformed("file", &line)),
        }
    }

    Ok(desc)
}

// skip to `$End<name>`; any other closing marker is a mismatch
fn skip_section<R: BufRead>(cursor: &mut LineCursor<R>, name: &str) -> Result<(), GmshError> {
    let expected = format!("$End{}", name);
    while let Some(line) = cursor.next_line()? {
        if line == expected {
            return Ok(());
        }
        if line.starts_with("$End") {
            return Err(GmshError::MalformedSection { expected, found: line });
        }
    }
    Err(GmshError::UnterminatedSection(name.to_string()))
}

/// The sections that have a dedicated reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    MeshFormat,
    PhysicalNames,
    Entities,
    Nodes,
    Elements,
}

impl Section {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "MeshFormat" => Some(Self::MeshFormat),
            "PhysicalNames" => Some(Self::PhysicalNames),
            "Entities" => Some(Self::Entities),
            "Nodes" => Some(Self::Nodes),
            "Elements" => Some(Self::Elements),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::MeshFormat => "MeshFormat",
            Self::PhysicalNames => "PhysicalNames",
            Self::Entities => "Entities",
            Self::Nodes => "Nodes",
            Self::Elements => "Elements",
        }
    }

    fn read<R: BufRead>(
        &self,
        cursor: &mut LineCursor<R>,
        desc: &mut MeshDescription,
    ) -> Result<(), GmshError> {
        match self {
            Self::MeshFormat => sections::read_mesh_format(cursor, desc),
            Self::PhysicalNames => sections::read_physical_names(cursor, desc),
            Self::Entities => sections::read_entities(cursor, desc),
            Self::Nodes => sections::read_nodes(cursor, desc),
            Self::Elements => sections::read_elements(cursor, desc),
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Forward-only line reader that keeps track of the current line number
pub(crate) struct LineCursor<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl<R: BufRead> LineCursor<R> {
    fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }

    fn line_no(&self) -> usize {
        self.line_no
    }

    fn next_line(&mut self) -> Result<Option<String>, GmshError> {
        match self.lines.next() {
            Some(line) => {
                self.line_no += 1;
                Ok(Some(line?))
            }
            None => Ok(None),
        }
    }

    /// Read the next line, failing at the end of the file
    fn expect_line(&mut self, section: &'static str) -> Result<String, GmshError> {
        self.next_line()?
            .ok_or(GmshError::UnexpectedEof { section })
    }

    /// Read a line made of exactly `N` fields of type `T`
    fn expect_fields<T: FromStr, const N: usize>(
        &mut self,
        section: &'static str,
    ) -> Result<[T; N], GmshError> {
        let line = self.expect_line(section)?;
        parse_fields::<T>(&line)
            .and_then(|fields| <[T; N]>::try_from(fields.into_vec()).ok())
            .ok_or_else(|| self.malformed(section, &line))
    }

    /// Read a line made of exactly `n` fields of type `T`
    fn expect_n_fields<T: FromStr>(
        &mut self,
        section: &'static str,
        n: usize,
    ) -> Result<SmallVec<[T; 8]>, GmshError> {
        let line = self.expect_line(section)?;
        parse_fields::<T>(&line)
            .filter(|fields| fields.len() == n)
            .ok_or_else(|| self.malformed(section, &line))
    }

    /// Consume the closing marker of a section
    ///
    /// The marker must match `$End<section>` exactly
    fn expect_end(&mut self, section: &'static str) -> Result<(), GmshError> {
        let found = self.expect_line(section)?;
        let expected = format!("$End{}", section);
        if found == expected {
            Ok(())
        } else {
            Err(GmshError::MalformedSection { expected, found })
        }
    }

    fn malformed(&self, section: &'static str, line: &str) -> GmshError {
        GmshError::MalformedLine {
            section,
            line_no: self.line_no,
            line: line.to_string(),
        }
    }
}

fn parse_fields<T: FromStr>(line: &str) -> Option<SmallVec<[T; 8]>> {
    line.split_whitespace().map(|field| field.parse().ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::region::{PhysicalId, RegionClass};
    use std::fs::read_to_string;
    use std::io::Cursor;

    fn unit_square_src() -> String {
        read_to_string("./test_input/unit_square.msh").unwrap()
    }

    #[test]
    fn unit_square() {
        let mesh = read("./test_input/unit_square.msh").unwrap();

        assert_eq!(mesh.version(), "MSH 4.1 ASCII");
        assert_eq!(mesh.node_count(None).unwrap(), 4);
        assert_eq!(mesh.internal_regions().len(), 1);
        assert_eq!(mesh.boundary_regions().len(), 1);

        let internal = mesh.region(RegionClass::Internal, 0).unwrap();
        assert_eq!(internal.physical_id(), &PhysicalId::Number(1));
        assert_eq!(internal.node_count(), 4);
        assert_eq!(internal.blocks()[0].indices(), &[0, 1, 2, 3]);

        let boundary = mesh.region(RegionClass::Boundary, 0).unwrap();
        assert_eq!(boundary.physical_id(), &PhysicalId::Number(5));
        assert_eq!(boundary.node_count(), 3);
        assert_eq!(boundary.node_tags(), &[0, 1, 2]);
        let lines: Vec<&[usize]> = boundary.blocks()[0].elements().collect();
        assert_eq!(lines, vec![&[0, 1][..], &[1, 2][..]]);
    }

    #[test]
    fn wrong_closing_marker() {
        let src = unit_square_src().replacen("$EndNodes", "$EndElements", 1);

        match read_from(Cursor::new(src)) {
            Err(GmshError::MalformedSection { expected, found }) => {
                assert_eq!(expected, "$EndNodes");
                assert_eq!(found, "$EndElements");
            }
            other => panic!("expected a MalformedSection error, got {:?}", other),
        }
    }

    #[test]
    fn marker_error_message() {
        let src = unit_square_src().replacen("$EndMeshFormat", "$EndMeshFormatt", 1);
        let err = read_from(Cursor::new(src)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected <$EndMeshFormat>, got: <$EndMeshFormatt>"
        );
    }

    #[test]
    fn windows_line_endings() {
        let src = unit_square_src().replace('\n', "\r\n");
        let mesh = read_from(Cursor::new(src)).unwrap();
        assert_eq!(mesh.boundary_regions()[0].node_count(), 3);
    }

    #[test]
    fn unsupported_element_type() {
        // 4-node tetrahedron
        let src = unit_square_src().replacen("2 1 3 1\n", "2 1 4 1\n", 1);
        assert!(matches!(
            read_from(Cursor::new(src)),
            Err(GmshError::UnsupportedElementType(UnsupportedElementType(4)))
        ));
    }

    #[test]
    fn wrong_field_count() {
        let src = unit_square_src().replacen("3 1 2 3 4\n", "3 1 2 3\n", 1);
        match read_from(Cursor::new(src)) {
            Err(GmshError::MalformedLine {
                section, line_no, ..
            }) => {
                assert_eq!(section, "Elements");
                assert_eq!(line_no, 27);
            }
            other => panic!("expected a MalformedLine error, got {:?}", other),
        }
    }

    #[test]
    fn unparsable_coordinate() {
        let src = unit_square_src().replacen("1 1 0\n", "1 one 0\n", 1);
        assert!(matches!(
            read_from(Cursor::new(src)),
            Err(GmshError::MalformedLine { section: "Nodes", .. })
        ));
    }

    #[test]
    fn truncated_file() {
        let src: String = unit_square_src().lines().take(19).map(|l| format!("{}\n", l)).collect();
        assert!(matches!(
            read_from(Cursor::new(src)),
            Err(GmshError::UnexpectedEof { section: "Nodes" })
        ));
    }

    #[test]
    fn unknown_node_reference() {
        let src = unit_square_src().replacen("2 2 3\n", "2 2 7\n", 1);
        assert!(matches!(
            read_from(Cursor::new(src)),
            Err(GmshError::UnknownNode(7))
        ));
    }

    #[test]
    fn undeclared_entity() {
        let src = unit_square_src().replacen("1 1 1 2\n", "1 4 1 2\n", 1);
        assert!(matches!(
            read_from(Cursor::new(src)),
            Err(GmshError::UnknownEntity { dim: 1, tag: 4 })
        ));
    }

    #[test]
    fn binary_files_rejected() {
        let src = unit_square_src().replacen("4.1 0 8", "4.1 1 8", 1);
        assert!(matches!(
            read_from(Cursor::new(src)),
            Err(GmshError::UnsupportedFileType(1))
        ));
    }

    #[test]
    fn element_count_mismatch() {
        let src = unit_square_src().replacen("2 3 1 3\n", "2 4 1 3\n", 1);
        assert!(matches!(
            read_from(Cursor::new(src)),
            Err(GmshError::CountMismatch {
                section: "Elements",
                expected: 4,
                found: 3,
                ..
            })
        ));
    }

    #[test]
    fn missing_elements() {
        let src: String = unit_square_src()
            .split("$Elements")
            .next()
            .unwrap()
            .to_string();
        assert!(matches!(
            read_from(Cursor::new(src)),
            Err(GmshError::MissingSection("Elements"))
        ));
    }

    #[test]
    fn unterminated_unknown_section() {
        let src = format!("{}$Comments\nnever closed\n", unit_square_src());
        assert!(matches!(
            read_from(Cursor::new(src)),
            Err(GmshError::UnterminatedSection(name)) if name == "Comments"
        ));
    }

    #[test]
    fn unknown_section_closed_by_other_marker() {
        let src = unit_square_src().replacen("$Nodes", "$Foo\nbody\n$EndBar\n$Nodes", 1);
        match read_from(Cursor::new(src)) {
            Err(GmshError::MalformedSection { expected, found }) => {
                assert_eq!(expected, "$EndFoo");
                assert_eq!(found, "$EndBar");
            }
            other => panic!("expected a MalformedSection error, got {:?}", other),
        }

        let src = unit_square_src().replacen("$Nodes", "$Foo\nbody\n$EndFoo\n$Nodes", 1);
        assert!(read_from(Cursor::new(src)).is_ok());
    }

    #[test]
    fn section_openers_match_exactly() {
        let src = unit_square_src().replacen("$Nodes\n", "$Nodes \n", 1);
        assert!(matches!(
            read_from(Cursor::new(src)),
            Err(GmshError::MalformedSection { found, .. }) if found == "$EndNodes"
        ));
    }

    #[test]
    fn untagged_entity_is_not_merged_with_physical_group() {
        let src = unit_square_src()
            .replacen("0 1 1 0\n", "0 1 2 0\n", 1)
            .replacen(
                "1 0 0 0 1 1 0 1 1 1 1\n",
                "1 0 0 0 1 1 0 0 1 1\n2 0 0 0 1 1 0 1 1 1 1\n",
                1,
            )
            .replacen("2 3 1 3\n", "3 4 1 4\n", 1)
            .replacen("3 1 2 3 4\n", "3 1 2 3 4\n2 2 3 1\n4 1 2 3 4\n", 1);
        let mesh = read_from(Cursor::new(src)).unwrap();

        let internal = mesh.internal_regions();
        assert_eq!(internal.len(), 2);
        assert_eq!(internal[0].physical_id(), &PhysicalId::Entity { dim: 2, tag: 1 });
        assert_eq!(internal[1].physical_id(), &PhysicalId::Number(1));
        assert_eq!(internal[1].n_elements(), 1);
    }

    #[test]
    fn named_regions() {
        let mesh = read("./test_input/two_materials.msh").unwrap();

        assert_eq!(mesh.node_count(None).unwrap(), 6);
        assert_eq!(mesh.node_tags(), &[1, 2, 3, 10, 11, 12]);

        let names = |class| -> Vec<String> {
            mesh.regions(class)
                .iter()
                .map(|r| r.physical_id().to_string())
                .collect()
        };
        assert_eq!(names(RegionClass::Internal), ["left material", "right"]);
        assert_eq!(names(RegionClass::Boundary), ["walls", "inlet"]);

        assert_eq!(mesh.region_by_name("walls").unwrap(), (RegionClass::Boundary, 0));
        assert_eq!(mesh.region_by_name("right").unwrap(), (RegionClass::Internal, 1));
    }

    #[test]
    fn gapped_node_tags() {
        let mesh = read("./test_input/two_materials.msh").unwrap();

        let left = mesh.region(RegionClass::Internal, 0).unwrap();
        assert_eq!(left.blocks().len(), 2);
        assert_eq!(left.node_tags(), &[0, 1, 3, 4]);
        assert_eq!(left.blocks()[0].indices(), &[0, 1, 3]);
        assert_eq!(left.blocks()[1].indices(), &[0, 3, 2]);

        let right = mesh.region(RegionClass::Internal, 1).unwrap();
        assert_eq!(right.node_tags(), &[1, 2, 4, 5]);
        assert_eq!(right.blocks()[0].indices(), &[0, 1, 3, 0, 3, 2]);

        let walls = mesh.region(RegionClass::Boundary, 0).unwrap();
        assert_eq!(walls.node_tags(), &[0, 1, 2, 5]);
        assert_eq!(walls.blocks()[0].indices(), &[0, 1, 1, 2]);
        assert_eq!(walls.blocks()[1].indices(), &[2, 3]);

        let inlet_coords = mesh.region_node_coords(RegionClass::Boundary, 1).unwrap();
        assert_eq!(
            inlet_coords,
            vec![
                nalgebra::Point3::new(0.0, 0.0, 0.0),
                nalgebra::Point3::new(0.0, 1.0, 0.0)
            ]
        );
    }

    #[test]
    fn description_record() {
        let desc = read_description(Cursor::new(
            read_to_string("./test_input/two_materials.msh").unwrap(),
        ))
        .unwrap();

        assert_eq!(desc.version.as_deref(), Some("MSH 4.1 ASCII"));
        assert_eq!(desc.physical_names.len(), 4);
        assert_eq!(
            desc.physical_names.get(&(2, 1)).map(String::as_str),
            Some("left material")
        );
        assert_eq!(
            desc.entities.get(&(1, 3)),
            Some(&PhysicalId::Name("walls".to_string()))
        );
        // the point element block is dropped
        assert_eq!(desc.blocks.len(), 6);
        assert!(desc.blocks.iter().all(|b| b.table.dim() > 0));
    }

    #[test]
    fn reading_is_repeatable() {
        let a = read("./test_input/two_materials.msh").unwrap();
        let b = read("./test_input/two_materials.msh").unwrap();

        for class in [RegionClass::Internal, RegionClass::Boundary] {
            assert_eq!(a.regions(class).len(), b.regions(class).len());
            for (ra, rb) in a.regions(class).iter().zip(b.regions(class)) {
                assert_eq!(ra.physical_id(), rb.physical_id());
                assert_eq!(ra.node_count(), rb.node_count());
                assert_eq!(ra.blocks(), rb.blocks());
            }
        }
    }
}
