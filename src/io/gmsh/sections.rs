use super::{parse_fields, GmshError, LineCursor, MeshDescription, SUPPORTED_VERSION};
use crate::elements::{self, connectivity::ConnectivityTable};
use crate::mesh::region::{PhysicalId, TaggedBlock};

use log::{debug, trace, warn};
use nalgebra::Point3;
use smallvec::SmallVec;
use std::io::BufRead;

// Each reader is entered just after its `$<Section>` line and consumes its `$End<Section>` line

/// `$MeshFormat`: `version file-type data-size`
///
/// Produces `desc.version`
pub(super) fn read_mesh_format<R: BufRead>(
    cursor: &mut LineCursor<R>,
    desc: &mut MeshDescription,
) -> Result<(), GmshError> {
    const SECTION: &str = "MeshFormat";

    let line = cursor.expect_line(SECTION)?;
    let mut fields = line.split_whitespace();
    let version = fields
        .next()
        .ok_or_else(|| cursor.malformed(SECTION, &line))?;

    if let Some(file_type) = fields.next() {
        match file_type.parse::<i32>() {
            Ok(0) => (),
            Ok(file_type) => return Err(GmshError::UnsupportedFileType(file_type)),
            Err(_) => return Err(cursor.malformed(SECTION, &line)),
        }
    }

    if version != SUPPORTED_VERSION {
        warn!(
            "mesh file declares MSH version {}; only version {} is fully supported",
            version, SUPPORTED_VERSION
        );
    }
    desc.version = Some(format!("MSH {} ASCII", version));

    cursor.expect_end(SECTION)
}

/// `$PhysicalNames`: a count, followed by one `dimension tag "name"` line per physical group
///
/// Produces `desc.physical_names`
pub(super) fn read_physical_names<R: BufRead>(
    cursor: &mut LineCursor<R>,
    desc: &mut MeshDescription,
) -> Result<(), GmshError> {
    const SECTION: &str = "PhysicalNames";

    let [n_names] = cursor.expect_fields::<usize, 1>(SECTION)?;

    for _ in 0..n_names {
        let line = cursor.expect_line(SECTION)?;
        let (dim, tag, name) =
            parse_physical_name(&line).ok_or_else(|| cursor.malformed(SECTION, &line))?;

        trace!("physical group {} (dim {}) is named '{}'", tag, dim, name);
        desc.physical_names.insert((dim, tag), name.to_string());
    }

    cursor.expect_end(SECTION)
}

// names are quoted and may contain whitespace
fn parse_physical_name(line: &str) -> Option<(usize, i64, &str)> {
    let mut fields = line.split_whitespace();
    let dim = fields.next()?.parse().ok()?;
    let tag = fields.next()?.parse().ok()?;

    let start = line.find('"')?;
    let end = line.rfind('"')?;
    if end > start {
        Some((dim, tag, &line[start + 1..end]))
    } else {
        None
    }
}

/// `$Entities`: entity counts, followed by one line per point, curve, surface and volume
///
/// Consumes `desc.physical_names`. Produces `desc.entities`
pub(super) fn read_entities<R: BufRead>(
    cursor: &mut LineCursor<R>,
    desc: &mut MeshDescription,
) -> Result<(), GmshError> {
    const SECTION: &str = "Entities";

    let [n_points, n_curves, n_surfaces, n_volumes] =
        cursor.expect_fields::<usize, 4>(SECTION)?;

    // point elements are never kept, so their entities are not needed
    for _ in 0..n_points {
        cursor.expect_line(SECTION)?;
    }

    for (dim, count) in [(1, n_curves), (2, n_surfaces), (3, n_volumes)] {
        for _ in 0..count {
            let line = cursor.expect_line(SECTION)?;
            let (tag, physical_tag) =
                parse_entity(&line).ok_or_else(|| cursor.malformed(SECTION, &line))?;

            let physical_id = match physical_tag {
                Some(physical_tag) => PhysicalId::resolve(
                    physical_tag,
                    desc.physical_names.get(&(dim, physical_tag)),
                ),
                None => {
                    debug!(
                        "entity {} (dim {}) has no physical group; grouping it on its own",
                        tag, dim
                    );
                    PhysicalId::Entity { dim, tag }
                }
            };

            desc.entities.insert((dim, tag), physical_id);
        }
    }

    cursor.expect_end(SECTION)
}

// `tag minX minY minZ maxX maxY maxZ numPhysicalTags physicalTag... numBounding boundingTag...`
fn parse_entity(line: &str) -> Option<(i64, Option<i64>)> {
    let fields: SmallVec<[&str; 16]> = line.split_whitespace().collect();
    if fields.len() < 8 || fields[1..7].iter().any(|f| f.parse::<f64>().is_err()) {
        return None;
    }

    let tag = fields[0].parse().ok()?;
    let n_physical: usize = fields[7].parse().ok()?;
    let physical_tag = match n_physical {
        0 => None,
        _ => Some(fields.get(8)?.parse().ok()?),
    };

    Some((tag, physical_tag))
}

/// `$Nodes`: a header, followed by entity blocks of node tags and node coordinates
///
/// Produces `desc.nodes`, `desc.node_tags` and `desc.node_rows`
pub(super) fn read_nodes<R: BufRead>(
    cursor: &mut LineCursor<R>,
    desc: &mut MeshDescription,
) -> Result<(), GmshError> {
    const SECTION: &str = "Nodes";

    let [n_blocks, n_nodes, _min_tag, _max_tag] = cursor.expect_fields::<usize, 4>(SECTION)?;
    desc.nodes.reserve(n_nodes);
    desc.node_tags.reserve(n_nodes);
    let n_read_before = desc.nodes.len();

    for _ in 0..n_blocks {
        let [entity_dim, entity_tag, _parametric, n_block_nodes] =
            cursor.expect_fields::<usize, 4>(SECTION)?;
        trace!(
            "node block: entity {} (dim {}) with {} nodes",
            entity_tag,
            entity_dim,
            n_block_nodes
        );

        let first_row = desc.nodes.len();
        for _ in 0..n_block_nodes {
            let [tag] = cursor.expect_fields::<usize, 1>(SECTION)?;
            desc.node_tags.push(tag);
        }

        for _ in 0..n_block_nodes {
            // parametric nodes carry extra coordinates after x, y, z
            let line = cursor.expect_line(SECTION)?;
            let coords: SmallVec<[f64; 8]> =
                parse_fields(&line).ok_or_else(|| cursor.malformed(SECTION, &line))?;
            if coords.len() < 3 {
                return Err(cursor.malformed(SECTION, &line));
            }
            desc.nodes.push(Point3::new(coords[0], coords[1], coords[2]));
        }

        for (row, tag) in desc.node_tags.iter().enumerate().skip(first_row) {
            if desc.node_rows.insert(*tag, row).is_some() {
                warn!("node tag {} is declared more than once; later declarations win", tag);
            }
        }
    }

    let found = desc.nodes.len() - n_read_before;
    if found != n_nodes {
        return Err(GmshError::CountMismatch {
            section: SECTION,
            item: "nodes",
            expected: n_nodes,
            found,
        });
    }

    cursor.expect_end(SECTION)
}

/// `$Elements`: a header, followed by entity blocks of `tag node-tags...` lines
///
/// Consumes `desc.entities` and `desc.node_rows`. Produces `desc.blocks`
pub(super) fn read_elements<R: BufRead>(
    cursor: &mut LineCursor<R>,
    desc: &mut MeshDescription,
) -> Result<(), GmshError> {
    const SECTION: &str = "Elements";

    let [n_blocks, n_elements, _min_tag, _max_tag] = cursor.expect_fields::<usize, 4>(SECTION)?;
    let mut found = 0;

    for _ in 0..n_blocks {
        let header = cursor.expect_line(SECTION)?;
        let (entity_dim, entity_tag, type_code, n_block_elements) =
            parse_element_block_header(&header).ok_or_else(|| cursor.malformed(SECTION, &header))?;
        found += n_block_elements;

        if entity_dim == 0 {
            warn!(
                "skipping {} point elements on entity {}",
                n_block_elements, entity_tag
            );
            for _ in 0..n_block_elements {
                cursor.expect_line(SECTION)?;
            }
            continue;
        }

        let info = elements::describe(type_code)?;
        if info.dim != entity_dim {
            return Err(cursor.malformed(SECTION, &header));
        }

        let physical_id = desc
            .entities
            .get(&(entity_dim, entity_tag))
            .cloned()
            .ok_or(GmshError::UnknownEntity {
                dim: entity_dim,
                tag: entity_tag,
            })?;

        trace!(
            "element block: {} {} elements on entity {} ({})",
            n_block_elements,
            info.elem_type,
            entity_tag,
            physical_id
        );

        let mut table = ConnectivityTable::with_capacity(info.elem_type, n_block_elements);
        for _ in 0..n_block_elements {
            let fields = cursor.expect_n_fields::<usize>(SECTION, info.node_count + 1)?;

            // skip the element tag
            let rows = fields[1..]
                .iter()
                .map(|tag| desc.node_rows.get(tag).copied().ok_or(GmshError::UnknownNode(*tag)))
                .collect::<Result<SmallVec<[usize; 4]>, GmshError>>()?;

            table.push_element(&rows);
        }

        desc.blocks.push(TaggedBlock { physical_id, table });
    }

    if found != n_elements {
        return Err(GmshError::CountMismatch {
            section: SECTION,
            item: "elements",
            expected: n_elements,
            found,
        });
    }

    cursor.expect_end(SECTION)
}

// `entityDim entityTag elementType numElementsInBlock`
fn parse_element_block_header(line: &str) -> Option<(usize, i64, i32, usize)> {
    let mut fields = line.split_whitespace();
    let header = (
        fields.next()?.parse().ok()?,
        fields.next()?.parse().ok()?,
        fields.next()?.parse().ok()?,
        fields.next()?.parse().ok()?,
    );
    match fields.next() {
        None => Some(header),
        Some(_) => None,
    }
}
