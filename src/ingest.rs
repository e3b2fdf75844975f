//! Conversion of pre-decoded mesh tables into solver meshes.
//!
//! Structured mesh readers hand over tables keyed by their own ids. Only planar
//! triangles reach the solver: lower dimensional entities are dropped, planar
//! quadrilaterals are split and everything else is rejected.

use std::collections::{BTreeMap, HashMap};

use crate::{
    datatypes::{Boundaries, Boundary, Element, Mesh, Vertex},
    element::compute_area,
    error::{AnnulusError, Result},
};

/// Out-of-plane coordinates below this magnitude count as planar
pub const PLANAR_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Vertex,
    Line2,
    Triangle3,
    Triangle6,
    Quad4,
    Tetra4,
    Hexa8,
}

impl ElementKind {
    fn dimension(&self) -> usize {
        match self {
            ElementKind::Vertex => 0,
            ElementKind::Line2 => 1,
            ElementKind::Triangle3 | ElementKind::Triangle6 | ElementKind::Quad4 => 2,
            ElementKind::Tetra4 | ElementKind::Hexa8 => 3,
        }
    }

    fn node_count(&self) -> usize {
        match self {
            ElementKind::Vertex => 1,
            ElementKind::Line2 => 2,
            ElementKind::Triangle3 => 3,
            ElementKind::Triangle6 => 6,
            ElementKind::Quad4 | ElementKind::Tetra4 => 4,
            ElementKind::Hexa8 => 8,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementRecord {
    pub nodes: Vec<i64>,
    pub kind: ElementKind,
    pub block: i32,
}

/// Decoded node, element and node-set tables, keyed by external ids
#[derive(Debug, Clone, Default)]
pub struct MeshTable {
    pub nodes: BTreeMap<i64, [f64; 3]>,
    pub elements: BTreeMap<i64, ElementRecord>,
    /// Named node polylines; "inner", "outer", "left" and "right" become mesh
    /// boundaries
    pub node_sets: BTreeMap<String, Vec<i64>>,
}

impl MeshTable {
    /// Renumbers the table densely and converts it into a triangle mesh
    ///
    /// Node ids are assigned in ascending external id order. Clockwise
    /// triangles are reoriented.
    pub fn into_mesh(self) -> Result<Mesh> {
        let mut index_replace: HashMap<i64, usize> = HashMap::with_capacity(self.nodes.len());
        let mut nodes: Vec<Vertex> = Vec::with_capacity(self.nodes.len());

        for (id, [x, y, z]) in &self.nodes {
            if z.abs() > PLANAR_TOLERANCE {
                return Err(AnnulusError::Topology(format!(
                    "Node {id} is out of plane (z = {z})"
                )));
            }
            index_replace.insert(*id, nodes.len());
            nodes.push(Vertex::new(*x, *y));
        }

        let mut elements: Vec<Element> = Vec::with_capacity(self.elements.len());
        let mut skipped: usize = 0;

        for (id, record) in &self.elements {
            if record.nodes.len() != record.kind.node_count() {
                return Err(AnnulusError::Topology(format!(
                    "Element {id} of type {:?} has {} nodes, expected {}",
                    record.kind,
                    record.nodes.len(),
                    record.kind.node_count()
                )));
            }

            if record.kind.dimension() < 2 {
                skipped += 1;
                continue;
            }

            let local: Vec<usize> = record
                .nodes
                .iter()
                .map(|n| {
                    index_replace.get(n).copied().ok_or_else(|| {
                        AnnulusError::Topology(format!(
                            "Element {id} references unknown node {n}"
                        ))
                    })
                })
                .collect::<Result<_>>()?;

            match record.kind {
                ElementKind::Triangle3 => {
                    elements.push(oriented(&nodes, [local[0], local[1], local[2]]));
                }
                ElementKind::Quad4 => {
                    elements.push(oriented(&nodes, [local[0], local[1], local[2]]));
                    elements.push(oriented(&nodes, [local[0], local[2], local[3]]));
                }
                kind => {
                    return Err(AnnulusError::Topology(format!(
                        "Element {id} in block {} has unsupported type {kind:?}; only planar 3-node triangles are solved",
                        record.block
                    )));
                }
            }
        }

        if skipped > 0 {
            log::warn!("skipped {skipped} lower dimensional entities while ingesting mesh");
        }

        let mut boundaries = Boundaries::default();
        for (name, set) in &self.node_sets {
            let Some(boundary) = Boundary::from_name(name) else {
                log::warn!("ignoring node set '{name}'");
                continue;
            };

            let polyline = boundaries.get_mut(boundary);
            for n in set {
                match index_replace.get(n) {
                    Some(local) => polyline.push(*local),
                    None => {
                        return Err(AnnulusError::Topology(format!(
                            "Node set '{name}' references unknown node {n}"
                        )))
                    }
                }
            }
        }

        log::info!(
            "ingested {} nodes and {} triangles",
            nodes.len(),
            elements.len()
        );

        Mesh::new(nodes, elements, boundaries)
    }
}

fn oriented(nodes: &[Vertex], [a, b, c]: [usize; 3]) -> Element {
    if compute_area(&nodes[a], &nodes[b], &nodes[c]) < 0.0 {
        Element { nodes: [a, c, b] }
    } else {
        Element { nodes: [a, b, c] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square_table() -> MeshTable {
        let mut table = MeshTable::default();
        table.nodes.insert(40, [1.0, 1.0, 0.0]);
        table.nodes.insert(10, [0.0, 0.0, 0.0]);
        table.nodes.insert(20, [1.0, 0.0, 0.0]);
        table.nodes.insert(50, [0.0, 1.0, 0.0]);
        table
    }

    #[test]
    fn renumbers_and_splits_quads() {
        let mut table = unit_square_table();
        table.elements.insert(
            7,
            ElementRecord {
                nodes: vec![10, 20, 40, 50],
                kind: ElementKind::Quad4,
                block: 1,
            },
        );
        table.elements.insert(
            8,
            ElementRecord {
                nodes: vec![10, 20],
                kind: ElementKind::Line2,
                block: 2,
            },
        );
        table
            .node_sets
            .insert("right".to_owned(), vec![10, 20]);

        let mesh = table.into_mesh().unwrap();

        // ascending external ids: 10, 20, 40, 50
        assert_eq!(mesh.nodes[0], Vertex::new(0.0, 0.0));
        assert_eq!(mesh.nodes[2], Vertex::new(1.0, 1.0));
        assert_eq!(
            mesh.elements,
            vec![Element { nodes: [0, 1, 2] }, Element { nodes: [0, 2, 3] }]
        );
        assert_eq!(mesh.boundaries.right, vec![0, 1]);
    }

    #[test]
    fn reorients_clockwise_triangles() {
        let mut table = unit_square_table();
        table.elements.insert(
            1,
            ElementRecord {
                nodes: vec![10, 40, 20],
                kind: ElementKind::Triangle3,
                block: 1,
            },
        );

        let mesh = table.into_mesh().unwrap();
        let [a, b, c] = mesh.triangle(&mesh.elements[0]);
        assert!(compute_area(a, b, c) > 0.0);
    }

    #[test]
    fn rejects_unsupported_types() {
        let mut table = unit_square_table();
        table.nodes.insert(60, [0.0, 0.0, 1.0]);
        table.elements.insert(
            3,
            ElementRecord {
                nodes: vec![10, 20, 50, 60],
                kind: ElementKind::Tetra4,
                block: 4,
            },
        );

        // the out-of-plane node is reported before the element
        let err = table.clone().into_mesh().unwrap_err();
        assert!(matches!(err, AnnulusError::Topology(msg) if msg.contains("Node 60")));

        table.nodes.insert(60, [0.5, 0.5, 0.0]);
        let err = table.into_mesh().unwrap_err();
        assert!(matches!(err, AnnulusError::Topology(msg) if msg.contains("Element 3")));
    }

    #[test]
    fn rejects_unknown_nodes() {
        let mut table = unit_square_table();
        table.elements.insert(
            9,
            ElementRecord {
                nodes: vec![10, 20, 99],
                kind: ElementKind::Triangle3,
                block: 1,
            },
        );

        let err = table.into_mesh().unwrap_err();
        assert!(matches!(err, AnnulusError::Topology(msg) if msg.contains("unknown node 99")));
    }
}
