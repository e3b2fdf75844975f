use std::{collections::HashSet, fmt::Display, sync::Arc};

use crate::{
    element,
    error::{AnnulusError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
}

impl Vertex {
    pub fn new(x: f64, y: f64) -> Vertex {
        Vertex { x, y }
    }
}

/// A constant strain triangle. Node ids are expected in counter-clockwise order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element {
    pub nodes: [usize; 3],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Boundary {
    Inner,
    Outer,
    Left,
    Right,
}

impl Boundary {
    pub const ALL: [Boundary; 4] = [
        Boundary::Inner,
        Boundary::Outer,
        Boundary::Left,
        Boundary::Right,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Boundary::Inner => "inner",
            Boundary::Outer => "outer",
            Boundary::Left => "left",
            Boundary::Right => "right",
        }
    }

    pub fn from_name(name: &str) -> Option<Boundary> {
        Boundary::ALL.into_iter().find(|b| b.name() == name)
    }
}

impl Display for Boundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// The four node polylines that bound the annulus quarter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Boundaries {
    pub inner: Vec<usize>,
    pub outer: Vec<usize>,
    pub left: Vec<usize>,
    pub right: Vec<usize>,
}

impl Boundaries {
    pub fn get(&self, boundary: Boundary) -> &[usize] {
        match boundary {
            Boundary::Inner => &self.inner,
            Boundary::Outer => &self.outer,
            Boundary::Left => &self.left,
            Boundary::Right => &self.right,
        }
    }

    pub fn get_mut(&mut self, boundary: Boundary) -> &mut Vec<usize> {
        match boundary {
            Boundary::Inner => &mut self.inner,
            Boundary::Outer => &mut self.outer,
            Boundary::Left => &mut self.left,
            Boundary::Right => &mut self.right,
        }
    }
}

/// Nodes, triangles and labeled boundaries. Read-only once built.
#[derive(Debug, Clone)]
pub struct Mesh {
    pub nodes: Vec<Vertex>,
    pub elements: Vec<Element>,
    pub boundaries: Boundaries,
}

impl Mesh {
    /// Builds a mesh after checking its topology
    ///
    /// # Arguments
    /// * `nodes` - Node coordinates; the index of a node is its id
    /// * `elements` - Triangles referencing node ids
    /// * `boundaries` - Boundary polylines referencing node ids
    ///
    /// # Returns
    /// The mesh, or a topology error naming the first offending element,
    /// node or boundary
    pub fn new(nodes: Vec<Vertex>, elements: Vec<Element>, boundaries: Boundaries) -> Result<Mesh> {
        let node_count = nodes.len();

        for (id, element) in elements.iter().enumerate() {
            if let Some(n) = element.nodes.iter().find(|n| **n >= node_count) {
                return Err(AnnulusError::Topology(format!(
                    "Element {id} references node {n}, but the mesh only has {node_count} nodes"
                )));
            }
            let [a, b, c] = element.nodes.map(|n| &nodes[n]);
            element::checked_area(id, a, b, c)?;
        }

        let mut edges: HashSet<(usize, usize)> = HashSet::with_capacity(3 * elements.len());
        for element in &elements {
            let [n0, n1, n2] = element.nodes;
            for (i, j) in [(n0, n1), (n1, n2), (n2, n0)] {
                edges.insert((i.min(j), i.max(j)));
            }
        }

        for boundary in Boundary::ALL {
            let polyline = boundaries.get(boundary);
            if let Some(n) = polyline.iter().find(|n| **n >= node_count) {
                return Err(AnnulusError::Topology(format!(
                    "Boundary '{boundary}' references node {n}, but the mesh only has {node_count} nodes"
                )));
            }
            for pair in polyline.windows(2) {
                let (i, j) = (pair[0], pair[1]);
                if !edges.contains(&(i.min(j), i.max(j))) {
                    return Err(AnnulusError::Topology(format!(
                        "Boundary '{boundary}' is not connected: nodes {i} and {j} do not share an element edge"
                    )));
                }
            }
        }

        Ok(Mesh {
            nodes,
            elements,
            boundaries,
        })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Ordered node coordinates, the export contract for external writers
    pub fn vertices(&self) -> &[Vertex] {
        &self.nodes
    }

    /// The three corner vertices of an element
    pub fn triangle(&self, element: &Element) -> [&Vertex; 3] {
        element.nodes.map(|n| &self.nodes[n])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    Strain,
    Stress,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub youngs_modulus: f64,
    pub poisson_ratio: f64,
    pub plane: Plane,
}

impl Material {
    /// A plane strain material
    pub fn new(youngs_modulus: f64, poisson_ratio: f64) -> Material {
        Material {
            youngs_modulus,
            poisson_ratio,
            plane: Plane::Strain,
        }
    }

    pub fn plane_stress(youngs_modulus: f64, poisson_ratio: f64) -> Material {
        Material {
            youngs_modulus,
            poisson_ratio,
            plane: Plane::Stress,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.youngs_modulus.is_finite() || self.youngs_modulus <= 0.0 {
            return Err(AnnulusError::Input(format!(
                "material.E must be positive, got {}",
                self.youngs_modulus
            )));
        }

        let upper = match self.plane {
            Plane::Strain => 0.5,
            Plane::Stress => 1.0,
        };
        if !(self.poisson_ratio > -1.0 && self.poisson_ratio < upper) {
            return Err(AnnulusError::Input(format!(
                "material.Nu must lie in (-1, {upper}) for plane {:?}, got {}",
                self.plane, self.poisson_ratio
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    /// Offset of this axis inside a node's pair of degrees of freedom
    pub fn offset(&self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryCondition {
    /// Pressure distributed along a node polyline as normal traction
    Neumann { nodes: Vec<usize>, pressure: f64 },
    /// Prescribed displacement along one axis for a set of nodes
    Dirichlet {
        nodes: Vec<usize>,
        axis: Axis,
        value: f64,
    },
}

#[derive(Debug, Clone)]
pub struct Task {
    pub mesh: Arc<Mesh>,
    pub material: Material,
    pub boundary_conditions: Vec<BoundaryCondition>,
}
