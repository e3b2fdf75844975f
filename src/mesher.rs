use std::{f64::consts::PI, sync::Arc};

use crate::{
    config::{BoundaryLoads, Geometry, MeshConfig},
    datatypes::{Axis, Boundaries, Boundary, BoundaryCondition, Element, Material, Mesh, Task, Vertex},
    error::{AnnulusError, Result},
};

/// Largest mesh `build_mesh` will generate, in nodes
pub const MAX_NODES: usize = 10_000_000;

/// Maps a polar coordinate to a cartesian vertex
///
/// # Arguments
/// * `radius` - Distance from the origin
/// * `fraction` - Angle as a fraction of a quarter turn, in [0, 1]
fn polar_to_cartesian(radius: f64, fraction: f64) -> Vertex {
    let angle = fraction * PI / 2.0;
    Vertex {
        x: radius * angle.cos(),
        y: radius * angle.sin(),
    }
}

/// Number of radial layers needed to keep elements roughly square
fn radial_layer_count(geometry: &Geometry, resolution: usize) -> Result<usize> {
    let span = geometry.radius_max - geometry.radius_min;
    let layers = (2.0 * resolution as f64 / PI * span / geometry.radius_min).floor();

    if !(layers < MAX_NODES as f64) {
        return Err(AnnulusError::Input(format!(
            "geometry.radius_min {} is too small for radius_max {} at resolution {resolution}: \
             the mesh would need {layers} radial layers",
            geometry.radius_min, geometry.radius_max
        )));
    }

    Ok(layers as usize + 1)
}

/// Total node count of a mesh with `layers + 1` layers, if it fits in usize
fn checked_node_count(resolution: usize, layers: usize) -> Option<usize> {
    resolution
        .checked_mul(2)?
        .checked_add(layers + 2)?
        .checked_mul(layers + 1)
        .map(|n| n / 2)
}

/// Id of the first node of a radial layer
fn layer_offset(resolution: usize, layer: usize) -> usize {
    (2 * resolution + layer + 1) * layer / 2
}

/// Builds a quarter-annulus mesh of constant strain triangles
///
/// Layer `r` holds `resolution + r + 1` nodes spread evenly over a quarter
/// turn. Node ids follow insertion order, which the triangulation depends on.
///
/// # Arguments
/// * `geometry` - Inner and outer radius
/// * `mesh_config` - Angular resolution of the inner layer
///
/// # Returns
/// The mesh with its inner, outer, left and right boundaries tagged
pub fn build_mesh(geometry: &Geometry, mesh_config: &MeshConfig) -> Result<Mesh> {
    geometry.validate()?;

    let resolution = mesh_config.resolution;
    if resolution == 0 {
        return Err(AnnulusError::Input(
            "mesh.resolution must be positive".to_owned(),
        ));
    }

    let layers = radial_layer_count(geometry, resolution)?;
    let delta = (geometry.radius_max - geometry.radius_min) / layers as f64;

    let node_count = match checked_node_count(resolution, layers) {
        Some(n) if n <= MAX_NODES => n,
        _ => {
            return Err(AnnulusError::Input(format!(
                "mesh.resolution {resolution} with {} radial layers exceeds the limit of {MAX_NODES} nodes",
                layers + 1
            )))
        }
    };
    let mut nodes: Vec<Vertex> = Vec::with_capacity(node_count);
    let mut boundaries = Boundaries::default();

    for r in 0..=layers {
        let radius = if r == layers {
            geometry.radius_max
        } else {
            geometry.radius_min + delta * r as f64
        };
        let divisions = resolution + r;

        for f in 0..=divisions {
            let node_index = nodes.len();
            nodes.push(polar_to_cartesian(radius, f as f64 / divisions as f64));

            if r == 0 {
                boundaries.inner.push(node_index);
            }
            if f == 0 {
                boundaries.right.push(node_index);
            }
            if r == layers {
                boundaries.outer.push(node_index);
            }
            if f == divisions {
                boundaries.left.push(node_index);
            }
        }
    }

    // walk the inner boundary clockwise so its edge normals face the material
    boundaries.inner.reverse();

    let mut elements: Vec<Element> = Vec::with_capacity(2 * layers * resolution + layers * layers);
    for r in 0..=layers {
        for f in 0..(resolution + r) {
            let a = layer_offset(resolution, r) + f;
            let b = a + 1;

            if r != 0 {
                let c = layer_offset(resolution, r - 1) + f;
                elements.push(Element { nodes: [a, b, c] });
            }
            if r != layers {
                let c = layer_offset(resolution, r + 1) + f + 1;
                elements.push(Element { nodes: [a, c, b] });
            }
        }
    }

    log::info!(
        "built annulus mesh: {} radial layers, {} nodes, {} elements",
        layers + 1,
        nodes.len(),
        elements.len()
    );

    Mesh::new(nodes, elements, boundaries)
}

fn required_boundary(mesh: &Mesh, boundary: Boundary) -> Result<Vec<usize>> {
    let nodes = mesh.boundaries.get(boundary);
    if nodes.is_empty() {
        return Err(AnnulusError::Input(format!(
            "Mesh is missing the '{boundary}' boundary"
        )));
    }

    Ok(nodes.to_vec())
}

/// Combines a mesh, a material and the boundary pressures into a solver task
///
/// The inner and outer boundaries carry pressure. The right boundary (y = 0)
/// is fixed in y and the left boundary (x = 0) in x, which is the symmetry
/// condition of the quarter and removes the rigid body motions.
///
/// # Arguments
/// * `mesh` - The shared mesh
/// * `material` - The material of the annulus
/// * `loads` - Inner and outer pressure
pub fn assemble_task(mesh: Arc<Mesh>, material: Material, loads: &BoundaryLoads) -> Result<Task> {
    material.validate()?;

    let boundary_conditions = vec![
        BoundaryCondition::Neumann {
            nodes: required_boundary(&mesh, Boundary::Inner)?,
            pressure: loads.pressure_inner,
        },
        BoundaryCondition::Dirichlet {
            nodes: required_boundary(&mesh, Boundary::Right)?,
            axis: Axis::Y,
            value: 0.0,
        },
        BoundaryCondition::Neumann {
            nodes: required_boundary(&mesh, Boundary::Outer)?,
            pressure: loads.pressure_outer,
        },
        BoundaryCondition::Dirichlet {
            nodes: required_boundary(&mesh, Boundary::Left)?,
            axis: Axis::X,
            value: 0.0,
        },
    ];

    log::debug!(
        "assembled task with {} boundary conditions",
        boundary_conditions.len()
    );

    Ok(Task {
        mesh,
        material,
        boundary_conditions,
    })
}
