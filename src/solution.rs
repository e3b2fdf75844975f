//! Point queries against a solved displacement field.
//!
//! A query finds the element containing the point, interpolates the nodal
//! displacements with the element's shape functions and recovers the constant
//! strain and stress of that element. Points outside the mesh yield
//! [`FieldValue::zero`].

use std::sync::Arc;

use nalgebra::{SMatrix, Vector2, Vector3};

use crate::{
    datatypes::{Element, Material, Mesh},
    element::{
        compute_area, compute_strain_displacement_matrix, compute_stress_strain_matrix,
        ShapeFunctions, CONTAINMENT_TOLERANCE,
    },
};

/// Displacement (ux, uy), strain (exx, eyy, gxy) and stress (sxx, syy, txy)
/// at a point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldValue {
    pub displacement: Vector2<f64>,
    pub strain: Vector3<f64>,
    pub stress: Vector3<f64>,
}

impl FieldValue {
    /// The value reported for points outside every element
    pub fn zero() -> FieldValue {
        FieldValue {
            displacement: Vector2::zeros(),
            strain: Vector3::zeros(),
            stress: Vector3::zeros(),
        }
    }
}

/// Finds the element that contains a point
///
/// Implementations must return the lowest element index whose barycentric
/// weights at the point are all non-negative (up to
/// [`CONTAINMENT_TOLERANCE`]), together with those weights.
pub trait PointLocator {
    fn locate(&self, mesh: &Mesh, x: f64, y: f64) -> Option<(usize, Vector3<f64>)>;
}

/// Tests every element in order
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearScan;

impl PointLocator for LinearScan {
    fn locate(&self, mesh: &Mesh, x: f64, y: f64) -> Option<(usize, Vector3<f64>)> {
        mesh.elements.iter().enumerate().find_map(|(id, element)| {
            inside(mesh, element, x, y).map(|weights| (id, weights))
        })
    }
}

fn inside(mesh: &Mesh, element: &Element, x: f64, y: f64) -> Option<Vector3<f64>> {
    let [a, b, c] = mesh.triangle(element);
    ShapeFunctions::new(a, b, c).weights_inside(x, y)
}

/// Uniform bucket grid over element bounding boxes
///
/// Each cell lists, in ascending order, the elements whose bounding box
/// overlaps it, so candidates are tested in the same order as [`LinearScan`].
#[derive(Debug, Clone)]
pub struct GridLocator {
    x_min: f64,
    y_min: f64,
    cell_size: f64,
    columns: usize,
    rows: usize,
    cells: Vec<Vec<usize>>,
}

impl GridLocator {
    pub fn new(mesh: &Mesh) -> GridLocator {
        let (mut x_min, mut y_min) = (f64::INFINITY, f64::INFINITY);
        let (mut x_max, mut y_max) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for vertex in &mesh.nodes {
            x_min = x_min.min(vertex.x);
            y_min = y_min.min(vertex.y);
            x_max = x_max.max(vertex.x);
            y_max = y_max.max(vertex.y);
        }

        if mesh.elements.is_empty() || !(x_max > x_min && y_max > y_min) {
            return GridLocator {
                x_min: 0.0,
                y_min: 0.0,
                cell_size: 1.0,
                columns: 0,
                rows: 0,
                cells: Vec::new(),
            };
        }

        // about one element per cell
        let extent = (x_max - x_min).max(y_max - y_min);
        let cell_size = ((x_max - x_min) * (y_max - y_min) / mesh.elements.len() as f64)
            .sqrt()
            .max(extent * 1e-6);
        let columns = ((x_max - x_min) / cell_size).ceil().max(1.0) as usize;
        let rows = ((y_max - y_min) / cell_size).ceil().max(1.0) as usize;

        let mut locator = GridLocator {
            x_min,
            y_min,
            cell_size,
            columns,
            rows,
            cells: vec![Vec::new(); columns * rows],
        };

        // covers points accepted within the containment tolerance
        let pad = extent * CONTAINMENT_TOLERANCE * 1e3;
        for (id, element) in mesh.elements.iter().enumerate() {
            let [a, b, c] = mesh.triangle(element);
            let (lo_x, hi_x) = (a.x.min(b.x).min(c.x) - pad, a.x.max(b.x).max(c.x) + pad);
            let (lo_y, hi_y) = (a.y.min(b.y).min(c.y) - pad, a.y.max(b.y).max(c.y) + pad);

            for row in locator.row_of(lo_y)..=locator.row_of(hi_y) {
                for col in locator.column_of(lo_x)..=locator.column_of(hi_x) {
                    locator.cells[row * columns + col].push(id);
                }
            }
        }

        locator
    }

    fn column_of(&self, x: f64) -> usize {
        let col = ((x - self.x_min) / self.cell_size).floor().max(0.0) as usize;
        col.min(self.columns - 1)
    }

    fn row_of(&self, y: f64) -> usize {
        let row = ((y - self.y_min) / self.cell_size).floor().max(0.0) as usize;
        row.min(self.rows - 1)
    }
}

impl PointLocator for GridLocator {
    fn locate(&self, mesh: &Mesh, x: f64, y: f64) -> Option<(usize, Vector3<f64>)> {
        if self.cells.is_empty() || !x.is_finite() || !y.is_finite() {
            return None;
        }

        // ids past the end only occur when the grid was built for another mesh
        let cell = &self.cells[self.row_of(y) * self.columns + self.column_of(x)];
        cell.iter().find_map(|id| {
            let element = mesh.elements.get(*id)?;
            inside(mesh, element, x, y).map(|weights| (*id, weights))
        })
    }
}

/// A solved displacement field over a mesh
#[derive(Debug, Clone)]
pub struct Solution<L: PointLocator = LinearScan> {
    mesh: Arc<Mesh>,
    displacements: Vec<Vector2<f64>>,
    material: Material,
    locator: L,
}

impl Solution<LinearScan> {
    /// # Arguments
    /// * `mesh` - The solved mesh
    /// * `displacements` - One displacement per node, indexed by node id
    /// * `material` - The material used to recover stress
    pub fn new(mesh: Arc<Mesh>, displacements: Vec<Vector2<f64>>, material: Material) -> Self {
        debug_assert_eq!(mesh.node_count(), displacements.len());
        Solution {
            mesh,
            displacements,
            material,
            locator: LinearScan,
        }
    }
}

impl<L: PointLocator> Solution<L> {
    /// Replaces the point locator, keeping the field untouched
    pub fn with_locator<M: PointLocator>(self, locator: M) -> Solution<M> {
        Solution {
            mesh: self.mesh,
            displacements: self.displacements,
            material: self.material,
            locator,
        }
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn node_count(&self) -> usize {
        self.mesh.node_count()
    }

    pub fn displacements(&self) -> &[Vector2<f64>] {
        &self.displacements
    }

    pub fn nodal_displacement(&self, node: usize) -> Vector2<f64> {
        self.displacements[node]
    }

    /// Evaluates displacement, strain and stress at a point
    ///
    /// # Returns
    /// The field of the first element containing the point, or
    /// [`FieldValue::zero`] when no element does
    pub fn query(&self, x: f64, y: f64) -> FieldValue {
        match self.locator.locate(&self.mesh, x, y) {
            Some((id, weights)) => self.evaluate(id, weights),
            None => FieldValue::zero(),
        }
    }

    /// Evaluates the field at the centroid of an element
    pub fn element_field(&self, element: usize) -> FieldValue {
        self.evaluate(element, Vector3::repeat(1.0 / 3.0))
    }

    fn evaluate(&self, element: usize, weights: Vector3<f64>) -> FieldValue {
        let element = &self.mesh.elements[element];
        let [a, b, c] = self.mesh.triangle(element);

        let nodal = element.nodes.map(|n| self.displacements[n]);
        let nodal_vec: SMatrix<f64, 6, 1> = SMatrix::from([
            nodal[0].x, nodal[0].y, nodal[1].x, nodal[1].y, nodal[2].x, nodal[2].y,
        ]);

        let displacement = nodal[0] * weights[0] + nodal[1] * weights[1] + nodal[2] * weights[2];
        let strain = compute_strain_displacement_matrix(a, b, c, compute_area(a, b, c)) * nodal_vec;
        let stress = compute_stress_strain_matrix(&self.material) * strain;

        FieldValue {
            displacement,
            strain,
            stress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{Geometry, MeshConfig},
        datatypes::{Boundaries, Vertex},
        mesher::build_mesh,
    };
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn single_triangle() -> Arc<Mesh> {
        let nodes = vec![
            Vertex::new(0.2, 0.1),
            Vertex::new(1.5, 0.3),
            Vertex::new(0.6, 1.2),
        ];
        let elements = vec![Element { nodes: [0, 1, 2] }];
        Arc::new(Mesh::new(nodes, elements, Boundaries::default()).unwrap())
    }

    #[test]
    fn patch_test_recovers_uniform_strain() {
        let mesh = single_triangle();
        let material = Material::new(2e11, 0.25);
        let (exx, eyy, gxy) = (2e-4, -1e-4, 3e-4);

        let displacements: Vec<Vector2<f64>> = mesh
            .nodes
            .iter()
            .map(|v| Vector2::new(exx * v.x + 0.5 * gxy * v.y + 1e-3, eyy * v.y + 0.5 * gxy * v.x))
            .collect();
        let solution = Solution::new(mesh, displacements, material);

        let field = solution.query(0.7, 0.5);
        let expected_strain = Vector3::new(exx, eyy, gxy);
        assert_relative_eq!(field.strain, expected_strain, max_relative = 1e-12);
        assert_relative_eq!(
            field.stress,
            compute_stress_strain_matrix(&material) * expected_strain,
            max_relative = 1e-12
        );
        assert_relative_eq!(
            field.displacement,
            Vector2::new(exx * 0.7 + 0.5 * gxy * 0.5 + 1e-3, eyy * 0.5 + 0.5 * gxy * 0.7),
            max_relative = 1e-12
        );
    }

    #[test]
    fn outside_points_return_zero_field() {
        let mesh = single_triangle();
        let displacements = vec![Vector2::new(1.0, 2.0); 3];
        let solution = Solution::new(mesh, displacements, Material::new(1.0, 0.3));

        assert_eq!(solution.query(5.0, 5.0), FieldValue::zero());
        assert_eq!(solution.query(-1.0, 0.0), FieldValue::zero());
        assert_eq!(solution.query(f64::NAN, 0.0), FieldValue::zero());
    }

    #[test]
    fn vertices_return_nodal_displacements() {
        let mesh = single_triangle();
        let displacements = vec![
            Vector2::new(1.0, 0.0),
            Vector2::new(0.0, 2.0),
            Vector2::new(-1.0, 1.0),
        ];
        let solution = Solution::new(mesh.clone(), displacements.clone(), Material::new(1.0, 0.3));

        for (vertex, u) in mesh.nodes.iter().zip(&displacements) {
            assert_relative_eq!(solution.query(vertex.x, vertex.y).displacement, *u, epsilon = 1e-12);
        }
    }

    fn quarter_annulus() -> Arc<Mesh> {
        let geometry = Geometry {
            radius_min: 1.0,
            radius_max: 2.0,
        };
        Arc::new(build_mesh(&geometry, &MeshConfig { resolution: 6 }).unwrap())
    }

    #[test]
    fn grid_locator_matches_linear_scan() {
        let mesh = quarter_annulus();
        let grid = GridLocator::new(&mesh);

        let mut points: Vec<(f64, f64)> = mesh.nodes.iter().map(|v| (v.x, v.y)).collect();
        for i in 0..=40 {
            for j in 0..=40 {
                points.push((-0.1 + 2.2 * i as f64 / 40.0, -0.1 + 2.2 * j as f64 / 40.0));
            }
        }

        for (x, y) in points {
            let scanned = LinearScan.locate(&mesh, x, y).map(|(id, _)| id);
            let gridded = grid.locate(&mesh, x, y).map(|(id, _)| id);
            assert_eq!(scanned, gridded, "point ({x}, {y})");
        }
    }

    #[test]
    fn shared_edges_are_continuous() {
        let mesh = quarter_annulus();
        let displacements: Vec<Vector2<f64>> = mesh
            .nodes
            .iter()
            .map(|v| Vector2::new(v.x * v.y, v.x - v.y * v.y))
            .collect();
        let solution = Solution::new(mesh.clone(), displacements, Material::new(1.0, 0.3));

        // midpoint of the first edge shared by two elements
        let [n0, n1, _] = mesh.elements[0].nodes;
        let (a, b) = (mesh.nodes[n0], mesh.nodes[n1]);
        let (x, y) = ((a.x + b.x) / 2.0, (a.y + b.y) / 2.0);
        let field = solution.query(x, y);

        assert!(field.displacement.iter().all(|u| u.is_finite()));
        assert!(field.stress.iter().all(|s| s.is_finite()));

        let expected = (solution.nodal_displacement(n0) + solution.nodal_displacement(n1)) / 2.0;
        assert_abs_diff_eq!(field.displacement, expected, epsilon = 1e-12);

        // the same point seen from every element touching it
        for element in &mesh.elements {
            if let Some(weights) = inside(&mesh, element, x, y) {
                let u: Vector2<f64> = element
                    .nodes
                    .iter()
                    .zip(weights.iter())
                    .map(|(n, w)| solution.nodal_displacement(*n) * *w)
                    .sum();
                assert_abs_diff_eq!(u, expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn element_field_is_constant_strain() {
        let mesh = single_triangle();
        let displacements = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(1e-3, 0.0),
            Vector2::new(0.0, 2e-3),
        ];
        let solution = Solution::new(mesh, displacements, Material::new(1.0, 0.3))
            .with_locator(GridLocator::new(&single_triangle()));

        let centroid = solution.element_field(0);
        let inside = solution.query(0.7, 0.5);
        assert_relative_eq!(centroid.strain, inside.strain);
        assert_relative_eq!(centroid.stress, inside.stress);
    }

    #[test]
    fn every_node_is_found_at_its_own_coordinates() {
        let mesh = quarter_annulus();
        let displacements: Vec<Vector2<f64>> = (0..mesh.node_count())
            .map(|n| Vector2::new(1.0 + n as f64, -2.0 * n as f64))
            .collect();
        let scanned = Solution::new(mesh.clone(), displacements, Material::new(1.0, 0.3));
        let gridded = scanned.clone().with_locator(GridLocator::new(&mesh));

        for (n, v) in mesh.nodes.iter().enumerate() {
            let expected = scanned.nodal_displacement(n);
            assert_relative_eq!(
                scanned.query(v.x, v.y).displacement,
                expected,
                epsilon = 1e-9,
                max_relative = 1e-9
            );
            assert_relative_eq!(
                gridded.query(v.x, v.y).displacement,
                expected,
                epsilon = 1e-9,
                max_relative = 1e-9
            );
        }
    }

    #[test]
    fn grid_built_for_another_mesh_does_not_panic() {
        let grid = GridLocator::new(&quarter_annulus());
        let small = single_triangle();

        // the small mesh has a single element, so any hit must be element 0
        for i in 0..=20 {
            for j in 0..=20 {
                let (x, y) = (i as f64 / 10.0, j as f64 / 10.0);
                if let Some((id, _)) = grid.locate(&small, x, y) {
                    assert_eq!(id, 0);
                }
            }
        }
    }
}
