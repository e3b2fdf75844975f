use nalgebra::{matrix, SMatrix, Vector3};

use crate::{
    datatypes::{Material, Plane, Vertex},
    error::{AnnulusError, Result},
};

/// Calculates the signed area of a triangle with the shoelace formula
///
/// Counter-clockwise triangles have a positive area. The winding is never
/// corrected here.
pub fn compute_area(a: &Vertex, b: &Vertex, c: &Vertex) -> f64 {
    0.5 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y))
}

/// Calculates the signed area of an element, failing on degenerate triangles
///
/// # Arguments
/// * `element_id` - The element id, used for diagnostics
/// * `a`, `b`, `c` - The element vertices
///
/// # Returns
/// The signed area of the element
pub fn checked_area(element_id: usize, a: &Vertex, b: &Vertex, c: &Vertex) -> Result<f64> {
    let area = compute_area(a, b, c);

    if !area.is_finite() || area == 0.0 {
        return Err(AnnulusError::Topology(format!(
            "Element {element_id} is degenerate (area {area})"
        )));
    }

    Ok(area)
}

/// Calculates the strain-displacement matrix of a triangle
///
/// # Arguments
/// * `a`, `b`, `c` - The element vertices
/// * `area` - The signed area of the element
///
/// # Returns
/// A 3x6 strain-displacement matrix, columns ordered ax, ay, bx, by, cx, cy.
/// This is the local degree of freedom order that `solver::global_dof`
/// scatters into the global system.
pub fn compute_strain_displacement_matrix(
    a: &Vertex,
    b: &Vertex,
    c: &Vertex,
    area: f64,
) -> SMatrix<f64, 3, 6> {
    let beta_1 = b.y - c.y;
    let beta_2 = c.y - a.y;
    let beta_3 = a.y - b.y;

    let gamma_1 = c.x - b.x;
    let gamma_2 = a.x - c.x;
    let gamma_3 = b.x - a.x;

    let mut strain_displacement_mat: SMatrix<f64, 3, 6> = matrix![
        beta_1, 0., beta_2, 0., beta_3, 0.;
        0., gamma_1, 0., gamma_2, 0., gamma_3;
        gamma_1, beta_1, gamma_2, beta_2, gamma_3, beta_3;
    ];

    strain_displacement_mat /= 2.0 * area;

    strain_displacement_mat
}

/// Calculates the stress-strain matrix
///
/// # Arguments
/// * `material` - The material, including its plane assumption
///
/// # Returns
/// A 3x3 matrix mapping (exx, eyy, gxy) to (sxx, syy, txy)
pub fn compute_stress_strain_matrix(material: &Material) -> SMatrix<f64, 3, 3> {
    let nu = material.poisson_ratio;
    let e = material.youngs_modulus;

    match material.plane {
        Plane::Strain => {
            let mut mat: SMatrix<f64, 3, 3> = matrix![
                1.0 - nu, nu, 0.0;
                nu, 1.0 - nu, 0.0;
                0.0, 0.0, (1.0 - 2.0 * nu) / 2.0;
            ];
            mat *= e / ((1.0 + nu) * (1.0 - 2.0 * nu));
            mat
        }
        Plane::Stress => {
            let mut mat: SMatrix<f64, 3, 3> = matrix![
                1.0, nu, 0.0;
                nu, 1.0, 0.0;
                0.0, 0.0, (1.0 - nu) / 2.0;
            ];
            mat *= e / (1.0 - f64::powi(nu, 2));
            mat
        }
    }
}

/// Computes the stiffness matrix of a unit-thickness triangle
///
/// # Arguments
/// * `a`, `b`, `c` - The element vertices, counter-clockwise
/// * `area` - The signed area of the element
/// * `material` - The element material
///
/// # Returns
/// A symmetric 6x6 stiffness matrix
pub fn compute_element_stiffness_matrix(
    a: &Vertex,
    b: &Vertex,
    c: &Vertex,
    area: f64,
    material: &Material,
) -> SMatrix<f64, 6, 6> {
    let stress_strain_mat = compute_stress_strain_matrix(material);
    let strain_displacement_mat = compute_strain_displacement_matrix(a, b, c, area);

    (strain_displacement_mat.transpose() * stress_strain_mat) * strain_displacement_mat * area
}

/// Smallest weight still counted as inside a triangle. Points on an edge or
/// vertex can get weights a few ulps below zero.
pub const CONTAINMENT_TOLERANCE: f64 = 1e-12;

/// Linear shape functions (barycentric weights) of a triangle
#[derive(Debug, Clone, Copy)]
pub struct ShapeFunctions {
    coefficients: SMatrix<f64, 3, 3>,
    double_area: f64,
}

impl ShapeFunctions {
    pub fn new(a: &Vertex, b: &Vertex, c: &Vertex) -> ShapeFunctions {
        // row i: [dx, dy, constant] built from the two vertices following i
        let coefficients: SMatrix<f64, 3, 3> = matrix![
            b.y - c.y, c.x - b.x, b.x * c.y - b.y * c.x;
            c.y - a.y, a.x - c.x, c.x * a.y - c.y * a.x;
            a.y - b.y, b.x - a.x, a.x * b.y - a.y * b.x;
        ];

        ShapeFunctions {
            coefficients,
            double_area: 2.0 * compute_area(a, b, c),
        }
    }

    /// Evaluates the three weights at a point
    ///
    /// The area is divided out last: two triangles sharing an edge then get
    /// weights of exactly opposite sign for the vertices off that edge, so no
    /// point on the edge is missed by both.
    pub fn eval(&self, x: f64, y: f64) -> Vector3<f64> {
        (self.coefficients * Vector3::new(x, y, 1.0)) / self.double_area
    }

    /// The weights at a point, if it lies inside or on the triangle
    pub fn weights_inside(&self, x: f64, y: f64) -> Option<Vector3<f64>> {
        let weights = self.eval(x, y);
        if weights.iter().all(|w| *w >= -CONTAINMENT_TOLERANCE) {
            Some(weights)
        } else {
            None
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.weights_inside(x, y).is_some()
    }
}
