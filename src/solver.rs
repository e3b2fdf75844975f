use indicatif::ProgressBar;
use nalgebra::{DMatrix, DVector, Vector2};
use nalgebra_sparse::{factorization::CscCholesky, CooMatrix, CscMatrix, CsrMatrix};

use crate::{
    datatypes::{Axis, BoundaryCondition, Mesh, Task},
    element::{checked_area, compute_element_stiffness_matrix},
    error::{AnnulusError, Result},
    solution::Solution,
};

pub const DOF: usize = 2;

/// Global degree of freedom of row `local` of an element stiffness matrix
fn global_dof(nodes: &[usize; 3], local: usize) -> usize {
    DOF * nodes[local / DOF] + local % DOF
}

/// Stiffness matrix and load vector of the whole mesh
#[derive(Debug, Clone)]
pub struct GlobalSystem {
    pub stiffness: CsrMatrix<f64>,
    pub loads: DVector<f64>,
    /// Degrees of freedom with a prescribed displacement
    fixed: Vec<bool>,
}

impl GlobalSystem {
    /// Compiles the element stiffness matrices into a total stiffness matrix
    ///
    /// The sparsity pattern always contains the diagonal, so boundary
    /// conditions can be enforced without changing it.
    ///
    /// # Arguments
    /// * `task` - The task whose mesh and material are assembled
    ///
    /// # Returns
    /// The unconstrained system with a zero load vector
    pub fn assemble(task: &Task) -> Result<GlobalSystem> {
        let mesh = &task.mesh;
        let size = DOF * mesh.node_count();

        let mut triplets = CooMatrix::new(size, size);
        for i in 0..size {
            triplets.push(i, i, 0.0);
        }

        let bar = ProgressBar::new(mesh.elements.len() as u64);
        for (id, element) in mesh.elements.iter().enumerate() {
            let [a, b, c] = mesh.triangle(element);
            let area = checked_area(id, a, b, c)?;
            let stiffness_mat = compute_element_stiffness_matrix(a, b, c, area, &task.material);

            for local_row in 0..3 * DOF {
                for local_col in 0..3 * DOF {
                    triplets.push(
                        global_dof(&element.nodes, local_row),
                        global_dof(&element.nodes, local_col),
                        stiffness_mat[(local_row, local_col)],
                    );
                }
            }
            bar.inc(1);
        }
        bar.finish_and_clear();

        let stiffness = CsrMatrix::from(&triplets);
        log::info!(
            "assembled {}x{} stiffness matrix from {} elements ({} stored entries)",
            size,
            size,
            mesh.elements.len(),
            stiffness.nnz()
        );

        Ok(GlobalSystem {
            stiffness,
            loads: DVector::zeros(size),
            fixed: vec![false; size],
        })
    }

    pub fn size(&self) -> usize {
        self.loads.len()
    }

    pub fn is_fixed(&self, node: usize, axis: Axis) -> bool {
        self.fixed
            .get(DOF * node + axis.offset())
            .copied()
            .unwrap_or(false)
    }

    fn check_nodes(&self, nodes: &[usize]) -> Result<()> {
        let node_count = self.size() / DOF;
        match nodes.iter().find(|n| **n >= node_count) {
            Some(n) => Err(AnnulusError::Topology(format!(
                "Boundary condition references node {n}, but the mesh only has {node_count} nodes"
            ))),
            None => Ok(()),
        }
    }

    /// Converts a pressure along a node polyline into nodal forces
    ///
    /// Each edge carries `pressure` times its normal, split evenly between its
    /// two end nodes. The normal is the edge vector turned a quarter turn
    /// counter-clockwise, so a polyline walked with the material on its left
    /// is pushed into the material by a positive pressure. Degrees of freedom
    /// that are already prescribed keep their value.
    ///
    /// # Arguments
    /// * `mesh` - The mesh the polyline belongs to
    /// * `nodes` - The ordered polyline
    /// * `pressure` - The surface pressure
    pub fn apply_neumann(&mut self, mesh: &Mesh, nodes: &[usize], pressure: f64) -> Result<()> {
        self.check_nodes(nodes)?;

        for pair in nodes.windows(2) {
            let (j, i) = (pair[0], pair[1]);
            let a = &mesh.nodes[j];
            let b = &mesh.nodes[i];

            let force = Vector2::new(a.y - b.y, b.x - a.x) * (pressure / 2.0);

            for node in [i, j] {
                for (dof, component) in [(DOF * node, force.x), (DOF * node + 1, force.y)] {
                    if !self.fixed[dof] {
                        self.loads[dof] += component;
                    }
                }
            }
        }

        Ok(())
    }

    /// Prescribes a displacement along one axis for a set of nodes
    ///
    /// Rows and columns of the fixed degrees of freedom are replaced by the
    /// identity in place. Known displacements times the eliminated columns are
    /// moved to the load vector first, so the free equations stay exact. A
    /// degree of freedom fixed twice keeps the last value.
    ///
    /// # Arguments
    /// * `nodes` - The constrained nodes
    /// * `axis` - The constrained axis
    /// * `value` - The prescribed displacement
    pub fn apply_dirichlet(&mut self, nodes: &[usize], axis: Axis, value: f64) -> Result<()> {
        self.check_nodes(nodes)?;

        let mut newly_fixed: Vec<bool> = vec![false; self.size()];
        for node in nodes {
            newly_fixed[DOF * node + axis.offset()] = true;
        }

        let fixed = &self.fixed;
        let loads = &mut self.loads;
        let (row_offsets, col_indices, values) = self.stiffness.csr_data_mut();

        for row in 0..row_offsets.len() - 1 {
            let free_row = !fixed[row] && !newly_fixed[row];
            for idx in row_offsets[row]..row_offsets[row + 1] {
                let col = col_indices[idx];

                if newly_fixed[col] && free_row {
                    loads[row] -= values[idx] * value;
                }
                if newly_fixed[row] || newly_fixed[col] {
                    values[idx] = if row == col { 1.0 } else { 0.0 };
                }
            }
        }

        for (dof, is_fixed) in newly_fixed.iter().enumerate() {
            if *is_fixed {
                loads[dof] = value;
                self.fixed[dof] = true;
            }
        }

        Ok(())
    }

    pub fn apply(&mut self, mesh: &Mesh, boundary_condition: &BoundaryCondition) -> Result<()> {
        match boundary_condition {
            BoundaryCondition::Neumann { nodes, pressure } => {
                log::debug!("applying pressure {pressure} along {} nodes", nodes.len());
                self.apply_neumann(mesh, nodes, *pressure)
            }
            BoundaryCondition::Dirichlet { nodes, axis, value } => {
                log::debug!("fixing {axis:?} = {value} on {} nodes", nodes.len());
                self.apply_dirichlet(nodes, *axis, *value)
            }
        }
    }

    /// Solves the system with a sparse Cholesky factorization
    ///
    /// # Returns
    /// The nodal displacement vector, ordered x0, y0, x1, y1, ...
    pub fn solve(self) -> Result<DVector<f64>> {
        let size = self.size();

        for dof in 0..size {
            let diagonal = self
                .stiffness
                .get_entry(dof, dof)
                .map(|entry| entry.into_value())
                .unwrap_or(0.0);
            if diagonal <= 0.0 {
                return Err(AnnulusError::SingularSystem(format!(
                    "zero stiffness on {} of node {}",
                    if dof % DOF == 0 { "x" } else { "y" },
                    dof / DOF
                )));
            }
        }

        let start = std::time::Instant::now();

        let csc = CscMatrix::from(&self.stiffness);
        let cholesky = match CscCholesky::factor(&csc) {
            Ok(c) => c,
            Err(err) => {
                return Err(AnnulusError::SingularSystem(format!(
                    "Cholesky factorization of the {size}x{size} system failed: {err:?}"
                )))
            }
        };

        let rhs = DMatrix::from_column_slice(size, 1, self.loads.as_slice());
        let solution = cholesky.solve(&rhs);

        if solution.iter().any(|u| !u.is_finite()) {
            return Err(AnnulusError::SingularSystem(
                "solution contains non-finite displacements".to_owned(),
            ));
        }

        let elapsed = start.elapsed().as_secs_f32();
        log::info!("solved {size} equations in {elapsed:.3} seconds");

        Ok(DVector::from_column_slice(solution.as_slice()))
    }
}

/// Runs the solver
///
/// # Arguments
/// * `task` - The mesh, material and boundary conditions
///
/// # Returns
/// The solution, queryable anywhere in the mesh
pub fn run(task: &Task) -> Result<Solution> {
    let mut system = GlobalSystem::assemble(task)?;

    for boundary_condition in &task.boundary_conditions {
        system.apply(&task.mesh, boundary_condition)?;
    }

    let displacement_vector = system.solve()?;

    let displacements: Vec<Vector2<f64>> = displacement_vector
        .as_slice()
        .chunks_exact(DOF)
        .map(|u| Vector2::new(u[0], u[1]))
        .collect();

    Ok(Solution::new(task.mesh.clone(), displacements, task.material))
}
