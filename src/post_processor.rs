use std::io::{BufWriter, Write};

use crate::{
    error::{AnnulusError, Result},
    solution::{PointLocator, Solution},
};

fn create(path: &str) -> Result<BufWriter<std::fs::File>> {
    match std::fs::File::create(path) {
        Ok(f) => Ok(BufWriter::new(f)),
        Err(err) => Err(AnnulusError::PostProcessor(format!(
            "Failed to create {path}: {err}"
        ))),
    }
}

fn write_failed(path: &str, err: std::io::Error) -> AnnulusError {
    AnnulusError::PostProcessor(format!("Failed to write {path}: {err}"))
}

fn write_nodes<W: Write, L: PointLocator>(out: &mut W, solution: &Solution<L>) -> std::io::Result<()> {
    writeln!(out, "x,y,ux,uy")?;
    for (vertex, u) in solution.mesh().vertices().iter().zip(solution.displacements()) {
        writeln!(out, "{},{},{},{}", vertex.x, vertex.y, u.x, u.y)?;
    }
    out.flush()
}

fn write_elements<W: Write, L: PointLocator>(out: &mut W, solution: &Solution<L>) -> std::io::Result<()> {
    writeln!(out, "n0,n1,n2,sxx,syy,sxy")?;
    for (id, element) in solution.mesh().elements.iter().enumerate() {
        let stress = solution.element_field(id).stress;
        writeln!(
            out,
            "{n0},{n1},{n2},{sxx},{syy},{sxy}",
            n0 = element.nodes[0],
            n1 = element.nodes[1],
            n2 = element.nodes[2],
            sxx = stress.x,
            syy = stress.y,
            sxy = stress.z,
        )?;
    }
    out.flush()
}

/// Writes simulation results to two CSV files
///
/// # Arguments
/// * `solution` - The solved field
/// * `nodes_output` - The filename of the output nodes csv (x, y, ux, uy)
/// * `elements_output` - The filename of the output elements csv (node ids
///     and the element stress sxx, syy, sxy)
pub fn csv_output<L: PointLocator>(
    solution: &Solution<L>,
    nodes_output: &str,
    elements_output: &str,
) -> Result<()> {
    let mut nodes_file = create(nodes_output)?;
    write_nodes(&mut nodes_file, solution).map_err(|err| write_failed(nodes_output, err))?;

    let mut elements_file = create(elements_output)?;
    write_elements(&mut elements_file, solution)
        .map_err(|err| write_failed(elements_output, err))?;

    log::info!("wrote output to {nodes_output} and {elements_output}");

    Ok(())
}
