use std::sync::Arc;

use annulus::{
    config::Config,
    error::Result,
    mesher, post_processor, solver,
    validator::{self, Timer},
};

fn run() -> Result<()> {
    let config = Config::reference();
    config.validate()?;

    let mut timer = Timer::start("solving the Lamé problem");

    let mesh = Arc::new(mesher::build_mesh(&config.geometry, &config.mesh)?);
    timer.lap("mesh built");

    let task = mesher::assemble_task(mesh, config.material, &config.bcs)?;
    let solution = solver::run(&task)?;
    timer.lap("system solved");

    let report = validator::validate(&solution, &config, &timer);
    log::info!("comparison with the analytical solution:\n{report}");

    post_processor::csv_output(&solution, "nodes.csv", "elements.csv")?;

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run() {
        log::error!("{err}");
        std::process::exit(1);
    }
}
