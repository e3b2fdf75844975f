use std::{collections::BTreeMap, sync::Arc};

use annulus::{
    config::{Config, MeshConfig},
    ingest::{ElementKind, ElementRecord, MeshTable},
    mesher::{assemble_task, build_mesh},
    solver,
    validator::{validate, Timer, ValidationReport},
    FieldValue, GridLocator, Mesh, Solution,
};
use approx::assert_relative_eq;

fn solve(config: &Config) -> Solution {
    let mesh = build_mesh(&config.geometry, &config.mesh).unwrap();
    let task = assemble_task(Arc::new(mesh), config.material, &config.bcs).unwrap();
    solver::run(&task).unwrap()
}

fn report_for(resolution: usize) -> ValidationReport {
    let mut config = Config::reference();
    config.mesh = MeshConfig { resolution };

    let timer = Timer::start("convergence run");
    let solution = solve(&config);
    validate(&solution, &config, &timer)
}

#[test]
fn reference_configuration_matches_lame() {
    let config = Config::reference();
    let timer = Timer::start("reference run");
    let solution = solve(&config);
    let report = validate(&solution, &config, &timer);

    assert_eq!(report.node_count, 116);
    assert_eq!(report.samples.len(), 11);
    assert!(report.radial_error() < 5.0, "{report}");
    assert!(report.hoop_error() < 5.0, "{report}");
    // mean |txy| well below the applied pressures
    assert!(report.shear_error() < 10.0, "{report}");

    for sample in &report.samples {
        assert!(sample.numeric.iter().all(|s| s.is_finite() && *s != 0.0), "{report}");
        assert_eq!(sample.analytical[2], 0.0);
    }
    assert_relative_eq!(report.samples[0].radius, 1.0);
    assert_relative_eq!(report.samples[10].radius, 2.0);
}

#[test]
fn error_decreases_with_resolution() {
    let reports: Vec<ValidationReport> = [4, 10, 20].into_iter().map(report_for).collect();

    for pair in reports.windows(2) {
        assert!(
            pair[1].radial_error() < pair[0].radial_error(),
            "radial: {} then {}",
            pair[0].radial_error(),
            pair[1].radial_error()
        );
        assert!(
            pair[1].hoop_error() < pair[0].hoop_error(),
            "hoop: {} then {}",
            pair[0].hoop_error(),
            pair[1].hoop_error()
        );
    }
    assert!(reports[0].node_count < reports[1].node_count);
    assert!(reports[1].node_count < reports[2].node_count);
}

#[test]
fn symmetry_planes_stay_on_their_axes() {
    let solution = solve(&Config::reference());
    let mesh = solution.mesh();

    for &n in &mesh.boundaries.right {
        assert_eq!(solution.nodal_displacement(n).y, 0.0);
        // net compression squeezes the ring inwards
        assert!(solution.nodal_displacement(n).x < 0.0);
    }
    for &n in &mesh.boundaries.left {
        assert_eq!(solution.nodal_displacement(n).x, 0.0);
    }
}

#[test]
fn points_outside_the_annulus_return_zero() {
    let solution = solve(&Config::reference());

    for (x, y) in [(0.0, 0.0), (0.5, 0.5), (2.5, 0.0), (-1.5, 0.0), (1.5, -0.1)] {
        assert_eq!(solution.query(x, y), FieldValue::zero(), "({x}, {y})");
    }
}

#[test]
fn grid_locator_gives_the_same_report() {
    let config = Config::reference();
    let timer = Timer::start("locator comparison");
    let scanned = solve(&config);
    let mesh = scanned.mesh().clone();
    let gridded = scanned.clone().with_locator(GridLocator::new(&mesh));

    let a = validate(&scanned, &config, &timer);
    let b = validate(&gridded, &config, &timer);
    assert_eq!(a.samples, b.samples);
    assert_eq!(a.mean_error, b.mean_error);
}

#[test]
fn solutions_can_be_shared_across_threads() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Solution>();
    assert_send_sync::<Solution<GridLocator>>();

    let solution = Arc::new(solve(&Config::reference()));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let solution = solution.clone();
            std::thread::spawn(move || solution.query(1.1 + 0.2 * i as f64, 0.3))
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        let field = handle.join().unwrap();
        assert_eq!(field, solution.query(1.1 + 0.2 * i as f64, 0.3));
    }
}

/// Re-keys a generated mesh the way an external reader would deliver it
fn as_table(mesh: &Mesh) -> MeshTable {
    let external = |n: usize| 1000 + 3 * n as i64;
    let mut table = MeshTable::default();

    for (n, v) in mesh.nodes.iter().enumerate() {
        table.nodes.insert(external(n), [v.x, v.y, 0.0]);
    }
    for (id, element) in mesh.elements.iter().enumerate() {
        table.elements.insert(
            id as i64 + 1,
            ElementRecord {
                nodes: element.nodes.iter().map(|n| external(*n)).collect(),
                kind: ElementKind::Triangle3,
                block: 1,
            },
        );
    }
    // a point entity a reader might also deliver
    table.elements.insert(
        -1,
        ElementRecord {
            nodes: vec![external(0)],
            kind: ElementKind::Vertex,
            block: 0,
        },
    );

    let sets: BTreeMap<String, Vec<i64>> = [
        ("inner", &mesh.boundaries.inner),
        ("outer", &mesh.boundaries.outer),
        ("left", &mesh.boundaries.left),
        ("right", &mesh.boundaries.right),
    ]
    .into_iter()
    .map(|(name, nodes)| (name.to_owned(), nodes.iter().map(|n| external(*n)).collect()))
    .collect();
    table.node_sets = sets;

    table
}

#[test]
fn ingested_mesh_solves_like_the_generated_one() {
    let config = Config::reference();
    let generated = build_mesh(&config.geometry, &config.mesh).unwrap();
    let ingested = as_table(&generated).into_mesh().unwrap();

    assert_eq!(ingested.nodes, generated.nodes);
    assert_eq!(ingested.elements, generated.elements);
    assert_eq!(ingested.boundaries, generated.boundaries);

    let task = assemble_task(Arc::new(ingested), config.material, &config.bcs).unwrap();
    let solution = solver::run(&task).unwrap();
    let reference = solve(&config);

    for (u, v) in solution.displacements().iter().zip(reference.displacements()) {
        assert_eq!(u, v);
    }
}
