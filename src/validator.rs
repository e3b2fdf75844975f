//! Comparison of a solved annulus against the closed-form Lamé stresses.

use std::{
    fmt::Display,
    time::{Duration, Instant},
};

use crate::{
    config::Config,
    solution::{PointLocator, Solution},
};

/// Number of equally spaced radii sampled from inner to outer radius
pub const SAMPLE_COUNT: usize = 11;

/// Wall-clock timer owned by the caller of a run
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
    last: Instant,
}

impl Timer {
    pub fn start(message: &str) -> Timer {
        log::info!("{message}");
        let now = Instant::now();
        Timer {
            start: now,
            last: now,
        }
    }

    /// Logs a message with the time since the timer started and since the
    /// previous lap
    pub fn lap(&mut self, message: &str) {
        let now = Instant::now();
        log::info!(
            "[{:.1}s +{:.1}s] {message}",
            (now - self.start).as_secs_f32(),
            (now - self.last).as_secs_f32()
        );
        self.last = now;
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Closed-form stresses in a thick-walled cylinder under inner and outer
/// pressure
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LameSolution {
    pub radius_inner: f64,
    pub radius_outer: f64,
    pub pressure_inner: f64,
    pub pressure_outer: f64,
}

impl LameSolution {
    pub fn from_config(config: &Config) -> LameSolution {
        LameSolution {
            radius_inner: config.geometry.radius_min,
            radius_outer: config.geometry.radius_max,
            pressure_inner: config.bcs.pressure_inner,
            pressure_outer: config.bcs.pressure_outer,
        }
    }

    /// Radial, hoop and shear stress at a radius
    pub fn stress(&self, radius: f64) -> [f64; 3] {
        let a2 = self.radius_inner.powi(2);
        let b2 = self.radius_outer.powi(2);
        let r2 = radius.powi(2);

        let inner = self.pressure_inner * a2 / (b2 - a2);
        let outer = self.pressure_outer * b2 / (b2 - a2);

        [
            inner * (1.0 - b2 / r2) - outer * (1.0 - a2 / r2),
            inner * (1.0 + b2 / r2) - outer * (1.0 + a2 / r2),
            0.0,
        ]
    }
}

/// Symmetric relative difference, falling back to the absolute difference
/// when either value is exactly zero
pub fn relative_error(numeric: f64, analytical: f64) -> f64 {
    if numeric != 0.0 && analytical != 0.0 {
        (numeric - analytical).abs() / f64::sqrt(numeric.powi(2) + analytical.powi(2))
    } else {
        (numeric - analytical).abs()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub radius: f64,
    pub numeric: [f64; 3],
    pub analytical: [f64; 3],
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub resolution: usize,
    pub node_count: usize,
    pub samples: Vec<Sample>,
    /// Mean error in percent for radial, hoop and shear stress
    pub mean_error: [f64; 3],
    pub elapsed: Duration,
}

impl ValidationReport {
    pub fn radial_error(&self) -> f64 {
        self.mean_error[0]
    }

    pub fn hoop_error(&self) -> f64 {
        self.mean_error[1]
    }

    pub fn shear_error(&self) -> f64 {
        self.mean_error[2]
    }
}

impl Display for ValidationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{:>6} {:>10} {:>10}   {:>10} {:>10}   {:>10} {:>10}",
            "r", "s_rr", "lame", "s_ff", "lame", "s_rf", "lame"
        )?;
        for s in &self.samples {
            writeln!(
                f,
                "{:>6.3} {:>10.3} {:>10.3}   {:>10.3} {:>10.3}   {:>10.3} {:>10.3}",
                s.radius,
                s.numeric[0],
                s.analytical[0],
                s.numeric[1],
                s.analytical[1],
                s.numeric[2],
                s.analytical[2]
            )?;
        }
        writeln!(
            f,
            "resolution {} ({} nodes), time {:.1}s",
            self.resolution,
            self.node_count,
            self.elapsed.as_secs_f32()
        )?;
        writeln!(f, "rr error - {:.1}%", self.mean_error[0])?;
        writeln!(f, "ff error - {:.1}%", self.mean_error[1])?;
        write!(f, "rf error - {:.1}%", self.mean_error[2])
    }
}

/// Samples the solution along the x axis and compares it with the Lamé
/// stresses
///
/// On the x axis the cartesian stresses (sxx, syy, txy) are the polar
/// stresses (s_rr, s_ff, s_rf).
///
/// # Arguments
/// * `solution` - The solved annulus
/// * `config` - The configuration the solution was built from
/// * `timer` - The timer started by the caller at the beginning of the run
pub fn validate<L: PointLocator>(solution: &Solution<L>, config: &Config, timer: &Timer) -> ValidationReport {
    let lame = LameSolution::from_config(config);
    let (a, b) = (config.geometry.radius_min, config.geometry.radius_max);

    let mut samples: Vec<Sample> = Vec::with_capacity(SAMPLE_COUNT);
    let mut error_sums = [0.0; 3];

    for i in 0..SAMPLE_COUNT {
        let radius = a + i as f64 / (SAMPLE_COUNT - 1) as f64 * (b - a);

        let stress = solution.query(radius, 0.0).stress;
        if stress.iter().all(|s| *s == 0.0) {
            log::warn!("sample at r = {radius} is outside the mesh");
        }

        let numeric = [stress.x, stress.y, stress.z];
        let analytical = lame.stress(radius);

        for k in 0..3 {
            error_sums[k] += relative_error(numeric[k], analytical[k]);
        }
        samples.push(Sample {
            radius,
            numeric,
            analytical,
        });
    }

    ValidationReport {
        resolution: config.mesh.resolution,
        node_count: solution.node_count(),
        samples,
        mean_error: error_sums.map(|e| 100.0 * e / SAMPLE_COUNT as f64),
        elapsed: timer.elapsed(),
    }
}
