use std::error::Error;

use gmm_em::{MixtureModel, TrainConfig, UnivariateNormal};
use log::info;
use nalgebra::DVector;
use rand::distributions::Distribution;
use statrs::distribution::{Binomial, Normal};

/// Read the first column of a headerless CSV file as 1-D points.
fn read_points(path: &str) -> Result<Vec<f64>, Box<dyn Error>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    let mut xs = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(field) = record.get(0) {
            xs.push(field.trim().parse::<f64>()?);
        }
    }
    Ok(xs)
}

fn synthetic_points(num_samples: usize) -> Result<Vec<f64>, Box<dyn Error>> {
    let mut rng = rand::thread_rng();
    let binom = Binomial::new(0.75, 1)?;
    let n1 = Normal::new(5.0, f64::sqrt(1.5))?;
    let n2 = Normal::new(10.0, f64::sqrt(2.0))?;

    Ok((0..num_samples)
        .map(|_| {
            let z = binom.sample(&mut rng);
            if z <= 0.5 {
                n1.sample(&mut rng)
            } else {
                n2.sample(&mut rng)
            }
        })
        .collect())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let xs = match std::env::args().nth(1) {
        Some(path) => {
            info!("reading points from {path}");
            read_points(&path)?
        }
        None => synthetic_points(50_000)?,
    };
    let points: Vec<DVector<f64>> = xs.iter().map(|&x| DVector::from_element(1, x)).collect();

    // Initial parameters
    let components = vec![
        UnivariateNormal::new(-1.0, f64::sqrt(1.7))?,
        UnivariateNormal::new(20.0, f64::sqrt(1.7))?,
    ];
    let mut gmm = MixtureModel::new(components)?;
    let config = TrainConfig::default()
        .with_stop_threshold(1e-3)
        .with_max_iterations(100)
        .with_verbose(true);

    let begin = std::time::Instant::now();
    let report = gmm.train(&points, &config)?;
    let elapsed = begin.elapsed();

    println!("Took {} seconds", elapsed.as_secs_f32());
    println!("Initial log likelihood: {:.3}", report.initial_log_likelihood);
    println!(
        "After {} steps, final log likelihood: {:.3}",
        report.iterations, report.final_log_likelihood
    );
    if !report.decreases.is_empty() {
        println!("Log likelihood went down at steps {:?}", report.decreases);
    }
    let mu: Vec<f64> = gmm.components().iter().map(|c| c.mean()).collect();
    let sigma: Vec<f64> = gmm.components().iter().map(|c| c.std_dev()).collect();
    println!("mu: {mu:.3?}, sigma: {sigma:.3?}, pi: {:.3?}", gmm.weights());
    Ok(())
}
