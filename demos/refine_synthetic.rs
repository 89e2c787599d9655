//! Refinement of a synthetic time-of-flight pattern.
//!
//! Builds a noisy three-peak pattern, refines the profile from a displaced start,
//! then refines the background with the fitted profile. Set `RUST_LOG=debug` to
//! follow individual proposals.

use lebail_rs::data::PatternData;
use lebail_rs::lebail::{LeBailConfig, LeBailFit, LeBailOutcome, RunMode};
use lebail_rs::models::{Background, GaussianPeakPattern};
use lebail_rs::parameters::ParameterSet;
use lebail_rs::refine::{RandomWalkConfig, WalkStyle};
use ndarray::Array1;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

fn profile(dtt1: f64, zero: f64, sig1: f64) -> Result<ParameterSet, Box<dyn std::error::Error>> {
    let mut params = ParameterSet::new();
    params.add_param_with_bounds("Dtt1", dtt1, 1950.0, 2050.0)?;
    params.add_param_with_bounds("Zero", zero, -20.0, 20.0)?;
    params.add_param("Sig0", 100.0)?;
    params.add_param_with_bounds("Sig1", sig1, 0.0, 1000.0)?;
    params.add_param("Sig2", 0.0)?;
    Ok(params)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Le Bail random-walk refinement");
    println!("==============================\n");

    // Peaks at Dtt1 = 2000, Zero = 0, Sig1 = 400 on a background of 10 + 0.001 x
    let model = GaussianPeakPattern::new(vec![1.0, 1.5, 2.2]);
    let x = Array1::range(1000.0, 5000.0, 2.0);
    let truth = profile(2000.0, 0.0, 400.0)?;
    let snapshot = truth.values();
    let peaks = model.synthesize(&truth.view(&snapshot), &x, &[5000.0, 8000.0, 6000.0])?;
    let background = Background::polynomial(vec![10.0, 0.001]);

    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    let clean = &peaks + &background.eval(&x);
    let noisy = clean.mapv(|y| y + y.sqrt() * rng.gen_range(-1.0..1.0));
    let data = PatternData::with_poisson_errors(x, noisy)?;

    let start = profile(2006.0, 3.0, 350.0)?;
    let fit = LeBailFit::new(
        model,
        LeBailConfig {
            mode: RunMode::Fit,
            random_walk: RandomWalkConfig {
                max_cycles: 500,
                walk_style: WalkStyle::Drunken,
                ..Default::default()
            },
            ..Default::default()
        },
    );

    let refined = match fit.run(&start, &data, &background)? {
        LeBailOutcome::Refined(result) => {
            println!("{}", result);
            result.parameters
        }
        other => {
            println!("Starting profile was unphysical; calculated pattern {}", other.pattern().fit);
            return Ok(());
        }
    };

    // Background refinement with the refined profile and a rough guess
    let background_fit = LeBailFit::new(
        fit.model().clone(),
        LeBailConfig {
            mode: RunMode::RefineBackground,
            ..fit.config().clone()
        },
    );
    if let LeBailOutcome::BackgroundRefined(result) =
        background_fit.run(&refined, &data, &Background::polynomial(vec![12.0, 0.0]))?
    {
        println!("{}", result);
    }

    Ok(())
}
