//! Fits the automatic ARIMA search to a noisy sine and to the same sine riding
//! on ramps of increasing degree, then forecasts each one 100 steps ahead.
//!
//! Set `RUST_LOG=auto_arima=debug` to follow the order search.

use arima_workspace::{AutoArima, TimeSeries};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use tracing_subscriber::EnvFilter;

const SAMPLES: usize = 600;
const TIME_STEP: f64 = 0.1;
const NOISE_AMPLITUDE: f64 = 0.35;
const FORECAST_STEPS: usize = 100;
const HOLDOUT: usize = 100;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("auto_arima=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    println!("Auto-ARIMA: Synthetic Scenarios");
    println!("===============================\n");

    let mut rng = StdRng::seed_from_u64(2024);
    let noise = Normal::new(0.0, 1.0)?;
    let time: Vec<f64> = (0..SAMPLES).map(|i| i as f64 * TIME_STEP).collect();
    let noisy_sine: Vec<f64> = time
        .iter()
        .map(|t| t.sin() + NOISE_AMPLITUDE * noise.sample(&mut rng))
        .collect();
    let t_end = SAMPLES as f64 * TIME_STEP;

    let scenarios: Vec<(&str, Box<dyn Fn(f64) -> f64>)> = vec![
        ("Noisy Sine", Box::new(|_| 0.0)),
        ("Up Ramp", Box::new(|t| t)),
        ("Down Ramp", Box::new(move |t| t_end - t)),
        ("Quadratic Ramp", Box::new(|t| 0.01 * t.powi(2))),
        ("Cubic Ramp", Box::new(|t| t.powi(3) / 5000.0)),
        ("Fourth-Power Ramp", Box::new(|t| t.powi(4) / 200_000.0)),
    ];

    let model = AutoArima::with_orders(1, 3, 1, 3)?;

    for (name, trend) in &scenarios {
        println!("Analyzing {name}...");
        let values: Vec<f64> = time
            .iter()
            .zip(&noisy_sine)
            .map(|(t, y)| trend(*t) + y)
            .collect();

        model.fit(&TimeSeries::new(values.clone())?)?;
        let params = model.get_params()?;
        println!("{}", serde_json::to_string_pretty(&params.to_map()?)?);

        let forecast = model.forecast(FORECAST_STEPS, true)?;
        let intervals = forecast.intervals().unwrap_or_default();
        if let (Some(first), Some(last)) = (intervals.first(), intervals.last()) {
            println!(
                "Forecast: step 1 = {:.3} [{:.3}, {:.3}], step {} = {:.3} [{:.3}, {:.3}]",
                forecast.values()[0],
                first.0,
                first.1,
                FORECAST_STEPS,
                forecast.values()[FORECAST_STEPS - 1],
                last.0,
                last.1
            );
        }

        // Refit without the tail and score the forecast against it
        let (train, test) = values.split_at(SAMPLES - HOLDOUT);
        model.fit(&TimeSeries::new(train.to_vec())?)?;
        let holdout = model.forecast(HOLDOUT, false)?;
        println!(
            "Holdout ({} steps): MAE = {:.4}, MSE = {:.4}",
            HOLDOUT,
            holdout.mean_absolute_error(test)?,
            holdout.mean_squared_error(test)?
        );
        println!("=====================\n");
    }

    model.fit(&TimeSeries::new(noisy_sine)?)?;
    println!("{}", model.summary()?);

    Ok(())
}
