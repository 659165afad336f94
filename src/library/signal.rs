//! Signal transforms: min-max normalisation and real FFT magnitudes.

use crate::library::map_series;
use crate::pipeline::{NodeFactory, ParamDescriptor, ParamKind, PayloadKind};
use rustfft::{num_complex::Complex, FftPlanner};
use std::sync::Mutex;

/// `normalize(data_column)`: scale every series into `[0, 1]`, written to `normalize`.
pub fn normalize() -> NodeFactory {
    NodeFactory::builder("normalize")
        .param(ParamDescriptor::required("data_column", ParamKind::Str))
        .accepts(&[PayloadKind::Table])
        .build(|payload, params| {
            let column = params.str("data_column")?;
            map_series(payload, column, "normalize", |row| Ok(min_max(row)))
        })
}

/// `rfft(data_column)`: magnitude of the one-sided spectrum of every series, written to `fft`.
pub fn rfft() -> NodeFactory {
    let planner = Mutex::new(FftPlanner::<f64>::new());
    NodeFactory::builder("rfft")
        .param(ParamDescriptor::required("data_column", ParamKind::Str))
        .accepts(&[PayloadKind::Table])
        .build(move |payload, params| {
            let column = params.str("data_column")?;
            let mut planner = planner
                .lock()
                .map_err(|e| anyhow::anyhow!("FFT planner lock poisoned: {}", e))?;
            map_series(payload, column, "fft", |row| Ok(magnitudes(&mut planner, row)))
        })
}

/// `(a - min(a)) / max(a - min(a))`. A flat series divides by zero and yields NaN.
pub fn min_max(samples: &[f64]) -> Vec<f64> {
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let shifted: Vec<f64> = samples.iter().map(|v| v - min).collect();
    let max = shifted.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    shifted.into_iter().map(|v| v / max).collect()
}

/// `n / 2 + 1` bin magnitudes of a real signal of length `n`.
pub fn magnitudes(planner: &mut FftPlanner<f64>, samples: &[f64]) -> Vec<f64> {
    let n = samples.len();
    if n == 0 {
        return Vec::new();
    }

    let mut buffer: Vec<Complex<f64>> = samples.iter().map(|&s| Complex::new(s, 0.0)).collect();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    buffer.iter().take(n / 2 + 1).map(|c| c.norm()).collect()
}
