//! Statistics transforms.

use crate::library::map_series;
use crate::pipeline::{NodeFactory, ParamDescriptor, ParamKind, PayloadKind};

/// `zscore(data_column)`: standardise every series, written to `zscore`.
pub fn zscore() -> NodeFactory {
    NodeFactory::builder("zscore")
        .param(ParamDescriptor::required("data_column", ParamKind::Str))
        .accepts(&[PayloadKind::Table])
        .build(|payload, params| {
            let column = params.str("data_column")?;
            map_series(payload, column, "zscore", |row| Ok(standardize(row)))
        })
}

/// `(a - mean) / std` with the population standard deviation.
pub fn standardize(samples: &[f64]) -> Vec<f64> {
    if samples.is_empty() {
        return Vec::new();
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let std = (samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    samples.iter().map(|v| (v - mean) / std).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standardize() {
        let z = standardize(&[1.0, 2.0, 3.0]);
        let expected = [-1.224_744_871, 0.0, 1.224_744_871];
        for (a, b) in z.iter().zip(expected) {
            assert!((a - b).abs() < 1e-6, "{} != {}", a, b);
        }
    }

    #[test]
    fn test_standardize_has_zero_mean_unit_variance() {
        let z = standardize(&[4.0, 8.0, 15.0, 16.0, 23.0, 42.0]);
        let mean = z.iter().sum::<f64>() / z.len() as f64;
        let var = z.iter().map(|v| v * v).sum::<f64>() / z.len() as f64;
        assert!(mean.abs() < 1e-9);
        assert!((var - 1.0).abs() < 1e-9);
    }
}
