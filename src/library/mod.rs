//! Built-in transforms.
//!
//! Every transform is exposed as a function returning its [`NodeFactory`]:
//!
//! ```ignore
//! use nodeflow::library::{normalize, rfft, splice};
//!
//! let container = Container::new(table)
//!     >> splice().node(args!["trace", 0, 512])
//!     >> normalize().node(args!["spliced"])
//!     >> rfft().node(args!["normalize"]);
//! ```
//!
//! Table transforms never modify their input column. They write their result
//! to a new column named after the transform (`normalize`, `fft`, `zscore`,
//! `spliced`, `partition`, `pad_arrays`) and hand the table on.

pub mod data;
pub mod script;
pub mod signal;
pub mod stats;

pub use data::{pad_arrays, partition, splice, to_array};
pub use script::{script, script_with_params, ScriptEngine};
pub use signal::{normalize, rfft};
pub use stats::zscore;

use crate::pipeline::{Cell, Payload, TablePayload, TransformRegistry};

/// Registry holding every built-in transform, keyed by name.
pub fn registry() -> TransformRegistry {
    let mut registry = TransformRegistry::new();
    registry
        .register(normalize())
        .register(rfft())
        .register(zscore())
        .register(splice())
        .register(partition())
        .register(pad_arrays())
        .register(to_array());
    registry
}

/// Apply `f` to every row of the series column `input`, writing the results to `output`.
pub(crate) fn map_series<F>(payload: &Payload, input: &str, output: &str, mut f: F) -> anyhow::Result<Payload>
where
    F: FnMut(&[f64]) -> anyhow::Result<Vec<f64>>,
{
    let table = payload.table()?;
    let cells = table
        .series(input)?
        .into_iter()
        .map(|row| f(row).map(Cell::Series))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut out: TablePayload = table.clone();
    out.set_column(output, cells)?;
    Ok(out.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_contains_builtins() {
        let reg = registry();
        for name in ["normalize", "rfft", "zscore", "splice", "partition", "pad_arrays", "to_array"] {
            assert!(reg.get(name).is_some(), "missing {}", name);
        }
        assert_eq!(reg.len(), 7);
    }

    #[test]
    fn test_map_series_keeps_input_column() {
        let table = TablePayload::new()
            .with_column("x", vec![Cell::Series(vec![1.0, 2.0])])
            .unwrap();
        let out = map_series(&table.into(), "x", "y", |r| Ok(r.iter().map(|v| v * 2.0).collect())).unwrap();
        let out = out.table().unwrap();
        assert_eq!(out.column("x").unwrap()[0], Cell::Series(vec![1.0, 2.0]));
        assert_eq!(out.column("y").unwrap()[0], Cell::Series(vec![2.0, 4.0]));
    }

    #[test]
    fn test_map_series_rejects_arrays() {
        let array = crate::pipeline::ArrayPayload::new(vec![], vec![]).unwrap();
        let err = map_series(&array.into(), "x", "y", |r| Ok(r.to_vec())).unwrap_err();
        assert!(err.to_string().contains("expected a table"));
    }
}
