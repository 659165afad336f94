//! Data shaping transforms: slicing, partition labels, padding and table → array.

use crate::library::map_series;
use crate::pipeline::{
    ArrayPayload, Cell, NodeFactory, ParamDescriptor, ParamKind, PayloadKind, Produces,
};

/// `splice(data_column, start, stop)`: slice every series to `[start, stop)`, written to `spliced`.
///
/// Negative bounds count from the end of each series; bounds past either end are clamped.
pub fn splice() -> NodeFactory {
    NodeFactory::builder("splice")
        .param(ParamDescriptor::required("data_column", ParamKind::Str))
        .param(ParamDescriptor::required("start", ParamKind::Int))
        .param(ParamDescriptor::required("stop", ParamKind::Int))
        .accepts(&[PayloadKind::Table])
        .build(|payload, params| {
            let column = params.str("data_column")?;
            let start = params.int("start")?;
            let stop = params.int("stop")?;
            map_series(payload, column, "spliced", |row| {
                let (a, b) = slice_bounds(row.len(), start, stop);
                Ok(row[a..b].to_vec())
            })
        })
}

/// `partition(n_partitions)`: label rows with contiguous partition numbers, written to `partition`.
///
/// The first `rows % n` partitions get one extra row.
pub fn partition() -> NodeFactory {
    NodeFactory::builder("partition")
        .param(ParamDescriptor::required("n_partitions", ParamKind::Int))
        .accepts(&[PayloadKind::Table])
        .build(|payload, params| {
            let n = params.int("n_partitions")?;
            anyhow::ensure!(n > 0, "n_partitions must be positive, got {}", n);

            let mut table = payload.table()?.clone();
            let labels = partition_labels(table.n_rows(), n as usize)
                .into_iter()
                .map(|l| Cell::Int(l as i64))
                .collect();
            table.set_column("partition", labels)?;
            Ok(table.into())
        })
}

/// `pad_arrays(data_column, method = "fill-size")`: pad every series to the longest one
/// with its own minimum, written to `pad_arrays`.
///
/// `fill-size` pads after the data; `center` splits the padding around it.
/// There is no `random` method placing the data at a random offset, so the
/// default is `fill-size` rather than `random`.
pub fn pad_arrays() -> NodeFactory {
    NodeFactory::builder("pad_arrays")
        .param(ParamDescriptor::required("data_column", ParamKind::Str))
        .param(ParamDescriptor::optional("method", ParamKind::Str, "fill-size"))
        .accepts(&[PayloadKind::Table])
        .build(|payload, params| {
            let column = params.str("data_column")?;
            let method = PadMethod::parse(params.str("method")?)?;
            let table = payload.table()?;
            let longest = table.series(column)?.iter().map(|r| r.len()).max().unwrap_or(0);
            map_series(payload, column, "pad_arrays", |row| Ok(pad(row, longest, method)))
        })
}

/// `to_array(data_column, labels_column)`: turn a table into an array payload,
/// one row per series with the matching label.
pub fn to_array() -> NodeFactory {
    NodeFactory::builder("to_array")
        .param(ParamDescriptor::required("data_column", ParamKind::Str))
        .param(ParamDescriptor::required("labels_column", ParamKind::Str))
        .accepts(&[PayloadKind::Table])
        .produces(Produces::Kind(PayloadKind::Array))
        .build(|payload, params| {
            let table = payload.table()?;
            let data_column = params.str("data_column")?;
            let labels_column = params.str("labels_column")?;

            let values: Vec<Vec<f64>> = table.series(data_column)?.into_iter().map(|r| r.to_vec()).collect();
            let labels = table
                .column(labels_column)
                .ok_or_else(|| anyhow::anyhow!("no column named '{}'", labels_column))?
                .iter()
                .enumerate()
                .map(|(row, cell)| {
                    cell.as_label()
                        .or_else(|| cell.as_f64().map(|v| v.to_string()))
                        .ok_or_else(|| anyhow::anyhow!("column '{}' row {} is not a label", labels_column, row))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;

            Ok(ArrayPayload::new(values, labels)?.into())
        })
}

/// Resolve slice bounds the way sequence slicing does: negatives from the end, clamped, `start <= stop`.
pub fn slice_bounds(len: usize, start: i64, stop: i64) -> (usize, usize) {
    let resolve = |i: i64| -> usize {
        if i < 0 {
            (len as i64 + i).max(0) as usize
        } else {
            (i as usize).min(len)
        }
    };
    let a = resolve(start);
    let b = resolve(stop).max(a);
    (a, b)
}

/// Contiguous labels `0..n` over `rows` rows, larger partitions first.
pub fn partition_labels(rows: usize, n: usize) -> Vec<usize> {
    let base = rows / n;
    let extra = rows % n;
    (0..n)
        .flat_map(|label| {
            let size = base + usize::from(label < extra);
            std::iter::repeat(label).take(size)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadMethod {
    FillSize,
    Center,
}

impl PadMethod {
    fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "fill-size" => Ok(PadMethod::FillSize),
            "center" => Ok(PadMethod::Center),
            other => anyhow::bail!("unknown pad method '{}' (expected 'fill-size' or 'center')", other),
        }
    }
}

pub fn pad(row: &[f64], size: usize, method: PadMethod) -> Vec<f64> {
    if row.len() >= size {
        return row.to_vec();
    }
    let fill = row.iter().copied().fold(f64::INFINITY, f64::min);
    let fill = if fill.is_finite() { fill } else { 0.0 };
    let missing = size - row.len();
    let before = match method {
        PadMethod::FillSize => 0,
        PadMethod::Center => missing / 2,
    };

    let mut out = Vec::with_capacity(size);
    out.extend(std::iter::repeat(fill).take(before));
    out.extend_from_slice(row);
    out.resize(size, fill);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Payload, TablePayload};

    fn table() -> Payload {
        TablePayload::new()
            .with_column(
                "trace",
                vec![
                    Cell::Series(vec![1.0, 2.0, 3.0, 4.0]),
                    Cell::Series(vec![5.0, 6.0]),
                    Cell::Series(vec![7.0, 8.0, 9.0]),
                ],
            )
            .unwrap()
            .with_column(
                "label",
                vec![Cell::Text("a".into()), Cell::Text("b".into()), Cell::Int(3)],
            )
            .unwrap()
            .into()
    }

    #[test]
    fn test_slice_bounds() {
        assert_eq!(slice_bounds(10, 2, 5), (2, 5));
        assert_eq!(slice_bounds(10, -3, 10), (7, 10));
        assert_eq!(slice_bounds(10, 0, -1), (0, 9));
        assert_eq!(slice_bounds(3, 1, 100), (1, 3));
        assert_eq!(slice_bounds(3, 2, 1), (2, 2));
        assert_eq!(slice_bounds(3, -10, 2), (0, 2));
    }

    #[test]
    fn test_partition_labels_match_array_split() {
        assert_eq!(partition_labels(7, 3), vec![0, 0, 0, 1, 1, 2, 2]);
        assert_eq!(partition_labels(2, 3), vec![0, 1]);
        assert!(partition_labels(0, 2).is_empty());
    }

    #[test]
    fn test_pad_methods() {
        assert_eq!(pad(&[3.0, 1.0], 4, PadMethod::FillSize), vec![3.0, 1.0, 1.0, 1.0]);
        assert_eq!(pad(&[3.0, 1.0], 5, PadMethod::Center), vec![1.0, 3.0, 1.0, 1.0, 1.0]);
        assert_eq!(pad(&[], 2, PadMethod::FillSize), vec![0.0, 0.0]);
    }

    #[test]
    fn test_splice_node() {
        let params = splice().node(vec!["trace".into(), 1.into(), 3.into()]).bind().unwrap();
        let out = splice().call(&table(), &params).unwrap();
        let spliced = out.table().unwrap().column("spliced").unwrap().to_vec();
        assert_eq!(
            spliced,
            vec![
                Cell::Series(vec![2.0, 3.0]),
                Cell::Series(vec![6.0]),
                Cell::Series(vec![8.0, 9.0]),
            ]
        );
    }

    #[test]
    fn test_partition_rejects_zero() {
        let params = partition().node(vec![0.into()]).bind().unwrap();
        let err = partition().call(&table(), &params).unwrap_err();
        assert!(err.to_string().contains("positive"));
    }

    #[test]
    fn test_pad_arrays_node() {
        let params = pad_arrays().node(vec!["trace".into()]).bind().unwrap();
        let out = pad_arrays().call(&table(), &params).unwrap();
        let padded = out.table().unwrap().series("pad_arrays").unwrap();
        assert!(padded.iter().all(|r| r.len() == 4));
        assert_eq!(padded[1], &[5.0, 6.0, 5.0, 5.0]);
    }

    #[test]
    fn test_to_array_switches_payload_kind() {
        let params = to_array()
            .node(vec!["trace".into(), "label".into()])
            .bind()
            .unwrap();
        let out = to_array().call(&table(), &params).unwrap();
        let array = out.array().unwrap();
        assert_eq!(array.n_rows(), 3);
        assert_eq!(array.labels(), &["a".to_string(), "b".to_string(), "3".to_string()]);
    }
}
