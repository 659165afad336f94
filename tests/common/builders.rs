//! Test data builders for payloads and transforms

use nodeflow::pipeline::{
    ArrayPayload, Cell, NodeFactory, ParamDescriptor, ParamKind, Payload, PayloadKind, TablePayload,
};

/// Builder for table payloads with one series column and one label column
pub struct TableBuilder {
    rows: Vec<Vec<f64>>,
    column: String,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            column: "trace".to_string(),
        }
    }

    pub fn column(mut self, name: &str) -> Self {
        self.column = name.to_string();
        self
    }

    pub fn row(mut self, values: &[f64]) -> Self {
        self.rows.push(values.to_vec());
        self
    }

    /// `count` rows of `0, 1, .., len - 1` scaled by the row number plus one
    pub fn ramps(mut self, count: usize, len: usize) -> Self {
        for r in 0..count {
            self.rows.push((0..len).map(|i| (i * (r + 1)) as f64).collect());
        }
        self
    }

    pub fn build(self) -> TablePayload {
        let labels = (0..self.rows.len()).map(|i| Cell::Text(format!("row_{}", i))).collect();
        let series = self.rows.into_iter().map(Cell::Series).collect();
        TablePayload::new()
            .with_column(self.column, series)
            .unwrap()
            .with_column("label", labels)
            .unwrap()
    }
}

/// Single-row array payload holding `value`
pub fn scalar(value: f64) -> Payload {
    ArrayPayload::new(vec![vec![value]], vec!["x".to_string()])
        .unwrap()
        .into()
}

/// First value of an array payload
pub fn first(payload: &Payload) -> f64 {
    payload.array().unwrap().values()[0][0]
}

/// `add(amount)`: adds `amount` to every array value
pub fn add() -> NodeFactory {
    NodeFactory::builder("add")
        .param(ParamDescriptor::required("amount", ParamKind::Float))
        .accepts(&[PayloadKind::Array])
        .build(|payload, params| {
            let amount = params.float("amount")?;
            let array = payload.array()?;
            let values = array
                .values()
                .iter()
                .map(|row| row.iter().map(|v| v + amount).collect())
                .collect();
            Ok(ArrayPayload::new(values, array.labels().to_vec())?.into())
        })
}

/// `f(a: str, b: int = 10)`: passes the payload through unchanged
pub fn f_ab() -> NodeFactory {
    NodeFactory::builder("f")
        .param(ParamDescriptor::required("a", ParamKind::Str))
        .param(ParamDescriptor::optional("b", ParamKind::Int, 10))
        .build(|payload, _| Ok(payload.clone()))
}

/// Transform that always fails with `message`
pub fn failing(message: &'static str) -> NodeFactory {
    NodeFactory::builder("explode").build(move |_, _| anyhow::bail!("{}", message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_builder() {
        let table = TableBuilder::new().ramps(3, 4).build();
        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.series("trace").unwrap()[2], &[0.0, 3.0, 6.0, 9.0]);
    }
}
