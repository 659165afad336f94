//! Rhai-scripted transforms.
//!
//! A script transform applies a Rhai expression to every sample. For array
//! payloads every value is replaced in place; for tables the series column
//! named by `data_column` is mapped into a new column named after the
//! transform.
//!
//! ## Script Variables
//!
//! - `value` / `raw` - The current sample
//! - `index` - Position of the sample within its series
//! - every node parameter, under its own name
//!
//! A script may instead define `fn convert(value)`, which is then called per sample.
//!
//! ## Example
//!
//! ```ignore
//! let gain = script_with_params(
//!     "gain",
//!     "value * factor + offset",
//!     vec![
//!         ParamDescriptor::required("factor", ParamKind::Float),
//!         ParamDescriptor::optional("offset", ParamKind::Float, 0.0),
//!     ],
//! )?;
//! let container = container >> gain.node(args![2.5]);
//! ```
//!
//! The script text is kept as the transform's source, so it is written to the
//! provenance log and feeds the fingerprint.

use crate::error::{FlowError, Result, ResultExt};
use crate::pipeline::{
    ArrayPayload, BoundParams, Cell, NodeFactory, ParamDescriptor, ParamKind, ParamValue, Payload,
};
use rhai::{Array, Dynamic, Engine, Scope, AST};
use std::sync::Arc;

/// Parameter every script transform has: the table column to map (unused for arrays).
pub const DATA_COLUMN: &str = "data_column";

/// A Rhai engine set up for per-sample expressions.
pub struct ScriptEngine {
    engine: Engine,
}

impl ScriptEngine {
    pub fn new() -> Self {
        let mut engine = Engine::new();
        Self::configure_engine(&mut engine);
        Self { engine }
    }

    /// Configure the Rhai engine with math helpers and safety limits
    fn configure_engine(engine: &mut Engine) {
        engine.set_max_expr_depths(64, 64);
        engine.set_max_call_levels(32);
        engine.set_max_operations(10_000);
        engine.set_max_string_size(10_000);
        engine.set_max_array_size(100_000);

        engine.register_fn("abs", |x: f64| x.abs());
        engine.register_fn("sqrt", |x: f64| x.sqrt());
        engine.register_fn("pow", |x: f64, y: f64| x.powf(y));
        engine.register_fn("exp", |x: f64| x.exp());
        engine.register_fn("ln", |x: f64| x.ln());
        engine.register_fn("log10", |x: f64| x.log10());
        engine.register_fn("sin", |x: f64| x.sin());
        engine.register_fn("cos", |x: f64| x.cos());
        engine.register_fn("tan", |x: f64| x.tan());
        engine.register_fn("atan2", |y: f64, x: f64| y.atan2(x));
        engine.register_fn("floor", |x: f64| x.floor());
        engine.register_fn("ceil", |x: f64| x.ceil());
        engine.register_fn("round", |x: f64| x.round());
        engine.register_fn("clamp", |x: f64, min: f64, max: f64| x.clamp(min, max));
        engine.register_fn("min", |a: f64, b: f64| a.min(b));
        engine.register_fn("max", |a: f64, b: f64| a.max(b));
        engine.register_fn("pi", || std::f64::consts::PI);
        engine.register_fn("e", || std::f64::consts::E);
        engine.register_fn("is_nan", |x: f64| x.is_nan());
        engine.register_fn("lerp", |a: f64, b: f64, t: f64| a + (b - a) * t);
        engine.register_fn(
            "map_range",
            |x: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64| {
                (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
            },
        );
    }

    pub fn compile(&self, source: &str) -> Result<AST> {
        self.engine
            .compile(source)
            .map_err(|e| FlowError::Script(format!("Compilation error: {}", e)))
    }

    /// Evaluate `ast` for one sample. `scope` already holds the node parameters.
    pub fn apply(&self, ast: &AST, scope: &mut Scope, value: f64, index: usize) -> Result<f64> {
        let base = scope.len();
        scope.push("value", value);
        scope.push("raw", value);
        scope.push("index", index as i64);

        let has_convert = ast.iter_functions().any(|f| f.name == "convert" && f.params.len() == 1);
        let result = if has_convert {
            self.engine.call_fn::<Dynamic>(scope, ast, "convert", (value,))
        } else {
            self.engine.eval_ast_with_scope::<Dynamic>(scope, ast)
        };
        scope.rewind(base);

        let result = result.with_context(|| format!("Script failed on sample {}", index))?;
        if let Ok(f) = result.as_float() {
            Ok(f)
        } else if let Ok(i) = result.as_int() {
            Ok(i as f64)
        } else {
            Err(FlowError::Script(format!(
                "Script must return a numeric value, got {}",
                result.type_name()
            )))
        }
    }

    /// Check that `source` compiles.
    pub fn validate(&self, source: &str) -> Result<()> {
        self.compile(source).map(|_| ())
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScriptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptEngine").finish()
    }
}

/// Script transform whose only parameter is `data_column` (default: empty, for arrays).
pub fn script(name: &str, source: &str) -> Result<NodeFactory> {
    script_with_params(name, source, Vec::new())
}

/// Script transform with extra declared parameters, visible to the script by name.
pub fn script_with_params(name: &str, source: &str, params: Vec<ParamDescriptor>) -> Result<NodeFactory> {
    let engine = Arc::new(ScriptEngine::new());
    let ast = Arc::new(engine.compile(source)?);
    let output = name.to_string();

    let mut builder = NodeFactory::builder(name).source(source);
    for descriptor in params {
        builder = builder.param(descriptor);
    }
    builder = builder.param(ParamDescriptor::optional(DATA_COLUMN, ParamKind::Str, ""));

    tracing::debug!("Compiled script transform '{}'", name);
    Ok(builder.build(move |payload, params| run_script(&engine, &ast, &output, payload, params)))
}

fn run_script(
    engine: &ScriptEngine,
    ast: &AST,
    output: &str,
    payload: &Payload,
    params: &BoundParams,
) -> anyhow::Result<Payload> {
    let mut scope = Scope::new();
    for (name, value) in params.params().iter() {
        scope.push_dynamic(name.to_string(), to_dynamic(value));
    }

    match payload {
        Payload::Array(array) => {
            let values = array
                .values()
                .iter()
                .map(|row| map_row(engine, ast, &mut scope, row))
                .collect::<anyhow::Result<Vec<_>>>()?;
            Ok(ArrayPayload::new(values, array.labels().to_vec())?.into())
        }
        Payload::Table(table) => {
            let column = params.str(DATA_COLUMN)?;
            anyhow::ensure!(!column.is_empty(), "script '{}' needs a data_column for table payloads", output);
            let cells = table
                .series(column)?
                .into_iter()
                .map(|row| map_row(engine, ast, &mut scope, row).map(Cell::Series))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let mut out = table.clone();
            out.set_column(output, cells)?;
            Ok(out.into())
        }
    }
}

fn map_row(engine: &ScriptEngine, ast: &AST, scope: &mut Scope, row: &[f64]) -> anyhow::Result<Vec<f64>> {
    row.iter()
        .enumerate()
        .map(|(i, &v)| engine.apply(ast, scope, v, i).map_err(anyhow::Error::from))
        .collect()
}

fn to_dynamic(value: &ParamValue) -> Dynamic {
    match value {
        ParamValue::Bool(b) => Dynamic::from(*b),
        ParamValue::Int(i) => Dynamic::from(*i),
        ParamValue::Float(f) => Dynamic::from(*f),
        ParamValue::Str(s) => Dynamic::from(s.clone()),
        ParamValue::FloatList(v) => {
            let array: Array = v.iter().map(|f| Dynamic::from(*f)).collect();
            Dynamic::from(array)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Params, TablePayload};

    fn array() -> Payload {
        ArrayPayload::new(vec![vec![1.0, 2.0], vec![3.0]], vec!["a".into(), "b".into()])
            .unwrap()
            .into()
    }

    #[test]
    fn test_expression_over_array() {
        let f = script("double", "value * 2.0").unwrap();
        let params = f.node(vec![]).bind().unwrap();
        let out = f.call(&array(), &params).unwrap();
        assert_eq!(out.array().unwrap().values(), &[vec![2.0, 4.0], vec![6.0]]);
    }

    #[test]
    fn test_convert_function_and_params() {
        let f = script_with_params(
            "affine",
            "fn convert(v) { v * 10.0 }",
            vec![ParamDescriptor::required("factor", ParamKind::Float)],
        )
        .unwrap();
        let params = f.node(vec![1.5.into()]).bind().unwrap();
        let out = f.call(&array(), &params).unwrap();
        assert_eq!(out.array().unwrap().values()[1], vec![30.0]);

        let g = script_with_params(
            "scaled",
            "value * factor + index",
            vec![ParamDescriptor::required("factor", ParamKind::Float)],
        )
        .unwrap();
        let params = g.node(vec![2.into()]).bind().unwrap();
        let out = g.call(&array(), &params).unwrap();
        assert_eq!(out.array().unwrap().values()[0], vec![2.0, 5.0]);
    }

    #[test]
    fn test_table_needs_data_column() {
        let table: Payload = TablePayload::new()
            .with_column("trace", vec![Cell::Series(vec![1.0])])
            .unwrap()
            .into();
        let f = script("neg", "-value").unwrap();

        let unbound = f.node(vec![]).bind().unwrap();
        assert!(f.call(&table, &unbound).is_err());

        let kwargs: Params = [(DATA_COLUMN, "trace")].into_iter().collect();
        let bound = f.node_with(vec![], kwargs).bind().unwrap();
        let out = f.call(&table, &bound).unwrap();
        assert_eq!(out.table().unwrap().column("neg").unwrap()[0], Cell::Series(vec![-1.0]));
    }

    #[test]
    fn test_compile_error_is_script_error() {
        assert!(matches!(script("bad", "value * "), Err(FlowError::Script(_))));
    }

    #[test]
    fn test_non_numeric_result_fails() {
        let f = script("text", "\"nope\"").unwrap();
        let params = f.node(vec![]).bind().unwrap();
        let err = f.call(&array(), &params).unwrap_err();
        assert!(err.to_string().contains("numeric"));
    }

    #[test]
    fn test_source_is_kept_for_provenance() {
        let f = script("double", "value * 2.0").unwrap();
        assert_eq!(f.source(), Some("value * 2.0"));
        assert_eq!(f.record().source.as_deref(), Some("value * 2.0"));
    }
}
