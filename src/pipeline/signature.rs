//! Declared transform signatures and argument binding.
//!
//! Transforms register an explicit descriptor list instead of having their
//! parameters discovered at runtime. Two operations work on it:
//!
//! - [`Signature::resolve`]: zip positional arguments with declared names and
//!   overlay keyword arguments. Never fails; this is what a Node stores.
//! - [`Signature::bind`]: check a resolved mapping right before the transform
//!   runs: surplus positionals, unknown names, missing required values and
//!   type mismatches all surface here, as transform failures.

use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::value::{ParamKind, ParamValue, Params};
use serde::{Deserialize, Serialize};

/// One declared parameter of a transform (the leading container argument is implicit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDescriptor {
    pub name: String,
    pub kind: ParamKind,
    /// `None` means the parameter is required.
    pub default: Option<ParamValue>,
}

impl ParamDescriptor {
    pub fn required(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParamKind, default: impl Into<ParamValue>) -> Self {
        Self {
            name: name.into(),
            kind,
            default: Some(default.into()),
        }
    }
}

/// Ordered parameter list of a transform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    params: Vec<ParamDescriptor>,
}

impl Signature {
    pub fn new(params: Vec<ParamDescriptor>) -> Self {
        Self { params }
    }

    /// Builder-style append.
    pub fn param(mut self, descriptor: ParamDescriptor) -> Self {
        self.params.push(descriptor);
        self
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn descriptors(&self) -> &[ParamDescriptor] {
        &self.params
    }

    pub fn get(&self, name: &str) -> Option<&ParamDescriptor> {
        self.params.iter().find(|d| d.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|d| d.name.as_str())
    }

    /// Positional args bound by name in declaration order, then keyword args overlaid.
    ///
    /// Surplus positionals are dropped here; [`Signature::bind`] reports them.
    pub fn resolve(&self, args: &[ParamValue], kwargs: &Params) -> Params {
        let mut resolved: Params = self
            .params
            .iter()
            .zip(args.iter())
            .map(|(d, v)| (d.name.clone(), v.clone()))
            .collect();
        for (name, value) in kwargs.iter() {
            resolved.insert(name, value.clone());
        }
        resolved
    }

    /// Validate a resolved mapping against the declaration and fill defaults.
    pub fn bind(&self, node: &str, resolved: &Params, positional_given: usize) -> PipelineResult<BoundParams> {
        if positional_given > self.params.len() {
            return Err(PipelineError::TooManyArguments {
                node: node.to_string(),
                expected: self.params.len(),
                given: positional_given,
            });
        }

        if let Some(unknown) = resolved.names().find(|n| self.get(n).is_none()) {
            return Err(PipelineError::UnknownParameter {
                node: node.to_string(),
                param: unknown.to_string(),
            });
        }

        let mut bound = Params::new();
        for descriptor in &self.params {
            let value = match resolved.get(&descriptor.name).or(descriptor.default.as_ref()) {
                Some(v) => v,
                None => {
                    return Err(PipelineError::MissingArgument {
                        node: node.to_string(),
                        param: descriptor.name.clone(),
                    })
                }
            };
            if !value.fits(descriptor.kind) {
                return Err(PipelineError::ParamType {
                    node: node.to_string(),
                    param: descriptor.name.clone(),
                    expected: descriptor.kind,
                    found: value.kind(),
                });
            }
            let value = match (descriptor.kind, value) {
                (ParamKind::Float, ParamValue::Int(i)) => ParamValue::Float(*i as f64),
                (_, v) => v.clone(),
            };
            bound.insert(descriptor.name.clone(), value);
        }

        Ok(BoundParams(bound))
    }
}

/// Parameters after binding: every declared name present, types checked.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParams(Params);

impl BoundParams {
    pub fn params(&self) -> &Params {
        &self.0
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn str(&self, name: &str) -> anyhow::Result<&str> {
        self.0
            .get(name)
            .and_then(ParamValue::as_str)
            .ok_or_else(|| anyhow::anyhow!("parameter '{}' is not a string", name))
    }

    pub fn int(&self, name: &str) -> anyhow::Result<i64> {
        self.0
            .get(name)
            .and_then(ParamValue::as_int)
            .ok_or_else(|| anyhow::anyhow!("parameter '{}' is not an integer", name))
    }

    pub fn float(&self, name: &str) -> anyhow::Result<f64> {
        self.0
            .get(name)
            .and_then(ParamValue::as_float)
            .ok_or_else(|| anyhow::anyhow!("parameter '{}' is not a number", name))
    }

    pub fn bool(&self, name: &str) -> anyhow::Result<bool> {
        self.0
            .get(name)
            .and_then(ParamValue::as_bool)
            .ok_or_else(|| anyhow::anyhow!("parameter '{}' is not a bool", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig() -> Signature {
        Signature::default()
            .param(ParamDescriptor::required("a", ParamKind::Str))
            .param(ParamDescriptor::optional("b", ParamKind::Int, 10))
    }

    #[test]
    fn test_resolve_binds_positionals_by_name() {
        let resolved = sig().resolve(&["x".into(), 7.into()], &Params::new());
        assert_eq!(resolved.get("a"), Some(&ParamValue::from("x")));
        assert_eq!(resolved.get("b"), Some(&ParamValue::Int(7)));
    }

    #[test]
    fn test_resolve_keyword_overrides_positional() {
        let kwargs: Params = [("b", 99)].into_iter().collect();
        let resolved = sig().resolve(&["x".into(), 7.into()], &kwargs);
        assert_eq!(resolved.get("b"), Some(&ParamValue::Int(99)));
    }

    #[test]
    fn test_resolve_drops_surplus_but_bind_reports_it() {
        let args: Vec<ParamValue> = vec!["x".into(), 1.into(), 2.into()];
        let resolved = sig().resolve(&args, &Params::new());
        assert_eq!(resolved.len(), 2);

        let err = sig().bind("f", &resolved, args.len()).unwrap_err();
        assert!(matches!(err, PipelineError::TooManyArguments { given: 3, .. }));
    }

    #[test]
    fn test_bind_fills_defaults() {
        let resolved = sig().resolve(&["x".into()], &Params::new());
        let bound = sig().bind("f", &resolved, 1).unwrap();
        assert_eq!(bound.int("b").unwrap(), 10);
    }

    #[test]
    fn test_bind_missing_required() {
        let err = sig().bind("f", &Params::new(), 0).unwrap_err();
        assert_eq!(
            err,
            PipelineError::MissingArgument {
                node: "f".into(),
                param: "a".into()
            }
        );
    }

    #[test]
    fn test_bind_unknown_keyword() {
        let kwargs: Params = [("c", 1)].into_iter().collect();
        let resolved = sig().resolve(&["x".into()], &kwargs);
        let err = sig().bind("f", &resolved, 1).unwrap_err();
        assert!(matches!(err, PipelineError::UnknownParameter { .. }));
    }

    #[test]
    fn test_bind_type_mismatch_and_int_widening() {
        let resolved = sig().resolve(&[1.into()], &Params::new());
        assert!(matches!(
            sig().bind("f", &resolved, 1),
            Err(PipelineError::ParamType { .. })
        ));

        let float_sig = Signature::default().param(ParamDescriptor::required("t", ParamKind::Float));
        let resolved = float_sig.resolve(&[2.into()], &Params::new());
        let bound = float_sig.bind("g", &resolved, 1).unwrap();
        assert_eq!(bound.get("t"), Some(&ParamValue::Float(2.0)));
    }
}
