//! Strategy parameter schemas and best-effort coercion of raw values

use crate::error::{Result, TabcompareError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Raw, caller-supplied parameter values
pub type RawParams = IndexMap<String, Json>;

/// Kind of a declared parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Bool,
    Int,
    Float,
    String,
    Enum,
}

/// Declaration of one strategy parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub kind: ParamKind,
    pub default: Json,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl ParamSpec {
    /// Coerce a raw value to this parameter's kind, `None` if it cannot be
    pub fn coerce(&self, raw: &Json) -> Option<Json> {
        match self.kind {
            ParamKind::Bool => coerce_bool(raw).map(Json::Bool),
            ParamKind::Int => coerce_int(raw).map(Json::from),
            ParamKind::Float => coerce_float(raw).and_then(|f| serde_json::Number::from_f64(f).map(Json::Number)),
            ParamKind::String => coerce_string(raw).map(Json::String),
            ParamKind::Enum => {
                let text = coerce_string(raw)?;
                self.options
                    .iter()
                    .find(|opt| opt.eq_ignore_ascii_case(text.trim()))
                    .map(|opt| Json::String(opt.clone()))
            }
        }
    }
}

fn coerce_bool(raw: &Json) -> Option<bool> {
    match raw {
        Json::Bool(b) => Some(*b),
        Json::Number(n) => match n.as_f64() {
            Some(v) if v == 0.0 => Some(false),
            Some(v) if v == 1.0 => Some(true),
            _ => None,
        },
        Json::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_int(raw: &Json) -> Option<i64> {
    match raw {
        Json::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Json::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }
}

fn integral(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn coerce_float(raw: &Json) -> Option<f64> {
    let value = match raw {
        Json::Number(n) => n.as_f64(),
        Json::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    value.is_finite().then_some(value)
}

fn coerce_string(raw: &Json) -> Option<String> {
    match raw {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        Json::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Ordered set of parameter declarations for one strategy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSchema(IndexMap<String, ParamSpec>);

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bool(self, name: &str, default: bool, description: &str) -> Self {
        self.with(name, ParamKind::Bool, Json::Bool(default), description, Vec::new())
    }

    pub fn int(self, name: &str, default: i64, description: &str) -> Self {
        self.with(name, ParamKind::Int, Json::from(default), description, Vec::new())
    }

    pub fn float(self, name: &str, default: f64, description: &str) -> Self {
        let default = serde_json::Number::from_f64(default)
            .map(Json::Number)
            .unwrap_or(Json::Null);
        self.with(name, ParamKind::Float, default, description, Vec::new())
    }

    pub fn string(self, name: &str, default: &str, description: &str) -> Self {
        self.with(name, ParamKind::String, Json::from(default), description, Vec::new())
    }

    pub fn choice(self, name: &str, default: &str, options: &[&str], description: &str) -> Self {
        let options = options.iter().map(|o| o.to_string()).collect();
        self.with(name, ParamKind::Enum, Json::from(default), description, options)
    }

    fn with(
        mut self,
        name: &str,
        kind: ParamKind,
        default: Json,
        description: &str,
        options: Vec<String>,
    ) -> Self {
        self.0.insert(
            name.to_string(),
            ParamSpec {
                kind,
                default,
                description: description.to_string(),
                options,
            },
        );
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.0.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ParamSpec> {
        self.0.get_mut(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamSpec)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check that every default satisfies its own kind
    pub fn validate(&self) -> Result<()> {
        for (name, spec) in &self.0 {
            if spec.kind == ParamKind::Enum && spec.options.is_empty() {
                return Err(TabcompareError::parameter_schema(format!(
                    "enum parameter '{}' declares no options",
                    name
                )));
            }
            let valid = match (spec.kind, &spec.default) {
                (ParamKind::Bool, Json::Bool(_)) => true,
                (ParamKind::Int, Json::Number(n)) => n.is_i64(),
                (ParamKind::Float, Json::Number(_)) => true,
                (ParamKind::String, Json::String(_)) => true,
                (ParamKind::Enum, Json::String(s)) => spec.options.contains(s),
                _ => false,
            };
            if !valid {
                return Err(TabcompareError::parameter_schema(format!(
                    "default {} of parameter '{}' does not satisfy kind {:?}",
                    spec.default, name, spec.kind
                )));
            }
        }
        Ok(())
    }

    /// Coerce raw values against this schema.
    ///
    /// Every declared parameter ends up in the result; values that are
    /// missing take the default silently, values that cannot be coerced take
    /// the default and are listed in `fallbacks`.
    pub fn resolve(&self, raw: &RawParams) -> ResolvedParams {
        let mut values = IndexMap::new();
        let mut fallbacks = Vec::new();

        for (name, spec) in &self.0 {
            let value = match raw.get(name) {
                None => spec.default.clone(),
                Some(supplied) => match spec.coerce(supplied) {
                    Some(coerced) => coerced,
                    None => {
                        log::warn!(
                            "Parameter '{}': cannot use {} as {:?}, falling back to {}",
                            name,
                            supplied,
                            spec.kind,
                            spec.default
                        );
                        fallbacks.push(name.clone());
                        spec.default.clone()
                    }
                },
            };
            values.insert(name.clone(), value);
        }

        for name in raw.keys().filter(|k| !self.0.contains_key(*k)) {
            log::debug!("Ignoring undeclared parameter '{}'", name);
        }

        ResolvedParams {
            params: Parameters(values),
            fallbacks,
        }
    }
}

/// Outcome of resolving raw parameters
#[derive(Debug, Clone)]
pub struct ResolvedParams {
    pub params: Parameters,
    pub fallbacks: Vec<String>,
}

/// Effective, typed parameter values for one comparison call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(IndexMap<String, Json>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: &str, value: impl Into<Json>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Json> {
        self.0.get(name)
    }

    pub fn bool_or(&self, name: &str, default: bool) -> bool {
        self.get(name).and_then(coerce_bool).unwrap_or(default)
    }

    pub fn float_or(&self, name: &str, default: f64) -> f64 {
        self.get(name).and_then(coerce_float).unwrap_or(default)
    }

    pub fn str_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).and_then(Json::as_str).unwrap_or(default)
    }

    /// A comma-separated string parameter split into trimmed, non-empty items
    pub fn list(&self, name: &str) -> Vec<String> {
        self.str_or(name, "")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn to_json(&self) -> Json {
        Json::Object(self.0.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

impl From<IndexMap<String, Json>> for Parameters {
    fn from(map: IndexMap<String, Json>) -> Self {
        Self(map)
    }
}
