//! Render options: the recognised display settings plus a map of
//! kind-specific pass-through parameters.

use crate::error::{ChartError, Result};
use crate::format::TickFormat;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A kind-specific parameter value (`bins`, `kde`, `smooth`, `value`, ...).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Param {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Bool(b) => write!(f, "{}", b),
            Param::Int(i) => write!(f, "{}", i),
            Param::Float(v) => write!(f, "{}", v),
            Param::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Value transform applied to a sample before a distribution chart is drawn.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    Log10,
    Log1p,
    Ln,
    Sqrt,
    Negate,
    /// Caller-supplied function; not available from configuration files.
    #[serde(skip)]
    Custom(fn(f64) -> f64),
}

impl Transform {
    pub fn apply(&self, v: f64) -> f64 {
        match self {
            Transform::Log10 => v.log10(),
            Transform::Log1p => v.ln_1p(),
            Transform::Ln => v.ln(),
            Transform::Sqrt => v.sqrt(),
            Transform::Negate => -v,
            Transform::Custom(f) => f(v),
        }
    }
}

impl FromStr for Transform {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "log10" => Ok(Transform::Log10),
            "log1p" => Ok(Transform::Log1p),
            "ln" | "log" => Ok(Transform::Ln),
            "sqrt" => Ok(Transform::Sqrt),
            "negate" | "neg" => Ok(Transform::Negate),
            other => Err(ChartError::Param(format!("unknown transform '{}'", other))),
        }
    }
}

/// Everything a render call can be configured with besides the data,
/// selectors and chart kind.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Figure size in pixels, used when a new surface is created.
    pub figsize: (u32, u32),
    pub title: Option<String>,
    /// Defaults to the x selector's name.
    pub xlabel: Option<String>,
    /// Defaults to the y selector's name.
    pub ylabel: Option<String>,
    pub alpha: Option<f64>,
    pub hue: Option<String>,
    pub style: Option<String>,
    pub size: Option<String>,
    pub palette: Option<String>,
    pub legend: bool,
    pub xlim: Option<(f64, f64)>,
    pub ylim: Option<(f64, f64)>,
    /// Plain (non-scientific) tick labels on both axes.
    pub plain_format: bool,
    pub grid: bool,
    pub transform: Option<Transform>,
    #[serde(alias = "params")]
    pub extra: BTreeMap<String, Param>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            figsize: (800, 600),
            title: None,
            xlabel: None,
            ylabel: None,
            alpha: None,
            hue: None,
            style: None,
            size: None,
            palette: None,
            legend: true,
            xlim: None,
            ylim: None,
            plain_format: false,
            grid: false,
            transform: None,
            extra: BTreeMap::new(),
        }
    }
}

impl RenderOptions {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn with_param(mut self, key: impl Into<String>, value: Param) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn tick_format(&self) -> TickFormat {
        if self.plain_format {
            TickFormat::Plain
        } else {
            TickFormat::Auto
        }
    }

    pub fn param(&self, key: &str) -> Option<&Param> {
        self.extra.get(key)
    }

    pub fn param_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.param(key) {
            None => Ok(None),
            Some(Param::Bool(b)) => Ok(Some(*b)),
            Some(Param::Int(i)) => Ok(Some(*i != 0)),
            Some(Param::Text(s)) => match s.to_lowercase().as_str() {
                "true" | "yes" | "on" => Ok(Some(true)),
                "false" | "no" | "off" => Ok(Some(false)),
                _ => Err(type_error(key, "a boolean", s)),
            },
            Some(other) => Err(type_error(key, "a boolean", other)),
        }
    }

    pub fn param_usize(&self, key: &str) -> Result<Option<usize>> {
        match self.param(key) {
            None => Ok(None),
            Some(Param::Int(i)) if *i > 0 => Ok(Some(*i as usize)),
            Some(Param::Float(f)) if *f >= 1.0 && f.fract() == 0.0 => Ok(Some(*f as usize)),
            Some(other) => Err(type_error(key, "a positive integer", other)),
        }
    }

    pub fn param_str(&self, key: &str) -> Option<String> {
        self.param(key).map(|p| p.to_string())
    }
}

fn type_error(key: &str, expected: &str, got: impl fmt::Display) -> ChartError {
    ChartError::Param(format!("'{}' must be {}, got '{}'", key, expected, got))
}
