//! Argument and result values exchanged with registered functions.
//!
//! Implementations only ever see [`Value::Array`] (a [`CanonicalArray`]) or
//! plain scalars. Adapters translate [`Value::Native`] inputs into that form
//! and translate results back.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use polars::prelude::*;

/// Immutable, null-aware, homogeneously typed column shared by reference.
#[derive(Debug, Clone)]
pub struct CanonicalArray {
    series: Series,
}

impl CanonicalArray {
    /// Wraps a series without copying its buffers.
    pub fn from_series(series: Series) -> Self {
        Self { series }
    }

    pub fn from_f64<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        let chunked: Float64Chunked = values.into_iter().collect();
        Self::from_series(chunked.into_series())
    }

    pub fn as_series(&self) -> &Series {
        &self.series
    }

    pub fn into_series(self) -> Series {
        self.series
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn dtype(&self) -> &DataType {
        self.series.dtype()
    }

    pub fn null_count(&self) -> usize {
        self.series.null_count()
    }

    /// Returns the values as `f64`, casting integer columns.
    pub fn to_f64_vec(&self) -> PolarsResult<Vec<Option<f64>>> {
        let cast = self.series.cast(&DataType::Float64)?;
        Ok(cast.f64()?.into_iter().collect())
    }
}

impl PartialEq for CanonicalArray {
    fn eq(&self, other: &Self) -> bool {
        self.series.dtype() == other.series.dtype() && self.series.equals_missing(&other.series)
    }
}

/// A value owned by a native array library, kept opaque until an adapter claims it.
#[derive(Clone)]
pub struct NativeValue {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl NativeValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: type_name::<T>(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }
}

impl fmt::Debug for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeValue<{}>", self.type_name)
    }
}

/// Dynamically typed argument or result.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(CanonicalArray),
    Native(NativeValue),
}

impl Value {
    pub fn native<T: Any + Send + Sync>(value: T) -> Self {
        Self::Native(NativeValue::new(value))
    }

    /// True for `Null`, booleans, numbers and strings.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::Null | Self::Bool(_) | Self::Int(_) | Self::Float(_) | Self::Str(_)
        )
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&CanonicalArray> {
        match self {
            Self::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn downcast_native<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Native(native) => native.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Short description used in error messages.
    pub fn kind(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(_) => "bool".to_string(),
            Self::Int(_) => "int".to_string(),
            Self::Float(_) => "float".to_string(),
            Self::Str(_) => "string".to_string(),
            Self::Array(array) => format!("array<{}>", array.dtype()),
            Self::Native(native) => native.type_name().to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Native(a), Self::Native(b)) => Arc::ptr_eq(&a.inner, &b.inner),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl From<CanonicalArray> for Value {
    fn from(v: CanonicalArray) -> Self {
        Self::Array(v)
    }
}

impl From<Series> for Value {
    fn from(v: Series) -> Self {
        Self::native(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Self::native(v)
    }
}

impl From<Vec<Option<f64>>> for Value {
    fn from(v: Vec<Option<f64>>) -> Self {
        Self::native(v)
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Self::native(v)
    }
}

/// Positional and keyword arguments for one call.
///
/// Keyword order is preserved; duplicate keyword names replace the earlier value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    positional: Vec<Value>,
    keyword: Vec<(String, Value)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    #[must_use]
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_keyword(name.into(), value.into());
        self
    }

    pub fn push(&mut self, value: Value) {
        self.positional.push(value);
    }

    pub fn set_keyword(&mut self, name: String, value: Value) {
        if let Some(slot) = self.keyword.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = value;
        } else {
            self.keyword.push((name, value));
        }
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn keywords(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.keyword.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.positional.get(index)
    }

    pub fn keyword(&self, name: &str) -> Option<&Value> {
        self.keyword.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Looks up a parameter passed either by keyword or at `index`.
    ///
    /// Keyword wins when both are present.
    pub fn param(&self, index: usize, name: &str) -> Option<&Value> {
        self.keyword(name).or_else(|| self.get(index))
    }

    pub fn len(&self) -> usize {
        self.positional.len() + self.keyword.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }

    /// Rebuilds the arguments by applying `f` to every value, keeping names and order.
    pub fn try_map<E>(self, mut f: impl FnMut(Value) -> Result<Value, E>) -> Result<Self, E> {
        let positional = self
            .positional
            .into_iter()
            .map(&mut f)
            .collect::<Result<Vec<_>, E>>()?;
        let keyword = self
            .keyword
            .into_iter()
            .map(|(k, v)| f(v).map(|v| (k, v)))
            .collect::<Result<Vec<_>, E>>()?;
        Ok(Self {
            positional,
            keyword,
        })
    }
}

impl FromIterator<Value> for Args {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self {
            positional: iter.into_iter().collect(),
            keyword: Vec::new(),
        }
    }
}
