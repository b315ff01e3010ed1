//! Null-aware numeric kernels over canonical values.
//!
//! Operands are either numeric scalars or canonical arrays. Arrays of length
//! one broadcast against longer arrays; any other length difference is an
//! error. When every operand is a scalar the result is a scalar as well.
//! Nulls propagate: a null input yields a null output for that row.

use polars::prelude::*;

use crate::error::ComputeError;
use crate::value::{Args, CanonicalArray, Value};

/// A numeric operand materialized as `f64` values.
#[derive(Debug, Clone)]
pub enum Operand {
    Scalar(Option<f64>),
    Array(Vec<Option<f64>>),
}

impl Operand {
    pub fn from_value(value: &Value) -> Result<Self, ComputeError> {
        match value {
            Value::Null => Ok(Self::Scalar(None)),
            Value::Int(v) => Ok(Self::Scalar(Some(*v as f64))),
            Value::Float(v) => Ok(Self::Scalar(Some(*v))),
            Value::Array(array) => {
                if !is_numeric_dtype(array.dtype()) {
                    return Err(ComputeError::NotNumeric {
                        found: value.kind(),
                    });
                }
                Ok(Self::Array(array.to_f64_vec()?))
            }
            other => Err(ComputeError::NotNumeric {
                found: other.kind(),
            }),
        }
    }

    fn len(&self) -> Option<usize> {
        match self {
            Self::Scalar(_) => None,
            Self::Array(values) => Some(values.len()),
        }
    }

    fn at(&self, row: usize) -> Option<f64> {
        match self {
            Self::Scalar(v) => *v,
            Self::Array(values) if values.len() == 1 => values[0],
            Self::Array(values) => values.get(row).copied().flatten(),
        }
    }
}

/// Fetches a required numeric parameter by position or keyword.
pub fn required(args: &Args, index: usize, name: &str) -> Result<Operand, ComputeError> {
    let value = args
        .param(index, name)
        .ok_or_else(|| ComputeError::MissingArgument {
            name: name.to_string(),
        })?;
    Operand::from_value(value)
}

/// Fetches an optional numeric parameter; an explicit null counts as absent.
pub fn optional(args: &Args, index: usize, name: &str) -> Result<Option<Operand>, ComputeError> {
    match args.param(index, name) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Operand::from_value(value).map(Some),
    }
}

/// Fetches a scalar parameter that must not be an array.
pub fn scalar(args: &Args, index: usize, name: &str) -> Result<Option<f64>, ComputeError> {
    match required(args, index, name)? {
        Operand::Scalar(v) => Ok(v),
        Operand::Array(_) => Err(ComputeError::NotNumeric {
            found: format!("array for scalar parameter '{name}'"),
        }),
    }
}

fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float64
            | DataType::Float32
            | DataType::Int64
            | DataType::Int32
            | DataType::UInt64
            | DataType::UInt32
            | DataType::Null
    )
}

fn broadcast_len(operands: &[&Operand]) -> Result<Option<usize>, ComputeError> {
    let mut len: Option<usize> = None;
    for operand in operands {
        let Some(n) = operand.len() else {
            continue;
        };
        len = match len {
            None => Some(n),
            Some(current) if current == n || n == 1 => Some(current),
            Some(1) => Some(n),
            Some(current) => {
                return Err(ComputeError::LengthMismatch {
                    left: current,
                    right: n,
                });
            }
        };
    }
    Ok(len)
}

fn finish(len: Option<usize>, row: impl Fn(usize) -> Option<f64>) -> Value {
    match len {
        None => row(0).map_or(Value::Null, Value::Float),
        Some(n) => {
            let chunked: Float64Chunked = (0..n).map(row).collect();
            Value::Array(CanonicalArray::from_series(chunked.into_series()))
        }
    }
}

/// Applies `f` to every non-null element.
pub fn map(operand: &Operand, f: impl Fn(f64) -> Option<f64>) -> Value {
    let len = operand.len();
    finish(len, |i| operand.at(i).and_then(&f))
}

/// Combines two operands row by row.
pub fn zip(
    lhs: &Operand,
    rhs: &Operand,
    f: impl Fn(f64, f64) -> Option<f64>,
) -> Result<Value, ComputeError> {
    let len = broadcast_len(&[lhs, rhs])?;
    Ok(finish(len, |i| match (lhs.at(i), rhs.at(i)) {
        (Some(a), Some(b)) => f(a, b),
        _ => None,
    }))
}

/// Combines any number of operands row by row; `f` receives the row values
/// only when none of them is null.
pub fn zip_n(
    operands: &[&Operand],
    f: impl Fn(&[f64]) -> Option<f64>,
) -> Result<Value, ComputeError> {
    let len = broadcast_len(operands)?;
    Ok(finish(len, |i| {
        let row: Option<Vec<f64>> = operands.iter().map(|o| o.at(i)).collect();
        row.and_then(|values| f(&values))
    }))
}

/// Same as [`zip_n`] but `f` also sees nulls, for rules with optional columns.
pub fn zip_n_nullable(
    operands: &[&Operand],
    f: impl Fn(&[Option<f64>]) -> Option<f64>,
) -> Result<Value, ComputeError> {
    let len = broadcast_len(operands)?;
    Ok(finish(len, |i| {
        let row: Vec<Option<f64>> = operands.iter().map(|o| o.at(i)).collect();
        f(&row)
    }))
}
