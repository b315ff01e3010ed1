use polars::prelude::*;

use super::base::sequence_to_canonical;
use super::{AdapterProvider, ArrayAdapter};
use crate::error::ConversionError;
use crate::value::Value;

const NAME: &str = "buffer";

/// Adapter for contiguous numeric buffers (`Vec<f64>` and friends).
///
/// Numeric results come back as `Vec<f64>` with nulls mapped to NaN;
/// boolean and string results as `Vec<Option<bool>>` / `Vec<Option<String>>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BufferAdapter;

impl ArrayAdapter for BufferAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn matches(&self, value: &Value) -> bool {
        let Value::Native(native) = value else {
            return false;
        };
        native.is::<Vec<f64>>() || native.is::<Vec<Option<f64>>>() || native.is::<Vec<i64>>()
    }

    fn to_canonical(&self, value: Value) -> Result<Value, ConversionError> {
        match value {
            Value::Native(native) => sequence_to_canonical(NAME, &native).map(Value::Array),
            other => Ok(other),
        }
    }

    fn from_canonical(&self, value: Value) -> Result<Value, ConversionError> {
        let array = match value {
            Value::Array(array) => array,
            other => return Ok(other),
        };
        let series = array.as_series();
        match series.dtype() {
            DataType::Boolean => {
                let values: Vec<Option<bool>> = series.bool()?.into_iter().collect();
                Ok(Value::native(values))
            }
            DataType::String => {
                let values: Vec<Option<String>> = series
                    .str()?
                    .into_iter()
                    .map(|v| v.map(str::to_string))
                    .collect();
                Ok(Value::native(values))
            }
            DataType::Float64
            | DataType::Float32
            | DataType::Int64
            | DataType::Int32
            | DataType::UInt64
            | DataType::UInt32
            | DataType::Null => {
                let values: Vec<f64> = array
                    .to_f64_vec()?
                    .into_iter()
                    .map(|v| v.unwrap_or(f64::NAN))
                    .collect();
                Ok(Value::native(values))
            }
            other => Err(ConversionError::UnsupportedDtype {
                adapter: NAME,
                dtype: other.to_string(),
            }),
        }
    }
}

fn load() -> Result<Box<dyn ArrayAdapter>, String> {
    Ok(Box::new(BufferAdapter))
}

inventory::submit! {
    AdapterProvider { name: NAME, load }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::CanonicalArray;

    #[test]
    fn matches_numeric_vectors_only() {
        assert!(BufferAdapter.matches(&Value::from(vec![1.0, 2.0])));
        assert!(BufferAdapter.matches(&Value::from(vec![1_i64])));
        assert!(!BufferAdapter.matches(&Value::Float(1.0)));
        assert!(!BufferAdapter.matches(&Value::native(vec!["a".to_string()])));
    }

    #[test]
    fn nulls_become_nan() {
        let array = Value::Array(CanonicalArray::from_f64([Some(1.5), None]));
        let native = BufferAdapter.from_canonical(array).unwrap();
        let values = native.downcast_native::<Vec<f64>>().unwrap();
        assert_eq!(values[0], 1.5);
        assert!(values[1].is_nan());
    }

    #[test]
    fn round_trips_numeric_buffer() {
        let canonical = BufferAdapter
            .to_canonical(Value::from(vec![1.0, 2.0, 3.0]))
            .unwrap();
        assert!(matches!(canonical, Value::Array(_)));
        let back = BufferAdapter.from_canonical(canonical).unwrap();
        assert_eq!(back.downcast_native::<Vec<f64>>(), Some(&vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn booleans_keep_nulls() {
        let series = Series::new("".into(), &[Some(true), None]);
        let native = BufferAdapter
            .from_canonical(Value::Array(CanonicalArray::from_series(series)))
            .unwrap();
        assert_eq!(
            native.downcast_native::<Vec<Option<bool>>>(),
            Some(&vec![Some(true), None])
        );
    }
}
