use polars::prelude::*;

use super::{ArrayAdapter, BASE_ADAPTER};
use crate::error::ConversionError;
use crate::value::{CanonicalArray, NativeValue, Value};

/// Fallback adapter. Scalars and canonical arrays pass through and generic
/// sequences are copied into a canonical array. Results stay canonical.
///
/// It claims no value type of its own, so detection never picks it.
#[derive(Debug, Default, Clone, Copy)]
pub struct BaseAdapter;

impl ArrayAdapter for BaseAdapter {
    fn name(&self) -> &'static str {
        BASE_ADAPTER
    }

    fn matches(&self, _value: &Value) -> bool {
        false
    }

    fn to_canonical(&self, value: Value) -> Result<Value, ConversionError> {
        match value {
            Value::Native(native) => sequence_to_canonical(BASE_ADAPTER, &native).map(Value::Array),
            other => Ok(other),
        }
    }

    fn from_canonical(&self, value: Value) -> Result<Value, ConversionError> {
        Ok(value)
    }
}

/// Copies a generic native sequence into a canonical array.
///
/// Polars series are wrapped without copying.
pub(crate) fn sequence_to_canonical(
    adapter: &'static str,
    native: &NativeValue,
) -> Result<CanonicalArray, ConversionError> {
    let series = if let Some(series) = native.downcast_ref::<Series>() {
        series.clone()
    } else if let Some(values) = native.downcast_ref::<Vec<f64>>() {
        Series::new(PlSmallStr::EMPTY, values.as_slice())
    } else if let Some(values) = native.downcast_ref::<Vec<Option<f64>>>() {
        Series::new(PlSmallStr::EMPTY, values.as_slice())
    } else if let Some(values) = native.downcast_ref::<Vec<i64>>() {
        Series::new(PlSmallStr::EMPTY, values.as_slice())
    } else if let Some(values) = native.downcast_ref::<Vec<Option<i64>>>() {
        Series::new(PlSmallStr::EMPTY, values.as_slice())
    } else if let Some(values) = native.downcast_ref::<Vec<bool>>() {
        Series::new(PlSmallStr::EMPTY, values.as_slice())
    } else if let Some(values) = native.downcast_ref::<Vec<Option<bool>>>() {
        Series::new(PlSmallStr::EMPTY, values.as_slice())
    } else if let Some(values) = native.downcast_ref::<Vec<String>>() {
        Series::new(PlSmallStr::EMPTY, values.as_slice())
    } else if let Some(values) = native.downcast_ref::<Vec<Option<String>>>() {
        Series::new(PlSmallStr::EMPTY, values.as_slice())
    } else {
        return Err(ConversionError::Unsupported {
            adapter,
            type_name: native.type_name(),
        });
    };
    Ok(CanonicalArray::from_series(series))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_pass_through_both_ways() {
        let adapter = BaseAdapter;
        for value in [
            Value::Int(3),
            Value::Float(2.5),
            Value::Bool(true),
            Value::from("x"),
            Value::Null,
        ] {
            let canonical = adapter.to_canonical(value.clone()).unwrap();
            assert_eq!(canonical, value);
            assert_eq!(adapter.from_canonical(canonical).unwrap(), value);
        }
    }

    #[test]
    fn vectors_are_copied_into_arrays() {
        let out = BaseAdapter
            .to_canonical(Value::from(vec![1.0, 2.0]))
            .unwrap();
        assert_eq!(
            out,
            Value::Array(CanonicalArray::from_f64([Some(1.0), Some(2.0)]))
        );
    }

    #[test]
    fn results_stay_canonical() {
        let array = Value::Array(CanonicalArray::from_f64([Some(1.0)]));
        assert_eq!(BaseAdapter.from_canonical(array.clone()).unwrap(), array);
    }

    #[test]
    fn matches_nothing() {
        for value in [
            Value::Float(1.0),
            Value::Null,
            Value::Array(CanonicalArray::from_f64([Some(1.0)])),
            Value::from(vec![1.0, 2.0]),
        ] {
            assert!(!BaseAdapter.matches(&value));
        }
    }

    #[test]
    fn unknown_native_type_is_rejected() {
        let err = BaseAdapter
            .to_canonical(Value::native(std::collections::HashMap::<u8, u8>::new()))
            .unwrap_err();
        assert!(matches!(
            err,
            ConversionError::Unsupported { adapter: "base", .. }
        ));
    }
}
