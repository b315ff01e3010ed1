use polars::prelude::*;

use super::base::sequence_to_canonical;
use super::{AdapterProvider, ArrayAdapter};
use crate::error::ConversionError;
use crate::value::{CanonicalArray, Value};

const NAME: &str = "polars";

/// Adapter for labeled one-dimensional polars series.
///
/// Both directions share the underlying buffers; no data is copied.
#[derive(Debug, Default, Clone, Copy)]
pub struct SeriesAdapter;

impl ArrayAdapter for SeriesAdapter {
    fn name(&self) -> &'static str {
        NAME
    }

    fn matches(&self, value: &Value) -> bool {
        matches!(value, Value::Native(native) if native.is::<Series>())
    }

    fn to_canonical(&self, value: Value) -> Result<Value, ConversionError> {
        match value {
            Value::Native(native) => match native.downcast_ref::<Series>() {
                Some(series) => Ok(Value::Array(CanonicalArray::from_series(series.clone()))),
                None => sequence_to_canonical(NAME, &native).map(Value::Array),
            },
            other => Ok(other),
        }
    }

    fn from_canonical(&self, value: Value) -> Result<Value, ConversionError> {
        match value {
            Value::Array(array) => Ok(Value::native(array.into_series())),
            other => Ok(other),
        }
    }
}

fn load() -> Result<Box<dyn ArrayAdapter>, String> {
    Ok(Box::new(SeriesAdapter))
}

inventory::submit! {
    AdapterProvider { name: NAME, load }
}
