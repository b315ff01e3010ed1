//! Row-wise summation over any number of columns.

use anyhow::ensure;
use compehndly_core::compute::{self, Operand};
use compehndly_core::{Args, FunctionModule, RegistrationTable, Value};

pub const MODULE: FunctionModule = FunctionModule {
    path: module_path!(),
    declare,
};

inventory::submit! { MODULE }

fn declare(table: &mut RegistrationTable) {
    table.register("summation", "0.0.1", "summation_v0_0_1", summation_v0_0_1);
}

/// Sums every positional operand row by row, treating nulls as zero.
///
/// Array operands must share one length. If any array is entirely null the
/// result is an all-null array of that length.
fn summation_v0_0_1(args: &Args) -> anyhow::Result<Value> {
    ensure!(!args.positional().is_empty(), "at least one input is required");
    let operands = args
        .positional()
        .iter()
        .map(Operand::from_value)
        .collect::<Result<Vec<_>, _>>()?;

    let mut length = None;
    for operand in &operands {
        if let Operand::Array(values) = operand {
            ensure!(
                length.is_none_or(|n| n == values.len()),
                "all input arrays must have the same length"
            );
            length = Some(values.len());
        }
    }

    let all_null = operands
        .iter()
        .any(|o| matches!(o, Operand::Array(values) if values.iter().all(Option::is_none)));
    let refs: Vec<&Operand> = operands.iter().collect();
    Ok(compute::zip_n_nullable(&refs, |row| {
        if all_null {
            None
        } else {
            Some(row.iter().flatten().sum())
        }
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use compehndly_core::CanonicalArray;

    fn array(values: &[Option<f64>]) -> Value {
        Value::Array(CanonicalArray::from_f64(values.iter().copied()))
    }

    #[test]
    fn nulls_count_as_zero() {
        let out = summation_v0_0_1(
            &Args::new()
                .arg(array(&[Some(1.0), None, Some(3.0)]))
                .arg(array(&[Some(1.0), Some(2.0), None])),
        )
        .unwrap();
        assert_eq!(out, array(&[Some(2.0), Some(2.0), Some(3.0)]));
    }

    #[test]
    fn an_all_null_input_nulls_the_result() {
        let out = summation_v0_0_1(
            &Args::new()
                .arg(array(&[Some(1.0), Some(2.0)]))
                .arg(array(&[None, None])),
        )
        .unwrap();
        assert_eq!(out, array(&[None, None]));
    }

    #[test]
    fn scalars_sum_to_a_scalar() {
        let out = summation_v0_0_1(&Args::new().arg(1.5).arg(Value::Null).arg(2)).unwrap();
        assert_eq!(out, Value::Float(3.5));
    }

    #[test]
    fn rejects_empty_and_ragged_input() {
        assert!(summation_v0_0_1(&Args::new()).is_err());
        let err = summation_v0_0_1(
            &Args::new()
                .arg(array(&[Some(1.0)]))
                .arg(array(&[Some(1.0), Some(2.0)])),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "all input arrays must have the same length");
    }
}
