//! Medium-bound imputation of left-censored measurements.
//!
//! Values below the limit of detection (LOD) become `lod / 2`; values
//! between LOD and the limit of quantification (LOQ) become the midpoint
//! `(lod + loq) / 2`. Without an LOD, values below LOQ become `loq / 2`.
//! Everything else is returned unchanged.

use anyhow::{bail, ensure};
use compehndly_core::compute::{self, Operand};
use compehndly_core::{Args, FunctionModule, RegistrationTable, Value};

pub const MODULE: FunctionModule = FunctionModule {
    path: module_path!(),
    declare,
};

inventory::submit! { MODULE }

fn declare(table: &mut RegistrationTable) {
    table.register(
        "medium_bound_imputation",
        "0.0.1",
        "medium_bound_imputation_v0_0_1",
        medium_bound_imputation_v0_0_1,
    );
    table.register(
        "medium_bound_imputation_array",
        "0.0.1",
        "medium_bound_imputation_array_v0_0_1",
        medium_bound_imputation_array_v0_0_1,
    );
}

/// Imputes one measurement.
pub fn medium_bound(measurement: f64, loq: f64, lod: Option<f64>) -> f64 {
    match lod {
        None if measurement < loq => loq / 2.0,
        None => measurement,
        Some(lod) if measurement < lod => lod / 2.0,
        Some(lod) if measurement < loq => (lod + loq) / 2.0,
        Some(_) => measurement,
    }
}

/// Scalar `loq` and optional scalar `lod`.
fn medium_bound_imputation_v0_0_1(args: &Args) -> anyhow::Result<Value> {
    let measurement = compute::required(args, 0, "measurement")?;
    let Some(loq) = compute::scalar(args, 1, "loq")? else {
        bail!("loq must not be null");
    };
    ensure!(loq > 0.0, "loq must be > 0");

    let lod = match compute::optional(args, 2, "lod")? {
        None => None,
        Some(Operand::Scalar(lod)) => lod,
        Some(Operand::Array(_)) => bail!("lod must be a scalar"),
    };
    if let Some(lod) = lod {
        ensure!(lod > 0.0, "lod must be > 0");
        ensure!(lod < loq, "lod must be < loq");
    }

    Ok(compute::map(&measurement, |m| Some(medium_bound(m, loq, lod))))
}

/// Row-wise `loq` and optional `lod` arrays of the measurement's length.
fn medium_bound_imputation_array_v0_0_1(args: &Args) -> anyhow::Result<Value> {
    let measurement = compute::required(args, 0, "measurement")?;
    let length = array_len(&measurement, "measurement")?;

    let loq = compute::required(args, 1, "loq")?;
    ensure!(
        array_len(&loq, "loq")? == length,
        "measurement and loq must have the same length"
    );

    match compute::optional(args, 2, "lod")? {
        None => Ok(compute::zip(&measurement, &loq, |m, loq| {
            Some(medium_bound(m, loq, None))
        })?),
        Some(lod) => {
            ensure!(
                array_len(&lod, "lod")? == length,
                "measurement and lod must have the same length"
            );
            Ok(compute::zip_n(&[&measurement, &loq, &lod], |row| {
                Some(medium_bound(row[0], row[1], Some(row[2])))
            })?)
        }
    }
}

fn array_len(operand: &Operand, name: &str) -> anyhow::Result<usize> {
    match operand {
        Operand::Array(values) => Ok(values.len()),
        Operand::Scalar(_) => bail!("{name} must be an array"),
    }
}
