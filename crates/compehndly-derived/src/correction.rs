//! Standardization and correction of biomarker concentrations.
//!
//! Every function accepts scalars or canonical arrays for its column
//! parameters. Nulls propagate row by row, and division follows IEEE float
//! semantics (a zero denominator yields an infinite or NaN result).

use compehndly_core::compute::{self, Operand};
use compehndly_core::{Args, FunctionModule, RegistrationTable, Value};

pub const MODULE: FunctionModule = FunctionModule {
    path: module_path!(),
    declare,
};

inventory::submit! { MODULE }

fn declare(table: &mut RegistrationTable) {
    table.register("standardize", "0.0.1", "standardize_v0_0_1", standardize_v0_0_1);
    table.register(
        "standardize_creatinine",
        "0.0.1",
        "standardize_creatinine_v0_0_1",
        standardize_creatinine_v0_0_1,
    );
    table.register(
        "normalize_specific_gravity",
        "0.0.1",
        "normalize_specific_gravity_v0_0_1",
        normalize_specific_gravity_v0_0_1,
    );
    table.register(
        "total_lipid_concentration",
        "0.0.1",
        "total_lipid_concentration_v0_0_1",
        total_lipid_concentration_v0_0_1,
    );
    table.register(
        "standardize_lipid",
        "0.0.1",
        "standardize_lipid_v0_0_1",
        standardize_lipid_v0_0_1,
    );
}

/// Scalar form of `standardize`: `100 * measured / standard`.
pub fn standardize(measured: f64, standard: f64) -> f64 {
    100.0 * measured / standard
}

/// Scalar form of `normalize_specific_gravity`.
pub fn normalize_specific_gravity(measured: f64, sg_measured: f64, sg_ref: f64) -> f64 {
    measured * (sg_ref - 1.0) / sg_measured
}

/// Total lipids (mg/dL) from cholesterol and triglycerides (mg/dL),
/// after Bernert et al. (2007) and Phillips et al. (1989).
pub fn total_lipid_concentration(chol: f64, trigl: f64) -> f64 {
    2.27 * chol + trigl + 62.3
}

fn ratio(args: &Args, denominator: &str) -> anyhow::Result<Value> {
    let measured = compute::required(args, 0, "measured")?;
    let standard = compute::required(args, 1, denominator)?;
    Ok(compute::zip(&measured, &standard, |m, s| {
        Some(standardize(m, s))
    })?)
}

fn standardize_v0_0_1(args: &Args) -> anyhow::Result<Value> {
    ratio(args, "standard")
}

/// `measured` in µg/L, `crt` in mg/dL.
fn standardize_creatinine_v0_0_1(args: &Args) -> anyhow::Result<Value> {
    ratio(args, "crt")
}

/// `sg_ref` must be a scalar; a null reference nulls the whole result.
fn normalize_specific_gravity_v0_0_1(args: &Args) -> anyhow::Result<Value> {
    let measured = compute::required(args, 0, "measured")?;
    let sg_measured = compute::required(args, 1, "sg_measured")?;
    let sg_ref = Operand::Scalar(compute::scalar(args, 2, "sg_ref")?);
    Ok(compute::zip_n(&[&measured, &sg_measured, &sg_ref], |row| {
        Some(normalize_specific_gravity(row[0], row[1], row[2]))
    })?)
}

fn total_lipid_concentration_v0_0_1(args: &Args) -> anyhow::Result<Value> {
    let chol = compute::required(args, 0, "chol")?;
    let trigl = compute::required(args, 1, "trigl")?;
    Ok(compute::zip(&chol, &trigl, |c, t| {
        Some(total_lipid_concentration(c, t))
    })?)
}

fn standardize_lipid_v0_0_1(args: &Args) -> anyhow::Result<Value> {
    ratio(args, "lipid_value")
}
