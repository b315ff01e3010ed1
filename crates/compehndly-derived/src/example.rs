//! `add_one`, the two-version example unit.

use anyhow::Context;
use compehndly_core::compute::{self, Operand};
use compehndly_core::{Args, FunctionModule, RegistrationTable, Value};

pub const MODULE: FunctionModule = FunctionModule {
    path: module_path!(),
    declare,
};

inventory::submit! { MODULE }

fn declare(table: &mut RegistrationTable) {
    table.register("add_one", "0.0.1", "add_one_v0_0_1", add_one_v0_0_1);
    table.register("add_one", "0.1.0", "add_one_v0_1_0", add_one_v0_1_0);
}

/// `x + 1`; integer scalars stay integers.
fn add_one_v0_0_1(args: &Args) -> anyhow::Result<Value> {
    if let Some(Value::Int(x)) = args.param(0, "x") {
        let next = x.checked_add(1).context("add_one overflows i64")?;
        return Ok(Value::Int(next));
    }
    let x = compute::required(args, 0, "x")?;
    Ok(compute::map(&x, |v| Some(v + 1.0)))
}

/// `x + 1` for positive `x`, otherwise `0`.
fn add_one_v0_1_0(args: &Args) -> anyhow::Result<Value> {
    if let Some(Value::Int(x)) = args.param(0, "x") {
        if *x <= 0 {
            return Ok(Value::Int(0));
        }
        let next = x.checked_add(1).context("add_one overflows i64")?;
        return Ok(Value::Int(next));
    }
    let x: Operand = compute::required(args, 0, "x")?;
    Ok(compute::map(&x, |v| Some(if v > 0.0 { v + 1.0 } else { 0.0 })))
}
