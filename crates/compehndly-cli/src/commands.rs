use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use polars::prelude::Series;
use tracing::{debug, info};

use compehndly_core::{
    Args, CanonicalArray, FunctionLookup, Manifest, ModuleCatalog, RegistryConfig, Value,
    adapter_registry, build_from_config, build_manifest,
};

use crate::cli::{CallArgs, FunctionsArgs, ManifestBuildArgs};

/// Every unit linked into the binary.
///
/// The derived units are named explicitly so they are present even when the
/// linker would otherwise drop their discovery entries.
pub fn catalog() -> ModuleCatalog {
    let mut catalog = ModuleCatalog::discover();
    for module in compehndly_derived::MODULES {
        catalog.insert(module);
    }
    catalog
}

pub fn run_manifest_build(args: &ManifestBuildArgs) -> Result<(PathBuf, Manifest)> {
    let path = match &args.path {
        Some(path) => path.clone(),
        None => RegistryConfig::from_env()?.manifest_path,
    };
    let manifest = build_manifest(&catalog(), &path)?;
    Ok((path, manifest))
}

pub fn run_functions(args: &FunctionsArgs) -> Result<Table> {
    run_functions_with(args, RegistryConfig::from_env()?)
}

/// [`run_functions`] against an explicit configuration.
pub fn run_functions_with(args: &FunctionsArgs, config: RegistryConfig) -> Result<Table> {
    let registry = registry(config, args.adapter.as_deref())?;
    Ok(functions_table(registry.as_ref()))
}

pub fn run_call(args: &CallArgs) -> Result<String> {
    run_call_with(args, RegistryConfig::from_env()?)
}

/// [`run_call`] against an explicit configuration; `--adapter` still wins.
pub fn run_call_with(args: &CallArgs, config: RegistryConfig) -> Result<String> {
    let registry = registry(config, args.adapter.as_deref())?;
    let function = registry.get(&args.name, args.version.as_deref())?;
    let call_args = parse_args(&args.values, &args.keywords);
    debug!(
        function = %args.name,
        adapter = function.adapter_name(),
        arguments = call_args.len(),
        "calling"
    );
    let out = function
        .call(call_args)
        .with_context(|| format!("call {}", args.name))?;
    Ok(format_value(&out))
}

fn registry(
    mut config: RegistryConfig,
    adapter: Option<&str>,
) -> Result<Arc<dyn FunctionLookup>> {
    if let Some(adapter) = adapter {
        config = config.with_adapter(adapter);
    }
    info!(strategy = %config.strategy, adapter = ?config.adapter_name(), "building registry");
    Ok(build_from_config(&config, catalog(), adapter_registry())?)
}

pub fn functions_table(registry: &dyn FunctionLookup) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Function"), header_cell("Versions")]);
    apply_table_style(&mut table);
    for name in registry.function_names() {
        let versions = registry.list_versions(&name).join(", ");
        table.add_row(vec![Cell::new(name), Cell::new(versions)]);
    }
    table
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(100);
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Builds call arguments from command-line text.
pub fn parse_args(values: &[String], keywords: &[(String, String)]) -> Args {
    let mut args: Args = values.iter().map(|text| parse_value(text)).collect();
    for (key, text) in keywords {
        args.set_keyword(key.clone(), parse_value(text));
    }
    args
}

/// `null`, `true`/`false`, integers and floats parse as scalars; text with a
/// comma becomes a float array if every entry is a number, empty or `null`.
/// Anything else stays a string.
pub fn parse_value(text: &str) -> Value {
    let trimmed = text.trim();
    match trimmed {
        "null" => return Value::Null,
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::Int(int);
    }
    if let Ok(float) = trimmed.parse::<f64>() {
        return Value::Float(float);
    }
    if trimmed.contains(',')
        && let Some(values) = parse_float_list(trimmed)
    {
        return Value::Array(CanonicalArray::from_f64(values));
    }
    Value::Str(text.to_string())
}

fn parse_float_list(text: &str) -> Option<Vec<Option<f64>>> {
    text.split(',')
        .map(|item| match item.trim() {
            "" | "null" => Some(None),
            number => number.parse::<f64>().ok().map(Some),
        })
        .collect()
}

/// Renders a call result for the terminal.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Str(s) => s.clone(),
        Value::Array(array) => match array.to_f64_vec() {
            Ok(values) => format_list(
                values
                    .iter()
                    .map(|v| v.map_or_else(|| "null".to_string(), |f| f.to_string())),
            ),
            Err(_) => array.as_series().to_string(),
        },
        Value::Native(native) => {
            if let Some(series) = native.downcast_ref::<Series>() {
                series.to_string()
            } else if let Some(values) = native.downcast_ref::<Vec<f64>>() {
                format_list(values.iter().map(ToString::to_string))
            } else {
                format!("<{}>", native.type_name())
            }
        }
    }
}

fn format_list(items: impl Iterator<Item = String>) -> String {
    format!("[{}]", items.collect::<Vec<_>>().join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_parse_by_shape() {
        assert_eq!(parse_value("null"), Value::Null);
        assert_eq!(parse_value("true"), Value::Bool(true));
        assert_eq!(parse_value("-3"), Value::Int(-3));
        assert_eq!(parse_value("2.5"), Value::Float(2.5));
        assert_eq!(parse_value("crt"), Value::Str("crt".to_string()));
        assert_eq!(
            parse_value("1, ,null,4"),
            Value::Array(CanonicalArray::from_f64([Some(1.0), None, None, Some(4.0)]))
        );
        assert_eq!(parse_value("a,b"), Value::Str("a,b".to_string()));
    }

    #[test]
    fn keywords_land_beside_positionals() {
        let args = parse_args(
            &["0.1".to_string()],
            &[("loq".to_string(), "1".to_string())],
        );
        assert_eq!(args.positional(), &[Value::Float(0.1)]);
        assert_eq!(args.keyword("loq"), Some(&Value::Int(1)));
    }

    #[test]
    fn arrays_render_nulls() {
        let value = Value::Array(CanonicalArray::from_f64([Some(1.5), None]));
        assert_eq!(format_value(&value), "[1.5, null]");
        assert_eq!(format_value(&Value::native(vec![2.0, f64::NAN])), "[2, NaN]");
        assert_eq!(format_value(&Value::Int(7)), "7");
    }
}
