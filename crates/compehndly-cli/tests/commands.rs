use clap::Parser;

use compehndly_cli::cli::{Cli, Command, FunctionsArgs, ManifestBuildArgs, ManifestCommand};
use compehndly_cli::commands::{
    catalog, functions_table, run_call_with, run_functions_with, run_manifest_build,
};
use compehndly_core::{
    Manifest, RegistryConfig, RegistryStrategy, adapter_registry, build_registry,
};

fn call_with(config: RegistryConfig, argv: &[&str]) -> anyhow::Result<String> {
    let cli = Cli::try_parse_from(std::iter::once("compehndly").chain(argv.iter().copied()))?;
    let Command::Call(args) = cli.command else {
        panic!("expected call");
    };
    run_call_with(&args, config)
}

/// Calls through an eager registry regardless of the environment.
fn call(argv: &[&str]) -> anyhow::Result<String> {
    call_with(RegistryConfig::default(), argv)
}

#[test]
fn manifest_build_writes_every_derived_function() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("manifest.json");
    let (written, manifest) = run_manifest_build(&ManifestBuildArgs {
        path: Some(path.clone()),
    })
    .unwrap();
    assert_eq!(written, path);
    assert_eq!(Manifest::load(&path).unwrap(), manifest);
    let add_one = manifest.get("add_one").unwrap();
    insta::assert_json_snapshot!(add_one, @r#"
    {
      "0.0.1": {
        "module": "compehndly_derived::example",
        "function": "add_one_v0_0_1"
      },
      "0.1.0": {
        "module": "compehndly_derived::example",
        "function": "add_one_v0_1_0"
      }
    }
    "#);
}

#[test]
fn functions_table_lists_versions_ascending() {
    let catalog = catalog();
    let locators: Vec<&str> = catalog.modules().collect();
    let registry = build_registry(&locators, None, &catalog, adapter_registry()).unwrap();
    let rendered = functions_table(&registry).to_string();
    assert!(rendered.contains("add_one"));
    assert!(rendered.contains("0.0.1, 0.1.0"));
    assert!(rendered.contains("medium_bound_imputation_array"));
}

#[test]
fn call_prints_scalar_and_array_results() {
    assert_eq!(call(&["call", "add_one", "--adapter", "base", "-5"]).unwrap(), "0");
    assert_eq!(
        call(&["call", "add_one", "--adapter", "base", "--version", "0.0.1", "-5"]).unwrap(),
        "-4"
    );
    assert_eq!(
        call(&[
            "call",
            "medium_bound_imputation",
            "--adapter",
            "base",
            "--kw",
            "loq=2",
            "--kw",
            "lod=1",
            "0.1,1.2,,5",
        ])
        .unwrap(),
        "[0.5, 1.5, null, 5]"
    );
}

#[test]
fn call_reports_unknown_names_and_bad_limits() {
    let err = call(&["call", "no_such_function", "--adapter", "base"]).unwrap_err();
    assert!(err.to_string().contains("no_such_function"));

    let err = call(&["call", "medium_bound_imputation", "--adapter", "base", "1", "0"])
        .unwrap_err();
    assert_eq!(format!("{err:#}"), "call medium_bound_imputation: loq must be > 0");
}

#[test]
fn call_uses_the_given_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("manifest.json");
    let lazy = RegistryConfig::default()
        .with_strategy(RegistryStrategy::Lazy)
        .with_manifest_path(&path);
    assert_eq!(call_with(lazy, &["call", "add_one", "4"]).unwrap(), "5");
    assert!(Manifest::load(&path).unwrap().get("add_one").is_some());

    let suppressed = RegistryConfig::default()
        .with_strategy(RegistryStrategy::Lazy)
        .with_manifest_path(dir.path().join("absent.json"))
        .with_no_manifest_rebuild(true);
    assert!(call_with(suppressed, &["call", "add_one", "4"]).is_err());
    assert!(!dir.path().join("absent.json").exists());

    let err = call_with(
        RegistryConfig::default().with_adapter("base"),
        &["call", "add_one", "--adapter", "no_such_adapter", "4"],
    )
    .unwrap_err();
    assert!(err.to_string().contains("no_such_adapter"));
}

#[test]
fn functions_run_against_an_explicit_configuration() {
    let table = run_functions_with(&FunctionsArgs { adapter: None }, RegistryConfig::default())
        .unwrap()
        .to_string();
    assert!(table.contains("standardize_creatinine"));
}

#[test]
fn manifest_subcommand_parses() {
    let cli = Cli::try_parse_from(["compehndly", "-v", "manifest", "build"]).unwrap();
    assert!(matches!(
        cli.command,
        Command::Manifest(ManifestCommand::Build(ManifestBuildArgs { path: None }))
    ));
}
