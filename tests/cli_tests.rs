//! Integration tests for CLI

#[cfg(feature = "cli")]
use sales_warehouse::cli::CliError;
#[cfg(feature = "cli")]
use sales_warehouse::cli::commands::{
    check::{CheckArgs, handle_check},
    init::{InitArgs, handle_init},
    run::{RunArgs, handle_run, parse_reports},
};
#[cfg(feature = "cli")]
use sales_warehouse::{ReportKind, WarehouseConfig};
#[cfg(feature = "cli")]
use tempfile::TempDir;

#[cfg(feature = "cli")]
fn workspace_with_sources() -> TempDir {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().join("data");
    std::fs::create_dir_all(&data_dir).unwrap();
    std::fs::write(
        data_dir.join("products.csv"),
        "product_id,product_name,category,price\nP0001,Desk Lamp,home,9.99\n",
    )
    .unwrap();
    std::fs::write(
        data_dir.join("customers.csv"),
        "customer_id,name,email,country\nC0001,Ann Lee,ann@example.com,Canada\n",
    )
    .unwrap();
    std::fs::write(
        data_dir.join("sales.csv"),
        "transaction_id,product_id,customer_id,quantity,transaction_date\n\
         T000001,P0001,C0001,3,2024-01-05\n\
         T000002,P0009,C0001,1,2024-01-06\n",
    )
    .unwrap();
    dir
}

#[cfg(feature = "cli")]
fn run_args(dir: &TempDir) -> RunArgs {
    RunArgs {
        workspace: dir.path().to_path_buf(),
        data_dir: None,
        report: "all".to_string(),
        as_of: chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        format: "json".to_string(),
        backend: Some("memory".to_string()),
        conflict_policy: None,
        show_rejected: false,
    }
}

#[cfg(feature = "cli")]
#[test]
fn test_cli_init_then_run() {
    let dir = workspace_with_sources();

    handle_init(&InitArgs {
        dir: dir.path().to_path_buf(),
        force: false,
    })
    .unwrap();
    assert!(WarehouseConfig::exists(dir.path()));

    let result = handle_run(&run_args(&dir));
    assert!(result.is_ok(), "run should succeed: {:?}", result.err());
}

#[cfg(feature = "cli")]
#[test]
fn test_cli_run_show_rejected() {
    let dir = workspace_with_sources();
    let mut args = run_args(&dir);
    args.show_rejected = true;
    args.format = "csv".to_string();

    let result = handle_run(&args);
    assert!(result.is_ok(), "run should succeed: {:?}", result.err());
}

#[cfg(feature = "cli")]
#[test]
fn test_cli_init_refuses_overwrite() {
    let dir = TempDir::new().unwrap();
    let args = InitArgs {
        dir: dir.path().to_path_buf(),
        force: false,
    };

    handle_init(&args).unwrap();
    assert!(matches!(
        handle_init(&args),
        Err(CliError::InvalidArgument(_))
    ));
    assert!(
        handle_init(&InitArgs {
            force: true,
            ..args
        })
        .is_ok()
    );
}

#[cfg(feature = "cli")]
#[test]
fn test_cli_check() {
    let dir = workspace_with_sources();

    for format in ["table", "json"] {
        let result = handle_check(&CheckArgs {
            workspace: dir.path().to_path_buf(),
            data_dir: None,
            format: format.to_string(),
        });
        assert!(result.is_ok(), "check should succeed for format: {}", format);
    }
}

#[cfg(feature = "cli")]
#[test]
fn test_cli_run_missing_sources() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        handle_run(&run_args(&dir)),
        Err(CliError::Staging(_))
    ));
}

#[cfg(feature = "cli")]
#[test]
fn test_cli_run_rejects_bad_arguments() {
    let dir = workspace_with_sources();

    let mut args = run_args(&dir);
    args.report = "best-sellers".to_string();
    assert!(matches!(handle_run(&args), Err(CliError::InvalidArgument(_))));

    let mut args = run_args(&dir);
    args.conflict_policy = Some("newest".to_string());
    assert!(matches!(handle_run(&args), Err(CliError::InvalidArgument(_))));

    let mut args = run_args(&dir);
    args.format = "xml".to_string();
    assert!(matches!(handle_run(&args), Err(CliError::InvalidArgument(_))));
}

#[cfg(feature = "cli")]
#[test]
fn test_cli_parse_reports() {
    assert_eq!(parse_reports("all").unwrap(), ReportKind::ALL.to_vec());
    assert_eq!(
        parse_reports("top-products,monthly-revenue").unwrap(),
        vec![ReportKind::TopProducts, ReportKind::MonthlyRevenue]
    );
}

#[cfg(all(feature = "cli", feature = "duckdb-backend"))]
#[test]
fn test_cli_run_duckdb() {
    let dir = workspace_with_sources();
    let mut args = run_args(&dir);
    args.backend = Some("duckdb".to_string());

    let result = handle_run(&args);
    assert!(result.is_ok(), "duckdb run should succeed: {:?}", result.err());
    assert!(dir.path().join(".warehouse.duckdb").exists());
}
