mod cli;

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use fastlite::report::PragmaReport;
use fastlite::{ConnectionOptions, ConnectionPool, PoolConfig};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "fastlite=trace,fastlite_db=trace,fastlite_core=debug".to_string()
        } else {
            "fastlite=info,fastlite_db=warn,fastlite_core=warn".to_string()
        }
    });

    // Logs go to stderr; stdout carries query output.
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Bench { data_source, count } => {
            bench(&data_source, count, cli.config.as_deref())
        }
        Commands::Exec { data_source, sql } => exec(&data_source, &sql, cli.config.as_deref()),
        Commands::Pragmas { data_source, json } => {
            pragmas(&data_source, json, cli.config.as_deref())
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("fastlite {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn open_pool(data_source: &str, config_path: Option<&Path>) -> Result<Arc<ConnectionPool>> {
    let options = ConnectionOptions::parse(data_source)?;
    let config = PoolConfig::load_or_default(config_path);
    tracing::info!("Opening pool for {}", options);
    let pool = ConnectionPool::with_config(options, config)
        .with_context(|| format!("Failed to open pool for '{data_source}'"))?;
    Ok(Arc::new(pool))
}

fn bench(data_source: &str, count: u32, config_path: Option<&Path>) -> Result<()> {
    let pool = open_pool(data_source, config_path)?;

    let fast = {
        let mut query = pool.fast_query("SELECT ?1")?;
        let started = Instant::now();
        let mut sum = 0i64;
        for i in 0..count {
            query.binder().bind_int64(1, i64::from(i));
            sum += query.step(|has_row, row, _| if has_row { row.column_int64(0) } else { 0 }, ())?;
            query.reset();
        }
        tracing::debug!("Fast path checksum {sum}");
        started.elapsed()
    };

    let connection = pool.rent()?;
    let facade = {
        let mut command = connection.create_command("SELECT @value");
        command.prepare()?;
        let started = Instant::now();
        let mut sum = 0i64;
        for i in 0..count {
            command.parameters_mut().add("@value", i64::from(i));
            if let Some(value) = command.execute_scalar()? {
                sum += value.as_i64().unwrap_or(0);
            }
        }
        tracing::debug!("Facade checksum {sum}");
        started.elapsed()
    };
    pool.release(connection)?;

    println!("Executions:   {count}");
    println!("Fast query:   {} ms ({})", fast.as_millis(), per_op(fast, count));
    println!("Command:      {} ms ({})", facade.as_millis(), per_op(facade, count));
    Ok(())
}

fn per_op(elapsed: Duration, count: u32) -> String {
    if count == 0 {
        return "n/a".to_string();
    }
    format!("{} ns/op", elapsed.as_nanos() / u128::from(count))
}

fn exec(data_source: &str, sql: &str, config_path: Option<&Path>) -> Result<()> {
    let pool = open_pool(data_source, config_path)?;
    let connection = pool.rent()?;

    let affected = {
        let mut command = connection.create_command(sql);
        let mut reader = command.execute_reader()?;
        loop {
            if reader.field_count() > 0 {
                while reader.read()? {
                    let mut cells = Vec::with_capacity(reader.field_count());
                    for i in 0..reader.field_count() {
                        cells.push(reader.get_value(i)?.to_string());
                    }
                    println!("{}", cells.join("\t"));
                }
            }
            if !reader.next_result() {
                break;
            }
        }
        reader.records_affected()
    };
    pool.release(connection)?;

    if affected >= 0 {
        println!("{affected} rows affected");
    }
    Ok(())
}

fn pragmas(data_source: &str, json: bool, config_path: Option<&Path>) -> Result<()> {
    let pool = open_pool(data_source, config_path)?;
    let connection = pool.rent()?;
    let report = PragmaReport::read(&connection);
    pool.release(connection)?;
    let report = report?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
        for diff in report.differences(&pool.config().pragmas) {
            println!("! {diff}");
        }
    }
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let contents = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read {}", p.display()))?;
            PoolConfig::from_json(&contents)?
        }
        None => {
            println!("No config file specified, using defaults");
            PoolConfig::default()
        }
    };

    let warnings = config.validate();
    if warnings.is_empty() {
        println!("✓ Configuration is valid");
    } else {
        for warning in &warnings {
            println!("⚠ {warning}");
        }
    }
    println!("  Capacity: {}", config.capacity);
    println!("  Warm: {}", config.warm);
    println!("  Step timeout: {} ms", config.step_timeout_ms);
    println!("  Prepare timeout: {} ms", config.prepare_timeout_ms);
    println!("  Pragmas: {}", config.pragmas.to_sql().replace('\n', " "));

    Ok(())
}
