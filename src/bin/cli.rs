use chrono::NaiveDate;
use polars::prelude::{AnyValue, DataFrame};
use resource_engine::frames;
use resource_engine::logging;
use resource_engine::repository::{CsvDirectoryRepository, InMemoryRepository, load_dataset_from_json};
use resource_engine::{CapacityEngine, EngineConfig, GroupBy};
use serde::Serialize;
use std::env;
use std::path::Path;
use std::process::ExitCode;
use tracing::info;

fn format_cell(av: &AnyValue) -> String {
    match av {
        AnyValue::Null => String::new(),
        AnyValue::Float64(v) => format!("{v:.2}"),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        _ => av.to_string(),
    }
}

fn render_df_as_text_table(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let col_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();

    let mut rows: Vec<Vec<String>> = Vec::with_capacity(df.height());
    for row_idx in 0..df.height() {
        let row = columns
            .iter()
            .map(|col| col.get(row_idx).map(|av| format_cell(&av)).unwrap_or_default())
            .collect();
        rows.push(row);
    }

    let mut widths: Vec<usize> = col_names.iter().map(|n| n.len()).collect();
    for row in &rows {
        for (ci, value) in row.iter().enumerate() {
            widths[ci] = widths[ci].max(value.len());
        }
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let render_row = |values: &[String]| -> String {
        let mut line = String::from("|");
        for (ci, value) in values.iter().enumerate() {
            line.push(' ');
            line.push_str(value);
            line.push_str(&" ".repeat(widths[ci].saturating_sub(value.len())));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&col_names));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in &rows {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out.push_str(&sep);
    out
}

fn usage() -> &'static str {
    "Usage: cli [--table] [--config <file.json>] <command> [args]\n\nCommands:\n  conflicts <dataset> [resource_id]                 Over-allocation episodes\n  histogram <dataset> <resource_id> <start> <end>   Daily load vs capacity\n  distribute <total> <start> <end> [curve]          Spread a quantity along a curve\n  s-curve <dataset> [day|week|month]                Cumulative cost and EVM metrics\n  commodity <dataset> [day|week|month]              Planned cost by resource category\n  help                                              Show this help\n\n<dataset> is a JSON dataset file, a directory of CSV files, or (with sqlite) a .db file.\nDates are YYYY-MM-DD."
}

struct Options {
    table: bool,
    config_path: Option<String>,
    args: Vec<String>,
}

fn parse_options(raw: Vec<String>) -> Result<Options, String> {
    let mut options = Options {
        table: false,
        config_path: None,
        args: Vec::new(),
    };
    let mut iter = raw.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--table" => options.table = true,
            "--config" => {
                options.config_path = Some(iter.next().ok_or("--config needs a file path")?);
            }
            _ => options.args.push(arg),
        }
    }
    Ok(options)
}

fn load_config(path: Option<&str>) -> Result<EngineConfig, String> {
    let config = match path {
        Some(path) => EngineConfig::from_json_file(path).map_err(|e| e.to_string())?,
        None => EngineConfig::default(),
    };
    config.with_env_overrides().map_err(|e| e.to_string())
}

fn load_engine(config: EngineConfig, dataset: &str) -> Result<CapacityEngine, String> {
    let path = Path::new(dataset);
    if !path.exists() {
        return Err(format!("{dataset}: no such file or directory"));
    }
    let engine = if path.is_dir() {
        CapacityEngine::load(config, &CsvDirectoryRepository::new(path))
    } else if is_sqlite_path(path) {
        load_sqlite(config, path)
    } else {
        load_dataset_from_json(path)
            .and_then(|dataset| CapacityEngine::load(config, &InMemoryRepository::from(dataset)))
    };
    engine.map_err(|e| format!("{dataset}: {e}"))
}

fn is_sqlite_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("db" | "sqlite" | "sqlite3")
    )
}

#[cfg(feature = "sqlite")]
fn load_sqlite(
    config: EngineConfig,
    path: &Path,
) -> resource_engine::repository::RepositoryResult<CapacityEngine> {
    let repository = resource_engine::repository::SqliteRepository::open(path)?;
    CapacityEngine::load(config, &repository)
}

#[cfg(not(feature = "sqlite"))]
fn load_sqlite(
    _config: EngineConfig,
    _path: &Path,
) -> resource_engine::repository::RepositoryResult<CapacityEngine> {
    Err(resource_engine::repository::RepositoryError::InvalidData(
        "built without sqlite support".into(),
    ))
}

fn parse_date(input: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{input}' (expected YYYY-MM-DD)"))
}

fn parse_group_by(input: Option<&String>) -> Result<GroupBy, String> {
    input.map(|s| s.parse()).unwrap_or(Ok(GroupBy::Day))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| e.to_string())
}

fn to_table(df: polars::prelude::PolarsResult<DataFrame>) -> Result<String, String> {
    df.map(|df| render_df_as_text_table(&df))
        .map_err(|e| e.to_string())
}

fn run(raw: Vec<String>) -> Result<String, String> {
    let options = parse_options(raw)?;
    let args = &options.args;
    let Some(command) = args.first() else {
        return Err(usage().to_string());
    };
    let config = load_config(options.config_path.as_deref())?;
    info!(command = command.as_str(), "running command");

    match command.as_str() {
        "help" | "--help" | "-h" => Ok(usage().to_string()),
        "conflicts" => {
            let dataset = args.get(1).ok_or("Usage: conflicts <dataset> [resource_id]")?;
            let engine = load_engine(config, dataset)?;
            let report = engine
                .detect_conflicts(args.get(2).map(String::as_str))
                .map_err(|e| e.to_string())?;
            if options.table {
                let mut out = to_table(frames::conflicts_frame(&report.episodes))?;
                for diagnostic in &report.diagnostics {
                    out.push_str(&format!(
                        "\nskipped {}: {}",
                        diagnostic.resource_id, diagnostic.reason
                    ));
                }
                Ok(out)
            } else {
                to_json(&report)
            }
        }
        "histogram" => {
            let (Some(dataset), Some(resource_id), Some(start), Some(end)) =
                (args.get(1), args.get(2), args.get(3), args.get(4))
            else {
                return Err("Usage: histogram <dataset> <resource_id> <start> <end>".into());
            };
            let engine = load_engine(config, dataset)?;
            let points = engine
                .build_histogram(resource_id, parse_date(start)?, parse_date(end)?)
                .map_err(|e| e.to_string())?;
            if options.table {
                to_table(frames::histogram_frame(&points))
            } else {
                to_json(&points)
            }
        }
        "distribute" => {
            let (Some(total), Some(start), Some(end)) = (args.get(1), args.get(2), args.get(3))
            else {
                return Err("Usage: distribute <total> <start> <end> [curve]".into());
            };
            let total: f64 = total
                .parse()
                .map_err(|_| format!("invalid total '{total}'"))?;
            let engine = CapacityEngine::new(config);
            let curve = engine
                .resolve_curve(args.get(4).map(String::as_str))
                .map_err(|e| e.to_string())?;
            let increments = engine
                .distribute(total, parse_date(start)?, parse_date(end)?, &curve)
                .map_err(|e| e.to_string())?;
            if options.table {
                to_table(frames::increments_frame(&increments))
            } else {
                to_json(&increments)
            }
        }
        "s-curve" => {
            let dataset = args.get(1).ok_or("Usage: s-curve <dataset> [day|week|month]")?;
            let group_by = parse_group_by(args.get(2))?;
            let engine = load_engine(config, dataset)?;
            let curve = engine.build_s_curve(group_by);
            if options.table {
                to_table(frames::s_curve_frame(&curve))
            } else {
                to_json(&curve)
            }
        }
        "commodity" => {
            let dataset = args.get(1).ok_or("Usage: commodity <dataset> [day|week|month]")?;
            let group_by = parse_group_by(args.get(2))?;
            let engine = load_engine(config, dataset)?;
            let curves = engine.build_commodity_curves(group_by);
            if options.table {
                to_table(frames::commodity_frame(&curves))
            } else {
                to_json(&curves)
            }
        }
        other => Err(format!("Unknown command '{other}'.\n\n{}", usage())),
    }
}

fn main() -> ExitCode {
    logging::init();
    match run(env::args().skip(1).collect()) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("Error: {message}");
            ExitCode::FAILURE
        }
    }
}
