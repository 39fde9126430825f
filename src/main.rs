//! Trellis - headless CLI for the grid engine.
//!
//! Loads a sheet, optionally evaluates a coordinate or exports a table to
//! CSV, and exits. The interactive surfaces live outside this repository;
//! this binary is the reference consumer of the document API.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use trellis_core::{Coord, Document, Settings, Value};

fn print_usage() {
    eprintln!("Usage: trellis [OPTIONS] [FILE]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  [FILE]                    Sheet file to open (.trl)");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -e, --eval <R,C,T>        Evaluate one coordinate and print its value");
    eprintln!("  -o, --output <FILE>       Export a table to CSV (non-interactive)");
    eprintln!("  -t, --table <N>           Table to export (default: 0)");
    eprintln!("  -h, --help                Print help");
}

fn parse_coord(spec: &str) -> Option<Coord> {
    let parts: Vec<&str> = spec.split(',').collect();
    if parts.len() != 3 {
        return None;
    }
    Some(Coord::new(
        parts[0].trim().parse().ok()?,
        parts[1].trim().parse().ok()?,
        parts[2].trim().parse().ok()?,
    ))
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut file_path: Option<PathBuf> = None;
    let mut eval_target: Option<Coord> = None;
    let mut output_file: Option<PathBuf> = None;
    let mut table = 0usize;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                return;
            }
            "-e" | "--eval" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --eval requires a R,C,T coordinate");
                    std::process::exit(1);
                }
                match parse_coord(&args[i]) {
                    Some(coord) => eval_target = Some(coord),
                    None => {
                        eprintln!("Error: invalid coordinate: {}", args[i]);
                        std::process::exit(1);
                    }
                }
            }
            "-o" | "--output" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --output requires a file path");
                    std::process::exit(1);
                }
                output_file = Some(PathBuf::from(&args[i]));
            }
            "-t" | "--table" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("Error: --table requires a number");
                    std::process::exit(1);
                }
                match args[i].parse() {
                    Ok(n) => table = n,
                    Err(_) => {
                        eprintln!("Error: invalid table number: {}", args[i]);
                        std::process::exit(1);
                    }
                }
            }
            arg if arg.starts_with('-') => {
                eprintln!("Error: unknown option: {}", arg);
                print_usage();
                std::process::exit(1);
            }
            arg => {
                if file_path.is_some() {
                    eprintln!("Error: multiple files given");
                    std::process::exit(1);
                }
                file_path = Some(PathBuf::from(arg));
            }
        }
        i += 1;
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(file_path, eval_target, output_file, table) {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn load_settings() -> Result<Settings> {
    let Some(dirs) = directories::ProjectDirs::from("", "", "trellis") else {
        return Ok(Settings::default());
    };
    let path = dirs.config_dir().join("settings.toml");
    if !path.exists() {
        return Ok(Settings::default());
    }
    Settings::load(&path).with_context(|| format!("reading {}", path.display()))
}

fn run(
    file_path: Option<PathBuf>,
    eval_target: Option<Coord>,
    output_file: Option<PathBuf>,
    table: usize,
) -> Result<()> {
    let settings = load_settings()?;
    let doc = Document::with_file(file_path.clone(), &settings)
        .with_context(|| "opening sheet".to_string())?;

    if let Some(coord) = eval_target {
        match doc.evaluate(coord) {
            Value::Error(err) => {
                println!("{}", err.marker());
                eprintln!("{}: {}", coord, err);
            }
            value => println!("{}", trellis_core::format_value(&value)),
        }
    }

    if let Some(out) = &output_file {
        doc.export_csv(out, table)
            .with_context(|| format!("exporting table {} to {}", table, out.display()))?;
        info!(path = %out.display(), table, "table exported");
    }

    if eval_target.is_none() && output_file.is_none() {
        let bounds = doc.bounds();
        println!("{}: {} cells, bounds {}",
            file_path
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(new sheet)".to_string()),
            doc.ctx.grid.len(),
            bounds
        );
    }

    Ok(())
}
