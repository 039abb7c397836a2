//! CLI entry point for `maskspan`.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use maskspan::catalog::CatalogSnapshot;
use maskspan::extractor::SensitiveFieldExtractor;

#[derive(Parser)]
#[command(
    name = "maskspan",
    about = "Annotate PostgreSQL query result columns with the masking levels of their source columns"
)]
struct Cli {
    /// Input SQL files, one statement per file
    #[arg(required_unless_present = "sql")]
    input: Vec<PathBuf>,

    /// Inline SQL statement to analyze
    #[arg(long)]
    sql: Option<String>,

    /// Catalog snapshot JSON file
    #[arg(long)]
    catalog: PathBuf,

    /// Emit results as JSON instead of tab-separated lines
    #[arg(long)]
    json: bool,

    /// Emit the full query span (source columns per result) as JSON
    #[arg(long)]
    spans: bool,

    /// Print verbose diagnostics
    #[arg(long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("maskspan=debug")),
            )
            .init();
    }

    let catalog_json = match std::fs::read_to_string(&cli.catalog) {
        Ok(contents) => contents,
        Err(e) => {
            eprintln!("Error reading catalog file: {e}");
            process::exit(2);
        }
    };
    let catalog: CatalogSnapshot = match serde_json::from_str(&catalog_json) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Error parsing catalog file: {e}");
            process::exit(2);
        }
    };

    // Collect (label, sql) pairs from the inline statement and input files.
    let mut statements: Vec<(String, String)> = Vec::new();
    if let Some(sql) = &cli.sql {
        statements.push(("<inline>".to_string(), sql.clone()));
    }
    for path in &cli.input {
        match std::fs::read_to_string(path) {
            Ok(contents) => statements.push((path.display().to_string(), contents)),
            Err(e) => {
                eprintln!("Error reading {}: {e}", path.display());
                process::exit(2);
            }
        }
    }
    if statements.is_empty() {
        eprintln!("No input SQL provided");
        process::exit(2);
    }

    let mut failed = false;
    for (label, sql) in &statements {
        let mut extractor = SensitiveFieldExtractor::new(&catalog);
        if cli.spans {
            match extractor.extract_span(sql) {
                Ok(Some(span)) => match serde_json::to_string_pretty(&span) {
                    Ok(rendered) => println!("{rendered}"),
                    Err(e) => {
                        eprintln!("{label}: failed to render span: {e}");
                        failed = true;
                    }
                },
                Ok(None) => eprintln!("{label}: skipped (not a query)"),
                Err(e) => {
                    eprintln!("{label}: {e}");
                    failed = true;
                }
            }
            continue;
        }

        match extractor.extract(sql) {
            Ok(Some(columns)) => {
                if cli.json {
                    match serde_json::to_string_pretty(&columns) {
                        Ok(rendered) => println!("{rendered}"),
                        Err(e) => {
                            eprintln!("{label}: failed to render result: {e}");
                            failed = true;
                        }
                    }
                } else {
                    println!("-- {label}");
                    for column in columns {
                        println!("{}\t{}", column.name, column.masking_level);
                    }
                }
            }
            Ok(None) => eprintln!("{label}: skipped (not a query)"),
            Err(e) => {
                eprintln!("{label}: {e}");
                failed = true;
            }
        }
    }

    if failed {
        process::exit(1);
    }
}
