//! specsplit CLI - extract embedded coefficients from specification files
//!
//! # Main Commands
//!
//! ```bash
//! specsplit convert input.csv      # Write spec.csv and coefficients.csv
//! specsplit serve                  # Start HTTP server (port 3000)
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! specsplit parse input.csv        # Show the loaded table as JSON
//! specsplit labels "Walk time"     # Show derived labels
//! ```

use clap::{Parser, Subcommand};
use specsplit::api::logs::{log_info_indent, log_success};
use specsplit::{
    convert_to_files, normalize_labels, parse_csv_file, transform::pipeline::format_delimiter,
    ConvertOptions, COEFFICIENTS_FILE_NAME, SPEC_FILE_NAME,
};
use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "specsplit")]
#[command(about = "Split utility specification files into spec and coefficients tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a specification with literal coefficients
    Convert {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Directory for both outputs (default: the input's directory)
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Specification output file (default: <out-dir>/spec.csv)
        #[arg(long)]
        spec_out: Option<PathBuf>,

        /// Coefficients output file (default: <out-dir>/coefficients.csv)
        #[arg(long)]
        coefficients_out: Option<PathBuf>,

        /// Prefix of generated labels
        #[arg(long, default_value = "util_")]
        label_prefix: String,

        /// Keep rows without coefficients in the specification output
        #[arg(long)]
        keep_empty_rows: bool,
    },

    /// Print the labels derived from descriptions (reads stdin lines if none given)
    Labels {
        /// Descriptions to normalize
        descriptions: Vec<String>,
    },

    /// Load a specification file and output it as JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            input,
            delimiter,
            out_dir,
            spec_out,
            coefficients_out,
            label_prefix,
            keep_empty_rows,
        } => {
            let options = ConvertOptions {
                delimiter,
                label_prefix,
                keep_rows_without_coefficients: keep_empty_rows,
                ..ConvertOptions::default()
            };
            cmd_convert(
                &input,
                &options,
                out_dir.as_deref(),
                spec_out.as_deref(),
                coefficients_out.as_deref(),
            )
        }

        Commands::Labels { descriptions } => cmd_labels(descriptions),

        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, delimiter, output.as_deref()),

        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_convert(
    input: &Path,
    options: &ConvertOptions,
    out_dir: Option<&Path>,
    spec_out: Option<&Path>,
    coefficients_out: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let dir = out_dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    let spec_path = spec_out.map(Path::to_path_buf).unwrap_or_else(|| dir.join(SPEC_FILE_NAME));
    let coefficients_path = coefficients_out
        .map(Path::to_path_buf)
        .unwrap_or_else(|| dir.join(COEFFICIENTS_FILE_NAME));

    for out in [&spec_path, &coefficients_path] {
        if same_file(input, out) {
            return Err(format!("refusing to overwrite input file {}", out.display()).into());
        }
    }

    if let Some(dir) = out_dir {
        fs::create_dir_all(dir)?;
    }
    let result = convert_to_files(input, options, &spec_path, &coefficients_path)?;

    log_success(format!(
        "💾 {} rows → {}",
        result.spec.rows.len(),
        spec_path.display()
    ));
    log_success(format!(
        "💾 {} coefficients ({} constrained) → {}",
        result.coefficients.len(),
        result.constrained_count,
        coefficients_path.display()
    ));
    eprintln!("\n✨ Done!");
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn cmd_labels(descriptions: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let descriptions = if descriptions.is_empty() {
        std::io::stdin().lock().lines().collect::<Result<Vec<_>, _>>()?
    } else {
        descriptions
    };

    for label in normalize_labels(&descriptions) {
        println!("{}", label);
    }
    Ok(())
}

fn cmd_parse(
    input: &Path,
    delimiter: Option<char>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let result = parse_csv_file(input, delimiter)?;

    log_success(format!("Encoding: {}", result.encoding));
    log_success(format!(
        "Delimiter: '{}'{}",
        format_delimiter(result.delimiter),
        if delimiter.is_none() { " (auto-detected)" } else { "" }
    ));
    log_success(format!("Segment columns ({}):", result.table.segment_columns.len()));
    for (i, col) in result.table.segment_columns.iter().enumerate() {
        log_info_indent(format!("[{:2}] {}", i + 1, col), 1);
    }
    log_success(format!("Parsed {} rows", result.table.rows.len()));

    let json = serde_json::to_string_pretty(&result.table)?;
    write_output(&json, output)?;

    Ok(())
}

async fn cmd_serve(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    specsplit::server::start_server(port).await
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
