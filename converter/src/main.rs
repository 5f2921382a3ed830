//! csv2batch CLI - Convert CSV files to XML command batches
//!
//! # Main Commands
//!
//! ```bash
//! csv2batch convert input.csv -o batch.xml    # CSV → XML CommandBatch
//! csv2batch convert input.csv -o -            # write the XML to stdout
//! csv2batch mapping input.csv                 # show the column mapping only
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! csv2batch parse input.csv                   # just parse CSV to JSON
//! csv2batch example-config                    # show example config file
//! ```

use clap::{Args, Parser, Subcommand};
use csv2batch::logs::{log_info, log_success, LOG_BROADCASTER};
use csv2batch::{
    convert_file, convert_file_to, parse_assignment, parse_csv_file, preview_file, ConfigFile, ConvertConfig,
    ConvertOutcome, Delimiter, FilterRule, PreviewReport,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "csv2batch")]
#[command(about = "Convert CSV files to XML command batches", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full conversion: CSV → mapping → filter → XML batch
    Convert {
        /// Input CSV file
        input: PathBuf,

        /// Output XML file ("-" for stdout)
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        options: ConvertArgs,
    },

    /// Show how columns map to parameters without writing anything
    Mapping {
        /// Input CSV file
        input: PathBuf,

        #[command(flatten)]
        options: ConvertArgs,
    },

    /// Parse a CSV file and output JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter: a single character, "tab" or "auto"
        #[arg(short, long, default_value = ",")]
        delimiter: Delimiter,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show example configuration file
    ExampleConfig,
}

/// Options shared by `convert` and `mapping`. Flags override the config file.
#[derive(Args)]
struct ConvertArgs {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Command name for rows without one
    #[arg(long, env = "CSV2BATCH_DEFAULT_COMMAND")]
    default_command: Option<String>,

    /// Map a column to parameters: COLUMN=TARGET[|TARGET...] (empty target ignores)
    #[arg(short, long = "map", value_name = "COLUMN=TARGET")]
    map: Vec<String>,

    /// Column to leave out of every command
    #[arg(short, long = "ignore", value_name = "COLUMN")]
    ignore: Vec<String>,

    /// Prefix prepended to a column's values: COLUMN=PREFIX
    #[arg(short, long = "prefix", value_name = "COLUMN=PREFIX")]
    prefix: Vec<String>,

    /// Keep rows matching: Col=v, Col!=v, Col~regex, Col? or !Col? (all must match)
    #[arg(short, long = "filter", value_name = "EXPR")]
    filter: Vec<String>,

    /// CSV delimiter: a single character, "tab" or "auto"
    #[arg(short, long)]
    delimiter: Option<Delimiter>,

    /// Column holding the command name
    #[arg(long, value_name = "NAME")]
    command_column: Option<String>,

    /// Report the mapping and stop before writing
    #[arg(long)]
    preview: bool,

    /// Print nothing to stderr except a fatal error
    #[arg(short, long)]
    quiet: bool,
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert { input, output, options } => cmd_convert(&input, &output, options),

        Commands::Mapping { input, options } => cmd_mapping(&input, options),

        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, delimiter, output.as_deref()),

        Commands::ExampleConfig => cmd_example_config(),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

/// Build the conversion config: config file first, then flags on top.
fn build_config(options: ConvertArgs) -> Result<ConvertConfig, Box<dyn std::error::Error>> {
    if options.quiet {
        LOG_BROADCASTER.set_echo(false);
    }

    let mut file = match &options.config {
        Some(path) => {
            log_info(format!("⚙️  Config: {}", path.display()));
            ConfigFile::load(path)?
        }
        None => ConfigFile::default(),
    };

    // Filters from flags are added to the file's rules
    for expr in &options.filter {
        file.filters.push(FilterRule::parse(expr)?);
    }

    let mut config = file.into_config()?;

    if let Some(name) = options.default_command {
        config = config.with_default_command_name(name);
    }
    for value in &options.map {
        let (column, target) = parse_assignment("--map", value)?;
        config = config.with_mapping(column, target);
    }
    for column in &options.ignore {
        config = config.with_ignored(column);
    }
    for value in &options.prefix {
        let (column, prefix) = parse_assignment("--prefix", value)?;
        config = config.with_prefix(column, prefix);
    }
    if let Some(delimiter) = options.delimiter {
        config = config.with_delimiter(delimiter);
    }
    if let Some(column) = options.command_column {
        config = config.with_command_name_column(column);
    }
    if options.preview {
        config = config.with_preview(true);
    }

    Ok(config)
}

fn cmd_convert(input: &Path, output: &Path, options: ConvertArgs) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = std::io::stdout();
    run_convert(input, output, options, stdout.lock())
}

/// `convert` with the stdout sink injected; used when the output is "-".
fn run_convert<W: Write>(
    input: &Path,
    output: &Path,
    options: ConvertArgs,
    stdout: W,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(options)?;
    log_info(format!("📄 Processing: {}", input.display()));

    if output == Path::new("-") && !config.preview {
        let summary = convert_file_to(input, stdout, &config)?;
        log_success(format!("{} commands written to stdout", summary.commands));
        return Ok(());
    }

    match convert_file(input, output, &config)? {
        ConvertOutcome::Written { path, summary } => {
            log_info("📊 Summary:");
            log_info(format!("   Rows read: {}", summary.rows_read));
            if summary.rows_excluded > 0 {
                log_info(format!("   Rows excluded: {}", summary.rows_excluded));
            }
            log_info(format!("   Commands: {}", summary.commands));
            log_info(format!("   Parameters: {}", summary.parameters));
            log_success(format!("Batch written to: {}", path.display()));
        }
        ConvertOutcome::Preview(report) => print_report(&report),
    }

    Ok(())
}

fn cmd_mapping(input: &Path, options: ConvertArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(options)?.with_preview(true);
    let report = preview_file(input, &config)?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &PreviewReport) {
    log_info("📊 Preview:");
    log_info(format!("   Columns: {}", report.headers.len()));
    log_info(format!("   Mapped: {}", report.mapping.entries().len()));
    log_info(format!("   Ignored: {}", report.mapping.ignored().len()));
    log_info(format!("   Rows: {} ({} excluded)", report.rows_read, report.rows_excluded));
}

fn cmd_parse(input: &Path, delimiter: Delimiter, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let result = parse_csv_file(input, delimiter)?;

    eprintln!(
        "   Delimiter: '{}'{}",
        format_delimiter(result.delimiter),
        if delimiter == Delimiter::Auto { " (auto-detected)" } else { "" }
    );
    eprintln!("   Columns: {}", result.headers.join(", "));
    eprintln!("✅ Parsed {} records", result.rows.len());

    let records: Vec<serde_json::Value> = result.rows.iter().map(|row| row.to_json()).collect();
    let json = serde_json::to_string_pretty(&records)?;
    write_output(&json, output)?;

    Ok(())
}

fn format_delimiter(d: u8) -> String {
    match d {
        b'\t' => "\\t".to_string(),
        c => (c as char).to_string(),
    }
}

fn cmd_example_config() -> Result<(), Box<dyn std::error::Error>> {
    let json = ConfigFile::example().to_json()?;
    println!("{}", json);
    Ok(())
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
