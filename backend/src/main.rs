//! Trendrank CLI - trends and rankings from CSV exports
//!
//! # Commands
//!
//! ```bash
//! trendrank parse ta_20240101.csv                 # Load a table, print rows as JSON
//! trendrank temperature ta_20240101.csv           # Yearly means and trend
//! trendrank mbti rank countries.csv -c INFP       # Top countries for one type
//! trendrank mbti profile countries.csv --country Chile
//! trendrank mbti global countries.csv             # Average share per type
//! ```
//!
//! Defaults come from `TRENDRANK_*` environment variables (a `.env` file is
//! read first); flags override them. Set `RUST_LOG=info` to see pipeline logs.

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use trendrank::config::split_list;
use trendrank::transform::pipeline::format_delimiter;
use trendrank::{
    load_path, run_global_average, run_mbti, run_profile, run_temperature, Category,
    Completeness, DisplayNames, MbtiOptions, PipelineConfig, Source, TemperatureOptions,
};

#[derive(Parser)]
#[command(name = "trendrank")]
#[command(about = "Trends and rankings from regional CSV exports", long_about = None)]
struct Cli {
    /// Encoding candidates, tried in order (comma separated; "auto" detects)
    #[arg(long, global = true)]
    encodings: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a CSV file and output its rows as JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Yearly mean values and their linear trend
    Temperature {
        /// Input CSV file
        input: PathBuf,

        /// Date column name
        #[arg(long)]
        date_column: Option<String>,

        /// Value column name
        #[arg(long)]
        value_column: Option<String>,

        /// Periods averaged at each end of the series
        #[arg(long)]
        window: Option<usize>,

        /// Slopes within this distance of zero count as flat
        #[arg(long)]
        flat_epsilon: Option<f64>,

        /// Output file for the report (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Per-country personality type shares
    Mbti {
        #[command(subcommand)]
        action: MbtiAction,
    },
}

#[derive(Subcommand)]
enum MbtiAction {
    /// Rank countries by one type
    Rank {
        #[command(flatten)]
        common: MbtiArgs,

        /// Type to rank by (e.g. INFP)
        #[arg(short, long)]
        category: Category,

        /// Number of countries in the top slice
        #[arg(short, long)]
        top: Option<usize>,
    },

    /// Type distribution of one country
    Profile {
        #[command(flatten)]
        common: MbtiArgs,
    },

    /// Average share of every type across countries
    Global {
        #[command(flatten)]
        common: MbtiArgs,
    },
}

#[derive(Args)]
struct MbtiArgs {
    /// Input CSV file
    input: PathBuf,

    /// Country identifier column name
    #[arg(long)]
    country_column: Option<String>,

    /// Reference country; repeat for alternative spellings
    #[arg(long = "country")]
    countries: Vec<String>,

    /// JSON object mapping country identifiers to display names
    #[arg(long, conflicts_with = "korean")]
    names: Option<PathBuf>,

    /// Show country names in Korean
    #[arg(long)]
    korean: bool,

    /// Output file for the report (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> CliResult {
    let mut config = PipelineConfig::from_env()?;
    if let Some(ref encodings) = cli.encodings {
        config.encodings = split_list(encodings, ',');
        if config.encodings.is_empty() {
            return Err("--encodings needs at least one label".into());
        }
    }
    dispatch(cli.command, config)
}

fn dispatch(command: Commands, mut config: PipelineConfig) -> CliResult {
    match command {
        Commands::Parse { input, output } => cmd_parse(&input, &config, output.as_deref()),

        Commands::Temperature {
            input,
            date_column,
            value_column,
            window,
            flat_epsilon,
            output,
        } => {
            if let Some(c) = date_column {
                config.date_column = c;
            }
            if let Some(c) = value_column {
                config.value_column = c;
            }
            if let Some(w) = window {
                if w == 0 {
                    return Err("--window must be at least 1".into());
                }
                config.window = w;
            }
            if let Some(eps) = flat_epsilon {
                if !eps.is_finite() || eps < 0.0 {
                    return Err("--flat-epsilon must be a non-negative number".into());
                }
                config.flat_epsilon = eps;
            }
            cmd_temperature(&input, &config, output.as_deref())
        }

        Commands::Mbti { action } => match action {
            MbtiAction::Rank { common, category, top } => {
                if let Some(n) = top {
                    config.top_n = n;
                }
                apply_mbti_args(&mut config, &common);
                cmd_mbti_rank(&common, &config, category)
            }
            MbtiAction::Profile { common } => {
                apply_mbti_args(&mut config, &common);
                cmd_mbti_profile(&common, &config)
            }
            MbtiAction::Global { common } => {
                apply_mbti_args(&mut config, &common);
                cmd_mbti_global(&common, &config)
            }
        },
    }
}

fn apply_mbti_args(config: &mut PipelineConfig, args: &MbtiArgs) {
    if let Some(ref c) = args.country_column {
        config.country_column = c.clone();
    }
    if !args.countries.is_empty() {
        config.reference_aliases = args.countries.clone();
    }
}

fn cmd_parse(input: &Path, config: &PipelineConfig, output: Option<&Path>) -> CliResult {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let table = load_path(input, &config.encodings)?;

    for attempt in &table.attempts {
        if let Some(ref err) = attempt.error {
            eprintln!("   Skipped {}: {}", attempt.encoding, err);
        }
    }
    eprintln!("   Encoding: {}", table.encoding);
    eprintln!("   Delimiter: '{}'", format_delimiter(table.delimiter));
    eprintln!("   Columns: {}", table.headers.join(", "));
    eprintln!("✅ Parsed {} rows", table.row_count());

    let rows: Vec<Value> = table
        .rows
        .iter()
        .map(|row| {
            let object: Map<String, Value> = table
                .headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.clone(), Value::String(row.get(i).cloned().unwrap_or_default())))
                .collect();
            Value::Object(object)
        })
        .collect();

    write_json(&rows, output)
}

fn cmd_temperature(input: &Path, config: &PipelineConfig, output: Option<&Path>) -> CliResult {
    eprintln!("📄 Processing: {}", input.display());

    let report = run_temperature(&Source::path(input), &TemperatureOptions::from(config))?;

    eprintln!("   Encoding: {}", report.source.encoding);
    eprintln!("   Rows: {} ({} dropped)", report.rows_read, report.dropped_rows);
    eprintln!("   Periods: {}", report.summaries.len());

    match (&report.trend, report.summaries.first(), report.summaries.last()) {
        (Some(trend), Some(first), Some(last)) => {
            eprintln!("\n📈 Trend {}-{}: {}", first.period, last.period, trend.direction);
            eprintln!("   Slope: {:.4} per period", trend.slope);
            eprintln!(
                "   First {} periods: {:.2}, last {}: {:.2} ({:+.2})",
                trend.window, trend.first_window_mean, trend.window, trend.last_window_mean, trend.difference
            );
        }
        _ => eprintln!("\n⚠️  Not enough periods for a trend"),
    }
    print_status(&report.status);

    write_json(&report, output)
}

fn cmd_mbti_rank(args: &MbtiArgs, config: &PipelineConfig, category: Category) -> CliResult {
    eprintln!("📄 Processing: {}", args.input.display());

    let names = display_names(args)?;
    let report = run_mbti(&Source::path(&args.input), &MbtiOptions::new(config, category))?;

    eprintln!("\n🏆 Top {} countries by {}:", report.top.len(), category);
    for entry in &report.chart {
        eprintln!("   {:>3}. {} {:.2}%", entry.rank, names.labelled(&entry.country), entry.value * 100.0);
    }

    if let Some(ref reference) = report.reference {
        eprintln!(
            "\n📍 {}: rank {} of {} ({:?})",
            names.labelled(&reference.entry.country),
            reference.entry.rank,
            report.ranking.len(),
            reference.tier
        );
    }
    print_status(&report.status);

    write_json(&report, args.output.as_deref())
}

fn cmd_mbti_profile(args: &MbtiArgs, config: &PipelineConfig) -> CliResult {
    eprintln!("📄 Processing: {}", args.input.display());

    let names = display_names(args)?;
    let options = MbtiOptions::new(config, Category::Intj);
    let report = run_profile(&Source::path(&args.input), &options, &config.reference_aliases)?;

    if let Some(ref profile) = report.profile {
        eprintln!("\n🧭 {}:", names.labelled(&profile.country));
        for share in &profile.distribution {
            eprintln!("   {} {:.2}%", share.category, share.value * 100.0);
        }
    }
    print_status(&report.status);

    write_json(&report, args.output.as_deref())
}

fn cmd_mbti_global(args: &MbtiArgs, config: &PipelineConfig) -> CliResult {
    eprintln!("📄 Processing: {}", args.input.display());

    let options = MbtiOptions::new(config, Category::Intj);
    let report = run_global_average(&Source::path(&args.input), &options)?;

    eprintln!("\n🌍 Average over {} countries:", report.countries);
    for share in &report.averages {
        eprintln!("   {} {:.2}%", share.category, share.value * 100.0);
    }
    print_status(&report.status);

    write_json(&report, args.output.as_deref())
}

fn display_names(args: &MbtiArgs) -> Result<DisplayNames, Box<dyn std::error::Error>> {
    if args.korean {
        return Ok(DisplayNames::korean()?);
    }
    match args.names {
        Some(ref path) => Ok(DisplayNames::from_file(path)?),
        None => Ok(DisplayNames::identity()),
    }
}

fn print_status(status: &Completeness) {
    for reason in status.reasons() {
        eprintln!("⚠️  Incomplete: {}", reason);
    }
}

fn write_json<T: Serialize + ?Sized>(value: &T, path: Option<&Path>) -> CliResult {
    let json = serde_json::to_string_pretty(value)?;
    match path {
        Some(p) => {
            fs::write(p, &json)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", json);
        }
    }
    Ok(())
}
