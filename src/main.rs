// Synthetic anomaly generation for power and energy time series.
//
//   energy-anomaly-gen generate data.csv load power --type1 0.01 --seed 7
//   energy-anomaly-gen windows power.csv --real kW --real-labels label \
//       --synthetic y_hat --synthetic-labels anomalies

use clap::{Args, Parser, Subcommand};
use energy_anomaly_gen::*;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "energy-anomaly-gen")]
#[command(about = "Anomaly generation for energy and power time series", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inject type 1-4 anomalies into one column of a CSV file
    Generate(GenerateArgs),
    /// Cut real and synthetic series into labelled windows for external scoring
    Windows(WindowsArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// Path to the data CSV file
    csv_path: PathBuf,
    /// Name of the target column
    column: String,
    /// Type of the time series ("power" or "energy")
    #[arg(value_name = "TYPE")]
    domain: String,

    /// Name of the time index column (default: first column)
    #[arg(long)]
    time: Option<String>,
    /// TOML file with generation parameters; flags override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// CSV column separator
    #[arg(long, default_value = ";")]
    csv_separator: char,
    /// CSV decimal separator
    #[arg(long, default_value = ",")]
    csv_decimal: char,
    /// Directory for <type>.csv, <type>.png and <type>_summary.json
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
    /// Skip the comparison plot
    #[arg(long)]
    no_plot: bool,

    #[command(flatten)]
    anomalies: AnomalyArgs,
}

#[derive(Args)]
struct AnomalyArgs {
    /// Fraction or absolute number of type 1 anomalies
    #[arg(long)]
    type1: Option<AnomalyCount>,
    #[arg(long)]
    type1_len_min: Option<usize>,
    #[arg(long)]
    type1_len_max: Option<usize>,

    /// Fraction or absolute number of type 2 anomalies
    #[arg(long)]
    type2: Option<AnomalyCount>,
    #[arg(long)]
    type2_len_min: Option<usize>,
    #[arg(long)]
    type2_len_max: Option<usize>,
    /// Ramp into type 2 anomalies
    #[arg(long)]
    type2_softstart: bool,

    /// Fraction or absolute number of type 3 anomalies
    #[arg(long)]
    type3: Option<AnomalyCount>,
    #[arg(long)]
    type3_r_min: Option<f64>,
    #[arg(long)]
    type3_r_max: Option<f64>,
    /// Enable the extreme type 3 case
    #[arg(long)]
    type3_extreme: bool,

    /// Fraction or absolute number of type 4 anomalies
    #[arg(long)]
    type4: Option<AnomalyCount>,
    #[arg(long)]
    type4_r_min: Option<f64>,
    #[arg(long)]
    type4_r_max: Option<f64>,

    /// Energy offset of type 1 and extreme type 3 anomalies
    #[arg(long)]
    k: Option<f64>,
    /// Seed for the whole run
    #[arg(long)]
    seed: Option<u64>,
}

impl AnomalyArgs {
    fn apply_to(&self, cfg: &mut GenerationConfig) {
        macro_rules! set {
            ($($field:ident),*) => {
                $( if let Some(v) = self.$field { cfg.$field = v; } )*
            };
        }
        set!(
            type1, type1_len_min, type1_len_max,
            type2, type2_len_min, type2_len_max,
            type3, type3_r_min, type3_r_max,
            type4, type4_r_min, type4_r_max,
            k, seed
        );
        cfg.type2_softstart |= self.type2_softstart;
        cfg.type3_extreme |= self.type3_extreme;
    }
}

#[derive(Args)]
struct WindowsArgs {
    /// Result CSV holding real and synthetic columns
    csv_path: PathBuf,
    #[arg(long, default_value = "kW")]
    real: String,
    #[arg(long, default_value = "label")]
    real_labels: String,
    #[arg(long, default_value = "y_hat")]
    synthetic: String,
    #[arg(long, default_value = "anomalies")]
    synthetic_labels: String,
    /// Window length in steps
    #[arg(long, default_value_t = 96)]
    size: usize,
    #[arg(long, default_value = ",")]
    csv_separator: char,
    #[arg(long, default_value = ".")]
    csv_decimal: char,
    #[arg(short, long, default_value = "eval_windows.csv")]
    output: PathBuf,
}

fn separator_byte(c: char) -> Result<u8> {
    u8::try_from(c)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| InjectError::configuration(format!("separator '{c}' is not a single ASCII byte")))
}

fn run_generate(args: &GenerateArgs) -> Result<()> {
    // fail on a bad domain before touching any file
    let domain: Domain = args.domain.parse()?;

    let mut cfg = match &args.config {
        Some(path) => GenerationConfig::load(path)?,
        None => GenerationConfig::default(),
    };
    args.anomalies.apply_to(&mut cfg);

    let opts = CsvOptions {
        value_column: args.column.clone(),
        time_column: args.time.clone(),
        delimiter: separator_byte(args.csv_separator)?,
        decimal: args.csv_decimal,
    };
    let series = load_series(&args.csv_path, &opts)?;
    info!(rows = series.len(), interval = ?series.interval(), "series loaded");

    let result = run_pipeline(&series, domain, &cfg)?;

    std::fs::create_dir_all(&args.output_dir)?;
    let stem = domain.to_string();
    let out = |ext: &str| args.output_dir.join(format!("{stem}{ext}"));
    let time_header = args.time.as_deref().unwrap_or("time");

    write_result(&out(".csv"), &result, time_header)?;
    write_summary(&out("_summary.json"), domain, &result)?;
    if !args.no_plot {
        // the chart is a debugging aid; a missing font must not fail the run
        if let Err(e) = plot_comparison(&result, &out(".png")) {
            warn!(error = %e, "could not write comparison plot");
        }
    }
    Ok(())
}

fn run_windows(args: &WindowsArgs) -> Result<()> {
    let cols = load_columns(
        &args.csv_path,
        separator_byte(args.csv_separator)?,
        args.csv_decimal,
        &[
            args.real.as_str(),
            args.real_labels.as_str(),
            args.synthetic.as_str(),
            args.synthetic_labels.as_str(),
        ],
    )?;
    let real = EvalSamples::from_columns(&cols[0], &cols[1], args.size)?;
    let synthetic = EvalSamples::from_columns(&cols[2], &cols[3], args.size)?;
    info!(
        real_anomalous = real.anomalous(),
        synthetic_anomalous = synthetic.anomalous(),
        "built evaluation windows"
    );
    write_eval_samples(&args.output, &real, &synthetic)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let outcome = match &cli.command {
        Commands::Generate(args) => run_generate(args),
        Commands::Windows(args) => run_windows(args),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
