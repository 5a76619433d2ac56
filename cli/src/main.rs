use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use condset_core::{parse_conditions, Condition, ConditionSet, DecodeOptions};
use log::{debug, info};
use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
    process::ExitCode,
};

#[derive(Parser)]
#[command(author, version, about = "Encode, inspect and compare condition sets")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode conditions into the binary format
    Encode {
        /// Comma-separated conditions, e.g. "==56,<90,*78"
        #[arg(short, long, conflicts_with = "json", required_unless_present = "json")]
        conditions: Option<String>,

        /// JSON file holding an array of conditions (use '-' for stdin)
        #[arg(long)]
        json: Option<String>,

        /// Output file (use '-' for stdout)
        #[arg(short, long)]
        output: String,
    },

    /// Decode a binary condition set to JSON
    Decode {
        /// Input file (use '-' for stdin)
        #[arg(short, long)]
        input: String,

        /// Output file (use '-' for stdout)
        #[arg(short, long, default_value = "-")]
        output: String,

        /// Ignore bytes after the declared end of the set
        #[arg(long)]
        allow_trailing: bool,
    },

    /// Show info about a binary condition set
    Info {
        /// Input file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Check whether the data set satisfies the pattern set
    Compare {
        /// Binary file supplying predicates and right-hand values
        #[arg(long, required_unless_present = "pattern_text")]
        pattern: Option<PathBuf>,

        /// Inline pattern, e.g. "==56,<90"
        #[arg(long, conflicts_with = "pattern")]
        pattern_text: Option<String>,

        /// Binary file supplying left-hand values
        #[arg(long, required_unless_present = "data_text")]
        data: Option<PathBuf>,

        /// Inline data, e.g. "56,78"
        #[arg(long, conflicts_with = "data")]
        data_text: Option<String>,
    },
}

fn get_reader(input: &str) -> Result<Box<dyn Read>> {
    match input {
        "-" => Ok(Box::new(io::stdin())),
        path => Ok(Box::new(File::open(path).with_context(|| format!("opening {path}"))?)),
    }
}

fn get_writer(output: &str) -> Result<Box<dyn Write>> {
    match output {
        "-" => Ok(Box::new(io::stdout())),
        path => Ok(Box::new(File::create(path).with_context(|| format!("creating {path}"))?)),
    }
}

fn read_all(input: &str) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    BufReader::new(get_reader(input)?).read_to_end(&mut bytes)?;
    Ok(bytes)
}

fn load_set(path: &Path, options: DecodeOptions) -> Result<ConditionSet<'static>> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    ConditionSet::from_bytes_with(&bytes, options)
        .with_context(|| format!("decoding {}", path.display()))
}

/// Resolves a set given either as a binary file or as inline text.
fn resolve_set(path: Option<&Path>, text: Option<&str>) -> Result<ConditionSet<'static>> {
    match (path, text) {
        (Some(path), _) => load_set(path, DecodeOptions::default()),
        (None, Some(text)) => Ok(ConditionSet::owned(parse_conditions(text)?)?),
        (None, None) => anyhow::bail!("either a file or inline conditions are required"),
    }
}

fn encode(conditions: Option<&str>, json: Option<&str>, output: &str) -> Result<()> {
    let conditions: Vec<Condition> = match (conditions, json) {
        (Some(text), _) => parse_conditions(text)?,
        (None, Some(json)) => serde_json::from_slice(&read_all(json)?)
            .with_context(|| format!("parsing conditions from {json}"))?,
        (None, None) => anyhow::bail!("no conditions given"),
    };
    let set = ConditionSet::borrowed(&conditions)?;

    let mut writer = BufWriter::new(get_writer(output)?);
    set.write_to(&mut writer)?;
    writer.flush()?;
    info!("encoded {} conditions ({} bytes)", set.len(), set.encoded_size());
    Ok(())
}

fn decode(input: &str, output: &str, allow_trailing: bool) -> Result<()> {
    let options = DecodeOptions {
        allow_trailing_bytes: allow_trailing,
    };
    let set = ConditionSet::from_bytes_with(&read_all(input)?, options)
        .with_context(|| format!("decoding {input}"))?;

    let mut writer = BufWriter::new(get_writer(output)?);
    serde_json::to_writer_pretty(&mut writer, set.conditions())?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

fn show_info(input: &Path) -> Result<()> {
    let set = load_set(input, DecodeOptions::default())?;
    println!("Condition set info:");
    println!("  conditions:   {}", set.len());
    println!("  encoded size: {} bytes", set.encoded_size());
    println!("  predicates:   {set}");
    Ok(())
}

fn compare(
    pattern: Option<&Path>,
    pattern_text: Option<&str>,
    data: Option<&Path>,
    data_text: Option<&str>,
) -> Result<bool> {
    let pattern = resolve_set(pattern, pattern_text).context("loading pattern")?;
    let data = resolve_set(data, data_text).context("loading data")?;
    debug!("comparing pattern {pattern} against data {data}");
    Ok(pattern.compare(&data)?)
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Encode {
            conditions,
            json,
            output,
        } => encode(conditions.as_deref(), json.as_deref(), &output)?,
        Commands::Decode {
            input,
            output,
            allow_trailing,
        } => decode(&input, &output, allow_trailing)?,
        Commands::Info { input } => show_info(&input)?,
        Commands::Compare {
            pattern,
            pattern_text,
            data,
            data_text,
        } => {
            let satisfied = compare(
                pattern.as_deref(),
                pattern_text.as_deref(),
                data.as_deref(),
                data_text.as_deref(),
            )?;
            println!("{satisfied}");
            return Ok(if satisfied {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            });
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(2)
        }
    }
}
