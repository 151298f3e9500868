use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use bytepair::bytes::bytes_to_string;
use bytepair::corpus::{read_corpus, read_text_or_literal};
use bytepair::serialization::{self, validate_model_path};
use bytepair::{TokenId, TokenizerModel, Trainer, TrainerConfig};
use clap::{ArgAction, Args, Parser, Subcommand};
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use rayon::ThreadPoolBuilder;
use serde_json::json;

const DEFAULT_OUTPUT: &str = "tokenizer_model.json";

#[derive(Parser, Debug)]
#[command(author, version, about = "Byte pair encoding tokenizer", long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (-q, -qq)
    #[arg(short = 'q', long, global = true, action = ArgAction::Count)]
    quiet: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train a new tokenizer on a text corpus
    Train(TrainArgs),
    /// Encode text or files into token ids
    Encode(EncodeArgs),
    /// Decode token ids back into text
    Decode(DecodeArgs),
    /// Encode an input and decode it again, printing both
    #[command(name = "use")]
    Use(UseArgs),
    /// Inspect a trained model
    Info(InfoArgs),
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// Corpus file to train on
    #[arg(value_name = "CORPUS", default_value = "./train.txt")]
    corpus: PathBuf,

    /// Output path for the model (.json)
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_OUTPUT, value_parser = model_path)]
    output: PathBuf,

    /// Target vocabulary size (>= 256)
    #[arg(long, value_name = "SIZE", default_value_t = 300)]
    vocab_size: usize,

    /// Minimum pair frequency required to keep merging
    #[arg(long, value_name = "COUNT", default_value_t = 1)]
    min_frequency: usize,

    /// Disable per-iteration logging/progress
    #[arg(long)]
    no_progress: bool,

    /// Emit pretty JSON
    #[arg(long)]
    pretty: bool,

    /// Fail instead of saving when fewer merges than requested were learned
    #[arg(long)]
    strict: bool,

    /// Limit Rayon worker threads
    #[arg(long, value_name = "N")]
    threads: Option<usize>,
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Model file to load
    #[arg(short = 'm', long, value_name = "PATH", value_parser = model_path)]
    model: PathBuf,

    /// Text to encode instead of reading files
    #[arg(long, value_name = "TEXT", conflicts_with = "inputs")]
    text: Option<String>,

    /// Files to encode
    #[arg(value_name = "INPUT", required_unless_present = "text")]
    inputs: Vec<PathBuf>,

    /// Emit JSON lines instead of human-readable output
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Model file to load
    #[arg(short = 'm', long, value_name = "PATH", value_parser = model_path)]
    model: PathBuf,

    /// Path to whitespace separated token ids
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Token ids to decode when --input is omitted
    #[arg(value_name = "ID", required_unless_present = "input")]
    tokens: Vec<TokenId>,

    /// Output file for decoded bytes (defaults to stdout as text)
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct UseArgs {
    /// Model file to load
    #[arg(short = 'm', long, value_name = "PATH", default_value = DEFAULT_OUTPUT, value_parser = model_path)]
    model: PathBuf,

    /// File path or raw text to tokenize
    #[arg(value_name = "INPUT")]
    input: String,
}

#[derive(Args, Debug)]
struct InfoArgs {
    /// Model file to inspect
    #[arg(short = 'm', long, value_name = "PATH", value_parser = model_path)]
    model: PathBuf,

    /// Number of most recently learned merges to list
    #[arg(long, value_name = "N", default_value_t = 10)]
    top: usize,

    /// Emit machine-readable JSON summary
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Train(args) => run_train(args),
        Commands::Encode(args) => run_encode(args),
        Commands::Decode(args) => run_decode(args),
        Commands::Use(args) => run_use(args),
        Commands::Info(args) => run_info(args),
    }
}

fn init_logging(verbose: u8, quiet: u8) {
    use log::LevelFilter;

    let level = if quiet > 0 {
        match quiet {
            1 => LevelFilter::Warn,
            _ => LevelFilter::Error,
        }
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    builder.format_timestamp_millis();
    builder.filter_level(level);
    let _ = builder.try_init();
}

fn model_path(value: &str) -> std::result::Result<PathBuf, String> {
    let path = PathBuf::from(value);
    validate_model_path(&path).map_err(|err| err.to_string())?;
    Ok(path)
}

fn load_model(path: &Path) -> Result<TokenizerModel> {
    serialization::load_model(path)
        .with_context(|| format!("failed to load model from {}", path.display()))
}

fn run_train(args: TrainArgs) -> Result<()> {
    if let Some(threads) = args.threads {
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("unable to configure Rayon thread pool")?;
    }

    let cfg = TrainerConfig::builder()
        .target_vocab_size(args.vocab_size)
        .min_frequency(args.min_frequency)
        .show_progress(!args.no_progress)
        .build()?;

    let corpus = read_corpus(&args.corpus)
        .with_context(|| format!("failed to load corpus {}", args.corpus.display()))?;
    info!(
        "loaded corpus of {} bytes from {}",
        corpus.len(),
        args.corpus.display()
    );

    let spinner = if args.no_progress {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner} learning merges... {elapsed}")
            .context("invalid progress template")?
            .tick_chars("|/-\\ ");
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(80));
        Some(pb)
    };

    let start = Instant::now();
    let artifacts = Trainer::new(cfg).train(&corpus)?;
    if let Some(pb) = spinner {
        pb.finish_with_message("training complete");
    }
    let elapsed = start.elapsed();

    if args.strict {
        artifacts.ensure_complete()?;
    } else if !artifacts.is_complete() {
        warn!(
            "saving partial model: {} of {} merges ({:?})",
            artifacts.learned_merges(),
            artifacts.requested_merges(),
            artifacts.metrics.stop_reason
        );
    }

    serialization::save_model(&artifacts.model, &args.output, args.pretty)
        .with_context(|| format!("failed to save model to {}", args.output.display()))?;

    info!(
        "training complete: merges={} vocab={} duration={elapsed:.2?} compression={:.2}",
        artifacts.learned_merges(),
        artifacts.model.vocab_size(),
        artifacts.metrics.compression_ratio(corpus.len())
    );
    println!(
        "wrote tokenizer with vocab {} ({} of {} merges) to {}",
        artifacts.model.vocab_size(),
        artifacts.learned_merges(),
        artifacts.requested_merges(),
        args.output.display()
    );

    Ok(())
}

fn run_encode(args: EncodeArgs) -> Result<()> {
    let model = load_model(&args.model)?;

    let (labels, contents): (Vec<String>, Vec<Vec<u8>>) = match args.text {
        Some(text) => (vec!["<text>".to_string()], vec![text.into_bytes()]),
        None => {
            let mut labels = Vec::with_capacity(args.inputs.len());
            let mut contents = Vec::with_capacity(args.inputs.len());
            for path in &args.inputs {
                let data =
                    fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
                labels.push(path.display().to_string());
                contents.push(data);
            }
            (labels, contents)
        }
    };

    let encoded = model.encode_batch(&contents);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (label, tokens) in labels.iter().zip(&encoded) {
        if args.json {
            let record = json!({ "input": label, "tokens": tokens });
            writeln!(out, "{}", serde_json::to_string(&record)?)?;
        } else {
            write!(out, "{label}:\t")?;
            write_token_sequence(&mut out, tokens)?;
        }
    }

    Ok(())
}

fn run_decode(args: DecodeArgs) -> Result<()> {
    let model = load_model(&args.model)?;

    let tokens = if let Some(input_path) = &args.input {
        let contents = fs::read_to_string(input_path)
            .with_context(|| format!("failed to read {}", input_path.display()))?;
        parse_token_list(&contents)?
    } else {
        args.tokens
    };

    if let Some(path) = &args.output {
        let bytes = model.decode_to_bytes(&tokens)?;
        let mut file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        file.write_all(&bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("wrote {} bytes to {}", bytes.len(), path.display());
    } else {
        println!("{}", model.decode(&tokens)?);
    }

    Ok(())
}

fn run_use(args: UseArgs) -> Result<()> {
    let model = load_model(&args.model)?;
    let text = read_text_or_literal(&args.input)
        .with_context(|| format!("failed to read input {}", args.input))?;

    let encoded = model.encode(&text);
    println!("Encoded : {encoded:?}");
    let decoded = model.decode(&encoded)?;
    println!("Decoded : {decoded}");
    if decoded != text {
        warn!("decoded text differs from input");
    }

    Ok(())
}

fn run_info(args: InfoArgs) -> Result<()> {
    let model = load_model(&args.model)?;
    let merges = model.merges();
    let recent = merges
        .iter()
        .rev()
        .take(args.top)
        .map(|((left, right), id)| {
            let token = model.vocabulary().get(id).unwrap_or_default();
            json!({
                "id": id,
                "left": left,
                "right": right,
                "token": bytes_to_string(token),
            })
        })
        .collect::<Vec<_>>();
    let longest = model
        .vocabulary()
        .iter()
        .map(|(_, bytes)| bytes.len())
        .max()
        .unwrap_or(0);
    let summary = json!({
        "path": args.model.display().to_string(),
        "vocab_size": model.vocab_size(),
        "merges": merges.len(),
        "longest_token_bytes": longest,
        "recent_merges": recent,
    });

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Vocab size   : {}", model.vocab_size());
        println!("Merges       : {}", merges.len());
        println!("Longest token: {longest} bytes");
        for entry in &recent {
            println!(
                "  {:>6} = ({:>6}, {:>6}) {}",
                entry["id"],
                entry["left"],
                entry["right"],
                entry["token"]
            );
        }
    }

    Ok(())
}

fn write_token_sequence<W: Write>(writer: &mut W, tokens: &[TokenId]) -> Result<()> {
    for (idx, token) in tokens.iter().enumerate() {
        if idx > 0 {
            writer.write_all(b" ")?;
        }
        write!(writer, "{token}")?;
    }
    writer.write_all(b"\n")?;
    Ok(())
}

fn parse_token_list(text: &str) -> Result<Vec<TokenId>> {
    text.split_whitespace()
        .map(|part| {
            part.parse::<TokenId>()
                .map_err(|err| anyhow!("invalid token id `{part}`: {err}"))
        })
        .collect()
}
