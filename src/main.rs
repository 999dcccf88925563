use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use quadprof::engine;
use quadprof::input;
use quadprof::stats::{QuadStatsProcessor, StatsConfig, TypeMatcher};
use quadprof::subset::{SubsetConfig, SubsetProcessor};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "quadprof")]
#[command(about = "Profile RDF quad dumps: usage statistics and per-class subsets")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate vocabulary/class/property statistics from quad files
    Stats(StatsArgs),
    /// Split quad files into per-class subset files
    Subset(SubsetArgs),
}

#[derive(Args)]
struct CommonArgs {
    /// Directory the input quad files are read from
    #[arg(short, long)]
    input_dir: PathBuf,

    /// Directory the output file(s) are written to
    #[arg(short, long)]
    output_dir: PathBuf,

    /// Number of worker threads
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..))]
    threads: u16,

    /// Only process files whose name starts with this prefix
    #[arg(short, long, default_value = "")]
    prefix: String,
}

#[derive(Args)]
struct StatsArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Predicates that identify an entity's type (comma separated)
    #[arg(long, value_delimiter = ',', required = true)]
    type_properties: Vec<String>,

    /// Treat the type properties as regular expressions
    #[arg(long)]
    type_regex: bool,

    /// Predicate that never marks a subject as untyped (repeatable)
    #[arg(long = "untyped-exception", default_values_t = quadprof::config::default_untyped_exceptions())]
    untyped_exceptions: Vec<String>,
}

#[derive(Args)]
struct SubsetArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// File mapping each class to an output base name
    #[arg(long)]
    class_file: PathBuf,

    /// Column separator of the class file
    #[arg(long, default_value = quadprof::config::DEFAULT_FILTER_SEPARATOR)]
    separator: String,
}

fn prepare(common: &CommonArgs) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(&common.output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            common.output_dir.display()
        )
    })?;
    let files = input::list_files(&common.input_dir, &common.prefix)?;
    info!(
        files = files.len(),
        input = %common.input_dir.display(),
        "Input files listed"
    );
    Ok(files)
}

fn run_stats(args: StatsArgs) -> Result<()> {
    let files = prepare(&args.common)?;

    let matcher = if args.type_regex {
        TypeMatcher::regex(&args.type_properties)?
    } else {
        TypeMatcher::exact(args.type_properties)
    };

    let mut processor = QuadStatsProcessor::new(StatsConfig {
        output_dir: args.common.output_dir.clone(),
        file_prefix: args.common.prefix.clone(),
        matcher,
        untyped_exceptions: args.untyped_exceptions.into_iter().collect(),
    });

    let start = Instant::now();
    let report = engine::run(&mut processor, &files, args.common.threads as usize)?;

    println!();
    println!("=== Summary ===");
    println!("Elapsed:            {:.2}s", start.elapsed().as_secs_f64());
    println!("Files processed:    {}", report.files_processed);
    println!("Files failed:       {}", report.files_failed);
    println!("Lines parsed:       {}", processor.lines_ok());
    println!("Lines unparseable:  {}", processor.lines_failed());
    println!("Typed entities:     {}", processor.typed_entity_total());
    println!("Untyped subjects:   {}", processor.untyped_subject_count());

    Ok(())
}

fn run_subset(args: SubsetArgs) -> Result<()> {
    let files = prepare(&args.common)?;

    let mut processor = SubsetProcessor::new(SubsetConfig {
        output_dir: args.common.output_dir.clone(),
        class_file: args.class_file,
        separator: args.separator,
    });

    let start = Instant::now();
    let report = engine::run(&mut processor, &files, args.common.threads as usize)?;

    println!();
    println!("=== Summary ===");
    println!("Elapsed:            {:.2}s", start.elapsed().as_secs_f64());
    println!("Files processed:    {}", report.files_processed);
    println!("Files failed:       {}", report.files_failed);
    println!("Lines parsed:       {}", processor.lines_ok());
    println!("Lines unparseable:  {}", processor.lines_failed());
    println!("Entities written:   {}", processor.entities_written());

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let result = match cli.command {
        Commands::Stats(args) => run_stats(args),
        Commands::Subset(args) => run_subset(args),
    };

    match result {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
