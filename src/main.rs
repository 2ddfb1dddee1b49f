use clap::Parser;
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;

use rusty_hh::error::HHError;
use rusty_hh::pipeline::{run, PipelineConfig};

#[derive(Parser, Debug)]
struct Args {
    /// The seed used for the current noise and the weight initialization
    #[arg(long, default_value = "0")]
    seed: u64,
    /// A JSON file with the pipeline configuration (defaults are used for missing fields)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Where to write the JSON summary of the run
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Log every training iteration
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), HHError> {
    let args = Args::parse();

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{l} - {m}\n")))
        .build();
    let level = match args.verbose {
        true => LevelFilter::Debug,
        false => LevelFilter::Info,
    };
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))
        .map_err(|e| HHError::IOError(e.to_string()))?;
    log4rs::init_config(config).map_err(|e| HHError::IOError(e.to_string()))?;

    log::info!("{:?}", args);

    let config = match &args.config {
        Some(path) => PipelineConfig::load_from(path)?,
        None => PipelineConfig::default(),
    };

    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let output = run(&config, &mut rng)?;

    let summary = output.summary();
    if let Some(cost) = summary.final_cost {
        println!("Final cost: {}", cost);
    }
    println!("Dominant frequency: {:.2} Hz", summary.dominant_frequency);

    if let Some(path) = &args.output {
        summary.save_to(path)?;
        log::info!("Summary saving: done! Saved to {}", path.display());
    }
    Ok(())
}
