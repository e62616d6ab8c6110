use clap::Parser;
use polygen::{Context, Document, GrammarConfig};
use std::path::PathBuf;

/// Label-aware random sentence generator
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the grammar file
    #[arg(help = "Path to the grammar file")]
    grammar_file: PathBuf,

    /// The starting non-terminal symbol
    #[arg(short = 'S', long, default_value = "S")]
    start: String,

    /// Number of texts to generate
    #[arg(short = 'n', long, default_value_t = 1)]
    count: usize,

    /// Seed of the first generation; later ones use the following integers
    #[arg(long)]
    seed: Option<u64>,

    /// JSON file with generation settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the maximum expansion depth
    #[arg(long)]
    max_depth: Option<usize>,

    /// Print the parsed grammar as JSON instead of generating
    #[arg(long)]
    dump_json: bool,

    /// Print the seed next to each generated text (repeat for debug logging)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 | 1 => "warn",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut config = match &cli.config {
        Some(path) => GrammarConfig::from_json_file(path)?,
        None => GrammarConfig::default(),
    };
    if let Some(depth) = cli.max_depth {
        config.max_recursion_depth = depth;
    }

    let document = Document::from_file(&cli.grammar_file, &cli.start)?;
    log::info!(
        "loaded {} non-terminals from {}",
        document.non_terminals().len(),
        cli.grammar_file.display()
    );
    for symbol in document.undefined_symbols() {
        log::warn!("`{}` is referenced but never defined", symbol);
    }

    if cli.dump_json {
        println!("{}", document.to_json()?);
        return Ok(());
    }

    for i in 0..cli.count {
        let seed = cli.seed.map(|s| s.wrapping_add(i as u64));
        let mut context = Context::new(seed);
        let generated = document.generate_with(&mut context, &config)?;
        log::info!("seed used: {}", context.seed());
        if cli.verbose > 0 {
            println!("[{}] {}", context.seed(), generated);
        } else {
            println!("{}", generated);
        }
    }

    Ok(())
}
