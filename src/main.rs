use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use annomark::{Config, Document, Renderer};

#[derive(Parser)]
#[command(name = "annomark")]
#[command(about = "Render annotated text to well-nested markup")]
struct Cli {
    /// Input file (Markdown, or a JSON range document)
    input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Input format (defaults to json for .json files, markdown otherwise)
    #[arg(short, long, value_enum)]
    format: Option<Format>,

    /// Bundled rule set to start from
    #[arg(short, long, default_value = "html")]
    preset: String,

    /// TOML file whose entries override the preset
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Markdown,
    Json,
}

impl Format {
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Format::Json,
            _ => Format::Markdown,
        }
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::preset(&cli.preset)?;
    if let Some(path) = &cli.config {
        config = config.overlay(Config::load(path)?);
    }
    let renderer = Renderer::from_config(&config)?;

    // Read input file
    let source = fs::read_to_string(&cli.input)
        .map_err(|e| format!("reading {}: {}", cli.input.display(), e))?;

    let units = match cli.format.unwrap_or_else(|| Format::for_path(&cli.input)) {
        Format::Markdown => annomark::parse_markdown(&source),
        Format::Json => Document::from_json(&source)?.to_units()?,
    };
    tracing::debug!(units = units.len(), input = %cli.input.display(), "rendering");

    let markup = renderer.render(&units)?;

    match &cli.output {
        Some(output) => {
            fs::write(output, markup)
                .map_err(|e| format!("writing {}: {}", output.display(), e))?;
            eprintln!("Created {}", output.display());
        }
        None => print!("{}", markup),
    }

    Ok(())
}
