//! # docqa CLI (`dqa`)
//!
//! Commands for asking questions over a folder of documents.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dqa chat` | Interactive question loop with cited answers |
//! | `dqa ask "<question>"` | One-shot question |
//! | `dqa index` | Force an index rebuild and print corpus stats |
//! | `dqa status` | List recognized documents and the corpus fingerprint |
//!
//! ## Examples
//!
//! ```bash
//! # Put .pdf/.txt files in ./documents, then:
//! dqa status --config ./config/dqa.toml
//! dqa ask "What does the onboarding guide say about VPN access?"
//! dqa chat
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use docqa::compose::AnthropicComposer;
use docqa::config::load_config;
use docqa::models::Answer;
use docqa::pipeline::{corpus_fingerprint, RetrievalPipeline, Session};

/// Grounded question answering over a folder of documents.
#[derive(Parser)]
#[command(
    name = "dqa",
    about = "docqa — grounded question answering over a folder of documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/dqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat loop. Type 'quit' to exit.
    Chat,

    /// Ask a single question and print the answer with its sources.
    Ask {
        question: String,

        /// Emit the answer and sources as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Build (or rebuild) the index and print corpus statistics.
    Index,

    /// List recognized documents and the current corpus fingerprint.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Chat => run_chat(config).await,
        Commands::Ask { question, json } => run_ask(config, &question, json).await,
        Commands::Index => run_index(config).await,
        Commands::Status => run_status(config),
    }
}

fn check_api_key() -> Result<()> {
    if std::env::var("ANTHROPIC_API_KEY").is_err() {
        anyhow::bail!(
            "ANTHROPIC_API_KEY is not set. Get an API key from https://console.anthropic.com/ \
             and export it before asking questions."
        );
    }
    Ok(())
}

fn print_answer(answer: &Answer) {
    println!("\n{}\n", answer.text);
    if !answer.sources.is_empty() {
        println!("Sources:");
        for (i, source) in answer.sources.iter().enumerate() {
            let page = source
                .page
                .map(|p| format!(", page {p}"))
                .unwrap_or_default();
            println!("  {}. {}{} [{:.2}]", i + 1, source.name, page, source.score);
            println!("     \"{}\"", source.preview.replace('\n', " "));
        }
        println!();
    }
}

async fn run_ask(config: docqa::config::Config, question: &str, json: bool) -> Result<()> {
    check_api_key()?;
    let composer = AnthropicComposer::new(&config.llm)?;
    let mut pipeline = RetrievalPipeline::new(config)?;
    let mut session = Session::new();

    let answer = pipeline.ask(&mut session, &composer, question).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    } else {
        print_answer(&answer);
    }
    Ok(())
}

async fn run_chat(config: docqa::config::Config) -> Result<()> {
    check_api_key()?;
    let composer = AnthropicComposer::new(&config.llm)?;
    let mut pipeline = RetrievalPipeline::new(config)?;
    let mut session = Session::new();

    println!("Ready. Ask anything about your documents; type 'quit' to exit.");

    let stdin = std::io::stdin();
    loop {
        print!("You: ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();

        if question.is_empty() {
            continue;
        }
        if matches!(question.to_lowercase().as_str(), "quit" | "exit" | "q") {
            println!("Goodbye!");
            break;
        }

        match pipeline.ask(&mut session, &composer, question).await {
            Ok(answer) => print_answer(&answer),
            Err(e) if e.is_retryable() => {
                eprintln!("Transient backend error ({e}); try again.");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

async fn run_index(config: docqa::config::Config) -> Result<()> {
    let mut pipeline = RetrievalPipeline::new(config)?;
    let mut session = Session::new();

    let names = pipeline.document_names()?;
    pipeline.ensure_ready(&mut session).await?;

    println!("index");
    println!("  documents: {}", names.len());
    if let Some(index) = &session.index {
        println!("  chunks: {}", index.len());
    }
    if let Some(fingerprint) = &session.fingerprint {
        println!("  fingerprint: {fingerprint}");
    }
    println!("ok");
    Ok(())
}

fn run_status(config: docqa::config::Config) -> Result<()> {
    let pipeline = RetrievalPipeline::new(config)?;
    let names = pipeline.document_names()?;

    if names.is_empty() {
        println!(
            "No documents found in {}. Add .pdf or .txt files there.",
            pipeline.config().documents.dir.display()
        );
        return Ok(());
    }

    println!("documents ({}):", names.len());
    for name in &names {
        println!("  {name}");
    }
    println!("fingerprint: {}", corpus_fingerprint(&names));
    Ok(())
}
