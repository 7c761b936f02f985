//! chatbind - Export chat transcripts as books

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use chatbind::export::{self, ExportFormat};
use chatbind::markdown::CmarkRenderer;
use chatbind::rules::{JsonRuleSource, RuleSource, RuleTier};
use chatbind::{Delivery, DirectoryDelivery, Error, ExportConfig, Locale, Transcript, TranscriptSource};

#[derive(Parser)]
#[command(name = "chatbind")]
#[command(version, about = "Export chat transcripts as books", long_about = None)]
#[command(after_help = "EXAMPLES:
    chatbind chat.jsonl -f epub                         Export the whole chat as EPUB
    chatbind chat.jsonl -f txt --user --start 10 --end 40   Export messages 10 to 40 as text
    chatbind chat.jsonl -f epub --global-rules settings.json --character-rules card.json
    chatbind -i chat.jsonl                              Show transcript summary")]
struct Cli {
    /// Chat transcript (JSON Lines)
    #[arg(value_name = "CHAT")]
    input: PathBuf,

    /// Output format: epub, html, doc or txt
    #[arg(short, long, default_value = "epub")]
    format: ExportFormat,

    /// Output directory
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    output: PathBuf,

    /// Export settings (JSON)
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Global rewrite rules (settings file or rule array)
    #[arg(long, value_name = "FILE")]
    global_rules: Option<PathBuf>,

    /// Character-scoped rewrite rules (character card or rule array)
    #[arg(long, value_name = "FILE")]
    character_rules: Option<PathBuf>,

    /// Preset-scoped rewrite rules (preset or rule array)
    #[arg(long, value_name = "FILE")]
    preset_rules: Option<PathBuf>,

    /// Book title
    #[arg(long)]
    title: Option<String>,

    /// Book author
    #[arg(long)]
    author: Option<String>,

    /// First message index (inclusive)
    #[arg(long)]
    start: Option<i64>,

    /// Last message index (inclusive)
    #[arg(long)]
    end: Option<i64>,

    /// Include user messages
    #[arg(long)]
    user: bool,

    /// Leave out character messages
    #[arg(long)]
    no_agent: bool,

    /// Label character messages with the speaker's name
    #[arg(long)]
    show_agent_name: bool,

    /// Messages per chapter
    #[arg(long, value_name = "N")]
    chapter_size: Option<usize>,

    /// Front matter language: en or zh-cn
    #[arg(long)]
    locale: Option<Locale>,

    /// Show transcript summary without exporting
    #[arg(short, long)]
    info: bool,

    /// Suppress output messages
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.quiet);

    let result = if cli.info { show_info(&cli) } else { run(&cli) };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::EmptySelection) => {
            eprintln!("nothing to export: no messages match the range and role filter");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn show_info(cli: &Cli) -> Result<(), Error> {
    let transcript = Transcript::open(&cli.input)?;

    println!("File: {}", cli.input.display());
    if let Some(ref name) = transcript.user_name {
        println!("User: {name}");
    }
    if let Some(ref name) = transcript.character_name {
        println!("Character: {name}");
    }
    let messages = transcript.messages();
    let from_user = messages.iter().filter(|m| m.is_user_authored).count();
    println!("Messages: {}", messages.len());
    println!("  user: {from_user}");
    println!("  character: {}", messages.len() - from_user);

    Ok(())
}

fn run(cli: &Cli) -> Result<(), Error> {
    let transcript = Transcript::open(&cli.input)?;
    let config = build_config(cli)?.with_default_author(transcript.user_name.as_deref());

    let tiers = [
        (RuleTier::Global, &cli.global_rules),
        (RuleTier::Character, &cli.character_rules),
        (RuleTier::Preset, &cli.preset_rules),
    ];
    let sources: Vec<JsonRuleSource> = tiers
        .into_iter()
        .filter_map(|(tier, path)| path.as_ref().map(|p| JsonRuleSource::new(tier, p)))
        .collect();
    let sources: Vec<&dyn RuleSource> = sources.iter().map(|s| s as &dyn RuleSource).collect();

    let artifact = export::export(cli.format, &transcript, &sources, &CmarkRenderer::new(), &config)?;
    let delivery = DirectoryDelivery::new(&cli.output);
    delivery.deliver(&artifact)?;

    if !cli.quiet {
        println!("{}", delivery.path_for(&artifact).display());
    }
    Ok(())
}

/// Settings file first, then command-line overrides.
fn build_config(cli: &Cli) -> Result<ExportConfig, Error> {
    let mut config = match &cli.settings {
        Some(path) => ExportConfig::open(path)?,
        None => ExportConfig::default(),
    };

    if let Some(ref title) = cli.title {
        config.title = title.clone();
    }
    if let Some(ref author) = cli.author {
        config.author = author.clone();
    }
    if let Some(start) = cli.start {
        config.range_start = start;
    }
    if let Some(end) = cli.end {
        config.range_end = end;
    }
    if cli.user {
        config.include_user = true;
    }
    if cli.no_agent {
        config.include_agent = false;
    }
    if cli.show_agent_name {
        config.hide_agent_name = false;
    }
    if let Some(size) = cli.chapter_size {
        config.chapter_size = size;
    }
    if let Some(locale) = cli.locale {
        config.locale = locale;
    }

    Ok(config)
}
