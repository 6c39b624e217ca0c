use std::fmt;

use quiz_core::model::{AchievementEvent, BadgeCatalog, OptionKey};
use services::{
    AppServices, ConfigError, OptionHighlight, QuestionView, QuizConfig, QuizEngine, QuizError,
    QuizState, QuizUpdate,
};
use storage::progress::ProgressRepository;
use storage::repository::StorageError;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    Config(ConfigError),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::Config(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ArgsError {}

impl From<ConfigError> for ArgsError {
    fn from(err: ConfigError) -> Self {
        ArgsError::Config(err)
    }
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- [play]  [options]   # answer questions");
    eprintln!("  cargo run -p app -- badges  [options]   # list badges for the saved score");
    eprintln!("  cargo run -p app -- status  [options]   # show saved progress");
    eprintln!("  cargo run -p app -- reset   [options]   # start a new cycle");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url|path|memory>   (default sqlite://quiz.sqlite3)");
    eprintln!("  --source <http_url>             fetch questions from this URL");
    eprintln!("  --questions <file>              read questions from a local JSON file");
    eprintln!("  --badges <file>                 read the badge catalog from a JSON file");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUIZ_DB_URL, QUIZ_SOURCE_URL, QUIZ_QUESTIONS_FILE, QUIZ_BADGES_FILE,");
    eprintln!("  QUIZ_FETCH_TIMEOUT_SECS, QUIZ_ACHIEVEMENT_RULE, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Play,
    Badges,
    Status,
    Reset,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "play" => Some(Self::Play),
            "badges" => Some(Self::Badges),
            "status" => Some(Self::Status),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }
}

/// Apply command-line overrides on top of the environment configuration.
fn parse_args(
    mut config: QuizConfig,
    args: &mut impl Iterator<Item = String>,
) -> Result<QuizConfig, ArgsError> {
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--db" => {
                let value = require_value(args, "--db")?;
                if value.trim().is_empty() {
                    return Err(ArgsError::InvalidDbUrl { raw: value });
                }
                config = config.with_db_url(&value);
            }
            "--source" => {
                let value = require_value(args, "--source")?;
                config = config.with_source_url(&value)?;
            }
            "--questions" => {
                config = config.with_questions_file(require_value(args, "--questions")?);
            }
            "--badges" => {
                config = config.with_badges_file(require_value(args, "--badges")?);
            }
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            _ => return Err(ArgsError::UnknownArg(arg)),
        }
    }
    Ok(config)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

//
// ─── RENDERING ─────────────────────────────────────────────────────────────────
//

fn render(update: &QuizUpdate) {
    let progress = &update.snapshot.progress;
    match &update.snapshot.state {
        QuizState::Loading => println!("Loading questions..."),
        QuizState::LoadFailed { reason } => println!("Could not load questions: {reason}"),
        QuizState::Finished => {
            println!();
            println!(
                "All {} questions answered. Final score: {}",
                progress.total, progress.score
            );
        }
        state => {
            let Some(view) = QuestionView::from_state(state) else {
                return;
            };
            if !view.answered {
                println!();
                println!(
                    "Question {}  (score {}, {} of {} left)",
                    progress.question_index, progress.score, progress.remaining, progress.total
                );
            }
            render_question(&view);
        }
    }
    if let Some(event) = &update.achievement {
        render_achievement(event);
    }
}

fn render_question(view: &QuestionView) {
    if !view.answered {
        println!("{}", view.prompt);
    }
    for option in &view.options {
        let marker = match option.highlight {
            OptionHighlight::Neutral => "  ",
            OptionHighlight::SelectedCorrect => "✓ ",
            OptionHighlight::SelectedIncorrect => "✗ ",
            OptionHighlight::RevealedCorrect => "→ ",
        };
        if view.answered && option.highlight == OptionHighlight::Neutral {
            continue;
        }
        println!("  {marker}{}) {}", option.key, option.text);
    }
    if let Some(explanation) = &view.explanation {
        println!("  {explanation}");
    }
}

fn render_achievement(event: &AchievementEvent) {
    println!();
    println!("  *** Badge earned: {} [{}] ***", event.badge_name, event.badge_icon);
}

fn render_badges(catalog: &BadgeCatalog, score: u32) {
    println!("Score: {score}");
    for status in catalog.statuses(score) {
        let badge = &status.badge;
        let mark = if status.unlocked { "[x]" } else { "[ ]" };
        println!(
            "{mark} {:<28} {:>3}-{:<3} {:<12} {}",
            badge.name,
            badge.min,
            badge.max,
            badge.category.as_str(),
            badge.id
        );
    }
    match catalog.badge_for(score) {
        Some(badge) => println!("Current badge: {}", badge.name),
        None => println!("No badge yet."),
    }
}

//
// ─── COMMANDS ──────────────────────────────────────────────────────────────────
//

async fn prompt(
    lines: &mut Lines<BufReader<Stdin>>,
    text: &str,
) -> Result<Option<String>, std::io::Error> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await?;
    Ok(lines.next_line().await?.map(|line| line.trim().to_owned()))
}

fn is_quit(input: &str) -> bool {
    matches!(input.to_ascii_lowercase().as_str(), "q" | "quit" | "exit")
}

async fn play(engine: &mut QuizEngine) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match engine.resume().await {
            Ok(update) => {
                render(&update);
                break;
            }
            Err(QuizError::FetchFailed(err)) => {
                println!("Could not load questions: {err}");
                match prompt(&mut lines, "Press Enter to retry, q to quit: ").await? {
                    Some(input) if !is_quit(&input) => continue,
                    _ => return Ok(()),
                }
            }
            Err(err) => return Err(err.into()),
        }
    }

    loop {
        let step = match engine.state() {
            QuizState::Presenting { .. } => {
                let Some(input) = prompt(&mut lines, "Your answer (q to quit): ").await? else {
                    return Ok(());
                };
                if is_quit(&input) {
                    return Ok(());
                }
                if input.is_empty() {
                    continue;
                }
                engine.select_answer(OptionKey::new(input.to_uppercase())).await
            }
            QuizState::Answered { .. } => {
                match prompt(&mut lines, "Press Enter for the next question, q to quit: ").await? {
                    Some(input) if !is_quit(&input) => engine.continue_next().await,
                    _ => return Ok(()),
                }
            }
            QuizState::Finished => {
                match prompt(&mut lines, "Type r to start over, anything else to quit: ").await? {
                    Some(input) if input.eq_ignore_ascii_case("r") => engine.reset().await,
                    _ => return Ok(()),
                }
            }
            QuizState::Loading | QuizState::LoadFailed { .. } => return Ok(()),
        };

        match step {
            Ok(update) => render(&update),
            Err(QuizError::UnknownOption { key, .. }) => {
                println!("{key} is not one of the options.");
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Read a persisted field for display, treating undecodable values as unset.
fn stored<T>(loaded: Result<Option<T>, StorageError>) -> Result<Option<T>, StorageError> {
    match loaded {
        Err(StorageError::Serialization(reason)) => {
            tracing::warn!(%reason, "ignoring unreadable progress value");
            Ok(None)
        }
        other => other,
    }
}

async fn saved_score(progress: &ProgressRepository) -> Result<u32, StorageError> {
    Ok(stored(progress.load_score().await)?.unwrap_or(0))
}

async fn status(services: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let progress = ProgressRepository::new(services.storage().progress.clone());
    let index = stored(progress.load_question_index().await)?.unwrap_or(1);
    let answered = stored(progress.load_answered_ids().await)?.unwrap_or_default();
    let score = saved_score(&progress).await?;
    let current = stored(progress.load_current_question_id().await)?;

    println!("Question index: {index}");
    println!("Answered:       {}", answered.len());
    println!("Score:          {score}");
    match current {
        Some(id) => println!("Current:        {id}"),
        None => println!("Current:        (none)"),
    }
    if let Some(badge) = services.catalog().badge_for(score) {
        println!("Badge:          {}", badge.name);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Play,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Play,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let config = parse_args(QuizConfig::from_env()?, &mut argv.into_iter()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    tracing::debug!(?cmd, db = %config.db_url, "starting");

    let mut services = AppServices::from_config(&config).await?;

    match cmd {
        Command::Play => play(services.engine_mut()).await,
        Command::Badges => {
            let progress = ProgressRepository::new(services.storage().progress.clone());
            render_badges(&services.catalog(), saved_score(&progress).await?);
            Ok(())
        }
        Command::Status => status(&services).await,
        Command::Reset => {
            services.engine_mut().reset().await?;
            println!("Progress cleared. The next game starts from question 1.");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
