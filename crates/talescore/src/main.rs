mod config;

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use chrono::Utc;

use config::ProjectConfig;
use talescore_core::{BatchRunner, BatchSettings, BatchSummary};
use talescore_db::{Database, TaleRecord};
use talescore_logging::{LogFormat, Logger};
use talescore_provider::{ProviderConfig, ProviderKind};
use talescore_scoring::DEFAULT_CONTENT_BUDGET;

#[derive(Parser, Debug)]
#[command(
    name = "talescore",
    about = "Multi-model content scoring for tales",
    version,
    author
)]
struct Cli {
    /// Database path (default: ~/.local/share/talescore/talescore.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score published tales across the configured model backends
    Score {
        /// Restrict the run to a single tale by slug
        #[arg(short, long)]
        tale: Option<String>,

        /// Providers to score with (default: all with stored credentials)
        #[arg(short, long, value_enum)]
        provider: Vec<ProviderChoice>,

        /// Model identifier override (requires a single --provider)
        #[arg(short, long)]
        model: Option<String>,

        /// Character budget for content interpolated into the prompt
        #[arg(long)]
        content_budget: Option<usize>,

        /// Per-request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Log output format
        #[arg(long, value_enum, default_value = "pretty")]
        log_format: LogFormatChoice,

        /// Output final result as JSON
        #[arg(long)]
        json_output: bool,

        /// Dry run: show what would happen without calling any provider
        #[arg(long)]
        dry_run: bool,
    },

    /// Create or update a tale from a markdown file
    Sync {
        /// Tale slug
        slug: String,

        /// Path to the markdown content file
        #[arg(short, long)]
        file: PathBuf,

        /// Title (default: first `#` heading in the file, then the slug)
        #[arg(long)]
        title: Option<String>,

        /// Short excerpt
        #[arg(long)]
        excerpt: Option<String>,
    },

    /// Manage stored provider API keys
    Credentials {
        #[command(subcommand)]
        action: CredentialsAction,
    },
}

#[derive(Subcommand, Debug)]
enum CredentialsAction {
    /// Store a credential value under a name
    Set { name: String, value: String },
    /// List stored credential names (values are never printed)
    List,
    /// Remove a stored credential
    Delete { name: String },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProviderChoice {
    Gemini,
    Claude,
    Gpt,
    Grok,
}

impl From<ProviderChoice> for ProviderKind {
    fn from(choice: ProviderChoice) -> Self {
        match choice {
            ProviderChoice::Gemini => ProviderKind::Google,
            ProviderChoice::Claude => ProviderKind::Anthropic,
            ProviderChoice::Gpt => ProviderKind::OpenAi,
            ProviderChoice::Grok => ProviderKind::Xai,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let working_dir = std::env::current_dir().context("Failed to get current directory")?;
    let project = ProjectConfig::load(&working_dir)?.unwrap_or_default();

    let db = open_database(cli.db.as_deref(), project.db_path.as_deref())?;

    match cli.command {
        Command::Score {
            tale,
            provider,
            model,
            content_budget,
            timeout,
            log_format,
            json_output,
            dry_run,
        } => {
            let settings = build_settings(
                &project,
                tale,
                &provider,
                model,
                content_budget,
                timeout,
            )?;
            run_score(db, settings, log_format.into(), json_output, dry_run).await
        }
        Command::Sync {
            slug,
            file,
            title,
            excerpt,
        } => run_sync(&db, &slug, &file, title, excerpt),
        Command::Credentials { action } => run_credentials(&db, action),
    }
}

fn open_database(cli_path: Option<&Path>, config_path: Option<&str>) -> Result<Database> {
    // CLI flag wins over talescore.toml
    let path = cli_path
        .map(Path::to_path_buf)
        .or_else(|| config_path.map(PathBuf::from));

    match path {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            Database::open_at(&path)
                .with_context(|| format!("Failed to open database at {}", path.display()))
        }
        None => Database::open().context("Failed to open default database"),
    }
}

fn build_settings(
    project: &ProjectConfig,
    tale: Option<String>,
    provider_flags: &[ProviderChoice],
    model: Option<String>,
    content_budget: Option<usize>,
    timeout: Option<u64>,
) -> Result<BatchSettings> {
    let providers = if !provider_flags.is_empty() {
        provider_flags.iter().map(|p| ProviderKind::from(*p)).collect()
    } else if let Some(names) = &project.providers {
        names
            .iter()
            .map(|name| name.parse::<ProviderKind>().map_err(anyhow::Error::msg))
            .collect::<Result<Vec<_>>>()
            .context("Invalid provider in talescore.toml")?
    } else {
        ProviderKind::ALL.to_vec()
    };

    let mut provider_config = ProviderConfig::default();
    if let Some(model) = model.or_else(|| project.model.clone()) {
        // A model override applies to every selected provider, and score
        // rows are keyed by (tale, model)
        if providers.len() > 1 {
            anyhow::bail!(
                "--model requires exactly one provider, but {} are selected",
                providers.len()
            );
        }
        provider_config = provider_config.with_model(model);
    }
    if let Some(secs) = timeout.or(project.timeout_secs) {
        provider_config = provider_config.with_timeout(Duration::from_secs(secs));
    }

    Ok(BatchSettings {
        providers,
        provider_config,
        content_budget: content_budget
            .or(project.content_budget)
            .unwrap_or(DEFAULT_CONTENT_BUDGET),
        slug: tale,
    })
}

async fn run_score(
    db: Database,
    settings: BatchSettings,
    log_format: LogFormat,
    json_output: bool,
    dry_run: bool,
) -> Result<()> {
    let db = Arc::new(db);

    if dry_run {
        return print_dry_run(&db, &settings);
    }

    talescore_logging::init_tracing("info", log_format);
    let logger = Arc::new(Logger::new(log_format));
    let runner = BatchRunner::new(db, logger, settings);

    // Handle Ctrl+C gracefully
    let interrupt_handle = runner.interrupt_handle();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted. Finishing current tale...");
        interrupt_handle.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    let summary = runner.run().await?;

    if json_output {
        let json = serde_json::to_string_pretty(&summary)?;
        println!("{}", json);
    } else {
        print_summary(&summary);
    }

    std::process::exit(summary.exit_code());
}

fn print_dry_run(db: &Database, settings: &BatchSettings) -> Result<()> {
    let tales = db.tales().list_published(&talescore_db::TaleFilter {
        slug: settings.slug.clone(),
    })?;
    let keys = db.credentials().names()?;

    println!("=== Dry Run ===");
    println!("Tales: {}", tales.len());
    for tale in &tales {
        println!("  {} ({})", tale.slug, tale.title);
    }
    for kind in &settings.providers {
        let has_key = keys.iter().any(|name| name == kind.credential_name());
        println!(
            "Provider {}: {}",
            kind,
            if has_key {
                "credential stored"
            } else {
                "missing credential (would be skipped)"
            }
        );
    }
    println!("Content budget: {} chars", settings.content_budget);
    println!("Timeout: {:?}", settings.provider_config.timeout);
    Ok(())
}

fn print_summary(summary: &BatchSummary) {
    eprintln!();
    if summary.is_interrupted() {
        eprintln!("=== INTERRUPTED ===");
    } else if summary.scored() > 0 {
        eprintln!("=== COMPLETE ===");
    } else {
        eprintln!("=== NOTHING SCORED ===");
    }
    eprintln!(
        "Model scores: {} succeeded, {} failed",
        summary.scored(),
        summary.failed()
    );
    for result in summary.results() {
        match result.average {
            Some(average) => eprintln!("  {} -> {:.1} ({} models)", result.slug, average, result.models.len()),
            None => eprintln!("  {} -> no score", result.slug),
        }
    }
}

fn run_sync(
    db: &Database,
    slug: &str,
    file: &Path,
    title: Option<String>,
    excerpt: Option<String>,
) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let content = content.trim().to_string();
    if content.is_empty() {
        anyhow::bail!("{} is empty", file.display());
    }

    let title = title
        .or_else(|| heading_title(&content))
        .unwrap_or_else(|| slug.to_string());

    let updated = db
        .tales()
        .update_content(slug, &title, excerpt.as_deref(), &content)?;

    if updated {
        println!("Updated tale '{}'", slug);
    } else {
        db.tales().save(&TaleRecord {
            id: uuid::Uuid::new_v4().to_string(),
            slug: slug.to_string(),
            title,
            excerpt,
            content,
            status: "published".to_string(),
            stepten_score: None,
            score_breakdown: None,
            updated_at: Utc::now(),
        })?;
        println!("Created tale '{}'", slug);
    }
    Ok(())
}

/// First `#` heading in a markdown document, if any.
fn heading_title(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())
}

fn run_credentials(db: &Database, action: CredentialsAction) -> Result<()> {
    match action {
        CredentialsAction::Set { name, value } => {
            db.credentials().set(&name, &value)?;
            println!("Stored credential '{}'", name);
            if !talescore_db::CREDENTIAL_NAMES.contains(&name.as_str()) {
                eprintln!(
                    "Note: '{}' is not read by any provider. Known names: {}",
                    name,
                    talescore_db::CREDENTIAL_NAMES.join(", ")
                );
            }
        }
        CredentialsAction::List => {
            let names = db.credentials().names()?;
            if names.is_empty() {
                println!("No credentials stored.");
            } else {
                for name in names {
                    println!("{}", name);
                }
            }
        }
        CredentialsAction::Delete { name } => {
            let removed = db.credentials().delete(&name)?;
            if removed {
                println!("Removed credential '{}'", name);
            } else {
                anyhow::bail!("No credential named '{}'", name);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_title() {
        assert_eq!(
            heading_title("# My Tale\n\nBody text.").as_deref(),
            Some("My Tale")
        );
        assert_eq!(
            heading_title("Intro paragraph\n\n# Later Heading\n").as_deref(),
            Some("Later Heading")
        );
        assert!(heading_title("No headings here.").is_none());
        assert!(heading_title("#not-a-heading").is_none());
    }

    #[test]
    fn test_build_settings_precedence() {
        let project = ProjectConfig {
            providers: Some(vec!["gemini".to_string()]),
            content_budget: Some(2000),
            timeout_secs: Some(10),
            db_path: None,
            model: Some("config-model".to_string()),
        };

        // CLI flags win
        let settings = build_settings(
            &project,
            Some("a-slug".to_string()),
            &[ProviderChoice::Grok],
            Some("cli-model".to_string()),
            Some(500),
            Some(3),
        )
        .unwrap();
        assert_eq!(settings.providers, vec![ProviderKind::Xai]);
        assert_eq!(settings.content_budget, 500);
        assert_eq!(settings.provider_config.model.as_deref(), Some("cli-model"));
        assert_eq!(settings.provider_config.timeout, Duration::from_secs(3));
        assert_eq!(settings.slug.as_deref(), Some("a-slug"));

        // Config fills in when flags are absent
        let settings = build_settings(&project, None, &[], None, None, None).unwrap();
        assert_eq!(settings.providers, vec![ProviderKind::Google]);
        assert_eq!(settings.content_budget, 2000);
        assert_eq!(
            settings.provider_config.model.as_deref(),
            Some("config-model")
        );

        // Defaults when neither is set
        let settings = build_settings(&ProjectConfig::default(), None, &[], None, None, None).unwrap();
        assert_eq!(settings.providers, ProviderKind::ALL.to_vec());
        assert_eq!(settings.content_budget, DEFAULT_CONTENT_BUDGET);
    }

    #[test]
    fn test_model_override_requires_single_provider() {
        let err = build_settings(
            &ProjectConfig::default(),
            None,
            &[ProviderChoice::Gemini, ProviderChoice::Claude],
            Some("one-model".to_string()),
            None,
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("exactly one provider"));

        // All four providers are selected by default, so a bare --model
        // is rejected too
        assert!(build_settings(
            &ProjectConfig::default(),
            None,
            &[],
            Some("one-model".to_string()),
            None,
            None,
        )
        .is_err());

        let settings = build_settings(
            &ProjectConfig::default(),
            None,
            &[ProviderChoice::Gemini],
            Some("one-model".to_string()),
            None,
            None,
        )
        .unwrap();
        assert_eq!(settings.provider_config.model.as_deref(), Some("one-model"));
    }

    #[test]
    fn test_invalid_config_provider_is_error() {
        let project = ProjectConfig {
            providers: Some(vec!["mistral".to_string()]),
            ..Default::default()
        };
        assert!(build_settings(&project, None, &[], None, None, None).is_err());
    }
}
