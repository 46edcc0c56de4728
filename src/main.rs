//! Encore - Marketing Assistant with Conversational Memory
//!
//! Terminal front end over the `encore` library: chat with the assistant,
//! generate posts, and manage memory, knowledge, profiles and settings.

use anyhow::Result;
use clap::{Parser, Subcommand};
use encore::{
    config::EncoreConfig,
    generator::{ContentType, GenerationRequest},
    knowledge::{CategoryFilter, DocumentCategory},
    memory::InsightCategory,
    provider::ProviderId,
    session::Platform,
    AppContext,
};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "encore")]
#[command(author = "Encore Team")]
#[command(version)]
#[command(about = "Marketing assistant with conversational memory for music artists")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "ENCORE_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive conversation
    Chat {
        /// Target platform
        #[arg(short, long, default_value = "generic")]
        platform: Platform,
    },

    /// Send a single message and print the reply
    Ask {
        /// Message content
        message: String,

        /// Target platform
        #[arg(short, long, default_value = "generic")]
        platform: Platform,
    },

    /// Generate a ready-to-publish post
    Generate {
        /// Content type (instagram, facebook, twitter, tiktok, email, press)
        #[arg(short = 't', long, default_value = "instagram")]
        content_type: String,

        /// What the post is about
        topic: String,

        /// Additional details
        #[arg(short, long, default_value = "")]
        details: String,

        /// Desired tone
        #[arg(long, default_value = "casual")]
        tone: String,
    },

    /// Probe the selected provider
    TestConnection,

    /// Inspect or edit long-term memory
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },

    /// Manage knowledge documents
    Knowledge {
        #[command(subcommand)]
        action: KnowledgeAction,
    },

    /// Show or reset the active artist profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Manage the artist roster
    Artists {
        #[command(subcommand)]
        action: ArtistAction,
    },

    /// Provider selection, manual mode and API keys
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[derive(Subcommand)]
enum MemoryAction {
    /// Print stats, facts, insights and preferences
    Show,
    /// Record a learned fact
    AddFact { fact: String },
    /// Record an insight
    AddInsight {
        #[arg(short, long, default_value = "note")]
        category: InsightCategory,
        content: String,
    },
    /// Set a preference
    SetPref { key: String, value: String },
    /// Forget everything
    Clear,
}

#[derive(Subcommand)]
enum KnowledgeAction {
    /// List documents
    List {
        /// Include global documents
        #[arg(long)]
        global: bool,
    },
    /// Add a document
    Add {
        title: String,
        #[arg(short, long, default_value = "other")]
        category: DocumentCategory,
        content: String,
        /// Add as a global document (administrators only)
        #[arg(long)]
        global: bool,
    },
    /// Search titles and contents
    Search {
        query: String,
        #[arg(short, long, default_value = "all")]
        category: CategoryFilter,
    },
    /// Delete a document
    Delete {
        id: String,
        #[arg(long)]
        global: bool,
    },
    /// Print the documents as JSON
    Export,
    /// Append documents from a JSON file
    Import { path: PathBuf },
    /// Collection statistics
    Stats,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Print the formatted profile
    Show,
    /// Restore the built-in template
    Reset,
}

#[derive(Subcommand)]
enum ArtistAction {
    List,
    Create {
        name: String,
        #[arg(short, long, default_value = "")]
        genre: String,
    },
    Delete { id: String },
    Activate { id: String },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print settings with masked keys
    Show,
    /// Select the provider
    Provider { provider: ProviderId },
    /// Turn manual mode on or off
    Manual {
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
    /// Store an API key for a provider (empty removes it)
    SetKey { provider: ProviderId, key: String },
    /// Restore defaults
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("encore={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = EncoreConfig::load(cli.config.as_deref())?;

    if let Commands::Config { default } = cli.command {
        return show_config(if default { None } else { Some(&config) });
    }

    let app = AppContext::build(config).await?;
    app.sync_remote().await;

    let outcome = run(&app, cli.command).await;
    app.shutdown().await;
    outcome
}

async fn run(app: &AppContext, command: Commands) -> Result<()> {
    match command {
        Commands::Chat { platform } => run_chat(app, platform).await?,
        Commands::Ask { message, platform } => {
            app.session.set_platform(platform).await;
            let reply = app.session.send_message(&message).await?;
            println!("{}", reply);
        }
        Commands::Generate {
            content_type,
            topic,
            details,
            tone,
        } => {
            let content_type = ContentType::parse_lenient(&content_type);
            let request = GenerationRequest {
                content_type,
                topic,
                details,
                tone,
            };
            let text = app.generator.generate(&request).await?;
            let meta = app.generator.metadata(&text, content_type);
            println!("{}", text);
            println!();
            println!(
                "{} chars • {} words • {} hashtags • limit {}{}",
                meta.characters,
                meta.words,
                meta.hashtags,
                meta.max_length,
                if meta.within_limit { "" } else { " (over limit)" }
            );
        }
        Commands::TestConnection => {
            let info = app.gateway.test_connection().await?;
            println!("✓ Connected to {} ({})", info.provider_name, info.model_name);
        }
        Commands::Memory { action } => run_memory(app, action).await?,
        Commands::Knowledge { action } => run_knowledge(app, action).await?,
        Commands::Profile { action } => match action {
            ProfileAction::Show => println!("{}", app.profile.formatted_context()),
            ProfileAction::Reset => {
                app.profile.reset_to_default();
                println!("Profile reset to template");
            }
        },
        Commands::Artists { action } => run_artists(app, action).await?,
        Commands::Settings { action } => run_settings(app, action).await?,
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&app.config) })?
        }
    }
    Ok(())
}

async fn run_chat(app: &AppContext, platform: Platform) -> Result<()> {
    let session = &app.session;
    session.set_platform(platform).await;

    println!("{}", session.welcome_message().await);
    println!();
    for (i, quick) in session.quick_prompts().iter().enumerate() {
        println!("  /{} {}", i + 1, quick.label);
    }
    println!("  /clear to reset the conversation, /quit to leave");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::Write::flush(&mut std::io::stdout())?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        let message = match input {
            "/quit" | "/exit" => break,
            "/clear" => {
                session.clear_messages().await?;
                println!("Conversation cleared");
                continue;
            }
            _ => quick_prompt(session.quick_prompts(), input).unwrap_or(input),
        };
        if message.is_empty() {
            continue;
        }

        match session.send_message(message).await {
            Ok(reply) => println!("\n{}", reply),
            Err(e) => eprintln!("✗ {}", e),
        }
    }
    Ok(())
}

fn quick_prompt<'a>(prompts: &'a [encore::session::QuickPrompt], input: &str) -> Option<&'a str> {
    let index: usize = input.strip_prefix('/')?.parse().ok()?;
    prompts.get(index.checked_sub(1)?).map(|q| q.prompt)
}

async fn run_memory(app: &AppContext, action: MemoryAction) -> Result<()> {
    let memory = &app.memory;
    match action {
        MemoryAction::Show => {
            let stats = memory.stats().await;
            println!(
                "{} insights, {} facts, {} preferences",
                stats.insight_count, stats.fact_count, stats.preference_count
            );
            let block = memory.context_block().await;
            if !block.is_empty() {
                println!("{}", block);
            }
        }
        MemoryAction::AddFact { fact } => {
            if !memory.add_fact(&fact).await {
                println!("Already known");
            }
        }
        MemoryAction::AddInsight { category, content } => {
            if !memory.add_insight(category, &content).await {
                println!("Already known");
            }
        }
        MemoryAction::SetPref { key, value } => memory.set_preference(&key, &value).await,
        MemoryAction::Clear => {
            memory.clear().await;
            println!("Memory cleared");
        }
    }
    Ok(())
}

async fn run_knowledge(app: &AppContext, action: KnowledgeAction) -> Result<()> {
    let knowledge = &app.knowledge;
    match action {
        KnowledgeAction::List { global } => {
            for doc in knowledge.list(global).await {
                let scope = if doc.is_global { " (global)" } else { "" };
                println!("{}  [{}] {}{}", doc.id, doc.category.display_name(), doc.title, scope);
            }
        }
        KnowledgeAction::Add {
            title,
            category,
            content,
            global,
        } => {
            let doc = if global {
                knowledge.add_global(&title, category, &content).await?
            } else {
                knowledge.add(&title, category, &content).await?
            };
            println!("Added {}", doc.id);
        }
        KnowledgeAction::Search { query, category } => {
            for doc in knowledge.search(&query, category).await {
                println!("{}  [{}] {}", doc.id, doc.category.display_name(), doc.title);
            }
        }
        KnowledgeAction::Delete { id, global } => {
            let deleted = if global {
                knowledge.delete_global(&id).await?
            } else {
                knowledge.delete(&id).await
            };
            if !deleted {
                anyhow::bail!("no document with id {}", id);
            }
        }
        KnowledgeAction::Export => println!("{}", knowledge.export_json().await?),
        KnowledgeAction::Import { path } => {
            let raw = tokio::fs::read_to_string(&path).await?;
            let count = knowledge.import_json(&raw).await?;
            println!("Imported {} documents", count);
        }
        KnowledgeAction::Stats => {
            println!("{}", serde_json::to_string_pretty(&knowledge.stats().await)?);
        }
    }
    Ok(())
}

async fn run_artists(app: &AppContext, action: ArtistAction) -> Result<()> {
    let roster = &app.roster;
    match action {
        ArtistAction::List => {
            for artist in roster.list().await {
                let marker = if artist.is_active { "*" } else { " " };
                println!("{} {}  {} ({})", marker, artist.id, artist.name, artist.genre);
            }
        }
        ArtistAction::Create { name, genre } => {
            let artist = roster.create(&name, &genre).await?;
            println!("Created {} ({})", artist.name, artist.id);
        }
        ArtistAction::Delete { id } => roster.delete(&id).await?,
        ArtistAction::Activate { id } => {
            let artist = roster.set_active(&id).await?;
            println!("Active artist: {}", artist.name);
        }
    }
    Ok(())
}

async fn run_settings(app: &AppContext, action: SettingsAction) -> Result<()> {
    let settings = &app.settings;
    match action {
        SettingsAction::Show => {
            println!("{}", serde_json::to_string_pretty(&settings.view().await)?);
        }
        SettingsAction::Provider { provider } => app.gateway.select(provider).await?,
        SettingsAction::Manual { enabled } => settings.set_manual_mode(enabled).await?,
        SettingsAction::SetKey { provider, key } => settings.set_credential(provider, &key).await?,
        SettingsAction::Reset => settings.reset().await?,
    }
    Ok(())
}

fn show_config(config: Option<&EncoreConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    println!("{}", config.to_toml()?);
    Ok(())
}
