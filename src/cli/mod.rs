//! CLI module for the feedr command-line interface.
//!
//! Provides subcommands for the news backend:
//! - `signup` / `login` / `logout` / `whoami` - Account and session
//! - `categories list` - Show the topic catalog
//! - `categories show` - Show the current topic selection
//! - `categories set` / `update` - Submit a topic selection
//! - `news` - Show today's feed
//! - `watch` - Follow live update notifications

pub mod validation;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::api::news::{drain_sse_events, AddSubcategoriesRequest, CreateCategoryRequest, CreateSubcategory};
use crate::api::auth::{LoginRequest, SignupRequest};
use crate::api::{ApiClient, ApiError};
use crate::catalog::{CategoriesPayload, Catalog};
use crate::config::Config;
use crate::news::{classify_feed, FeedStatus};
use crate::session::SessionStore;

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "feedr")]
#[command(author, version, about = "A fast, lightweight personalized AI news client", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "feedr.toml")]
    pub config: PathBuf,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// API base URL to connect to
    #[arg(long, env = "FEEDR_API_URL")]
    pub api_url: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an account and log in
    Signup {
        /// First name
        #[arg(long)]
        first_name: String,
        /// Last name
        #[arg(long)]
        last_name: String,
        /// Email address
        #[arg(long)]
        email: String,
        /// Password (min 8 characters)
        #[arg(long)]
        password: String,
        /// Password confirmation
        #[arg(long)]
        confirm_password: String,
    },

    /// Log in with email and password
    Login {
        /// Email address
        #[arg(long)]
        email: String,
        /// Password
        #[arg(long)]
        password: String,
    },

    /// Log out and discard the local session
    Logout,

    /// Show the current session
    Whoami,

    /// Topic preference commands
    #[command(subcommand)]
    Categories(CategoriesCommands),

    /// Show today's news feed
    News,

    /// Follow live update notifications
    Watch,
}

/// Categories subcommands
#[derive(Subcommand, Debug)]
pub enum CategoriesCommands {
    /// Show the full topic catalog
    List,
    /// Show the currently selected topics
    Show,
    /// Submit a first-time topic selection
    Set {
        /// Subcategory IDs to select (see 'categories list')
        topics: Vec<String>,
    },
    /// Replace the current topic selection
    Update {
        /// Subcategory IDs to select (see 'categories list')
        topics: Vec<String>,
    },
    /// Add a custom category
    Create {
        /// Category ID (lowercase, dashes/underscores)
        id: String,
        /// Display title
        title: String,
        /// Subcategories as id=Title pairs (repeatable)
        #[arg(long = "sub", value_name = "ID=TITLE")]
        subcategories: Vec<String>,
    },
    /// Add subcategories to an existing category
    AddSubcategories {
        /// Category ID to extend
        category: String,
        /// Subcategories as id=Title pairs (repeatable)
        #[arg(long = "sub", value_name = "ID=TITLE")]
        subcategories: Vec<String>,
    },
}

/// Run a CLI command
pub async fn run_command(cli: &Cli, config: &Config) -> Result<()> {
    let session = Arc::new(SessionStore::open(&config.session.data_dir));
    let mut api_config = config.api.clone();
    if let Some(url) = &cli.api_url {
        api_config.base_url = url.clone();
    }
    let client = ApiClient::new(&api_config, session)?;

    match &cli.command {
        Commands::Signup {
            first_name,
            last_name,
            email,
            password,
            confirm_password,
        } => cmd_signup(&client, first_name, last_name, email, password, confirm_password).await,
        Commands::Login { email, password } => cmd_login(&client, email, password).await,
        Commands::Logout => cmd_logout(&client).await,
        Commands::Whoami => cmd_whoami(&client),
        Commands::Categories(CategoriesCommands::List) => cmd_categories_list(),
        Commands::Categories(CategoriesCommands::Show) => cmd_categories_show(&client).await,
        Commands::Categories(CategoriesCommands::Set { topics }) => {
            cmd_categories_submit(&client, topics, false).await
        }
        Commands::Categories(CategoriesCommands::Update { topics }) => {
            cmd_categories_submit(&client, topics, true).await
        }
        Commands::Categories(CategoriesCommands::Create {
            id,
            title,
            subcategories,
        }) => cmd_categories_create(&client, id, title, subcategories).await,
        Commands::Categories(CategoriesCommands::AddSubcategories {
            category,
            subcategories,
        }) => cmd_add_subcategories(&client, category, subcategories).await,
        Commands::News => cmd_news(&client).await,
        Commands::Watch => cmd_watch(&client).await,
    }
}

/// Map an API failure to a displayable error, with a login hint when the
/// session is the problem.
fn api_failure(err: ApiError) -> anyhow::Error {
    if err.is_authentication() {
        anyhow::anyhow!(
            "{}\nRun 'feedr login' to start a new session.",
            err.message()
        )
    } else {
        anyhow::anyhow!("{}", err.message())
    }
}

async fn cmd_signup(
    client: &ApiClient,
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Result<()> {
    validation::validate_name(first_name, "First name").map_err(anyhow::Error::msg)?;
    validation::validate_name(last_name, "Last name").map_err(anyhow::Error::msg)?;
    validation::validate_email(email).map_err(anyhow::Error::msg)?;
    validation::validate_password(password, confirm_password).map_err(anyhow::Error::msg)?;

    let profile = client
        .signup(&SignupRequest {
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            email: email.to_string(),
            password: password.to_string(),
        })
        .await
        .map_err(api_failure)?;

    println!();
    println!("[OK] Account created for {}", profile.email);
    println!("You are now logged in.");
    println!();
    println!("Use 'feedr categories set' to pick your topics.");
    println!();
    Ok(())
}

async fn cmd_login(client: &ApiClient, email: &str, password: &str) -> Result<()> {
    validation::validate_email(email).map_err(anyhow::Error::msg)?;

    let profile = client
        .login(&LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        })
        .await
        .map_err(api_failure)?;

    println!();
    println!(
        "[OK] Logged in as {} {} <{}>",
        profile.first_name, profile.last_name, profile.email
    );
    println!();
    Ok(())
}

async fn cmd_logout(client: &ApiClient) -> Result<()> {
    match client.logout().await {
        Ok(()) => {
            println!();
            println!("[OK] Logged out.");
            println!();
        }
        Err(e) => {
            // Local session is already gone at this point
            println!();
            println!("[!!] Server logout failed: {}", e.message());
            println!("The local session has been discarded anyway.");
            println!();
        }
    }
    Ok(())
}

fn cmd_whoami(client: &ApiClient) -> Result<()> {
    let session = client.session().session();

    println!();
    match (session.authenticated, session.user) {
        (true, Some(user)) => {
            println!("=== Current Session ===");
            println!();
            println!("Name:    {} {}", user.first_name, user.last_name);
            println!("Email:   {}", user.email);
            println!("Role:    {}", user.role);
            if let Some(updated) = session.updated_at {
                println!("Updated: {}", updated.format("%Y-%m-%d %H:%M:%S UTC"));
            }
        }
        _ => {
            println!("[!!] Not logged in.");
            println!();
            println!("Use 'feedr login' or 'feedr signup' to start a session.");
        }
    }
    println!();
    Ok(())
}

fn cmd_categories_list() -> Result<()> {
    let catalog = Catalog::default_catalog();

    println!();
    println!(
        "{:<24}  {:<24}  {:<30}",
        "CATEGORY", "SUBCATEGORY ID", "TITLE"
    );
    println!("{}", "-".repeat(82));

    for category in &catalog.categories {
        for (i, sub) in category.subcategories.iter().enumerate() {
            let owner = if i == 0 { category.id.as_str() } else { "" };
            println!(
                "{:<24}  {:<24}  {:<30}",
                owner,
                sub.id,
                truncate(&sub.title, 30)
            );
        }
    }

    println!();
    println!("Select topics with 'feedr categories set <SUBCATEGORY_ID>...'");
    println!();
    Ok(())
}

async fn cmd_categories_show(client: &ApiClient) -> Result<()> {
    let categories = client.my_categories().await.map_err(api_failure)?;

    if categories.is_empty() {
        println!();
        println!("No topics selected yet.");
        println!("Use 'feedr categories set' to pick some.");
        println!();
        return Ok(());
    }

    println!();
    println!("=== Selected Topics ===");
    for category in &categories {
        println!();
        println!("{} ({})", category.title, category.id);
        for sub in &category.subcategories {
            println!("  - {} ({})", sub.title, sub.id);
        }
    }
    println!();
    Ok(())
}

/// Shared handler for `set` (first submission) and `update` (replacement).
async fn cmd_categories_submit(client: &ApiClient, topics: &[String], update: bool) -> Result<()> {
    validation::validate_selection(topics).map_err(anyhow::Error::msg)?;

    let catalog = Catalog::default_catalog();
    let grouped = catalog.group_selection(topics);
    if grouped.is_empty() {
        anyhow::bail!("None of the selected topics exist. See 'feedr categories list'.");
    }

    let selected: usize = grouped.iter().map(|g| g.subcategories.len()).sum();
    if selected < topics.len() {
        println!(
            "[!] {} unknown topic(s) were skipped.",
            topics.len() - selected
        );
    }

    let payload = CategoriesPayload {
        categories_data: grouped,
    };
    if update {
        client.update_categories(&payload).await.map_err(api_failure)?;
    } else {
        client.set_categories(&payload).await.map_err(api_failure)?;
    }

    println!();
    println!(
        "[OK] Preferences {} ({} topics in {} categories).",
        if update { "updated" } else { "saved" },
        selected,
        payload.categories_data.len()
    );
    println!();
    Ok(())
}

async fn cmd_categories_create(
    client: &ApiClient,
    id: &str,
    title: &str,
    subcategories: &[String],
) -> Result<()> {
    validation::validate_topic_id(id).map_err(anyhow::Error::msg)?;
    let subs = parse_topic_specs(subcategories)?;
    if subs.is_empty() {
        anyhow::bail!("A category needs at least one --sub id=Title entry.");
    }

    client
        .create_category(&CreateCategoryRequest {
            category_id: id.to_string(),
            title: title.to_string(),
            subcategories: subs,
        })
        .await
        .map_err(api_failure)?;

    println!();
    println!("[OK] Category '{}' created.", id);
    println!();
    Ok(())
}

async fn cmd_add_subcategories(
    client: &ApiClient,
    category: &str,
    subcategories: &[String],
) -> Result<()> {
    validation::validate_topic_id(category).map_err(anyhow::Error::msg)?;
    let subs = parse_topic_specs(subcategories)?;
    if subs.is_empty() {
        anyhow::bail!("Nothing to add. Pass at least one --sub id=Title entry.");
    }

    client
        .add_subcategories(&AddSubcategoriesRequest {
            category_id: category.to_string(),
            subcategories: subs,
        })
        .await
        .map_err(api_failure)?;

    println!();
    println!("[OK] Added {} subcategories to '{}'.", subcategories.len(), category);
    println!();
    Ok(())
}

async fn cmd_news(client: &ApiClient) -> Result<()> {
    let categories = client.my_categories().await.map_err(api_failure)?;
    let news = client.today_news().await.map_err(api_failure)?;

    match classify_feed(!categories.is_empty(), &news) {
        FeedStatus::NoCategories => {
            println!();
            println!("No topics selected yet.");
            println!("Use 'feedr categories set' to pick some, then come back.");
            println!();
        }
        FeedStatus::NoContent => {
            println!();
            println!("No news for your topics yet today. Check back later.");
            println!();
        }
        FeedStatus::Ready => {
            let articles = news.articles();
            println!();
            println!("=== Today's AI News ({} articles) ===", articles.len());
            println!();
            for article in articles {
                println!("[{}] {}", article.source, truncate(&article.title, 90));
                if !article.description.is_empty() {
                    println!("    {}", truncate(&article.description, 100));
                }
                println!("    {}", article.url);
                println!();
            }
        }
    }
    Ok(())
}

/// Follow the server-sent notification stream until interrupted.
async fn cmd_watch(client: &ApiClient) -> Result<()> {
    let response = client
        .open_notification_stream()
        .await
        .map_err(api_failure)?;

    println!("Watching for updates (press Ctrl+C to stop)");
    println!();

    let mut stream = response.bytes_stream();
    let mut buffer = String::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("Notification stream interrupted")?;
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        for event in drain_sse_events(&mut buffer) {
            if event == "keep-alive" {
                continue;
            }
            let ts = chrono::Local::now().format("%H:%M:%S");
            match event.as_str() {
                "news_updated" => println!("{} | New articles available, run 'feedr news'", ts),
                other => println!("{} | {}", ts, other),
            }
        }
    }

    println!();
    println!("--- Stream ended ---");
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse repeated `id=Title` arguments into subcategory payloads
fn parse_topic_specs(specs: &[String]) -> Result<Vec<CreateSubcategory>> {
    specs
        .iter()
        .map(|spec| {
            let (id, title) = spec
                .split_once('=')
                .with_context(|| format!("Invalid subcategory '{}', expected id=Title", spec))?;
            validation::validate_topic_id(id).map_err(anyhow::Error::msg)?;
            if title.trim().is_empty() {
                anyhow::bail!("Subcategory '{}' is missing a title", id);
            }
            Ok(CreateSubcategory {
                subcategory_id: id.to_string(),
                title: title.trim().to_string(),
            })
        })
        .collect()
}

/// Truncate a string to max length with ellipsis
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_topic_specs() {
        let subs = parse_topic_specs(&["llm=LLMs".to_string(), "cv=Computer Vision".to_string()])
            .unwrap();
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].subcategory_id, "llm");
        assert_eq!(subs[1].title, "Computer Vision");

        assert!(parse_topic_specs(&["no-separator".to_string()]).is_err());
        assert!(parse_topic_specs(&["llm=".to_string()]).is_err());
        assert!(parse_topic_specs(&["BAD ID=Title".to_string()]).is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a-much-longer-string", 10), "a-much-...");
    }
}
