//! # Corporate AI CLI (`corpai`)
//!
//! ## Usage
//!
//! ```bash
//! corpai --config ./config/corpai.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `corpai login <email>` | Sign in and store the session token |
//! | `corpai logout` | Forget the session token |
//! | `corpai whoami` | Show the signed-in user |
//! | `corpai chat [QUERY]` | Ask the assistant (interactive without a query) |
//! | `corpai categories` | List knowledge-base categories |
//! | `corpai admin train` | Run the training pipeline and show the dashboard |
//! | `corpai admin preview <category>` | Chat with one category's assistant |
//! | `corpai logs list` | Recent query audit logs |
//! | `corpai logs show <id>` | Execution trace of one query |
//! | `corpai upload --category <C> <files...>` | Add PDFs to a knowledge base |
//! | `corpai completions <shell>` | Print shell completions |

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use corpai::api::ApiClient;
use corpai::chat::ChatOptions;
use corpai::progress::ProgressMode;
use corpai::session::{AuthPolicy, Session};
use corpai::{categories, chat, config, logging, login, logs, training, upload};

const DEFAULT_CONFIG: &str = "./config/corpai.toml";

/// Corporate AI CLI: secure chat, training pipeline, and audit logs.
#[derive(Parser)]
#[command(
    name = "corpai",
    about = "Corporate AI: secure chat, training pipeline and query audit logs",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/corpai.toml`; built-in defaults are used when
    /// that file does not exist.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overriding `[server] base_url`.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// More log output on stderr (`-v` info, `-vv` debug). `RUST_LOG` wins.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with e-mail and password.
    ///
    /// The password is read from `--password`, then `CORPAI_PASSWORD`,
    /// then one line of stdin.
    Login {
        /// Account e-mail.
        email: String,

        #[arg(long)]
        password: Option<String>,
    },

    /// Forget the stored session token.
    Logout,

    /// Show the signed-in user's profile.
    Whoami,

    /// Ask the assistant.
    ///
    /// With a query, runs one turn and exits. Without one, starts an
    /// interactive session; type `/help` for commands.
    Chat {
        /// Knowledge base to start in.
        #[arg(long)]
        category: Option<String>,

        /// Hide the reasoning trace.
        #[arg(long)]
        no_trace: bool,

        query: Option<String>,
    },

    /// List knowledge-base categories.
    Categories,

    /// Administration.
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },

    /// Query audit logs.
    Logs {
        #[command(subcommand)]
        action: LogsAction,
    },

    /// Upload documents to a category's knowledge base.
    Upload {
        /// Target category (defaults to `[upload] default_category`).
        #[arg(long)]
        category: Option<String>,

        files: Vec<PathBuf>,
    },

    /// Print shell completions.
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Run the knowledge-base training pipeline.
    ///
    /// Streams stage progress to stderr and prints the dashboard when
    /// the pipeline finishes.
    Train {
        /// Progress output: human, json, or off. Default: human when stderr
        /// is a TTY, otherwise off.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,
    },

    /// Chat with the assistant of one category.
    ///
    /// Auth failures do not clear the stored session.
    Preview {
        category: String,

        #[arg(long)]
        no_trace: bool,

        query: Option<String>,
    },
}

#[derive(Subcommand)]
enum LogsAction {
    /// Recent queries, newest first.
    List {
        /// Maximum entries (defaults to `[admin] logs_limit`).
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Full execution trace of one query.
    Show {
        id: i64,

        /// How many recent entries to search.
        #[arg(long)]
        limit: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "corpai", &mut std::io::stdout());
        return Ok(());
    }

    let explicit = cli.config.is_some();
    let config_path = cli.config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let mut cfg = config::load_or_default(&config_path, explicit)?;
    if let Some(url) = cli.base_url {
        cfg.server.base_url = url;
    }

    let session = Arc::new(Session::from_file(&cfg.session.token_path));
    let client = ApiClient::new(cfg.base_url()?, session.clone())?;

    match cli.command {
        Commands::Login { email, password } => {
            let password = login::resolve_password(password).await?;
            login::run_login(&client, &email, &password).await?;
        }
        Commands::Logout => {
            login::run_logout(&client)?;
        }
        Commands::Whoami => {
            login::run_whoami(&client).await?;
        }
        Commands::Chat {
            category,
            no_trace,
            query,
        } => {
            if let Some(category) = category {
                cfg.chat.default_category = category;
            }
            let options = ChatOptions::standalone(cfg.chat.show_trace && !no_trace);
            chat::run_chat(&cfg, client, session, options, query).await?;
        }
        Commands::Categories => {
            categories::run_categories(&cfg, client).await?;
        }
        Commands::Admin { action } => match action {
            AdminAction::Train { progress } => {
                let mode = progress.unwrap_or_else(ProgressMode::default_for_tty);
                training::run_train(&client, mode).await?;
            }
            AdminAction::Preview {
                category,
                no_trace,
                query,
            } => {
                let options = ChatOptions::preview(category, cfg.chat.show_trace && !no_trace);
                let client = client.with_policy(AuthPolicy::Suppress);
                chat::run_chat(&cfg, client, session, options, query).await?;
            }
        },
        Commands::Logs { action } => match action {
            LogsAction::List { limit } => {
                logs::run_list(&client, limit.unwrap_or(cfg.admin.logs_limit)).await?;
            }
            LogsAction::Show { id, limit } => {
                logs::run_show(&client, id, limit.unwrap_or(cfg.admin.logs_limit)).await?;
            }
        },
        Commands::Upload { category, files } => {
            upload::run_upload(&client, &cfg.upload, category.as_deref(), &files).await?;
        }
        Commands::Completions { .. } => unreachable!("handled before config loading"),
    }

    Ok(())
}
