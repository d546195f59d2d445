//! Chat view: drives a [`ChatSession`] against a [`ChatBackend`].
//!
//! One [`ChatController`] serves both configurations of the view:
//!
//! | Command | Category | Auth failures |
//! |---------|----------|---------------|
//! | `corpai chat` | selectable, starts at the configured default | redirect to login |
//! | `corpai admin preview <category>` | fixed | suppressed (embedded) |
//!
//! The controller never reads the token itself. It watches the shared
//! [`Session`]; when the client clears the token after a 401, the next
//! turn reports [`Submission::SignedOut`] and the loop ends.

use anyhow::{bail, Result};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

use corpai_core::chat::{ChatMessage, ChatSession, Outcome, QueryOutcome, StepStatus, TraceStep};
use corpai_core::models::{UserProfile, DEFAULT_CATEGORY};

use crate::api::ChatBackend;
use crate::config::Config;
use crate::error::ClientError;
use crate::routes::Route;
use crate::session::{AuthPolicy, Session, SessionState, SignOutReason};

pub const SESSION_EXPIRED: &str = "Session expired. Run `corpai login` to sign in again.";
pub const NOT_LOGGED_IN: &str = "Not logged in. Run `corpai login` first.";

/// How a chat view is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatOptions {
    /// Lock the view to one category.
    pub forced_category: Option<String>,
    pub auth_policy: AuthPolicy,
    /// Print the reasoning trace before each answer.
    pub show_trace: bool,
}

impl ChatOptions {
    /// The standalone chat view.
    pub fn standalone(show_trace: bool) -> Self {
        Self {
            forced_category: None,
            auth_policy: AuthPolicy::Redirect,
            show_trace,
        }
    }

    /// The admin preview of one category's assistant.
    pub fn preview(category: impl Into<String>, show_trace: bool) -> Self {
        Self {
            forced_category: Some(category.into()),
            auth_policy: AuthPolicy::Suppress,
            show_trace,
        }
    }

    fn embedded(&self) -> bool {
        self.auth_policy == AuthPolicy::Suppress
    }
}

/// Result of loading the user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileLoad {
    Loaded,
    /// Continue without a profile; user messages are labelled "Staff".
    Guest,
    /// The session is gone; send the user to login.
    Redirect,
}

/// Result of one submitted line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Blank input; nothing happened.
    Ignored,
    Completed,
    /// The turn completed but the session ended during it.
    SignedOut(SignOutReason),
}

pub struct ChatController<B: ChatBackend> {
    backend: B,
    session: Arc<Session>,
    session_rx: watch::Receiver<SessionState>,
    options: ChatOptions,
    chat: ChatSession,
    profile: Option<UserProfile>,
    categories: Vec<String>,
}

impl<B: ChatBackend> ChatController<B> {
    pub fn new(
        backend: B,
        session: Arc<Session>,
        options: ChatOptions,
        default_category: &str,
    ) -> Self {
        let chat = match &options.forced_category {
            Some(category) => ChatSession::forced(category.clone()),
            None => ChatSession::new(default_category),
        };
        let session_rx = session.subscribe();
        Self {
            backend,
            session,
            session_rx,
            options,
            chat,
            profile: None,
            categories: Vec::new(),
        }
    }

    pub fn chat(&self) -> &ChatSession {
        &self.chat
    }

    pub fn options(&self) -> &ChatOptions {
        &self.options
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Fill the category list. A forced view has exactly its category;
    /// otherwise `General` plus the server's list, or `fallback` when the
    /// server cannot be asked.
    pub async fn load_categories(&mut self, fallback: &[String]) -> &[String] {
        self.categories = match &self.options.forced_category {
            Some(category) => vec![category.clone()],
            None => match self.backend.categories().await {
                Ok(list) => std::iter::once(DEFAULT_CATEGORY.to_string())
                    .chain(list.into_iter().map(|c| c.name))
                    .collect(),
                Err(e) => {
                    tracing::warn!("failed to load categories, using fallback: {}", e);
                    fallback.to_vec()
                }
            },
        };
        &self.categories
    }

    /// Load the signed-in user's profile.
    pub async fn load_profile(&mut self) -> ProfileLoad {
        if !self.session.is_authenticated() {
            return if self.options.embedded() {
                ProfileLoad::Guest
            } else {
                ProfileLoad::Redirect
            };
        }

        match self.backend.profile().await {
            Ok(profile) => {
                self.profile = Some(profile);
                ProfileLoad::Loaded
            }
            Err(e @ (ClientError::Unauthorized { .. } | ClientError::Rejected { .. })) => {
                if self.options.embedded() {
                    tracing::debug!("profile unavailable in embedded view: {}", e);
                    return ProfileLoad::Guest;
                }
                if let Err(err) = self.session.invalidate() {
                    tracing::warn!("failed to clear session: {:#}", err);
                }
                let _ = self.session_rx.borrow_and_update();
                ProfileLoad::Redirect
            }
            Err(e) => {
                tracing::warn!("failed to load profile: {}", e);
                ProfileLoad::Guest
            }
        }
    }

    /// Switch category. Returns the canonical name, or `None` when the
    /// view is forced or the category is unknown.
    pub fn select_category(&mut self, name: &str) -> Option<String> {
        if self.chat.is_forced() {
            return None;
        }
        let canonical = self
            .categories
            .iter()
            .find(|c| c.eq_ignore_ascii_case(name.trim()))?
            .clone();
        self.chat.select_category(canonical.clone());
        Some(canonical)
    }

    /// Run one query turn.
    pub async fn submit(&mut self, text: &str) -> Submission {
        let role = self
            .profile
            .as_ref()
            .map(|p| p.position.as_str())
            .filter(|p| !p.is_empty());
        let Some(pending) = self.chat.begin(text, role) else {
            return Submission::Ignored;
        };
        tracing::debug!(ticket = pending.ticket, category = %pending.category, "query submitted");

        let outcome = match self.backend.query(&pending.query, &pending.category).await {
            Ok(reply) => QueryOutcome::Replied(reply),
            Err(e) => outcome_for_error(e),
        };
        self.chat.complete(outcome);

        match self.take_sign_out() {
            Some(reason) => Submission::SignedOut(reason),
            None => Submission::Completed,
        }
    }

    fn take_sign_out(&mut self) -> Option<SignOutReason> {
        if self.options.embedded() || !self.session_rx.has_changed().unwrap_or(false) {
            return None;
        }
        match *self.session_rx.borrow_and_update() {
            SessionState::SignedOut(reason) => Some(reason),
            SessionState::Authenticated => None,
        }
    }
}

/// Map a failed query to the outcome shown in the transcript.
pub fn outcome_for_error(error: ClientError) -> QueryOutcome {
    match error {
        ClientError::Unauthorized { detail } | ClientError::Rejected { detail, .. } => {
            QueryOutcome::Rejected {
                detail: Some(detail),
            }
        }
        ClientError::Transport(e) => {
            tracing::warn!("query failed: {}", e);
            QueryOutcome::Unreachable
        }
        ClientError::Decode { endpoint, message } => {
            tracing::warn!(endpoint, "unreadable query response: {}", message);
            QueryOutcome::Unreachable
        }
    }
}

/// Reasoning trace as indented text.
pub fn render_trace(trace: &[TraceStep]) -> String {
    let mut out = String::new();
    for step in trace {
        let marker = match step.status {
            StepStatus::Pending => "[ ]",
            StepStatus::Active => "[~]",
            StepStatus::Success => "[+]",
            StepStatus::Error => "[!]",
        };
        out.push_str(&format!("  {} {}\n", marker, step.title));
        if let Some(description) = &step.description {
            for line in description.lines() {
                out.push_str(&format!("        {}\n", line));
            }
        }
    }
    out
}

/// One transcript message as printed in the terminal.
pub fn render_message(message: &ChatMessage) -> String {
    let who = match (&message.role, message.outcome) {
        (Some(role), _) => format!("You ({})", role),
        (None, Some(Outcome::Error)) => "Corporate AI (error)".to_string(),
        (None, _) => "Corporate AI".to_string(),
    };
    format!("{}:\n{}\n", who, message.content)
}

/// Print the trace (when enabled) and the newest assistant message.
fn print_turn(chat: &ChatSession, show_trace: bool) {
    if show_trace && !chat.trace().is_empty() {
        print!("{}", render_trace(chat.trace()));
    }
    if let Some(reply) = chat.messages().last() {
        println!("{}", render_message(reply));
    }
}

const HELP: &str = "\
Commands:
  /help              show this list
  /category <name>   switch knowledge base (clears the conversation)
  /categories        list knowledge bases
  /whoami            show the signed-in user
  /logout            sign out and leave
  /quit              leave";

/// `corpai chat` / `corpai admin preview`.
///
/// With `query` set, runs a single turn and exits non-zero when the
/// assistant answers with an error. Otherwise reads lines from stdin.
pub async fn run_chat<B: ChatBackend>(
    config: &Config,
    backend: B,
    session: Arc<Session>,
    options: ChatOptions,
    query: Option<String>,
) -> Result<()> {
    if !options.embedded() && Route::Chat.resolve(&session) == Route::Login {
        bail!(NOT_LOGGED_IN);
    }

    let show_trace = options.show_trace;
    let mut controller = ChatController::new(
        backend,
        session.clone(),
        options,
        &config.chat.default_category,
    );
    controller
        .load_categories(&config.chat.fallback_categories)
        .await;
    if controller.load_profile().await == ProfileLoad::Redirect {
        bail!(SESSION_EXPIRED);
    }

    if let Some(query) = query {
        let submission = controller.submit(&query).await;
        print_turn(controller.chat(), show_trace);
        if let Submission::SignedOut(_) = submission {
            bail!(SESSION_EXPIRED);
        }
        let failed = controller
            .chat()
            .messages()
            .last()
            .is_some_and(|m| m.outcome == Some(Outcome::Error));
        if failed {
            bail!("Query failed");
        }
        return Ok(());
    }

    for message in controller.chat().messages() {
        println!("{}", render_message(message));
    }
    println!("Type /help for commands.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("[{}] {} > ", controller.chat().category(), controller.chat().prompt_hint());
        let _ = std::io::stdout().flush();

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        if let Some(command) = line.strip_prefix('/') {
            let (name, arg) = command
                .split_once(char::is_whitespace)
                .map(|(n, a)| (n, a.trim()))
                .unwrap_or((command, ""));
            match name {
                "quit" | "exit" => break,
                "help" => println!("{}\n", HELP),
                "categories" => {
                    for c in controller.categories() {
                        let marker = if c == controller.chat().category() { "*" } else { " " };
                        println!("  {} {}", marker, c);
                    }
                    println!();
                }
                "category" => {
                    if controller.chat().is_forced() {
                        println!(
                            "This assistant is fixed to {}.\n",
                            controller.chat().category()
                        );
                    } else if let Some(selected) = controller.select_category(arg) {
                        println!("Switched to {}.\n", selected);
                    } else {
                        println!("Unknown category: {}. Try /categories.\n", arg);
                    }
                }
                "whoami" => match controller.profile() {
                    Some(p) => println!(
                        "{} <{}>, {} / {}\n",
                        p.display_name(),
                        p.email,
                        p.department,
                        p.position
                    ),
                    None => println!("Guest\n"),
                },
                "logout" => {
                    session.sign_out()?;
                    println!("Logged out.");
                    break;
                }
                _ => println!("Unknown command: /{}. Type /help for commands.\n", name),
            }
            continue;
        }

        match controller.submit(line).await {
            Submission::Ignored => {}
            Submission::Completed => print_turn(controller.chat(), show_trace),
            Submission::SignedOut(_) => {
                print_turn(controller.chat(), show_trace);
                bail!(SESSION_EXPIRED);
            }
        }
    }
    Ok(())
}
