//! `corpai categories`: the knowledge bases a chat can target.

use anyhow::Result;
use std::sync::Arc;

use crate::api::ApiClient;
use crate::chat::{ChatController, ChatOptions};
use crate::config::Config;

/// Print one category per line, marking the configured default.
pub async fn run_categories(config: &Config, client: ApiClient) -> Result<()> {
    let session = Arc::clone(client.session());
    let mut controller = ChatController::new(
        client,
        session,
        ChatOptions::standalone(false),
        &config.chat.default_category,
    );
    let categories = controller
        .load_categories(&config.chat.fallback_categories)
        .await;
    for name in categories {
        let marker = if *name == config.chat.default_category {
            "*"
        } else {
            " "
        };
        println!("  {} {}", marker, name);
    }
    Ok(())
}
