use std::sync::Arc;

use anyhow::Result;
use colored::*;
use tokio::io::{AsyncBufReadExt, BufReader};

use chat_session_sdk::llm::{OpenAiProvider, TiktokenCounter};
use chat_session_sdk::logging;
use chat_session_sdk::session::InMemoryArchive;
use chat_session_sdk::{ChatSession, SessionConfig};

const DEFAULT_DIRECTIVE: &str = "You are an A.I. assistant that wants to help users.";

fn load_config() -> Result<SessionConfig> {
    let config = match std::env::var("CHAT_SESSION_CONFIG") {
        Ok(path) => SessionConfig::from_json_file(path)?,
        Err(_) => {
            let model =
                std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
            SessionConfig::new(model)
        }
    };
    Ok(config)
}

fn print_help() {
    println!(
        "{}",
        "Commands: /tokens  /refresh  /side <question>  /recall <topic>  /history  /quit"
            .dimmed()
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging()?;

    let config = load_config()?;
    let llm = Arc::new(OpenAiProvider::from_env()?);
    let session = ChatSession::builder(config)
        .archive(Arc::new(InMemoryArchive::new()))
        .build(llm, Arc::new(TiktokenCounter::new()))?;

    let directive =
        std::env::var("CHAT_DIRECTIVE").unwrap_or_else(|_| DEFAULT_DIRECTIVE.to_string());
    session.set_primary_directive(directive).await;

    tracing::info!("=== Chat session {} started ===", session.session_id());
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", "You:".cyan().bold());
        std::io::Write::flush(&mut std::io::stdout())?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let result = match input {
            "/quit" | "bye" | "goodbye" => break,
            "/tokens" => session.tokens_left().await.map(|left| {
                format!(
                    "{} tokens left of {}",
                    left,
                    session.config().token_limit
                )
            }),
            "/refresh" => session
                .refresh_session()
                .await
                .map(|_| "Conversation refreshed.".to_string()),
            "/history" => {
                for message in session.history().await {
                    println!("{} {}", format!("[{}]", message.role).dimmed(), message.content);
                }
                continue;
            }
            _ => {
                if let Some(question) = input.strip_prefix("/side ") {
                    session.side_message(question, true).await
                } else if let Some(topic) = input.strip_prefix("/recall ") {
                    session
                        .recall_prior_conversation(topic, 3)
                        .await
                        .map(|n| format!("Recalled {} earlier exchanges.", n))
                } else {
                    session.send_message(input).await
                }
            }
        };

        match result {
            Ok(text) => println!("{} {}", "Agent:".green().bold(), text),
            Err(e) => eprintln!("{} {}", "Error:".red().bold(), e),
        }
    }

    tracing::info!("=== Chat session ended ===");
    Ok(())
}
