//! Interactive chat prompt

use anyhow::Result;
use colored::Colorize;
use playground_lib::ChatOutcome;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::Session;
use crate::config::Config;
use crate::ChatArgs;

/// Lines starting with `/` drive the session instead of being sent
#[derive(Debug, PartialEq)]
enum Input<'a> {
    Message(&'a str),
    Clear,
    Models,
    Quit,
    Help,
    Unknown(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    match line {
        "/clear" => Input::Clear,
        "/models" => Input::Models,
        "/quit" | "/exit" => Input::Quit,
        "/help" => Input::Help,
        other if other.starts_with('/') => Input::Unknown(other),
        other => Input::Message(other),
    }
}

/// `vap chat`: settings come from flags, then stored preferences, then defaults
pub async fn repl(session: &Session, args: ChatArgs, preferences: &Config) -> Result<bool> {
    let controller = &session.controller;

    let mut settings = controller.chat_settings().await;
    if let Some(url) = args.url.or_else(|| preferences.chat_url.clone()) {
        settings.url = url;
    }
    if let Some(model) = args.model.or_else(|| preferences.chat_model.clone()) {
        settings.model = model;
    }
    if let Some(temperature) = args.temperature {
        settings.temperature = temperature;
    }
    if let Some(max_tokens) = args.max_tokens {
        settings.max_tokens = max_tokens;
    }
    controller.set_chat_settings(settings.clone()).await;

    println!(
        "{} {} ({})",
        "Chatting with".bold(),
        settings.model.cyan(),
        settings.url
    );
    println!("{}", "Type /help for commands, /quit to leave".dimmed());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("{} ", ">".green().bold());
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_input(&line) {
            Input::Quit => break,
            Input::Help => {
                println!("/clear   start a new conversation");
                println!("/models  ask the server for its model and use it");
                println!("/quit    leave the chat");
            }
            Input::Clear => {
                controller.clear_chat().await;
                println!("{}", "Conversation cleared".dimmed());
            }
            Input::Models => {
                controller.fetch_chat_models().await;
                session.flush();
            }
            Input::Unknown(command) => {
                println!("{}", format!("Unknown command: {}", command).yellow());
            }
            Input::Message(text) => match controller.send_chat(text).await {
                ChatOutcome::Ignored => {}
                ChatOutcome::Replied(reply) => println!("{}\n", reply),
                ChatOutcome::Errored(error) => println!("{}\n", error.red()),
            },
        }
    }

    Ok(true)
}
