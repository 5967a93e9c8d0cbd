//! Interactive confirmation on the terminal

use async_trait::async_trait;
use colored::Colorize;
use playground_lib::Confirmer;
use std::io::{self, BufRead, Write};

/// Asks on stderr and reads the answer from stdin
pub struct TerminalConfirm;

/// Only an explicit yes confirms
pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[async_trait]
impl Confirmer for TerminalConfirm {
    async fn confirm(&self, prompt: &str) -> bool {
        let prompt = prompt.to_string();
        let answer = tokio::task::spawn_blocking(move || -> io::Result<String> {
            let mut stderr = io::stderr();
            write!(stderr, "{} {} [y/N] ", "?".yellow().bold(), prompt)?;
            stderr.flush()?;

            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await;

        matches!(answer, Ok(Ok(line)) if is_yes(&line))
    }
}
