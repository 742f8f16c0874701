//! Terminal approval prompt.

use async_trait::async_trait;
use clawloop_core::tool::ToolCall;
use clawloop_security::ApprovalPrompt;
use std::io::Write;

/// Asks on stderr, reads the answer from stdin. Anything but `y`/`yes`
/// (or a failed read) is a refusal.
pub struct StdinPrompt;

#[async_trait]
impl ApprovalPrompt for StdinPrompt {
    async fn confirm(&self, call: &ToolCall) -> bool {
        let args = serde_json::to_string(&call.arguments).unwrap_or_default();
        eprintln!();
        eprintln!("  Allow {}?", call.name);
        eprintln!("    {}", preview(&args, 200));
        eprint!("  [y/N] > ");
        let _ = std::io::stderr().flush();

        match read_line().await {
            Ok(Some(answer)) => is_yes(&answer),
            _ => false,
        }
    }
}

/// One line from stdin, without the newline. `None` at end of input.
pub async fn read_line() -> std::io::Result<Option<String>> {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        match std::io::stdin().read_line(&mut line)? {
            0 => Ok(None),
            _ => Ok(Some(line.trim_end_matches(['\r', '\n']).to_string())),
        }
    })
    .await
    .map_err(std::io::Error::other)?
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}
