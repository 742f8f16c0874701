//! `clawloop run` and `clawloop chat`.

use std::io::{IsTerminal, Write};

use clawloop_agent::{RunOutcome, RunStatus};
use clawloop_config::AppConfig;

use super::runtime::{build_agent, root_session};
use crate::prompt::read_line;

/// Single message mode.
pub async fn once(message: String, session: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    // Prompt only when someone can answer.
    let agent = build_agent(&config, std::io::stdin().is_terminal())?;
    let mut session = root_session(&agent, &config, session).await?;

    eprint!("  Thinking...");
    let result = agent.run(&mut session, &message).await;
    eprint!("\r              \r");

    let outcome = result.map_err(|e| e.status_line())?;
    print_outcome(&outcome);
    Ok(())
}

/// Interactive mode: one run per input line on the same session.
pub async fn chat(session: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let agent = build_agent(&config, true)?;
    let mut session = root_session(&agent, &config, session).await?;

    println!();
    println!("  ClawLoop — Interactive Mode");
    println!();
    println!("  Session:   {}", session.id());
    println!("  Models:    low={} mid={} high={}", config.tiers.low, config.tiers.mid, config.tiers.high);
    println!("  Tools:     {}", agent.tool_definitions().len());
    println!("  Workdir:   {}", session.context.working_directory.display());
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = read_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input, "exit" | "quit") {
            break;
        }

        match agent.run(&mut session, input).await {
            Ok(outcome) => print_outcome(&outcome),
            Err(e) => {
                eprintln!("  [Error] {}", e.status_line());
                // Quota will not come back within this session.
                if e.is_quota() {
                    return Err(e.status_line().into());
                }
            }
        }
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn print_outcome(outcome: &RunOutcome) {
    println!();
    for line in outcome.final_response.lines() {
        println!("  Assistant > {line}");
    }
    if outcome.status == RunStatus::IterationLimit {
        eprintln!(
            "  [Stopped after {} iterations without finishing]",
            outcome.iterations
        );
    }
    println!();
}
