//! The approval CLI (§6): an interactive REPL over the approval queue. Partial-prefix
//! item IDs are accepted everywhere an id is expected; approving or denying always
//! prompts for confirmation first.

use crate::agent::Agent;
use crate::models::{QueueItem, QueueItemStatus};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("no queue item matches id prefix `{0}`")]
    NoMatch(String),
    #[error("id prefix `{0}` matches more than one queue item")]
    AmbiguousMatch(String),
    #[error("failed to read from stdin")]
    Io(#[from] io::Error),
}

/// Resolves a (possibly partial) id against the currently pending items.
fn resolve_id(agent: &Agent, prefix: &str) -> Result<String, CliError> {
    if agent.get_item(prefix).is_some() {
        return Ok(prefix.to_string());
    }
    let matches: Vec<QueueItem> = agent
        .list_pending(usize::MAX)
        .into_iter()
        .filter(|item| item.item_id.starts_with(prefix))
        .collect();
    match matches.len() {
        0 => Err(CliError::NoMatch(prefix.to_string())),
        1 => Ok(matches[0].item_id.clone()),
        _ => Err(CliError::AmbiguousMatch(prefix.to_string())),
    }
}

fn confirm(prompt: &str) -> Result<bool, CliError> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn print_item_summary(item: &QueueItem) {
    println!(
        "{}  [{:?}]  priority={}  module={}  urgency={:?}",
        item.item_id, item.status, item.priority, item.proposal.kill_report.target_module, item.proposal.urgency
    );
}

fn print_item_detail(item: &QueueItem) {
    print_item_summary(item);
    println!("  kill_id:       {}", item.proposal.kill_report.kill_id);
    println!("  kill_reason:   {:?}", item.proposal.kill_report.kill_reason);
    println!("  severity:      {:?}", item.proposal.kill_report.severity);
    println!("  risk_score:    {:.3}", item.proposal.risk_assessment.risk_score);
    println!("  risk_level:    {:?}", item.proposal.risk_assessment.risk_level);
    println!("  summary:       {}", item.proposal.summary);
    println!("  top_factors:   {}", item.proposal.top_factors.join(", "));
    println!("  created_at:    {}", item.created_at);
    println!("  expires_at:    {}", item.expires_at);
    if let Some(notes) = &item.review_notes {
        println!("  review_notes:  {notes}");
    }
}

const HELP_TEXT: &str = "\
Commands:
  list              list pending items, highest priority first
  show <id>         show full detail for one item (accepts a partial id)
  approve <id>      approve an item and begin resurrection (prompts to confirm)
  deny <id> <reason> deny an item with a reason (prompts to confirm)
  stats             show aggregate queue counts
  refresh           re-run expiry sweep against the queue
  help              show this message
  quit              exit the CLI";

/// Runs the REPL until `quit` or EOF. `operator_id` is process-level configuration
/// (§6): the agent never accepts an identity argument per invocation.
pub fn run_repl(agent: Arc<Agent>, operator_id: &str) -> Result<(), CliError> {
    println!("resilience-approve — operator `{operator_id}`. Type `help` for commands.");
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let mut parts = line.trim().splitn(2, char::is_whitespace);
        let command = parts.next().unwrap_or("");
        let rest = parts.next().unwrap_or("").trim();

        match command {
            "" => continue,
            "list" => {
                let pending = agent.list_pending(50);
                if pending.is_empty() {
                    println!("no pending items");
                }
                for item in &pending {
                    print_item_summary(item);
                }
            }
            "show" => match resolve_id(&agent, rest) {
                Ok(id) => {
                    if let Some(item) = agent.get_item(&id) {
                        print_item_detail(&item);
                    }
                }
                Err(err) => println!("error: {err}"),
            },
            "approve" => match resolve_id(&agent, rest) {
                Ok(id) => {
                    if confirm(&format!("approve `{id}`?"))? {
                        match agent.approve_item(&id, operator_id, None) {
                            Ok(()) => println!("approved `{id}`"),
                            Err(err) => println!("error: {err}"),
                        }
                    } else {
                        println!("cancelled");
                    }
                }
                Err(err) => println!("error: {err}"),
            },
            "deny" => {
                let mut fields = rest.splitn(2, char::is_whitespace);
                let prefix = fields.next().unwrap_or("");
                let reason = fields.next().unwrap_or("").trim();
                if reason.is_empty() {
                    println!("usage: deny <id> <reason>");
                    continue;
                }
                match resolve_id(&agent, prefix) {
                    Ok(id) => {
                        if confirm(&format!("deny `{id}` with reason \"{reason}\"?"))? {
                            match agent.deny_item(&id, operator_id, reason.to_string()) {
                                Ok(()) => println!("denied `{id}`"),
                                Err(err) => println!("error: {err}"),
                            }
                        } else {
                            println!("cancelled");
                        }
                    }
                    Err(err) => println!("error: {err}"),
                }
            }
            "stats" => {
                let stats = agent.queue_stats();
                println!(
                    "pending={} approved={} denied={} expired={} cancelled={}",
                    stats.pending, stats.approved, stats.denied, stats.expired, stats.cancelled
                );
            }
            "refresh" => {
                agent.refresh();
                println!("refreshed");
            }
            "help" => println!("{HELP_TEXT}"),
            "quit" | "exit" => break,
            other => println!("unknown command `{other}`, type `help` for a list"),
        }
    }
    Ok(())
}
