//! `stepwise chat`: Interactive or single-message chat mode.
//!
//! Progress notifications go to stderr; answers go to stdout.

use std::io::Write;
use std::path::Path;

use stepwise_agent::{AgentLoop, Answer, ChatSession, EXAMPLE_QUERIES, EventSink};
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(
    config_path: Option<&Path>,
    message: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_with_key(config_path)?;

    let provider = stepwise_providers::build_from_config(&config)?;
    let agent = AgentLoop::from_config(provider, &config);
    let mut session = ChatSession::new();

    if let Some(msg) = message {
        let answer = ask_with_progress(&agent, &mut session, &msg).await;
        println!("{}", answer.text);
        print_new_files(&answer, &config.tools.workspace_dir);
        return Ok(());
    }

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        Stepwise Agent — Interactive Mode     ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {}", config.provider);
    println!("  Model:     {}", agent.model());
    println!("  Rounds:    up to {} per question", agent.max_rounds());
    println!("  Tools:     {}", agent.tools().names().join(", "));
    println!("  Files go:  {}", config.tools.workspace_dir.display());
    println!();
    println!("  Commands:  /files  /clear  /examples  exit");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();

        match input {
            "" => continue,
            "exit" | "quit" => break,
            "/files" => {
                print_files(&session);
                continue;
            }
            "/clear" => {
                session.clear();
                println!("  Conversation and file list cleared.");
                println!();
                continue;
            }
            "/examples" => {
                for example in EXAMPLE_QUERIES {
                    println!("  - {example}");
                }
                println!();
                continue;
            }
            _ => {}
        }

        let answer = ask_with_progress(&agent, &mut session, input).await;
        println!();
        for line in answer.text.lines() {
            println!("  Assistant > {line}");
        }
        print_new_files(&answer, &config.tools.workspace_dir);
        println!();
    }

    println!();
    println!("  Goodbye! 👋");
    println!();

    Ok(())
}

/// Run one query, printing each step notification to stderr as it arrives.
async fn ask_with_progress(agent: &AgentLoop, session: &mut ChatSession, query: &str) -> Answer {
    let (events, mut rx) = EventSink::channel();

    let ask = async move {
        let answer = agent.ask(session, query, &events).await;
        drop(events);
        answer
    };
    let progress = async {
        while let Some(event) = rx.recv().await {
            eprintln!("  {}", event.display_line());
        }
    };

    let (answer, ()) = tokio::join!(ask, progress);
    answer
}

fn print_new_files(answer: &Answer, workspace_dir: &Path) {
    if answer.new_files.is_empty() {
        return;
    }
    println!();
    println!(
        "  ✅ {} file(s) created in {}:",
        answer.new_files.len(),
        workspace_dir.display()
    );
    for file in &answer.new_files {
        println!("     📄 {}", file.name);
    }
}

fn print_files(session: &ChatSession) {
    if session.created_files.is_empty() {
        println!("  No files created yet.");
    } else {
        println!("  📁 Created files:");
        for file in session.created_files.iter() {
            println!(
                "     📄 {} ({} bytes, {})",
                file.name,
                file.content.len(),
                file.mime_type()
            );
        }
    }
    println!();
}
