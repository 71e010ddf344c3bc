use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use draftgate::services::{GroqGenerator, TavilySearch};
use draftgate::workflow::{
    CheckpointStore, Decision, Engine, ExecutionResult, ExecutionStatus, FileCheckpointStore,
};
use std::io::Write;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory for session checkpoints
    #[arg(long, default_value = ".draftgate")]
    state_dir: String,

    /// Model to use for generation
    #[arg(long, default_value = "gemma2-9b-it")]
    model: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start a session: research the topic and draft an outline for review
    Start {
        /// Topic to write about
        #[arg(short, long)]
        topic: String,

        /// Session identifier (generated when omitted)
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Resume a suspended session with a review decision
    Resume {
        /// Session identifier
        #[arg(short, long)]
        session: String,

        /// Approve the outline
        #[arg(long)]
        approve: bool,

        /// Feedback for revision (used when not approving)
        #[arg(short, long, default_value = "")]
        feedback: String,
    },
    /// Run a full session interactively, reviewing outlines on stdin
    Run {
        /// Topic to write about
        #[arg(short, long)]
        topic: String,
    },
    /// Delete a session and its checkpoints
    Delete {
        /// Session identifier
        #[arg(short, long)]
        session: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    let generator = Arc::new(
        GroqGenerator::new(args.model.clone()).context("failed to configure generator")?,
    );
    let search = Arc::new(TavilySearch::new().context("failed to configure search")?);
    let store = Arc::new(FileCheckpointStore::new(&args.state_dir));
    let engine = Engine::new(generator, search, store.clone());

    match args.command {
        Commands::Start { topic, session } => {
            let result = engine.start(session, &topic).await?;
            print_result(&result);
        }
        Commands::Resume {
            session,
            approve,
            feedback,
        } => {
            let result = engine
                .resume(
                    &session,
                    Decision {
                        approved: approve,
                        feedback,
                    },
                )
                .await?;
            print_result(&result);
        }
        Commands::Run { topic } => {
            run_interactive(&engine, &topic).await?;
        }
        Commands::Delete { session } => {
            store.delete_session(&session).await?;
            println!("Deleted session {session}");
        }
    }

    Ok(())
}

fn print_result(result: &ExecutionResult) {
    match result.status {
        ExecutionStatus::Suspended => {
            let review = result.review.as_ref();
            println!("Session:  {}", result.session_id);
            println!("Status:   awaiting review");
            if let Some(review) = review {
                println!("\nTitle: {}\n", review.title);
                println!("Research Notes:\n{}\n", review.research_notes);
                println!("Outline:\n{}\n", review.outline);
            }
            println!(
                "Approve with:  draftgate resume --session {} --approve",
                result.session_id
            );
            println!(
                "Revise with:   draftgate resume --session {} --feedback \"...\"",
                result.session_id
            );
        }
        ExecutionStatus::Completed => {
            println!("Session:  {}", result.session_id);
            println!("Status:   completed");
            println!("\n# {}\n\n{}", result.state.title, result.state.content);
        }
    }
}

async fn run_interactive(engine: &Engine, topic: &str) -> anyhow::Result<()> {
    let mut result = engine.start(None, topic).await?;

    while result.status == ExecutionStatus::Suspended {
        print_result(&result);

        print!("\nDo you approve this outline? (yes/no): ");
        std::io::stdout().flush()?;
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        let approved = matches!(
            answer.trim().to_lowercase().as_str(),
            "yes" | "y" | "approve" | "approved"
        );

        let feedback = if approved {
            String::new()
        } else {
            print!("Feedback for improvement: ");
            std::io::stdout().flush()?;
            let mut feedback = String::new();
            std::io::stdin().read_line(&mut feedback)?;
            feedback.trim().to_string()
        };

        result = engine
            .resume(&result.session_id, Decision { approved, feedback })
            .await?;
    }

    print_result(&result);
    Ok(())
}
