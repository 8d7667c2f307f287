use gitscope::config::Settings;
use gitscope::{GitVersion, Repository};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Inspection front-end for the engine: open the repository at the current
/// directory, run one refresh cycle, and print what the model sees.
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let settings = match Settings::load_or_default() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error loading settings: {e}");
            std::process::exit(1);
        }
    };

    let binary = settings
        .git
        .binary
        .clone()
        .unwrap_or_else(|| "git".into());
    if let Err(e) = GitVersion::validate(&binary) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let repo = match Repository::discover() {
        Ok(repo) => Arc::new(repo),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = repo.refresh().await {
        eprintln!("Refresh failed: {e}");
        std::process::exit(1);
    }

    let snapshot = repo.snapshot();

    match snapshot.head() {
        Some(head) => println!("On branch {} ({})", head.name, &head.target[..7.min(head.target.len())]),
        None => println!("Detached HEAD"),
    }

    let branches = snapshot.branches().count();
    let tags = snapshot.tags().count();
    println!(
        "{} commits, {} branches, {} tags, {} graph lanes",
        snapshot.graph().len(),
        branches,
        tags,
        snapshot.graph().lane_count()
    );

    let status = snapshot.status();
    if status.is_clean() {
        println!("Working tree clean");
    } else {
        println!(
            "{} staged, {} unstaged changes",
            status.staged.len(),
            status.unstaged.len()
        );
    }
    if status.in_merge {
        println!("Merge in progress");
    }
    if status.in_rebase {
        println!("Rebase in progress");
    }

    for node in snapshot.graph().nodes().iter().take(10) {
        let refs = snapshot.refs_at(&node.commit.id);
        let labels = if refs.is_empty() {
            String::new()
        } else {
            format!(" ({})", refs.join(", "))
        };
        println!(
            "{} {:>3} {}{}",
            &node.commit.id[..7.min(node.commit.id.len())],
            node.generation,
            node.commit.summary(),
            labels
        );
    }
}
