//! Provenance deletion walkthrough
//!
//! Builds a small provenance graph in memory and deletes parts of it:
//!
//! 1. **Rule table**: which links pull neighbours into a deletion
//! 2. **Dry run**: itemized listing, nothing touched
//! 3. **Confirmation**: declining aborts without deleting
//! 4. **Forced deletion**: rows removed atomically, then artifacts erased
//! 5. **Missing ids**: warned about and skipped
//!
//! `--config` points at a TOML file overriding verbosity and rules.
//! `--interactive` asks on the terminal in step 3 instead of declining.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use provenance_delete::{
    delete_nodes, Confirm, DeleteConfig, DeleteOptions, DeleteOutcome, StdEcho, Verbosity,
};
use provenance_store::{InMemoryArtifactRepository, InMemoryGraphStore};
use provenance_types::{Link, LinkKind, Node, NodeId};
use tracing::info;

#[derive(Parser)]
#[command(name = "provenance-delete-demo")]
#[command(about = "Walk through provenance-consistent node deletion")]
struct Args {
    /// TOML file with verbosity and rule overrides
    #[arg(long)]
    config: Option<PathBuf>,

    /// Prompt on the terminal before the unforced deletion
    #[arg(long)]
    interactive: bool,
}

/// Yes/no prompt on the controlling terminal, defaulting to no.
struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

/// Declines and says so.
struct ScriptedDecline;

impl Confirm for ScriptedDecline {
    fn confirm(&mut self, prompt: &str) -> bool {
        println!("  {} {}", prompt.yellow(), "no".red());
        false
    }
}

fn header(title: &str) {
    println!();
    println!("{}", "═".repeat(72).cyan());
    println!("  {}", title.cyan().bold());
    println!("{}", "═".repeat(72).cyan());
}

/// D0 feeds workflow W1, which calls C1 (D0 -> D1) and C2 (D1 -> D2) and
/// returns D2.
fn build_graph() -> Result<(InMemoryGraphStore, InMemoryArtifactRepository)> {
    let graph = InMemoryGraphStore::new();
    let repo = InMemoryArtifactRepository::new();
    for node in [
        Node::data("D0").with_label("initial structure"),
        Node::workflow("W1").with_label("relax and bands"),
        Node::calculation("C1").with_label("relax"),
        Node::data("D1").with_label("relaxed structure"),
        Node::calculation("C2").with_label("bands"),
        Node::data("D2").with_label("band structure"),
    ] {
        repo.put_file(&node.id, "content.json", node.label.clone().into_bytes())?;
        graph.insert_node(node)?;
    }
    for link in [
        Link::new("D0", "W1", LinkKind::Input, "structure"),
        Link::new("D0", "C1", LinkKind::Input, "structure"),
        Link::new("W1", "C1", LinkKind::Call, "relax"),
        Link::new("C1", "D1", LinkKind::Create, "relaxed"),
        Link::new("W1", "C2", LinkKind::Call, "bands"),
        Link::new("D1", "C2", LinkKind::Input, "structure"),
        Link::new("C2", "D2", LinkKind::Create, "bands"),
        Link::new("W1", "D2", LinkKind::Return, "bands"),
    ] {
        graph.insert_link(link)?;
    }
    Ok((graph, repo))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => DeleteConfig::load(path)?,
        None => DeleteConfig {
            verbosity: Verbosity::Itemized,
            ..DeleteConfig::default()
        },
    };
    let base = DeleteOptions::from_config(&config);

    let (graph, repo) = build_graph()?;
    info!(
        nodes = graph.node_count()?,
        links = graph.link_count()?,
        "Provenance graph ready"
    );

    header("1. Traversal rules");
    for (rule, enabled) in config.rule_set()?.iter() {
        let state = if enabled { "on".green() } else { "off".dimmed() };
        let toggle = if rule.toggleable() { " (toggleable)" } else { "" };
        println!("  {:<22} {}{}", rule.name(), state, toggle);
    }

    header("2. Dry run: delete D1");
    let dry = DeleteOptions {
        dry_run: true,
        ..base.clone()
    };
    let mut never = |_: &str| false;
    delete_nodes(&[NodeId::from("D1")], &dry, &graph, &repo, &mut never, &mut StdEcho).await?;

    header("3. Confirmation: delete C2");
    let mut confirm: Box<dyn Confirm> = if args.interactive {
        Box::new(TerminalConfirm)
    } else {
        Box::new(ScriptedDecline)
    };
    let outcome = delete_nodes(
        &[NodeId::from("C2")],
        &base,
        &graph,
        &repo,
        confirm.as_mut(),
        &mut StdEcho,
    )
    .await?;
    match outcome {
        DeleteOutcome::Aborted { closure_size } => {
            println!("  aborted, {closure_size} node(s) kept")
        }
        DeleteOutcome::Deleted(report) => {
            println!("  deleted {} node(s)", report.nodes_deleted)
        }
        _ => {}
    }

    header("4. Forced deletion: delete D1");
    let forced = DeleteOptions {
        force: true,
        ..base.clone()
    };
    let outcome = delete_nodes(
        &[NodeId::from("D1")],
        &forced,
        &graph,
        &repo,
        &mut never,
        &mut StdEcho,
    )
    .await?;
    if let DeleteOutcome::Deleted(report) = &outcome {
        println!("{}", report.to_json()?);
        let status = if report.is_clean() {
            "clean".green()
        } else {
            "artifacts left behind".red()
        };
        println!("  cleanup: {status}");
    }
    println!(
        "  remaining: {} node(s), {} artifact(s)",
        graph.node_count()?,
        repo.artifact_count()?
    );

    header("5. Missing ids");
    delete_nodes(
        &[NodeId::from(999u64), NodeId::from("D1")],
        &forced,
        &graph,
        &repo,
        &mut never,
        &mut StdEcho,
    )
    .await?;

    println!();
    Ok(())
}
