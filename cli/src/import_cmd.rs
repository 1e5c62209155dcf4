use std::path::PathBuf;

use anyhow::Context;
use faxlog_state::NewEvent;
use faxlog_state::StateRuntime;
use tracing::info;

const IMPORT_BATCH_SIZE: usize = 1_000;

#[derive(Debug, clap::Args)]
pub(crate) struct ImportArgs {
    /// JSON Lines file with one event per line.
    file: PathBuf,
}

pub(crate) async fn run(db_path: PathBuf, args: ImportArgs) -> anyhow::Result<()> {
    let contents = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let events = parse_events(&contents)?;
    let runtime = StateRuntime::open(db_path).await?;

    let mut imported = 0;
    for batch in events.chunks(IMPORT_BATCH_SIZE) {
        imported += runtime.insert_events(batch).await?.len();
    }
    info!(imported, file = %args.file.display(), "imported events");
    println!(
        "imported {imported} events into {}",
        runtime.db_path().display()
    );
    Ok(())
}

/// Blank lines are skipped; any malformed line fails the whole import.
fn parse_events(contents: &str) -> anyhow::Result<Vec<NewEvent>> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str::<NewEvent>(line)
                .with_context(|| format!("invalid event on line {}", index + 1))
        })
        .collect()
}
