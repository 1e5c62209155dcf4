use std::path::PathBuf;

use faxlog_state::EventSummary;
use faxlog_state::StateRuntime;

#[derive(Debug, clap::Args)]
pub(crate) struct SummaryArgs {
    /// Print the counts as JSON.
    #[arg(long)]
    json: bool,
}

pub(crate) async fn run(db_path: PathBuf, args: SummaryArgs) -> anyhow::Result<()> {
    let runtime = StateRuntime::open(db_path).await?;
    let summary = runtime.summary().await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", format_summary(&summary));
    }
    Ok(())
}

fn format_summary(summary: &EventSummary) -> String {
    [
        ("events", summary.total_events),
        ("calls unclassified", summary.unclassified_calls),
        ("calls missed", summary.missed_calls),
        ("calls answered", summary.answered_calls),
        ("receptions unclassified", summary.unclassified_receptions),
        ("receptions incomplete", summary.incomplete_receptions),
        ("receptions complete", summary.complete_receptions),
        ("missed awaiting correlation", summary.pending_correlation),
        ("missed correlated", summary.correlated),
        ("missed censored", summary.censored),
        ("missed log rows", summary.missed_log_rows),
    ]
    .into_iter()
    .map(|(label, count)| format!("{label:<28}{count}"))
    .collect::<Vec<_>>()
    .join("\n")
}
