use std::io::{self, Write};

use acc_unlock_core::model::{RunSummary, UnlockResult};

/// Human-readable run report.
pub fn write_text(summary: &RunSummary, out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "Found {} locked files.", summary.total_locked)?;

    for skipped in &summary.skipped_folders {
        writeln!(
            out,
            "Skipped folder {} ({}): {}",
            skipped.folder_name, skipped.folder_id, skipped.error
        )?;
    }

    if summary.dry_run {
        for file in &summary.locked {
            writeln!(out, "Locked: {} ({})", file.item_name, file.item_id)?;
        }
        writeln!(out, "Dry run: no files were unlocked.")?;
        return Ok(());
    }

    for outcome in &summary.outcomes {
        match &outcome.result {
            UnlockResult::Success => {
                writeln!(out, "Unlocked: {} ({})", outcome.item_name, outcome.item_id)?
            }
            UnlockResult::Failure { status, detail } => {
                let status = status
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "no response".to_string());
                writeln!(
                    out,
                    "Failed to unlock {} ({}): {}",
                    outcome.item_name, outcome.item_id, status
                )?;
                if !detail.is_empty() {
                    writeln!(out, "    Error details: {detail}")?;
                }
            }
        }
    }
    writeln!(
        out,
        "Done: {} unlocked, {} failed.",
        summary.succeeded(),
        summary.failed()
    )
}

pub fn write_json(summary: &RunSummary, out: &mut impl Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, summary)?;
    writeln!(out)
}
