//! JSONL export of audit events.
//!
//! One event per line, oldest first, each carrying the `$schema` URL.

use std::io::Write;

use tracing::info;

use crate::audit::{self, SelfAuditWriter};
use crate::models::filter::EventFilter;
use crate::models::self_audit::ExportDetails;
use crate::persistence::Store;
use crate::{AppError, Result};

/// Events fetched per store round trip.
pub const EXPORT_BATCH_SIZE: i64 = 500;

/// Write every event matching `filter` to `out` and record an `export`
/// self-audit.
///
/// `filter.limit` and `filter.offset` are ignored; path and command globs
/// apply. `output_path` is only recorded in the self-audit details.
///
/// # Errors
///
/// Returns `AppError::Db` if a query fails or `AppError::Io` if writing fails.
pub async fn export_jsonl<W: Write>(
    store: &Store,
    filter: &EventFilter,
    out: &mut W,
    output_path: Option<&str>,
) -> Result<u64> {
    let mut written: u64 = 0;
    let mut cursor = None;
    loop {
        let batch = store
            .events
            .query_after(filter, cursor, EXPORT_BATCH_SIZE)
            .await?;
        let Some(last) = batch.last() else {
            break;
        };
        cursor = Some((last.timestamp, last.id));
        let full = i64::try_from(batch.len()).unwrap_or(i64::MAX) >= EXPORT_BATCH_SIZE;

        for event in batch.iter().filter(|e| filter.matches_payload(e)) {
            let line = serde_json::to_string(&event.to_export_value()?)?;
            writeln!(out, "{line}").map_err(|e| AppError::Io(format!("export write failed: {e}")))?;
            written += 1;
        }
        if !full {
            break;
        }
    }
    out.flush()
        .map_err(|e| AppError::Io(format!("export flush failed: {e}")))?;

    let writer = SelfAuditWriter::new(store.self_audits.clone());
    writer
        .write_or_warn(&audit::export_record(&ExportDetails {
            format: "jsonl".into(),
            event_count: written,
            output_path: output_path.map(str::to_owned),
        }))
        .await;
    info!(events = written, "export completed");
    Ok(written)
}
