//! Background handling of one uploaded statement: parse, deliver, record.

use chrono::{Local, Utc};
use log::{error, info};
use pnl_ingest::parse_income_statement;
use std::sync::Arc;

use crate::delivery::ReportSink;
use crate::stats::StatsHandle;

pub const DELIVERY_FAILED: &str = "Failed to send to webhook";

/// Raw upload waiting to be processed.
#[derive(Debug, Clone)]
pub struct UploadJob {
    pub batch_id: String,
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadJob {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            batch_id: new_batch_id(),
            filename: filename.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Delivered { status: u16 },
    DeliveryFailed,
    ParseFailed(String),
}

/// Batch ids are the local wall-clock second, e.g. `20250203_093000`.
pub fn new_batch_id() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Parse on the blocking pool, hand the result to `sink`, update `stats`.
///
/// Never returns an error: every failure ends up in `stats.last_error`.
pub async fn process_upload(
    sink: Arc<dyn ReportSink>,
    stats: StatsHandle,
    job: UploadJob,
) -> Outcome {
    info!("Starting income statement processing: {}", job.filename);

    let UploadJob {
        batch_id,
        filename,
        bytes,
    } = job;

    let parsed = tokio::task::spawn_blocking(move || parse_income_statement(&bytes)).await;
    let statement = match parsed {
        Ok(Ok(s)) => s,
        Ok(Err(e)) => return parse_failed(&stats, e.to_string()),
        Err(e) => return parse_failed(&stats, format!("parser task failed: {e}")),
    };

    let payload = statement.into_payload(batch_id);
    match sink.deliver(&payload).await {
        Ok(status) => {
            stats.record_success(&filename, Utc::now());
            info!("Income statement processing completed: {filename}");
            Outcome::Delivered { status }
        }
        Err(e) => {
            error!("{DELIVERY_FAILED}: {e:#}");
            stats.record_failure(DELIVERY_FAILED);
            Outcome::DeliveryFailed
        }
    }
}

fn parse_failed(stats: &StatsHandle, detail: String) -> Outcome {
    let message = format!("Error processing income statement: {detail}");
    error!("{message}");
    stats.record_failure(message.clone());
    Outcome::ParseFailed(message)
}
