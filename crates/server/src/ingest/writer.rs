// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-kind raw-sample writer workers: batch up to 256 rows or 1 s,
//! whichever comes first (§4.B write path, §5 "one writer task per
//! metric kind").

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::ingest::KNOWN_KINDS;
use crate::storage::Storage;

const BATCH_SIZE: usize = 256;
const BATCH_INTERVAL: Duration = Duration::from_secs(1);
const CHANNEL_DEPTH: usize = 4096;
const AGGREGATE_WRITE_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub struct RawSampleJob {
    pub agent_id: String,
    pub kind: String,
    pub subject: String,
    pub ts_ms: i64,
    pub fields_json: String,
}

/// Holds one bounded channel per telemetry kind; `submit` is non-blocking
/// from the caller's perspective (best-effort, drops on a full channel
/// rather than exerting backpressure onto the agent link consumer).
pub struct WriterPool {
    senders: HashMap<&'static str, mpsc::Sender<RawSampleJob>>,
}

impl WriterPool {
    pub fn spawn(storage: Storage, shutdown: CancellationToken) -> Self {
        let mut senders = HashMap::new();
        for kind in KNOWN_KINDS {
            let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
            senders.insert(*kind, tx);
            spawn_writer(*kind, rx, storage.clone(), shutdown.clone());
        }
        Self { senders }
    }

    pub fn submit(&self, job: RawSampleJob) {
        if let Some(tx) = self.senders.get(job.kind.as_str()) {
            if tx.try_send(job).is_err() {
                tracing::warn!("raw sample writer channel saturated, dropping sample");
            }
        }
    }
}

fn spawn_writer(
    kind: &'static str,
    mut rx: mpsc::Receiver<RawSampleJob>,
    storage: Storage,
    shutdown: CancellationToken,
) {
    tokio::spawn(async move {
        let mut batch = Vec::with_capacity(BATCH_SIZE);
        let mut timer = tokio::time::interval(BATCH_INTERVAL);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    flush(kind, &storage, &mut batch).await;
                    break;
                }
                _ = timer.tick() => {
                    flush(kind, &storage, &mut batch).await;
                }
                maybe_job = rx.recv() => {
                    match maybe_job {
                        Some(job) => {
                            batch.push(job);
                            if batch.len() >= BATCH_SIZE {
                                flush(kind, &storage, &mut batch).await;
                            }
                        }
                        None => {
                            flush(kind, &storage, &mut batch).await;
                            break;
                        }
                    }
                }
            }
        }
    });
}

async fn flush(kind: &str, storage: &Storage, batch: &mut Vec<RawSampleJob>) {
    if batch.is_empty() {
        return;
    }
    for job in batch.drain(..) {
        let mut attempt = 0;
        loop {
            let result = storage
                .raw_sample_insert(&job.agent_id, &job.kind, &job.subject, job.ts_ms, &job.fields_json)
                .await;
            match result {
                Ok(()) => break,
                Err(e) if attempt < AGGREGATE_WRITE_RETRIES => {
                    attempt += 1;
                    tracing::warn!(kind, err = %e, attempt, "raw sample write failed, retrying");
                    tokio::time::sleep(Duration::from_millis(200 + 37 * attempt as u64)).await;
                }
                Err(e) => {
                    tracing::error!(kind, err = %e, "raw sample write failed permanently");
                    break;
                }
            }
        }
    }
}
