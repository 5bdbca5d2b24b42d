use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::chain::MinerClient;
use crate::reason_codes::{
    REASON_WORKER_MALFORMED, REASON_WORKER_TIMEOUT, REASON_WORKER_TRANSPORT, reason_code_name,
};
use crate::types::{JobDescription, MinerAnswer, WorkerRecord};

/// Send `job` to every worker with at most `concurrency` calls in flight.
///
/// Each call gets its own `call_timeout`. Timeouts, transport errors and malformed
/// payloads all become `None` for that worker; every worker appears in the result.
pub async fn poll_workers(
    miners: Arc<dyn MinerClient>,
    workers: &[WorkerRecord],
    job: &JobDescription,
    call_timeout: Duration,
    concurrency: usize,
) -> BTreeMap<u64, Option<MinerAnswer>> {
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut calls = JoinSet::new();
    for worker in workers.iter().cloned() {
        let miners = Arc::clone(&miners);
        let permits = Arc::clone(&permits);
        let job = job.clone();
        calls.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return (worker.id, None);
            };
            let call = miners.fetch(&worker, &job, call_timeout);
            let answer = match timeout(call_timeout, call).await {
                Err(_) => {
                    debug!(
                        worker_id = worker.id,
                        reason = reason_code_name(REASON_WORKER_TIMEOUT),
                        "worker call timed out"
                    );
                    None
                }
                Ok(Err(err)) => {
                    debug!(
                        worker_id = worker.id,
                        reason = reason_code_name(REASON_WORKER_TRANSPORT),
                        error = %err,
                        "worker call failed"
                    );
                    None
                }
                Ok(Ok(raw)) => match MinerAnswer::from_value(raw) {
                    Ok(answer) => Some(answer),
                    Err(err) => {
                        debug!(
                            worker_id = worker.id,
                            reason = reason_code_name(REASON_WORKER_MALFORMED),
                            error = %err,
                            "worker answer rejected"
                        );
                        None
                    }
                },
            };
            (worker.id, answer)
        });
    }

    let mut answers: BTreeMap<u64, Option<MinerAnswer>> =
        workers.iter().map(|w| (w.id, None)).collect();
    while let Some(joined) = calls.join_next().await {
        match joined {
            Ok((uid, answer)) => {
                answers.insert(uid, answer);
            }
            Err(err) => warn!(error = %err, "worker call task aborted"),
        }
    }
    answers
}
