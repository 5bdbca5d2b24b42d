use anyhow::{Context, Result};
use rand::Rng;
use tracing::debug;

use crate::chain::GroundTruthOracle;
use crate::types::{MinerAnswer, TimeWindow, TokenPair, VerificationFailure};

/// `count` indices drawn uniformly with replacement from `0..len`. Empty when `len == 0`.
pub fn sample_indices<R: Rng + ?Sized>(len: usize, count: usize, rng: &mut R) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    (0..count).map(|_| rng.gen_range(0..len)).collect()
}

/// Spot-check `accepted` against the oracle. `Ok(None)` means every sampled record passed.
///
/// The block range is fetched once per call. Any failing sample rejects the whole answer.
pub async fn verify_sample<R: Rng + ?Sized>(
    oracle: &dyn GroundTruthOracle,
    window: &TimeWindow,
    pair: &TokenPair,
    accepted: &MinerAnswer,
    sample_size: usize,
    rng: &mut R,
) -> Result<Option<VerificationFailure>> {
    if accepted.data.is_empty() {
        return Ok(Some(VerificationFailure::EmptyPayload));
    }
    let picks = sample_indices(accepted.data.len(), sample_size, rng);
    let range = oracle
        .fetch_block_range(
            &pair.token_a,
            &pair.token_b,
            window.start_datetime(),
            window.end_datetime(),
        )
        .await
        .context("oracle block range")?;

    for idx in picks {
        let record = &accepted.data[idx];
        if !range.contains(record.block_number) {
            return Ok(Some(VerificationFailure::BlockOutOfRange {
                block_number: record.block_number,
                range,
            }));
        }
        let block = oracle
            .fetch_block_data_by_block_number(record.block_number)
            .await
            .with_context(|| format!("oracle block {}", record.block_number))?;
        if block.hash != record.hash {
            return Ok(Some(VerificationFailure::HashMismatch {
                block_number: record.block_number,
                reported: record.hash.clone(),
                authoritative: block.hash,
            }));
        }
        debug!(block_number = record.block_number, "sampled record matches oracle");
    }
    Ok(None)
}
