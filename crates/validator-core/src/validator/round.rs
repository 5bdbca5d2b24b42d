use super::*;
use crate::policy::bounded_score;
use crate::types::{
    AbortReason, JobDescription, RoundOutcome, RoundReport, RoundResult, TimeWindow, TokenPair,
    WorkerRecord,
};
use rand::Rng;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, error, info, warn};

enum JobSelection {
    Ready { window: TimeWindow, pair: TokenPair },
    Abort { window: Option<TimeWindow>, abort: AbortReason },
}

struct Dispatch<'a> {
    window: TimeWindow,
    pair: TokenPair,
    workers: &'a [WorkerRecord],
}

impl Dispatch<'_> {
    fn report(&self, answers_received: usize, outcome: RoundOutcome) -> RoundReport {
        RoundReport {
            window: Some(self.window),
            pair: Some(self.pair.clone()),
            workers_polled: self.workers.len(),
            answers_received,
            outcome,
        }
    }
}

fn aborted(abort: AbortReason) -> RoundOutcome {
    RoundOutcome::Aborted { abort }
}

impl Validator {
    /// Run one validation round end to end.
    ///
    /// Aborts are reported through [`RoundOutcome::Aborted`]. `Err` is reserved for
    /// ledger, chain or oracle failures; [`is_fatal`] tells which of those end the process.
    pub async fn run_round<R: Rng + Send + ?Sized>(&self, rng: &mut R) -> Result<RoundReport> {
        let snapshot = self.directory.snapshot().await.context("resolve worker directory")?;
        let own_key = self.identity.identity_key();
        let own_uid = snapshot.require_registered(&own_key)?;
        let exclude = self.config.exclude_self.then_some(own_key.as_str());
        let workers = snapshot.eligible_workers(exclude);
        debug!(validator_uid = own_uid, workers = workers.len(), "resolved worker directory");

        if workers.is_empty() {
            let abort = AbortReason::NoWorkers;
            warn!(reason = %abort, "round aborted");
            return Ok(RoundReport {
                window: None,
                pair: None,
                workers_polled: 0,
                answers_received: 0,
                outcome: aborted(abort),
            });
        }

        let (window, pair) = match self.select_job().await? {
            JobSelection::Ready { window, pair } => (window, pair),
            JobSelection::Abort { window, abort } => {
                warn!(reason = %abort, "round aborted");
                return Ok(RoundReport {
                    window,
                    pair: None,
                    workers_polled: 0,
                    answers_received: 0,
                    outcome: aborted(abort),
                });
            }
        };
        let dispatch = Dispatch {
            window,
            pair,
            workers: &workers,
        };
        let job = JobDescription::new(&dispatch.pair, &dispatch.window);
        info!(
            window = %dispatch.window,
            pool = %dispatch.pair,
            workers = workers.len(),
            "dispatching job"
        );

        let mut round = RoundResult {
            answers: poll_workers(
                Arc::clone(&self.miners),
                &workers,
                &job,
                self.config.call_timeout,
                self.config.poll_concurrency,
            )
            .await,
            ..RoundResult::default()
        };
        let received = round.answers.values().filter(|a| a.is_some()).count();
        info!(received, polled = workers.len(), "collected worker answers");

        let Some(consensus) = select_majority(&round.answers) else {
            let abort = AbortReason::NoQuorum;
            warn!(
                window = %dispatch.window,
                pool = %dispatch.pair,
                reason = %abort,
                "round aborted"
            );
            return Ok(dispatch.report(received, aborted(abort)));
        };
        round.consensus_fingerprint = Some(consensus.fingerprint.clone());
        debug!(
            fingerprint = %consensus.fingerprint,
            members = consensus.members.len(),
            "majority fingerprint selected"
        );

        let Some(accepted) = consensus
            .members
            .first()
            .and_then(|uid| round.answers.get(uid).cloned().flatten())
        else {
            let abort = AbortReason::NoQuorum;
            warn!(reason = %abort, "round aborted");
            return Ok(dispatch.report(received, aborted(abort)));
        };

        if let Some(failure) = verify_sample(
            self.oracle.as_ref(),
            &dispatch.window,
            &dispatch.pair,
            &accepted,
            self.config.sample_size,
            rng,
        )
        .await?
        {
            let abort = AbortReason::VerificationFailed { failure };
            warn!(
                window = %dispatch.window,
                pool = %dispatch.pair,
                reason = %abort,
                "round aborted"
            );
            return Ok(dispatch.report(received, aborted(abort)));
        }

        for (uid, answer) in &round.answers {
            let score = match answer {
                Some(a) if a.overall_hash == consensus.fingerprint => {
                    bounded_score(self.policy.as_ref(), Some(a), &accepted)
                }
                Some(_) => continue,
                None => bounded_score(self.policy.as_ref(), None, &accepted),
            };
            round.scores.insert(*uid, score);
        }
        round.accepted = Some(accepted);

        let vote = build_vote(&round.scores, self.config.max_allowed_weights);
        if vote.is_empty() {
            let abort = AbortReason::NoPositiveScores;
            warn!(
                window = %dispatch.window,
                pool = %dispatch.pair,
                reason = %abort,
                "round aborted"
            );
            return Ok(dispatch.report(received, aborted(abort)));
        }

        self.chain
            .submit_vote(&self.identity, &vote, self.subnet_id)
            .await
            .context("submit weight vote")?;
        info!(
            entries = vote.len(),
            total_weight = vote.total_weight(),
            "weight vote submitted"
        );

        let archived = self.commit(&dispatch, &round).await?;
        Ok(dispatch.report(
            received,
            RoundOutcome::Committed {
                fingerprint: consensus.fingerprint,
                vote,
                archived_events: archived,
            },
        ))
    }

    /// Oldest window with an open pair, rolling over windows that hold no work.
    async fn select_job(&self) -> Result<JobSelection> {
        for _ in 0..=self.config.max_window_hops {
            let window = self.with_ledger(|l| l.next_time_window()).await?;
            if window.end_datetime() > (self.clock)() {
                return Ok(JobSelection::Abort {
                    window: Some(window),
                    abort: AbortReason::WindowNotClosed { window },
                });
            }

            if let Some(open) = self.first_open_pair(window).await? {
                return Ok(JobSelection::Ready { window, pair: open });
            }

            let known = self.with_ledger(move |l| l.token_pairs(&window)).await?;
            if known.is_empty() {
                let discovered = self
                    .oracle
                    .fetch_token_pairs(window.start_datetime(), window.end_datetime())
                    .await
                    .context("oracle token pairs")?;
                if !discovered.is_empty() {
                    let inserted = self
                        .with_ledger(move |l| l.ensure_token_pairs(&window, &discovered))
                        .await?;
                    info!(window = %window, inserted, "seeded token pairs");
                    if let Some(open) = self.first_open_pair(window).await? {
                        return Ok(JobSelection::Ready { window, pair: open });
                    }
                }
            }

            self.with_ledger(move |l| l.mark_window_complete(window.start, window.end))
                .await?;
            info!(window = %window, "window has no open token pairs, rolled over");
        }
        Ok(JobSelection::Abort {
            window: None,
            abort: AbortReason::NoWork,
        })
    }

    async fn first_open_pair(&self, window: TimeWindow) -> Result<Option<TokenPair>> {
        let open = self
            .with_ledger(move |l| l.next_incomplete_token_pairs(&window))
            .await?;
        Ok(open.into_iter().next().map(|task| task.pair))
    }

    /// Archive the accepted records, then mark the pair and, when it was the last, the window.
    async fn commit(&self, dispatch: &Dispatch<'_>, round: &RoundResult) -> Result<usize> {
        let window = dispatch.window;
        let pair = dispatch.pair.clone();
        let records = round
            .accepted
            .as_ref()
            .map(|a| a.data.clone())
            .unwrap_or_default();

        let archive_pair = pair.clone();
        let archived = self
            .with_archive(move |a| a.append_events(&window, &archive_pair, &records))
            .await
            .context("archive accepted records")?;

        let window_closed = self
            .with_ledger(move |l| {
                l.mark_token_pair_complete(&window, &pair.token_a, &pair.token_b, pair.fee)?;
                if l.next_incomplete_token_pairs(&window)?.is_empty() {
                    l.mark_window_complete(window.start, window.end)?;
                    return Ok(true);
                }
                Ok(false)
            })
            .await
            .context("mark tasks complete")?;
        info!(
            window = %window,
            pool = %dispatch.pair,
            archived,
            window_closed,
            "round committed"
        );
        Ok(archived)
    }

    /// Drive rounds until `max_rounds` is reached (forever when `None`) or a fatal error.
    ///
    /// Returns the number of rounds run.
    pub async fn run_loop<R: Rng + Send + ?Sized>(
        &self,
        rng: &mut R,
        max_rounds: Option<u64>,
    ) -> Result<u64> {
        let mut rounds = 0_u64;
        while max_rounds.is_none_or(|max| rounds < max) {
            let started = Instant::now();
            rounds += 1;
            match self.run_round(rng).await {
                Ok(report) => info!(
                    round = rounds,
                    reason_code = report.outcome.reason_code(),
                    committed = report.outcome.is_committed(),
                    "round finished"
                ),
                Err(err) if is_fatal(&err) => {
                    error!(round = rounds, error = %format!("{err:#}"), "fatal validator error");
                    return Err(err);
                }
                Err(err) => {
                    error!(round = rounds, error = %format!("{err:#}"), "round failed");
                }
            }
            if max_rounds.is_some_and(|max| rounds >= max) {
                break;
            }
            let delay = pacing_delay(self.config.iteration_interval, started.elapsed());
            if !delay.is_zero() {
                debug!(sleep_ms = delay.as_millis() as u64, "pacing before next round");
                tokio::time::sleep(delay).await;
            }
        }
        Ok(rounds)
    }
}
