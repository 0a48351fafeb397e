//! Polling orchestrator.
//!
//! A poll session is one bounded-time loop pursuing a single success
//! predicate: issue a search, decode and classify the window, evaluate the
//! predicate, then sleep until the next tick or return. Transport errors are
//! transient and tolerated up to a hard attempt cap; the wall-clock timeout
//! is measured from session start and independent of tick count.
//!
//! Stage tracking keeps a running set of distinct stages seen across ticks.
//! Whenever that set grows the attempt counter resets: a slow but progressing
//! pipeline is never failed early, while a truly stalled poll still hits the
//! cap. Observing the pipeline's failure stage short-circuits the session
//! immediately, regardless of the requested target or remaining time.

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::classify::{decode_content, DecodedMessage};
use crate::error::{EngineError, EngineResult};
use crate::seek::{SeekDirection, SeekSpec};
use crate::search::TopicSearchClient;
use crate::stages::{milestone, FAILURE_STAGE};
use crate::traits::HttpClient;

/// Terminal outcome of a poll session.
///
/// Errors (auth, topic-not-found, attempt-cap, pipeline failure stage) travel
/// in the `Result` error channel instead; an outcome is only produced by a
/// session that ran to a legitimate end.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The predicate held; carries the decoded messages of the matching
    /// window, in server emission order.
    Found(Vec<DecodedMessage>),
    /// The timeout elapsed without a match. Not an error: the caller decides
    /// whether absence is a failure.
    TimedOut,
    /// The session was cancelled before a match.
    Cancelled,
}

impl PollOutcome {
    /// Whether the predicate was satisfied.
    pub fn is_found(&self) -> bool {
        matches!(self, PollOutcome::Found(_))
    }

    /// The matched messages; empty for `TimedOut` and `Cancelled`.
    pub fn messages(&self) -> &[DecodedMessage] {
        match self {
            PollOutcome::Found(messages) => messages,
            _ => &[],
        }
    }
}

/// Cadence and bounds for one poll session.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Wall-clock budget measured from session start.
    pub timeout: Duration,
    /// Interval between search ticks.
    pub tick: Duration,
    /// Hard cap on unsuccessful attempts; reaching it is a terminal failure.
    pub max_attempts: u32,
    /// Window size requested per search.
    pub limit: u32,
}

impl PollConfig {
    /// Cadence for string and subject searches: 10s ticks, 40 attempts.
    pub fn string_search() -> Self {
        Self {
            timeout: Duration::from_secs(5 * 60),
            tick: Duration::from_secs(10),
            max_attempts: 40,
            limit: 20,
        }
    }

    /// Cadence for stage tracking: 5s ticks, 100 attempts.
    pub fn stage_search() -> Self {
        Self {
            timeout: Duration::from_secs(5 * 60),
            tick: Duration::from_secs(5),
            max_attempts: 100,
            limit: 100,
        }
    }

    /// Set the wall-clock timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the tick interval.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Set the attempt cap.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the per-search window size.
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }
}

/// Handle used to cancel a running poll session.
#[derive(Debug, Clone)]
pub struct Canceller {
    tx: watch::Sender<bool>,
}

impl Canceller {
    /// Stop the session after its current tick. Best-effort: an in-flight
    /// transport call is not interrupted.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Create a cancellation pair; pass the receiver to
/// [`PollSession::with_cancel`].
pub fn cancellation() -> (Canceller, watch::Receiver<bool>) {
    let (tx, rx) = watch::channel(false);
    (Canceller { tx }, rx)
}

/// Running set of distinct pipeline stages observed by one session.
#[derive(Debug, Default)]
pub struct StageTracker {
    stages: HashSet<String>,
}

impl StageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stage; returns `true` when it was not seen before.
    pub fn observe(&mut self, stage: &str) -> bool {
        self.stages.insert(stage.to_string())
    }

    /// Number of distinct stages seen so far.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// How each tick obtains its seek position.
enum SeekPlan {
    /// Reuse one spec for every tick.
    Fixed(SeekSpec),
    /// Rebuild a timestamp seek each tick; the partition count is re-fetched
    /// so the seek covers every partition at search time.
    Timestamp { direction: SeekDirection, at_millis: i64 },
}

/// Verdict of the per-tick predicate.
enum TickVerdict {
    /// Predicate holds; stop polling immediately.
    Matched,
    /// Keep polling; `progressed` resets the attempt counter.
    NoMatch { progressed: bool },
}

/// One bounded-time polling session over a [`TopicSearchClient`].
///
/// A session is single-use: each `for_*` method consumes it and runs one
/// sequential loop. Multiple sessions may run concurrently against the same
/// client.
///
/// # Example
///
/// ```ignore
/// use topictail::poll::{PollConfig, PollSession};
///
/// let session = PollSession::new(&client, PollConfig::stage_search());
/// let outcome = session.for_stage("orchestration", "SUB-1001", "1200").await?;
/// ```
pub struct PollSession<'a, C: HttpClient> {
    client: &'a TopicSearchClient<C>,
    config: PollConfig,
    cancel: Option<watch::Receiver<bool>>,
}

impl<'a, C: HttpClient> PollSession<'a, C> {
    pub fn new(client: &'a TopicSearchClient<C>, config: PollConfig) -> Self {
        Self {
            client,
            config,
            cancel: None,
        }
    }

    /// Attach a cancellation receiver from [`cancellation`].
    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Poll until any message matching `value` appears in the topic.
    pub async fn for_string(
        mut self,
        topic: &str,
        value: &str,
        seek: SeekSpec,
    ) -> EngineResult<PollOutcome> {
        info!(topic, value, "polling for matching messages");
        self.run(topic, SeekPlan::Fixed(seek), Some(value.to_string()), |decoded| {
            Ok(if decoded.is_empty() {
                TickVerdict::NoMatch { progressed: false }
            } else {
                TickVerdict::Matched
            })
        })
        .await
    }

    /// Poll from a timestamp until any message appears.
    ///
    /// The timestamp defaults to the session start and stays fixed across
    /// ticks; the per-partition seek is rebuilt every tick.
    pub async fn for_timestamp(
        mut self,
        topic: &str,
        at_millis: Option<i64>,
        direction: SeekDirection,
    ) -> EngineResult<PollOutcome> {
        let at_millis = at_millis.unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
        info!(topic, at_millis, "polling from timestamp");
        self.run(
            topic,
            SeekPlan::Timestamp {
                direction,
                at_millis,
            },
            None,
            |decoded| {
                Ok(if decoded.is_empty() {
                    TickVerdict::NoMatch { progressed: false }
                } else {
                    TickVerdict::Matched
                })
            },
        )
        .await
    }

    /// Track a submission through the pipeline until it reaches
    /// `target_stage`.
    ///
    /// Every distinct stage observed widens the progress set and resets the
    /// attempt counter. Stage 770 anywhere in the filtered window fails the
    /// session immediately with the broker-reported message.
    pub async fn for_stage(
        mut self,
        topic: &str,
        submission: &str,
        target_stage: &str,
    ) -> EngineResult<PollOutcome> {
        info!(topic, submission, target_stage, "tracking submission stage");
        let mut tracker = StageTracker::new();
        let submission_owned = submission.to_string();
        let target = target_stage.to_string();

        self.run(
            topic,
            SeekPlan::Fixed(SeekSpec::latest(SeekDirection::Newest)),
            Some(submission.to_string()),
            move |decoded| {
                let mut progressed = false;
                for message in decoded {
                    let Some(stage) = message.stage() else {
                        continue;
                    };
                    if stage == FAILURE_STAGE {
                        return Err(EngineError::FailureStage {
                            submission: submission_owned.clone(),
                            message: message
                                .failure_message()
                                .unwrap_or("pipeline reported failure stage 770")
                                .to_string(),
                        });
                    }
                    if tracker.observe(stage) {
                        progressed = true;
                        info!(
                            submission = %submission_owned,
                            stage,
                            distinct_stages = tracker.len(),
                            "pipeline progress"
                        );
                    }
                    if message.submission_number() == Some(submission_owned.as_str())
                        && stage == target
                    {
                        match milestone(stage) {
                            Some(text) => info!(submission = %submission_owned, stage, "{}", text),
                            None => info!(submission = %submission_owned, stage, "target stage reached"),
                        }
                        return Ok(TickVerdict::Matched);
                    }
                }
                Ok(TickVerdict::NoMatch { progressed })
            },
        )
        .await
    }

    /// Poll for the message produced by an inbound email and return its
    /// submission number.
    ///
    /// Returns `Ok(None)` when the session times out or is cancelled, or
    /// when the matched window carries no message with the given subject.
    pub async fn for_subject(
        mut self,
        topic: &str,
        subject: &str,
    ) -> EngineResult<Option<String>> {
        info!(topic, subject, "polling for email-originated submission");
        let outcome = self
            .run(
                topic,
                SeekPlan::Fixed(SeekSpec::latest(SeekDirection::Newest)),
                Some(subject.to_string()),
                |decoded| {
                    Ok(if decoded.is_empty() {
                        TickVerdict::NoMatch { progressed: false }
                    } else {
                        TickVerdict::Matched
                    })
                },
            )
            .await?;

        match outcome {
            PollOutcome::Found(messages) => Ok(messages
                .iter()
                .find(|message| message.email_subject() == Some(subject))
                .and_then(|message| message.submission_number())
                .map(String::from)),
            _ => Ok(None),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or(false)
    }

    /// Resolves when the session is cancelled; pends forever otherwise.
    async fn cancelled(&mut self) {
        match &mut self.cancel {
            Some(rx) => {
                while !*rx.borrow() {
                    if rx.changed().await.is_err() {
                        // Canceller dropped without firing.
                        std::future::pending::<()>().await;
                    }
                }
            }
            None => std::future::pending().await,
        }
    }

    /// The shared tick loop: search, classify, evaluate, sleep.
    async fn run<P>(
        &mut self,
        topic: &str,
        plan: SeekPlan,
        filter: Option<String>,
        mut predicate: P,
    ) -> EngineResult<PollOutcome>
    where
        P: FnMut(&[DecodedMessage]) -> EngineResult<TickVerdict>,
    {
        let started = Instant::now();
        let deadline = started + self.config.timeout;
        let mut attempts: u32 = 0;

        loop {
            if self.is_cancelled() {
                info!(topic, "poll session cancelled");
                return Ok(PollOutcome::Cancelled);
            }

            let search_result = match &plan {
                SeekPlan::Fixed(seek) => {
                    self.client
                        .search(topic, seek, filter.as_deref(), self.config.limit)
                        .await
                }
                SeekPlan::Timestamp {
                    direction,
                    at_millis,
                } => {
                    match self
                        .client
                        .seek_for_timestamp(topic, *direction, Some(*at_millis))
                        .await
                    {
                        Ok(seek) => {
                            self.client
                                .search(topic, &seek, filter.as_deref(), self.config.limit)
                                .await
                        }
                        Err(err) => Err(err),
                    }
                }
            };

            match search_result {
                Ok(events) => {
                    let decoded = decode_content(&events);
                    match predicate(&decoded)? {
                        TickVerdict::Matched => {
                            info!(topic, attempts, "poll predicate satisfied");
                            return Ok(PollOutcome::Found(decoded));
                        }
                        TickVerdict::NoMatch { progressed } => {
                            if progressed {
                                attempts = 0;
                            }
                        }
                    }
                }
                Err(err) if err.is_transient() => {
                    warn!(topic, error = %err, "transient search failure, will retry");
                }
                Err(err) => return Err(err),
            }

            attempts += 1;
            debug!(topic, attempts, "poll attempt finished without a match");
            if attempts > self.config.max_attempts {
                warn!(topic, attempts, "poll attempt cap reached");
                return Err(EngineError::MaxAttempts { attempts });
            }

            let now = Instant::now();
            if now >= deadline {
                info!(topic, "poll timeout reached");
                return Ok(PollOutcome::TimedOut);
            }
            let sleep_for = self.config.tick.min(deadline - now);
            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                _ = self.cancelled() => {
                    info!(topic, "poll session cancelled");
                    return Ok(PollOutcome::Cancelled);
                }
            }
            if Instant::now() >= deadline {
                info!(topic, "poll timeout reached");
                return Ok(PollOutcome::TimedOut);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_tracker_counts_distinct_stages() {
        let mut tracker = StageTracker::new();
        assert!(tracker.is_empty());
        assert!(tracker.observe("100"));
        assert!(!tracker.observe("100"));
        assert!(tracker.observe("800"));
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_poll_config_presets() {
        let string = PollConfig::string_search();
        assert_eq!(string.tick, Duration::from_secs(10));
        assert_eq!(string.max_attempts, 40);

        let stage = PollConfig::stage_search();
        assert_eq!(stage.tick, Duration::from_secs(5));
        assert_eq!(stage.max_attempts, 100);
        assert_eq!(stage.timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_poll_config_builders() {
        let config = PollConfig::string_search()
            .with_timeout(Duration::from_secs(30))
            .with_tick(Duration::from_millis(50))
            .with_max_attempts(3)
            .with_limit(5);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.tick, Duration::from_millis(50));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.limit, 5);
    }

    #[test]
    fn test_poll_outcome_accessors() {
        assert!(!PollOutcome::TimedOut.is_found());
        assert!(PollOutcome::TimedOut.messages().is_empty());
        assert!(!PollOutcome::Cancelled.is_found());
        let found = PollOutcome::Found(Vec::new());
        assert!(found.is_found());
    }

    #[tokio::test]
    async fn test_canceller_flips_receiver() {
        let (canceller, rx) = cancellation();
        assert!(!*rx.borrow());
        canceller.cancel();
        assert!(*rx.borrow());
    }
}
