use super::*;
use crate::audio::backend::{RecordingBackend, RecordingStats};
use crate::puzzle::ExpectedAnswer;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Mutex;

/// Sink returning a fixed recommendation and recording training samples
#[derive(Default)]
struct FakeSink {
    recommendation: Option<i64>,
    unreachable: bool,
    trained: Mutex<Vec<TrainingSample>>,
}

impl FakeSink {
    fn recommending(value: i64) -> Self {
        Self {
            recommendation: Some(value),
            ..Self::default()
        }
    }

    fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    fn trained(&self) -> Vec<TrainingSample> {
        self.trained.lock().unwrap().clone()
    }
}

impl RecommendationSink for FakeSink {
    fn recommend(&self, _summary: AttemptSummary) -> BoxFuture<'_, Result<Option<i64>, AlarmError>> {
        let result = if self.unreachable {
            Err(AlarmError::RemoteUnavailable {
                endpoint: "fake".to_string(),
                reason: "connection refused".to_string(),
            })
        } else {
            Ok(self.recommendation)
        };
        futures::future::ready(result).boxed()
    }

    fn train(&self, sample: TrainingSample) -> BoxFuture<'_, Result<(), AlarmError>> {
        if self.unreachable {
            return futures::future::ready(Err(AlarmError::RemoteUnavailable {
                endpoint: "fake".to_string(),
                reason: "connection refused".to_string(),
            }))
            .boxed();
        }
        self.trained.lock().unwrap().push(sample);
        futures::future::ready(Ok(())).boxed()
    }
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.audio.block_frames = 64;
    config.audio.beep_interval_ms = 10;
    config
}

fn create_session(config: &AppConfig, sink: Arc<FakeSink>) -> (RingingSession, Arc<RecordingStats>) {
    let backend = RecordingBackend::new();
    let stats = backend.stats();
    let session = RingingSession::new(
        config,
        Arc::new(backend),
        sink,
        Arc::new(QuotePool::from_lines(["Rise and shine."])),
    )
    .unwrap()
    .with_rng(StdRng::seed_from_u64(1234));
    (session, stats)
}

fn correct_answer(session: &RingingSession) -> String {
    match session.current_puzzle().unwrap().expected() {
        ExpectedAnswer::Numeric { value, .. } => value.to_string(),
        ExpectedAnswer::Text(text) => text.clone(),
    }
}

fn wrong_answer(session: &RingingSession) -> String {
    match session.current_puzzle().unwrap().expected() {
        ExpectedAnswer::Numeric { value, .. } => (value + 1.0).to_string(),
        ExpectedAnswer::Text(_) => "definitely wrong".to_string(),
    }
}

fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

async fn wait_for_training(sink: &FakeSink, count: usize) -> Vec<TrainingSample> {
    for _ in 0..100 {
        if sink.trained().len() >= count {
            break;
        }
        tokio::task::yield_now().await;
    }
    sink.trained()
}

#[tokio::test]
async fn test_start_rings_with_puzzle() {
    let (mut session, stats) = create_session(&test_config(), Arc::new(FakeSink::default()));
    let mut rx = session.subscribe();

    session.start();

    assert_eq!(session.state(), SessionState::Ringing);
    assert!(session.is_playing());
    assert!(session.current_puzzle().unwrap().prompt().starts_with("Compute: "));
    match drain(&mut rx).as_slice() {
        [SessionEvent::Ringing { difficulty, .. }] => assert_eq!(*difficulty, Difficulty::EASIEST),
        other => panic!("unexpected events {:?}", other),
    }

    session.silence();
    assert_eq!(stats.opened(), stats.released());
}

#[tokio::test]
async fn test_wrong_answer_counts_failure_and_issues_new_puzzle() {
    let (mut session, _) = create_session(&test_config(), Arc::new(FakeSink::default()));
    session.start();

    let answer = wrong_answer(&session);
    let outcome = session.handle_input(&answer).await.unwrap();

    assert_eq!(
        outcome,
        InputOutcome::Incorrect {
            difficulty: Difficulty::EASIEST
        }
    );
    assert_eq!(session.stats().consecutive_failures(), 1);
    assert_eq!(session.stats().total_attempts(), 1);
    assert_eq!(session.state(), SessionState::Ringing);
    assert!(session.is_playing());
    assert!(session.current_puzzle().is_some());
}

#[tokio::test]
async fn test_unparsable_answer_keeps_same_puzzle() {
    let (mut session, _) = create_session(&test_config(), Arc::new(FakeSink::default()));
    session.start();
    let mut rx = session.subscribe();
    let before = session.current_puzzle().cloned();

    let outcome = session.handle_input("seven").await.unwrap();

    assert_eq!(outcome, InputOutcome::FormatError);
    assert_eq!(session.current_puzzle().cloned(), before);
    assert_eq!(session.stats().total_attempts(), 1);
    assert_eq!(session.stats().total_correct(), 0);
    assert_eq!(session.stats().consecutive_failures(), 0);
    assert_eq!(
        drain(&mut rx),
        vec![SessionEvent::FormatError {
            input: "seven".to_string()
        }]
    );
}

#[tokio::test]
async fn test_three_failures_raise_difficulty_once() {
    let (mut session, _) = create_session(&test_config(), Arc::new(FakeSink::default()));
    session.start();
    let mut rx = session.subscribe();

    for _ in 0..3 {
        let answer = wrong_answer(&session);
        session.handle_input(&answer).await.unwrap();
    }

    assert_eq!(session.stats().difficulty().level(), 2);
    assert_eq!(session.stats().consecutive_failures(), 0);

    let raised: Vec<SessionEvent> = drain(&mut rx)
        .into_iter()
        .filter(|event| matches!(event, SessionEvent::DifficultyRaised { .. }))
        .collect();
    assert_eq!(
        raised,
        vec![SessionEvent::DifficultyRaised {
            from: Difficulty::EASIEST,
            to: Difficulty::new(2).unwrap(),
            source: EscalationSource::ConsecutiveFailures,
        }]
    );
}

#[tokio::test]
async fn test_snooze_stops_audio_raises_difficulty_and_resumes() {
    let sink = Arc::new(FakeSink::default());
    let (mut session, stats) = create_session(&test_config(), Arc::clone(&sink));
    session.start();

    let answer = wrong_answer(&session);
    session.handle_input(&answer).await.unwrap();
    assert_eq!(session.stats().consecutive_failures(), 1);

    let outcome = session.handle_input("  SNOOZE ").await.unwrap();

    // Difficulty 2 after the snooze: min(10, 2 * 2 + 1) = 5 minutes
    assert_eq!(
        outcome,
        InputOutcome::Snoozed {
            minutes: 5,
            delay: Duration::from_secs(300)
        }
    );
    assert_eq!(session.state(), SessionState::Snoozed);
    assert!(!session.is_playing());
    assert_eq!(stats.opened(), stats.released(), "device released on snooze");
    assert_eq!(session.stats().difficulty().level(), 2);
    assert_eq!(session.stats().consecutive_failures(), 0);
    assert_eq!(session.stats().snooze_count(), 1);
    assert!(session.current_puzzle().is_none());

    let trained = wait_for_training(&sink, 1).await;
    assert_eq!(trained.len(), 1);
    assert_eq!(trained[0].target_difficulty, 2);

    assert!(matches!(
        session.handle_input("42").await,
        Err(AlarmError::InvariantViolation { .. })
    ));

    session.resume_after_snooze().unwrap();
    assert_eq!(session.state(), SessionState::Ringing);
    assert!(session.is_playing());
    assert!(session.current_puzzle().is_some());

    session.silence();
}

#[tokio::test]
async fn test_correct_answer_solves_and_silences() {
    let sink = Arc::new(FakeSink::default());
    let (mut session, stats) = create_session(&test_config(), Arc::clone(&sink));
    session.start();
    let mut rx = session.subscribe();

    let answer = correct_answer(&session);
    let outcome = session.handle_input(&answer).await.unwrap();

    assert_eq!(
        outcome,
        InputOutcome::Solved {
            quote: "Rise and shine.".to_string()
        }
    );
    assert_eq!(session.state(), SessionState::Solved);
    assert!(!session.is_playing());
    assert_eq!(stats.opened(), stats.released());
    assert!(session.current_puzzle().is_none());
    assert_eq!(
        drain(&mut rx),
        vec![SessionEvent::Solved {
            quote: "Rise and shine.".to_string()
        }]
    );

    let trained = wait_for_training(&sink, 1).await;
    assert_eq!(trained[0].target_difficulty, 1);
    assert_eq!(trained[0].summary.accuracy, 1.0);

    assert!(session.handle_input(&answer).await.is_err(), "solved is terminal");
    assert_eq!(session.report().quote, "Rise and shine.");
}

#[tokio::test]
async fn test_recommendation_raises_on_single_failure() {
    let (mut session, _) = create_session(&test_config(), Arc::new(FakeSink::recommending(4)));
    session.start();

    let answer = wrong_answer(&session);
    session.handle_input(&answer).await.unwrap();

    assert_eq!(session.stats().difficulty().level(), 4);
    assert_eq!(session.stats().consecutive_failures(), 0);
    session.silence();
}

#[tokio::test]
async fn test_format_error_lowers_reported_accuracy() {
    let sink = Arc::new(FakeSink::default());
    let (mut session, _) = create_session(&test_config(), Arc::clone(&sink));
    session.start();

    session.handle_input("seven").await.unwrap();
    let answer = correct_answer(&session);
    session.handle_input(&answer).await.unwrap();

    assert_eq!(session.report().total_attempts, 2);
    let trained = wait_for_training(&sink, 1).await;
    assert_eq!(trained[0].summary.accuracy, 0.5);
}

#[tokio::test]
async fn test_non_raising_recommendation_keeps_failure_rule() {
    for recommended in [1, 2] {
        let mut config = test_config();
        config.escalation.initial_difficulty = 2;
        let (mut session, _) =
            create_session(&config, Arc::new(FakeSink::recommending(recommended)));
        session.start();
        let mut rx = session.subscribe();

        for _ in 0..3 {
            let answer = wrong_answer(&session);
            session.handle_input(&answer).await.unwrap();
        }
        assert_eq!(session.stats().difficulty().level(), 3);
        assert_eq!(session.stats().consecutive_failures(), 0);

        for _ in 0..3 {
            let answer = wrong_answer(&session);
            session.handle_input(&answer).await.unwrap();
        }
        assert_eq!(session.stats().difficulty().level(), 4);
        assert_eq!(session.stats().consecutive_failures(), 0);

        let sources: Vec<EscalationSource> = drain(&mut rx)
            .into_iter()
            .filter_map(|event| match event {
                SessionEvent::DifficultyRaised { source, .. } => Some(source),
                _ => None,
            })
            .collect();
        assert_eq!(
            sources,
            vec![
                EscalationSource::ConsecutiveFailures,
                EscalationSource::ConsecutiveFailures
            ]
        );
        session.silence();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_snooze_and_solve_on_multi_thread_runtime() {
    let (mut session, stats) = create_session(&test_config(), Arc::new(FakeSink::default()));
    session.start();

    session.handle_input("snooze").await.unwrap();
    assert!(!session.is_playing());
    assert_eq!(stats.opened(), stats.released());

    session.resume_after_snooze().unwrap();
    let answer = correct_answer(&session);
    let outcome = session.handle_input(&answer).await.unwrap();
    assert!(matches!(outcome, InputOutcome::Solved { .. }));
    assert!(!session.is_playing());
    assert_eq!(stats.opened(), stats.released());
}

#[tokio::test]
async fn test_out_of_range_recommendation_falls_back_to_local_policy() {
    let (mut session, _) = create_session(&test_config(), Arc::new(FakeSink::recommending(9)));
    session.start();

    for _ in 0..3 {
        let answer = wrong_answer(&session);
        session.handle_input(&answer).await.unwrap();
    }

    assert_eq!(session.stats().difficulty().level(), 2);
    session.silence();
}

#[tokio::test]
async fn test_unreachable_sink_still_escalates_and_solves() {
    let (mut session, _) = create_session(&test_config(), Arc::new(FakeSink::unreachable()));
    session.start();

    for _ in 0..3 {
        let answer = wrong_answer(&session);
        session.handle_input(&answer).await.unwrap();
    }
    assert_eq!(session.stats().difficulty().level(), 2);

    session.handle_input("snooze").await.unwrap();
    assert_eq!(session.stats().difficulty().level(), 3);
    session.resume_after_snooze().unwrap();

    let answer = correct_answer(&session);
    let outcome = session.handle_input(&answer).await.unwrap();
    assert!(matches!(outcome, InputOutcome::Solved { .. }));
    assert!(!session.is_playing());
}

#[tokio::test]
async fn test_difficulty_caps_at_hardest() {
    let mut config = test_config();
    config.escalation.initial_difficulty = 5;
    let (mut session, _) = create_session(&config, Arc::new(FakeSink::default()));
    session.start();

    let outcome = session.handle_input("snooze").await.unwrap();
    assert_eq!(
        outcome,
        InputOutcome::Snoozed {
            minutes: 10,
            delay: Duration::from_secs(600)
        }
    );
    assert_eq!(session.stats().difficulty(), Difficulty::HARDEST);
}

#[test]
fn test_invalid_initial_difficulty_is_rejected() {
    let mut config = test_config();
    config.escalation.initial_difficulty = 0;
    let result = RingingSession::new(
        &config,
        Arc::new(RecordingBackend::new()),
        Arc::new(FakeSink::default()),
        Arc::new(QuotePool::default()),
    );
    assert!(matches!(result, Err(AlarmError::InvariantViolation { .. })));
}

#[tokio::test]
async fn test_run_ends_when_input_closes() {
    let backend = RecordingBackend::new();
    let stats = backend.stats();
    let session = RingingSession::new(
        &test_config(),
        Arc::new(backend),
        Arc::new(FakeSink::default()),
        Arc::new(QuotePool::default()),
    )
    .unwrap();

    let outcome = session.run(&b"not a number\n"[..]).await.unwrap();

    assert_eq!(outcome, SessionOutcome::InputClosed);
    assert_eq!(stats.opened(), stats.released());
}
