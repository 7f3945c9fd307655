//! Orchestrator integration tests
//!
//! Drives the full pipeline from a capture ring through a scripted
//! transcriber, without audio hardware or a server.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::Notify;

use lostspells_voice::command::{GameScreen, OutcomeStatus, RecognitionOutcome, Resolution, ScreenState};
use lostspells_voice::pitch::{PitchAnalysis, PitchCategory};
use lostspells_voice::voice::{CaptureRing, SegmentMode, SegmentationState};
use lostspells_voice::{InFlightPolicy, OrchestratorConfig, VoiceCommandOrchestrator, VoiceEvent, VoiceSettings};

mod common;

use common::{MockTranscriber, SR, catalog, reply, silence, sine};

type Orchestrator = VoiceCommandOrchestrator<CaptureRing>;

fn build(mock: &Arc<MockTranscriber>, config: OrchestratorConfig) -> (Orchestrator, CaptureRing) {
    let ring = CaptureRing::with_duration(SR, 10.0);
    let mut orchestrator = VoiceCommandOrchestrator::new(
        ring.clone(),
        mock.clone(),
        catalog(),
        config,
        VoiceSettings::default(),
        Handle::current(),
    );
    orchestrator.set_screen(ScreenState::on(GameScreen::InGame));
    (orchestrator, ring)
}

fn with_policy(policy: InFlightPolicy) -> OrchestratorConfig {
    OrchestratorConfig {
        in_flight: policy,
        ..OrchestratorConfig::default()
    }
}

/// Hold push-to-talk over one second of tone
fn speak(orchestrator: &mut Orchestrator, ring: &CaptureRing, frequency: f32) {
    ring.push(&silence(0.1));
    orchestrator.key_down();
    ring.push(&sine(frequency, 1.0, 0.5));
    ring.push(&silence(0.1));
    orchestrator.key_up();
}

/// Tick until a recognition arrives, returning every event seen
async fn settle(orchestrator: &mut Orchestrator) -> Vec<VoiceEvent> {
    let mut events = Vec::new();
    for _ in 0..400 {
        orchestrator.update(0.01);
        events.extend(orchestrator.drain_events());
        if events.iter().any(|e| matches!(e, VoiceEvent::Recognition { .. })) {
            return events;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("no recognition within timeout: {events:?}");
}

fn recognition(events: &[VoiceEvent]) -> (RecognitionOutcome, Option<PitchAnalysis>) {
    events
        .iter()
        .find_map(|e| match e {
            VoiceEvent::Recognition { outcome, analysis } => Some((outcome.clone(), analysis.clone())),
            _ => None,
        })
        .expect("recognition event")
}

#[tokio::test]
async fn test_push_to_talk_casts_skill() {
    let mock = Arc::new(MockTranscriber::new().with_reply(reply("파이어볼", Some("fireball"))));
    let (mut orchestrator, ring) = build(&mock, OrchestratorConfig::default());

    speak(&mut orchestrator, &ring, 440.0);
    assert!(orchestrator.is_processing());
    assert_eq!(orchestrator.state(), SegmentationState::Idle);

    let events = settle(&mut orchestrator).await;
    assert_eq!(events.first(), Some(&VoiceEvent::RecordingStarted));

    let (outcome, analysis) = recognition(&events);
    assert_eq!(outcome.status, OutcomeStatus::Matched);
    assert_eq!(
        outcome.matched,
        Some(Resolution::Skill {
            skill: "fireball".to_string(),
            element: Some("Electric".to_string()),
        })
    );

    let analysis = analysis.expect("voice casts carry an analysis");
    assert_eq!(analysis.dominant, PitchCategory::High);
    assert!(!orchestrator.is_processing());
}

#[tokio::test]
async fn test_request_carries_context_and_skills() {
    let mock = Arc::new(MockTranscriber::new());
    let (mut orchestrator, ring) = build(&mock, OrchestratorConfig::default());
    orchestrator.set_active_skills(["ice_spear", "fireball"]);

    speak(&mut orchestrator, &ring, 220.0);
    settle(&mut orchestrator).await;

    let requests = mock.requests();
    assert_eq!(requests.len(), 1);

    let request = &requests[0];
    assert_eq!(request.language, "ko");
    assert_eq!(request.context, "InGame_Playing");
    assert_eq!(request.skills, vec!["아이스 스피어", "파이어볼"]);
    assert!(!request.context_keywords.is_empty());
}

#[tokio::test]
async fn test_wav_matches_analyzed_clip() {
    let mock = Arc::new(MockTranscriber::new());
    let (mut orchestrator, ring) = build(&mock, OrchestratorConfig::default());

    speak(&mut orchestrator, &ring, 220.0);
    let events = settle(&mut orchestrator).await;
    let (_, analysis) = recognition(&events);
    let analysis = analysis.unwrap();

    let request = &mock.requests()[0];
    let reader = hound::WavReader::new(Cursor::new(request.audio.clone())).unwrap();
    assert_eq!(reader.spec().sample_rate, SR);
    assert_eq!(reader.spec().channels, 1);
    assert_eq!(reader.len() as usize, analysis.sample_count);

    // Leading and trailing silence trimmed
    assert!(analysis.sample_count <= SR as usize);
    assert!(analysis.sample_count > SR as usize * 9 / 10);
}

#[tokio::test]
async fn test_span_longer_than_ring_uses_buffered_tail() {
    let mock = Arc::new(MockTranscriber::new());
    let ring = CaptureRing::with_duration(SR, 2.0);
    let mut orchestrator = VoiceCommandOrchestrator::new(
        ring.clone(),
        mock.clone(),
        catalog(),
        OrchestratorConfig::default(),
        VoiceSettings::default(),
        Handle::current(),
    );
    orchestrator.set_screen(ScreenState::on(GameScreen::InGame));

    // Three seconds held against a two second ring
    orchestrator.key_down();
    ring.push(&sine(220.0, 3.0, 0.5));
    orchestrator.key_up();

    let events = settle(&mut orchestrator).await;
    let (outcome, analysis) = recognition(&events);
    assert!(!matches!(outcome.status, OutcomeStatus::Failed { .. }));

    let analysis = analysis.expect("clip analyzed");
    assert!(analysis.sample_count <= SR as usize * 2);
    assert!(analysis.sample_count > SR as usize * 19 / 10);
}

#[tokio::test]
async fn test_generic_skill_takes_pitch_element() {
    let mock = Arc::new(MockTranscriber::new().with_reply(reply("볼트", None)));
    let (mut orchestrator, ring) = build(&mock, OrchestratorConfig::default());

    speak(&mut orchestrator, &ring, 110.0);
    let events = settle(&mut orchestrator).await;
    let (outcome, analysis) = recognition(&events);

    assert_eq!(analysis.unwrap().dominant, PitchCategory::Low);
    assert_eq!(
        outcome.matched,
        Some(Resolution::Skill {
            skill: "fire_bolt".to_string(),
            element: Some("Fire".to_string()),
        })
    );
}

#[tokio::test]
async fn test_pinned_element_overrides_pitch() {
    let mock = Arc::new(MockTranscriber::new().with_reply(reply("볼트", None)));
    let (mut orchestrator, ring) = build(&mock, OrchestratorConfig::default());
    orchestrator.pin_element(Some("Ice".to_string()));

    speak(&mut orchestrator, &ring, 440.0);
    let events = settle(&mut orchestrator).await;
    let (outcome, _) = recognition(&events);

    assert_eq!(
        outcome.executable(),
        Some(&Resolution::Skill {
            skill: "ice_bolt".to_string(),
            element: Some("Ice".to_string()),
        })
    );
}

#[tokio::test]
async fn test_skill_blocked_while_paused() {
    let mock = Arc::new(MockTranscriber::new().with_reply(reply("파이어볼", Some("fireball"))));
    let (mut orchestrator, ring) = build(&mock, OrchestratorConfig::default());
    orchestrator.set_screen(ScreenState {
        paused: true,
        ..ScreenState::on(GameScreen::InGame)
    });

    speak(&mut orchestrator, &ring, 220.0);
    let events = settle(&mut orchestrator).await;
    let (outcome, _) = recognition(&events);

    assert!(matches!(outcome.status, OutcomeStatus::Blocked { .. }));
    assert!(outcome.executable().is_none());
    assert_eq!(mock.requests()[0].context, "InGame_Paused");
}

#[tokio::test]
async fn test_transcription_failure_reported() {
    let mock = Arc::new(MockTranscriber::new().with_failure("connection refused"));
    let (mut orchestrator, ring) = build(&mock, OrchestratorConfig::default());

    speak(&mut orchestrator, &ring, 220.0);
    let events = settle(&mut orchestrator).await;
    let (outcome, analysis) = recognition(&events);

    assert!(matches!(outcome.status, OutcomeStatus::Failed { ref reason } if reason.contains("connection refused")));
    assert!(outcome.matched.is_none());
    assert!(analysis.is_some());
}

#[tokio::test]
async fn test_short_press_discarded() {
    let mock = Arc::new(MockTranscriber::new());
    let (mut orchestrator, ring) = build(&mock, OrchestratorConfig::default());

    orchestrator.key_down();
    ring.push(&sine(220.0, 0.2, 0.5));
    orchestrator.key_up();

    let events = orchestrator.drain_events();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[1], VoiceEvent::SegmentDiscarded { .. }));
    assert!(!orchestrator.is_processing());
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_drop_policy_discards_while_busy() {
    let gate = Arc::new(Notify::new());
    let mock = Arc::new(
        MockTranscriber::new()
            .gated(gate.clone())
            .with_reply(reply("파이어볼", Some("fireball"))),
    );
    let (mut orchestrator, ring) = build(&mock, with_policy(InFlightPolicy::Drop));

    speak(&mut orchestrator, &ring, 440.0);
    speak(&mut orchestrator, &ring, 110.0);

    let events = orchestrator.drain_events();
    assert!(events.contains(&VoiceEvent::SegmentDropped));
    assert!(!orchestrator.has_queued());

    gate.notify_one();
    let events = settle(&mut orchestrator).await;
    let (_, analysis) = recognition(&events);
    assert_eq!(analysis.unwrap().dominant, PitchCategory::High);

    // Nothing follows the first request
    tokio::time::sleep(Duration::from_millis(20)).await;
    orchestrator.update(0.01);
    assert!(!orchestrator.is_processing());
    assert_eq!(mock.requests().len(), 1);
}

#[tokio::test]
async fn test_queue_latest_keeps_newest() {
    let gate = Arc::new(Notify::new());
    let mock = Arc::new(
        MockTranscriber::new()
            .gated(gate.clone())
            .with_reply(reply("파이어볼", Some("fireball")))
            .with_reply(reply("얼음창", None)),
    );
    let (mut orchestrator, ring) = build(&mock, with_policy(InFlightPolicy::QueueLatest));

    speak(&mut orchestrator, &ring, 440.0);
    speak(&mut orchestrator, &ring, 110.0);
    speak(&mut orchestrator, &ring, 200.0);

    let dropped = orchestrator
        .drain_events()
        .iter()
        .filter(|e| **e == VoiceEvent::SegmentDropped)
        .count();
    assert_eq!(dropped, 1);
    assert!(orchestrator.has_queued());

    gate.notify_one();
    let first = settle(&mut orchestrator).await;
    let (outcome, _) = recognition(&first);
    assert_eq!(
        outcome.matched,
        Some(Resolution::Skill {
            skill: "fireball".to_string(),
            element: Some("Electric".to_string()),
        })
    );

    // Queued clip goes out as soon as the first completes
    assert!(orchestrator.is_processing());
    assert!(!orchestrator.has_queued());

    gate.notify_one();
    let second = settle(&mut orchestrator).await;
    let (outcome, analysis) = recognition(&second);
    assert_eq!(analysis.unwrap().dominant, PitchCategory::Medium);
    assert_eq!(
        outcome.matched,
        Some(Resolution::Skill {
            skill: "ice_spear".to_string(),
            element: Some("Ice".to_string()),
        })
    );
    assert_eq!(mock.requests().len(), 2);
}

#[tokio::test]
async fn test_reset_cancels_request() {
    let gate = Arc::new(Notify::new());
    let mock = Arc::new(
        MockTranscriber::new()
            .gated(gate.clone())
            .with_reply(reply("파이어볼", Some("fireball"))),
    );
    let (mut orchestrator, ring) = build(&mock, OrchestratorConfig::default());

    speak(&mut orchestrator, &ring, 220.0);
    assert!(orchestrator.is_processing());

    orchestrator.reset();
    assert!(!orchestrator.is_processing());
    assert_eq!(orchestrator.state(), SegmentationState::Idle);
    orchestrator.drain_events();

    gate.notify_one();
    for _ in 0..5 {
        tokio::time::sleep(Duration::from_millis(5)).await;
        orchestrator.update(0.01);
    }
    assert!(
        !orchestrator
            .drain_events()
            .iter()
            .any(|e| matches!(e, VoiceEvent::Recognition { .. }))
    );
}

#[tokio::test]
async fn test_continuous_mode_segments_by_voice() {
    let mock = Arc::new(MockTranscriber::new().with_reply(reply("파이어볼", Some("fireball"))));
    let mut config = OrchestratorConfig::default();
    config.segmenter.mode = SegmentMode::Continuous;
    let (mut orchestrator, ring) = build(&mock, config);

    let tone = sine(440.0, 1.0, 0.5);
    let quiet = silence(1.5);
    let mut events = Vec::new();

    for chunk in tone.chunks(320).chain(quiet.chunks(320)) {
        ring.push(chunk);
        orchestrator.update(0.02);
        events.extend(orchestrator.drain_events());
    }

    assert_eq!(events.first(), Some(&VoiceEvent::RecordingStarted));
    assert!(events.iter().any(|e| matches!(
        e,
        VoiceEvent::PitchUpdate { category: PitchCategory::High, element, gauge, .. }
            if element == "Electric" && (0.0..=1.0).contains(gauge)
    )));
    assert!(orchestrator.is_processing());

    let events = settle(&mut orchestrator).await;
    let (outcome, _) = recognition(&events);
    assert!(outcome.is_matched());
}

#[tokio::test]
async fn test_cast_by_id_uses_pinned_element() {
    let mock = Arc::new(MockTranscriber::new());
    let (mut orchestrator, _ring) = build(&mock, OrchestratorConfig::default());
    orchestrator.pin_element(Some("Ice".to_string()));

    let outcome = orchestrator.cast_by_id("elemental_bolt");
    assert!((outcome.confidence - 1.0).abs() < f32::EPSILON);
    assert_eq!(
        outcome.executable(),
        Some(&Resolution::Skill {
            skill: "ice_bolt".to_string(),
            element: Some("Ice".to_string()),
        })
    );

    let events = orchestrator.drain_events();
    assert_eq!(
        events,
        vec![VoiceEvent::Recognition {
            outcome,
            analysis: None,
        }]
    );
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn test_settings_updates() {
    let mock = Arc::new(MockTranscriber::new());
    let (mut orchestrator, _ring) = build(&mock, OrchestratorConfig::default());

    orchestrator.set_pitch_boundaries(200.0, 150.0);
    let bounds = orchestrator.settings().boundaries;
    assert!(bounds.low_max() < bounds.high_min());

    orchestrator.pin_element(Some("  ".to_string()));
    assert!(orchestrator.settings().pinned_element.is_none());

    orchestrator.set_language(lostspells_voice::Language::English);
    assert_eq!(orchestrator.settings().language, lostspells_voice::Language::English);
}
