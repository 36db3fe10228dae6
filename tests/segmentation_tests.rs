// Segmentation scenarios driven end-to-end through the engine with a
// scripted VAD and a synthetic clock, so every timing assertion is
// deterministic.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use speech_segmenter::constants::audio::{CHUNK_SIZE, MIN_DECODE_SAMPLES, SAMPLE_RATE};
use speech_segmenter::constants::segmentation::{
    LOOKBACK_SAMPLES, MAX_SPEECH_SECS, PAUSE_CARRYOVER_SAMPLES,
};
use speech_segmenter::engine::{SegmentEvent, SegmentationEngine};
use speech_segmenter::vad::VoiceActivityDetector;

/// VAD that answers from a fixed per-chunk schedule and counts resets.
struct ScriptedVad {
    decisions: Vec<bool>,
    pos: usize,
    current: bool,
    resets: Rc<Cell<usize>>,
}

impl ScriptedVad {
    fn new(decisions: Vec<bool>) -> (Self, Rc<Cell<usize>>) {
        let resets = Rc::new(Cell::new(0));
        let vad = ScriptedVad {
            decisions,
            pos: 0,
            current: false,
            resets: resets.clone(),
        };
        (vad, resets)
    }
}

impl VoiceActivityDetector for ScriptedVad {
    fn accept_waveform(&mut self, _chunk: &[f32]) {
        self.current = self.decisions.get(self.pos).copied().unwrap_or(false);
        self.pos += 1;
    }

    fn is_speech_detected(&self) -> bool {
        self.current
    }

    fn reset(&mut self) {
        self.current = false;
        self.resets.set(self.resets.get() + 1);
    }
}

const CHUNK_MS: u64 = (CHUNK_SIZE as u64 * 1000) / SAMPLE_RATE as u64; // 32ms

fn silent_chunk() -> Vec<f32> {
    vec![0.0; CHUNK_SIZE]
}

fn speech_chunk() -> Vec<f32> {
    vec![0.1; CHUNK_SIZE]
}

/// Drive `chunks` through the engine on a clock that advances one chunk
/// duration per chunk, collecting (chunk_index, event) pairs.
fn drive(
    engine: &mut SegmentationEngine<ScriptedVad>,
    chunks: &[Vec<f32>],
) -> Vec<(usize, SegmentEvent)> {
    let t0 = Instant::now();
    let mut collected = Vec::new();
    for (i, chunk) in chunks.iter().enumerate() {
        let now = t0 + Duration::from_millis(i as u64 * CHUNK_MS);
        for event in engine.process_chunk_at(chunk, now) {
            collected.push((i, event));
        }
    }
    collected
}

#[test]
fn test_idle_stream_never_exceeds_lookback_bound() {
    let (vad, _) = ScriptedVad::new(vec![false; 1000]);
    let mut engine = SegmentationEngine::new(vad);
    let t0 = Instant::now();

    for i in 0..1000 {
        let events = engine.process_chunk_at(&silent_chunk(), t0 + Duration::from_millis(i * CHUNK_MS));
        assert!(events.is_empty(), "idle stream must not emit events");
        assert!(engine.lookback().len() <= LOOKBACK_SAMPLES);
    }
    assert_eq!(engine.lookback().len(), LOOKBACK_SAMPLES);
}

#[test]
fn test_onset_preserves_exact_lookback() {
    // 100 idle chunks of a ramp signal, then speech until an offset
    let idle_chunks = 100;
    let speech_chunks = 40;

    let mut decisions = vec![false; idle_chunks];
    decisions.extend(vec![true; speech_chunks]);
    decisions.push(false); // offset chunk

    let (vad, _) = ScriptedVad::new(decisions);
    let mut engine = SegmentationEngine::new(vad);

    // Globally increasing ramp so every sample is identifiable
    let mut counter = 0u32;
    let mut next_chunk = || -> Vec<f32> {
        (0..CHUNK_SIZE)
            .map(|_| {
                counter += 1;
                counter as f32 * 1e-6
            })
            .collect()
    };

    let total = idle_chunks + speech_chunks + 1;
    let chunks: Vec<Vec<f32>> = (0..total).map(|_| next_chunk()).collect();

    let events = drive(&mut engine, &chunks);

    // The final window starts with exactly the last LOOKBACK_SAMPLES pushed
    // before onset
    let finals: Vec<_> = events
        .iter()
        .filter_map(|(_, e)| match e {
            SegmentEvent::FinalReady { window } => Some(window),
            _ => None,
        })
        .collect();
    assert_eq!(finals.len(), 1);
    let window = finals[0];

    let pre_onset: Vec<f32> = chunks[..idle_chunks].concat();
    let expected_lookback = &pre_onset[pre_onset.len() - LOOKBACK_SAMPLES..];
    assert_eq!(&window[..LOOKBACK_SAMPLES], expected_lookback);

    // Lookback plus onset chunk plus remaining speech plus the offset chunk
    assert_eq!(window.len(), LOOKBACK_SAMPLES + (speech_chunks + 1) * CHUNK_SIZE);
}

#[test]
fn test_forced_cutoff_after_max_duration() {
    // Continuous speech far past the cutoff
    let (vad, resets) = ScriptedVad::new(vec![true; 600]);
    let mut engine = SegmentationEngine::new(vad);

    let max_samples = (MAX_SPEECH_SECS * SAMPLE_RATE as f32) as usize;
    // First chunk index where the accumulated segment exceeds the bound
    let cutoff_index = max_samples / CHUNK_SIZE; // len (i+1)*512 > 240000 first at i=468

    let chunks: Vec<Vec<f32>> = (0..600).map(|_| speech_chunk()).collect();
    let events = drive(&mut engine, &chunks);

    let finals: Vec<_> = events
        .iter()
        .filter(|(_, e)| matches!(e, SegmentEvent::FinalReady { .. }))
        .collect();

    // Exactly one cutoff for the utterance, at the crossing chunk
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0].0, cutoff_index);

    // The cutoff chunk emits the final alone - no interim rides along
    let cutoff_events: Vec<_> = events.iter().filter(|(i, _)| *i == cutoff_index).collect();
    assert_eq!(cutoff_events.len(), 1);

    // The VAD got its hysteresis reset
    assert!(resets.get() >= 1);

    // Window covers everything accumulated, just over the bound
    if let (_, SegmentEvent::FinalReady { window }) = finals[0] {
        assert_eq!(window.len(), (cutoff_index + 1) * CHUNK_SIZE);
        assert!(window.len() > max_samples);
    }
}

#[test]
fn test_sub_floor_utterance_discarded() {
    // 0.5s of speech (well below the 1s decode floor), then silence
    let speech_chunks = 15; // 7680 samples
    let mut decisions = vec![true; speech_chunks];
    decisions.extend(vec![false; 5]);

    let (vad, _) = ScriptedVad::new(decisions);
    let mut engine = SegmentationEngine::new(vad);

    let chunks: Vec<Vec<f32>> = (0..speech_chunks + 5).map(|_| speech_chunk()).collect();
    let events = drive(&mut engine, &chunks);

    assert!(events.is_empty(), "sub-floor utterance must emit nothing");
    assert!(!engine.is_recording());
    assert_eq!(engine.segment_len(), 0);
}

#[test]
fn test_interim_pacing_and_floor() {
    // A 3-second utterance
    let speech_chunks = 94;
    let (vad, _) = ScriptedVad::new(vec![true; speech_chunks]);
    let mut engine = SegmentationEngine::new(vad);

    let chunks: Vec<Vec<f32>> = (0..speech_chunks).map(|_| speech_chunk()).collect();
    let events = drive(&mut engine, &chunks);

    let interim_indices: Vec<usize> = events
        .iter()
        .filter_map(|(i, e)| match e {
            SegmentEvent::InterimReady { window } => {
                // Only once the floor has accumulated
                assert!(window.len() >= MIN_DECODE_SAMPLES);
                Some(*i)
            }
            _ => None,
        })
        .collect();

    assert!(!interim_indices.is_empty(), "a 3s utterance must refresh");

    // Never before one second of audio has accumulated
    assert!((interim_indices[0] + 1) * CHUNK_SIZE >= MIN_DECODE_SAMPLES);

    // Emissions at least the minimum refresh interval apart
    for pair in interim_indices.windows(2) {
        let gap_ms = (pair[1] - pair[0]) as u64 * CHUNK_MS;
        assert!(
            gap_ms >= 100,
            "interim emissions {}ms apart, expected >= 100ms",
            gap_ms
        );
    }
}

#[test]
fn test_pause_discards_utterance_and_truncates_lookback() {
    let idle_chunks = 50;
    let speech_chunks = 40;
    let mut decisions = vec![false; idle_chunks];
    decisions.extend(vec![true; speech_chunks]);

    let (vad, _) = ScriptedVad::new(decisions);
    let mut engine = SegmentationEngine::new(vad);

    let chunks: Vec<Vec<f32>> = (0..idle_chunks + speech_chunks)
        .map(|_| speech_chunk())
        .collect();
    let events = drive(&mut engine, &chunks);
    assert!(engine.is_recording());
    assert!(engine.segment_len() >= MIN_DECODE_SAMPLES);

    engine.pause();

    // No final for the discarded segment, state fully reset
    assert!(events
        .iter()
        .all(|(_, e)| !matches!(e, SegmentEvent::FinalReady { .. })));
    assert!(!engine.is_recording());
    assert_eq!(engine.segment_len(), 0);
    assert_eq!(engine.lookback().len(), PAUSE_CARRYOVER_SAMPLES);
}

#[test]
fn test_pause_with_less_lookback_than_carryover() {
    let (vad, _) = ScriptedVad::new(vec![false]);
    let mut engine = SegmentationEngine::new(vad);
    engine.process_chunk_at(&silent_chunk(), Instant::now());

    engine.pause();
    assert_eq!(engine.lookback().len(), CHUNK_SIZE.min(PAUSE_CARRYOVER_SAMPLES));
}

#[test]
fn test_recording_resumes_after_pause_with_truncated_ring() {
    let mut decisions = vec![false; 10];
    decisions.push(true);
    let (vad, _) = ScriptedVad::new(decisions);
    let mut engine = SegmentationEngine::new(vad);

    let t0 = Instant::now();
    for i in 0..10 {
        engine.process_chunk_at(&silent_chunk(), t0 + Duration::from_millis(i * CHUNK_MS));
    }
    engine.pause();
    assert_eq!(engine.lookback().len(), PAUSE_CARRYOVER_SAMPLES);

    // Next speaking chunk re-enters recording, seeded from the truncated ring
    let events = engine.process_chunk_at(&speech_chunk(), t0 + Duration::from_millis(11 * CHUNK_MS));
    assert!(events.is_empty());
    assert!(engine.is_recording());
    assert_eq!(engine.segment_len(), PAUSE_CARRYOVER_SAMPLES + CHUNK_SIZE);
}

#[test]
fn test_onset_after_pause_with_empty_ring_does_not_crash() {
    let (vad, _) = ScriptedVad::new(vec![true]);
    let mut engine = SegmentationEngine::new(vad);
    engine.pause(); // Nothing buffered at all

    let events = engine.process_chunk_at(&speech_chunk(), Instant::now());
    assert!(events.is_empty());
    assert!(engine.is_recording());
    assert_eq!(engine.segment_len(), CHUNK_SIZE);
}

#[test]
fn test_utterances_never_overlap() {
    // Two utterances separated by silence
    let mut decisions = Vec::new();
    decisions.extend(vec![false; 10]);
    decisions.extend(vec![true; 50]); // ~1.6s utterance
    decisions.extend(vec![false; 10]);
    decisions.extend(vec![true; 50]);
    decisions.extend(vec![false; 10]);

    let (vad, _) = ScriptedVad::new(decisions.clone());
    let mut engine = SegmentationEngine::new(vad);

    let chunks: Vec<Vec<f32>> = (0..decisions.len()).map(|_| speech_chunk()).collect();
    let events = drive(&mut engine, &chunks);

    let final_indices: Vec<usize> = events
        .iter()
        .filter_map(|(i, e)| match e {
            SegmentEvent::FinalReady { .. } => Some(*i),
            _ => None,
        })
        .collect();
    assert_eq!(final_indices.len(), 2);

    // Everything between the two finals belongs to utterance two, which only
    // started after a fresh idle phase re-filled the lookback ring
    let first_final = final_indices[0];
    let second_onset = first_final + 10;
    assert!(events
        .iter()
        .filter(|(i, _)| *i > first_final && *i <= final_indices[1])
        .all(|(i, _)| *i >= second_onset));
}
