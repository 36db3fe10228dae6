/// Speech segmentation state machine
///
/// Consumes fixed-size chunks in stream order, asks the voice activity
/// detector whether each one is speech, and decides where utterances begin
/// and end. While idle it feeds the lookback ring; while recording it grows
/// the segment buffer and emits interim refresh windows; on offset or forced
/// cutoff it emits the final window.
///
/// The engine itself never decodes and never blocks: events carry sample
/// windows, and the caller hands them to a decode worker. Everything here
/// runs on the audio-delivery thread, so the per-chunk path is just ring and
/// append operations.

use std::time::Instant;

use crate::constants::audio::{CHUNK_SIZE, MIN_DECODE_SAMPLES};
use crate::constants::segmentation::{MAX_SPEECH_SECS, PAUSE_CARRYOVER_SAMPLES};
use crate::lookback::LookbackRing;
use crate::refresh::RefreshClock;
use crate::segment::SegmentBuffer;
use crate::vad::VoiceActivityDetector;

/// Events emitted by the engine. Windows are copies of the segment buffer;
/// the caller owns them outright.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentEvent {
    /// Periodic refresh of the in-progress utterance
    InterimReady { window: Vec<f32> },
    /// The utterance ended (naturally or by forced cutoff)
    FinalReady { window: Vec<f32> },
}

enum RecordingState {
    Idle,
    Recording { clock: RefreshClock },
}

pub struct SegmentationEngine<V: VoiceActivityDetector> {
    vad: V,
    lookback: LookbackRing,
    segment: SegmentBuffer,
    state: RecordingState,
}

impl<V: VoiceActivityDetector> SegmentationEngine<V> {
    pub fn new(vad: V) -> Self {
        SegmentationEngine {
            vad,
            lookback: LookbackRing::new(),
            segment: SegmentBuffer::new(),
            state: RecordingState::Idle,
        }
    }

    /// Process one chunk against the wall clock.
    pub fn process_chunk(&mut self, chunk: &[f32]) -> Vec<SegmentEvent> {
        self.process_chunk_at(chunk, Instant::now())
    }

    /// Process one chunk at an explicit time. Tests drive this directly so
    /// refresh timing is deterministic.
    pub fn process_chunk_at(&mut self, chunk: &[f32], now: Instant) -> Vec<SegmentEvent> {
        debug_assert_eq!(chunk.len(), CHUNK_SIZE, "framer must deliver fixed-size chunks");

        self.vad.accept_waveform(chunk);
        let speaking = self.vad.is_speech_detected();

        let mut events = Vec::new();
        let was_recording = matches!(self.state, RecordingState::Recording { .. });

        // Onset: seed the segment with pre-speech context so word starts
        // aren't clipped
        if !was_recording && speaking {
            self.state = RecordingState::Recording {
                clock: RefreshClock::started_at(now),
            };
            self.segment.seed(self.lookback.snapshot());
        }

        if matches!(self.state, RecordingState::Recording { .. }) {
            self.segment.append(chunk);

            // Forced cutoff wins over both refresh and offset for this chunk.
            // The VAD is still primed with a speech hypothesis at this point,
            // so it gets an explicit reset; a natural offset never needs one.
            if self.segment.duration_secs() > MAX_SPEECH_SECS {
                if let Some(window) = self.finalize() {
                    events.push(SegmentEvent::FinalReady { window });
                }
                self.vad.reset();
                return events;
            }

            if let RecordingState::Recording { clock } = &mut self.state {
                if clock.refresh_due(now) && self.segment.len() >= MIN_DECODE_SAMPLES {
                    events.push(SegmentEvent::InterimReady {
                        window: self.segment.window(),
                    });
                    clock.mark_emitted(now);
                }
            }

            // Offset only fires from a state that was already recording
            // before this chunk
            if was_recording && !speaking {
                if let Some(window) = self.finalize() {
                    events.push(SegmentEvent::FinalReady { window });
                }
            }
        } else {
            // Idle with no transition: accumulate lookback
            self.lookback.push(chunk);
        }

        events
    }

    /// Discard the in-progress segment without decoding and return to idle.
    ///
    /// Keeps a small tail of lookback so a resume shortly after doesn't lose
    /// all pre-roll context.
    pub fn pause(&mut self) {
        self.state = RecordingState::Idle;
        self.segment.clear();
        self.lookback.truncate_to_last(PAUSE_CARRYOVER_SAMPLES);
    }

    /// End the utterance: emit the window if it clears the decode floor,
    /// otherwise discard it as too short. Either way the segment buffer and
    /// timers are gone and the engine is idle again.
    fn finalize(&mut self) -> Option<Vec<f32>> {
        let samples = self.segment.take();
        self.state = RecordingState::Idle;
        if samples.len() >= MIN_DECODE_SAMPLES {
            Some(samples)
        } else {
            None
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self.state, RecordingState::Recording { .. })
    }

    pub fn lookback(&self) -> &LookbackRing {
        &self.lookback
    }

    pub fn segment_len(&self) -> usize {
        self.segment.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// VAD stub that answers from a fixed schedule of decisions.
    struct FixedVad {
        decisions: Vec<bool>,
        pos: usize,
        current: bool,
    }

    impl FixedVad {
        fn new(decisions: Vec<bool>) -> Self {
            FixedVad {
                decisions,
                pos: 0,
                current: false,
            }
        }
    }

    impl VoiceActivityDetector for FixedVad {
        fn accept_waveform(&mut self, _chunk: &[f32]) {
            self.current = self.decisions.get(self.pos).copied().unwrap_or(false);
            self.pos += 1;
        }

        fn is_speech_detected(&self) -> bool {
            self.current
        }

        fn reset(&mut self) {
            self.current = false;
        }
    }

    fn chunk(value: f32) -> Vec<f32> {
        vec![value; CHUNK_SIZE]
    }

    #[test]
    fn test_idle_chunks_accumulate_lookback() {
        let mut engine = SegmentationEngine::new(FixedVad::new(vec![false; 5]));
        let t0 = Instant::now();
        for _ in 0..5 {
            let events = engine.process_chunk_at(&chunk(0.0), t0);
            assert!(events.is_empty());
        }
        assert!(!engine.is_recording());
        assert_eq!(engine.lookback().len(), 5 * CHUNK_SIZE);
        assert_eq!(engine.segment_len(), 0);
    }

    #[test]
    fn test_onset_seeds_segment_from_lookback() {
        let mut engine = SegmentationEngine::new(FixedVad::new(vec![false, false, true]));
        let t0 = Instant::now();
        engine.process_chunk_at(&chunk(0.1), t0);
        engine.process_chunk_at(&chunk(0.2), t0);
        let lookback_len = engine.lookback().len();

        engine.process_chunk_at(&chunk(0.3), t0);
        assert!(engine.is_recording());
        // Seeded lookback plus the onset chunk itself
        assert_eq!(engine.segment_len(), lookback_len + CHUNK_SIZE);
        // The onset chunk was not pushed into lookback
        assert_eq!(engine.lookback().len(), lookback_len);
    }

    #[test]
    fn test_onset_with_empty_lookback_does_not_panic() {
        let mut engine = SegmentationEngine::new(FixedVad::new(vec![true]));
        let events = engine.process_chunk_at(&chunk(0.5), Instant::now());
        assert!(events.is_empty());
        assert!(engine.is_recording());
        assert_eq!(engine.segment_len(), CHUNK_SIZE);
    }

    #[test]
    fn test_pause_discards_segment_and_truncates_lookback() {
        let mut decisions = vec![false; 50];
        decisions.extend(vec![true; 10]);
        let mut engine = SegmentationEngine::new(FixedVad::new(decisions));
        let t0 = Instant::now();
        for _ in 0..60 {
            engine.process_chunk_at(&chunk(0.1), t0);
        }
        assert!(engine.is_recording());

        engine.pause();
        assert!(!engine.is_recording());
        assert_eq!(engine.segment_len(), 0);
        assert_eq!(engine.lookback().len(), PAUSE_CARRYOVER_SAMPLES);
    }
}
