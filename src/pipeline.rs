/// Pipeline state machine tying the segmentation engine to the decode workers
///
/// This encapsulates the request bookkeeping that would otherwise live in the
/// binary's event loop: framing capture buffers, mapping engine events to
/// decode submissions with request IDs, and routing decode results through
/// the interim deduper. It returns actions instead of performing them, so the
/// loop stays a thin executor and all of this is testable without threads.

use std::collections::HashSet;
use std::time::Instant;

use crate::dedup::InterimDeduper;
use crate::engine::{SegmentEvent, SegmentationEngine};
use crate::framer;
use crate::vad::VoiceActivityDetector;
use crate::worker::DecodeOutcome;

/// Actions the caller should perform in response to state changes
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Submit an interim decode request to the worker
    SubmitInterimDecode { audio: Vec<f32>, request_id: u64 },

    /// Submit a final decode request for a completed utterance
    SubmitFinalDecode { audio: Vec<f32>, request_id: u64 },

    /// Cancel pending interim decodes older than the given ID
    CancelInterimDecodes { before_request_id: u64 },

    /// Surface an interim transcript (already deduplicated)
    EmitInterim(String),

    /// Surface a final transcript for a completed utterance
    EmitFinal(String),

    /// No action needed
    NoAction,
}

pub struct PipelineState<V: VoiceActivityDetector> {
    /// The segmentation state machine
    engine: SegmentationEngine<V>,

    /// Suppresses repeated identical interim transcripts
    deduper: InterimDeduper,

    /// ID of the interim decode currently in flight, if any
    pending_interim_request: Option<u64>,

    /// IDs of final decodes in flight; more than one can be pending when the
    /// decoder runs slower than people talk
    pending_final_requests: HashSet<u64>,

    /// Counter for generating unique request IDs
    next_request_id: u64,
}

impl<V: VoiceActivityDetector> PipelineState<V> {
    pub fn new(vad: V) -> Self {
        PipelineState {
            engine: SegmentationEngine::new(vad),
            deduper: InterimDeduper::new(),
            pending_interim_request: None,
            pending_final_requests: HashSet::new(),
            next_request_id: 1,
        }
    }

    /// Process a capture buffer against the wall clock.
    pub fn process_samples(&mut self, samples: &[f32]) -> Vec<Action> {
        self.process_samples_at(samples, Instant::now())
    }

    /// Process a capture buffer of arbitrary length at an explicit time.
    pub fn process_samples_at(&mut self, samples: &[f32], now: Instant) -> Vec<Action> {
        let mut actions = Vec::new();

        for chunk in framer::frame(samples) {
            for event in self.engine.process_chunk_at(&chunk, now) {
                match event {
                    SegmentEvent::InterimReady { window } => {
                        // One interim in flight at a time; the engine will
                        // offer a fresher window soon enough
                        if self.pending_interim_request.is_none() {
                            let request_id = self.generate_request_id();
                            actions.push(Action::SubmitInterimDecode {
                                audio: window,
                                request_id,
                            });
                            self.pending_interim_request = Some(request_id);
                        }
                    }
                    SegmentEvent::FinalReady { window } => {
                        let request_id = self.generate_request_id();
                        actions.push(Action::SubmitFinalDecode {
                            audio: window,
                            request_id,
                        });
                        self.pending_final_requests.insert(request_id);

                        // The final window supersedes any pending interim
                        if self.pending_interim_request.take().is_some() {
                            actions.push(Action::CancelInterimDecodes {
                                before_request_id: request_id,
                            });
                        }

                        // Utterance over - the next interim hypothesis starts fresh
                        self.deduper.reset();
                    }
                }
            }
        }

        actions
    }

    /// Route a decode result back into pipeline state.
    ///
    /// Results for unknown or superseded request IDs are dropped. Decode
    /// errors clear the matching pending slot and nothing else - the
    /// segmentation state machine never sees them.
    pub fn process_decode_outcome(&mut self, outcome: DecodeOutcome) -> Action {
        match outcome {
            DecodeOutcome::Interim { text, request_id } => {
                if self.pending_interim_request != Some(request_id) {
                    return Action::NoAction;
                }
                self.pending_interim_request = None;

                if text.is_empty() {
                    return Action::NoAction;
                }

                match self.deduper.offer(&text) {
                    Some(fresh) => Action::EmitInterim(fresh),
                    None => Action::NoAction,
                }
            }
            DecodeOutcome::Final { text, request_id } => {
                if !self.pending_final_requests.remove(&request_id) {
                    return Action::NoAction;
                }

                if text.is_empty() {
                    return Action::NoAction;
                }

                Action::EmitFinal(text)
            }
            DecodeOutcome::Error { error, request_id } => {
                eprintln!("❌ Decode error (request {}): {}", request_id, error);
                if self.pending_interim_request == Some(request_id) {
                    self.pending_interim_request = None;
                }
                self.pending_final_requests.remove(&request_id);
                Action::NoAction
            }
        }
    }

    /// Discard the in-progress utterance without decoding it.
    ///
    /// Pending final decodes for utterances that completed before the pause
    /// stay deliverable; only interim work for the discarded segment is
    /// cancelled.
    pub fn pause(&mut self) -> Vec<Action> {
        self.engine.pause();
        self.deduper.reset();

        let mut actions = Vec::new();
        if self.pending_interim_request.take().is_some() {
            actions.push(Action::CancelInterimDecodes {
                before_request_id: self.next_request_id,
            });
        }
        actions
    }

    /// Resume after a pause. Recording state is untouched - the engine
    /// re-detects onset on the next speaking chunk.
    pub fn resume(&mut self) {
        self.deduper.reset();
    }

    pub fn is_recording(&self) -> bool {
        self.engine.is_recording()
    }

    pub fn engine(&self) -> &SegmentationEngine<V> {
        &self.engine
    }

    /// Generate a unique request ID
    /// Uses wrapping arithmetic to prevent overflow panic (not that a
    /// microphone will ever produce 2^64 utterances)
    fn generate_request_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1);
        id
    }
}
