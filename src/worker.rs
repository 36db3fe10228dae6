/// Decode worker threads
///
/// Decoding is the one slow, blocking operation in the pipeline, so it never
/// runs on the audio-delivery thread. Two dedicated threads each own a
/// decoder: one lane for interim refreshes (droppable under load) and one
/// for final windows (losing these loses transcript). Bounded task channels
/// give backpressure; results come back on a shared unbounded channel.

use std::sync::mpsc::{channel, sync_channel, Receiver, Sender, SyncSender, TrySendError};
use std::thread;

use crate::constants::worker::MAX_PENDING_REQUESTS;
use crate::decoder::Decoder;

/// Message sent to worker threads
#[derive(Debug)]
enum WorkerMessage {
    /// Decode a sample window under the given request ID
    Decode { audio: Vec<f32>, request_id: u64 },
    /// Cancel all requests before a given ID
    CancelAllBefore { request_id: u64 },
}

/// Result of a decode request
#[derive(Debug)]
pub enum DecodeOutcome {
    /// Interim refresh result
    Interim { text: String, request_id: u64 },
    /// Final utterance result
    Final { text: String, request_id: u64 },
    /// Error during decoding
    Error { error: String, request_id: u64 },
}

/// Handle for submitting work to the decode threads
pub struct DecodeWorker {
    interim_task_sender: SyncSender<WorkerMessage>,
    final_task_sender: SyncSender<WorkerMessage>,
}

impl DecodeWorker {
    /// Spawn the two worker threads. Each lane gets its own decoder instance;
    /// implementations that share a model context can hand out two handles to
    /// the same context.
    pub fn new<D: Decoder + Send + 'static>(
        interim_decoder: D,
        final_decoder: D,
    ) -> (Self, Receiver<DecodeOutcome>) {
        let (interim_task_tx, interim_task_rx) = sync_channel(MAX_PENDING_REQUESTS);
        let (final_task_tx, final_task_rx) = sync_channel(MAX_PENDING_REQUESTS);
        let (result_tx, result_rx) = channel(); // Results channel can be unbounded

        let result_tx_interim = result_tx.clone();
        thread::spawn(move || {
            Self::worker_loop(interim_task_rx, result_tx_interim, interim_decoder, Lane::Interim);
        });

        thread::spawn(move || {
            Self::worker_loop(final_task_rx, result_tx, final_decoder, Lane::Final);
        });

        let worker = DecodeWorker {
            interim_task_sender: interim_task_tx,
            final_task_sender: final_task_tx,
        };

        (worker, result_rx)
    }

    /// Submit an interim decode (non-blocking).
    ///
    /// Uses try_send to avoid blocking the audio loop. A full queue means the
    /// worker is behind on audio that is already stale, so the request is
    /// simply dropped.
    pub fn submit_interim(&self, audio: Vec<f32>, request_id: u64) {
        match self
            .interim_task_sender
            .try_send(WorkerMessage::Decode { audio, request_id })
        {
            Ok(_) => {}
            Err(TrySendError::Full(_)) => {
                eprintln!(
                    "⚠️  Interim decode queue full, dropping request {} (worker is busy)",
                    request_id
                );
            }
            Err(TrySendError::Disconnected(_)) => {
                eprintln!("❌ Interim decode worker disconnected");
            }
        }
    }

    /// Submit a final decode (non-blocking).
    pub fn submit_final(&self, audio: Vec<f32>, request_id: u64) {
        match self
            .final_task_sender
            .try_send(WorkerMessage::Decode { audio, request_id })
        {
            Ok(_) => {}
            Err(TrySendError::Full(_)) => {
                // Final windows matter - warn loudly if we ever drop one
                eprintln!(
                    "⚠️  Final decode queue full, dropping request {} (worker overloaded!)",
                    request_id
                );
            }
            Err(TrySendError::Disconnected(_)) => {
                eprintln!("❌ Final decode worker disconnected");
            }
        }
    }

    /// Cancel all interim requests before a given ID. Used when a final
    /// window supersedes pending refreshes, and on pause.
    pub fn cancel_interim_before(&self, request_id: u64) {
        if let Err(e) = self
            .interim_task_sender
            .send(WorkerMessage::CancelAllBefore { request_id })
        {
            eprintln!("⚠️  Failed to send cancel-all request: {}", e);
        }
    }

    fn worker_loop<D: Decoder>(
        task_rx: Receiver<WorkerMessage>,
        result_tx: Sender<DecodeOutcome>,
        mut decoder: D,
        lane: Lane,
    ) {
        println!("🔧 {} decode worker thread started", lane.name());

        // Request IDs are monotonic, so cancellation is just a threshold.
        // This is best-effort: a request already being decoded when the
        // cancel arrives still completes, and the consumer's request-id
        // check discards its stale result.
        let mut cancelled_before: u64 = 0;

        for message in task_rx {
            match message {
                WorkerMessage::Decode { audio, request_id } => {
                    if request_id < cancelled_before {
                        println!("⏭️  Skipping cancelled {} request {}", lane.name(), request_id);
                        continue;
                    }

                    let result = match decoder.decode(&audio) {
                        Ok(text) => lane.outcome(text.trim().to_string(), request_id),
                        Err(e) => DecodeOutcome::Error {
                            error: format!("{} decode error: {}", lane.name(), e),
                            request_id,
                        },
                    };

                    if result_tx.send(result).is_err() {
                        println!("⚠️  {} decode worker: consumer disconnected", lane.name());
                        break;
                    }
                }
                WorkerMessage::CancelAllBefore { request_id } => {
                    cancelled_before = cancelled_before.max(request_id);
                    println!("❌ Cancelled all {} requests before {}", lane.name(), request_id);
                }
            }
        }

        println!("🔧 {} decode worker thread stopped", lane.name());
    }
}

#[derive(Clone, Copy)]
enum Lane {
    Interim,
    Final,
}

impl Lane {
    fn name(self) -> &'static str {
        match self {
            Lane::Interim => "interim",
            Lane::Final => "final",
        }
    }

    fn outcome(self, text: String, request_id: u64) -> DecodeOutcome {
        match self {
            Lane::Interim => DecodeOutcome::Interim { text, request_id },
            Lane::Final => DecodeOutcome::Final { text, request_id },
        }
    }
}
