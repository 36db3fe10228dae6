use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use speech_segmenter::config::Config;
use speech_segmenter::constants::audio::{CHUNK_SIZE, SAMPLE_RATE};
use speech_segmenter::framer;
use speech_segmenter::pipeline::{Action, PipelineState};
use speech_segmenter::vad::EnergyVad;
use speech_segmenter::worker::{DecodeOutcome, DecodeWorker};

#[derive(Parser)]
#[command(name = "speech-segmenter")]
#[command(about = "Real-time speech segmentation with interim and final transcripts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recording through the segmentation pipeline
    Replay {
        /// Recording to replay (.wav, or raw f32le at 16kHz)
        file: PathBuf,
    },
    /// Record raw test audio from the microphone
    Record {
        /// Name for this recording
        #[arg(default_value = "test1")]
        name: String,
    },
    /// Run the live microphone pipeline
    Run,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Replay { file } => replay_command(&file),
        Commands::Record { name } => record_command(&name),
        Commands::Run => run_command(),
    }
}

fn build_vad(config: &Config) -> EnergyVad {
    EnergyVad::new(
        config.vad.silence_threshold,
        config.vad.min_speech_ms,
        config.vad.min_silence_ms,
    )
}

#[cfg(feature = "whisper")]
fn spawn_decode_worker(config: &Config) -> Result<Option<(DecodeWorker, Receiver<DecodeOutcome>)>> {
    use speech_segmenter::whisper::WhisperDecoder;

    // Load the model once and share it between both worker lanes
    let interim_decoder = WhisperDecoder::new(config.decoder.clone())?;
    let final_decoder =
        WhisperDecoder::with_shared_context(interim_decoder.shared_context(), config.decoder.clone())?;

    Ok(Some(DecodeWorker::new(interim_decoder, final_decoder)))
}

#[cfg(not(feature = "whisper"))]
fn spawn_decode_worker(_config: &Config) -> Result<Option<(DecodeWorker, Receiver<DecodeOutcome>)>> {
    println!("ℹ️  Built without the whisper feature - segmentation only, no transcripts");
    Ok(None)
}

/// Execute submit/cancel actions against the decode worker (when present).
fn handle_actions(time_label: &str, actions: Vec<Action>, worker: Option<&DecodeWorker>) {
    for action in actions {
        match action {
            Action::SubmitInterimDecode { audio, request_id } => {
                println!(
                    "{}👁️  Interim window: {:.2}s (request {})",
                    time_label,
                    audio.len() as f32 / SAMPLE_RATE as f32,
                    request_id
                );
                if let Some(w) = worker {
                    w.submit_interim(audio, request_id);
                }
            }
            Action::SubmitFinalDecode { audio, request_id } => {
                println!(
                    "{}💾 Final window: {:.2}s (request {})",
                    time_label,
                    audio.len() as f32 / SAMPLE_RATE as f32,
                    request_id
                );
                if let Some(w) = worker {
                    w.submit_final(audio, request_id);
                }
            }
            Action::CancelInterimDecodes { before_request_id } => {
                if let Some(w) = worker {
                    w.cancel_interim_before(before_request_id);
                }
            }
            _ => {} // Emit actions only come out of process_decode_outcome
        }
    }
}

/// Drain decode results and surface transcripts.
fn poll_results(pipeline: &mut PipelineState<EnergyVad>, results: &Receiver<DecodeOutcome>) {
    while let Ok(outcome) = results.try_recv() {
        match pipeline.process_decode_outcome(outcome) {
            Action::EmitInterim(text) => println!("👁️  Interim: \"{}\"", text),
            Action::EmitFinal(text) => println!("✅ Final: \"{}\"", text),
            _ => {}
        }
    }
}

fn replay_command(file: &Path) -> Result<()> {
    println!("Speech Segmenter - Replay");
    println!();

    let samples = load_samples(file)?;
    println!(
        "📊 Audio: {} samples ({:.2}s at {}Hz)",
        samples.len(),
        samples.len() as f32 / SAMPLE_RATE as f32,
        SAMPLE_RATE
    );
    println!();

    let config = Config::load_or_create().unwrap_or_default();
    let mut pipeline = PipelineState::new(build_vad(&config));
    let decode = spawn_decode_worker(&config)?;
    let worker = decode.as_ref().map(|(w, _)| w);

    // Replay against a synthetic clock that advances with the audio, so the
    // interim refresh pacing matches what a live run would do
    let t0 = Instant::now();
    let chunk_ms = (CHUNK_SIZE as u64 * 1000) / SAMPLE_RATE as u64;

    for (i, chunk) in framer::frame(&samples).enumerate() {
        let now = t0 + Duration::from_millis(i as u64 * chunk_ms);
        let time_label = format!("[{:7.2}s] ", (i as u64 * chunk_ms) as f32 / 1000.0);

        let actions = pipeline.process_samples_at(&chunk, now);
        handle_actions(&time_label, actions, worker);

        if let Some((_, results)) = &decode {
            poll_results(&mut pipeline, results);
        }
    }

    if pipeline.is_recording() {
        println!(
            "⚠️  Input ended mid-utterance ({:.2}s buffered, discarded)",
            pipeline.engine().segment_len() as f32 / SAMPLE_RATE as f32
        );
    }

    // Let in-flight decodes finish: dropping the worker handle closes the
    // task channels, the workers drain and exit, and the result channel
    // disconnects
    if let Some((worker_handle, results)) = decode {
        drop(worker_handle);
        while let Ok(outcome) = results.recv() {
            match pipeline.process_decode_outcome(outcome) {
                Action::EmitInterim(text) => println!("👁️  Interim: \"{}\"", text),
                Action::EmitFinal(text) => println!("✅ Final: \"{}\"", text),
                _ => {}
            }
        }
    }

    println!();
    println!("Replay complete");

    Ok(())
}

#[cfg(feature = "capture")]
fn record_command(name: &str) -> Result<()> {
    use std::io::{self, BufRead, Write};
    use speech_segmenter::capture::AudioCapture;

    println!("Speech Segmenter - Test Recording");
    println!();
    print!("Press ENTER to start recording...");
    io::stdout().flush()?;

    {
        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();
        lines.next();
    } // Release the stdin lock - the stop watcher thread needs it

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    println!();
    println!("🔴 RECORDING - Speak now!");
    println!("Press ENTER when done...");

    let mut audio_data = Vec::new();
    // Keep draining so the capture buffer stays small
    let (done_tx, done_rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();
        lines.next();
        let _ = done_tx.send(());
    });

    loop {
        std::thread::sleep(Duration::from_millis(100));
        audio_data.extend(capture.drain_samples());
        if done_rx.try_recv().is_ok() {
            break;
        }
    }

    capture.stop();
    audio_data.extend(capture.drain_samples());

    println!();
    println!(
        "✓ Recorded {} samples ({:.2}s)",
        audio_data.len(),
        audio_data.len() as f32 / SAMPLE_RATE as f32
    );

    // Save raw audio as f32 samples next to the config
    let recordings_dir = Config::config_dir()?.join("recordings");
    std::fs::create_dir_all(&recordings_dir)?;

    let audio_file = recordings_dir.join(format!("{}.raw", name));
    let meta_file = recordings_dir.join(format!("{}.txt", name));

    let mut file = std::fs::File::create(&audio_file)?;
    for sample in &audio_data {
        file.write_all(&sample.to_le_bytes())?;
    }

    std::fs::write(
        &meta_file,
        format!(
            "samples: {}\nduration: {:.2}s\nsample_rate: {}\nchannels: 1\nformat: f32le\n",
            audio_data.len(),
            audio_data.len() as f32 / SAMPLE_RATE as f32,
            SAMPLE_RATE
        ),
    )?;

    println!("💾 Saved to: {}", audio_file.display());
    println!();
    println!("To replay: speech-segmenter replay {}", audio_file.display());

    Ok(())
}

#[cfg(not(feature = "capture"))]
fn record_command(_name: &str) -> Result<()> {
    anyhow::bail!("Built without the capture feature - rebuild with --features capture")
}

#[cfg(feature = "capture")]
fn run_command() -> Result<()> {
    use std::io::{self, BufRead};
    use speech_segmenter::capture::AudioCapture;

    println!("Speech Segmenter - Live Pipeline");
    println!();

    let config = Config::load_or_create()?;
    println!("Configuration loaded successfully");

    let decode = spawn_decode_worker(&config)?;
    let worker = decode.as_ref().map(|(w, _)| w);

    let mut pipeline = PipelineState::new(build_vad(&config));

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    println!();
    println!("Listening. Commands: p = pause, r = resume, q = quit");
    println!();

    // Stdin commands arrive on a channel so the main loop never blocks
    let (cmd_tx, cmd_rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if cmd_tx.send(line.trim().to_string()).is_err() {
                break;
            }
        }
    });

    loop {
        std::thread::sleep(Duration::from_millis(16));

        match cmd_rx.try_recv() {
            Ok(cmd) => match cmd.as_str() {
                "p" => {
                    if capture.is_recording() {
                        capture.stop();
                        let actions = pipeline.pause();
                        handle_actions("", actions, worker);
                        println!("⏸  Paused (in-progress utterance discarded)");
                    }
                }
                "r" => {
                    if !capture.is_recording() {
                        pipeline.resume();
                        capture.start()?;
                        println!("▶️  Resumed");
                    }
                }
                "q" => break,
                _ => {}
            },
            Err(_) => {}
        }

        if capture.is_recording() {
            let samples = capture.drain_samples();
            if !samples.is_empty() {
                let actions = pipeline.process_samples(&samples);
                handle_actions("", actions, worker);
            }
        }

        if let Some((_, results)) = &decode {
            poll_results(&mut pipeline, results);
        }
    }

    capture.stop();
    println!("Goodbye");

    Ok(())
}

#[cfg(not(feature = "capture"))]
fn run_command() -> Result<()> {
    anyhow::bail!("Built without the capture feature - rebuild with --features capture")
}

/// Load a recording: WAV via hound, anything else as raw f32le at 16kHz.
fn load_samples(path: &Path) -> Result<Vec<f32>> {
    if !path.exists() {
        anyhow::bail!("Recording not found: {}", path.display());
    }

    match path.extension().and_then(|s| s.to_str()) {
        Some("wav") => load_wav(path),
        _ => load_raw(path),
    }
}

fn load_raw(path: &Path) -> Result<Vec<f32>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read audio file: {}", path.display()))?;

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

fn load_wav(path: &Path) -> Result<Vec<f32>> {
    let reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;
    let spec = reader.spec();

    if spec.sample_rate != SAMPLE_RATE {
        anyhow::bail!(
            "WAV sample rate is {} Hz, expected {} Hz (resample it first)",
            spec.sample_rate,
            SAMPLE_RATE
        );
    }

    let channels = spec.channels as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .context("Failed to decode WAV samples")?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .context("Failed to decode WAV samples")?
        }
    };

    if channels <= 1 {
        return Ok(interleaved);
    }

    // Average channels to get mono
    Ok(interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect())
}
