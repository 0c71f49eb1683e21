//! # Encoding Pipeline
//!
//! Streams submitted frames through four single-threaded stages connected by
//! bounded queues:
//!
//! ```text
//! ┌────────┐   ┌───────┐   ┌──────┐   ┌──────────┐   ┌────────┐
//! │ submit │──▶│ scale │──▶│ diff │──▶│ quantize │──▶│ encode │──▶ sink
//! └────────┘   └───────┘   └──────┘   └──────────┘   └────────┘
//! ```
//!
//! Every queue is FIFO with exactly one consumer, so frames reach the sink in
//! submission order without any resequencing. A full queue blocks the
//! producer, which throttles `submit` when quantization falls behind.
//!
//! ## State machine
//!
//! `Idle` → `start` → `Running` → `finish` → `Draining` → `Closed`
//!
//! ## Failures
//!
//! The first stage error is recorded and returned from [`Pipeline::finish`].
//! Once a stage has failed, `submit` refuses new frames with a copy of that
//! error (a sink I/O failure surfaces as an I/O error), the encode stage
//! skips the trailer, and the sink is dropped. Bytes already written stay.
//!
//! ## Frame delays
//!
//! A frame is shown until the next capture, so `submit` holds the newest
//! frame back until its successor arrives (or `finish` is called) and then
//! stamps the interval between the two timestamps as its delay.

use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::SystemTime;

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, error, info, warn};

use crate::config::EncoderConfig;
use crate::core::frame::{Capture, QuantizedFrame, RawFrame};
use crate::error::{GifError, GifResult};
use crate::gif::GifWriter;

use super::{FrameDiffer, FrameQuantizer, FrameScaler, FrameStage};

/// Pipeline lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
    Draining,
    Closed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Running => "running",
            PipelineState::Draining => "draining",
            PipelineState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Worker stages, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Scale,
    Diff,
    Quantize,
    Encode,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Scale => "scale",
            Stage::Diff => "diff",
            Stage::Quantize => "quantize",
            Stage::Encode => "encode",
        }
    }
}

/// First failure seen by any stage.
#[derive(Debug, Default)]
struct Failure {
    failed: AtomicBool,
    slot: Mutex<Option<(Stage, GifError)>>,
}

impl Failure {
    fn record(&self, stage: Stage, err: GifError) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        // a real cause beats a hang-up notice
        let replace = match slot.as_ref() {
            None => true,
            Some((_, first)) => first.is_secondary() && !err.is_secondary(),
        };
        if replace {
            error!(
                stage = stage.name(),
                category = err.category(),
                fatal = err.is_fatal(),
                "{}",
                err
            );
            *slot = Some((stage, err));
        } else {
            debug!(stage = stage.name(), "{}", err);
        }
        self.failed.store(true, Ordering::SeqCst);
    }

    fn is_set(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }

    /// Copy of the recorded failure, if any.
    fn report(&self) -> Option<GifError> {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.as_ref().map(|(_, err)| err.replay())
    }

    fn take(&self) -> Option<GifError> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.take().map(|(_, err)| err)
    }
}

/// Run `processor` on its own thread until its input queue closes.
fn spawn_stage<S>(
    stage: Stage,
    mut processor: S,
    input: Receiver<S::Input>,
    output: Sender<S::Output>,
    failure: Arc<Failure>,
) -> GifResult<JoinHandle<()>>
where
    S: FrameStage + 'static,
    S::Input: 'static,
    S::Output: 'static,
{
    thread::Builder::new()
        .name(format!("gif-{}", stage.name()))
        .spawn(move || {
            for item in input.iter() {
                let out = match processor.process(item) {
                    Ok(out) => out,
                    Err(err) => {
                        failure.record(stage, err);
                        break;
                    }
                };
                if output.send(out).is_err() {
                    failure.record(stage, GifError::aborted(stage.name()));
                    break;
                }
            }
            debug!(stage = stage.name(), "stage stopped");
        })
        .map_err(|e| GifError::stage(stage.name(), format!("failed to spawn worker: {}", e)))
}

/// Encode stage: owns the sink and writes frames strictly in arrival order.
fn spawn_encoder<W>(
    sink: W,
    looping: bool,
    input: Receiver<QuantizedFrame>,
    failure: Arc<Failure>,
) -> GifResult<JoinHandle<Option<W>>>
where
    W: Write + Send + 'static,
{
    let stage = Stage::Encode;
    thread::Builder::new()
        .name(format!("gif-{}", stage.name()))
        .spawn(move || {
            let mut writer = GifWriter::start(sink, looping);
            for frame in input.iter() {
                if let Err(err) =
                    writer.write_frame(&frame, frame.rect.x, frame.rect.y, frame.delay)
                {
                    failure.record(stage, err);
                    return None;
                }
            }
            if failure.is_set() {
                // upstream failed; leave the partial stream without a trailer
                return None;
            }
            let frames = writer.frames_written();
            match writer.finish() {
                Ok(sink) => {
                    debug!(frames, "trailer written");
                    Some(sink)
                }
                Err(err) => {
                    failure.record(stage, err);
                    None
                }
            }
        })
        .map_err(|e| GifError::stage(stage.name(), format!("failed to spawn worker: {}", e)))
}

struct Workers<W> {
    input: Option<Sender<RawFrame>>,
    stages: Vec<(Stage, JoinHandle<()>)>,
    encoder: JoinHandle<Option<W>>,
}

/// Ordered, backpressured GIF encoding pipeline.
///
/// ```rust
/// use std::time::{Duration, SystemTime};
/// use gif_capture::{EncoderConfig, Pipeline};
///
/// let config = EncoderConfig::default().without_scaling().with_fixed_delay(10);
/// let mut pipeline = Pipeline::<Vec<u8>>::new(config).unwrap();
/// pipeline.start(Vec::new(), true).unwrap();
///
/// let t0 = SystemTime::now();
/// pipeline.submit(vec![0xFFFF_0000; 16], 4, 4, t0).unwrap();
/// pipeline.submit(vec![0xFF00_00FF; 16], 4, 4, t0 + Duration::from_millis(100)).unwrap();
///
/// let gif = pipeline.finish().unwrap();
/// assert!(gif.starts_with(b"GIF89a"));
/// assert_eq!(gif.last(), Some(&0x3B));
/// ```
pub struct Pipeline<W: Write + Send + 'static> {
    config: EncoderConfig,
    state: PipelineState,
    failure: Arc<Failure>,
    workers: Option<Workers<W>>,
    /// Newest frame, waiting for its successor's timestamp.
    pending: Option<RawFrame>,
    next_sequence: u64,
}

impl<W: Write + Send + 'static> Pipeline<W> {
    /// Validate `config` and create an idle pipeline.
    pub fn new(config: EncoderConfig) -> GifResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: PipelineState::Idle,
            failure: Arc::new(Failure::default()),
            workers: None,
            pending: None,
            next_sequence: 0,
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Frames accepted so far.
    pub fn submitted(&self) -> u64 {
        self.next_sequence
    }

    /// Spawn the stage workers. The sink belongs to the encode stage until
    /// [`finish`](Self::finish) hands it back.
    pub fn start(&mut self, sink: W, looping: bool) -> GifResult<()> {
        if self.state != PipelineState::Idle {
            return Err(GifError::state(self.state.to_string(), "start"));
        }

        let capacity = self.config.queue_capacity;
        let (input_tx, scale_rx) = bounded::<RawFrame>(capacity);
        let (scale_tx, diff_rx) = bounded(capacity);
        let (diff_tx, quant_rx) = bounded(capacity);
        let (quant_tx, encode_rx) = bounded(capacity);

        // on a spawn error the local sender drops, so stages already started exit
        let stages = vec![
            (
                Stage::Scale,
                spawn_stage(
                    Stage::Scale,
                    FrameScaler::new(self.config.scale),
                    scale_rx,
                    scale_tx,
                    self.failure.clone(),
                )?,
            ),
            (
                Stage::Diff,
                spawn_stage(
                    Stage::Diff,
                    FrameDiffer::new(),
                    diff_rx,
                    diff_tx,
                    self.failure.clone(),
                )?,
            ),
            (
                Stage::Quantize,
                spawn_stage(
                    Stage::Quantize,
                    FrameQuantizer::new(self.config.quantizer, self.config.sample_factor),
                    quant_rx,
                    quant_tx,
                    self.failure.clone(),
                )?,
            ),
        ];
        let encoder = spawn_encoder(sink, looping, encode_rx, self.failure.clone())?;

        self.workers = Some(Workers {
            input: Some(input_tx),
            stages,
            encoder,
        });
        self.state = PipelineState::Running;
        info!(
            quantizer = self.config.quantizer.name(),
            sample_factor = self.config.sample_factor,
            queue = capacity,
            looping,
            "pipeline started"
        );
        Ok(())
    }

    /// Queue a captured frame. Blocks while the first queue is full.
    pub fn submit(
        &mut self,
        pixels: Vec<u32>,
        width: u32,
        height: u32,
        captured_at: SystemTime,
    ) -> GifResult<()> {
        self.submit_capture(Capture::new(pixels, width, height, captured_at))
    }

    pub fn submit_capture(&mut self, capture: Capture) -> GifResult<()> {
        if self.state != PipelineState::Running {
            return Err(GifError::state(self.state.to_string(), "submit"));
        }
        self.check_failure()?;

        let frame = RawFrame::from_capture(self.next_sequence, capture);
        self.next_sequence += 1;

        if let Some(mut previous) = self.pending.take() {
            previous.delay = self.delay_between(previous.captured_at, frame.captured_at);
            self.pending = Some(frame);
            self.send(previous)
        } else {
            self.pending = Some(frame);
            Ok(())
        }
    }

    /// Drain every stage, write the trailer, and return the sink.
    ///
    /// Returns the first stage failure instead when one occurred; the
    /// partially written sink is dropped in that case.
    pub fn finish(mut self) -> GifResult<W> {
        if self.state != PipelineState::Running {
            return Err(GifError::state(self.state.to_string(), "finish"));
        }
        self.shutdown()
    }

    fn shutdown(&mut self) -> GifResult<W> {
        self.state = PipelineState::Draining;

        if let Some(mut last) = self.pending.take() {
            last.delay = self.config.fixed_delay.unwrap_or(self.config.final_delay);
            // a send failure is already recorded by the stage that stopped
            let _ = self.send(last);
        }

        let sink = match self.workers.take() {
            Some(mut workers) => {
                drop(workers.input.take());
                for (stage, handle) in workers.stages {
                    if handle.join().is_err() {
                        self.failure
                            .record(stage, GifError::stage(stage.name(), "worker panicked"));
                    }
                }
                match workers.encoder.join() {
                    Ok(sink) => sink,
                    Err(_) => {
                        self.failure.record(
                            Stage::Encode,
                            GifError::stage(Stage::Encode.name(), "worker panicked"),
                        );
                        None
                    }
                }
            }
            None => None,
        };

        self.state = PipelineState::Closed;

        if let Some(err) = self.failure.take() {
            return Err(err);
        }
        let sink = sink.ok_or_else(|| GifError::aborted(Stage::Encode.name()))?;
        info!(frames = self.next_sequence, "pipeline finished");
        Ok(sink)
    }

    fn send(&mut self, frame: RawFrame) -> GifResult<()> {
        let sequence = frame.sequence;
        let sent = self
            .workers
            .as_ref()
            .and_then(|w| w.input.as_ref())
            .map(|tx| tx.send(frame).is_ok())
            .unwrap_or(false);
        if !sent {
            self.check_failure()?;
            return Err(GifError::aborted(Stage::Scale.name()));
        }
        debug!(sequence, "frame submitted");
        Ok(())
    }

    /// Refuse work once any stage has failed, reporting the same error
    /// `finish` will return.
    fn check_failure(&self) -> GifResult<()> {
        if !self.failure.is_set() {
            return Ok(());
        }
        Err(self
            .failure
            .report()
            .unwrap_or_else(|| GifError::aborted(Stage::Scale.name())))
    }

    fn delay_between(&self, this: SystemTime, next: SystemTime) -> u16 {
        if let Some(fixed) = self.config.fixed_delay {
            return fixed;
        }
        let centis = next
            .duration_since(this)
            .map(|d| d.as_millis() / 10)
            .unwrap_or(0);
        u16::try_from(centis).unwrap_or(u16::MAX)
    }
}

impl<W: Write + Send + 'static> Drop for Pipeline<W> {
    fn drop(&mut self) {
        if self.state == PipelineState::Running {
            warn!(
                frames = self.next_sequence,
                "pipeline dropped without finish; draining"
            );
            if let Err(err) = self.shutdown() {
                warn!("discarded pipeline error: {}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config() -> EncoderConfig {
        EncoderConfig::default().without_scaling().with_sample_factor(1)
    }

    #[test]
    fn test_state_transitions() {
        let mut pipeline = Pipeline::<Vec<u8>>::new(config()).unwrap();
        assert_eq!(pipeline.state(), PipelineState::Idle);

        let err = pipeline
            .submit(vec![0; 4], 2, 2, SystemTime::UNIX_EPOCH)
            .unwrap_err();
        assert_eq!(err.category(), "state");

        pipeline.start(Vec::new(), false).unwrap();
        assert_eq!(pipeline.state(), PipelineState::Running);
        assert_eq!(pipeline.start(Vec::new(), false).unwrap_err().category(), "state");

        let bytes = pipeline.finish().unwrap();
        assert!(bytes.starts_with(b"GIF89a"));
    }

    #[test]
    fn test_finish_before_start_is_state_error() {
        let pipeline = Pipeline::<Vec<u8>>::new(config()).unwrap();
        assert_eq!(pipeline.finish().unwrap_err().category(), "state");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = Pipeline::<Vec<u8>>::new(config().with_queue_capacity(0)).err().unwrap();
        assert_eq!(err.category(), "validation");
    }

    #[test]
    fn test_delay_from_timestamps() {
        let pipeline = Pipeline::<Vec<u8>>::new(config()).unwrap();
        let t0 = SystemTime::UNIX_EPOCH;
        assert_eq!(pipeline.delay_between(t0, t0 + Duration::from_millis(200)), 20);
        assert_eq!(pipeline.delay_between(t0, t0 + Duration::from_millis(59)), 5);
        assert_eq!(pipeline.delay_between(t0 + Duration::from_secs(1), t0), 0);
        assert_eq!(pipeline.delay_between(t0, t0 + Duration::from_secs(1000)), u16::MAX);

        let fixed = Pipeline::<Vec<u8>>::new(config().with_fixed_delay(7)).unwrap();
        assert_eq!(fixed.delay_between(t0, t0 + Duration::from_millis(200)), 7);
    }

    #[test]
    fn test_malformed_frame_surfaces_from_finish() {
        let mut pipeline = Pipeline::<Vec<u8>>::new(config()).unwrap();
        pipeline.start(Vec::new(), false).unwrap();
        let t0 = SystemTime::UNIX_EPOCH;
        pipeline.submit(vec![0xFF00_0000; 3], 2, 2, t0).unwrap();
        let err = pipeline.finish().unwrap_err();
        assert_eq!(err.category(), "malformed_frame");
    }

    #[test]
    fn test_drop_while_running_joins_workers() {
        let mut pipeline = Pipeline::<Vec<u8>>::new(config()).unwrap();
        pipeline.start(Vec::new(), true).unwrap();
        pipeline
            .submit(vec![0xFF11_2233; 4], 2, 2, SystemTime::UNIX_EPOCH)
            .unwrap();
        drop(pipeline);
    }
}
