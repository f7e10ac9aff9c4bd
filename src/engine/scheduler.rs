//! Live click scheduling
//!
//! A poll loop wakes every `poll_interval_ms` and commits every click whose
//! target time falls before `now + lookahead` on the output clock. Target
//! times come from the tempo clock, never from when the poll ran, so a late
//! tick shifts nothing audible as long as it lands inside the lookahead.
//!
//! The output device belongs to the scheduler thread for the whole play
//! session. `stop` ends the loop, joins the thread and drops the device,
//! which discards every click that was submitted but not yet rendered.

use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;

use crate::audio::click;
use crate::audio::tempo::{interval_seconds, validate_bpm, ClickTimes};
use crate::audio::SampleBuffer;
use crate::config::SchedulerConfig;
use crate::engine::backend::{AudioBackend, AudioOutput, PrecisionMode};
use crate::error::{log_audio_error, AudioError};

/// Play/stop transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportState {
    Stopped,
    Playing,
}

/// One click committed to the output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClickEvent {
    /// Ordinal since play started, continuous across tempo changes
    pub index: u64,
    /// Target time on the output clock, in seconds
    pub time: f64,
}

/// Lookahead planner for one play session.
///
/// Clicks are laid out from an anchor: `anchor + n * interval`. A tempo
/// change re-anchors on the last committed click, so committed clicks stay
/// where they are and every later click follows the new interval.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickPlan {
    anchor: f64,
    interval: f64,
    /// Next click relative to `anchor`
    next_index: u64,
    /// Next `ClickEvent::index`
    next_ordinal: u64,
    last_committed: Option<f64>,
}

impl ClickPlan {
    /// Plan whose first click sounds at `play_start`.
    pub fn new(bpm: u32, play_start: f64) -> Result<Self, AudioError> {
        Ok(Self {
            anchor: play_start,
            interval: interval_seconds(bpm)?,
            next_index: 0,
            next_ordinal: 0,
            last_committed: None,
        })
    }

    /// Commit every click with a target time before `now + horizon`.
    ///
    /// Clicks already behind `now` (a tick that ran very late) are still
    /// returned, with their original target times.
    pub fn poll(&mut self, now: f64, horizon: f64) -> Vec<ClickEvent> {
        let mut times =
            ClickTimes::new(self.anchor, self.interval, now + horizon).starting_at(self.next_index);

        let mut events = Vec::new();
        for time in times.by_ref() {
            events.push(ClickEvent {
                index: self.next_ordinal,
                time,
            });
            self.next_ordinal += 1;
            self.last_committed = Some(time);
        }
        self.next_index = times.next_index();
        events
    }

    /// Switch to a new tempo for every click not yet committed.
    ///
    /// Before anything was committed the first click stays at play start.
    pub fn retime(&mut self, bpm: u32) -> Result<(), AudioError> {
        self.interval = interval_seconds(bpm)?;
        match self.last_committed {
            Some(last) => {
                self.anchor = last;
                self.next_index = 1;
            }
            None => self.next_index = 0,
        }
        Ok(())
    }

    /// Target time of the next uncommitted click.
    pub fn next_click_time(&self) -> f64 {
        self.anchor + self.next_index as f64 * self.interval
    }

    pub fn last_committed(&self) -> Option<f64> {
        self.last_committed
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Number of clicks committed so far.
    pub fn committed(&self) -> u64 {
        self.next_ordinal
    }
}

/// Transport status observable by callers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub state: TransportState,
    pub bpm: u32,
    /// Precision of the current output, `None` while stopped
    pub precision: Option<PrecisionMode>,
    pub clicks_scheduled: u64,
}

impl SchedulerStatus {
    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }

    /// True while playing on an output that cannot honour target times.
    pub fn reduced_precision(&self) -> bool {
        self.precision == Some(PrecisionMode::BestEffort)
    }
}

struct Transport {
    state: TransportState,
    bpm: u32,
    precision: Option<PrecisionMode>,
    plan: Option<ClickPlan>,
}

struct Worker {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Transport state machine plus the poll loop that drives an output.
///
/// `start`, `stop` and `set_bpm` may be called from any thread. Transport
/// state sits behind one mutex shared with the poll loop; start and stop are
/// additionally serialized with each other.
///
/// `start` blocks until the backend has opened the output device (or failed
/// to), so the caller learns about a missing device and the output precision
/// right away. Clicks are then submitted from the scheduler thread; neither
/// `start` nor `stop` waits on playback itself.
pub struct LiveScheduler {
    backend: Arc<dyn AudioBackend>,
    config: SchedulerConfig,
    transport: Arc<Mutex<Transport>>,
    worker: Mutex<Option<Worker>>,
}

impl LiveScheduler {
    pub fn new(backend: Arc<dyn AudioBackend>, config: SchedulerConfig, initial_bpm: u32) -> Self {
        Self {
            backend,
            config,
            transport: Arc::new(Mutex::new(Transport {
                state: TransportState::Stopped,
                bpm: initial_bpm,
                precision: None,
                plan: None,
            })),
            worker: Mutex::new(None),
        }
    }

    /// Acquire the output and start clicking at `bpm`.
    ///
    /// Returns once the output is open and the first click is planned at the
    /// current output time. A no-op while already playing.
    ///
    /// Returns `true` if this call started playback, `false` if it was
    /// already playing.
    ///
    /// # Errors
    /// * `BpmInvalid` - `bpm == 0`; state is left unchanged
    /// * `OutputUnavailable` - the backend could not open an output
    /// * `WorkerFailed` - the scheduler thread could not be started
    pub fn start(&self, bpm: u32) -> Result<bool, AudioError> {
        validate_bpm(bpm)?;

        let mut worker = lock(&self.worker, "scheduler_worker")?;
        {
            let mut transport = lock(&self.transport, "transport")?;
            if transport.state == TransportState::Playing {
                tracing::debug!("[LiveScheduler] start ignored, already playing");
                return Ok(false);
            }
            transport.bpm = bpm;
        }

        let (ready_tx, ready_rx) = mpsc::channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let backend = Arc::clone(&self.backend);
        let config = self.config.clone();
        let transport = Arc::clone(&self.transport);

        let handle = std::thread::Builder::new()
            .name("swing-scheduler".to_string())
            .spawn(move || run_session(backend, config, transport, ready_tx, shutdown_rx))
            .map_err(|e| AudioError::WorkerFailed {
                reason: e.to_string(),
            })?;

        match ready_rx.recv() {
            Ok(Ok(precision)) => {
                if precision == PrecisionMode::BestEffort {
                    log_audio_error(
                        &AudioError::OutputUnavailable {
                            reason: "sample-accurate scheduling unavailable, using best-effort timing"
                                .to_string(),
                        },
                        "LiveScheduler::start",
                    );
                }
                tracing::info!(
                    bpm,
                    ?precision,
                    backend = self.backend.name(),
                    "[LiveScheduler] Playing"
                );
                *worker = Some(Worker {
                    shutdown: shutdown_tx,
                    handle,
                });
                Ok(true)
            }
            Ok(Err(err)) => {
                let _ = handle.join();
                Err(err)
            }
            Err(_) => {
                let _ = handle.join();
                Err(AudioError::WorkerFailed {
                    reason: "scheduler thread exited during startup".to_string(),
                })
            }
        }
    }

    /// Stop clicking and release the output. A no-op while stopped.
    ///
    /// The transport reads `Stopped` as soon as this returns. Clicks already
    /// handed to the device but not yet rendered are discarded with it.
    ///
    /// Returns `true` if this call stopped playback.
    pub fn stop(&self) -> Result<bool, AudioError> {
        let mut worker = lock(&self.worker, "scheduler_worker")?;
        let was_playing = {
            let mut transport = lock(&self.transport, "transport")?;
            let was_playing = transport.state == TransportState::Playing;
            if !was_playing && worker.is_none() {
                return Ok(false);
            }
            transport.state = TransportState::Stopped;
            transport.precision = None;
            transport.plan = None;
            was_playing
        };

        if let Some(worker) = worker.take() {
            let _ = worker.shutdown.send(());
            if worker.handle.join().is_err() {
                tracing::error!("[LiveScheduler] Scheduler thread panicked");
            }
        }

        tracing::info!("[LiveScheduler] Stopped");
        Ok(was_playing)
    }

    /// Change tempo. While playing, applies to every click not yet committed.
    ///
    /// # Errors
    /// `BpmInvalid` when `bpm == 0`; the current tempo is kept.
    pub fn set_bpm(&self, bpm: u32) -> Result<(), AudioError> {
        validate_bpm(bpm)?;

        let mut transport = lock(&self.transport, "transport")?;
        if let Some(plan) = transport.plan.as_mut() {
            plan.retime(bpm)?;
            tracing::debug!(
                bpm,
                next_click = plan.next_click_time(),
                "[LiveScheduler] Retimed"
            );
        }
        transport.bpm = bpm;
        Ok(())
    }

    pub fn status(&self) -> Result<SchedulerStatus, AudioError> {
        let transport = lock(&self.transport, "transport")?;
        Ok(SchedulerStatus {
            state: transport.state,
            bpm: transport.bpm,
            precision: transport.precision,
            clicks_scheduled: transport.plan.as_ref().map_or(0, ClickPlan::committed),
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }
}

impl Drop for LiveScheduler {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            log_audio_error(&err, "LiveScheduler::drop");
        }
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>, component: &str) -> Result<MutexGuard<'a, T>, AudioError> {
    mutex.lock().map_err(|_| AudioError::LockPoisoned {
        component: component.to_string(),
    })
}

/// Body of the scheduler thread: open the output, report readiness, then
/// poll until shut down.
fn run_session(
    backend: Arc<dyn AudioBackend>,
    config: SchedulerConfig,
    transport: Arc<Mutex<Transport>>,
    ready_tx: mpsc::Sender<Result<PrecisionMode, AudioError>>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            let _ = ready_tx.send(Err(AudioError::WorkerFailed {
                reason: format!("Failed to create scheduler runtime: {}", e),
            }));
            return;
        }
    };

    let mut output = match backend.open() {
        Ok(output) => output,
        Err(err) => {
            let _ = ready_tx.send(Err(err));
            return;
        }
    };

    let click = match click::synthesize(output.sample_rate()) {
        Ok(click) => click,
        Err(err) => {
            let _ = ready_tx.send(Err(err));
            return;
        }
    };

    let precision = output.precision();
    let horizon = match precision {
        PrecisionMode::SampleAccurate => config.lookahead_secs(),
        PrecisionMode::BestEffort => 0.0,
    };

    {
        let mut guard = match lock(&transport, "transport") {
            Ok(guard) => guard,
            Err(err) => {
                let _ = ready_tx.send(Err(err));
                return;
            }
        };
        let plan = match ClickPlan::new(guard.bpm, output.now()) {
            Ok(plan) => plan,
            Err(err) => {
                let _ = ready_tx.send(Err(err));
                return;
            }
        };
        guard.plan = Some(plan);
        guard.precision = Some(precision);
        guard.state = TransportState::Playing;
    }
    let _ = ready_tx.send(Ok(precision));

    runtime.block_on(async {
        let mut ticker = tokio::time::interval(config.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = ticker.tick() => {
                    if !poll_tick(&transport, output.as_mut(), &click, horizon) {
                        break;
                    }
                }
            }
        }
    });

    drop(output);
    tracing::debug!("[LiveScheduler] Session ended, output released");
}

/// One poll. Returns false once the session should end.
fn poll_tick(
    transport: &Mutex<Transport>,
    output: &mut dyn AudioOutput,
    click: &SampleBuffer,
    horizon: f64,
) -> bool {
    let events = {
        let mut guard = match transport.lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::error!("[LiveScheduler] Transport lock poisoned, ending session");
                return false;
            }
        };
        if guard.state != TransportState::Playing {
            return false;
        }
        let events = match guard.plan.as_mut() {
            Some(plan) => plan.poll(output.now(), horizon),
            None => return false,
        };
        events
    };

    for event in events {
        tracing::trace!(index = event.index, time = event.time, "[LiveScheduler] Click");
        if let Err(err) = output.submit(event, click) {
            log_audio_error(&err, "LiveScheduler::poll_tick");
        }
    }
    true
}
