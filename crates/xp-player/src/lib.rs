//! Playback control for the xmplay tracker.
//!
//! A [`Player`] owns the loaded module and a background scheduler thread
//! that renders it into an output device ring. Control calls only set
//! flags and targets in the shared [`EngineState`]; the worker picks them
//! up on its next iteration.
//!
//! The control surface mirrors a classic C-style API: most calls return
//! `bool` and log failures. Each fallible call also has a `try_*` form
//! returning [`PlayerError`].

mod config;
mod scheduler;
mod state;
mod wav;

use crossbeam_channel::RecvTimeoutError;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{error, info, warn};
use xp_audio::{CpalDevice, RingDevice};
use xp_engine::Engine;

pub use config::PlayerConfig;
pub use scheduler::{RingTracker, Scheduler, SharedEngine};
pub use state::{EngineState, Fade, PlaybackPosition, MAX_VOLUME};
pub use wav::write_wav;

// Re-export common types so callers don't need the lower crates directly.
pub use xp_audio::{AudioError, MemoryClock, MemoryDevice, MemoryProbe, PcmFormat};
pub use xp_engine::Frame;
pub use xp_formats::FormatError;
pub use xp_ir::Module;

/// Opens the output device on the worker thread.
pub type DeviceFactory =
    Arc<dyn Fn(&PlayerConfig) -> Result<Box<dyn RingDevice>, AudioError> + Send + Sync>;

/// Error type for player operations.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Audio(#[from] AudioError),
    /// Playback was requested before a module was loaded
    #[error("no module loaded")]
    NotInitialized,
    /// The player was shut down
    #[error("player has been shut down")]
    ShutDown,
    #[error("failed to spawn scheduler thread: {0}")]
    Spawn(std::io::Error),
    /// The worker did not report back in time
    #[error("output device did not start in time")]
    StartupTimeout,
    /// The worker exited before reporting
    #[error("scheduler thread exited during startup")]
    WorkerGone,
    /// Order position outside the song
    #[error("sequence position {index} out of range (song length {length})")]
    BadSequence { index: u16, length: u16 },
}

/// Module player driving a background output scheduler.
pub struct Player {
    config: PlayerConfig,
    factory: DeviceFactory,
    state: Arc<EngineState>,
    engine: SharedEngine,
    module: Option<Module>,
    /// Order position the next start begins at, consumed by `try_start`
    start_sequence: u16,
    worker: Option<JoinHandle<()>>,
    shut_down: bool,
}

impl Player {
    /// A player on the default cpal output device.
    pub fn new(config: PlayerConfig) -> Self {
        let factory: DeviceFactory = Arc::new(|config: &PlayerConfig| {
            let device = CpalDevice::new(config.buffer_frames)?;
            Ok(Box::new(device) as Box<dyn RingDevice>)
        });
        Self::with_device_factory(config, factory)
    }

    /// A player whose worker opens its device through `factory`.
    pub fn with_device_factory(config: PlayerConfig, factory: DeviceFactory) -> Self {
        Self {
            config,
            factory,
            state: Arc::new(EngineState::new()),
            engine: Arc::new(Mutex::new(None)),
            module: None,
            start_sequence: 0,
            worker: None,
            shut_down: false,
        }
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn module(&self) -> Option<&Module> {
        self.module.as_ref()
    }

    // --- Loading and lifecycle ---

    /// Load a module file, ready for [`Player::play`].
    pub fn initialize(&mut self, path: impl AsRef<Path>) -> bool {
        log_result("initialize", self.try_initialize(path))
    }

    pub fn try_initialize(&mut self, path: impl AsRef<Path>) -> Result<(), PlayerError> {
        if self.shut_down {
            return Err(PlayerError::ShutDown);
        }
        let module = xp_formats::load_module_file(path)?;
        self.module = Some(module);
        self.start_sequence = 0;
        Ok(())
    }

    /// Load a module file and start playing it.
    pub fn play(&mut self, path: impl AsRef<Path>) -> bool {
        log_result("play", self.try_play(path))
    }

    pub fn try_play(&mut self, path: impl AsRef<Path>) -> Result<(), PlayerError> {
        self.try_initialize(path)?;
        self.try_start()
    }

    /// Start playing an already loaded module.
    pub fn try_play_module(&mut self, module: Module) -> Result<(), PlayerError> {
        if self.shut_down {
            return Err(PlayerError::ShutDown);
        }
        self.module = Some(module);
        self.start_sequence = 0;
        self.try_start()
    }

    /// (Re)start the worker on the loaded module, from the top or from
    /// the position chosen with [`Player::goto_sequence`] while stopped.
    pub fn try_start(&mut self) -> Result<(), PlayerError> {
        if self.shut_down {
            return Err(PlayerError::ShutDown);
        }
        let module = self.module.clone().ok_or(PlayerError::NotInitialized)?;
        self.stop();
        self.state.rearm();
        let start = std::mem::take(&mut self.start_sequence);
        self.state.publish_position(PlaybackPosition {
            sequence: start,
            pattern: module.header.pattern_at(start as usize),
            row: 0,
        });

        let (tx, rx) = crossbeam_channel::bounded(1);
        let factory = self.factory.clone();
        let config = self.config.clone();
        let state = self.state.clone();
        let slot = self.engine.clone();

        let handle = std::thread::Builder::new()
            .name("xmplay-scheduler".into())
            .spawn(move || {
                let started = factory(&config).and_then(|device| {
                    let mut engine = Engine::new(module, device.format().sample_rate);
                    if start > 0 {
                        engine.goto(start);
                    }
                    engine.play();
                    *slot.lock() = Some(engine);
                    Scheduler::new(device, slot, state.clone(), config)
                });
                match started {
                    Ok(scheduler) => {
                        state.set_playing(true);
                        let _ = tx.send(Ok(()));
                        scheduler.run();
                    }
                    Err(err) => {
                        let _ = tx.send(Err(err));
                    }
                }
            })
            .map_err(PlayerError::Spawn)?;

        let result = match rx.recv_timeout(self.config.startup_timeout) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(PlayerError::Audio(err)),
            Err(RecvTimeoutError::Timeout) => Err(PlayerError::StartupTimeout),
            Err(RecvTimeoutError::Disconnected) => Err(PlayerError::WorkerGone),
        };
        self.worker = Some(handle);
        match result {
            Ok(()) => {
                info!(
                    name = self.module.as_ref().map_or("", |m| m.header.name.as_str()),
                    "playback started"
                );
                Ok(())
            }
            Err(err) => {
                self.stop();
                Err(err)
            }
        }
    }

    /// Stop playback and wait for the worker to exit. No device writes
    /// happen after this returns.
    pub fn stop(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };
        self.state.request_stop();
        if handle.join().is_err() {
            error!("scheduler thread panicked");
        }
        *self.engine.lock() = None;
        self.state.set_playing(false);
        self.state.set_paused(false);
        info!("playback stopped");
    }

    /// Stop playback and release the module. The player cannot be used
    /// afterwards.
    pub fn shutdown(&mut self) {
        self.stop();
        self.module = None;
        self.shut_down = true;
    }

    // --- Pausing ---

    /// Advisory pause: the worker keeps feeding silence.
    pub fn pause(&self) {
        self.state.set_paused(true);
    }

    pub fn resume(&self) {
        self.state.set_paused(false);
    }

    /// Pause and reset every voice and the fade.
    pub fn hard_pause(&self) {
        let mut slot = self.engine.lock();
        if let Some(engine) = slot.as_mut() {
            engine.reset_voices();
        }
        self.state.with_fade(|fade| fade.reset());
        self.state.set_paused(true);
    }

    /// Resume from a hard pause with fresh voices.
    pub fn hard_resume(&self) {
        let mut slot = self.engine.lock();
        if let Some(engine) = slot.as_mut() {
            engine.reset_voices();
        }
        self.state.with_fade(|fade| fade.reset());
        self.state.set_paused(false);
    }

    // --- Volume ---

    /// Toggle mute. Returns true when now muted.
    pub fn mute(&self) -> bool {
        self.state.toggle_mute()
    }

    /// Set the playback volume (0-64); an active fade heads for it.
    pub fn set_volume(&self, volume: u8) {
        self.state.with_fade(|fade| fade.set_volume(volume));
    }

    /// Set the volume ceiling (0-64), applied immediately.
    pub fn set_global_volume(&self, volume: u8) {
        self.state.set_ceiling(volume);
    }

    pub fn set_fade_in(&self, ms: u32) {
        self.state.with_fade(|fade| fade.fade_in(ms));
    }

    pub fn set_fade_out(&self, ms: u32) {
        self.state.with_fade(|fade| fade.fade_out(ms));
    }

    // --- Position ---

    /// Jump to an order position once any fade-out has finished.
    pub fn goto_sequence(&mut self, index: u16) -> bool {
        log_result("goto", self.try_goto_sequence(index))
    }

    /// Blocks for at most the remaining fade-out time. While stopped the
    /// position is kept for the next start.
    pub fn try_goto_sequence(&mut self, index: u16) -> Result<(), PlayerError> {
        let module = self.module.as_ref().ok_or(PlayerError::NotInitialized)?;
        let length = module.song_length() as u16;
        if index >= length {
            return Err(PlayerError::BadSequence { index, length });
        }

        let deadline = Instant::now() + self.state.fade().remaining();
        while self.state.fade().is_fading_out() && Instant::now() < deadline {
            std::thread::sleep(self.config.goto_poll_interval);
        }

        let position = PlaybackPosition {
            sequence: index,
            pattern: module.header.pattern_at(index as usize),
            row: 0,
        };
        let mut slot = self.engine.lock();
        match slot.as_mut() {
            Some(engine) => engine.goto(index),
            None => self.start_sequence = index,
        }
        self.state.publish_position(position);
        Ok(())
    }

    /// Last position published by the worker.
    pub fn position(&self) -> Option<PlaybackPosition> {
        self.is_playing().then(|| self.state.position())
    }

    pub fn is_playing(&self) -> bool {
        self.worker.is_some() && self.state.is_playing()
    }

    pub fn is_paused(&self) -> bool {
        self.state.is_paused()
    }

    pub fn is_muted(&self) -> bool {
        self.state.is_muted()
    }

    /// Shared state, for observers.
    pub fn state(&self) -> &Arc<EngineState> {
        &self.state
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.stop();
    }
}

fn log_result(op: &str, result: Result<(), PlayerError>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            warn!(op, %err, "player call failed");
            false
        }
    }
}

/// Render `module` offline from the top, without any device.
pub fn render_frames(module: Module, sample_rate: u32, frames: usize) -> Vec<Frame> {
    let mut engine = Engine::new(module, sample_rate);
    engine.play();
    let mut out = vec![Frame::silence(); frames];
    engine.render(&mut out);
    out
}
