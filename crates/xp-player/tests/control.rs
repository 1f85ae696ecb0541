//! Control-surface tests against the in-memory device.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use xp_audio::RingDevice;
use xp_ir::{Event, Instrument, LoopType, Module, Sample, SampleData, UnpackedPattern};
use xp_player::{
    AudioError, DeviceFactory, MemoryClock, MemoryDevice, MemoryProbe, PcmFormat, Player,
    PlayerConfig, PlayerError,
};

/// Two order positions, each starting a looping tone.
fn song() -> Module {
    let mut module = Module::default();
    module.header.channels = 2;
    module.header.song_length = 2;
    module.header.order[..2].copy_from_slice(&[0, 1]);
    for _ in 0..2 {
        let mut pattern = UnpackedPattern::new(32, 2);
        *pattern.cell_mut(0, 0) = Event { note: 49, instrument: 1, ..Event::empty() };
        module.unpacked.push(pattern);
    }
    let mut sample = Sample::new("tone");
    sample.data = SampleData::Pcm8((0..64).map(|i| if i < 32 { 70 } else { -70 }).collect());
    sample.loop_type = LoopType::Forward;
    sample.loop_length = 64;
    let mut inst = Instrument::new("tone");
    inst.samples.push(sample);
    module.instruments.push(inst);
    module
}

fn config() -> PlayerConfig {
    PlayerConfig {
        buffer_frames: 2048,
        safety_margin_frames: 128,
        max_fill_frames: 512,
        poll_interval: Duration::from_millis(2),
        goto_poll_interval: Duration::from_millis(2),
        ..PlayerConfig::default()
    }
}

/// A player on a realtime memory device, plus a slot that receives the
/// device's probe once the worker opens it.
fn memory_player() -> (Player, Arc<Mutex<Option<MemoryProbe>>>) {
    let probe_slot = Arc::new(Mutex::new(None));
    let slot = probe_slot.clone();
    let factory: DeviceFactory = Arc::new(move |config: &PlayerConfig| {
        let device = MemoryDevice::new(
            PcmFormat::stereo16(config.sample_rate),
            config.buffer_frames,
            MemoryClock::Realtime,
        );
        *slot.lock() = Some(device.probe());
        Ok(Box::new(device) as Box<dyn RingDevice>)
    });
    (Player::with_device_factory(config(), factory), probe_slot)
}

fn probe(slot: &Arc<Mutex<Option<MemoryProbe>>>) -> MemoryProbe {
    slot.lock().clone().expect("device opened")
}

#[test]
fn play_feeds_device_until_stop() {
    let (mut player, slot) = memory_player();
    player.try_play_module(song()).unwrap();
    assert!(player.is_playing());
    std::thread::sleep(Duration::from_millis(80));

    let probe = probe(&slot);
    let stats = probe.stats();
    assert!(stats.running);
    assert!(stats.audible_frames > 0);

    player.stop();
    assert!(!player.is_playing());
    let stopped = probe.stats();
    assert!(!stopped.running);
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(probe.stats().frames_written, stopped.frames_written);
}

#[test]
fn pause_twice_is_same_as_once() {
    let (mut player, slot) = memory_player();
    player.try_play_module(song()).unwrap();
    std::thread::sleep(Duration::from_millis(30));

    player.pause();
    player.pause();
    assert!(player.is_paused());
    // let anything rendered before the pause drain out
    std::thread::sleep(Duration::from_millis(30));
    let probe = probe(&slot);
    let audible = probe.stats().audible_frames;
    std::thread::sleep(Duration::from_millis(50));
    let stats = probe.stats();
    assert_eq!(stats.audible_frames, audible);

    player.resume();
    assert!(!player.is_paused());
    player.resume();
    assert!(!player.is_paused());
}

#[test]
fn goto_returns_after_fade_out() {
    let (mut player, _slot) = memory_player();
    player.try_play_module(song()).unwrap();
    player.set_fade_out(100);

    let start = Instant::now();
    assert!(player.goto_sequence(1));
    assert!(start.elapsed() <= Duration::from_millis(100 + 50));
    assert_eq!(player.position().map(|p| p.sequence), Some(1));
    assert_eq!(player.position().map(|p| p.pattern), Some(1));
}

#[test]
fn goto_without_fade_is_immediate() {
    let (mut player, _slot) = memory_player();
    player.try_play_module(song()).unwrap();
    let start = Instant::now();
    player.try_goto_sequence(1).unwrap();
    assert!(start.elapsed() < Duration::from_millis(20));
}

#[test]
fn goto_rejects_positions_past_song_end() {
    let (mut player, _slot) = memory_player();
    player.try_play_module(song()).unwrap();
    assert!(matches!(
        player.try_goto_sequence(2),
        Err(PlayerError::BadSequence { index: 2, length: 2 })
    ));
    assert!(!player.goto_sequence(9));
}

#[test]
fn goto_while_stopped_sets_start_position() {
    let (mut player, _slot) = memory_player();
    player.try_play_module(song()).unwrap();
    player.stop();
    assert!(!player.is_playing());

    player.try_goto_sequence(1).unwrap();
    player.try_start().unwrap();
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(player.position().map(|p| p.sequence), Some(1));
    assert_eq!(player.position().map(|p| p.pattern), Some(1));

    // the chosen position is used once
    player.try_start().unwrap();
    assert_eq!(player.position().map(|p| p.sequence), Some(0));
}

#[test]
fn goto_while_stopped_still_checks_bounds() {
    let (mut player, _slot) = memory_player();
    player.try_play_module(song()).unwrap();
    player.stop();
    assert!(matches!(
        player.try_goto_sequence(5),
        Err(PlayerError::BadSequence { index: 5, length: 2 })
    ));
    player.try_start().unwrap();
    assert_eq!(player.position().map(|p| p.sequence), Some(0));
}

#[test]
fn start_without_module_fails() {
    let (mut player, _slot) = memory_player();
    assert!(matches!(player.try_start(), Err(PlayerError::NotInitialized)));
    assert!(!player.is_playing());
}

#[test]
fn device_failure_is_reported() {
    let factory: DeviceFactory = Arc::new(|_: &PlayerConfig| Err(AudioError::NoDevice));
    let mut player = Player::with_device_factory(config(), factory);
    let err = player.try_play_module(song()).unwrap_err();
    assert!(matches!(err, PlayerError::Audio(AudioError::NoDevice)));
    assert!(!player.is_playing());
}

#[test]
fn hard_pause_resets_fade() {
    let (mut player, _slot) = memory_player();
    player.try_play_module(song()).unwrap();
    player.set_fade_out(10_000);
    player.hard_pause();
    assert!(player.is_paused());
    assert!(!player.state().fade().is_fading_out());
    player.hard_resume();
    assert!(!player.is_paused());
    assert!(player.is_playing());
}

#[test]
fn mute_toggles() {
    let (player, _slot) = memory_player();
    assert!(player.mute());
    assert!(player.is_muted());
    assert!(!player.mute());
    assert!(!player.is_muted());
}

#[test]
fn shutdown_is_final() {
    let (mut player, _slot) = memory_player();
    player.try_play_module(song()).unwrap();
    player.shutdown();
    assert!(!player.is_playing());
    assert!(player.module().is_none());
    assert!(matches!(player.try_play_module(song()), Err(PlayerError::ShutDown)));
}

#[test]
fn initialize_from_file() {
    let dir = std::env::temp_dir().join(format!("xmplay-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let good = dir.join("song.xm");
    std::fs::write(&good, xp_formats::write_module(&song())).unwrap();
    let bad = dir.join("bad.xm");
    std::fs::write(&bad, b"not a module").unwrap();

    let (mut player, _slot) = memory_player();
    assert!(player.initialize(&good));
    assert_eq!(player.module().map(|m| m.song_length()), Some(2));
    assert!(!player.initialize(&bad));
    assert!(!player.play(dir.join("missing.xm")));
    assert!(player.play(&good));
    assert!(player.is_playing());
    player.stop();

    std::fs::remove_dir_all(&dir).unwrap();
}
