//! xmplay - headless Extended Module player.
//!
//! Usage:
//!   xmplay path/to/song.xm
//!   xmplay path/to/song.xm --seconds 30 --fade-in 500 --fade-out 2000
//!   xmplay path/to/song.xm --render out.wav

use clap::Parser;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::info;
use xp_player::{write_wav, PcmFormat, Player, PlayerConfig, MAX_VOLUME};

#[derive(Parser, Debug)]
#[command(name = "xmplay", version, about = "Play FastTracker 2 Extended Modules")]
struct Args {
    /// Module file to play
    path: PathBuf,

    /// Stop after this many seconds (default: play until interrupted;
    /// rendering defaults to 60)
    #[arg(short, long)]
    seconds: Option<f32>,

    /// Fade in over this many milliseconds
    #[arg(long, default_value_t = 0)]
    fade_in: u32,

    /// Fade out over this many milliseconds before stopping
    #[arg(long, default_value_t = 0)]
    fade_out: u32,

    /// Playback volume, 0-64
    #[arg(short, long, default_value_t = MAX_VOLUME)]
    volume: u8,

    /// Order position to start from
    #[arg(long, default_value_t = 0)]
    start: u16,

    /// Output sample rate in Hz
    #[arg(long, default_value_t = 44100)]
    rate: u32,

    /// Render offline to a WAVE file instead of playing
    #[arg(long, value_name = "OUT.wav")]
    render: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = PlayerConfig { sample_rate: args.rate, ..PlayerConfig::default() };
    let mut player = Player::new(config);

    if let Err(err) = player.try_initialize(&args.path) {
        eprintln!("Failed to load {}: {}", args.path.display(), err);
        return ExitCode::FAILURE;
    }
    if let Some(module) = player.module() {
        print_summary(module);
    }

    let result = match &args.render {
        Some(out) => render_to_wav(&player, &args, out),
        None => play_audio(&mut player, &args),
    };
    player.shutdown();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::FAILURE
        }
    }
}

fn print_summary(module: &xp_player::Module) {
    let header = &module.header;
    println!("Title:       {}", header.name);
    println!("Tracker:     {}", header.tracker_name);
    println!("Channels:    {}", module.channels());
    println!("Patterns:    {}", module.unpacked.len());
    println!("Orders:      {}", module.song_length());
    println!("Instruments: {}", module.instruments.len());
    println!("Tempo:       {} BPM, Speed: {}", header.default_bpm, header.default_tempo);
    println!();
    print!("{}", xp_ir::summarize(module));
    println!();
}

fn play_audio(player: &mut Player, args: &Args) -> Result<(), String> {
    player.set_volume(args.volume);
    if args.fade_in > 0 {
        player.set_fade_in(args.fade_in);
    }
    if args.start > 0 {
        player
            .try_goto_sequence(args.start)
            .map_err(|err| format!("Failed to seek: {err}"))?;
    }
    player.try_start().map_err(|err| format!("Failed to start playback: {err}"))?;
    info!(volume = args.volume, start = args.start, "playing");

    let deadline = args.seconds.map(|s| Instant::now() + Duration::from_secs_f32(s.max(0.0)));
    let mut last_row = None;
    while player.is_playing() {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        if let Some(pos) = player.position() {
            if last_row != Some(pos) {
                print!(
                    "\rOrd: {:02X} | Pat: {:02X} | Row: {:02X}",
                    pos.sequence, pos.pattern, pos.row
                );
                let _ = std::io::stdout().flush();
                last_row = Some(pos);
            }
        }
        std::thread::sleep(Duration::from_millis(10));
    }

    if args.fade_out > 0 && player.is_playing() {
        player.set_fade_out(args.fade_out);
        std::thread::sleep(player.state().fade().remaining());
    }
    player.stop();
    println!("\rDone.                           ");
    Ok(())
}

fn render_to_wav(player: &Player, args: &Args, path: &Path) -> Result<(), String> {
    let module = player.module().cloned().ok_or("no module loaded")?;
    let seconds = args.seconds.unwrap_or(60.0).max(0.0);
    let frames = (seconds * args.rate as f32) as usize;
    println!("Rendering {seconds}s to {} at {} Hz...", path.display(), args.rate);

    let audio = xp_player::render_frames(module, args.rate, frames);
    let file = File::create(path).map_err(|err| format!("Failed to create {}: {err}", path.display()))?;
    let mut out = BufWriter::new(file);
    write_wav(&mut out, &audio, PcmFormat::stereo16(args.rate))
        .and_then(|()| out.flush())
        .map_err(|err| format!("Failed to write {}: {err}", path.display()))?;

    println!("Wrote {} frames.", audio.len());
    Ok(())
}
