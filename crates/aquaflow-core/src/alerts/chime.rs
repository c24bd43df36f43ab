//! Audible reminder cue.
//!
//! The cue is a short sine sweep rendered once into a WAV file and handed to
//! whichever command-line player the system has.

use std::f64::consts::TAU;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use tracing::{debug, warn};

use super::{AlertChannel, AlertError, Capability, Reminder};

pub const CHIME_SAMPLE_RATE: u32 = 44_100;

const START_FREQ_HZ: f64 = 523.25;
const END_FREQ_HZ: f64 = 880.0;
const SWEEP_SECS: f64 = 0.1;
const START_GAIN: f64 = 0.3;
const END_GAIN: f64 = 0.01;
const DURATION_SECS: f64 = 0.8;

const CHIME_FILE: &str = "chime.wav";
const PLAYERS: [&str; 3] = ["paplay", "aplay", "afplay"];

/// Render the cue as 16-bit mono samples.
///
/// Frequency and gain both follow exponential ramps: 523.25 Hz to 880 Hz in
/// the first 0.1 s, then held; gain 0.3 to 0.01 across the full 0.8 s.
pub fn synthesize_chime(sample_rate: u32) -> Vec<i16> {
    let rate = f64::from(sample_rate);
    let total = (rate * DURATION_SECS).round() as usize;
    let mut phase = 0.0_f64;

    (0..total)
        .map(|i| {
            let t = i as f64 / rate;
            let freq = if t < SWEEP_SECS {
                START_FREQ_HZ * (END_FREQ_HZ / START_FREQ_HZ).powf(t / SWEEP_SECS)
            } else {
                END_FREQ_HZ
            };
            let gain = START_GAIN * (END_GAIN / START_GAIN).powf(t / DURATION_SECS);
            let sample = phase.sin() * gain;
            phase = (phase + TAU * freq / rate) % TAU;
            (sample * f64::from(i16::MAX)).round() as i16
        })
        .collect()
}

/// Wrap PCM samples in a canonical 44-byte RIFF/WAVE header.
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let byte_rate = sample_rate * 2;
    let mut out = Vec::with_capacity(44 + data_len as usize);

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes()); // block align
    out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for sample in samples {
        out.extend_from_slice(&sample.to_le_bytes());
    }
    out
}

fn find_on_path(program: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

/// Plays the synthesized cue, or a custom sound file when configured.
#[derive(Debug, Clone)]
pub struct ChimeChannel {
    enabled: bool,
    cache_dir: PathBuf,
    custom_sound: Option<PathBuf>,
    player: Option<PathBuf>,
}

impl ChimeChannel {
    /// Look up a player on `PATH`. The cue is written to `cache_dir` lazily.
    pub fn new(cache_dir: &Path, enabled: bool, custom_sound: Option<PathBuf>) -> Self {
        let player = PLAYERS.iter().find_map(|p| find_on_path(p));
        if player.is_none() {
            debug!("no audio player found on PATH");
        }
        Self {
            enabled,
            cache_dir: cache_dir.to_path_buf(),
            custom_sound,
            player,
        }
    }

    /// Use a specific player binary.
    pub fn with_player(mut self, player: Option<PathBuf>) -> Self {
        self.player = player;
        self
    }

    pub fn player(&self) -> Option<&Path> {
        self.player.as_deref()
    }

    /// Sound file to play, rendering the chime on first use.
    pub fn sound_file(&self) -> Result<PathBuf, AlertError> {
        if let Some(custom) = &self.custom_sound {
            if custom.is_file() {
                return Ok(custom.clone());
            }
            warn!(path = %custom.display(), "custom sound missing, using chime");
        }

        let path = self.cache_dir.join(CHIME_FILE);
        if !path.is_file() {
            std::fs::create_dir_all(&self.cache_dir)?;
            let samples = synthesize_chime(CHIME_SAMPLE_RATE);
            std::fs::write(&path, encode_wav(&samples, CHIME_SAMPLE_RATE))?;
        }
        Ok(path)
    }
}

impl AlertChannel for ChimeChannel {
    fn name(&self) -> &'static str {
        "sound"
    }

    fn capability(&self) -> Capability {
        if self.enabled && self.player.is_some() {
            Capability::Available
        } else {
            Capability::Unavailable
        }
    }

    fn deliver(&mut self, _reminder: &Reminder) -> Result<(), AlertError> {
        let player = self
            .player
            .clone()
            .ok_or_else(|| AlertError::Unavailable("no audio player".into()))?;
        let file = self.sound_file()?;

        let mut child = Command::new(&player)
            .arg(&file)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        std::thread::spawn(move || {
            if let Some(problem) = playback_problem(child.wait()) {
                warn!(player = %player.display(), %problem, "chime playback failed");
            }
        });
        Ok(())
    }
}

/// Describe a player run that did not end cleanly.
fn playback_problem(result: std::io::Result<ExitStatus>) -> Option<String> {
    match result {
        Ok(status) if status.success() => None,
        Ok(status) => Some(status.to_string()),
        Err(e) => Some(e.to_string()),
    }
}
