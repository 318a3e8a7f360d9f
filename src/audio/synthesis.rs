//! Procedural music synthesis.
//!
//! Every sample is a pure function of its frame index: oscillator phases are
//! computed from the time since the current note started and noise comes
//! from an integer hash, so any range can be rendered in any order and
//! always yields the same bits.

use std::f64::consts::TAU;
use std::time::Duration;

use crate::params::audio_constants::{BEATS_PER_BAR, CHANNELS, SAMPLE_RATE, TEMPO_BPM};
use crate::params::TRACK_DURATION;
use crate::timeline::TimeIndex;

/// Bass roots per bar (MIDI notes), cycled every four bars: A, F, C, G
const BASS_ROOTS: [i32; 4] = [45, 41, 48, 43];

/// Pad triads matching `BASS_ROOTS`
const PAD_CHORDS: [[i32; 3]; 4] = [[57, 60, 64], [53, 57, 60], [60, 64, 67], [55, 59, 62]];

/// Bars at which each voice enters
const KICK_ENTRY_BAR: u64 = 4;
const BASS_ENTRY_BAR: u64 = 8;
const HAT_ENTRY_BAR: u64 = 16;

const FADE_IN_SECS: f64 = 2.0;
const FADE_OUT_SECS: f64 = 4.0;

/// Right-channel detune ratio for the pad
const PAD_DETUNE: f64 = 1.003;

/// The authored track.
#[derive(Debug, Clone)]
pub struct Score {
    sample_rate: u32,
    duration: Duration,
}

impl Default for Score {
    fn default() -> Self {
        Self::new()
    }
}

impl Score {
    pub fn new() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            duration: TRACK_DURATION,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        CHANNELS
    }

    /// Authored length of the track
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Authored length in sample frames
    pub fn total_frames(&self) -> u64 {
        TimeIndex::from_duration(self.duration).audio_frame(self.sample_rate)
    }

    /// Seconds per beat
    fn beat_secs(&self) -> f64 {
        60.0 / f64::from(TEMPO_BPM)
    }

    /// Beats elapsed at `time` (fractional)
    pub fn beat_at(&self, time: TimeIndex) -> f32 {
        (time.as_duration().as_secs_f64() / self.beat_secs()) as f32
    }

    /// Master fade envelope at `t` seconds, in [0, 1]
    pub fn envelope_at(&self, time: TimeIndex) -> f32 {
        self.envelope(time.as_duration().as_secs_f64()) as f32
    }

    fn envelope(&self, t: f64) -> f64 {
        let end = self.duration.as_secs_f64();
        let fade_in = (t / FADE_IN_SECS).clamp(0.0, 1.0);
        let fade_out = ((end - t) / FADE_OUT_SECS).clamp(0.0, 1.0);
        fade_in * fade_out
    }

    /// Stereo sample frame `index`; silence at or past the authored end
    pub fn frame(&self, index: u64) -> [f32; 2] {
        if index >= self.total_frames() {
            return [0.0, 0.0];
        }

        let t = index as f64 / f64::from(self.sample_rate);
        let beat_len = self.beat_secs();
        let beat_index = (t / beat_len).floor();
        let since_beat = t - beat_index * beat_len;
        let bar = beat_index as u64 / u64::from(BEATS_PER_BAR);
        let chord = (bar % 4) as usize;

        let mut left = 0.0;
        let mut right = 0.0;

        let (pad_l, pad_r) = pad(t, beat_len * f64::from(BEATS_PER_BAR), chord);
        left += pad_l;
        right += pad_r;

        if bar >= KICK_ENTRY_BAR {
            let k = kick(since_beat);
            left += k;
            right += k;
        }

        if bar >= BASS_ENTRY_BAR {
            let b = bass(t, beat_len / 2.0, chord);
            left += b;
            right += b;
        }

        if bar >= HAT_ENTRY_BAR {
            let sixteenth = beat_len / 4.0;
            let step = (t / sixteenth).floor();
            // Open on the off sixteenths only
            if step as u64 % 2 == 1 {
                let h = hat(index, t - step * sixteenth);
                let pan = if step as u64 % 4 == 1 { 0.7 } else { 0.3 };
                left += h * (1.0 - pan);
                right += h * pan;
            }
        }

        let gain = self.envelope(t);
        [soft_clip(left * gain), soft_clip(right * gain)]
    }

    /// Render interleaved stereo frames starting at `start` into `out`
    pub fn render(&self, start: u64, out: &mut [f32]) {
        let channels = CHANNELS as usize;
        for (i, chunk) in out.chunks_exact_mut(channels).enumerate() {
            let [l, r] = self.frame(start + i as u64);
            chunk[0] = l;
            chunk[1] = r;
        }
    }
}

fn midi_to_hz(note: i32) -> f64 {
    440.0 * 2f64.powf(f64::from(note - 69) / 12.0)
}

/// Sine at `hz` after `t` seconds, phase wrapped before scaling
fn sine(hz: f64, t: f64) -> f64 {
    ((hz * t).fract() * TAU).sin()
}

/// Pitch-swept sine kick, `tau` seconds after the beat
fn kick(tau: f64) -> f64 {
    // f(τ) = 45 + 110·e^(−28τ), integrated analytically
    let phase = 45.0 * tau + (110.0 / 28.0) * (1.0 - (-28.0 * tau).exp());
    (phase.fract() * TAU).sin() * (-6.0 * tau).exp() * 0.9
}

/// Additive saw bass on eighth notes with an octave jump on the off eighths
fn bass(t: f64, eighth_len: f64, chord: usize) -> f64 {
    let step = (t / eighth_len).floor();
    let since = t - step * eighth_len;
    let octave = if step as u64 % 2 == 1 { 12 } else { 0 };
    let hz = midi_to_hz(BASS_ROOTS[chord] + octave);

    let saw: f64 = (1..=6).map(|k| sine(hz * k as f64, since) / k as f64).sum();
    saw * (-8.0 * since).exp() * 0.3
}

/// Detuned triad pad with short crossfades at chord changes
fn pad(t: f64, bar_len: f64, chord: usize) -> (f64, f64) {
    let since_bar = t % bar_len;
    let edge = 0.05;
    let swell = (since_bar / edge).min(1.0) * ((bar_len - since_bar) / edge).min(1.0);

    let mut left = 0.0;
    let mut right = 0.0;
    for &note in &PAD_CHORDS[chord] {
        let hz = midi_to_hz(note);
        left += sine(hz, t);
        right += sine(hz * PAD_DETUNE, t);
    }
    (left * 0.07 * swell, right * 0.07 * swell)
}

/// Hashed white noise burst, `since` seconds after the step
fn hat(index: u64, since: f64) -> f64 {
    noise(index) * (-45.0 * since).exp() * 0.18
}

/// SplitMix64 of the frame index, mapped to [-1, 1)
fn noise(index: u64) -> f64 {
    let mut z = index.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    (z >> 40) as f64 / (1u64 << 23) as f64 - 1.0
}

fn soft_clip(x: f64) -> f32 {
    x.tanh() as f32
}
