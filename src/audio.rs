//! Audio cues
//!
//! Every cue is a short run of synthesized tones - no external files needed!
//! The cue tables are plain data so the game logic (and tests) can name a cue
//! without touching Web Audio. Playback lives in [`AudioManager`] (WASM only)
//! and swallows every failure: a missing AudioContext just means silence.

use serde::{Deserialize, Serialize};

/// Game events that have an audio cue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cue {
    /// Drop landed in the bucket
    Catch,
    /// Puzzle chain completed (same notes as `Catch`)
    ChainSuccess,
    /// Catch round over
    GameOver,
    /// Puzzle won
    Win,
}

/// Oscillator shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

/// One scheduled tone within a cue
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    /// Frequency in Hz
    pub freq: f32,
    /// Tone length in seconds (gain decays to [`Tone::FLOOR`] over this span)
    pub duration: f64,
    /// Start offset from the cue start, in seconds
    pub delay: f64,
    pub waveform: Waveform,
    /// Starting gain
    pub volume: f32,
}

impl Tone {
    /// Gain the envelope decays to by the end of the tone
    pub const FLOOR: f32 = 0.01;

    const fn sine(freq: f32, duration: f64, delay: f64, volume: f32) -> Self {
        Self {
            freq,
            duration,
            delay,
            waveform: Waveform::Sine,
            volume,
        }
    }
}

// C5 -> E5 -> G5
const CATCH_TONES: [Tone; 3] = [
    Tone::sine(523.25, 0.1, 0.0, 0.2),
    Tone::sine(659.25, 0.1, 0.05, 0.2),
    Tone::sine(783.99, 0.15, 0.1, 0.2),
];

// C5 -> A4 -> F4
const GAME_OVER_TONES: [Tone; 3] = [
    Tone::sine(523.25, 0.2, 0.0, 0.3),
    Tone::sine(440.0, 0.2, 0.15, 0.3),
    Tone::sine(349.23, 0.3, 0.3, 0.3),
];

// C5, C5, G5
const WIN_TONES: [Tone; 3] = [
    Tone::sine(523.25, 0.15, 0.0, 0.25),
    Tone::sine(523.25, 0.15, 0.12, 0.25),
    Tone::sine(783.99, 0.3, 0.24, 0.25),
];

impl Cue {
    /// Tones making up this cue, in start order
    pub fn tones(self) -> &'static [Tone] {
        match self {
            Cue::Catch | Cue::ChainSuccess => &CATCH_TONES,
            Cue::GameOver => &GAME_OVER_TONES,
            Cue::Win => &WIN_TONES,
        }
    }

    /// Total length of the cue in seconds
    pub fn length(self) -> f64 {
        self.tones()
            .iter()
            .map(|t| t.delay + t.duration)
            .fold(0.0, f64::max)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Cue::Catch => "catch",
            Cue::ChainSuccess => "chainSuccess",
            Cue::GameOver => "gameOver",
            Cue::Win => "win",
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub use player::AudioManager;

#[cfg(target_arch = "wasm32")]
mod player {
    use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

    use super::{Cue, Tone, Waveform};
    use crate::config::AudioConfig;

    impl From<Waveform> for OscillatorType {
        fn from(w: Waveform) -> Self {
            match w {
                Waveform::Sine => OscillatorType::Sine,
                Waveform::Square => OscillatorType::Square,
                Waveform::Triangle => OscillatorType::Triangle,
                Waveform::Sawtooth => OscillatorType::Sawtooth,
            }
        }
    }

    /// Audio manager for the game
    pub struct AudioManager {
        ctx: Option<AudioContext>,
        master_volume: f32,
        sfx_volume: f32,
        muted: bool,
    }

    impl AudioManager {
        pub fn new(config: &AudioConfig) -> Self {
            // Try to create audio context (may fail if not in secure context)
            let ctx = AudioContext::new().ok();
            if ctx.is_none() {
                log::warn!("Failed to create AudioContext - audio disabled");
            }
            Self {
                ctx,
                master_volume: config.master_volume.clamp(0.0, 1.0),
                sfx_volume: config.sfx_volume.clamp(0.0, 1.0),
                muted: config.muted,
            }
        }

        fn effective_volume(&self) -> f32 {
            if self.muted {
                0.0
            } else {
                self.master_volume * self.sfx_volume
            }
        }

        /// Play a cue; fire-and-forget
        pub fn play(&self, cue: Cue) {
            let vol = self.effective_volume();
            if vol <= 0.0 {
                return;
            }

            let Some(ctx) = &self.ctx else { return };

            // Resume context if suspended (browsers require user gesture)
            if ctx.state() == web_sys::AudioContextState::Suspended {
                let _ = ctx.resume();
            }

            let start = ctx.current_time();
            for tone in cue.tones() {
                if self.play_tone(ctx, tone, start, vol).is_none() {
                    log::debug!("Dropped a {} tone", cue.as_str());
                }
            }
        }

        /// Create an oscillator with gain envelope
        fn create_osc(
            &self,
            ctx: &AudioContext,
            freq: f32,
            osc_type: OscillatorType,
        ) -> Option<(OscillatorNode, GainNode)> {
            let osc = ctx.create_oscillator().ok()?;
            let gain = ctx.create_gain().ok()?;

            osc.set_type(osc_type);
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain).ok()?;
            gain.connect_with_audio_node(&ctx.destination()).ok()?;

            Some((osc, gain))
        }

        fn play_tone(&self, ctx: &AudioContext, tone: &Tone, start: f64, vol: f32) -> Option<()> {
            let (osc, gain) = self.create_osc(ctx, tone.freq, tone.waveform.into())?;
            let t = start + tone.delay;

            gain.gain().set_value_at_time(tone.volume * vol, t).ok()?;
            gain.gain()
                .exponential_ramp_to_value_at_time(Tone::FLOOR, t + tone.duration)
                .ok()?;

            osc.start_with_when(t).ok()?;
            osc.stop_with_when(t + tone.duration).ok()?;
            Some(())
        }
    }
}
