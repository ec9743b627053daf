//! Sine wave voice

use core::f64::consts::TAU;

use crate::render::{ProcessContext, Renderable, Voice, VoiceMessage, VoiceParams};
use crate::wave::Sign;

/// A continuous sine oscillator.
///
/// The oscillator runs on a phase wrapped to `[0, 1)` so a single bad
/// frequency can never push it out of range for good. Total cycles are
/// counted separately and only reported through [`Voice::phase`].
pub struct SineVoice {
    frequency: f32,
    amplitude: f32,
    cycle: f64,
    travelled: f64,
}

impl SineVoice {
    pub fn new(params: VoiceParams) -> Self {
        let mut voice = Self {
            frequency: 0.0,
            amplitude: 0.0,
            cycle: 0.0,
            travelled: 0.0,
        };
        voice.set_params(params);
        voice
    }

    #[inline]
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    #[inline]
    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }

    fn set_params(&mut self, params: VoiceParams) {
        self.frequency = if params.frequency.is_finite() {
            params.frequency.max(0.0)
        } else {
            0.0
        };
        self.amplitude = if params.amplitude.is_nan() {
            0.0
        } else {
            params.amplitude.clamp(0.0, 1.0)
        };
    }
}

impl Voice for SineVoice {
    fn handle(&mut self, msg: VoiceMessage) {
        match msg {
            VoiceMessage::Retune(params) => self.set_params(params),
        }
    }

    fn process(&mut self, ctx: &ProcessContext, out: &mut [f32]) {
        // frequencies above Nyquist are held there
        let nyquist = ctx.sample_rate as f64 / 2.0;
        let phase_inc = (self.frequency as f64).min(nyquist) / ctx.sample_rate as f64;
        let amplitude = self.amplitude as f64;

        for sample in out.iter_mut() {
            *sample = ((self.cycle * TAU).sin() * amplitude) as f32;
            self.cycle += phase_inc;
            if self.cycle >= 1.0 {
                self.cycle -= 1.0;
            }
            self.travelled += phase_inc;
        }
    }

    #[inline]
    fn phase(&self) -> f64 {
        self.travelled
    }
}

impl Renderable for Sign {
    fn params(&self) -> VoiceParams {
        VoiceParams {
            frequency: self.freq,
            amplitude: self.env.gain(),
        }
    }

    fn voice(&self) -> Box<dyn Voice> {
        Box::new(SineVoice::new(self.params()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{RenderSession, SessionControl};
    use crate::wave::Envelope;

    const RATE: u32 = 44_100;

    fn sign(freq: f32, volume: u8) -> Sign {
        Sign {
            env: Envelope {
                volume,
                ..Envelope::default()
            },
            freq,
        }
    }

    #[test]
    fn volume_maps_to_amplitude() {
        let voice = SineVoice::new(sign(440.0, 255).params());
        assert_eq!(voice.amplitude(), 1.0);
        let voice = SineVoice::new(sign(440.0, 0).params());
        assert_eq!(voice.amplitude(), 0.0);
    }

    #[test]
    fn out_of_range_params_are_clamped_at_render_time() {
        let voice = SineVoice::new(VoiceParams {
            frequency: -20.0,
            amplitude: 3.0,
        });
        assert_eq!(voice.frequency(), 0.0);
        assert_eq!(voice.amplitude(), 1.0);
    }

    #[test]
    fn peak_never_exceeds_amplitude() {
        let (mut session, _control) = RenderSession::new(sign(440.0, 128).voice(), RATE);
        let gain = 128.0 / 255.0;
        let out = session.render_buffer(RATE as usize / 10);
        let peak = out.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak <= gain + 1e-6);
        assert!(peak > gain * 0.99);
    }

    #[test]
    fn split_buffers_match_one_long_buffer() {
        let (mut whole, _c1) = RenderSession::new(sign(440.0, 200).voice(), RATE);
        let (mut parts, _c2) = RenderSession::new(sign(440.0, 200).voice(), RATE);

        let expected = whole.render_buffer(300);
        let mut joined = parts.render_buffer(97);
        joined.extend(parts.render_buffer(64));
        joined.extend(parts.render_buffer(139));

        for (a, b) in expected.iter().zip(joined.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
        assert_eq!(whole.phase(), parts.phase());
    }

    #[test]
    fn retune_keeps_phase() {
        let (mut session, mut control) = RenderSession::new(sign(440.0, 128).voice(), RATE);
        session.render_buffer(128);
        let before = session.phase();

        control.retune(&sign(880.0, 64)).unwrap();
        session.render_buffer(1);
        // the message is applied before the first sample of the buffer
        let step = session.phase() - before;
        assert!((step - 880.0 / RATE as f64).abs() < 1e-9);
    }

    fn assert_recovers(session: &mut RenderSession, control: &mut SessionControl) {
        let out = session.render_buffer(64);
        assert!(out.iter().all(|s| s.is_finite() && s.abs() <= 1.0), "{:?}", out);
        assert!(session.phase().is_finite());

        control.retune(&sign(440.0, 255)).unwrap();
        let out = session.render_buffer(RATE as usize / 100);
        assert!(out.iter().all(|s| s.is_finite()));
        let peak = out.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.99, "peak {}", peak);
    }

    #[test]
    fn infinite_frequency_does_not_poison_the_session() {
        let (mut session, mut control) = RenderSession::new(sign(f32::INFINITY, 255).voice(), RATE);
        assert_recovers(&mut session, &mut control);

        let (mut session, mut control) = RenderSession::new(sign(f32::NAN, 255).voice(), RATE);
        assert_recovers(&mut session, &mut control);
    }

    #[test]
    fn huge_frequency_is_held_at_nyquist() {
        let (mut session, mut control) = RenderSession::new(sign(3.0e38, 255).voice(), RATE);
        session.render_buffer(10);
        assert!((session.phase() - 5.0).abs() < 1e-9);
        assert_recovers(&mut session, &mut control);
    }

    #[test]
    fn nan_amplitude_is_silent() {
        let voice = SineVoice::new(VoiceParams {
            frequency: 440.0,
            amplitude: f32::NAN,
        });
        assert_eq!(voice.amplitude(), 0.0);
    }
}
