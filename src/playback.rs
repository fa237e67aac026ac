//! Audio player seam and the amplitude envelope used for pulsing.

use serde::{Deserialize, Serialize};

/// The page's audio/waveform player, as seen from the coordinator.
pub trait AudioPlayer {
    /// Switch to a new source. Also reloads the waveform; the player
    /// reports `ready` once it can play.
    fn set_source(&mut self, url: &str);
    fn play(&mut self);
    fn pause(&mut self);
    fn toggle(&mut self);
    /// Seek to a fraction of the clip, in [0, 1].
    fn seek_to(&mut self, fraction: f32);
}

/// A player call recorded for a host to carry out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerCommand {
    SetSource { url: String },
    Play,
    Pause,
    Toggle,
    Seek { fraction: f32 },
}

/// Player that queues commands; the browser page drains the queue each frame.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    commands: Vec<PlayerCommand>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&mut self) -> Vec<PlayerCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn pending(&self) -> &[PlayerCommand] {
        &self.commands
    }
}

impl AudioPlayer for CommandQueue {
    fn set_source(&mut self, url: &str) {
        self.commands.push(PlayerCommand::SetSource { url: url.to_string() });
    }

    fn play(&mut self) {
        self.commands.push(PlayerCommand::Play);
    }

    fn pause(&mut self) {
        self.commands.push(PlayerCommand::Pause);
    }

    fn toggle(&mut self) {
        self.commands.push(PlayerCommand::Toggle);
    }

    fn seek_to(&mut self, fraction: f32) {
        self.commands.push(PlayerCommand::Seek { fraction });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl PlaybackStatus {
    pub fn toggled(self) -> Self {
        match self {
            PlaybackStatus::Playing => PlaybackStatus::Paused,
            PlaybackStatus::Paused | PlaybackStatus::Stopped => PlaybackStatus::Playing,
        }
    }
}

/// Decoded amplitude samples of the current clip (waveform peaks).
#[derive(Debug, Clone)]
pub struct AmplitudeEnvelope {
    samples: Vec<f32>,
    sample_rate: f32,
    duration: f32,
}

impl AmplitudeEnvelope {
    pub fn new(samples: Vec<f32>, sample_rate: f32) -> Self {
        let sample_rate = sample_rate.max(f32::EPSILON);
        let duration = samples.len() as f32 / sample_rate;
        Self {
            samples,
            sample_rate,
            duration,
        }
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn sample(&self, time: f32) -> f32 {
        if time < 0.0 || time > self.duration {
            return 0.0;
        }
        let index = time * self.sample_rate;
        let i = index as usize;
        let frac = index.fract();

        let Some(&v0) = self.samples.get(i) else {
            return 0.0;
        };
        let v1 = self.samples.get(i + 1).copied().unwrap_or(v0);

        v0 + (v1 - v0) * frac
    }

    /// Max absolute value within [time - window, time], so a 60 fps reader
    /// does not miss transients between frames.
    pub fn peak(&self, time: f32, window: f32) -> f32 {
        if window <= 0.0 {
            return self.sample(time).abs();
        }

        let end_idx = (time * self.sample_rate).floor() as isize;
        let start_time = (time - window).max(0.0);
        let start_idx = (start_time * self.sample_rate).floor() as isize;

        if end_idx < 0 || start_idx >= self.samples.len() as isize || start_idx > end_idx {
            return 0.0;
        }

        let start = start_idx.max(0) as usize;
        let end = end_idx.min(self.samples.len() as isize - 1) as usize;

        if start == end {
            return self.sample(time).abs();
        }

        self.samples[start..=end]
            .iter()
            .fold(0.0_f32, |max, v| max.max(v.abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_records_and_drains() {
        let mut queue = CommandQueue::new();
        queue.set_source("https://p/a");
        queue.play();
        queue.seek_to(0.25);
        assert_eq!(queue.pending().len(), 3);
        let drained = queue.drain();
        assert_eq!(drained[0], PlayerCommand::SetSource { url: "https://p/a".into() });
        assert_eq!(drained[2], PlayerCommand::Seek { fraction: 0.25 });
        assert!(queue.pending().is_empty());
    }

    #[test]
    fn test_command_json_shape() {
        let json = serde_json::to_string(&PlayerCommand::Seek { fraction: 0.5 }).unwrap();
        assert_eq!(json, r#"{"type":"seek","fraction":0.5}"#);
        let json = serde_json::to_string(&PlayerCommand::Toggle).unwrap();
        assert_eq!(json, r#"{"type":"toggle"}"#);
    }

    #[test]
    fn test_status_toggle() {
        assert_eq!(PlaybackStatus::Playing.toggled(), PlaybackStatus::Paused);
        assert_eq!(PlaybackStatus::Paused.toggled(), PlaybackStatus::Playing);
    }

    #[test]
    fn test_envelope_peak_catches_transients() {
        // 100 Hz envelope with a single spike
        let mut samples = vec![0.1; 100];
        samples[50] = -0.9;
        let envelope = AmplitudeEnvelope::new(samples, 100.0);
        assert!((envelope.peak(0.55, 0.1) - 0.9).abs() < 1e-6);
        assert!((envelope.peak(0.3, 0.1) - 0.1).abs() < 1e-6);
        assert_eq!(envelope.peak(5.0, 0.1), 0.0);
        assert_eq!(envelope.sample(-1.0), 0.0);
    }
}
