//! Audio collaborator used by the host.
//!
//! Playback itself is outside the simulation; this sink records which
//! conversion sounds were requested and logs them at the configured volume.

use rps_core::{Kind, SoundSink};
use tracing::debug;

/// Sound sink that counts and logs conversion cues.
#[derive(Debug, Clone, Default)]
pub struct LoggedSound {
    volume: f32,
    plays: [u64; 3],
    last: Option<Kind>,
}

impl LoggedSound {
    #[must_use]
    pub fn new(volume: f32) -> Self {
        Self {
            volume: volume.clamp(0.0, 1.0),
            plays: [0; 3],
            last: None,
        }
    }

    #[must_use]
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Number of cues played for `kind` since construction.
    #[must_use]
    pub fn plays(&self, kind: Kind) -> u64 {
        self.plays[kind.index()]
    }

    #[must_use]
    pub fn total_plays(&self) -> u64 {
        self.plays.iter().sum()
    }

    /// Most recent audible cue.
    #[must_use]
    pub fn last(&self) -> Option<Kind> {
        self.last
    }
}

impl SoundSink for LoggedSound {
    fn play(&mut self, kind: Kind) {
        if self.volume <= 0.0 {
            return;
        }
        self.plays[kind.index()] += 1;
        self.last = Some(kind);
        debug!(target: "rps::sound", %kind, volume = self.volume, "play");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_cues_per_kind() {
        let mut sound = LoggedSound::new(0.5);
        sound.play(Kind::Rock);
        sound.play(Kind::Rock);
        sound.play(Kind::Scissors);
        assert_eq!(sound.plays(Kind::Rock), 2);
        assert_eq!(sound.plays(Kind::Paper), 0);
        assert_eq!(sound.total_plays(), 3);
        assert_eq!(sound.last(), Some(Kind::Scissors));
    }

    #[test]
    fn zero_volume_mutes() {
        let mut sound = LoggedSound::new(0.0);
        sound.play(Kind::Paper);
        assert_eq!(sound.total_plays(), 0);
        assert_eq!(sound.last(), None);
        assert_eq!(LoggedSound::new(3.0).volume(), 1.0);
    }
}
