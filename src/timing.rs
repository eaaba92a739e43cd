// Copyright (C) 2025  Tom Waddington
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Delays and jitter

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::time::sleep;

use crate::settings::Settings;

/// How long to pause between typed characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayPolicy {
    // A requested delay of exactly 0: no pauses at all
    Immediate,
    Paced { base_ms: u64, jitter_ms: u64 },
}

impl DelayPolicy {
    pub fn new(base_ms: u64, jitter_ms: u64) -> Self {
        DelayPolicy::Paced {
            base_ms,
            jitter_ms: jitter_ms.min(base_ms),
        }
    }

    /// Policy for a typing instruction with an optional `delay` field.
    pub fn for_typing(requested: Option<u64>, settings: &Settings) -> Self {
        match requested {
            Some(0) => DelayPolicy::Immediate,
            Some(base_ms) => Self::new(base_ms, settings.randomness),
            None => Self::new(settings.delay, settings.randomness),
        }
    }
}

/// Performs the actual suspension.
#[async_trait]
pub trait Pacer: Send {
    async fn sleep(&mut self, duration: Duration);
}

pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn sleep(&mut self, duration: Duration) {
        sleep(duration).await;
    }
}

/// Jitter source plus pacer, owned by the player.
pub struct Pacing {
    pacer: Box<dyn Pacer>,
    rng: StdRng,
}

impl Pacing {
    pub fn new(pacer: Box<dyn Pacer>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self { pacer, rng }
    }

    pub fn realtime(seed: Option<u64>) -> Self {
        Self::new(Box::new(TokioPacer), seed)
    }

    /// Draws a delay uniformly from `[base - jitter, base + jitter]`.
    pub fn calculate_delay(&mut self, policy: DelayPolicy) -> Option<Duration> {
        let DelayPolicy::Paced { base_ms, jitter_ms } = policy else {
            return None;
        };

        if jitter_ms > 0 {
            let variation = self.rng.random_range(0..=jitter_ms * 2);
            let delay = base_ms.saturating_add(variation).saturating_sub(jitter_ms);
            Some(Duration::from_millis(delay))
        } else {
            Some(Duration::from_millis(base_ms))
        }
    }

    pub async fn pause(&mut self, duration: Duration) {
        self.pacer.sleep(duration).await;
    }

    pub async fn keystroke_pause(&mut self, policy: DelayPolicy) {
        if let Some(delay) = self.calculate_delay(policy) {
            self.pause(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingPacer;

    #[test]
    fn test_zero_delay_is_immediate() {
        let settings = Settings::default();
        assert_eq!(
            DelayPolicy::for_typing(Some(0), &settings),
            DelayPolicy::Immediate
        );
    }

    #[test]
    fn test_missing_delay_uses_settings() {
        let settings = Settings {
            delay: 80,
            randomness: 10,
            ..Settings::default()
        };
        assert_eq!(
            DelayPolicy::for_typing(None, &settings),
            DelayPolicy::Paced {
                base_ms: 80,
                jitter_ms: 10
            }
        );
    }

    #[test]
    fn test_jitter_capped_at_base() {
        let settings = Settings {
            randomness: 50,
            ..Settings::default()
        };
        assert_eq!(
            DelayPolicy::for_typing(Some(20), &settings),
            DelayPolicy::Paced {
                base_ms: 20,
                jitter_ms: 20
            }
        );
    }

    #[test]
    fn test_jittered_delay_stays_in_range() {
        let (pacer, _) = RecordingPacer::new();
        let mut pacing = Pacing::new(Box::new(pacer), Some(7));
        let policy = DelayPolicy::new(100, 30);
        for _ in 0..500 {
            let delay = pacing.calculate_delay(policy).unwrap();
            assert!(delay >= Duration::from_millis(70));
            assert!(delay <= Duration::from_millis(130));
        }
    }

    #[test]
    fn test_seeded_jitter_is_reproducible() {
        let policy = DelayPolicy::new(100, 30);
        let draw = |seed| {
            let (pacer, _) = RecordingPacer::new();
            let mut pacing = Pacing::new(Box::new(pacer), Some(seed));
            (0..20)
                .map(|_| pacing.calculate_delay(policy).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(42), draw(42));
    }

    #[tokio::test]
    async fn test_immediate_policy_never_sleeps() {
        let (pacer, log) = RecordingPacer::new();
        let mut pacing = Pacing::new(Box::new(pacer), Some(1));
        pacing.keystroke_pause(DelayPolicy::Immediate).await;
        pacing.keystroke_pause(DelayPolicy::new(5, 0)).await;
        assert_eq!(log.sleeps(), vec![Duration::from_millis(5)]);
    }
}
