use rand::rngs::OsRng;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

/// Produces the fixed settle pauses and lightly jittered inter-unit delays
/// the harvest loop leans on instead of DOM readiness events.
#[derive(Debug, Clone)]
pub struct Pacer {
    settle: Duration,
    between_units: Duration,
}

impl Pacer {
    pub fn new(settle: Duration, between_units: Duration) -> Self {
        Self {
            settle,
            between_units,
        }
    }

    /// Fixed pause after a form sub-step so client-side rendering catches up.
    pub async fn settle(&self) {
        sleep(self.settle).await;
    }

    /// Pause between work units, jittered up to +25% so request spacing does
    /// not form a perfectly regular signature.
    pub async fn between_units(&self) {
        let base = self.between_units.as_millis() as u64;
        let mut rng = OsRng;
        let ms = rng.gen_range(base..=base + base / 4 + 1);
        sleep(Duration::from_millis(ms)).await;
    }
}
