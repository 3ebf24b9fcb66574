use std::time::Duration;

use fantoccini::{elements::Element, Client, Locator};
use tokio::time::{sleep, Instant};

/// Errors surfaced by bounded waits. Stage code converts these into its own
/// failure variants.
#[derive(thiserror::Error, Debug)]
pub enum WaitError {
    #[error("timed out waiting for selector: {0}")]
    Timeout(String),

    #[error(transparent)]
    Driver(#[from] fantoccini::error::CmdError),
}

/// Bounded polling loop over a WebDriver client.
///
/// The page never signals readiness, so presence checks poll at a fixed
/// cadence until a deadline. A `Waiter` holds a handle clone and therefore
/// shares the fate of its session; rebuild waiters whenever the session is
/// recreated.
#[derive(Clone)]
pub struct Waiter {
    client: Client,
    timeout: Duration,
    poll: Duration,
}

impl Waiter {
    pub fn new(client: Client, timeout: Duration, poll: Duration) -> Self {
        Self {
            client,
            timeout,
            poll,
        }
    }

    /// Wait until at least one element matches `selector`; return the first.
    pub async fn first(&self, selector: &str) -> Result<Element, WaitError> {
        let mut all = self.all(selector).await?;
        Ok(all.remove(0))
    }

    /// Wait until at least one element matches `selector`; return them all.
    pub async fn all(&self, selector: &str) -> Result<Vec<Element>, WaitError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            let found = self.client.find_all(Locator::Css(selector)).await?;
            if !found.is_empty() {
                return Ok(found);
            }
            if Instant::now() >= deadline {
                return Err(WaitError::Timeout(selector.to_string()));
            }
            sleep(self.poll).await;
        }
    }
}
