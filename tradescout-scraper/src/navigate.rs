//! Page load and entry into the vendor's embedded frame.

use tradescout_common::NavigationError;
use tradescout_drivers::scout_browser::{driver::ScoutSession, wait::WaitError};
use tracing::debug;

/// Load `url` and switch into the first iframe on the page.
///
/// The wizard lives entirely inside that frame; every work unit re-enters
/// from scratch so stale wizard state never leaks between units.
pub async fn enter(session: &ScoutSession, url: &str) -> Result<(), NavigationError> {
    session.goto(url).await.map_err(classify_goto)?;

    let frames = session
        .long_waiter()
        .all("iframe")
        .await
        .map_err(|e| match e {
            WaitError::Timeout(_) => NavigationError::NoFrameFound,
            WaitError::Driver(e) => NavigationError::Driver(e.into()),
        })?;

    debug!(target: "scrape.navigate", frames = frames.len(), "entering first frame");
    let first = frames
        .into_iter()
        .next()
        .ok_or(NavigationError::NoFrameFound)?;
    // enter_frame hands back the (switched) client handle; the session's own
    // clone is switched with it.
    first
        .enter_frame()
        .await
        .map_err(|e| NavigationError::Driver(e.into()))?;
    Ok(())
}

fn classify_goto(e: anyhow::Error) -> NavigationError {
    if e.to_string().to_lowercase().contains("timeout") {
        NavigationError::LoadTimeout
    } else {
        NavigationError::Driver(e)
    }
}
