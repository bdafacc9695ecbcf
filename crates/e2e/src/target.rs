//! Target page preflight - make sure the form page answers before launching browsers

use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

const RETRY_INTERVAL: Duration = Duration::from_millis(250);

/// Poll `url` until it answers with a success or redirect status
pub async fn wait_until_reachable(url: &str, timeout: Duration) -> E2eResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    let start = Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;

        match client.get(url).send().await {
            Ok(resp) if resp.status().is_success() || resp.status().is_redirection() => {
                info!("Target {} is reachable ({})", url, resp.status());
                return Ok(());
            }
            Ok(resp) => {
                warn!("Target returned {}", resp.status());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for {} to answer...", url);
                }
                // Connection refused is expected while a local target is starting
                if !e.is_connect() {
                    warn!("Preflight error: {}", e);
                }
            }
        }

        if start.elapsed() + RETRY_INTERVAL > timeout {
            return Err(E2eError::TargetUnreachable(attempts));
        }
        sleep(RETRY_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn closed_port() -> u16 {
        // Bind and drop so nothing is listening on the port afterwards
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_unreachable_target_gives_up() {
        let url = format!("http://127.0.0.1:{}/", closed_port());
        let err = wait_until_reachable(&url, Duration::from_millis(600))
            .await
            .unwrap_err();

        match err {
            E2eError::TargetUnreachable(attempts) => assert!(attempts >= 1),
            other => panic!("unexpected error: {}", other),
        }
    }
}
