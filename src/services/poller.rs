use crate::services::gemini::VideoOperation;
use anyhow::Result;
use log::debug;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollSettings {
    pub fn new(interval_secs: u64, max_attempts: u32) -> Self {
        Self {
            interval: Duration::from_secs(interval_secs),
            max_attempts,
        }
    }
}

/// The job outlived the configured attempt budget.
#[derive(Debug, thiserror::Error)]
#[error("video job still pending after {attempts} status checks")]
pub struct PollTimeout {
    pub attempts: u32,
}

/// Re-queries a long-running job on a fixed interval until it reports done.
/// Errors from `refresh` abort the loop; a handle that never completes
/// within the attempt budget fails with [`PollTimeout`].
pub async fn poll_until_done<F, Fut>(
    mut operation: VideoOperation,
    settings: PollSettings,
    mut refresh: F,
) -> Result<VideoOperation>
where
    F: FnMut(VideoOperation) -> Fut,
    Fut: Future<Output = Result<VideoOperation>>,
{
    let mut attempts = 0u32;
    while !operation.done {
        if attempts >= settings.max_attempts {
            return Err(PollTimeout { attempts }.into());
        }
        attempts += 1;
        debug!(
            "Job {} pending, check {}/{}",
            operation.name, attempts, settings.max_attempts
        );
        tokio::time::sleep(settings.interval).await;
        operation = refresh(operation).await?;
    }
    Ok(operation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::cell::Cell;
    use std::future;

    fn fast() -> PollSettings {
        PollSettings {
            interval: Duration::ZERO,
            max_attempts: 10,
        }
    }

    fn pending(name: &str) -> VideoOperation {
        serde_json::from_str(&format!(r#"{{ "name": "{}" }}"#, name)).unwrap()
    }

    fn completed(uri: &str) -> VideoOperation {
        serde_json::from_str(&format!(
            r#"{{
                "name": "operations/abc",
                "done": true,
                "response": {{ "generatedVideos": [ {{ "video": {{ "uri": "{}" }} }} ] }}
            }}"#,
            uri
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_polls_until_done() {
        let checks = Cell::new(0u32);
        let result = poll_until_done(pending("operations/abc"), fast(), |op| {
            checks.set(checks.get() + 1);
            future::ready(Ok(if checks.get() < 2 {
                op
            } else {
                completed("https://example.com/clip.mp4")
            }))
        })
        .await
        .unwrap();

        // pending, pending, done: two intermediate waits
        assert_eq!(checks.get(), 2);
        assert_eq!(result.download_uri(), Some("https://example.com/clip.mp4"));
    }

    #[tokio::test]
    async fn test_already_done_skips_polling() {
        let checks = Cell::new(0u32);
        let result = poll_until_done(completed("https://example.com/clip.mp4"), fast(), |op| {
            checks.set(checks.get() + 1);
            future::ready(Ok(op))
        })
        .await
        .unwrap();

        assert_eq!(checks.get(), 0);
        assert!(result.done);
    }

    #[tokio::test]
    async fn test_times_out_at_attempt_budget() {
        let settings = PollSettings {
            interval: Duration::ZERO,
            max_attempts: 3,
        };
        let checks = Cell::new(0u32);
        let result = poll_until_done(pending("operations/abc"), settings, |op| {
            checks.set(checks.get() + 1);
            future::ready(Ok(op))
        })
        .await;

        let err = result.unwrap_err();
        let timeout = err.downcast_ref::<PollTimeout>().unwrap();
        assert_eq!(timeout.attempts, 3);
        assert_eq!(checks.get(), 3);
    }

    #[tokio::test]
    async fn test_refresh_error_aborts() {
        let checks = Cell::new(0u32);
        let result = poll_until_done(pending("operations/abc"), fast(), |_op| {
            checks.set(checks.get() + 1);
            future::ready(Err(anyhow!("status endpoint unreachable")))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(checks.get(), 1);
    }
}
