// Voice synthesis capability
//
// Voice cloning is a long-running external job: submit a prediction, poll
// its status at a fixed interval until it reaches a terminal state, then
// fetch the produced audio. The poll loop is factored into `poll_until` so
// any long-running external job can reuse it.

pub mod replicate;

use async_trait::async_trait;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::config::SynthesisConfig;
use crate::error::Result;

/// Main trait for voice synthesis operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VoiceSynthesizer: Send + Sync {
    /// Clone the voice from the reference audio/text pair and speak the
    /// target text with it. Returns the synthesized audio bytes.
    async fn synthesize(
        &self,
        reference_audio: &Path,
        reference_text: &str,
        target_text: &str,
    ) -> Result<Vec<u8>>;
}

/// Factory for creating synthesizer instances
pub struct SynthesizerFactory;

impl SynthesizerFactory {
    /// Create the default Replicate-backed voice synthesizer
    pub fn create_synthesizer(config: SynthesisConfig) -> Box<dyn VoiceSynthesizer> {
        Box::new(replicate::ReplicateSynthesizer::new(config))
    }
}

/// Poll an operation at a fixed interval until its result is terminal or
/// the attempt ceiling is hit. Returns `Ok(Some(state))` on a terminal
/// state, `Ok(None)` when the ceiling was exhausted, and the first poll
/// error otherwise.
pub async fn poll_until<T, F, Fut, P>(
    interval: Duration,
    max_attempts: u32,
    mut poll: F,
    is_terminal: P,
) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&T) -> bool,
{
    for attempt in 1..=max_attempts {
        let state = poll().await?;
        if is_terminal(&state) {
            debug!("Poll reached terminal state on attempt {}", attempt);
            return Ok(Some(state));
        }
        if attempt < max_attempts {
            tokio::time::sleep(interval).await;
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_poll_until_stops_at_terminal_state() {
        let calls = AtomicU32::new(0);

        let result = poll_until(
            Duration::from_millis(1),
            10,
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Ok(n) }
            },
            |&n| n == 3,
        )
        .await
        .unwrap();

        assert_eq!(result, Some(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_poll_until_exhausts_attempt_ceiling() {
        let calls = AtomicU32::new(0);

        let result: Option<u32> = poll_until(
            Duration::from_millis(1),
            5,
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(0) }
            },
            |_| false,
        )
        .await
        .unwrap();

        assert_eq!(result, None);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_poll_until_propagates_errors() {
        let result: Result<Option<u32>> = poll_until(
            Duration::from_millis(1),
            5,
            || async {
                Err(crate::error::ScriptCutError::SynthesisFailed(
                    "boom".to_string(),
                ))
            },
            |_| true,
        )
        .await;

        assert!(result.is_err());
    }
}
