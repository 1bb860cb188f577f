use super::{
    TestRunConfig, TestRunRequest, TestRunResponse, TestRunResult, TestRunStatus, MCP_ACTOR,
    TRIGGER_TEST_RUN_REQUEST, TRIGGER_TEST_RUN_RESPONSE,
};
use crate::channel::{ChannelEvent, EventChannel, CHANNEL_CLOSED_EVENT};
use crate::error::{CoreError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};

/// Correlates one test-run request with its terminal response
pub struct TestRunBroker {
    channel: Arc<dyn EventChannel>,
    timeout: Option<Duration>,
}

impl TestRunBroker {
    pub fn new(channel: Arc<dyn EventChannel>, timeout: Option<Duration>) -> Self {
        Self { channel, timeout }
    }

    /// Emit a trigger request and wait for the response carrying its id
    pub async fn trigger(&self, story_ids: Option<Vec<String>>, a11y: bool) -> Result<TestRunResult> {
        let request = TestRunRequest {
            request_id: uuid::Uuid::new_v4().to_string(),
            actor: MCP_ACTOR.to_string(),
            story_ids,
            config: TestRunConfig { a11y },
        };

        // Subscribe before emitting so a fast response cannot be missed.
        // The receiver is dropped on every exit path, which unsubscribes.
        let mut subscription = self.channel.subscribe();

        tracing::info!(
            request_id = %request.request_id,
            stories = request.story_ids.as_ref().map(|ids| ids.len()),
            a11y,
            "Triggering test run"
        );
        self.channel.emit(ChannelEvent::new(
            TRIGGER_TEST_RUN_REQUEST,
            serde_json::to_value(&request)?,
        ))?;

        let wait = wait_for_response(&mut subscription, &request.request_id);
        let response = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, wait)
                .await
                .map_err(|_| CoreError::TestRunTimedOut(timeout.as_secs()))??,
            None => wait.await?,
        };

        settle(response)
    }
}

async fn wait_for_response(
    subscription: &mut broadcast::Receiver<ChannelEvent>,
    request_id: &str,
) -> Result<TestRunResponse> {
    loop {
        let event = match subscription.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, request_id, "Test run subscription lagged behind the channel");
                return Err(CoreError::UnexpectedResponse(format!(
                    "{} channel events were skipped, the test run response may have been dropped",
                    skipped
                )));
            }
            Err(RecvError::Closed) => return Err(CoreError::ChannelUnavailable),
        };

        if event.event_type == CHANNEL_CLOSED_EVENT {
            tracing::warn!(request_id, "Host disconnected while a test run was in flight");
            return Err(CoreError::ChannelUnavailable);
        }

        if event.event_type != TRIGGER_TEST_RUN_RESPONSE {
            continue;
        }

        match serde_json::from_value::<TestRunResponse>(event.payload) {
            Ok(response) if response.request_id == request_id => return Ok(response),
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring malformed test run response");
            }
        }
    }
}

/// Map a terminal response onto the call's single outcome
fn settle(response: TestRunResponse) -> Result<TestRunResult> {
    match response.status() {
        TestRunStatus::Completed => response.result.ok_or_else(|| {
            CoreError::UnexpectedResponse("test run completed without a result".to_string())
        }),
        TestRunStatus::Error => Err(CoreError::TestRunFailed(
            response
                .error
                .map(|e| e.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "unknown error".to_string()),
        )),
        TestRunStatus::Cancelled => Err(CoreError::TestRunCancelled),
        TestRunStatus::Unknown(status) => Err(CoreError::UnexpectedResponse(format!(
            "unrecognized status \"{}\"",
            status
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{decode_payload, BroadcastChannel};
    use serde_json::json;

    /// Answer the next trigger request with the payloads produced by `answer`
    fn respond_with<F>(channel: Arc<BroadcastChannel>, answer: F)
    where
        F: Fn(&str) -> Vec<serde_json::Value> + Send + 'static,
    {
        let mut rx = channel.subscribe();
        tokio::spawn(async move {
            while let Ok(event) = rx.recv().await {
                if event.event_type == TRIGGER_TEST_RUN_REQUEST {
                    let request: TestRunRequest = decode_payload(&event).unwrap();
                    for payload in answer(&request.request_id) {
                        channel
                            .emit(ChannelEvent::new(TRIGGER_TEST_RUN_RESPONSE, payload))
                            .unwrap();
                    }
                    break;
                }
            }
        });
    }

    #[tokio::test]
    async fn test_request_payload_shape() {
        let channel = Arc::new(BroadcastChannel::default());
        let mut rx = channel.subscribe();
        respond_with(channel.clone(), |id| {
            vec![json!({"requestId": id, "status": "completed", "result": {}})]
        });

        let broker = TestRunBroker::new(channel.clone(), None);
        broker
            .trigger(Some(vec!["button--primary".to_string()]), true)
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type, TRIGGER_TEST_RUN_REQUEST);
        assert_eq!(event.payload["actor"], MCP_ACTOR);
        assert_eq!(event.payload["storyIds"], json!(["button--primary"]));
        assert_eq!(event.payload["config"]["a11y"], true);
    }

    #[tokio::test]
    async fn test_ignores_responses_for_other_requests() {
        let channel = Arc::new(BroadcastChannel::default());
        respond_with(channel.clone(), |id| {
            vec![
                json!({"requestId": "someone-else", "status": "cancelled"}),
                json!({"requestId": id, "status": "completed", "result": {"componentTestCount": {"success": 2, "error": 0}}}),
                json!({"requestId": id, "status": "error", "error": {"message": "late"}}),
            ]
        });

        let result = TestRunBroker::new(channel, None).trigger(None, false).await.unwrap();
        assert_eq!(result.component_test_count.success, 2);
    }

    #[tokio::test]
    async fn test_lagged_subscription_fails_instead_of_hanging() {
        let channel = Arc::new(BroadcastChannel::new(2));
        respond_with(channel.clone(), |id| {
            let mut burst: Vec<serde_json::Value> = (0..6)
                .map(|n| json!({"requestId": format!("other-{}", n), "status": "cancelled"}))
                .collect();
            burst.push(json!({"requestId": id, "status": "completed", "result": {}}));
            burst
        });

        let err = TestRunBroker::new(channel, None).trigger(None, false).await.unwrap_err();
        assert!(matches!(err, CoreError::UnexpectedResponse(ref m) if m.contains("skipped")), "{:?}", err);
    }

    #[tokio::test]
    async fn test_channel_closed_ends_the_wait() {
        let channel = Arc::new(BroadcastChannel::default());
        let mut rx = channel.subscribe();
        let closer = channel.clone();
        tokio::spawn(async move {
            while let Ok(event) = rx.recv().await {
                if event.event_type == TRIGGER_TEST_RUN_REQUEST {
                    closer.emit(ChannelEvent::new(CHANNEL_CLOSED_EVENT, json!(null))).unwrap();
                    break;
                }
            }
        });

        let err = TestRunBroker::new(channel, None).trigger(None, false).await.unwrap_err();
        assert!(matches!(err, CoreError::ChannelUnavailable));
    }

    #[tokio::test]
    async fn test_terminal_statuses() {
        let cases: Vec<(serde_json::Value, fn(&CoreError) -> bool)> = vec![
            (json!({"status": "cancelled"}), |e| matches!(e, CoreError::TestRunCancelled)),
            (json!({"status": "error"}), |e| {
                matches!(e, CoreError::TestRunFailed(m) if m == "unknown error")
            }),
            (json!({"status": "completed"}), |e| matches!(e, CoreError::UnexpectedResponse(_))),
            (json!({"status": "exploded"}), |e| {
                matches!(e, CoreError::UnexpectedResponse(m) if m.contains("exploded"))
            }),
        ];

        for (template, check) in cases {
            let channel = Arc::new(BroadcastChannel::default());
            respond_with(channel.clone(), move |id| {
                let mut payload = template.clone();
                payload["requestId"] = json!(id);
                vec![payload]
            });
            let err = TestRunBroker::new(channel, None).trigger(None, false).await.unwrap_err();
            assert!(check(&err), "unexpected error: {:?}", err);
        }
    }
}
