use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, StatusCode};
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use watch_domain::{AuthFailurePolicy, BattlefieldSource, DomainError, RegionsPayload};

use crate::config::AppConfig;

const REGIONS_PATH: &str = "/battlefield/getAllRegions";
const UNITY_USER_AGENT: &str = "UnityPlayer/2021.3.33f1 (UnityWebRequest/1.0, libcurl/8.4.0-DEV)";
const UNITY_VERSION: &str = "2021.3.33f1";

/// Supplies a replacement bearer token after the API rejects the current one.
#[async_trait]
pub trait TokenPrompt: Send + Sync {
    async fn prompt_token(&self, reason: &str) -> Result<String>;
}

/// Reads one line from stdin on a detached thread so a pending prompt never
/// holds up shutdown. Cancelling `shutdown` abandons the prompt.
pub struct StdinTokenPrompt {
    shutdown: CancellationToken,
}

impl StdinTokenPrompt {
    pub fn new(shutdown: CancellationToken) -> Self {
        Self { shutdown }
    }
}

#[async_trait]
impl TokenPrompt for StdinTokenPrompt {
    async fn prompt_token(&self, reason: &str) -> Result<String> {
        if self.shutdown.is_cancelled() {
            return Err(anyhow!("token prompt cancelled by shutdown"));
        }
        {
            let mut stdout = std::io::stdout();
            write!(stdout, "{} Please enter a bearer token: ", reason)?;
            stdout.flush()?;
        }

        let (tx, rx) = oneshot::channel();
        std::thread::Builder::new()
            .name("token-prompt".to_string())
            .spawn(move || {
                let mut line = String::new();
                let read = std::io::stdin().read_line(&mut line).map(|n| (n, line));
                let _ = tx.send(read);
            })?;

        let read = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return Err(anyhow!("token prompt cancelled by shutdown")),
            read = rx => read.map_err(|_| anyhow!("token prompt thread exited"))?,
        };
        let (bytes, line) = read?;
        if bytes == 0 {
            return Err(anyhow!("stdin closed while waiting for a bearer token"));
        }
        let token = line.trim().to_string();
        if token.is_empty() {
            return Err(anyhow!("empty bearer token entered"));
        }
        Ok(token)
    }
}

/// Mutable per-process request state: the sequence number and current credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSession {
    pub request_id: u64,
    pub bearer_token: String,
}

enum Attempt {
    Accepted(reqwest::Response),
    Rejected(StatusCode),
    Failed(StatusCode),
}

pub struct BattlefieldClient {
    client: Client,
    endpoint: String,
    body_hmac: String,
    policy: AuthFailurePolicy,
    session: Mutex<FetchSession>,
    prompt: Arc<dyn TokenPrompt>,
}

impl BattlefieldClient {
    pub fn new(
        config: &AppConfig,
        bearer_token: String,
        prompt: Arc<dyn TokenPrompt>,
    ) -> Result<Self> {
        let body_hmac = config
            .body_hmac
            .clone()
            .ok_or_else(|| anyhow!("body_hmac not configured (set BODY_HMAC)"))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds.max(3)))
            .build()?;
        Ok(Self {
            client,
            endpoint: format!("{}{}", config.api_base_url, REGIONS_PATH),
            body_hmac,
            policy: config.auth_failure_policy,
            session: Mutex::new(FetchSession {
                request_id: config.request_id,
                bearer_token,
            }),
            prompt,
        })
    }

    pub async fn session(&self) -> FetchSession {
        self.session.lock().await.clone()
    }

    /// Transport errors are the only outcome that does not count as a completed request.
    async fn attempt(&self, session: &FetchSession) -> Result<Attempt> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", session.bearer_token))
            .header("bodyhmac", &self.body_hmac)
            .header("request-id", session.request_id.to_string())
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, UNITY_USER_AGENT)
            .header("X-Unity-Version", UNITY_VERSION)
            .body("{}")
            .send()
            .await
            .context("battlefield request failed")?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Ok(Attempt::Rejected(status))
        } else if status.is_success() {
            Ok(Attempt::Accepted(response))
        } else {
            Ok(Attempt::Failed(status))
        }
    }
}

#[async_trait]
impl BattlefieldSource for BattlefieldClient {
    async fn fetch_regions(&self) -> Result<RegionsPayload> {
        let mut session = self.session.lock().await;
        debug!(request_id = session.request_id, "fetching battlefield regions");

        let first = self.attempt(&session).await?;
        let outcome = match first {
            Attempt::Rejected(status) if self.policy == AuthFailurePolicy::Reprompt => {
                warn!(status = %status, "bearer token rejected, prompting for a new one");
                let token = match self
                    .prompt
                    .prompt_token("Bearer token has expired or is invalid.")
                    .await
                {
                    Ok(token) if !token.trim().is_empty() => token.trim().to_string(),
                    Ok(_) => {
                        session.request_id += 1;
                        return Err(DomainError::Auth(format!(
                            "battlefield api rejected the bearer token ({}) and the replacement was blank",
                            status
                        ))
                        .into());
                    }
                    Err(err) => {
                        session.request_id += 1;
                        return Err(DomainError::Auth(format!(
                            "battlefield api rejected the bearer token ({}) and no replacement was supplied: {}",
                            status, err
                        ))
                        .into());
                    }
                };
                session.bearer_token = token;
                // Retried call keeps the rejected request's sequence number.
                let retried = self.attempt(&session).await;
                session.request_id += 1;
                retried?
            }
            other => {
                session.request_id += 1;
                other
            }
        };

        match outcome {
            Attempt::Accepted(response) => response
                .json::<RegionsPayload>()
                .await
                .context("decode battlefield payload"),
            Attempt::Rejected(status) => Err(DomainError::Auth(format!(
                "battlefield api rejected the bearer token ({})",
                status
            ))
            .into()),
            Attempt::Failed(status) => Err(anyhow!("battlefield api responded {}", status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PAYLOAD: &str = r#"{"regions":[{"region":0,"battlefields":[
        {"id":1,"level":5,"disappearedTime":"2024-05-01T11:30:00.000Z","rewardGroupId":10}
    ]}]}"#;

    struct FixedPrompt {
        token: String,
        calls: AtomicUsize,
    }

    impl FixedPrompt {
        fn new(token: &str) -> Arc<Self> {
            Arc::new(Self {
                token: token.to_string(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TokenPrompt for FixedPrompt {
        async fn prompt_token(&self, _reason: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.token.clone())
        }
    }

    fn config(base_url: String, policy: AuthFailurePolicy) -> AppConfig {
        AppConfig {
            api_base_url: base_url,
            request_id: 7,
            body_hmac: Some("hmac-value".to_string()),
            auth_failure_policy: policy,
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn sends_expected_headers_and_advances_request_id() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("POST", "/battlefield/getAllRegions")
            .match_header("authorization", "Bearer token-a")
            .match_header("bodyhmac", "hmac-value")
            .match_header("request-id", "7")
            .match_header("x-unity-version", UNITY_VERSION)
            .match_header("user-agent", UNITY_USER_AGENT)
            .match_body("{}")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(PAYLOAD)
            .create_async()
            .await;
        let second = server
            .mock("POST", "/battlefield/getAllRegions")
            .match_header("request-id", "8")
            .with_status(200)
            .with_body(r#"{"regions":[]}"#)
            .create_async()
            .await;

        let prompt = FixedPrompt::new("unused");
        let client = BattlefieldClient::new(
            &config(server.url(), AuthFailurePolicy::Reprompt),
            "token-a".to_string(),
            prompt.clone(),
        )
        .expect("client");

        let payload = client.fetch_regions().await.expect("fetch");
        assert_eq!(payload.into_mobs().len(), 1);
        let payload = client.fetch_regions().await.expect("fetch");
        assert!(payload.regions.is_empty());

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(client.session().await.request_id, 9);
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reprompt_retries_once_with_same_request_id() {
        let mut server = mockito::Server::new_async().await;
        let rejected = server
            .mock("POST", "/battlefield/getAllRegions")
            .match_header("authorization", "Bearer stale")
            .match_header("request-id", "7")
            .with_status(403)
            .create_async()
            .await;
        let accepted = server
            .mock("POST", "/battlefield/getAllRegions")
            .match_header("authorization", "Bearer fresh")
            .match_header("request-id", "7")
            .with_status(200)
            .with_body(PAYLOAD)
            .create_async()
            .await;

        let prompt = FixedPrompt::new("fresh");
        let client = BattlefieldClient::new(
            &config(server.url(), AuthFailurePolicy::Reprompt),
            "stale".to_string(),
            prompt.clone(),
        )
        .expect("client");

        client.fetch_regions().await.expect("fetch after reauth");
        rejected.assert_async().await;
        accepted.assert_async().await;
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            client.session().await,
            FetchSession {
                request_id: 8,
                bearer_token: "fresh".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn second_rejection_is_an_auth_error() {
        let mut server = mockito::Server::new_async().await;
        let rejected = server
            .mock("POST", "/battlefield/getAllRegions")
            .with_status(403)
            .expect(2)
            .create_async()
            .await;

        let prompt = FixedPrompt::new("still-bad");
        let client = BattlefieldClient::new(
            &config(server.url(), AuthFailurePolicy::Reprompt),
            "stale".to_string(),
            prompt.clone(),
        )
        .expect("client");

        let err = client.fetch_regions().await.expect_err("auth failure");
        assert!(err
            .downcast_ref::<DomainError>()
            .map(DomainError::is_auth)
            .unwrap_or(false));
        rejected.assert_async().await;
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exit_policy_fails_on_first_rejection() {
        let mut server = mockito::Server::new_async().await;
        let rejected = server
            .mock("POST", "/battlefield/getAllRegions")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let prompt = FixedPrompt::new("never");
        let client = BattlefieldClient::new(
            &config(server.url(), AuthFailurePolicy::Exit),
            "stale".to_string(),
            prompt.clone(),
        )
        .expect("client");

        let err = client.fetch_regions().await.expect_err("auth failure");
        assert!(matches!(err.downcast_ref::<DomainError>(), Some(DomainError::Auth(_))));
        rejected.assert_async().await;
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 0);
        assert_eq!(client.session().await.request_id, 8);
    }

    #[tokio::test]
    async fn server_errors_are_not_auth_failures() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/battlefield/getAllRegions")
            .with_status(500)
            .create_async()
            .await;

        let client = BattlefieldClient::new(
            &config(server.url(), AuthFailurePolicy::Reprompt),
            "token".to_string(),
            FixedPrompt::new("unused"),
        )
        .expect("client");

        let err = client.fetch_regions().await.expect_err("server error");
        assert!(err.downcast_ref::<DomainError>().is_none());
        assert!(err.to_string().contains("500"));
        assert_eq!(client.session().await.request_id, 8);
    }

    struct ClosedPrompt {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenPrompt for ClosedPrompt {
        async fn prompt_token(&self, _reason: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(anyhow!("stdin closed while waiting for a bearer token"))
        }
    }

    #[tokio::test]
    async fn unanswered_prompt_is_fatal_and_still_advances_request_id() {
        let mut server = mockito::Server::new_async().await;
        let rejected = server
            .mock("POST", "/battlefield/getAllRegions")
            .match_header("request-id", "7")
            .with_status(403)
            .expect(1)
            .create_async()
            .await;

        let prompt = Arc::new(ClosedPrompt {
            calls: AtomicUsize::new(0),
        });
        let client = BattlefieldClient::new(
            &config(server.url(), AuthFailurePolicy::Reprompt),
            "stale".to_string(),
            prompt.clone(),
        )
        .expect("client");

        let err = client.fetch_regions().await.expect_err("auth failure");
        assert!(watch_application::AppError::from_port(err).is_fatal());
        rejected.assert_async().await;
        assert_eq!(prompt.calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.session().await.request_id, 8);
    }

    #[tokio::test]
    async fn blank_replacement_token_is_fatal() {
        let mut server = mockito::Server::new_async().await;
        let rejected = server
            .mock("POST", "/battlefield/getAllRegions")
            .with_status(403)
            .expect(1)
            .create_async()
            .await;

        let client = BattlefieldClient::new(
            &config(server.url(), AuthFailurePolicy::Reprompt),
            "stale".to_string(),
            FixedPrompt::new("   "),
        )
        .expect("client");

        let err = client.fetch_regions().await.expect_err("auth failure");
        assert!(matches!(err.downcast_ref::<DomainError>(), Some(DomainError::Auth(_))));
        rejected.assert_async().await;
        assert_eq!(client.session().await.request_id, 8);
    }

    #[tokio::test]
    async fn stdin_prompt_gives_up_once_shutdown_is_requested() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();
        let prompt = StdinTokenPrompt::new(shutdown);
        let err = prompt.prompt_token("test").await.expect_err("cancelled");
        assert!(err.to_string().contains("cancelled"));
    }

    #[test]
    fn missing_body_hmac_is_rejected() {
        let config = AppConfig {
            body_hmac: None,
            ..AppConfig::default()
        };
        let result = BattlefieldClient::new(&config, "token".to_string(), FixedPrompt::new("x"));
        assert!(result.is_err());
    }
}
