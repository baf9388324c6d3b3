// src/notify/twilio.rs
//! SMS via the Twilio Messages REST API.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use super::{Delivery, TextSender};
use crate::config::TwilioConfig;
use crate::error::SendError;

const DEFAULT_BASE_URL: &str = "https://api.twilio.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct TwilioSender {
    cfg: TwilioConfig,
    base_url: String,
    client: Client,
}

impl std::fmt::Debug for TwilioSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the auth token.
        f.debug_struct("TwilioSender")
            .field("account_sid", &self.cfg.account_sid)
            .field("from", &self.cfg.from_number)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Deserialize)]
struct MessageResource {
    sid: Option<String>,
}

impl TwilioSender {
    pub fn new(cfg: TwilioConfig) -> Self {
        Self {
            cfg,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.cfg.account_sid
        )
    }
}

#[async_trait::async_trait]
impl TextSender for TwilioSender {
    async fn send(&self, body: &str) -> Result<Delivery, SendError> {
        let form = [
            ("Body", body),
            ("From", self.cfg.from_number.as_str()),
            ("To", self.cfg.to_number.as_str()),
        ];

        let rsp = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.cfg.account_sid, Some(&self.cfg.auth_token))
            .timeout(REQUEST_TIMEOUT)
            .form(&form[..])
            .send()
            .await
            .map_err(|e| SendError::Request(e.to_string()))?;

        let status = rsp.status();
        if !status.is_success() {
            let body = rsp.text().await.unwrap_or_default();
            return Err(SendError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        // A 2xx means Twilio queued it; a body we can't parse only loses the sid.
        let sid = rsp
            .json::<MessageResource>()
            .await
            .ok()
            .and_then(|m| m.sid);
        Ok(Delivery { provider_id: sid })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Form,
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    fn cfg() -> TwilioConfig {
        TwilioConfig {
            account_sid: "AC123".into(),
            auth_token: "secret-token".into(),
            from_number: "+18556530788".into(),
            to_number: "+15550001111".into(),
        }
    }

    #[test]
    fn messages_url_targets_account() {
        let s = TwilioSender::new(cfg()).with_base_url("http://localhost:9999/");
        assert_eq!(
            s.messages_url(),
            "http://localhost:9999/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[test]
    fn debug_output_hides_token() {
        let s = TwilioSender::new(cfg());
        let dbg = format!("{s:?}");
        assert!(dbg.contains("AC123"));
        assert!(!dbg.contains("secret-token"));
    }

    type Seen = Arc<Mutex<Vec<(HashMap<String, String>, bool)>>>;

    /// Local stand-in for the Twilio endpoint; returns its base URL.
    async fn fake_twilio(status: StatusCode, seen: Seen) -> String {
        let app = Router::new().route(
            "/2010-04-01/Accounts/AC123/Messages.json",
            post(move |headers: HeaderMap, Form(form): Form<HashMap<String, String>>| {
                let seen = seen.clone();
                async move {
                    let authed = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .is_some_and(|v| v.starts_with("Basic "));
                    seen.lock().unwrap().push((form, authed));
                    (status, Json(serde_json::json!({ "sid": "SM42" })))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn posts_form_with_basic_auth_and_returns_sid() {
        let seen: Seen = Arc::default();
        let base = fake_twilio(StatusCode::CREATED, seen.clone()).await;
        let s = TwilioSender::new(cfg()).with_base_url(base);

        let delivery = s.send("Where you at?").await.unwrap();
        assert_eq!(delivery.provider_id.as_deref(), Some("SM42"));

        let calls = seen.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (form, authed) = &calls[0];
        assert!(*authed);
        assert_eq!(form["Body"], "Where you at?");
        assert_eq!(form["From"], "+18556530788");
        assert_eq!(form["To"], "+15550001111");
    }

    #[tokio::test]
    async fn non_2xx_is_rejected() {
        let seen: Seen = Arc::default();
        let base = fake_twilio(StatusCode::UNAUTHORIZED, seen).await;
        let s = TwilioSender::new(cfg()).with_base_url(base);

        let err = s.send("Ok, wrap it up.").await.unwrap_err();
        assert!(matches!(err, SendError::Rejected { status: 401, .. }));
    }
}
