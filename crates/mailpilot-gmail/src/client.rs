//! Gmail REST client.
//!
//! Implements [`MailboxProvider`] against the Gmail v1 API. Access tokens
//! are taken from the per-call credentials; on a 401 the client refreshes
//! once via the OAuth token endpoint and retries, without persisting the
//! refreshed token (the refresh token in the identity row stays the
//! durable credential).

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use async_trait::async_trait;

use mailpilot_types::config::GmailConfig;
use mailpilot_types::identity::MailCredentials;
use mailpilot_types::secret::SecretString;

use crate::error::{GmailError, Result};
use crate::provider::MailboxProvider;
use crate::types::{
    GmailMessage, HistoryResponse, ListMessagesResponse, MessageRef, OutgoingMessage,
    WatchResponse, INBOX_LABEL, UNREAD_LABEL,
};

const GMAIL_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";
const OAUTH_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Largest page size `users.messages.list` accepts.
const MAX_PAGE_SIZE: usize = 500;

/// Gmail API client. One instance serves every identity in the process.
pub struct GmailClient {
    http: reqwest::Client,
    base_url: String,
    token_url: String,
    client_id: String,
    client_secret: SecretString,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl GmailClient {
    /// Create a client against the production Gmail endpoints.
    pub fn new(config: &GmailConfig) -> Self {
        Self::with_endpoints(config, GMAIL_BASE_URL, OAUTH_TOKEN_URL)
    }

    /// Create a client against explicit endpoints. Used by tests to point
    /// at a local mock server.
    pub fn with_endpoints(config: &GmailConfig, base_url: &str, token_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            token_url: token_url.to_owned(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        }
    }

    /// Exchange the refresh token for a fresh access token.
    async fn refresh_access_token(&self, creds: &MailCredentials) -> Result<String> {
        debug!("refreshing gmail access token");
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose()),
                ("refresh_token", creds.refresh_token.expose()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GmailError::TokenRefresh(format!("status {status}: {body}")));
        }

        Ok(response.json::<TokenResponse>().await?.access_token)
    }

    /// Send a request with the stored access token, refreshing and
    /// retrying once on 401.
    async fn send_authorized<F>(&self, creds: &MailCredentials, build: F) -> Result<Response>
    where
        F: Fn(&reqwest::Client, &str) -> RequestBuilder,
    {
        let response = build(&self.http, creds.access_token.expose()).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        warn!("gmail rejected access token, refreshing once");
        let fresh = self.refresh_access_token(creds).await?;
        Ok(build(&self.http, &fresh).send().await?)
    }

    /// Map a non-success response into [`GmailError::Api`].
    async fn expect_success(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(GmailError::Api {
            status: status.as_u16(),
            message,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl MailboxProvider for GmailClient {
    async fn register_watch(
        &self,
        creds: &MailCredentials,
        topic: &str,
    ) -> Result<WatchResponse> {
        let url = self.url("/users/me/watch");
        let body = serde_json::json!({
            "topicName": topic,
            "labelIds": [INBOX_LABEL],
        });

        let response = self
            .send_authorized(creds, |http, token| {
                http.post(&url).bearer_auth(token).json(&body)
            })
            .await?;
        let response = Self::expect_success(response).await?;
        Ok(response.json().await?)
    }

    async fn list_history_since(
        &self,
        creds: &MailCredentials,
        start_history_id: &str,
    ) -> Result<HistoryResponse> {
        let mut records = Vec::new();
        let mut latest_history_id = None;
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!(
                "{}/users/me/history?startHistoryId={start_history_id}\
                 &historyTypes=messageAdded&historyTypes=messageDeleted&labelId={INBOX_LABEL}",
                self.base_url
            );
            if let Some(token) = &page_token {
                url.push_str(&format!("&pageToken={token}"));
            }

            let response = self
                .send_authorized(creds, |http, token| http.get(&url).bearer_auth(token))
                .await?;

            // Gmail answers 404 when the start cursor has aged out of the
            // change log.
            if response.status() == StatusCode::NOT_FOUND {
                return Err(GmailError::StaleCursor);
            }
            let response = Self::expect_success(response).await?;
            let page: HistoryResponse = response.json().await?;

            if let Some(history) = page.history {
                records.extend(history);
            }
            if page.history_id.is_some() {
                latest_history_id = page.history_id;
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(HistoryResponse {
            history: (!records.is_empty()).then_some(records),
            history_id: latest_history_id,
            next_page_token: None,
        })
    }

    async fn fetch_message(&self, creds: &MailCredentials, id: &str) -> Result<GmailMessage> {
        let url = self.url(&format!("/users/me/messages/{id}?format=full"));
        let response = self
            .send_authorized(creds, |http, token| http.get(&url).bearer_auth(token))
            .await?;
        let response = Self::expect_success(response).await?;
        Ok(response.json().await?)
    }

    async fn list_messages(
        &self,
        creds: &MailCredentials,
        max_results: usize,
        page_token: Option<&str>,
    ) -> Result<ListMessagesResponse> {
        let mut url = format!(
            "{}/users/me/messages?maxResults={}&labelIds={INBOX_LABEL}",
            self.base_url,
            max_results.min(MAX_PAGE_SIZE)
        );
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={token}"));
        }

        let response = self
            .send_authorized(creds, |http, token| http.get(&url).bearer_auth(token))
            .await?;
        let response = Self::expect_success(response).await?;
        Ok(response.json().await?)
    }

    async fn send_message(
        &self,
        creds: &MailCredentials,
        message: &OutgoingMessage,
    ) -> Result<MessageRef> {
        let url = self.url("/users/me/messages/send");
        let body = serde_json::json!({ "raw": message.to_raw() });

        let response = self
            .send_authorized(creds, |http, token| {
                http.post(&url).bearer_auth(token).json(&body)
            })
            .await?;
        let response = Self::expect_success(response).await?;
        Ok(response.json().await?)
    }

    async fn trash_message(&self, creds: &MailCredentials, id: &str) -> Result<()> {
        let url = self.url(&format!("/users/me/messages/{id}/trash"));
        let response = self
            .send_authorized(creds, |http, token| http.post(&url).bearer_auth(token))
            .await?;
        Self::expect_success(response).await?;
        Ok(())
    }

    async fn mark_read(&self, creds: &MailCredentials, id: &str) -> Result<()> {
        let url = self.url(&format!("/users/me/messages/{id}/modify"));
        let body = serde_json::json!({ "removeLabelIds": [UNREAD_LABEL] });

        let response = self
            .send_authorized(creds, |http, token| {
                http.post(&url).bearer_auth(token).json(&body)
            })
            .await?;
        Self::expect_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn creds() -> MailCredentials {
        MailCredentials {
            access_token: "live-token".into(),
            refresh_token: "refresh-token".into(),
        }
    }

    fn client(server: &MockServer) -> GmailClient {
        let config = GmailConfig {
            client_id: "cid".into(),
            client_secret: "csecret".into(),
            pubsub_topic: "projects/p/topics/t".into(),
            ..Default::default()
        };
        let token_url = format!("{}/token", server.uri());
        GmailClient::with_endpoints(&config, &server.uri(), &token_url)
    }

    #[tokio::test]
    async fn register_watch_posts_topic_and_inbox_label() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/me/watch"))
            .and(body_json(serde_json::json!({
                "topicName": "projects/p/topics/t",
                "labelIds": ["INBOX"],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "historyId": "84001",
                "expiration": "1772366400000",
            })))
            .mount(&server)
            .await;

        let resp = client(&server)
            .register_watch(&creds(), "projects/p/topics/t")
            .await
            .unwrap();
        assert_eq!(resp.history_id, "84001");
        assert!(resp.expiration_time().is_some());
    }

    #[tokio::test]
    async fn history_merges_pages_and_keeps_last_cursor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/history"))
            .and(query_param("pageToken", "p2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "historyId": "120",
                "history": [{"id": "110", "messagesAdded": [{"message": {"id": "m2"}}]}],
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/me/history"))
            .and(query_param("startHistoryId", "42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "historyId": "115",
                "history": [{"id": "100", "messagesAdded": [{"message": {"id": "m1"}}]}],
                "nextPageToken": "p2",
            })))
            .mount(&server)
            .await;

        let delta = client(&server)
            .list_history_since(&creds(), "42")
            .await
            .unwrap();
        let ids: Vec<&str> = delta
            .records()
            .iter()
            .flat_map(|r| r.added())
            .map(|m| m.id.as_str())
            .collect();
        assert_eq!(ids, vec!["m1", "m2"]);
        assert_eq!(delta.history_id.as_deref(), Some("120"));
    }

    #[tokio::test]
    async fn history_404_is_a_stale_cursor() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/history"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = client(&server).list_history_since(&creds(), "1").await;
        assert!(matches!(result, Err(GmailError::StaleCursor)));
    }

    #[tokio::test]
    async fn unauthorized_refreshes_token_and_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/messages/m1"))
            .and(header("authorization", "Bearer live-token"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/me/messages/m1"))
            .and(header("authorization", "Bearer fresh-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "m1",
                "threadId": "t1",
                "labelIds": ["INBOX"],
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh-token",
                "expires_in": 3599,
            })))
            .mount(&server)
            .await;

        let msg = client(&server).fetch_message(&creds(), "m1").await.unwrap();
        assert_eq!(msg.id, "m1");
        assert!(msg.is_inbox());
    }

    #[tokio::test]
    async fn failed_refresh_surfaces_as_token_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/messages/m1"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let result = client(&server).fetch_message(&creds(), "m1").await;
        assert!(matches!(result, Err(GmailError::TokenRefresh(_))));
    }

    #[tokio::test]
    async fn mark_read_removes_unread_label() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/me/messages/m1/modify"))
            .and(body_json(serde_json::json!({"removeLabelIds": ["UNREAD"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "m1",
            })))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).mark_read(&creds(), "m1").await.unwrap();
    }

    #[tokio::test]
    async fn send_message_returns_created_ref() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/me/messages/send"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "sent-1",
                "threadId": "t-9",
            })))
            .mount(&server)
            .await;

        let sent = client(&server)
            .send_message(
                &creds(),
                &OutgoingMessage {
                    to: "alice@example.com".into(),
                    subject: "Hi".into(),
                    body: "Hello".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(sent.id, "sent-1");
    }

    #[tokio::test]
    async fn api_error_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/me/messages/m1/trash"))
            .respond_with(ResponseTemplate::new(403).set_body_string("insufficient scope"))
            .mount(&server)
            .await;

        let result = client(&server).trash_message(&creds(), "m1").await;
        match result {
            Err(GmailError::Api { status, message }) => {
                assert_eq!(status, 403);
                assert!(message.contains("insufficient scope"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }
}
