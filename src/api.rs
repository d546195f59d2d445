//! HTTP client for the Corporate AI backend.
//!
//! # Endpoints
//!
//! | Method | Path | Auth | Returns |
//! |--------|------|------|---------|
//! | `POST` | `/auth/login` | none | `{access_token}` |
//! | `GET`  | `/auth/me` | bearer | [`UserProfile`] |
//! | `GET`  | `/admin/categories` | optional | `[{name, ...}]` |
//! | `POST` | `/chat/query` | bearer | [`QueryReply`] |
//! | `GET`  | `/admin/logs?limit=N` | optional | `{data: [...]}` |
//! | `POST` | `/admin/train/start` | optional | NDJSON byte stream |
//! | `POST` | `/admin/knowledge/upload` | optional | `{message}` |
//!
//! Every request is built by [`ApiClient::request`], which attaches the
//! session's bearer token when there is one, and every response passes
//! through [`ApiClient::check_status`], which turns non-2xx responses
//! into [`ClientError`]s and applies the [`AuthPolicy`] on auth failures.
//! There are no client-side timeouts; the network layer owns them.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use reqwest::{Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::sync::Arc;

use corpai_core::audit::{AuditLogEntry, LogsPage};
use corpai_core::models::{
    Category, ErrorBody, LoginResponse, MessageBody, QueryReply, QueryRequest, UserProfile,
};

use crate::error::{indicates_expired_session, ClientError};
use crate::session::{AuthPolicy, Session};

/// One file to upload to the knowledge base.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub async fn read(path: &std::path::Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| PathBuf::from(path).display().to_string());
        Ok(Self { file_name, bytes })
    }

    fn mime_type(&self) -> &'static str {
        let lower = self.file_name.to_ascii_lowercase();
        if lower.ends_with(".pdf") {
            "application/pdf"
        } else {
            "application/octet-stream"
        }
    }
}

/// What the chat controller needs from a backend.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn profile(&self) -> Result<UserProfile, ClientError>;
    async fn categories(&self) -> Result<Vec<Category>, ClientError>;
    async fn query(&self, query: &str, category: &str) -> Result<QueryReply, ClientError>;
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    session: Arc<Session>,
    policy: AuthPolicy,
}

impl ApiClient {
    pub fn new(mut base: Url, session: Arc<Session>) -> Result<Self, ClientError> {
        // Endpoint paths are joined relative to the base, which needs a trailing slash.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .user_agent(concat!("corpai/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base,
            session,
            policy: AuthPolicy::Redirect,
        })
    }

    /// Same client, different auth-failure policy.
    pub fn with_policy(mut self, policy: AuthPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn policy(&self) -> AuthPolicy {
        self.policy
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::decode(path, format!("bad URL: {}", e)))
    }

    /// Build a request, attaching the bearer token when one is stored.
    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let builder = self.http.request(method, self.url(path)?);
        Ok(match self.session.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    /// Pass 2xx responses through; turn everything else into an error,
    /// invalidating the session on auth failures unless suppressed.
    async fn check_status(&self, endpoint: &str, resp: Response) -> Result<Response, ClientError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.detail_text());
        tracing::debug!(endpoint, %status, ?detail, "request rejected");

        let detail_text = detail.clone().unwrap_or_default();
        if indicates_expired_session(status, &detail_text) {
            self.on_auth_failure();
            return Err(ClientError::Unauthorized {
                detail: detail.unwrap_or_else(|| "Session expired".to_string()),
            });
        }

        Err(ClientError::Rejected {
            status,
            detail: detail.unwrap_or_else(|| corpai_core::chat::UNKNOWN_ERROR.to_string()),
        })
    }

    fn on_auth_failure(&self) {
        match self.policy {
            AuthPolicy::Redirect => {
                if let Err(e) = self.session.invalidate() {
                    tracing::warn!("failed to clear session: {:#}", e);
                }
            }
            AuthPolicy::Suppress => {
                tracing::debug!("auth failure ignored in embedded mode");
            }
        }
    }

    async fn json<T: DeserializeOwned>(endpoint: &str, resp: Response) -> Result<T, ClientError> {
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::decode(endpoint, e))
    }

    /// `POST /auth/login` with form fields. Returns the access token; the
    /// caller decides whether to store it.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ClientError> {
        const EP: &str = "/auth/login";
        let resp = self
            .http
            .post(self.url(EP)?)
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;

        // A failed login is a rejection, never a session invalidation.
        let status = resp.status();
        if !status.is_success() {
            return Err(ClientError::Rejected {
                status,
                detail: "Invalid credentials".to_string(),
            });
        }
        let body: LoginResponse = Self::json(EP, resp).await?;
        Ok(body.access_token)
    }

    /// `GET /auth/me`.
    pub async fn me(&self) -> Result<UserProfile, ClientError> {
        const EP: &str = "/auth/me";
        if self.session.token().is_none() {
            return Err(ClientError::Unauthorized {
                detail: "Not logged in".to_string(),
            });
        }
        let resp = self.request(Method::GET, EP)?.send().await?;
        let resp = self.check_status(EP, resp).await?;
        Self::json(EP, resp).await
    }

    /// `GET /admin/categories`, as sent by the server.
    pub async fn categories(&self) -> Result<Vec<Category>, ClientError> {
        const EP: &str = "/admin/categories";
        let resp = self.request(Method::GET, EP)?.send().await?;
        let resp = self.check_status(EP, resp).await?;
        Self::json(EP, resp).await
    }

    /// `POST /chat/query`.
    pub async fn query(&self, query: &str, category: &str) -> Result<QueryReply, ClientError> {
        const EP: &str = "/chat/query";
        let resp = self
            .request(Method::POST, EP)?
            .json(&QueryRequest { query, category })
            .send()
            .await?;
        let resp = self.check_status(EP, resp).await?;
        let value: serde_json::Value = Self::json(EP, resp).await?;
        QueryReply::from_json(value).map_err(|e| ClientError::decode(EP, e))
    }

    /// `GET /admin/logs?limit=N`.
    pub async fn logs(&self, limit: u32) -> Result<Vec<AuditLogEntry>, ClientError> {
        const EP: &str = "/admin/logs";
        let resp = self
            .request(Method::GET, EP)?
            .query(&[("limit", limit)])
            .send()
            .await?;
        let resp = self.check_status(EP, resp).await?;
        let page: LogsPage = Self::json(EP, resp).await?;
        Ok(page.data)
    }

    /// `POST /admin/train/start`. Returns the raw body stream; framing is
    /// left to [`crate::training`].
    pub async fn start_training(
        &self,
    ) -> Result<impl Stream<Item = Result<Bytes, reqwest::Error>>, ClientError> {
        const EP: &str = "/admin/train/start";
        let resp = self.request(Method::POST, EP)?.send().await?;
        let resp = self.check_status(EP, resp).await?;
        Ok(resp.bytes_stream())
    }

    /// `POST /admin/knowledge/upload` as multipart: one `files` part per
    /// file plus a `category` field. Returns the server's message.
    pub async fn upload_knowledge(
        &self,
        files: Vec<UploadFile>,
        category: &str,
    ) -> Result<Option<String>, ClientError> {
        const EP: &str = "/admin/knowledge/upload";
        let mut form = reqwest::multipart::Form::new();
        for file in files {
            let mime = file.mime_type();
            let part = reqwest::multipart::Part::bytes(file.bytes)
                .file_name(file.file_name)
                .mime_str(mime)?;
            form = form.part("files", part);
        }
        form = form.text("category", category.to_string());

        let resp = self.request(Method::POST, EP)?.multipart(form).send().await?;
        let resp = self.check_status(EP, resp).await?;
        let body: MessageBody = Self::json(EP, resp).await?;
        Ok(body.message.filter(|m| !m.is_empty()))
    }
}

#[async_trait]
impl ChatBackend for ApiClient {
    async fn profile(&self) -> Result<UserProfile, ClientError> {
        self.me().await
    }

    async fn categories(&self) -> Result<Vec<Category>, ClientError> {
        ApiClient::categories(self).await
    }

    async fn query(&self, query: &str, category: &str) -> Result<QueryReply, ClientError> {
        ApiClient::query(self, query, category).await
    }
}
