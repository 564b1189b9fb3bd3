//! HTTP contract between the client and the board service.

use std::time::Duration;

use async_trait::async_trait;
use quickboard_common::Board;
use quickboard_common::protocol::{
    AuthRequest, BOARD_PATH, ErrorResponse, LOGIN_PATH, LoginResponse, REGISTER_PATH,
};
use reqwest::StatusCode;

use crate::errors::ClientError;

/// The board service as seen by the client. `HttpBoardClient` is the real
/// implementation; tests substitute in-memory fakes.
#[async_trait]
pub trait BoardApi: Send + Sync {
    /// `GET /api/board`. The server seeds the default board on first access.
    async fn load_board(&self, token: &str) -> Result<Board, ClientError>;

    /// `POST /api/board` with the whole document.
    async fn save_board(&self, token: &str, board: &Board) -> Result<(), ClientError>;

    async fn register(&self, username: &str, password: &str) -> Result<(), ClientError>;

    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ClientError>;
}

pub struct HttpBoardClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBoardClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_auth(
        &self,
        path: &str,
        username: &str,
        password: &str,
    ) -> Result<reqwest::Response, ClientError> {
        let body = AuthRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let resp = self.client.post(self.url(path)).json(&body).send().await?;
        check_status(resp).await
    }
}

/// Map non-success statuses onto `ClientError`, keeping the server's
/// `{"error": ...}` message when there is one.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(ClientError::Unauthorized {
            status: status.as_u16(),
        });
    }
    let text = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&text)
        .map(|body| body.error)
        .unwrap_or(text);
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl BoardApi for HttpBoardClient {
    async fn load_board(&self, token: &str) -> Result<Board, ClientError> {
        let resp = self
            .client
            .get(self.url(BOARD_PATH))
            .bearer_auth(token)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        resp.json::<Board>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn save_board(&self, token: &str, board: &Board) -> Result<(), ClientError> {
        let resp = self
            .client
            .post(self.url(BOARD_PATH))
            .bearer_auth(token)
            .json(board)
            .send()
            .await?;
        check_status(resp).await?;
        Ok(())
    }

    async fn register(&self, username: &str, password: &str) -> Result<(), ClientError> {
        self.post_auth(REGISTER_PATH, username, password).await?;
        Ok(())
    }

    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ClientError> {
        self.post_auth(LOGIN_PATH, username, password)
            .await?
            .json::<LoginResponse>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}
