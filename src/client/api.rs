use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::model::grade::{ErrorResponse, GradeRequest, GradeResponse};

pub const GRADE_PATH: &str = "/api/grade";

/// The client's view of the grading endpoint.
#[async_trait]
pub trait GradeApi: Send + Sync {
    async fn grade(&self, request: &GradeRequest) -> ClientResult<GradeResponse>;
}

// Error first: a body carrying `error` is always treated as a failure.
#[derive(Deserialize)]
#[serde(untagged)]
enum GradeReply {
    Failed(ErrorResponse),
    Graded(GradeResponse),
}

#[derive(Debug, Clone)]
pub struct HttpGradeApi {
    client: Client,
    base_url: String,
}

impl HttpGradeApi {
    pub fn new(base_url: impl Into<String>) -> ClientResult<Self> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn grade_url(&self) -> String {
        format!("{}{}", self.base_url, GRADE_PATH)
    }
}

#[async_trait]
impl GradeApi for HttpGradeApi {
    async fn grade(&self, request: &GradeRequest) -> ClientResult<GradeResponse> {
        let url = self.grade_url();
        debug!(url = %url, "posting grade request");

        let resp = self.client.post(&url).json(request).send().await?;
        let status = resp.status();
        let text = resp.text().await?;

        match serde_json::from_str::<GradeReply>(&text) {
            Ok(GradeReply::Failed(e)) => Err(ClientError::Rejected { message: e.error }),
            Ok(GradeReply::Graded(g)) if status.is_success() => Ok(g),
            Ok(GradeReply::Graded(_)) => Err(ClientError::MalformedResponse {
                message: format!("grade returned with HTTP {}", status.as_u16()),
            }),
            Err(e) => Err(ClientError::MalformedResponse {
                message: format!("HTTP {}: {e}", status.as_u16()),
            }),
        }
    }
}
