use bytes::Bytes;
use http::HeaderMap;
use serde::Serialize;
use serde_json::Value;

const INVOCATION_PATH: &str = "2018-06-01/runtime/invocation";
const REQUEST_ID_HEADER: &str = "Lambda-Runtime-Aws-Request-Id";
const ERROR_TYPE_HEADER: &str = "Lambda-Runtime-Function-Error-Type";

/// Client for the invocation half of the Lambda Runtime API.
#[derive(Clone)]
pub struct RuntimeApiClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug)]
pub struct NextInvocation {
    pub request_id: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Response,
    Error,
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Outcome::Response => "response",
            Outcome::Error => "error",
        }
    }
}

/// Body of an `/error` post.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorReport<'a> {
    error_message: &'a str,
    error_type: &'a str,
}

impl RuntimeApiClient {
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder().http1_only().build()?;
        Ok(Self { base_url, http })
    }

    fn next_url(&self) -> String {
        format!("{}/{INVOCATION_PATH}/next", self.base_url)
    }

    fn outcome_url(&self, request_id: &str, outcome: Outcome) -> String {
        format!(
            "{}/{INVOCATION_PATH}/{request_id}/{}",
            self.base_url,
            outcome.as_str()
        )
    }

    /// Blocks until the platform hands out the next invocation.
    pub async fn next_invocation(&self) -> anyhow::Result<NextInvocation> {
        let resp = ensure_accepted(self.http.get(self.next_url()).send().await?, "next")?;

        let headers = resp.headers().clone();
        let request_id = request_id(&headers)?;
        let body = resp.bytes().await?;

        Ok(NextInvocation {
            request_id,
            headers,
            body,
        })
    }

    pub async fn post_response(&self, request_id: &str, response: &Value) -> anyhow::Result<()> {
        let resp = self
            .http
            .post(self.outcome_url(request_id, Outcome::Response))
            .json(response)
            .send()
            .await?;
        ensure_accepted(resp, request_id)?;
        Ok(())
    }

    /// Reports a failed invocation so the platform applies its retry/redrive policy.
    pub async fn post_error(
        &self,
        request_id: &str,
        error_type: &str,
        message: &str,
    ) -> anyhow::Result<()> {
        let report = ErrorReport {
            error_message: message,
            error_type,
        };
        let resp = self
            .http
            .post(self.outcome_url(request_id, Outcome::Error))
            .header(ERROR_TYPE_HEADER, error_type)
            .json(&report)
            .send()
            .await?;
        ensure_accepted(resp, request_id)?;
        Ok(())
    }
}

fn request_id(headers: &HeaderMap) -> anyhow::Result<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("invocation is missing {REQUEST_ID_HEADER}"))
}

fn ensure_accepted(resp: reqwest::Response, call: &str) -> anyhow::Result<reqwest::Response> {
    let status = resp.status();
    if !status.is_success() {
        anyhow::bail!("runtime API rejected {call} (status {status})");
    }
    Ok(resp)
}
