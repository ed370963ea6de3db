use crate::{
    eligibility::EligibilityResult,
    error::QueryError,
};
use reqwest::Response;
use serde::{
    Deserialize,
    Serialize,
    de::DeserializeOwned,
};
use std::{
    fmt,
    time::Duration,
};

pub const DEFAULT_API_URL: &str = "http://localhost:3001";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const IS_ALLOWED_PATH: &str = "/api/maze/isAllowed";
const GET_SEED_ID_PATH: &str = "/api/maze/getSeedId";

#[derive(Clone, Debug)]
pub struct MazeClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for MazeClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Seed identifier handed out by the backend for a new maze.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SeedId(String);

impl SeedId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Client for the maze backend's eligibility endpoints.
///
/// Every call is a fresh request: nothing is cached, retried or coalesced.
#[derive(Clone)]
pub struct MazeClient {
    base_url: String,
    http: reqwest::Client,
}

impl MazeClient {
    pub fn new(config: MazeClientConfig) -> Result<Self, QueryError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(QueryError::Transport)?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn check_allowed(
        &self,
        account_id: &str,
    ) -> Result<EligibilityResult, QueryError> {
        let url = format!("{}{}", self.base_url, IS_ALLOWED_PATH);
        tracing::debug!(%account_id, "checking maze eligibility");
        let res = self
            .http
            .get(url)
            .query(&[("accountId", account_id)])
            .send()
            .await
            .map_err(QueryError::Transport)?;
        let dto: IsAllowedDto = read_json(res).await?;
        Ok(dto.into())
    }

    pub async fn fetch_seed(&self, account_id: &str) -> Result<SeedId, QueryError> {
        let url = format!("{}{}", self.base_url, GET_SEED_ID_PATH);
        tracing::debug!(%account_id, "requesting maze seed");
        let res = self
            .http
            .post(url)
            .json(&SeedRequestDto { account_id })
            .send()
            .await
            .map_err(QueryError::Transport)?;
        let dto: SeedDto = read_json(res).await?;
        Ok(dto.into())
    }
}

// The backend reports refusals in the body, so the status only feeds errors.
async fn read_json<T: DeserializeOwned>(res: Response) -> Result<T, QueryError> {
    let status = res.status();
    let bytes = res.bytes().await.map_err(QueryError::Transport)?;
    serde_json::from_slice(&bytes).map_err(|source| {
        tracing::warn!(
            %status,
            body = %String::from_utf8_lossy(&bytes),
            "unparseable maze backend response"
        );
        QueryError::Parse { status, source }
    })
}

#[derive(Deserialize)]
struct IsAllowedDto {
    ok: bool,
    #[serde(default)]
    errors: Option<Vec<String>>,
}

impl From<IsAllowedDto> for EligibilityResult {
    fn from(dto: IsAllowedDto) -> Self {
        EligibilityResult {
            ok: dto.ok,
            reasons: dto.errors.unwrap_or_default(),
        }
    }
}

#[derive(Serialize)]
struct SeedRequestDto<'a> {
    #[serde(rename = "accountId")]
    account_id: &'a str,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeedDto {
    Plain(SeedValueDto),
    Wrapped {
        #[serde(rename = "seedId", alias = "seed_id")]
        seed_id: SeedValueDto,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeedValueDto {
    Number(serde_json::Number),
    Text(String),
}

impl From<SeedDto> for SeedId {
    fn from(dto: SeedDto) -> Self {
        let value = match dto {
            SeedDto::Plain(value) | SeedDto::Wrapped { seed_id: value } => value,
        };
        match value {
            SeedValueDto::Number(n) => SeedId(n.to_string()),
            SeedValueDto::Text(s) => SeedId(s),
        }
    }
}
