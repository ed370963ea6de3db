use crate::error::NearError;
use base64::{
    Engine,
    engine::general_purpose::STANDARD,
};
use serde::{
    Deserialize,
    de::DeserializeOwned,
};
use serde_json::json;
use std::time::Duration;

pub const DEFAULT_NEAR_RPC_URL: &str = "https://rpc.testnet.near.org";
pub const DEFAULT_POWER_UP_CONTRACT: &str = "nft.cheddar.testnet";
pub const DEFAULT_CHEDDAR_TOKEN_CONTRACT: &str = "token-v3.cheddar.testnet";
pub const CHEDDAR_DECIMALS: u32 = 24;

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct NftMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub media: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Nft {
    pub token_id: String,
    pub owner_id: String,
    #[serde(default)]
    pub metadata: Option<NftMetadata>,
}

/// Source of the power-up NFTs an account holds.
pub trait NftOwnership {
    fn owned_nfts(&self, owner: &str) -> impl Future<Output = Result<Vec<Nft>, NearError>>;
}

/// Fungible token balance lookup, in the token's smallest unit.
pub trait TokenBalance {
    fn balance_of(&self, account: &str) -> impl Future<Output = Result<u128, NearError>>;
}

/// Converts whole Cheddar into the token's smallest unit, saturating at
/// `u128::MAX` for amounts beyond any real supply.
pub fn whole_cheddar(amount: u64) -> u128 {
    u128::from(amount).saturating_mul(10u128.pow(CHEDDAR_DECIMALS))
}

/// Read-only `call_function` queries against a NEAR RPC node.
#[derive(Clone)]
pub struct NearViewClient {
    rpc_url: String,
    http: reqwest::Client,
}

impl NearViewClient {
    pub fn new(rpc_url: impl Into<String>, timeout: Duration) -> Result<Self, NearError> {
        let rpc_url = rpc_url.into();
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { rpc_url, http })
    }

    pub async fn view<T: DeserializeOwned>(
        &self,
        contract_id: &str,
        method: &str,
        args: &serde_json::Value,
    ) -> Result<T, NearError> {
        let args_base64 = STANDARD.encode(serde_json::to_vec(args)?);
        let request = json!({
            "jsonrpc": "2.0",
            "id": "dontcare",
            "method": "query",
            "params": {
                "request_type": "call_function",
                "finality": "final",
                "account_id": contract_id,
                "method_name": method,
                "args_base64": args_base64,
            },
        });
        tracing::debug!(%contract_id, %method, "NEAR view call");
        let body = self
            .http
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await?
            .bytes()
            .await?;
        let res: RpcResponseDto = serde_json::from_slice(&body)?;
        if let Some(err) = res.error {
            return Err(NearError::Rpc(err.to_string()));
        }
        let call = res
            .result
            .ok_or_else(|| NearError::Rpc("response carried no result".to_string()))?;
        if let Some(err) = call.error {
            return Err(NearError::Rpc(err));
        }
        let bytes = call
            .result
            .ok_or_else(|| NearError::Rpc("view call returned no bytes".to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[derive(Deserialize)]
struct RpcResponseDto {
    #[serde(default)]
    result: Option<CallResultDto>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct CallResultDto {
    #[serde(default)]
    result: Option<Vec<u8>>,
    #[serde(default)]
    error: Option<String>,
}

/// The NEP-171 contract minting Cheddar power-ups.
#[derive(Clone)]
pub struct PowerUpContract {
    view: NearViewClient,
    contract_id: String,
}

impl PowerUpContract {
    pub fn new(view: NearViewClient, contract_id: impl Into<String>) -> Self {
        Self {
            view,
            contract_id: contract_id.into(),
        }
    }
}

impl NftOwnership for PowerUpContract {
    async fn owned_nfts(&self, owner: &str) -> Result<Vec<Nft>, NearError> {
        self.view
            .view(
                &self.contract_id,
                "nft_tokens_for_owner",
                &json!({ "account_id": owner }),
            )
            .await
    }
}

/// The NEP-141 Cheddar token.
#[derive(Clone)]
pub struct CheddarToken {
    view: NearViewClient,
    contract_id: String,
}

impl CheddarToken {
    pub fn new(view: NearViewClient, contract_id: impl Into<String>) -> Self {
        Self {
            view,
            contract_id: contract_id.into(),
        }
    }
}

impl TokenBalance for CheddarToken {
    async fn balance_of(&self, account: &str) -> Result<u128, NearError> {
        let raw: String = self
            .view
            .view(
                &self.contract_id,
                "ft_balance_of",
                &json!({ "account_id": account }),
            )
            .await?;
        raw.parse().map_err(|_| NearError::Amount(raw))
    }
}
