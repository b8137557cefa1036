//! Node API client
//!
//! The wallet core only needs four things from a node: the UTXOs of a set of
//! addresses, a single-address balance, an unsigned transaction built from a
//! given input set, and the broadcast of a signed transaction. These are the
//! [`NodeClient`] trait; [`RpcNodeClient`] implements it over the node's
//! JSON-RPC interface.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};
use tracing::debug;

use crate::amount::Amount;
use crate::config::NodeSettings;
use crate::error::NodeError;
use crate::signing::{SignedTransaction, TransactionInput, UnsignedTransaction};
use crate::utxo::{Address, AssetId, TxId, Utxo, UtxoSet};

/// Operations the wallet needs from a node.
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// UTXOs owned by any of `addresses`
    async fn get_utxos(&self, addresses: &[Address]) -> Result<UtxoSet, NodeError>;

    /// Balance of `asset_id` held by a single address
    async fn get_balance(&self, address: &Address, asset_id: &AssetId)
        -> Result<Amount, NodeError>;

    /// Build an unsigned transfer spending from `utxos`.
    ///
    /// `from` is in preference order; the builder selects inputs from the
    /// earliest addresses first.
    async fn build_transaction(
        &self,
        utxos: &UtxoSet,
        amount: Amount,
        to: &[Address],
        from: &[Address],
        change: &[Address],
        asset_id: &AssetId,
    ) -> Result<UnsignedTransaction, NodeError>;

    /// Broadcast a signed transaction
    async fn submit_transaction(&self, signed: &SignedTransaction) -> Result<TxId, NodeError>;
}

/// JSON-RPC request ID counter
static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// JSON-RPC 2.0 request
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

/// JSON-RPC 2.0 response
#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct UtxosResult {
    utxos: Vec<Utxo>,
}

#[derive(Debug, Deserialize)]
struct BalanceResult {
    balance: Amount,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildResult {
    unsigned_tx: String,
    inputs: Vec<InputResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InputResult {
    #[serde(rename = "utxoID")]
    utxo_id: String,
    credential_type: u32,
    sig_indices: Vec<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialParam {
    credential_type: u32,
    signatures: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct IssueResult {
    #[serde(rename = "txID")]
    tx_id: TxId,
}

/// [`NodeClient`] over the node's JSON-RPC endpoint for one chain.
#[derive(Debug, Clone)]
pub struct RpcNodeClient {
    client: reqwest::Client,
    endpoint: String,
}

impl RpcNodeClient {
    pub fn new(settings: &NodeSettings) -> Result<Self, NodeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/ext/bc/{}",
                settings.url.trim_end_matches('/'),
                settings.chain_alias
            ),
        })
    }

    /// The URL requests are posted to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, NodeError> {
        let id = REQUEST_ID.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };

        debug!(method, id, "Calling node");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NodeError::Http(format!("HTTP error: {}", response.status())));
        }

        let json_response: JsonRpcResponse<T> = response.json().await?;

        if let Some(error) = json_response.error {
            return Err(NodeError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        json_response
            .result
            .ok_or_else(|| NodeError::MalformedResponse(format!("missing result for {method}")))
    }
}

#[async_trait]
impl NodeClient for RpcNodeClient {
    async fn get_utxos(&self, addresses: &[Address]) -> Result<UtxoSet, NodeError> {
        let result: UtxosResult = self
            .call("avm.getUTXOs", json!({ "addresses": addresses }))
            .await?;
        Ok(result.utxos.into_iter().collect())
    }

    async fn get_balance(
        &self,
        address: &Address,
        asset_id: &AssetId,
    ) -> Result<Amount, NodeError> {
        let result: BalanceResult = self
            .call(
                "avm.getBalance",
                json!({ "address": address, "assetID": asset_id }),
            )
            .await?;
        Ok(result.balance)
    }

    async fn build_transaction(
        &self,
        utxos: &UtxoSet,
        amount: Amount,
        to: &[Address],
        from: &[Address],
        change: &[Address],
        asset_id: &AssetId,
    ) -> Result<UnsignedTransaction, NodeError> {
        let utxos: Vec<&Utxo> = utxos.iter().collect();
        let result: BuildResult = self
            .call(
                "avm.buildBaseTx",
                json!({
                    "utxos": utxos,
                    "amount": amount,
                    "to": to,
                    "from": from,
                    "changeAddresses": change,
                    "assetID": asset_id,
                }),
            )
            .await?;

        let bytes = hex::decode(&result.unsigned_tx)
            .map_err(|e| NodeError::MalformedResponse(format!("unsignedTx: {e}")))?;

        Ok(UnsignedTransaction {
            bytes,
            inputs: result
                .inputs
                .into_iter()
                .map(|input| TransactionInput {
                    utxo_id: input.utxo_id.as_str().into(),
                    credential_type: input.credential_type,
                    signature_indices: input.sig_indices,
                })
                .collect(),
        })
    }

    async fn submit_transaction(&self, signed: &SignedTransaction) -> Result<TxId, NodeError> {
        let credentials: Vec<CredentialParam> = signed
            .credentials
            .iter()
            .map(|credential| CredentialParam {
                credential_type: credential.credential_type,
                signatures: credential
                    .signatures
                    .iter()
                    .map(|signature| hex::encode(&signature.signature))
                    .collect(),
            })
            .collect();

        let result: IssueResult = self
            .call(
                "avm.issueTx",
                json!({
                    "unsignedTx": hex::encode(&signed.unsigned.bytes),
                    "credentials": credentials,
                }),
            )
            .await?;
        Ok(result.tx_id)
    }
}
