//! Transaction-hash providers.
//!
//! [`EtherscanSource`] pulls real hashes from the Etherscan v2 proxy API;
//! [`PseudoHashSource`] fabricates well-formed ones for offline use. Both
//! sit behind [`HashSource`] so the refresh loop never cares which it has.

use serde::Deserialize;

use crate::error::{FlapError, FlapResult};
use crate::rng::Lcg;
use crate::stream;

/// Something that can produce a batch of candidate transaction hashes.
pub trait HashSource: Send {
    /// Fetches hashes from the newest block plus up to `history` blocks
    /// before it. The returned strings are raw; normalization happens when
    /// the stream is built.
    fn fetch_latest(&mut self, history: usize) -> FlapResult<Vec<String>>;
}

const ETHERSCAN_BASE: &str = "https://api.etherscan.io/v2/api";

#[derive(Debug, Deserialize)]
struct ProxyEnvelope {
    status: Option<String>,
    message: Option<String>,
    result: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct BlockResult {
    transactions: Option<Vec<BlockTx>>,
}

/// `boolean=false` responses carry bare hash strings; `boolean=true` carries
/// full transaction objects. Accept both.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BlockTx {
    Hash(String),
    Object { hash: Option<String> },
}

impl BlockTx {
    fn hash(&self) -> Option<&str> {
        match self {
            BlockTx::Hash(h) => Some(h),
            BlockTx::Object { hash } => hash.as_deref(),
        }
    }
}

/// Live source backed by the Etherscan v2 proxy endpoints for mainnet.
pub struct EtherscanSource {
    client: reqwest::blocking::Client,
    api_key: Option<String>,
}

impl EtherscanSource {
    /// Reads `ETHERSCAN_API_KEY` once; an unset or blank key means
    /// unauthenticated (rate-limited) requests.
    pub fn from_env() -> FlapResult<Self> {
        let api_key = std::env::var("ETHERSCAN_API_KEY")
            .ok()
            .map(|k| k.trim().to_owned())
            .filter(|k| !k.is_empty());
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| FlapError::network(format!("build http client: {e}")))?;
        Ok(Self { client, api_key })
    }

    fn get(&self, action: &str, extra: &str) -> FlapResult<ProxyEnvelope> {
        let mut url = format!("{ETHERSCAN_BASE}?chainid=1&module=proxy&action={action}{extra}");
        if let Some(key) = &self.api_key {
            url.push_str("&apikey=");
            url.push_str(key);
        }
        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| FlapError::network(format!("{action} request failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(FlapError::network(format!(
                "{action} failed with HTTP {}",
                resp.status()
            )));
        }
        let envelope: ProxyEnvelope = resp
            .json()
            .map_err(|e| FlapError::network(format!("{action} response parse failed: {e}")))?;
        // Proxy errors come back as status "0" with a message.
        if envelope.status.as_deref() == Some("0") {
            if let Some(msg) = &envelope.message {
                let detail = envelope
                    .result
                    .as_ref()
                    .and_then(|r| r.as_str())
                    .unwrap_or(msg);
                return Err(FlapError::network(format!("{action}: {detail}")));
            }
        }
        Ok(envelope)
    }

    fn block_hashes(&self, tag: &str) -> FlapResult<Vec<String>> {
        let envelope = self.get(
            "eth_getBlockByNumber",
            &format!("&tag={tag}&boolean=true"),
        )?;
        let Some(result) = envelope.result else {
            return Ok(Vec::new());
        };
        let block: BlockResult = serde_json::from_value(result)
            .map_err(|e| FlapError::network(format!("block payload parse failed: {e}")))?;
        let hashes = block
            .transactions
            .unwrap_or_default()
            .iter()
            .filter_map(|tx| tx.hash())
            .filter_map(stream::normalize_hash)
            .collect();
        Ok(hashes)
    }

    fn latest_block_number(&self) -> FlapResult<u64> {
        let envelope = self.get("eth_blockNumber", "")?;
        let hex = envelope
            .result
            .as_ref()
            .and_then(|r| r.as_str())
            .and_then(|s| s.strip_prefix("0x"))
            .ok_or_else(|| FlapError::network("missing latest block number"))?;
        u64::from_str_radix(hex, 16)
            .map_err(|e| FlapError::network(format!("bad block number: {e}")))
    }
}

impl HashSource for EtherscanSource {
    fn fetch_latest(&mut self, history: usize) -> FlapResult<Vec<String>> {
        let mut combined = self.block_hashes("latest")?;

        // History is best-effort: the latest block alone is a usable batch.
        match self.latest_block_number() {
            Ok(latest) => {
                for i in 1..=history as u64 {
                    let Some(n) = latest.checked_sub(i).filter(|&n| n > 0) else {
                        break;
                    };
                    match self.block_hashes(&format!("0x{n:x}")) {
                        Ok(mut more) => combined.append(&mut more),
                        Err(err) => {
                            tracing::warn!(block = n, %err, "skipping history block");
                            break;
                        }
                    }
                }
            }
            Err(err) => tracing::warn!(%err, "history fetch skipped"),
        }

        if combined.is_empty() {
            return Err(FlapError::network("no transaction hashes returned"));
        }
        Ok(combined)
    }
}

/// Deterministic offline source producing syntactically valid pseudo hashes.
pub struct PseudoHashSource {
    rng: Lcg,
    per_batch: usize,
}

impl PseudoHashSource {
    pub fn new(seed: u32, per_batch: usize) -> Self {
        Self {
            rng: Lcg::with_seed(seed),
            per_batch: per_batch.max(1),
        }
    }
}

impl HashSource for PseudoHashSource {
    fn fetch_latest(&mut self, _history: usize) -> FlapResult<Vec<String>> {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut out = Vec::with_capacity(self.per_batch);
        for _ in 0..self.per_batch {
            let mut h = String::with_capacity(66);
            h.push_str("0x");
            for _ in 0..64 {
                let d = (self.rng.next_f64() * 16.0) as usize % 16;
                h.push(HEX[d] as char);
            }
            out.push(h);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::HashStream;

    #[test]
    fn pseudo_source_yields_normalizable_hashes() {
        let mut source = PseudoHashSource::new(9, 12);
        let batch = source.fetch_latest(2).unwrap();
        assert_eq!(batch.len(), 12);
        for h in &batch {
            assert!(stream::normalize_hash(h).is_some(), "bad pseudo hash {h}");
        }
        let built = HashStream::build(&batch);
        assert!(!built.is_empty());
    }

    #[test]
    fn pseudo_source_is_seed_deterministic() {
        let a = PseudoHashSource::new(41, 4).fetch_latest(0).unwrap();
        let b = PseudoHashSource::new(41, 4).fetch_latest(0).unwrap();
        let c = PseudoHashSource::new(42, 4).fetch_latest(0).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn block_tx_accepts_both_shapes() {
        let json = r#"[
            "0xAA",
            { "hash": "0xBB", "from": "0x0" },
            { "from": "0x0" }
        ]"#;
        let txs: Vec<BlockTx> = serde_json::from_str(json).unwrap();
        let hashes: Vec<_> = txs.iter().filter_map(BlockTx::hash).collect();
        assert_eq!(hashes, vec!["0xAA", "0xBB"]);
    }

    #[test]
    fn proxy_error_envelope_parses() {
        let json = r#"{ "status": "0", "message": "NOTOK", "result": "rate limited" }"#;
        let env: ProxyEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(env.status.as_deref(), Some("0"));
        assert_eq!(env.result.unwrap().as_str(), Some("rate limited"));
    }
}
