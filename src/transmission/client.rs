use crate::error::RadionoiseError;
use crate::radionoise::config::TransmissionConfig;
use crate::radionoise::torrent::{DaemonClient, Torrent};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::cell::RefCell;
use std::time::Duration;

const SESSION_HEADER: &str = "X-Transmission-Session-Id";
const TORRENT_FIELDS: [&str; 6] = [
    "hashString",
    "name",
    "downloadDir",
    "percentDone",
    "status",
    "isFinished",
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcTorrent {
    hash_string: String,
    name: String,
    download_dir: String,
    #[serde(default)]
    percent_done: f64,
    status: i64,
    #[serde(default)]
    is_finished: bool,
}

impl TryFrom<RpcTorrent> for Torrent {
    type Error = RadionoiseError;

    fn try_from(raw: RpcTorrent) -> Result<Self, Self::Error> {
        Torrent::try_new(
            raw.hash_string,
            raw.name,
            raw.download_dir,
            raw.percent_done,
            raw.status,
            raw.is_finished,
        )
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct TorrentGetArguments {
    #[serde(default)]
    torrents: Vec<RpcTorrent>,
}

/// Blocking JSON-RPC client for the Transmission daemon.
#[derive(Debug)]
pub struct TransmissionClient {
    http: Client,
    url: String,
    username: Option<String>,
    password: Option<String>,
    session_id: RefCell<Option<String>>,
}

impl TransmissionClient {
    pub fn new(cfg: &TransmissionConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("failed to build transmission http client")?;
        tracing::info!("transmission at {}", cfg.url);
        Ok(Self {
            http,
            url: cfg.url.clone(),
            username: cfg.username.clone(),
            password: cfg.password.clone(),
            session_id: RefCell::new(None),
        })
    }

    fn post(&self, payload: &Value) -> Result<reqwest::blocking::Response> {
        let mut request = self.http.post(&self.url).json(payload);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }
        if let Some(session_id) = self.session_id.borrow().as_deref() {
            request = request.header(SESSION_HEADER, session_id);
        }
        request
            .send()
            .with_context(|| format!("failed to reach transmission at {}", self.url))
    }

    /// Sends one RPC call. A 409 carries a fresh session id; adopt it and
    /// send again once.
    fn call(&self, method: &str, arguments: Value) -> Result<Value> {
        let payload = json!({ "method": method, "arguments": arguments });

        let mut response = self.post(&payload)?;
        if response.status() == StatusCode::CONFLICT {
            let session_id = response
                .headers()
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(ToOwned::to_owned)
                .ok_or_else(|| {
                    RadionoiseError::Rpc(format!("409 without {SESSION_HEADER} header"))
                })?;
            tracing::debug!("adopting transmission session id");
            *self.session_id.borrow_mut() = Some(session_id);
            response = self.post(&payload)?;
        }

        let status = response.status();
        if !status.is_success() {
            return Err(RadionoiseError::Rpc(format!("{method} returned http {status}")).into());
        }

        let body: RpcResponse = response
            .json()
            .with_context(|| format!("invalid JSON from transmission {method}"))?;
        if body.result != "success" {
            return Err(RadionoiseError::Rpc(format!("{method}: {}", body.result)).into());
        }
        Ok(body.arguments)
    }

    fn torrent_get(&self, ids: Option<&str>) -> Result<Vec<RpcTorrent>> {
        let mut arguments = json!({ "fields": TORRENT_FIELDS });
        if let Some(hash) = ids {
            arguments["ids"] = json!([hash]);
        }
        let raw = self.call("torrent-get", arguments)?;
        let parsed: TorrentGetArguments =
            serde_json::from_value(raw).context("unexpected torrent-get arguments")?;
        Ok(parsed.torrents)
    }
}

impl DaemonClient for TransmissionClient {
    fn fetch_one(&self, hash: &str) -> Result<Option<Torrent>> {
        let found = self
            .torrent_get(Some(hash))?
            .into_iter()
            .find(|t| t.hash_string.eq_ignore_ascii_case(hash));
        match found {
            Some(raw) => Ok(Some(Torrent::try_from(raw)?)),
            None => Ok(None),
        }
    }

    fn fetch_all(&self) -> Result<Vec<Torrent>> {
        let mut out = Vec::new();
        for raw in self.torrent_get(None)? {
            match Torrent::try_from(raw) {
                Ok(torrent) => out.push(torrent),
                // Unclassifiable torrents are never purge candidates.
                Err(err) => tracing::warn!(error = %err, "ignoring torrent"),
            }
        }
        Ok(out)
    }
}
