use thiserror::Error;

/// Conditions that abort a run. Everything else travels as `anyhow::Error`
/// with context attached at the call site.
#[derive(Debug, Error)]
pub enum RadionoiseError {
    #[error("you must pass a hash in $TR_TORRENT_HASH or as a parameter")]
    MissingTorrentHash,
    #[error("torrent hash {0} not found")]
    TorrentNotFound(String),
    #[error("torrent {name} is not in scope (download dir {download_dir} lacks `{marker}`)")]
    OutOfScope {
        name: String,
        download_dir: String,
        marker: String,
    },
    #[error("torrent {hash} has a name that escapes its download dir: {name:?}")]
    UnsafeName { hash: String, name: String },
    #[error("torrent {hash} reported unrecognised status code {code}")]
    UnknownStatus { hash: String, code: i64 },
    #[error("transmission rpc failed: {0}")]
    Rpc(String),
    #[error("config file invalid or unreadable: {0}")]
    InvalidConfig(String),
}

impl RadionoiseError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingTorrentHash => "E001_MISSING_HASH",
            Self::TorrentNotFound(_) => "E002_NOT_FOUND",
            Self::OutOfScope { .. } => "E003_OUT_OF_SCOPE",
            Self::UnsafeName { .. } => "E004_UNSAFE_NAME",
            Self::UnknownStatus { .. } => "E005_UNKNOWN_STATUS",
            Self::Rpc(_) => "E006_RPC",
            Self::InvalidConfig(_) => "E007_CONFIG",
        }
    }
}
