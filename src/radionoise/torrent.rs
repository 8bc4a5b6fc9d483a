use crate::error::RadionoiseError;
use std::fmt;
use std::path::PathBuf;

/// Transmission's `status` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TorrentStatus {
    Stopped,
    CheckPending,
    Checking,
    DownloadPending,
    Downloading,
    SeedPending,
    Seeding,
}

impl TorrentStatus {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Stopped),
            1 => Some(Self::CheckPending),
            2 => Some(Self::Checking),
            3 => Some(Self::DownloadPending),
            4 => Some(Self::Downloading),
            5 => Some(Self::SeedPending),
            6 => Some(Self::Seeding),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::CheckPending => "check pending",
            Self::Checking => "checking",
            Self::DownloadPending => "download pending",
            Self::Downloading => "downloading",
            Self::SeedPending => "seed pending",
            Self::Seeding => "seeding",
        }
    }
}

impl fmt::Display for TorrentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a torrent as the daemon reports it.
#[derive(Debug, Clone, PartialEq)]
pub struct Torrent {
    pub hash: String,
    pub name: String,
    pub download_dir: String,
    pub percent_done: f64,
    pub status: TorrentStatus,
    /// Seed ratio target reached.
    pub is_finished: bool,
}

impl Torrent {
    pub fn try_new(
        hash: String,
        name: String,
        download_dir: String,
        percent_done: f64,
        status_code: i64,
        is_finished: bool,
    ) -> Result<Self, RadionoiseError> {
        let status = TorrentStatus::from_code(status_code).ok_or_else(|| {
            RadionoiseError::UnknownStatus {
                hash: hash.clone(),
                code: status_code,
            }
        })?;
        Ok(Self {
            hash,
            name,
            download_dir,
            percent_done,
            status,
            is_finished,
        })
    }

    /// `download_dir/name`, where the daemon keeps the content. Names that
    /// would escape `download_dir` are refused.
    pub fn content_path(&self) -> Result<PathBuf, RadionoiseError> {
        let name = self.name.as_str();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\0']) {
            return Err(RadionoiseError::UnsafeName {
                hash: self.hash.clone(),
                name: self.name.clone(),
            });
        }
        Ok(PathBuf::from(&self.download_dir).join(name))
    }

    /// Seed target reached, or no longer active on the daemon.
    pub fn is_done(&self) -> bool {
        self.is_finished || self.status == TorrentStatus::Stopped
    }
}

/// Read access to the torrent daemon.
pub trait DaemonClient {
    fn fetch_one(&self, hash: &str) -> anyhow::Result<Option<Torrent>>;
    fn fetch_all(&self) -> anyhow::Result<Vec<Torrent>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn torrent(status: i64, finished: bool) -> Torrent {
        Torrent::try_new(
            "abc123".into(),
            "Show".into(),
            "/data/anime".into(),
            1.0,
            status,
            finished,
        )
        .expect("known status")
    }

    #[test]
    fn all_transmission_codes_decode() {
        let names = (0..=6)
            .map(|code| TorrentStatus::from_code(code).expect("known").as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                "stopped",
                "check pending",
                "checking",
                "download pending",
                "downloading",
                "seed pending",
                "seeding"
            ]
        );
    }

    #[test]
    fn unknown_codes_are_rejected() {
        assert_eq!(TorrentStatus::from_code(7), None);
        assert_eq!(TorrentStatus::from_code(-1), None);
        let err = Torrent::try_new("h".into(), "n".into(), "/d".into(), 0.0, 42, false)
            .expect_err("code 42");
        assert!(matches!(
            err,
            RadionoiseError::UnknownStatus { code: 42, .. }
        ));
    }

    #[test]
    fn done_means_finished_or_stopped() {
        assert!(torrent(6, true).is_done());
        assert!(torrent(0, false).is_done());
        assert!(!torrent(6, false).is_done());
        assert!(!torrent(4, false).is_done());
    }

    #[test]
    fn content_path_joins_dir_and_name() {
        assert_eq!(
            torrent(0, false).content_path().expect("safe"),
            PathBuf::from("/data/anime/Show")
        );
    }

    #[test]
    fn names_escaping_download_dir_are_refused() {
        for name in ["", ".", "..", "/etc", "a/../../b"] {
            let mut t = torrent(0, false);
            t.name = name.to_string();
            assert!(
                matches!(t.content_path(), Err(RadionoiseError::UnsafeName { .. })),
                "{name:?} accepted"
            );
        }
        let mut t = torrent(0, false);
        t.name = "[Group] Show..v2".to_string();
        assert!(t.content_path().is_ok());
    }
}
