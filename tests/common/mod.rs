#![allow(dead_code)]

use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;

const SESSION_ID: &str = "fake-session-1";

/// Minimal Transmission RPC endpoint. The first request on each connection
/// without a session id gets the 409 handshake; after that every
/// `torrent-get` returns `torrents`.
pub struct FakeTransmission {
    pub url: String,
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl FakeTransmission {
    pub fn start(torrents: serde_json::Value) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake transmission");
        let addr = listener.local_addr().expect("local addr");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                handle(stream, &torrents, &seen);
            }
        });

        Self {
            url: format!("http://{addr}/transmission/rpc"),
            requests,
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }
}

fn handle(stream: TcpStream, torrents: &serde_json::Value, seen: &Mutex<Vec<String>>) {
    let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
    let mut content_length = 0usize;
    let mut has_session = false;

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            return;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_ascii_lowercase();
            if name == "content-length" {
                content_length = value.trim().parse().unwrap_or(0);
            } else if name == "x-transmission-session-id" && value.trim() == SESSION_ID {
                has_session = true;
            }
        }
    }

    let mut body = vec![0u8; content_length];
    if reader.read_exact(&mut body).is_err() {
        return;
    }

    let mut stream = stream;
    if !has_session {
        let response = format!(
            "HTTP/1.1 409 Conflict\r\nX-Transmission-Session-Id: {SESSION_ID}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
        );
        let _ = stream.write_all(response.as_bytes());
        return;
    }

    seen.lock()
        .expect("requests lock")
        .push(String::from_utf8_lossy(&body).into_owned());
    let payload = serde_json::json!({
        "arguments": { "torrents": torrents },
        "result": "success"
    })
    .to_string();
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        payload.len(),
        payload
    );
    let _ = stream.write_all(response.as_bytes());
}

pub fn torrent_json(hash: &str, name: &str, download_dir: &Path, status: i64) -> serde_json::Value {
    serde_json::json!({
        "hashString": hash,
        "name": name,
        "downloadDir": download_dir.to_string_lossy(),
        "percentDone": 1.0,
        "status": status,
        "isFinished": status == 0,
    })
}

/// Sorting program stand-in: appends each argument it receives to `log`.
pub fn write_fake_sorter(bin_path: &Path, log: &Path) {
    let script = format!(
        "#!/usr/bin/env bash\nfor arg in \"$@\"; do printf '%s\\n' \"$arg\" >> '{}'; done\nexit 0\n",
        log.display()
    );
    fs::write(bin_path, script).expect("write fake sorter");
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(bin_path).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(bin_path, perms).expect("chmod");
    }
}

pub struct Workspace {
    pub root: PathBuf,
    pub downloads: PathBuf,
    pub unsorted: PathBuf,
    pub database: PathBuf,
    pub sorter: PathBuf,
    pub sorter_log: PathBuf,
}

impl Workspace {
    pub fn new(root: &Path) -> Self {
        let ws = Self {
            root: root.to_path_buf(),
            downloads: root.join("downloads"),
            unsorted: root.join("unsorted"),
            database: root.join("state/torrents.json"),
            sorter: root.join("fake-sorter"),
            sorter_log: root.join("sorter.log"),
        };
        fs::create_dir_all(ws.downloads.join("anime")).expect("mkdir anime");
        fs::create_dir_all(ws.downloads.join("movies")).expect("mkdir movies");
        write_fake_sorter(&ws.sorter, &ws.sorter_log);
        ws
    }

    pub fn write_download(&self, relative: &str) -> PathBuf {
        let path = self.downloads.join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, b"video").expect("write download");
        path
    }

    pub fn sorter_calls(&self) -> Vec<String> {
        fs::read_to_string(&self.sorter_log)
            .unwrap_or_default()
            .lines()
            .map(ToOwned::to_owned)
            .collect()
    }

    pub fn records(&self) -> serde_json::Value {
        let raw = fs::read_to_string(&self.database).expect("read record store");
        serde_json::from_str(&raw).expect("record store json")
    }

    pub fn command(&self, transmission_url: &str) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("radionoise");
        cmd.current_dir(&self.root)
            .env_remove("TR_TORRENT_HASH")
            .env_remove("RUST_LOG")
            .env("RADIONOISE_HOME", &self.root)
            .env("RADIONOISE_CONFIG_PATH", self.root.join("absent.toml"))
            .env("RADIONOISE_TRANSMISSION_URL", transmission_url)
            .env("RADIONOISE_TRANSMISSION_TIMEOUT_SECS", "5")
            .env("RADIONOISE_DATABASE_PATH", &self.database)
            .env("RADIONOISE_UNSORTED_DIR", &self.unsorted)
            .env("RADIONOISE_SORTER_COMMAND", &self.sorter);
        cmd
    }
}
