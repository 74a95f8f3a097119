//! Purpose: Shared harness for tests that talk to a spawned `catalog serve`.
//! Exports: `TestServer`, `TestResult`, `seed_file`, `cmd`.
//! Role: Start a loopback mock server on a free port with a known record set.
//! Invariants: Servers are started one at a time and killed on drop.
//! Invariants: Bounded waits avoid test flakiness.
#![allow(dead_code)]

use serde_json::{Value, json};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, MutexGuard};
use std::thread::sleep;
use std::time::{Duration, Instant};

pub type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

static SERVER_LOCK: Mutex<()> = Mutex::new(());

pub fn cmd() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_catalog"));
    for key in [
        "CATALOG_BASE_URL",
        "CATALOG_RESOURCE",
        "CATALOG_TIMEOUT_MS",
        "CATALOG_FETCH_LIMIT",
        "CATALOG_PAGE_LIMIT",
    ] {
        command.env_remove(key);
    }
    command.env("RUST_LOG", "warn");
    command
}

/// Records with distinct dates so date ordering is unambiguous.
pub fn sample_records() -> Value {
    json!([
        {"id": 1, "userId": 1, "title": "Banana bread", "body": "yellow", "createdAt": "2024-01-02T00:00:00Z"},
        {"id": 2, "userId": 1, "title": "apple pie", "body": "green", "createdAt": "2024-01-01T00:00:00Z"},
        {"id": 3, "userId": 2, "title": "Cherry tart", "body": "red", "createdAt": "2024-02-10T00:00:00Z"},
        {"id": 4, "userId": 2, "title": "Date loaf", "body": "brown"}
    ])
}

pub fn seed_file(records: &Value) -> TestResult<tempfile::NamedTempFile> {
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(serde_json::to_string(records)?.as_bytes())?;
    file.flush()?;
    Ok(file)
}

pub struct TestServer {
    child: Child,
    pub base_url: String,
    _seed: tempfile::NamedTempFile,
    _server_guard: MutexGuard<'static, ()>,
}

impl TestServer {
    pub fn start() -> TestResult<Self> {
        Self::start_with(&sample_records())
    }

    pub fn start_with(records: &Value) -> TestResult<Self> {
        let guard = SERVER_LOCK
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        let seed = seed_file(records)?;
        let mut last_err: Option<Box<dyn std::error::Error>> = None;
        for _attempt in 0..3 {
            let port = pick_port()?;
            let bind = format!("127.0.0.1:{port}");

            let mut child = cmd()
                .arg("serve")
                .arg("--bind")
                .arg(&bind)
                .arg("--seed-file")
                .arg(seed.path())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .spawn()?;

            match wait_for_server(&mut child, bind.parse()?) {
                Ok(()) => {
                    return Ok(Self {
                        child,
                        base_url: format!("http://{bind}"),
                        _seed: seed,
                        _server_guard: guard,
                    });
                }
                Err(err) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    last_err = Some(err);
                    sleep(Duration::from_millis(30));
                }
            }
        }
        Err(last_err.unwrap_or_else(|| "server failed to start".into()))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub fn pick_port() -> TestResult<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

/// A loopback port with nothing listening on it.
pub fn closed_base_url() -> TestResult<String> {
    Ok(format!("http://127.0.0.1:{}", pick_port()?))
}

fn wait_for_server(child: &mut Child, addr: SocketAddr) -> TestResult<()> {
    let deadline = Instant::now() + Duration::from_secs(8);
    let url = format!("http://{addr}/healthz");
    while Instant::now() < deadline {
        if let Some(status) = child.try_wait()? {
            let mut stderr = String::new();
            if let Some(mut pipe) = child.stderr.take() {
                let _ = pipe.read_to_string(&mut stderr);
            }
            return Err(format!("server exited with {status}: {stderr}").into());
        }
        if ureq::get(&url).call().is_ok() {
            return Ok(());
        }
        sleep(Duration::from_millis(20));
    }
    Err("server did not become ready".into())
}
