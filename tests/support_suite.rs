use std::ffi::OsStr;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::path::Path;
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, mpsc};
use std::thread;
use std::time::Duration;

/// Request lines (`METHOD /path`) seen by the test server, in arrival order.
pub type RequestLog = Arc<Mutex<Vec<String>>>;

pub struct ServerHandle {
    shutdown: mpsc::Sender<()>,
    thread: Option<thread::JoinHandle<()>>,
    requests: RequestLog,
}

impl ServerHandle {
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _send_result = self.shutdown.send(());
        if let Some(handle) = self.thread.take() {
            drop(handle.join());
        }
    }
}

/// Spawn a small JSON API for suite runs.
///
/// Routes:
/// - `GET /health` answers 200.
/// - `POST /orders` answers 201 with `{"id":"ord-1"}` every time.
/// - `GET /orders/ord-1` answers 200 with the order.
/// - `GET /flaky` answers 503 on every odd request and 200 otherwise.
/// - everything else answers 404.
///
/// # Errors
///
/// Returns an error if the listener cannot be created or configured.
pub fn spawn_api_server() -> Result<(String, ServerHandle), String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("bind test server failed: {}", err))?;
    let addr = listener
        .local_addr()
        .map_err(|err| format!("server addr failed: {}", err))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| format!("set_nonblocking failed: {}", err))?;

    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    let requests: RequestLog = Arc::new(Mutex::new(Vec::new()));
    let flaky_hits = Arc::new(AtomicUsize::new(0));

    let log = Arc::clone(&requests);
    let handle = thread::spawn(move || {
        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }

            match listener.accept() {
                Ok((stream, _)) => {
                    let log = Arc::clone(&log);
                    let flaky_hits = Arc::clone(&flaky_hits);
                    thread::spawn(move || handle_client(stream, &log, &flaky_hits));
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(10));
                }
                Err(_) => break,
            }
        }
    });

    Ok((
        format!("http://{}", addr),
        ServerHandle {
            shutdown: shutdown_tx,
            thread: Some(handle),
            requests,
        },
    ))
}

fn handle_client(stream: TcpStream, log: &RequestLog, flaky_hits: &AtomicUsize) {
    if stream.set_nonblocking(false).is_err() {
        return;
    }
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        match reader.read_line(&mut header) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':')
            && name.eq_ignore_ascii_case("content-length")
        {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }
    let mut body = vec![0u8; content_length];
    if reader.read_exact(&mut body).is_err() {
        return;
    }

    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_owned();
    let path = parts.next().unwrap_or_default().to_owned();
    log.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(format!("{} {}", method, path));

    let (status, payload) = match (method.as_str(), path.as_str()) {
        ("GET", "/health") => ("200 OK", r#"{"status":"ok"}"#),
        ("POST", "/orders") => ("201 Created", r#"{"id":"ord-1","state":"open"}"#),
        ("GET", "/orders/ord-1") => ("200 OK", r#"{"id":"ord-1","state":"open"}"#),
        ("GET", "/flaky") => {
            let hit = flaky_hits.fetch_add(1, Ordering::SeqCst);
            if hit % 2 == 0 {
                ("503 Service Unavailable", r#"{"error":"warming up"}"#)
            } else {
                ("200 OK", r#"{"status":"ok"}"#)
            }
        }
        _ => ("404 Not Found", r#"{"error":"not found"}"#),
    };

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        payload.len(),
        payload
    );
    let mut stream = reader.into_inner();
    if stream.write_all(response.as_bytes()).is_err() {
        return;
    }
    if stream.flush().is_err() {
        return;
    }
    drop(stream.shutdown(Shutdown::Both));
}

/// Run the `goldrun` binary from `cwd` and capture output.
///
/// # Errors
///
/// Returns an error if the binary cannot be executed.
pub fn run_goldrun<I, S>(cwd: &Path, args: I) -> Result<Output, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = goldrun_bin()?;
    Command::new(bin)
        .current_dir(cwd)
        .args(args)
        .env("RUST_LOG", "error")
        .env_remove("GOLDRUN_LOG")
        .env_remove("GOLDRUN_BASE_URL")
        .env_remove("GOLDRUN_SUITES_DIR")
        .env_remove("GOLDRUN_SUITE_ENDPOINT")
        .env_remove("GOLDRUN_ARTIFACTS_DIR")
        .env_remove("GOLDRUN_NO_ARTIFACTS")
        .env_remove("GOLDRUN_ALLOW_INSECURE")
        .output()
        .map_err(|err| format!("run goldrun failed: {}", err))
}

fn goldrun_bin() -> Result<String, String> {
    option_env!("CARGO_BIN_EXE_goldrun").map_or_else(
        || Err("CARGO_BIN_EXE_goldrun missing at compile time.".to_owned()),
        |path| Ok(path.to_owned()),
    )
}
