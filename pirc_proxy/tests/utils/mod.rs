#![allow(dead_code)]

use pirc_network::{
    config::{TlsConfig, TlsData},
    rpc::{RpcFault, RpcRequest},
};
use pirc_proxy::{config::ConnectPolicy, coordinator::ProxyCoordinator, dispatch::Caller};

use serde_json::Value;
use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    select,
    sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    task::JoinHandle,
};

enum Inject {
    Line(String),
    Close,
}

/// Just enough of an IRC server to register clients, echo joins and parts,
/// and let a test push arbitrary lines at whoever is connected.
pub struct FakeIrcServer {
    port: u16,
    received: UnboundedReceiver<String>,
    clients: Arc<Mutex<Vec<UnboundedSender<Inject>>>>,
    task: JoinHandle<()>,
}

impl FakeIrcServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (lines_send, received) = unbounded_channel();
        let clients = Arc::new(Mutex::new(Vec::new()));

        let task_clients = Arc::clone(&clients);
        let task = tokio::spawn(async move {
            while let Ok((conn, _)) = listener.accept().await {
                let (inject_send, inject_recv) = unbounded_channel();
                task_clients.lock().unwrap().push(inject_send);
                tokio::spawn(serve_client(conn, lines_send.clone(), inject_recv));
            }
        });

        Self {
            port,
            received,
            clients,
            task,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Wait for the next received line that starts with `prefix`, discarding
    /// any others before it
    pub async fn expect_line(&mut self, prefix: &str) -> String {
        let received = &mut self.received;
        tokio::time::timeout(Duration::from_secs(5), async move {
            loop {
                let line = received.recv().await.expect("fake server stopped");
                if line.starts_with(prefix) {
                    return line;
                }
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {:?}", prefix))
    }

    /// Send a raw line to every connected client
    pub fn broadcast(&self, line: &str) {
        for client in self.clients.lock().unwrap().iter() {
            let _ = client.send(Inject::Line(line.to_string()));
        }
    }

    /// Drop every client connection
    pub fn close_all(&self) {
        for client in self.clients.lock().unwrap().drain(..) {
            let _ = client.send(Inject::Close);
        }
    }
}

impl Drop for FakeIrcServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_client(conn: TcpStream, lines: UnboundedSender<String>, mut inject: UnboundedReceiver<Inject>) {
    let (reader, mut writer) = conn.into_split();
    let mut reader = BufReader::new(reader).lines();
    let mut nick = "*".to_string();

    loop {
        let line = select! {
            line = reader.next_line() => match line {
                Ok(Some(line)) => line,
                _ => return,
            },
            injected = inject.recv() => match injected {
                Some(Inject::Line(line)) => {
                    if writer.write_all(format!("{}\r\n", line).as_bytes()).await.is_err() {
                        return;
                    }
                    continue;
                }
                Some(Inject::Close) | None => return,
            },
        };

        let _ = lines.send(line.clone());

        let mut parts = line.splitn(2, ' ');
        let command = parts.next().unwrap_or_default();
        let rest = parts.next().unwrap_or_default().to_string();

        let reply = match command {
            "NICK" => {
                nick = rest;
                None
            }
            "USER" => Some(format!(
                ":fake.irc 001 {0} :Welcome to the fake network {0}\r\n\
                 :fake.irc 375 {0} :- fake.irc Message of the day -\r\n\
                 :fake.irc 372 {0} :- Be nice\r\n\
                 :fake.irc 376 {0} :End of /MOTD command.\r\n",
                nick
            )),
            "JOIN" => Some(format!(
                ":{0}!~{0}@localhost JOIN {1}\r\n\
                 :fake.irc 353 {0} = {1} :{0}\r\n\
                 :fake.irc 366 {0} {1} :End of /NAMES list.\r\n",
                nick, rest
            )),
            "PART" => {
                let channel = rest.split(' ').next().unwrap_or_default();
                Some(format!(":{0}!~{0}@localhost PART {1}\r\n", nick, channel))
            }
            "QUIT" => {
                let _ = writer.write_all(b"ERROR :Closing link\r\n").await;
                return;
            }
            _ => None,
        };

        if let Some(reply) = reply {
            if writer.write_all(reply.as_bytes()).await.is_err() {
                return;
            }
        }
    }
}

pub fn fast_policy() -> ConnectPolicy {
    ConnectPolicy {
        attempts: 2,
        retry_delay_ms: 10,
    }
}

pub fn coordinator() -> ProxyCoordinator {
    ProxyCoordinator::new(fast_policy())
}

pub async fn call(coordinator: &mut ProxyCoordinator, method: &str, params: Vec<Value>) -> Result<Value, RpcFault> {
    coordinator
        .handle_request(&RpcRequest::new(1, method, params))
        .await
        .into_result()
}

pub async fn call_local(coordinator: &mut ProxyCoordinator, method: &str, params: Vec<Value>) -> Result<Value, RpcFault> {
    coordinator
        .handle(Caller::Local, &RpcRequest::new(1, method, params))
        .await
        .into_result()
}

pub fn fault_code(result: Result<Value, RpcFault>) -> i32 {
    match result {
        Ok(value) => panic!("expected a fault, got {}", value),
        Err(fault) => fault.code,
    }
}

/// Give IRC traffic a moment to arrive, and process it
pub async fn settle(coordinator: &mut ProxyCoordinator) {
    for _ in 0..10 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        coordinator.process_pending_irc_events();
    }
}

pub fn kinds(events: &Value) -> Vec<String> {
    events
        .as_array()
        .expect("events should be a list")
        .iter()
        .map(|e| e["type"].as_str().unwrap_or_default().to_string())
        .collect()
}

/// Whether `wanted` appears within `kinds` in order, not necessarily adjacent
pub fn in_order(kinds: &[String], wanted: &[&str]) -> bool {
    let mut wanted = wanted.iter().peekable();
    for kind in kinds {
        if wanted.peek().map_or(false, |w| **w == kind.as_str()) {
            wanted.next();
        }
    }
    wanted.peek().is_none()
}

pub fn cert_dir() -> PathBuf {
    [env!("CARGO_MANIFEST_DIR"), "..", "pirc_network", "tests", "data", "certs"]
        .iter()
        .collect()
}

pub fn tls_data(identity: &str, trusted: &str) -> TlsData {
    let dir = cert_dir();
    TlsConfig {
        cert_file: dir.join(format!("{}.pem", identity)),
        key_file: Some(dir.join(format!("{}.key", identity))),
        trusted_certs_file: dir.join(trusted),
    }
    .load_from_disk()
    .expect("failed to load test certificates")
}
