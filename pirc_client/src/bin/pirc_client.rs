use pirc_client::{
    config::ClientConfig,
    interface::{run_session, Input, Interface},
};
use pirc_network::{config::load_config, event::EventRecord, tracing_config};

use async_trait::async_trait;
use serde_json::json;
use std::{io::Write, path::PathBuf, time::Duration};
use structopt::StructOpt;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
    task::JoinHandle,
};

#[derive(Debug, StructOpt)]
#[structopt(rename_all = "kebab")]
struct Opts {
    /// Config file location
    #[structopt(short, long, default_value = "pirc_client.conf")]
    config: PathBuf,
}

/// Reads commands from stdin, one per line, and writes events and feedback
/// to stdout as JSON objects, one per line.
struct JsonLines {
    lines: mpsc::Receiver<String>,
    reader_task: JoinHandle<()>,
    stdout: std::io::Stdout,
}

impl JsonLines {
    fn new() -> Self {
        let (send, lines) = mpsc::channel(16);
        let reader_task = tokio::spawn(async move {
            let mut stdin = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = stdin.next_line().await {
                if send.send(line).await.is_err() {
                    break;
                }
            }
        });

        Self {
            lines,
            reader_task,
            stdout: std::io::stdout(),
        }
    }

    fn write_line(&mut self, value: &serde_json::Value) {
        let mut out = self.stdout.lock();
        if let Err(e) = writeln!(out, "{}", value) {
            tracing::error!("Couldn't write output: {}", e);
        }
    }
}

#[async_trait]
impl Interface for JsonLines {
    fn show_events(&mut self, events: &[EventRecord]) {
        for event in events {
            match serde_json::to_value(event) {
                Ok(value) => self.write_line(&value),
                Err(e) => tracing::error!("Couldn't serialise event: {}", e),
            }
        }
    }

    fn notify(&mut self, message: &str) {
        self.write_line(&json!({ "notice": message }));
    }

    async fn next_input(&mut self, wait: Duration) -> Input {
        match tokio::time::timeout(wait, self.lines.recv()).await {
            Ok(Some(line)) => Input::Line(line),
            Ok(None) => Input::Closed,
            Err(_) => Input::Idle,
        }
    }

    fn teardown(&mut self) {
        self.reader_task.abort();
        let _ = self.stdout.flush();
    }
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let opts = Opts::from_args();

    let config: ClientConfig = load_config(&opts.config)?;
    tracing_config::init(config.log.clone())?;

    let tls = config.tls.load_from_disk()?;

    let mut interface = JsonLines::new();
    run_session(&mut interface, &config, &tls).await?;

    Ok(())
}
