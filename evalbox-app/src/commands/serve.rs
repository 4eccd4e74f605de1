//! JSON-lines request loop: one request object per stdin line, one reply per
//! stdout line. Replies are written as calls finish, so they may come back out
//! of order; match them by `id`.

use anyhow::Result;
use crate::config::Config;
use evalbox_tools::ToolDispatcherImpl;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct ServeRequest {
    #[serde(default)]
    pub id: Value,
    pub tool: String,
    #[serde(default = "empty_object")]
    pub input: Value,
    #[serde(default)]
    pub requester: Option<String>,
}

fn empty_object() -> Value {
    json!({})
}

pub async fn run(config: &Config) -> Result<()> {
    let dispatcher = Arc::new(super::build_dispatcher(config)?);
    info!(
        "Serving {} tools on stdin/stdout",
        dispatcher.registry().count()
    );

    let (tx, mut rx) = mpsc::channel::<String>(64);
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(line) = rx.recv().await {
            if stdout.write_all(line.as_bytes()).await.is_err()
                || stdout.write_all(b"\n").await.is_err()
                || stdout.flush().await.is_err()
            {
                warn!("stdout closed, dropping replies");
                break;
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight = JoinSet::new();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let dispatcher = dispatcher.clone();
        let tx = tx.clone();
        in_flight.spawn(async move {
            let reply = handle_line(&dispatcher, &line).await;
            let _ = tx.send(reply.to_string()).await;
        });
    }

    while in_flight.join_next().await.is_some() {}
    dispatcher.flush().await;
    drop(tx);
    let _ = writer.await;
    Ok(())
}

pub async fn handle_line(dispatcher: &ToolDispatcherImpl, line: &str) -> Value {
    let request: ServeRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            return json!({"id": Value::Null, "ok": false, "error": format!("invalid request: {}", e)});
        }
    };

    let requester = request.requester.unwrap_or_else(|| "anonymous".to_string());
    match dispatcher
        .dispatch(requester, request.tool, request.input)
        .await
    {
        Ok(result) => json!({"id": request.id, "ok": true, "result": result}),
        Err(e) => json!({"id": request.id, "ok": false, "error": e.to_string()}),
    }
}
