//! Accelerated engine reached as a child process speaking [`protocol`](super::protocol).

use std::{
    env,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::{io::AsyncWriteExt, process::Command, time::timeout};
use tracing::{debug, warn};

use crate::{
    error::EngineError,
    models::{AnomalySignal, InsiderSellRecord, QuarterlyTrend},
    signals::{
        protocol::{
            AnomalyRequest, AnomalyResponse, EngineCommand, TrendRequest, TrendResponse,
            ENGINE_BIN_NAME,
        },
        AnomalyParams, SignalEngine,
    },
};

#[derive(Debug, Clone)]
pub struct ProcessEngine {
    path: PathBuf,
    timeout: Duration,
}

impl ProcessEngine {
    pub fn new(path: PathBuf, timeout: Duration) -> Self {
        Self { path, timeout }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn call<Req, Resp>(&self, command: EngineCommand, request: &Req) -> Result<Resp, EngineError>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_vec(request)?;
        let mut child = Command::new(&self.path)
            .arg(command.as_arg())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                path: self.path.clone(),
                source,
            })?;

        let mut stdin = child.stdin.take().ok_or(EngineError::Unavailable)?;
        let writer = tokio::spawn(async move {
            stdin.write_all(&payload).await?;
            stdin.shutdown().await
        });

        let output = timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| EngineError::Timeout(self.timeout))??;

        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => debug!(%err, "engine closed stdin early"),
            Err(err) => warn!(%err, "engine stdin writer panicked"),
        }

        if !output.status.success() {
            return Err(EngineError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(serde_json::from_slice(&output.stdout)?)
    }
}

#[async_trait]
impl SignalEngine for ProcessEngine {
    fn name(&self) -> &'static str {
        "process"
    }

    async fn anomaly_signals(
        &self,
        records: &[InsiderSellRecord],
        params: &AnomalyParams,
    ) -> Result<Vec<AnomalySignal>, EngineError> {
        let request = AnomalyRequest {
            records: records.into(),
            params: *params,
        };
        let response: AnomalyResponse = self.call(EngineCommand::Anomaly, &request).await?;
        Ok(response.signals)
    }

    async fn quarterly_trend(&self, closes: &[f64]) -> Result<Option<QuarterlyTrend>, EngineError> {
        let request = TrendRequest {
            closes: closes.into(),
        };
        let response: TrendResponse = self.call(EngineCommand::Trend, &request).await?;
        Ok(response.trend)
    }
}

/// Find the engine binary.
///
/// An explicit path is used only when it is absolute and names a regular file.
/// Otherwise the directory of the running executable, `./bin` and
/// `./target/release` are searched in that order.
pub fn locate_engine(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.is_absolute() && path.is_file() {
            return Some(path.to_path_buf());
        }
        warn!(path = %path.display(), "ignoring engine path: not an absolute path to a file");
    }

    let file_name = format!("{ENGINE_BIN_NAME}{}", env::consts::EXE_SUFFIX);
    let mut candidates = Vec::new();
    if let Some(dir) = env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf)) {
        candidates.push(dir.join(&file_name));
    }
    if let Ok(cwd) = env::current_dir() {
        candidates.push(cwd.join("bin").join(&file_name));
        candidates.push(cwd.join("target").join("release").join(&file_name));
    }
    candidates.into_iter().find(|candidate| candidate.is_file())
}
