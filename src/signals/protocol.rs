//! JSON messages exchanged with the `insider-engine` binary over stdin/stdout.
//!
//! One request document in, one response document out. The first command-line
//! argument picks the computation: `anomaly` (default) or `trend`.

use std::{
    borrow::Cow,
    io::{Read, Write},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::EngineError,
    models::{AnomalySignal, InsiderSellRecord, QuarterlyTrend},
    signals::{columnar, AnomalyParams},
};

pub const ENGINE_BIN_NAME: &str = "insider-engine";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyRequest<'a> {
    pub records: Cow<'a, [InsiderSellRecord]>,
    pub params: AnomalyParams,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyResponse {
    pub signals: Vec<AnomalySignal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendRequest<'a> {
    pub closes: Cow<'a, [f64]>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendResponse {
    pub trend: Option<QuarterlyTrend>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineCommand {
    #[default]
    Anomaly,
    Trend,
}

impl EngineCommand {
    pub fn as_arg(self) -> &'static str {
        match self {
            EngineCommand::Anomaly => "anomaly",
            EngineCommand::Trend => "trend",
        }
    }

    /// Command from an optional first argument; absent means anomaly.
    pub fn from_arg(arg: Option<&str>) -> Result<Self, String> {
        arg.map_or(Ok(Self::default()), str::parse)
    }
}

impl FromStr for EngineCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anomaly" => Ok(EngineCommand::Anomaly),
            "trend" => Ok(EngineCommand::Trend),
            other => Err(format!("unknown engine command {other:?}")),
        }
    }
}

/// Read one request from `reader`, compute it, write the response to `writer`.
pub fn handle<R: Read, W: Write>(
    command: EngineCommand,
    reader: R,
    mut writer: W,
) -> Result<(), EngineError> {
    match command {
        EngineCommand::Anomaly => {
            let request: AnomalyRequest<'static> = serde_json::from_reader(reader)?;
            debug!(records = request.records.len(), "anomaly request");
            let signals = columnar::compute_signals(&request.records, &request.params);
            serde_json::to_writer(&mut writer, &AnomalyResponse { signals })?;
        }
        EngineCommand::Trend => {
            let request: TrendRequest<'static> = serde_json::from_reader(reader)?;
            let trend = columnar::from_closes(&request.closes);
            serde_json::to_writer(&mut writer, &TrendResponse { trend })?;
        }
    }
    writer.flush()?;
    Ok(())
}
