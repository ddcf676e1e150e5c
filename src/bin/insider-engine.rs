//! Accelerated statistics engine: one JSON request on stdin, one response on stdout.

use std::io::{self, BufReader, BufWriter};

use anyhow::{anyhow, Result};
use insider_pulse::{
    logging::{init_tracing_to, LogTarget},
    signals::protocol::{handle, EngineCommand},
};

fn main() -> Result<()> {
    init_tracing_to(LogTarget::Stderr, "warn")?;

    let arg = std::env::args().nth(1);
    let command = EngineCommand::from_arg(arg.as_deref()).map_err(|err| anyhow!(err))?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    handle(
        command,
        BufReader::new(stdin.lock()),
        BufWriter::new(stdout.lock()),
    )?;
    Ok(())
}
