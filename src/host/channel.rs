use std::io::{BufRead, Write};

use tracing::{info, warn};

use crate::agent::error::AutofillError;
use crate::host::controller::HostController;
use crate::host::protocol::{HostCommand, HostResponse};

/// Parse one request line into a response. Malformed lines get a failure
/// reply rather than ending the channel.
pub fn handle_line(controller: &mut HostController, line: &str) -> HostResponse {
    match serde_json::from_str::<HostCommand>(line) {
        Ok(command) => controller.handle(command),
        Err(e) => {
            warn!(error = %e, "Unparseable host command");
            HostResponse::fail(format!("invalid command: {}", e))
        }
    }
}

/// Serve NDJSON commands until the reader is exhausted. One reply line per
/// non-blank request line.
pub fn serve<R: BufRead, W: Write>(controller: &mut HostController, reader: R, mut writer: W) -> Result<usize, AutofillError> {
    let mut handled = 0;

    for line in reader.lines() {
        let line = line.map_err(|e| AutofillError::io("reading host command", e))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = handle_line(controller, line);
        let json = serde_json::to_string(&response).map_err(|e| AutofillError::json("HostResponse", e))?;
        writeln!(writer, "{}", json).map_err(|e| AutofillError::io("writing host response", e))?;
        writer.flush().map_err(|e| AutofillError::io("flushing host response", e))?;
        handled += 1;
    }

    info!(handled, "Host channel closed");
    Ok(handled)
}
