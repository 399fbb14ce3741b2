//! JSON rendering of command results.

use std::io::Write;

use serde::Serialize;

use crate::CliError;

/// Write `value` as pretty-printed JSON followed by a newline.
pub(crate) fn write_json<T: Serialize>(writer: &mut dyn Write, value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value).map_err(CliError::SerializeOutput)?;
    writeln!(writer, "{json}").map_err(CliError::WriteOutput)
}

/// Write `value` as a single JSON line and flush, for streamed output.
pub(crate) fn write_json_line<T: Serialize>(
    writer: &mut dyn Write,
    value: &T,
) -> Result<(), CliError> {
    let json = serde_json::to_string(value).map_err(CliError::SerializeOutput)?;
    writeln!(writer, "{json}").map_err(CliError::WriteOutput)?;
    writer.flush().map_err(CliError::WriteOutput)
}
