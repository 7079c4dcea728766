//! JSON output for results and statistics.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::pipeline::DuplicateGroups;
use crate::stats::StatisticsSnapshot;

/// Open the result destination: stdout for `None` or `-`, a freshly created
/// file otherwise.
pub fn open_output(path: Option<&Path>) -> io::Result<Box<dyn Write>> {
    match path {
        None => Ok(Box::new(io::stdout().lock())),
        Some(path) if path.as_os_str() == "-" || path.as_os_str().is_empty() => {
            Ok(Box::new(io::stdout().lock()))
        }
        Some(path) => Ok(Box::new(File::create(path)?)),
    }
}

/// Write the duplicate groups as a pretty-printed JSON object followed by a
/// newline. An empty result renders as `{}`.
pub fn write_result(writer: &mut dyn Write, result: &DuplicateGroups) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *writer, result)?;
    writeln!(writer)?;
    writer.flush()
}

/// Write the statistics object to stderr.
pub fn write_statistics(snapshot: &StatisticsSnapshot) -> io::Result<()> {
    let stderr = io::stderr();
    let mut handle = stderr.lock();
    serde_json::to_writer_pretty(&mut handle, snapshot)?;
    writeln!(handle)
}
