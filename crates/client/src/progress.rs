//! Single-line download progress on standard output.

use std::io::{self, Write};

const UNITS: [&str; 8] = ["", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "Zi"];

/// Render a byte count with binary prefixes and one decimal place
/// (`512.0B`, `1.5KiB`, ... `1.0YiB`).
pub fn human_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    for unit in UNITS {
        if value.abs() < 1024.0 {
            return format!("{value:3.1}{unit}B");
        }
        value /= 1024.0;
    }
    format!("{value:.1}YiB")
}

/// Redraws `[debuginfod] Downloading... <size>` in place after every chunk.
///
/// Output errors are ignored: a closed or broken stdout must never fail a
/// download.
pub(crate) struct Progress<W: Write> {
    out: Option<W>,
    drawn: bool,
}

impl Progress<io::Stdout> {
    pub(crate) fn stdout(enabled: bool) -> Self {
        Self::new(enabled.then(io::stdout))
    }
}

impl<W: Write> Progress<W> {
    pub(crate) fn new(out: Option<W>) -> Self {
        Self { out, drawn: false }
    }

    pub(crate) fn update(&mut self, downloaded: u64) {
        if let Some(out) = self.out.as_mut() {
            _ = write!(out, "\r[debuginfod] Downloading... {}", human_bytes(downloaded));
            _ = out.flush();
            self.drawn = true;
        }
    }

    /// Terminate the line, if one was drawn.
    pub(crate) fn finish(&mut self) {
        if let Some(out) = self.out.as_mut()
            && std::mem::take(&mut self.drawn)
        {
            _ = out.write_all(b"\n");
            _ = out.flush();
        }
    }

    #[cfg(test)]
    pub(crate) fn into_inner(self) -> Option<W> {
        self.out
    }
}
