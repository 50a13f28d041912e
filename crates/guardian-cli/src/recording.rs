//! Recorded point-cloud streams.
//!
//! A recording is a JSON-lines file: one serialised
//! [`PointCloudFrame`] per line, in capture order.  Blank lines and lines
//! starting with `#` are skipped.

use guardian_types::{GuardianError, PointCloudFrame};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Iterator over the frames of a recording.
pub struct Recording<R> {
    lines: std::io::Lines<R>,
    line_no: usize,
}

impl Recording<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, GuardianError> {
        let file = File::open(path)
            .map_err(|e| GuardianError::Io(format!("failed to open recording {}: {e}", path.display())))?;
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> Recording<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for Recording<R> {
    /// `(line number, frame or error)`
    type Item = (usize, Result<PointCloudFrame, GuardianError>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;
            let parsed = match line {
                Ok(text) => {
                    let text = text.trim();
                    if text.is_empty() || text.starts_with('#') {
                        continue;
                    }
                    serde_json::from_str::<PointCloudFrame>(text)
                        .map_err(|e| GuardianError::Serialization(e.to_string()))
                }
                Err(e) => Err(GuardianError::Io(e.to_string())),
            };
            return Some((self.line_no, parsed));
        }
    }
}
