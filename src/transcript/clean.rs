use regex::Regex;

/// Collapses subtitle-formatted text into one plain paragraph.
///
/// Strips the SRT scaffolding (sequence-number lines, timestamp ranges) and
/// normalizes whitespace. Pure and total: any input string cleans without
/// error, and cleaning is idempotent.
#[derive(Debug)]
pub struct TranscriptCleaner {
    sequence_line: Regex,
    timestamp_range: Regex,
    whitespace_run: Regex,
}

impl TranscriptCleaner {
    pub fn new() -> Self {
        Self {
            // Lines that are nothing but a cue number.
            sequence_line: Regex::new(r"(?m)^\s*\d+\s*$").unwrap(),
            // HH:MM:SS,mmm --> HH:MM:SS,mmm cue timing lines.
            timestamp_range: Regex::new(
                r"\d{1,2}:\d{2}:\d{2},\d{3} --> \d{1,2}:\d{2}:\d{2},\d{3}",
            )
            .unwrap(),
            whitespace_run: Regex::new(r"\s+").unwrap(),
        }
    }

    pub fn clean(&self, raw: &str) -> String {
        let no_sequences = self.sequence_line.replace_all(raw, "");
        let no_timestamps = self.timestamp_range.replace_all(&no_sequences, "");
        let collapsed = self.whitespace_run.replace_all(&no_timestamps, " ");
        collapsed.trim().to_string()
    }
}

impl Default for TranscriptCleaner {
    fn default() -> Self {
        Self::new()
    }
}
