mod processing;
mod review;

pub use processing::ProcessingPipeline;
pub use review::{AnalyzedText, ReviewOutcome, ReviewPipeline};

use chrono::{DateTime, Utc};

/// SageMaker resource names are limited to 63 characters.
const MAX_NAME_LEN: usize = 63;

/// `<prefix>-<UTC timestamp with millis>`, lower-case and hyphen-only.
pub fn timestamped_name(prefix: &str, now: DateTime<Utc>) -> String {
    let stamp = now.format("%Y-%m-%d-%H-%M-%S-%3f").to_string();
    let mut base: String = prefix
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();
    base.truncate(MAX_NAME_LEN - stamp.len() - 1);
    let base = base.trim_matches('-');
    if base.is_empty() {
        stamp
    } else {
        format!("{base}-{stamp}")
    }
}
