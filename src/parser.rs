use crate::constants::{HASH_COLUMN_INDEX, HASH_HEADER_KEYWORD, SERIAL_HEADER_KEYWORD};
use tracing::debug;

/// Turns raw text content into a flat list of candidate hash strings.
///
/// Two input shapes are recognized:
/// - plain list: one hash per line, blank lines ignored
/// - tabular with header: CSV whose header names a serial-number column and a
///   hardware-hash column (the `Get-WindowsAutopilotInfo` export shape); the
///   hash lives in the third column of every data row
///
/// Pure and deterministic. Deduplication is the validator's job, not ours.
pub fn parse(content: &str) -> Vec<String> {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let Some(first) = lines.first() else {
        return Vec::new();
    };

    if is_tabular_header(first) {
        debug!("detected tabular input with header: {first}");
        parse_tabular(&lines)
    } else {
        parse_plain(&lines)
    }
}

fn is_tabular_header(line: &str) -> bool {
    let lowered = line.to_lowercase();
    lowered.contains(',')
        && lowered.contains(SERIAL_HEADER_KEYWORD)
        && lowered.contains(HASH_HEADER_KEYWORD)
}

fn parse_tabular(lines: &[&str]) -> Vec<String> {
    lines
        .iter()
        .skip(1)
        .filter_map(|line| {
            let columns: Vec<&str> = line.split(',').map(str::trim).collect();
            // Rows without a hash column are skipped, not errors
            columns
                .get(HASH_COLUMN_INDEX)
                .map(|value| strip_quotes(value).to_string())
        })
        .filter(|value| !value.is_empty())
        .collect()
}

fn parse_plain(lines: &[&str]) -> Vec<String> {
    // Comma-bearing lines in plain mode are ambiguous (stray tabular data)
    // and are dropped silently.
    lines
        .iter()
        .filter(|line| !line.contains(','))
        .map(|line| line.to_string())
        .collect()
}

/// Strips a single pair of surrounding double quotes, if present.
fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_content_yields_no_hashes() {
        assert!(parse("").is_empty());
        assert!(parse("   \n\n  ").is_empty());
    }

    #[test]
    fn plain_list_keeps_every_line_including_repeats() {
        let parsed = parse("hashA\nhashA\nhashB\n");
        assert_eq!(parsed, vec!["hashA", "hashA", "hashB"]);
    }

    #[test]
    fn plain_list_handles_crlf_and_blank_lines() {
        let parsed = parse("hashA\r\n\r\n  hashB  \r\n");
        assert_eq!(parsed, vec!["hashA", "hashB"]);
    }

    #[test]
    fn plain_list_drops_comma_bearing_lines() {
        let parsed = parse("hashA\nSN1,something,else\nhashB\n");
        assert_eq!(parsed, vec!["hashA", "hashB"]);
    }

    #[test]
    fn tabular_input_extracts_third_column() {
        let content =
            "Device Serial Number,Hardware Hash\nSN1,ignored,ABCDEF1234567890ABCDEF1234567890==\n";
        let parsed = parse(content);
        assert_eq!(parsed, vec!["ABCDEF1234567890ABCDEF1234567890=="]);
    }

    #[test]
    fn tabular_input_strips_surrounding_quotes() {
        let content = "Device Serial Number,Windows Product ID,Hardware Hash\nSN1,PID1,\"AAAAAAAAAAAAAAAAAAAA==\"\n";
        assert_eq!(parse(content), vec!["AAAAAAAAAAAAAAAAAAAA=="]);
    }

    #[test]
    fn tabular_rows_with_too_few_columns_are_skipped() {
        let content = "Device Serial Number,Windows Product ID,Hardware Hash\nSN1,PID1\nSN2,PID2,HASH2\n";
        assert_eq!(parse(content), vec!["HASH2"]);
    }

    #[test]
    fn header_detection_is_case_insensitive() {
        let content = "DEVICE SERIAL NUMBER,WINDOWS PRODUCT ID,HARDWARE HASH\nSN1,PID1,HASH1\n";
        assert_eq!(parse(content), vec!["HASH1"]);
    }

    #[test]
    fn header_without_keywords_is_not_tabular() {
        // Commas but no recognizable header: plain mode, all lines dropped
        let content = "alpha,beta,gamma\nSN1,PID1,HASH1\n";
        assert!(parse(content).is_empty());
    }
}
