//! Line-delimited JSON decoding shared by both source parsers.
//!
//! Assistant tools append to their logs while sessions are live, so the last
//! line of a file is frequently a truncated JSON fragment. The decoder must
//! stay usable on such files: a line that fails to parse is skipped, never an
//! error. A file where every line fails simply decodes to an empty sequence,
//! which callers map to "no session".

use serde::de::DeserializeOwned;

/// Decode JSONL content into an ordered sequence of records.
///
/// Empty lines and lines that are not a single valid JSON value of `T` are
/// silently dropped (debug-logged). Pure function of the input text.
pub fn decode_lines<T: DeserializeOwned>(content: &str) -> Vec<T> {
    let mut records = Vec::new();

    for (line_number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<T>(line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::debug!(
                    line = line_number + 1,
                    error = %e,
                    "Skipping undecodable log line"
                );
            }
        }
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Record {
        n: u32,
    }

    #[test]
    fn test_decodes_valid_lines_in_order() {
        let content = "{\"n\":1}\n{\"n\":2}\n{\"n\":3}";
        let records: Vec<Record> = decode_lines(content);
        assert_eq!(
            records,
            vec![Record { n: 1 }, Record { n: 2 }, Record { n: 3 }]
        );
    }

    #[test]
    fn test_skips_truncated_last_line() {
        // A mid-write file: the final line is cut off
        let content = "{\"n\":1}\n{\"n\":2}\n{\"n\":";
        let records: Vec<Record> = decode_lines(content);
        assert_eq!(records, vec![Record { n: 1 }, Record { n: 2 }]);
    }

    #[test]
    fn test_skips_blank_and_garbage_lines() {
        let content = "\n  \nnot json\n{\"n\":7}\n";
        let records: Vec<Record> = decode_lines(content);
        assert_eq!(records, vec![Record { n: 7 }]);
    }

    #[test]
    fn test_all_invalid_yields_empty() {
        let records: Vec<Record> = decode_lines("oops\n{broken");
        assert!(records.is_empty());
    }
}
