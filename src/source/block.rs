//! Line-oriented block reader shared by the object cache and status parsers.
//!
//! Both files are sequences of blocks:
//!
//! ```text
//! hoststatus {
//!     host_name=web01
//!     current_state=0
//!     }
//! ```
//!
//! The reader does not know which block kinds are meaningful. It yields every
//! block it finds with its fields collected, and the typed parsers decide
//! what to do with it.

use std::collections::BTreeMap;
use std::io::{BufRead, Lines};

use serde::Serialize;
use tracing::warn;

use crate::error::{ParseError, ParseWarning};

/// A field value. Repeated keys within one block are promoted to a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    One(String),
    Many(Vec<String>),
}

impl FieldValue {
    /// The last value seen for the key.
    pub fn last(&self) -> &str {
        match self {
            FieldValue::One(value) => value,
            FieldValue::Many(values) => values.last().map(String::as_str).unwrap_or(""),
        }
    }

    /// All values in file order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            FieldValue::One(value) => vec![value.as_str()],
            FieldValue::Many(values) => values.iter().map(String::as_str).collect(),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            FieldValue::One(first) => {
                let first = std::mem::take(first);
                *self = FieldValue::Many(vec![first, value]);
            }
            FieldValue::Many(values) => values.push(value),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::One(value.to_string())
    }
}

/// Field name to value, for one block.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// One block as read from the file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBlock {
    /// Header text without the opening brace, e.g. `define host` or `hoststatus`.
    pub header: String,
    /// Line number of the header (1-based).
    pub line: usize,
    pub fields: FieldMap,
    /// False when the input ended before the closing `}`.
    pub terminated: bool,
}

/// Reads blocks from a buffered reader, one line at a time.
///
/// `separator` is the character between key and value: a tab in the object
/// cache, `=` in the status snapshot. The reader stops after the first error.
#[derive(Debug)]
pub struct BlockReader<R> {
    lines: Lines<R>,
    separator: char,
    line_no: usize,
    done: bool,
    warnings: Vec<ParseWarning>,
}

impl<R: BufRead> BlockReader<R> {
    pub fn new(reader: R, separator: char) -> Self {
        Self {
            lines: reader.lines(),
            separator,
            line_no: 0,
            done: false,
            warnings: Vec::new(),
        }
    }

    /// Warnings collected so far.
    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    /// Record and log a warning.
    pub fn warn(&mut self, warning: ParseWarning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    fn next_line(&mut self) -> Option<Result<String, ParseError>> {
        let line = self.lines.next()?;
        self.line_no += 1;
        Some(line.map_err(ParseError::from))
    }

    /// Split at the first separator. Only the key is trimmed; the value keeps
    /// its inner whitespace.
    fn split_field<'a>(&self, line: &'a str) -> (&'a str, &'a str) {
        match line.split_once(self.separator) {
            Some((key, value)) => (key.trim(), value),
            None => (line.trim(), ""),
        }
    }

    fn read_block(&mut self, header: String) -> Result<RawBlock, ParseError> {
        let mut block = RawBlock {
            header,
            line: self.line_no,
            fields: FieldMap::new(),
            terminated: false,
        };

        while let Some(line) = self.next_line() {
            let line = line?;
            let trimmed = line.trim();

            if trimmed == "}" {
                block.terminated = true;
                break;
            }
            if is_ignorable(trimmed) {
                continue;
            }

            let (key, value) = self.split_field(trimmed);
            match block.fields.get_mut(key) {
                Some(existing) => existing.push(value.to_string()),
                None => {
                    block.fields.insert(key.to_string(), value.into());
                }
            }
        }

        Ok(block)
    }
}

impl<R: BufRead> Iterator for BlockReader<R> {
    type Item = Result<RawBlock, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            let line = match self.next_line() {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    return None;
                }
            };

            let trimmed = line.trim();
            if is_ignorable(trimmed) {
                continue;
            }

            if let Some(header) = trimmed.strip_suffix('{') {
                let result = self.read_block(header.trim().to_string());
                if result.is_err() {
                    self.done = true;
                }
                return Some(result);
            }

            let warning = ParseWarning::StrayLine {
                line: self.line_no,
                text: trimmed.to_string(),
            };
            self.warn(warning);
        }
    }
}

fn is_ignorable(line: &str) -> bool {
    line.is_empty() || line.starts_with('#')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_all(input: &str, separator: char) -> Vec<RawBlock> {
        BlockReader::new(Cursor::new(input.to_string()), separator)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_reads_status_blocks() {
        let input = "\
# NAGIOS STATUS FILE
info {
\tcreated=1700000000
\tversion=4.4.6
\t}

hoststatus {
\thost_name=web01
\tplugin_output=PING OK - rta=0.5ms, lost=0%
\t}
";
        let blocks = read_all(input, '=');
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].header, "info");
        assert_eq!(blocks[0].line, 2);
        assert_eq!(blocks[1].header, "hoststatus");
        assert_eq!(blocks[1].fields["host_name"].last(), "web01");
        assert!(blocks[1].terminated);
    }

    #[test]
    fn test_splits_at_first_separator() {
        let input = "servicestatus {\n\tplugin_output=HTTP OK: a=b\n}\n";
        let blocks = read_all(input, '=');
        assert_eq!(blocks[0].fields["plugin_output"].last(), "HTTP OK: a=b");
    }

    #[test]
    fn test_value_whitespace_is_kept() {
        let input = "servicestatus {\n\tplugin_output =  DISK OK  - free 40%\n\t}\n";
        let blocks = read_all(input, '=');
        assert_eq!(blocks[0].fields["plugin_output"].last(), "  DISK OK  - free 40%");
    }

    #[test]
    fn test_tab_separated_fields() {
        let input = "define host {\n\thost_name\tweb01\n\talias\tWeb server\tprimary\n\t}\n";
        let blocks = read_all(input, '\t');
        assert_eq!(blocks[0].header, "define host");
        assert_eq!(blocks[0].fields["host_name"].last(), "web01");
        assert_eq!(blocks[0].fields["alias"].last(), "Web server\tprimary");
    }

    #[test]
    fn test_repeated_keys_become_list() {
        let input = "define host {\n\t_NMTAG_ROLE\tweb\n\t_NMTAG_ROLE\tproxy\n\t_NMTAG_ROLE\tcache\n}\n";
        let blocks = read_all(input, '\t');
        assert_eq!(
            blocks[0].fields["_NMTAG_ROLE"],
            FieldValue::Many(vec!["web".into(), "proxy".into(), "cache".into()])
        );
        assert_eq!(blocks[0].fields["_NMTAG_ROLE"].last(), "cache");
    }

    #[test]
    fn test_key_without_value() {
        let input = "define service {\n\tnotes\n}\n";
        let blocks = read_all(input, '\t');
        assert_eq!(blocks[0].fields["notes"].last(), "");
    }

    #[test]
    fn test_stray_lines_warn() {
        let input = "garbage here\nhoststatus {\n\thost_name=a\n}\n";
        let mut reader = BlockReader::new(Cursor::new(input.to_string()), '=');
        let block = reader.next().unwrap().unwrap();
        assert_eq!(block.header, "hoststatus");
        assert!(reader.next().is_none());
        assert_eq!(
            reader.warnings(),
            &[ParseWarning::StrayLine {
                line: 1,
                text: "garbage here".to_string()
            }]
        );
    }

    #[test]
    fn test_unterminated_block() {
        let input = "hoststatus {\n\thost_name=a\n";
        let blocks = read_all(input, '=');
        assert_eq!(blocks.len(), 1);
        assert!(!blocks[0].terminated);
    }

    #[test]
    fn test_empty_input() {
        assert!(read_all("", '=').is_empty());
        assert!(read_all("\n\n# only comments\n", '=').is_empty());
    }
}
