//! Reading records from line-oriented text.
//!
//! A record is a run of `name = expr` lines ended by a delimiter line
//! (`***` by default) or by the end of input. Blank lines and lines
//! starting with `#` are ignored. When a line fails to parse, the rest of
//! the record is skipped up to the next delimiter and the failure is
//! reported; the following call continues with the next record.

use std::io::BufRead;

use classad_parser::{parse_assignment, parse_expr};
use tracing::warn;

use crate::error::ReadError;
use crate::options::ReaderOptions;
use crate::record::Record;
use crate::registry::TypeRegistry;

/// Reads records one at a time from a [`BufRead`] source.
pub struct AdReader<'r, R> {
    source: R,
    options: ReaderOptions,
    registry: Option<&'r TypeRegistry>,
    line: usize,
    buf: String,
}

impl<'r, R: BufRead> AdReader<'r, R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            options: ReaderOptions::default(),
            registry: None,
            line: 0,
            buf: String::new(),
        }
    }

    pub fn with_options(mut self, options: ReaderOptions) -> Self {
        self.options = options;
        self
    }

    /// Register `MyType`/`TargetType` names with `registry` and tag each
    /// record with them.
    pub fn with_registry(mut self, registry: &'r TypeRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Number of lines consumed so far.
    pub fn line_number(&self) -> usize {
        self.line
    }

    /// Read the next record. `Ok(None)` at end of input.
    ///
    /// The returned record has every dirty flag cleared.
    pub fn next_record(&mut self) -> Result<Option<Record>, ReadError> {
        let mut record = Record::new();
        let mut seen_any = false;

        loop {
            let Some(line) = self.read_line()? else {
                break;
            };
            if line.starts_with(self.options.delimiter.as_str()) {
                if seen_any {
                    break;
                }
                continue;
            }

            let text = line.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            seen_any = true;

            match parse_assignment(text) {
                Ok(expr) => {
                    record.insert(expr);
                }
                Err(err) => {
                    let line = self.line;
                    let error = if parse_expr(text).is_ok() {
                        ReadError::NotAssignment { line }
                    } else {
                        ReadError::Parse { line, source: err }
                    };
                    warn!(line, error = %error, "skipping record");
                    self.skip_record()?;
                    return Err(error);
                }
            }
        }

        if !seen_any {
            return Ok(None);
        }

        record.clear_all_dirty();
        if self.options.adopt_types {
            if let Some(registry) = self.registry {
                record.adopt_type_attributes(registry);
            }
        }
        Ok(Some(record))
    }

    /// Read one line without its terminator. `None` at end of input.
    fn read_line(&mut self) -> Result<Option<String>, ReadError> {
        self.buf.clear();
        if self.source.read_line(&mut self.buf)? == 0 {
            return Ok(None);
        }
        self.line += 1;
        Ok(Some(self.buf.trim_end_matches(['\n', '\r']).to_string()))
    }

    fn skip_record(&mut self) -> Result<(), ReadError> {
        while let Some(line) = self.read_line()? {
            if line.starts_with(self.options.delimiter.as_str()) {
                break;
            }
        }
        Ok(())
    }
}

impl<R: BufRead> Iterator for AdReader<'_, R> {
    type Item = Result<Record, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
