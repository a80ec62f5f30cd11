//! Delimited input scanning.
//!
//! Splits a byte stream into documents on a single delimiter byte. With the
//! default `\n` delimiter a trailing `\r` is dropped so CRLF input works.
//! Units that are empty or whitespace only are skipped.

use std::io::{self, BufRead};

/// Pulls one delimited unit at a time from a buffered reader
pub struct DelimitedScanner<R> {
    reader: R,
    delimiter: u8,
    buf: Vec<u8>,
    line: usize,
}

impl<R: BufRead> DelimitedScanner<R> {
    pub fn new(reader: R, delimiter: u8) -> Self {
        DelimitedScanner {
            reader,
            delimiter,
            buf: Vec::new(),
            line: 0,
        }
    }

    /// Next non-blank unit, or `None` at end of input.
    ///
    /// The returned slice is valid until the next call.
    pub fn next_unit(&mut self) -> io::Result<Option<&[u8]>> {
        loop {
            self.buf.clear();
            let read = self.reader.read_until(self.delimiter, &mut self.buf)?;
            if read == 0 {
                return Ok(None);
            }
            self.line += 1;

            let mut end = self.buf.len();
            if self.buf[end - 1] == self.delimiter {
                end -= 1;
            }
            if self.delimiter == b'\n' && end > 0 && self.buf[end - 1] == b'\r' {
                end -= 1;
            }

            if self.buf[..end].iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Ok(Some(&self.buf[..end]));
        }
    }

    /// 1-based index of the unit last returned (blank units included)
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn collect(input: &str, delimiter: u8) -> Vec<String> {
        let mut scanner = DelimitedScanner::new(Cursor::new(input.as_bytes().to_vec()), delimiter);
        let mut out = Vec::new();
        while let Some(unit) = scanner.next_unit().unwrap() {
            out.push(String::from_utf8(unit.to_vec()).unwrap());
        }
        out
    }

    #[test]
    fn test_newline_units() {
        assert_eq!(collect("{\"a\":1}\n{\"a\":2}\n", b'\n'), vec!["{\"a\":1}", "{\"a\":2}"]);
    }

    #[test]
    fn test_missing_trailing_delimiter() {
        assert_eq!(collect("1\n2", b'\n'), vec!["1", "2"]);
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        assert_eq!(collect("1\r\n\r\n  \n2\r\n", b'\n'), vec!["1", "2"]);
    }

    #[test]
    fn test_custom_delimiter() {
        assert_eq!(
            collect("{\"a\":1}|{\"a\":\"x|y\"}", b'|'),
            vec!["{\"a\":1}", "{\"a\":\"x", "y\"}"]
        );
        assert_eq!(collect("{\"a\":1}\x1e{\"b\":2}\x1e", 0x1e), vec!["{\"a\":1}", "{\"b\":2}"]);
    }

    #[test]
    fn test_line_numbers_count_blank_units() {
        let mut scanner = DelimitedScanner::new(Cursor::new(b"a\n\nb\n".to_vec()), b'\n');
        scanner.next_unit().unwrap();
        assert_eq!(scanner.line(), 1);
        scanner.next_unit().unwrap();
        assert_eq!(scanner.line(), 3);
    }
}
