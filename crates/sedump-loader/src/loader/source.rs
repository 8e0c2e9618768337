//! Forward-only reader over a dump document
//!
//! A dump is one XML document whose records are `row` elements carrying every
//! field as an attribute. [`RowReader`] walks the document once and hands each
//! row's attributes to a callback, without keeping more than the current
//! element in memory.

use flate2::read::GzDecoder;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{LoadError, Result};

const ROW_ELEMENT: &[u8] = b"row";

/// Input buffer for the decompressed stream
const READ_BUFFER_SIZE: usize = 64 * 1024;

pub struct RowReader<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    rows: u64,
    /// Elements opened and not yet closed
    depth: usize,
}

impl RowReader<Box<dyn BufRead + Send>> {
    /// Open a dump file, decompressing it when the name ends in `.gz`
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let input: Box<dyn BufRead + Send> =
            if path.extension().and_then(|s| s.to_str()) == Some("gz") {
                Box::new(BufReader::with_capacity(READ_BUFFER_SIZE, GzDecoder::new(file)))
            } else {
                Box::new(BufReader::with_capacity(READ_BUFFER_SIZE, file))
            };

        Ok(Self::new(input))
    }
}

impl<R: BufRead> RowReader<R> {
    pub fn new(input: R) -> Self {
        Self {
            reader: Reader::from_reader(input),
            buf: Vec::with_capacity(8 * 1024),
            rows: 0,
            depth: 0,
        }
    }

    /// Rows produced so far
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Advance to the next `row` element and call `on_attribute(name, value)`
    /// for each of its attributes, in document order
    ///
    /// Returns `false` at the end of the document. A document that ends with
    /// elements still open is `Truncated`. An error from the callback stops
    /// the row and is returned as is.
    pub fn next_row<F>(&mut self, mut on_attribute: F) -> Result<bool>
    where
        F: FnMut(&str, &str) -> Result<()>,
    {
        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(element) => {
                    self.depth += 1;
                    if element.local_name().as_ref() == ROW_ELEMENT {
                        visit_attributes(&self.reader, &element, &mut on_attribute)?;
                        self.rows += 1;
                        return Ok(true);
                    }
                },
                Event::Empty(element) if element.local_name().as_ref() == ROW_ELEMENT => {
                    visit_attributes(&self.reader, &element, &mut on_attribute)?;
                    self.rows += 1;
                    return Ok(true);
                },
                Event::End(_) => self.depth = self.depth.saturating_sub(1),
                Event::Eof if self.depth > 0 => {
                    return Err(LoadError::Truncated {
                        rows: self.rows,
                        open_elements: self.depth,
                    });
                },
                Event::Eof => return Ok(false),
                _ => {},
            }
        }
    }
}

fn visit_attributes<R, F>(
    reader: &Reader<R>,
    element: &BytesStart<'_>,
    on_attribute: &mut F,
) -> Result<()>
where
    F: FnMut(&str, &str) -> Result<()>,
{
    for attribute in element.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        // Dump attribute names are ASCII; anything else cannot match a column
        let name = String::from_utf8_lossy(attribute.key.local_name().into_inner());
        let value = attribute.decode_and_unescape_value(reader.decoder())?;
        on_attribute(&name, &value)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn collect(xml: &str) -> Result<Vec<Vec<(String, String)>>> {
        let mut reader = RowReader::new(xml.as_bytes());
        let mut rows = Vec::new();
        loop {
            let mut row = Vec::new();
            let more = reader.next_row(|name, value| {
                row.push((name.to_string(), value.to_string()));
                Ok(())
            })?;
            if !more {
                return Ok(rows);
            }
            rows.push(row);
        }
    }

    #[test]
    fn test_reads_rows_in_document_order() {
        let rows = collect(
            r#"<?xml version="1.0" encoding="utf-8"?>
<badges>
  <row Id="1" UserId="2" Name="Teacher" />
  <row Id="2" UserId="3" Name="Student" TagBased="False" />
</badges>"#,
        )
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][2], ("Name".to_string(), "Teacher".to_string()));
        assert_eq!(rows[1].len(), 4);
    }

    #[test]
    fn test_unescapes_attribute_values() {
        let rows = collect(r#"<posts><row Body="&lt;p&gt;a &amp; b&lt;/p&gt;" /></posts>"#).unwrap();
        assert_eq!(rows[0][0].1, "<p>a & b</p>");
    }

    #[test]
    fn test_ignores_other_elements_and_accepts_open_rows() {
        let rows = collect(r#"<tags><meta Id="9"/><row Id="1"></row><row Id="2"/></tags>"#).unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r[0].1.as_str()).collect();
        assert_eq!(ids, ["1", "2"]);
    }

    #[test]
    fn test_empty_document() {
        assert!(collect("").unwrap().is_empty());
        assert!(collect("<users></users>").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let err = collect(r#"<votes><row Id="1"></votes>"#).unwrap_err();
        assert!(matches!(err, LoadError::Xml(_)));
    }

    #[test]
    fn test_unclosed_root_is_truncated() {
        let err = collect(r#"<badges><row Id="1"/><row Id="2"/>"#).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Truncated {
                rows: 2,
                open_elements: 1
            }
        ));
    }

    #[test]
    fn test_document_cut_inside_open_row_is_truncated() {
        let err = collect(r#"<badges><row Id="1"/><row Id="2">"#).unwrap_err();
        assert!(matches!(err, LoadError::Truncated { open_elements: 2, .. }));
    }

    #[test]
    fn test_read_failure_is_a_read_error() {
        struct FailingRead;

        impl std::io::Read for FailingRead {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "cut off"))
            }
        }

        let mut reader = RowReader::new(BufReader::new(FailingRead));
        let err = reader.next_row(|_, _| Ok(())).unwrap_err();
        assert!(matches!(err, LoadError::Read(_)));
    }

    #[test]
    fn test_callback_error_stops_reading() {
        let mut reader = RowReader::new(r#"<t><row A="1" B="2"/></t>"#.as_bytes());
        let mut seen = 0;
        let result = reader.next_row(|_, _| {
            seen += 1;
            Err(LoadError::UnknownColumn {
                table: "t".into(),
                attribute: "A".into(),
            })
        });
        assert!(result.is_err());
        assert_eq!(seen, 1);
        assert_eq!(reader.rows(), 0);
    }

    #[test]
    fn test_open_missing_file() {
        let err = RowReader::open(Path::new("/definitely/not/here.xml.gz")).err().unwrap();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
