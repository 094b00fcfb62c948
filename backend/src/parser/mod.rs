//! Loader: raw bytes to a [`RawTable`], trying candidate encodings in order.
//!
//! Each candidate is one attempt: rewind the source, read it, decode
//! strictly, detect the delimiter and parse the delimited text. The first
//! attempt that yields a header row wins. Every attempt is recorded so a
//! caller can see why earlier candidates were rejected.
//!
//! No cleaning happens here: header names and fields come back exactly as
//! they were in the source.

pub mod encoding;

use serde::Serialize;
use std::borrow::Cow;
use std::fmt::Display;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use crate::error::{LoadError, LoadResult};
use self::encoding::{decode_strict, resolve_label, Candidate};

/// Where table bytes come from.
#[derive(Debug, Clone)]
pub enum Source {
    /// A file on disk.
    Path(PathBuf),
    /// In-memory bytes, e.g. an upload. `name` is for display only.
    Bytes { name: String, bytes: Vec<u8> },
}

impl Source {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Source::Path(path.into())
    }

    pub fn bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Source::Bytes { name: name.into(), bytes: bytes.into() }
    }

    /// Display name of the source.
    pub fn name(&self) -> String {
        match self {
            Source::Path(p) => p.display().to_string(),
            Source::Bytes { name, .. } => name.clone(),
        }
    }

    /// Read the whole source.
    pub fn read_bytes(&self) -> LoadResult<Cow<'_, [u8]>> {
        match self {
            Source::Path(p) => Ok(Cow::Owned(std::fs::read(p)?)),
            Source::Bytes { bytes, .. } => Ok(Cow::Borrowed(bytes.as_slice())),
        }
    }
}

/// Outcome of one encoding attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attempt {
    /// Candidate label as given by the caller.
    pub encoding: String,
    /// Why the attempt failed, `None` for the attempt that succeeded.
    pub error: Option<String>,
}

/// A parsed table before any cleaning.
#[derive(Debug, Clone, Serialize)]
pub struct RawTable {
    /// Header names, untrimmed.
    pub headers: Vec<String>,
    /// Data rows; fields are positional and may be fewer than the headers.
    pub rows: Vec<Vec<String>>,
    /// Name of the encoding that decoded the source.
    pub encoding: String,
    /// Detected field delimiter.
    pub delimiter: char,
    /// Every attempt made, the last one being the success.
    pub attempts: Vec<Attempt>,
}

impl RawTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Field `column` of `row`; missing trailing fields read as empty.
    pub fn field(&self, row: usize, column: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Run `attempt` for each candidate until one succeeds.
///
/// Returns the value and the attempt log on success, or the complete
/// attempt log when every candidate failed.
pub fn try_in_order<C, T, E, F>(candidates: &[C], mut attempt: F) -> Result<(T, Vec<Attempt>), Vec<Attempt>>
where
    C: AsRef<str>,
    E: Display,
    F: FnMut(&C) -> Result<T, E>,
{
    let mut log = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        match attempt(candidate) {
            Ok(value) => {
                log.push(Attempt { encoding: candidate.as_ref().to_string(), error: None });
                return Ok((value, log));
            }
            Err(e) => {
                log::debug!("encoding attempt {} failed: {}", candidate.as_ref(), e);
                log.push(Attempt {
                    encoding: candidate.as_ref().to_string(),
                    error: Some(e.to_string()),
                });
            }
        }
    }

    Err(log)
}

/// Load a table from a seekable reader.
///
/// The reader is rewound before every attempt, so a stream that an earlier
/// attempt consumed is read again from the start.
pub fn load_reader<R, S>(mut reader: R, name: &str, encodings: &[S]) -> LoadResult<RawTable>
where
    R: Read + Seek,
    S: AsRef<str>,
{
    let candidates = resolve_candidates(encodings)?;
    let mut buf = Vec::new();

    let outcome = try_in_order(&candidates, |labelled: &Labelled| -> Result<ParsedText, String> {
        reader.rewind().map_err(|e| format!("cannot rewind: {}", e))?;
        buf.clear();
        reader.read_to_end(&mut buf).map_err(|e| format!("cannot read: {}", e))?;
        parse_with(&buf, &labelled.candidate)
    });

    finish(name, outcome)
}

/// Load a table from in-memory bytes.
pub fn load_bytes<S: AsRef<str>>(bytes: &[u8], name: &str, encodings: &[S]) -> LoadResult<RawTable> {
    load_reader(Cursor::new(bytes), name, encodings)
}

/// Load a table from a file path.
pub fn load_path<P: AsRef<Path>, S: AsRef<str>>(path: P, encodings: &[S]) -> LoadResult<RawTable> {
    let path = path.as_ref();
    let file = File::open(path)?;
    load_reader(file, &path.display().to_string(), encodings)
}

/// Load a table from any [`Source`].
pub fn load_source<S: AsRef<str>>(source: &Source, encodings: &[S]) -> LoadResult<RawTable> {
    match source {
        Source::Path(p) => load_path(p, encodings),
        Source::Bytes { name, bytes } => load_bytes(bytes, name, encodings),
    }
}

/// Resolved candidate; the label is what shows up in attempt logs.
struct Labelled {
    label: String,
    candidate: Candidate,
}

impl AsRef<str> for Labelled {
    fn as_ref(&self) -> &str {
        &self.label
    }
}

fn resolve_candidates<S: AsRef<str>>(encodings: &[S]) -> LoadResult<Vec<Labelled>> {
    encodings
        .iter()
        .map(|label| {
            Ok(Labelled {
                label: label.as_ref().to_string(),
                candidate: resolve_label(label.as_ref())?,
            })
        })
        .collect()
}

struct ParsedText {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    encoding: String,
    delimiter: char,
}

fn parse_with(bytes: &[u8], candidate: &Candidate) -> Result<ParsedText, String> {
    if bytes.is_empty() {
        return Err("source is empty".to_string());
    }

    let encoding = candidate.encoding_for(bytes);
    let text = decode_strict(bytes, encoding)
        .ok_or_else(|| format!("bytes are not valid {}", encoding.name()))?;

    let delimiter = detect_delimiter(&text);
    let (headers, rows) = parse_delimited(&text, delimiter)?;

    Ok(ParsedText {
        headers,
        rows,
        encoding: encoding.name().to_string(),
        delimiter,
    })
}

fn finish(name: &str, outcome: Result<(ParsedText, Vec<Attempt>), Vec<Attempt>>) -> LoadResult<RawTable> {
    match outcome {
        Ok((parsed, attempts)) => Ok(RawTable {
            headers: parsed.headers,
            rows: parsed.rows,
            encoding: parsed.encoding,
            delimiter: parsed.delimiter,
            attempts,
        }),
        Err(attempts) => Err(LoadError::UnreadableSource { name: name.to_string(), attempts }),
    }
}

/// Candidate field separators, in tie-breaking order.
const SEPARATORS: [char; 4] = [',', ';', '\t', '|'];

/// Lines inspected when detecting the delimiter, header included.
const SNIFF_LINES: usize = 5;

/// Detect the delimiter from the header and the first few data lines.
///
/// A separator whose count in the header is matched by every sniffed data
/// line beats one the data lines disagree with; among equals the higher
/// header count wins, and ties fall back to the earlier separator (comma
/// first). Tabs padding a field (next to a comma or at the line edges) are
/// not counted.
pub fn detect_delimiter(content: &str) -> char {
    let lines: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();
    let Some((header, body)) = lines.split_first() else {
        return ',';
    };

    let mut best_sep = ',';
    let mut best_key = (false, 0);

    for &sep in &SEPARATORS {
        let count = separator_count(header, sep);
        if count == 0 {
            continue;
        }
        let consistent = body.iter().all(|line| separator_count(line, sep) == count);
        if (consistent, count) > best_key {
            best_key = (consistent, count);
            best_sep = sep;
        }
    }

    best_sep
}

fn separator_count(line: &str, sep: char) -> usize {
    if sep == '\t' {
        line.split(',').map(|field| field.trim_matches('\t').matches('\t').count()).sum()
    } else {
        line.matches(sep).count()
    }
}

/// Parse delimited text into headers and rows.
///
/// Rows may be ragged; blank lines are skipped.
pub fn parse_delimited(text: &str, delimiter: char) -> Result<(Vec<String>, Vec<Vec<String>>), String> {
    let delimiter = u8::try_from(delimiter).map_err(|_| format!("unsupported delimiter {:?}", delimiter))?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| format!("cannot read header: {}", e))?
        .iter()
        .map(String::from)
        .collect();

    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err("no header row".to_string());
    }

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| format!("line {}: {}", idx + 2, e))?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(String::from).collect());
    }

    Ok((headers, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::normalize::normalize_temperature;
    use encoding_rs::EUC_KR;
    use std::io::Write;

    const UTF8_THEN_CP949: [&str; 2] = ["utf-8", "cp949"];

    #[test]
    fn test_simple_csv() {
        let table = load_bytes(b"year,value\n2000,1.5\n2001,2.5\n", "mem", &UTF8_THEN_CP949).unwrap();

        assert_eq!(table.headers, vec!["year", "value"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.field(1, 1), "2.5");
        assert_eq!(table.encoding, "UTF-8");
        assert_eq!(table.delimiter, ',');
        assert_eq!(table.attempts, vec![Attempt { encoding: "utf-8".into(), error: None }]);
    }

    #[test]
    fn test_falls_back_to_second_encoding() {
        let (bytes, _, _) = EUC_KR.encode("지점,날짜,평균기온(℃)\n108,1907-10-01,13.5\n");
        let table = load_bytes(&bytes, "weather.csv", &UTF8_THEN_CP949).unwrap();

        assert_eq!(table.headers[1], "날짜");
        assert_eq!(table.encoding, "EUC-KR");
        assert_eq!(table.attempts.len(), 2);
        assert_eq!(table.attempts[0].encoding, "utf-8");
        assert!(table.attempts[0].error.is_some());
        assert_eq!(table.attempts[1].error, None);
    }

    #[test]
    fn test_all_encodings_fail() {
        let (bytes, _, _) = EUC_KR.encode("날짜,값\n");
        let err = load_bytes(&bytes, "weather.csv", &["utf-8"]).unwrap_err();

        match err {
            LoadError::UnreadableSource { name, attempts } => {
                assert_eq!(name, "weather.csv");
                assert_eq!(attempts.len(), 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_source_is_unreadable() {
        let err = load_bytes(b"", "empty.csv", &UTF8_THEN_CP949).unwrap_err();
        assert!(matches!(err, LoadError::UnreadableSource { ref attempts, .. } if attempts.len() == 2));
    }

    #[test]
    fn test_unknown_label_fails_before_reading() {
        let err = load_bytes(b"a,b\n1,2\n", "mem", &["utf-8", "nope"]).unwrap_err();
        assert!(matches!(err, LoadError::UnknownEncoding(_)));
    }

    #[test]
    fn test_stream_rewound_between_attempts() {
        let (bytes, _, _) = EUC_KR.encode("날짜,평균기온(℃)\n2000-01-01,1.0\n");
        let mut cursor = Cursor::new(bytes.into_owned());
        // Leave the stream at its end, as an earlier consumer would.
        cursor.seek(std::io::SeekFrom::End(0)).unwrap();

        let table = load_reader(cursor, "upload", &UTF8_THEN_CP949).unwrap();
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.field(0, 0), "2000-01-01");
    }

    #[test]
    fn test_load_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all("Country,INTJ-A,INTJ-T\nChile,0.01,0.02\n".as_bytes()).unwrap();

        let table = load_path(file.path(), &UTF8_THEN_CP949).unwrap();
        assert_eq!(table.headers, vec!["Country", "INTJ-A", "INTJ-T"]);
        assert_eq!(table.field(0, 0), "Chile");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_path("/definitely/not/here.csv", &UTF8_THEN_CP949).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }

    #[test]
    fn test_headers_kept_raw_and_rows_ragged() {
        let table = load_bytes(b" date , value\n2000-01-01\n\n2001-01-01,3\n", "mem", &["utf-8"]).unwrap();

        assert_eq!(table.headers, vec![" date ", " value"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.field(0, 1), "");
        assert_eq!(table.field(1, 1), "3");
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3"), '\t');
        assert_eq!(detect_delimiter("a|b|c\n1|2|3"), '|');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_detect_delimiter_ignores_padding_tabs() {
        assert_eq!(detect_delimiter("\t날짜\t,\t평균기온(℃)\t\n2000-01-01,1.0\n"), ',');
        assert_eq!(detect_delimiter("\tdate\t,\tvalue\t"), ',');
        assert_eq!(detect_delimiter("a\tb,c\td\n1\t2,3\t4\n"), '\t');
    }

    #[test]
    fn test_detect_delimiter_prefers_consistent_rows() {
        // Two commas in the header but none below it; the semicolon holds.
        assert_eq!(detect_delimiter("a,b;c,d;e\n1;2;3\n4;5;6\n"), ';');
        assert_eq!(detect_delimiter("year,value\n2000,1\n2001\n"), ',');
    }

    #[test]
    fn test_tab_padded_comma_header_normalizes() {
        let csv = "\t날짜\t,\t평균기온(℃)\t\n2000-01-01,1.0\n2001-01-01,2.0\n";
        let table = load_bytes(csv.as_bytes(), "padded.csv", &["utf-8"]).unwrap();

        assert_eq!(table.delimiter, ',');
        assert_eq!(table.headers, vec!["\t날짜\t", "\t평균기온(℃)\t"]);

        let normalized = normalize_temperature(&table, "날짜", "평균기온(℃)").unwrap();
        assert_eq!(normalized.records.len(), 2);
        assert_eq!(normalized.dropped(), 0);
    }

    #[test]
    fn test_auto_detects_legacy_korean() {
        let (bytes, _, _) = EUC_KR.encode(
            "지점,지점명,날짜,평균기온(℃),최저기온(℃),최고기온(℃)\n\
             108,서울,1907-10-01,13.5,7.9,20.7\n\
             108,서울,1907-10-02,16.2,7.9,22.0\n\
             108,서울,1907-10-03,16.2,13.1,21.3\n\
             159,부산,1907-10-04,16.5,11.2,22.0\n\
             159,부산,1907-10-05,17.6,10.9,25.4\n",
        );

        let table = load_bytes(&bytes, "ta_auto.csv", &["auto"]).unwrap();

        assert_eq!(table.encoding, "EUC-KR");
        assert_eq!(table.headers[1], "지점명");
        assert_eq!(table.headers[3], "평균기온(℃)");
        assert_eq!(table.field(3, 1), "부산");
        assert_eq!(table.attempts, vec![Attempt { encoding: "auto".into(), error: None }]);
    }

    #[test]
    fn test_semicolon_table() {
        let table = load_bytes(b"year;value\n2000;1,5\n", "mem", &["utf-8"]).unwrap();
        assert_eq!(table.delimiter, ';');
        assert_eq!(table.field(0, 1), "1,5");
    }

    #[test]
    fn test_try_in_order_records_failures() {
        let candidates = ["a", "b", "c"];
        let (value, log) = try_in_order(&candidates, |c| if *c == "b" { Ok(2) } else { Err("nope") }).unwrap();

        assert_eq!(value, 2);
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].error.as_deref(), Some("nope"));
        assert_eq!(log[1].encoding, "b");
    }
}
