use std::cell::Cell;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::rc::Rc;

use csv::{ReaderBuilder, StringRecordsIntoIter, Trim};
use flate2::read::MultiGzDecoder;
use tracing::debug;

use crate::error::{CliqueError, Result};

use super::LinkDocument;

/// Link-list encodings understood by [`DocumentReader`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputFormat {
    /// One `source,target` row per link.
    Csv,
    /// Like [`InputFormat::Csv`] with tab separated fields.
    Tsv,
    /// One `{"source": .., "targets": [..]}` object per line.
    JsonLines,
}

impl InputFormat {
    /// Guesses the format from the file extension, looking through `.gz`.
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        let name = name.strip_suffix(".gz").unwrap_or(&name);
        let ext = Path::new(name).extension()?.to_str()?;
        match ext {
            "csv" => Some(InputFormat::Csv),
            "tsv" | "tab" => Some(InputFormat::Tsv),
            "jsonl" | "ndjson" | "json" => Some(InputFormat::JsonLines),
            _ => None,
        }
    }

    fn delimiter(self) -> u8 {
        match self {
            InputFormat::Tsv => b'\t',
            InputFormat::Csv | InputFormat::JsonLines => b',',
        }
    }
}

/// Shared count of bytes pulled from the underlying file.
///
/// For compressed input this counts compressed bytes, which is what makes it
/// comparable to the file size.
#[derive(Clone, Debug, Default)]
pub struct ByteCounter(Rc<Cell<u64>>);

impl ByteCounter {
    /// Bytes consumed so far.
    pub fn get(&self) -> u64 {
        self.0.get()
    }
}

struct CountingReader<R> {
    inner: R,
    counter: ByteCounter,
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        let cell = &self.counter.0;
        cell.set(cell.get() + n as u64);
        Ok(n)
    }
}

/// Options for [`DocumentReader`].
#[derive(Clone, Copy, Debug)]
pub struct ReaderOptions {
    /// Encoding of the input.
    pub format: InputFormat,
    /// Skip the first CSV row.
    pub has_header: bool,
}

enum Source {
    Csv {
        records: StringRecordsIntoIter<Box<dyn Read>>,
        pending: Option<LinkDocument>,
    },
    JsonLines {
        lines: io::Lines<BufReader<Box<dyn Read>>>,
        line: u64,
    },
}

/// Streams [`LinkDocument`]s out of a link-list file.
pub struct DocumentReader {
    source: Source,
    counter: ByteCounter,
    done: bool,
}

impl DocumentReader {
    /// Opens `path`, decompressing `.gz` files on the fly.
    pub fn open(path: impl AsRef<Path>, opts: ReaderOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let counter = ByteCounter::default();
        let counted = CountingReader {
            inner: file,
            counter: counter.clone(),
        };
        let gzipped = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"));
        let raw: Box<dyn Read> = if gzipped {
            Box::new(MultiGzDecoder::new(BufReader::new(counted)))
        } else {
            Box::new(counted)
        };
        debug!(path = %path.display(), format = ?opts.format, gzipped, "ingest.reader.open");
        Ok(Self::build(raw, counter, opts))
    }

    /// Reads from an arbitrary byte source (no decompression).
    pub fn from_reader(reader: impl Read + 'static, opts: ReaderOptions) -> Self {
        let counter = ByteCounter::default();
        let counted = CountingReader {
            inner: reader,
            counter: counter.clone(),
        };
        Self::build(Box::new(counted), counter, opts)
    }

    fn build(raw: Box<dyn Read>, counter: ByteCounter, opts: ReaderOptions) -> Self {
        let source = match opts.format {
            InputFormat::Csv | InputFormat::Tsv => Source::Csv {
                records: ReaderBuilder::new()
                    .delimiter(opts.format.delimiter())
                    .has_headers(opts.has_header)
                    .flexible(true)
                    .trim(Trim::All)
                    .from_reader(raw)
                    .into_records(),
                pending: None,
            },
            InputFormat::JsonLines => Source::JsonLines {
                lines: BufReader::new(raw).lines(),
                line: 0,
            },
        };
        Self {
            source,
            counter,
            done: false,
        }
    }

    /// Handle for observing byte progress while the reader is consumed.
    pub fn byte_counter(&self) -> ByteCounter {
        self.counter.clone()
    }

    fn next_document(&mut self) -> Result<Option<LinkDocument>> {
        match &mut self.source {
            Source::Csv { records, pending } => next_csv(records, pending),
            Source::JsonLines { lines, line } => next_json(lines, line),
        }
    }
}

impl Iterator for DocumentReader {
    type Item = Result<LinkDocument>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_document() {
            Ok(Some(doc)) => Some(Ok(doc)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

fn next_csv(
    records: &mut StringRecordsIntoIter<Box<dyn Read>>,
    pending: &mut Option<LinkDocument>,
) -> Result<Option<LinkDocument>> {
    for record in records.by_ref() {
        let record = record?;
        let line = record.position().map_or(0, |pos| pos.line());
        let source = record.get(0).unwrap_or_default();
        if source.is_empty() {
            if record.iter().all(str::is_empty) {
                continue;
            }
            return Err(CliqueError::input(line, "empty source label"));
        }
        let target = record.get(1).filter(|t| !t.is_empty());

        if let Some(doc) = pending.as_mut() {
            if doc.source == source {
                doc.targets.extend(target.map(str::to_owned));
                continue;
            }
        }
        let next = LinkDocument {
            source: source.to_owned(),
            targets: target.map(str::to_owned).into_iter().collect(),
        };
        if let Some(done) = pending.replace(next) {
            return Ok(Some(done));
        }
    }
    Ok(pending.take())
}

fn next_json(
    lines: &mut io::Lines<BufReader<Box<dyn Read>>>,
    line: &mut u64,
) -> Result<Option<LinkDocument>> {
    for raw in lines.by_ref() {
        let raw = raw?;
        *line += 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }
        let doc: LinkDocument = serde_json::from_str(trimmed)
            .map_err(|err| CliqueError::input(*line, err.to_string()))?;
        if doc.source.is_empty() {
            return Err(CliqueError::input(*line, "empty source label"));
        }
        let targets: BTreeSet<String> = doc.targets.into_iter().filter(|t| !t.is_empty()).collect();
        return Ok(Some(LinkDocument {
            source: doc.source,
            targets,
        }));
    }
    Ok(None)
}
