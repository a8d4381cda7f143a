//! Plain-text benchmark interchange format.
//!
//! ```text
//! n d k
//! <n lines of d space-separated floats>   dataset, row-major
//! nq
//! <nq lines of d space-separated floats>  queries
//! ```
//!
//! There is no version field. Blank lines are ignored; any other malformed
//! line is a fatal [`NnsError::Parse`].

use rand::Rng;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;

use crate::dataset::VectorDataset;
use crate::error::{NnsError, Result};

/// A dataset, a query set and the `k` to evaluate them at.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkData {
    pub k: usize,
    pub dataset: VectorDataset,
    pub queries: VectorDataset,
}

impl BenchmarkData {
    /// `n` dataset vectors and `nq` queries with components uniform in `[0, 1)`.
    pub fn synthetic<R: Rng + ?Sized>(
        n: usize,
        dimension: usize,
        k: usize,
        nq: usize,
        rng: &mut R,
    ) -> Result<Self> {
        Ok(Self {
            k,
            dataset: VectorDataset::random(n, dimension, rng)?,
            queries: VectorDataset::random(nq, dimension, rng)?,
        })
    }

    pub fn read_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::read(BufReader::new(File::open(path)?))
    }

    pub fn read<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = LineReader::new(reader);

        let (line_no, header) = lines.next_line("header `n d k`")?;
        let header = parse_counts(line_no, &header, 3)?;
        let (n, dimension, k) = (header[0], header[1], header[2]);
        if dimension == 0 {
            return Err(parse_error(line_no, "dimension must be at least 1"));
        }

        let dataset = read_rows(&mut lines, n, dimension, "dataset row")?;

        let (line_no, count) = lines.next_line("query count `nq`")?;
        let nq = parse_counts(line_no, &count, 1)?[0];
        let queries = read_rows(&mut lines, nq, dimension, "query row")?;

        lines.expect_end()?;
        Ok(Self {
            k,
            dataset,
            queries,
        })
    }

    pub fn write_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        writeln!(
            writer,
            "{} {} {}",
            self.dataset.len(),
            self.dataset.dimension(),
            self.k
        )?;
        write_rows(&mut writer, &self.dataset)?;
        writeln!(writer, "{}", self.queries.len())?;
        write_rows(&mut writer, &self.queries)?;
        Ok(())
    }
}

fn parse_error(line: usize, reason: impl Into<String>) -> NnsError {
    NnsError::Parse {
        line,
        reason: reason.into(),
    }
}

/// Line iterator that tracks 1-based line numbers and skips blank lines.
struct LineReader<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl<R: BufRead> LineReader<R> {
    fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }

    fn next_line(&mut self, expected: &str) -> Result<(usize, String)> {
        for line in self.lines.by_ref() {
            let line = line?;
            self.line_no += 1;
            if !line.trim().is_empty() {
                return Ok((self.line_no, line));
            }
        }
        Err(parse_error(
            self.line_no + 1,
            format!("unexpected end of file, expected {expected}"),
        ))
    }

    fn expect_end(&mut self) -> Result<()> {
        for line in self.lines.by_ref() {
            let line = line?;
            self.line_no += 1;
            if !line.trim().is_empty() {
                return Err(parse_error(self.line_no, "unexpected content after last query"));
            }
        }
        Ok(())
    }
}

fn parse_counts(line_no: usize, line: &str, expected: usize) -> Result<Vec<usize>> {
    let counts = line
        .split_whitespace()
        .map(|token| {
            token
                .parse::<usize>()
                .map_err(|_| parse_error(line_no, format!("invalid count {token:?}")))
        })
        .collect::<Result<Vec<usize>>>()?;
    if counts.len() != expected {
        return Err(parse_error(
            line_no,
            format!("expected {expected} integers, found {}", counts.len()),
        ));
    }
    Ok(counts)
}

fn parse_row(line_no: usize, line: &str, dimension: usize) -> Result<Vec<f32>> {
    let row = line
        .split_whitespace()
        .map(|token| {
            token
                .parse::<f32>()
                .map_err(|_| parse_error(line_no, format!("invalid float {token:?}")))
        })
        .collect::<Result<Vec<f32>>>()?;
    if row.len() != dimension {
        return Err(parse_error(
            line_no,
            format!("expected {dimension} components, found {}", row.len()),
        ));
    }
    Ok(row)
}

fn read_rows<R: BufRead>(
    lines: &mut LineReader<R>,
    count: usize,
    dimension: usize,
    what: &str,
) -> Result<VectorDataset> {
    // Counts come from the header; grow as rows arrive instead of trusting them.
    let mut rows = VectorDataset::new(dimension)?;
    for _ in 0..count {
        let (line_no, line) = lines.next_line(what)?;
        rows.push(&parse_row(line_no, &line, dimension)?)?;
    }
    Ok(rows)
}

fn write_rows<W: Write>(writer: &mut W, rows: &VectorDataset) -> Result<()> {
    for (_, row) in rows.iter() {
        let line: Vec<String> = row.iter().map(|x| x.to_string()).collect();
        writeln!(writer, "{}", line.join(" "))?;
    }
    Ok(())
}
