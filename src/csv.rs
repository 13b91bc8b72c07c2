//! Plain CSV I/O for matrices: one matrix row per line, values separated by commas.

use std::fmt::Display;
use std::fs::File;
use std::io;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::linear::Matrix;

pub struct CsvWriter {
    writer: BufWriter<File>,
}
impl CsvWriter {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, io::Error> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        Ok(Self { writer })
    }

    pub fn append<R>(&mut self, record: R) -> Result<(), io::Error>
    where
        R: IntoIterator,
        R::Item: Display,
    {
        let mut first = true;
        for datum in record.into_iter() {
            if first {
                first = false;
            } else {
                self.writer.write_all(b",")?;
            }
            write!(self.writer, "{datum}")?;
        }
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), io::Error> {
        self.writer.flush()
    }
}

pub struct CsvReader {
    lines: Lines<BufReader<File>>,
}
impl CsvReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, io::Error> {
        let file = File::open(path)?;
        let lines = BufReader::new(file).lines();
        Ok(Self { lines })
    }

    pub fn read(&mut self) -> Option<Result<Vec<String>, io::Error>> {
        self.lines.next().map(|line| {
            line.map(|line| line.split(',').map(|datum| datum.trim().to_string()).collect())
        })
    }
}

impl Iterator for CsvReader {
    type Item = Result<Vec<String>, io::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read()
    }
}

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("line {line}: expected {expected} values, got {actual}")]
    Ragged {
        line: usize,
        expected: usize,
        actual: usize,
    },

    #[error("line {line}: cannot parse '{datum}'")]
    Parse { line: usize, datum: String },
}

pub fn write_matrix<T: Display>(path: impl AsRef<Path>, matrix: &Matrix<T>) -> Result<(), io::Error> {
    let mut writer = CsvWriter::create(path)?;
    for row in 0..matrix.rows() {
        writer.append(matrix.row_slice(row))?;
    }
    writer.flush()
}

/// Reads a matrix written by [write_matrix]. Blank lines are skipped; every remaining line must
/// hold the same number of values.
pub fn read_matrix<T: FromStr>(path: impl AsRef<Path>) -> Result<Matrix<T>, CsvError> {
    let mut data = vec![];
    let (mut rows, mut cols) = (0, None);
    for (line_index, record) in CsvReader::open(path)?.enumerate() {
        let record = record?;
        if record.len() == 1 && record[0].is_empty() {
            continue;
        }
        let expected = *cols.get_or_insert(record.len());
        if record.len() != expected {
            return Err(CsvError::Ragged {
                line: line_index + 1,
                expected,
                actual: record.len(),
            });
        }
        for datum in record {
            let value = datum.parse().map_err(|_| CsvError::Parse {
                line: line_index + 1,
                datum: datum.clone(),
            })?;
            data.push(value);
        }
        rows += 1;
    }
    Ok(Matrix::from_vec(rows, cols.unwrap_or(0), data))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::testing::scratch_dir;

    #[test]
    fn matrix_round_trip() {
        let path = scratch_dir("matrix_round_trip").join("phase.csv");
        let matrix = Matrix::from_vec(2, 3, vec![0.0, 1.5, -2.25, 3.0, 4.0, 5.125]);
        write_matrix(&path, &matrix).unwrap();
        assert_eq!("0,1.5,-2.25\n3,4,5.125\n", fs::read_to_string(&path).unwrap());
        assert_eq!(matrix, read_matrix::<f64>(&path).unwrap());
    }

    #[test]
    fn read_matrix_errors() {
        let dir = scratch_dir("read_matrix_errors");
        let ragged = dir.join("ragged.csv");
        fs::write(&ragged, "1,2,3\n4,5\n").unwrap();
        assert_eq!(
            "line 2: expected 3 values, got 2",
            read_matrix::<u8>(&ragged).unwrap_err().to_string()
        );

        let garbled = dir.join("garbled.csv");
        fs::write(&garbled, "1,2\n\n3,x\n").unwrap();
        assert_eq!(
            "line 3: cannot parse 'x'",
            read_matrix::<u8>(&garbled).unwrap_err().to_string()
        );

        assert!(matches!(
            read_matrix::<u8>(dir.join("absent.csv")),
            Err(CsvError::Io(_))
        ));
    }
}
