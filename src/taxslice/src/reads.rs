use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use bio::io::fastq;
use flate2::read::MultiGzDecoder;
use log::info;

use crate::error::{Result, TaxsliceError};

/// Single-end or paired-end input, as decided by the number of files given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadLayout {
    Single(PathBuf),
    Paired(PathBuf, PathBuf),
}

impl ReadLayout {
    pub fn from_paths(paths: &[PathBuf]) -> Result<ReadLayout> {
        match paths {
            [single] => Ok(ReadLayout::Single(single.clone())),
            [read1, read2] => Ok(ReadLayout::Paired(read1.clone(), read2.clone())),
            _ => Err(TaxsliceError::ReadCount(paths.len())),
        }
    }

    pub fn files(&self) -> Vec<&Path> {
        match self {
            ReadLayout::Single(r) => vec![r.as_path()],
            ReadLayout::Paired(r1, r2) => vec![r1.as_path(), r2.as_path()],
        }
    }

    /// First read file; its directory is the pipeline's working directory.
    pub fn first(&self) -> &Path {
        match self {
            ReadLayout::Single(r) | ReadLayout::Paired(r, _) => r,
        }
    }
}

fn invalid(path: &Path, reason: impl Into<String>) -> TaxsliceError {
    TaxsliceError::InvalidFastq { path: path.to_path_buf(), reason: reason.into() }
}

fn open_fastq(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).map_err(|e| invalid(path, e.to_string()))?;
    if path.extension().is_some_and(|e| e == "gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Make sure `path` opens and starts with a parseable FASTQ record before handing it to
/// an external tool.
pub fn check_fastq(path: &Path) -> Result<()> {
    let reader = fastq::Reader::from_bufread(open_fastq(path)?);
    match reader.records().next() {
        None => Err(invalid(path, "no records")),
        Some(Err(e)) => Err(invalid(path, e.to_string())),
        Some(Ok(record)) => {
            record.check().map_err(|e| invalid(path, e))?;
            info!("{:?} looks like FASTQ (first record {})", path, record.id());
            Ok(())
        }
    }
}

pub fn check_layout(layout: &ReadLayout) -> Result<()> {
    for file in layout.files() {
        check_fastq(file)?;
    }
    Ok(())
}
