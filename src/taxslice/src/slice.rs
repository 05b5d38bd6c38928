use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, info, warn};

use crate::error::Result;
use crate::label::Row;
use crate::naming;
use crate::rank::Rank;

/// Row counts from one slicing pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SliceSummary {
    pub header: usize,
    pub kept: usize,
    /// Rows dropped because they carry the next deeper rank.
    pub deeper: usize,
    /// Rows dropped because the requested rank is absent from their label.
    pub other_rank: usize,
    /// Comment rows and rows with no recognizable rank segment, dropped without output.
    pub malformed: usize,
}

impl SliceSummary {
    pub fn written(&self) -> usize {
        self.header + self.kept
    }
}

/// What happens to one input line when slicing at a given rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Header,
    Write(String),
    DropDeeper,
    DropOtherRank,
    DropMalformed,
    Skip,
}

/// Decide the fate of one line. `next` must be `rank.next()`.
pub fn slice_line(line: &str, rank: Rank, next: Rank) -> Decision {
    match Row::classify(line) {
        Row::Blank => Decision::Skip,
        Row::Header => Decision::Header,
        Row::Comment | Row::Malformed => Decision::DropMalformed,
        Row::Taxon { label, rest } => {
            if label.has_rank(next) {
                return Decision::DropDeeper;
            }
            match label.remainder_after(rank) {
                Some(name) => Decision::Write(format!("{name}{rest}")),
                None => Decision::DropOtherRank,
            }
        }
    }
}

/// Keep the header and the rows that sit exactly at `rank`, with labels cut down to the
/// name at that rank. Abundance values and any further columns pass through untouched.
pub fn slice_lines<R: BufRead, W: Write>(input: R, output: &mut W, rank: Rank) -> Result<SliceSummary> {
    let next = rank.next_or_invalid()?;
    let mut summary = SliceSummary::default();

    for (i, line) in input.lines().enumerate() {
        let line = line?;
        match slice_line(&line, rank, next) {
            Decision::Header => {
                summary.header += 1;
                writeln!(output, "{line}")?;
            }
            Decision::Write(row) => {
                summary.kept += 1;
                writeln!(output, "{row}")?;
            }
            Decision::DropDeeper => summary.deeper += 1,
            Decision::DropOtherRank => summary.other_rank += 1,
            Decision::DropMalformed => {
                debug!("Dropping line {} with no {} segment: {}", i + 1, rank, line);
                summary.malformed += 1;
            }
            Decision::Skip => {}
        }
    }

    Ok(summary)
}

fn is_gzip(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "gz")
}

/// Open a profile for reading, decompressing `.gz` files.
pub fn open_profile(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    if is_gzip(path) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

fn write_sliced(input: &Path, tmp: &Path, compress: bool, rank: Rank) -> Result<SliceSummary> {
    let reader = open_profile(input)?;
    let file = File::create(tmp)?;
    if compress {
        let mut writer = BufWriter::new(GzEncoder::new(file, Compression::default()));
        let summary = slice_lines(reader, &mut writer, rank)?;
        writer.into_inner().map_err(|e| e.into_error())?.finish()?;
        Ok(summary)
    } else {
        let mut writer = BufWriter::new(file);
        let summary = slice_lines(reader, &mut writer, rank)?;
        writer.flush()?;
        Ok(summary)
    }
}

/// Slice `input` at `rank` into `output`. The output only appears once fully written.
pub fn slice_file(input: &Path, output: &Path, rank: Rank) -> Result<SliceSummary> {
    rank.next_or_invalid()?;

    let mut tmp_name = output.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = output.with_file_name(tmp_name);

    let summary = match write_sliced(input, &tmp, is_gzip(output), rank) {
        Ok(s) => s,
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
    };
    fs::rename(&tmp, output)?;

    info!(
        "Wrote {} {} rows to {:?} ({} deeper, {} at other ranks)",
        summary.kept, rank, output, summary.deeper, summary.other_rank
    );
    if summary.malformed > 0 {
        warn!(
            "{} rows of {:?} had no recognizable rank prefix and were left out",
            summary.malformed, input
        );
    }

    Ok(summary)
}

/// Slice a `*_profile*` file into its conventional sibling `*_profile_<rank>*`.
pub fn slice_profile(profile: &Path, rank: Rank) -> Result<(PathBuf, SliceSummary)> {
    rank.next_or_invalid()?;
    let output = naming::rank_profile_path(profile, rank)?;
    let summary = slice_file(profile, &output, rank)?;
    Ok((output, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaxsliceError;

    const PROFILE: &str = "\
#SampleID\tMetaphlan2_Analysis
ID\tsample_a
k__Bacteria\t100.0
k__Bacteria|g__Escherichia\t15.7
k__Bacteria|g__Escherichia|s__coli\t12.5
k__Bacteria|g__Escherichia|s__coli|t__coli_unclassified\t12.5
k__Bacteria|g__Escherichia|s__albertii\t3.2
k__Bacteria|g__Bacteroides\t3.2
unclassified\t1.0
";

    fn run(rank: Rank) -> (String, SliceSummary) {
        let mut out = Vec::new();
        let summary = slice_lines(PROFILE.as_bytes(), &mut out, rank).unwrap();
        (String::from_utf8(out).unwrap(), summary)
    }

    #[test]
    fn genus_slice_excludes_species_rows() {
        let (out, summary) = run(Rank::Genus);
        assert_eq!(out, "ID\tsample_a\nEscherichia\t15.7\nBacteroides\t3.2\n");
        assert_eq!(summary.kept, 2);
        assert_eq!(summary.header, 1);
        assert_eq!(summary.deeper, 3);
        assert_eq!(summary.other_rank, 1);
        assert_eq!(summary.malformed, 2);
    }

    #[test]
    fn species_slice_strips_to_species_name() {
        let (out, summary) = run(Rank::Species);
        assert_eq!(out, "ID\tsample_a\ncoli\t12.5\nalbertii\t3.2\n");
        assert_eq!(summary.kept, 2);
        assert_eq!(summary.deeper, 1);
        assert_eq!(summary.other_rank, 3);
    }

    #[test]
    fn species_row_without_strain_is_kept() {
        let mut out = Vec::new();
        slice_lines("k__Bacteria|g__Escherichia|s__coli\t12.5\n".as_bytes(), &mut out, Rank::Species).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "coli\t12.5\n");
    }

    #[test]
    fn row_missing_intermediate_ranks_is_kept() {
        let decision = slice_line("k__Bacteria|g__Escherichia\t3.2", Rank::Genus, Rank::Species);
        assert_eq!(decision, Decision::Write("Escherichia\t3.2".to_string()));
    }

    #[test]
    fn extra_columns_pass_through() {
        let decision = slice_line("k__Bacteria|g__Escherichia\t3.2\t0.0\t7.1", Rank::Genus, Rank::Species);
        assert_eq!(decision, Decision::Write("Escherichia\t3.2\t0.0\t7.1".to_string()));
    }

    #[test]
    fn header_only_table() {
        for rank in &Rank::ALL[..6] {
            let mut out = Vec::new();
            let summary = slice_lines("ID\ts1\ts2\n".as_bytes(), &mut out, *rank).unwrap();
            assert_eq!(String::from_utf8(out).unwrap(), "ID\ts1\ts2\n");
            assert_eq!(summary.written(), 1);
        }
    }

    #[test]
    fn strain_is_rejected() {
        let mut out = Vec::new();
        let result = slice_lines(PROFILE.as_bytes(), &mut out, Rank::Strain);
        assert!(matches!(result, Err(TaxsliceError::InvalidRank(_))));
        assert!(out.is_empty());
    }
}
