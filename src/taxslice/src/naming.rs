//! File naming conventions used to hand artifacts from one pipeline stage to the next.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Result, TaxsliceError};
use crate::rank::Rank;

static READ_ONE_FASTQ: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*)_1(\.f(?:ast)?q(?:\.gz)?)$").unwrap());

fn file_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| unconventional(path, "a UTF-8 file name"))
}

fn unconventional(path: &Path, expected: &str) -> TaxsliceError {
    TaxsliceError::UnconventionalName { path: path.to_path_buf(), expected: expected.to_string() }
}

/// Replace the first `from` in the file name of `path` with `to`, or fail if `from` is absent.
fn rename_part(path: &Path, from: &str, to: &str) -> Result<PathBuf> {
    let name = file_name(path)?;
    if !name.contains(from) {
        return Err(unconventional(path, &format!("file name containing '{from}'")));
    }
    Ok(path.with_file_name(name.replacen(from, to, 1)))
}

/// Sample name of a reads file: its file name up to the first underscore or dot.
pub fn sample_name(reads: &Path) -> Result<String> {
    let name = file_name(reads)?;
    match name.split(['_', '.']).next() {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(unconventional(reads, "file name starting with a sample name")),
    }
}

/// `S_1.fastq.gz` -> `S.merged.fastq.gz`: where bbmerge writes the merged pair.
pub fn merged_reads_path(read1: &Path) -> Result<PathBuf> {
    let name = file_name(read1)?;
    let caps = READ_ONE_FASTQ
        .captures(name)
        .ok_or_else(|| unconventional(read1, "<sample>_1.fastq[.gz]"))?;
    Ok(read1.with_file_name(format!("{}.merged{}", &caps[1], &caps[2])))
}

pub fn profile_path(workdir: &Path, reads: &Path) -> Result<PathBuf> {
    Ok(workdir.join(format!("{}_profile.txt", sample_name(reads)?)))
}

pub fn biom_path(workdir: &Path, reads: &Path) -> Result<PathBuf> {
    Ok(workdir.join(format!("{}_OTU.biom", sample_name(reads)?)))
}

/// `S_profile.txt` -> `S_profile_<rank>.txt`
pub fn rank_profile_path(profile: &Path, rank: Rank) -> Result<PathBuf> {
    rename_part(profile, "_profile", &format!("_profile_{rank}"))
}

/// `S_profile.txt` -> `S_genus_profile.txt`, the genus table fed to the cladogram.
pub fn genus_profile_path(profile: &Path) -> Result<PathBuf> {
    rename_part(profile, "_profile", "_genus_profile")
}

/// `S_profile.txt` -> `S_profile.annot.txt`
pub fn annotation_path(profile: &Path) -> Result<PathBuf> {
    rename_part(profile, "profile", "profile.annot")
}

/// `S.fastq` -> `S_filtered.fastq`
pub fn filtered_reads_path(reads: &Path) -> Result<PathBuf> {
    rename_part(reads, ".fastq", "_filtered.fastq")
}

/// Relative-abundance counterpart of a HUMAnN2 gene family or pathway abundance table.
pub fn relab_path(table: &Path) -> Result<PathBuf> {
    let name = file_name(table)?;
    if name.ends_with("genefamilies.tsv") {
        rename_part(table, "genefamilies.tsv", "genefamilies_relab.tsv")
    } else if name.ends_with("pathabundance.tsv") {
        rename_part(table, "pathabundance.tsv", "pathabundance_relab.tsv")
    } else {
        Err(unconventional(table, "*genefamilies.tsv or *pathabundance.tsv"))
    }
}

pub fn humann_output_dir(reads: &Path) -> PathBuf {
    reads.parent().unwrap_or(Path::new("")).join("humann2_output")
}

/// Directory that holds `path`, `.` for bare file names.
pub fn workdir_of(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn find_matching<F: Fn(&str) -> bool>(dir: &Path, keep: F) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if entry.file_name().to_str().is_some_and(&keep) {
            found.push(entry.path());
        }
    }
    found.sort();
    Ok(found)
}

/// Files directly in `dir` whose names end with `suffix`, sorted.
pub fn find_by_suffix(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    find_matching(dir, |name| name.ends_with(suffix))
}

/// Files directly in `dir` named `<prefix>*<suffix>`, sorted.
pub fn find_by_prefix(dir: &Path, prefix: &str, suffix: &str) -> Result<Vec<PathBuf>> {
    find_matching(dir, |name| name.starts_with(prefix) && name.ends_with(suffix))
}

/// Create `dir`, wiping it first if it already exists.
pub fn recreate_dir(dir: &Path) -> Result<()> {
    match fs::create_dir(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            fs::remove_dir_all(dir)?;
            fs::create_dir(dir)?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merged_name_drops_pair_tag() {
        let merged = merged_reads_path(Path::new("/data/S12_1.fastq.gz")).unwrap();
        assert_eq!(merged, PathBuf::from("/data/S12.merged.fastq.gz"));
        let merged = merged_reads_path(Path::new("run_10_1.fq")).unwrap();
        assert_eq!(merged, PathBuf::from("run_10.merged.fq"));
    }

    #[test]
    fn merged_name_requires_read_one() {
        assert!(matches!(
            merged_reads_path(Path::new("/data/S12_2.fastq.gz")),
            Err(TaxsliceError::UnconventionalName { .. })
        ));
    }

    #[test]
    fn profile_names_follow_sample() {
        let reads = Path::new("/data/S12.merged.fastq.gz");
        assert_eq!(sample_name(Path::new("/data/S12_L001_1.fastq")).unwrap(), "S12");
        assert_eq!(profile_path(Path::new("/work"), reads).unwrap(), PathBuf::from("/work/S12_profile.txt"));
        let reads = Path::new("/data/S12_1.fastq.gz");
        assert_eq!(profile_path(Path::new("/work"), reads).unwrap(), PathBuf::from("/work/S12_profile.txt"));
        assert_eq!(biom_path(Path::new("/work"), reads).unwrap(), PathBuf::from("/work/S12_OTU.biom"));
    }

    #[test]
    fn derived_profile_names() {
        let profile = Path::new("/work/S12_profile.txt");
        assert_eq!(rank_profile_path(profile, Rank::Species).unwrap(), PathBuf::from("/work/S12_profile_species.txt"));
        assert_eq!(genus_profile_path(profile).unwrap(), PathBuf::from("/work/S12_genus_profile.txt"));
        assert_eq!(annotation_path(profile).unwrap(), PathBuf::from("/work/S12_profile.annot.txt"));
    }

    #[test]
    fn profile_without_convention_is_rejected() {
        assert!(matches!(
            rank_profile_path(Path::new("/work/abundances.txt"), Rank::Genus),
            Err(TaxsliceError::UnconventionalName { .. })
        ));
    }

    #[test]
    fn humann_names() {
        assert_eq!(filtered_reads_path(Path::new("/d/S1.fastq")).unwrap(), PathBuf::from("/d/S1_filtered.fastq"));
        assert_eq!(
            relab_path(Path::new("/o/S1_filtered_genefamilies.tsv")).unwrap(),
            PathBuf::from("/o/S1_filtered_genefamilies_relab.tsv")
        );
        assert_eq!(
            relab_path(Path::new("/o/S1_pathabundance.tsv")).unwrap(),
            PathBuf::from("/o/S1_pathabundance_relab.tsv")
        );
        assert!(relab_path(Path::new("/o/S1_pathcoverage.tsv")).is_err());
        assert_eq!(humann_output_dir(Path::new("/d/S1.fastq")), PathBuf::from("/d/humann2_output"));
    }

    #[test]
    fn workdir_of_bare_name_is_current_dir() {
        assert_eq!(workdir_of(Path::new("S1_profile.txt")), PathBuf::from("."));
        assert_eq!(workdir_of(Path::new("/w/S1_profile.txt")), PathBuf::from("/w"));
    }
}
