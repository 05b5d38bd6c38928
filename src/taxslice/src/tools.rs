//! Command lines for the external programs the pipelines drive.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use itertools::Itertools;
use log::info;

use crate::error::{Result, TaxsliceError};

/// One external program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// File that receives the program's standard output.
    pub stdout: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: &str) -> Self {
        ToolCommand { program: program.to_string(), args: Vec::new(), cwd: None, stdout: None }
    }

    /// Run `script` through `interpreter` when one is given, e.g. `python2 graphlan.py`.
    pub fn script(interpreter: Option<&str>, script: &str) -> Self {
        match interpreter {
            Some(i) => ToolCommand::new(i).arg(script),
            None => ToolCommand::new(script),
        }
    }

    pub fn arg(mut self, arg: impl ToString) -> Self {
        self.args.push(arg.to_string());
        self
    }

    pub fn path(self, path: &Path) -> Self {
        let arg = path.display().to_string();
        self.arg(arg)
    }

    /// `key=value` style argument used by the BBTools scripts.
    pub fn kv(self, key: &str, value: impl fmt::Display) -> Self {
        self.arg(format!("{key}={value}"))
    }

    /// `--flag value`
    pub fn opt(self, flag: &str, value: impl ToString) -> Self {
        self.arg(flag).arg(value)
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    pub fn stdout_to(mut self, file: &Path) -> Self {
        self.stdout = Some(file.to_path_buf());
        self
    }

    pub fn to_command(&self) -> Result<Command> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        if let Some(out) = &self.stdout {
            cmd.stdout(Stdio::from(File::create(out)?));
        }
        Ok(cmd)
    }

    /// Run to completion. A missing program or a non-zero exit is an error.
    pub fn run(&self) -> Result<()> {
        which::which(&self.program).map_err(|_| TaxsliceError::ToolNotFound(self.program.clone()))?;
        info!("{}", self);
        let status = self.to_command()?.status()?;
        if !status.success() {
            return Err(TaxsliceError::ToolFailed { command: self.to_string(), status });
        }
        Ok(())
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", std::iter::once(&self.program).chain(self.args.iter()).join(" "))?;
        if let Some(out) = &self.stdout {
            write!(f, " > {}", out.display())?;
        }
        Ok(())
    }
}

/// Merge a read pair into one file.
pub fn bbmerge(read1: &Path, read2: &Path, merged: &Path) -> ToolCommand {
    ToolCommand::new("bbmerge.sh")
        .kv("in1", read1.display())
        .kv("in2", read2.display())
        .kv("out", merged.display())
        .kv("overwrite", "true")
}

/// Adapter and quality trimming ahead of HUMAnN2.
pub fn bbduk(reads: &Path, filtered: &Path, min_length: usize) -> ToolCommand {
    ToolCommand::new("bbduk.sh")
        .arg("-Xmx1g")
        .kv("in", reads.display())
        .kv("out", filtered.display())
        .kv("qtrim", "w")
        .kv("trimq", 10)
        .kv("k", 25)
        .kv("minlength", min_length)
        .kv("ref", "adapters")
}

/// Taxonomic profile of one reads file; the profile itself goes to stdout.
pub fn metaphlan2(reads: &Path, biom: &Path, profile: &Path, nproc: usize) -> ToolCommand {
    ToolCommand::new("metaphlan2.py")
        .path(reads)
        .opt("--input_type", "fastq")
        .opt("--bt2_ps", "sensitive-local")
        .opt("--biom", biom.display())
        .opt("--nproc", nproc)
        .stdout_to(profile)
}

#[derive(Debug, Clone)]
pub struct CladogramOptions {
    /// Interpreter for the GraPhlAn scripts, e.g. `python2`; `None` runs them directly.
    pub interpreter: Option<String>,
    pub most_abundant: usize,
    pub abundance_threshold: f64,
    pub least_biomarkers: usize,
    pub dpi: u32,
    pub pad: Option<f64>,
}

impl Default for CladogramOptions {
    fn default() -> Self {
        CladogramOptions {
            interpreter: None,
            most_abundant: 100,
            abundance_threshold: 1.0,
            least_biomarkers: 10,
            dpi: 300,
            pad: None,
        }
    }
}

pub const TREE_FILE: &str = "merged_abundance.tree.txt";
pub const XML_FILE: &str = "merged_abundance.xml";
pub const IMAGE_FILE: &str = "merged_abundance.png";

/// Tree and annotation files for GraPhlAn from a profile.
pub fn export2graphlan(profile: &Path, annotation: &Path, opts: &CladogramOptions) -> ToolCommand {
    ToolCommand::script(opts.interpreter.as_deref(), "export2graphlan.py")
        .opt("--skip_rows", "1,2")
        .opt("-i", profile.display())
        .opt("--tree", TREE_FILE)
        .opt("--annotation", annotation.display())
        .opt("--most_abundant", opts.most_abundant)
        .opt("--abundance_threshold", opts.abundance_threshold)
        .opt("--least_biomarkers", opts.least_biomarkers)
        .opt("--annotations", "5,6")
        .opt("--external_annotations", 7)
        .opt("--min_clade_size", 1)
}

pub fn graphlan_annotate(annotation: &Path, opts: &CladogramOptions) -> ToolCommand {
    ToolCommand::script(opts.interpreter.as_deref(), "graphlan_annotate.py")
        .opt("--annot", annotation.display())
        .arg(TREE_FILE)
        .arg(XML_FILE)
}

pub fn graphlan(opts: &CladogramOptions) -> ToolCommand {
    let cmd = ToolCommand::script(opts.interpreter.as_deref(), "graphlan.py").opt("--dpi", opts.dpi);
    let cmd = match opts.pad {
        Some(pad) => cmd.opt("--pad", pad),
        None => cmd,
    };
    cmd.arg(XML_FILE).arg(IMAGE_FILE)
}

#[derive(Debug, Clone)]
pub struct HumannOptions {
    pub threads: usize,
    pub translated_query_coverage_threshold: f64,
    pub identity_threshold: f64,
    pub min_read_length: usize,
}

impl Default for HumannOptions {
    fn default() -> Self {
        HumannOptions {
            threads: 10,
            translated_query_coverage_threshold: 80.0,
            identity_threshold: 40.0,
            min_read_length: 50,
        }
    }
}

pub fn humann2(reads: &Path, outdir: &Path, metaphlan_dir: &Path, opts: &HumannOptions) -> ToolCommand {
    ToolCommand::new("humann2")
        .opt("--input", reads.display())
        .opt("--output", outdir.display())
        .opt("--memory-use", "maximum")
        .opt("--threads", opts.threads)
        .opt("--metaphlan", metaphlan_dir.display())
        .opt("--translated-query-coverage-threshold", format!("{:.1}", opts.translated_query_coverage_threshold))
        .opt("--identity-threshold", format!("{:.1}", opts.identity_threshold))
}

pub fn humann2_renorm_table(table: &Path, output: &Path) -> ToolCommand {
    ToolCommand::new("humann2_renorm_table")
        .opt("--input", table.display())
        .opt("--output", output.display())
        .opt("--units", "relab")
}

pub fn humann2_join_tables(outdir: &Path, output: &Path, file_name: &str) -> ToolCommand {
    ToolCommand::new("humann2_join_tables")
        .opt("--input", outdir.display())
        .opt("--output", output.display())
        .opt("--file_name", file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbmerge_command_line() {
        let cmd = bbmerge(Path::new("/d/S_1.fastq.gz"), Path::new("/d/S_2.fastq.gz"), Path::new("/d/S.merged.fastq.gz"));
        assert_eq!(
            cmd.to_string(),
            "bbmerge.sh in1=/d/S_1.fastq.gz in2=/d/S_2.fastq.gz out=/d/S.merged.fastq.gz overwrite=true"
        );
    }

    #[test]
    fn metaphlan_writes_profile_to_stdout() {
        let cmd = metaphlan2(Path::new("/d/S.fq"), Path::new("/w/S_OTU.biom"), Path::new("/w/S_profile.txt"), 12);
        assert_eq!(cmd.stdout, Some(PathBuf::from("/w/S_profile.txt")));
        assert_eq!(
            cmd.to_string(),
            "metaphlan2.py /d/S.fq --input_type fastq --bt2_ps sensitive-local --biom /w/S_OTU.biom --nproc 12 > /w/S_profile.txt"
        );
    }

    #[test]
    fn graphlan_scripts_with_interpreter() {
        let opts = CladogramOptions { interpreter: Some("python2".to_string()), pad: Some(2.0), ..Default::default() };
        let cmd = graphlan(&opts);
        assert_eq!(cmd.program, "python2");
        assert_eq!(cmd.to_string(), "python2 graphlan.py --dpi 300 --pad 2 merged_abundance.xml merged_abundance.png");

        let cmd = graphlan_annotate(Path::new("S_profile.annot.txt"), &opts);
        assert_eq!(cmd.args, vec!["graphlan_annotate.py", "--annot", "S_profile.annot.txt", TREE_FILE, XML_FILE]);
    }

    #[test]
    fn export2graphlan_defaults() {
        let cmd = export2graphlan(Path::new("S_profile.txt"), Path::new("S_profile.annot.txt"), &CladogramOptions::default());
        assert_eq!(cmd.program, "export2graphlan.py");
        let line = cmd.to_string();
        assert!(line.contains("--most_abundant 100 --abundance_threshold 1 --least_biomarkers 10"));
        assert!(line.ends_with("--annotations 5,6 --external_annotations 7 --min_clade_size 1"));
    }

    #[test]
    fn humann2_thresholds_keep_decimal() {
        let cmd = humann2(Path::new("r.fastq"), Path::new("out"), Path::new("/opt/metaphlan"), &HumannOptions::default());
        assert!(cmd.to_string().ends_with("--translated-query-coverage-threshold 80.0 --identity-threshold 40.0"));
    }

    #[test]
    fn missing_tool_is_reported() {
        let cmd = ToolCommand::new("definitely-not-an-installed-tool-xyz");
        assert!(matches!(cmd.run(), Err(TaxsliceError::ToolNotFound(ref p)) if p == "definitely-not-an-installed-tool-xyz"));
    }
}
