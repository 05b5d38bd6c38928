use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use log::info;

use crate::error::{Result, TaxsliceError};
use crate::naming;
use crate::rank::Rank;
use crate::reads::{self, ReadLayout};
use crate::slice;
use crate::tools::{self, CladogramOptions, HumannOptions, ToolCommand};

/// Format a duration the way the pipelines report it, `h:mm:ss`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

fn expect_artifact(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(TaxsliceError::MissingArtifact(path.to_path_buf()))
    }
}

fn run_all(commands: &[ToolCommand]) -> Result<()> {
    for cmd in commands {
        cmd.run()?;
    }
    Ok(())
}

/// The three GraPhlAn steps, in the order they must run. All of them work inside `workdir`.
pub fn cladogram_commands(profile: &Path, workdir: &Path, opts: &CladogramOptions) -> Result<Vec<ToolCommand>> {
    let annotation = naming::annotation_path(profile)?;
    Ok(vec![
        tools::export2graphlan(profile, &annotation, opts).current_dir(workdir),
        tools::graphlan_annotate(&annotation, opts).current_dir(workdir),
        tools::graphlan(opts).current_dir(workdir),
    ])
}

/// Render a cladogram image for `profile`. Returns the image path.
pub fn cladogram(profile: &Path, opts: &CladogramOptions) -> Result<PathBuf> {
    let start = Instant::now();
    // the GraPhlAn steps run inside the work directory, so relative paths would break
    let profile = profile.canonicalize()?;
    let workdir = naming::workdir_of(&profile);
    let commands = cladogram_commands(&profile, &workdir, opts)?;

    info!("Creating GraPhlAn input files...");
    commands[0].run()?;
    info!("Creating cladogram input files...");
    commands[1].run()?;
    info!("Visualizing cladogram...");
    commands[2].run()?;

    let image = workdir.join(tools::IMAGE_FILE);
    expect_artifact(&image)?;
    info!("Finished cladogram in {}", format_elapsed(start.elapsed()));
    Ok(image)
}

#[derive(Debug, Clone)]
pub struct MetaphlanConfig {
    pub nproc: usize,
    pub cladogram: CladogramOptions,
}

impl Default for MetaphlanConfig {
    fn default() -> Self {
        MetaphlanConfig { nproc: 12, cladogram: CladogramOptions::default() }
    }
}

/// Artifacts left behind by the MetaPhlAn2 + GraPhlAn pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaphlanOutputs {
    pub reads: PathBuf,
    pub profile: PathBuf,
    pub biom: PathBuf,
    pub genus_profile: PathBuf,
    pub cladogram: PathBuf,
}

/// Reads handed to MetaPhlAn2 and the command that produces them, if the pair needs merging.
pub fn metaphlan_input(layout: &ReadLayout) -> Result<(PathBuf, Option<ToolCommand>)> {
    match layout {
        ReadLayout::Single(reads) => Ok((reads.clone(), None)),
        ReadLayout::Paired(read1, read2) => {
            let merged = naming::merged_reads_path(read1)?;
            let cmd = tools::bbmerge(read1, read2, &merged);
            Ok((merged, Some(cmd)))
        }
    }
}

/// Profile reads with MetaPhlAn2, cut the genus table out of the profile and draw the cladogram.
/// A read pair is merged with bbmerge first.
pub fn metaphlan(layout: &ReadLayout, config: &MetaphlanConfig) -> Result<MetaphlanOutputs> {
    let start = Instant::now();
    info!("MetaPhlAn2 + GraPhlAn pipeline");
    reads::check_layout(layout)?;

    let workdir = naming::workdir_of(layout.first());
    info!("Work directory: {:?}", workdir);

    let (reads, merge) = metaphlan_input(layout)?;
    match merge {
        Some(cmd) => {
            info!("Paired-end reads detected, merging");
            cmd.run()?;
            expect_artifact(&reads)?;
        }
        None => info!("Single reads detected"),
    }

    info!("Running MetaPhlAn2...");
    let profile = naming::profile_path(&workdir, &reads)?;
    let biom = naming::biom_path(&workdir, &reads)?;
    tools::metaphlan2(&reads, &biom, &profile, config.nproc).run()?;
    expect_artifact(&profile)?;

    info!("Generating genus abundance table...");
    let genus_profile = naming::genus_profile_path(&profile)?;
    slice::slice_file(&profile, &genus_profile, Rank::Genus)?;

    let cladogram = cladogram(&profile, &config.cladogram)?;

    info!("Finished MetaPhlAn2 functions in {}", format_elapsed(start.elapsed()));
    Ok(MetaphlanOutputs { reads, profile, biom, genus_profile, cladogram })
}

/// HUMAnN2 table kinds joined across samples: (file name given to the join tool, joined file).
pub const JOINED_TABLES: [(&str, &str); 3] = [
    ("genefamilies_relab", "humann2_genefamilies.tsv"),
    ("pathcoverage", "humann2_pathcoverage.tsv"),
    ("pathabundance_relab", "humann2_pathabundance.tsv"),
];

pub fn join_commands(outdir: &Path) -> Vec<ToolCommand> {
    JOINED_TABLES
        .iter()
        .map(|(kind, joined)| tools::humann2_join_tables(outdir, &outdir.join(joined), kind))
        .collect()
}

/// Renormalization commands for each table plus the relative-abundance files they write.
pub fn renorm_commands(tables: &[PathBuf]) -> Result<(Vec<ToolCommand>, Vec<PathBuf>)> {
    let mut commands = Vec::with_capacity(tables.len());
    let mut outputs = Vec::with_capacity(tables.len());
    for table in tables {
        let relab = naming::relab_path(table)?;
        commands.push(tools::humann2_renorm_table(table, &relab));
        outputs.push(relab);
    }
    Ok((commands, outputs))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HumannOutputs {
    pub outdir: PathBuf,
    pub genefamilies_relab: Vec<PathBuf>,
    pub pathabundances_relab: Vec<PathBuf>,
    pub joined: Vec<PathBuf>,
}

/// Quality-filter single-end reads, run HUMAnN2 on them, convert gene families and pathway
/// abundances to relative abundance and join the per-sample tables.
pub fn humann(layout: &ReadLayout, metaphlan_dir: &Path, opts: &HumannOptions) -> Result<HumannOutputs> {
    let start = Instant::now();
    info!("HUMAnN2 pipeline");
    let reads = match layout {
        ReadLayout::Single(r) => r,
        ReadLayout::Paired(..) => {
            return Err(TaxsliceError::Unsupported("Paired end reads not yet supported by the HUMAnN2 pipeline".to_string()))
        }
    };
    reads::check_fastq(reads)?;
    info!("Input: {:?}; MetaPhlAn directory: {:?}", reads, metaphlan_dir);

    let filtered = naming::filtered_reads_path(reads)?;
    tools::bbduk(reads, &filtered, opts.min_read_length).run()?;
    expect_artifact(&filtered)?;

    info!("Running HUMAnN2...");
    let outdir = naming::humann_output_dir(&filtered);
    naming::recreate_dir(&outdir)?;
    tools::humann2(&filtered, &outdir, metaphlan_dir, opts).run()?;

    let genefamilies = naming::find_by_suffix(&outdir, "genefamilies.tsv")?;
    let pathabundances = naming::find_by_suffix(&outdir, "pathabundance.tsv")?;

    let (commands, genefamilies_relab) = renorm_commands(&genefamilies)?;
    run_all(&commands)?;
    let (commands, pathabundances_relab) = renorm_commands(&pathabundances)?;
    run_all(&commands)?;
    info!("Gene families (relab): {:?}", genefamilies_relab);
    info!("Pathway abundances (relab): {:?}", pathabundances_relab);

    run_all(&join_commands(&outdir))?;
    let joined = naming::find_by_prefix(&outdir, "humann2", ".tsv")?;
    info!("Final output files: {:?}", joined);

    info!("Finished HUMAnN2 functions in {}", format_elapsed(start.elapsed()));
    Ok(HumannOutputs { outdir, genefamilies_relab, pathabundances_relab, joined })
}
