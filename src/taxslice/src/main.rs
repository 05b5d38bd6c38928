use std::path::PathBuf;
use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use log::info;

use taxslice::pipeline::{self, MetaphlanConfig};
use taxslice::reads::ReadLayout;
use taxslice::tools::{CladogramOptions, HumannOptions};
use taxslice::Rank;


#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cut the rows of one taxonomic rank out of MetaPhlAn whole-profile tables.
    /// Kept rows are those carrying the requested rank but not the next deeper one; their
    /// labels are reduced to the name at that rank. Each `X_profile.txt` is written to
    /// `X_profile_<rank>.txt` unless --output is given.
    Slice {
        /// Whole-profile table(s), plain or gzipped
        #[arg(required = true)]
        profiles: Vec<PathBuf>,

        /// Rank to keep: kingdom, class, order, family, genus or species
        #[arg(long)]
        rank: Rank,

        /// Output table (only with a single profile)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Profile reads with MetaPhlAn2, write the genus table and draw a GraPhlAn cladogram.
    /// Two read files are merged with bbmerge first.
    Metaphlan {
        /// FASTQ file, or a read 1 / read 2 pair
        #[arg(long, required = true, num_args = 1..=2)]
        fastq: Vec<PathBuf>,

        /// Processes for MetaPhlAn2
        #[arg(long, default_value_t = 12)]
        nproc: usize,

        /// Interpreter for the GraPhlAn scripts (e.g. python2)
        #[arg(long)]
        interpreter: Option<String>,
    },
    /// Quality-filter reads with bbduk, run HUMAnN2, renormalize and join its tables.
    Humann {
        /// Single-end FASTQ file
        #[arg(long)]
        fastq: PathBuf,

        /// Directory containing MetaPhlAn2 (v2.6.0)
        #[arg(long)]
        metaphlan_dir: PathBuf,

        /// Threads for HUMAnN2
        #[arg(long, default_value_t = 10)]
        threads: usize,
    },
    /// Draw a GraPhlAn cladogram from an existing profile.
    Cladogram {
        /// MetaPhlAn profile
        #[arg(long)]
        profile: PathBuf,

        /// Interpreter for the GraPhlAn scripts (e.g. python2)
        #[arg(long)]
        interpreter: Option<String>,

        /// Image resolution
        #[arg(long, default_value_t = 300)]
        dpi: u32,

        /// Distance between the most external graphical element and the border
        #[arg(long, default_value_t = 2.0)]
        pad: f64,
    },
}


fn main() -> anyhow::Result<()> {

    let env = env_logger::Env::default().filter_or("TAXSLICE_LOG_LEVEL", "info");
    env_logger::init_from_env(env);

    let cli = Cli::parse();

    match cli.command {
        Commands::Slice { profiles, rank, output } => {
            match output {
                Some(output) => {
                    if profiles.len() != 1 {
                        bail!("--output can only be used with a single profile ({} given)", profiles.len());
                    }
                    taxslice::slice_file(&profiles[0], &output, rank)
                        .with_context(|| format!("slicing {:?} at {}", profiles[0], rank))?;
                }
                None => {
                    for profile in &profiles {
                        let (output, _) = taxslice::slice_profile(profile, rank)
                            .with_context(|| format!("slicing {:?} at {}", profile, rank))?;
                        info!("{:?} -> {:?}", profile, output);
                    }
                }
            }
        },
        Commands::Metaphlan { fastq, nproc, interpreter } => {
            let layout = ReadLayout::from_paths(&fastq)?;
            let config = MetaphlanConfig {
                nproc,
                cladogram: CladogramOptions { interpreter, ..Default::default() },
            };
            let outputs = pipeline::metaphlan(&layout, &config).context("MetaPhlAn2 pipeline failed")?;
            info!("Profile: {:?}; genus table: {:?}; cladogram: {:?}", outputs.profile, outputs.genus_profile, outputs.cladogram);
        },
        Commands::Humann { fastq, metaphlan_dir, threads } => {
            let opts = HumannOptions { threads, ..Default::default() };
            pipeline::humann(&ReadLayout::Single(fastq), &metaphlan_dir, &opts).context("HUMAnN2 pipeline failed")?;
        },
        Commands::Cladogram { profile, interpreter, dpi, pad } => {
            let opts = CladogramOptions { interpreter, dpi, pad: Some(pad), ..Default::default() };
            let image = pipeline::cladogram(&profile, &opts)
                .with_context(|| format!("drawing cladogram for {:?}", profile))?;
            info!("Cladogram written to {:?}", image);
        },
    }

    Ok(())
}
