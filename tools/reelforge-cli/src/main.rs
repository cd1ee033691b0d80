//! Reelforge CLI: command-line interface for rendering vertical shorts.
//!
//! Usage:
//!   reelforge render [OPTIONS]    Render one short from background, narration, and captions
//!   reelforge batch [OPTIONS]     Render many shorts in parallel
//!   reelforge check               Show the detected hardware capability profile
//!   reelforge themes              List the available themes
//!   reelforge config [--init]     Show or write the effective configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use reelforge_common::config::AppConfig;
use reelforge_scheduler::{create_job, JobOptions};

mod commands;

#[derive(Parser)]
#[command(
    name = "reelforge",
    about = "Assemble narrated vertical shorts with captions, music, and hardware-aware encoding",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the standard location)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a single short
    Render {
        /// Background video
        #[arg(short, long)]
        background: PathBuf,

        /// Narration audio
        #[arg(short, long)]
        audio: PathBuf,

        /// Caption track (JSON)
        #[arg(short, long)]
        captions: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Visual theme
        #[arg(short, long, default_value = "default")]
        theme: String,

        /// Mix in background music
        #[arg(long)]
        music: bool,

        /// Prepend the intro card
        #[arg(long)]
        intro: bool,

        /// Skip the call-to-action overlay
        #[arg(long)]
        no_outro: bool,
    },

    /// Render many shorts with a bounded worker pool
    Batch {
        /// JSON file with an array of job descriptors
        #[arg(long, required_unless_present = "input_dir", conflicts_with = "input_dir")]
        jobs: Option<PathBuf>,

        /// Directory of assets grouped by file stem
        #[arg(long, requires = "output_dir")]
        input_dir: Option<PathBuf>,

        /// Output directory for directory batches
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Theme for directory batches
        #[arg(long, default_value = "default")]
        theme: String,

        /// Mix in background music (directory batches)
        #[arg(long)]
        music: bool,

        /// Prepend the intro card (directory batches)
        #[arg(long)]
        intro: bool,

        /// Skip the call-to-action overlay (directory batches)
        #[arg(long)]
        no_outro: bool,

        /// Worker count (defaults to the capability profile)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Run every job in its own worker process
        #[arg(long)]
        isolate: bool,

        /// Disable the progress counter
        #[arg(long)]
        no_progress: bool,

        /// Write the results as JSON
        #[arg(long)]
        results: Option<PathBuf>,
    },

    /// Check hardware capability and tooling
    Check,

    /// List the available themes
    Themes,

    /// Show the effective configuration
    Config {
        /// Write it to the config file
        #[arg(long)]
        init: bool,
    },

    /// Render one serialized job and print the output path
    #[command(hide = true)]
    Worker {
        /// Job descriptor as JSON
        #[arg(long)]
        job: String,

        /// Capability profile detected by the parent batch, as JSON
        #[arg(long)]
        profile: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    reelforge_common::logging::init_logging(&config.logging);
    config.validate()?;

    match cli.command {
        Commands::Render {
            background,
            audio,
            captions,
            output,
            theme,
            music,
            intro,
            no_outro,
        } => {
            let job = create_job(
                background,
                audio,
                captions,
                output,
                JobOptions {
                    job_id: None,
                    theme,
                    add_music: music,
                    add_intro: intro,
                    add_outro: !no_outro,
                },
            );
            commands::render::run(&config, &job)
        }
        Commands::Batch {
            jobs,
            input_dir,
            output_dir,
            theme,
            music,
            intro,
            no_outro,
            workers,
            isolate,
            no_progress,
            results,
        } => {
            let source = match (jobs, input_dir, output_dir) {
                (Some(file), _, _) => commands::batch::JobSource::File(file),
                (None, Some(input), Some(output)) => commands::batch::JobSource::Directory {
                    input,
                    output,
                    options: JobOptions {
                        job_id: None,
                        theme,
                        add_music: music,
                        add_intro: intro,
                        add_outro: !no_outro,
                    },
                },
                _ => anyhow::bail!("Provide --jobs or both --input-dir and --output-dir"),
            };
            commands::batch::run(
                config,
                cli.config,
                source,
                workers,
                isolate,
                !no_progress,
                results,
            )
            .await
        }
        Commands::Check => commands::check::run(&config),
        Commands::Themes => commands::themes::run(),
        Commands::Config { init } => commands::config::run(&config, cli.config.as_deref(), init),
        Commands::Worker { job, profile } => {
            commands::worker::run(&config, &job, profile.as_deref())
        }
    }
}
