//! Command-line interface for the talentscout worker, built on clap.
//!
//! Defines the [`Cli`] struct with subcommands [`Command`] (run, demo)
//! and global flags (--rate-limit, --verbose).

use clap::{Parser, Subcommand};

/// talentscout — recruiter discovery worker for job-outreach pipelines.
#[derive(Debug, Parser)]
#[command(name = "talentscout", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Override the hourly browser-action budget for this session.
    #[arg(long, global = true)]
    pub rate_limit: Option<u32>,

    /// Enable verbose output.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Process a queue of job postings from a JSON file.
    Run {
        /// Path to a JSON file containing an array of {job_id, url} records.
        #[arg(long)]
        file: String,

        /// Path the JSONL result stream is written to.
        #[arg(long, default_value = "results.jsonl")]
        out: String,
    },

    /// Run the built-in discovery demonstration against scripted pages.
    Demo,
}
