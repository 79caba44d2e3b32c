//! CLI module for semcache
//!
//! Provides subcommands for exercising the cache from the command line:
//! - `demo`: run prompts through a cached simulated backend
//! - `config`: print the effective configuration

pub mod config;
pub mod demo;

use clap::{Parser, Subcommand};

/// semcache - Semantic response cache for expensive backends
#[derive(Parser)]
#[command(name = "semcache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run prompts through the cache in front of a simulated backend
    Demo(demo::DemoArgs),

    /// Print the effective configuration as JSON
    Config,
}
