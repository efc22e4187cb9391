// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Command line arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// spacey-esm - compile ECMAScript modules into virtualized module bodies
#[derive(Parser, Debug)]
#[command(name = "spacey-esm")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Runtime configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Base URL for relative module ids, overrides the config file
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile a single module file and print the generated code
    #[command(alias = "c")]
    Compile(CompileArgs),

    /// Fetch and compile a module graph and print its resources as JSON
    #[command(alias = "g")]
    Graph(GraphArgs),
}

#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Module source file
    pub file: PathBuf,

    /// Store id of the module (defaults to the file's URL)
    #[arg(long)]
    pub store_id: Option<String>,

    /// Write the source map to this file
    #[arg(long, conflicts_with = "inline_map")]
    pub map: Option<PathBuf>,

    /// Append the source map to the code as a data URL
    #[arg(long)]
    pub inline_map: bool,
}

#[derive(Args, Debug)]
pub struct GraphArgs {
    /// Entry module: a URL, or a path on disk
    pub entry: String,

    /// Write the JSON to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_compile() {
        let cli = Cli::try_parse_from(["spacey-esm", "compile", "main.js", "--inline-map"]).unwrap();
        match cli.command {
            Commands::Compile(args) => {
                assert_eq!(args.file, PathBuf::from("main.js"));
                assert!(args.inline_map);
                assert!(args.map.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_map_flags_conflict() {
        assert!(
            Cli::try_parse_from(["spacey-esm", "compile", "a.js", "--map", "a.map", "--inline-map"])
                .is_err()
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "spacey-esm",
            "graph",
            "https://example.com/main.js",
            "--verbose",
            "--base-url",
            "https://example.com/",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.base_url.as_deref(), Some("https://example.com/"));
        assert!(matches!(cli.command, Commands::Graph(_)));
    }
}
