// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! spacey-esm CLI
//!
//! - `spacey-esm compile <FILE>` compiles one module and prints the wrapped
//!   body, optionally with its source map
//! - `spacey-esm graph <ENTRY>` fetches and compiles a whole module graph
//!   and prints the compiled resources as JSON, the same shape a runtime can
//!   preload

mod cli;

use anyhow::{Context, bail};
use clap::Parser;
use cli::{Cli, Commands, CompileArgs, GraphArgs};
use owo_colors::OwoColorize;
use spacey_compiler::{Compiler, CompilerOptions, NoExports};
use spacey_loader::{ModuleResource, Runtime, RuntimeConfig};
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, info};
use url::Url;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "spacey_esm=debug,spacey_loader=debug,spacey_compiler=debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref(), cli.base_url)?;
    match cli.command {
        Commands::Compile(args) => {
            let code = compile_file(&args)?;
            println!("{}", code);
        }
        Commands::Graph(args) => {
            let json = build_graph(config, &args.entry).await?;
            match args.output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    eprintln!("{} {}", "Wrote".green().bold(), path.display().cyan());
                }
                None => println!("{}", json),
            }
        }
    }
    Ok(())
}

/// Loads the config file, if any, and applies command line overrides.
fn load_config(path: Option<&Path>, base_url: Option<String>) -> anyhow::Result<RuntimeConfig> {
    let mut config = match path {
        Some(path) => RuntimeConfig::load(path)?,
        None => RuntimeConfig::default(),
    };
    if base_url.is_some() {
        config.base_url = base_url;
        config.validate()?;
    }
    Ok(config)
}

/// Turns a command line module argument into a URL: absolute URLs as they
/// are, anything else as a path on disk.
fn module_url(arg: &str) -> anyhow::Result<Url> {
    if let Ok(url) = Url::parse(arg) {
        // Windows drive letters parse as a one-letter scheme
        if url.scheme().len() > 1 {
            return Ok(url);
        }
    }
    let path = std::fs::canonicalize(arg).with_context(|| format!("Cannot find '{}'", arg))?;
    match Url::from_file_path(&path) {
        Ok(url) => Ok(url),
        Err(()) => bail!("Cannot convert '{}' to a file URL", path.display()),
    }
}

/// Compiles one file without looking at its dependencies.
fn compile_file(args: &CompileArgs) -> anyhow::Result<String> {
    let code = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let store_id = match &args.store_id {
        Some(id) => id.clone(),
        None => module_url(&args.file.to_string_lossy())?.to_string(),
    };
    let filename = args
        .file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| store_id.clone());
    debug!(store_id = %store_id, "compiling");

    let output = Compiler::new(CompilerOptions {
        code,
        store_id: store_id.clone(),
        filename,
    })?
    .transform()
    .generate_code(&NoExports)?;

    if let Some(path) = &args.map {
        std::fs::write(path, output.map.to_json())
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "wrote source map");
    }

    let resource = ModuleResource {
        real_url: store_id.clone(),
        store_id,
        code: output.code,
        map: output.map,
        exports: output.exports,
    };
    Ok(if args.inline_map {
        resource.annotated_code()
    } else {
        resource.code
    })
}

/// Compiles the graph reachable from `entry` and renders it as JSON.
async fn build_graph(config: RuntimeConfig, entry: &str) -> anyhow::Result<String> {
    let runtime = Runtime::builder().config(config).build()?;
    let entry = if runtime.config().base_url.is_some() && Url::parse(entry).is_err() {
        runtime.resolve_id(entry)?
    } else {
        module_url(entry)?
    };
    info!(entry = %entry, "building module graph");

    runtime.compile_and_fetch(entry.as_str(), None).await?;
    if runtime.resource(entry.as_str()).is_none() {
        bail!("Module '{}' not found", entry);
    }

    let resources = runtime.resources();
    let modules: Vec<&ModuleResource> = resources.iter().map(|r| r.as_ref()).collect();
    let report = serde_json::json!({
        "entry": entry.as_str(),
        "modules": modules,
        "missing": runtime.absent(),
    });
    Ok(serde_json::to_string_pretty(&report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn compile_args(file: PathBuf) -> CompileArgs {
        CompileArgs {
            file,
            store_id: Some("https://example.com/main.js".into()),
            map: None,
            inline_map: false,
        }
    }

    #[test]
    fn test_compile_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("main.js");
        std::fs::write(&file, "import { a } from './a.js';\nexport const b = a;\n").unwrap();

        let code = compile_file(&compile_args(file)).unwrap();
        assert!(code.contains("const b = __m0__.a;"));
        assert!(!code.contains("sourceMappingURL"));
    }

    #[test]
    fn test_compile_with_maps() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("main.js");
        std::fs::write(&file, "export const b = 1;\n").unwrap();

        let mut args = compile_args(file);
        args.inline_map = true;
        let code = compile_file(&args).unwrap();
        assert!(code.contains("//# sourceURL=https://example.com/main.js"));
        assert!(code.contains("//# sourceMappingURL=data:application/json;base64,"));

        let map_path = dir.path().join("main.js.map");
        args.inline_map = false;
        args.map = Some(map_path.clone());
        compile_file(&args).unwrap();
        let map: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(map_path).unwrap()).unwrap();
        assert_eq!(map["version"], 3);
        assert_eq!(map["file"], "main.js");
    }

    #[test]
    fn test_compile_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("dup.js");
        std::fs::write(&file, "let a;\nlet a;\n").unwrap();
        let err = compile_file(&compile_args(file)).unwrap_err();
        assert!(err.to_string().contains("dup.js"));
    }

    #[test]
    fn test_base_url_override() {
        let config = load_config(None, Some("https://example.com/app/".into())).unwrap();
        assert_eq!(config.base_url.as_deref(), Some("https://example.com/app/"));
        assert!(load_config(None, Some("nope".into())).is_err());
    }

    #[tokio::test]
    async fn test_graph_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("main.js"),
            "import { a } from './a.js';\nimport './gone.js';\nexport const b = a;\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("a.js"), "export const a = 1;\n").unwrap();

        let entry = dir.path().join("main.js");
        let json = build_graph(RuntimeConfig::default(), &entry.to_string_lossy())
            .await
            .unwrap();
        let report: serde_json::Value = serde_json::from_str(&json).unwrap();

        let modules = report["modules"].as_array().unwrap();
        assert_eq!(modules.len(), 2);
        assert!(modules.iter().any(|m| m["exports"] == serde_json::json!(["a"])));
        assert_eq!(report["missing"].as_array().unwrap().len(), 1);
        assert!(report["missing"][0].as_str().unwrap().ends_with("/gone.js"));
    }

    #[tokio::test]
    async fn test_graph_missing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let url = Url::from_file_path(dir.path().join("nope.js")).unwrap();
        let err = build_graph(RuntimeConfig::default(), url.as_str())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
