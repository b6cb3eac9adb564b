//! Order and shard test files

use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{debug, info};

use zarro_core::env::known::ZARRO_PRIORITY_TESTS;
use zarro_tasks::{shard, TestFile, TestSequencer};

use crate::cli::{Cli, OutputFormat, Project};
use crate::exit_codes;

pub fn execute(cli: &Cli, project: &Project) -> anyhow::Result<i32> {
    let paths = if cli.args.is_empty() {
        debug!("reading test paths from stdin");
        read_paths(std::io::stdin().lock())?
    } else {
        cli.args.iter().map(PathBuf::from).collect()
    };

    let durations = match &cli.durations {
        Some(file) => load_durations(file)?,
        None => BTreeMap::new(),
    };
    let mut tests = with_durations(paths, &durations);

    if let Some(spec) = cli.shard {
        tests = shard(tests, spec.index, spec.count)?;
        info!(shard = %spec, tests = tests.len(), "selected shard");
    }

    let sequencer = TestSequencer::new(priority(project)).with_root_dir(&project.root);
    let runtime = tokio::runtime::Runtime::new()?;
    let ordered = runtime.block_on(sequencer.sort(tests))?;

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ordered)?),
        OutputFormat::Text => {
            for test in &ordered {
                println!("{}", test.path.display());
            }
        }
    }
    Ok(exit_codes::SUCCESS)
}

/// Priority names from ZARRO_PRIORITY_TESTS and the `[tests]` config
fn priority(project: &Project) -> Vec<String> {
    let mut names = project.env.resolve_array(ZARRO_PRIORITY_TESTS, ",");
    for name in &project.config.tests.priority {
        if !names.contains(name) {
            names.push(name.clone());
        }
    }
    names
}

fn read_paths(reader: impl BufRead) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for line in reader.lines() {
        let line = line.context("Failed to read test paths")?;
        let line = line.trim();
        if !line.is_empty() {
            paths.push(PathBuf::from(line));
        }
    }
    Ok(paths)
}

fn load_durations(file: &Path) -> anyhow::Result<BTreeMap<PathBuf, u64>> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    serde_json::from_str(&content).with_context(|| {
        format!(
            "{} is not a JSON map of test path to milliseconds",
            file.display()
        )
    })
}

fn with_durations(paths: Vec<PathBuf>, durations: &BTreeMap<PathBuf, u64>) -> Vec<TestFile> {
    paths
        .into_iter()
        .map(|path| {
            let duration_ms = durations.get(&path).copied();
            TestFile {
                path,
                duration_ms,
                file_size: None,
            }
        })
        .collect()
}
