//! List available tasks

use console::style;

use zarro_tasks::{TaskDefinition, TaskRegistry};

use crate::cli::output::{self, plural, task_style};
use crate::cli::{Cli, OutputFormat};
use crate::exit_codes;

pub fn execute(cli: &Cli, tasks: &TaskRegistry) -> anyhow::Result<i32> {
    match cli.format {
        OutputFormat::Json => {
            let list: Vec<_> = tasks
                .iter()
                .map(|task| {
                    serde_json::json!({
                        "name": task.name,
                        "help": task.help,
                        "depends_on": task.depends_on,
                        "parallel": task.parallel,
                        "source": task.source.kind(),
                        "path": task.source.path().map(|p| p.display().to_string()),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&list)?);
        }
        OutputFormat::Text => {
            if tasks.is_empty() {
                output::warning("No tasks found");
                return Ok(exit_codes::SUCCESS);
            }
            for task in tasks.iter() {
                println!("{}", describe(task, cli.verbose));
            }
            if !cli.quiet {
                println!();
                println!(
                    "{} Run {} to run a task",
                    style(plural(tasks.len(), "task")).dim(),
                    style("zarro <task>...").cyan()
                );
            }
        }
    }
    Ok(exit_codes::SUCCESS)
}

fn describe(task: &TaskDefinition, verbose: bool) -> String {
    let width = 20;
    let mut line = format!(
        "  {:<width$} {}",
        task_style().apply_to(&task.name),
        task.help.as_deref().unwrap_or(""),
    );
    if task.source.kind() != "built-in" {
        line.push_str(&format!(" {}", style(format!("[{}]", task.source.kind())).dim()));
    }
    if verbose {
        if !task.depends_on.is_empty() {
            let joiner = if task.parallel { " + " } else { " -> " };
            line.push_str(&format!(
                "\n  {:<width$} after: {}",
                "",
                task.depends_on.join(joiner)
            ));
        }
        if let Some(path) = task.source.path() {
            line.push_str(&format!(
                "\n  {:<width$} from: {}",
                "",
                output::path_style().apply_to(path.display())
            ));
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use zarro_tasks::TaskSource;

    #[test]
    fn test_describe() {
        console::set_colors_enabled(false);
        let task = TaskDefinition::new("docs")
            .with_help("Build the docs")
            .with_depends_on("build")
            .with_source(TaskSource::Local(PathBuf::from("local-tasks/docs.toml")));

        let short = describe(&task, false);
        assert!(short.starts_with("  docs"));
        assert!(short.contains("Build the docs [local]"));
        assert!(!short.contains("after:"));

        let long = describe(&task, true);
        assert!(long.contains("after: build"));
        assert!(long.contains("from: local-tasks/docs.toml"));
    }
}
