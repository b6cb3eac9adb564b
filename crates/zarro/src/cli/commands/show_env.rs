//! Show the environment variables tasks read

use std::collections::BTreeSet;

use console::style;

use zarro_core::{EnvironmentRegistry, EnvironmentVariable};

use crate::cli::output::{header, key_value, plural};
use crate::cli::{Cli, OutputFormat, Project};
use crate::exit_codes;

pub fn execute(cli: &Cli, project: &Project) -> anyhow::Result<i32> {
    let variables = select(&project.env, &cli.args);

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&variables)?),
        OutputFormat::Text => {
            if !cli.args.is_empty() {
                println!(
                    "{}",
                    header(&format!("Variables read by {}", cli.args.join(", ")))
                );
                println!();
            }
            print!("{}", render(&variables));
            if !cli.quiet {
                println!("{}", style(plural(variables.len(), "variable")).dim());
            }
        }
    }
    Ok(exit_codes::SUCCESS)
}

/// Variables read by any of `tasks`, or all of them when no task is given
fn select(env: &EnvironmentRegistry, tasks: &[String]) -> Vec<EnvironmentVariable> {
    if tasks.is_empty() {
        return env.variables();
    }
    let names: BTreeSet<String> = tasks
        .iter()
        .flat_map(|task| env.variables_for_task(task))
        .collect();
    names.iter().filter_map(|name| env.variable(name)).collect()
}

fn render(variables: &[EnvironmentVariable]) -> String {
    let mut out = String::new();
    for variable in variables {
        out.push_str(&format!("{}\n", style(&variable.name).cyan().bold()));
        if let Some(help) = &variable.help {
            out.push_str(&format!("  {}\n", help));
        }
        if let Some(default) = &variable.default {
            out.push_str(&key_value("default", default));
            out.push('\n');
        }
        if !variable.tasks.is_empty() {
            let tasks: Vec<&str> = variable.tasks.iter().map(String::as_str).collect();
            out.push_str(&key_value("tasks", &tasks.join(", ")));
            out.push('\n');
        }
        out.push('\n');
    }
    out
}
