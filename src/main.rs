use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use issue_base::error::IssueError;
use issue_base::format::record_file_name;
use issue_base::logging;
use issue_base::prompt::{create_interactive, LinePrompter, Preset};
use issue_base::registry::Registry;
use issue_base::types::{Confirmation, Issue};
use std::env;
use std::path::PathBuf;
use tracing::debug;

mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Environment variable naming the base directory
const BASE_DIR_ENV: &str = "ISSUE_BASE_DIR";

#[derive(Parser)]
#[command(
    name = "issue",
    about = "Creates and lists issues present in the current directory.",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_DATE"), ")")
)]
struct Cli {
    /// Create a new issue
    #[arg(short = 'n')]
    new: bool,

    /// List all issues available
    #[arg(short = 'l')]
    list: bool,

    /// List an issue by its id
    #[arg(long, value_name = "ID")]
    id: Option<String>,

    /// List issues whose urgency is >= N
    #[arg(short = 'u', value_name = "N")]
    min_urge: Option<u32>,

    /// List issues whose urgency is == N
    #[arg(short = 'U', value_name = "N")]
    exact_urge: Option<u32>,

    /// Close the issues with these ids
    #[arg(short = 'c', num_args = 1.., value_name = "ID")]
    close: Vec<String>,

    /// Remove an issue by id
    #[arg(short = 'd', value_name = "ID")]
    delete: Option<String>,

    /// Remove all issues that are closed
    #[arg(short = 'D')]
    delete_closed: bool,

    /// Name for the new issue instead of asking
    #[arg(long, requires = "new")]
    name: Option<String>,

    /// Description for the new issue instead of asking
    #[arg(long, requires = "new")]
    info: Option<String>,

    /// Urgency for the new issue instead of asking
    #[arg(long, requires = "new")]
    urge: Option<u32>,

    /// Override an existing issue with the same name without asking
    #[arg(long, requires = "new", conflicts_with = "no")]
    yes: bool,

    /// Keep an existing issue with the same name without asking
    #[arg(long, requires = "new")]
    no: bool,

    /// Base directory holding the issues/ store (supports ISSUE_BASE_DIR env var)
    #[arg(long, global = true, value_name = "PATH")]
    dir: Option<PathBuf>,

    /// Output JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Show debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

impl Cli {
    fn has_action(&self) -> bool {
        self.new
            || self.list
            || self.id.is_some()
            || self.min_urge.is_some()
            || self.exact_urge.is_some()
            || !self.close.is_empty()
            || self.delete.is_some()
            || self.delete_closed
    }

    fn preset(&self) -> Preset {
        let overwrite = if self.yes {
            Some(Confirmation::Yes)
        } else if self.no {
            Some(Confirmation::No)
        } else {
            None
        };
        Preset {
            name: self.name.clone(),
            info: self.info.clone(),
            urge: self.urge,
            overwrite,
        }
    }
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.quiet, cli.verbose)?;
    debug!(
        version = built_info::PKG_VERSION,
        commit = built_info::GIT_COMMIT_HASH_SHORT.unwrap_or("unknown"),
        "starting"
    );

    if !cli.has_action() {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    }

    let base_dir = get_base_dir(&cli.dir)?;
    let mut registry = Registry::load(base_dir).context("Failed to load issues")?;

    if cli.new {
        if !cli.json {
            println!("** Creating a new issue **");
        }
        let mut prompter = LinePrompter::stdio();
        let created = create_interactive(
            &mut registry,
            &mut prompter,
            &cli.preset(),
            chrono::Local::now(),
        );
        if let Some(issue) = allow_cancel(created)? {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&issue)?);
            } else {
                println!(
                    "** A new issue written to file '{}' was created. **",
                    record_file_name(&issue.id)
                );
                println!();
                print!("{}", issue);
            }
        }
    }

    if !cli.close.is_empty() {
        let closed = registry.close(cli.close.as_slice())?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&closed)?);
        } else if !closed.is_empty() {
            let quoted: Vec<String> = closed.iter().map(|n| format!("'{}'", n)).collect();
            println!("The following issues were closed: [{}]", quoted.join(", "));
        }
    }

    if let Some(id) = &cli.delete {
        if registry.delete_by_id(id)? {
            if !cli.json {
                println!("Deleted issue: {}", id);
            }
        } else if !cli.json {
            println!("{}", IssueError::NotFound { id: id.clone() });
        }
    }

    if cli.delete_closed {
        let deleted = registry.delete_closed()?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&deleted)?);
        } else {
            for id in deleted {
                println!("Deleted issue: {}", id);
            }
        }
    }

    if cli.list {
        let issues = registry.list();
        if issues.is_empty() && !cli.json {
            println!("There are no issues available.");
        } else {
            print_issues(&issues, cli.json)?;
        }
    }

    if let Some(id) = &cli.id {
        match registry.get(id) {
            Some(issue) => print_issues(&[issue], cli.json)?,
            None if cli.json => print_issues(&[], true)?,
            None => println!("{}", IssueError::NotFound { id: id.clone() }),
        }
    }

    if let Some(threshold) = cli.min_urge {
        print_issues(&registry.list_by_min_urgency(threshold), cli.json)?;
    }

    if let Some(urge) = cli.exact_urge {
        print_issues(&registry.list_by_exact_urgency(urge), cli.json)?;
    }

    Ok(())
}

/// Turn a cancelled operation into a message instead of a failure
fn allow_cancel<T>(result: Result<T, IssueError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(IssueError::Cancelled { reason }) => {
            debug!(reason = %reason, "operation cancelled");
            println!();
            println!("{}", reason);
            println!("Operation cancelled.");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn print_issues(issues: &[&Issue], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(issues)?);
    } else {
        for issue in issues {
            print!("{}", issue);
        }
    }
    Ok(())
}

fn get_base_dir(dir_arg: &Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = dir_arg {
        Ok(dir.clone())
    } else if let Ok(dir) = env::var(BASE_DIR_ENV) {
        Ok(PathBuf::from(dir))
    } else {
        env::current_dir().context("Failed to determine current directory")
    }
}
