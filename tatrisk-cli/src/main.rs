use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use tatrisk_core::{
    EnginePolicy, Task, all_section_summaries, apply_tat_escalation, calculate_tat_metrics,
    calculate_team_capacity_metrics, capacity_rows, data_quality_report, exclude_admin_tickets,
    filter_by_section, filter_by_team_members, get_at_risk_tasks, sprint_summary,
    suggest_reassignments,
};
use tatrisk_ingest::{IngestOptions, read_task_sheet, read_tasks_csv};

mod config;
mod report;
mod state;

#[derive(Parser, Debug)]
#[command(
    name = "tatrisk",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("TATRISK_BUILD_SHA"), ")"),
    about = "TAT risk and sprint capacity checks for task extracts"
)]
struct Cli {
    /// Config file (default: ~/.tatrisk/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More logging on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Promote TAT-breached IR/SR tasks to priority 5 and write the result
    Escalate {
        #[arg(long)]
        csv: PathBuf,

        /// Output CSV (default: update the input in place; only priority and
        /// comment cells change)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// List at-risk and exceeded tasks, most urgent first
    AtRisk {
        #[arg(long)]
        csv: PathBuf,

        /// Limit number of tasks printed
        #[arg(long)]
        limit: Option<usize>,

        /// Warning fraction override, e.g. 0.5
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// TAT compliance per ticket type
    Tat {
        #[arg(long)]
        csv: PathBuf,
    },

    /// Per-person sprint load and team totals
    Capacity {
        #[arg(long)]
        csv: PathBuf,

        /// Also propose reassignments for overloaded people
        #[arg(long)]
        suggest: bool,
    },

    /// Sprint summary
    Summary {
        #[arg(long)]
        csv: PathBuf,

        /// Only this section ("All" for everything)
        #[arg(long)]
        section: Option<String>,

        /// Drop administrative (AD) tickets
        #[arg(long)]
        exclude_admin: bool,

        /// Only tasks of configured team members (plus unassigned)
        #[arg(long)]
        team_only: bool,
    },

    /// Per-section summaries
    Sections {
        #[arg(long)]
        csv: PathBuf,
    },

    /// Data-quality checks on the extract
    Quality {
        #[arg(long)]
        csv: PathBuf,
    },

    /// Manage ~/.tatrisk/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config file if none exists
    Init,

    /// Print the effective config
    Show,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg_path = cli.config.as_deref();

    match cli.command {
        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config(cfg_path)?,
            ConfigCommand::Show => {
                let cfg = config::load_config(cfg_path)?;
                if cli.json {
                    emit_json(&cfg)?;
                } else {
                    print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
                }
            }
        },

        Command::Escalate { csv, out } => {
            let policy = load_policy(cfg_path)?;
            ensure_exists(&csv)?;
            let sheet = read_task_sheet(&csv, &ingest_options(&policy))?;
            let mut tasks = sheet.tasks();
            let n = apply_tat_escalation(&mut tasks, &policy, Utc::now());
            let out = out.unwrap_or(csv);
            sheet.write_updated_to(&out, &tasks)?;
            if cli.json {
                emit_json(&serde_json::json!({ "escalated": n, "output": out }))?;
            } else {
                println!("Escalated {n} task(s); wrote {}", out.display());
            }
        }

        Command::AtRisk {
            csv,
            limit,
            threshold,
        } => {
            if let Some(t) = threshold {
                if !(t > 0.0 && t <= 1.0) {
                    bail!("--threshold must be in (0, 1], got {t}");
                }
            }
            let policy = load_policy(cfg_path)?;
            let tasks = load_tasks(&csv, &policy)?;
            let mut rows = get_at_risk_tasks(&tasks, &policy, threshold);
            if let Some(n) = limit {
                rows.truncate(n);
            }
            if cli.json {
                emit_json(&rows)?;
            } else {
                print!("{}", report::at_risk(&rows));
            }
        }

        Command::Tat { csv } => {
            let policy = load_policy(cfg_path)?;
            let tasks = load_tasks(&csv, &policy)?;
            let m = calculate_tat_metrics(&tasks, &policy);
            if cli.json {
                emit_json(&serde_json::json!({
                    "metrics": m,
                    "overall_compliance": m.overall_compliance(),
                }))?;
            } else {
                print!("{}", report::tat(&m));
            }
        }

        Command::Capacity { csv, suggest } => {
            let policy = load_policy(cfg_path)?;
            let tasks = load_tasks(&csv, &policy)?;
            let rows = capacity_rows(&tasks, &policy);
            let team = calculate_team_capacity_metrics(&tasks, &policy);
            let moves = if suggest {
                suggest_reassignments(&tasks, &policy)
            } else {
                Vec::new()
            };
            if cli.json {
                emit_json(&serde_json::json!({
                    "people": rows,
                    "team": team,
                    "reassignments": moves,
                }))?;
            } else {
                print!("{}", report::capacity(&rows, &team));
                if suggest {
                    println!();
                    print!("{}", report::reassignments(&moves));
                }
            }
        }

        Command::Summary {
            csv,
            section,
            exclude_admin,
            team_only,
        } => {
            let policy = load_policy(cfg_path)?;
            let mut tasks = load_tasks(&csv, &policy)?;
            if let Some(s) = section.as_deref() {
                tasks = filter_by_section(&tasks, s);
            }
            if exclude_admin {
                tasks = exclude_admin_tickets(&tasks);
            }
            if team_only {
                let roster = config::team_roster(cfg_path);
                tasks = filter_by_team_members(&tasks, &roster);
            }
            let s = sprint_summary(&tasks, &policy);
            if cli.json {
                emit_json(&s)?;
            } else {
                print!("{}", report::summary(&s));
            }
        }

        Command::Sections { csv } => {
            let policy = load_policy(cfg_path)?;
            let tasks = load_tasks(&csv, &policy)?;
            let rows = all_section_summaries(&tasks, &policy);
            if cli.json {
                emit_json(&rows)?;
            } else {
                print!("{}", report::sections(&rows));
            }
        }

        Command::Quality { csv } => {
            let policy = load_policy(cfg_path)?;
            let tasks = load_tasks(&csv, &policy)?;
            let r = data_quality_report(&tasks);
            if cli.json {
                emit_json(&r)?;
            } else {
                print!("{}", report::quality(&r));
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_policy(cfg_path: Option<&Path>) -> Result<EnginePolicy> {
    config::load_config(cfg_path)?.policy()
}

fn ensure_exists(csv: &Path) -> Result<()> {
    if !csv.exists() {
        bail!("CSV not found: {} (pass --csv <path>)", csv.display());
    }
    Ok(())
}

fn ingest_options(policy: &EnginePolicy) -> IngestOptions {
    IngestOptions::new(Utc::now(), policy.timezone)
}

fn load_tasks(csv: &Path, policy: &EnginePolicy) -> Result<Vec<Task>> {
    ensure_exists(csv)?;
    let tasks = read_tasks_csv(csv, &ingest_options(policy))?;
    tracing::info!(rows = tasks.len(), path = %csv.display(), "loaded tasks");
    Ok(tasks)
}

fn emit_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{s}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn version_carries_build_id() {
        let cmd = Cli::command();
        let version = cmd.get_version().unwrap_or_default();
        assert!(version.starts_with(env!("CARGO_PKG_VERSION")));
        assert!(version.contains(env!("TATRISK_BUILD_SHA")));
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "tatrisk", "at-risk", "--csv", "sprint.csv", "--threshold", "0.5", "-vv", "--json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.json);
        match cli.command {
            Command::AtRisk { csv, limit, threshold } => {
                assert_eq!(csv, PathBuf::from("sprint.csv"));
                assert_eq!(limit, None);
                assert_eq!(threshold, Some(0.5));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
