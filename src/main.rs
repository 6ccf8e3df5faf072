//! spr - Reconcile a sprint's planned tasks against reported status.

use clap::Parser;
use sprintrecon::action_log;
use sprintrecon::cli::{
    Cli, Commands, ConfigCommands, PlannedCommands, ReportedCommands, SprintArg, SprintCommands,
    SystemCommands,
};
use sprintrecon::commands::{self, Output};
use sprintrecon::config::{self, ConfigOverrides, OutputFormat, ResolvedConfig};
use sprintrecon::intake::{self, PlannedColumns, ReportedColumns};
use sprintrecon::models::SprintContext;
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (e.g. `debug`, `sprintrecon=info`).
const LOG_ENV: &str = "SPR_LOG";

/// Set to `json` for structured log lines on stderr.
const LOG_FORMAT_ENV: &str = "SPR_LOG_FORMAT";

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let workspace = resolve_workspace(cli.workspace, cli.human_readable);

    let mut overrides = ConfigOverrides::new();
    if cli.human_readable {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }
    let config = config::resolve_for_workspace(&workspace, &overrides).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not read configuration, using defaults");
        let mut fallback = ResolvedConfig::default();
        if let Some(format) = overrides.output_format {
            fallback.output_format = config::Resolved::new(format, config::ValueSource::CliFlag);
        }
        fallback
    });
    let human = config.human();

    let (cmd_name, args_json) = serialize_command(&cli.command);

    let start = Instant::now();
    let result = run_command(cli.command, &workspace, &overrides, human);
    let duration = start.elapsed().as_millis() as u64;

    let (success, error) = match &result {
        Ok(_) => (true, None),
        Err(e) => (false, Some(e.to_string())),
    };
    action_log::log_action(
        &config, &workspace, &cmd_name, args_json, success, error, duration,
    );

    if let Err(e) = result {
        print_error(&e.to_string(), human);
        process::exit(1);
    }
}

/// Install the tracing subscriber. Logs go to stderr so stdout stays parseable.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let json = env::var(LOG_FORMAT_ENV)
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

fn print_error(message: &str, human: bool) {
    if human {
        eprintln!("Error: {}", message);
    } else {
        eprintln!("{}", serde_json::json!({ "error": message }));
    }
}

/// Resolve the workspace path: --workspace flag > SPR_WORKSPACE env > current directory.
fn resolve_workspace(explicit_path: Option<PathBuf>, human: bool) -> PathBuf {
    match explicit_path {
        Some(path) => {
            if !path.exists() {
                print_error(
                    &format!("Specified workspace does not exist: {}", path.display()),
                    human,
                );
                process::exit(1);
            }
            path
        }
        None => env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn context(arg: &SprintArg) -> Result<SprintContext, sprintrecon::Error> {
    SprintContext::new(arg.sprint.clone())
}

fn run_command(
    command: Commands,
    workspace: &Path,
    overrides: &ConfigOverrides,
    human: bool,
) -> Result<(), sprintrecon::Error> {
    match command {
        Commands::System { command } => match command {
            SystemCommands::Init => output(&commands::system_init(workspace)?, human),
            SystemCommands::RebuildCache => {
                output(&commands::system_rebuild_cache(workspace)?, human)
            }
            SystemCommands::Info => output(&commands::system_info(workspace)?, human),
        },

        Commands::Sprint { command } => match command {
            SprintCommands::Open { id } => output(&commands::sprint_open(workspace, &id)?, human),
            SprintCommands::List => output(&commands::sprint_list(workspace)?, human),
            SprintCommands::Show { id } => {
                let ctx = SprintContext::new(id)?;
                output(&commands::sprint_show(workspace, &ctx)?, human)
            }
        },

        Commands::Planned { command } => match command {
            PlannedCommands::Add {
                sprint,
                start_date,
                module,
                code,
                name,
            } => {
                let ctx = context(&sprint)?;
                let columns = PlannedColumns {
                    start_date,
                    module,
                    code,
                    name,
                };
                output(&commands::planned_add(workspace, &ctx, columns)?, human)
            }
            PlannedCommands::Import { sprint, source } => {
                let ctx = context(&sprint)?;
                output(&commands::planned_import(workspace, &ctx, &source)?, human)
            }
            PlannedCommands::List { sprint } => {
                let ctx = context(&sprint)?;
                output(&commands::planned_list(workspace, &ctx)?, human)
            }
        },

        Commands::Reported { command } => match command {
            ReportedCommands::Add {
                sprint,
                report_date,
                module,
                code,
                name,
                progress,
            } => {
                let ctx = context(&sprint)?;
                let columns = ReportedColumns {
                    report_date,
                    module,
                    code,
                    name,
                    progress,
                };
                output(&commands::reported_add(workspace, &ctx, columns)?, human)
            }
            ReportedCommands::Import { sprint, source } => {
                let ctx = context(&sprint)?;
                output(&commands::reported_import(workspace, &ctx, &source)?, human)
            }
            ReportedCommands::List { sprint } => {
                let ctx = context(&sprint)?;
                output(&commands::reported_list(workspace, &ctx)?, human)
            }
        },

        Commands::Compare { sprint } => {
            let ctx = context(&sprint)?;
            output(&commands::compare(workspace, &ctx)?, human)
        }

        Commands::Finalize {
            sprint,
            reasons,
            reasons_file,
        } => {
            let ctx = context(&sprint)?;
            let reasons = intake::collect_reasons(&reasons, reasons_file.as_deref())?;
            output(&commands::finalize(workspace, &ctx, &reasons)?, human)
        }

        Commands::Report { sprint } => {
            let ctx = context(&sprint)?;
            output(&commands::report(workspace, &ctx)?, human)
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => output(&commands::config_show(workspace, overrides)?, human),
            ConfigCommands::Get { key } => output(&commands::config_get(workspace, &key)?, human),
            ConfigCommands::Set { key, value } => {
                output(&commands::config_set(workspace, &key, &value)?, human)
            }
        },
    }

    Ok(())
}

/// Print output in JSON or human-readable format.
fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

/// Command name and arguments for the action log.
fn serialize_command(command: &Commands) -> (String, serde_json::Value) {
    use serde_json::json;

    match command {
        Commands::System { command } => match command {
            SystemCommands::Init => ("system init".to_string(), json!({})),
            SystemCommands::RebuildCache => ("system rebuild-cache".to_string(), json!({})),
            SystemCommands::Info => ("system info".to_string(), json!({})),
        },

        Commands::Sprint { command } => match command {
            SprintCommands::Open { id } => ("sprint open".to_string(), json!({ "id": id })),
            SprintCommands::List => ("sprint list".to_string(), json!({})),
            SprintCommands::Show { id } => ("sprint show".to_string(), json!({ "id": id })),
        },

        Commands::Planned { command } => match command {
            PlannedCommands::Add { sprint, code, .. } => (
                "planned add".to_string(),
                json!({ "sprint": sprint.sprint, "code": code }),
            ),
            PlannedCommands::Import { sprint, source } => (
                "planned import".to_string(),
                json!({ "sprint": sprint.sprint, "source": source }),
            ),
            PlannedCommands::List { sprint } => (
                "planned list".to_string(),
                json!({ "sprint": sprint.sprint }),
            ),
        },

        Commands::Reported { command } => match command {
            ReportedCommands::Add { sprint, code, .. } => (
                "reported add".to_string(),
                json!({ "sprint": sprint.sprint, "code": code }),
            ),
            ReportedCommands::Import { sprint, source } => (
                "reported import".to_string(),
                json!({ "sprint": sprint.sprint, "source": source }),
            ),
            ReportedCommands::List { sprint } => (
                "reported list".to_string(),
                json!({ "sprint": sprint.sprint }),
            ),
        },

        Commands::Compare { sprint } => {
            ("compare".to_string(), json!({ "sprint": sprint.sprint }))
        }

        Commands::Finalize {
            sprint,
            reasons,
            reasons_file,
        } => (
            "finalize".to_string(),
            json!({
                "sprint": sprint.sprint,
                "reasons": reasons.len(),
                "reasons_file": reasons_file,
            }),
        ),

        Commands::Report { sprint } => ("report".to_string(), json!({ "sprint": sprint.sprint })),

        Commands::Config { command } => match command {
            ConfigCommands::Show => ("config show".to_string(), json!({})),
            ConfigCommands::Get { key } => ("config get".to_string(), json!({ "key": key })),
            ConfigCommands::Set { key, value } => (
                "config set".to_string(),
                json!({ "key": key, "value": value }),
            ),
        },
    }
}
