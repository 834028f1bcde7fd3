//! CLI binary entrypoint.

mod commands;
mod demo;
mod error;
mod format;
mod logging;

use clap::{Parser, Subcommand};
use commands::{RunCommandInput, run_config_check, run_config_show, run_exporter, run_info};
use error::{CliError, ExitCode};
use format::{LogFormat, OutputArgs, OutputMode};
use metrics_export_adapters::StdoutLogSink;
use metrics_export_infra::redact_if_secret;
use metrics_export_shared::ErrorEnvelope;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(
    name = "mex",
    version,
    about = "Harvest a metric registry into interval-based batches",
    long_about = None
)]
struct Cli {
    #[command(flatten)]
    output: OutputArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show implementation and version details.
    Info,
    /// Config-related commands.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Export an in-process registry to stdout until interrupted.
    Run {
        /// Optional config file path (JSON/TOML).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Partial config JSON applied over the file.
        #[arg(long)]
        overrides_json: Option<String>,
        /// Drive a synthetic workload so batches carry data.
        #[arg(long)]
        demo: bool,
        /// Run a single harvest and exit.
        #[arg(long, conflicts_with = "duration_secs")]
        once: bool,
        /// Stop after this many seconds instead of waiting for Ctrl-C.
        #[arg(long)]
        duration_secs: Option<u64>,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// Validate the effective config (file + overrides + `MEX_*` env).
    Check {
        /// Optional config file path (JSON/TOML).
        #[arg(long = "config")]
        path: Option<PathBuf>,
        /// Partial config JSON applied over the file.
        #[arg(long)]
        overrides_json: Option<String>,
    },
    /// Print the effective config with secrets redacted.
    Show {
        /// Optional config file path (JSON/TOML).
        #[arg(long = "config")]
        path: Option<PathBuf>,
        /// Partial config JSON applied over the file.
        #[arg(long)]
        overrides_json: Option<String>,
    },
}

pub(crate) struct CliOutput {
    stdout: String,
    stderr: String,
    exit_code: ExitCode,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let mode = OutputMode::from_args(&cli.output);

    match run(&cli.command, mode) {
        Ok(output) => match write_output(&output) {
            Ok(()) => std::process::ExitCode::from(output.exit_code.as_u8()),
            Err(error) => exit_with_error(&error),
        },
        Err(error) => exit_with_error(&error),
    }
}

fn exit_with_error(error: &CliError) -> std::process::ExitCode {
    let _ = writeln!(io::stderr(), "error: {error}");
    std::process::ExitCode::from(error.exit_code().as_u8())
}

fn run(command: &Commands, mode: OutputMode) -> Result<CliOutput, CliError> {
    let env = collect_scoped_env("MEX_");
    match command {
        Commands::Info => run_info(mode),
        Commands::Config { command } => match command {
            ConfigCommands::Check {
                path,
                overrides_json,
            } => run_config_check(mode, &env, path.as_deref(), overrides_json.as_deref()),
            ConfigCommands::Show {
                path,
                overrides_json,
            } => run_config_show(mode, &env, path.as_deref(), overrides_json.as_deref()),
        },
        Commands::Run {
            config,
            overrides_json,
            demo,
            once,
            duration_secs,
        } => {
            let input = RunCommandInput {
                config_path: config.as_deref(),
                overrides_json: overrides_json.as_deref(),
                demo: *demo,
                once: *once,
                duration: duration_secs.map(Duration::from_secs),
            };
            let logger = if mode.no_progress {
                None
            } else {
                let directive = logging::env_filter_directive(|name| std::env::var(name).ok());
                if mode.log_format == LogFormat::Text {
                    logging::init_tracing(&directive);
                }
                Some(logging::build_logger(mode.log_format, &directive))
            };
            run_exporter(mode, &env, input, Arc::new(StdoutLogSink), logger)
        },
    }
}

/// Render an error envelope as command output; metadata values are redacted.
pub(crate) fn format_error_output(
    mode: OutputMode,
    error: &ErrorEnvelope,
    exit_code: ExitCode,
) -> CliOutput {
    let metadata: BTreeMap<&str, String> = error
        .metadata
        .iter()
        .map(|(key, value)| (key.as_str(), redact_if_secret(key, value)))
        .collect();

    let stdout = if mode.is_json() {
        let payload = serde_json::json!({
            "status": "error",
            "error": {
                "code": error.code.to_string(),
                "message": error.message,
                "kind": error.kind,
                "class": error.class,
                "metadata": metadata,
            }
        });
        let mut out = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| {
            "{\"status\":\"error\",\"error\":{\"code\":\"core:internal\"}}".to_string()
        });
        out.push('\n');
        out
    } else {
        let mut out = format!("status: error\ncode: {}\nmessage: {}\n", error.code, error.message);
        for (key, value) in &metadata {
            out.push_str(&format!("{key}: {value}\n"));
        }
        out
    };

    CliOutput {
        stdout,
        stderr: String::new(),
        exit_code,
    }
}

pub(crate) fn log_info(stderr: &mut String, message: &str, no_progress: bool) {
    if no_progress {
        return;
    }
    stderr.push_str("info: ");
    stderr.push_str(message);
    stderr.push('\n');
}

fn write_output(output: &CliOutput) -> Result<(), CliError> {
    let mut stdout = io::stdout();
    stdout.write_all(output.stdout.as_bytes())?;

    if !output.stderr.is_empty() {
        let mut stderr = io::stderr();
        stderr.write_all(output.stderr.as_bytes())?;
        stderr.flush()?;
    }

    Ok(())
}

fn collect_scoped_env(prefix: &str) -> BTreeMap<String, String> {
    std::env::vars()
        .filter(|(key, _)| key.starts_with(prefix))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::OutputFormat;
    use clap::CommandFactory;
    use metrics_export_config::{ENV_API_KEY, ENV_HARVEST_INTERVAL_MS, ENV_NAME};
    use metrics_export_shared::ErrorCode;

    const fn mode(format: OutputFormat) -> OutputMode {
        OutputMode {
            format,
            log_format: LogFormat::Text,
            no_progress: true,
        }
    }

    #[test]
    fn version_flag_is_supported() {
        let result = Cli::command().try_get_matches_from(["mex", "--version"]);
        let is_version = matches!(
            result,
            Err(error) if error.kind() == clap::error::ErrorKind::DisplayVersion
        );

        assert!(is_version, "expected clap to render version");
    }

    #[test]
    fn once_conflicts_with_duration() {
        let result = Cli::command().try_get_matches_from([
            "mex",
            "run",
            "--once",
            "--duration-secs",
            "3",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn info_json_output_shape() -> Result<(), Box<dyn std::error::Error>> {
        let output = run_info(mode(OutputFormat::Json))?;
        let value: serde_json::Value = serde_json::from_str(output.stdout.trim())?;

        assert_eq!(value["status"], "ok");
        let implementation = value["implementation"]
            .as_object()
            .ok_or_else(|| io::Error::other("implementation object missing"))?;
        for key in [
            "provider",
            "version",
            "versionResolved",
            "profile",
            "configVersion",
            "infraVersion",
        ] {
            assert!(implementation.contains_key(key), "missing {key}");
        }
        assert_eq!(implementation["provider"], "metrics-export");
        Ok(())
    }

    #[test]
    fn config_show_applies_env_and_redacts_the_key() -> Result<(), Box<dyn std::error::Error>> {
        let env = BTreeMap::from([
            (ENV_NAME.to_string(), "billing".to_string()),
            (ENV_API_KEY.to_string(), "nr-live-secret".to_string()),
        ]);
        let output = run_config_show(mode(OutputFormat::Text), &env, None, None)?;

        assert_eq!(output.exit_code, ExitCode::Ok);
        assert!(output.stdout.starts_with("status: ok\nconfig:\n"));
        assert!(output.stdout.contains("\"name\": \"billing\""));
        assert!(!output.stdout.contains("nr-live-secret"));
        Ok(())
    }

    #[test]
    fn config_check_reports_invalid_env_as_input_error() -> Result<(), Box<dyn std::error::Error>> {
        let env = BTreeMap::from([(ENV_HARVEST_INTERVAL_MS.to_string(), "10".to_string())]);
        let output = run_config_check(mode(OutputFormat::Json), &env, None, None)?;

        assert_eq!(output.exit_code, ExitCode::InvalidInput);
        let value: serde_json::Value = serde_json::from_str(output.stdout.trim())?;
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"]["code"], "config:invalid_limit");
        Ok(())
    }

    #[test]
    fn error_metadata_is_redacted() {
        let error = ErrorEnvelope::expected(ErrorCode::invalid_input(), "bad key")
            .with_metadata("apiKey", "nr-live-secret")
            .with_metadata("field", "name");
        let output = format_error_output(mode(OutputFormat::Text), &error, ExitCode::InvalidInput);

        assert!(output.stdout.contains("field: name\n"));
        assert!(!output.stdout.contains("nr-live-secret"));
    }

    #[test]
    fn exit_codes_for_errors() -> Result<(), Box<dyn std::error::Error>> {
        let io_error = CliError::Io(io::Error::other("io"));
        let serialization_error = match serde_json::from_str::<serde_json::Value>("not-json") {
            Ok(_) => return Err("expected serialization error".into()),
            Err(error) => CliError::Serialization(error),
        };
        let runtime_error = CliError::Runtime(anyhow::anyhow!("runtime"));

        assert_eq!(io_error.exit_code(), ExitCode::Io);
        assert_eq!(serialization_error.exit_code(), ExitCode::Internal);
        assert_eq!(runtime_error.exit_code(), ExitCode::Internal);
        assert_eq!(
            CliError::InvalidInput("bad".to_string()).exit_code(),
            ExitCode::InvalidInput
        );
        Ok(())
    }
}
