//! Info command handler.

use crate::CliOutput;
use crate::error::{CliError, ExitCode};
use crate::format::OutputMode;
use metrics_export_adapters::adapters_crate_version;
use metrics_export_config::config_crate_version;
use metrics_export_core::{ImplementationInfo, implementation_info};
use metrics_export_infra::infra_crate_version;

/// Run the info command.
pub fn run_info(mode: OutputMode) -> Result<CliOutput, CliError> {
    let info = implementation_info();

    let stdout = if mode.is_json() {
        format_info_json(&info)?
    } else {
        format_info_text(&info)
    };

    Ok(CliOutput {
        stdout,
        stderr: String::new(),
        exit_code: ExitCode::Ok,
    })
}

fn format_info_text(info: &ImplementationInfo) -> String {
    format!(
        "status: ok\nprovider: {}\nversion: {}\nprofile: {}\nconfig: {}\nadapters: {}\ninfra: {}\n",
        info.provider,
        info.version,
        info.profile,
        config_crate_version(),
        adapters_crate_version(),
        infra_crate_version(),
    )
}

fn format_info_json(info: &ImplementationInfo) -> Result<String, CliError> {
    let payload = serde_json::json!({
        "status": "ok",
        "implementation": {
            "provider": info.provider,
            "version": info.version,
            "versionResolved": !info.is_unknown_version(),
            "profile": info.profile,
            "configVersion": config_crate_version(),
            "adaptersVersion": adapters_crate_version(),
            "infraVersion": infra_crate_version(),
        }
    });
    let mut output = serde_json::to_string_pretty(&payload)?;
    output.push('\n');
    Ok(output)
}
