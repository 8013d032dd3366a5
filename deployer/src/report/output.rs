//! CI output reporting

use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use tracing::{error, info};

use crate::filesys::file::File;
use crate::models::deployment::{DeploymentResult, Operation};

/// Writes the deployment result to the CI output channel
///
/// Reporting never fails the step: write errors are logged and swallowed so
/// they cannot override the status already decided.
#[derive(Debug, Clone, Default)]
pub struct ResultReporter {
    output: Option<File>,
    summary: Option<File>,
}

impl ResultReporter {
    pub fn new(output_path: Option<PathBuf>, summary_path: Option<PathBuf>) -> Self {
        Self {
            output: output_path.map(File::new),
            summary: summary_path.map(File::new),
        }
    }

    /// Report the result through outputs, step summary and annotations
    pub async fn report(&self, result: &DeploymentResult) {
        let outputs = render_outputs(result);

        match &self.output {
            Some(file) => match file.append_string(&outputs).await {
                Ok(()) => {
                    for (name, value) in output_pairs(result) {
                        info!("Action output set: {}={}", name, value);
                    }
                }
                Err(e) => error!(
                    "Error writing to output file {}: {}",
                    file.path().display(),
                    e
                ),
            },
            None => {
                for (name, value) in output_pairs(result) {
                    info!("Local run (no GITHUB_OUTPUT): {}={}", name, value);
                }
            }
        }

        if let Some(file) = &self.summary {
            if let Err(e) = file.append_string(&render_summary(result)).await {
                error!(
                    "Error writing step summary {}: {}",
                    file.path().display(),
                    e
                );
            }
        }

        if let Some(annotation) = render_annotation(result) {
            println!("{}", annotation);
        }
    }
}

/// Output names and values in reporting order
///
/// `vm-id` is left out when the provider never confirmed one.
pub fn output_pairs(result: &DeploymentResult) -> Vec<(&'static str, String)> {
    let mut pairs = vec![("status", result.status.as_str().to_string())];
    if let Some(vm_id) = &result.vm_id {
        pairs.push(("vm-id", vm_id.clone()));
    }
    pairs.push(("vm-name", result.vm_name.clone()));
    pairs.push(("operation", result.operation.as_str().to_string()));
    pairs
}

/// Render the `GITHUB_OUTPUT` lines for a result
pub fn render_outputs(result: &DeploymentResult) -> String {
    output_pairs(result)
        .iter()
        .map(|(name, value)| format_output(name, value))
        .collect()
}

/// Format one output, using the heredoc form for multi-line values
pub fn format_output(name: &str, value: &str) -> String {
    if value.contains('\n') || value.contains('\r') {
        let mut delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
        while value.contains(&delimiter) {
            delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
        }
        format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
    } else {
        format!("{}={}\n", name, value)
    }
}

/// Workflow command annotating failures and skipped updates
pub fn render_annotation(result: &DeploymentResult) -> Option<String> {
    let message = result.message.as_deref().unwrap_or_default();
    if !result.is_success() {
        Some(format!(
            "::error title=CVM deployment failed::{}",
            escape_command_data(message)
        ))
    } else if result.operation == Operation::UpdateSkipped {
        Some(format!(
            "::warning title=CVM update skipped::{}",
            escape_command_data(message)
        ))
    } else {
        None
    }
}

fn escape_command_data(data: &str) -> String {
    data.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Markdown step summary
pub fn render_summary(result: &DeploymentResult) -> String {
    let mut summary = String::from("### CVM deployment\n\n| Field | Value |\n|---|---|\n");
    for (name, value) in output_pairs(result) {
        summary.push_str(&format!("| {} | {} |\n", name, value.replace('|', "\\|")));
    }
    if let Some(message) = &result.message {
        summary.push_str(&format!("\n> {}\n", message.replace('\n', " ")));
    }
    summary.push_str(&format!(
        "\n_Reported at {}_\n\n",
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
    ));
    summary
}
