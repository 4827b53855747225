//! Downstream transform trigger.
//!
//! The transform itself is opaque: a list of external commands run in
//! order after ingestion, for example `dbt deps` followed by `dbt build`.

use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{anyhow, bail, Context, Result};
use tokio::process::Command;
use tracing::{info, instrument, warn};

/// One command: program plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformStep {
    pub program: String,
    pub args: Vec<String>,
}

impl TransformStep {
    /// Split a command line on whitespace. Quoting is not supported.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(String::from);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

impl std::fmt::Display for TransformStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformConfig {
    pub steps: Vec<TransformStep>,
    pub working_dir: Option<PathBuf>,
}

impl TransformConfig {
    /// `None` when no command lines are given.
    pub fn from_command_lines(lines: &[String], working_dir: Option<PathBuf>) -> Result<Option<Self>> {
        let mut steps = Vec::new();
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let step = TransformStep::parse(line)
                .ok_or_else(|| anyhow!("Invalid transform command: {:?}", line))?;
            steps.push(step);
        }

        if steps.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self { steps, working_dir }))
    }
}

/// Run every step in order; the first non-zero exit stops the transform.
#[instrument(skip(config), fields(steps = config.steps.len()))]
pub async fn run_transform(config: &TransformConfig) -> Result<()> {
    for step in &config.steps {
        info!(command = %step, "Running transform step");

        let mut command = Command::new(&step.program);
        command
            .args(&step.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = &config.working_dir {
            command.current_dir(dir);
        }

        let output = command
            .output()
            .await
            .with_context(|| format!("Failed to start transform step `{}`", step))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            info!(command = %step, output = %stdout.trim_end(), "Transform step output");
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            warn!(command = %step, output = %stderr.trim_end(), "Transform step stderr");
        }

        if !output.status.success() {
            bail!(
                "Transform step `{}` failed with {}",
                step,
                output
                    .status
                    .code()
                    .map(|c| format!("exit code {}", c))
                    .unwrap_or_else(|| "a signal".to_string())
            );
        }
    }

    info!("Transform finished");
    Ok(())
}
