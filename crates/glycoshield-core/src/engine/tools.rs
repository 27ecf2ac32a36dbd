use super::error::EngineError;
use std::process::{Command, Stdio};
use tracing::{debug, instrument};

pub const DEFAULT_ENGINE_BINARY: &str = "gmx";

/// Verifies that an external program can be started by running
/// `<binary> --version`. Returns the first non-empty line it printed.
#[instrument(skip_all, fields(binary = binary))]
pub fn ensure_invocable(binary: &str) -> Result<String, EngineError> {
    let output = Command::new(binary)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .map_err(|e| EngineError::ExternalTool {
            binary: binary.to_string(),
            reason: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(EngineError::ExternalTool {
            binary: binary.to_string(),
            reason: format!("'--version' exited with {}", output.status),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let version = stdout
        .lines()
        .chain(stderr.lines())
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string();
    debug!(version = %version, "External tool is available.");
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_reported() {
        let result = ensure_invocable("glycoshield-no-such-binary-xyz");
        assert!(matches!(result, Err(EngineError::ExternalTool { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn failing_binary_is_reported() {
        // `false` ignores its arguments and exits non-zero.
        let result = ensure_invocable("false");
        assert!(matches!(result, Err(EngineError::ExternalTool { .. })));
    }
}
