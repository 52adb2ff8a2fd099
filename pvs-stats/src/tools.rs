//! External imaging tool capabilities
//!
//! The imaging work itself (mask overlap, cluster segmentation) is done by an
//! external toolkit run as a blocking subprocess. Each tool sits behind a
//! trait so the pipeline can be exercised with fakes, and every invocation
//! reports success or failure explicitly from the exit status instead of
//! being inferred from whether an output file appeared.
//!
//! No timeout is applied: a hung tool hangs the run.

use std::path::Path;
use std::process::{Command, Output};
use thiserror::Error;
use tracing::debug;

/// External tool errors
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool binary not found in PATH
    #[error("{0} not found in PATH")]
    BinaryNotFound(String),

    /// Failed to launch the tool
    #[error("Failed to execute {tool}: {source}")]
    Launch {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// Tool ran and exited unsuccessfully
    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: String,
        stderr: String,
    },

    /// Input file for the tool does not exist
    #[error("Input not found: {0}")]
    InputNotFound(String),
}

/// Mask overlap computation
///
/// Overlapping a binary mask with itself yields its own voxel count on the
/// first line of output.
pub trait ExternalOverlapTool {
    /// Tool name for logs
    fn name(&self) -> &str;

    /// Overlap two masks, returning the tool's standard output
    fn overlap(&self, first: &Path, second: &Path) -> Result<String, ToolError>;
}

/// Cluster segmentation of a PVS mask
pub trait ExternalSegmentationTool {
    /// Tool name for logs
    fn name(&self) -> &str;

    /// Segment a mask into connected clusters, returning the text report
    fn clusterize(&self, mask: &Path) -> Result<String, ToolError>;
}

/// AFNI `3dOverlap`
#[derive(Debug, Clone)]
pub struct AfniOverlap {
    binary: String,
}

impl AfniOverlap {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl ExternalOverlapTool for AfniOverlap {
    fn name(&self) -> &str {
        &self.binary
    }

    fn overlap(&self, first: &Path, second: &Path) -> Result<String, ToolError> {
        for input in [first, second] {
            if !input.exists() {
                return Err(ToolError::InputNotFound(input.display().to_string()));
            }
        }

        debug!(
            tool = %self.binary,
            first = %first.display(),
            second = %second.display(),
            "Running overlap"
        );

        let mut command = Command::new(&self.binary);
        command.arg(first).arg(second);
        run(&self.binary, &mut command)
    }
}

/// AFNI `3dClusterize`
#[derive(Debug, Clone)]
pub struct AfniClusterize {
    binary: String,
    args: Vec<String>,
}

impl AfniClusterize {
    /// `args` follow `-inset <mask>` on the command line
    pub fn new(binary: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            binary: binary.into(),
            args,
        }
    }
}

impl ExternalSegmentationTool for AfniClusterize {
    fn name(&self) -> &str {
        &self.binary
    }

    fn clusterize(&self, mask: &Path) -> Result<String, ToolError> {
        if !mask.exists() {
            return Err(ToolError::InputNotFound(mask.display().to_string()));
        }

        debug!(tool = %self.binary, mask = %mask.display(), "Running segmentation");

        let mut command = Command::new(&self.binary);
        command.arg("-inset").arg(mask).args(&self.args);
        run(&self.binary, &mut command)
    }
}

/// Run a command to completion and return stdout on success
fn run(tool: &str, command: &mut Command) -> Result<String, ToolError> {
    let output: Output = command.output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ToolError::BinaryNotFound(tool.to_string())
        } else {
            ToolError::Launch {
                tool: tool.to_string(),
                source: e,
            }
        }
    })?;

    if !output.status.success() {
        return Err(ToolError::Failed {
            tool: tool.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_reported() {
        let tool = AfniOverlap::new("definitely-not-a-real-overlap-binary");
        // Input check comes first, so point at a file that exists
        let input = std::env::current_exe().unwrap();
        match tool.overlap(&input, &input) {
            Err(ToolError::BinaryNotFound(name)) => {
                assert_eq!(name, "definitely-not-a-real-overlap-binary")
            }
            other => panic!("expected BinaryNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_input_reported_before_launch() {
        let tool = AfniClusterize::new("3dClusterize", vec![]);
        let result = tool.clusterize(Path::new("/nonexistent/mask.nii"));
        assert!(matches!(result, Err(ToolError::InputNotFound(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_failure() {
        let mut command = Command::new("sh");
        command.arg("-c").arg("echo oops >&2; exit 3");
        match run("sh", &mut command) {
            Err(ToolError::Failed { stderr, .. }) => assert_eq!(stderr, "oops"),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_success_returns_stdout() {
        let mut command = Command::new("sh");
        command.arg("-c").arg("echo 4242");
        assert_eq!(run("sh", &mut command).unwrap(), "4242\n");
    }
}
