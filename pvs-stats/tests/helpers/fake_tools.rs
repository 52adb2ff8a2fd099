//! Fake imaging tools
//!
//! Stand-ins for the external toolkit that record how often they ran.

use pvs_stats::tools::{ExternalOverlapTool, ToolError};
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

/// Overlap tool answering with a fixed voxel count
pub struct CountingOverlap {
    output: String,
    calls: Cell<usize>,
    inputs: RefCell<Vec<PathBuf>>,
}

impl CountingOverlap {
    pub fn new(voxels: u64) -> Self {
        Self::with_output(format!("{}\n", voxels))
    }

    /// Raw stdout to return, for malformed-output cases
    pub fn with_output(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
            calls: Cell::new(0),
            inputs: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn inputs(&self) -> Vec<PathBuf> {
        self.inputs.borrow().clone()
    }
}

impl ExternalOverlapTool for CountingOverlap {
    fn name(&self) -> &str {
        "counting-overlap"
    }

    fn overlap(&self, first: &Path, _second: &Path) -> Result<String, ToolError> {
        self.calls.set(self.calls.get() + 1);
        self.inputs.borrow_mut().push(first.to_path_buf());
        Ok(self.output.clone())
    }
}

/// Overlap tool that always exits unsuccessfully
#[derive(Default)]
pub struct FailingOverlap {
    calls: Cell<usize>,
}

impl FailingOverlap {
    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl ExternalOverlapTool for FailingOverlap {
    fn name(&self) -> &str {
        "failing-overlap"
    }

    fn overlap(&self, _first: &Path, _second: &Path) -> Result<String, ToolError> {
        self.calls.set(self.calls.get() + 1);
        Err(ToolError::Failed {
            tool: "failing-overlap".to_string(),
            status: "exit status: 1".to_string(),
            stderr: "cannot open dataset".to_string(),
        })
    }
}
