//! Project directory fixtures
//!
//! Builds a throwaway project tree in the same layout the imaging pipeline
//! leaves behind: per-subject directories, raw-data roots, key file, roster.

use pvs_common::config::{
    CohortConfig, LoggingConfig, PipelineConfig, RawDataRoots, RosterColumns, ToolsConfig,
};
use pvs_stats::{Hemisphere, SubjectLayout};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct ProjectFixture {
    dir: TempDir,
}

impl ProjectFixture {
    /// Empty project with `project/`, `raw/primary/` and `raw/alternate/`
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        for sub in ["project", "raw/primary", "raw/alternate"] {
            std::fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        Self { dir }
    }

    pub fn base(&self) -> &Path {
        self.dir.path()
    }

    pub fn project_root(&self) -> PathBuf {
        self.dir.path().join("project")
    }

    pub fn primary_root(&self) -> PathBuf {
        self.dir.path().join("raw").join("primary")
    }

    pub fn alternate_root(&self) -> PathBuf {
        self.dir.path().join("raw").join("alternate")
    }

    pub fn key_file(&self) -> PathBuf {
        self.dir.path().join("key")
    }

    pub fn roster_path(&self) -> PathBuf {
        self.dir.path().join("roster.csv")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.project_root().join("summary")
    }

    pub fn layout(&self, code: &str) -> SubjectLayout {
        SubjectLayout::new(&self.project_root(), code)
    }

    pub fn write_key(&self, content: &str) {
        std::fs::write(self.key_file(), content).unwrap();
    }

    pub fn write_roster(&self, content: &str) {
        std::fs::write(self.roster_path(), content).unwrap();
    }

    /// Eroded white-matter mask file (content irrelevant to fakes)
    pub fn add_eroded_mask(&self, code: &str, hemisphere: Hemisphere) {
        let layout = self.layout(code);
        std::fs::create_dir_all(layout.eroded_mask_dir()).unwrap();
        std::fs::write(layout.eroded_mask(hemisphere), b"nifti").unwrap();
    }

    pub fn add_volume_cache(&self, code: &str, hemisphere: Hemisphere, content: &str) {
        let layout = self.layout(code);
        std::fs::create_dir_all(layout.eroded_mask_dir()).unwrap();
        std::fs::write(layout.volume_cache(hemisphere), content).unwrap();
    }

    /// Cluster table in the converter's CSV format
    pub fn add_cluster_table(&self, code: &str, hemisphere: Hemisphere, volumes: &[u64]) {
        let mut content = String::from(",#Volume,CM RL,CM AP,CM IS\n");
        for (index, volume) in volumes.iter().enumerate() {
            content.push_str(&format!("{},{},1.0,2.0,3.0\n", index, volume));
        }
        self.add_cluster_table_raw(code, hemisphere, &content);
    }

    pub fn add_cluster_table_raw(&self, code: &str, hemisphere: Hemisphere, content: &str) {
        let layout = self.layout(code);
        std::fs::create_dir_all(layout.cluster_table_dir()).unwrap();
        std::fs::write(layout.cluster_table(hemisphere), content).unwrap();
    }

    /// `t1/csv/` with no tables in it
    pub fn add_empty_cluster_dir(&self, code: &str) {
        std::fs::create_dir_all(self.layout(code).cluster_table_dir()).unwrap();
    }

    /// README under `<primary>/<name>/mri/mprage/`
    pub fn add_primary_readme(&self, name: &str, file_name: &str, content: &str) {
        let session = self.primary_root().join(name).join("mri").join("mprage");
        std::fs::create_dir_all(&session).unwrap();
        std::fs::write(session.join(file_name), content).unwrap();
    }

    /// README under `<alternate>/<name>/mri/`
    pub fn add_alternate_readme(&self, name: &str, file_name: &str, content: &str) {
        let session = self.alternate_root().join(name).join("mri");
        std::fs::create_dir_all(&session).unwrap();
        std::fs::write(session.join(file_name), content).unwrap();
    }

    pub fn raw_data_roots(&self) -> RawDataRoots {
        RawDataRoots {
            primary: Some(self.primary_root()),
            alternate: Some(self.alternate_root()),
        }
    }

    /// Config pointing at this fixture, defaults elsewhere
    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            project_root: self.project_root(),
            key_file: self.key_file(),
            roster_path: Some(self.roster_path()),
            output_dir: self.output_dir(),
            raw_data: self.raw_data_roots(),
            roster: RosterColumns::default(),
            tools: ToolsConfig::default(),
            cohort: CohortConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Read a CSV report into header + rows
pub fn read_csv(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    (headers, rows)
}

/// Cell by column name
pub fn cell<'a>(headers: &[String], row: &'a [String], column: &str) -> &'a str {
    let index = headers
        .iter()
        .position(|h| h == column)
        .unwrap_or_else(|| panic!("no column {}", column));
    &row[index]
}
