//! Per-subject directory convention
//!
//! Every subject owns `<project_root>/<code>/` with a fixed tree underneath.
//! Existing subject directories were produced with these exact names, so the
//! paths here must not change.

use std::fmt;
use std::path::{Path, PathBuf};

/// Cerebral hemisphere, the unit of per-side statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hemisphere {
    Left,
    Right,
}

impl Hemisphere {
    /// Both hemispheres in report order
    pub const ALL: [Hemisphere; 2] = [Hemisphere::Left, Hemisphere::Right];

    /// Lowercase form used in file names
    pub fn as_str(self) -> &'static str {
        match self {
            Hemisphere::Left => "left",
            Hemisphere::Right => "right",
        }
    }
}

impl fmt::Display for Hemisphere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Paths inside one subject's directory
#[derive(Debug, Clone)]
pub struct SubjectLayout {
    root: PathBuf,
}

impl SubjectLayout {
    pub fn new(project_root: &Path, code: &str) -> Self {
        Self {
            root: project_root.join(code),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `eroded_masks/`
    pub fn eroded_mask_dir(&self) -> PathBuf {
        self.root.join("eroded_masks")
    }

    /// `eroded_masks/eroded_<hemi>_cerebral_white_matter.nii`
    pub fn eroded_mask(&self, hemisphere: Hemisphere) -> PathBuf {
        self.eroded_mask_dir()
            .join(format!("eroded_{}_cerebral_white_matter.nii", hemisphere))
    }

    /// `eroded_masks/<hemi>_vol.txt`, the cached voxel count
    pub fn volume_cache(&self, hemisphere: Hemisphere) -> PathBuf {
        self.eroded_mask_dir().join(format!("{}_vol.txt", hemisphere))
    }

    /// `t1/clusters/`
    pub fn cluster_dir(&self) -> PathBuf {
        self.root.join("t1").join("clusters")
    }

    /// `t1/clusters/pvs_within_<hemi>_cerebral_white_matter.nii`
    pub fn pvs_mask(&self, hemisphere: Hemisphere) -> PathBuf {
        self.cluster_dir().join(format!("{}.nii", pvs_stem(hemisphere)))
    }

    /// `t1/clusters/pvs_within_<hemi>_cerebral_white_matter.txt`
    pub fn cluster_report(&self, hemisphere: Hemisphere) -> PathBuf {
        self.cluster_dir().join(format!("{}.txt", pvs_stem(hemisphere)))
    }

    /// `t1/csv/`
    pub fn cluster_table_dir(&self) -> PathBuf {
        self.root.join("t1").join("csv")
    }

    /// `t1/csv/pvs_within_<hemi>_cerebral_white_matter.csv`
    pub fn cluster_table(&self, hemisphere: Hemisphere) -> PathBuf {
        self.cluster_table_dir()
            .join(format!("{}.csv", pvs_stem(hemisphere)))
    }
}

fn pvs_stem(hemisphere: Hemisphere) -> String {
    format!("pvs_within_{}_cerebral_white_matter", hemisphere)
}
