//! White-matter volume aggregation
//!
//! Voxel count of each hemisphere's eroded white-matter mask, computed by
//! overlapping the mask with itself. The count is cached as a single line in
//! `eroded_masks/<hemi>_vol.txt`, written atomically; a present cache file is always trusted and
//! the tool is not run again. No locking: two concurrent runs on the same
//! subject may both compute.

use crate::layout::{Hemisphere, SubjectLayout};
use crate::output;
use crate::tools::ExternalOverlapTool;
use pvs_common::Outcome;
use std::path::Path;
use tracing::{debug, info, warn};

/// Per-hemisphere voxel counts for one subject
#[derive(Debug, Clone, PartialEq)]
pub struct WhiteMatterVolumes {
    pub left: Outcome<u64>,
    pub right: Outcome<u64>,
}

impl WhiteMatterVolumes {
    pub fn get(&self, hemisphere: Hemisphere) -> &Outcome<u64> {
        match hemisphere {
            Hemisphere::Left => &self.left,
            Hemisphere::Right => &self.right,
        }
    }
}

/// Parse a voxel count from overlap output: the first line, as an integer
pub fn parse_voxel_count(output: &str) -> Option<u64> {
    output.lines().next()?.trim().parse().ok()
}

/// Computes and caches eroded-mask volumes
pub struct VolumeAggregator<'a> {
    project_root: &'a Path,
    tool: &'a dyn ExternalOverlapTool,
}

impl<'a> VolumeAggregator<'a> {
    pub fn new(project_root: &'a Path, tool: &'a dyn ExternalOverlapTool) -> Self {
        Self { project_root, tool }
    }

    /// Volumes for both hemispheres of a subject
    ///
    /// `NotFound` when the subject has no `eroded_masks/` directory yet.
    pub fn volumes_for(&self, code: &str) -> Outcome<WhiteMatterVolumes> {
        let layout = SubjectLayout::new(self.project_root, code);
        if !layout.eroded_mask_dir().is_dir() {
            debug!(code = %code, "No eroded mask directory, volumes not computed");
            return Outcome::NotFound;
        }

        Outcome::Found(WhiteMatterVolumes {
            left: self.hemisphere_volume(&layout, Hemisphere::Left),
            right: self.hemisphere_volume(&layout, Hemisphere::Right),
        })
    }

    /// Volume for one hemisphere, from cache or by running the tool
    pub fn hemisphere_volume(&self, layout: &SubjectLayout, hemisphere: Hemisphere) -> Outcome<u64> {
        let cache = layout.volume_cache(hemisphere);
        if cache.is_file() {
            return read_cached_volume(&cache);
        }

        let mask = layout.eroded_mask(hemisphere);
        if !mask.is_file() {
            debug!(mask = %mask.display(), "Eroded mask missing");
            return Outcome::NotFound;
        }

        let stdout = match self.tool.overlap(&mask, &mask) {
            Ok(stdout) => stdout,
            Err(e) => {
                warn!(
                    subject = %layout.root().display(),
                    hemisphere = %hemisphere,
                    "Volume computation failed: {}",
                    e
                );
                return Outcome::malformed(e);
            }
        };

        let Some(voxels) = parse_voxel_count(&stdout) else {
            warn!(
                tool = %self.tool.name(),
                hemisphere = %hemisphere,
                "Unparseable overlap output, not caching"
            );
            return Outcome::malformed(format!(
                "{} output has no voxel count on its first line",
                self.tool.name()
            ));
        };

        if let Err(e) = output::write_atomically(&cache, format!("{}\n", voxels).as_bytes()) {
            // The value is still good for this run
            warn!("Cannot write volume cache {}: {}", cache.display(), e);
        } else {
            info!(
                cache = %cache.display(),
                voxels,
                "Computed white-matter volume"
            );
        }
        Outcome::Found(voxels)
    }
}

fn read_cached_volume(cache: &Path) -> Outcome<u64> {
    let content = match std::fs::read_to_string(cache) {
        Ok(content) => content,
        Err(e) => return Outcome::malformed(format!("cannot read {}: {}", cache.display(), e)),
    };
    match parse_voxel_count(&content) {
        Some(voxels) => {
            debug!(cache = %cache.display(), voxels, "Using cached volume");
            Outcome::Found(voxels)
        }
        None => {
            warn!(
                "Cached volume {} is not an integer; delete it to recompute",
                cache.display()
            );
            Outcome::malformed(format!("{} is not an integer", cache.display()))
        }
    }
}
