//! Frame classification and grouping.
//!
//! Raw frames are classified by their IMAGETYP / EXPTIME / FILTER headers
//! only; pixel data stays on disk until a group is actually reduced. Frames
//! with missing or unrecognized headers are logged and excluded, they never
//! abort a run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::Result;
use crate::frame::{FrameInfo, FrameRole};
use crate::io;

/// Key of one classification group.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct GroupKey {
    pub role: FrameRole,
    /// Set for Flat and Light groups, None otherwise.
    pub filter: Option<String>,
}

/// Deterministic grouping of classified frames by (role, filter).
///
/// Group order and in-group order are both stable: groups are keyed in a
/// BTreeMap and members keep the sorted scan order of their paths.
#[derive(Debug, Default)]
pub struct FrameSet {
    groups: BTreeMap<GroupKey, Vec<FrameInfo>>,
    /// Files that could not be classified, with the reason.
    pub skipped: Vec<(PathBuf, String)>,
}

impl FrameSet {
    /// Classify every FITS file under `dirs`, skipping unusable frames.
    ///
    /// Directories are scanned in order and may overlap (duplicate paths are
    /// classified once per occurrence); each directory's file list is sorted
    /// so repeated runs see identical orderings.
    pub fn from_dirs(dirs: &[&Path]) -> Result<Self> {
        let mut set = Self::default();
        for dir in dirs {
            for path in scan_dir(dir)? {
                match io::read_info(&path) {
                    Ok(info) => set.insert(info),
                    Err(err) => {
                        warn!(path = %path.display(), %err, "skipping unclassifiable frame");
                        set.skipped.push((path, err.to_string()));
                    }
                }
            }
        }
        Ok(set)
    }

    /// Build a frame set from already-classified headers.
    pub fn from_infos(infos: impl IntoIterator<Item = FrameInfo>) -> Self {
        let mut set = Self::default();
        for info in infos {
            set.insert(info);
        }
        set
    }

    fn insert(&mut self, info: FrameInfo) {
        let key = GroupKey {
            role: info.role,
            filter: info.filter.clone(),
        };
        self.groups.entry(key).or_default().push(info);
    }

    fn group(&self, role: FrameRole, filter: Option<&str>) -> &[FrameInfo] {
        let key = GroupKey {
            role,
            filter: filter.map(str::to_string),
        };
        self.groups.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn biases(&self) -> &[FrameInfo] {
        self.group(FrameRole::Bias, None)
    }

    pub fn darks(&self) -> &[FrameInfo] {
        self.group(FrameRole::Dark, None)
    }

    pub fn flats(&self, filter: &str) -> &[FrameInfo] {
        self.group(FrameRole::Flat, Some(filter))
    }

    pub fn lights(&self, filter: &str) -> &[FrameInfo] {
        self.group(FrameRole::Light, Some(filter))
    }

    /// Sorted distinct filter names appearing among light frames. Masters
    /// and calibration are driven by this set.
    pub fn light_filters(&self) -> Vec<String> {
        self.filters_of(FrameRole::Light)
    }

    /// Sorted distinct filter names appearing among flat or light frames.
    pub fn all_filters(&self) -> Vec<String> {
        let mut filters = self.filters_of(FrameRole::Flat);
        for f in self.filters_of(FrameRole::Light) {
            if !filters.contains(&f) {
                filters.push(f);
            }
        }
        filters.sort();
        filters
    }

    fn filters_of(&self, role: FrameRole) -> Vec<String> {
        self.groups
            .keys()
            .filter(|k| k.role == role)
            .filter_map(|k| k.filter.clone())
            .collect()
    }

    /// Total number of classified frames.
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// List the FITS files directly under `dir`, lexicographically sorted.
pub fn scan_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && io::is_fits_file(p))
        .collect();
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(role: FrameRole, filter: Option<&str>, name: &str) -> FrameInfo {
        FrameInfo {
            path: PathBuf::from(name),
            role,
            exposure_s: role.requires_exposure().then_some(30.0),
            filter: filter.map(str::to_string),
        }
    }

    #[test]
    fn test_imagetyp_parsing() {
        assert_eq!(FrameRole::from_imagetyp("Bias Frame"), Some(FrameRole::Bias));
        assert_eq!(FrameRole::from_imagetyp("Dark Frame"), Some(FrameRole::Dark));
        assert_eq!(FrameRole::from_imagetyp("Flat Field"), Some(FrameRole::Flat));
        assert_eq!(
            FrameRole::from_imagetyp(" Light Frame "),
            Some(FrameRole::Light)
        );
        assert_eq!(FrameRole::from_imagetyp("Tricolor Image"), None);
        assert_eq!(FrameRole::from_imagetyp(""), None);
    }

    #[test]
    fn test_grouping_by_role_and_filter() {
        let set = FrameSet::from_infos([
            info(FrameRole::Bias, None, "b1.fit"),
            info(FrameRole::Bias, None, "b2.fit"),
            info(FrameRole::Flat, Some("V"), "fv.fit"),
            info(FrameRole::Flat, Some("B"), "fb.fit"),
            info(FrameRole::Light, Some("V"), "l1.fit"),
        ]);

        assert_eq!(set.biases().len(), 2);
        assert_eq!(set.flats("V").len(), 1);
        assert_eq!(set.flats("B").len(), 1);
        assert_eq!(set.flats("R").len(), 0);
        assert_eq!(set.lights("V").len(), 1);
        assert_eq!(set.light_filters(), vec!["V".to_string()]);
        assert_eq!(set.all_filters(), vec!["B".to_string(), "V".to_string()]);
    }

    #[test]
    fn test_group_order_is_stable() {
        let set = FrameSet::from_infos([
            info(FrameRole::Light, Some("V"), "l3.fit"),
            info(FrameRole::Light, Some("V"), "l1.fit"),
            info(FrameRole::Light, Some("V"), "l2.fit"),
        ]);

        // Insertion order is preserved within a group.
        let names: Vec<_> = set
            .lights("V")
            .iter()
            .map(|i| i.path.display().to_string())
            .collect();
        assert_eq!(names, vec!["l3.fit", "l1.fit", "l2.fit"]);
    }
}
