//! Snapshots of the files on the camera's card and the diff between two of them.

use crate::camera::{CameraFile, StorageNode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// How `FileManifest::find_new` decides which files are new
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStrategy {
    /// Report nothing when both snapshots hold the same number of files,
    /// otherwise diff by name. Misses an addition that coincides with a removal.
    #[default]
    CountShortcut,
    /// Always diff by name
    NameSet,
}

/// Flat, ordered list of the non-directory files on the camera
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileManifest {
    files: Vec<CameraFile>,
}

impl FileManifest {
    pub fn new(files: Vec<CameraFile>) -> Self {
        Self { files }
    }

    /// Flatten a storage listing, keeping files and walking into directories
    pub fn from_storage(storage: &[StorageNode]) -> Self {
        let mut files = Vec::new();
        collect_files(storage, &mut files);
        Self { files }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CameraFile> {
        self.files.iter()
    }

    /// Whether a file with the same name is present
    pub fn contains(&self, file: &CameraFile) -> bool {
        self.files.iter().any(|f| f.name == file.name)
    }

    /// Files of `candidate` not present in `self`, in `candidate` order
    pub fn find_new(&self, candidate: &FileManifest, strategy: DiffStrategy) -> Vec<CameraFile> {
        if strategy == DiffStrategy::CountShortcut && self.len() == candidate.len() {
            return Vec::new();
        }

        let known: HashSet<&str> = self.files.iter().map(|f| f.name.as_str()).collect();
        candidate
            .files
            .iter()
            .filter(|f| !known.contains(f.name.as_str()))
            .cloned()
            .collect()
    }

    /// Copy of this manifest without the named files
    pub fn without<'a, I>(&self, names: I) -> FileManifest
    where
        I: IntoIterator<Item = &'a str>,
    {
        let removed: HashSet<&str> = names.into_iter().collect();
        FileManifest {
            files: self
                .files
                .iter()
                .filter(|f| !removed.contains(f.name.as_str()))
                .cloned()
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FileManifest {
    type Item = &'a CameraFile;
    type IntoIter = std::slice::Iter<'a, CameraFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

fn collect_files(nodes: &[StorageNode], files: &mut Vec<CameraFile>) {
    for node in nodes {
        if node.file.is_dir {
            collect_files(&node.children, files);
        } else {
            files.push(node.file.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOLDER: &str = "/store_00020001/DCIM/100CANON";

    fn manifest(names: &[&str]) -> FileManifest {
        FileManifest::new(names.iter().map(|n| CameraFile::new(*n, FOLDER)).collect())
    }

    fn names(files: &[CameraFile]) -> Vec<&str> {
        files.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_same_manifest_has_nothing_new() {
        let m = manifest(&["IMG_0001.CR2", "IMG_0002.CR2", "IMG_0003.CR2"]);
        assert!(m.find_new(&m, DiffStrategy::CountShortcut).is_empty());
        assert!(m.find_new(&m, DiffStrategy::NameSet).is_empty());
        assert!(FileManifest::default()
            .find_new(&FileManifest::default(), DiffStrategy::NameSet)
            .is_empty());
    }

    #[test]
    fn test_disjoint_manifests_return_candidate_in_order() {
        let baseline = manifest(&["A.CR2", "B.CR2"]);
        let candidate = manifest(&["Z.CR2", "C.CR2", "Y.CR2"]);

        let found = baseline.find_new(&candidate, DiffStrategy::CountShortcut);
        assert_eq!(names(&found), vec!["Z.CR2", "C.CR2", "Y.CR2"]);
    }

    #[test]
    fn test_appended_frame_is_found() {
        let baseline = manifest(&["IMG_0001.CR2", "IMG_0002.CR2"]);
        let candidate = manifest(&["IMG_0001.CR2", "IMG_0002.CR2", "IMG_0003.CR2"]);

        let found = baseline.find_new(&candidate, DiffStrategy::CountShortcut);
        assert_eq!(names(&found), vec!["IMG_0003.CR2"]);
    }

    #[test]
    fn test_equal_counts_short_circuit() {
        // One file removed and one added: the count heuristic reports nothing
        let baseline = manifest(&["IMG_0001.CR2", "IMG_0002.CR2"]);
        let candidate = manifest(&["IMG_0002.CR2", "IMG_0003.CR2"]);

        assert!(baseline
            .find_new(&candidate, DiffStrategy::CountShortcut)
            .is_empty());

        let found = baseline.find_new(&candidate, DiffStrategy::NameSet);
        assert_eq!(names(&found), vec!["IMG_0003.CR2"]);
    }

    #[test]
    fn test_identity_is_name_only() {
        let baseline = FileManifest::new(vec![CameraFile::new("IMG_0001.CR2", "/a")]);
        let candidate = FileManifest::new(vec![
            CameraFile::new("IMG_0001.CR2", "/b"),
            CameraFile::new("IMG_0002.CR2", "/b"),
        ]);

        let found = baseline.find_new(&candidate, DiffStrategy::NameSet);
        assert_eq!(names(&found), vec!["IMG_0002.CR2"]);
        assert!(baseline.contains(&CameraFile::new("IMG_0001.CR2", "/elsewhere")));
    }

    #[test]
    fn test_from_storage_skips_directories() {
        let storage = vec![StorageNode::directory(
            "store_00020001",
            "/",
            vec![
                StorageNode::directory(
                    "DCIM",
                    "/store_00020001",
                    vec![
                        StorageNode::directory(
                            "100CANON",
                            "/store_00020001/DCIM",
                            vec![
                                StorageNode::file("IMG_0001.CR2", FOLDER),
                                StorageNode::directory("NESTED", FOLDER, Vec::new()),
                                StorageNode::file("IMG_0002.CR2", FOLDER),
                            ],
                        ),
                        StorageNode::directory(
                            "101CANON",
                            "/store_00020001/DCIM",
                            vec![StorageNode::file("IMG_0100.CR2", "/store_00020001/DCIM/101CANON")],
                        ),
                    ],
                ),
                StorageNode::directory("MISC", "/store_00020001", Vec::new()),
            ],
        )];

        let manifest = FileManifest::from_storage(&storage);
        let found: Vec<&str> = manifest.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(found, vec!["IMG_0001.CR2", "IMG_0002.CR2", "IMG_0100.CR2"]);
        assert!(manifest.iter().all(|f| !f.is_dir));
    }

    #[test]
    fn test_without_drops_named_files() {
        let m = manifest(&["IMG_0001.CR2", "IMG_0002.CR2", "IMG_0003.CR2"]);
        let trimmed = m.without(["IMG_0002.CR2"]);
        assert_eq!(trimmed, manifest(&["IMG_0001.CR2", "IMG_0003.CR2"]));
    }
}
