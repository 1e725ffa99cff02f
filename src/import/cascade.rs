use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::batcher::{BatchLimits, make_batches};
use crate::error::{Error, Result};
use crate::ingest::{DocumentTypeClassifier, ExtensionClassifier};
use crate::types::{FileDescriptor, ImportBatch, ScopeId};

/// Extension of permission marker files.
pub const MARKER_EXTENSION: &str = "perms";

/// Name prefixes excluded from enumeration.
const EXCLUDED_PREFIXES: [char; 3] = ['~', '$', '.'];

/// Resolves the effective grant of each file below one import root.
///
/// The grant of a file is the content of the marker files in the nearest
/// directory, walking from the file's directory up to the root, that holds
/// at least one. Grants from further up are never merged in. Marker
/// contents are cached per directory for the lifetime of the resolver.
pub struct PermsCascadeResolver {
    root: PathBuf,
    markers: HashMap<PathBuf, Option<Vec<ScopeId>>>,
}

impl PermsCascadeResolver {
    pub fn new(root: &Path) -> Result<Self> {
        let root = fs::canonicalize(root).map_err(|_| {
            Error::Validation(format!("Folder {} does not exist", root.display()))
        })?;
        if !root.is_dir() {
            return Err(Error::Validation(format!(
                "{} is not a folder",
                root.display()
            )));
        }

        Ok(Self {
            root,
            markers: HashMap::new(),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the ordered scope ids granted to `file`. An empty result means
    /// no marker was found between the file and the root.
    pub fn resolve(&mut self, file: &Path) -> Result<Vec<ScopeId>> {
        let file = fs::canonicalize(file).map_err(|_| {
            Error::Validation(format!("File {} does not exist", file.display()))
        })?;
        let start = file
            .parent()
            .ok_or_else(|| Error::Validation(format!("{} has no parent", file.display())))?;
        if !start.starts_with(&self.root) {
            return Err(Error::Validation(format!(
                "{} is outside import root {}",
                file.display(),
                self.root.display()
            )));
        }

        let mut dir = start.to_path_buf();
        loop {
            if let Some(grant) = self.markers_in(&dir)? {
                return Ok(grant);
            }
            if dir == self.root {
                return Ok(Vec::new());
            }
            if !dir.pop() {
                return Ok(Vec::new());
            }
        }
    }

    fn markers_in(&mut self, dir: &Path) -> Result<Option<Vec<ScopeId>>> {
        if let Some(cached) = self.markers.get(dir) {
            return Ok(cached.clone());
        }
        let grant = read_markers(dir)?;
        self.markers.insert(dir.to_path_buf(), grant.clone());
        Ok(grant)
    }
}

/// Resolves the grant of a single file against `root`. See
/// [`PermsCascadeResolver::resolve`].
pub fn resolve_scopes_for_file(file: &Path, root: &Path) -> Result<Vec<ScopeId>> {
    PermsCascadeResolver::new(root)?.resolve(file)
}

/// Returns true if `dir` directly holds a marker file.
pub fn has_marker(dir: &Path) -> Result<bool> {
    Ok(!marker_files(dir)?.is_empty())
}

fn marker_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/*.{MARKER_EXTENSION}",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    let paths = glob::glob(&pattern)
        .map_err(|e| Error::Validation(format!("bad marker pattern {pattern}: {e}")))?;

    let mut files = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| Error::Io(e.into_error()))?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Reads every marker file in `dir`, concatenating their lines in file name
/// order. None when the directory holds no marker file at all.
fn read_markers(dir: &Path) -> Result<Option<Vec<ScopeId>>> {
    let files = marker_files(dir)?;
    if files.is_empty() {
        return Ok(None);
    }

    let mut grant = Vec::new();
    for path in files {
        let contents = fs::read_to_string(&path)?;
        for line in contents.lines().filter(|l| !l.trim().is_empty()) {
            match ScopeId::parse(line) {
                Some(scope) => grant.push(scope),
                None => tracing::warn!(file = %path.display(), "skipping malformed scope id"),
            }
        }
    }
    Ok(Some(grant))
}

/// True if the file name is eligible for bulk import.
pub fn is_importable(path: &Path) -> bool {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
        return false;
    };
    if name.starts_with(EXCLUDED_PREFIXES) {
        return false;
    }
    ExtensionClassifier::default().is_supported(&name)
}

/// Files sharing one resolved grant, in enumeration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeGroup {
    pub scope_ids: Vec<ScopeId>,
    pub files: Vec<FileDescriptor>,
}

/// Everything a folder import will submit, grouped by grant.
#[derive(Debug, Clone)]
pub struct ImportPlan {
    pub root: PathBuf,
    pub groups: Vec<ScopeGroup>,
}

impl ImportPlan {
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.groups.iter().map(|g| g.files.len()).sum()
    }

    #[must_use]
    pub fn batches(&self, limits: BatchLimits) -> Vec<ImportBatch> {
        self.groups
            .iter()
            .flat_map(|g| make_batches(&g.scope_ids, g.files.clone(), limits))
            .collect()
    }
}

/// Enumerates an import root and resolves every eligible file's grant.
///
/// The root must directly contain a marker file. A file with an empty grant
/// fails the whole root.
pub fn plan_folder(root: &Path) -> Result<ImportPlan> {
    let mut resolver = PermsCascadeResolver::new(root)?;
    if !has_marker(resolver.root())? {
        return Err(Error::Validation(format!(
            "Folder {} does not contain a .{MARKER_EXTENSION} file",
            root.display()
        )));
    }

    let mut groups: Vec<ScopeGroup> = Vec::new();
    let mut index: HashMap<Vec<ScopeId>, usize> = HashMap::new();

    let walker = WalkDir::new(resolver.root()).sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(walk_error)?;
        if !entry.file_type().is_file() || !is_importable(entry.path()) {
            continue;
        }

        let scope_ids = resolver.resolve(entry.path())?;
        if scope_ids.is_empty() {
            return Err(Error::Validation(format!(
                "File {} has no permissions granted",
                entry.path().display()
            )));
        }

        let file = FileDescriptor {
            path: entry.path().to_path_buf(),
            size_bytes: entry.metadata().map_err(walk_error)?.len(),
        };

        match index.get(&scope_ids) {
            Some(&i) => groups[i].files.push(file),
            None => {
                index.insert(scope_ids.clone(), groups.len());
                groups.push(ScopeGroup {
                    scope_ids,
                    files: vec![file],
                });
            }
        }
    }

    tracing::info!(
        root = %resolver.root().display(),
        groups = groups.len(),
        files = groups.iter().map(|g| g.files.len()).sum::<usize>(),
        "planned folder import"
    );

    Ok(ImportPlan {
        root: resolver.root().to_path_buf(),
        groups,
    })
}

fn walk_error(e: walkdir::Error) -> Error {
    let message = e.to_string();
    Error::Io(
        e.into_io_error()
            .unwrap_or_else(|| std::io::Error::other(message)),
    )
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::types::GLOBAL_SCOPE;

    fn write(root: &Path, rel: &str, contents: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    fn ids(scopes: &[ScopeId]) -> Vec<&str> {
        scopes.iter().map(ScopeId::as_str).collect()
    }

    #[test]
    fn test_nearest_marker_wins() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "root.perms", &format!("{GLOBAL_SCOPE}\n"));
        write(root, "A/a.perms", "g1\n");
        let doc = write(root, "A/B/doc.txt", "text");

        let scopes = resolve_scopes_for_file(&doc, root).unwrap();
        assert_eq!(ids(&scopes), vec!["g1"]);

        let top = write(root, "top.txt", "text");
        let scopes = resolve_scopes_for_file(&top, root).unwrap();
        assert_eq!(ids(&scopes), vec![GLOBAL_SCOPE]);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "x.perms", "u1\n\ng2\n");
        let doc = write(root, "sub/doc.md", "text");

        let mut resolver = PermsCascadeResolver::new(root).unwrap();
        let first = resolver.resolve(&doc).unwrap();
        let second = resolver.resolve(&doc).unwrap();
        assert_eq!(first, second);
        assert_eq!(ids(&first), vec!["u1", "g2"]);
        assert_eq!(first, resolve_scopes_for_file(&doc, root).unwrap());
    }

    #[test]
    fn test_multiple_markers_concatenate_in_name_order() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "b.perms", "g2\n");
        write(root, "a.perms", "g1\r\n\r\n");
        let doc = write(root, "doc.txt", "text");

        let scopes = resolve_scopes_for_file(&doc, root).unwrap();
        assert_eq!(ids(&scopes), vec!["g1", "g2"]);
    }

    #[test]
    fn test_empty_marker_stops_the_walk() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "root.perms", "g1\n");
        write(root, "locked/none.perms", "\n");
        let doc = write(root, "locked/doc.txt", "text");

        assert!(resolve_scopes_for_file(&doc, root).unwrap().is_empty());
    }

    #[test]
    fn test_file_outside_root_rejected() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "r/x.perms", "g1\n");
        let outside = write(temp.path(), "elsewhere/doc.txt", "text");

        let err = resolve_scopes_for_file(&outside, &temp.path().join("r")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_is_importable() {
        assert!(is_importable(Path::new("/r/doc.PDF")));
        assert!(is_importable(Path::new("/r/photo.jpeg")));
        assert!(!is_importable(Path::new("/r/~$doc.docx")));
        assert!(!is_importable(Path::new("/r/$tmp.txt")));
        assert!(!is_importable(Path::new("/r/.hidden.txt")));
        assert!(!is_importable(Path::new("/r/tool.exe")));
        assert!(!is_importable(Path::new("/r/x.perms")));
    }

    #[test]
    fn test_plan_groups_by_grant() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "root.perms", &format!("{GLOBAL_SCOPE}\n"));
        write(root, "b.txt", "bb");
        write(root, "a.txt", "a");
        write(root, "team/t.perms", "g1\n");
        write(root, "team/plan.md", "plan");
        write(root, "team/.draft.md", "skip");
        write(root, "team/bin.exe", "skip");
        write(root, "z/c.pdf", "ccc");

        let plan = plan_folder(root).unwrap();
        assert_eq!(plan.file_count(), 4);
        assert_eq!(plan.groups.len(), 2);

        let global = &plan.groups[0];
        assert_eq!(ids(&global.scope_ids), vec![GLOBAL_SCOPE]);
        let names: Vec<String> = global.files.iter().map(FileDescriptor::file_name).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.pdf"]);
        assert_eq!(global.files[1].size_bytes, 2);

        let team = &plan.groups[1];
        assert_eq!(ids(&team.scope_ids), vec!["g1"]);
        assert_eq!(team.files.len(), 1);

        let batches = plan.batches(BatchLimits::default());
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 3);
    }

    #[test]
    fn test_plan_requires_root_marker() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "sub/x.perms", "g1\n");
        write(root, "sub/doc.txt", "text");

        let err = plan_folder(root).unwrap_err();
        assert!(err.to_string().contains("does not contain a .perms file"));

        let err = plan_folder(&root.join("missing")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_plan_fails_on_ungranted_file() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "root.perms", "g1\n");
        write(root, "ok.txt", "text");
        write(root, "sealed/empty.perms", "");
        write(root, "sealed/doc.txt", "text");

        let err = plan_folder(root).unwrap_err();
        assert!(err.to_string().contains("has no permissions granted"));
    }
}
