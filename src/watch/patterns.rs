// src/watch/patterns.rs

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::fs::FileSystem;
use crate::watch::path_utils::to_slash;

const GLOB_META: &[char] = &['*', '?', '[', '{'];

/// Compiled include/exclude globs for one declared file set.
///
/// Patterns are relative to the project root. A leading `!` marks an
/// exclusion, so `["app/images/**/*", "!app/images/**/*.svg"]` means "every
/// image except SVGs". `*` does not cross `/`; `**` does.
#[derive(Clone)]
pub struct FileSet {
    patterns: Vec<String>,
    include: GlobSet,
    exclude: Option<GlobSet>,
    roots: Vec<String>,
}

impl fmt::Debug for FileSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSet")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl FileSet {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut include = Vec::new();
        let mut exclude = Vec::new();

        for raw in patterns {
            match raw.strip_prefix('!') {
                Some(neg) => exclude.push(clean_pattern(neg)),
                None => include.push(clean_pattern(raw)),
            }
        }

        let roots = walk_roots(&include);
        let include_set = build_globset(&include)?;
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(&exclude)?)
        };

        Ok(Self {
            patterns: patterns.to_vec(),
            include: include_set,
            exclude: exclude_set,
            roots,
        })
    }

    /// Patterns as declared, including `!` exclusions.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Directories (relative to the project root) that can contain matches.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// True if `rel_path` (relative to the project root, `/`-separated)
    /// matches an include pattern and no exclude pattern.
    pub fn matches(&self, rel_path: &str) -> bool {
        let rel_path = rel_path.strip_prefix("./").unwrap_or(rel_path);
        if !self.include.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }

    /// Include patterns that contain no glob syntax at all.
    pub fn singular_paths(&self) -> Vec<String> {
        self.patterns
            .iter()
            .filter(|p| !p.starts_with('!') && !is_glob(p))
            .map(|p| clean_pattern(p))
            .collect()
    }
}

fn clean_pattern(pattern: &str) -> String {
    pattern.trim().trim_start_matches("./").replace('\\', "/")
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(GLOB_META)
}

/// Static directory prefix of a glob, e.g. `app/images` for
/// `app/images/**/*` and `app/sass` for the plain path
/// `app/sass/styles.sass`. Returns an empty string for the project root.
pub fn glob_base(pattern: &str) -> String {
    let pattern = clean_pattern(pattern);
    let parts: Vec<&str> = pattern.split('/').collect();

    let static_len = parts
        .iter()
        .position(|part| is_glob(part))
        // A plain path names a file; its base is the containing directory.
        .unwrap_or(parts.len().saturating_sub(1));

    parts[..static_len].join("/")
}

/// Glob roots with nested roots dropped, so each directory is walked once.
fn walk_roots(include: &[String]) -> Vec<String> {
    let all: BTreeSet<String> = include.iter().map(|p| glob_base(p)).collect();
    let mut roots: Vec<String> = Vec::new();
    for candidate in all {
        let nested = roots
            .iter()
            .any(|r| r.is_empty() || candidate == *r || candidate.starts_with(&format!("{r}/")));
        if !nested {
            roots.push(candidate);
        }
    }
    roots
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Collect all files under `root` that belong to `set`, sorted.
///
/// Only the set's glob roots are walked; roots that do not exist contribute
/// nothing.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    set: &FileSet,
) -> Result<Vec<PathBuf>> {
    let mut files = BTreeSet::new();
    let mut visited = HashSet::new();

    for rel_root in set.roots() {
        let start = if rel_root.is_empty() {
            root.to_path_buf()
        } else {
            root.join(rel_root)
        };
        if !fs.is_dir(&start) {
            continue;
        }

        let mut stack = vec![start];
        while let Some(dir) = stack.pop() {
            // Directory symlinks may point back up the tree.
            let real = fs.canonicalize(&dir).unwrap_or_else(|_| dir.clone());
            if !visited.insert(real) {
                continue;
            }
            for path in fs.read_dir(&dir)? {
                if fs.is_dir(&path) {
                    stack.push(path);
                } else if fs.is_file(&path) {
                    if let Ok(rel) = path.strip_prefix(root) {
                        if set.matches(&to_slash(rel)) {
                            files.insert(path);
                        }
                    }
                }
            }
        }
    }

    Ok(files.into_iter().collect())
}
