//! Path canonicalization.
//!
//! Paths are kept as '/'-separated strings.  A trailing '/' marks a
//! directory and survives canonicalization.

/// Lexically canonicalize a path, removing redundant components.
/// Does not access the disk, but only simplifies things like
/// "foo/./bar" => "foo/bar" and "/foo/../bar" => "/bar".
pub fn canon_path<T: AsRef<str>>(inpath: T) -> String {
    let path = inpath.as_ref();
    #[cfg(windows)]
    let path = &path.replace('\\', "/");

    if path.is_empty() {
        return String::new();
    }
    let absolute = path.starts_with('/');

    let mut components: Vec<&str> = Vec::new();
    let mut is_dir = path.ends_with('/');
    for component in path.split('/') {
        is_dir = is_dir || matches!(component, "." | "..");
        match component {
            "" | "." => {}
            ".." => match components.last() {
                Some(&"..") | None => {
                    // Can't back up past the root of an absolute path.
                    if !absolute {
                        components.push("..");
                    }
                }
                Some(_) => {
                    components.pop();
                }
            },
            _ => {
                is_dir = false;
                components.push(component);
            }
        }
    }
    is_dir = is_dir || path.ends_with('/');

    let mut out = String::with_capacity(path.len());
    if absolute {
        out.push('/');
    }
    out.push_str(&components.join("/"));
    if is_dir && !components.is_empty() {
        out.push('/');
    }
    if out.is_empty() {
        out.push('.');
    }
    out
}

/// Canonicalize `path`, resolving it against `working_dir` when it is relative.
pub fn resolve(working_dir: &str, path: &str) -> String {
    if is_absolute(path) {
        canon_path(path)
    } else {
        canon_path(format!("{}/{}", working_dir, path))
    }
}

pub fn is_absolute(path: &str) -> bool {
    std::path::Path::new(path).is_absolute() || path.starts_with('/')
}

/// Whether a canonical path names a directory rather than a file.
pub fn is_dir(path: &str) -> bool {
    path.ends_with('/')
}

/// Iterates the ancestor directories of a canonical path, innermost first,
/// each with a trailing '/'.  "/a/b/c.o" yields "/a/b/", "/a/", "/".
///
/// The walk is lexical and bounded by the number of components; symlinks
/// are never followed.
pub fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    let mut rest = path.strip_suffix('/').unwrap_or(path);
    std::iter::from_fn(move || {
        let slash = rest.rfind('/')?;
        let dir = &rest[..=slash];
        rest = &rest[..slash];
        Some(dir)
    })
}
