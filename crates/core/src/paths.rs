// Lexical path handling for story files.
//
// Everything here works on strings with forward slashes so that paths coming
// from Windows agents compare equal to the POSIX paths in the story index.

/// Replace every backslash with a forward slash
pub fn to_forward_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

fn drive_prefix(path: &str) -> Option<&str> {
    let bytes = path.as_bytes();
    if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
        Some(&path[..2])
    } else {
        None
    }
}

/// Whether the path is absolute on either POSIX or Windows
pub fn is_absolute(path: &str) -> bool {
    let path = to_forward_slashes(path);
    path.starts_with('/') || drive_prefix(&path).is_some_and(|_| path[2..].starts_with('/'))
}

/// Collapse `.`/`..` segments and duplicate separators.
///
/// Relative paths keep leading `..` segments; `..` never climbs above the
/// root (or drive) of an absolute path.
pub fn normalize(path: &str) -> String {
    let path = to_forward_slashes(path);

    let (drive, rest) = match drive_prefix(&path) {
        Some(drive) => (Some(drive.to_ascii_uppercase()), &path[2..]),
        None => (None, path.as_str()),
    };
    let absolute = rest.starts_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => match segments.last() {
                Some(&"..") | None if !absolute => segments.push(".."),
                Some(&"..") | None => {}
                Some(_) => {
                    segments.pop();
                }
            },
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    let prefix = drive.unwrap_or_default();
    if absolute {
        format!("{}/{}", prefix, joined)
    } else if joined.is_empty() {
        if prefix.is_empty() {
            ".".to_string()
        } else {
            prefix
        }
    } else {
        format!("{}{}", prefix, joined)
    }
}

/// Lexical relative path from `from` to `to`, both already normalized
/// absolute paths. Returns an empty string when they are equal.
pub fn relative(from: &str, to: &str) -> String {
    let from_segments: Vec<&str> = from.split('/').filter(|s| !s.is_empty()).collect();
    let to_segments: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();

    let common = from_segments
        .iter()
        .zip(to_segments.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts: Vec<&str> = Vec::new();
    parts.extend(std::iter::repeat("..").take(from_segments.len() - common));
    parts.extend(&to_segments[common..]);
    parts.join("/")
}

/// Normalize an index-style import path so that `src/x`, `./src/x` and
/// `./src/../src/x` all compare equal.
pub fn to_import_path(path: &str) -> String {
    let normalized = normalize(path);
    if normalized == ".." || normalized.starts_with("../") || is_absolute(&normalized) {
        normalized
    } else if normalized == "." {
        "./".to_string()
    } else {
        format!("./{}", normalized)
    }
}

/// Compute the import path of a story file relative to the working
/// directory. Relative inputs are resolved against `cwd` first.
pub fn story_import_path(story_path: &str, cwd: &str) -> String {
    let cwd = normalize(cwd);
    let absolute = if is_absolute(story_path) {
        normalize(story_path)
    } else {
        normalize(&format!("{}/{}", cwd, to_forward_slashes(story_path)))
    };
    to_import_path(&relative(&cwd, &absolute))
}
