//! Relative path helpers.

/// Normalize a path taken from a document heading.
///
/// Backslashes become slashes, `./` segments and leading slashes are
/// dropped, and repeated separators collapse. Returns `None` for an empty
/// result or a path containing a `..` segment.
pub fn normalize_relative_path(raw: &str) -> Option<String> {
    let unified = raw.trim().replace('\\', "/");
    let mut parts = Vec::new();
    for part in unified.split('/') {
        match part.trim() {
            "" | "." => continue,
            ".." => return None,
            p => parts.push(p),
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Line comment prefix for a file extension (without the dot).
///
/// Unknown extensions fall back to `#`.
pub fn comment_prefix(extension: &str) -> &'static str {
    match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "js" | "ts" | "jsx" | "tsx" | "java" | "c" | "h" | "cpp" | "hpp" | "cs" | "go" | "rs"
        | "kt" | "swift" => "//",
        "html" | "htm" | "xml" => "<!--",
        "css" => "/*",
        "md" => "[comment]: #",
        "bat" | "cmd" => "REM",
        "sql" | "lua" => "--",
        _ => "#",
    }
}

/// Render `text` as a single comment line for the given extension.
pub fn comment_line(extension: &str, text: &str) -> String {
    let prefix = comment_prefix(extension);
    match prefix {
        "<!--" => format!("<!-- {} -->", text),
        "/*" => format!("/* {} */", text),
        "[comment]: #" => format!("[comment]: # ({})", text),
        _ => format!("{} {}", prefix, text),
    }
}
