use std::path::PathBuf;

/// Expand a leading `~` or `~/` to the user's home directory.
///
/// Paths without a tilde prefix are returned unchanged. If the home
/// directory cannot be determined the path is returned as written.
pub fn expand_tilde(path: &str) -> PathBuf {
    let rest = if path == "~" {
        Some("")
    } else {
        path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\"))
    };

    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) if rest.is_empty() => home,
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
