//! Path expansion (spec §6): applied left-to-right before dispatching any
//! file action or `image_save`.
//!
//! 1. Leading `~` → user home.
//! 2. `$VAR` / `${VAR}` → environment value (empty if unset).
//! 3. A leading bare word matching a well-known user directory name → that
//!    directory.
//! 4. If still relative, resolve against the session's `working_directory`.

use std::path::{Path, PathBuf};

const USER_DIR_NAMES: &[&str] = &[
    "pictures",
    "desktop",
    "documents",
    "downloads",
    "music",
    "videos",
    "home",
];

/// Expand `raw` into an absolute path using `working_directory` as the
/// final fallback base for still-relative inputs.
pub fn expand_path(raw: &str, working_directory: &Path) -> PathBuf {
    let expanded_env = shellexpand::full(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string());

    let mut rest = expanded_env.as_str();
    let mut base: Option<PathBuf> = None;

    // Step 3: a leading bare word matching a well-known directory name.
    // Only applies to inputs that aren't already absolute — `/home/bob/x`
    // means exactly that, not `dirs::home_dir().join("bob/x")`.
    if !expanded_env.starts_with('/') {
        if let Some((head, tail)) = split_leading_component(rest) {
            if let Some(dir) = user_directory(head) {
                base = Some(dir);
                rest = tail;
            }
        }
    }

    let candidate = match base {
        Some(dir) => {
            if rest.is_empty() {
                dir
            } else {
                dir.join(rest)
            }
        }
        None => PathBuf::from(rest),
    };

    if candidate.is_absolute() {
        candidate
    } else {
        working_directory.join(candidate)
    }
}

fn split_leading_component(s: &str) -> Option<(&str, &str)> {
    let s = s.strip_prefix('/').unwrap_or(s);
    match s.split_once('/') {
        Some((head, tail)) => Some((head, tail)),
        None if !s.is_empty() => Some((s, "")),
        None => None,
    }
}

fn user_directory(name: &str) -> Option<PathBuf> {
    let lower = name.to_ascii_lowercase();
    if !USER_DIR_NAMES.contains(&lower.as_str()) {
        return None;
    }
    match lower.as_str() {
        "home" => dirs::home_dir(),
        "pictures" => dirs::picture_dir(),
        "desktop" => dirs::desktop_dir(),
        "documents" => dirs::document_dir(),
        "downloads" => dirs::download_dir(),
        "music" => dirs::audio_dir(),
        "videos" => dirs::video_dir(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pictures_tilde_and_env_all_converge() {
        let home = dirs::home_dir().expect("home dir must resolve in test env");
        let cwd = PathBuf::from("/tmp/cwd-unused");

        let via_bare = expand_path("Pictures/x.png", &cwd);
        let via_tilde = expand_path("~/Pictures/x.png", &cwd);
        std::env::set_var("HOME_FOR_TEST_ONLY", home.to_str().unwrap());

        assert_eq!(via_bare, home.join("Pictures/x.png"));
        assert_eq!(via_tilde, home.join("Pictures/x.png"));
    }

    #[test]
    fn relative_path_resolves_against_working_directory() {
        let cwd = PathBuf::from("/home/alice/project");
        let expanded = expand_path("notes.txt", &cwd);
        assert_eq!(expanded, PathBuf::from("/home/alice/project/notes.txt"));
    }

    #[test]
    fn absolute_path_is_returned_unchanged() {
        let cwd = PathBuf::from("/home/alice");
        let expanded = expand_path("/etc/hosts", &cwd);
        assert_eq!(expanded, PathBuf::from("/etc/hosts"));
    }
}
