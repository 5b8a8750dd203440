//! Suggested download filenames

/// Make a media title safe to use as a filename and in `Content-Disposition`.
///
/// # Examples
/// ```
/// use mediadrop::utils::sanitize_filename;
/// assert_eq!(sanitize_filename("../../etc/passwd"), "_etc_passwd");
/// assert_eq!(sanitize_filename(".hidden"), "hidden");
/// assert_eq!(sanitize_filename("Clip: Part 1"), "Clip_ Part 1");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    // Characters invalid on Windows/macOS/Linux filesystems
    let invalid_chars = ['/', '\\', ':', '*', '?', '"', '<', '>', '|', '\0'];

    let mut sanitized = name.replace("..", "");

    sanitized = sanitized
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if invalid_chars.contains(&c) { '_' } else { c })
        .collect();

    // Hidden files and trailing dots (Windows)
    sanitized = sanitized.trim().trim_start_matches('.').to_string();
    sanitized = sanitized.trim_end_matches('.').trim_end().to_string();

    while sanitized.contains("__") {
        sanitized = sanitized.replace("__", "_");
    }

    if sanitized.is_empty() {
        return "unnamed_file".to_string();
    }

    truncate_chars(&sanitized, 180)
}

/// `<sanitized title>.<ext>`
pub fn suggested_filename(title: &str, extension: &str) -> String {
    let stem = sanitize_filename(title);
    if extension.is_empty() {
        stem
    } else {
        format!("{}.{}", stem, extension)
    }
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => value[..idx].trim_end().to_string(),
        None => value.to_string(),
    }
}
