use std::path::{Component, Path, PathBuf};

/// Files arriving from the profile pipeline live under a per-process
/// isolation temp directory (`<tmp>/<pid-or-execution>/...`). Strip that
/// leading numeric segment so destination writers see a stable relative
/// layout under the destination base path regardless of which process
/// produced the file.
pub fn relative_destination_path(path: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(segment))
            if segment
                .to_str()
                .map(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()))
                .unwrap_or(false) =>
        {
            components.as_path().to_path_buf()
        }
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_numeric_isolation_segment() {
        let path = Path::new("48213/exports/report.csv");
        assert_eq!(relative_destination_path(path), Path::new("exports/report.csv"));
    }

    #[test]
    fn leaves_non_numeric_paths_unchanged() {
        let path = Path::new("exports/report.csv");
        assert_eq!(relative_destination_path(path), path);
    }
}
