use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

/// Labels used when a model directory ships no label file.
pub const DEFAULT_LABELS: &[&str] = &[
    "Modulo Rele 2",
    "7404",
    "Diodo Zener",
    "7805",
    "No hay nada",
];

/// Loads the model's label list, one label per line.
///
/// An explicit `labels_path` must exist. Otherwise `<model_dir>/assets/labels.txt`
/// and `<model_dir>/labels.txt` are tried in order, falling back to
/// `DEFAULT_LABELS`. A label file with no non-blank line is an error.
pub fn load_labels(model_dir: &Path, labels_path: Option<&Path>) -> Result<Vec<String>> {
    if let Some(path) = labels_path {
        return read_label_file(path);
    }
    let candidates: [PathBuf; 2] = [
        model_dir.join("assets").join("labels.txt"),
        model_dir.join("labels.txt"),
    ];
    for path in candidates.iter() {
        if path.exists() {
            return read_label_file(path);
        }
    }
    log::warn!(
        "no labels.txt under {}, using built-in labels",
        model_dir.display()
    );
    Ok(DEFAULT_LABELS.iter().map(|l| l.to_string()).collect())
}

fn read_label_file(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read labels from {}", path.display()))?;
    let labels: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .enumerate()
        .map(|(position, line)| strip_index_prefix(position, line))
        .collect();
    if labels.is_empty() {
        return Err(anyhow!("label file {} is empty", path.display()));
    }
    log::info!("loaded {} labels from {}", labels.len(), path.display());
    Ok(labels)
}

/// Teachable Machine exports write `"<index> <label>"`. The prefix is only
/// dropped when it equals the line's position, so part numbers such as
/// `555 Timer` survive.
fn strip_index_prefix(position: usize, line: &str) -> String {
    match line.split_once(' ') {
        Some((index, label))
            if index.parse::<usize>().ok() == Some(position) && !label.trim().is_empty() =>
        {
            label.trim().to_string()
        }
        _ => line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_assets_labels() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::create_dir(dir.path().join("assets"))?;
        std::fs::write(dir.path().join("assets/labels.txt"), "0 7805\n\n1 No hay nada\n")?;
        std::fs::write(dir.path().join("labels.txt"), "ignored\n")?;

        let labels = load_labels(dir.path(), None)?;
        assert_eq!(labels, vec!["7805", "No hay nada"]);
        Ok(())
    }

    #[test]
    fn falls_back_to_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let labels = load_labels(dir.path(), None)?;
        assert_eq!(labels.len(), DEFAULT_LABELS.len());
        assert_eq!(labels[4], "No hay nada");
        Ok(())
    }

    #[test]
    fn empty_or_missing_explicit_file_is_an_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("labels.txt");
        std::fs::write(&path, "\n  \n")?;
        assert!(load_labels(dir.path(), Some(&path)).is_err());
        assert!(load_labels(dir.path(), Some(&dir.path().join("missing.txt"))).is_err());
        Ok(())
    }

    #[test]
    fn keeps_labels_that_only_look_numeric() {
        assert_eq!(strip_index_prefix(0, "7404"), "7404");
        assert_eq!(strip_index_prefix(2, "2 Diodo Zener"), "Diodo Zener");
        assert_eq!(strip_index_prefix(1, "Modulo Rele 2"), "Modulo Rele 2");
        assert_eq!(strip_index_prefix(0, "555 Timer"), "555 Timer");
    }

    #[test]
    fn part_number_labels_load_unchanged() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("labels.txt");
        std::fs::write(&path, "555 Timer\n7805\nNo hay nada\n")?;

        let labels = load_labels(dir.path(), Some(&path))?;
        assert_eq!(labels, vec!["555 Timer", "7805", "No hay nada"]);
        Ok(())
    }
}
