//! File classification driving dataset type selection.
//!
//! Pure and deterministic: a declared MIME prefix wins, then a filename
//! extension table, else the file stays unclassified and contributes nothing
//! to the selection.

use std::{collections::BTreeSet, ffi::OsStr, path::Path};

use crate::model::DataType;

/// Classify a candidate file into a coarse data-type category.
#[must_use]
pub fn classify(file_name: &str, media_type: Option<&str>) -> Option<DataType> {
    if let Some(media) = media_type {
        if media.starts_with("image/") {
            return Some(DataType::Image);
        }
        if media.starts_with("text/") {
            return Some(DataType::Text);
        }
    }
    let name = file_name.to_ascii_lowercase();
    match Path::new(&name).extension().and_then(OsStr::to_str) {
        Some("png" | "jpg" | "jpeg" | "webp" | "gif") => Some(DataType::Image),
        Some("txt" | "jsonl" | "csv" | "md") => Some(DataType::Text),
        Some("parquet" | "npy" | "npz") => Some(DataType::Numerical),
        _ => None,
    }
}

/// Merge inferred categories into the selected set. The merge is additive:
/// user-selected types are never removed, and re-applying the same batch is
/// a no-op. Returns whether the batch resolved at least one category, which
/// is when the caller should surface the auto-detection notice.
pub fn merge_inferred(
    selected: &mut BTreeSet<DataType>,
    inferred: impl IntoIterator<Item = DataType>,
) -> bool {
    let mut any = false;
    for data_type in inferred {
        any = true;
        selected.insert(data_type);
    }
    any
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_prefix_wins_over_extension() {
        assert_eq!(
            classify("data.csv", Some("image/png")),
            Some(DataType::Image)
        );
        assert_eq!(classify("photo.png", Some("text/plain")), Some(DataType::Text));
    }

    #[test]
    fn extension_table() {
        for name in ["a.png", "b.JPG", "c.jpeg", "d.webp", "e.gif"] {
            assert_eq!(classify(name, None), Some(DataType::Image), "{name}");
        }
        for name in ["a.txt", "b.jsonl", "c.csv", "d.md"] {
            assert_eq!(classify(name, None), Some(DataType::Text), "{name}");
        }
        for name in ["a.parquet", "b.npy", "c.npz"] {
            assert_eq!(classify(name, None), Some(DataType::Numerical), "{name}");
        }
    }

    #[test]
    fn unrecognized_files_stay_unknown() {
        assert_eq!(classify("model.onnx", None), None);
        assert_eq!(classify("README", None), None);
        assert_eq!(classify("archive.zip", Some("application/zip")), None);
    }

    #[test]
    fn merge_is_additive_and_idempotent() {
        let mut selected: BTreeSet<DataType> = [DataType::Numerical].into_iter().collect();
        let inferred = [DataType::Text, DataType::Image];

        assert!(merge_inferred(&mut selected, inferred));
        let after_once = selected.clone();
        assert!(after_once.contains(&DataType::Numerical));
        assert!(after_once.contains(&DataType::Text));
        assert!(after_once.contains(&DataType::Image));

        assert!(merge_inferred(&mut selected, inferred));
        assert_eq!(selected, after_once);
    }

    #[test]
    fn empty_batch_reports_nothing() {
        let mut selected: BTreeSet<DataType> = [DataType::Text].into_iter().collect();
        assert!(!merge_inferred(&mut selected, []));
        assert_eq!(selected.len(), 1);
    }
}
