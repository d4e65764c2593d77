use std::path::Path;

use serde::Serialize;

use crate::group::DuplicateGroup;
use crate::Result;

/// Printed when the scan did not find any files to fingerprint.
pub const NO_FILES_MESSAGE: &str = "No matching files found.";

/// Printed when no two files share a fingerprint.
pub const NO_DUPLICATES_MESSAGE: &str = "No duplicates detected.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReportItem {
    pub path: String,
    pub kind: String,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReportGroup {
    pub hash: String,
    pub items: Vec<ReportItem>,
}

/// The duplicate groups found under a root directory, ready to be printed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Report {
    pub root: String,
    pub recurse: bool,
    pub duplicates: Vec<ReportGroup>,
}

impl Report {
    /// Builds a report from groups already in presentation order (see
    /// [DuplicateGroups::duplicates](crate::DuplicateGroups::duplicates)).
    pub fn new(root: impl AsRef<Path>, recurse: bool, groups: &[DuplicateGroup]) -> Self {
        let duplicates = groups
            .iter()
            .map(|group| ReportGroup {
                hash: group.key.clone(),
                items: group
                    .entries
                    .iter()
                    .map(|entry| ReportItem {
                        path: entry.path.display().to_string(),
                        kind: entry.result.kind.to_string(),
                        detail: entry.result.detail.clone(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            root: root.as_ref().display().to_string(),
            recurse,
            duplicates,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.duplicates.is_empty()
    }

    /// Renders the report as a plain-text listing, one header line per group followed by one
    /// indented line per file.
    pub fn to_text(&self) -> String {
        let mut lines = Vec::new();
        for group in &self.duplicates {
            lines.push(format!("hash={} (x{})", group.hash, group.items.len()));
            for item in &group.items {
                lines.push(format!("  - {} [{} {}]", item.path, item.kind, item.detail));
            }
        }
        lines.join("\n")
    }

    /// Renders the report as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use super::*;
    use crate::fingerprint::{FingerprintKind, FingerprintResult};
    use crate::group::DuplicateGroups;

    fn groups() -> Vec<DuplicateGroup> {
        let entries = vec![
            (
                "media/b.mp4",
                FingerprintResult {
                    kind: FingerprintKind::Video,
                    key: "vhash:00ff00ff00ff00ff".to_string(),
                    detail: "vhash:00ff00ff00ff00ff".to_string(),
                },
            ),
            (
                "media/a.mkv",
                FingerprintResult {
                    kind: FingerprintKind::Video,
                    key: "vhash:00ff00ff00ff00ff".to_string(),
                    detail: "vhash:00ff00ff00ff00ff".to_string(),
                },
            ),
            (
                "media/x.txt",
                FingerprintResult {
                    kind: FingerprintKind::Fallback,
                    key: "0a1b2c3d4e5f60718293a4b5".to_string(),
                    detail: "sha256:0a1b2c3d4e5f...".to_string(),
                },
            ),
            (
                "media/y.txt",
                FingerprintResult {
                    kind: FingerprintKind::Fallback,
                    key: "0a1b2c3d4e5f60718293a4b5".to_string(),
                    detail: "sha256:0a1b2c3d4e5f...".to_string(),
                },
            ),
        ];
        entries.into_iter().collect::<DuplicateGroups>().duplicates()
    }

    #[test]
    fn test_text_report() {
        let report = Report::new(PathBuf::from("media"), true, &groups());
        insta::assert_snapshot!(report.to_text(), @r###"
        hash=0a1b2c3d4e5f60718293a4b5 (x2)
          - media/x.txt [fallback sha256:0a1b2c3d4e5f...]
          - media/y.txt [fallback sha256:0a1b2c3d4e5f...]
        hash=vhash:00ff00ff00ff00ff (x2)
          - media/a.mkv [video vhash:00ff00ff00ff00ff]
          - media/b.mp4 [video vhash:00ff00ff00ff00ff]
        "###);
        assert!(!report.to_text().ends_with('\n'));
    }

    #[test]
    fn test_json_report() {
        let report = Report::new("media", false, &groups());
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        let expected = serde_json::json!({
            "root": "media",
            "recurse": false,
            "duplicates": [
                {
                    "hash": "0a1b2c3d4e5f60718293a4b5",
                    "items": [
                        {"path": "media/x.txt", "kind": "fallback", "detail": "sha256:0a1b2c3d4e5f..."},
                        {"path": "media/y.txt", "kind": "fallback", "detail": "sha256:0a1b2c3d4e5f..."},
                    ],
                },
                {
                    "hash": "vhash:00ff00ff00ff00ff",
                    "items": [
                        {"path": "media/a.mkv", "kind": "video", "detail": "vhash:00ff00ff00ff00ff"},
                        {"path": "media/b.mp4", "kind": "video", "detail": "vhash:00ff00ff00ff00ff"},
                    ],
                },
            ],
        });
        assert_eq!(value, expected);
    }

    #[test]
    fn test_empty_report() {
        let report = Report::new("media", true, &[]);
        assert!(report.is_empty());
        assert_eq!(report.to_text(), "");
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(value["duplicates"], serde_json::json!([]));
    }
}
