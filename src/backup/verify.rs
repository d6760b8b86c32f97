//! Structural verification of a restored graph.

use std::path::{Path, PathBuf};

/// Which expected top-level items a restored tree holds
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    pub present: Vec<PathBuf>,
    pub missing: Vec<PathBuf>,
}

impl VerificationReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.is_complete() {
            format!("all {} expected item(s) present", self.present.len())
        } else {
            let missing: Vec<String> = self
                .missing
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            format!(
                "{} of {} expected item(s) missing: {}",
                self.missing.len(),
                self.present.len() + self.missing.len(),
                missing.join(", ")
            )
        }
    }
}

/// Check `root` for each relative path in `expected`
pub fn verify_structure(root: &Path, expected: &[String]) -> VerificationReport {
    let mut report = VerificationReport::default();
    for marker in expected {
        let relative = PathBuf::from(marker.trim_end_matches('/'));
        if root.join(&relative).exists() {
            report.present.push(relative);
        } else {
            report.missing.push(relative);
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn markers() -> Vec<String> {
        vec![
            "pages".to_string(),
            "journals/".to_string(),
            "logseq/config.edn".to_string(),
        ]
    }

    #[test]
    fn test_complete_graph() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("pages")).unwrap();
        fs::create_dir_all(temp.path().join("journals")).unwrap();
        fs::create_dir_all(temp.path().join("logseq")).unwrap();
        fs::write(temp.path().join("logseq/config.edn"), "{}").unwrap();

        let report = verify_structure(temp.path(), &markers());

        assert!(report.is_complete());
        assert_eq!(report.present.len(), 3);
        assert_eq!(report.summary(), "all 3 expected item(s) present");
    }

    #[test]
    fn test_missing_markers_listed() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("pages")).unwrap();

        let report = verify_structure(temp.path(), &markers());

        assert!(!report.is_complete());
        assert_eq!(
            report.missing,
            vec![PathBuf::from("journals"), PathBuf::from("logseq/config.edn")]
        );
        assert!(report.summary().starts_with("2 of 3"));
    }

    #[test]
    fn test_no_expectations_is_complete() {
        let temp = TempDir::new().unwrap();
        assert!(verify_structure(temp.path(), &[]).is_complete());
    }
}
