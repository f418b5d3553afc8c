//! Documents under evaluation and the category router.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::version::DeclaredVersion;

/// Broad document category, selects the evaluation workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    /// Word-processor and markup sources (never proofs or records)
    Editable,
    /// Typeset output such as PDF
    FixedLayout,
    /// Anything we have no workflow for
    Unsupported,
}

const EDITABLE_EXTENSIONS: &[&str] = &[
    "docx", "doc", "odt", "rtf", "tex", "txt", "html", "htm", "ppt", "pptx",
];

const FIXED_LAYOUT_EXTENSIONS: &[&str] = &["pdf"];

impl DocumentCategory {
    /// Classify a path by its (case-insensitive) extension
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if FIXED_LAYOUT_EXTENSIONS.contains(&ext.as_str()) {
            DocumentCategory::FixedLayout
        } else if EDITABLE_EXTENSIONS.contains(&ext.as_str()) {
            DocumentCategory::Editable
        } else {
            DocumentCategory::Unsupported
        }
    }

    /// Metadata key holding the document title for this category
    pub fn title_metadata_key(&self) -> &'static str {
        match self {
            DocumentCategory::FixedLayout => "/Title",
            _ => "title",
        }
    }
}

impl fmt::Display for DocumentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentCategory::Editable => write!(f, "editable"),
            DocumentCategory::FixedLayout => write!(f, "fixed_layout"),
            DocumentCategory::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// What the depositor told us about the manuscript
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Declaration {
    /// Declared manuscript title
    pub title: Option<String>,

    /// Declared version, as free text
    pub version: Option<String>,

    /// Declared DOI
    pub doi: Option<String>,

    /// Declared authors
    #[serde(default)]
    pub authors: Vec<String>,
}

impl Declaration {
    /// Declared title, if non-blank
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn declared_version(&self) -> Option<DeclaredVersion> {
        self.version
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .map(DeclaredVersion::parse)
    }

    pub fn doi(&self) -> Option<&str> {
        self.doi.as_deref().filter(|d| !d.trim().is_empty())
    }
}

/// A manuscript file submitted for evaluation
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub declaration: Declaration,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, declaration: Declaration) -> Self {
        Self {
            path: path.into(),
            declaration,
        }
    }

    /// File name used as the input identifier
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn category(&self) -> DocumentCategory {
        DocumentCategory::from_path(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_routing() {
        assert_eq!(
            DocumentCategory::from_path(Path::new("paper.PDF")),
            DocumentCategory::FixedLayout
        );
        assert_eq!(
            DocumentCategory::from_path(Path::new("/tmp/draft.docx")),
            DocumentCategory::Editable
        );
        assert_eq!(
            DocumentCategory::from_path(Path::new("notes.tex")),
            DocumentCategory::Editable
        );
        assert_eq!(
            DocumentCategory::from_path(Path::new("figure.png")),
            DocumentCategory::Unsupported
        );
        assert_eq!(
            DocumentCategory::from_path(Path::new("no_extension")),
            DocumentCategory::Unsupported
        );
    }

    #[test]
    fn test_blank_declarations_are_absent() {
        let declaration = Declaration {
            title: Some("   ".to_string()),
            version: Some(String::new()),
            doi: None,
            authors: vec![],
        };
        assert!(declaration.title().is_none());
        assert!(declaration.declared_version().is_none());
        assert!(declaration.doi().is_none());
    }

    #[test]
    fn test_file_name() {
        let doc = Document::new("/data/in/My Paper.pdf", Declaration::default());
        assert_eq!(doc.file_name(), "My Paper.pdf");
        assert_eq!(doc.category(), DocumentCategory::FixedLayout);
    }
}
