//! Source language detection.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Language of the code under review; selects static tools and the snapshot
/// file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    /// Python
    Python,
    /// JavaScript
    JavaScript,
    /// TypeScript
    TypeScript,
    /// Java
    Java,
    /// C++
    Cpp,
    /// C
    C,
    /// C#
    CSharp,
    /// Ruby
    Ruby,
    /// PHP
    Php,
    /// Go
    Go,
    /// Rust
    Rust,
    /// Kotlin
    Kotlin,
    /// Swift
    Swift,
    /// Unrecognized extension
    #[default]
    Unknown,
}

impl Language {
    /// Detect the language from a file path's extension.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(Self::Unknown, Self::from_extension)
    }

    /// Detect the language from a bare extension, with or without the dot.
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_lowercase().as_str() {
            "py" => Self::Python,
            "js" | "mjs" | "cjs" => Self::JavaScript,
            "ts" | "tsx" => Self::TypeScript,
            "java" => Self::Java,
            "cpp" | "cc" | "cxx" | "hpp" => Self::Cpp,
            "c" | "h" => Self::C,
            "cs" => Self::CSharp,
            "rb" => Self::Ruby,
            "php" => Self::Php,
            "go" => Self::Go,
            "rs" => Self::Rust,
            "kt" => Self::Kotlin,
            "swift" => Self::Swift,
            _ => Self::Unknown,
        }
    }

    /// Extension used for temporary code snapshots, including the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Python | Self::Unknown => ".py",
            Self::JavaScript => ".js",
            Self::TypeScript => ".ts",
            Self::Java => ".java",
            Self::Cpp => ".cpp",
            Self::C => ".c",
            Self::CSharp => ".cs",
            Self::Ruby => ".rb",
            Self::Php => ".php",
            Self::Go => ".go",
            Self::Rust => ".rs",
            Self::Kotlin => ".kt",
            Self::Swift => ".swift",
        }
    }

    /// Display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "Python",
            Self::JavaScript => "JavaScript",
            Self::TypeScript => "TypeScript",
            Self::Java => "Java",
            Self::Cpp => "C++",
            Self::C => "C",
            Self::CSharp => "C#",
            Self::Ruby => "Ruby",
            Self::Php => "PHP",
            Self::Go => "Go",
            Self::Rust => "Rust",
            Self::Kotlin => "Kotlin",
            Self::Swift => "Swift",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_from_path() {
        assert_eq!(Language::from_path("src/app.py"), Language::Python);
        assert_eq!(Language::from_path("web/index.TS"), Language::TypeScript);
        assert_eq!(Language::from_path("Main.java"), Language::Java);
        assert_eq!(Language::from_path("Makefile"), Language::Unknown);
    }

    #[test]
    fn unknown_snapshots_as_python() {
        assert_eq!(Language::Unknown.extension(), ".py");
        assert_eq!(Language::Cpp.extension(), ".cpp");
    }
}
