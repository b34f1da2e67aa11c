//! Reconstruction options and JSON configuration loading.

use crate::detect::TextEncoding;
use crate::error::{Error, Result};
use crate::materialize::PlaceholderStyle;
use crate::parser::ParseOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default name of the structure description written into each output.
pub const STRUCTURE_FILE_NAME: &str = "project_structure.md";

/// What to do with code blocks whose path is not part of the diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnlistedPolicy {
    /// Write them anyway and count them separately
    #[default]
    Allow,
    /// Drop them with a warning
    Reject,
}

/// Options for a reconstruction run.
///
/// Parse options are flattened, so a configuration file uses one flat
/// object:
///
/// ```json
/// {
///   "file_types": ["md", "txt"],
///   "start_marker": "```",
///   "lookback_lines": 3,
///   "output_root": "code"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructOptions {
    /// Scanner and parser settings
    #[serde(flatten)]
    pub parse: ParseOptions,

    /// Extensions of documents to process
    pub file_types: Vec<String>,

    /// Base path handed to the output allocator
    pub output_root: PathBuf,

    /// Descend into subdirectories when discovering documents
    pub recursive: bool,

    /// Text encodings tried in order
    pub encodings: Vec<TextEncoding>,

    /// Content of listed files without extracted code
    pub placeholder: PlaceholderStyle,

    /// Handling of blocks outside the diagram
    pub unlisted: UnlistedPolicy,

    /// Prefix extracted code with `File:`/`Language:` comment lines
    pub annotate: bool,

    /// Name of the structure description file
    pub structure_file: String,
}

impl Default for ReconstructOptions {
    fn default() -> Self {
        Self {
            parse: ParseOptions::default(),
            file_types: vec!["md".to_string()],
            output_root: PathBuf::from("code"),
            recursive: false,
            encodings: TextEncoding::DEFAULT_ORDER.to_vec(),
            placeholder: PlaceholderStyle::Empty,
            unlisted: UnlistedPolicy::Allow,
            annotate: false,
            structure_file: STRUCTURE_FILE_NAME.to_string(),
        }
    }
}

impl ReconstructOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a JSON string; missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Load options from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    /// Set parse options.
    pub fn with_parse_options(mut self, parse: ParseOptions) -> Self {
        self.parse = parse;
        self
    }

    /// Set the document extensions to process.
    pub fn with_file_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Set the output base path.
    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    /// Enable or disable recursive discovery.
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Set the encodings to try.
    pub fn with_encodings(mut self, encodings: Vec<TextEncoding>) -> Self {
        self.encodings = encodings;
        self
    }

    /// Set placeholder style.
    pub fn with_placeholder(mut self, style: PlaceholderStyle) -> Self {
        self.placeholder = style;
        self
    }

    /// Set the unlisted-path policy.
    pub fn with_unlisted(mut self, policy: UnlistedPolicy) -> Self {
        self.unlisted = policy;
        self
    }

    /// Drop blocks whose path is not in the diagram.
    pub fn reject_unlisted(mut self) -> Self {
        self.unlisted = UnlistedPolicy::Reject;
        self
    }

    /// Enable or disable annotation headers.
    pub fn with_annotation(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    /// Set the structure description file name.
    pub fn with_structure_file(mut self, name: impl Into<String>) -> Self {
        self.structure_file = name.into();
        self
    }

    /// Check option consistency.
    pub fn validate(&self) -> Result<()> {
        self.parse.validate()?;
        if self.file_types.iter().all(|t| t.trim().trim_start_matches('.').is_empty()) {
            return Err(Error::Config("file_types must name at least one extension".into()));
        }
        if self.encodings.is_empty() {
            return Err(Error::Config("encodings must not be empty".into()));
        }
        if self.output_root.as_os_str().is_empty() {
            return Err(Error::Config("output_root must not be empty".into()));
        }
        let name = self.structure_file.as_str();
        if name.is_empty() || name.contains(['/', '\\']) || name == ".." {
            return Err(Error::Config(format!("invalid structure_file '{}'", name)));
        }
        Ok(())
    }
}
