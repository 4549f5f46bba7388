//! Validation of user-supplied folder paths

use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of validating one path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathValidationResult {
    /// Whether every check passed
    pub valid: bool,
    /// One message per failed check
    pub errors: Vec<String>,
    /// The parsed path, absent when the input was blank
    pub path: Option<PathBuf>,
}

impl PathValidationResult {
    fn fail(&mut self, message: String) {
        self.valid = false;
        self.errors.push(message);
    }
}

/// Checks that a path names a readable folder
#[derive(Debug, Clone, Copy, Default)]
pub struct PathValidator;

impl PathValidator {
    /// Create a validator
    pub fn new() -> Self {
        Self
    }

    /// Validate `input`, reporting every failed check.
    ///
    /// A blank input fails immediately; otherwise the path must exist, be
    /// readable and be a folder.
    pub fn validate(&self, input: &str) -> PathValidationResult {
        let mut result = PathValidationResult {
            valid: true,
            ..PathValidationResult::default()
        };

        if input.trim().is_empty() {
            result.fail(format!("This is blank: '{}'", input));
            return result;
        }

        let path = PathBuf::from(input);
        if !is_readable(&path) {
            result.fail(format!("This is not readable: {}", path.display()));
        }
        if !path.is_dir() {
            result.fail(format!("This is not a folder: {}", path.display()));
        }
        result.path = Some(path);
        result
    }
}

fn is_readable(path: &Path) -> bool {
    if path.is_dir() {
        fs::read_dir(path).is_ok()
    } else {
        fs::File::open(path).is_ok()
    }
}
