//! Upload validation.
//!
//! Files are checked before anything is sent to the media host. A file may
//! break several rules at once (type and size) and gets one error per broken
//! rule. Exceeding the per-creation file count rejects the whole batch.

use std::collections::HashSet;

use thiserror::Error;

const MB: u64 = 1024 * 1024;

fn megabytes(bytes: &u64) -> f64 {
    *bytes as f64 / MB as f64
}

fn whole_megabytes(bytes: &u64) -> u64 {
    *bytes / MB
}

/// What the validator needs to know about a selected file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub name: String,
    pub content_type: String,
    pub size_bytes: u64,
}

impl FileCandidate {
    pub fn new<N: Into<String>, C: Into<String>>(name: N, content_type: C, size_bytes: u64) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            size_bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{name}: Unsupported format. Please use JPG, PNG, WebP, GIF, MP4, MOV or WebM.")]
    UnsupportedFormat { name: String, content_type: String },

    #[error("{name}: File too large ({:.1}MB). Maximum size is {}MB.", megabytes(.size_bytes), whole_megabytes(.max_bytes))]
    TooLarge {
        name: String,
        size_bytes: u64,
        max_bytes: u64,
    },

    #[error("You can only upload up to {max} files per creation. Currently selected: {selected}")]
    TooManyFiles { max: usize, selected: usize },

    #[error("Please enter a creation name")]
    MissingName,

    #[error("Please select at least one photo")]
    NoFiles,
}

/// Outcome of validating a batch: indices of accepted files plus every error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub accepted: Vec<usize>,
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// True when the batch as a whole was refused (nothing may be uploaded).
    pub fn is_rejected(&self) -> bool {
        self.accepted.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.to_string()).collect()
    }
}

/// Limits applied to user selected files.
#[derive(Debug, Clone)]
pub struct UploadRules {
    pub image_types: HashSet<String>,
    pub video_types: HashSet<String>,
    pub max_image_bytes: u64,
    pub max_video_bytes: u64,
    pub max_files: usize,
}

impl Default for UploadRules {
    fn default() -> Self {
        let image_types = ["image/jpeg", "image/jpg", "image/png", "image/webp", "image/gif"];
        let video_types = [
            "video/mp4",
            "video/quicktime",
            "video/webm",
            "video/x-msvideo",
            "video/x-m4v",
        ];
        Self {
            image_types: image_types.iter().map(|s| s.to_string()).collect(),
            video_types: video_types.iter().map(|s| s.to_string()).collect(),
            max_image_bytes: 10 * MB,
            max_video_bytes: 50 * MB,
            max_files: 10,
        }
    }
}

impl UploadRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_files(mut self, max: usize) -> Self {
        self.max_files = max;
        self
    }

    /// Largest request body a full batch can need.
    pub fn max_batch_bytes(&self) -> u64 {
        self.max_image_bytes.max(self.max_video_bytes) * self.max_files as u64
    }

    pub fn is_video_type(&self, content_type: &str) -> bool {
        self.video_types.contains(&content_type.trim().to_lowercase())
    }

    pub fn is_accepted_type(&self, content_type: &str) -> bool {
        let ct = content_type.trim().to_lowercase();
        self.image_types.contains(&ct) || self.video_types.contains(&ct)
    }

    /// Every rule the file breaks.
    pub fn validate_file(&self, file: &FileCandidate) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if !self.is_accepted_type(&file.content_type) {
            errors.push(ValidationError::UnsupportedFormat {
                name: file.name.clone(),
                content_type: file.content_type.clone(),
            });
        }

        let max_bytes = if self.is_video_type(&file.content_type) {
            self.max_video_bytes
        } else {
            self.max_image_bytes
        };
        if file.size_bytes > max_bytes {
            errors.push(ValidationError::TooLarge {
                name: file.name.clone(),
                size_bytes: file.size_bytes,
                max_bytes,
            });
        }

        errors
    }

    /// Validate newly selected files on top of `already_selected` ones.
    pub fn validate_batch(&self, already_selected: usize, files: &[FileCandidate]) -> ValidationReport {
        if files.is_empty() && already_selected == 0 {
            return ValidationReport {
                accepted: Vec::new(),
                errors: vec![ValidationError::NoFiles],
            };
        }

        if already_selected + files.len() > self.max_files {
            return ValidationReport {
                accepted: Vec::new(),
                errors: vec![ValidationError::TooManyFiles {
                    max: self.max_files,
                    selected: already_selected,
                }],
            };
        }

        let mut report = ValidationReport::default();
        for (index, file) in files.iter().enumerate() {
            let errors = self.validate_file(file);
            if errors.is_empty() {
                report.accepted.push(index);
            } else {
                report.errors.extend(errors);
            }
        }
        report
    }

    /// Trimmed creation name, or an error when blank.
    pub fn validate_name(&self, name: &str) -> Result<String, ValidationError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            Err(ValidationError::MissingName)
        } else {
            Ok(trimmed.to_string())
        }
    }
}
