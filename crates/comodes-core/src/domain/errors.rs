use std::fmt::{Display, Formatter};

pub type AfResult<T> = Result<T, AfError>;

/// Failure classes of the dataset reader, each mapped to a stable CLI
/// exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AfErrorCategory {
    /// File extension is neither `h5` nor `npz`.
    UnsupportedFormat,
    /// Container could not be opened or an entry could not be read.
    DatasetRead,
    /// A required key is absent from the raw record.
    MissingKey,
    /// Stored arrays violate a structural invariant.
    ShapeMismatch,
    /// Mode-field fetch failed, qualified by the backing storage kind.
    ModeAccess,
    Internal,
}

impl AfErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::UnsupportedFormat => 2,
            Self::DatasetRead => 3,
            Self::MissingKey => 4,
            Self::ShapeMismatch => 5,
            Self::ModeAccess => 6,
            Self::Internal => 7,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::UnsupportedFormat => "UnsupportedFormat",
            Self::DatasetRead => "DatasetRead",
            Self::MissingKey => "MissingKey",
            Self::ShapeMismatch => "ShapeMismatch",
            Self::ModeAccess => "ModeAccess",
            Self::Internal => "Internal",
        }
    }
}

impl Display for AfErrorCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{category} [{placeholder}] {message}")]
pub struct AfError {
    category: AfErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl AfError {
    pub fn new(
        category: AfErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn unsupported_format(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(AfErrorCategory::UnsupportedFormat, placeholder, message)
    }

    pub fn dataset_read(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(AfErrorCategory::DatasetRead, placeholder, message)
    }

    pub fn missing_key(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(AfErrorCategory::MissingKey, placeholder, message)
    }

    pub fn shape_mismatch(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(AfErrorCategory::ShapeMismatch, placeholder, message)
    }

    pub fn mode_access(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(AfErrorCategory::ModeAccess, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(AfErrorCategory::Internal, placeholder, message)
    }

    pub const fn category(&self) -> AfErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::{AfError, AfErrorCategory};

    #[test]
    fn exit_code_mapping_is_stable() {
        let cases = [
            (AfErrorCategory::UnsupportedFormat, 2),
            (AfErrorCategory::DatasetRead, 3),
            (AfErrorCategory::MissingKey, 4),
            (AfErrorCategory::ShapeMismatch, 5),
            (AfErrorCategory::ModeAccess, 6),
            (AfErrorCategory::Internal, 7),
        ];

        for (category, exit_code) in cases {
            assert_eq!(category.exit_code(), exit_code);
        }
    }

    #[test]
    fn error_renders_category_placeholder_and_message() {
        let error = AfError::missing_key("KEY.TWOFORM_3", "dataset has no 'twoform_3' entry");

        assert_eq!(error.exit_code(), 4);
        assert_eq!(
            error.to_string(),
            "MissingKey [KEY.TWOFORM_3] dataset has no 'twoform_3' entry"
        );
        assert_eq!(
            error.diagnostic_line(),
            "ERROR: [KEY.TWOFORM_3] dataset has no 'twoform_3' entry"
        );
    }
}
