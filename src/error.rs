use thiserror::Error;

#[derive(Error, Debug)]
pub enum AstroError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Invalid configuration: {message}")]
    Validation { message: String },

    #[error("Camera connection failed ({device}): {details}")]
    Connection { device: String, details: String },

    #[error("Camera setting '{setting}' {operation} failed: {details}")]
    Setting {
        setting: String,
        operation: SettingOperation,
        details: String,
    },

    #[error("Listing camera files failed: {details}")]
    List { details: String },

    #[error("Download of '{file}' failed: {details}")]
    Download { file: String, details: String },

    #[error("Camera connection reset failed: {details}")]
    Reset { details: String },

    #[error("Capture aborted by user")]
    Aborted,

    #[error("System error: {message}")]
    System { message: String },
}

/// Direction of a failed settings command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingOperation {
    Get,
    Set,
}

impl std::fmt::Display for SettingOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingOperation::Get => write!(f, "get"),
            SettingOperation::Set => write!(f, "set"),
        }
    }
}

impl AstroError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn setting_get<S: Into<String>, D: ToString>(setting: S, details: D) -> Self {
        Self::Setting {
            setting: setting.into(),
            operation: SettingOperation::Get,
            details: details.to_string(),
        }
    }

    pub fn setting_set<S: Into<String>, D: ToString>(setting: S, details: D) -> Self {
        Self::Setting {
            setting: setting.into(),
            operation: SettingOperation::Set,
            details: details.to_string(),
        }
    }

    pub fn download<S: Into<String>, D: ToString>(file: S, details: D) -> Self {
        Self::Download {
            file: file.into(),
            details: details.to_string(),
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, AstroError::Aborted)
    }
}

pub type Result<T> = std::result::Result<T, AstroError>;
