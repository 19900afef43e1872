use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum Error {
    NotFound(PathBuf),
    NotAFile(PathBuf),
    Unreadable(PathBuf),
    InvalidPackage(String),
    InvalidRoleMapping(String),
    InvalidSectionRule(String),
    InvalidOption(String),
    NoStylesFound,
    StrictValidationFailed(String),
    UnknownStyle(String),
    Xml(roxmltree::Error),
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound(path) => write!(f, "file not found: {}", path.display()),
            Error::NotAFile(path) => write!(f, "not a file: {}", path.display()),
            Error::Unreadable(path) => write!(f, "permission denied: {}", path.display()),
            Error::InvalidPackage(reason) => write!(f, "not a valid DOCX package: {reason}"),
            Error::InvalidRoleMapping(reason) => write!(f, "invalid role mapping: {reason}"),
            Error::InvalidSectionRule(reason) => write!(f, "invalid section rule: {reason}"),
            Error::InvalidOption(reason) => write!(f, "invalid option: {reason}"),
            Error::NoStylesFound => write!(f, "no paragraph styles found in template"),
            Error::StrictValidationFailed(reason) => f.write_str(reason),
            Error::UnknownStyle(id) => write!(f, "unknown style id: {id}"),
            Error::Xml(e) => write!(f, "XML error: {e}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
            Error::Json(e) => write!(f, "JSON error: {e}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Error::InvalidPackage(e.to_string())
    }
}

impl From<roxmltree::Error> for Error {
    fn from(e: roxmltree::Error) -> Self {
        Error::Xml(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}
