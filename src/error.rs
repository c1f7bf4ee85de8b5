use std::fmt;

#[derive(Debug)]
pub enum ReportError {
    /// Column schema rejected before any drawing happened.
    Schema(String),
    /// The surface has no metrics for this font/text pair.
    Measurement { font: String, text: String },
    InvalidConfiguration(String),
    /// Misuse of the surface itself: unbalanced transforms, drawing with no page.
    Surface(String),
    Io(std::io::Error),
}

impl ReportError {
    pub(crate) fn measurement(font: &str, text: &str) -> Self {
        ReportError::Measurement {
            font: font.to_string(),
            text: text.to_string(),
        }
    }
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::Schema(message) => write!(f, "invalid table schema: {}", message),
            ReportError::Measurement { font, text } => {
                write!(f, "cannot measure {:?} with font {}", text, font)
            }
            ReportError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            ReportError::Surface(message) => write!(f, "surface error: {}", message),
            ReportError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ReportError {
    fn from(value: std::io::Error) -> Self {
        ReportError::Io(value)
    }
}
