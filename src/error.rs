use std::fmt;

#[derive(Debug)]
pub enum VendorError {
    Request(String),
    NonJsonResponse(String),
    Parse(String),
}

impl fmt::Display for VendorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VendorError::Request(msg) => write!(f, "Request error: {}", msg),
            VendorError::NonJsonResponse(preview) => write!(f, "Non-JSON response: {}", preview),
            VendorError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for VendorError {}

impl From<reqwest::Error> for VendorError {
    fn from(err: reqwest::Error) -> Self {
        VendorError::Request(err.to_string())
    }
}

impl From<serde_json::Error> for VendorError {
    fn from(err: serde_json::Error) -> Self {
        VendorError::Parse(err.to_string())
    }
}
