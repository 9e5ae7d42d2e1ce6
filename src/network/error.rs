#[derive(Debug)]
pub enum NetworkError {
    DuplicateName(String),
    UnknownNode(String),
    UnknownLink(String),
    UnknownCurve(String),
    UnknownPattern(String),
    InvalidCurve(String),
    InvalidNetwork(String),
}

impl std::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkError::DuplicateName(name) => {
                write!(f, "A component named '{}' already exists", name)
            }
            NetworkError::UnknownNode(name) => write!(f, "Unknown node: {}", name),
            NetworkError::UnknownLink(name) => write!(f, "Unknown link: {}", name),
            NetworkError::UnknownCurve(name) => write!(f, "Unknown curve: {}", name),
            NetworkError::UnknownPattern(name) => write!(f, "Unknown pattern: {}", name),
            NetworkError::InvalidCurve(msg) => write!(f, "Invalid curve: {}", msg),
            NetworkError::InvalidNetwork(msg) => write!(f, "Invalid network: {}", msg),
        }
    }
}

impl std::error::Error for NetworkError {}

impl From<NetworkError> for String {
    fn from(error: NetworkError) -> Self {
        error.to_string()
    }
}
