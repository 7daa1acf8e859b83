/// A scan payload that could not be decoded into a pickup record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError(pub String);

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid pickup payload: {}", self.0)
    }
}

impl std::error::Error for DecodeError {}
