use crate::contract::ValidationError;

pub const S3_SCHEME: &str = "s3://";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    /// Splits `s3://bucket/path/to/key` (scheme optional) into bucket and key.
    pub fn parse(location: &str) -> Result<Self, ValidationError> {
        let trimmed = location.trim();
        let without_scheme = trimmed.strip_prefix(S3_SCHEME).unwrap_or(trimmed);
        let (bucket, key) = without_scheme.split_once('/').unwrap_or((without_scheme, ""));

        if bucket.is_empty() {
            return Err(ValidationError::new(format!(
                "snapshot location '{location}' has no bucket"
            )));
        }
        if key.is_empty() {
            return Err(ValidationError::new(format!(
                "snapshot location '{location}' has no object key"
            )));
        }

        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}

impl std::fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{S3_SCHEME}{}/{}", self.bucket, self.key)
    }
}
