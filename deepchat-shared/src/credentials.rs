use std::fmt;

/// True when both the endpoint and the key are present and non-empty.
pub fn is_ready(endpoint: Option<&str>, api_key: Option<&str>) -> bool {
    matches!(endpoint, Some(e) if !e.is_empty()) && matches!(api_key, Some(k) if !k.is_empty())
}

#[derive(Clone, Default, PartialEq)]
pub struct Credentials {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
}

impl Credentials {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            api_key: Some(api_key.into()),
        }
    }

    pub fn is_ready(&self) -> bool {
        is_ready(self.endpoint.as_deref(), self.api_key.as_deref())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
