pub const BASE_URL_VAR: &str = "EXAM_API_BASE_URL";
pub const TOKEN_VAR: &str = "EXAM_API_TOKEN";

/// Connection settings for the exam REST backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<String>,
}

impl ApiConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_owned(),
            token: None,
        }
    }

    /// Attach a bearer token; blank tokens are ignored.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token: String = token.into();
        self.token = (!token.trim().is_empty()).then(|| token.trim().to_owned());
        self
    }

    /// Read `EXAM_API_BASE_URL` and `EXAM_API_TOKEN` through `lookup`
    /// (`std::env::var` in the binary).
    ///
    /// Returns `None` when no base url is configured.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let base_url = lookup(BASE_URL_VAR)?;
        if base_url.trim().is_empty() {
            return None;
        }
        let config = Self::new(base_url);
        Some(match lookup(TOKEN_VAR) {
            Some(token) => config.with_token(token),
            None => config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_trailing_slashes() {
        let config = ApiConfig::new(" https://lms.example.com/// ");
        assert_eq!(config.base_url, "https://lms.example.com");
    }

    #[test]
    fn blank_token_is_dropped() {
        let config = ApiConfig::new("http://localhost:8080").with_token("   ");
        assert_eq!(config.token, None);

        let config = ApiConfig::new("http://localhost:8080").with_token(" abc ");
        assert_eq!(config.token.as_deref(), Some("abc"));
    }

    #[test]
    fn reads_base_url_and_token_from_lookup() {
        let config = ApiConfig::from_lookup(|key| match key {
            BASE_URL_VAR => Some("http://lms.local/".to_owned()),
            TOKEN_VAR => Some("t0k".to_owned()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.base_url, "http://lms.local");
        assert_eq!(config.token.as_deref(), Some("t0k"));
    }

    #[test]
    fn missing_or_blank_base_url_is_unconfigured() {
        assert_eq!(ApiConfig::from_lookup(|_| None), None);
        assert_eq!(
            ApiConfig::from_lookup(|key| (key == BASE_URL_VAR).then(|| "  ".to_owned())),
            None
        );
    }
}
