use async_trait::async_trait;
use log::{debug, error, info, warn};
use reqwest::{Client, RequestBuilder, Url};

use exam_core::model::{AnswerSheet, MaterialId, TestDefinition};

use super::config::ApiConfig;
use super::dto::{SubmissionEntryDto, TestDataResponse};
use super::{SubmissionSink, TestDataSource};
use crate::error::ApiError;

/// reqwest-backed client for the exam REST endpoints.
///
/// - `GET  {base}/api/test/{material}` returns the test definition
/// - `POST {base}/api/test/{material}/submit` accepts the answer array
#[derive(Clone)]
pub struct HttpExamApi {
    client: Client,
    config: ApiConfig,
}

impl HttpExamApi {
    #[must_use]
    pub fn new(config: ApiConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    #[must_use]
    pub fn with_client(client: Client, config: ApiConfig) -> Self {
        Self { client, config }
    }

    /// Build `{base}/api/test/{material}[/extra]` with the material id escaped as one segment.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidBaseUrl` if the configured base url cannot carry a path.
    pub fn test_url(&self, material_id: &MaterialId, extra: Option<&str>) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|e| ApiError::InvalidBaseUrl(format!("{}: {e}", self.config.base_url)))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| ApiError::InvalidBaseUrl(self.config.base_url.clone()))?;
            segments
                .pop_if_empty()
                .extend(["api", "test", material_id.as_str()]);
            if let Some(extra) = extra {
                segments.push(extra);
            }
        }
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl TestDataSource for HttpExamApi {
    async fn fetch_test(&self, material_id: &MaterialId) -> Result<TestDefinition, ApiError> {
        let url = self.test_url(material_id, None)?;
        debug!("fetching test data from {url}");

        let response = self.authorize(self.client.get(url)).send().await?;
        let status = response.status();
        if !status.is_success() {
            error!("test data request for {material_id} failed with {status}");
            return Err(ApiError::from_status(status));
        }

        let bytes = response.bytes().await?;
        let Some(body) = TestDataResponse::from_body(&bytes)? else {
            warn!("test data for {material_id} was empty");
            return Err(ApiError::NotFound);
        };
        let definition = body.into_definition(material_id.clone())?;
        info!(
            "loaded test {material_id}: {} questions, {} seconds",
            definition.questions().len(),
            definition.duration_secs()
        );
        Ok(definition)
    }
}

#[async_trait]
impl SubmissionSink for HttpExamApi {
    async fn submit_answers(
        &self,
        material_id: &MaterialId,
        sheet: &AnswerSheet,
    ) -> Result<(), ApiError> {
        let url = self.test_url(material_id, Some("submit"))?;
        let payload = SubmissionEntryDto::from_sheet(sheet);
        debug!("posting {} answers to {url}", payload.len());

        let response = self
            .authorize(self.client.post(url))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!("submission for {material_id} failed with {status}");
            return Err(ApiError::from_status(status));
        }

        info!("submission for {material_id} accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_escaped_urls() {
        let api = HttpExamApi::new(ApiConfig::new("https://lms.example.com/school/"));
        let url = api.test_url(&MaterialId::new("12"), None).unwrap();
        assert_eq!(url.as_str(), "https://lms.example.com/school/api/test/12");

        let url = api
            .test_url(&MaterialId::new("a b/c"), Some("submit"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://lms.example.com/school/api/test/a%20b%2Fc/submit"
        );
    }

    #[test]
    fn rejects_unusable_base_url() {
        let api = HttpExamApi::new(ApiConfig::new("not a url"));
        assert!(matches!(
            api.test_url(&MaterialId::new("1"), None),
            Err(ApiError::InvalidBaseUrl(_))
        ));

        let api = HttpExamApi::new(ApiConfig::new("mailto:someone@example.com"));
        assert!(matches!(
            api.test_url(&MaterialId::new("1"), None),
            Err(ApiError::InvalidBaseUrl(_))
        ));
    }
}
