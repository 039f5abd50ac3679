//! Job-creation payloads.
//!
//! A [`CreateJobRequest`] can only be built through [`CreateJobRequest::new`]
//! (or from a [`CreateJobForm`]), which checks required fields and the
//! per-source data before anything reaches the dispatcher.

use serde::{Deserialize, Serialize};
use url::Url;

use super::job::JobType;
use crate::error::ValidationError;

/// Where the document to process comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum JobSource {
    /// A document previously uploaded to the service.
    Upload { document_id: String },
    /// A publicly reachable http(s) URL.
    Url { url: String },
    /// An object in S3, as `bucket/key`.
    S3 { path: String },
}

impl JobSource {
    pub fn upload(document_id: &str) -> Result<Self, ValidationError> {
        let document_id = document_id.trim();
        if document_id.is_empty() {
            return Err(ValidationError::MissingField("document_id"));
        }
        Ok(JobSource::Upload {
            document_id: document_id.to_string(),
        })
    }

    pub fn url(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ValidationError::MissingField("url"));
        }
        let parsed = Url::parse(raw).map_err(|e| ValidationError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ValidationError::InvalidUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        Ok(JobSource::Url {
            url: parsed.to_string(),
        })
    }

    pub fn s3(raw: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ValidationError::MissingField("s3_path"));
        }
        let path = raw.strip_prefix("s3://").unwrap_or(raw);
        match path.split_once('/') {
            Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok(JobSource::S3 {
                path: path.to_string(),
            }),
            _ => Err(ValidationError::InvalidS3Path(raw.to_string())),
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            JobSource::Upload { .. } => SourceKind::Upload,
            JobSource::Url { .. } => SourceKind::Url,
            JobSource::S3 { .. } => SourceKind::S3,
        }
    }

    /// Re-runs the constructor checks on an already built value.
    fn validate(&self) -> Result<(), ValidationError> {
        match self {
            JobSource::Upload { document_id } => JobSource::upload(document_id).map(|_| ()),
            JobSource::Url { url } => JobSource::url(url).map(|_| ()),
            JobSource::S3 { path } => JobSource::s3(path).map(|_| ()),
        }
    }
}

/// Source kinds offered by the create dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Upload,
    Url,
    S3,
}

/// Optional processing steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingOptions {
    pub extract_text: bool,
    pub generate_summary: bool,
    pub detect_language: bool,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            extract_text: true,
            generate_summary: false,
            detect_language: true,
        }
    }
}

/// Validated payload for the create-job endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateJobRequest {
    name: String,
    #[serde(rename = "type")]
    job_type: JobType,
    project_id: String,
    #[serde(flatten)]
    source: JobSource,
    options: ProcessingOptions,
}

impl CreateJobRequest {
    pub fn new(
        name: &str,
        job_type: JobType,
        project_id: &str,
        source: JobSource,
        options: ProcessingOptions,
    ) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        let project_id = project_id.trim();
        if project_id.is_empty() {
            return Err(ValidationError::MissingField("project_id"));
        }
        source.validate()?;

        Ok(Self {
            name: name.to_string(),
            job_type,
            project_id: project_id.to_string(),
            source,
            options,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn job_type(&self) -> JobType {
        self.job_type
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn source(&self) -> &JobSource {
        &self.source
    }

    pub fn options(&self) -> ProcessingOptions {
        self.options
    }
}

/// Raw values captured by the create dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateJobForm {
    pub name: String,
    pub job_type: JobType,
    pub project_id: String,
    pub source: SourceKind,
    /// Document id, URL or S3 path depending on `source`.
    pub source_value: String,
    pub options: ProcessingOptions,
}

impl Default for CreateJobForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            job_type: JobType::Parse,
            project_id: String::new(),
            source: SourceKind::Upload,
            source_value: String::new(),
            options: ProcessingOptions::default(),
        }
    }
}

impl CreateJobForm {
    pub fn into_request(self) -> Result<CreateJobRequest, ValidationError> {
        let source = match self.source {
            SourceKind::Upload => JobSource::upload(&self.source_value)?,
            SourceKind::Url => JobSource::url(&self.source_value)?,
            SourceKind::S3 => JobSource::s3(&self.source_value)?,
        };
        CreateJobRequest::new(
            &self.name,
            self.job_type,
            &self.project_id,
            source,
            self.options,
        )
    }
}
