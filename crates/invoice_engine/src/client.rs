use std::time::Duration;

use invoice_logging::invoice_debug;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::upload::UploadFile;
use crate::{ApiError, FailureKind, FeedbackKind, InvoiceList, InvoiceRecord, UploadReceipt};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Anything the poller can ask for an invoice's current record.
#[async_trait::async_trait]
pub trait InvoiceSource: Send + Sync {
    async fn fetch_invoice(&self, invoice_id: &str) -> Result<InvoiceRecord, ApiError>;
}

/// REST client for the invoice processing backend.
#[derive(Debug, Clone)]
pub struct InvoiceClient {
    base_url: Url,
    http: reqwest::Client,
}

impl InvoiceClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let base_url = Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(ApiError::new(
                FailureKind::InvalidUrl,
                format!("not an http(s) base url: {base_url}"),
            ));
        }

        let http = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::new(FailureKind::InvalidUrl, "base url cannot hold a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn get_invoice(&self, invoice_id: &str) -> Result<InvoiceRecord, ApiError> {
        let url = self.endpoint(["api", "invoices", invoice_id])?;
        self.send_json(self.http.get(url)).await
    }

    pub async fn list_invoices(&self) -> Result<InvoiceList, ApiError> {
        let url = self.endpoint(["api", "invoices"])?;
        self.send_json(self.http.get(url)).await
    }

    pub async fn upload_invoice(&self, file: UploadFile) -> Result<UploadReceipt, ApiError> {
        let url = self.endpoint(["api", "invoices", "upload"])?;
        let UploadFile {
            file_name,
            mime,
            bytes,
        } = file;
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime)
            .map_err(map_reqwest_error)?;
        let form = Form::new().part("file", part);
        self.send_json(self.http.post(url).multipart(form)).await
    }

    pub async fn delete_invoice(&self, invoice_id: &str) -> Result<String, ApiError> {
        let url = self.endpoint(["api", "invoices", invoice_id])?;
        let body: Value = self.send_json(self.http.delete(url)).await?;
        Ok(body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    pub async fn send_feedback(&self, kind: FeedbackKind, payload: &Value) -> Result<Value, ApiError> {
        let url = self.endpoint(kind.path().split('/'))?;
        self.send_json(self.http.post(url).json(payload)).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        invoice_debug!("{} -> {}", response.url(), status);
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let message = if detail.trim().is_empty() {
                status.to_string()
            } else {
                detail
            };
            return Err(ApiError::new(
                FailureKind::HttpStatus(status.as_u16()),
                message,
            ));
        }
        response.json::<T>().await.map_err(map_reqwest_error)
    }
}

#[async_trait::async_trait]
impl InvoiceSource for InvoiceClient {
    async fn fetch_invoice(&self, invoice_id: &str) -> Result<InvoiceRecord, ApiError> {
        self.get_invoice(invoice_id).await
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return ApiError::new(FailureKind::Decode, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
