use super::{
    super::{PartBody, PartUploadRequest, UploadEndpoint, UploaderConfig, Video},
    OnPartProgress, PartUploader,
};
use apivideo_http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderMap, HeaderName, HeaderValue, HttpCaller, Method, Multipart, Part, PartMetadata, Request, Response,
    ResponseError, ResponseErrorKind, TransferProgressInfo, Uri,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{debug, warn};
use std::{
    fmt,
    io::{Error as IoError, ErrorKind as IoErrorKind, Read, Result as IoResult},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use url::Url;

const ORIGIN_CLIENT: &str = concat!("rust:", env!("CARGO_PKG_VERSION"));

/// 基于 [`HttpCaller`] 的分片上传器
///
/// 每个分片以 Multipart 表单的形式发送，文件字段总是最后一个字段
#[derive(Clone)]
pub struct HttpPartUploader {
    http_caller: Arc<dyn HttpCaller>,
    config: UploaderConfig,
}

impl HttpPartUploader {
    /// 创建分片上传器
    #[inline]
    pub fn new(http_caller: impl HttpCaller + 'static, config: UploaderConfig) -> Self {
        Self::new_with_arc(Arc::new(http_caller), config)
    }

    #[inline]
    pub(crate) fn new_with_arc(http_caller: Arc<dyn HttpCaller>, config: UploaderConfig) -> Self {
        Self { http_caller, config }
    }

    #[inline]
    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }

    fn make_url(&self, endpoint: UploadEndpoint<'_>) -> Result<Uri, ResponseError> {
        let mut url = Url::parse(self.config.base_path())
            .map_err(|err| ResponseError::new_with_msg(ResponseErrorKind::InvalidUrl, err))?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                ResponseError::new_with_msg(
                    ResponseErrorKind::InvalidUrl,
                    format!("{} cannot be a base url", self.config.base_path()),
                )
            })?;
            segments.pop_if_empty();
            match endpoint {
                UploadEndpoint::VideoSource { video_id } => {
                    segments.extend(["videos", video_id, "source"]);
                }
                UploadEndpoint::UploadToken { .. } => {
                    segments.push("upload");
                }
            }
        }
        if let UploadEndpoint::UploadToken { token } = endpoint {
            url.query_pairs_mut().append_pair("token", token);
        }
        url.as_str()
            .parse()
            .map_err(|err| ResponseError::new_with_msg(ResponseErrorKind::InvalidUrl, err))
    }

    fn make_headers(&self, content_type: &str) -> Result<HeaderMap, ResponseError> {
        let mut headers = HeaderMap::with_capacity(6);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, header_value(content_type)?);
        headers.insert(
            HeaderName::from_static("av-origin-client"),
            HeaderValue::from_static(ORIGIN_CLIENT),
        );
        if let Some(sdk) = self.config.sdk() {
            headers.insert(HeaderName::from_static("av-origin-sdk"), header_value(&sdk.to_string())?);
        }
        if let Some(application) = self.config.application() {
            headers.insert(
                HeaderName::from_static("av-origin-app"),
                header_value(&application.to_string())?,
            );
        }
        if let Some(api_key) = self.config.api_key() {
            let mut authorization = header_value(&format!("Basic {}", STANDARD.encode(format!("{}:", api_key))))?;
            authorization.set_sensitive(true);
            headers.insert(AUTHORIZATION, authorization);
        }
        Ok(headers)
    }
}

impl PartUploader for HttpPartUploader {
    fn upload_part(
        &self,
        endpoint: UploadEndpoint<'_>,
        part: &mut PartUploadRequest,
        on_progress: &OnPartProgress<'_>,
    ) -> Result<Video, ResponseError> {
        let url = self.make_url(endpoint)?;
        let fields = part.form_fields();
        let file_name = part.file_name();
        let size = part.size();
        let index = part.index();
        let cancelled = AtomicBool::new(false);

        let body = part.body_mut();
        body.reset();
        let mut multipart = Multipart::new();
        for (name, value) in fields {
            multipart = multipart.add_part(name, Part::text(value));
        }
        let multipart = multipart.add_part(
            "file",
            Part::stream(
                ProgressReader {
                    inner: body,
                    transferred: 0,
                    total: size,
                    on_progress,
                    cancelled: &cancelled,
                },
                size,
            )
            .metadata(
                PartMetadata::default()
                    .mime(mime::APPLICATION_OCTET_STREAM)
                    .file_name(file_name),
            ),
        );

        let mut request = Request::builder()
            .method(Method::POST)
            .url(url)
            .headers(self.make_headers(&multipart.content_type())?)
            .body(multipart.into_request_body())
            .timeout(self.config.timeout())
            .build();
        debug!("upload part {} ({} bytes) to {}", index, size, request.url());
        let result = self.http_caller.call(&mut request);
        drop(request);

        match result {
            Err(_) if cancelled.load(Ordering::Acquire) => Err(ResponseError::new_with_msg(
                ResponseErrorKind::UserCanceled,
                format!("upload of part {} is cancelled", index),
            )),
            Err(err) => {
                warn!("failed to upload part {}: {}", index, err);
                Err(err)
            }
            Ok(response) => parse_response(response),
        }
    }
}

impl fmt::Debug for HttpPartUploader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpPartUploader")
            .field("http_caller", &self.http_caller)
            .field("config", &self.config)
            .finish()
    }
}

fn header_value(value: &str) -> Result<HeaderValue, ResponseError> {
    HeaderValue::from_str(value).map_err(|err| {
        ResponseError::new_with_msg(
            ResponseErrorKind::InvalidHeader,
            format!("invalid header value({}): {}", value, err),
        )
    })
}

fn parse_response(response: Response) -> Result<Video, ResponseError> {
    let status_code = response.status_code();
    if !status_code.is_success() {
        return Err(ResponseError::new_with_msg(
            ResponseErrorKind::StatusCodeError(status_code),
            String::from_utf8_lossy(response.body()),
        ));
    }
    serde_json::from_slice(response.body())
        .map_err(|err| ResponseError::new(ResponseErrorKind::InvalidRequestResponse, err))
}

struct ProgressReader<'a, 'c> {
    inner: &'a mut PartBody,
    transferred: u64,
    total: u64,
    on_progress: &'a OnPartProgress<'c>,
    cancelled: &'a AtomicBool,
}

impl Read for ProgressReader<'_, '_> {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.transferred += n as u64;
            let info = TransferProgressInfo::new(self.transferred, self.total, &buf[..n]);
            if (self.on_progress)(&info).is_cancelled() {
                self.cancelled.store(true, Ordering::Release);
                return Err(IoError::new(IoErrorKind::Other, "part upload is cancelled"));
            }
        }
        Ok(n)
    }
}
