use super::{ChunkSize, UploadError, UploadResult};
use assert_impl::assert_impl;
use once_cell::sync::Lazy;
use regex::Regex;
use std::{fmt, mem::take, time::Duration};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// api.video 环境
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    /// 生产环境
    #[default]
    Production,

    /// 沙盒环境
    Sandbox,
}

impl Environment {
    /// 环境对应的服务地址
    #[inline]
    pub fn base_path(self) -> &'static str {
        match self {
            Self::Production => "https://ws.api.video",
            Self::Sandbox => "https://sandbox.api.video",
        }
    }
}

/// 请求来源
///
/// 用于 `AV-Origin-Sdk` 与 `AV-Origin-App` 请求头，格式为 `name:version`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    name: String,
    version: String,
}

impl Origin {
    /// 创建请求来源
    ///
    /// 名称只能由字母、数字、下划线与连字符组成，版本号格式为 `x`、`x.y` 或 `x.y.z`
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> UploadResult<Self> {
        static NAME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w\-]{1,50}$").unwrap());
        static VERSION_REGEX: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^\d{1,3}(\.\d{1,3}(\.\d{1,3})?)?$").unwrap());

        let name = name.into();
        let version = version.into();
        if !NAME_REGEX.is_match(&name) {
            return Err(UploadError::InvalidName(name));
        }
        if !VERSION_REGEX.is_match(&version) {
            return Err(UploadError::InvalidVersion(version));
        }
        Ok(Self { name, version })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn version(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for Origin {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

/// 上传配置
#[derive(Clone)]
pub struct UploaderConfig {
    api_key: Option<String>,
    base_path: String,
    chunk_size: ChunkSize,
    timeout: Duration,
    sdk: Option<Origin>,
    application: Option<Origin>,
}

impl Default for UploaderConfig {
    #[inline]
    fn default() -> Self {
        Self {
            api_key: None,
            base_path: Environment::default().base_path().to_owned(),
            chunk_size: Default::default(),
            timeout: DEFAULT_TIMEOUT,
            sdk: None,
            application: None,
        }
    }
}

impl UploaderConfig {
    /// 创建上传配置构建器
    #[inline]
    pub fn builder() -> UploaderConfigBuilder {
        Default::default()
    }

    /// API Key，未设置时不发送认证信息，适用于上传凭证
    #[inline]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// 服务地址，不含结尾的 `/`
    #[inline]
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    #[inline]
    pub fn chunk_size(&self) -> ChunkSize {
        self.chunk_size
    }

    /// 单个分片请求的超时时长
    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    #[inline]
    pub fn sdk(&self) -> Option<&Origin> {
        self.sdk.as_ref()
    }

    #[inline]
    pub fn application(&self) -> Option<&Origin> {
        self.application.as_ref()
    }

    #[allow(dead_code)]
    fn ignore() {
        assert_impl!(Send: Self);
        assert_impl!(Sync: Self);
    }
}

impl fmt::Debug for UploaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploaderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "******"))
            .field("base_path", &self.base_path)
            .field("chunk_size", &self.chunk_size)
            .field("timeout", &self.timeout)
            .field("sdk", &self.sdk)
            .field("application", &self.application)
            .finish()
    }
}

/// 上传配置构建器
#[derive(Debug, Default)]
pub struct UploaderConfigBuilder {
    inner: UploaderConfig,
}

impl UploaderConfigBuilder {
    /// 设置 API Key
    #[inline]
    pub fn api_key(&mut self, api_key: impl Into<String>) -> &mut Self {
        self.inner.api_key = Some(api_key.into());
        self
    }

    /// 设置 api.video 环境
    #[inline]
    pub fn environment(&mut self, environment: Environment) -> &mut Self {
        self.base_path(environment.base_path())
    }

    /// 设置自定义服务地址
    #[inline]
    pub fn base_path(&mut self, base_path: impl Into<String>) -> &mut Self {
        let mut base_path = base_path.into();
        while base_path.ends_with('/') {
            base_path.pop();
        }
        self.inner.base_path = base_path;
        self
    }

    /// 设置分片大小
    ///
    /// 超出允许范围则返回 [`UploadError::InvalidChunkSize`]，配置保持不变
    #[inline]
    pub fn chunk_size(&mut self, chunk_size: u64) -> UploadResult<&mut Self> {
        self.inner.chunk_size = ChunkSize::new(chunk_size)?;
        Ok(self)
    }

    /// 设置单个分片请求的超时时长
    #[inline]
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.inner.timeout = timeout;
        self
    }

    /// 设置 SDK 名称与版本号，用于 `AV-Origin-Sdk` 请求头
    #[inline]
    pub fn sdk_name(&mut self, name: impl Into<String>, version: impl Into<String>) -> UploadResult<&mut Self> {
        self.inner.sdk = Some(Origin::new(name, version)?);
        Ok(self)
    }

    /// 设置应用名称与版本号，用于 `AV-Origin-App` 请求头
    #[inline]
    pub fn application_name(
        &mut self,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> UploadResult<&mut Self> {
        self.inner.application = Some(Origin::new(name, version)?);
        Ok(self)
    }

    /// 构建上传配置，同时构建器被重置
    #[inline]
    pub fn build(&mut self) -> UploaderConfig {
        take(&mut self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{super::MIN_CHUNK_SIZE, *};
    use anyhow::Result;

    #[test]
    fn test_build_config() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let config = UploaderConfig::builder()
            .api_key("my-api-key")
            .environment(Environment::Sandbox)
            .chunk_size(MIN_CHUNK_SIZE)?
            .timeout(Duration::from_secs(5))
            .application_name("my-app", "1.2.3")?
            .build();
        assert_eq!(config.api_key(), Some("my-api-key"));
        assert_eq!(config.base_path(), "https://sandbox.api.video");
        assert_eq!(config.chunk_size().as_u64(), MIN_CHUNK_SIZE);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.application().map(ToString::to_string).as_deref(), Some("my-app:1.2.3"));
        assert!(config.sdk().is_none());
        assert!(!format!("{:?}", config).contains("my-api-key"));

        let config = UploaderConfig::builder().base_path("http://localhost:8080/").build();
        assert_eq!(config.base_path(), "http://localhost:8080");
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(config.chunk_size(), ChunkSize::default());
        Ok(())
    }

    #[test]
    fn test_invalid_chunk_size_keeps_config() {
        env_logger::builder().is_test(true).try_init().ok();

        let mut builder = UploaderConfig::builder();
        assert!(matches!(
            builder.chunk_size(1024),
            Err(UploadError::InvalidChunkSize { size: 1024, .. })
        ));
        assert_eq!(builder.build().chunk_size(), ChunkSize::default());
    }

    #[test]
    fn test_origin_validation() {
        env_logger::builder().is_test(true).try_init().ok();

        assert!(Origin::new("my_sdk-1", "1").is_ok());
        assert!(Origin::new("my_sdk-1", "12.0").is_ok());
        assert!(Origin::new("my_sdk-1", "1.22.333").is_ok());

        assert!(matches!(Origin::new("", "1.0.0"), Err(UploadError::InvalidName(_))));
        assert!(matches!(Origin::new("my sdk", "1.0.0"), Err(UploadError::InvalidName(_))));
        assert!(matches!(Origin::new("a".repeat(51), "1.0.0"), Err(UploadError::InvalidName(_))));

        assert!(matches!(Origin::new("my-sdk", "1.0.0.0"), Err(UploadError::InvalidVersion(_))));
        assert!(matches!(Origin::new("my-sdk", "1234"), Err(UploadError::InvalidVersion(_))));
        assert!(matches!(Origin::new("my-sdk", "v1"), Err(UploadError::InvalidVersion(_))));
        assert!(matches!(Origin::new("my-sdk", ""), Err(UploadError::InvalidVersion(_))));
    }
}
