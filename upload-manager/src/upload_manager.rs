use super::{
    HttpPartUploader, PartUploader, ProgressiveUploadSession, ProgressiveUploadSessionBuilder, UploadResult,
    UploadSessionBuilder, UploadTarget, UploaderConfig, Video,
};
use apivideo_http::HttpCaller;
use assert_impl::assert_impl;
use std::{path::Path, sync::Arc};

/// 上传管理器
///
/// 持有上传配置与分片上传器，用于创建上传会话。可以被廉价地克隆，克隆后的实例共享同一个分片上传器。
#[derive(Debug, Clone)]
pub struct UploadManager(Arc<UploadManagerInner>);

#[derive(Debug)]
struct UploadManagerInner {
    uploader: Arc<dyn PartUploader>,
    config: UploaderConfig,
}

impl UploadManager {
    /// 创建上传管理器构建器
    #[inline]
    pub fn builder(http_caller: impl HttpCaller + 'static) -> UploadManagerBuilder {
        UploadManagerBuilder {
            http_caller: Arc::new(http_caller),
            config: Default::default(),
        }
    }

    /// 使用自定义的分片上传器创建上传管理器
    #[inline]
    pub fn with_part_uploader(uploader: impl PartUploader + 'static, config: UploaderConfig) -> Self {
        Self(Arc::new(UploadManagerInner {
            uploader: Arc::new(uploader),
            config,
        }))
    }

    #[inline]
    pub fn config(&self) -> &UploaderConfig {
        &self.0.config
    }

    /// 阻塞上传整个文件
    ///
    /// 文件按照配置的分片大小切分后依次上传，返回最后一个分片响应的视频信息
    pub fn upload_file(&self, target: UploadTarget, path: impl AsRef<Path>) -> UploadResult<Video> {
        self.upload_session(target).start(path)?.wait()
    }

    /// 异步上传整个文件
    pub async fn async_upload_file(&self, target: UploadTarget, path: impl AsRef<Path>) -> UploadResult<Video> {
        self.upload_session(target).start(path)?.finish().await
    }

    /// 创建大小已知的上传会话构建器
    #[inline]
    pub fn upload_session(&self, target: UploadTarget) -> UploadSessionBuilder {
        let mut builder = UploadSessionBuilder::new(self.0.uploader.to_owned(), target);
        builder.chunk_size(self.0.config.chunk_size());
        builder
    }

    /// 创建渐进式上传会话
    #[inline]
    pub fn progressive_session(&self, target: UploadTarget) -> UploadResult<ProgressiveUploadSession> {
        self.progressive_session_builder(target).build()
    }

    /// 创建渐进式上传会话构建器
    #[inline]
    pub fn progressive_session_builder(&self, target: UploadTarget) -> ProgressiveUploadSessionBuilder {
        ProgressiveUploadSessionBuilder::new(self.0.uploader.to_owned(), target)
    }

    #[allow(dead_code)]
    fn ignore() {
        assert_impl!(Send: Self);
        assert_impl!(Sync: Self);
    }
}

#[cfg(feature = "ureq")]
impl Default for UploadManager {
    #[inline]
    fn default() -> Self {
        Self::builder(apivideo_ureq::Client::default()).build()
    }
}

/// 上传管理器构建器
#[derive(Debug)]
pub struct UploadManagerBuilder {
    http_caller: Arc<dyn HttpCaller>,
    config: UploaderConfig,
}

impl UploadManagerBuilder {
    /// 设置上传配置
    #[inline]
    pub fn config(&mut self, config: UploaderConfig) -> &mut Self {
        self.config = config;
        self
    }

    /// 构建上传管理器
    #[inline]
    pub fn build(&mut self) -> UploadManager {
        let config = self.config.to_owned();
        let uploader = HttpPartUploader::new_with_arc(self.http_caller.to_owned(), config.to_owned());
        UploadManager::with_part_uploader(uploader, config)
    }
}
