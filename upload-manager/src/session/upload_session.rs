use super::super::{
    scheduler::{ProgressCallback, SerialUploadQueueBuilder},
    ChunkSize, ChunkSplitter, PartHandle, PartUploadRequest, PartUploader, SerialUploadQueue, SessionState,
    UploadError, UploadProgress, UploadResult, UploadTarget, Video,
};
use assert_impl::assert_impl;
use futures::{
    executor::block_on,
    future::{BoxFuture, FutureExt},
};
use log::info;
use std::{fmt, future::IntoFuture, path::Path, sync::Arc};

/// 大小已知的分片上传会话
///
/// 创建时即将整个文件切分为分片，并按照序号顺序全部提交到一个 [`SerialUploadQueue`]。
/// 会话结果为第一个失败分片的错误，或者最后一个分片响应的 [`Video`]。
pub struct UploadSession {
    queue: SerialUploadQueue,
    handles: Vec<PartHandle>,
}

impl UploadSession {
    /// 创建上传会话构建器
    #[inline]
    pub fn builder(uploader: impl PartUploader + 'static, target: UploadTarget) -> UploadSessionBuilder {
        UploadSessionBuilder::new(Arc::new(uploader), target)
    }

    /// 分片数量
    #[inline]
    pub fn part_count(&self) -> usize {
        self.handles.len()
    }

    /// 当前的总上传进度
    #[inline]
    pub fn progress(&self) -> UploadProgress {
        self.queue.progress()
    }

    /// 取消上传
    #[inline]
    pub fn cancel(&self) {
        self.queue.cancel()
    }

    /// 当前的会话状态
    #[inline]
    pub fn state(&self) -> SessionState {
        self.queue.state()
    }

    /// 所有分片是否都已经结束
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.queue.is_finished()
    }

    #[inline]
    pub fn video_id(&self) -> Option<&str> {
        self.queue.video_id()
    }

    /// 等待所有分片结束
    ///
    /// 返回第一个出错分片的错误，否则返回最后一个分片响应的视频信息
    pub async fn finish(self) -> UploadResult<Video> {
        let Self { queue, handles } = self;
        let mut last = None;
        for handle in handles {
            last = Some(handle.await?);
        }
        let video = last.ok_or(UploadError::EmptyRequest)?;
        info!(
            "upload of video {} is finished, {} bytes uploaded",
            video.video_id,
            queue.progress().completed_bytes()
        );
        Ok(video)
    }

    /// 阻塞等待所有分片结束
    #[inline]
    pub fn wait(self) -> UploadResult<Video> {
        block_on(self.finish())
    }

    #[allow(dead_code)]
    fn ignore() {
        assert_impl!(Send: Self);
        assert_impl!(Sync: Self);
    }
}

impl IntoFuture for UploadSession {
    type Output = UploadResult<Video>;
    type IntoFuture = BoxFuture<'static, UploadResult<Video>>;

    #[inline]
    fn into_future(self) -> Self::IntoFuture {
        self.finish().boxed()
    }
}

impl fmt::Debug for UploadSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadSession")
            .field("queue", &self.queue)
            .field("part_count", &self.handles.len())
            .finish()
    }
}

/// 大小已知的分片上传会话构建器
pub struct UploadSessionBuilder {
    uploader: Arc<dyn PartUploader>,
    target: UploadTarget,
    chunk_size: ChunkSize,
    on_progress: Option<ProgressCallback>,
}

impl UploadSessionBuilder {
    pub(crate) fn new(uploader: Arc<dyn PartUploader>, target: UploadTarget) -> Self {
        Self {
            uploader,
            target,
            chunk_size: Default::default(),
            on_progress: None,
        }
    }

    /// 设置分片大小，仅对 [`UploadSessionBuilder::start`] 有效
    #[inline]
    pub fn chunk_size(&mut self, chunk_size: ChunkSize) -> &mut Self {
        self.chunk_size = chunk_size;
        self
    }

    /// 设置总进度回调
    #[inline]
    pub fn on_progress(&mut self, on_progress: impl Fn(UploadProgress) + Send + Sync + 'static) -> &mut Self {
        self.on_progress = Some(Box::new(on_progress));
        self
    }

    /// 切分文件并开始上传
    pub fn start(&mut self, path: impl AsRef<Path>) -> UploadResult<UploadSession> {
        let splitter = ChunkSplitter::open(path, self.chunk_size)?;
        self.start_with_splitter(splitter)
    }

    /// 使用指定的分片切分器开始上传
    pub fn start_with_splitter(&mut self, splitter: ChunkSplitter) -> UploadResult<UploadSession> {
        let parts = splitter
            .chunks()
            .map(|chunk| PartUploadRequest::sized(chunk.index(), chunk.total(), chunk.into_body()))
            .collect::<UploadResult<Vec<_>>>()?;
        if parts.is_empty() {
            return Err(UploadError::EmptyRequest);
        }
        let queue = SerialUploadQueueBuilder::new(self.uploader.to_owned(), self.target.to_owned())
            .total_bytes(splitter.size())
            .on_progress_boxed(self.on_progress.take())
            .build()?;
        info!(
            "start uploading {} bytes in {} parts to {:?}",
            splitter.size(),
            parts.len(),
            self.target.endpoint()
        );
        let handles = parts.into_iter().map(|part| queue.submit(part)).collect();
        Ok(UploadSession { queue, handles })
    }
}

impl fmt::Debug for UploadSessionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadSessionBuilder")
            .field("uploader", &self.uploader)
            .field("target", &self.target)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}
