use super::super::{
    scheduler::{ProgressCallback, SerialUploadQueueBuilder},
    PartBody, PartHandle, PartUploadRequest, PartUploader, SerialUploadQueue, SessionState, UploadError,
    UploadProgress, UploadResult, UploadTarget, Video,
};
use assert_impl::assert_impl;
use futures::{
    executor::block_on,
    future::{BoxFuture, FutureExt},
};
use log::{debug, info, warn};
use std::{
    fmt,
    future::IntoFuture,
    mem::take,
    num::NonZeroUsize,
    sync::{Arc, Mutex, PoisonError},
};

/// 渐进式上传会话
///
/// 用于总大小事先未知的上传，调用者逐个提交分片，并通过 [`ProgressiveUploadSession::upload_last_part`]
/// 提交最后一个分片后关闭会话。
///
/// 分片序号从 1 开始依次分配，分配序号与提交到上传队列在同一把锁内完成，
/// 因此即使多个线程同时提交，序号顺序也与实际上传顺序一致。
///
/// 每个分片的结果可以通过返回的 [`PartHandle`] 获取，整个会话的结果则通过
/// [`ProgressiveUploadSession::finish`] 获取，无论多少个分片受到影响，会话只会报告一个错误。
pub struct ProgressiveUploadSession {
    queue: SerialUploadQueue,
    parts: Mutex<ProgressiveParts>,
}

#[derive(Debug)]
struct ProgressiveParts {
    next_index: NonZeroUsize,
    closed: bool,
    handles: Vec<PartHandle>,
}

impl ProgressiveUploadSession {
    /// 创建渐进式上传会话构建器
    #[inline]
    pub fn builder(uploader: impl PartUploader + 'static, target: UploadTarget) -> ProgressiveUploadSessionBuilder {
        ProgressiveUploadSessionBuilder::new(Arc::new(uploader), target)
    }

    /// 上传一个中间分片
    #[inline]
    pub fn upload_part(&self, body: impl Into<PartBody>) -> UploadResult<PartHandle> {
        self.submit(body.into(), false, None)
    }

    /// 上传一个中间分片，并设置分片级别的进度回调
    #[inline]
    pub fn upload_part_with_progress(
        &self,
        body: impl Into<PartBody>,
        on_part_progress: impl Fn(UploadProgress) + Send + Sync + 'static,
    ) -> UploadResult<PartHandle> {
        self.submit(body.into(), false, Some(Box::new(on_part_progress)))
    }

    /// 上传最后一个分片并关闭会话
    ///
    /// 之后的所有上传调用都将返回 [`UploadError::SessionClosed`]
    #[inline]
    pub fn upload_last_part(&self, body: impl Into<PartBody>) -> UploadResult<PartHandle> {
        self.submit(body.into(), true, None)
    }

    /// 上传最后一个分片并关闭会话，同时设置分片级别的进度回调
    #[inline]
    pub fn upload_last_part_with_progress(
        &self,
        body: impl Into<PartBody>,
        on_part_progress: impl Fn(UploadProgress) + Send + Sync + 'static,
    ) -> UploadResult<PartHandle> {
        self.submit(body.into(), true, Some(Box::new(on_part_progress)))
    }

    fn submit(
        &self,
        body: PartBody,
        is_last_part: bool,
        on_part_progress: Option<ProgressCallback>,
    ) -> UploadResult<PartHandle> {
        let mut parts = self.parts.lock().unwrap_or_else(PoisonError::into_inner);
        if parts.closed || self.queue.state().is_terminal() {
            return Err(UploadError::SessionClosed);
        }
        let part = PartUploadRequest::progressive(parts.next_index, is_last_part, body)?;
        parts.next_index = parts.next_index.saturating_add(1);
        if is_last_part {
            parts.closed = true;
            info!("progressive session is closed after {} parts", part.index());
        } else {
            debug!("progressive part {} ({} bytes) is accepted", part.index(), part.size());
        }
        let handle = match on_part_progress {
            Some(on_part_progress) => self.queue.submit_with_progress(part, on_part_progress),
            None => self.queue.submit(part),
        };
        parts.handles.push(handle.to_owned());
        Ok(handle)
    }

    /// 关闭会话并等待所有已经提交的分片结束
    ///
    /// 返回第一个出错分片的错误，否则返回最后一个分片响应的视频信息。
    /// 应当在提交最后一个分片后调用，否则返回的是已经提交的最后一个分片的结果
    pub async fn finish(self) -> UploadResult<Video> {
        let (closed, handles) = {
            let mut parts = self.parts.lock().unwrap_or_else(PoisonError::into_inner);
            let closed = parts.closed;
            parts.closed = true;
            (closed, take(&mut parts.handles))
        };
        if !closed {
            warn!("progressive session is finished before its last part is uploaded");
        }
        let mut last = None;
        for handle in handles {
            last = Some(handle.await?);
        }
        last.ok_or(UploadError::EmptyRequest)
    }

    /// 阻塞等待整个会话结束
    #[inline]
    pub fn wait(self) -> UploadResult<Video> {
        block_on(self.finish())
    }

    /// 是否已经提交了最后一个分片
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.parts.lock().unwrap_or_else(PoisonError::into_inner).closed
    }

    /// 当前的总上传进度，总字节数为已经提交的分片大小之和
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

    /// 所有已经提交的分片是否都已经结束
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.queue.is_finished()
    }

    /// 视频 ID，创建时已知或者从第一个分片的响应中获取
    #[inline]
    pub fn video_id(&self) -> Option<&str> {
        self.queue.video_id()
    }

    #[allow(dead_code)]
    fn ignore() {
        assert_impl!(Send: Self);
        assert_impl!(Sync: Self);
    }
}

impl IntoFuture for ProgressiveUploadSession {
    type Output = UploadResult<Video>;
    type IntoFuture = BoxFuture<'static, UploadResult<Video>>;

    #[inline]
    fn into_future(self) -> Self::IntoFuture {
        self.finish().boxed()
    }
}

impl fmt::Debug for ProgressiveUploadSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressiveUploadSession")
            .field("queue", &self.queue)
            .field("parts", &self.parts)
            .finish()
    }
}

/// 渐进式上传会话构建器
pub struct ProgressiveUploadSessionBuilder {
    uploader: Arc<dyn PartUploader>,
    target: UploadTarget,
    on_progress: Option<ProgressCallback>,
}

impl ProgressiveUploadSessionBuilder {
    pub(crate) fn new(uploader: Arc<dyn PartUploader>, target: UploadTarget) -> Self {
        Self {
            uploader,
            target,
            on_progress: None,
        }
    }

    /// 设置总进度回调
    #[inline]
    pub fn on_progress(&mut self, on_progress: impl Fn(UploadProgress) + Send + Sync + 'static) -> &mut Self {
        self.on_progress = Some(Box::new(on_progress));
        self
    }

    /// 创建渐进式上传会话
    pub fn build(&mut self) -> UploadResult<ProgressiveUploadSession> {
        let queue = SerialUploadQueueBuilder::new(self.uploader.to_owned(), self.target.to_owned())
            .on_progress_boxed(self.on_progress.take())
            .build()?;
        Ok(ProgressiveUploadSession {
            queue,
            parts: Mutex::new(ProgressiveParts {
                next_index: NonZeroUsize::MIN,
                closed: false,
                handles: Vec::new(),
            }),
        })
    }
}

impl fmt::Debug for ProgressiveUploadSessionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressiveUploadSessionBuilder")
            .field("uploader", &self.uploader)
            .field("target", &self.target)
            .finish()
    }
}
