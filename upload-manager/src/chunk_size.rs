use super::{UploadError, UploadResult};
use std::{fmt, num::NonZeroU64, ops::Deref};

/// 最小分片大小，5 MiB
pub const MIN_CHUNK_SIZE: u64 = 5 * 1024 * 1024;

/// 最大分片大小，128 MiB
pub const MAX_CHUNK_SIZE: u64 = 128 * 1024 * 1024;

/// 默认分片大小，50 MiB
pub const DEFAULT_CHUNK_SIZE: u64 = 50 * 1024 * 1024;

/// 分片大小
///
/// 总是处于 [`MIN_CHUNK_SIZE`] 与 [`MAX_CHUNK_SIZE`] 之间
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkSize(NonZeroU64);

impl ChunkSize {
    /// 创建分片大小
    ///
    /// 超出允许范围则返回 [`UploadError::InvalidChunkSize`]
    pub fn new(size: u64) -> UploadResult<Self> {
        match NonZeroU64::new(size) {
            Some(size) if (MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&size.get()) => Ok(Self(size)),
            _ => Err(UploadError::InvalidChunkSize {
                size,
                min: MIN_CHUNK_SIZE,
                max: MAX_CHUNK_SIZE,
            }),
        }
    }

    #[inline]
    pub fn as_non_zero_u64(&self) -> NonZeroU64 {
        self.0
    }

    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.as_non_zero_u64().get()
    }

    #[cfg(test)]
    pub(crate) fn new_unchecked_for_test(size: u64) -> Self {
        Self(NonZeroU64::new(size).expect("chunk size must not be zero"))
    }
}

impl Default for ChunkSize {
    #[inline]
    fn default() -> Self {
        match NonZeroU64::new(DEFAULT_CHUNK_SIZE) {
            Some(size) => Self(size),
            None => unreachable!("default chunk size is not zero"),
        }
    }
}

impl TryFrom<u64> for ChunkSize {
    type Error = UploadError;

    #[inline]
    fn try_from(size: u64) -> UploadResult<Self> {
        Self::new(size)
    }
}

impl From<ChunkSize> for u64 {
    #[inline]
    fn from(size: ChunkSize) -> Self {
        size.as_u64()
    }
}

impl Deref for ChunkSize {
    type Target = NonZeroU64;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for ChunkSize {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
