use smart_default::SmartDefault;

/// 上传进度信息
#[derive(Debug, Clone, Copy)]
pub struct TransferProgressInfo<'b> {
    transferred_bytes: u64,
    total_bytes: u64,
    body: &'b [u8],
}

impl<'b> TransferProgressInfo<'b> {
    /// 创建上传进度信息
    #[inline]
    pub fn new(transferred_bytes: u64, total_bytes: u64, body: &'b [u8]) -> Self {
        Self {
            transferred_bytes,
            total_bytes,
            body,
        }
    }

    /// 获取已经传输的字节数
    #[inline]
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes
    }

    /// 获取总字节数
    #[inline]
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    /// 获取本次传输的数据
    #[inline]
    pub fn body(&self) -> &[u8] {
        self.body
    }
}

/// 回调函数的返回值
///
/// 回调函数通过返回 [`CallbackResult::Cancel`] 请求中止当前的 HTTP 请求
#[must_use]
#[derive(SmartDefault, Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub enum CallbackResult {
    /// 继续
    #[default]
    Continue,

    /// 取消
    Cancel,
}

impl CallbackResult {
    /// 是否继续
    #[inline]
    pub fn is_continue(self) -> bool {
        self == Self::Continue
    }

    /// 是否取消
    #[inline]
    pub fn is_cancelled(self) -> bool {
        self == Self::Cancel
    }
}
