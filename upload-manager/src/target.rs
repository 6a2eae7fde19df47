/// 上传目标
///
/// 上传到一个已经创建好的视频，或者通过上传凭证上传。
/// 通过上传凭证上传且未指定视频 ID 时，视频 ID 将从第一个分片的响应中获取。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UploadTarget {
    /// 已经存在的视频 ID
    VideoId(String),

    /// 上传凭证
    UploadToken {
        /// 上传凭证
        token: String,
        /// 已知的视频 ID
        video_id: Option<String>,
    },
}

impl UploadTarget {
    /// 上传到已经存在的视频
    #[inline]
    pub fn video_id(video_id: impl Into<String>) -> Self {
        Self::VideoId(video_id.into())
    }

    /// 通过上传凭证上传，视频 ID 从响应中获取
    #[inline]
    pub fn upload_token(token: impl Into<String>) -> Self {
        Self::UploadToken {
            token: token.into(),
            video_id: None,
        }
    }

    /// 通过上传凭证上传到已知的视频
    #[inline]
    pub fn upload_token_with_video_id(token: impl Into<String>, video_id: impl Into<String>) -> Self {
        Self::UploadToken {
            token: token.into(),
            video_id: Some(video_id.into()),
        }
    }

    /// 创建目标时已知的视频 ID
    #[inline]
    pub fn known_video_id(&self) -> Option<&str> {
        match self {
            Self::VideoId(video_id) => Some(video_id),
            Self::UploadToken { video_id, .. } => video_id.as_deref(),
        }
    }

    /// 是否通过上传凭证上传
    #[inline]
    pub fn is_upload_token(&self) -> bool {
        matches!(self, Self::UploadToken { .. })
    }

    /// 上传端点
    #[inline]
    pub fn endpoint(&self) -> UploadEndpoint<'_> {
        match self {
            Self::VideoId(video_id) => UploadEndpoint::VideoSource { video_id },
            Self::UploadToken { token, .. } => UploadEndpoint::UploadToken { token },
        }
    }
}

/// 分片上传端点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadEndpoint<'a> {
    /// `POST /videos/{videoId}/source`
    VideoSource {
        /// 视频 ID
        video_id: &'a str,
    },

    /// `POST /upload?token={token}`
    UploadToken {
        /// 上传凭证
        token: &'a str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_target() {
        let target = UploadTarget::video_id("vi123");
        assert_eq!(target.known_video_id(), Some("vi123"));
        assert!(!target.is_upload_token());
        assert_eq!(target.endpoint(), UploadEndpoint::VideoSource { video_id: "vi123" });

        let target = UploadTarget::upload_token("to1");
        assert_eq!(target.known_video_id(), None);
        assert_eq!(target.endpoint(), UploadEndpoint::UploadToken { token: "to1" });

        let target = UploadTarget::upload_token_with_video_id("to1", "vi123");
        assert_eq!(target.known_video_id(), Some("vi123"));
        assert!(target.is_upload_token());
    }
}
