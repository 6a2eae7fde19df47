#![cfg_attr(feature = "docs", feature(doc_cfg))]
#![deny(
    missing_debug_implementations,
    large_assignments,
    exported_private_dependencies,
    absolute_paths_not_starting_with_crate,
    anonymous_parameters,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    meta_variable_misuse,
    missing_docs,
    non_ascii_idents,
    indirect_structural_match,
    trivial_numeric_casts,
    unsafe_code,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications
)]

//! # apivideo-sdk
//!
//! ## api.video 视频上传 SDK

#[cfg(feature = "http")]
pub use apivideo_http as http;

#[cfg(feature = "upload")]
pub use apivideo_upload_manager as upload;

#[cfg(feature = "ureq")]
pub use apivideo_ureq as ureq;

/// 将所有 Trait 全部重新导出，方便统一导入
pub mod prelude {
    #[cfg(feature = "http")]
    pub use apivideo_http::prelude::*;

    #[cfg(feature = "upload")]
    pub use apivideo_upload_manager::prelude::*;
}
