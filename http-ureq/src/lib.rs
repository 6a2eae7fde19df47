#![cfg_attr(feature = "docs", feature(doc_cfg))]
#![deny(
    missing_debug_implementations,
    absolute_paths_not_starting_with_crate,
    anonymous_parameters,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    meta_variable_misuse,
    missing_docs,
    non_ascii_idents,
    trivial_numeric_casts,
    unsafe_code,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications
)]

//! # apivideo-ureq
//!
//! ## api.video Ureq HTTP 客户端实现
//!
//! 基于 Ureq 库提供 HTTP 客户端接口实现，仅提供阻塞接口的实现。

mod client;

pub use apivideo_http as http;
pub use client::Client;
pub use ureq;

#[cfg(test)]
mod tests {
    use super::*;
    use apivideo_http::{
        header::{CONTENT_TYPE, USER_AGENT},
        HttpCaller, Method, Multipart, Part, Request, ResponseErrorKind, StatusCode,
    };
    use bytes::Bytes;
    use futures::channel::oneshot::channel;
    use rand::{thread_rng, RngCore};
    use std::time::Duration;
    use tokio::task::spawn_blocking;
    use warp::{
        filters::{body::bytes, method::post},
        header::value as header_value,
        http::{header::HeaderValue, StatusCode as WarpStatusCode},
        path,
        reply::{with_status, Response},
        Filter,
    };

    macro_rules! starts_with_server {
        ($addr:ident, $routes:ident, $code:block) => {{
            let (tx, rx) = channel();
            let ($addr, server) = warp::serve($routes).bind_with_graceful_shutdown(([127, 0, 0, 1], 0), async move {
                rx.await.ok();
            });
            let handler = tokio::spawn(server);
            $code?;
            tx.send(()).ok();
            handler.await.ok();
        }};
    }

    const BUF_LEN: usize = 1 << 20;

    #[tokio::test]
    async fn test_multipart_upload() -> anyhow::Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let mut chunk = vec![0u8; BUF_LEN];
        thread_rng().fill_bytes(&mut chunk);
        let expected = chunk.to_owned();

        let routes = path!("videos" / "vi123" / "source")
            .and(post())
            .and(header_value(USER_AGENT.as_str()))
            .and(header_value(CONTENT_TYPE.as_str()))
            .and(bytes())
            .map(move |user_agent: HeaderValue, content_type: HeaderValue, req_body: Bytes| {
                assert!(user_agent.to_str().unwrap().starts_with("ApiVideoRust/"));
                assert!(user_agent.to_str().unwrap().ends_with("/apivideo-ureq"));
                assert!(content_type
                    .to_str()
                    .unwrap()
                    .starts_with("multipart/form-data; boundary="));
                assert!(req_body.len() > BUF_LEN);
                assert!(req_body
                    .windows(expected.len())
                    .any(|window| window == expected.as_slice()));
                Response::new(r#"{"videoId":"vi123"}"#.into())
            });
        starts_with_server!(addr, routes, {
            spawn_blocking(move || {
                let multipart = Multipart::new()
                    .add_part("chunkId", Part::text("1"))
                    .add_part("file", Part::bytes(chunk));
                let mut request = Request::builder()
                    .method(Method::POST)
                    .url(format!("http://{}/videos/vi123/source", addr).parse()?)
                    .header(CONTENT_TYPE, multipart.content_type().parse()?)
                    .body(multipart.into_request_body())
                    .timeout(Duration::from_secs(10))
                    .build();
                let response = Client::default().call(&mut request)?;
                assert_eq!(response.status_code(), StatusCode::OK);
                assert_eq!(response.body(), br#"{"videoId":"vi123"}"#);
                Ok::<_, anyhow::Error>(())
            })
            .await?
        });

        Ok(())
    }

    #[tokio::test]
    async fn test_status_code_is_returned_as_response() -> anyhow::Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let routes = path!("upload").and(post()).map(|| {
            with_status(
                r#"{"title":"invalid token"}"#,
                WarpStatusCode::BAD_REQUEST,
            )
        });
        starts_with_server!(addr, routes, {
            spawn_blocking(move || {
                let mut request = Request::builder()
                    .method(Method::POST)
                    .url(format!("http://{}/upload?token=to1", addr).parse()?)
                    .build();
                let response = Client::default().call(&mut request)?;
                assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
                assert_eq!(response.body(), br#"{"title":"invalid token"}"#);
                Ok::<_, anyhow::Error>(())
            })
            .await?
        });

        Ok(())
    }

    #[test]
    fn test_connect_error() -> anyhow::Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let mut request = Request::builder()
            .method(Method::POST)
            .url("http://127.0.0.1:1/upload".parse()?)
            .timeout(Duration::from_secs(5))
            .build();
        let err = Client::default().call(&mut request).unwrap_err();
        assert!(matches!(
            err.kind(),
            ResponseErrorKind::ConnectError | ResponseErrorKind::TimeoutError | ResponseErrorKind::SendError
        ));
        Ok(())
    }
}
