use anyhow::Error as AnyError;
use apivideo_http::{
    header::{CONTENT_LENGTH, USER_AGENT},
    HeaderName, HeaderValue, HttpCaller, Request, Response, ResponseError, ResponseErrorKind, ResponseResult,
    StatusCode,
};
use std::{
    error::Error as StdError,
    fmt::Display,
    io::{Error as IoError, ErrorKind as IoErrorKind, Read},
};
use ureq::{
    Agent, Error as UreqError, ErrorKind as UreqErrorKind, Request as UreqRequest, Response as UreqResponse,
    Transport,
};

/// Ureq 客户端
#[derive(Debug, Clone)]
pub struct Client {
    client: Agent,
}

impl Client {
    /// 创建 Ureq 客户端
    #[inline]
    pub fn new(client: Agent) -> Self {
        Self { client }
    }
}

impl From<Agent> for Client {
    #[inline]
    fn from(agent: Agent) -> Self {
        Self::new(agent)
    }
}

impl Default for Client {
    #[inline]
    fn default() -> Self {
        Self { client: ureq::agent() }
    }
}

impl HttpCaller for Client {
    fn call(&self, request: &mut Request<'_>) -> ResponseResult {
        let ureq_request = make_ureq_request(&self.client, request)?;
        match ureq_request.send(request.body_mut()) {
            Ok(response) => make_response(response),
            Err(UreqError::Status(_, response)) => make_response(response),
            Err(UreqError::Transport(transport)) => Err(from_ureq_transport(transport)),
        }
    }
}

fn make_user_agent(request: &Request<'_>) -> Result<HeaderValue, ResponseError> {
    let user_agent = format!("{}/apivideo-ureq", request.user_agent());
    HeaderValue::from_str(&user_agent).map_err(|err| build_header_value_error(&user_agent, &err))
}

fn make_ureq_request(agent: &Agent, request: &Request<'_>) -> Result<UreqRequest, ResponseError> {
    let mut request_builder = agent.request(request.method().as_str(), &request.url().to_string());
    for (header_name, header_value) in request.headers() {
        request_builder = set_header_for_request_builder(request_builder, header_name, header_value)?;
    }
    request_builder = set_header_for_request_builder(request_builder, &USER_AGENT, &make_user_agent(request)?)?;
    request_builder = request_builder.set(CONTENT_LENGTH.as_str(), &request.body().size().to_string());
    if let Some(timeout) = request.timeout() {
        request_builder = request_builder.timeout(timeout);
    }
    Ok(request_builder)
}

fn make_response(response: UreqResponse) -> ResponseResult {
    let mut response_builder = Response::builder();
    response_builder.status_code(status_code_of_response(&response)?);
    for header_name_str in response.headers_names().into_iter() {
        if let Some(header_value_str) = response.header(&header_name_str) {
            let header_name = HeaderName::from_bytes(header_name_str.as_bytes())
                .map_err(|err| build_header_name_error(&header_name_str, &err))?;
            let header_value = HeaderValue::from_bytes(header_value_str.as_bytes())
                .map_err(|err| build_header_value_error(header_value_str, &err))?;
            response_builder.header(header_name, header_value);
        }
    }
    let mut body = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut body)
        .map_err(|err| ResponseError::new(ResponseErrorKind::ReceiveError, err))?;
    response_builder.body(body);
    Ok(response_builder.build())
}

fn build_status_code_error(code: u16, err: &dyn Display) -> ResponseError {
    ResponseError::new_with_msg(
        ResponseErrorKind::InvalidRequestResponse,
        format!("invalid status code({}): {}", code, err),
    )
}

fn build_header_name_error(header_name: &str, err: &dyn Display) -> ResponseError {
    ResponseError::new_with_msg(
        ResponseErrorKind::InvalidHeader,
        format!("invalid header name({}): {}", header_name, err),
    )
}

fn build_header_value_error(header_value: &str, err: &dyn Display) -> ResponseError {
    ResponseError::new_with_msg(
        ResponseErrorKind::InvalidHeader,
        format!("invalid header value({}): {}", header_value, err),
    )
}

fn convert_header_value_error(header_value: &HeaderValue, err: &dyn Display) -> ResponseError {
    ResponseError::new_with_msg(
        ResponseErrorKind::InvalidHeader,
        format!("invalid header value({:?}): {}", header_value, err),
    )
}

fn set_header_for_request_builder(
    request_builder: UreqRequest,
    header_name: &HeaderName,
    header_value: &HeaderValue,
) -> Result<UreqRequest, ResponseError> {
    Ok(request_builder.set(
        header_name.as_str(),
        header_value
            .to_str()
            .map_err(|err| convert_header_value_error(header_value, &err))?,
    ))
}

fn status_code_of_response(response: &UreqResponse) -> Result<StatusCode, ResponseError> {
    StatusCode::from_u16(response.status()).map_err(|err| build_status_code_error(response.status(), &err))
}

fn from_ureq_transport(transport: Transport) -> ResponseError {
    let response_error_kind = match transport.kind() {
        UreqErrorKind::InvalidUrl => ResponseErrorKind::InvalidUrl,
        UreqErrorKind::UnknownScheme => ResponseErrorKind::InvalidUrl,
        UreqErrorKind::Dns => ResponseErrorKind::DnsServerError,
        UreqErrorKind::ConnectionFailed => ResponseErrorKind::ConnectError,
        UreqErrorKind::TooManyRedirects => ResponseErrorKind::TooManyRedirect,
        UreqErrorKind::BadStatus => ResponseErrorKind::InvalidRequestResponse,
        UreqErrorKind::BadHeader => ResponseErrorKind::InvalidHeader,
        UreqErrorKind::Io if is_timed_out(&transport) => ResponseErrorKind::TimeoutError,
        UreqErrorKind::Io => ResponseErrorKind::SendError,
        UreqErrorKind::InvalidProxyUrl => ResponseErrorKind::ProxyError,
        UreqErrorKind::ProxyConnect => ResponseErrorKind::ProxyError,
        UreqErrorKind::ProxyUnauthorized => ResponseErrorKind::ProxyError,
        UreqErrorKind::HTTP => ResponseErrorKind::InvalidRequestResponse,
        UreqErrorKind::InsecureRequestHttpsOnly => ResponseErrorKind::SslError,
        #[allow(unreachable_patterns)]
        _ => ResponseErrorKind::UnknownError,
    };
    ResponseError::new(response_error_kind, AnyError::new(transport))
}

fn is_timed_out(transport: &Transport) -> bool {
    let mut source = transport.source();
    while let Some(err) = source {
        if let Some(io_err) = err.downcast_ref::<IoError>() {
            if matches!(io_err.kind(), IoErrorKind::TimedOut | IoErrorKind::WouldBlock) {
                return true;
            }
        }
        source = err.source();
    }
    false
}
