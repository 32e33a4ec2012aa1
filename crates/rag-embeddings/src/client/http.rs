use std::error::Error as _;
use std::io;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::client::{EmbeddingError, EmbeddingResult, TransportError};

/// 从服务商错误响应体中提取错误信息
pub(crate) type ErrorMessageFn = fn(&str) -> Option<String>;

/// 发送一次带 Bearer 认证的 JSON POST，不做任何重试
pub(crate) async fn post_json<B, R>(
    session: &Client,
    url: &str,
    credential: &str,
    body: &B,
    timeout: Option<Duration>,
    error_message: ErrorMessageFn,
) -> EmbeddingResult<R>
where
    B: Serialize + ?Sized,
    R: DeserializeOwned,
{
    if credential.trim().is_empty() {
        return Err(EmbeddingError::Authentication(
            "API key is missing or empty".to_string(),
        ));
    }

    let mut builder = session
        .post(url)
        .bearer_auth(credential)
        .header("Content-Type", "application/json")
        .json(body);
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }

    let resp = builder.send().await.map_err(|e| {
        tracing::warn!(url, error = %e, "网络请求错误");
        EmbeddingError::Transport(classify_transport(&e))
    })?;

    let status = resp.status();
    let resp_text = resp
        .text()
        .await
        .map_err(|e| EmbeddingError::Transport(classify_transport(&e)))?;

    if !status.is_success() {
        let message = error_message(&resp_text).unwrap_or_else(|| resp_text.trim().to_string());
        tracing::warn!(url, status = status.as_u16(), %message, "API 返回错误状态");
        return Err(status_error(status, message));
    }

    serde_json::from_str(&resp_text).map_err(|e| EmbeddingError::Decode(e.to_string()))
}

/// 401/403 视为认证失败，其余非 2xx 保留状态码
pub(crate) fn status_error(status: StatusCode, message: String) -> EmbeddingError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            EmbeddingError::Authentication(format!("HTTP {}: {}", status.as_u16(), message))
        }
        _ => EmbeddingError::Provider {
            status: status.as_u16(),
            message,
        },
    }
}

/// 沿 source 链区分超时、连接被拒与 DNS 失败
pub(crate) fn classify_transport(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::Timeout;
    }

    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::ConnectionRefused => return TransportError::ConnectionRefused,
                io::ErrorKind::TimedOut => return TransportError::Timeout,
                _ => {}
            }
        }
        let text = cause.to_string();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return TransportError::Dns(dns_detail(err, cause));
        }
        source = cause.source();
    }

    TransportError::Connection(err.to_string())
}

/// 主机名加上完整的解析失败原因链
fn dns_detail(err: &reqwest::Error, cause: &(dyn std::error::Error + 'static)) -> String {
    let mut parts: Vec<String> = err
        .url()
        .and_then(|url| url.host_str())
        .map(str::to_string)
        .into_iter()
        .collect();
    let mut next = Some(cause);
    while let Some(current) = next {
        parts.push(current.to_string());
        next = current.source();
    }
    parts.join(": ")
}
