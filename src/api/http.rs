//! Shared HTTP plumbing for the chain and wallet clients

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::types::NodeErrorBody;
use crate::config::ClientConfig;
use crate::error::{ErrorCode, YxError, YxResult};

const USER_AGENT: &str = concat!("yx-client/", env!("CARGO_PKG_VERSION"));

/// One client per API object so connections are reused
pub(crate) fn build_client(config: &ClientConfig) -> YxResult<Client> {
    Client::builder()
        .timeout(config.request_timeout())
        .connect_timeout(config.connect_timeout())
        .tcp_nodelay(true)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| YxError::network(format!("Failed to create HTTP client: {}", e)))
}

pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

/// POST a JSON body and decode a JSON reply.
///
/// Non-2xx replies carrying a node error body become `NodeRejection`
/// errors; anything else is an `HttpStatus` transport error.
pub(crate) async fn post_json<Req, Res>(client: &Client, url: &str, body: &Req) -> YxResult<Res>
where
    Req: Serialize + ?Sized,
    Res: DeserializeOwned,
{
    let response = client.post(url).json(body).send().await?;
    let status = response.status();
    let text = response.text().await?;

    if status.is_success() {
        return serde_json::from_str(&text).map_err(|e| {
            YxError::parse_error(format!("Unexpected response from {}: {}", url, e))
        });
    }

    Err(status_error(status, &text))
}

fn status_error(status: StatusCode, body: &str) -> YxError {
    match serde_json::from_str::<NodeErrorBody>(body) {
        Ok(node_error) if !node_error.error.name.is_empty() => node_error.into_error(),
        _ => YxError::new(
            ErrorCode::HttpStatus,
            format!("HTTP {}", status.as_u16()),
        )
        .with_details(body.chars().take(512).collect::<String>()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_endpoint_joins_paths() {
        assert_eq!(
            endpoint("http://127.0.0.1:8888/", "/v1/chain/get_info"),
            "http://127.0.0.1:8888/v1/chain/get_info"
        );
    }

    #[test]
    fn test_status_error_classification() {
        let node = r#"{"code":500,"message":"Internal Service Error",
            "error":{"code":3080004,"name":"tx_cpu_usage_exceeded","what":"Transaction exceeded the current CPU usage limit","details":[]}}"#;
        let err = status_error(StatusCode::INTERNAL_SERVER_ERROR, node);
        assert_eq!(err.code, ErrorCode::InsufficientResources);

        let gateway = status_error(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert_eq!(gateway.code, ErrorCode::HttpStatus);
        assert_eq!(gateway.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_build_client_from_config() {
        assert!(build_client(&ClientConfig::default()).is_ok());
    }
}
