use crate::domain::model::{HttpVerb, MediaType, RawResponse};
use crate::utils::error::Result;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};

#[derive(Debug)]
pub enum Outcome {
    Ok(Response),
    NotOk(StatusCode),
}

/// Single-shot HTTP requests with "200 or nothing" semantics.
///
/// No timeout is configured on the default client: a hung server blocks the
/// caller until the connection is closed.
#[derive(Debug, Clone, Default)]
pub struct RestRequest {
    client: Client,
}

impl RestRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Builds a request with `Content-Type` and `Accept` set to the media
    /// type with a UTF-8 charset.
    pub fn request(&self, verb: HttpVerb, url: &str, media_type: &MediaType) -> RequestBuilder {
        let header_value = media_type.with_charset("UTF-8");
        self.client
            .request(verb.as_method(), url)
            .header(CONTENT_TYPE, header_value.as_str())
            .header(ACCEPT, header_value.as_str())
    }

    pub fn get(&self, url: &str, media_type: &MediaType) -> RequestBuilder {
        self.request(HttpVerb::Get, url, media_type)
    }

    /// Sends the request once and splits the result on status 200.
    pub async fn send(&self, request: RequestBuilder) -> Result<Outcome> {
        let request = request.build()?;
        tracing::debug!("📡 Sending {} {} ...", request.method(), request.url());

        let response = self.client.execute(request).await?;
        tracing::debug!("📡 Response status: {}", response.status());

        if response.status() == StatusCode::OK {
            Ok(Outcome::Ok(response))
        } else {
            Ok(Outcome::NotOk(response.status()))
        }
    }

    /// Any status other than 200 gives `Ok(None)`; transport faults are
    /// returned as errors.
    pub async fn execute_or_none(&self, request: RequestBuilder) -> Result<Option<Response>> {
        match self.send(request).await? {
            Outcome::Ok(response) => Ok(Some(response)),
            Outcome::NotOk(_) => Ok(None),
        }
    }

    /// Best-effort variant: every failure is logged and becomes `None`.
    pub async fn request_text(&self, request: RequestBuilder) -> Option<String> {
        let response = match self.execute_or_none(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("⚠️ Request failed: {}", e);
                None
            }
        };

        let result = match response {
            Some(response) => match read_lines(response).await {
                Ok(text) => Some(text),
                Err(e) => {
                    tracing::warn!("⚠️ Reading response body failed: {}", e);
                    None
                }
            },
            None => None,
        };

        tracing::info!("RESULT: {:?}", result);
        result
    }

    pub async fn get_text(&self, url: &str, media_type: &MediaType) -> Option<String> {
        self.request_text(self.get(url, media_type)).await
    }
}

/// Reads the body as text and rejoins its lines with `\n`. The final line
/// terminator is not kept.
pub async fn read_lines(response: Response) -> Result<String> {
    let text = response.text().await?;
    Ok(text.lines().collect::<Vec<_>>().join("\n"))
}

pub async fn read_raw(response: Response) -> Result<RawResponse> {
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let body = response.bytes().await?.to_vec();

    Ok(RawResponse {
        status,
        content_type,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_execute_returns_response_only_on_200() {
        let server = MockServer::start();
        let ok_mock = server.mock(|when, then| {
            when.method(GET).path("/ok");
            then.status(200).body("fine");
        });
        let missing_mock = server.mock(|when, then| {
            when.method(GET).path("/missing");
            then.status(404).body("not here");
        });

        let transport = RestRequest::new();
        let media = MediaType::text_plain();

        let ok = transport
            .execute_or_none(transport.get(&server.url("/ok"), &media))
            .await
            .unwrap();
        assert!(ok.is_some());

        let missing = transport
            .execute_or_none(transport.get(&server.url("/missing"), &media))
            .await
            .unwrap();
        assert!(missing.is_none());

        ok_mock.assert();
        missing_mock.assert();
    }

    #[tokio::test]
    async fn test_non_ok_success_status_is_absent() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/created");
            then.status(201).body("made");
        });

        let transport = RestRequest::new();
        let response = transport
            .execute_or_none(transport.get(&server.url("/created"), &MediaType::text_plain()))
            .await
            .unwrap();
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_request_sets_media_headers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/typed")
                .header("content-type", "application/json;charset=UTF-8")
                .header("accept", "application/json;charset=UTF-8");
            then.status(200).body("{}");
        });

        let transport = RestRequest::new();
        let text = transport
            .get_text(&server.url("/typed"), &MediaType::json())
            .await;

        mock.assert();
        assert_eq!(text.as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_transport_fault_is_an_error_but_text_is_best_effort() {
        let transport = RestRequest::new();
        let media = MediaType::text_plain();

        let result = transport
            .execute_or_none(transport.get("http://127.0.0.1:1/unreachable", &media))
            .await;
        assert!(result.is_err());

        let text = transport
            .get_text("http://127.0.0.1:1/unreachable", &media)
            .await;
        assert!(text.is_none());
    }

    #[tokio::test]
    async fn test_read_lines_normalizes_separators() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/lines");
            then.status(200).body("first\r\nsecond\nthird\n");
        });

        let transport = RestRequest::new();
        let text = transport
            .get_text(&server.url("/lines"), &MediaType::text_plain())
            .await;
        assert_eq!(text.as_deref(), Some("first\nsecond\nthird"));
    }

    #[tokio::test]
    async fn test_read_raw_keeps_bytes_and_content_type() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/blob");
            then.status(200)
                .header("Content-Type", "application/octet-stream")
                .body(vec![0u8, 159, 146, 150]);
        });

        let transport = RestRequest::new();
        let response = transport
            .execute_or_none(transport.get(&server.url("/blob"), &MediaType::octet_stream()))
            .await
            .unwrap()
            .unwrap();
        let raw = read_raw(response).await.unwrap();

        assert_eq!(raw.status, 200);
        assert_eq!(raw.content_type.as_deref(), Some("application/octet-stream"));
        assert_eq!(raw.body, vec![0u8, 159, 146, 150]);
    }
}
