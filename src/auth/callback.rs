//! OAuth callback intake
//!
//! The authorization server hands control back by redirecting the browser to
//! the registered redirect URI with `code` and `state`. The user can either
//! paste that URL into `osm-submit callback --url ...` or let
//! [`wait_for_callback`] receive it on the loopback interface.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpListener;
use url::Url;

use crate::error::{OsmSubmitError, Result};

/// `code` and `state` extracted from a redirect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackParams {
    /// Authorization code
    pub code: String,
    /// CSRF state token as returned by the server
    pub state: String,
}

impl CallbackParams {
    /// Extracts the callback parameters from a full redirect URL.
    ///
    /// Parameters are read from the query string, falling back to a query
    /// embedded in the fragment (`#/oauth/callback?code=...`) as produced by
    /// hash-routed web front ends.
    ///
    /// # Errors
    ///
    /// `InvalidCallback` when the server reported an `error`, or when `code`
    /// or `state` is missing.
    ///
    /// # Examples
    ///
    /// ```
    /// use osm_submit::auth::CallbackParams;
    /// use url::Url;
    ///
    /// let url = Url::parse("http://127.0.0.1:8765/oauth/callback?code=abc&state=xyz").unwrap();
    /// let params = CallbackParams::from_url(&url).unwrap();
    /// assert_eq!(params.code, "abc");
    /// assert_eq!(params.state, "xyz");
    /// ```
    pub fn from_url(url: &Url) -> Result<Self> {
        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        if pairs.is_empty() {
            if let Some((_, query)) = url.fragment().and_then(|f| f.split_once('?')) {
                pairs = url::form_urlencoded::parse(query.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect();
            }
        }

        let find = |name: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .filter(|v| !v.is_empty())
        };

        if let Some(error) = find("error") {
            let description = find("error_description").unwrap_or_default();
            return Err(OsmSubmitError::InvalidCallback(
                format!("authorization server returned {error} {description}")
                    .trim_end()
                    .to_string(),
            )
            .into());
        }

        match (find("code"), find("state")) {
            (Some(code), Some(state)) => Ok(Self { code, state }),
            _ => Err(OsmSubmitError::InvalidCallback(
                "Missing authorization code or state".to_string(),
            )
            .into()),
        }
    }
}

const SUCCESS_PAGE: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nConnection: close\r\n\r\nAuthorization received. You may close this tab.";
const NOT_FOUND_PAGE: &str =
    "HTTP/1.1 404 Not Found\r\nContent-Type: text/plain\r\nConnection: close\r\n\r\nNot found";

/// Binds the loopback port of `redirect_uri` and waits for the redirect.
///
/// Requests for other paths (a browser's favicon probe, for instance) are
/// answered with 404 and ignored. Returns once a request for the redirect
/// path arrives; its parameters are parsed with [`CallbackParams::from_url`].
pub async fn wait_for_callback(redirect_uri: &str) -> Result<CallbackParams> {
    let redirect = Url::parse(redirect_uri)
        .map_err(|e| OsmSubmitError::Config(format!("invalid redirect URI: {e}")))?;
    let host = redirect.host_str().unwrap_or_default().to_string();
    if !matches!(host.as_str(), "127.0.0.1" | "localhost" | "[::1]") {
        return Err(OsmSubmitError::Config(format!(
            "cannot listen for callbacks on non-loopback host {host}"
        ))
        .into());
    }
    let port = redirect.port_or_known_default().unwrap_or(80);

    let listener = TcpListener::bind(format!("{}:{}", host, port))
        .await
        .map_err(|e| OsmSubmitError::InvalidCallback(format!("failed to bind redirect listener: {e}")))?;
    tracing::info!(%host, port, "Waiting for OAuth callback");

    loop {
        let (stream, _peer) = listener.accept().await?;
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        let request_line = match read_request_line(&mut lines).await {
            Ok(line) => line,
            Err(e) => {
                tracing::debug!(error = %e, "Dropping unreadable connection");
                continue;
            }
        };

        // "GET /oauth/callback?code=...&state=... HTTP/1.1"
        let target = request_line.split_whitespace().nth(1).unwrap_or("/");
        let requested = match redirect.join(target) {
            Ok(url) => url,
            Err(e) => {
                let _ = write_half.write_all(NOT_FOUND_PAGE.as_bytes()).await;
                tracing::debug!(error = %e, target, "Ignoring malformed request target");
                continue;
            }
        };

        if requested.path() != redirect.path() {
            let _ = write_half.write_all(NOT_FOUND_PAGE.as_bytes()).await;
            tracing::debug!(path = requested.path(), "Ignoring unrelated request");
            continue;
        }

        let _ = write_half.write_all(SUCCESS_PAGE.as_bytes()).await;
        let _ = write_half.shutdown().await;
        return CallbackParams::from_url(&requested);
    }
}

/// Reads the request headers, returning the first line
async fn read_request_line<R>(lines: &mut Lines<R>) -> std::io::Result<String>
where
    R: AsyncBufRead + Unpin,
{
    let mut request_line = String::new();
    while let Some(line) = lines.next_line().await? {
        // Headers end at the first empty line.
        if line.is_empty() {
            break;
        }
        if request_line.is_empty() {
            request_line = line;
        }
    }
    Ok(request_line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(url: &str) -> Result<CallbackParams> {
        CallbackParams::from_url(&Url::parse(url).unwrap())
    }

    #[test]
    fn test_from_url_reads_query() {
        let params = parse("http://localhost/oauth/callback?state=s%20t&code=c").unwrap();
        assert_eq!(params.code, "c");
        assert_eq!(params.state, "s t");
    }

    #[test]
    fn test_from_url_reads_hash_router_fragment() {
        let params = parse("http://localhost/#/oauth/callback?code=abc&state=xyz").unwrap();
        assert_eq!(
            params,
            CallbackParams {
                code: "abc".to_string(),
                state: "xyz".to_string()
            }
        );
    }

    #[test]
    fn test_from_url_missing_state_is_invalid() {
        let err = parse("http://localhost/oauth/callback?code=abc").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<OsmSubmitError>(),
            Some(OsmSubmitError::InvalidCallback(_))
        ));
    }

    #[test]
    fn test_from_url_reports_server_error() {
        let err = parse(
            "http://localhost/oauth/callback?error=access_denied&error_description=User+denied",
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("access_denied"), "{msg}");
        assert!(msg.contains("User denied"), "{msg}");
    }

    #[tokio::test]
    async fn test_wait_for_callback_rejects_remote_host() {
        let err = wait_for_callback("https://example.com/cb").await.unwrap_err();
        assert!(err.to_string().contains("non-loopback"));
    }

    #[tokio::test]
    async fn test_wait_for_callback_receives_redirect() {
        // Reserve a free port, release it, then listen on it.
        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);

        let redirect_uri = format!("http://127.0.0.1:{port}/oauth/callback");
        let waiter = tokio::spawn(async move { wait_for_callback(&redirect_uri).await });

        // Give the listener a moment to bind.
        let mut stream = loop {
            match tokio::net::TcpStream::connect(("127.0.0.1", port)).await {
                Ok(s) => break s,
                Err(_) => tokio::time::sleep(std::time::Duration::from_millis(20)).await,
            }
        };
        stream
            .write_all(b"GET /oauth/callback?code=the-code&state=the-state HTTP/1.1\r\nHost: x\r\n\r\n")
            .await
            .unwrap();

        let params = waiter.await.unwrap().unwrap();
        assert_eq!(params.code, "the-code");
        assert_eq!(params.state, "the-state");
    }

    #[tokio::test]
    async fn test_wait_for_callback_survives_unreadable_connection() {
        let free = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = free.local_addr().unwrap().port();
        drop(free);

        let redirect_uri = format!("http://127.0.0.1:{port}/oauth/callback");
        let waiter = tokio::spawn(async move { wait_for_callback(&redirect_uri).await });

        let mut stray = loop {
            match tokio::net::TcpStream::connect(("127.0.0.1", port)).await {
                Ok(s) => break s,
                Err(_) => tokio::time::sleep(std::time::Duration::from_millis(20)).await,
            }
        };
        // Invalid UTF-8 makes the header read fail.
        stray.write_all(b"\xff\xfe\xfd garbage\r\n\r\n").await.unwrap();
        stray.shutdown().await.unwrap();
        drop(stray);

        let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port))
            .await
            .unwrap();
        stream
            .write_all(b"GET /oauth/callback?code=c2&state=s2 HTTP/1.1\r\nHost: x\r\n\r\n")
            .await
            .unwrap();

        let params = waiter.await.unwrap().unwrap();
        assert_eq!(params.code, "c2");
        assert_eq!(params.state, "s2");
    }
}
