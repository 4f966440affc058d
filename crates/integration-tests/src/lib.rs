//! Integration tests for the Naked Pineapple local cart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p np-cart-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cross_context` - Several contexts sharing one storage area
//! - `persistence` - File-backed storage across process restarts
//! - `checkout` - Order submission against a local HTTP responder
//!
//! Nothing here needs external services; the order endpoint is served by
//! [`OrderResponder`] on a loopback port.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::time::Duration;

use np_cart::config::OrderEndpointConfig;
use np_cart_core::ProductInput;
use secrecy::SecretString;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use url::Url;

/// A product with a numeric price and a predictable name.
#[must_use]
pub fn product(id: i32, price: &str) -> ProductInput {
    ProductInput::new(id, format!("Product {id}"), price, format!("/images/{id}.jpg"))
}

/// One request captured by [`OrderResponder`].
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    /// Request line and headers.
    pub head: String,
    /// Raw request body.
    pub body: String,
}

impl CapturedRequest {
    /// Value of a header, if present.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }
}

/// Loopback HTTP endpoint that answers a single request with a canned reply.
pub struct OrderResponder {
    url: Url,
    captured: oneshot::Receiver<CapturedRequest>,
}

impl OrderResponder {
    /// Bind a loopback port and answer the first request with `status` and
    /// `body`.
    ///
    /// # Errors
    ///
    /// Returns error if no loopback port can be bound.
    pub async fn start(status: u16, body: &str) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let url = Url::parse(&format!("http://{}/api/orders", listener.local_addr()?))
            .map_err(std::io::Error::other)?;
        let (tx, rx) = oneshot::channel();
        let reply = format!(
            "HTTP/1.1 {status} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            reason(status),
            body.len()
        );

        tokio::spawn(async move {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let Ok(request) = read_request(&mut socket).await else {
                return;
            };
            let _ = socket.write_all(reply.as_bytes()).await;
            let _ = socket.shutdown().await;
            let _ = tx.send(request);
        });

        Ok(Self { url, captured: rx })
    }

    /// The URL to post orders to.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Endpoint configuration pointing at this responder.
    #[must_use]
    pub fn config(&self, api_token: Option<&str>) -> OrderEndpointConfig {
        OrderEndpointConfig {
            url: self.url.clone(),
            api_token: api_token.map(SecretString::from),
            timeout: Duration::from_secs(5),
        }
    }

    /// The request the responder received, once it has answered.
    pub async fn request(self) -> Option<CapturedRequest> {
        self.captured.await.ok()
    }
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> std::io::Result<CapturedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 1024];

    let header_end = loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        buf.extend_from_slice(chunk.get(..n).unwrap_or_default());
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(buf.get(..header_end).unwrap_or_default()).into_owned();
    let captured = CapturedRequest {
        head,
        body: String::new(),
    };
    let content_length = captured
        .header("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);

    let body_start = header_end + 4;
    while buf.len() < body_start + content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(chunk.get(..n).unwrap_or_default());
    }

    let body_end = buf.len().min(body_start + content_length);
    let body = buf.get(body_start..body_end).unwrap_or_default();
    Ok(CapturedRequest {
        body: String::from_utf8_lossy(body).into_owned(),
        ..captured
    })
}

const fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        422 => "Unprocessable Entity",
        _ => "Status",
    }
}
