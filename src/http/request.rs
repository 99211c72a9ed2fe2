//! Minimal HTTP/1.1 request reader: request line, headers, `Content-Length` body.
//! One request per connection; chunked bodies are refused.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

const MAX_LINE_BYTES: usize = 8 * 1024;
const MAX_HEADERS: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),
    #[error("unsupported transfer encoding")]
    UnsupportedEncoding,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl HttpError {
    pub fn status(&self) -> u16 {
        match self {
            HttpError::BadRequest(_) => 400,
            HttpError::PayloadTooLarge(_) => 413,
            HttpError::UnsupportedEncoding => 501,
            HttpError::Io(_) => 500,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Percent-decoded path without the query string.
    pub path: String,
    pub query: Vec<(String, String)>,
    /// Header names are lowercased.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Request {
    /// Build a request from a method and a raw target such as `/user?user_id=5`.
    pub fn new(method: &str, target: &str) -> Result<Self, HttpError> {
        let (raw_path, raw_query) = match target.split_once('?') {
            Some((p, q)) => (p, q),
            None => (target, ""),
        };
        if !raw_path.starts_with('/') {
            return Err(HttpError::BadRequest(format!("invalid target {}", target)));
        }
        let path = urlencoding::decode(raw_path)
            .map_err(|_| HttpError::BadRequest("path is not valid UTF-8".into()))?
            .into_owned();
        Ok(Request {
            method: method.to_ascii_uppercase(),
            path,
            query: parse_query(raw_query),
            headers: Vec::new(),
            body: Vec::new(),
        })
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    /// True when `Content-Type` names JSON, parameters like `charset` ignored.
    pub fn is_json(&self) -> bool {
        self.header("content-type")
            .and_then(|v| v.split(';').next())
            .map(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
            .unwrap_or(false)
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

fn parse_query(raw: &str) -> Vec<(String, String)> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (decode_component(k), decode_component(v)),
            None => (decode_component(pair), String::new()),
        })
        .collect()
}

async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Option<String>, HttpError> {
    let mut buf = Vec::new();
    let n = (&mut *reader)
        .take(MAX_LINE_BYTES as u64 + 1)
        .read_until(b'\n', &mut buf)
        .await?;
    if n == 0 {
        return Ok(None);
    }
    if buf.len() > MAX_LINE_BYTES {
        return Err(HttpError::BadRequest("header line too long".into()));
    }
    let line = String::from_utf8(buf)
        .map_err(|_| HttpError::BadRequest("header is not valid UTF-8".into()))?;
    Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
}

/// Read one request. `Ok(None)` means the peer closed before sending anything.
pub async fn read_request<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    max_body: usize,
) -> Result<Option<Request>, HttpError> {
    let request_line = match read_line(reader).await? {
        Some(line) if !line.is_empty() => line,
        _ => return Ok(None),
    };
    let mut parts = request_line.split_whitespace();
    let (method, target, version) = match (parts.next(), parts.next(), parts.next()) {
        (Some(m), Some(t), Some(v)) => (m, t, v),
        _ => return Err(HttpError::BadRequest("malformed request line".into())),
    };
    if !version.starts_with("HTTP/1.") {
        return Err(HttpError::BadRequest(format!("unsupported version {}", version)));
    }
    let mut request = Request::new(method, target)?;

    loop {
        let line = read_line(reader)
            .await?
            .ok_or_else(|| HttpError::BadRequest("unexpected end of headers".into()))?;
        if line.is_empty() {
            break;
        }
        if request.headers.len() >= MAX_HEADERS {
            return Err(HttpError::BadRequest("too many headers".into()));
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| HttpError::BadRequest("malformed header".into()))?;
        request
            .headers
            .push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
    }

    if request.header("transfer-encoding").is_some() {
        return Err(HttpError::UnsupportedEncoding);
    }
    let length = match request.header("content-length") {
        Some(v) => v
            .parse::<usize>()
            .map_err(|_| HttpError::BadRequest("invalid content-length".into()))?,
        None => 0,
    };
    if length > max_body {
        return Err(HttpError::PayloadTooLarge(max_body));
    }
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).await?;
    request.body = body;
    Ok(Some(request))
}
