//! HTTP/1.1 front end on a plain tokio `TcpListener`.
//!
//! Each connection carries exactly one request and is closed after the response
//! (`Connection: close`), which is all the thin web client and the bot webhook need.

pub mod request;
pub mod response;
pub mod routes;
pub mod static_files;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

pub use request::{HttpError, Request};
pub use response::Response;
pub use routes::Router;

/// Time allowed for a client to deliver its request.
const READ_TIMEOUT: Duration = Duration::from_secs(15);

/// Accept connections until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    router: Arc<Router>,
    shutdown: impl Future<Output = ()>,
) -> std::io::Result<()> {
    let local = listener.local_addr()?;
    log::info!("HTTP server listening on http://{}", local);
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                log::info!("HTTP server shutting down");
                return Ok(());
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let router = Arc::clone(&router);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, router).await {
                            log::debug!("connection error from {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => log::warn!("accept error: {}", e),
            }
        }
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    addr: SocketAddr,
    router: Arc<Router>,
) -> std::io::Result<()> {
    let (read_half, mut write_half) = stream.split();
    let mut reader = BufReader::new(read_half);
    let parsed = tokio::time::timeout(
        READ_TIMEOUT,
        request::read_request(&mut reader, router.max_body()),
    )
    .await;

    let response = match parsed {
        Err(_) => {
            log::debug!("request from {} timed out", addr);
            return Ok(());
        }
        Ok(Ok(None)) => return Ok(()),
        Ok(Ok(Some(req))) => router.handle(req).await,
        Ok(Err(HttpError::Io(e))) => return Err(e),
        Ok(Err(e)) => {
            log::debug!("rejecting request from {}: {}", addr, e);
            router.service().metrics().inc_http_error();
            Response::error(e.status(), "bad_request", &e.to_string())
        }
    };
    write_half.write_all(&response.to_bytes()).await?;
    write_half.flush().await?;
    let _ = write_half.shutdown().await;
    Ok(())
}
