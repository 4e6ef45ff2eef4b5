use anyhow::{Context, Result};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::canned::CannedResponse;
use crate::http::{parse_request, read_request_head, ReadOutcome};
use crate::response_buffer::{http_date, Playback, ResponseBuffer};

pub const DEFAULT_PORT: u16 = 8888;
pub const DEFAULT_BIND: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub response_file: PathBuf,
    pub bind: IpAddr,
    pub port: u16,
}

impl ServeConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

/// Load the canned response, echo it to stdout, then serve it forever.
///
/// Nothing is bound until the response file has loaded cleanly.
pub async fn start_server(config: ServeConfig) -> Result<()> {
    let canned = CannedResponse::load(&config.response_file).with_context(|| {
        format!(
            "Failed to load canned response from {:?}",
            config.response_file
        )
    })?;

    println!("Will send the following response:\n");
    println!("{canned}");

    let addr = config.addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("Starting server on http://{}", addr);
    info!("Playing back {:?}", config.response_file);

    let playback = Playback::new(&canned, &http_date(SystemTime::now()));
    serve(listener, Arc::new(playback)).await
}

/// Accept loop over an already bound listener. One task per connection.
pub async fn serve(listener: TcpListener, playback: Arc<Playback>) -> Result<()> {
    loop {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Accept error: {}", e);
                continue;
            }
        };
        let playback = playback.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, playback).await {
                debug!("Connection error from {}: {:#}", peer_addr, e);
            }
        });
    }
}

/// One request per connection: read the head, write the response, close.
async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    playback: Arc<Playback>,
) -> Result<()> {
    let mut buf = Vec::with_capacity(1024);

    let outcome = read_request_head(&mut stream, &mut buf)
        .await
        .context("Failed to read from socket")?;

    let date = http_date(SystemTime::now());
    let response = match outcome {
        ReadOutcome::Closed => {
            debug!("Connection from {} closed before a full request", peer_addr);
            return Ok(());
        }
        ReadOutcome::TooLarge => {
            warn!("Request head from {} is too large", peer_addr);
            ResponseBuffer::bad_request(&date)
        }
        ReadOutcome::Ready => match parse_request(&buf) {
            Ok((request, _)) => {
                info!(
                    peer = %peer_addr,
                    method = request.method,
                    target = request.target,
                    version = request.version,
                    host = request.header("host").unwrap_or("-"),
                    headers = request.headers.len(),
                    "{}",
                    request.raw
                );
                playback.for_method(request.method, &date)
            }
            Err(e) => {
                warn!("Parse error from {}: {:?}", peer_addr, e);
                ResponseBuffer::bad_request(&date)
            }
        },
    };

    stream
        .write_all(&response.buffer)
        .await
        .context("Write failed")?;
    stream.shutdown().await.context("Shutdown failed")?;

    Ok(())
}
