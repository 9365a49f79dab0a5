//! Master reachability probes
//!
//! A probe only answers whether something accepts connections on the master's
//! control port. Application-level replies are not interpreted.

use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Result of a single probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reachability {
    /// The control port accepted a connection
    Reachable,

    /// The connection was refused, timed out or could not be routed
    Unreachable(String),
}

/// Checks whether the master still listens on its control port
#[async_trait]
pub trait MasterProbe: Send + Sync {
    async fn probe(&self, host: &str) -> Reachability;
}

/// Probe that opens a TCP connection and closes it again
pub struct TcpProbe {
    port: u16,
    connect_timeout: Duration,
}

impl TcpProbe {
    pub fn new(port: u16, connect_timeout: Duration) -> Self {
        Self {
            port,
            connect_timeout,
        }
    }
}

#[async_trait]
impl MasterProbe for TcpProbe {
    async fn probe(&self, host: &str) -> Reachability {
        let connect = TcpStream::connect((host, self.port));

        match tokio::time::timeout(self.connect_timeout, connect).await {
            Ok(Ok(_stream)) => Reachability::Reachable,
            Ok(Err(e)) => Reachability::Unreachable(e.to_string()),
            Err(_) => Reachability::Unreachable(format!(
                "connect timed out after {:?}",
                self.connect_timeout
            )),
        }
    }
}

/// Probe that sends an HTTP GET to the control port
///
/// Any HTTP response, including error statuses and malformed replies from a
/// non-HTTP server, means the port is open. Only connection failures count as
/// unreachable.
pub struct HttpProbe {
    port: u16,
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(port: u16, connect_timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .connect_timeout(connect_timeout)
            .timeout(connect_timeout * 2)
            .build()?;

        Ok(Self { port, client })
    }
}

#[async_trait]
impl MasterProbe for HttpProbe {
    async fn probe(&self, host: &str) -> Reachability {
        let url = format!("http://{}:{}/", host, self.port);

        match self.client.get(&url).send().await {
            Ok(response) => {
                debug!("{} answered with {}", url, response.status());
                Reachability::Reachable
            }
            Err(e) if e.is_connect() => Reachability::Unreachable(e.to_string()),
            Err(e) => {
                debug!("{} accepted the connection but failed: {}", url, e);
                Reachability::Reachable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_probe_open_then_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let probe = TcpProbe::new(port, Duration::from_secs(2));

        assert_eq!(probe.probe("127.0.0.1").await, Reachability::Reachable);

        drop(listener);
        assert!(matches!(
            probe.probe("127.0.0.1").await,
            Reachability::Unreachable(_)
        ));
    }

    #[tokio::test]
    async fn test_http_probe_treats_any_reply_as_reachable() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\n\r\n")
                .await;
        });

        let probe = HttpProbe::new(port, Duration::from_secs(2)).unwrap();
        assert_eq!(probe.probe("127.0.0.1").await, Reachability::Reachable);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_http_probe_closed_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let probe = HttpProbe::new(port, Duration::from_secs(2)).unwrap();
        assert!(matches!(
            probe.probe("127.0.0.1").await,
            Reachability::Unreachable(_)
        ));
    }
}
