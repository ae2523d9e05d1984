use crate::{config::Config, errors::WhoisError};
use serde::Serialize;
use std::time::Duration;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};
use tracing::debug;

/// Outcome of one successful WHOIS exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WhoisResult {
    /// Server that answered.
    pub server: String,
    /// ASCII form of the queried domain.
    pub domain: String,
    /// Decoded response text, unmodified.
    pub whois: String,
}

/// Client for the port-43 line protocol: one query line out, everything
/// until the server closes the connection back.
#[derive(Debug, Clone)]
pub struct WhoisClient {
    port: u16,
    timeout: Duration,
    max_response_size: usize,
    buffer_size: usize,
}

impl WhoisClient {
    pub fn new(config: &Config) -> Self {
        Self {
            port: config.whois_port,
            timeout: config.whois_timeout(),
            max_response_size: config.max_response_size,
            buffer_size: config.read_buffer_size.max(1),
        }
    }

    /// Send `query` to `server` and return the decoded response.
    ///
    /// The whole exchange runs under one deadline; hitting it yields
    /// `WhoisError::Timeout`.
    pub async fn query(&self, server: &str, query: &str) -> Result<String, WhoisError> {
        timeout(self.timeout, self.execute_query(server, query)).await?
    }

    async fn execute_query(&self, server: &str, query: &str) -> Result<String, WhoisError> {
        debug!("Connecting to {}:{}", server, self.port);
        let mut stream = TcpStream::connect((server, self.port)).await?;

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY: {}", e);
        }

        let query_line = format!("{}\r\n", query);
        stream.write_all(query_line.as_bytes()).await?;

        let response = self.drain(&mut stream).await?;
        debug!("Received {} bytes from {}", response.len(), server);

        String::from_utf8(response).map_err(|_| WhoisError::InvalidUtf8)
    }

    /// Read until EOF, failing once the response grows past the size limit.
    async fn drain<R: AsyncRead + Unpin>(&self, reader: &mut R) -> Result<Vec<u8>, WhoisError> {
        let mut buffer = vec![0; self.buffer_size];
        let mut response = Vec::new();

        loop {
            match reader.read(&mut buffer).await? {
                0 => break,
                n => {
                    response.extend_from_slice(&buffer[..n]);
                    if response.len() > self.max_response_size {
                        return Err(WhoisError::ResponseTooLarge);
                    }
                }
            }
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn spawn_server(chunks: Vec<Vec<u8>>) -> (u16, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut line = Vec::new();
            let mut byte = [0u8; 1];
            while !line.ends_with(b"\r\n") {
                socket.read_exact(&mut byte).await.unwrap();
                line.push(byte[0]);
            }
            for chunk in chunks {
                if socket.write_all(&chunk).await.is_err() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            String::from_utf8(line).unwrap()
        });
        (port, handle)
    }

    fn client(port: u16) -> WhoisClient {
        WhoisClient::new(&Config {
            whois_port: port,
            whois_timeout_seconds: 5,
            read_buffer_size: 4,
            ..Config::default()
        })
    }

    #[tokio::test]
    async fn test_query_sends_crlf_line_and_drains_all_chunks() {
        let (port, server) = spawn_server(vec![
            b"Domain Name: ".to_vec(),
            b"EXAMPLE.COM\r\n".to_vec(),
            b"Registrar: Test\r\n".to_vec(),
        ]).await;

        let text = client(port).query("127.0.0.1", "example.com").await.unwrap();

        assert_eq!(text, "Domain Name: EXAMPLE.COM\r\nRegistrar: Test\r\n");
        assert_eq!(server.await.unwrap(), "example.com\r\n");
    }

    #[tokio::test]
    async fn test_query_line_is_utf8() {
        let (port, server) = spawn_server(vec![b"ok".to_vec()]).await;
        client(port).query("127.0.0.1", "bücher.de").await.unwrap();
        assert_eq!(server.await.unwrap(), "bücher.de\r\n");
    }

    #[tokio::test]
    async fn test_response_too_large() {
        let (port, _server) = spawn_server(vec![b"0123456789".to_vec(), b"0123456789".to_vec()]).await;
        let client = WhoisClient::new(&Config {
            whois_port: port,
            max_response_size: 12,
            read_buffer_size: 8,
            ..Config::default()
        });
        let result = client.query("127.0.0.1", "example.com").await;
        assert!(matches!(result, Err(WhoisError::ResponseTooLarge)));
    }

    #[tokio::test]
    async fn test_invalid_utf8() {
        let (port, _server) = spawn_server(vec![b"\xff\xfe".to_vec()]).await;
        let result = client(port).query("127.0.0.1", "example.com").await;
        assert!(matches!(result, Err(WhoisError::InvalidUtf8)));
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let _server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let mut client = client(port);
        client.timeout = Duration::from_millis(200);
        let result = client.query("127.0.0.1", "example.com").await;
        assert!(matches!(result, Err(WhoisError::Timeout)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_io_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = client(port).query("127.0.0.1", "example.com").await;
        assert!(matches!(result, Err(WhoisError::IoError(_))));
    }
}
