//! Scripted WebSocket handshake server.
//!
//! Provides a TestServer that listens on a random local port, answers each
//! upgrade request according to a [`Reply`], and echoes data after a
//! successful handshake.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use wsdial::compute_accept_key;

/// How the server answers an upgrade request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Valid 101 response, optionally selecting a subprotocol and sending
    /// `trailer` in the same write as the response head.
    Accept {
        protocol: Option<String>,
        trailer: Vec<u8>,
    },
    /// Otherwise valid response with a different status code.
    Status(u16),
    /// 101 response whose accept key is computed from the wrong nonce.
    WrongAccept,
}

impl Reply {
    pub fn accept() -> Self {
        Reply::Accept {
            protocol: None,
            trailer: Vec::new(),
        }
    }

    pub fn with_protocol(protocol: &str) -> Self {
        Reply::Accept {
            protocol: Some(protocol.to_string()),
            trailer: Vec::new(),
        }
    }

    pub fn with_trailer(trailer: &[u8]) -> Self {
        Reply::Accept {
            protocol: None,
            trailer: trailer.to_vec(),
        }
    }
}

pub struct TestServer {
    handle: JoinHandle<()>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    pub async fn spawn(reply: Reply) -> (Self, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let recorded = requests.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let reply = reply.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, reply, recorded).await;
                });
            }
        });

        (Self { handle, requests }, addr)
    }

    /// Raw request heads received so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }
}

async fn serve(
    mut stream: TcpStream,
    reply: Reply,
    recorded: Arc<Mutex<Vec<String>>>,
) -> std::io::Result<()> {
    // Byte at a time so nothing past the request head is consumed here.
    let mut head = Vec::new();
    while !head.ends_with(b"\r\n\r\n") {
        head.push(stream.read_u8().await?);
    }
    let head = String::from_utf8_lossy(&head).into_owned();
    let key = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("sec-websocket-key")
                .then(|| value.trim().to_string())
        })
        .unwrap_or_default();
    recorded.lock().unwrap().push(head);

    let (status, accept, protocol, trailer) = match reply {
        Reply::Accept { protocol, trailer } => (101, compute_accept_key(&key), protocol, trailer),
        Reply::Status(code) => (code, compute_accept_key(&key), None, Vec::new()),
        Reply::WrongAccept => (101, compute_accept_key("AAAAAAAAAAAAAAAAAAAAAA=="), None, Vec::new()),
    };

    let mut response = format!(
        "HTTP/1.1 {} {}\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n",
        status,
        reason_phrase(status),
        accept
    );
    if let Some(protocol) = protocol {
        response.push_str(&format!("Sec-WebSocket-Protocol: {}\r\n", protocol));
    }
    response.push_str("\r\n");

    let mut out = response.into_bytes();
    out.extend_from_slice(&trailer);
    stream.write_all(&out).await?;

    if status != 101 {
        return Ok(());
    }

    let (mut reader, mut writer) = stream.split();
    tokio::io::copy(&mut reader, &mut writer).await?;
    Ok(())
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        101 => "Switching Protocols",
        200 => "OK",
        301 => "Moved Permanently",
        302 => "Found",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        426 => "Upgrade Required",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
