//! Local HTTP server for transport tests.

use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Raw text of every request a [`serve`] server received, in arrival order.
pub(crate) type Requests = Arc<Mutex<Vec<String>>>;

/// Serve canned responses on 127.0.0.1 until the runtime shuts down.
///
/// `respond` maps the request line (`PUT /x.json HTTP/1.1`) to a status line
/// and a body. Every connection is closed after one response. Returns the
/// base URL and the request log.
pub(crate) async fn serve<F>(respond: F) -> (String, Requests)
where
    F: Fn(&str) -> (&'static str, String) + Send + 'static,
{
    serve_raw(move |line| {
        let (status, body) = respond(line);
        format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    })
    .await
}

/// Like [`serve`], but `respond` returns the raw response, headers included.
pub(crate) async fn serve_raw<F>(respond: F) -> (String, Requests)
where
    F: Fn(&str) -> String + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let requests: Requests = Arc::default();
    let log = Arc::clone(&requests);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let request = read_request(&mut socket).await;
            let response = respond(request.lines().next().unwrap_or_default());
            log.lock().unwrap().push(request);

            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        }
    });

    (base, requests)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|line| {
                    line.to_ascii_lowercase()
                        .strip_prefix("content-length:")
                        .map(|v| v.trim().parse::<usize>().unwrap())
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8(buf).unwrap()
}
