#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use bumper_core::net::messages::{ClientMessage, JoinMatchMsg, ServerMessage};
use bumper_core::net::protocol::{PROTOCOL_VERSION, decode_server_message, encode_client_message};
use bumper_core::player::PlayerId;

use bumper_server::build_app;
use bumper_server::config::{MatchesConfig, ServerConfig};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    /// Short pause timeout and a custom win score.
    pub async fn with_matches(pause_timeout_secs: u64, win_score: u8) -> Self {
        let config = ServerConfig {
            matches: MatchesConfig {
                pause_timeout_secs,
                win_score,
                ..MatchesConfig::default()
            },
            ..ServerConfig::default()
        };
        Self::from_config(config).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (app, _state) = build_app(config);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Connect a WebSocket client to the given URL.
pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

pub fn join_msg(match_id: &str, player_id: PlayerId, name: &str) -> ClientMessage {
    ClientMessage::JoinMatch(JoinMatchMsg {
        match_id: match_id.to_string(),
        player_id,
        display_name: name.to_string(),
        protocol_version: PROTOCOL_VERSION,
    })
}

/// Connect and send the join frame for `match_id`.
pub async fn ws_join(server: &TestServer, match_id: &str, player_id: PlayerId) -> WsStream {
    let mut ws = ws_connect(&server.ws_url()).await;
    let name = format!("player{player_id}");
    ws_send_client_msg(&mut ws, &join_msg(match_id, player_id, &name)).await;
    ws
}

/// Send an encoded ClientMessage over WebSocket.
pub async fn ws_send_client_msg(stream: &mut WsStream, msg: &ClientMessage) {
    let encoded = encode_client_message(msg).unwrap();
    stream.send(Message::Binary(encoded.into())).await.unwrap();
}

/// Read the next binary message (with 5s timeout).
pub async fn ws_read_raw(stream: &mut WsStream) -> Vec<u8> {
    let timeout = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => return data.to_vec(),
                Some(Ok(Message::Close(frame))) => panic!("Connection closed: {frame:?}"),
                Some(Ok(_)) => continue,
                Some(Err(e)) => panic!("WebSocket error: {e}"),
                None => panic!("WebSocket stream ended"),
            }
        }
    });
    timeout.await.expect("Timed out waiting for WS message")
}

pub async fn ws_read_server_msg(stream: &mut WsStream) -> ServerMessage {
    let data = ws_read_raw(stream).await;
    decode_server_message(&data).unwrap()
}

/// Read server messages until one matches `pred`, skipping the rest.
pub async fn ws_read_until(
    stream: &mut WsStream,
    mut pred: impl FnMut(&ServerMessage) -> bool,
) -> ServerMessage {
    loop {
        let msg = ws_read_server_msg(stream).await;
        if pred(&msg) {
            return msg;
        }
    }
}

/// Collect server messages for `window`, stopping early on close.
pub async fn ws_collect_for(stream: &mut WsStream, window: Duration) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    let _ = tokio::time::timeout(window, async {
        while let Some(Ok(msg)) = stream.next().await {
            match msg {
                Message::Binary(data) => {
                    if let Ok(decoded) = decode_server_message(&data) {
                        out.push(decoded);
                    }
                },
                Message::Close(_) => break,
                _ => {},
            }
        }
    })
    .await;
    out
}

/// Skip binary frames until the server closes, returning the close code.
/// `None` means the stream ended without a close frame.
pub async fn ws_read_close_code(stream: &mut WsStream) -> Option<u16> {
    let timeout = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match stream.next().await {
                Some(Ok(Message::Close(Some(frame)))) => return Some(u16::from(frame.code)),
                Some(Ok(Message::Close(None))) | None | Some(Err(_)) => return None,
                Some(Ok(_)) => continue,
            }
        }
    });
    timeout.await.expect("Timed out waiting for close")
}
