use std::cell::RefCell;
use std::rc::Rc;

use bumper_core::net::messages::{ClientMessage, ServerMessage};
use bumper_core::net::protocol::{decode_server_message, encode_client_message};

use crate::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Open,
    /// Closed with the given code, `None` for an abnormal close.
    Closed(Option<u16>),
}

/// State shared between the client and the socket callbacks.
#[derive(Default)]
struct Shared {
    inbound: Vec<Vec<u8>>,
    outbound: Vec<Vec<u8>>,
    state: ConnectionState,
}

/// Transport-neutral connection to a match.
///
/// The socket glue (browser callbacks, a native socket, a test) holds a
/// [`SocketHandle`] and feeds frames in; the game loop drains them once per
/// frame. Uses Rc<RefCell> because the frame loop is single-threaded.
pub struct NetClient {
    shared: Rc<RefCell<Shared>>,
}

/// The socket side of a [`NetClient`].
#[derive(Clone)]
pub struct SocketHandle {
    shared: Rc<RefCell<Shared>>,
}

impl Default for NetClient {
    fn default() -> Self {
        Self::new()
    }
}

impl NetClient {
    pub fn new() -> Self {
        Self {
            shared: Rc::new(RefCell::new(Shared::default())),
        }
    }

    pub fn socket_handle(&self) -> SocketHandle {
        SocketHandle {
            shared: Rc::clone(&self.shared),
        }
    }

    /// Queue a message for the socket. Fails once the connection is closed.
    pub fn send(&self, msg: &ClientMessage) -> Result<(), ClientError> {
        let mut shared = self.shared.borrow_mut();
        if let ConnectionState::Closed(code) = shared.state {
            return Err(ClientError::Closed(code));
        }
        let data = encode_client_message(msg)?;
        shared.outbound.push(data);
        Ok(())
    }

    /// Drain all buffered frames.
    pub fn drain_messages(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.shared.borrow_mut().inbound)
    }

    /// Drain and decode buffered frames, dropping any that fail to decode.
    pub fn drain_decoded(&self) -> Vec<ServerMessage> {
        self.drain_messages()
            .into_iter()
            .filter_map(|frame| match decode_server_message(&frame) {
                Ok(msg) => Some(msg),
                Err(e) => {
                    tracing::debug!(error = %e, len = frame.len(), "Dropping undecodable frame");
                    None
                },
            })
            .collect()
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.borrow().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Close code once the socket has closed.
    pub fn close_code(&self) -> Option<Option<u16>> {
        match self.state() {
            ConnectionState::Closed(code) => Some(code),
            _ => None,
        }
    }
}

impl SocketHandle {
    pub fn on_open(&self) {
        self.shared.borrow_mut().state = ConnectionState::Open;
        tracing::debug!("Match socket open");
    }

    pub fn on_message(&self, data: Vec<u8>) {
        self.shared.borrow_mut().inbound.push(data);
    }

    pub fn on_close(&self, code: Option<u16>) {
        let mut shared = self.shared.borrow_mut();
        shared.state = ConnectionState::Closed(code);
        shared.outbound.clear();
        tracing::debug!(?code, "Match socket closed");
    }

    /// Frames waiting to be written. Only taken while the socket is open;
    /// anything queued earlier goes out on the first call after open.
    pub fn take_outbound(&self) -> Vec<Vec<u8>> {
        let mut shared = self.shared.borrow_mut();
        if shared.state != ConnectionState::Open {
            return Vec::new();
        }
        std::mem::take(&mut shared.outbound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumper_core::net::messages::{MoveAction, MovementInputMsg};
    use bumper_core::net::protocol::{decode_client_message, encode_server_message};

    #[test]
    fn outbound_waits_for_open() {
        let client = NetClient::new();
        let socket = client.socket_handle();
        let msg = ClientMessage::MovementInput(MovementInputMsg::new(
            MoveAction::MoveLeft,
            1,
            true,
            3,
        ));
        client.send(&msg).unwrap();
        assert!(socket.take_outbound().is_empty());

        socket.on_open();
        let frames = socket.take_outbound();
        assert_eq!(frames.len(), 1);
        assert_eq!(decode_client_message(&frames[0]).unwrap(), msg);
    }

    #[test]
    fn inbound_frames_drain_once() {
        let client = NetClient::new();
        let socket = client.socket_handle();
        socket.on_open();
        socket.on_message(encode_server_message(&ServerMessage::GameStarted).unwrap());
        socket.on_message(vec![0xEE]);

        let msgs = client.drain_decoded();
        assert_eq!(msgs, vec![ServerMessage::GameStarted]);
        assert!(client.drain_messages().is_empty());
    }

    #[test]
    fn send_after_close_fails() {
        let client = NetClient::new();
        let socket = client.socket_handle();
        socket.on_open();
        socket.on_close(Some(4000));
        assert!(!client.is_connected());
        assert_eq!(client.close_code(), Some(Some(4000)));
        let msg = ClientMessage::MovementInput(MovementInputMsg::new(
            MoveAction::MoveRight,
            1,
            true,
            3,
        ));
        assert!(matches!(client.send(&msg), Err(ClientError::Closed(Some(4000)))));
    }
}
