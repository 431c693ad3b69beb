//! Connection state machine: state transitions, fragment reassembly, and the
//! per-frame rules. Purely synchronous; the connection runtime feeds it
//! inbound frames and acts on the outcomes.

use crate::error::{ProtocolViolation, WsError};
use crate::ws::frame::{Frame, Opcode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// A complete application message, after reassembly and UTF-8 validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Binary(Vec<u8>),
}

/// What the connection runtime should do after handing over a frame.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing; bookkeeping only.
    None,
    /// Deliver a complete message to the layer above.
    Message(Message),
    /// Enqueue a control reply (pong).
    Reply(Frame),
    /// The peer started the close handshake; echo this frame, after which
    /// the connection is done.
    PeerClose(Frame),
    /// The peer acknowledged the close we initiated; the connection is done.
    CloseAck,
}

struct Reassembly {
    opcode: Opcode,
    payload: Vec<u8>,
}

pub struct Protocol {
    state: State,
    reassembly: Option<Reassembly>,
    max_message_size: usize,
}

impl Protocol {
    /// A state machine for a connection whose handshake just completed.
    pub fn new(max_message_size: usize) -> Self {
        Protocol {
            state: State::Open,
            reassembly: None,
            max_message_size,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn max_message_size(&self) -> usize {
        self.max_message_size
    }

    /// Record that we initiated the close handshake.
    pub fn begin_close(&mut self) {
        if self.state == State::Open {
            self.state = State::Closing;
        }
    }

    pub fn on_frame(&mut self, frame: Frame) -> Result<Outcome, WsError> {
        // Server role: everything the client sends must be masked.
        if frame.mask.is_none() {
            return Err(ProtocolViolation::UnmaskedFrame.into());
        }
        match frame.opcode {
            Opcode::Ping => Ok(Outcome::Reply(Frame::pong(frame.payload))),
            Opcode::Pong => Ok(Outcome::None),
            Opcode::Close => match self.state {
                State::Open => {
                    self.state = State::Closing;
                    let echo = Frame {
                        fin: true,
                        opcode: Opcode::Close,
                        mask: None,
                        payload: frame.payload,
                    };
                    Ok(Outcome::PeerClose(echo))
                }
                State::Closing => {
                    self.state = State::Closed;
                    Ok(Outcome::CloseAck)
                }
                _ => Ok(Outcome::None),
            },
            Opcode::Text | Opcode::Binary => {
                if self.reassembly.is_some() {
                    return Err(ProtocolViolation::InterleavedMessage.into());
                }
                if frame.fin {
                    complete(frame.opcode, frame.payload).map(Outcome::Message)
                } else {
                    if frame.payload.len() > self.max_message_size {
                        return Err(WsError::MessageTooBig(self.max_message_size));
                    }
                    self.reassembly = Some(Reassembly {
                        opcode: frame.opcode,
                        payload: frame.payload,
                    });
                    Ok(Outcome::None)
                }
            }
            Opcode::Continuation => {
                let Some(mut buffer) = self.reassembly.take() else {
                    return Err(ProtocolViolation::StrayContinuation.into());
                };
                buffer.payload.extend_from_slice(&frame.payload);
                if buffer.payload.len() > self.max_message_size {
                    return Err(WsError::MessageTooBig(self.max_message_size));
                }
                if frame.fin {
                    complete(buffer.opcode, buffer.payload).map(Outcome::Message)
                } else {
                    self.reassembly = Some(buffer);
                    Ok(Outcome::None)
                }
            }
        }
    }
}

fn complete(opcode: Opcode, payload: Vec<u8>) -> Result<Message, WsError> {
    match opcode {
        Opcode::Text => String::from_utf8(payload)
            .map(Message::Text)
            .map_err(|_| WsError::InvalidUtf8),
        _ => Ok(Message::Binary(payload)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 4] = [7, 7, 7, 7];

    fn masked(fin: bool, opcode: Opcode, payload: &[u8]) -> Frame {
        Frame {
            fin,
            opcode,
            mask: Some(KEY),
            payload: payload.to_vec(),
        }
    }

    fn proto() -> Protocol {
        Protocol::new(1024)
    }

    #[test]
    fn single_text_frame_becomes_a_message() {
        let mut p = proto();
        let outcome = p.on_frame(masked(true, Opcode::Text, b"hi")).unwrap();
        assert_eq!(outcome, Outcome::Message(Message::Text("hi".into())));
    }

    #[test]
    fn fragments_reassemble_in_order() {
        let mut p = proto();
        assert_eq!(
            p.on_frame(masked(false, Opcode::Text, b"{\"hea")).unwrap(),
            Outcome::None
        );
        let outcome = p
            .on_frame(masked(true, Opcode::Continuation, b"der\":1}"))
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Message(Message::Text("{\"header\":1}".into()))
        );
    }

    #[test]
    fn ping_is_answered_with_matching_pong() {
        let mut p = proto();
        let outcome = p.on_frame(masked(true, Opcode::Ping, b"tok")).unwrap();
        let Outcome::Reply(pong) = outcome else {
            panic!("expected a reply");
        };
        assert_eq!(pong.opcode, Opcode::Pong);
        assert_eq!(pong.payload, b"tok");
        assert!(pong.mask.is_none());
    }

    #[test]
    fn pong_is_ignored() {
        let mut p = proto();
        assert_eq!(
            p.on_frame(masked(true, Opcode::Pong, b"")).unwrap(),
            Outcome::None
        );
    }

    #[test]
    fn peer_close_is_echoed() {
        let mut p = proto();
        let payload = 1000u16.to_be_bytes();
        let outcome = p.on_frame(masked(true, Opcode::Close, &payload)).unwrap();
        let Outcome::PeerClose(echo) = outcome else {
            panic!("expected an echo");
        };
        assert_eq!(echo.close_code(), Some(1000));
        assert_eq!(p.state(), State::Closing);
    }

    #[test]
    fn close_reply_completes_our_handshake() {
        let mut p = proto();
        p.begin_close();
        assert_eq!(p.state(), State::Closing);
        let payload = 1000u16.to_be_bytes();
        let outcome = p.on_frame(masked(true, Opcode::Close, &payload)).unwrap();
        assert_eq!(outcome, Outcome::CloseAck);
        assert_eq!(p.state(), State::Closed);
    }

    #[test]
    fn unmasked_client_frame_is_fatal() {
        let mut p = proto();
        let err = p.on_frame(Frame::text(b"nope".to_vec())).unwrap_err();
        assert!(matches!(
            err,
            WsError::Protocol(ProtocolViolation::UnmaskedFrame)
        ));
    }

    #[test]
    fn new_data_frame_during_reassembly_is_fatal() {
        let mut p = proto();
        p.on_frame(masked(false, Opcode::Text, b"a")).unwrap();
        let err = p.on_frame(masked(true, Opcode::Text, b"b")).unwrap_err();
        assert!(matches!(
            err,
            WsError::Protocol(ProtocolViolation::InterleavedMessage)
        ));
    }

    #[test]
    fn stray_continuation_is_fatal() {
        let mut p = proto();
        let err = p
            .on_frame(masked(true, Opcode::Continuation, b"x"))
            .unwrap_err();
        assert!(matches!(
            err,
            WsError::Protocol(ProtocolViolation::StrayContinuation)
        ));
    }

    #[test]
    fn invalid_utf8_text_is_fatal() {
        let mut p = proto();
        let err = p
            .on_frame(masked(true, Opcode::Text, &[0xFF, 0xFE]))
            .unwrap_err();
        assert!(matches!(err, WsError::InvalidUtf8));
        assert_eq!(err.close_code().as_u16(), 1007);
    }

    #[test]
    fn oversized_reassembly_is_fatal() {
        let mut p = proto();
        p.on_frame(masked(false, Opcode::Text, &[b'a'; 1000])).unwrap();
        let err = p
            .on_frame(masked(false, Opcode::Continuation, &[b'b'; 1000]))
            .unwrap_err();
        assert!(matches!(err, WsError::MessageTooBig(1024)));
        assert_eq!(err.close_code().as_u16(), 1009);
    }

    #[test]
    fn binary_messages_pass_through() {
        let mut p = proto();
        let outcome = p
            .on_frame(masked(true, Opcode::Binary, &[0, 159, 146, 150]))
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Message(Message::Binary(vec![0, 159, 146, 150]))
        );
    }
}
