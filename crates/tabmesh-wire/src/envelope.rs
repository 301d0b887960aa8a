//! Envelope structure for the tabmesh wire format
//!
//! Envelope = [kind:1][session:8 LE][body]
//!
//! Bodies:
//! - `ping` / `pong`: empty
//! - `broadcast`: [will_wait:1][name len:2 LE][name utf8]
//! - `done`: [name len:2 LE][name utf8]
//! - `var`: [name len:2 LE][name utf8][value tag:1][value]
//!   where value is either [f64:8 LE] (tag 0) or [len:2 LE][utf8] (tag 1)
//!
//! The session field is the sender's identity; receivers discard envelopes
//! carrying their own session (the bus echoes every publish back to the
//! publisher).

use bytes::{Buf, BufMut, Bytes, BytesMut};

use tabmesh_core::{MeshError, MeshResult, SessionId, Value, MAX_NAME_LEN, MAX_TEXT_LEN};

/// Envelope header size in bytes (kind + session)
pub const ENVELOPE_HEADER_SIZE: usize = 9;

/// Envelope kind bytes
pub const KIND_PING: u8 = 0x01;
pub const KIND_PONG: u8 = 0x02;
pub const KIND_BROADCAST: u8 = 0x03;
pub const KIND_DONE: u8 = 0x04;
pub const KIND_VAR: u8 = 0x05;

const VALUE_TAG_NUM: u8 = 0x00;
const VALUE_TAG_TEXT: u8 = 0x01;

/// Envelope body, tagged by kind
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    /// Presence probe
    Ping,
    /// Presence reply
    Pong,
    /// Fire a named event on every receiver
    Broadcast { name: String, will_wait: bool },
    /// Acknowledge that local reaction to a wait-broadcast finished
    Done { name: String },
    /// Replicate a variable write
    Var { name: String, value: Value },
}

/// A complete wire envelope
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    /// Sender's session identity
    pub session: SessionId,
    /// Payload
    pub body: Body,
}

impl Envelope {
    pub fn ping(session: SessionId) -> Self {
        Envelope {
            session,
            body: Body::Ping,
        }
    }

    pub fn pong(session: SessionId) -> Self {
        Envelope {
            session,
            body: Body::Pong,
        }
    }

    pub fn broadcast(session: SessionId, name: impl Into<String>, will_wait: bool) -> Self {
        Envelope {
            session,
            body: Body::Broadcast {
                name: name.into(),
                will_wait,
            },
        }
    }

    pub fn done(session: SessionId, name: impl Into<String>) -> Self {
        Envelope {
            session,
            body: Body::Done { name: name.into() },
        }
    }

    pub fn var(session: SessionId, name: impl Into<String>, value: Value) -> Self {
        Envelope {
            session,
            body: Body::Var {
                name: name.into(),
                value,
            },
        }
    }

    /// Kind byte for this envelope's body
    #[inline]
    pub fn kind(&self) -> u8 {
        match &self.body {
            Body::Ping => KIND_PING,
            Body::Pong => KIND_PONG,
            Body::Broadcast { .. } => KIND_BROADCAST,
            Body::Done { .. } => KIND_DONE,
            Body::Var { .. } => KIND_VAR,
        }
    }

    /// Serialize the envelope to bytes
    pub fn encode(&self) -> MeshResult<Bytes> {
        let mut buf = BytesMut::with_capacity(ENVELOPE_HEADER_SIZE + 16);
        buf.put_u8(self.kind());
        buf.put_u64_le(self.session.0);

        match &self.body {
            Body::Ping | Body::Pong => {}
            Body::Broadcast { name, will_wait } => {
                buf.put_u8(u8::from(*will_wait));
                put_name(&mut buf, name)?;
            }
            Body::Done { name } => {
                put_name(&mut buf, name)?;
            }
            Body::Var { name, value } => {
                put_name(&mut buf, name)?;
                match value {
                    Value::Num(n) => {
                        buf.put_u8(VALUE_TAG_NUM);
                        buf.put_f64_le(*n);
                    }
                    Value::Text(s) => {
                        if s.len() > MAX_TEXT_LEN {
                            return Err(MeshError::TextTooLong(s.len()));
                        }
                        buf.put_u8(VALUE_TAG_TEXT);
                        buf.put_u16_le(s.len() as u16);
                        buf.put_slice(s.as_bytes());
                    }
                }
            }
        }

        Ok(buf.freeze())
    }

    /// Parse an envelope from bytes
    pub fn parse(mut buf: &[u8]) -> MeshResult<Self> {
        if buf.len() < ENVELOPE_HEADER_SIZE {
            return Err(MeshError::BufferTooShort {
                expected: ENVELOPE_HEADER_SIZE,
                actual: buf.len(),
            });
        }

        let kind = buf.get_u8();
        let session = SessionId::new(buf.get_u64_le());

        let body = match kind {
            KIND_PING => Body::Ping,
            KIND_PONG => Body::Pong,
            KIND_BROADCAST => {
                let will_wait = get_u8(&mut buf)? != 0;
                let name = get_name(&mut buf)?;
                Body::Broadcast { name, will_wait }
            }
            KIND_DONE => {
                let name = get_name(&mut buf)?;
                Body::Done { name }
            }
            KIND_VAR => {
                let name = get_name(&mut buf)?;
                let value = match get_u8(&mut buf)? {
                    VALUE_TAG_NUM => {
                        if buf.remaining() < 8 {
                            return Err(MeshError::BufferTooShort {
                                expected: 8,
                                actual: buf.remaining(),
                            });
                        }
                        Value::Num(buf.get_f64_le())
                    }
                    VALUE_TAG_TEXT => Value::Text(get_string(&mut buf, MAX_TEXT_LEN)?),
                    tag => {
                        return Err(MeshError::InvalidWireFormat(format!(
                            "Unknown value tag: {}",
                            tag
                        )))
                    }
                };
                Body::Var { name, value }
            }
            other => return Err(MeshError::UnknownEnvelopeKind(other)),
        };

        if buf.has_remaining() {
            return Err(MeshError::InvalidWireFormat(format!(
                "{} trailing bytes",
                buf.remaining()
            )));
        }

        Ok(Envelope { session, body })
    }
}

fn put_name(buf: &mut BytesMut, name: &str) -> MeshResult<()> {
    if name.len() > MAX_NAME_LEN {
        return Err(MeshError::NameTooLong(name.len()));
    }
    buf.put_u16_le(name.len() as u16);
    buf.put_slice(name.as_bytes());
    Ok(())
}

fn get_u8(buf: &mut &[u8]) -> MeshResult<u8> {
    if !buf.has_remaining() {
        return Err(MeshError::BufferTooShort {
            expected: 1,
            actual: 0,
        });
    }
    Ok(buf.get_u8())
}

fn get_name(buf: &mut &[u8]) -> MeshResult<String> {
    get_string(buf, MAX_NAME_LEN)
}

fn get_string(buf: &mut &[u8], max: usize) -> MeshResult<String> {
    if buf.remaining() < 2 {
        return Err(MeshError::BufferTooShort {
            expected: 2,
            actual: buf.remaining(),
        });
    }
    let len = buf.get_u16_le() as usize;
    if len > max {
        return Err(MeshError::NameTooLong(len));
    }
    if buf.remaining() < len {
        return Err(MeshError::BufferTooShort {
            expected: len,
            actual: buf.remaining(),
        });
    }
    let raw = buf[..len].to_vec();
    buf.advance(len);
    String::from_utf8(raw).map_err(|_| MeshError::InvalidWireFormat("Name not UTF-8".into()))
}
