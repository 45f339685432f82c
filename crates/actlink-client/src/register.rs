use actlink_frame::{Rw, NEGOTIATE_CMD};
use serde::Serialize;

/// Size of a request or response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldLen {
    Fixed(usize),
    /// Supplied by the caller per request.
    Variable,
}

/// Static metadata for one register: its command code and payload sizes.
///
/// A direction the register does not support is `None`. Descriptors are
/// plain `Copy` values, safe to share as constants across connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Descriptor {
    pub cmd: u8,
    pub read_req: Option<FieldLen>,
    pub read_resp: Option<FieldLen>,
    pub write_req: Option<FieldLen>,
    pub write_resp: Option<FieldLen>,
}

impl Descriptor {
    /// Adapter link negotiation: 7-byte argument, 1-byte acknowledgement.
    pub const NEGOTIATE: Self = Self::new(NEGOTIATE_CMD).read(7, 1);

    /// A register with no supported directions yet.
    pub const fn new(cmd: u8) -> Self {
        Self {
            cmd,
            read_req: None,
            read_resp: None,
            write_req: None,
            write_resp: None,
        }
    }

    pub const fn read(mut self, req: usize, resp: usize) -> Self {
        self.read_req = Some(FieldLen::Fixed(req));
        self.read_resp = Some(FieldLen::Fixed(resp));
        self
    }

    /// Readable with a response size known only at call time.
    pub const fn read_variable(mut self, req: usize) -> Self {
        self.read_req = Some(FieldLen::Fixed(req));
        self.read_resp = Some(FieldLen::Variable);
        self
    }

    pub const fn write(mut self, req: usize, resp: usize) -> Self {
        self.write_req = Some(FieldLen::Fixed(req));
        self.write_resp = Some(FieldLen::Fixed(resp));
        self
    }

    /// Writable with a request size known only at call time.
    pub const fn write_variable(mut self, resp: usize) -> Self {
        self.write_req = Some(FieldLen::Variable);
        self.write_resp = Some(FieldLen::Fixed(resp));
        self
    }

    pub const fn request_len(&self, rw: Rw) -> Option<FieldLen> {
        match rw {
            Rw::Read => self.read_req,
            Rw::Write => self.write_req,
        }
    }

    pub const fn response_len(&self, rw: Rw) -> Option<FieldLen> {
        match rw {
            Rw::Read => self.read_resp,
            Rw::Write => self.write_resp,
        }
    }
}
