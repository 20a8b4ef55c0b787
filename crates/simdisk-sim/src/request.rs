use std::fmt;

use simdisk_time::VirtualTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoKind {
    Read,
    Write,
}

impl fmt::Display for IoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoKind::Read => f.write_str("read"),
            IoKind::Write => f.write_str("write"),
        }
    }
}

/// Device-unique request identifier, echoed back by [`crate::SimCallbacks::report_completion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Request record handed to the engine on arrival.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimRequest {
    pub id: RequestId,
    /// Virtual time the request arrived at the device.
    pub start: VirtualTime,
    pub kind: IoKind,
    /// Byte offset on the device.
    pub offset: u64,
    pub bytes: u64,
}

impl SimRequest {
    /// Byte offset one past the end of the request.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.bytes)
    }
}
