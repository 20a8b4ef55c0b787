bitflags::bitflags! {
    /// Flags passed through `open` to the backend.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct OpenFlags: u32 {
        /// Reject writes.
        const READ_ONLY = 1 << 0;
        /// Create the backing file if it does not exist.
        const CREATE = 1 << 1;
    }
}

impl OpenFlags {
    pub fn is_read_only(self) -> bool {
        self.contains(OpenFlags::READ_ONLY)
    }
}
