//! Console device
//!
//! Descriptor 0 reads from the keyboard one key at a time. Descriptor 1
//! writes to the display.
//!
//! # Security Considerations
//! - `putbuf` gets bytes already copied out of validated user memory
//! - Keyboard reads happen under the file-operation lock, so two processes
//!   reading the console never interleave their input

/// The system console.
pub trait Console: Sync {
    /// Wait for the next key and return it.
    fn getc(&self) -> u8;

    /// Write `buf` to the display in one piece, without interleaving with
    /// other `putbuf` calls.
    fn putbuf(&self, buf: &[u8]);
}

