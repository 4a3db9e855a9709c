#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,

    /// Invalid CLI/config (bad flags, bad metrics path, inverted intervals, etc.).
    InvalidInput = 30,

    /// Internal/runtime error (bind failures, IO errors, signal setup).
    RuntimeError = 40,
}

impl ExitCode {
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}
