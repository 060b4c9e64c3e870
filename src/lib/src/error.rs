/// The ECCX08 driver error type.
///
/// Transport-level failures (`WakeFailure`, `FramingMismatch`,
/// `BusTransactionFailure`) leave no state behind and may be retried by the
/// caller. `AuthenticationFailure` means the data must not be trusted.
#[derive(Debug, thiserror::Error)]
pub enum EccError {
    #[error("Device did not acknowledge wake")]
    WakeFailure,

    #[error("Response framing mismatch: {0}")]
    FramingMismatch(String),

    #[error("Bus transaction failed: {0}")]
    BusTransactionFailure(String),

    #[error("Device returned status 0x{0:02x}")]
    DeviceStatusError(u8),

    #[error("Authentication tag mismatch")]
    AuthenticationFailure,

    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("Unsupported device revision 0x{0:08x}")]
    UnsupportedDevice(u32),

    #[error("Internal error: [{0}]")]
    InternalError(String),
}

impl EccError {
    /// Whether re-issuing the same logical operation may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EccError::WakeFailure
                | EccError::FramingMismatch(_)
                | EccError::BusTransactionFailure(_)
        )
    }
}
