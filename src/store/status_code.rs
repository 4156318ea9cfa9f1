/// Status codes of the store-bridge operations.
///
/// Matches the host's own taxonomy: 0 is success, negative values are
/// failures.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[repr(i32)]
pub enum StatusCode {
    /// The operation succeeded.
    Success = 0,
    /// Unclassified failure.
    Unknown = -1001,
    /// A handle does not designate a known point.
    BadHandle = -1002,
    /// The operation failed.
    Failed = -1003,
    /// The operation was ignored.
    Ignored = -1004,
    /// The named point is unknown.
    PointUnknown = -1005,
    /// The operation is not allowed in the current state.
    IllegalState = -1006,
    /// The bridge is not connected.
    Disconnected = -1007,
    /// The operation is not supported by this implementation.
    Unsupported = -1008,
    /// The bridge cannot continue.
    Unrecoverable = -1009,
}

impl StatusCode {
    /// The numeric code.
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    /// The status for a numeric code, when it is part of the taxonomy.
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => Self::Success,
            -1001 => Self::Unknown,
            -1002 => Self::BadHandle,
            -1003 => Self::Failed,
            -1004 => Self::Ignored,
            -1005 => Self::PointUnknown,
            -1006 => Self::IllegalState,
            -1007 => Self::Disconnected,
            -1008 => Self::Unsupported,
            -1009 => Self::Unrecoverable,
            _ => return None,
        })
    }
}
