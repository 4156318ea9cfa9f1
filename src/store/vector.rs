use crate::store::{StatusCode, StoreValue};

/// Server-side handle of a point.
pub type Handle = i32;

/// Time stamp, in milliseconds.
pub type Stamp = i64;

/// Quality or state code.
pub type Quality = i32;

/// The callable vector adapting a storage runtime to native callers.
///
/// Per-item operations fill their `status_codes` out-slice, one entry per
/// input, in addition to the overall return code; the slices are
/// caller-sized to the input length. Implementations may be invoked from
/// multiple threads and must either be internally consistent or declare
/// [`supports_connections`](Self::supports_connections) so that each caller
/// owns a connection.
///
/// The vector's `freeValues` and `dispose` entries are subsumed here by
/// ownership of the returned values and by `Drop`.
pub trait Store: Send {
    /// Selects the charset for strings crossing the bridge.
    fn use_charset(&mut self, charset_name: &str) -> StatusCode;

    /// Hands a `"KEY=VALUE"` environment entry to the implementation.
    fn put_env(&mut self, entry: &str) -> StatusCode;

    fn supports_connections(&self) -> bool;
    fn supports_count(&self) -> bool;
    fn supports_delete(&self) -> bool;
    fn supports_deliver(&self) -> bool;
    fn supports_pull(&self) -> bool;
    fn supports_subscribe(&self) -> bool;
    fn supports_threads(&self) -> bool;

    fn connect(&mut self) -> StatusCode;

    fn disconnect(&mut self) -> StatusCode;

    /// Causes any in-flight blocking call on this context to return promptly
    /// with a non-success status.
    fn interrupt(&mut self) -> StatusCode;

    /// Resolves point tags to server handles, registering the caller's
    /// client handles.
    fn exchange_handles(
        &mut self,
        tags: &[String],
        client_handles: &[Handle],
        server_handles: &mut [Handle],
        status_codes: &mut [StatusCode],
    ) -> StatusCode;

    fn subscribe(&mut self, server_handles: &[Handle], status_codes: &mut [StatusCode])
        -> StatusCode;

    fn unsubscribe(
        &mut self,
        server_handles: &[Handle],
        status_codes: &mut [StatusCode],
    ) -> StatusCode;

    fn release_handles(
        &mut self,
        server_handles: &[Handle],
        status_codes: &mut [StatusCode],
    ) -> StatusCode;

    /// Waits for subscribed values; `timeout` is in milliseconds, negative
    /// meaning infinite. Delivered values are appended to `values`, at most
    /// `limit` of them.
    fn deliver(&mut self, limit: usize, timeout: i64, values: &mut Vec<StoreValue>) -> StatusCode;

    /// Counts the values of a point within `[start_time, end_time]`.
    fn count(
        &mut self,
        server_handle: Handle,
        start_time: Stamp,
        end_time: Stamp,
        limit: usize,
        count: &mut i64,
    ) -> StatusCode;

    /// Reads the values of a point within `[start_time, end_time]`,
    /// appending them to `values`, at most `limit` of them.
    fn read(
        &mut self,
        server_handle: Handle,
        start_time: Stamp,
        end_time: Stamp,
        limit: usize,
        values: &mut Vec<StoreValue>,
    ) -> StatusCode;

    fn write(&mut self, values: &[StoreValue], status_codes: &mut [StatusCode]) -> StatusCode;

    fn delete(
        &mut self,
        server_handles: &[Handle],
        time_stamps: &[Stamp],
        status_codes: &mut [StatusCode],
    ) -> StatusCode;

    fn get_quality_name(&mut self, quality_code: Quality) -> Option<String>;

    fn get_quality_code(&mut self, quality_name: &str, quality_code: &mut Quality) -> StatusCode;

    fn get_state_name(&mut self, server_handle: Handle, state_code: Quality) -> Option<String>;

    fn get_state_code(
        &mut self,
        server_handle: Handle,
        state_name: &str,
        state_code: &mut Quality,
    ) -> StatusCode;

    /// The value type codes this implementation accepts.
    fn supported_value_type_codes(&self) -> &str;
}
