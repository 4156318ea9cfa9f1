use crate::store::{Handle, Quality, StatusCode, Store, StoreValue};

/// The trivial store: accepts everything, stores nothing.
///
/// Handle exchange echoes the client handles, writes and deletes succeed
/// without effect, and the subscription operations are unsupported. Useful
/// as a stand-in implementation and for exercising the bridge contract.
#[derive(Debug, Default)]
pub struct NullStore;

impl NullStore {
    pub fn new() -> Self {
        Self
    }
}

impl Store for NullStore {
    fn use_charset(&mut self, _charset_name: &str) -> StatusCode {
        StatusCode::Success
    }

    fn put_env(&mut self, _entry: &str) -> StatusCode {
        StatusCode::Success
    }

    fn supports_connections(&self) -> bool {
        true
    }

    fn supports_count(&self) -> bool {
        true
    }

    fn supports_delete(&self) -> bool {
        true
    }

    fn supports_deliver(&self) -> bool {
        false
    }

    fn supports_pull(&self) -> bool {
        false
    }

    fn supports_subscribe(&self) -> bool {
        false
    }

    fn supports_threads(&self) -> bool {
        true
    }

    fn connect(&mut self) -> StatusCode {
        StatusCode::Success
    }

    fn disconnect(&mut self) -> StatusCode {
        StatusCode::Success
    }

    fn interrupt(&mut self) -> StatusCode {
        StatusCode::Success
    }

    fn exchange_handles(
        &mut self,
        _tags: &[String],
        client_handles: &[Handle],
        server_handles: &mut [Handle],
        status_codes: &mut [StatusCode],
    ) -> StatusCode {
        server_handles.copy_from_slice(client_handles);
        status_codes.fill(StatusCode::Success);
        StatusCode::Success
    }

    fn subscribe(
        &mut self,
        _server_handles: &[Handle],
        _status_codes: &mut [StatusCode],
    ) -> StatusCode {
        StatusCode::Unsupported
    }

    fn unsubscribe(
        &mut self,
        _server_handles: &[Handle],
        _status_codes: &mut [StatusCode],
    ) -> StatusCode {
        StatusCode::Unsupported
    }

    fn release_handles(
        &mut self,
        _server_handles: &[Handle],
        status_codes: &mut [StatusCode],
    ) -> StatusCode {
        status_codes.fill(StatusCode::Success);
        StatusCode::Success
    }

    fn deliver(
        &mut self,
        _limit: usize,
        _timeout: i64,
        _values: &mut Vec<StoreValue>,
    ) -> StatusCode {
        StatusCode::Unsupported
    }

    fn count(
        &mut self,
        _server_handle: Handle,
        _start_time: i64,
        _end_time: i64,
        _limit: usize,
        count: &mut i64,
    ) -> StatusCode {
        *count = 0;
        StatusCode::Success
    }

    fn read(
        &mut self,
        _server_handle: Handle,
        _start_time: i64,
        _end_time: i64,
        _limit: usize,
        _values: &mut Vec<StoreValue>,
    ) -> StatusCode {
        StatusCode::Success
    }

    fn write(&mut self, _values: &[StoreValue], status_codes: &mut [StatusCode]) -> StatusCode {
        status_codes.fill(StatusCode::Success);
        StatusCode::Success
    }

    fn delete(
        &mut self,
        _server_handles: &[Handle],
        _time_stamps: &[i64],
        status_codes: &mut [StatusCode],
    ) -> StatusCode {
        status_codes.fill(StatusCode::Success);
        StatusCode::Success
    }

    fn get_quality_name(&mut self, _quality_code: Quality) -> Option<String> {
        None
    }

    fn get_quality_code(
        &mut self,
        _quality_name: &str,
        _quality_code: &mut Quality,
    ) -> StatusCode {
        StatusCode::Unsupported
    }

    fn get_state_name(&mut self, _server_handle: Handle, _state_code: Quality) -> Option<String> {
        None
    }

    fn get_state_code(
        &mut self,
        _server_handle: Handle,
        _state_name: &str,
        _state_code: &mut Quality,
    ) -> StatusCode {
        StatusCode::Unsupported
    }

    fn supported_value_type_codes(&self) -> &str {
        "DIRzbacnxdfijm0orsqt"
    }
}
