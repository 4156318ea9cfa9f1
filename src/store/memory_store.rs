use crate::store::{env, Handle, HandlesMap, Quality, StatusCode, Store, StoreValue};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::num::NonZeroI32;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// An in-memory store.
///
/// Values live in per-point ordered series; subscribed points feed a
/// delivery queue that [`deliver`](Store::deliver) drains, blocking up to
/// its timeout. The store declares
/// [`supports_connections`](Store::supports_connections): every caller owns
/// a [`connection`](Self::connection), all connections share the content,
/// and [`interrupt`](Store::interrupt) on any connection wakes a blocked
/// `deliver` on another.
///
/// Values handed back by `read` and `deliver` carry the caller's client
/// handle when one was registered through
/// [`exchange_handles`](Store::exchange_handles).
#[derive(Debug)]
pub struct MemoryStore {
    shared: Arc<Shared>,
    connected: bool,
}

#[derive(Debug)]
struct Shared {
    content: Mutex<Content>,
    wakeup: Condvar,
}

#[derive(Debug, Default)]
struct Content {
    tags: HashMap<String, Handle>,
    client_handles: HandlesMap,
    next_handle: Handle,
    series: HashMap<Handle, BTreeMap<i64, StoreValue>>,
    subscriptions: HashSet<Handle>,
    queue: VecDeque<StoreValue>,
    interrupted: bool,
    env: HashMap<String, String>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                content: Mutex::new(Content::default()),
                wakeup: Condvar::new(),
            }),
            connected: false,
        }
    }

    /// A new connection sharing this store's content.
    pub fn connection(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            connected: false,
        }
    }

    fn content(&self) -> MutexGuard<'_, Content> {
        self.shared
            .content
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Content {
    fn handle_for_tag(&mut self, tag: &str) -> Handle {
        if let Some(handle) = self.tags.get(tag) {
            return *handle;
        }
        self.next_handle += 1;
        self.tags.insert(tag.to_string(), self.next_handle);
        self.next_handle
    }

    // The handle a delivered value should carry: the caller's client handle
    // when registered, the server handle otherwise.
    fn outgoing(&self, value: &StoreValue) -> StoreValue {
        let mut value = value.clone();
        if let Some(client_handle) = self.client_handles.get(value.handle) {
            value.handle = client_handle.get();
        }
        value
    }

    fn enqueue(&mut self, value: StoreValue) {
        let value = self.outgoing(&value);
        self.queue.push_back(value);
    }
}

impl Store for MemoryStore {
    fn use_charset(&mut self, charset_name: &str) -> StatusCode {
        if charset_name.eq_ignore_ascii_case("UTF-8") || charset_name.eq_ignore_ascii_case("UTF8")
        {
            StatusCode::Success
        } else {
            StatusCode::Unsupported
        }
    }

    fn put_env(&mut self, entry: &str) -> StatusCode {
        match env::parse_env_entry(entry) {
            Some((key, value)) => {
                self.content().env.insert(key.to_string(), value.to_string());
                StatusCode::Success
            }
            None => StatusCode::Failed,
        }
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
        true
    }

    fn supports_pull(&self) -> bool {
        false
    }

    fn supports_subscribe(&self) -> bool {
        true
    }

    fn supports_threads(&self) -> bool {
        true
    }

    fn connect(&mut self) -> StatusCode {
        self.connected = true;
        StatusCode::Success
    }

    fn disconnect(&mut self) -> StatusCode {
        self.connected = false;
        StatusCode::Success
    }

    fn interrupt(&mut self) -> StatusCode {
        self.content().interrupted = true;
        self.shared.wakeup.notify_all();
        StatusCode::Success
    }

    fn exchange_handles(
        &mut self,
        tags: &[String],
        client_handles: &[Handle],
        server_handles: &mut [Handle],
        status_codes: &mut [StatusCode],
    ) -> StatusCode {
        if !self.connected {
            return StatusCode::Disconnected;
        }

        let mut content = self.content();
        for (index, tag) in tags.iter().enumerate() {
            let server_handle = content.handle_for_tag(tag);
            server_handles[index] = server_handle;
            status_codes[index] = StatusCode::Success;

            let server = NonZeroI32::new(server_handle);
            let client = client_handles.get(index).and_then(|h| NonZeroI32::new(*h));
            if let (Some(server), Some(client)) = (server, client) {
                content.client_handles.put(server, client);
            }
        }
        StatusCode::Success
    }

    fn subscribe(
        &mut self,
        server_handles: &[Handle],
        status_codes: &mut [StatusCode],
    ) -> StatusCode {
        if !self.connected {
            return StatusCode::Disconnected;
        }

        let mut content = self.content();
        for (index, server_handle) in server_handles.iter().enumerate() {
            status_codes[index] = if *server_handle == 0 {
                StatusCode::BadHandle
            } else {
                content.subscriptions.insert(*server_handle);
                StatusCode::Success
            };
        }
        StatusCode::Success
    }

    fn unsubscribe(
        &mut self,
        server_handles: &[Handle],
        status_codes: &mut [StatusCode],
    ) -> StatusCode {
        if !self.connected {
            return StatusCode::Disconnected;
        }

        let mut content = self.content();
        for (index, server_handle) in server_handles.iter().enumerate() {
            status_codes[index] = if content.subscriptions.remove(server_handle) {
                StatusCode::Success
            } else {
                StatusCode::Ignored
            };
        }
        StatusCode::Success
    }

    fn release_handles(
        &mut self,
        server_handles: &[Handle],
        status_codes: &mut [StatusCode],
    ) -> StatusCode {
        let mut content = self.content();
        for (index, server_handle) in server_handles.iter().enumerate() {
            content.subscriptions.remove(server_handle);
            content.client_handles.remove(*server_handle);
            status_codes[index] = StatusCode::Success;
        }
        StatusCode::Success
    }

    fn deliver(&mut self, limit: usize, timeout: i64, values: &mut Vec<StoreValue>) -> StatusCode {
        if !self.connected {
            return StatusCode::Disconnected;
        }

        let deadline =
            (timeout >= 0).then(|| Instant::now() + Duration::from_millis(timeout.unsigned_abs()));
        let mut content = self.content();

        loop {
            if content.interrupted {
                content.interrupted = false;
                return StatusCode::Ignored;
            }

            if !content.queue.is_empty() {
                let count = if limit == 0 {
                    content.queue.len()
                } else {
                    limit.min(content.queue.len())
                };
                values.extend(content.queue.drain(..count));
                return StatusCode::Success;
            }

            content = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return StatusCode::Success;
                    }
                    let (content, _) = self
                        .shared
                        .wakeup
                        .wait_timeout(content, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner);
                    content
                }
                None => self
                    .shared
                    .wakeup
                    .wait(content)
                    .unwrap_or_else(PoisonError::into_inner),
            };
        }
    }

    fn count(
        &mut self,
        server_handle: Handle,
        start_time: i64,
        end_time: i64,
        limit: usize,
        count: &mut i64,
    ) -> StatusCode {
        if !self.connected {
            return StatusCode::Disconnected;
        }

        let content = self.content();
        let in_range = content
            .series
            .get(&server_handle)
            .map_or(0, |series| series.range(start_time..=end_time).count());
        let in_range = if limit == 0 { in_range } else { in_range.min(limit) };
        *count = i64::try_from(in_range).unwrap_or(i64::MAX);
        StatusCode::Success
    }

    fn read(
        &mut self,
        server_handle: Handle,
        start_time: i64,
        end_time: i64,
        limit: usize,
        values: &mut Vec<StoreValue>,
    ) -> StatusCode {
        if !self.connected {
            return StatusCode::Disconnected;
        }

        let content = self.content();
        if let Some(series) = content.series.get(&server_handle) {
            for (index, (_, value)) in series.range(start_time..=end_time).enumerate() {
                if limit != 0 && index >= limit {
                    break;
                }
                values.push(content.outgoing(value));
            }
        }
        StatusCode::Success
    }

    fn write(&mut self, values: &[StoreValue], status_codes: &mut [StatusCode]) -> StatusCode {
        if !self.connected {
            return StatusCode::Disconnected;
        }

        let mut content = self.content();
        let mut notify = false;
        for (index, value) in values.iter().enumerate() {
            if value.handle == 0 {
                status_codes[index] = StatusCode::BadHandle;
                continue;
            }

            if value.deleted {
                content
                    .series
                    .entry(value.handle)
                    .or_default()
                    .remove(&value.stamp);
            } else {
                content
                    .series
                    .entry(value.handle)
                    .or_default()
                    .insert(value.stamp, value.clone());
            }

            if content.subscriptions.contains(&value.handle) {
                content.enqueue(value.clone());
                notify = true;
            }
            status_codes[index] = StatusCode::Success;
        }
        drop(content);

        if notify {
            self.shared.wakeup.notify_all();
        }
        StatusCode::Success
    }

    fn delete(
        &mut self,
        server_handles: &[Handle],
        time_stamps: &[i64],
        status_codes: &mut [StatusCode],
    ) -> StatusCode {
        if !self.connected {
            return StatusCode::Disconnected;
        }

        let mut content = self.content();
        let mut notify = false;
        for (index, (server_handle, stamp)) in
            server_handles.iter().zip(time_stamps.iter()).enumerate()
        {
            let removed = content
                .series
                .get_mut(server_handle)
                .and_then(|series| series.remove(stamp))
                .is_some();
            status_codes[index] = if removed {
                StatusCode::Success
            } else {
                StatusCode::Ignored
            };

            if removed && content.subscriptions.contains(server_handle) {
                content.enqueue(StoreValue::deleted(*server_handle, *stamp));
                notify = true;
            }
        }
        drop(content);

        if notify {
            self.shared.wakeup.notify_all();
        }
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
        "abcdfijoqstz"
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryStore;
    use crate::store::{StatusCode, Store, StoreValue, TypedValue};

    fn connected() -> MemoryStore {
        let mut store = MemoryStore::new();
        assert_eq!(store.connect(), StatusCode::Success);
        store
    }

    fn exchange(store: &mut MemoryStore, tags: &[&str], client_handles: &[i32]) -> Vec<i32> {
        let tags: Vec<String> = tags.iter().map(ToString::to_string).collect();
        let mut server_handles = vec![0; tags.len()];
        let mut status_codes = vec![StatusCode::Unknown; tags.len()];
        assert_eq!(
            store.exchange_handles(&tags, client_handles, &mut server_handles, &mut status_codes),
            StatusCode::Success
        );
        assert!(status_codes.iter().all(|status| status.is_success()));
        server_handles
    }

    #[test]
    fn operations_require_a_connection() {
        let mut store = MemoryStore::new();
        let mut values = Vec::new();
        assert_eq!(store.read(1, 0, 10, 0, &mut values), StatusCode::Disconnected);
        store.connect();
        assert_eq!(store.read(1, 0, 10, 0, &mut values), StatusCode::Success);
    }

    #[test]
    fn tags_resolve_to_stable_handles() {
        let mut store = connected();
        let first = exchange(&mut store, &["P1", "P2"], &[11, 12]);
        let second = exchange(&mut store, &["P2", "P1"], &[12, 11]);
        assert_eq!(first[0], second[1]);
        assert_eq!(first[1], second[0]);
    }

    #[test]
    fn written_values_can_be_counted_read_and_deleted() {
        let mut store = connected();
        let handles = exchange(&mut store, &["P1"], &[7]);
        let handle = handles[0];

        let records = [
            StoreValue::new(handle, 1000, TypedValue::from_double(1.0)),
            StoreValue::new(handle, 2000, TypedValue::from_double(2.0)),
            StoreValue::new(handle, 3000, TypedValue::from_double(3.0)),
        ];
        let mut status_codes = [StatusCode::Unknown; 3];
        assert_eq!(store.write(&records, &mut status_codes), StatusCode::Success);

        let mut count = 0;
        store.count(handle, 0, 10_000, 0, &mut count);
        assert_eq!(count, 3);
        store.count(handle, 1500, 10_000, 0, &mut count);
        assert_eq!(count, 2);
        store.count(handle, 0, 10_000, 1, &mut count);
        assert_eq!(count, 1);

        let mut values = Vec::new();
        store.read(handle, 0, 10_000, 0, &mut values);
        assert_eq!(values.len(), 3);
        // Handles are translated back to the caller's client handle.
        assert!(values.iter().all(|value| value.handle == 7));
        assert_eq!(values[0].stamp, 1000);
        assert_eq!(values[2].stamp, 3000);

        let mut status_codes = [StatusCode::Unknown; 1];
        assert_eq!(
            store.delete(&[handle], &[2000], &mut status_codes),
            StatusCode::Success
        );
        assert_eq!(status_codes, [StatusCode::Success]);
        store.count(handle, 0, 10_000, 0, &mut count);
        assert_eq!(count, 2);

        // Deleting what is not there is ignored.
        store.delete(&[handle], &[2000], &mut status_codes);
        assert_eq!(status_codes, [StatusCode::Ignored]);
    }

    #[test]
    fn deliver_blocks_until_a_subscribed_write() {
        let mut reader = connected();
        let handles = exchange(&mut reader, &["P1"], &[42]);
        let handle = handles[0];

        let mut status_codes = [StatusCode::Unknown; 1];
        assert_eq!(
            reader.subscribe(&handles, &mut status_codes),
            StatusCode::Success
        );

        let mut writer = reader.connection();
        let written = StoreValue::new(handle, 1000, TypedValue::from_long(5));
        let to_write = written.clone();
        let thread = std::thread::spawn(move || {
            writer.connect();
            std::thread::sleep(std::time::Duration::from_millis(20));
            let mut status_codes = [StatusCode::Unknown; 1];
            writer.write(&[to_write], &mut status_codes);
        });

        let mut values = Vec::new();
        assert_eq!(reader.deliver(0, -1, &mut values), StatusCode::Success);
        thread.join().unwrap();

        assert_eq!(values.len(), 1);
        assert_eq!(values[0].handle, 42);
        assert_eq!(values[0].stamp, written.stamp);
    }

    #[test]
    fn deliver_times_out_empty() {
        let mut store = connected();
        let mut values = Vec::new();
        assert_eq!(store.deliver(0, 10, &mut values), StatusCode::Success);
        assert!(values.is_empty());
    }

    #[test]
    fn interrupt_wakes_a_blocked_deliver() {
        let mut reader = connected();
        let mut other = reader.connection();
        let thread = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            other.interrupt();
        });

        let mut values = Vec::new();
        assert_eq!(reader.deliver(0, -1, &mut values), StatusCode::Ignored);
        assert!(values.is_empty());
        thread.join().unwrap();
    }

    #[test]
    fn unsubscribed_points_do_not_feed_the_queue() {
        let mut store = connected();
        let handles = exchange(&mut store, &["P1"], &[1]);

        let mut status_codes = [StatusCode::Unknown; 1];
        store.write(
            &[StoreValue::new(handles[0], 1, TypedValue::from_long(1))],
            &mut status_codes,
        );

        let mut values = Vec::new();
        assert_eq!(store.deliver(0, 0, &mut values), StatusCode::Success);
        assert!(values.is_empty());
    }

    #[test]
    fn charset_and_env_entries() {
        let mut store = MemoryStore::new();
        assert_eq!(store.use_charset("utf-8"), StatusCode::Success);
        assert_eq!(store.use_charset("latin-1"), StatusCode::Unsupported);
        assert_eq!(store.put_env("STORE_NAME=memory"), StatusCode::Success);
        assert_eq!(store.put_env("missing an equals"), StatusCode::Failed);
    }
}
