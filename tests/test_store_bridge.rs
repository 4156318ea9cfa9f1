mod test_utils;

use flexi_logger::LoggerHandle;
use log::*;
use pvport::store::{env, NullStore, StatusCode, Store, StoreValue, TypedValue};

#[test]
fn test_store_bridge() {
    let mut log_handle = test_utils::init_logger();
    null_store_contract(&mut log_handle);
    null_store_through_the_trait_object(&mut log_handle);
    env_entries(&mut log_handle);
}

fn null_store_contract(_log_handle: &mut LoggerHandle) {
    info!("test the null store");
    let mut store = NullStore::new();

    assert!(store.supports_connections());
    assert!(store.supports_count());
    assert!(store.supports_delete());
    assert!(store.supports_threads());
    assert!(!store.supports_deliver());
    assert!(!store.supports_pull());
    assert!(!store.supports_subscribe());

    assert_eq!(store.connect(), StatusCode::Success);
    assert_eq!(store.use_charset("UTF-8"), StatusCode::Success);
    assert_eq!(store.put_env("KEY=VALUE"), StatusCode::Success);

    let tags = vec!["Point1".to_string(), "Point2".to_string()];
    let client_handles = [1, 2];
    let mut server_handles = [0; 2];
    let mut status_codes = [StatusCode::Unknown; 2];
    assert_eq!(
        store.exchange_handles(&tags, &client_handles, &mut server_handles, &mut status_codes),
        StatusCode::Success
    );
    assert_eq!(server_handles, client_handles);
    assert_eq!(status_codes, [StatusCode::Success; 2]);

    let records = [StoreValue::new(1, 0, TypedValue::from_double(1.5))];
    let mut status_codes = [StatusCode::Unknown; 1];
    assert_eq!(store.write(&records, &mut status_codes), StatusCode::Success);
    assert_eq!(status_codes, [StatusCode::Success]);

    let mut count = -1;
    assert_eq!(store.count(1, 0, i64::MAX, usize::MAX, &mut count), StatusCode::Success);
    assert_eq!(count, 0);

    let mut values = Vec::new();
    assert_eq!(store.read(1, 0, i64::MAX, 100, &mut values), StatusCode::Success);
    assert!(values.is_empty());
    assert_eq!(store.deliver(100, -1, &mut values), StatusCode::Unsupported);
    assert_eq!(
        store.subscribe(&server_handles, &mut status_codes),
        StatusCode::Unsupported
    );
    assert_eq!(StatusCode::Unsupported.code(), -1008);

    assert_eq!(store.get_quality_name(0), None);
    assert!(store.supported_value_type_codes().contains('q'));

    assert_eq!(store.disconnect(), StatusCode::Success);
}

fn null_store_through_the_trait_object(_log_handle: &mut LoggerHandle) {
    info!("test the callable vector as a trait object");
    let mut store: Box<dyn Store> = Box::new(NullStore::new());
    assert_eq!(store.connect(), StatusCode::Success);
    assert_eq!(store.interrupt(), StatusCode::Success);
    assert_eq!(store.disconnect(), StatusCode::Success);
}

fn env_entries(_log_handle: &mut LoggerHandle) {
    info!("test env entry parsing");
    assert_eq!(
        env::parse_env_entry("STORE_NAME=TheStore"),
        Some(("STORE_NAME", "TheStore"))
    );
    assert!(env::parse_bool_env_value(
        env::parse_env_entry("FLAG=yes").map(|(_, value)| value),
        false
    ));
}
