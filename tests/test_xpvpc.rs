mod test_utils;

use flexi_logger::LoggerHandle;
use log::*;
use pvport::xpvpc::{Status, XpvpcClient};
use pvport::State;
use secstr::SecUtf8;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::JoinHandle;

#[test]
fn test_xpvpc() {
    let mut log_handle = test_utils::init_logger();
    state_machine_forbids_out_of_order_calls(&mut log_handle);
    round_trip(&mut log_handle);
    auto_flush(&mut log_handle);
    mismatched_id(&mut log_handle);
}

// An in-process acceptor: answers every complete document with
// `<done ref='N'/>`, echoing the id, except the one in `wrong_ack_for`.
struct Acceptor {
    port: u16,
    handle: JoinHandle<Vec<String>>,
}

fn spawn_acceptor(wrong_ack_for: Option<i64>) -> Acceptor {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = std::thread::spawn(move || run_acceptor(&listener, wrong_ack_for));
    Acceptor { port, handle }
}

fn run_acceptor(listener: &TcpListener, wrong_ack_for: Option<i64>) -> Vec<String> {
    let (mut socket, _) = listener.accept().unwrap();
    let mut documents = Vec::new();
    let mut pending = String::new();
    let mut bytes = [0_u8; 1024];

    loop {
        let count = match socket.read(&mut bytes) {
            Ok(0) | Err(_) => break,
            Ok(count) => count,
        };
        pending.push_str(&String::from_utf8_lossy(&bytes[..count]));

        while let Some(end) = document_end(&pending) {
            let document: String = pending.drain(..end).collect();
            let id = document_id(&document);
            let ack = if wrong_ack_for == Some(id) { id + 99 } else { id };
            if write!(socket, "<done ref='{ack}'/>\n").is_err() {
                return documents;
            }
            documents.push(document);
        }
    }

    documents
}

fn document_end(pending: &str) -> Option<usize> {
    if pending.starts_with("<login") {
        pending.find("/>\n").map(|index| index + "/>\n".len())
    } else if pending.starts_with("<messages") {
        pending
            .find("</messages>\n")
            .map(|index| index + "</messages>\n".len())
    } else {
        None
    }
}

fn document_id(document: &str) -> i64 {
    let start = document.find("id='").unwrap() + "id='".len();
    let end = document[start..].find('\'').unwrap() + start;
    document[start..end].parse().unwrap()
}

fn state_machine_forbids_out_of_order_calls(_log_handle: &mut LoggerHandle) {
    info!("test the session state machine");
    let password = SecUtf8::from("password");

    let mut client = XpvpcClient::new();
    assert_eq!(
        client.send_value("Point", "2020-01-01", None, Some("1")),
        Status::IllegalState
    );
    client.clear_error();
    assert_eq!(client.login("user", &password), Status::IllegalState);
    client.clear_error();
    assert_eq!(client.flush(), Status::IllegalState);
    client.clear_error();
    assert_eq!(client.close(), Status::Ok);
}

fn round_trip(_log_handle: &mut LoggerHandle) {
    info!("test a login and two batches against an echoing acceptor");
    let acceptor = spawn_acceptor(None);
    let password = SecUtf8::from("password");

    let mut client = XpvpcClient::new();
    client.set_client(Some("TEST"));
    assert_eq!(client.open(&format!(":{}", acceptor.port)), Status::Ok);
    assert_eq!(client.login("user", &password), Status::Ok);

    assert_eq!(
        client.send_value("Point1", "2006-01-01 01:00", None, Some("00.1234")),
        Status::Ok
    );
    assert_eq!(
        client.send_value(
            "Point1",
            "2006-01-01 02:00",
            Some(&State::from("good")),
            Some("05.6789"),
        ),
        Status::Ok
    );
    assert_eq!(client.flush(), Status::Ok);

    assert_eq!(
        client.send_value("Point1", "2006-01-01 02:00", Some(&State::Deleted), None),
        Status::Ok
    );
    assert_eq!(client.flush(), Status::Ok);
    assert_eq!(client.close(), Status::Ok);

    let documents = acceptor.handle.join().unwrap();
    assert_eq!(documents.len(), 3);

    assert_eq!(
        documents[0],
        "<login client='TEST' id='1' user='user' password='password'/>\n"
    );
    assert_eq!(
        documents[1],
        "<messages id='2' flush='yes'>\n \
         <point-value>\n  \
         <point>Point1</point>\n  \
         <stamp>2006-01-01 01:00</stamp>\n  \
         <value>00.1234</value>\n \
         </point-value>\n \
         <point-value>\n  \
         <point>Point1</point>\n  \
         <stamp>2006-01-01 02:00</stamp>\n  \
         <state>good</state>\n  \
         <value>05.6789</value>\n \
         </point-value>\n\
         </messages>\n"
    );
    assert_eq!(
        documents[2],
        "<messages id='3' flush='yes'>\n \
         <deleted-value>\n  \
         <point>Point1</point>\n  \
         <stamp>2006-01-01 02:00</stamp>\n \
         </deleted-value>\n\
         </messages>\n"
    );
}

fn auto_flush(_log_handle: &mut LoggerHandle) {
    info!("test the automatic flush threshold");
    let acceptor = spawn_acceptor(None);

    let mut client = XpvpcClient::new();
    client.set_auto_flush(2);
    assert_eq!(client.open(&format!(":{}", acceptor.port)), Status::Ok);

    assert_eq!(
        client.send_value("P", "2020-01-01", None, Some("1")),
        Status::Ok
    );
    // The second value reaches the threshold and flushes the batch.
    assert_eq!(
        client.send_value("P", "2020-01-02", None, Some("2")),
        Status::Ok
    );
    // A third value opens a new batch with the next id.
    assert_eq!(
        client.send_value("P", "2020-01-03", None, Some("3")),
        Status::Ok
    );
    assert_eq!(client.flush(), Status::Ok);
    assert_eq!(client.close(), Status::Ok);

    let documents = acceptor.handle.join().unwrap();
    assert_eq!(documents.len(), 2);
    assert!(documents[0].starts_with("<messages id='1' "));
    assert!(documents[1].starts_with("<messages id='2' "));
}

fn mismatched_id(_log_handle: &mut LoggerHandle) {
    info!("test a wrong acknowledgement id");
    let acceptor = spawn_acceptor(Some(1));

    let mut client = XpvpcClient::new();
    assert_eq!(client.open(&format!(":{}", acceptor.port)), Status::Ok);

    assert_eq!(
        client.send_value("P", "2020-01-01", None, Some("1")),
        Status::Ok
    );
    assert_eq!(client.flush(), Status::MismatchedId);

    // The failure is latched.
    assert_eq!(
        client.send_value("P", "2020-01-02", None, Some("2")),
        Status::MismatchedId
    );

    client.close();
    drop(client);
    drop(acceptor.handle);
}
