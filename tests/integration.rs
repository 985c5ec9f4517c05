use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, Duration};

use redlite::frame::Frame;
use redlite::server;

/// Boots a server on `port` and connects to it. Each test uses its own port
/// so they can run concurrently within the test binary.
async fn connect(port: u16) -> TcpStream {
    tokio::spawn(async move {
        let _ = server::run(port).await;
    });

    for _ in 0..50 {
        if let Ok(stream) = TcpStream::connect(("127.0.0.1", port)).await {
            return stream;
        }
        sleep(Duration::from_millis(10)).await;
    }

    panic!("server did not start on port {}", port);
}

fn request(parts: &[&[u8]]) -> Vec<u8> {
    Frame::Array(
        parts
            .iter()
            .map(|part| Frame::Bulk(Bytes::copy_from_slice(part)))
            .collect(),
    )
    .serialize()
}

async fn exchange(stream: &mut TcpStream, frame: &[u8], expected: &[u8]) {
    stream.write_all(frame).await.unwrap();

    let mut reply = vec![0u8; expected.len()];
    stream.read_exact(&mut reply).await.unwrap();

    assert_eq!(
        reply,
        expected,
        "reply {:?} != expected {:?}",
        String::from_utf8_lossy(&reply),
        String::from_utf8_lossy(expected)
    );
}

#[tokio::test]
async fn set_then_get() {
    let mut stream = connect(6390).await;

    exchange(&mut stream, &request(&[b"SET", b"foo", b"bar"]), b"+OK\r\n").await;
    exchange(&mut stream, &request(&[b"GET", b"foo"]), b"$3\r\nbar\r\n").await;
}

#[tokio::test]
async fn get_missing_key() {
    let mut stream = connect(6391).await;

    exchange(&mut stream, &request(&[b"GET", b"missing"]), b"$-1\r\n").await;
}

#[tokio::test]
async fn list_push_len_and_index() {
    let mut stream = connect(6392).await;

    exchange(
        &mut stream,
        &request(&[b"LPUSH", b"mylist", b"a", b"b", b"c"]),
        b":3\r\n",
    )
    .await;
    exchange(&mut stream, &request(&[b"LLEN", b"mylist"]), b":3\r\n").await;
    exchange(
        &mut stream,
        &request(&[b"LINDEX", b"mylist", b"0"]),
        b"$1\r\nc\r\n",
    )
    .await;
    exchange(
        &mut stream,
        &request(&[b"LINDEX", b"mylist", b"-1"]),
        b"$1\r\na\r\n",
    )
    .await;
    exchange(
        &mut stream,
        &request(&[b"LINDEX", b"mylist", b"5"]),
        b"-ERR index out of range\r\n",
    )
    .await;
    exchange(
        &mut stream,
        &request(&[b"LINDEX", b"mylist", b"notanumber"]),
        b"-ERR value is not an integer or out of range\r\n",
    )
    .await;
}

#[tokio::test]
async fn wrong_type_leaves_the_key_untouched() {
    let mut stream = connect(6393).await;

    exchange(&mut stream, &request(&[b"SET", b"k", b"v"]), b"+OK\r\n").await;
    exchange(
        &mut stream,
        &request(&[b"LPUSH", b"k", b"x"]),
        b"-ERR Operation against a key holding the wrong kind of value\r\n",
    )
    .await;
    exchange(&mut stream, &request(&[b"GET", b"k"]), b"$1\r\nv\r\n").await;
}

#[tokio::test]
async fn hash_set_and_get() {
    let mut stream = connect(6394).await;

    exchange(&mut stream, &request(&[b"HSET", b"h", b"f1", b"v1"]), b":1\r\n").await;
    exchange(&mut stream, &request(&[b"HSET", b"h", b"f1", b"v2"]), b":0\r\n").await;
    exchange(&mut stream, &request(&[b"HGET", b"h", b"f1"]), b"$2\r\nv2\r\n").await;
    exchange(&mut stream, &request(&[b"HGET", b"h", b"missing"]), b"$-1\r\n").await;
}

#[tokio::test]
async fn popping_the_last_element_removes_the_key() {
    let mut stream = connect(6395).await;

    exchange(&mut stream, &request(&[b"LPUSH", b"l", b"x"]), b":1\r\n").await;
    exchange(&mut stream, &request(&[b"LPOP", b"l"]), b"$1\r\nx\r\n").await;
    exchange(&mut stream, &request(&[b"LLEN", b"l"]), b":0\r\n").await;
    exchange(&mut stream, &request(&[b"LPOP", b"l"]), b"$-1\r\n").await;
}

#[tokio::test]
async fn binary_values_round_trip() {
    let mut stream = connect(6396).await;
    let value = b"\r\n\x00\xffbinary\r\n";

    exchange(&mut stream, &request(&[b"SET", b"bin", value]), b"+OK\r\n").await;

    let mut expected = format!("${}\r\n", value.len()).into_bytes();
    expected.extend_from_slice(value);
    expected.extend_from_slice(b"\r\n");

    exchange(&mut stream, &request(&[b"GET", b"bin"]), &expected).await;
}

#[tokio::test]
async fn pipelined_frames_get_ordered_replies() {
    let mut stream = connect(6397).await;

    // All three frames in a single write; the replies come back in order.
    let mut frames = Vec::new();
    frames.extend(request(&[b"SET", b"p", b"1"]));
    frames.extend(request(&[b"GET", b"p"]));
    frames.extend(request(&[b"GET", b"nope"]));

    exchange(&mut stream, &frames, b"+OK\r\n$1\r\n1\r\n$-1\r\n").await;
}

#[tokio::test]
async fn unknown_and_empty_commands_keep_the_connection_alive() {
    let mut stream = connect(6398).await;

    exchange(
        &mut stream,
        &request(&[b"FLUSHALL"]),
        b"-ERR unknown command 'flushall'\r\n",
    )
    .await;
    // An empty statement reports an empty command name.
    exchange(&mut stream, b"*0\r\n", b"-ERR unknown command ''\r\n").await;
    exchange(&mut stream, &request(&[b"SET", b"k", b"v"]), b"+OK\r\n").await;
}

#[tokio::test]
async fn arity_errors_keep_the_connection_alive() {
    let mut stream = connect(6399).await;

    exchange(
        &mut stream,
        &request(&[b"GET"]),
        b"-ERR wrong number of arguments for 'get' command\r\n",
    )
    .await;
    exchange(
        &mut stream,
        &request(&[b"SET", b"k", b"v", b"extra"]),
        b"-ERR wrong number of arguments for 'set' command\r\n",
    )
    .await;
    exchange(&mut stream, &request(&[b"GET", b"k"]), b"$-1\r\n").await;
}

#[tokio::test]
async fn malformed_frames_drop_the_connection() {
    let mut stream = connect(6400).await;

    stream.write_all(b"+PING\r\n").await.unwrap();

    // The server closes the socket without replying.
    let mut buffer = Vec::new();
    let read = stream.read_to_end(&mut buffer).await.unwrap();
    assert_eq!(read, 0);
}

#[tokio::test]
async fn concurrent_connections_share_the_store() {
    let mut first = connect(6401).await;
    let mut second = TcpStream::connect(("127.0.0.1", 6401)).await.unwrap();

    exchange(&mut first, &request(&[b"SET", b"shared", b"yes"]), b"+OK\r\n").await;
    exchange(&mut second, &request(&[b"GET", b"shared"]), b"$3\r\nyes\r\n").await;
}
