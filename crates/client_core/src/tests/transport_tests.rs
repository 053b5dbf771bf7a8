use std::time::Duration;

use super::*;
use shared::protocol::TypingSignal;
use tokio_tungstenite::accept_async;

#[tokio::test]
async fn connect_rejects_unknown_url_scheme() {
    let err = WsChannel::connect("ftp://example.com")
        .await
        .expect_err("must fail");
    assert!(err.to_string().contains("http:// or https://"));
}

#[tokio::test]
async fn emits_and_receives_json_text_frames() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");

    // Loopback peer: waits for the client's emission, answers with one event.
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = accept_async(stream).await.expect("handshake");
        let request = loop {
            if let WsMessage::Text(text) = ws.next().await.expect("frame").expect("frame") {
                break serde_json::from_str::<ClientRequest>(&text).expect("request");
            }
        };
        let event = ServerEvent::Typing(TypingSignal {
            room: "abc".into(),
            user: "owner1".into(),
            typing: true,
        });
        ws.send(WsMessage::Text(
            serde_json::to_string(&event).expect("serialize"),
        ))
        .await
        .expect("send");
        request
    });

    let channel = WsChannel::connect(&format!("http://{addr}"))
        .await
        .expect("connect");
    let mut inbound = channel.subscribe();

    channel
        .emit(ClientRequest::Join {
            room_id: "abc".into(),
        })
        .await
        .expect("emit");

    let received = tokio::time::timeout(Duration::from_secs(5), inbound.recv())
        .await
        .expect("timely")
        .expect("event");
    assert!(matches!(received, ServerEvent::Typing(_)));

    let request = server.await.expect("server");
    assert_eq!(
        request,
        ClientRequest::Join {
            room_id: "abc".into(),
        }
    );
    channel.close().await;
}
