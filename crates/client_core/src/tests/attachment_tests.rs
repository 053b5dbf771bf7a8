use super::*;
use chrono::TimeZone;

#[test]
fn encode_bytes_builds_a_self_describing_data_uri() {
    let uri = encode_bytes(&[1, 2, 3], "image/png");
    assert_eq!(uri, "data:image/png;base64,AQID");
}

#[tokio::test]
async fn encode_file_reads_and_encodes_one_image() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("pic.png");
    tokio::fs::write(&path, [1u8, 2, 3]).await.expect("write");

    let uri = encode_file(&path).await.expect("encode");
    assert_eq!(uri, "data:image/png;base64,AQID");
}

#[tokio::test]
async fn encode_file_rejects_non_image_extensions() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("notes.txt");
    tokio::fs::write(&path, b"hello").await.expect("write");

    let err = encode_file(&path).await.expect_err("must fail");
    assert!(matches!(err, AttachmentError::UnsupportedType(ext) if ext == "txt"));
}

#[tokio::test]
async fn encode_file_surfaces_read_failures() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("missing.png");

    let err = encode_file(&path).await.expect_err("must fail");
    assert!(matches!(err, AttachmentError::Read { .. }));
}

#[test]
fn decode_names_the_artifact_from_the_timestamp() {
    let timestamp = chrono::Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let artifact = decode("data:image/png;base64,AQID", timestamp).expect("decode");
    assert_eq!(
        artifact.filename,
        format!("image_{}.png", timestamp.timestamp_millis())
    );
    assert_eq!(artifact.mime, "image/png");
    assert_eq!(artifact.bytes, vec![1, 2, 3]);
}

#[test]
fn decode_maps_mime_to_extension() {
    let timestamp = chrono::Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let artifact = decode("data:image/jpeg;base64,AQID", timestamp).expect("decode");
    assert!(artifact.filename.ends_with(".jpg"));
}

#[test]
fn decode_rejects_malformed_input() {
    let timestamp = chrono::Utc::now();
    assert!(matches!(
        decode("image/png;base64,AQID", timestamp),
        Err(AttachmentError::MalformedDataUri)
    ));
    assert!(matches!(
        decode("data:image/png,AQID", timestamp),
        Err(AttachmentError::MalformedDataUri)
    ));
    assert!(matches!(
        decode("data:;base64,AQID", timestamp),
        Err(AttachmentError::MalformedDataUri)
    ));
    assert!(matches!(
        decode("data:image/png;base64,!!!", timestamp),
        Err(AttachmentError::Payload(_))
    ));
}

#[test]
fn encode_then_decode_round_trips_payload_bytes() {
    let bytes = vec![0u8, 255, 128, 7];
    let uri = encode_bytes(&bytes, "image/webp");
    let artifact = decode(&uri, chrono::Utc::now()).expect("decode");
    assert_eq!(artifact.bytes, bytes);
    assert_eq!(artifact.mime, "image/webp");
}
