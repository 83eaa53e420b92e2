//! End-to-end fetch of an attachment nested in a remote container, served by
//! a mock server that only answers exact byte ranges.

use std::sync::Arc;

use httpmock::prelude::*;
use tarpeek::preview::PreviewState;
use tarpeek::{
    AttachmentsProvider, Config, ContentTypeDispatcher, FileIndex, FileNode, HttpRangeReader,
    PreviewArtifact, PreviewSlot, RemoteAttachments, ReadAt, RequestRange,
};
use tokio_util::sync::CancellationToken;

const BLOCK: u64 = 512;

fn append(builder: &mut tar::Builder<Vec<u8>>, path: &str, data: &[u8]) {
    let mut header = tar::Header::new_gnu();
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    builder.append_data(&mut header, path, data).unwrap();
}

/// Container with a sidecar index and an attachments tar holding
/// `readme.txt` and `logs/run.json`.
fn container() -> Vec<u8> {
    let mut inner = tar::Builder::new(Vec::new());
    append(&mut inner, "readme.txt", b"hello world");
    append(&mut inner, "logs/run.json", br#"{"loss":0.5}"#);
    let inner = inner.into_inner().unwrap();

    let sidecar: FileIndex = tarpeek::tar::scan(&inner)
        .unwrap()
        .iter()
        .map(|(path, entry)| (format!("attachments/{path}"), entry))
        .collect();

    let mut outer = tar::Builder::new(Vec::new());
    append(&mut outer, "run/attachments.index.json", sidecar.to_json_pretty().unwrap().as_bytes());
    append(&mut outer, "run/attachments.tar", &inner);
    outer.into_inner().unwrap()
}

async fn mock_range(server: &MockServer, object: &[u8], range: RequestRange) {
    let body = object[range.start as usize..=range.end as usize].to_vec();
    let total = object.len();
    server
        .mock_async(move |when, then| {
            when.method(GET)
                .path("/run.tar")
                .header("range", range.header_value());
            then.status(206)
                .header(
                    "content-range",
                    format!("bytes {}-{}/{total}", range.start, range.end),
                )
                .body(body);
        })
        .await;
}

/// Serve the probe, every header block, and the extra ranges a client is
/// expected to ask for. Anything else gets the mock server's 404.
async fn serve(object: &[u8], extra: &[RequestRange]) -> MockServer {
    let server = MockServer::start_async().await;
    mock_range(&server, object, RequestRange::new(0, 1).unwrap()).await;

    let mut pos = 0;
    while pos < object.len() as u64 {
        mock_range(&server, object, RequestRange::new(pos, BLOCK).unwrap()).await;
        pos += BLOCK;
    }
    for range in extra {
        mock_range(&server, object, *range).await;
    }
    server
}

/// Ranges a discovering client needs beyond the header blocks.
fn expected_ranges(object: &[u8], attachment: &str) -> Vec<RequestRange> {
    let outer = tarpeek::tar::scan(object).unwrap();
    let sidecar = outer.get("run/attachments.index.json").unwrap();
    let payload = outer.get("run/attachments.tar").unwrap();

    let start = sidecar.offset as usize;
    let inner = FileIndex::from_json(&object[start..start + sidecar.size as usize]).unwrap();
    let entry = inner.get(attachment).unwrap();

    vec![
        RequestRange::for_entry(sidecar, 0).unwrap(),
        RequestRange::for_entry(entry, payload.offset).unwrap(),
    ]
}

#[tokio::test]
async fn discovers_and_fetches_a_nested_attachment() {
    let object = container();
    let server = serve(&object, &expected_ranges(&object, "attachments/readme.txt")).await;

    let reader = Arc::new(HttpRangeReader::new(server.url("/run.tar")).await.unwrap());
    assert_eq!(reader.size(), object.len() as u64);

    let cancel = CancellationToken::new();
    let attachments = RemoteAttachments::discover(reader.clone(), &Config::default(), &cancel)
        .await
        .unwrap();

    let names: Vec<_> = attachments.tree().iter().map(FileNode::name).collect();
    assert_eq!(names, ["readme.txt", "logs"]);

    let content = attachments
        .attachment_content("attachments/readme.txt", &cancel)
        .await
        .unwrap();
    assert_eq!(&content.bytes[..], b"hello world");
    assert_eq!(content.size, 11);

    // Headers, the sidecar and one file; never the whole object
    assert!(reader.transferred_bytes() < object.len() as u64);
}

#[tokio::test]
async fn previews_a_nested_json_attachment() {
    let object = container();
    let server = serve(&object, &expected_ranges(&object, "attachments/logs/run.json")).await;

    let reader = Arc::new(HttpRangeReader::new(server.url("/run.tar")).await.unwrap());
    let attachments = RemoteAttachments::discover(reader, &Config::default(), &CancellationToken::new())
        .await
        .unwrap();

    let slot = PreviewSlot::new(
        Arc::new(attachments),
        Arc::new(ContentTypeDispatcher::with_defaults()),
    );
    slot.load("attachments/logs/run.json").await;

    match slot.state() {
        PreviewState::Resolved(PreviewArtifact::Text { text, .. }) => {
            assert_eq!(text, "{\n  \"loss\": 0.5\n}");
        }
        other => panic!("unexpected preview state: {other:?}"),
    }
}

#[tokio::test]
async fn unknown_attachment_needs_no_request() {
    let object = container();
    let server = serve(&object, &expected_ranges(&object, "attachments/readme.txt")).await;

    let reader = Arc::new(HttpRangeReader::new(server.url("/run.tar")).await.unwrap());
    let attachments =
        RemoteAttachments::discover(reader.clone(), &Config::default(), &CancellationToken::new())
            .await
            .unwrap();
    let before = reader.transferred_bytes();

    let result = attachments
        .attachment_content("attachments/missing.txt", &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(tarpeek::Error::NotFound { .. })));
    assert_eq!(reader.transferred_bytes(), before);
}
