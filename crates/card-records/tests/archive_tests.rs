use card_records::*;
use card_template::{PhotoResolver, Record};
use std::io::Write;
use zip::write::SimpleFileOptions;

fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

#[test]
fn test_archive_indexes_photos() {
    let bytes = build_zip(&[
        ("photos/S001.JPG", b"one"),
        ("photos/s002.png", b"two"),
        ("__MACOSX/photos/._S001.JPG", b"junk"),
        ("photos/.thumbs.jpg", b"junk"),
        ("readme.txt", b"hi"),
    ]);
    let archive = PhotoArchive::from_bytes(&bytes).unwrap();
    assert_eq!(archive.len(), 2);

    let url = archive.index().lookup("s001").unwrap();
    assert_eq!(url, "archive:photos/S001.JPG");
    assert_eq!(archive.get(url), Some(&b"one"[..]));
    assert!(archive.index().lookup("S002").is_some());
}

#[test]
fn test_archive_feeds_photo_resolution() {
    let bytes = build_zip(&[("S001.jpg", b"one")]);
    let archive = PhotoArchive::from_bytes(&bytes).unwrap();

    let mut record = Record::new();
    record.insert("roll_no", "S001");
    let url = PhotoResolver::default()
        .resolve(Some("photo"), &record, archive.index())
        .unwrap();
    assert_eq!(url, "archive:S001.jpg");
}

#[tokio::test]
async fn test_load_csv_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("students.csv");
    tokio::fs::write(&path, "\u{feff}name,roll_no\nAda,S001\nGrace,S002\n")
        .await
        .unwrap();

    let set = load_from_csv(&path).await.unwrap();
    assert_eq!(set.headers, vec!["name", "roll_no"]);
    assert_eq!(set.len(), 2);
}

#[tokio::test]
async fn test_load_archive_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("photos.zip");
    tokio::fs::write(&path, build_zip(&[("a.jpeg", b"a")]))
        .await
        .unwrap();

    let archive = PhotoArchive::load(&path).await.unwrap();
    assert_eq!(archive.len(), 1);
}

#[test]
fn test_oversized_photos_are_skipped() {
    let big = vec![0u8; 4096];
    let bytes = build_zip(&[("S001.jpg", big.as_slice()), ("S002.jpg", b"small")]);

    let archive = PhotoArchive::from_bytes_with_limit(&bytes, 1024).unwrap();
    assert_eq!(archive.len(), 1);
    assert!(archive.index().lookup("S001").is_none());
    assert!(archive.index().lookup("S002").is_some());

    let archive = PhotoArchive::from_bytes(&bytes).unwrap();
    assert_eq!(archive.len(), 2);
}

#[test]
fn test_hidden_folders_do_not_shadow_photos() {
    let bytes = build_zip(&[
        (".thumbs/S001.jpg", b"thumb"),
        ("photos/S001.jpg", b"real"),
    ]);
    let archive = PhotoArchive::from_bytes(&bytes).unwrap();
    assert_eq!(archive.len(), 1);

    let url = archive.index().lookup("S001").unwrap();
    assert_eq!(archive.get(url), Some(&b"real"[..]));
}
