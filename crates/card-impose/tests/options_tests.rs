use card_impose::*;
use pretty_assertions::assert_eq;

#[test]
fn test_defaults_are_valid() {
    let options = BatchOptions::default();
    assert!(options.validate().is_ok());
    assert_eq!(options.bleed_mm, 3.0);
    assert_eq!(options.render.export_dpi, 300.0);
    assert_eq!(options.render.backend_origin, "http://localhost:3001");
    assert!(options.mirror_back);
}

#[test]
fn test_validation_negative_bleed() {
    let options = BatchOptions {
        bleed_mm: -1.0,
        ..Default::default()
    };
    match options.validate() {
        Err(ImposeError::Config(msg)) => assert!(msg.contains("bleed")),
        other => panic!("Expected Config error, got {:?}", other),
    }
}

#[test]
fn test_validation_zero_grid_override() {
    let options = BatchOptions {
        cards_per_row: Some(0),
        ..Default::default()
    };
    assert!(matches!(options.validate(), Err(ImposeError::Config(_))));
}

#[test]
fn test_validation_custom_paper() {
    let options = BatchOptions {
        page_mode: PageMode::Sheet(PaperSize::Custom {
            width_mm: 0.0,
            height_mm: 100.0,
        }),
        ..Default::default()
    };
    assert!(options.validate().is_err());
}

#[test]
fn test_serial_formatting() {
    let marks = PrinterMarks {
        serial_prefix: "ID-".to_string(),
        serial_start: 7,
        serial_pad_width: 4,
        ..Default::default()
    };
    assert_eq!(marks.serial(0), "ID-0007");
    assert_eq!(marks.serial(3), "ID-0010");
}

#[tokio::test]
async fn test_save_and_load_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("options.json");

    let mut options = BatchOptions::default();
    options.orientation = Orientation::Landscape;
    options.page_mode = PageMode::Sheet(PaperSize::Letter);
    options.sides = SideSelection::Front;
    options.marks.serial_prefix = "EMP-".to_string();
    options.render.fetch_timeout_ms = 2500;

    options.save(&path).await.unwrap();
    let loaded = BatchOptions::load(&path).await.unwrap();
    assert_eq!(loaded, options);
}

#[tokio::test]
async fn test_partial_config_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("partial.json");
    tokio::fs::write(&path, r#"{ "bleed_mm": 0.0, "marks": { "crop_marks": false } }"#)
        .await
        .unwrap();

    let loaded = BatchOptions::load(&path).await.unwrap();
    assert_eq!(loaded.bleed_mm, 0.0);
    assert!(!loaded.marks.crop_marks);
    assert!(loaded.marks.serial_numbers);
    assert_eq!(loaded.card_spacing_mm, 5.0);
}

#[tokio::test]
async fn test_load_rejects_garbage() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    tokio::fs::write(&path, "not json").await.unwrap();
    match BatchOptions::load(&path).await {
        Err(ImposeError::Config(msg)) => assert!(msg.contains("Failed to parse config")),
        other => panic!("Expected Config error, got {:?}", other),
    }
}

#[test]
fn test_project_id_scopes_photo_resolver() {
    let mut config = RenderConfig::default();
    assert_eq!(config.photo_resolver().rebase("a.jpg"), "http://localhost:3001/a.jpg");

    config.project_id = Some("p-7".to_string());
    let resolver = config.photo_resolver();
    assert_eq!(resolver.project(), Some("p-7"));
    assert_eq!(
        resolver.rebase("a.jpg"),
        "http://localhost:3001/uploads/project-photos/p-7/a.jpg"
    );
}
