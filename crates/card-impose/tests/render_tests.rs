use async_trait::async_trait;
use card_impose::*;
use card_template::{
    Background, DesignObject, MaskShape, ObjectData, ObjectKind, PhotoIndex, PlaceholderProps,
    Rect, Record, Side, SideSize, Template, Transform, mask_points,
};
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

fn red_png() -> Vec<u8> {
    let mut bytes = Vec::new();
    RgbaImage::from_pixel(64, 48, Rgba([255, 0, 0, 255]))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// One star placeholder on a 100x100 box at (20, 20), white background
fn star_side() -> Side {
    let mut side = Side::new(SideSize::new(50.8, 50.8));
    side.background = Background::Solid {
        color: "#ffffff".to_string(),
    };
    side.objects.push(
        DesignObject::new(
            "photo",
            ObjectKind::PhotoPlaceholder(PlaceholderProps::default()),
            Transform::from_rect(Rect::new(20.0, 20.0, 100.0, 100.0)),
        )
        .with_data(ObjectData {
            field: Some("photo".to_string()),
            mask: Some(MaskShape::Star),
            ..Default::default()
        }),
    );
    side
}

/// Export at the editing resolution so template units map 1:1 onto pixels
fn one_to_one() -> RenderConfig {
    RenderConfig {
        export_dpi: 96.0,
        fetch_timeout_ms: 200,
        ..Default::default()
    }
}

#[test]
fn test_star_vertices_stay_in_box() {
    let star = mask_points(MaskShape::Star, 100.0, 100.0).unwrap();
    let points = star.points().unwrap();
    assert_eq!(points.len(), 10);
    for p in points {
        let (x, y) = (p.x + 50.0, p.y + 50.0);
        assert!((0.0..=100.0).contains(&x) && (0.0..=100.0).contains(&y));
    }
}

#[tokio::test]
async fn test_star_photo_is_clipped_to_its_box() {
    let fetcher = MemoryFetcher::new().with("http://photos.test/ada.png", red_png());
    let mut renderer = CardRenderer::new(one_to_one(), Arc::new(fetcher));
    let side = renderer.prepare(&star_side()).await;

    let record: Record = [("photo", "http://photos.test/ada.png")].into_iter().collect();
    let card = renderer.render(&side, &record, 0.0).await.unwrap();
    assert!(card.issues.is_empty(), "{:?}", card.issues);

    let mut red = 0;
    for (x, y, pixel) in card.pixels.enumerate_pixels() {
        if pixel.0 == [255, 0, 0] {
            red += 1;
            assert!((20..120).contains(&x) && (20..120).contains(&y), "({}, {})", x, y);
        }
    }
    // Center is photo; the box corners are clipped away
    assert_eq!(card.pixels.get_pixel(70, 70).0, [255, 0, 0]);
    assert_eq!(card.pixels.get_pixel(22, 22).0, [255, 255, 255]);
    assert!(red > 2000 && red < 10_000 - 2000, "{}", red);
}

#[tokio::test]
async fn test_photo_found_through_uploaded_index() {
    let fetcher = MemoryFetcher::new().with("archive:S-17.png", red_png());
    let index: PhotoIndex = [("S-17.png", "archive:S-17.png".to_string())]
        .into_iter()
        .collect();
    let mut renderer = CardRenderer::new(one_to_one(), Arc::new(fetcher)).with_photo_index(index);
    let side = renderer.prepare(&star_side()).await;

    let record: Record = [("photo", "s-17")].into_iter().collect();
    let card = renderer.render(&side, &record, 0.0).await.unwrap();
    assert!(card.issues.is_empty(), "{:?}", card.issues);
    assert_eq!(card.pixels.get_pixel(70, 70).0, [255, 0, 0]);
}

/// Never answers
struct StalledFetcher;

#[async_trait]
impl ImageFetcher for StalledFetcher {
    async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_stalled_fetch_counts_as_missing_photo() {
    let mut renderer = CardRenderer::new(one_to_one(), Arc::new(StalledFetcher));
    let side = renderer.prepare(&star_side()).await;
    let record: Record = [("photo", "http://slow.test/a.png")].into_iter().collect();

    let card = tokio::time::timeout(Duration::from_secs(5), renderer.render(&side, &record, 0.0))
        .await
        .expect("render must not hang")
        .unwrap();

    match card.issues.as_slice() {
        [RecordIssue::PhotoLoadFailed { url, reason, .. }] => {
            assert_eq!(url, "http://slow.test/a.png");
            assert!(reason.contains("timed out"), "{}", reason);
        }
        other => panic!("unexpected issues {:?}", other),
    }
    // The placeholder graphic is still there
    assert_ne!(card.pixels.get_pixel(70, 70).0, [255, 255, 255]);
}

#[tokio::test]
async fn test_batch_counts_missing_photos() {
    let mut template = Template::new(50.8, 50.8);
    template.front.side = star_side();
    let mut options = BatchOptions::default();
    options.render = one_to_one();

    let fetcher = MemoryFetcher::new().with("http://photos.test/ada.png", red_png());
    let mut renderer = CardRenderer::new(options.render.clone(), Arc::new(fetcher));
    let records: Vec<Record> = vec![
        [("photo", "http://photos.test/ada.png")].into_iter().collect(),
        Record::new(),
        [("photo", "http://photos.test/missing.png")].into_iter().collect(),
    ];

    let output = generate_batch(&template, &records, &options, &mut renderer, &BatchControl::new())
        .await
        .unwrap();
    assert_eq!(output.summary.produced, 3);
    assert_eq!(output.summary.missing_photos, 2);
    assert_eq!(output.summary.photo_load_failures, 1);
    assert_eq!(output.summary.to_string(), "3/3 produced, 2 missing photos");
}
