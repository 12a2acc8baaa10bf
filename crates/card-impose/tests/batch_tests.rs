use card_impose::*;
use card_template::{DesignObject, ObjectKind, Rect, Record, Template, TextProps, Transform};
use lopdf::Document;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn id_card_template() -> Template {
    let mut template = Template::new(85.6, 54.0);
    template.front.side.objects.push(DesignObject::new(
        "name",
        ObjectKind::Text(TextProps::new("{{name}}")),
        Transform::from_rect(Rect::new(20.0, 20.0, 200.0, 40.0)),
    ));
    template
}

fn people(n: usize) -> Vec<Record> {
    (1..=n)
        .map(|i| [("name", format!("Student {}", i))].into_iter().collect())
        .collect()
}

fn fast_options() -> BatchOptions {
    let mut options = BatchOptions::default();
    options.render.export_dpi = 24.0;
    options
}

fn renderer(options: &BatchOptions) -> CardRenderer {
    CardRenderer::new(options.render.clone(), Arc::new(MemoryFetcher::new()))
}

fn page_contents(doc: &Document) -> Vec<String> {
    doc.get_pages()
        .values()
        .map(|&id| String::from_utf8_lossy(&doc.get_page_content(id).unwrap()).into_owned())
        .collect()
}

/// Serial numbers in content-stream order
fn serials(content: &str, prefix: &str) -> Vec<String> {
    let needle = format!("({}", prefix);
    content
        .match_indices(&needle)
        .filter_map(|(start, _)| {
            let rest = &content[start + 1..];
            rest.find(')').map(|end| rest[..end].to_string())
        })
        .collect()
}

#[tokio::test]
async fn test_thirty_seven_id_cards() {
    let template = id_card_template();
    let mut options = fast_options();
    options.marks.serial_prefix = "ID-".to_string();
    options.marks.serial_start = 1;

    let stats = calculate_statistics(&template, &options, 37).unwrap();
    assert_eq!((stats.cards_per_row, stats.cards_per_column), (2, 4));
    assert_eq!(stats.total_pages, 5);

    let output = generate_batch(
        &template,
        &people(37),
        &options,
        &mut renderer(&options),
        &BatchControl::new(),
    )
    .await
    .unwrap();

    assert_eq!(output.summary.produced, 37);
    assert_eq!(output.summary.pages, 5);
    assert_eq!(output.summary.to_string(), "37/37 produced");

    let contents = page_contents(&output.document);
    assert_eq!(contents.len(), 5);

    let found: Vec<String> = contents.iter().flat_map(|c| serials(c, "ID-")).collect();
    let expected: Vec<String> = (1..=37).map(|i| format!("ID-{}", i)).collect();
    assert_eq!(found, expected);

    // Last page holds the remaining five cards
    assert_eq!(contents[4].matches(" Do Q").count(), 5);
    assert!(contents[4].contains("(Page 5 of 5) Tj"));
}

#[tokio::test]
async fn test_unresolved_tokens_stay_literal() {
    let template = id_card_template();
    let options = fast_options();
    let records = vec![Record::new()];

    let output = generate_batch(
        &template,
        &records,
        &options,
        &mut renderer(&options),
        &BatchControl::new(),
    )
    .await
    .unwrap();

    let contents = page_contents(&output.document);
    assert!(contents[0].contains("({{name}}) Tj"));
}

#[tokio::test]
async fn test_names_outside_latin1_are_flagged() {
    let template = id_card_template();
    let options = fast_options();
    let records: Vec<Record> = vec![
        [("name", "Ana")].into_iter().collect(),
        [("name", "राम")].into_iter().collect(),
    ];

    let output = generate_batch(
        &template,
        &records,
        &options,
        &mut renderer(&options),
        &BatchControl::new(),
    )
    .await
    .unwrap();

    assert_eq!(output.summary.produced, 2);
    assert_eq!(output.summary.issues.len(), 1);
    let report = &output.summary.issues[0];
    assert_eq!(report.record, 1);
    assert!(matches!(
        &report.issue,
        RecordIssue::GlyphsDropped { chars, .. } if chars == "राम"
    ));
}

#[tokio::test]
async fn test_back_pass_mirrors_columns() {
    let mut template = id_card_template();
    template.enable_back();
    let mut options = fast_options();
    options.marks.serial_numbers = false;
    options.marks.page_numbers = false;
    options.marks.crop_marks = false;

    let output = generate_batch(
        &template,
        &people(2),
        &options,
        &mut renderer(&options),
        &BatchControl::new(),
    )
    .await
    .unwrap();

    let contents = page_contents(&output.document);
    assert_eq!(contents.len(), 2);

    let x_positions = |content: &str| -> Vec<f32> {
        content
            .lines()
            .filter(|line| line.ends_with("Do Q"))
            .map(|line| line.split_whitespace().nth(5).unwrap().parse().unwrap())
            .collect()
    };
    let front = x_positions(&contents[0]);
    let back = x_positions(&contents[1]);
    assert_eq!(front.len(), 2);
    assert!(front[0] < front[1]);
    assert_eq!(back, vec![front[1], front[0]]);
}

#[tokio::test]
async fn test_single_card_pages() {
    let template = id_card_template();
    let mut options = fast_options();
    options.page_mode = PageMode::SingleCard;

    let output = generate_batch(
        &template,
        &people(3),
        &options,
        &mut renderer(&options),
        &BatchControl::new(),
    )
    .await
    .unwrap();

    assert_eq!(output.document.get_pages().len(), 3);
    assert!((output.plan.page_width_mm - 91.6).abs() < 1e-4);
    for content in page_contents(&output.document) {
        assert!(!content.contains(" l S"), "no crop marks on single cards");
    }
}

#[tokio::test]
async fn test_saved_batch_reloads() {
    let template = id_card_template();
    let options = fast_options();
    let output = generate_batch(
        &template,
        &people(9),
        &options,
        &mut renderer(&options),
        &BatchControl::new(),
    )
    .await
    .unwrap();

    let temp = tempfile::NamedTempFile::new().unwrap();
    save_pdf(output.document, temp.path()).await.unwrap();
    let reloaded = load_pdf(temp.path()).await.unwrap();
    assert_eq!(reloaded.get_pages().len(), 2);
}
