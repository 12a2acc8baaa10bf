//! Batch generation - imposing rendered cards onto print pages
//!
//! This module orchestrates a batch run:
//! 1. Pack the card size onto the page to get a layout plan
//! 2. Render every record through the card renderer, strictly in order
//! 3. Place each card into its slot with crop marks and a serial number
//! 4. Optionally repeat for the back side with mirrored columns
//! 5. Number the pages and assemble the output document

mod io;
mod page;

pub use io::{document_bytes, load_pdf, save_pdf, save_temp_pdf};

use crate::layout::{LayoutPlan, PackRequest, Pass, plan};
use crate::options::BatchOptions;
use crate::render::CardRenderer;
use crate::stats::BatchSummary;
use crate::types::*;
use card_template::{Record, Side, SideKind, Template};
use lopdf::Document;
use page::{FinishedPage, PageBuilder, add_helvetica, assemble_document};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::UnboundedSender;

/// Where a batch run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Packing,
    /// Rendering front-side cards; holds the record index
    Rendering(usize),
    /// Rendering back-side cards; holds the record index
    RenderingBack(usize),
    Finalizing,
    Done,
    Failed,
}

/// Progress notification sent while a batch runs
#[derive(Debug, Clone, PartialEq)]
pub struct BatchProgress {
    pub state: BatchState,
    /// Cards finished so far, both passes counted
    pub completed: usize,
    /// Cards the batch will produce when not stopped
    pub total: usize,
}

/// Stop flag and progress channel for a batch run
#[derive(Debug, Clone, Default)]
pub struct BatchControl {
    stop: Arc<AtomicBool>,
    progress: Option<UnboundedSender<BatchProgress>>,
}

impl BatchControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_progress(mut self, sender: UnboundedSender<BatchProgress>) -> Self {
        self.progress = Some(sender);
        self
    }

    /// Share an existing stop flag
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    /// Ask the batch to stop once the record being rendered is placed
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    fn report(&self, state: BatchState, completed: usize, total: usize) {
        log::debug!("Batch state {:?} ({}/{})", state, completed, total);
        if let Some(sender) = &self.progress {
            // A dropped receiver only means nobody is watching
            let _ = sender.send(BatchProgress {
                state,
                completed,
                total,
            });
        }
    }
}

/// A generated document and what went into it
#[derive(Debug)]
pub struct BatchOutput {
    pub document: Document,
    pub summary: BatchSummary,
    pub plan: LayoutPlan,
}

/// Generate the print document for every record
pub async fn generate_batch(
    template: &Template,
    records: &[Record],
    options: &BatchOptions,
    renderer: &mut CardRenderer,
    control: &BatchControl,
) -> Result<BatchOutput> {
    let result = run_batch(template, records, options, renderer, control).await;
    if result.is_err() {
        control.report(BatchState::Failed, 0, 0);
    }
    result
}

async fn run_batch(
    template: &Template,
    records: &[Record],
    options: &BatchOptions,
    renderer: &mut CardRenderer,
    control: &BatchControl,
) -> Result<BatchOutput> {
    control.report(BatchState::Idle, 0, 0);
    options.validate()?;
    if records.is_empty() {
        return Err(ImposeError::NoRecords);
    }

    control.report(BatchState::Packing, 0, 0);
    let layout = plan(&PackRequest::new(template.size(), options, records.len()));
    log::info!(
        "Packing {} records {}x{} per page onto {} page(s) per side",
        records.len(),
        layout.cards_per_row,
        layout.cards_per_column,
        layout.total_pages
    );
    if layout.overflows() {
        log::warn!("Card with bleed is larger than the printable area");
    }

    let mut passes = Vec::new();
    if options.sides.includes_front() {
        passes.push((Pass::Front, &template.front.side));
    }
    if options.sides.includes_back() {
        match template.side(SideKind::Back) {
            Some(back) => passes.push((Pass::Back, back)),
            None if options.sides == SideSelection::Back => {
                return Err(ImposeError::Config(
                    "Template has no back side to generate".to_string(),
                ));
            }
            None => log::debug!("Template has no back side; generating fronts only"),
        }
    }

    let mut run = BatchRun {
        layout: &layout,
        options,
        control,
        summary: BatchSummary::new(records.len()),
        doc: Document::with_version("1.7"),
        pages: Vec::new(),
        completed: 0,
        total: records.len() * passes.len(),
    };

    for (i, (pass, side)) in passes.iter().enumerate() {
        // Serials go on the first pass so each record is numbered once
        let serials = i == 0 && options.marks.serial_numbers;
        if !run.render_pass(*pass, side, records, renderer, serials).await? {
            break;
        }
    }

    control.report(BatchState::Finalizing, run.completed, run.total);
    let BatchRun {
        mut summary,
        mut doc,
        pages,
        completed,
        total,
        ..
    } = run;

    summary.pages = pages.len();
    let font_id = add_helvetica(&mut doc);
    let page_size = layout.page_size_pt();
    let page_numbers = options.marks.page_numbers && !layout.single_card;
    let document = assemble_document(doc, pages, page_size, font_id, page_numbers)?;

    log::info!("Batch finished: {}", summary);
    control.report(BatchState::Done, completed, total);

    Ok(BatchOutput {
        document,
        summary,
        plan: layout,
    })
}

/// Mutable state of one batch run
struct BatchRun<'a> {
    layout: &'a LayoutPlan,
    options: &'a BatchOptions,
    control: &'a BatchControl,
    summary: BatchSummary,
    doc: Document,
    pages: Vec<FinishedPage>,
    completed: usize,
    total: usize,
}

impl BatchRun<'_> {
    /// Render one side for every record. Returns false when stopped.
    async fn render_pass(
        &mut self,
        pass: Pass,
        side: &Side,
        records: &[Record],
        renderer: &mut CardRenderer,
        serials: bool,
    ) -> Result<bool> {
        let prepared = renderer.prepare(side).await;
        let crop_marks = self.options.marks.crop_marks && !self.layout.single_card;
        let page_groups = self
            .layout
            .pages(records.len(), pass, self.options.mirror_back);

        for placements in page_groups {
            let mut page = PageBuilder::new();
            for placement in &placements {
                if self.control.stop_requested() {
                    log::info!("Stop requested; keeping {} finished page(s)", self.pages.len());
                    self.summary.cancelled = true;
                    if !page.is_empty() {
                        self.pages.push(page.finish(crop_marks));
                    }
                    return Ok(false);
                }

                let index = placement.record_index;
                let state = match pass {
                    Pass::Front => BatchState::Rendering(index),
                    Pass::Back => BatchState::RenderingBack(index),
                };
                self.control.report(state, self.completed, self.total);

                match renderer
                    .render(&prepared, &records[index], self.layout.bleed_mm)
                    .await
                {
                    Ok(card) => {
                        for issue in &card.issues {
                            log::warn!("Record {}: {}", index + 1, issue);
                        }
                        let issues = card.issues.clone();
                        page.add_card(&mut self.doc, placement, card).await?;
                        if serials {
                            page.add_serial(&self.options.marks.serial(index), placement);
                        }
                        if pass == Pass::Front || !self.options.sides.includes_front() {
                            self.summary.record(index, issues);
                        }
                    }
                    Err(e) => {
                        if pass == Pass::Front || !self.options.sides.includes_front() {
                            self.summary.fail(index, &e.to_string());
                        } else {
                            log::warn!("Back of record {} failed: {}", index + 1, e);
                        }
                    }
                }
                self.completed += 1;
            }
            self.pages.push(page.finish(crop_marks));
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::MemoryFetcher;

    fn small_options() -> BatchOptions {
        let mut options = BatchOptions::default();
        options.render.export_dpi = 24.0;
        options
    }

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| [("name", format!("Person {}", i))].into_iter().collect())
            .collect()
    }

    #[tokio::test]
    async fn test_stop_keeps_finished_output_valid() {
        let template = Template::new(85.6, 54.0);
        let options = small_options();
        let mut renderer = CardRenderer::new(options.render.clone(), Arc::new(MemoryFetcher::new()));
        let control = BatchControl::new();
        control.request_stop();

        let output = generate_batch(&template, &records(5), &options, &mut renderer, &control)
            .await
            .unwrap();
        assert!(output.summary.cancelled);
        assert_eq!(output.summary.produced, 0);
        assert_eq!(output.document.get_pages().len(), 0);
        assert!(document_bytes(output.document).await.is_ok());
    }

    #[tokio::test]
    async fn test_back_only_needs_a_back_side() {
        let template = Template::new(85.6, 54.0);
        let mut options = small_options();
        options.sides = SideSelection::Back;
        let mut renderer = CardRenderer::new(options.render.clone(), Arc::new(MemoryFetcher::new()));
        let result =
            generate_batch(&template, &records(1), &options, &mut renderer, &BatchControl::new()).await;
        assert!(matches!(result, Err(ImposeError::Config(_))));
    }

    #[tokio::test]
    async fn test_progress_reaches_done() {
        let template = Template::new(85.6, 54.0);
        let options = small_options();
        let mut renderer = CardRenderer::new(options.render.clone(), Arc::new(MemoryFetcher::new()));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let control = BatchControl::new().with_progress(tx);

        let output = generate_batch(&template, &records(3), &options, &mut renderer, &control)
            .await
            .unwrap();
        drop(control);

        let mut states = Vec::new();
        while let Some(progress) = rx.recv().await {
            states.push(progress.state);
        }
        assert_eq!(states.first(), Some(&BatchState::Idle));
        assert!(states.contains(&BatchState::Rendering(2)));
        assert_eq!(states.last(), Some(&BatchState::Done));
        assert_eq!(output.summary.produced, 3);
        assert_eq!(output.document.get_pages().len(), 1);
    }
}
