use crate::layout::{PackRequest, plan};
use crate::options::BatchOptions;
use crate::types::*;
use card_template::{ObjectId, SideKind, Template};
use std::fmt;

/// A problem with one record that did not stop the batch
#[derive(Debug, Clone, PartialEq)]
pub enum RecordIssue {
    /// No photo could be resolved for a slot; the placeholder is kept
    PhotoMissing { object: ObjectId },
    /// A photo resolved but could not be fetched or decoded in time
    PhotoLoadFailed {
        object: ObjectId,
        url: String,
        reason: String,
    },
    /// A barcode or QR value could not be encoded
    SymbolFailed { object: ObjectId, reason: String },
    /// Text was set in the standard font, which has no glyphs for `chars`
    GlyphsDropped { object: ObjectId, chars: String },
}

impl RecordIssue {
    pub fn is_missing_photo(&self) -> bool {
        matches!(
            self,
            RecordIssue::PhotoMissing { .. } | RecordIssue::PhotoLoadFailed { .. }
        )
    }
}

impl fmt::Display for RecordIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordIssue::PhotoMissing { object } => write!(f, "no photo for {}", object),
            RecordIssue::PhotoLoadFailed { object, url, reason } => {
                write!(f, "photo {} for {} failed: {}", url, object, reason)
            }
            RecordIssue::SymbolFailed { object, reason } => {
                write!(f, "symbol {} failed: {}", object, reason)
            }
            RecordIssue::GlyphsDropped { object, chars } => {
                write!(f, "text {} printed without {:?}; set a font that covers them", object, chars)
            }
        }
    }
}

/// An issue tagged with the record it happened on
#[derive(Debug, Clone, PartialEq)]
pub struct IssueReport {
    pub record: usize,
    pub issue: RecordIssue,
}

/// Outcome of a batch run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    pub total: usize,
    pub produced: usize,
    /// Records whose card could not be rendered at all
    pub failed: usize,
    /// Photo slots left as placeholders, load failures included
    pub missing_photos: usize,
    pub photo_load_failures: usize,
    pub pages: usize,
    pub cancelled: bool,
    pub issues: Vec<IssueReport>,
}

impl BatchSummary {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }

    /// Account for one rendered record
    pub fn record(&mut self, record: usize, issues: Vec<RecordIssue>) {
        self.produced += 1;
        for issue in &issues {
            if issue.is_missing_photo() {
                self.missing_photos += 1;
            }
            if matches!(issue, RecordIssue::PhotoLoadFailed { .. }) {
                self.photo_load_failures += 1;
            }
        }
        self.issues
            .extend(issues.into_iter().map(|issue| IssueReport { record, issue }));
    }

    /// Account for a record that could not be rendered
    pub fn fail(&mut self, record: usize, reason: &str) {
        log::warn!("Record {} failed: {}", record, reason);
        self.failed += 1;
    }

    /// Records never reached, because the batch was stopped
    pub fn skipped(&self) -> usize {
        self.total.saturating_sub(self.produced + self.failed)
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} produced", self.produced, self.total)?;
        if self.missing_photos > 0 {
            write!(
                f,
                ", {} missing photo{}",
                self.missing_photos,
                if self.missing_photos == 1 { "" } else { "s" }
            )?;
        }
        if self.failed > 0 {
            write!(f, ", {} failed", self.failed)?;
        }
        if self.cancelled {
            write!(f, " (stopped)")?;
        }
        Ok(())
    }
}

/// Page counts for a batch, computed before anything is rendered
#[derive(Debug, Clone, PartialEq)]
pub struct BatchStatistics {
    pub records: usize,
    pub cards_per_row: usize,
    pub cards_per_column: usize,
    pub cards_per_page: usize,
    pub front_pages: usize,
    pub back_pages: usize,
    pub total_pages: usize,
    /// Card plus bleed does not fit the printable area
    pub overflows: bool,
}

/// Calculate statistics for a batch
pub fn calculate_statistics(
    template: &Template,
    options: &BatchOptions,
    record_count: usize,
) -> Result<BatchStatistics> {
    if record_count == 0 {
        return Err(ImposeError::NoRecords);
    }

    let layout = plan(&PackRequest::new(template.size(), options, record_count));

    let front_pages = if options.sides.includes_front() {
        layout.total_pages
    } else {
        0
    };
    let back_pages = if options.sides.includes_back() && template.side(SideKind::Back).is_some() {
        layout.total_pages
    } else {
        0
    };

    Ok(BatchStatistics {
        records: record_count,
        cards_per_row: layout.cards_per_row,
        cards_per_column: layout.cards_per_column,
        cards_per_page: layout.cards_per_page,
        front_pages,
        back_pages,
        total_pages: front_pages + back_pages,
        overflows: layout.overflows(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_summary_display() {
        let mut summary = BatchSummary::new(50);
        for i in 0..48 {
            let issues = if i < 2 {
                vec![RecordIssue::PhotoMissing {
                    object: ObjectId::new("photo"),
                }]
            } else {
                Vec::new()
            };
            summary.record(i, issues);
        }
        assert_eq!(summary.to_string(), "48/50 produced, 2 missing photos");
        assert_eq!(summary.skipped(), 2);
        assert_eq!(summary.issues.len(), 2);
    }

    #[test]
    fn test_symbol_failures_are_not_missing_photos() {
        let mut summary = BatchSummary::new(1);
        summary.record(
            0,
            vec![RecordIssue::SymbolFailed {
                object: ObjectId::new("ean"),
                reason: "letters".to_string(),
            }],
        );
        assert_eq!(summary.missing_photos, 0);
        assert_eq!(summary.to_string(), "1/1 produced");

        summary.total = 3;
        summary.fail(1, "decode");
        summary.cancelled = true;
        assert_eq!(summary.to_string(), "1/3 produced, 1 failed (stopped)");
        assert_eq!(summary.skipped(), 1);
    }

    #[test]
    fn test_statistics_front_only_template() {
        let template = Template::new(85.6, 54.0);
        let stats = calculate_statistics(&template, &BatchOptions::default(), 37).unwrap();
        assert_eq!(stats.cards_per_page, 8);
        assert_eq!(stats.front_pages, 5);
        assert_eq!(stats.back_pages, 0);
        assert_eq!(stats.total_pages, 5);
    }

    #[test]
    fn test_statistics_with_back() {
        let mut template = Template::new(85.6, 54.0);
        template.enable_back();
        let stats = calculate_statistics(&template, &BatchOptions::default(), 9).unwrap();
        assert_eq!(stats.front_pages, 2);
        assert_eq!(stats.back_pages, 2);
    }

    #[test]
    fn test_statistics_no_records() {
        let template = Template::new(85.6, 54.0);
        assert!(matches!(
            calculate_statistics(&template, &BatchOptions::default(), 0),
            Err(ImposeError::NoRecords)
        ));
    }
}
