//! View state for rendered listings: copyable fields, tag chips, and the
//! short-lived "copied" acknowledgments attached to them.

use std::time::{Duration, Instant};

use anyhow::Result;
use listing_contracts::{ListingRecord, MAX_TAGS};

pub const COPY_FIELD_FEEDBACK: Duration = Duration::from_millis(2000);
pub const TAG_FEEDBACK: Duration = Duration::from_millis(1500);
pub const COPY_ALL_FEEDBACK: Duration = Duration::from_millis(2000);

/// Write-only text clipboard.
pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    writes: Vec<String>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&str> {
        self.writes.last().map(String::as_str)
    }

    pub fn writes(&self) -> &[String] {
        &self.writes
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&mut self, text: &str) -> Result<()> {
        self.writes.push(text.to_string());
        Ok(())
    }
}

/// Acknowledgment flag that holds for `duration` after each trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyFeedback {
    started: Option<Instant>,
    duration: Duration,
}

impl CopyFeedback {
    pub fn new(duration: Duration) -> Self {
        Self {
            started: None,
            duration,
        }
    }

    pub fn trigger(&mut self, now: Instant) {
        self.started = Some(now);
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.started
            .map(|started| now.saturating_duration_since(started) < self.duration)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyField {
    pub label: String,
    pub value: String,
    pub multiline: bool,
    pub helper_text: Option<String>,
    feedback: CopyFeedback,
}

impl CopyField {
    pub fn new(label: &str, value: &str) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
            multiline: false,
            helper_text: None,
            feedback: CopyFeedback::new(COPY_FIELD_FEEDBACK),
        }
    }

    pub fn multiline(mut self) -> Self {
        self.multiline = true;
        self
    }

    pub fn helper(mut self, text: &str) -> Self {
        self.helper_text = Some(text.to_string());
        self
    }

    /// Copies the value. Empty values are a no-op and return `false`.
    pub fn copy(&mut self, clipboard: &mut dyn Clipboard, now: Instant) -> Result<bool> {
        if self.value.is_empty() {
            return Ok(false);
        }
        clipboard.write_text(&self.value)?;
        self.feedback.trigger(now);
        Ok(true)
    }

    pub fn is_copied(&self, now: Instant) -> bool {
        self.feedback.is_active(now)
    }

    pub fn button_label(&self, now: Instant) -> &'static str {
        if self.is_copied(now) {
            "Copied"
        } else {
            "Copy"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagList {
    tags: Vec<String>,
    copied_index: Option<usize>,
    tag_feedback: CopyFeedback,
    all_feedback: CopyFeedback,
}

impl TagList {
    pub fn new(tags: &[String]) -> Self {
        Self {
            tags: tags.to_vec(),
            copied_index: None,
            tag_feedback: CopyFeedback::new(TAG_FEEDBACK),
            all_feedback: CopyFeedback::new(COPY_ALL_FEEDBACK),
        }
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn is_visible(&self) -> bool {
        !self.tags.is_empty()
    }

    pub fn header(&self) -> String {
        format!("Tags ({}/{})", self.tags.len(), MAX_TAGS)
    }

    /// Copies one tag; returns `false` when the index is out of range.
    pub fn copy_tag(
        &mut self,
        index: usize,
        clipboard: &mut dyn Clipboard,
        now: Instant,
    ) -> Result<bool> {
        let Some(tag) = self.tags.get(index) else {
            return Ok(false);
        };
        clipboard.write_text(tag)?;
        self.copied_index = Some(index);
        self.tag_feedback.trigger(now);
        Ok(true)
    }

    pub fn copy_all(&mut self, clipboard: &mut dyn Clipboard, now: Instant) -> Result<bool> {
        if self.tags.is_empty() {
            return Ok(false);
        }
        clipboard.write_text(&self.tags.join(", "))?;
        self.all_feedback.trigger(now);
        Ok(true)
    }

    pub fn is_tag_copied(&self, index: usize, now: Instant) -> bool {
        self.copied_index == Some(index) && self.tag_feedback.is_active(now)
    }

    pub fn is_all_copied(&self, now: Instant) -> bool {
        self.all_feedback.is_active(now)
    }

    pub fn copy_all_label(&self, now: Instant) -> &'static str {
        if self.is_all_copied(now) {
            "Copied all!"
        } else {
            "Copy all tags"
        }
    }
}

/// All rendered sections of one listing, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingView {
    pub description: CopyField,
    pub title: CopyField,
    pub attributes: Vec<CopyField>,
    pub details: Vec<CopyField>,
    pub materials: CopyField,
    pub tags: TagList,
}

impl ListingView {
    pub fn from_record(record: &ListingRecord) -> Self {
        Self {
            description: CopyField::new("Description", &record.description)
                .multiline()
                .helper("First few lines are crucial for SEO."),
            title: CopyField::new("Title", &record.title),
            attributes: record
                .attribute_fields()
                .iter()
                .map(|(label, value)| CopyField::new(label, value))
                .collect(),
            details: vec![
                CopyField::new("Category", &record.category),
                CopyField::new("Style", &record.style),
                CopyField::new("Price Estimate", &record.price_estimate),
            ],
            materials: CopyField::new("Materials", &record.materials_line())
                .helper("Separate ingredients with commas."),
            tags: TagList::new(&record.tags),
        }
    }

    /// Looks a field up by its `/copy` name.
    pub fn field_mut(&mut self, name: &str) -> Option<&mut CopyField> {
        let by_label = |label: &str| label.to_ascii_lowercase().replace(' ', "_");
        match name {
            "description" => Some(&mut self.description),
            "title" => Some(&mut self.title),
            "materials" => Some(&mut self.materials),
            "price" => self
                .details
                .iter_mut()
                .find(|field| field.label == "Price Estimate"),
            other => self
                .attributes
                .iter_mut()
                .chain(self.details.iter_mut())
                .find(|field| by_label(&field.label) == other),
        }
    }
}
