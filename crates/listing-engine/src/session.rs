//! Session state controller for one listing workspace.
//!
//! The controller owns the selected files, their previews and the generation
//! state. Previews are scoped handles: replacing the selection, resetting, or
//! dropping the session revokes every outstanding handle.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use listing_contracts::events::{EventLog, SessionEvent};
use listing_contracts::ListingRecord;
use uuid::Uuid;

use crate::encoder::SelectedImage;
use crate::error::{GenerationError, SessionError};
use crate::service::{generate_listing, ListingService};

pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to generate listing. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Empty,
    Selected,
    Generating,
    Ready(ListingRecord),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Empty,
    Selected,
    Generating,
    Ready,
    Failed,
}

impl SessionPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Selected => "selected",
            Self::Generating => "generating",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl SessionState {
    pub fn phase(&self) -> SessionPhase {
        match self {
            Self::Empty => SessionPhase::Empty,
            Self::Selected => SessionPhase::Selected,
            Self::Generating => SessionPhase::Generating,
            Self::Ready(_) => SessionPhase::Ready,
            Self::Failed(_) => SessionPhase::Failed,
        }
    }
}

/// Issues preview handles and tracks which are still live.
#[derive(Debug, Clone, Default)]
pub struct PreviewStore {
    live: Arc<Mutex<BTreeSet<String>>>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&self, file: &SelectedImage) -> PreviewHandle {
        let url = format!("preview://{}/{}", Uuid::new_v4(), file.display_name());
        if let Ok(mut live) = self.live.lock() {
            live.insert(url.clone());
        }
        PreviewHandle {
            url,
            live: Arc::clone(&self.live),
        }
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().map(|live| live.len()).unwrap_or(0)
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.live
            .lock()
            .map(|live| live.contains(url))
            .unwrap_or(false)
    }
}

/// A locally resolvable reference to one selected file. Revoked on drop.
#[derive(Debug)]
pub struct PreviewHandle {
    url: String,
    live: Arc<Mutex<BTreeSet<String>>>,
}

impl PreviewHandle {
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        if let Ok(mut live) = self.live.lock() {
            live.remove(&self.url);
        }
    }
}

#[derive(Debug, Default)]
pub struct PreviewSet {
    handles: Vec<PreviewHandle>,
}

impl PreviewSet {
    fn allocate(store: &PreviewStore, files: &[SelectedImage]) -> Self {
        Self {
            handles: files.iter().map(|file| store.allocate(file)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn urls(&self) -> Vec<&str> {
        self.handles.iter().map(PreviewHandle::url).collect()
    }
}

pub struct ListingSession {
    files: Vec<SelectedImage>,
    previews: PreviewSet,
    state: SessionState,
    store: PreviewStore,
    events: Option<EventLog>,
}

/// Context attached to a `session_state` event.
#[derive(Debug, Default)]
struct StateDetail {
    source: Option<String>,
    files: Option<usize>,
    error_kind: Option<String>,
    error: Option<String>,
}

impl Default for ListingSession {
    fn default() -> Self {
        Self::new(PreviewStore::new())
    }
}

impl ListingSession {
    pub fn new(store: PreviewStore) -> Self {
        Self {
            files: Vec::new(),
            previews: PreviewSet::default(),
            state: SessionState::Empty,
            store,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = Some(events);
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    pub fn files(&self) -> &[SelectedImage] {
        &self.files
    }

    pub fn previews(&self) -> &PreviewSet {
        &self.previews
    }

    pub fn listing(&self) -> Option<&ListingRecord> {
        match &self.state {
            SessionState::Ready(record) => Some(record),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            SessionState::Failed(message) => Some(message.as_str()),
            _ => None,
        }
    }

    pub fn is_generating(&self) -> bool {
        self.phase() == SessionPhase::Generating
    }

    pub fn can_generate(&self) -> bool {
        !self.files.is_empty() && !self.is_generating()
    }

    /// File-chooser selection: every file is accepted. An empty selection is ignored.
    pub fn select_files(&mut self, files: Vec<SelectedImage>) -> Result<bool, SessionError> {
        self.replace_selection(files, "select")
    }

    /// Drag-and-drop: only `image/*` files are kept. With none left, nothing changes.
    pub fn drop_files(&mut self, files: Vec<SelectedImage>) -> Result<bool, SessionError> {
        if self.is_generating() {
            return Err(SessionError::AlreadyGenerating);
        }
        let dropped = files.len();
        let images: Vec<SelectedImage> = files
            .into_iter()
            .filter(SelectedImage::is_image)
            .collect();
        if images.len() < dropped {
            self.log(SessionEvent::DropFiltered {
                dropped,
                kept: images.len(),
            });
        }
        self.replace_selection(images, "drop")
    }

    fn replace_selection(
        &mut self,
        files: Vec<SelectedImage>,
        source: &str,
    ) -> Result<bool, SessionError> {
        if self.is_generating() {
            return Err(SessionError::AlreadyGenerating);
        }
        if files.is_empty() {
            return Ok(false);
        }
        let previews = PreviewSet::allocate(&self.store, &files);
        // The old set is dropped here, revoking its handles.
        self.previews = previews;
        self.files = files;
        let detail = StateDetail {
            source: Some(source.to_string()),
            files: Some(self.files.len()),
            ..StateDetail::default()
        };
        self.transition(SessionState::Selected, detail);
        Ok(true)
    }

    pub fn begin_generation(&mut self) -> Result<Vec<SelectedImage>, SessionError> {
        if self.is_generating() {
            return Err(SessionError::AlreadyGenerating);
        }
        if self.files.is_empty() {
            return Err(SessionError::NoFiles);
        }
        let detail = StateDetail {
            files: Some(self.files.len()),
            ..StateDetail::default()
        };
        self.transition(SessionState::Generating, detail);
        Ok(self.files.clone())
    }

    pub fn finish_generation(
        &mut self,
        outcome: Result<ListingRecord, GenerationError>,
    ) -> Result<SessionPhase, SessionError> {
        if !self.is_generating() {
            return Err(SessionError::NotGenerating);
        }
        match outcome {
            Ok(record) => {
                for finding in record.vocabulary_findings() {
                    self.log(SessionEvent::VocabularyWarning {
                        field: finding.field.to_string(),
                        vocabulary: finding.vocabulary.label().to_string(),
                        value: finding.value,
                    });
                }
                self.transition(SessionState::Ready(record), StateDetail::default());
            }
            Err(err) => {
                let rendered = err.to_string();
                let message = if rendered.trim().is_empty() {
                    GENERIC_FAILURE_MESSAGE.to_string()
                } else {
                    rendered
                };
                let detail = StateDetail {
                    error_kind: Some(err.kind().to_string()),
                    error: Some(message.clone()),
                    ..StateDetail::default()
                };
                self.transition(SessionState::Failed(message), detail);
            }
        }
        Ok(self.phase())
    }

    /// Runs one generation to completion on the calling thread.
    pub fn generate(&mut self, service: &dyn ListingService) -> Result<SessionPhase, SessionError> {
        let files = self.begin_generation()?;
        self.log(SessionEvent::GenerationRequest {
            service: service.name().to_string(),
            model: service.model().to_string(),
            images: files.len(),
        });
        let outcome = generate_listing(service, &files);
        self.finish_generation(outcome)
    }

    /// Clears files, previews, result and error. Refused while generating.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        if self.is_generating() {
            return Err(SessionError::AlreadyGenerating);
        }
        self.previews = PreviewSet::default();
        self.files.clear();
        self.transition(SessionState::Empty, StateDetail::default());
        Ok(())
    }

    fn transition(&mut self, next: SessionState, detail: StateDetail) {
        let from = self.phase();
        self.state = next;
        self.log(SessionEvent::SessionState {
            from: from.as_str().to_string(),
            to: self.phase().as_str().to_string(),
            source: detail.source,
            files: detail.files,
            error_kind: detail.error_kind,
            error: detail.error,
        });
    }

    fn log(&self, event: SessionEvent) {
        let Some(events) = self.events.as_ref() else {
            return;
        };
        if let Err(err) = events.record(&event) {
            eprintln!("listing-rs warning: event log write failed: {err:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use listing_contracts::events::{read_events, EventLog, SessionEvent};
    use listing_contracts::ListingRecord;
    use serde_json::json;

    use super::*;
    use crate::request::GenerationRequest;
    use crate::service::ServiceReply;

    struct FixedReply(Option<&'static str>);

    impl ListingService for FixedReply {
        fn name(&self) -> &str {
            "fixed"
        }

        fn model(&self) -> &str {
            "fixed-model"
        }

        fn send(&self, _request: &GenerationRequest) -> Result<ServiceReply, GenerationError> {
            Ok(ServiceReply {
                text: self.0.map(str::to_string),
            })
        }
    }

    fn images(dir: &Path, names: &[&str]) -> anyhow::Result<Vec<SelectedImage>> {
        let mut files = Vec::new();
        for name in names {
            let path = dir.join(name);
            fs::write(&path, name.as_bytes())?;
            files.push(SelectedImage::from_path(&path));
        }
        Ok(files)
    }

    fn record(description: &str) -> ListingRecord {
        serde_json::from_value(json!({"description": description, "materials": []}))
            .unwrap_or_else(|err| panic!("fixture record: {err}"))
    }

    #[test]
    fn selection_allocates_one_preview_per_file() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = PreviewStore::new();
        let mut session = ListingSession::new(store.clone());

        assert!(session.select_files(images(temp.path(), &["a.png", "b.jpg", "c.txt"])?)?);
        assert_eq!(session.phase(), SessionPhase::Selected);
        assert_eq!(session.files().len(), 3);
        assert_eq!(session.previews().len(), session.files().len());
        assert_eq!(store.live_count(), 3);
        Ok(())
    }

    #[test]
    fn replacing_selection_revokes_previous_previews() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = PreviewStore::new();
        let mut session = ListingSession::new(store.clone());

        session.select_files(images(temp.path(), &["a.png", "b.png"])?)?;
        let old_urls: Vec<String> = session
            .previews()
            .urls()
            .into_iter()
            .map(str::to_string)
            .collect();
        session.select_files(images(temp.path(), &["c.png"])?)?;

        assert!(old_urls.iter().all(|url| !store.is_live(url)));
        assert_eq!(store.live_count(), 1);
        assert_eq!(session.previews().len(), 1);
        Ok(())
    }

    #[test]
    fn empty_selection_is_ignored() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut session = ListingSession::default();
        session.select_files(images(temp.path(), &["a.png"])?)?;

        assert!(!session.select_files(Vec::new())?);
        assert_eq!(session.files().len(), 1);
        assert_eq!(session.phase(), SessionPhase::Selected);
        Ok(())
    }

    #[test]
    fn drop_keeps_only_images() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut session = ListingSession::default();

        let changed = session.drop_files(images(
            temp.path(),
            &["a.png", "notes.txt", "b.webp", "sheet.csv"],
        )?)?;
        assert!(changed);
        let names: Vec<String> = session
            .files()
            .iter()
            .map(SelectedImage::display_name)
            .collect();
        assert_eq!(names, vec!["a.png", "b.webp"]);
        assert_eq!(session.previews().len(), 2);
        Ok(())
    }

    #[test]
    fn drop_without_images_leaves_prior_state_untouched() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = PreviewStore::new();
        let mut session = ListingSession::new(store.clone());
        session.select_files(images(temp.path(), &["a.png"])?)?;
        session.begin_generation()?;
        session.finish_generation(Ok(record("kept")))?;

        let changed = session.drop_files(images(temp.path(), &["notes.txt", "data.bin"])?)?;
        assert!(!changed);
        assert_eq!(session.phase(), SessionPhase::Ready);
        assert_eq!(session.listing().map(|r| r.description.as_str()), Some("kept"));
        assert_eq!(session.files().len(), 1);
        assert_eq!(store.live_count(), 1);
        Ok(())
    }

    #[test]
    fn new_selection_clears_previous_result_and_error() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut session = ListingSession::default();
        session.select_files(images(temp.path(), &["a.png"])?)?;
        session.begin_generation()?;
        session.finish_generation(Err(GenerationError::EmptyResponse))?;
        assert_eq!(session.error(), Some("No response from AI"));

        session.select_files(images(temp.path(), &["b.png"])?)?;
        assert_eq!(session.state(), &SessionState::Selected);
        assert_eq!(session.error(), None);
        assert_eq!(session.listing(), None);
        Ok(())
    }

    #[test]
    fn reset_always_yields_empty() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = PreviewStore::new();
        let mut session = ListingSession::new(store.clone());

        session.reset()?;
        assert_eq!(session.state(), &SessionState::Empty);

        session.select_files(images(temp.path(), &["a.png", "b.png"])?)?;
        session.begin_generation()?;
        session.finish_generation(Ok(record("D")))?;
        session.reset()?;

        assert_eq!(session.state(), &SessionState::Empty);
        assert!(session.files().is_empty());
        assert!(session.previews().is_empty());
        assert_eq!(session.listing(), None);
        assert_eq!(session.error(), None);
        assert_eq!(store.live_count(), 0);
        Ok(())
    }

    #[test]
    fn dropping_the_session_revokes_previews() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = PreviewStore::new();
        {
            let mut session = ListingSession::new(store.clone());
            session.select_files(images(temp.path(), &["a.png", "b.png"])?)?;
            assert_eq!(store.live_count(), 2);
        }
        assert_eq!(store.live_count(), 0);
        Ok(())
    }

    #[test]
    fn generation_requires_files_and_blocks_reentry() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut session = ListingSession::default();
        assert!(!session.can_generate());
        assert_eq!(session.begin_generation(), Err(SessionError::NoFiles));

        session.select_files(images(temp.path(), &["a.png"])?)?;
        assert!(session.can_generate());
        session.begin_generation()?;
        assert!(!session.can_generate());
        assert_eq!(
            session.begin_generation(),
            Err(SessionError::AlreadyGenerating)
        );
        assert_eq!(
            session.select_files(images(temp.path(), &["b.png"])?),
            Err(SessionError::AlreadyGenerating)
        );
        assert_eq!(session.phase(), SessionPhase::Generating);
        Ok(())
    }

    #[test]
    fn reset_and_drop_are_refused_while_generating() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let events_path = temp.path().join("events.jsonl");
        let store = PreviewStore::new();
        let mut session =
            ListingSession::new(store.clone()).with_events(EventLog::new(&events_path, "s-4"));
        session.select_files(images(temp.path(), &["a.png"])?)?;
        session.begin_generation()?;

        assert_eq!(session.reset(), Err(SessionError::AlreadyGenerating));
        assert_eq!(
            session.drop_files(images(temp.path(), &["notes.txt", "b.png"])?),
            Err(SessionError::AlreadyGenerating)
        );
        assert_eq!(session.phase(), SessionPhase::Generating);
        assert_eq!(session.files().len(), 1);
        assert_eq!(store.live_count(), 1);

        assert_eq!(
            session.finish_generation(Ok(record("D")))?,
            SessionPhase::Ready
        );
        assert!(read_events(&events_path)?
            .iter()
            .all(|logged| logged.event.kind() != "drop_filtered"));
        Ok(())
    }

    #[test]
    fn finish_outside_generation_is_rejected() {
        let mut session = ListingSession::default();
        assert_eq!(
            session.finish_generation(Ok(record("D"))),
            Err(SessionError::NotGenerating)
        );
    }

    #[test]
    fn failure_without_message_falls_back_to_generic_text() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let mut session = ListingSession::default();
        session.select_files(images(temp.path(), &["a.png"])?)?;
        session.begin_generation()?;
        session.finish_generation(Err(GenerationError::Service(String::new())))?;
        assert_eq!(session.error(), Some(GENERIC_FAILURE_MESSAGE));
        Ok(())
    }

    #[test]
    fn successful_generation_goes_generating_to_ready() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let events_path = temp.path().join("events.jsonl");
        let mut session =
            ListingSession::default().with_events(EventLog::new(&events_path, "s-1"));
        session.select_files(images(temp.path(), &["a.png", "b.png"])?)?;

        let reply = r#"{"description":"D","materials":["cotton","lace"]}"#;
        let phase = session.generate(&FixedReply(Some(reply)))?;
        assert_eq!(phase, SessionPhase::Ready);
        let expected: ListingRecord = serde_json::from_str(reply)?;
        assert_eq!(session.listing(), Some(&expected));

        let transitions: Vec<(String, String)> = read_events(&events_path)?
            .into_iter()
            .filter_map(|logged| match logged.event {
                SessionEvent::SessionState { from, to, .. } => Some((from, to)),
                _ => None,
            })
            .collect();
        assert_eq!(
            transitions,
            vec![
                ("empty".to_string(), "selected".to_string()),
                ("selected".to_string(), "generating".to_string()),
                ("generating".to_string(), "ready".to_string()),
            ]
        );
        Ok(())
    }

    #[test]
    fn absent_and_unparsable_replies_fail_with_their_kind() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let events_path = temp.path().join("events.jsonl");
        let mut session =
            ListingSession::default().with_events(EventLog::new(&events_path, "s-2"));
        session.select_files(images(temp.path(), &["a.png"])?)?;

        assert_eq!(session.generate(&FixedReply(None))?, SessionPhase::Failed);
        assert_eq!(
            session.error(),
            Some(GenerationError::EmptyResponse.to_string().as_str())
        );

        assert_eq!(
            session.generate(&FixedReply(Some("<html>")))?,
            SessionPhase::Failed
        );
        assert!(session
            .error()
            .unwrap_or_default()
            .starts_with("AI response was not a valid listing"));

        let kinds: Vec<String> = read_events(&events_path)?
            .into_iter()
            .filter_map(|logged| match logged.event {
                SessionEvent::SessionState { to, error_kind, .. } if to == "failed" => error_kind,
                _ => None,
            })
            .collect();
        assert_eq!(kinds, vec!["empty_response", "malformed_response"]);
        Ok(())
    }

    #[test]
    fn off_vocabulary_values_pass_through_with_a_warning() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let events_path = temp.path().join("events.jsonl");
        let mut session =
            ListingSession::default().with_events(EventLog::new(&events_path, "s-3"));
        session.select_files(images(temp.path(), &["a.png"])?)?;

        let reply = r#"{"description":"D","materials":[],"holiday":"Diwali"}"#;
        session.generate(&FixedReply(Some(reply)))?;
        assert_eq!(session.listing().map(|r| r.holiday.as_str()), Some("Diwali"));

        let warnings: Vec<SessionEvent> = read_events(&events_path)?
            .into_iter()
            .map(|logged| logged.event)
            .filter(|event| event.kind() == "vocabulary_warning")
            .collect();
        assert_eq!(
            warnings,
            vec![SessionEvent::VocabularyWarning {
                field: "holiday".to_string(),
                vocabulary: "holiday".to_string(),
                value: "Diwali".to_string(),
            }]
        );
        Ok(())
    }
}
