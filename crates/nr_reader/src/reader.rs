use crate::gesture::{DragTracker, DragVisual, GestureConfig, SwipeOutcome};
use crate::input::{Command, DoubleActivation, KeyBindings, DOUBLE_ACTIVATION_MS};
use crate::narration::{narratable_text, NarrationConfig, NarrationProgress, Narrator, PlaybackState};
use crate::navigation::{Direction, NavEvent, Navigator, Phase, PHASE_MS};
use crate::notices::{NoticeBoard, NOTICE_TTL_MS};
use crate::session::{self, CategoryFilter, DateFilter, SessionFilter};
use chrono::{FixedOffset, NaiveDate};
use nr_core::{Article, KeepAwake, KeyValueStore, Notice, Result, SpeechEngine};
use nr_storage::{state, CollectionStore, MarkSet, PlaybackPosition, PositionSnapshot, SaveOutcome};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub phase_ms: u64,
    pub notice_ttl_ms: u64,
    pub double_activation_ms: u64,
    pub mark_key: char,
    pub gesture: GestureConfig,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            phase_ms: PHASE_MS,
            notice_ttl_ms: NOTICE_TTL_MS,
            double_activation_ms: DOUBLE_ACTIVATION_MS,
            mark_key: '*',
            gesture: GestureConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Manual,
    AutoAdvance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Saved articles cannot be deleted
    Protected,
    NothingSelected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    None,
    /// The selected date has no local articles; the caller should fetch it
    FetchDate(NaiveDate),
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateStep {
    pub date: NaiveDate,
    pub needs_fetch: bool,
}

/// The long-lived reading session: filtered sequence, navigation, marks and narration.
/// All transitions run from direct calls or `tick`, each given the current time.
pub struct Reader<E: SpeechEngine> {
    store: Arc<dyn KeyValueStore>,
    collection: CollectionStore,
    offset: FixedOffset,
    articles: Vec<Article>,
    read: MarkSet,
    saved: MarkSet,
    filter: SessionFilter,
    sequence: Vec<usize>,
    nav: Navigator,
    narrator: Narrator<E>,
    drag: DragTracker,
    double: DoubleActivation,
    keys: KeyBindings,
    notices: NoticeBoard,
    summary_view: bool,
    remote_dates: Vec<NaiveDate>,
}

impl<E: SpeechEngine> Reader<E> {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        engine: E,
        config: ReaderConfig,
        narration: NarrationConfig,
        offset: FixedOffset,
    ) -> Result<Self> {
        let collection = CollectionStore::new(store.clone());
        let articles = collection.load()?;
        let filter = SessionFilter {
            category: CategoryFilter::All,
            date: session::default_date(&articles, &offset),
            hide_read: state::load_hide_read(store.as_ref())?,
        };

        let mut reader = Self {
            read: MarkSet::read(store.clone())?,
            saved: MarkSet::saved(store.clone())?,
            collection,
            store,
            offset,
            articles,
            filter,
            sequence: Vec::new(),
            nav: Navigator::new(config.phase_ms),
            narrator: Narrator::new(engine, narration),
            drag: DragTracker::new(config.gesture),
            double: DoubleActivation::new(config.double_activation_ms),
            keys: KeyBindings {
                mark_key: config.mark_key,
            },
            notices: NoticeBoard::new(config.notice_ttl_ms),
            summary_view: false,
            remote_dates: Vec::new(),
        };
        reader.recompute();
        reader.nav.clamp(reader.sequence.len());
        Ok(reader)
    }

    pub fn with_keep_awake(mut self, keep_awake: Box<dyn KeepAwake>) -> Self {
        self.narrator = self.narrator.with_keep_awake(keep_awake);
        self
    }

    // ---- read access ----

    pub fn current(&self) -> Option<&Article> {
        let index = self.nav.index()?;
        self.sequence.get(index).and_then(|&i| self.articles.get(i))
    }

    /// `(index, len)` within the filtered sequence
    pub fn position(&self) -> (Option<usize>, usize) {
        (self.nav.index(), self.sequence.len())
    }

    pub fn sequence(&self) -> impl Iterator<Item = &Article> {
        self.sequence.iter().map(|&i| &self.articles[i])
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn filter(&self) -> &SessionFilter {
        &self.filter
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notices.current()
    }

    pub fn playback(&self) -> &PlaybackState {
        self.narrator.state()
    }

    pub fn narrator(&self) -> &Narrator<E> {
        &self.narrator
    }

    pub fn narrator_mut(&mut self) -> &mut Narrator<E> {
        &mut self.narrator
    }

    pub fn is_read(&self, id: &str) -> bool {
        self.read.contains(id)
    }

    pub fn is_saved(&self, id: &str) -> bool {
        self.saved.contains(id)
    }

    pub fn summary_view(&self) -> bool {
        self.summary_view
    }

    pub fn keys(&self) -> &KeyBindings {
        &self.keys
    }

    pub fn is_animating(&self) -> bool {
        self.nav.is_animating()
    }

    pub fn transition(&self, now_ms: u64) -> Option<(Direction, Phase, f32)> {
        self.nav.progress(now_ms)
    }

    pub fn drag_visual(&self) -> DragVisual {
        self.drag.visual()
    }

    pub fn categories(&self) -> Vec<String> {
        session::categories(&self.articles)
    }

    /// Union of local and remote dates, newest first
    pub fn known_dates(&self) -> Vec<NaiveDate> {
        let mut dates = session::local_dates(&self.articles, &self.offset);
        dates.extend(self.remote_dates.iter().copied());
        dates.sort_by(|a, b| b.cmp(a));
        dates.dedup();
        dates
    }

    // ---- navigation ----

    pub fn next(&mut self, now_ms: u64) -> bool {
        self.navigate(Direction::Forward, Origin::Manual, now_ms)
    }

    pub fn previous(&mut self, now_ms: u64) -> bool {
        self.navigate(Direction::Backward, Origin::Manual, now_ms)
    }

    fn navigate(&mut self, direction: Direction, origin: Origin, now_ms: u64) -> bool {
        if self.nav.is_animating() {
            debug!("Navigation dropped, transition in flight");
            return false;
        }
        if let Err(boundary) = self.nav.check(direction, self.sequence.len()) {
            self.notices.post(Notice::BoundaryReached(boundary), now_ms);
            return false;
        }
        if origin == Origin::Manual && self.narrator.is_active() {
            self.narrator.stop();
        }

        let hold = match self.mark_current_read(now_ms) {
            Some(id) => {
                direction == Direction::Forward && self.filter.hide_read && !self.saved.contains(&id)
            }
            None => false,
        };
        self.drag.cancel();
        self.nav.begin(direction, hold, now_ms);
        true
    }

    pub fn jump_to_newest(&mut self, now_ms: u64) {
        if self.nav.is_animating() {
            return;
        }
        if self.narrator.is_active() {
            self.narrator.stop();
        }
        self.mark_current_read(now_ms);
        self.recompute();
        self.nav.set_index(0, self.sequence.len());
        self.article_changed();
        self.store_snapshot(now_ms);
    }

    /// Marks the current article read before any index change; returns its id
    fn mark_current_read(&mut self, now_ms: u64) -> Option<String> {
        let id = self.current()?.id.clone();
        let result = self.read.mark(&id);
        self.note_write(result, now_ms);
        Some(id)
    }

    /// Advances animations, narration and notices
    pub fn tick(&mut self, now_ms: u64) {
        self.notices.tick(now_ms);

        while let Some(event) = self.nav.tick(now_ms) {
            match event {
                NavEvent::ExitCompleted { direction, hold } => {
                    self.recompute();
                    self.nav.advance(direction, hold, self.sequence.len());
                    self.article_changed();
                }
                NavEvent::Settled => {
                    self.store_snapshot(now_ms);
                    self.narrator.transition_settled(now_ms);
                }
            }
        }

        while let Some(progress) = self.narrator.pump() {
            self.narration_progress(progress, now_ms);
        }

        if self.narrator.tick(now_ms) {
            self.start_narration(now_ms);
        }
    }

    fn narration_progress(&mut self, progress: std::result::Result<NarrationProgress, Notice>, now_ms: u64) {
        match progress {
            Ok(NarrationProgress::Continuing { chunk_index }) => {
                if let PlaybackState::Speaking { article_id, .. } = self.narrator.state() {
                    let position = PlaybackPosition {
                        article_id: article_id.clone(),
                        chunk_index,
                    };
                    let result = position.store(self.store.as_ref());
                    self.note_write(result, now_ms);
                }
            }
            Ok(NarrationProgress::ArticleFinished { article_id }) => {
                let result = PlaybackPosition::clear(self.store.as_ref());
                self.note_write(result, now_ms);
                if self.nav.check(Direction::Forward, self.sequence.len()).is_ok() {
                    info!("⏭️ Finished {}, advancing", article_id);
                    self.narrator.arm_auto_advance();
                    if !self.navigate(Direction::Forward, Origin::AutoAdvance, now_ms) {
                        self.narrator.stop();
                    }
                } else {
                    info!("✨ Finished {}, no further articles", article_id);
                }
            }
            Ok(NarrationProgress::Ignored) => {}
            Err(notice) => self.notices.post(notice, now_ms),
        }
    }

    // ---- marks and deletion ----

    /// Flips the saved mark of the current article; returns the new state
    pub fn toggle_saved(&mut self, now_ms: u64) -> Option<bool> {
        let id = self.current()?.id.clone();
        let result = self.saved.toggle(&id);
        let saved = self.note_write(result, now_ms).unwrap_or_else(|| self.saved.contains(&id));
        self.refresh();
        Some(saved)
    }

    pub fn delete_current(&mut self, now_ms: u64) -> DeleteOutcome {
        let Some(id) = self.current().map(|a| a.id.clone()) else {
            return DeleteOutcome::NothingSelected;
        };
        if self.saved.contains(&id) {
            debug!("Refusing to delete saved article {}", id);
            return DeleteOutcome::Protected;
        }
        if self.narrator.is_active() {
            self.narrator.stop();
        }

        self.articles.retain(|a| a.id != id);
        match self.collection.save(self.articles.clone()) {
            Ok(persisted) => {
                if persisted.outcome == SaveOutcome::Exhausted {
                    self.notices.post(Notice::StorageExhausted, now_ms);
                }
                self.articles = persisted.articles;
            }
            Err(e) => {
                warn!("⚠️ Could not persist deletion of {}: {}", id, e);
            }
        }

        self.recompute();
        self.nav.clamp(self.sequence.len());
        self.article_changed();
        self.store_snapshot(now_ms);
        DeleteOutcome::Deleted
    }

    pub fn reset_read_marks(&mut self, now_ms: u64) {
        let result = self.read.clear();
        self.note_write(result, now_ms);
        self.refresh();
    }

    // ---- filter ----

    pub fn set_hide_read(&mut self, hide_read: bool, now_ms: u64) {
        self.filter.hide_read = hide_read;
        let result = state::store_hide_read(self.store.as_ref(), hide_read);
        self.note_write(result, now_ms);
        self.refresh();
    }

    pub fn set_category(&mut self, category: CategoryFilter, now_ms: u64) {
        self.filter.category = category;
        self.reselect(now_ms);
    }

    pub fn set_date(&mut self, date: DateFilter, now_ms: u64) {
        self.filter.date = date;
        self.reselect(now_ms);
    }

    /// Moves to the next (`newer`) or previous known date. `needs_fetch` is set when the
    /// selected date has no local articles.
    pub fn step_date(&mut self, newer: bool, now_ms: u64) -> Option<DateStep> {
        let dates = self.known_dates();
        let target = match self.filter.date {
            DateFilter::On(current) => {
                let position = dates.iter().position(|d| *d == current);
                match (position, newer) {
                    (Some(i), true) => i.checked_sub(1).and_then(|i| dates.get(i)),
                    (Some(i), false) => dates.get(i + 1),
                    (None, _) => dates.first(),
                }
            }
            DateFilter::All if !newer => dates.first(),
            DateFilter::All => None,
        }
        .copied()?;

        self.set_date(DateFilter::On(target), now_ms);
        let needs_fetch = !session::local_dates(&self.articles, &self.offset).contains(&target);
        Some(DateStep {
            date: target,
            needs_fetch,
        })
    }

    pub fn set_remote_dates(&mut self, dates: &[String]) {
        self.remote_dates = dates
            .iter()
            .filter_map(|d| d.parse::<DateFilter>().ok().and_then(|f| f.date()))
            .collect();
    }

    fn reselect(&mut self, now_ms: u64) {
        let previous = self.current().map(|a| a.id.clone());
        self.nav.reset();
        self.recompute();
        self.nav.set_index(0, self.sequence.len());
        if self.current().map(|a| &a.id) != previous.as_ref() {
            if self.narrator.is_active() {
                self.narrator.stop();
            }
            self.article_changed();
        }
        self.store_snapshot(now_ms);
    }

    // ---- collection ----

    /// Replaces the collection after ingestion, keeping the current article when it survives
    pub fn set_collection(&mut self, articles: Vec<Article>, now_ms: u64) {
        let first_population = self.articles.is_empty();
        let previous = self.current().map(|a| a.id.clone());
        self.articles = articles;
        if first_population {
            self.filter.date = session::default_date(&self.articles, &self.offset);
            self.recompute();
            self.nav.set_index(0, self.sequence.len());
            self.store_snapshot(now_ms);
        } else {
            self.refresh_from(previous);
        }
    }

    /// Reapplies the stored position snapshot, if any
    pub fn restore(&mut self) -> Result<bool> {
        let Some(snapshot) = PositionSnapshot::load(self.store.as_ref())? else {
            return Ok(false);
        };
        self.filter.category = snapshot.category.parse().unwrap_or_default();
        self.filter.date = snapshot.date.parse().unwrap_or(self.filter.date);
        self.recompute();

        let found = self
            .sequence
            .iter()
            .position(|&i| self.articles[i].id == snapshot.article_id);
        match found {
            Some(index) => self.nav.set_index(index, self.sequence.len()),
            None => self.nav.set_index(snapshot.index, self.sequence.len()),
        }
        debug!("Restored position {:?} of {}", self.nav.index(), self.sequence.len());
        Ok(found.is_some())
    }

    // ---- narration ----

    pub fn toggle_narration(&mut self, now_ms: u64) {
        if self.narrator.is_active() {
            self.narrator.stop();
            return;
        }
        self.start_narration(now_ms);
    }

    fn start_narration(&mut self, now_ms: u64) {
        let Some(article) = self.current() else {
            return;
        };
        let article_id = article.id.clone();
        let text = narratable_text(article, self.summary_view);
        let from_chunk = match PlaybackPosition::load(self.store.as_ref()) {
            Ok(Some(position)) if position.article_id == article_id => position.chunk_index,
            Ok(_) => 0,
            Err(e) => {
                warn!("⚠️ Stored playback position unreadable: {}", e);
                0
            }
        };

        if let Err(notice) = self.narrator.start(&article_id, &text, from_chunk, now_ms) {
            self.notices.post(notice, now_ms);
            return;
        }
        if let PlaybackState::Speaking { chunk_index, .. } = self.narrator.state() {
            let position = PlaybackPosition {
                article_id,
                chunk_index: *chunk_index,
            };
            let result = position.store(self.store.as_ref());
            self.note_write(result, now_ms);
        }
    }

    /// Stops narration without forgetting the stored playback position
    pub fn shutdown(&mut self) {
        self.narrator.stop();
    }

    // ---- input ----

    /// Double activation toggles the summary view when the article has a summary
    pub fn activate_content(&mut self, now_ms: u64) -> bool {
        if !self.double.register(now_ms) {
            return false;
        }
        if !self.current().is_some_and(Article::has_summary) {
            return false;
        }
        self.summary_view = !self.summary_view;
        true
    }

    pub fn drag_press(&mut self, x: f32) {
        if !self.nav.is_animating() {
            self.drag.press(x);
        }
    }

    pub fn drag_motion(&mut self, x: f32) -> DragVisual {
        self.drag.motion(x)
    }

    pub fn drag_release(&mut self, x: f32, now_ms: u64) -> SwipeOutcome {
        let outcome = self.drag.release(x);
        match outcome {
            SwipeOutcome::Next => {
                self.next(now_ms);
            }
            SwipeOutcome::Previous => {
                self.previous(now_ms);
            }
            SwipeOutcome::Tap => {
                self.activate_content(now_ms);
            }
            SwipeOutcome::SnapBack => {}
        }
        outcome
    }

    pub fn command(&mut self, command: Command, now_ms: u64) -> CommandOutcome {
        match command {
            Command::Next => {
                self.next(now_ms);
            }
            Command::Previous => {
                self.previous(now_ms);
            }
            Command::ToggleSaved => {
                self.toggle_saved(now_ms);
            }
            Command::Delete => {
                self.delete_current(now_ms);
            }
            Command::ToggleNarration => self.toggle_narration(now_ms),
            Command::JumpToNewest => self.jump_to_newest(now_ms),
            Command::ToggleHideRead => {
                let hide_read = !self.filter.hide_read;
                self.set_hide_read(hide_read, now_ms);
            }
            Command::CycleCategory => {
                let next = self.next_category();
                self.set_category(next, now_ms);
            }
            Command::PreviousDate | Command::NextDate => {
                let step = self.step_date(command == Command::NextDate, now_ms);
                if let Some(DateStep {
                    date,
                    needs_fetch: true,
                }) = step
                {
                    return CommandOutcome::FetchDate(date);
                }
            }
            Command::ResetRead => self.reset_read_marks(now_ms),
            Command::Activate => {
                self.activate_content(now_ms);
            }
            Command::Quit => return CommandOutcome::Quit,
        }
        CommandOutcome::None
    }

    pub fn post_notice(&mut self, notice: Notice, now_ms: u64) {
        self.notices.post(notice, now_ms);
    }

    fn next_category(&self) -> CategoryFilter {
        let categories = self.categories();
        match &self.filter.category {
            CategoryFilter::All => categories
                .first()
                .map_or(CategoryFilter::All, |c| CategoryFilter::Exact(c.clone())),
            CategoryFilter::Exact(current) => categories
                .iter()
                .position(|c| c == current)
                .and_then(|i| categories.get(i + 1))
                .map_or(CategoryFilter::All, |c| CategoryFilter::Exact(c.clone())),
        }
    }

    // ---- internals ----

    fn recompute(&mut self) {
        self.sequence = session::filter(
            &self.articles,
            &self.filter,
            &self.read,
            &self.saved,
            &self.offset,
        );
    }

    /// Recomputes the sequence, staying on the current article when it is still present
    fn refresh(&mut self) {
        let current = self.current().map(|a| a.id.clone());
        self.refresh_from(current);
    }

    /// `current` is the id shown before the articles or filter changed
    fn refresh_from(&mut self, current: Option<String>) {
        self.recompute();
        let len = self.sequence.len();
        let found = current.as_ref().and_then(|id| {
            self.sequence
                .iter()
                .position(|&i| &self.articles[i].id == id)
        });
        match found {
            Some(index) => self.nav.set_index(index, len),
            None => {
                self.nav.clamp(len);
                if current.is_some() {
                    if let PlaybackState::Speaking { .. } = self.narrator.state() {
                        self.narrator.stop();
                    }
                    self.article_changed();
                }
            }
        }
    }

    fn article_changed(&mut self) {
        self.double.reset();
        self.summary_view = false;
    }

    fn store_snapshot(&mut self, now_ms: u64) {
        let Some(index) = self.nav.index() else {
            return;
        };
        let Some(article) = self.current() else {
            return;
        };
        let snapshot = PositionSnapshot {
            article_id: article.id.clone(),
            date: self.filter.date.to_string(),
            category: self.filter.category.to_string(),
            timestamp: article.published_at.clone(),
            index,
        };
        let result = snapshot.store(self.store.as_ref());
        self.note_write(result, now_ms);
    }

    /// Logs a failed durable write; quota failures raise the storage notice
    fn note_write<T>(&mut self, result: Result<T>, now_ms: u64) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("⚠️ Durable write failed: {}", e);
                if e.is_quota() {
                    self.notices.post(Notice::StorageExhausted, now_ms);
                }
                None
            }
        }
    }
}
