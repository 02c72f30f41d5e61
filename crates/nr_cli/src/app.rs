use crate::config::Config;
use crate::render::{self, View};
use crate::terminal::{convert_event, Input, TerminalGuard};
use anyhow::Result;
use chrono::{FixedOffset, NaiveDate};
use crossterm::event::EventStream;
use futures::StreamExt;
use nr_core::{KeyValueStore, Notice, SpeechEngine};
use nr_ingest::{IngestReport, IngestionService};
use nr_reader::{CommandOutcome, Reader};
use std::io::{self, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub const TICK_MS: u64 = 50;

/// Results of background archive requests, applied on the control loop
pub enum Fetched {
    Latest(nr_core::Result<IngestReport>),
    Date(NaiveDate, nr_core::Result<IngestReport>),
    Dates(nr_core::Result<Vec<String>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Fetch(NaiveDate),
    Quit,
}

pub async fn run(
    config: &Config,
    store: Arc<dyn KeyValueStore>,
    service: Arc<IngestionService>,
    offset: FixedOffset,
) -> Result<()> {
    let engine_config = config.engine_config();
    let engine = nr_speech::create_engine(&engine_config)?;
    let mut reader = Reader::new(
        store,
        engine,
        config.reader_config(),
        config.narration_config(),
        offset,
    )?
    .with_keep_awake(nr_speech::create_keep_awake(&engine_config));

    match reader.restore() {
        Ok(true) => debug!("Restored reading position"),
        Ok(false) => {}
        Err(e) => warn!("⚠️ Could not restore reading position: {}", e),
    }
    info!("📰 Reader started with {} local articles", reader.articles().len());

    let (tx, mut rx) = mpsc::unbounded_channel();
    spawn_latest(&service, &tx);

    let clock = Instant::now();
    let now_ms = || clock.elapsed().as_millis() as u64;
    let cell_width = config.gesture.cell_width;

    let _guard = TerminalGuard::enter()?;
    let mut stdout = io::stdout();
    let mut events = EventStream::new();
    let mut ticker = tokio::time::interval(Duration::from_millis(TICK_MS));

    loop {
        tokio::select! {
            _ = ticker.tick() => reader.tick(now_ms()),
            event = events.next() => match event {
                Some(Ok(event)) => {
                    let Some(input) = convert_event(&event, cell_width) else {
                        continue;
                    };
                    match handle_input(&mut reader, input, now_ms()) {
                        Flow::Continue => {}
                        Flow::Fetch(date) => spawn_date(&service, &tx, date),
                        Flow::Quit => break,
                    }
                }
                Some(Err(e)) => {
                    warn!("⚠️ Terminal input failed: {}", e);
                    break;
                }
                None => break,
            },
            Some(fetched) = rx.recv() => apply_fetch(&mut reader, fetched, now_ms()),
        }

        let (width, _) = crossterm::terminal::size()?;
        let view = View::capture(&reader, now_ms(), &offset, cell_width, width);
        render::draw(&mut stdout, &view)?;
    }

    reader.shutdown();
    stdout.flush()?;
    info!("👋 Reader closed");
    Ok(())
}

fn spawn_latest(service: &Arc<IngestionService>, tx: &mpsc::UnboundedSender<Fetched>) {
    let service = service.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let latest = service.fetch_latest().await;
        let _ = tx.send(Fetched::Latest(latest));
        let dates = service.available_dates().await;
        let _ = tx.send(Fetched::Dates(dates));
    });
}

fn spawn_date(service: &Arc<IngestionService>, tx: &mpsc::UnboundedSender<Fetched>, date: NaiveDate) {
    let service = service.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let report = service
            .fetch_for_date(&date.format("%Y-%m-%d").to_string())
            .await;
        let _ = tx.send(Fetched::Date(date, report));
    });
}

pub fn handle_input<E: SpeechEngine>(reader: &mut Reader<E>, input: Input, now_ms: u64) -> Flow {
    match input {
        Input::Key(key) => {
            let Some(command) = reader.keys().command(key) else {
                return Flow::Continue;
            };
            match reader.command(command, now_ms) {
                CommandOutcome::None => Flow::Continue,
                CommandOutcome::FetchDate(date) => Flow::Fetch(date),
                CommandOutcome::Quit => Flow::Quit,
            }
        }
        Input::Press(x) => {
            reader.drag_press(x);
            Flow::Continue
        }
        Input::Drag(x) => {
            reader.drag_motion(x);
            Flow::Continue
        }
        Input::Release(x) => {
            reader.drag_release(x, now_ms);
            Flow::Continue
        }
        Input::Resize => Flow::Continue,
    }
}

pub fn apply_fetch<E: SpeechEngine>(reader: &mut Reader<E>, fetched: Fetched, now_ms: u64) {
    match fetched {
        Fetched::Latest(Ok(report)) | Fetched::Date(_, Ok(report)) => {
            if !report.up_to_date {
                info!(
                    "✨ Archive {} merged: {} parsed, {} skipped",
                    report.archive_date, report.parsed, report.skipped
                );
            }
            let exhausted = report.storage_exhausted();
            reader.set_collection(report.articles, now_ms);
            if exhausted {
                reader.post_notice(Notice::StorageExhausted, now_ms);
            }
        }
        Fetched::Latest(Err(e)) => {
            warn!("⚠️ Could not fetch the latest archive: {}", e);
            reader.post_notice(Notice::Offline, now_ms);
        }
        Fetched::Date(date, Err(e)) => {
            warn!("⚠️ Could not fetch archive {}: {}", date, e);
            reader.post_notice(Notice::Offline, now_ms);
        }
        Fetched::Dates(Ok(dates)) => reader.set_remote_dates(&dates),
        Fetched::Dates(Err(e)) => debug!("Archive catalogue unavailable: {}", e),
    }
}
