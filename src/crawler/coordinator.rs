//! Crawler coordinator - main crawl loop
//!
//! This module drives the paginated listing from the first page (or a
//! persisted cursor) to the end, including:
//! - Absorbing pages into the accumulator
//! - Writing checkpoints at interval boundaries
//! - Saving a final checkpoint on fetch failure or interruption
//! - Clearing the checkpoint once the listing completes

use crate::config::CrawlerConfig;
use crate::crawler::{Accumulator, CrawlError};
use crate::model::{Entry, FolderRef, ResumeState};
use crate::remote::{Page, PageFetcher, RemoteError};
use crate::storage::CheckpointStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Settings that shape a single crawl
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Listing root ("" for the whole store)
    pub root_path: String,

    /// Files between checkpoint writes
    pub checkpoint_interval: usize,
}

impl From<&CrawlerConfig> for CrawlSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            root_path: config.root_path.clone(),
            checkpoint_interval: config.checkpoint_interval,
        }
    }
}

/// Result of a completed crawl
#[derive(Debug)]
pub struct CrawlOutput {
    pub entries: Vec<Entry>,
    pub folders: Vec<FolderRef>,
    /// Pages fetched by this run (not counting pages before a resume)
    pub pages_fetched: usize,
    /// True if the run continued from a checkpoint
    pub resumed: bool,
}

/// Resumable crawler over a paginated listing
pub struct Crawler<F, S> {
    fetcher: F,
    store: S,
    settings: CrawlSettings,
    cancel: Option<Arc<AtomicBool>>,
}

impl<F: PageFetcher, S: CheckpointStore> Crawler<F, S> {
    /// Creates a crawler
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Source of listing pages
    /// * `store` - Where checkpoints are persisted
    /// * `settings` - Root path and checkpoint interval
    pub fn new(fetcher: F, store: S, settings: CrawlSettings) -> Self {
        Self {
            fetcher,
            store,
            settings,
            cancel: None,
        }
    }

    /// Installs a flag that stops the crawl between pages once set
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Gives the checkpoint store back, e.g. to record the finished scan
    pub fn into_store(self) -> S {
        self.store
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Runs the crawl to completion
    ///
    /// # Arguments
    ///
    /// * `resume` - State loaded from a checkpoint, or `None` to start fresh
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlOutput)` - The listing finished; the checkpoint is cleared
    /// * `Err(CrawlError)` - The crawl stopped; a checkpoint was saved if a
    ///   cursor was known
    pub async fn run(&mut self, resume: Option<ResumeState>) -> Result<CrawlOutput, CrawlError> {
        let interval = self.settings.checkpoint_interval;
        let resumed = resume.is_some();

        let (mut acc, mut cursor) = match resume {
            Some(state) if state.checkpoint.root_path != self.settings.root_path => {
                tracing::error!(
                    "Checkpoint belongs to '{}', not '{}'; refusing to resume",
                    display_root(&state.checkpoint.root_path),
                    display_root(&self.settings.root_path)
                );
                return Err(CrawlError::RootMismatch {
                    checkpoint_root: state.checkpoint.root_path,
                    configured_root: self.settings.root_path.clone(),
                });
            }
            Some(state) => {
                tracing::info!(
                    "Resuming crawl from checkpoint saved {} ({} files, {} folders)",
                    state.checkpoint.saved_at,
                    state.entries.len(),
                    state.folders.len()
                );
                let cursor = state.checkpoint.cursor.clone();
                (Accumulator::resume(state, interval), Some(cursor))
            }
            None => {
                self.store.clear_checkpoint()?;
                tracing::info!(
                    "Starting fresh crawl of '{}'",
                    display_root(&self.settings.root_path)
                );
                (Accumulator::new(interval), None)
            }
        };

        let mut pages_fetched = 0;

        loop {
            if self.is_cancelled() {
                let resumable = match &cursor {
                    Some(c) => {
                        self.store.save_checkpoint(&acc.snapshot(&self.settings.root_path, c))?;
                        true
                    }
                    None => false,
                };
                tracing::warn!(
                    "Crawl interrupted after {} files (checkpoint saved: {})",
                    acc.entry_count(),
                    resumable
                );
                return Err(CrawlError::Interrupted {
                    entries: acc.entry_count(),
                    resumable,
                });
            }

            let result = match &cursor {
                None => self.fetcher.list_first(&self.settings.root_path).await,
                Some(c) => self.fetcher.list_continue(c).await,
            };

            let Page {
                records,
                cursor: next_cursor,
                has_more,
            } = match result {
                Ok(page) => page,
                Err(e) => return Err(self.fail_fetch(&acc, cursor.as_deref(), e)),
            };

            pages_fetched += 1;
            let crossed = acc.absorb(records);
            let c = cursor.insert(next_cursor);

            tracing::debug!(
                "Page {}: {} files, {} folders so far",
                pages_fetched,
                acc.entry_count(),
                acc.folder_count()
            );

            if !has_more {
                break;
            }

            if crossed {
                self.store.save_checkpoint(&acc.snapshot(&self.settings.root_path, c))?;
                tracing::info!(
                    "Checkpoint: {} files, {} folders",
                    acc.entry_count(),
                    acc.folder_count()
                );
            }
        }

        if let Err(e) = self.store.clear_checkpoint() {
            tracing::warn!("Crawl finished but the checkpoint could not be cleared: {}", e);
        }

        tracing::info!(
            "Crawl complete: {} files, {} folders in {} pages",
            acc.entry_count(),
            acc.folder_count(),
            pages_fetched
        );

        let (entries, folders) = acc.into_inventory();
        Ok(CrawlOutput {
            entries,
            folders,
            pages_fetched,
            resumed,
        })
    }

    /// Saves progress against the last good cursor and builds the error
    fn fail_fetch(
        &mut self,
        acc: &Accumulator,
        cursor: Option<&str>,
        error: RemoteError,
    ) -> CrawlError {
        let Some(cursor) = cursor else {
            tracing::error!("Initial listing failed: {}", error);
            return CrawlError::Fetch {
                entries: 0,
                resumable: false,
                source: error,
            };
        };

        match self.store.save_checkpoint(&acc.snapshot(&self.settings.root_path, cursor)) {
            Ok(()) => {
                tracing::error!(
                    "Listing failed after {} files; checkpoint saved: {}",
                    acc.entry_count(),
                    error
                );
                CrawlError::Fetch {
                    entries: acc.entry_count(),
                    resumable: true,
                    source: error,
                }
            }
            Err(source) => CrawlError::CheckpointAfterFetch {
                fetch: error,
                source,
            },
        }
    }
}

fn display_root(root: &str) -> &str {
    if root.is_empty() {
        "/"
    } else {
        root
    }
}
