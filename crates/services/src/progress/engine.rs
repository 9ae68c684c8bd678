//! Reconciles the device cache with the remote record and enforces the unlock ladder.
//!
//! Per (user, path) the engine moves `UNINITIALIZED -> LOADED` through
//! [`ProgressEngine::load_progress`] and `LOADED -> TOGGLING -> LOADED` through
//! [`ProgressEngine::handle_topic_press`]. It keeps no progress of its own
//! between calls: everything is read from and written to the local store and
//! the remote record.
//!
//! Reconciliation priority is local-first. Aggregates are re-derived from the
//! local cells of every path, and a cell flagged `pending_sync` is pushed to
//! the remote record before any remote read may overwrite it.

use std::collections::BTreeMap;
use std::sync::Arc;

use eduplay_core::Clock;
use eduplay_core::ladder::{self, LadderStep, ToggleKind};
use eduplay_core::model::{
    AggregateProgress, CompletedTopics, Curriculum, PathName, PathProgress, RecordId, RecordPatch,
    Topic, TopicSequence, UserKey, UserRecord,
};
use storage::{LocalProgressStore, ProgressCell, SessionStore};
use tracing::{debug, info, warn};

use super::events::{LessonRoute, ProgressEvent, ProgressEvents};
use super::locks::UserLocks;
use super::remote::RemoteProgressClient;
use crate::context::SessionContext;
use crate::error::ProgressError;

//
// ─── RESULTS ───────────────────────────────────────────────────────────────────
//

/// Where a loaded progress figure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressSource {
    /// Read from the remote record and mirrored locally.
    Remote,
    /// Remote unavailable; served from the device cache.
    Cached,
    /// Remote unavailable and nothing cached yet.
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedProgress {
    pub path: PathName,
    pub progress: PathProgress,
    pub source: ProgressSource,
}

/// Outcome of a confirmed topic press.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicPress {
    pub kind: ToggleKind,
    pub progress: PathProgress,
    pub aggregate: AggregateProgress,
    /// Set only when the press completed the topic.
    pub lesson: Option<LessonRoute>,
}

//
// ─── ENGINE ────────────────────────────────────────────────────────────────────
//

pub struct ProgressEngine {
    clock: Clock,
    curriculum: Arc<Curriculum>,
    local: LocalProgressStore,
    remote: RemoteProgressClient,
    sessions: SessionStore,
    events: Arc<dyn ProgressEvents>,
    locks: UserLocks,
}

impl ProgressEngine {
    #[must_use]
    pub fn new(
        clock: Clock,
        curriculum: Arc<Curriculum>,
        local: LocalProgressStore,
        remote: RemoteProgressClient,
        sessions: SessionStore,
        events: Arc<dyn ProgressEvents>,
    ) -> Self {
        Self {
            clock,
            curriculum,
            local,
            remote,
            sessions,
            events,
            locks: UserLocks::new(),
        }
    }

    /// Bring one path to `LOADED`.
    ///
    /// Initializes the remote progress fields when the record lacks them
    /// (creating the record when none exists), then mirrors the remote sets of
    /// every path into the local store. Unsynced local changes are pushed
    /// first. When the remote store cannot be reached the cached cell is
    /// served instead; progress is never reset because of a failed read.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Config` if the path is not in the curriculum.
    pub async fn load_progress(
        &self,
        ctx: &mut SessionContext,
        path: &PathName,
    ) -> Result<LoadedProgress, ProgressError> {
        let sequence = self.curriculum.require(path)?;
        let user = ctx.user_key();
        let _guard = self.locks.acquire(&user).await;
        info!(user = %user, %path, "loading progress");

        let cells = self.local.read_all(&user).await;
        let cached = cells.get(path).cloned().flatten();

        if cells.values().flatten().any(|cell| cell.pending_sync) {
            info!(user = %user, "re-pushing unsynced local progress");
            if let Err(err) = self.push_local_state(ctx, &user).await {
                warn!(user = %user, error = %err, "re-sync failed; serving cached progress");
                return Ok(self.fallback(path, cached));
            }
        }

        let found = match self.remote.find_record_by_email(&ctx.user.email).await {
            Ok(found) => found,
            Err(err) => {
                warn!(user = %user, error = %err, "remote fetch failed; serving cached progress");
                return Ok(self.fallback(path, cached));
            }
        };

        let (record_id, record) = match self.ensure_initialized(ctx, found).await {
            Ok(initialized) => initialized,
            Err(err) => {
                warn!(user = %user, error = %err, "remote initialization failed; serving cached progress");
                return Ok(self.fallback(path, cached));
            }
        };

        let mut mirrored = BTreeMap::new();
        for seq in self.curriculum.sequences() {
            let completed = known_topics(record.completed_for(seq.path()), seq);
            if let Err(err) = self
                .local
                .write_progress(&user, seq.path(), completed.clone(), false)
                .await
            {
                warn!(user = %user, path = %seq.path(), error = %err, "failed to mirror progress locally");
            }
            mirrored.insert(seq.path().clone(), completed);
        }

        ctx.user = record;
        ctx.record_id = Some(record_id);
        self.save_session(ctx).await;

        let completed = mirrored.remove(path).unwrap_or_default();
        let progress = PathProgress::compute(completed, sequence);
        self.events.emit(ProgressEvent::ProgressChanged {
            path: path.clone(),
            progress: progress.clone(),
        });

        Ok(LoadedProgress {
            path: path.clone(),
            progress,
            source: ProgressSource::Remote,
        })
    }

    /// Toggle a topic on the active path.
    ///
    /// Locked and unknown topics are refused without touching any state. The
    /// new set is written locally (flagged unsynced) before the remote record
    /// is patched with every path's set and fresh aggregates. A failed patch
    /// leaves the local change in place and is reported to the caller and the
    /// event sink.
    ///
    /// # Errors
    ///
    /// `Validation` for a locked or unknown topic, `Config` for an undefined
    /// path, `LocalStore` if the local write fails, `Network` or `RemoteWrite`
    /// if the remote record cannot be reached or updated.
    pub async fn handle_topic_press(
        &self,
        ctx: &mut SessionContext,
        path: &PathName,
        topic: &Topic,
    ) -> Result<TopicPress, ProgressError> {
        let sequence = self.curriculum.require(path)?;
        let user = ctx.user_key();
        let _guard = self.locks.acquire(&user).await;

        let mut completed = self.current_completed(ctx, &user, sequence).await;
        if let Err(err) = ladder::check_press(sequence, &completed, topic) {
            debug!(user = %user, %path, error = %err, "ignoring press");
            return Err(err.into());
        }

        let kind = ladder::toggle(&mut completed, topic);
        let cell = match self.local.write_progress(&user, path, completed, true).await {
            Ok(cell) => cell,
            Err(err) => return Err(self.report(err.into())),
        };
        let progress = cell.to_path_progress();
        self.events.emit(ProgressEvent::ProgressChanged {
            path: path.clone(),
            progress: progress.clone(),
        });

        let aggregate = match self.push_local_state(ctx, &user).await {
            Ok(aggregate) => aggregate,
            Err(err) => {
                warn!(user = %user, %path, %topic, error = %err, "remote progress update failed");
                return Err(self.report(err));
            }
        };
        info!(user = %user, %path, %topic, ?kind, total = aggregate.total_topics, "progress saved");

        let lesson = (kind == ToggleKind::Completed).then(|| LessonRoute {
            topic: topic.clone(),
            path: path.clone(),
        });
        if let Some(route) = &lesson {
            self.events.emit(ProgressEvent::NavigateToLesson(route.clone()));
        }

        Ok(TopicPress {
            kind,
            progress,
            aggregate,
            lesson,
        })
    }

    /// Render the ladder for a path from the current ground-truth set.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Config` if the path is not in the curriculum.
    pub async fn ladder(
        &self,
        ctx: &SessionContext,
        path: &PathName,
    ) -> Result<Vec<LadderStep>, ProgressError> {
        let sequence = self.curriculum.require(path)?;
        let completed = self.current_completed(ctx, &ctx.user_key(), sequence).await;
        Ok(ladder::ladder(sequence, &completed))
    }

    //
    // ─── INTERNALS ─────────────────────────────────────────────────────────────
    //

    /// Local cell if present, else the last mirrored remote set.
    async fn current_completed(
        &self,
        ctx: &SessionContext,
        user: &UserKey,
        sequence: &TopicSequence,
    ) -> CompletedTopics {
        let completed = match self.local.read_progress(user, sequence.path()).await {
            Some(cell) => cell.completed_topics,
            None => ctx.user.completed_for(sequence.path()),
        };
        known_topics(completed, sequence)
    }

    fn fallback(&self, path: &PathName, cached: Option<ProgressCell>) -> LoadedProgress {
        let (progress, source) = match cached {
            Some(cell) => (cell.to_path_progress(), ProgressSource::Cached),
            None => (PathProgress::empty(), ProgressSource::Empty),
        };
        self.events.emit(ProgressEvent::ProgressChanged {
            path: path.clone(),
            progress: progress.clone(),
        });
        LoadedProgress {
            path: path.clone(),
            progress,
            source,
        }
    }

    /// Give a record without progress fields its empty mapping, creating the
    /// record first when the scan found nothing.
    async fn ensure_initialized(
        &self,
        ctx: &SessionContext,
        found: Option<(RecordId, UserRecord)>,
    ) -> Result<(RecordId, UserRecord), ProgressError> {
        let initial = RecordPatch::initial(&self.curriculum, self.clock.now());
        match found {
            Some((id, record)) if record.has_progress() => Ok((id, record)),
            Some((id, mut record)) => {
                info!(record_id = %id, "initializing remote progress fields");
                self.remote
                    .patch_record(&id, &initial)
                    .await
                    .map_err(ProgressError::RemoteWrite)?;
                initial.apply_to(&mut record);
                Ok((id, record))
            }
            None => {
                let mut record = ctx.user.clone();
                initial.apply_to(&mut record);
                let id = self
                    .remote
                    .create_record(&record)
                    .await
                    .map_err(ProgressError::RemoteWrite)?;
                info!(record_id = %id, "created remote record for user");
                Ok((id, record))
            }
        }
    }

    /// Patch the remote record with every path's local set and the aggregates
    /// derived from them. On success the context mirrors the patch and every
    /// local cell is marked synced.
    async fn push_local_state(
        &self,
        ctx: &mut SessionContext,
        user: &UserKey,
    ) -> Result<AggregateProgress, ProgressError> {
        let mut completed = BTreeMap::new();
        for sequence in self.curriculum.sequences() {
            completed.insert(
                sequence.path().clone(),
                self.current_completed(ctx, user, sequence).await,
            );
        }
        let aggregate = AggregateProgress::compute(&self.curriculum, &completed);
        let patch = RecordPatch::progress(&completed, aggregate, self.clock.now());

        let record_id = match self.resolve_record_id(ctx).await? {
            Some(id) => {
                self.remote
                    .patch_record(&id, &patch)
                    .await
                    .map_err(ProgressError::RemoteWrite)?;
                id
            }
            None => {
                let mut record = ctx.user.clone();
                patch.apply_to(&mut record);
                self.remote
                    .create_record(&record)
                    .await
                    .map_err(ProgressError::RemoteWrite)?
            }
        };

        patch.apply_to(&mut ctx.user);
        ctx.record_id = Some(record_id);
        self.save_session(ctx).await;

        for (path, topics) in completed {
            if let Err(err) = self.local.write_progress(user, &path, topics, false).await {
                warn!(user = %user, %path, error = %err, "failed to mark local progress synced");
            }
        }
        Ok(aggregate)
    }

    async fn resolve_record_id(
        &self,
        ctx: &SessionContext,
    ) -> Result<Option<RecordId>, ProgressError> {
        if let Some(id) = &ctx.record_id {
            return Ok(Some(id.clone()));
        }
        let found = self
            .remote
            .find_record_by_email(&ctx.user.email)
            .await
            .map_err(ProgressError::Network)?;
        Ok(found.map(|(id, _)| id))
    }

    async fn save_session(&self, ctx: &SessionContext) {
        if let Err(err) = self.sessions.save(&ctx.to_stored()).await {
            warn!(user = %ctx.user_key(), error = %err, "failed to persist current user");
        }
    }

    fn report(&self, err: ProgressError) -> ProgressError {
        if err.is_user_visible() {
            self.events.emit(ProgressEvent::Error {
                message: err.to_string(),
            });
        }
        err
    }
}

fn known_topics(mut completed: CompletedTopics, sequence: &TopicSequence) -> CompletedTopics {
    let dropped = completed.retain_known(sequence);
    if dropped > 0 {
        debug!(path = %sequence.path(), dropped, "ignoring topics outside the curriculum");
    }
    completed
}
