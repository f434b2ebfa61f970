//! Persistence seam.
//!
//! The CRUD web layer owns the real database; the pipeline only consumes
//! this narrow trait. Each `commit_*` method is one transactional update:
//! the status flip and its companion field land together or not at all, so
//! a crash leaves the reel in the last completed stage.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use newsreel_models::{
    Article, ArticleId, BackgroundAsset, CaptionCue, Reel, ReelId, ReelStatus, ReelWatch,
};

use crate::error::{PipelineError, PipelineResult};

/// Narrow persistence interface consumed by the pipeline and the CRUD layer.
#[async_trait]
pub trait Repository: Send + Sync {
    // Articles
    /// Insert articles, skipping any whose dedup key already exists.
    /// Returns the articles actually inserted.
    async fn insert_articles(&self, articles: Vec<Article>) -> PipelineResult<Vec<Article>>;
    async fn article(&self, id: ArticleId) -> PipelineResult<Option<Article>>;
    /// Oldest article the pipeline has not consumed yet.
    async fn next_unconsumed_article(&self) -> PipelineResult<Option<Article>>;
    async fn mark_article_consumed(&self, id: ArticleId) -> PipelineResult<()>;
    /// Number of articles the pipeline has not consumed yet.
    async fn count_unconsumed(&self) -> PipelineResult<usize>;
    /// Number of articles already turned into reels.
    async fn count_consumed(&self) -> PipelineResult<usize>;

    // Reels
    async fn insert_reel(&self, reel: Reel) -> PipelineResult<()>;
    async fn reel(&self, id: ReelId) -> PipelineResult<Option<Reel>>;
    /// Commit the generated script: `{script, ScriptReady}`.
    async fn commit_script(&self, id: ReelId, script: &str) -> PipelineResult<()>;
    /// Commit the uploaded narration audio: `{audio_ref, AudioReady}`.
    async fn commit_audio(&self, id: ReelId, audio_ref: &str) -> PipelineResult<()>;
    /// Commit local composition success: `{VideoComposited}`.
    async fn commit_composited(&self, id: ReelId) -> PipelineResult<()>;
    /// Commit publication: `{video_ref, Ready}` in one update, so no reel is
    /// ever visible half-composed.
    async fn commit_ready(&self, id: ReelId, video_ref: &str) -> PipelineResult<()>;
    /// Record stage failure: `{Failed, failed_stage, failure}`.
    async fn mark_failed(&self, id: ReelId, stage: &str, error: &str) -> PipelineResult<()>;
    /// Reels visible to the feed: `Ready` only.
    async fn list_ready(&self) -> PipelineResult<Vec<Reel>>;
    /// Bump the view counter and append watch history. Returns the new count.
    async fn record_view(&self, id: ReelId, user_id: &str) -> PipelineResult<u64>;

    // Caption cues
    /// Atomically replace the reel's cue batch. There is exactly one batch
    /// per reel; regenerating deletes the prior batch in the same update.
    async fn replace_cues(&self, reel_id: ReelId, cues: Vec<CaptionCue>) -> PipelineResult<()>;
    async fn cues(&self, reel_id: ReelId) -> PipelineResult<Vec<CaptionCue>>;

    // Background assets
    async fn backgrounds(&self) -> PipelineResult<Vec<BackgroundAsset>>;
    async fn insert_background(&self, asset: BackgroundAsset) -> PipelineResult<()>;
}

#[derive(Default)]
struct MemoryState {
    articles: Vec<Article>,
    reels: HashMap<ReelId, Reel>,
    cues: HashMap<ReelId, Vec<CaptionCue>>,
    watches: Vec<ReelWatch>,
    backgrounds: Vec<BackgroundAsset>,
}

/// In-memory repository.
///
/// Backs tests and single-process runs; the lock scope of each method is its
/// transaction boundary.
#[derive(Default)]
pub struct MemoryRepository {
    state: tokio::sync::Mutex<MemoryState>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn update_reel<F>(&self, id: ReelId, f: F) -> PipelineResult<()>
    where
        F: FnOnce(&mut Reel),
    {
        let mut state = self.state.lock().await;
        let reel = state
            .reels
            .get_mut(&id)
            .ok_or(PipelineError::ReelMissing(id))?;
        f(reel);
        reel.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn insert_articles(&self, articles: Vec<Article>) -> PipelineResult<Vec<Article>> {
        let mut state = self.state.lock().await;
        let mut inserted = Vec::new();
        for article in articles {
            if state.articles.iter().any(|a| a.dedup_key == article.dedup_key) {
                debug!("Skipping duplicate article {:?}", article.title);
                continue;
            }
            state.articles.push(article.clone());
            inserted.push(article);
        }
        Ok(inserted)
    }

    async fn article(&self, id: ArticleId) -> PipelineResult<Option<Article>> {
        let state = self.state.lock().await;
        Ok(state.articles.iter().find(|a| a.id == id).cloned())
    }

    async fn next_unconsumed_article(&self) -> PipelineResult<Option<Article>> {
        let state = self.state.lock().await;
        Ok(state
            .articles
            .iter()
            .filter(|a| !a.consumed)
            .min_by_key(|a| a.created_at)
            .cloned())
    }

    async fn mark_article_consumed(&self, id: ArticleId) -> PipelineResult<()> {
        let mut state = self.state.lock().await;
        let article = state
            .articles
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(PipelineError::ArticleMissing(id))?;
        article.consumed = true;
        Ok(())
    }

    async fn count_unconsumed(&self) -> PipelineResult<usize> {
        let state = self.state.lock().await;
        Ok(state.articles.iter().filter(|a| !a.consumed).count())
    }

    async fn count_consumed(&self) -> PipelineResult<usize> {
        let state = self.state.lock().await;
        Ok(state.articles.iter().filter(|a| a.consumed).count())
    }

    async fn insert_reel(&self, reel: Reel) -> PipelineResult<()> {
        let mut state = self.state.lock().await;
        state.reels.insert(reel.id, reel);
        Ok(())
    }

    async fn reel(&self, id: ReelId) -> PipelineResult<Option<Reel>> {
        let state = self.state.lock().await;
        Ok(state.reels.get(&id).cloned())
    }

    async fn commit_script(&self, id: ReelId, script: &str) -> PipelineResult<()> {
        let script = script.to_string();
        self.update_reel(id, |reel| {
            reel.script = Some(script);
            reel.status = ReelStatus::ScriptReady;
        })
        .await
    }

    async fn commit_audio(&self, id: ReelId, audio_ref: &str) -> PipelineResult<()> {
        let audio_ref = audio_ref.to_string();
        self.update_reel(id, |reel| {
            reel.audio_ref = Some(audio_ref);
            reel.status = ReelStatus::AudioReady;
        })
        .await
    }

    async fn commit_composited(&self, id: ReelId) -> PipelineResult<()> {
        self.update_reel(id, |reel| {
            reel.status = ReelStatus::VideoComposited;
        })
        .await
    }

    async fn commit_ready(&self, id: ReelId, video_ref: &str) -> PipelineResult<()> {
        let video_ref = video_ref.to_string();
        self.update_reel(id, |reel| {
            reel.video_ref = Some(video_ref);
            reel.status = ReelStatus::Ready;
        })
        .await
    }

    async fn mark_failed(&self, id: ReelId, stage: &str, error: &str) -> PipelineResult<()> {
        let stage = stage.to_string();
        let error = error.to_string();
        self.update_reel(id, |reel| {
            reel.status = ReelStatus::Failed;
            reel.failed_stage = Some(stage);
            reel.failure = Some(error);
        })
        .await
    }

    async fn list_ready(&self) -> PipelineResult<Vec<Reel>> {
        let state = self.state.lock().await;
        Ok(state
            .reels
            .values()
            .filter(|r| r.status == ReelStatus::Ready)
            .cloned()
            .collect())
    }

    async fn record_view(&self, id: ReelId, user_id: &str) -> PipelineResult<u64> {
        let mut state = self.state.lock().await;
        let reel = state
            .reels
            .get_mut(&id)
            .ok_or(PipelineError::ReelMissing(id))?;
        reel.view_count += 1;
        let count = reel.view_count;
        state.watches.push(ReelWatch::new(id, user_id));
        Ok(count)
    }

    async fn replace_cues(&self, reel_id: ReelId, cues: Vec<CaptionCue>) -> PipelineResult<()> {
        let mut state = self.state.lock().await;
        state.cues.insert(reel_id, cues);
        Ok(())
    }

    async fn cues(&self, reel_id: ReelId) -> PipelineResult<Vec<CaptionCue>> {
        let state = self.state.lock().await;
        Ok(state.cues.get(&reel_id).cloned().unwrap_or_default())
    }

    async fn backgrounds(&self) -> PipelineResult<Vec<BackgroundAsset>> {
        let state = self.state.lock().await;
        Ok(state.backgrounds.clone())
    }

    async fn insert_background(&self, asset: BackgroundAsset) -> PipelineResult<()> {
        let mut state = self.state.lock().await;
        state.backgrounds.push(asset);
        Ok(())
    }
}
