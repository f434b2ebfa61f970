//! Reel production pipeline.
//!
//! Drives one reel through script generation, speech synthesis, caption
//! grouping, composition, and publication. The persisted status is the only
//! progress marker: each stage commits its transition immediately after its
//! side effect succeeds, and `process_reel` branches on the current status,
//! so a crashed run resumes at the first incomplete stage instead of
//! starting over.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tracing::{info, warn};

use newsreel_media::{select_background, subtitle, Compositor};
use newsreel_models::{caption, ArticleId, Reel, ReelId, ReelStatus};
use newsreel_storage::ObjectStore;

use crate::config::WorkerConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::llm::{script_prompt, TextGenerator};
use crate::repo::Repository;
use crate::retry::{retry_async, RetryConfig};
use crate::transcribe::Transcriber;
use crate::tts::SpeechSynthesizer;

/// Scratch directory for one pipeline run.
///
/// Backed by a temp dir, so local artifacts (audio, subtitle file, composed
/// video) are removed when the run ends, on success and failure alike.
struct RunWorkspace {
    dir: TempDir,
}

impl RunWorkspace {
    fn create(work_dir: &Path, reel_id: ReelId) -> PipelineResult<Self> {
        std::fs::create_dir_all(work_dir)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("reel-{}-", reel_id))
            .tempdir_in(work_dir)?;
        Ok(Self { dir })
    }

    fn audio_path(&self) -> PathBuf {
        self.dir.path().join("narration.mp3")
    }

    fn background_path(&self) -> PathBuf {
        self.dir.path().join("background.mp4")
    }

    fn subtitle_path(&self) -> PathBuf {
        self.dir.path().join("captions.srt")
    }

    fn video_path(&self) -> PathBuf {
        self.dir.path().join("reel.mp4")
    }
}

/// Retry budget for composition, separate from the shared budget: encoder
/// failures are rarely cured by hammering, so one retry only.
const COMPOSE_RETRIES: u32 = 1;

/// Orchestrates the reel production stages.
pub struct ReelPipeline {
    repo: Arc<dyn Repository>,
    store: Arc<dyn ObjectStore>,
    llm: Arc<dyn TextGenerator>,
    tts: Arc<dyn SpeechSynthesizer>,
    transcriber: Arc<dyn Transcriber>,
    compositor: Compositor,
    config: WorkerConfig,
}

impl ReelPipeline {
    pub fn new(
        repo: Arc<dyn Repository>,
        store: Arc<dyn ObjectStore>,
        llm: Arc<dyn TextGenerator>,
        tts: Arc<dyn SpeechSynthesizer>,
        transcriber: Arc<dyn Transcriber>,
        compositor: Compositor,
        config: WorkerConfig,
    ) -> Self {
        Self {
            repo,
            store,
            llm,
            tts,
            transcriber,
            compositor,
            config,
        }
    }

    /// Storage key for a reel's narration audio.
    pub fn audio_key(reel_id: ReelId) -> String {
        format!("audio/reel_{}.mp3", reel_id)
    }

    /// Storage key for a reel's final video.
    pub fn video_key(reel_id: ReelId) -> String {
        format!("videos/reel_{}.mp4", reel_id)
    }

    /// Create a queued reel for an article and claim the article.
    pub async fn enqueue_reel(&self, article_id: ArticleId) -> PipelineResult<ReelId> {
        let article = self
            .repo
            .article(article_id)
            .await?
            .ok_or(PipelineError::ArticleMissing(article_id))?;

        let reel = Reel::new(article.id);
        let reel_id = reel.id;
        self.repo.insert_reel(reel).await?;
        self.repo.mark_article_consumed(article_id).await?;

        info!(reel_id = %reel_id, article_id = %article_id, "Enqueued reel");
        Ok(reel_id)
    }

    /// Drive a reel to a terminal state.
    ///
    /// Safe to invoke repeatedly: already-completed stages are skipped by
    /// branching on the persisted status, and terminal reels are left alone.
    /// A stage that exhausts its retry budget marks the reel `Failed` with
    /// the stage name and error recorded; earlier stages' artifacts are
    /// kept.
    pub async fn process_reel(&self, reel_id: ReelId) -> PipelineResult<()> {
        let workspace = RunWorkspace::create(&self.config.work_dir, reel_id)?;

        loop {
            let reel = self
                .repo
                .reel(reel_id)
                .await?
                .ok_or(PipelineError::ReelMissing(reel_id))?;

            let stage = match reel.status {
                ReelStatus::Queued => "script",
                ReelStatus::ScriptReady => "synthesis",
                ReelStatus::AudioReady => "compose",
                ReelStatus::VideoComposited => "publish",
                ReelStatus::Ready => return Ok(()),
                ReelStatus::Failed => {
                    warn!(reel_id = %reel_id, "Reel already failed, skipping");
                    return Ok(());
                }
            };

            let result = match reel.status {
                ReelStatus::Queued => self.script_stage(&reel).await,
                ReelStatus::ScriptReady => self.synthesis_stage(&reel, &workspace).await,
                ReelStatus::AudioReady => self.compose_stage(&reel, &workspace).await,
                ReelStatus::VideoComposited => self.publish_stage(&reel, &workspace).await,
                _ => unreachable!("terminal states handled above"),
            };

            if let Err(e) = result {
                warn!(reel_id = %reel_id, stage, error = %e, "Stage failed");
                self.repo
                    .mark_failed(reel_id, stage, &e.to_string())
                    .await?;
                return Err(e);
            }

            info!(reel_id = %reel_id, stage, "Stage complete");
        }
    }

    fn retry_config(&self, operation: &str) -> RetryConfig {
        RetryConfig::new(operation)
            .with_max_retries(self.config.max_retries)
            .with_base_delay(self.config.retry_base_delay)
    }

    /// Queued → ScriptReady: generate the narration script.
    async fn script_stage(&self, reel: &Reel) -> PipelineResult<()> {
        let article = self
            .repo
            .article(reel.article_id)
            .await?
            .ok_or(PipelineError::ArticleMissing(reel.article_id))?;

        let prompt = script_prompt(&article.title, &article.content);
        let script = retry_async(&self.retry_config("llm_generate"), || {
            self.llm.generate(&prompt)
        })
        .await?;

        if script.trim().is_empty() {
            return Err(PipelineError::EmptyScript);
        }

        self.repo.commit_script(reel.id, script.trim()).await
    }

    /// ScriptReady → AudioReady: synthesize, upload audio, persist cues.
    async fn synthesis_stage(&self, reel: &Reel, ws: &RunWorkspace) -> PipelineResult<()> {
        let script = reel
            .script
            .clone()
            .ok_or_else(|| PipelineError::inconsistent("ScriptReady reel has no script"))?;

        let synthesis = retry_async(&self.retry_config("tts_synthesize"), || {
            self.tts.synthesize(&script)
        })
        .await?;

        let audio_path = ws.audio_path();
        tokio::fs::write(&audio_path, &synthesis.audio).await?;

        let audio_key = Self::audio_key(reel.id);
        retry_async(&self.retry_config("audio_upload"), || async {
            self.store
                .put(&audio_path, &audio_key, "audio/mpeg")
                .await
                .map_err(PipelineError::from)
        })
        .await?;

        self.repo.commit_audio(reel.id, &audio_key).await?;

        // Cues land after the audio commit; if we crash in between, the
        // compose stage recovers them from the transcription fallback.
        let cues = synthesis.alignment.group_into_cues(self.config.max_cue_chars)?;
        self.repo.replace_cues(reel.id, cues).await
    }

    /// AudioReady → VideoComposited: ensure cues, compose the video locally.
    async fn compose_stage(&self, reel: &Reel, ws: &RunWorkspace) -> PipelineResult<()> {
        self.compose_to_workspace(reel, ws).await?;
        self.repo.commit_composited(reel.id).await
    }

    /// VideoComposited → Ready: upload and publish atomically.
    async fn publish_stage(&self, reel: &Reel, ws: &RunWorkspace) -> PipelineResult<()> {
        let video_path = ws.video_path();
        // A fresh resume has an empty workspace; rebuild the artifact.
        if !video_path.exists() {
            self.compose_to_workspace(reel, ws).await?;
        }

        let video_key = Self::video_key(reel.id);
        retry_async(&self.retry_config("video_upload"), || async {
            self.store
                .put(&video_path, &video_key, "video/mp4")
                .await
                .map_err(PipelineError::from)
        })
        .await?;

        self.repo.commit_ready(reel.id, &video_key).await
    }

    /// Produce the composed video in the workspace.
    ///
    /// Idempotent given persisted state: downloads what is missing, recovers
    /// a lost cue batch through the transcription fallback, and leaves the
    /// final artifact at the workspace video path.
    async fn compose_to_workspace(&self, reel: &Reel, ws: &RunWorkspace) -> PipelineResult<()> {
        let audio_ref = reel
            .audio_ref
            .clone()
            .ok_or_else(|| PipelineError::inconsistent("composing reel has no audio_ref"))?;

        let audio_path = ws.audio_path();
        if !audio_path.exists() {
            retry_async(&self.retry_config("audio_download"), || async {
                self.store
                    .get(&audio_ref, &audio_path)
                    .await
                    .map_err(PipelineError::from)
            })
            .await?;
        }

        let mut cues = self.repo.cues(reel.id).await?;
        if cues.is_empty() {
            info!(reel_id = %reel.id, "Cue batch missing, transcribing narration");
            let words = retry_async(&self.retry_config("transcribe"), || {
                self.transcriber.transcribe(&audio_path)
            })
            .await?;
            cues = caption::group_words(&words, self.config.max_cue_chars)?;
            self.repo.replace_cues(reel.id, cues.clone()).await?;
        }

        let subtitle_path = ws.subtitle_path();
        subtitle::write_srt(&cues, &subtitle_path)
            .await
            .map_err(PipelineError::from)?;

        let pool = self.repo.backgrounds().await?;
        let background = select_background(&pool)?;
        let background_path = ws.background_path();
        retry_async(&self.retry_config("background_download"), || async {
            self.store
                .get(&background.storage_ref, &background_path)
                .await
                .map_err(PipelineError::from)
        })
        .await?;

        let video_path = ws.video_path();
        let compose_retry = RetryConfig::new("compose")
            .with_max_retries(COMPOSE_RETRIES)
            .with_base_delay(self.config.retry_base_delay);
        retry_async(&compose_retry, || async {
            self.compositor
                .compose(&background_path, &audio_path, &subtitle_path, &video_path)
                .await
                .map_err(PipelineError::from)
        })
        .await
    }

    /// Expose a presigned playback URL for a reel's video.
    pub async fn playback_url(&self, reel_id: ReelId) -> PipelineResult<String> {
        let reel = self
            .repo
            .reel(reel_id)
            .await?
            .ok_or(PipelineError::ReelMissing(reel_id))?;
        let video_ref = reel
            .video_ref
            .ok_or_else(|| PipelineError::inconsistent("reel has no published video"))?;
        self.store
            .signed_url(&video_ref, self.config.signed_url_ttl)
            .await
            .map_err(PipelineError::from)
    }

    /// Remove a reel's stored artifacts.
    ///
    /// Used by the CRUD layer when a reel is deleted. Missing objects are
    /// not an error; the reel row itself is left for the caller to remove.
    pub async fn delete_artifacts(&self, reel_id: ReelId) -> PipelineResult<()> {
        let reel = self
            .repo
            .reel(reel_id)
            .await?
            .ok_or(PipelineError::ReelMissing(reel_id))?;

        for key in [reel.audio_ref, reel.video_ref].into_iter().flatten() {
            if self.store.exists(&key).await? {
                self.store.delete(&key).await?;
                info!(reel_id = %reel_id, key = %key, "Deleted reel artifact");
            }
        }
        Ok(())
    }

    /// Store a fetched batch of articles and enqueue reels for the backlog.
    ///
    /// Duplicates of already-stored articles are dropped by the repository;
    /// every unconsumed article, including ones from earlier batches, gets a
    /// reel.
    pub async fn ingest_articles(
        &self,
        articles: Vec<newsreel_models::Article>,
    ) -> PipelineResult<Vec<ReelId>> {
        let inserted = self.repo.insert_articles(articles).await?;
        let unconsumed = self.repo.count_unconsumed().await?;
        let consumed = self.repo.count_consumed().await?;
        info!(
            stored = inserted.len(),
            unconsumed, consumed, "Stored article batch"
        );

        let mut reel_ids = Vec::new();
        while let Some(article) = self.repo.next_unconsumed_article().await? {
            reel_ids.push(self.enqueue_reel(article.id).await?);
        }
        Ok(reel_ids)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;

    use newsreel_media::{MediaError, MediaResult, ToolRunner};
    use newsreel_models::{Alignment, Article, BackgroundAsset, CaptionCue, Word};
    use newsreel_storage::{StorageError, StorageResult};

    use crate::llm::MockTextGenerator;
    use crate::repo::MemoryRepository;
    use crate::transcribe::MockTranscriber;
    use crate::tts::{MockSpeechSynthesizer, Synthesis};

    use super::*;

    /// In-memory object store that materializes downloads as real files.
    #[derive(Default)]
    struct FakeStore {
        objects: Mutex<HashMap<String, Vec<u8>>>,
    }

    impl FakeStore {
        fn with_object(self, key: &str, bytes: &[u8]) -> Self {
            self.objects.lock().unwrap().insert(key.to_string(), bytes.to_vec());
            self
        }

        fn has(&self, key: &str) -> bool {
            self.objects.lock().unwrap().contains_key(key)
        }
    }

    #[async_trait]
    impl ObjectStore for FakeStore {
        async fn put(&self, path: &Path, key: &str, _content_type: &str) -> StorageResult<String> {
            let bytes = std::fs::read(path)?;
            self.objects.lock().unwrap().insert(key.to_string(), bytes);
            Ok(key.to_string())
        }

        async fn get(&self, key_or_url: &str, path: &Path) -> StorageResult<PathBuf> {
            let bytes = self
                .objects
                .lock()
                .unwrap()
                .get(key_or_url)
                .cloned()
                .ok_or_else(|| StorageError::not_found(key_or_url))?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, bytes)?;
            Ok(path.to_path_buf())
        }

        async fn signed_url(&self, key: &str, _ttl: Duration) -> StorageResult<String> {
            Ok(format!("https://signed.example/{}", key))
        }

        async fn delete(&self, key: &str) -> StorageResult<()> {
            self.objects.lock().unwrap().remove(key);
            Ok(())
        }

        async fn exists(&self, key: &str) -> StorageResult<bool> {
            Ok(self.has(key))
        }
    }

    /// Runner that fakes a successful FFmpeg run by writing the output file.
    struct FakeRunner;

    #[async_trait]
    impl ToolRunner for FakeRunner {
        async fn run(&self, args: &[String]) -> MediaResult<()> {
            let output = args.last().expect("output arg");
            std::fs::write(output, b"mp4").map_err(MediaError::from)?;
            Ok(())
        }
    }

    fn test_alignment(script: &str) -> Alignment {
        let characters: Vec<char> = script.chars().collect();
        let starts: Vec<f64> = (0..characters.len()).map(|i| i as f64 * 0.05).collect();
        let ends: Vec<f64> = (0..characters.len()).map(|i| (i + 1) as f64 * 0.05).collect();
        Alignment::new(characters, starts, ends).unwrap()
    }

    struct Fixture {
        repo: Arc<MemoryRepository>,
        store: Arc<FakeStore>,
        article_id: ArticleId,
        work_dir: TempDir,
    }

    async fn fixture() -> Fixture {
        let repo = Arc::new(MemoryRepository::new());
        let article = Article::new(
            "Markets rally",
            "Stocks rose sharply on Tuesday.",
            "Wire",
            Utc::now(),
            Some("business".into()),
        );
        let article_id = article.id;
        repo.insert_articles(vec![article]).await.unwrap();
        repo.insert_background(BackgroundAsset::new(
            "city",
            "backgrounds/city.mp4",
            Some(120.0),
        ))
        .await
        .unwrap();

        let store = Arc::new(FakeStore::default().with_object("backgrounds/city.mp4", b"bg"));
        let work_dir = tempfile::tempdir().unwrap();

        Fixture {
            repo,
            store,
            article_id,
            work_dir,
        }
    }

    fn pipeline_with(
        fx: &Fixture,
        llm: MockTextGenerator,
        tts: MockSpeechSynthesizer,
        transcriber: MockTranscriber,
    ) -> ReelPipeline {
        pipeline_with_runner(fx, llm, tts, transcriber, Arc::new(FakeRunner))
    }

    fn pipeline_with_runner(
        fx: &Fixture,
        llm: MockTextGenerator,
        tts: MockSpeechSynthesizer,
        transcriber: MockTranscriber,
        runner: Arc<dyn ToolRunner>,
    ) -> ReelPipeline {
        let config = WorkerConfig {
            work_dir: fx.work_dir.path().to_path_buf(),
            max_cue_chars: 15,
            max_retries: 0,
            retry_base_delay: Duration::from_millis(1),
            ..WorkerConfig::default()
        };
        ReelPipeline::new(
            fx.repo.clone(),
            fx.store.clone(),
            Arc::new(llm),
            Arc::new(tts),
            Arc::new(transcriber),
            Compositor::new(runner),
            config,
        )
    }

    #[tokio::test]
    async fn test_full_run_reaches_ready() {
        let fx = fixture().await;

        let script = "Stocks rose sharply, closing at records.";
        let mut llm = MockTextGenerator::new();
        llm.expect_generate()
            .times(1)
            .returning(move |_| Ok(script.to_string()));

        let mut tts = MockSpeechSynthesizer::new();
        let alignment = test_alignment(script);
        tts.expect_synthesize().times(1).returning(move |_| {
            Ok(Synthesis {
                audio: b"mp3".to_vec(),
                alignment: alignment.clone(),
            })
        });

        let pipeline = pipeline_with(&fx, llm, tts, MockTranscriber::new());

        let reel_id = pipeline.enqueue_reel(fx.article_id).await.unwrap();
        pipeline.process_reel(reel_id).await.unwrap();

        let reel = fx.repo.reel(reel_id).await.unwrap().unwrap();
        assert_eq!(reel.status, ReelStatus::Ready);
        assert_eq!(reel.script.as_deref(), Some(script));
        assert_eq!(reel.audio_ref, Some(ReelPipeline::audio_key(reel_id)));
        assert_eq!(reel.video_ref, Some(ReelPipeline::video_key(reel_id)));

        // Artifacts actually landed in the store.
        assert!(fx.store.has(&ReelPipeline::audio_key(reel_id)));
        assert!(fx.store.has(&ReelPipeline::video_key(reel_id)));

        // One cue batch, ordered.
        let cues = fx.repo.cues(reel_id).await.unwrap();
        assert!(!cues.is_empty());
        for (i, cue) in cues.iter().enumerate() {
            assert_eq!(cue.sequence_order, i as u32);
        }

        // The article is claimed.
        let article = fx.repo.article(fx.article_id).await.unwrap().unwrap();
        assert!(article.consumed);
    }

    #[tokio::test]
    async fn test_resume_from_script_ready_never_calls_llm() {
        let fx = fixture().await;

        // LLM must not be touched when the script already exists.
        let mut llm = MockTextGenerator::new();
        llm.expect_generate().times(0);

        let script = "Already written narration.";
        let mut tts = MockSpeechSynthesizer::new();
        let alignment = test_alignment(script);
        tts.expect_synthesize().times(1).returning(move |_| {
            Ok(Synthesis {
                audio: b"mp3".to_vec(),
                alignment: alignment.clone(),
            })
        });

        let pipeline = pipeline_with(&fx, llm, tts, MockTranscriber::new());

        let mut reel = Reel::new(fx.article_id);
        reel.script = Some(script.to_string());
        reel.status = ReelStatus::ScriptReady;
        let reel_id = reel.id;
        fx.repo.insert_reel(reel).await.unwrap();

        pipeline.process_reel(reel_id).await.unwrap();

        let reel = fx.repo.reel(reel_id).await.unwrap().unwrap();
        assert_eq!(reel.status, ReelStatus::Ready);
    }

    #[tokio::test]
    async fn test_resume_from_audio_ready_recovers_cues_by_transcription() {
        let fx = fixture().await;

        let mut llm = MockTextGenerator::new();
        llm.expect_generate().times(0);
        let mut tts = MockSpeechSynthesizer::new();
        tts.expect_synthesize().times(0);

        let mut transcriber = MockTranscriber::new();
        transcriber.expect_transcribe().times(1).returning(|_| {
            Ok(vec![
                Word::new("markets ", 0.0, 0.5),
                Word::new("rallied ", 0.5, 1.1),
            ])
        });

        let pipeline = pipeline_with(&fx, llm, tts, transcriber);

        // Reel crashed after the audio commit: audio_ref set, no cue batch.
        let mut reel = Reel::new(fx.article_id);
        reel.script = Some("script".into());
        reel.status = ReelStatus::AudioReady;
        let reel_id = reel.id;
        reel.audio_ref = Some(ReelPipeline::audio_key(reel_id));
        fx.repo.insert_reel(reel).await.unwrap();
        fx.store
            .objects
            .lock()
            .unwrap()
            .insert(ReelPipeline::audio_key(reel_id), b"mp3".to_vec());

        pipeline.process_reel(reel_id).await.unwrap();

        let reel = fx.repo.reel(reel_id).await.unwrap().unwrap();
        assert_eq!(reel.status, ReelStatus::Ready);

        let cues = fx.repo.cues(reel_id).await.unwrap();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "markets rallied");
    }

    #[tokio::test]
    async fn test_fatal_llm_error_marks_reel_failed_with_stage() {
        let fx = fixture().await;

        let mut llm = MockTextGenerator::new();
        llm.expect_generate()
            .times(1)
            .returning(|_| Err(PipelineError::fatal("llm", "401 unauthorized")));

        let pipeline = pipeline_with(&fx, llm, MockSpeechSynthesizer::new(), MockTranscriber::new());

        let reel_id = pipeline.enqueue_reel(fx.article_id).await.unwrap();
        let err = pipeline.process_reel(reel_id).await.unwrap_err();
        assert!(matches!(err, PipelineError::ServiceFatal { .. }));

        let reel = fx.repo.reel(reel_id).await.unwrap().unwrap();
        assert_eq!(reel.status, ReelStatus::Failed);
        assert_eq!(reel.failed_stage.as_deref(), Some("script"));
        assert!(reel.failure.unwrap().contains("401"));

        // Failed reels never appear in the ready listing.
        assert!(fx.repo.list_ready().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_script_fails_closed() {
        let fx = fixture().await;

        let mut llm = MockTextGenerator::new();
        llm.expect_generate()
            .times(1)
            .returning(|_| Ok("   ".to_string()));

        let pipeline = pipeline_with(&fx, llm, MockSpeechSynthesizer::new(), MockTranscriber::new());

        let reel_id = pipeline.enqueue_reel(fx.article_id).await.unwrap();
        let err = pipeline.process_reel(reel_id).await.unwrap_err();
        assert!(matches!(err, PipelineError::EmptyScript));
    }

    #[tokio::test]
    async fn test_empty_background_pool_is_fatal_for_compose() {
        let fx = fixture().await;

        let mut llm = MockTextGenerator::new();
        llm.expect_generate().times(0);
        let mut tts = MockSpeechSynthesizer::new();
        tts.expect_synthesize().times(0);

        // Drop all backgrounds by using a fresh repository without any.
        let repo = Arc::new(MemoryRepository::new());
        let article = Article::new("T", "C", "S", Utc::now(), None);
        let article_id = article.id;
        repo.insert_articles(vec![article]).await.unwrap();

        let mut reel = Reel::new(article_id);
        reel.script = Some("script".into());
        reel.status = ReelStatus::AudioReady;
        let reel_id = reel.id;
        reel.audio_ref = Some(ReelPipeline::audio_key(reel_id));
        repo.insert_reel(reel).await.unwrap();

        let store = Arc::new(FakeStore::default().with_object(
            &ReelPipeline::audio_key(reel_id),
            b"mp3",
        ));

        let mut transcriber = MockTranscriber::new();
        transcriber
            .expect_transcribe()
            .returning(|_| Ok(vec![Word::new("hi ", 0.0, 0.4)]));

        let config = WorkerConfig {
            work_dir: fx.work_dir.path().to_path_buf(),
            max_retries: 0,
            ..WorkerConfig::default()
        };
        let pipeline = ReelPipeline::new(
            repo.clone(),
            store,
            Arc::new(llm),
            Arc::new(tts),
            Arc::new(transcriber),
            Compositor::new(Arc::new(FakeRunner)),
            config,
        );

        let err = pipeline.process_reel(reel_id).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Media(MediaError::NoBackgroundAvailable)
        ));

        let reel = repo.reel(reel_id).await.unwrap().unwrap();
        assert_eq!(reel.status, ReelStatus::Failed);
        assert_eq!(reel.failed_stage.as_deref(), Some("compose"));
    }

    #[tokio::test]
    async fn test_persistent_compose_failure_stops_after_one_retry() {
        let fx = fixture().await;

        /// Runner that always fails, counting invocations.
        struct FailingRunner {
            calls: AtomicU32,
        }

        #[async_trait]
        impl ToolRunner for FailingRunner {
            async fn run(&self, _args: &[String]) -> MediaResult<()> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Err(MediaError::composition_failed("encoder crashed", None, Some(1)))
            }
        }

        let runner = Arc::new(FailingRunner {
            calls: AtomicU32::new(0),
        });

        let mut llm = MockTextGenerator::new();
        llm.expect_generate().times(0);
        let mut tts = MockSpeechSynthesizer::new();
        tts.expect_synthesize().times(0);

        let pipeline = pipeline_with_runner(
            &fx,
            llm,
            tts,
            MockTranscriber::new(),
            runner.clone(),
        );

        let mut reel = Reel::new(fx.article_id);
        reel.script = Some("script".into());
        reel.status = ReelStatus::AudioReady;
        let reel_id = reel.id;
        reel.audio_ref = Some(ReelPipeline::audio_key(reel_id));
        fx.repo.insert_reel(reel).await.unwrap();
        fx.store
            .objects
            .lock()
            .unwrap()
            .insert(ReelPipeline::audio_key(reel_id), b"mp3".to_vec());
        fx.repo
            .replace_cues(
                reel_id,
                vec![CaptionCue {
                    text: "hello".into(),
                    start_time: 0.0,
                    end_time: 1.0,
                    sequence_order: 0,
                }],
            )
            .await
            .unwrap();

        let err = pipeline.process_reel(reel_id).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Media(MediaError::CompositionFailed { .. })
        ));

        // Initial attempt plus exactly one retry.
        assert_eq!(runner.calls.load(Ordering::SeqCst), 2);

        let reel = fx.repo.reel(reel_id).await.unwrap().unwrap();
        assert_eq!(reel.status, ReelStatus::Failed);
        assert_eq!(reel.failed_stage.as_deref(), Some("compose"));
    }

    #[tokio::test]
    async fn test_delete_artifacts_removes_stored_objects() {
        let fx = fixture().await;

        let mut reel = Reel::new(fx.article_id);
        reel.status = ReelStatus::Ready;
        let reel_id = reel.id;
        reel.audio_ref = Some(ReelPipeline::audio_key(reel_id));
        reel.video_ref = Some(ReelPipeline::video_key(reel_id));
        fx.repo.insert_reel(reel).await.unwrap();

        {
            let mut objects = fx.store.objects.lock().unwrap();
            objects.insert(ReelPipeline::audio_key(reel_id), b"mp3".to_vec());
            objects.insert(ReelPipeline::video_key(reel_id), b"mp4".to_vec());
        }

        let pipeline = pipeline_with(
            &fx,
            MockTextGenerator::new(),
            MockSpeechSynthesizer::new(),
            MockTranscriber::new(),
        );

        pipeline.delete_artifacts(reel_id).await.unwrap();
        assert!(!fx.store.has(&ReelPipeline::audio_key(reel_id)));
        assert!(!fx.store.has(&ReelPipeline::video_key(reel_id)));

        // Deleting again is harmless.
        pipeline.delete_artifacts(reel_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_processing_terminal_reel_is_a_no_op() {
        let fx = fixture().await;

        let mut llm = MockTextGenerator::new();
        llm.expect_generate().times(0);

        let pipeline = pipeline_with(&fx, llm, MockSpeechSynthesizer::new(), MockTranscriber::new());

        let mut reel = Reel::new(fx.article_id);
        reel.status = ReelStatus::Failed;
        let reel_id = reel.id;
        fx.repo.insert_reel(reel).await.unwrap();

        pipeline.process_reel(reel_id).await.unwrap();
        let reel = fx.repo.reel(reel_id).await.unwrap().unwrap();
        assert_eq!(reel.status, ReelStatus::Failed);
    }
}
