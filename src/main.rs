//! Terminal practice driver.
//!
//! ```text
//! speak-practice                              list lessons
//! speak-practice <lesson-id> [self-assessment]
//! ```
//!
//! # Session
//!
//! 1. Initialise logging and load [`AppConfig`].
//! 2. Open the progress and settings stores under the app data directory.
//! 3. Walk the five practice steps on a current-thread tokio runtime:
//!    listen, read the translation, listen again, speak along, record.
//! 4. Submit the recording and print the transcription and feedback.
//!
//! A failed recording or submission stays inside the record step: the
//! learner can record again, resubmit the same audio, or quit with the
//! earlier steps already saved.

use std::io::{BufRead, Write};
use std::sync::{mpsc, Arc};
use std::time::Duration;

use anyhow::{Context, Result};
use speak_practice::{
    audio::{BlobRegistry, CpalMicrophone},
    catalog::{Language, Lesson, LessonCatalog},
    config::{AppConfig, AppPaths},
    llm::{GeminiClient, SelfAssessment},
    pipeline::{
        Advance, FeedbackPipeline, FeedbackResult, PracticeSession, PracticeStep, Submission,
        SubmissionError, SubmissionHandler,
    },
    player::{MediaBackend, PlaybackController, PlaybackSpeed, RodioBackend},
    recorder::{RecorderError, RecordingArtifact, RecordingController, RecordingState},
    store::{JsonFileStore, ProgressBook, SettingsStore},
};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// Arguments
// ---------------------------------------------------------------------------

struct Args {
    lesson_id: Option<String>,
    assessment: Option<SelfAssessment>,
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    let lesson_id = args.next();
    let assessment = args
        .next()
        .map(|raw| raw.parse::<SelfAssessment>())
        .transpose()?;
    Ok(Args {
        lesson_id,
        assessment,
    })
}

// ---------------------------------------------------------------------------
// Terminal helpers
// ---------------------------------------------------------------------------

/// Stdin lines, read on one helper thread so recording can keep ticking
/// while it waits for Enter.
struct Terminal {
    lines: mpsc::Receiver<String>,
}

impl Terminal {
    fn spawn() -> Self {
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line.trim().to_string()).is_err() {
                    break;
                }
            }
        });
        Self { lines: rx }
    }

    /// Ask and wait for one line.  Input typed before the question is
    /// dropped.
    fn prompt(&self, message: &str) -> Result<String> {
        while self.lines.try_recv().is_ok() {}
        print!("{message} ");
        std::io::stdout().flush()?;
        self.lines.recv().context("standard input closed")
    }

    fn enter_pressed(&self) -> bool {
        self.lines.try_recv().is_ok()
    }
}

/// What the learner picked after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retry {
    Record,
    Resubmit,
    Quit,
}

fn parse_retry(answer: &str, can_resubmit: bool) -> Retry {
    match answer.trim().to_lowercase().as_str() {
        "q" | "quit" => Retry::Quit,
        "r" | "resubmit" if can_resubmit => Retry::Resubmit,
        _ => Retry::Record,
    }
}

fn recorder_guidance(e: &RecorderError) -> String {
    match e {
        RecorderError::PermissionDenied(_) => {
            "Microphone access was denied. Allow this terminal to use the microphone, then try again."
                .to_string()
        }
        RecorderError::DeviceNotFound => {
            "No microphone was found. Connect one, then try again.".to_string()
        }
        other => format!("Recording failed [{}]: {other}", other.kind()),
    }
}

fn submission_guidance(e: &SubmissionError) -> String {
    match e {
        SubmissionError::Pipeline(inner) => format!(
            "Could not analyse the recording ({inner}). Check the network and API key, then resubmit."
        ),
        SubmissionError::AudioTooLarge { .. } => format!("{e}. Record a shorter attempt."),
        other => format!("The recording was not accepted [{}]: {other}", other.kind()),
    }
}

/// Play the bound clip to the end (or until it fails).
async fn play_through<B: MediaBackend>(player: &mut PlaybackController<B>) {
    player.play();
    if let Some(e) = player.error() {
        println!("  (playback failed: {e})");
        return;
    }
    while player.is_playing() {
        tokio::time::sleep(POLL_INTERVAL).await;
        player.poll();
    }
}

fn print_lesson_list(catalog: &LessonCatalog, progress: &ProgressBook<JsonFileStore>) {
    for category in catalog.categories() {
        println!("{category}");
        for lesson in catalog.by_category(category) {
            let mark = match progress.get(&lesson.id) {
                Some(p) if p.is_completed => "✓",
                Some(_) => "…",
                None => " ",
            };
            println!("  {mark} {:<12} {}", lesson.id, lesson.title);
        }
    }
    println!(
        "\n{}/{} lessons completed",
        progress.completed_count(),
        catalog.len()
    );
}

fn print_understanding(lesson: &Lesson, language: Language) {
    println!("  {}", lesson.script.japanese_kanji);
    println!("  {}", lesson.script.japanese_plain);
    if let Some(meaning) = lesson.translations.get(language) {
        println!("  = {meaning}");
    }
    for keyword in &lesson.keywords {
        match keyword.meaning.get(language) {
            Some(meaning) => println!("  • {} ({}) {meaning}", keyword.word, keyword.reading),
            None => println!("  • {} ({})", keyword.word, keyword.reading),
        }
    }
    for tip in lesson.pronunciation_tips.for_language(language) {
        println!("  ♪ {tip}");
    }
}

fn print_feedback(result: &FeedbackResult) {
    let fb = &result.feedback;
    println!("\nHeard: {}", result.transcription);
    println!("\n{}", fb.message);
    for point in &fb.good_points {
        println!("  ◎ {point}");
    }
    if !fb.improvement_tip.is_empty() {
        println!("  → {}", fb.improvement_tip);
    }
    println!("{}", fb.encouragement);
}

// ---------------------------------------------------------------------------
// Practice flow
// ---------------------------------------------------------------------------

async fn practice(
    term: &Terminal,
    config: &AppConfig,
    lesson: &Lesson,
    assessment: Option<SelfAssessment>,
    progress: &mut ProgressBook<JsonFileStore>,
    settings: &SettingsStore<JsonFileStore>,
) -> Result<()> {
    let prefs = settings.settings().clone();
    let blobs = BlobRegistry::new();

    let mut player = match RodioBackend::new(config.assets_dir(), blobs.clone()) {
        Ok(backend) => {
            let mut player = PlaybackController::new(backend);
            player.set_speed(PlaybackSpeed::nearest(prefs.playback_speed));
            player.bind(&lesson.audio_url);
            Some(player)
        }
        Err(e) => {
            log::warn!("audio output unavailable ({e}); continuing without playback");
            None
        }
    };

    let mut recorder =
        RecordingController::new(CpalMicrophone::new(), blobs.clone(), &config.recording);
    let handler = SubmissionHandler::new(
        FeedbackPipeline::new(Arc::new(GeminiClient::from_config(&config.gemini))),
        &config.submission,
    );

    let mut session = PracticeSession::new(&lesson.id, prefs.target_replays);
    progress.start_lesson(&lesson.id)?;
    println!("{} ({:?}, {})\n", lesson.title, lesson.level, lesson.category);

    loop {
        let step = session.current();
        println!("── {step}");
        match step {
            PracticeStep::Listen => {
                println!("  {}", lesson.script.japanese);
                if let Some(player) = player.as_mut() {
                    play_through(player).await;
                }
            }
            PracticeStep::Understand => {
                print_understanding(lesson, prefs.display_language);
                term.prompt("  [Enter] continue")?;
            }
            PracticeStep::Relisten => {
                if let Some(player) = player.as_mut() {
                    player.reset();
                    while player.can_play() && session.can_advance().is_err() {
                        term.prompt(&format!(
                            "  [Enter] play ({}/{})",
                            session.replays() + 1,
                            session.target_replays()
                        ))?;
                        play_through(player).await;
                        session.set_replays(player.play_count());
                    }
                }
                if session.can_advance().is_err() {
                    println!("  (reference audio unavailable, replays skipped)");
                    session.set_replays(session.target_replays());
                }
            }
            PracticeStep::Speak => {
                println!("  {}", lesson.script.japanese);
                while session.can_advance().is_err() {
                    term.prompt("  [Enter] speak along with the clip")?;
                    if let Some(player) = player.as_mut() {
                        player.stop();
                        play_through(player).await;
                    }
                    session.record_speak_attempt();
                }
            }
            PracticeStep::Record => {
                let outcome = record_step(
                    term,
                    &mut recorder,
                    &mut player,
                    &handler,
                    lesson,
                    assessment,
                    prefs.display_language,
                )
                .await?;
                let Some(result) = outcome else {
                    println!("\nStopped before the last step; earlier steps are saved.");
                    return Ok(());
                };
                print_feedback(&result);
                session.set_feedback(result);
            }
        }

        match session.advance() {
            Ok(Advance::Moved { completed, .. }) => progress.complete_step(&lesson.id, completed)?,
            Ok(Advance::LessonComplete) => {
                progress.complete_lesson(&lesson.id)?;
                println!("\nLesson complete!");
                return Ok(());
            }
            Err(e) => println!("  {e}"),
        }
    }
}

/// Record, replay and submit until feedback arrives or the learner quits
/// (`Ok(None)`).
async fn record_step<B: MediaBackend>(
    term: &Terminal,
    recorder: &mut RecordingController<CpalMicrophone>,
    player: &mut Option<PlaybackController<B>>,
    handler: &SubmissionHandler,
    lesson: &Lesson,
    assessment: Option<SelfAssessment>,
    language: Language,
) -> Result<Option<FeedbackResult>> {
    'record: loop {
        let artifact = match record_attempt(term, recorder).await? {
            Ok(artifact) => artifact,
            Err(e) => {
                println!("  {}", recorder_guidance(&e));
                recorder.clear_recording();
                match parse_retry(&term.prompt("  [Enter] try again, [q] quit")?, false) {
                    Retry::Quit => return Ok(None),
                    Retry::Record | Retry::Resubmit => continue 'record,
                }
            }
        };
        println!("  recorded {:.1}s", artifact.duration.as_secs_f32());

        if let Some(player) = player.as_mut() {
            player.bind(artifact.url.as_str());
            play_through(player).await;
            player.bind(&lesson.audio_url);
        }

        let rating = match assessment {
            Some(a) => a,
            None => term
                .prompt("  How did it go? [same/close/difficult/unknown]")?
                .parse()
                .unwrap_or(SelfAssessment::Unknown),
        };
        let submission =
            Submission::from_recording(&artifact, &lesson.script.japanese, rating, language);

        loop {
            println!("  analysing…");
            let e = match handler.submit(submission.clone()).await {
                Ok(result) => return Ok(Some(result)),
                Err(e) => e,
            };
            println!("  {}", submission_guidance(&e));
            let can_resubmit = !e.is_validation();
            let question = if can_resubmit {
                "  [r] resubmit, [Enter] record again, [q] quit"
            } else {
                "  [Enter] record again, [q] quit"
            };
            match parse_retry(&term.prompt(question)?, can_resubmit) {
                Retry::Resubmit => continue,
                Retry::Record => continue 'record,
                Retry::Quit => return Ok(None),
            }
        }
    }
}

/// One capture, from a cleared recorder to a finished artifact.  Recorder
/// failures come back in the inner `Result` so the caller can offer a retry.
async fn record_attempt(
    term: &Terminal,
    recorder: &mut RecordingController<CpalMicrophone>,
) -> Result<Result<RecordingArtifact, RecorderError>> {
    recorder.clear_recording();
    term.prompt(&format!(
        "  [Enter] start recording (stops on Enter or after {}s)",
        recorder.max_duration().as_secs()
    ))?;

    if let Err(e) = recorder.start_recording().await {
        return Ok(Err(e));
    }

    while recorder.state() == RecordingState::Recording {
        tokio::time::sleep(recorder.tick_interval()).await;
        recorder.tick();
        print!("\r  ● {}s ", recorder.elapsed_seconds());
        std::io::stdout().flush()?;
        if term.enter_pressed() {
            recorder.stop_recording();
        }
    }
    println!();

    if let Some(e) = recorder.error() {
        return Ok(Err(e.clone()));
    }
    Ok(recorder
        .artifact()
        .cloned()
        .ok_or_else(|| RecorderError::Other("no audio was captured".into())))
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args()?;
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    let paths = AppPaths::new();
    let mut progress = ProgressBook::open(JsonFileStore::new(&paths.store_dir))?;
    let settings = SettingsStore::open(JsonFileStore::new(&paths.store_dir))?;
    let catalog = LessonCatalog::bundled()?;

    let Some(lesson_id) = args.lesson_id else {
        print_lesson_list(&catalog, &progress);
        return Ok(());
    };
    let lesson = catalog
        .get(&lesson_id)
        .with_context(|| format!("no lesson with id {lesson_id:?}"))?;

    if !GeminiClient::from_config(&config.gemini).has_api_key() {
        log::warn!("no Gemini API key configured; feedback requests will fail");
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    let term = Terminal::spawn();
    rt.block_on(practice(
        &term,
        &config,
        lesson,
        args.assessment,
        &mut progress,
        &settings,
    ))
}

#[cfg(test)]
mod tests {
    use speak_practice::llm::LlmError;
    use speak_practice::pipeline::PipelineError;

    use super::*;

    #[test]
    fn retry_answers() {
        assert_eq!(parse_retry("", true), Retry::Record);
        assert_eq!(parse_retry("q", false), Retry::Quit);
        assert_eq!(parse_retry(" Quit ", true), Retry::Quit);
        assert_eq!(parse_retry("r", true), Retry::Resubmit);
        // Nothing to resubmit after a rejected request.
        assert_eq!(parse_retry("r", false), Retry::Record);
    }

    #[test]
    fn microphone_problems_get_specific_guidance() {
        let denied = recorder_guidance(&RecorderError::PermissionDenied("NotAllowedError".into()));
        let missing = recorder_guidance(&RecorderError::DeviceNotFound);
        assert!(denied.contains("denied"));
        assert!(missing.contains("No microphone"));
        assert_ne!(denied, missing);
        assert!(recorder_guidance(&RecorderError::CaptureFailed("unplugged".into()))
            .contains("capture-failed"));
    }

    #[test]
    fn analysis_failures_can_be_resubmitted() {
        let failed = SubmissionError::Pipeline(PipelineError::Transcription(LlmError::Timeout));
        assert!(!failed.is_validation());
        assert!(submission_guidance(&failed).contains("resubmit"));

        let rejected = SubmissionError::MissingAudio;
        assert!(rejected.is_validation());
        assert!(submission_guidance(&rejected).contains("missing-audio"));
    }
}
