//! End-to-end conversation tests.
//!
//! Messages go through a real [`Companion`] backed by an in-memory libSQL
//! database, stub models, and a channel that records everything sent back.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use tokio::net::TcpListener;
use tokio::time::timeout;

use companion_bot::bot::{ChatOrchestrator, Companion};
use companion_bot::channels::{
    Channel, ChannelManager, IncomingMessage, MessageStream, OutgoingResponse, StatusUpdate,
};
use companion_bot::config::MemoryConfig;
use companion_bot::error::{ChannelError, LlmError};
use companion_bot::llm::{GenerationOutcome, GenerationRequest, LlmProvider};
use companion_bot::memory::{MemoryTrimmer, Summarizer};
use companion_bot::onboarding::prompts::{self, DEFAULT_PERSONA, render_persona};
use companion_bot::onboarding::{
    OnboardingManager, OnboardingStep, ProfileRouteState, ProfileUpdate, profile_routes,
};
use companion_bot::safety::Sanitizer;
use companion_bot::store::{Database, InteractionRole, LibSqlBackend, ProfileStore};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

const CHANNEL: &str = "test";
const USER: &str = "42";
const CHAT_REPLY: &str = "That sounds lovely!";

/// Chat model stub: answers every prompt with [`CHAT_REPLY`] unless told to fail.
#[derive(Default)]
struct StubLlm {
    failing: AtomicBool,
    delay_ms: AtomicU64,
    prompts: Mutex<Vec<String>>,
}

impl StubLlm {
    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for StubLlm {
    fn model_name(&self) -> &str {
        "stub-chat"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationOutcome, LlmError> {
        self.prompts.lock().unwrap().push(request.prompt);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(LlmError::RequestFailed {
                provider: "stub".to_string(),
                reason: "offline".to_string(),
            });
        }
        Ok(GenerationOutcome::Success {
            text: CHAT_REPLY.to_string(),
        })
    }
}

/// Summary model stub.
#[derive(Default)]
struct StubSummaryLlm {
    calls: AtomicUsize,
}

#[async_trait]
impl LlmProvider for StubSummaryLlm {
    fn model_name(&self) -> &str {
        "stub-summary"
    }

    async fn generate(&self, _request: GenerationRequest) -> Result<GenerationOutcome, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GenerationOutcome::Success {
            text: "Alice likes chess.".to_string(),
        })
    }
}

#[derive(Default)]
struct Recorded {
    replies: Vec<String>,
    typing: usize,
}

/// Channel that replays a fixed script of messages and records replies.
struct RecordingChannel {
    script: Mutex<Vec<IncomingMessage>>,
    recorded: Arc<Mutex<Recorded>>,
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        CHANNEL
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        let script = std::mem::take(&mut *self.script.lock().unwrap());
        Ok(Box::pin(stream::iter(script)))
    }

    async fn respond(
        &self,
        _msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        self.recorded.lock().unwrap().replies.push(response.content);
        Ok(())
    }

    async fn send_status(
        &self,
        status: StatusUpdate,
        _metadata: &serde_json::Value,
    ) -> Result<(), ChannelError> {
        if status == StatusUpdate::Typing {
            self.recorded.lock().unwrap().typing += 1;
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}

struct Harness {
    companion: Arc<Companion>,
    profiles: ProfileStore,
    chat_llm: Arc<StubLlm>,
    summary_llm: Arc<StubSummaryLlm>,
    recorded: Arc<Mutex<Recorded>>,
}

impl Harness {
    async fn new(memory: MemoryConfig) -> Self {
        Self::with_script(memory, Vec::new()).await
    }

    async fn with_script(memory: MemoryConfig, script: Vec<IncomingMessage>) -> Self {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let profiles = ProfileStore::new(db);
        let chat_llm = Arc::new(StubLlm::default());
        let summary_llm = Arc::new(StubSummaryLlm::default());
        let recorded = Arc::new(Mutex::new(Recorded::default()));

        let summarizer = Summarizer::new(summary_llm.clone(), Arc::new(Sanitizer::new()), memory);
        let chat = ChatOrchestrator::new(
            chat_llm.clone(),
            profiles.clone(),
            MemoryTrimmer::new(summarizer),
            render_persona(DEFAULT_PERSONA, "LISA"),
            "LISA",
        );

        let mut channels = ChannelManager::new();
        channels.add(Box::new(RecordingChannel {
            script: Mutex::new(script),
            recorded: Arc::clone(&recorded),
        }));

        let companion = Arc::new(Companion::new(
            Arc::new(channels),
            profiles.clone(),
            OnboardingManager::new(profiles.clone(), "LISA"),
            chat,
            "LISA",
        ));

        Self {
            companion,
            profiles,
            chat_llm,
            summary_llm,
            recorded,
        }
    }

    /// Send one message and return the single reply it produced.
    async fn say(&self, text: &str) -> String {
        let before = self.recorded.lock().unwrap().replies.len();
        self.companion
            .handle_message(&message(text))
            .await;
        let recorded = self.recorded.lock().unwrap();
        assert_eq!(recorded.replies.len(), before + 1, "expected one reply to {text:?}");
        recorded.replies[before].clone()
    }

    async fn onboard(&self) {
        self.say("/start").await;
        self.say("Alice").await;
        self.say("Playful").await;
        self.say("hiking, chess").await;
        self.say("none").await;
        self.say("yes").await;
    }
}

fn message(text: &str) -> IncomingMessage {
    IncomingMessage::new(CHANNEL, USER, text)
}

#[tokio::test]
async fn onboarding_then_chat() {
    let h = Harness::new(MemoryConfig::default()).await;

    let greeting = h.say("/start").await;
    assert!(greeting.contains("What should I call you?"));

    assert!(h.say("Alice").await.contains("Alice"));
    assert!(h.say("Playful").await.contains("hobbies"));
    assert_eq!(h.say("hiking, chess").await, prompts::ask_boundaries());

    let summary = h.say("none").await;
    assert!(summary.contains("Name: Alice"));
    assert!(summary.contains("Tone: playful"));
    assert!(summary.contains("Hobbies: hiking, chess"));
    assert!(summary.contains("Boundaries: None"));
    assert!(summary.contains("(yes/no)"));

    assert_eq!(h.say("yes").await, prompts::onboarding_done("Alice"));
    assert_eq!(h.chat_llm.calls(), 0);

    let profile = h.profiles.get(USER).await.unwrap();
    assert_eq!(profile.onboarding_step, OnboardingStep::Complete);
    assert_eq!(profile.preferences.hobbies(), vec!["hiking", "chess"]);

    assert_eq!(h.say("How are you?").await, CHAT_REPLY);
    assert_eq!(h.recorded.lock().unwrap().typing, 1);

    let prompt = h.chat_llm.last_prompt();
    assert!(prompt.contains("You are LISA"));
    assert!(prompt.contains("- tone: playful"));
    assert!(prompt.ends_with("User: How are you?"));

    let profile = h.profiles.get(USER).await.unwrap();
    assert_eq!(profile.memory, format!("Alice: How are you?\nLISA: {CHAT_REPLY}"));

    let log = h.profiles.database().list_interactions(USER, 10).await.unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].role, InteractionRole::User);
    assert_eq!(log[0].content, "How are you?");
    assert_eq!(log[1].role, InteractionRole::Assistant);
    assert_eq!(log[1].content, CHAT_REPLY);
}

#[tokio::test]
async fn chat_before_start_asks_for_start() {
    let h = Harness::new(MemoryConfig::default()).await;

    assert_eq!(h.say("hello?").await, prompts::please_start());
    assert_eq!(h.chat_llm.calls(), 0);
    assert!(h.profiles.get(USER).await.is_none());
}

#[tokio::test]
async fn chat_with_unstarted_profile_asks_for_start() {
    let h = Harness::new(MemoryConfig::default()).await;
    let profile = h.profiles.create(USER, ProfileUpdate::new()).await;
    assert_eq!(profile.onboarding_step, OnboardingStep::NotStarted);

    assert_eq!(h.say("hello?").await, prompts::please_start());
    assert_eq!(h.chat_llm.calls(), 0);
    assert_eq!(
        h.profiles.get(USER).await.unwrap().onboarding_step,
        OnboardingStep::NotStarted
    );
}

#[tokio::test]
async fn second_memory_turn_is_appended() {
    let h = Harness::new(MemoryConfig::default()).await;
    h.onboard().await;

    h.say("First").await;
    h.say("Second").await;

    let memory = h.profiles.get(USER).await.unwrap().memory;
    assert_eq!(
        memory,
        format!("Alice: First\nLISA: {CHAT_REPLY}\nAlice: Second\nLISA: {CHAT_REPLY}")
    );
    assert!(h.chat_llm.last_prompt().contains(&format!("Alice: First\nLISA: {CHAT_REPLY}")));
    assert_eq!(h.summary_llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn memory_stays_bounded() {
    let memory = MemoryConfig {
        max_memory_chars: 120,
        ..MemoryConfig::default()
    };
    let h = Harness::new(memory).await;
    h.onboard().await;

    for i in 0..10 {
        h.say(&format!("Let me tell you about chess game number {i}")).await;
        let memory = h.profiles.get(USER).await.unwrap().memory;
        assert!(memory.chars().count() <= 120, "memory grew to {}", memory.len());
    }
    assert!(h.summary_llm.calls.load(Ordering::SeqCst) > 0);
}

#[tokio::test]
async fn model_failure_apologizes_and_keeps_memory() {
    let h = Harness::new(MemoryConfig::default()).await;
    h.onboard().await;
    h.say("Hi").await;
    let before = h.profiles.get(USER).await.unwrap().memory;

    h.chat_llm.failing.store(true, Ordering::SeqCst);
    assert_eq!(h.say("Still there?").await, prompts::apology());

    assert_eq!(h.profiles.get(USER).await.unwrap().memory, before);
}

#[tokio::test]
async fn forget_and_about_me() {
    let h = Harness::new(MemoryConfig::default()).await;

    assert_eq!(h.say("/aboutme").await, prompts::about_me_missing());

    h.onboard().await;
    h.say("I adopted a cat").await;

    let about = h.say("/aboutme").await;
    assert!(about.starts_with("Name: Alice"));
    assert!(about.contains("- hobbies: hiking, chess"));
    assert!(about.contains("Alice: I adopted a cat"));

    assert_eq!(h.say("/forget").await, prompts::memory_cleared());
    let profile = h.profiles.get(USER).await.unwrap();
    assert!(profile.memory.is_empty());
    assert_eq!(profile.onboarding_step, OnboardingStep::Complete);
}

#[tokio::test]
async fn declining_confirmation_restarts_onboarding() {
    let h = Harness::new(MemoryConfig::default()).await;
    h.say("/start").await;
    h.say("Alice").await;
    h.say("calm").await;
    h.say("reading").await;
    h.say("politics").await;

    assert_eq!(h.say("no").await, prompts::restart_onboarding());
    let profile = h.profiles.get(USER).await.unwrap();
    assert_eq!(profile.onboarding_step, OnboardingStep::Name);

    // Chatting mid-flow records an answer instead of calling the model
    assert!(h.say("Ally").await.contains("Ally"));
    assert_eq!(h.chat_llm.calls(), 0);
}

#[tokio::test]
async fn start_when_onboarded_welcomes_back() {
    let h = Harness::new(MemoryConfig::default()).await;
    h.onboard().await;

    assert_eq!(h.say("/start").await, prompts::welcome_back("Alice", "LISA"));
    assert_eq!(
        h.profiles.get(USER).await.unwrap().onboarding_step,
        OnboardingStep::Complete
    );
}

#[tokio::test]
async fn help_and_unknown_commands() {
    let h = Harness::new(MemoryConfig::default()).await;
    assert_eq!(h.say("/help").await, prompts::help("LISA"));
    assert_eq!(h.say("/dance").await, prompts::help("LISA"));
}

#[tokio::test]
async fn run_drains_channel_until_stream_ends() {
    let script = vec![message("/start"), message("/help")];
    let h = Harness::with_script(MemoryConfig::default(), script).await;

    timeout(TEST_TIMEOUT, Arc::clone(&h.companion).run())
        .await
        .expect("run hung")
        .unwrap();

    let replies = h.recorded.lock().unwrap().replies.clone();
    assert_eq!(replies.len(), 2);
    assert!(replies.contains(&prompts::help("LISA")));
    assert!(replies.iter().any(|r| r.contains("What should I call you?")));
}

#[tokio::test]
async fn run_finishes_slow_turns_before_returning() {
    let h = Harness::with_script(MemoryConfig::default(), vec![message("hello")]).await;
    h.onboard().await;
    h.chat_llm.delay_ms.store(200, Ordering::SeqCst);
    let before = h.recorded.lock().unwrap().replies.len();

    timeout(TEST_TIMEOUT, Arc::clone(&h.companion).run())
        .await
        .expect("run hung")
        .unwrap();

    let replies = h.recorded.lock().unwrap().replies.clone();
    assert_eq!(replies.len(), before + 1);
    assert_eq!(replies[before], CHAT_REPLY);
    assert_eq!(
        h.profiles.get(USER).await.unwrap().memory,
        format!("Alice: hello\nLISA: {CHAT_REPLY}")
    );
}

#[tokio::test]
async fn onboarded_profile_is_served_over_http() {
    let h = Harness::new(MemoryConfig::default()).await;
    h.onboard().await;
    h.say("I adopted a cat").await;

    let app = profile_routes(ProfileRouteState {
        profiles: h.profiles.clone(),
    });
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let health = timeout(TEST_TIMEOUT, reqwest::get(format!("{base}/")))
        .await
        .expect("health check hung")
        .unwrap();
    assert!(health.status().is_success());

    let body: serde_json::Value = reqwest::get(format!("{base}/api/profiles/{USER}"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["user_id"], USER);
    assert_eq!(body["name"], "Alice");
    assert_eq!(body["onboarding_step"], 99);
    assert_eq!(body["preferences"]["hobbies"], serde_json::json!(["hiking", "chess"]));
    assert!(body["memory"].as_str().unwrap().contains("I adopted a cat"));

    let missing = reqwest::get(format!("{base}/api/profiles/nobody")).await.unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}
