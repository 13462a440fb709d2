//! The guided quiz/chat flow state machine.
//!
//! [`QuizFlow`] is the single owner of the transcript, the attempt history
//! and the button/question buffers. Every user action is an explicit method
//! that validates the current state, talks to the gateway, appends turns and
//! transitions. Transition methods take `&mut self`, so a second request can
//! never overlap an outstanding one; the borrow checker serializes the flow.
//!
//! Failure policy: gateway rejections never escape. They become a single
//! assistant turn with the best available human-readable message. Button
//! fetch steps (levels, categories, subtopics, the chat greeting) still
//! transition forward with an empty button list, so the user can fall back
//! to free text; question generation and answer submission stay put, so a
//! result is never fabricated.

use crate::answer;
use crate::gateway::DialogueGateway;
use crate::history::AttemptHistory;
use crate::payload::{ButtonPayload, ChoiceButton};
use crate::question::{Question, QuizResult};
use crate::transcript::{Transcript, Turn};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Assistant turn shown while the question set is being generated.
const GENERATING_MESSAGE: &str = "Gerando suas questões, isso pode levar alguns segundos...";
/// Assistant turn shown once the question set has arrived.
const READY_MESSAGE: &str = "Prontinho! Responda as questões e envie quando terminar.";

/// The current step of the guided experience. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Initial,
    Levels,
    Categories,
    Subsubjects,
    Questions,
    Results,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowState::Initial => write!(f, "initial"),
            FlowState::Levels => write!(f, "levels"),
            FlowState::Categories => write!(f, "categories"),
            FlowState::Subsubjects => write!(f, "subsubjects"),
            FlowState::Questions => write!(f, "questions"),
            FlowState::Results => write!(f, "results"),
        }
    }
}

/// Which sub-flow is active. `None` is only valid before the initial choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    None,
    Quiz,
    Chat,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::None => write!(f, "none"),
            Mode::Quiz => write!(f, "quiz"),
            Mode::Chat => write!(f, "chat"),
        }
    }
}

/// Errors returned to the caller (the UI shell), never to the transcript.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    /// The requested action does not exist in the current state.
    #[error("action not available in state '{state}' (mode '{mode}')")]
    InvalidState { state: FlowState, mode: Mode },
    /// The submission was rejected before any side effect: every question
    /// slot must carry a non-empty selected option.
    #[error("all {expected} questions must have a selected answer")]
    IncompleteAnswers { expected: usize },
}

/// The flow controller. See the module docs for the transition rules.
pub struct QuizFlow {
    gateway: Arc<dyn DialogueGateway>,
    user_id: String,
    subject_id: Option<String>,
    state: FlowState,
    mode: Mode,
    transcript: Transcript,
    history: AttemptHistory,
    buttons: Vec<ChoiceButton>,
    questions: Vec<Question>,
    last_result: Option<QuizResult>,
    result_recorded: bool,
}

impl QuizFlow {
    pub fn new(
        gateway: Arc<dyn DialogueGateway>,
        user_id: impl Into<String>,
        subject_id: Option<String>,
        transcript: Transcript,
    ) -> Self {
        Self {
            gateway,
            user_id: user_id.into(),
            subject_id,
            state: FlowState::Initial,
            mode: Mode::None,
            transcript,
            history: AttemptHistory::new(),
            buttons: Vec::new(),
            questions: Vec::new(),
            last_result: None,
            result_recorded: false,
        }
    }

    // --- Snapshot accessors for the UI shell ---

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn history(&self) -> &AttemptHistory {
        &self.history
    }

    /// The buttons valid for the current step; empty when a fetch degraded.
    pub fn buttons(&self) -> &[ChoiceButton] {
        &self.buttons
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn last_result(&self) -> Option<&QuizResult> {
        self.last_result.as_ref()
    }

    // --- Transitions ---

    /// `(initial, none)` → `(levels, quiz)`: the user chose the quiz flow.
    pub async fn choose_quiz(&mut self) -> Result<(), FlowError> {
        self.require(FlowState::Initial, Mode::None)?;
        self.transcript.clear();
        self.mode = Mode::Quiz;
        info!(user_id = %self.user_id, "quiz mode selected");
        self.enter_level_selection().await;
        Ok(())
    }

    /// `(initial, none)` → chat mode: the user chose free-form conversation.
    pub async fn choose_chat(&mut self) -> Result<(), FlowError> {
        self.require(FlowState::Initial, Mode::None)?;
        self.transcript.clear();
        self.mode = Mode::Chat;
        info!(user_id = %self.user_id, "chat mode selected");
        self.request_greeting().await;
        Ok(())
    }

    /// `(levels, quiz)` → `(categories, quiz)`.
    pub async fn pick_level(&mut self, level: &str) -> Result<(), FlowError> {
        self.require(FlowState::Levels, Mode::Quiz)?;
        self.transcript.push(Turn::user(level));
        match self.gateway.set_level(&self.user_id, level).await {
            Ok(step) => {
                self.transcript.push(Turn::assistant(step.prompt));
                self.buttons = step.categories;
            }
            Err(err) => {
                warn!(error = %err, %level, "category fetch failed; degrading to free text");
                self.transcript.push(Turn::assistant(err.user_message()));
                self.buttons.clear();
            }
        }
        self.state = FlowState::Categories;
        Ok(())
    }

    /// `(categories, quiz)` → `(subsubjects, quiz)`.
    ///
    /// A payload that does not carry a `categoria` key is a strict no-op:
    /// no turn, no gateway call, no transition.
    pub async fn pick_category(&mut self, button: &ChoiceButton) -> Result<(), FlowError> {
        self.require(FlowState::Categories, Mode::Quiz)?;
        let Some(ButtonPayload::Category { categoria }) = ButtonPayload::parse(&button.payload)
        else {
            debug!(payload = %button.payload, "category payload did not parse; ignoring click");
            return Ok(());
        };
        self.transcript.push(Turn::user(button.title.as_str()));
        match self.gateway.list_subcategories(&self.user_id, &categoria).await {
            Ok(buttons) => self.buttons = buttons,
            Err(err) => {
                warn!(error = %err, %categoria, "subtopic fetch failed; degrading to free text");
                self.transcript.push(Turn::assistant(err.user_message()));
                self.buttons.clear();
            }
        }
        self.state = FlowState::Subsubjects;
        Ok(())
    }

    /// `(subsubjects, quiz)` → `(questions, quiz)`, but only when the
    /// question set actually arrives; a generation failure stays put.
    pub async fn pick_subtopic(&mut self, button: &ChoiceButton) -> Result<(), FlowError> {
        self.require(FlowState::Subsubjects, Mode::Quiz)?;
        let Some(ButtonPayload::Subtopic { subtopico }) = ButtonPayload::parse(&button.payload)
        else {
            debug!(payload = %button.payload, "subtopic payload did not parse; ignoring click");
            return Ok(());
        };
        self.transcript.push(Turn::user(button.title.as_str()));
        self.transcript.push(Turn::assistant(GENERATING_MESSAGE));
        match self.gateway.generate_questions(&self.user_id, &subtopico).await {
            Ok(questions) => {
                info!(count = questions.len(), %subtopico, "question set ready");
                self.transcript.push(Turn::assistant(READY_MESSAGE));
                self.questions = questions;
                self.buttons.clear();
                self.state = FlowState::Questions;
            }
            Err(err) => {
                warn!(error = %err, %subtopico, "question generation failed");
                self.transcript.push(Turn::assistant(err.user_message()));
            }
        }
        Ok(())
    }

    /// `(questions, quiz)` → `(results, quiz)` on a successful grading.
    ///
    /// Rejects the submission before any side effect unless every question
    /// has a non-empty selected option. On gateway failure the state is
    /// unchanged and the user may retry.
    pub async fn submit_answers(&mut self, answers: &[String]) -> Result<(), FlowError> {
        self.require(FlowState::Questions, Mode::Quiz)?;
        if answers.len() != self.questions.len() || answers.iter().any(|a| a.trim().is_empty()) {
            return Err(FlowError::IncompleteAnswers {
                expected: self.questions.len(),
            });
        }
        let letters = answer::letters_for(answers);
        self.transcript
            .push(Turn::user(format!("Minhas respostas: {}", letters.join(", "))));
        match self.gateway.verify_answers(&self.user_id, &letters).await {
            Ok(result) => {
                info!(
                    correct = result.total_correct_answers,
                    wrong = result.total_wrong_answers,
                    "quiz attempt graded"
                );
                self.history.record(self.questions.clone(), result.clone());
                self.result_recorded = true;
                self.last_result = Some(result);
                self.state = FlowState::Results;
            }
            Err(err) => {
                warn!(error = %err, "answer submission failed; staying on questions");
                self.transcript.push(Turn::assistant(err.user_message()));
            }
        }
        Ok(())
    }

    /// `(results, quiz)` → `(levels, quiz)`: another round, history kept.
    pub async fn continue_practicing(&mut self) -> Result<(), FlowError> {
        self.require(FlowState::Results, Mode::Quiz)?;
        // Grading already recorded the attempt; the guard only matters if a
        // future path reaches Results without having recorded it.
        if !self.result_recorded {
            if let Some(result) = self.last_result.clone() {
                self.history.record(self.questions.clone(), result);
            }
        }
        self.questions.clear();
        self.last_result = None;
        self.result_recorded = false;
        self.enter_level_selection().await;
        Ok(())
    }

    /// Toggles quiz↔chat from any state of an active mode. Clears the
    /// transcript and the step buffers; the attempt history survives, and only
    /// a full [`reset`](Self::reset) clears it.
    pub async fn switch_mode(&mut self) -> Result<(), FlowError> {
        if self.mode == Mode::None {
            return Err(self.invalid());
        }
        self.transcript.clear();
        self.buttons.clear();
        self.questions.clear();
        self.last_result = None;
        self.result_recorded = false;
        if self.mode == Mode::Quiz {
            self.mode = Mode::Chat;
            self.state = FlowState::Initial;
            info!(user_id = %self.user_id, "switched to chat mode");
            self.request_greeting().await;
        } else {
            self.mode = Mode::Quiz;
            info!(user_id = %self.user_id, "switched to quiz mode");
            self.enter_level_selection().await;
        }
        Ok(())
    }

    /// Free-form chat exchange. The transcript always grows by exactly two
    /// turns per send: the user's message, then one assistant turn carrying
    /// either the reply or a human-readable failure message.
    pub async fn send_chat(&mut self, message: &str) -> Result<(), FlowError> {
        if self.mode != Mode::Chat {
            return Err(self.invalid());
        }
        self.transcript.push(Turn::user(message));
        match self
            .gateway
            .ask(&self.user_id, message, self.subject_id.clone())
            .await
        {
            Ok(reply) => self.transcript.push(Turn::assistant(reply)),
            Err(err) => {
                warn!(error = %err, "chat ask failed");
                self.transcript.push(Turn::assistant(err.user_message()));
            }
        }
        Ok(())
    }

    /// Full reset back to `(initial, none)`: transcript, history and every
    /// buffer are cleared.
    pub fn reset(&mut self) {
        info!(user_id = %self.user_id, "flow reset");
        self.transcript.clear();
        self.history.clear();
        self.buttons.clear();
        self.questions.clear();
        self.last_result = None;
        self.result_recorded = false;
        self.state = FlowState::Initial;
        self.mode = Mode::None;
    }

    // --- Helpers ---

    async fn enter_level_selection(&mut self) {
        match self.gateway.list_levels(&self.user_id).await {
            Ok(buttons) => self.buttons = buttons,
            Err(err) => {
                warn!(error = %err, "level fetch failed; degrading to free text");
                self.transcript.push(Turn::assistant(err.user_message()));
                self.buttons.clear();
            }
        }
        self.state = FlowState::Levels;
    }

    async fn request_greeting(&mut self) {
        match self.gateway.start_conversation(&self.user_id).await {
            Ok(greeting) => self.transcript.push(Turn::assistant(greeting)),
            Err(err) => {
                warn!(error = %err, "greeting request failed");
                self.transcript.push(Turn::assistant(err.user_message()));
            }
        }
    }

    fn require(&self, state: FlowState, mode: Mode) -> Result<(), FlowError> {
        if self.state == state && self.mode == mode {
            Ok(())
        } else {
            Err(self.invalid())
        }
    }

    fn invalid(&self) -> FlowError {
        FlowError::InvalidState {
            state: self.state,
            mode: self.mode,
        }
    }
}
