//! Remote Dialogue Gateway: the boundary to the external dialogue backend.
//!
//! The flow controller only depends on the [`DialogueGateway`] trait, whose
//! methods return already-validated data. All the duck-typed wire shapes
//! (`responses[0].buttons`, optional text fields and so on) are resolved here
//! at the adapter boundary, so the controller can rely on non-null invariants.

use crate::payload::ChoiceButton;
use crate::question::{MAX_OPTIONS, Question, QuizResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;
use tracing::debug;

/// Fallback shown to the user when the backend gives no usable message.
const GENERIC_FAILURE_MESSAGE: &str =
    "Desculpe, não consegui falar com o servidor agora. Tente novamente em instantes.";

/// Errors raised by a dialogue gateway implementation.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("request to dialogue backend failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("dialogue backend returned status {status}")]
    Status { status: u16, message: Option<String> },
    #[error("malformed response from dialogue backend: {0}")]
    Malformed(&'static str),
}

impl GatewayError {
    /// The human-readable text the flow appends to the transcript: the
    /// backend-supplied message when one exists, a generic fallback otherwise.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::Status {
                message: Some(message),
                ..
            } => message.clone(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

/// The outcome of picking a difficulty level: the assistant's follow-up
/// prompt plus the category buttons for the next step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelStep {
    pub prompt: String,
    pub categories: Vec<ChoiceButton>,
}

/// Request/response contract with the dialogue/quiz backend.
///
/// Each call is a single request/response; there is no streaming and no
/// partial result. Rejections are uniform [`GatewayError`]s that the flow
/// converts into transcript turns.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DialogueGateway: Send + Sync {
    /// Opens a free-form conversation and returns the assistant greeting.
    async fn start_conversation(&self, user_id: &str) -> Result<String, GatewayError>;

    /// Sends a free-form message, optionally grounded to a subject, and
    /// returns the first reply text.
    async fn ask(
        &self,
        user_id: &str,
        message: &str,
        subject_id: Option<String>,
    ) -> Result<String, GatewayError>;

    /// Lists the difficulty-level buttons that start a quiz round.
    async fn list_levels(&self, user_id: &str) -> Result<Vec<ChoiceButton>, GatewayError>;

    /// Selects a level and returns the category step that follows it.
    async fn set_level(&self, user_id: &str, level: &str) -> Result<LevelStep, GatewayError>;

    /// Lists the subtopic buttons for a chosen category.
    async fn list_subcategories(
        &self,
        user_id: &str,
        categoria: &str,
    ) -> Result<Vec<ChoiceButton>, GatewayError>;

    /// Generates the question set for a chosen subtopic.
    async fn generate_questions(
        &self,
        user_id: &str,
        subtopico: &str,
    ) -> Result<Vec<Question>, GatewayError>;

    /// Submits canonical answer letters, one per question, for grading.
    async fn verify_answers(
        &self,
        user_id: &str,
        letters: &[String],
    ) -> Result<QuizResult, GatewayError>;
}

// --- Wire shapes ---

#[derive(Debug, Deserialize)]
struct DialogueReply {
    #[serde(default)]
    responses: Vec<BotMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct BotMessage {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    buttons: Option<Vec<ChoiceButton>>,
}

#[derive(Debug, Deserialize)]
struct ButtonsReply {
    #[serde(default)]
    buttons: Vec<ChoiceButton>,
}

#[derive(Debug, Deserialize)]
struct QuestionsReply {
    questions: Vec<Question>,
}

#[derive(Debug, Deserialize)]
struct BackendErrorBody {
    message: Option<String>,
}

#[derive(Serialize)]
struct UserBody<'a> {
    user_id: &'a str,
}

#[derive(Serialize)]
struct AskBody<'a> {
    user_id: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject_id: Option<String>,
}

#[derive(Serialize)]
struct LevelBody<'a> {
    user_id: &'a str,
    nivel: &'a str,
}

#[derive(Serialize)]
struct CategoryBody<'a> {
    user_id: &'a str,
    categoria: &'a str,
}

#[derive(Serialize)]
struct SubtopicBody<'a> {
    user_id: &'a str,
    subtopico: &'a str,
}

#[derive(Serialize)]
struct VerifyBody<'a> {
    user_id: &'a str,
    answers: &'a [String],
}

// --- HTTP implementation ---

/// JSON-over-HTTP implementation of [`DialogueGateway`].
///
/// Requests carry a per-call timeout so a hung backend surfaces as a
/// retryable error turn instead of leaving the client waiting forever.
pub struct HttpDialogueGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDialogueGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn post<B: Serialize + Sync, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, GatewayError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        debug!(%url, "posting to dialogue backend");
        let response = self.client.post(&url).json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<BackendErrorBody>()
                .await
                .ok()
                .and_then(|b| b.message);
            return Err(GatewayError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<R>().await?)
    }
}

#[async_trait]
impl DialogueGateway for HttpDialogueGateway {
    async fn start_conversation(&self, user_id: &str) -> Result<String, GatewayError> {
        let reply: DialogueReply = self
            .post("conversation/start", &UserBody { user_id })
            .await?;
        first_text(reply).ok_or(GatewayError::Malformed("greeting reply carried no text"))
    }

    async fn ask(
        &self,
        user_id: &str,
        message: &str,
        subject_id: Option<String>,
    ) -> Result<String, GatewayError> {
        let reply: DialogueReply = self
            .post(
                "conversation/ask",
                &AskBody {
                    user_id,
                    message,
                    subject_id,
                },
            )
            .await?;
        first_text(reply).ok_or(GatewayError::Malformed("ask reply carried no text"))
    }

    async fn list_levels(&self, user_id: &str) -> Result<Vec<ChoiceButton>, GatewayError> {
        let reply: DialogueReply = self.post("quiz/levels", &UserBody { user_id }).await?;
        reply
            .responses
            .into_iter()
            .next()
            .and_then(|m| m.buttons)
            .ok_or(GatewayError::Malformed("levels reply carried no buttons"))
    }

    async fn set_level(&self, user_id: &str, level: &str) -> Result<LevelStep, GatewayError> {
        let mut reply: DialogueReply = self
            .post("quiz/level", &LevelBody { user_id, nivel: level })
            .await?;
        // The category step rides on the *second* response entry; the first
        // is a level acknowledgement we do not need.
        if reply.responses.len() < 2 {
            return Err(GatewayError::Malformed(
                "level reply missing the category step entry",
            ));
        }
        let step = reply.responses.swap_remove(1);
        match (step.text, step.buttons) {
            (Some(prompt), Some(categories)) => Ok(LevelStep { prompt, categories }),
            _ => Err(GatewayError::Malformed(
                "category step entry missing text or buttons",
            )),
        }
    }

    async fn list_subcategories(
        &self,
        user_id: &str,
        categoria: &str,
    ) -> Result<Vec<ChoiceButton>, GatewayError> {
        let reply: ButtonsReply = self
            .post("quiz/subtopics", &CategoryBody { user_id, categoria })
            .await?;
        Ok(reply.buttons)
    }

    async fn generate_questions(
        &self,
        user_id: &str,
        subtopico: &str,
    ) -> Result<Vec<Question>, GatewayError> {
        let reply: QuestionsReply = self
            .post("quiz/questions", &SubtopicBody { user_id, subtopico })
            .await?;
        // Positions map to answer letters A-E, so anything past the fifth
        // option can never be selected or graded.
        let questions = reply
            .questions
            .into_iter()
            .map(|mut q| {
                q.options.truncate(MAX_OPTIONS);
                q
            })
            .collect();
        Ok(questions)
    }

    async fn verify_answers(
        &self,
        user_id: &str,
        letters: &[String],
    ) -> Result<QuizResult, GatewayError> {
        self.post(
            "quiz/verify",
            &VerifyBody {
                user_id,
                answers: letters,
            },
        )
        .await
    }
}

fn first_text(reply: DialogueReply) -> Option<String> {
    reply.responses.into_iter().next().and_then(|m| m.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const USER: &str = "aluno-42";

    fn gateway_for(server: &MockServer) -> HttpDialogueGateway {
        HttpDialogueGateway::new(server.uri(), Duration::from_secs(5)).expect("client builds")
    }

    #[tokio::test]
    async fn start_conversation_returns_greeting_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/conversation/start"))
            .and(body_partial_json(json!({ "user_id": USER })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "responses": [{ "text": "Olá! Como posso ajudar nos estudos hoje?" }]
            })))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let greeting = gateway.start_conversation(USER).await.expect("greeting");
        assert_eq!(greeting, "Olá! Como posso ajudar nos estudos hoje?");
    }

    #[tokio::test]
    async fn ask_uses_first_response_entry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/conversation/ask"))
            .and(body_partial_json(
                json!({ "user_id": USER, "message": "o que é recursão?" }),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "responses": [
                    { "text": "Recursão é quando uma função chama a si mesma." },
                    { "text": "Quer um exemplo?" }
                ]
            })))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let reply = gateway
            .ask(USER, "o que é recursão?", None)
            .await
            .expect("reply");
        assert_eq!(reply, "Recursão é quando uma função chama a si mesma.");
    }

    #[tokio::test]
    async fn empty_responses_are_malformed_not_panics() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/conversation/ask"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "responses": [] })))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let err = gateway.ask(USER, "oi", None).await.expect_err("malformed");
        assert!(matches!(err, GatewayError::Malformed(_)));
    }

    #[tokio::test]
    async fn set_level_reads_the_second_response_entry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/quiz/level"))
            .and(body_partial_json(json!({ "nivel": "Fácil" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "responses": [
                    { "text": "Nível Fácil selecionado." },
                    {
                        "text": "Escolha uma categoria:",
                        "buttons": [
                            { "title": "Lógica", "payload": "{\"categoria\":\"logic\"}" },
                            { "title": "Laços", "payload": "{\"categoria\":\"loops\"}" }
                        ]
                    }
                ]
            })))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let step = gateway.set_level(USER, "Fácil").await.expect("level step");
        assert_eq!(step.prompt, "Escolha uma categoria:");
        assert_eq!(step.categories.len(), 2);
        assert_eq!(step.categories[1].title, "Laços");
    }

    #[tokio::test]
    async fn set_level_without_second_entry_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/quiz/level"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "responses": [{ "text": "só o reconhecimento" }]
            })))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let err = gateway.set_level(USER, "Difícil").await.expect_err("malformed");
        assert!(matches!(err, GatewayError::Malformed(_)));
    }

    #[tokio::test]
    async fn generate_questions_caps_options_at_five() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/quiz/questions"))
            .and(body_partial_json(json!({ "subtopico": "for-loop" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "questions": [{
                    "question": "O que imprime o laço abaixo?",
                    "options": ["(a) 1", "(b) 2", "(c) 3", "(d) 4", "(e) 5", "(f) extra"]
                }]
            })))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let questions = gateway
            .generate_questions(USER, "for-loop")
            .await
            .expect("questions");
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].options.len(), MAX_OPTIONS);
        assert_eq!(questions[0].options.last().map(String::as_str), Some("(e) 5"));
    }

    #[tokio::test]
    async fn verify_answers_parses_the_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/quiz/verify"))
            .and(body_partial_json(json!({ "answers": ["A", "B", "?"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "totalCorrectAnswers": 2,
                "totalWrongAnswers": 1,
                "detalhes": { "questions": [] }
            })))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let letters = vec!["A".to_string(), "B".to_string(), "?".to_string()];
        let result = gateway.verify_answers(USER, &letters).await.expect("result");
        assert_eq!(result.total(), 3);
    }

    #[tokio::test]
    async fn backend_error_message_is_surfaced_to_the_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/quiz/questions"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({
                "message": "Serviço de questões indisponível no momento."
            })))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let err = gateway
            .generate_questions(USER, "for-loop")
            .await
            .expect_err("status error");
        assert!(matches!(err, GatewayError::Status { status: 503, .. }));
        assert_eq!(
            err.user_message(),
            "Serviço de questões indisponível no momento."
        );
    }

    #[tokio::test]
    async fn error_without_body_message_falls_back_to_generic_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/quiz/levels"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let gateway = gateway_for(&server);
        let err = gateway.list_levels(USER).await.expect_err("status error");
        assert_eq!(err.user_message(), GENERIC_FAILURE_MESSAGE);
    }
}
