//! HTTP-backed interview service.
//!
//! Talks to the platform's interview API: `POST /next-question` for the
//! question source and `POST /evaluate-answer` for the evaluator. The
//! evaluator endpoint is required to be side-effect free, so a failed call
//! is always safe to retry.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use viva_core::error::SessionError;
use viva_core::model::{Answer, Difficulty, Feedback, Question};
use viva_core::traits::{Evaluator, QuestionSource, SessionContext};

use crate::error::ServiceError;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client for the remote interview API, implementing both the question
/// source and the evaluator seam.
pub struct HttpInterviewService {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpInterviewService {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
        }
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<R, ServiceError> {
        let mut request = self
            .client
            .post(format!("{}{endpoint}", self.base_url))
            .header("content-type", "application/json")
            .json(body);
        if let Some(key) = &self.api_key {
            request = request.header("authorization", format!("Bearer {key}"));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ServiceError::Timeout(DEFAULT_TIMEOUT_SECS)
            } else {
                ServiceError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5)
                * 1000;
            return Err(ServiceError::RateLimited {
                retry_after_ms: retry_after,
            });
        }
        if status == 401 {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::AuthenticationFailed(body));
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(ServiceError::ApiError { status, message });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| ServiceError::MalformedResponse(e.to_string()))
    }
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: String,
}

#[derive(Serialize)]
struct NextQuestionRequest<'a> {
    session_id: Uuid,
    deck_id: &'a str,
    question_index: usize,
}

#[derive(Deserialize)]
struct WireQuestion {
    id: String,
    text: String,
    #[serde(default)]
    key_points: Vec<String>,
    difficulty: String,
    points_available: u32,
    #[serde(default = "default_time_limit")]
    time_limit_secs: u64,
}

fn default_time_limit() -> u64 {
    120
}

#[derive(Serialize)]
struct EvaluateRequest<'a> {
    question: &'a Question,
    answer: &'a Answer,
}

#[derive(Deserialize)]
struct WireFeedback {
    points_earned: u32,
    #[serde(default)]
    confidence_bonus: u32,
    narrative: String,
}

#[async_trait]
impl QuestionSource for HttpInterviewService {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, ctx), fields(session = %ctx.session_id, index = ctx.question_index))]
    async fn next_question(&self, ctx: &SessionContext) -> Result<Question, SessionError> {
        let body = NextQuestionRequest {
            session_id: ctx.session_id,
            deck_id: &ctx.deck_id,
            question_index: ctx.question_index,
        };
        let wire: WireQuestion = self
            .post("/next-question", &body)
            .await
            .map_err(ServiceError::into_source_error)?;

        let difficulty = Difficulty::from_str(&wire.difficulty).map_err(|e| {
            ServiceError::MalformedResponse(e).into_source_error()
        })?;
        if wire.time_limit_secs == 0 {
            return Err(ServiceError::MalformedResponse(
                "time_limit_secs must be positive".into(),
            )
            .into_source_error());
        }

        Ok(Question {
            id: wire.id,
            text: wire.text,
            key_points: wire.key_points,
            difficulty,
            points_available: wire.points_available,
            time_limit_secs: wire.time_limit_secs,
        })
    }
}

#[async_trait]
impl Evaluator for HttpInterviewService {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip_all, fields(question = %question.id))]
    async fn evaluate(
        &self,
        question: &Question,
        answer: &Answer,
    ) -> Result<Feedback, SessionError> {
        let body = EvaluateRequest { question, answer };
        let wire: WireFeedback = self
            .post("/evaluate-answer", &body)
            .await
            .map_err(ServiceError::into_evaluation_error)?;

        Ok(Feedback {
            question_id: question.id.clone(),
            points_earned: wire.points_earned,
            confidence_bonus: wire.confidence_bonus,
            narrative: wire.narrative,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ctx() -> SessionContext {
        SessionContext {
            session_id: Uuid::new_v4(),
            deck_id: "edu-tech".into(),
            question_index: 0,
        }
    }

    fn question() -> Question {
        Question {
            id: "q1".into(),
            text: "Tell me about yourself.".into(),
            key_points: vec!["background".into()],
            difficulty: Difficulty::Easy,
            points_available: 10,
            time_limit_secs: 60,
        }
    }

    fn answer() -> Answer {
        Answer {
            question_id: "q1".into(),
            text: "I have a background in teaching.".into(),
            confidence_level: 70,
            time_spent_secs: 30,
        }
    }

    #[tokio::test]
    async fn fetches_next_question() {
        let server = MockServer::start().await;

        let body = serde_json::json!({
            "id": "q1",
            "text": "Tell me about yourself.",
            "key_points": ["background", "skills"],
            "difficulty": "easy",
            "points_available": 10,
            "time_limit_secs": 60
        });

        Mock::given(method("POST"))
            .and(path("/next-question"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let service = HttpInterviewService::new(&server.uri(), Some("test-key".into()));
        let question = service.next_question(&ctx()).await.unwrap();
        assert_eq!(question.id, "q1");
        assert_eq!(question.difficulty, Difficulty::Easy);
        assert_eq!(question.time_limit_secs, 60);
    }

    #[tokio::test]
    async fn missing_time_limit_defaults() {
        let server = MockServer::start().await;

        let body = serde_json::json!({
            "id": "q1",
            "text": "?",
            "difficulty": "hard",
            "points_available": 30
        });

        Mock::given(method("POST"))
            .and(path("/next-question"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let service = HttpInterviewService::new(&server.uri(), None);
        let question = service.next_question(&ctx()).await.unwrap();
        assert_eq!(question.time_limit_secs, 120);
        assert!(question.key_points.is_empty());
    }

    #[tokio::test]
    async fn evaluates_answer() {
        let server = MockServer::start().await;

        let body = serde_json::json!({
            "points_earned": 8,
            "confidence_bonus": 2,
            "narrative": "Strong answer."
        });

        Mock::given(method("POST"))
            .and(path("/evaluate-answer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let service = HttpInterviewService::new(&server.uri(), None);
        let feedback = service.evaluate(&question(), &answer()).await.unwrap();
        assert_eq!(feedback.question_id, "q1");
        assert_eq!(feedback.points_earned, 8);
        assert_eq!(feedback.confidence_bonus, 2);
    }

    #[tokio::test]
    async fn source_failure_is_retryable() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/next-question"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down for maintenance"))
            .mount(&server)
            .await;

        let service = HttpInterviewService::new(&server.uri(), None);
        let err = service.next_question(&ctx()).await.unwrap_err();
        assert!(matches!(err, SessionError::SourceUnavailable(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn evaluation_rate_limit_surfaces_retry_hint() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/evaluate-answer"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "5"))
            .mount(&server)
            .await;

        let service = HttpInterviewService::new(&server.uri(), None);
        let err = service.evaluate(&question(), &answer()).await.unwrap_err();
        assert!(matches!(err, SessionError::EvaluationFailed(_)));
        assert!(err.to_string().contains("rate limited"));
    }

    #[tokio::test]
    async fn malformed_question_is_rejected() {
        let server = MockServer::start().await;

        let body = serde_json::json!({
            "id": "q1",
            "text": "?",
            "difficulty": "brutal",
            "points_available": 30
        });

        Mock::given(method("POST"))
            .and(path("/next-question"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&body))
            .mount(&server)
            .await;

        let service = HttpInterviewService::new(&server.uri(), None);
        let err = service.next_question(&ctx()).await.unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }
}
