//! External advisory judge for model selection.
//!
//! The selector can hand the evaluated candidate set to an injected
//! [`AdvisoryResolver`]. The resolver runs on a detached worker thread and the
//! selector waits on a channel for at most the configured timeout; an expired
//! worker is abandoned. Every failure mode surfaces as an [`AdvisoryError`],
//! which the selector absorbs by falling back to the heuristic.
//!
//! [`HttpAdvisor`] is a resolver backed by an OpenAI-compatible chat
//! completions endpoint.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::domain::{ArxCoefficients, CandidateModel, ComplexNumber};
use crate::error::{AdvisoryError, IdentError};

/// Default budget for one advisory consultation.
pub const DEFAULT_ADVISORY_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_ADVISOR_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_ADVISOR_MODEL: &str = "gpt-4o";
const SYSTEM_PROMPT: &str =
    "You are a control-engineering expert. Reply with the JSON decision object only.";

/// One candidate as shown to the resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryCandidate {
    pub index: usize,
    pub order: usize,
    pub coefficients: ArxCoefficients,
    pub mse: f64,
    pub fit_percent: Option<f64>,
    pub stable: bool,
    pub poles: Vec<ComplexNumber>,
    pub pole_moduli: Vec<f64>,
    pub equation: String,
}

/// The serialized candidate set handed to a resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryRequest {
    pub sampling_interval: f64,
    pub candidates: Vec<AdvisoryCandidate>,
}

impl AdvisoryRequest {
    pub fn from_candidates(candidates: &[CandidateModel], sampling_interval: f64) -> Self {
        let candidates = candidates
            .iter()
            .enumerate()
            .map(|(index, c)| AdvisoryCandidate {
                index,
                order: c.order,
                coefficients: c.coefficients.clone(),
                mse: c.mse,
                fit_percent: c.fit_percent,
                stable: c.stable,
                poles: c.poles.clone(),
                pole_moduli: c.poles.iter().map(ComplexNumber::modulus).collect(),
                equation: c.equation.clone(),
            })
            .collect();
        Self {
            sampling_interval,
            candidates,
        }
    }
}

/// A resolver's answer. It may name a candidate by index, by order, or both;
/// a valid index wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryVerdict {
    pub selected_index: Option<usize>,
    pub order: Option<usize>,
    pub rationale: String,
}

impl AdvisoryVerdict {
    pub fn index(selected_index: usize, rationale: impl Into<String>) -> Self {
        Self {
            selected_index: Some(selected_index),
            order: None,
            rationale: rationale.into(),
        }
    }

    pub fn order(order: usize, rationale: impl Into<String>) -> Self {
        Self {
            selected_index: None,
            order: Some(order),
            rationale: rationale.into(),
        }
    }

    /// Position of the chosen candidate in `candidates`.
    ///
    /// The order is only consulted when no index was given; an index that is
    /// out of range rejects the whole verdict.
    pub fn resolve_index(&self, candidates: &[CandidateModel]) -> Result<usize, AdvisoryError> {
        let found = match (self.selected_index, self.order) {
            (Some(i), _) => Some(i).filter(|&i| i < candidates.len()),
            (None, Some(order)) => candidates.iter().position(|c| c.order == order),
            (None, None) => None,
        };
        found.ok_or(AdvisoryError::InvalidSelection {
            index: self.selected_index,
            order: self.order,
            len: candidates.len(),
        })
    }
}

/// A pluggable model-selection judge.
pub trait AdvisoryResolver: Send + Sync {
    fn resolve(&self, request: &AdvisoryRequest) -> Result<AdvisoryVerdict, AdvisoryError>;
}

impl<F> AdvisoryResolver for F
where
    F: Fn(&AdvisoryRequest) -> Result<AdvisoryVerdict, AdvisoryError> + Send + Sync,
{
    fn resolve(&self, request: &AdvisoryRequest) -> Result<AdvisoryVerdict, AdvisoryError> {
        self(request)
    }
}

/// A resolver plus the time budget it is given.
#[derive(Clone)]
pub struct Advisor {
    resolver: Arc<dyn AdvisoryResolver>,
    timeout: Duration,
}

impl std::fmt::Debug for Advisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Advisor").field("timeout", &self.timeout).finish_non_exhaustive()
    }
}

impl Advisor {
    pub fn new(resolver: Arc<dyn AdvisoryResolver>, timeout: Duration) -> Self {
        Self { resolver, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the resolver on a worker thread and wait at most `timeout` for it.
    ///
    /// A resolver that panics drops its sender, which shows up here as
    /// [`AdvisoryError::Disconnected`].
    pub fn consult(&self, request: AdvisoryRequest) -> Result<AdvisoryVerdict, AdvisoryError> {
        let (tx, rx) = mpsc::channel();
        let resolver = Arc::clone(&self.resolver);

        thread::Builder::new()
            .name("arx-advisor".to_string())
            .spawn(move || {
                let verdict = resolver.resolve(&request);
                // The selector may have stopped waiting.
                let _ = tx.send(verdict);
            })
            .map_err(|e| AdvisoryError::Resolver(format!("failed to spawn advisory worker: {e}")))?;

        match rx.recv_timeout(self.timeout) {
            Ok(verdict) => verdict,
            Err(RecvTimeoutError::Timeout) => Err(AdvisoryError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(AdvisoryError::Disconnected),
        }
    }
}

/// Chat-completions backed resolver.
///
/// Configured from the environment (a `.env` file is honored):
/// - `ARX_ADVISOR_API_KEY` (required)
/// - `ARX_ADVISOR_URL` (default: OpenAI chat completions)
/// - `ARX_ADVISOR_MODEL` (default: `gpt-4o`)
pub struct HttpAdvisor {
    client: Client,
    url: String,
    api_key: String,
    model: String,
}

impl HttpAdvisor {
    pub fn from_env(timeout: Duration) -> Result<Self, IdentError> {
        dotenvy::dotenv().ok();
        let api_key = std::env::var("ARX_ADVISOR_API_KEY").map_err(|_| {
            IdentError::InvalidConfig(
                "missing ARX_ADVISOR_API_KEY in environment (.env)".to_string(),
            )
        })?;
        let url = std::env::var("ARX_ADVISOR_URL")
            .unwrap_or_else(|_| DEFAULT_ADVISOR_URL.to_string());
        let model = std::env::var("ARX_ADVISOR_MODEL")
            .unwrap_or_else(|_| DEFAULT_ADVISOR_MODEL.to_string());

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IdentError::InvalidConfig(format!("advisory HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            api_key,
            model,
        })
    }
}

impl AdvisoryResolver for HttpAdvisor {
    fn resolve(&self, request: &AdvisoryRequest) -> Result<AdvisoryVerdict, AdvisoryError> {
        let prompt = build_prompt(request)?;
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            response_format: ResponseFormat { kind: "json_object" },
        };

        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| AdvisoryError::Resolver(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AdvisoryError::Resolver(format!(
                "request failed with status {}",
                resp.status()
            )));
        }

        let chat: ChatResponse = resp
            .json()
            .map_err(|e| AdvisoryError::Resolver(format!("failed to parse response: {e}")))?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AdvisoryError::Resolver("response has no message content".to_string()))?;

        parse_decision(&content, request.candidates.len())
    }
}

fn build_prompt(request: &AdvisoryRequest) -> Result<String, AdvisoryError> {
    let ts = request.sampling_interval;
    if request.candidates.len() == 1 {
        let model = serde_json::to_string_pretty(&request.candidates[0])
            .map_err(|e| AdvisoryError::Resolver(format!("failed to serialize candidate: {e}")))?;
        return Ok(format!(
            "Analyze the following identified ARX model of a dynamic plant (Ts = {ts:.4} s).\n\
             State whether it is stable based on its poles: it is stable only if every pole modulus is < 1.\n\
             Quote the pole values and their moduli in your justification.\n\n\
             MODEL:\n{model}\n\n\
             Reply with JSON: {{\"rationale\": \"...\"}}"
        ));
    }

    let models = serde_json::to_string_pretty(&request.candidates)
        .map_err(|e| AdvisoryError::Resolver(format!("failed to serialize candidates: {e}")))?;
    Ok(format!(
        "Select the best ARX model of a dynamic plant from the candidates below, trading \
         simplicity (order) against accuracy (simulation MSE).\n\n\
         CRITERIA:\n\
         1. Stability comes first: discard any model with a pole modulus >= 1.\n\
         2. Parsimony: prefer the lower order when the higher order improves the MSE by less than 10%.\n\
         3. Sampling interval Ts = {ts:.4} s.\n\n\
         CANDIDATES:\n{models}\n\n\
         Reply with JSON: {{\"rationale\": \"short technical justification citing the chosen poles\", \
         \"selected_index\": <index>, \"order\": <order>}}"
    ))
}

/// Parse the model's JSON reply. Indices and orders may arrive as numbers or numeric strings.
fn parse_decision(content: &str, candidate_count: usize) -> Result<AdvisoryVerdict, AdvisoryError> {
    let raw: RawDecision = serde_json::from_str(content)
        .map_err(|e| AdvisoryError::Resolver(format!("reply is not the expected JSON: {e}")))?;

    let selected_index = if candidate_count == 1 {
        Some(0)
    } else {
        raw.selected_index.as_ref().and_then(as_usize)
    };

    Ok(AdvisoryVerdict {
        selected_index,
        order: raw.order.as_ref().and_then(as_usize),
        rationale: raw.rationale.unwrap_or_default(),
    })
}

fn as_usize(v: &serde_json::Value) -> Option<usize> {
    match v {
        serde_json::Value::Number(n) => n.as_u64().map(|n| n as usize),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDecision {
    #[serde(alias = "analysis")]
    rationale: Option<String>,
    selected_index: Option<serde_json::Value>,
    order: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EstimationMethod, ResidualStats};

    fn candidate(order: usize) -> CandidateModel {
        let coefficients = ArxCoefficients::new(vec![0.5; order], vec![0.1; order + 1]);
        CandidateModel {
            order,
            equation: coefficients.equation(),
            coefficients,
            sampling_interval: 0.05,
            mse: 0.01 * order as f64,
            fit_percent: Some(90.0),
            one_step: ResidualStats {
                variance: 0.0,
                autocorr: 0.0,
            },
            stable: true,
            poles: vec![ComplexNumber::new(0.5, 0.0); order],
            method: EstimationMethod::BatchLeastSquares,
        }
    }

    #[test]
    fn verdict_index_wins_over_order() {
        let cs = vec![candidate(1), candidate(2), candidate(3)];
        let v = AdvisoryVerdict {
            selected_index: Some(2),
            order: Some(1),
            rationale: String::new(),
        };
        assert_eq!(v.resolve_index(&cs), Ok(2));
    }

    #[test]
    fn verdict_uses_order_when_index_is_absent() {
        let cs = vec![candidate(1), candidate(3)];
        assert_eq!(AdvisoryVerdict::order(3, "").resolve_index(&cs), Ok(1));
    }

    #[test]
    fn out_of_range_index_is_rejected_even_with_valid_order() {
        let cs = vec![candidate(1), candidate(3)];
        let v = AdvisoryVerdict {
            selected_index: Some(7),
            order: Some(3),
            rationale: String::new(),
        };
        assert_eq!(
            v.resolve_index(&cs),
            Err(AdvisoryError::InvalidSelection {
                index: Some(7),
                order: Some(3),
                len: 2
            })
        );
    }

    #[test]
    fn verdict_without_valid_target_is_rejected() {
        let cs = vec![candidate(1)];
        let err = AdvisoryVerdict::order(2, "").resolve_index(&cs).unwrap_err();
        assert_eq!(
            err,
            AdvisoryError::InvalidSelection {
                index: None,
                order: Some(2),
                len: 1
            }
        );
    }

    #[test]
    fn consult_returns_resolver_verdict() {
        let resolver: Arc<dyn AdvisoryResolver> =
            Arc::new(|req: &AdvisoryRequest| -> Result<AdvisoryVerdict, AdvisoryError> {
                Ok(AdvisoryVerdict::index(req.candidates.len() - 1, "last"))
            });
        let advisor = Advisor::new(resolver, Duration::from_secs(5));
        let req = AdvisoryRequest::from_candidates(&[candidate(1), candidate(2)], 0.05);
        let v = advisor.consult(req).unwrap();
        assert_eq!(v.selected_index, Some(1));
        assert_eq!(v.rationale, "last");
    }

    #[test]
    fn consult_times_out() {
        let resolver: Arc<dyn AdvisoryResolver> =
            Arc::new(|_: &AdvisoryRequest| -> Result<AdvisoryVerdict, AdvisoryError> {
                thread::sleep(Duration::from_millis(500));
                Ok(AdvisoryVerdict::index(0, "late"))
            });
        let advisor = Advisor::new(resolver, Duration::from_millis(20));
        let req = AdvisoryRequest::from_candidates(&[candidate(1)], 0.05);
        assert_eq!(advisor.consult(req), Err(AdvisoryError::Timeout { timeout_ms: 20 }));
    }

    #[test]
    fn consult_reports_panicking_resolver_as_disconnected() {
        let resolver: Arc<dyn AdvisoryResolver> =
            Arc::new(|_: &AdvisoryRequest| -> Result<AdvisoryVerdict, AdvisoryError> {
                panic!("resolver blew up")
            });
        let advisor = Advisor::new(resolver, Duration::from_secs(5));
        let req = AdvisoryRequest::from_candidates(&[candidate(1)], 0.05);
        assert_eq!(advisor.consult(req), Err(AdvisoryError::Disconnected));
    }

    #[test]
    fn request_carries_pole_moduli() {
        let req = AdvisoryRequest::from_candidates(&[candidate(2)], 0.1);
        assert_eq!(req.candidates[0].pole_moduli, vec![0.5, 0.5]);
        assert_eq!(req.candidates[0].index, 0);
        assert_eq!(req.sampling_interval, 0.1);
    }

    #[test]
    fn decision_accepts_string_indices() {
        let v = parse_decision(r#"{"analysis": "ok", "selected_index": "1", "order": 2}"#, 3).unwrap();
        assert_eq!(v.selected_index, Some(1));
        assert_eq!(v.order, Some(2));
        assert_eq!(v.rationale, "ok");
    }

    #[test]
    fn single_candidate_decision_targets_index_zero() {
        let v = parse_decision(r#"{"rationale": "stable, pole at 0.5"}"#, 1).unwrap();
        assert_eq!(v.selected_index, Some(0));
    }

    #[test]
    fn malformed_reply_is_a_resolver_error() {
        assert!(matches!(parse_decision("not json", 2), Err(AdvisoryError::Resolver(_))));
    }

    #[test]
    fn prompts_state_the_criteria() {
        let pair = AdvisoryRequest::from_candidates(&[candidate(1), candidate(2)], 0.05);
        let multi = build_prompt(&pair).unwrap();
        assert!(multi.contains("less than 10%"));
        assert!(multi.contains("Ts = 0.0500 s"));
        let single = build_prompt(&AdvisoryRequest::from_candidates(&[candidate(1)], 0.05)).unwrap();
        assert!(single.contains("Analyze"));
    }
}
