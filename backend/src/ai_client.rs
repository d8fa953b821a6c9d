use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{
    assembler::DirectionsEnricher,
    config::LanguageModelConfig,
    error::SuggestionError,
    geometry::sample_evenly,
    models::{Coordinate, Difficulty, DirectionStep, DraftWalk, WalkType},
};

const WALK_TEMPERATURE: f32 = 0.7;
const WALK_MAX_OUTPUT_TOKENS: u32 = 8192;
const DIRECTIONS_TEMPERATURE: f32 = 0.4;
const DIRECTIONS_MAX_OUTPUT_TOKENS: u32 = 4096;
/// Route points quoted to the model when asking for directions.
const DIRECTIONS_SAMPLE_POINTS: usize = 12;

const WALK_PROMPT: &str = r#"You are an experienced UK hill-walking guide. Suggest ONE real walk matching the request below.
Reply with a single JSON object and nothing else, using exactly these fields:
{
  "name": string,
  "startLat": number, "startLon": number,          // car park
  "endLat": number, "endLon": number,              // equal to start for a circular walk
  "isCircular": boolean,
  "destinationLat": number, "destinationLon": number, // main feature (summit, tarn, waterfall)
  "loopWaypoints": [[lat, lon], ...],              // 2 to 6 points that shape the route, in order
  "distance": string, "time": string,
  "difficulty": "Easy" | "Moderate" | "Challenging",
  "elevation": string,                             // e.g. "450m" or "N/A"
  "terrain": string,
  "walkType": "summit" | "ridge" | "lakeside" | "waterfall" | "woodland" | "coastal" | "valley",
  "description": string, "payoff": string, "parking": string,
  "directions": [{"step": number, "instruction": string, "landmark": string}]
}
Request: "#;

const DIRECTIONS_PROMPT: &str = r#"Write walking directions for the route below.
Reply with a JSON object {"directions": [{"step": number, "instruction": string, "landmark": string}]} and nothing else.
Use 5 to 10 steps, each naming a landmark a walker would recognise.
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Set on intermediate reasoning parts, which carry no answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Some(Role::User),
            parts: vec![Part {
                text: Some(text.into()),
                thought: None,
            }],
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

impl GenerateRequest {
    /// Single user turn with output constrained to JSON.
    pub fn json(prompt: impl Into<String>, temperature: f32, max_output_tokens: u32) -> Self {
        Self {
            contents: vec![Content::user(prompt)],
            generation_config: GenerationConfig {
                temperature,
                max_output_tokens,
                response_mime_type: "application/json".into(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

impl GenerateResponse {
    /// Last non-empty answer part of the first candidate, skipping thoughts.
    pub fn answer_text(&self) -> Result<&str, SuggestionError> {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .and_then(|content| {
                content
                    .parts
                    .iter()
                    .filter(|part| part.thought != Some(true))
                    .filter_map(|part| part.text.as_deref())
                    .filter(|text| !text.trim().is_empty())
                    .last()
            })
            .ok_or_else(|| SuggestionError::MalformedResponse("response contains no text".into()))
    }
}

/// A text-generation backend.
pub trait LanguageModel: Send + Sync {
    fn generate(
        &self,
        request: &GenerateRequest,
    ) -> impl Future<Output = Result<GenerateResponse, SuggestionError>> + Send;
}

/// Gemini `generateContent` over HTTP.
#[derive(Debug, Clone)]
pub struct GeminiModel {
    http: reqwest::Client,
    config: LanguageModelConfig,
}

impl GeminiModel {
    pub fn new(http: reqwest::Client, config: LanguageModelConfig) -> Self {
        Self { http, config }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

impl LanguageModel for GeminiModel {
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, SuggestionError> {
        let key = self
            .config
            .api_key
            .as_deref()
            .ok_or(SuggestionError::NoCredentials)?;

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", key)
            .json(request)
            .send()
            .await
            .map_err(|err| SuggestionError::Unavailable(err.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| SuggestionError::Unavailable(err.to_string()))?;
        if !status.is_success() {
            return Err(SuggestionError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|err| SuggestionError::MalformedResponse(err.to_string()))
    }
}

/// The walk shape the model is asked to produce.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SuggestedWalk {
    name: String,
    start_lat: f64,
    start_lon: f64,
    #[serde(default)]
    end_lat: Option<f64>,
    #[serde(default)]
    end_lon: Option<f64>,
    #[serde(default)]
    is_circular: Option<bool>,
    #[serde(default)]
    destination_lat: Option<f64>,
    #[serde(default)]
    destination_lon: Option<f64>,
    /// `[lat, lon]` pairs.
    #[serde(default)]
    loop_waypoints: Vec<[f64; 2]>,
    #[serde(default)]
    distance: String,
    #[serde(default)]
    time: String,
    #[serde(default)]
    difficulty: Difficulty,
    #[serde(default)]
    elevation: Option<String>,
    #[serde(default)]
    terrain: String,
    #[serde(default)]
    walk_type: WalkType,
    #[serde(default)]
    description: String,
    #[serde(default)]
    payoff: String,
    #[serde(default)]
    parking: String,
    #[serde(default)]
    directions: Vec<DirectionStep>,
}

impl TryFrom<SuggestedWalk> for DraftWalk {
    type Error = SuggestionError;

    fn try_from(walk: SuggestedWalk) -> Result<Self, Self::Error> {
        let name = walk.name.trim().to_string();
        if name.is_empty() {
            return Err(malformed("walk has no name"));
        }

        let start = checked(walk.start_lat, walk.start_lon, "start")?;
        let end = optional_pair(walk.end_lat, walk.end_lon, "end")?;
        let destination = optional_pair(walk.destination_lat, walk.destination_lon, "destination")?;
        let loop_waypoints = walk
            .loop_waypoints
            .iter()
            .map(|[lat, lon]| checked(*lat, *lon, "loop waypoint"))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DraftWalk {
            name,
            start,
            end,
            is_circular: walk.is_circular,
            destination,
            loop_waypoints,
            distance: walk.distance,
            time: walk.time,
            difficulty: walk.difficulty,
            elevation: walk
                .elevation
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(shared::not_available),
            terrain: walk.terrain,
            walk_type: walk.walk_type,
            description: walk.description,
            payoff: walk.payoff,
            parking: walk.parking,
            directions: renumber(walk.directions),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DirectionsReply {
    Wrapped { directions: Vec<DirectionStep> },
    Bare(Vec<DirectionStep>),
}

/// Walk suggestions and direction enrichment backed by a [`LanguageModel`].
#[derive(Debug, Clone)]
pub struct SuggestionClient<M> {
    model: M,
}

impl<M: LanguageModel> SuggestionClient<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    /// Ask the model for a walk matching `prompt`. The draft still lacks a
    /// resolved path; hand it to the route assembler.
    pub async fn suggest_walk(&self, prompt: &str) -> Result<DraftWalk, SuggestionError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(SuggestionError::EmptyPrompt);
        }

        let request = GenerateRequest::json(
            format!("{WALK_PROMPT}{prompt}"),
            WALK_TEMPERATURE,
            WALK_MAX_OUTPUT_TOKENS,
        );
        let response = self.model.generate(&request).await?;
        let draft = parse_suggested_walk(response.answer_text()?)?;

        tracing::info!(
            "suggested walk '{}' ({} loop waypoints, destination: {})",
            draft.name,
            draft.loop_waypoints.len(),
            draft.destination.is_some()
        );
        Ok(draft)
    }

    async fn request_directions(
        &self,
        name: &str,
        waypoints: &[Coordinate],
        start_label: &str,
        difficulty: Difficulty,
    ) -> Result<Vec<DirectionStep>, SuggestionError> {
        let route = sample_evenly(waypoints, DIRECTIONS_SAMPLE_POINTS)
            .iter()
            .map(|c| format!("({:.5}, {:.5})", c.lat, c.lon))
            .collect::<Vec<_>>()
            .join(", ");
        let prompt = format!(
            "{DIRECTIONS_PROMPT}Walk: {name}\nStart: {start_label}\nDifficulty: {difficulty:?}\nRoute points (lat, lon): {route}\n"
        );

        let request =
            GenerateRequest::json(prompt, DIRECTIONS_TEMPERATURE, DIRECTIONS_MAX_OUTPUT_TOKENS);
        let response = self.model.generate(&request).await?;
        let text = strip_code_fences(response.answer_text()?);
        let reply: DirectionsReply =
            serde_json::from_str(text).map_err(|err| malformed(err.to_string()))?;
        let steps = match reply {
            DirectionsReply::Wrapped { directions } | DirectionsReply::Bare(directions) => directions,
        };
        Ok(renumber(steps))
    }
}

impl<M: LanguageModel> DirectionsEnricher for SuggestionClient<M> {
    async fn suggest_directions(
        &self,
        name: &str,
        waypoints: &[Coordinate],
        start_label: &str,
        difficulty: Difficulty,
    ) -> Vec<DirectionStep> {
        match self
            .request_directions(name, waypoints, start_label, difficulty)
            .await
        {
            Ok(steps) => steps,
            Err(err) => {
                tracing::warn!("direction suggestions for '{}' unavailable: {}", name, err);
                Vec::new()
            }
        }
    }
}

/// Remove a surrounding markdown code fence (```` ```json ... ``` ````).
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = rest.trim_end();
    let body = body.strip_suffix("```").unwrap_or(body);
    let tag_len = body
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(body.len());
    body[tag_len..].trim()
}

/// Strictly decode the model's walk JSON into a draft.
pub fn parse_suggested_walk(text: &str) -> Result<DraftWalk, SuggestionError> {
    let suggested: SuggestedWalk =
        serde_json::from_str(strip_code_fences(text)).map_err(|err| malformed(err.to_string()))?;
    DraftWalk::try_from(suggested)
}

fn checked(lat: f64, lon: f64, what: &str) -> Result<Coordinate, SuggestionError> {
    let coord = Coordinate { lat, lon };
    if coord.is_valid() {
        Ok(coord)
    } else {
        Err(malformed(format!("{what} coordinate ({lat}, {lon}) out of range")))
    }
}

fn optional_pair(
    lat: Option<f64>,
    lon: Option<f64>,
    what: &str,
) -> Result<Option<Coordinate>, SuggestionError> {
    match (lat, lon) {
        (Some(lat), Some(lon)) => checked(lat, lon, what).map(Some),
        (None, None) => Ok(None),
        _ => Err(malformed(format!("{what} coordinate is missing an axis"))),
    }
}

fn renumber(steps: Vec<DirectionStep>) -> Vec<DirectionStep> {
    steps
        .into_iter()
        .enumerate()
        .map(|(idx, step)| DirectionStep {
            step: idx as u32 + 1,
            ..step
        })
        .collect()
}

fn malformed(message: impl Into<String>) -> SuggestionError {
    SuggestionError::MalformedResponse(message.into())
}
