use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use petal_contracts::models::{
    ApiConfig, DesignPlan, DesignRequest, Language, PlanFlowerItem, PlanStatus,
};
use petal_contracts::now_utc_iso;
use reqwest::blocking::{Client as HttpClient, Response as HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AiError, AiResult};
use crate::{endpoint_url, truncate_text, REQUEST_TIMEOUT};

const STYLE_BOOSTER_QUALITY: &str = "Award-winning botanical photography, tack-sharp focus on blooms with creamy bokeh background, natural color grading, subtle rim lighting highlighting petal translucency, commercial floristry portfolio.";
const STYLE_BOOSTER_TEXTURE: &str = "Macro-level detail on petal veins and dewdrops, crisp leaf edges, visible flower anthers and pistils, natural imperfections adding authenticity";

/// Turns a structured request plus an inventory listing into a draft plan by
/// calling the configured chat (or vision) completion endpoint.
pub struct DesignPlanner {
    config: ApiConfig,
    language: Language,
    http: HttpClient,
}

impl DesignPlanner {
    pub fn new(config: ApiConfig, language: Language) -> AiResult<Self> {
        if config.api_key.is_empty() {
            return Err(AiError::MissingCredential);
        }
        reqwest::Url::parse(&config.endpoint)
            .map_err(|_| AiError::InvalidEndpoint(config.endpoint.clone()))?;
        let http = HttpClient::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            config,
            language,
            http,
        })
    }

    pub fn generate_plan(
        &self,
        request: &DesignRequest,
        inventory_listing: &str,
    ) -> AiResult<DesignPlan> {
        let system = self.system_prompt(inventory_listing);
        let user = user_prompt(request);
        debug!(model = %self.config.text_model, "requesting design plan");

        let content = self.chat_completion(&system, &user)?;
        let payload = parse_plan_payload(&content)?;
        Ok(build_plan(request, payload))
    }

    /// Visual-reference variant: the photo is sent inline as a data URI and
    /// the model is asked for both an inventory-constrained bill of materials
    /// and an unconstrained visual reproduction prompt.
    pub fn generate_plan_from_image(
        &self,
        image_bytes: &[u8],
        request: &DesignRequest,
        inventory_listing: &str,
    ) -> AiResult<DesignPlan> {
        let encoded = BASE64.encode(image_bytes);
        let system = self.vision_system_prompt(inventory_listing);
        debug!(model = %self.config.vision_model, "requesting design plan from reference image");

        let content = self.vision_completion(
            &system,
            "Analyze this image and create a floral design.",
            &encoded,
        )?;
        let payload = parse_plan_payload(&content)?;
        Ok(build_plan(request, payload))
    }

    fn chat_completion(&self, system: &str, user: &str) -> AiResult<String> {
        let url = endpoint_url(&self.config.endpoint, "chat/completions")?;
        let payload = json!({
            "model": self.config.text_model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "temperature": 0.7,
            "response_format": {"type": "json_object"},
        });
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()?;
        read_message_content(response)
    }

    fn vision_completion(
        &self,
        system: &str,
        user: &str,
        image_base64: &str,
    ) -> AiResult<String> {
        let url = endpoint_url(&self.config.endpoint, "chat/completions")?;
        let payload = json!({
            "model": self.config.vision_model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": [
                    {"type": "text", "text": user},
                    {"type": "image_url", "image_url": {
                        "url": format!("data:image/jpeg;base64,{image_base64}"),
                    }},
                ]},
            ],
            "max_tokens": 2000,
        });
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()?;
        let content = read_message_content(response)?;
        Ok(strip_code_fences(&content))
    }

    fn system_prompt(&self, inventory_listing: &str) -> String {
        format!(
            "You are a master florist with profound knowledge of Eastern and Western floral arts.\n\
             Design a stunning arrangement based on the user request and available inventory.\n\
             \n\
             # Design Philosophies\n\
             - Western (Romantic/English): Emphasize mass, symmetry or abundance. Use main flowers + fillers + foliage.\n\
             - Eastern (Zen/Ikenobo): Emphasize line, negative space (Ma), and asymmetry. Less is more.\n\
             - Modern: Focus on texture, grouping, and bold color blocking.\n\
             \n\
             # Process\n\
             1. Analyze the Request (Occasion, Recipient, Style).\n\
             2. Check Inventory constraints (Budget, Stock).\n\
             3. Formulate a creative concept.\n\
             4. Select materials (prioritize in-stock).\n\
             \n\
             # Output Requirements\n\
             - Language: {language} (except imagePrompt).\n\
             - Output strictly valid JSON.\n\
             - \"imagePrompt\" must be a highly detailed English visual description.\n\
             \n\
             Inventory:\n\
             {inventory}",
            language = self.language.prompt_name(),
            inventory = inventory_listing,
        )
    }

    fn vision_system_prompt(&self, inventory_listing: &str) -> String {
        format!(
            "You are a world-class Floral Art Director, Botanical Photographer, and Master Florist.\n\
             \n\
             **YOUR MISSION Analysis:**\n\
             1. **Practical Flower BOM**: A list of flowers from inventory to physically recreate the design.\n\
             2. **Visual Reproduction Prompt**: A structured prompt to generate an image that EXACTLY matches the reference.\n\
             \n\
             **CRITICAL INSTRUCTION: MULTILINGUAL OUTPUT**\n\
             The visual analysis and image prompt generation must be done in English to ensure precision.\n\
             Review the user's language: {language}.\n\
             For the Final JSON Output, the \"title\", \"description\", \"meaningText\", \"steps\", and \"reason\" (in flowerList) fields MUST be written in {language}.\n\
             Everything else (including visualAnalysis and imagePrompt) should remain in English.\n\
             \n\
             > **CRITICAL RULE**: The Visual Reproduction Prompt is NOT constrained by inventory. You may describe ANY materials (driftwood, willow, coral branches, etc.) that appear in the reference image, even if they're not in the flower inventory.\n\
             \n\
             ---\n\
             \n\
             ## PHASE 1: MANDATORY VISUAL ANALYSIS (Mental Scratchpad)\n\
             \n\
             ### A. SCALE DETECTION\n\
             Identify reference objects and estimate dimensions (Micro <30cm, Small 30-60cm, Medium 60-120cm, Large 1-3m, Monumental >3m).\n\
             \n\
             ### B. STRUCTURAL DNA\n\
             Analyze the geometry (Fan, Dome, Asymmetrical, Linear, Architectural).\n\
             \n\
             ### C. COLOR PALETTE\n\
             Identify dominant hues, accents, and color harmony (Monochromatic, Analogous, Complementary).\n\
             \n\
             ---\n\
             \n\
             ## PHASE 2: INVENTORY MAPPING\n\
             Map the visual elements to available inventory.\n\
             - If exact match exists (e.g., Red Rose), use it.\n\
             - If unavailable, find the best texture/color substitute from inventory.\n\
             - Only list flowers that physically exist in the 'Inventory' list below.\n\
             \n\
             Inventory:\n\
             {inventory}\n\
             \n\
             ---\n\
             \n\
             ## PROMPT CONSTRUCTION GUIDE\n\
             Construct 'imagePrompt' by combining:\n\
             1. [Scale/Type Declaration] (e.g. \"A large architectural floral installation...\")\n\
             2. [Structure Description]\n\
             3. [Central Focal Flowers]\n\
             4. [Supporting Elements]\n\
             5. [Setting/Lighting Context]\n\
             6. Style Booster: \"{booster_quality} {booster_texture}\"",
            language = self.language.prompt_name(),
            inventory = inventory_listing,
            booster_quality = STYLE_BOOSTER_QUALITY,
            booster_texture = STYLE_BOOSTER_TEXTURE,
        )
    }
}

/// Guidance text keyed off budget size; each tier dictates an expected stem
/// count and flower-type range.
fn budget_guidance(budget: f64) -> &'static str {
    if budget <= 200.0 {
        return "SIMPLE design: 3-5 stems total, 2-3 flower types, economical choices.";
    }
    if budget <= 500.0 {
        return "STANDARD design: 8-15 stems total, 3-5 flower types, balanced mix.";
    }
    if budget <= 1000.0 {
        return "PREMIUM design: 15-25 stems total, 4-6 flower types, include premium flowers.";
    }
    if budget <= 2000.0 {
        return "LUXURY design: 25-40 stems total, 5-8 flower types, prioritize premium flowers.";
    }
    "GRAND LUXURY design: 40+ stems total, 6-10 flower types, use the most premium flowers available."
}

fn user_prompt(request: &DesignRequest) -> String {
    let guidance = budget_guidance(request.budget.unwrap_or(0.0));
    format!(
        "Request:\n\
         - Occasion: {occasion}\n\
         - Recipient: {recipient}\n\
         - Style: {style}\n\
         - Budget: {budget}\n\
         - Professional Mode: {school} / {technique}\n\
         \n\
         **Budget Guidance**: {guidance}\n\
         \n\
         Return JSON:\n\
         {{\n\
           \"reasoning\": \"Step-by-step design logic...\",\n\
           \"flowerList\": [{{\"flowerName\": \"name\", \"count\": n, \"reason\": \"reason\"}}],\n\
           \"estimatedCost\": number,\n\
           \"title\": \"Title\",\n\
           \"description\": \"Desc\",\n\
           \"meaningText\": \"Meaning\",\n\
           \"steps\": [\"Step 1\", \"Step 2\"],\n\
           \"imagePrompt\": \"Detailed visual prompt\"\n\
         }}",
        occasion = request.occasion.as_str(),
        recipient = request.recipient.as_str(),
        style = request.style.as_str(),
        budget = request.budget.unwrap_or(0.0),
        school = request.school.as_deref().unwrap_or("None"),
        technique = request.technique.as_deref().unwrap_or("None"),
        guidance = guidance,
    )
}

#[derive(Debug, Deserialize)]
struct ChatMessagePayload {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoicePayload {
    message: ChatMessagePayload,
}

#[derive(Debug, Deserialize)]
struct ChatEnvelope {
    choices: Vec<ChatChoicePayload>,
}

fn read_message_content(response: HttpResponse) -> AiResult<String> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        warn!(
            status = status.as_u16(),
            body = %truncate_text(&body, 512),
            "chat completion request failed"
        );
        return Err(AiError::Provider(status.as_u16()));
    }
    let envelope: ChatEnvelope = response
        .json()
        .map_err(|err| AiError::ResponseParse(err.to_string()))?;
    Ok(envelope
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_else(|| "{}".to_string()))
}

fn strip_code_fences(content: &str) -> String {
    content.replace("```json", "").replace("```", "")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanItemPayload {
    flower_name: String,
    count: u32,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlanPayload {
    flower_list: Vec<PlanItemPayload>,
    #[serde(default)]
    reasoning: Option<String>,
    title: String,
    description: String,
    meaning_text: String,
    steps: Vec<String>,
    image_prompt: String,
    #[serde(default)]
    estimated_cost: Option<f64>,
}

fn parse_plan_payload(content: &str) -> AiResult<PlanPayload> {
    serde_json::from_str(content.trim()).map_err(|err| AiError::ResponseParse(err.to_string()))
}

fn build_plan(request: &DesignRequest, payload: PlanPayload) -> DesignPlan {
    let flower_list = payload
        .flower_list
        .into_iter()
        .map(|item| PlanFlowerItem {
            flower_name: item.flower_name,
            count: item.count,
            reason: item.reason,
            unit_cost: None,
        })
        .collect();

    DesignPlan {
        id: Uuid::new_v4().to_string(),
        request_id: request.id.clone(),
        title: payload.title,
        description: payload.description,
        flower_list,
        reasoning: payload.reasoning,
        steps: payload.steps,
        image_url: None,
        image_error: None,
        image_prompt: Some(payload.image_prompt),
        meaning_text: payload.meaning_text,
        total_cost: payload.estimated_cost.unwrap_or(0.0),
        profit: 0.0,
        profit_margin: 0.0,
        created_at: now_utc_iso(),
        requirements: request.requirements.clone(),
        rating: None,
        feedback: None,
        status: PlanStatus::Draft,
        executed_at: None,
    }
}

#[cfg(test)]
mod tests {
    use petal_contracts::models::{
        ApiConfig, DesignRequest, Language, Occasion, PlanStatus, Recipient, Style,
    };

    use crate::error::AiError;

    use super::{
        budget_guidance, build_plan, parse_plan_payload, strip_code_fences, user_prompt,
        DesignPlanner,
    };

    fn configured() -> ApiConfig {
        let mut config = ApiConfig::default();
        config.api_key = "sk-test".to_string();
        config
    }

    const PLAN_FIXTURE: &str = r#"{
        "reasoning": "Soft palette for a spring wedding.",
        "flowerList": [
            {"flowerName": "White Rose", "count": 12, "reason": "romantic focal"},
            {"flowerName": "Baby's Breath", "count": 20}
        ],
        "estimatedCost": 320.5,
        "title": "Cloud Veil",
        "description": "An airy, romantic bridal bouquet.",
        "meaningText": "Pure devotion",
        "steps": ["Condition stems overnight", "Build the focal cluster", "Bind and trim"],
        "imagePrompt": "A round bridal bouquet of white roses and gypsophila"
    }"#;

    #[test]
    fn planner_requires_a_credential() {
        let err = DesignPlanner::new(ApiConfig::default(), Language::En)
            .err()
            .expect("planner should refuse to build without a key");
        assert!(matches!(err, AiError::MissingCredential));
    }

    #[test]
    fn planner_rejects_malformed_endpoint() {
        let mut config = configured();
        config.endpoint = "not a url".to_string();
        let err = DesignPlanner::new(config, Language::En)
            .err()
            .expect("planner should refuse a malformed endpoint");
        assert!(matches!(err, AiError::InvalidEndpoint(_)));
    }

    #[test]
    fn budget_tiers_have_exact_boundaries() {
        assert!(budget_guidance(150.0).starts_with("SIMPLE"));
        assert!(budget_guidance(200.0).starts_with("SIMPLE"));
        assert!(budget_guidance(201.0).starts_with("STANDARD"));
        assert!(budget_guidance(500.0).starts_with("STANDARD"));
        assert!(budget_guidance(750.0).starts_with("PREMIUM"));
        assert!(budget_guidance(1000.0).starts_with("PREMIUM"));
        assert!(budget_guidance(2000.0).starts_with("LUXURY"));
        assert!(budget_guidance(5000.0).starts_with("GRAND LUXURY"));
    }

    #[test]
    fn user_prompt_embeds_request_fields_and_guidance() {
        let mut request = DesignRequest::new(Occasion::Wedding, Recipient::Partner, Style::Romantic);
        request.budget = Some(750.0);
        request.school = Some("western_english".to_string());

        let prompt = user_prompt(&request);
        assert!(prompt.contains("- Occasion: wedding"));
        assert!(prompt.contains("- Recipient: partner"));
        assert!(prompt.contains("- Style: romantic"));
        assert!(prompt.contains("**Budget Guidance**: PREMIUM design"));
        assert!(prompt.contains("western_english / None"));
        assert!(prompt.contains("\"flowerList\""));
    }

    #[test]
    fn system_prompt_embeds_inventory_and_language() -> anyhow::Result<()> {
        let planner = DesignPlanner::new(configured(), Language::Zh)?;
        let prompt = planner.system_prompt("- Red Rose (Color: Red, Qty: 50, Cost: ¥5/stem, Category: main)");
        assert!(prompt.contains("Language: Simplified Chinese (except imagePrompt)."));
        assert!(prompt.contains("- Red Rose (Color: Red"));
        Ok(())
    }

    #[test]
    fn vision_prompt_embeds_boosters_and_mapping_rules() -> anyhow::Result<()> {
        let planner = DesignPlanner::new(configured(), Language::En)?;
        let prompt = planner.vision_system_prompt("- Red Rose");
        assert!(prompt.contains("PHASE 2: INVENTORY MAPPING"));
        assert!(prompt.contains("Award-winning botanical photography"));
        assert!(prompt.contains("Review the user's language: English."));
        Ok(())
    }

    #[test]
    fn parse_plan_payload_reads_full_fixture() -> anyhow::Result<()> {
        let payload = parse_plan_payload(PLAN_FIXTURE)?;
        assert_eq!(payload.flower_list.len(), 2);
        assert_eq!(payload.flower_list[0].count, 12);
        assert_eq!(payload.flower_list[1].reason, None);
        assert_eq!(payload.steps.len(), 3);
        assert_eq!(payload.estimated_cost, Some(320.5));
        Ok(())
    }

    #[test]
    fn parse_plan_payload_rejects_missing_required_fields() {
        let err = parse_plan_payload(r#"{"flowerList": []}"#).unwrap_err();
        assert!(matches!(err, AiError::ResponseParse(_)));
    }

    #[test]
    fn build_plan_defaults_missing_cost_to_zero_and_starts_draft() -> anyhow::Result<()> {
        let without_cost = PLAN_FIXTURE.replace("\"estimatedCost\": 320.5,", "");
        let payload = parse_plan_payload(&without_cost)?;
        let request = DesignRequest::default();
        let plan = build_plan(&request, payload);

        assert_eq!(plan.total_cost, 0.0);
        assert_eq!(plan.profit, 0.0);
        assert_eq!(plan.profit_margin, 0.0);
        assert_eq!(plan.status, PlanStatus::Draft);
        assert_eq!(plan.request_id, request.id);
        assert_eq!(plan.image_prompt.as_deref(), Some("A round bridal bouquet of white roses and gypsophila"));
        assert!(plan.executed_at.is_none());
        Ok(())
    }

    #[test]
    fn strip_code_fences_removes_markdown_wrapping() {
        let fenced = "```json\n{\"title\": \"x\"}\n```";
        assert_eq!(strip_code_fences(fenced).trim(), "{\"title\": \"x\"}");
    }
}
