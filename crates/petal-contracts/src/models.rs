use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::now_utc_iso;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowerCategory {
    Main,
    Filler,
    Foliage,
}

impl FlowerCategory {
    pub const ALL: [FlowerCategory; 3] = [
        FlowerCategory::Main,
        FlowerCategory::Filler,
        FlowerCategory::Foliage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FlowerCategory::Main => "main",
            FlowerCategory::Filler => "filler",
            FlowerCategory::Foliage => "foliage",
        }
    }
}

/// One inventory line item for a single flower or material type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowerStock {
    pub id: String,
    pub name: String,
    pub color: String,
    pub quantity: u32,
    pub initial_stock: u32,
    pub category: FlowerCategory,
    pub unit_cost: f64,
    pub retail_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meaning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_used: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub culture_tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl FlowerStock {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &str,
        color: &str,
        quantity: u32,
        initial_stock: u32,
        category: FlowerCategory,
        unit_cost: f64,
        retail_price: f64,
        meaning: Option<&str>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            color: color.to_string(),
            quantity,
            initial_stock,
            category,
            unit_cost,
            retail_price,
            meaning: meaning.map(str::to_string),
            total_used: None,
            culture_tags: None,
            created_at: Some(now_utc_iso()),
            updated_at: None,
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.culture_tags = Some(tags.iter().map(|tag| tag.to_string()).collect());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Occasion {
    Wedding,
    Birthday,
    Comfort,
    Home,
    Graduation,
    Opening,
    Apology,
    Valentine,
    MotherDay,
    Other,
}

impl Occasion {
    pub const ALL: [Occasion; 10] = [
        Occasion::Wedding,
        Occasion::Birthday,
        Occasion::Comfort,
        Occasion::Home,
        Occasion::Graduation,
        Occasion::Opening,
        Occasion::Apology,
        Occasion::Valentine,
        Occasion::MotherDay,
        Occasion::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Occasion::Wedding => "wedding",
            Occasion::Birthday => "birthday",
            Occasion::Comfort => "comfort",
            Occasion::Home => "home",
            Occasion::Graduation => "graduation",
            Occasion::Opening => "opening",
            Occasion::Apology => "apology",
            Occasion::Valentine => "valentine",
            Occasion::MotherDay => "mother_day",
            Occasion::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipient {
    Partner,
    Parent,
    Friend,
    Elder,
    #[serde(rename = "self")]
    SelfRecipient,
    Colleague,
    Child,
}

impl Recipient {
    pub const ALL: [Recipient; 7] = [
        Recipient::Partner,
        Recipient::Parent,
        Recipient::Friend,
        Recipient::Elder,
        Recipient::SelfRecipient,
        Recipient::Colleague,
        Recipient::Child,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Recipient::Partner => "partner",
            Recipient::Parent => "parent",
            Recipient::Friend => "friend",
            Recipient::Elder => "elder",
            Recipient::SelfRecipient => "self",
            Recipient::Colleague => "colleague",
            Recipient::Child => "child",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    Romantic,
    Fresh,
    Vintage,
    Passionate,
    Minimalist,
    Wild,
    Elegant,
}

impl Style {
    pub const ALL: [Style; 7] = [
        Style::Romantic,
        Style::Fresh,
        Style::Vintage,
        Style::Passionate,
        Style::Minimalist,
        Style::Wild,
        Style::Elegant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Style::Romantic => "romantic",
            Style::Fresh => "fresh",
            Style::Vintage => "vintage",
            Style::Passionate => "passionate",
            Style::Minimalist => "minimalist",
            Style::Wild => "wild",
            Style::Elegant => "elegant",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorPalette {
    Warm,
    Cool,
    Pastel,
    Vibrant,
    Monochrome,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    Bouquet,
    Vase,
    Box,
    Basket,
}

/// Structured design input. Immutable once handed to the planner for a
/// given generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignRequest {
    pub id: String,
    pub occasion: Occasion,
    pub recipient: Recipient,
    pub style: Style,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_palette: Option<ColorPalette>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technique: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proportion_rule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seasonality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cultural_context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_preference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood_preference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_preference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_style: Option<String>,
}

impl DesignRequest {
    pub fn new(occasion: Occasion, recipient: Recipient, style: Style) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            occasion,
            recipient,
            style,
            color_palette: None,
            format: None,
            budget: None,
            requirements: None,
            school: None,
            technique: None,
            design_mode: None,
            proportion_rule: None,
            seasonality: None,
            cultural_context: None,
            scale_preference: None,
            mood_preference: None,
            form_preference: None,
            background_style: None,
        }
    }
}

impl Default for DesignRequest {
    fn default() -> Self {
        Self::new(Occasion::Home, Recipient::SelfRecipient, Style::Fresh)
    }
}

/// One bill-of-materials line in a generated plan. References inventory by
/// free-text name only; resolution happens later via fuzzy matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanFlowerItem {
    pub flower_name: String,
    pub count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    Draft,
    Completed,
}

/// A generated floral-arrangement proposal. Status moves draft -> completed
/// exactly once, when the plan is executed against inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignPlan {
    pub id: String,
    pub request_id: String,
    pub title: String,
    pub description: String,
    pub flower_list: Vec<PlanFlowerItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    pub steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_prompt: Option<String>,
    pub meaning_text: String,
    pub total_cost: f64,
    pub profit: f64,
    pub profit_margin: f64,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub status: PlanStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<String>,
}

/// AI provider settings. The key is merged in from the secret store at read
/// time and never lands in the plain persisted blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    #[serde(default)]
    pub api_key: String,
    pub endpoint: String,
    pub text_model: String,
    pub vision_model: String,
    pub image_model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_endpoint: Option<String>,
    pub budget: f64,
    pub alert_threshold: u32,
    pub low_stock_threshold: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string(),
            text_model: "qwen-plus".to_string(),
            vision_model: "qwen-vl-max".to_string(),
            image_model: "wanx-v1".to_string(),
            image_endpoint: None,
            budget: 500.0,
            alert_threshold: 5,
            low_stock_threshold: 10,
        }
    }
}

/// A known provider and the models it serves, used to prefill settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub endpoint: &'static str,
    pub models: &'static [&'static str],
    pub vision_models: &'static [&'static str],
    pub image_endpoint: &'static str,
    pub image_models: &'static [&'static str],
}

pub const PROVIDER_PRESETS: &[ProviderPreset] = &[
    ProviderPreset {
        id: "aliyun",
        name: "Aliyun (Qwen/Wanx)",
        endpoint: "https://dashscope.aliyuncs.com/compatible-mode/v1",
        models: &["qwen-plus", "qwen-max", "qwen-turbo"],
        vision_models: &["qwen-vl-max", "qwen-vl-plus"],
        image_endpoint: "https://dashscope.aliyuncs.com",
        image_models: &["wanx-v1", "wan2.1-t2i-turbo"],
    },
    ProviderPreset {
        id: "openrouter",
        name: "OpenRouter (Claude/Gemini)",
        endpoint: "https://openrouter.ai/api/v1",
        models: &[
            "anthropic/claude-3.5-sonnet",
            "google/gemini-pro",
            "openai/gpt-4o",
        ],
        vision_models: &[
            "google/gemini-1.5-pro",
            "openai/gpt-4o",
            "anthropic/claude-3.5-sonnet",
        ],
        image_endpoint: "https://openrouter.ai/api/v1",
        image_models: &["google/gemini-3-pro-image-preview"],
    },
    ProviderPreset {
        id: "deepseek",
        name: "DeepSeek",
        endpoint: "https://api.deepseek.com",
        models: &["deepseek-chat", "deepseek-coder"],
        vision_models: &[],
        image_endpoint: "",
        image_models: &[],
    },
    ProviderPreset {
        id: "openai",
        name: "OpenAI (Official)",
        endpoint: "https://api.openai.com/v1",
        models: &["gpt-4o", "gpt-4-turbo", "gpt-3.5-turbo"],
        vision_models: &["gpt-4o", "gpt-4-turbo"],
        image_endpoint: "https://api.openai.com/v1",
        image_models: &["dall-e-3", "dall-e-2"],
    },
    ProviderPreset {
        id: "custom",
        name: "Custom / Other",
        endpoint: "",
        models: &[],
        vision_models: &[],
        image_endpoint: "",
        image_models: &[],
    },
];

pub fn provider_preset(id: &str) -> Option<&'static ProviderPreset> {
    PROVIDER_PRESETS.iter().find(|preset| preset.id == id)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
}

/// Output language for generated plan text. The image prompt always stays
/// English.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Zh,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Zh => "zh",
        }
    }

    pub fn prompt_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Zh => "Simplified Chinese",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "en" => Some(Language::En),
            "zh" => Some(Language::Zh),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn flower_stock_serializes_camel_case() -> anyhow::Result<()> {
        let stock = FlowerStock::new(
            "Red Rose",
            "Red",
            50,
            100,
            FlowerCategory::Main,
            5.0,
            15.0,
            Some("Love"),
        );
        let value = serde_json::to_value(&stock)?;
        assert_eq!(value.get("initialStock"), Some(&json!(100)));
        assert_eq!(value.get("unitCost"), Some(&json!(5.0)));
        assert_eq!(value.get("category"), Some(&json!("main")));
        assert!(value.get("totalUsed").is_none());
        Ok(())
    }

    #[test]
    fn design_request_defaults() {
        let request = DesignRequest::default();
        assert_eq!(request.occasion, Occasion::Home);
        assert_eq!(request.recipient, Recipient::SelfRecipient);
        assert_eq!(request.style, Style::Fresh);
        assert!(!request.id.is_empty());
    }

    #[test]
    fn recipient_self_serializes_as_self() -> anyhow::Result<()> {
        let value = serde_json::to_value(Recipient::SelfRecipient)?;
        assert_eq!(value, json!("self"));
        Ok(())
    }

    #[test]
    fn api_config_default_matches_aliyun_preset() {
        let config = ApiConfig::default();
        let preset = provider_preset("aliyun").expect("preset");
        assert_eq!(config.endpoint, preset.endpoint);
        assert_eq!(config.text_model, preset.models[0]);
        assert_eq!(config.low_stock_threshold, 10);
    }

    #[test]
    fn language_parse_round_trip() {
        assert_eq!(Language::parse("EN"), Some(Language::En));
        assert_eq!(Language::parse(" zh "), Some(Language::Zh));
        assert_eq!(Language::parse("fr"), None);
        assert_eq!(Language::Zh.prompt_name(), "Simplified Chinese");
    }
}
