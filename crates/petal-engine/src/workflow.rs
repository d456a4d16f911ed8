use std::fs;
use std::path::Path;

use petal_contracts::models::{DesignPlan, DesignRequest};
use tracing::warn;

use crate::error::AiResult;
use crate::image::{image_extension, ImageDispatcher};
use crate::planner::DesignPlanner;

/// Full generation pass: plan first, then the optional preview image. The
/// caller persists the returned plan to history.
pub fn generate_with_preview(
    planner: &DesignPlanner,
    dispatcher: &ImageDispatcher,
    request: &DesignRequest,
    inventory_listing: &str,
    image_dir: Option<&Path>,
) -> AiResult<DesignPlan> {
    let mut plan = planner.generate_plan(request, inventory_listing)?;
    attach_preview(dispatcher, &mut plan, image_dir);
    Ok(plan)
}

/// Renders the plan's visual prompt and attaches the result. Image trouble
/// never fails the plan; it lands on the plan as a generation-error note.
/// With an `image_dir`, the payload is fetched, validated, and saved there
/// and `image_url` becomes the local file name; otherwise the raw reference
/// is kept.
pub fn attach_preview(
    dispatcher: &ImageDispatcher,
    plan: &mut DesignPlan,
    image_dir: Option<&Path>,
) {
    let Some(prompt) = plan.image_prompt.clone().filter(|prompt| !prompt.is_empty()) else {
        return;
    };

    let reference = match dispatcher.generate(&prompt) {
        Ok(reference) => reference,
        Err(err) => {
            warn!(plan = %plan.id, "image generation failed: {err}");
            plan.image_error = Some(err.to_string());
            return;
        }
    };

    let Some(dir) = image_dir else {
        plan.image_url = Some(reference);
        return;
    };

    match dispatcher.fetch_image_bytes(&reference) {
        Ok(bytes) => {
            let file_name = format!("{}.{}", plan.id, image_extension(&bytes));
            let path = dir.join(&file_name);
            match fs::create_dir_all(dir).and_then(|_| fs::write(&path, &bytes)) {
                Ok(()) => plan.image_url = Some(file_name),
                Err(err) => {
                    warn!(path = %path.display(), "failed to save preview image: {err}");
                    plan.image_error = Some(err.to_string());
                }
            }
        }
        Err(err) => {
            warn!(plan = %plan.id, "preview payload was unusable: {err}");
            plan.image_error = Some(err.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use petal_contracts::models::{ApiConfig, DesignPlan, PlanStatus};
    use petal_contracts::now_utc_iso;

    use crate::image::ImageDispatcher;

    use super::attach_preview;

    fn draft_plan(image_prompt: Option<&str>) -> DesignPlan {
        DesignPlan {
            id: "p1".to_string(),
            request_id: "r1".to_string(),
            title: "Test".to_string(),
            description: String::new(),
            flower_list: Vec::new(),
            reasoning: None,
            steps: Vec::new(),
            image_url: None,
            image_error: None,
            image_prompt: image_prompt.map(str::to_string),
            meaning_text: String::new(),
            total_cost: 0.0,
            profit: 0.0,
            profit_margin: 0.0,
            created_at: now_utc_iso(),
            requirements: None,
            rating: None,
            feedback: None,
            status: PlanStatus::Draft,
            executed_at: None,
        }
    }

    fn dispatcher() -> anyhow::Result<ImageDispatcher> {
        let mut config = ApiConfig::default();
        config.api_key = "sk-test".to_string();
        config.image_model = "dall-e-3".to_string();
        Ok(ImageDispatcher::new(config)?)
    }

    #[test]
    fn missing_or_empty_prompt_skips_image_generation() -> anyhow::Result<()> {
        let dispatcher = dispatcher()?;

        let mut plan = draft_plan(None);
        attach_preview(&dispatcher, &mut plan, None);
        assert_eq!(plan.image_url, None);
        assert_eq!(plan.image_error, None);

        let mut plan = draft_plan(Some(""));
        attach_preview(&dispatcher, &mut plan, None);
        assert_eq!(plan.image_url, None);
        assert_eq!(plan.image_error, None);
        Ok(())
    }
}
