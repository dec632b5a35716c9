use crate::models::{capitalize, AnalysisResult, SessionState};

pub const DISCLAIMER: &str = "This estimation is generated by an AI vision model based on the \
provided photo. It may be inaccurate and should be treated as an approximation. For precise \
dietary guidance, consult authoritative nutrition labels or a professional.";

/// Plain-text view of a session: selection, status line, then the result.
pub fn format_session_report(session: &SessionState) -> String {
    let mut out = String::new();

    if let Some(image) = &session.image {
        out.push_str(&format!(
            "🖼️ Selected: {}\n📦 Size: {:.2} MB\n🍽️ Portion: {} serving(s)\n\n",
            image.display_name(),
            image.size_mb(),
            session.portion.trim()
        ));
    }

    if !session.message().is_empty() {
        out.push_str(&format!("ℹ️ {}\n\n", session.message()));
    }

    match &session.result {
        Some(result) => out.push_str(&format_analysis(result)),
        None => out.push_str("Upload or capture a food image to begin.\n"),
    }

    out
}

pub fn format_analysis(result: &AnalysisResult) -> String {
    let nutrition = &result.nutrition;
    let mut out = format!(
        "*{}*\n\
         {} confidence\n\
         Portion size: {}\n\n\
         🔥 Calories: {} kcal\n\
         🥩 Protein:  {} g\n\
         🍞 Carbs:    {} g\n\
         🧈 Fat:      {} g\n",
        result.display_name(),
        result.confidence_label(),
        result.portion_size,
        nutrient(nutrition.calories),
        nutrient(nutrition.protein),
        nutrient(nutrition.carbs),
        nutrient(nutrition.fat),
    );

    if let Some(insights) = result.insights() {
        out.push_str(&format!("\n💡 {}\n", insights));
    }

    let alternatives: Vec<String> = result.alternatives().map(|p| capitalize(&p.label)).collect();
    if !alternatives.is_empty() {
        out.push_str(&format!("\nOther possible dishes: {}\n", alternatives.join(", ")));
    }

    out.push_str(&format!("\n{}\n", DISCLAIMER));
    out
}

/// Missing values render as an em dash placeholder
fn nutrient(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{}", v),
        None => "—".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChosenImage, Nutrition, Prediction};

    fn result() -> AnalysisResult {
        AnalysisResult {
            food_name: "pizza".to_string(),
            confidence: 0.87,
            portion_size: "1 serving".to_string(),
            nutrition: Nutrition {
                calories: Some(285.0),
                protein: Some(12.0),
                carbs: Some(36.0),
                fat: None,
            },
            ai_insights: Some("Pair with a salad.".to_string()),
            top_k: vec![
                Prediction {
                    label: "pizza".to_string(),
                    confidence: Some(0.87),
                },
                Prediction {
                    label: "flatbread".to_string(),
                    confidence: None,
                },
            ],
        }
    }

    #[test]
    fn test_format_analysis() {
        let text = format_analysis(&result());

        assert!(text.contains("*Pizza*"));
        assert!(text.contains("87.0% confidence"));
        assert!(text.contains("Calories: 285 kcal"));
        assert!(text.contains("Protein:  12 g"));
        assert!(text.contains("Fat:      — g"));
        assert!(text.contains("Pair with a salad."));
        assert!(text.contains("Other possible dishes: Flatbread"));
        assert!(text.contains(DISCLAIMER));
    }

    #[test]
    fn test_single_prediction_has_no_alternatives() {
        let mut r = result();
        r.top_k.truncate(1);
        r.ai_insights = Some("  ".to_string());

        let text = format_analysis(&r);
        assert!(!text.contains("Other possible dishes"));
        assert!(!text.contains("💡"));
    }

    #[test]
    fn test_session_report_without_result() {
        let mut session = SessionState::default();
        session.image = Some(ChosenImage::new(vec![0; 1024 * 1024], "image/jpeg", ""));
        session.notice("Camera photo attached.");

        let text = format_session_report(&session);
        assert!(text.contains("Selected: camera.jpg"));
        assert!(text.contains("Size: 1.00 MB"));
        assert!(text.contains("Camera photo attached."));
        assert!(text.contains("Upload or capture a food image to begin."));
    }
}
