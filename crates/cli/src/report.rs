use colored::*;
use superres::FeatureState;
use superres_core::view::ViewState;
use superres_stem::UNCHECKED_MESSAGE;

/// True once the startup probe and any readiness check have produced a view.
///
/// `Unknown` carries the unchecked message only when no query is in flight;
/// the session's initial placeholder view has no message at all.
pub fn settled(view: &ViewState) -> bool {
    view.state.is_resolved() || view.status_message == UNCHECKED_MESSAGE
}

pub fn state_label(state: FeatureState) -> ColoredString {
    match state {
        FeatureState::Unknown => "unknown".dimmed(),
        FeatureState::NotSupported => "not supported".red(),
        FeatureState::ModelNotReady => "model not installed".yellow(),
        FeatureState::ModelDownloading => "downloading".cyan(),
        FeatureState::Ready => "ready".green(),
    }
}

fn yes_no(flag: bool) -> ColoredString {
    if flag {
        "yes".green()
    } else {
        "no".dimmed()
    }
}

/// Multi-line summary of a view, one field per line.
pub fn render(view: &ViewState) -> String {
    let mut lines = vec![
        format!("State:     {}", state_label(view.state)),
        format!("Message:   {}", view.status_message),
        format!("Supported: {}", yes_no(view.is_supported)),
        format!("Available: {}", yes_no(view.is_available)),
        format!("Scale:     {}x", view.scale),
    ];
    if view.is_downloading {
        lines.push(format!(
            "Progress:  {:.1}%",
            view.download_progress * 100.0
        ));
    }
    if view.show_download_prompt {
        lines.push(format!(
            "{}",
            "Run `superres download` to install the model.".yellow()
        ));
    }
    if view.engine_degraded {
        lines.push(format!(
            "{}",
            "AI engine unavailable; images will be resized without AI.".yellow()
        ));
    }
    lines.join("\n")
}

/// Size lines for `preview`, or a hint when there is nothing to show.
pub fn render_sizes(view: &ViewState, file_count: usize) -> String {
    if !view.show_size_descriptions {
        return if file_count > 1 {
            "Sizes are not shown for multiple files.".to_string()
        } else {
            "Enable AI super resolution to preview sizes.".to_string()
        };
    }
    let mut lines = vec![
        view.current_resolution_text.clone(),
        view.new_resolution_text.clone(),
    ];
    if view.show_gif_warning {
        lines.push(format!(
            "{}",
            "GIF files are resized as still images.".yellow()
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use superres_stem::CHECKING_MESSAGE;

    fn view(state: FeatureState, message: &str) -> ViewState {
        ViewState {
            state,
            status_message: message.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_settled() {
        assert!(!settled(&ViewState::default()));
        assert!(!settled(&view(FeatureState::Unknown, CHECKING_MESSAGE)));
        assert!(settled(&view(FeatureState::Unknown, UNCHECKED_MESSAGE)));
        assert!(settled(&view(FeatureState::NotSupported, "unsupported")));
        assert!(settled(&view(FeatureState::Ready, "")));
    }

    #[test]
    fn test_render_sizes() {
        colored::control::set_override(false);
        let mut v = view(FeatureState::Ready, "ok");
        v.show_size_descriptions = true;
        v.current_resolution_text = "Current size: 1920 × 1080".to_string();
        v.new_resolution_text = "New size: 3840 × 2160".to_string();
        assert_eq!(
            render_sizes(&v, 1),
            "Current size: 1920 × 1080\nNew size: 3840 × 2160"
        );

        v.show_size_descriptions = false;
        assert_eq!(render_sizes(&v, 2), "Sizes are not shown for multiple files.");
    }

    #[test]
    fn test_render_mentions_download() {
        colored::control::set_override(false);
        let mut v = view(FeatureState::ModelNotReady, "missing");
        v.show_download_prompt = true;
        let text = render(&v);
        assert!(text.contains("model not installed"));
        assert!(text.contains("superres download"));
    }
}
