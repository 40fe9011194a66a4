use studio_core::{AppViewModel, AutosaveStatus, FetchRecord, OperationStatus};

const BAR_WIDTH: usize = 30;

/// Text lines for one frame of the wizard.
pub fn render(view: &AppViewModel) -> Vec<String> {
    let mut lines = Vec::new();
    lines.push(format!(
        "== {} | step {}/{}: {} ==",
        flow_label(view),
        view.step,
        view.total_steps,
        view.step_title
    ));

    for field in &view.fields {
        let value = if field.value.is_empty() {
            "(empty)".to_string()
        } else {
            single_line(&field.value, 60)
        };
        lines.push(format!("  {:<13} {}", field.name, value));
    }

    if let Some(status) = autosave_label(view.autosave) {
        lines.push(format!("  [{status}]"));
    }

    match &view.operation {
        OperationStatus::Idle => {}
        OperationStatus::Running { label, percent, .. } => {
            lines.push(format!("  {} {:>3}% {}", progress_bar(*percent), percent, label));
        }
        OperationStatus::Succeeded { message } => {
            lines.push(format!("  {} 100% done ({message})", progress_bar(100)));
        }
        OperationStatus::Failed { .. } => {
            lines.push(format!("  {}   0% failed", progress_bar(0)));
        }
    }

    if let Some(preview) = &view.output_preview {
        lines.push("  -- result --".to_string());
        lines.extend(preview.lines().map(|line| format!("  | {line}")));
        if view.placement_count > 0 {
            lines.push(format!("  {} CTA placement(s) inserted", view.placement_count));
        }
    }

    if let Some(notice) = &view.notice {
        lines.push(format!("  ! {notice}"));
    }

    if let Some(request) = view.confirmation {
        lines.push(format!("  ? {} (yes/no)", request.prompt()));
    } else {
        lines.push(format!("  > {}", hints(view)));
    }
    lines
}

pub fn render_history(history: &[FetchRecord]) -> Vec<String> {
    if history.is_empty() {
        return vec!["  No fetches yet.".to_string()];
    }
    history
        .iter()
        .map(|record| {
            format!(
                "  {}  last {} days, limit {}: {} returned, {} enriched, {} found",
                record.fetched_at.format("%Y-%m-%d %H:%M"),
                record.days_back,
                record.limit,
                record.returned,
                record.enriched,
                record.total_found
            )
        })
        .collect()
}

fn flow_label(view: &AppViewModel) -> &'static str {
    match view.flow {
        studio_core::FlowKind::CallReview => "Call review",
        studio_core::FlowKind::Playbook => "Playbook",
        studio_core::FlowKind::Cta => "CTA studio",
    }
}

fn autosave_label(status: AutosaveStatus) -> Option<&'static str> {
    match status {
        AutosaveStatus::Idle => None,
        AutosaveStatus::Saving => Some("saving..."),
        AutosaveStatus::Saved => Some("saved"),
    }
}

fn progress_bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100)) * BAR_WIDTH / 100;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

fn single_line(value: &str, max_chars: usize) -> String {
    let flat = value.replace('\n', " / ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars).collect();
    format!("{cut}...")
}

fn hints(view: &AppViewModel) -> String {
    let mut hints = vec!["set <field> <value>"];
    if view.step > 1 {
        hints.push("back");
    }
    if view.is_operation_step && !view.operation.is_running() {
        hints.push("run");
    }
    if view.is_last_step {
        hints.push("finish");
    } else if view.can_advance {
        hints.push("next");
    }
    hints.push("help");
    hints.join(" | ")
}

#[cfg(test)]
mod tests {
    use studio_core::{ConfirmationRequest, FieldView, FlowKind};

    use super::*;

    fn view() -> AppViewModel {
        AppViewModel {
            flow: FlowKind::Playbook,
            step: 3,
            total_steps: 4,
            step_title: "Generate",
            fields: vec![FieldView {
                name: "job_title".to_string(),
                value: "AE".to_string(),
            }],
            is_operation_step: true,
            ..AppViewModel::default()
        }
    }

    #[test]
    fn running_operation_shows_bar_and_label() {
        let mut view = view();
        view.operation = OperationStatus::Running {
            stage: 1,
            label: "Researching industry context".to_string(),
            percent: 50,
        };
        let lines = render(&view);
        assert_eq!(lines[0], "== Playbook | step 3/4: Generate ==");
        let half_bar = format!("[{}{}]", "#".repeat(15), ".".repeat(15));
        assert!(lines.iter().any(|l| l.contains(&half_bar)));
        assert!(lines.iter().any(|l| l.ends_with(" 50% Researching industry context")));
        assert!(!lines.last().unwrap().contains("run"));
    }

    #[test]
    fn confirmation_replaces_hints() {
        let mut view = view();
        view.confirmation = Some(ConfirmationRequest::StartOver);
        let last = render(&view).pop().unwrap();
        assert!(last.starts_with("  ? Start over?"), "{last}");
    }

    #[test]
    fn long_values_are_flattened() {
        assert_eq!(single_line("a\nb", 10), "a / b");
        assert_eq!(single_line("abcdef", 3), "abc...");
    }
}
