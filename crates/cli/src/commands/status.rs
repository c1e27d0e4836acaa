// `daybook status`: settings, timer state and the status bar.

use daybook_daemon::runtime::StatusReport;

use super::Session;
use crate::output;

pub fn run(session: &Session) -> anyhow::Result<()> {
    let report = session.daybook.status();
    output::print_output(session.format, &report, format_human)?;
    Ok(())
}

fn format_human(report: &StatusReport) -> String {
    let settings = &report.settings;
    let mut lines = Vec::new();

    match settings.notebook_path() {
        Some(path) => lines.push(format!("{} ({})", settings.notebook_name, path.display())),
        None => lines.push("No notebook configured. Run: daybook setup <PATH>".to_string()),
    }

    lines.push(format!("  Git: {}", on_off(settings.enable_git)));
    if settings.enable_git {
        lines.push(format!(
            "  Auto commit: {} (every {} minutes)",
            on_off(settings.auto_commit),
            settings.auto_commit_interval
        ));
        lines.push(format!("  Auto sync: {}", on_off(settings.auto_sync)));
        lines.push(format!("  Commit message: {}", settings.commit_message));
    }

    if !report.status_bar.is_empty() {
        lines.push(String::new());
        lines.push(
            report.status_bar.iter().map(|w| w.content.as_str()).collect::<Vec<_>>().join("  |  "),
        );
    }

    lines.join("\n")
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daybook_common::settings::Settings;
    use daybook_daemon::runtime::LifecycleState;
    use daybook_daemon::status_bar::{Widget, WidgetId};

    fn report(settings: Settings, status_bar: Vec<Widget>) -> StatusReport {
        StatusReport {
            state: LifecycleState::New,
            notebook_configured: settings.notebook_path().is_some(),
            settings,
            auto_commit_active: false,
            status_bar,
        }
    }

    #[test]
    fn unconfigured_notebook_suggests_setup() {
        let text = format_human(&report(Settings::default(), Vec::new()));
        assert!(text.starts_with("No notebook configured"));
        assert!(text.contains("Git: off"));
        assert!(!text.contains("Auto commit"));
    }

    #[test]
    fn git_settings_and_widgets_are_listed() {
        let settings = Settings {
            notebook_path: Some("/home/me/notes".into()),
            enable_git: true,
            auto_commit: true,
            auto_commit_interval: 5,
            ..Settings::default()
        };
        let widgets = vec![
            Widget { id: WidgetId::WordCount, content: "Words: 7".into(), visible: true },
            Widget { id: WidgetId::Git, content: "Git: on".into(), visible: true },
        ];
        let text = format_human(&report(settings, widgets));

        assert!(text.starts_with("notebook (/home/me/notes)"));
        assert!(text.contains("Auto commit: on (every 5 minutes)"));
        assert!(text.ends_with("Words: 7  |  Git: on"));
    }
}
