// Status bar registry: a fixed set of widgets keyed by `WidgetId`.
//
// Widgets are created on first access through the registry's factory and
// rendered left to right in `WidgetId::ALL` order.

use std::collections::BTreeMap;
use std::fmt;

use daybook_common::settings::Settings;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WidgetId {
    WordCount,
    AutoCommit,
    AutoSync,
    Git,
}

impl WidgetId {
    pub const ALL: [WidgetId; 4] =
        [WidgetId::WordCount, WidgetId::AutoCommit, WidgetId::AutoSync, WidgetId::Git];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WordCount => "wordCount",
            Self::AutoCommit => "autoCommit",
            Self::AutoSync => "autoSync",
            Self::Git => "git",
        }
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Widget {
    pub id: WidgetId,
    pub content: String,
    pub visible: bool,
}

impl Widget {
    /// A visible widget showing its own name until updated.
    pub fn placeholder(id: WidgetId) -> Self {
        Self { id, content: format!("Widget: {id}"), visible: true }
    }
}

type WidgetFactory = Box<dyn Fn(WidgetId) -> Widget + Send + Sync>;

pub struct StatusBar {
    widgets: BTreeMap<WidgetId, Widget>,
    factory: WidgetFactory,
}

impl Default for StatusBar {
    fn default() -> Self {
        Self::with_factory(Widget::placeholder)
    }
}

impl StatusBar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_factory(factory: impl Fn(WidgetId) -> Widget + Send + Sync + 'static) -> Self {
        Self { widgets: BTreeMap::new(), factory: Box::new(factory) }
    }

    /// The widget for `id`, created through the factory on first access.
    pub fn widget(&mut self, id: WidgetId) -> &mut Widget {
        let factory = &self.factory;
        self.widgets.entry(id).or_insert_with(|| factory(id))
    }

    pub fn get(&self, id: WidgetId) -> Option<&Widget> {
        self.widgets.get(&id)
    }

    pub fn update(&mut self, id: WidgetId, content: impl Into<String>) {
        self.widget(id).content = content.into();
    }

    pub fn show(&mut self, id: WidgetId) {
        self.widget(id).visible = true;
    }

    pub fn hide(&mut self, id: WidgetId) {
        self.widget(id).visible = false;
    }

    pub fn remove(&mut self, id: WidgetId) -> bool {
        self.widgets.remove(&id).is_some()
    }

    pub fn dispose_all(&mut self) {
        self.widgets.clear();
    }

    /// Visible widgets in display order.
    pub fn visible(&self) -> Vec<&Widget> {
        self.widgets.values().filter(|w| w.visible).collect()
    }

    /// Visible widget contents joined for a one-line display.
    pub fn render(&self) -> String {
        self.visible().iter().map(|w| w.content.as_str()).collect::<Vec<_>>().join("  |  ")
    }

    /// Bring every widget in line with `settings` and the current word count.
    pub fn refresh(&mut self, settings: &Settings, words: Option<usize>) {
        match words {
            Some(n) => {
                self.update(WidgetId::WordCount, format!("Words: {n}"));
                self.show(WidgetId::WordCount);
            }
            None => self.hide(WidgetId::WordCount),
        }

        self.update(WidgetId::Git, format!("Git: {}", on_off(settings.enable_git)));

        if settings.enable_git {
            let auto_commit = if settings.auto_commit {
                format!("Auto commit: on ({}m)", settings.auto_commit_interval)
            } else {
                "Auto commit: off".to_string()
            };
            self.update(WidgetId::AutoCommit, auto_commit);
            self.update(WidgetId::AutoSync, format!("Auto sync: {}", on_off(settings.auto_sync)));
            self.show(WidgetId::AutoCommit);
            self.show(WidgetId::AutoSync);
        } else {
            self.hide(WidgetId::AutoCommit);
            self.hide(WidgetId::AutoSync);
        }
    }
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
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn factory_runs_once_per_widget() {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = created.clone();
        let mut bar = StatusBar::with_factory(move |id| {
            counter.fetch_add(1, Ordering::SeqCst);
            Widget::placeholder(id)
        });

        bar.widget(WidgetId::Git);
        bar.update(WidgetId::Git, "Git: on");
        bar.hide(WidgetId::Git);
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(bar.get(WidgetId::Git).unwrap().content, "Git: on");
        assert!(bar.get(WidgetId::AutoSync).is_none());
    }

    #[test]
    fn render_uses_fixed_order_and_skips_hidden() {
        let mut bar = StatusBar::new();
        bar.update(WidgetId::Git, "Git: on");
        bar.update(WidgetId::WordCount, "Words: 3");
        bar.update(WidgetId::AutoSync, "Auto sync: off");
        bar.hide(WidgetId::AutoSync);

        assert_eq!(bar.render(), "Words: 3  |  Git: on");
    }

    #[test]
    fn remove_and_dispose() {
        let mut bar = StatusBar::new();
        bar.widget(WidgetId::WordCount);
        bar.widget(WidgetId::Git);
        assert!(bar.remove(WidgetId::Git));
        assert!(!bar.remove(WidgetId::Git));

        bar.dispose_all();
        assert!(bar.visible().is_empty());
    }

    #[test]
    fn refresh_hides_git_widgets_when_disabled() {
        let mut bar = StatusBar::new();
        let mut settings = Settings { enable_git: true, auto_commit: true, ..Settings::default() };
        bar.refresh(&settings, Some(12));
        assert_eq!(
            bar.render(),
            "Words: 12  |  Auto commit: on (10m)  |  Auto sync: off  |  Git: on"
        );

        settings.enable_git = false;
        bar.refresh(&settings, None);
        assert_eq!(bar.render(), "Git: off");
    }
}
