//! What happens when the user taps a button on the shield screen.
//!
//! The shield itself cannot unlock anything. The primary button posts a
//! notification that deep-links back into the app, where the quiz lives.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Button pressed on the shield screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShieldAction {
    Primary,
    Secondary,
}

/// What the shield should do after handling an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShieldActionResponse {
    /// Dismiss the shielded app.
    Close,
    /// Keep the shield up and let the system decide.
    Defer,
}

/// What the shielded target was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShieldedTarget {
    Application,
    WebDomain,
    Category,
}

/// A local notification request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub deep_link: Option<String>,
    /// Delay before delivery, in seconds.
    pub delay_secs: u64,
}

impl Notification {
    /// "Open MindMunch" prompt posted from the shield.
    pub fn open_app() -> Self {
        Self {
            title: "Open MindMunch".into(),
            body: "Tap to open the app.".into(),
            deep_link: Some("mindmunchapp://".into()),
            delay_secs: 1,
        }
    }
}

/// Local notification collaborator.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<(), String>;
}

/// Text and colours shown on the shield screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShieldAppearance {
    pub title: String,
    pub subtitle: String,
    pub primary_button: String,
    /// "#RRGGBB"
    pub background_color: String,
}

impl ShieldAppearance {
    /// Background colour as RGB components. Falls back to black on a
    /// malformed hex string.
    pub fn background_rgb(&self) -> (u8, u8, u8) {
        let hex = self.background_color.trim().trim_start_matches('#');
        let rgb = u32::from_str_radix(hex, 16).unwrap_or(0);
        (
            ((rgb >> 16) & 0xFF) as u8,
            ((rgb >> 8) & 0xFF) as u8,
            (rgb & 0xFF) as u8,
        )
    }
}

/// Handle a shield button press.
///
/// Applications answer `Defer` on the secondary button; web domains and
/// categories have a single button and always post the prompt.
pub fn handle_shield_action(
    action: ShieldAction,
    target: ShieldedTarget,
    notifier: &dyn Notifier,
) -> ShieldActionResponse {
    if target == ShieldedTarget::Application && action == ShieldAction::Secondary {
        return ShieldActionResponse::Defer;
    }
    if let Err(e) = notifier.notify(Notification::open_app()) {
        warn!(error = %e, "failed to post open-app notification");
    }
    ShieldActionResponse::Close
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Notification>>);

    impl Notifier for Recorder {
        fn notify(&self, notification: Notification) -> Result<(), String> {
            self.0.lock().unwrap().push(notification);
            Ok(())
        }
    }

    #[test]
    fn primary_button_posts_prompt_and_closes() {
        let recorder = Recorder::default();
        let response =
            handle_shield_action(ShieldAction::Primary, ShieldedTarget::Application, &recorder);
        assert_eq!(response, ShieldActionResponse::Close);
        let sent = recorder.0.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].deep_link.as_deref(), Some("mindmunchapp://"));
    }

    #[test]
    fn secondary_button_defers_for_apps_only() {
        let recorder = Recorder::default();
        assert_eq!(
            handle_shield_action(ShieldAction::Secondary, ShieldedTarget::Application, &recorder),
            ShieldActionResponse::Defer
        );
        assert_eq!(
            handle_shield_action(ShieldAction::Secondary, ShieldedTarget::WebDomain, &recorder),
            ShieldActionResponse::Close
        );
        assert_eq!(recorder.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn background_colour_parses_hex() {
        let appearance = crate::storage::Config::default().shield_appearance();
        assert_eq!(appearance.background_rgb(), (0x05, 0x11, 0x23));
    }
}
