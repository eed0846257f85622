//! In-memory screen switching.
//!
//! Only the admin panel is addressed by path; storefront screens are an enum
//! held by the session.

use serde::{Deserialize, Serialize};

use crate::admin::AdminTab;

pub const ADMIN_PATH: &str = "/admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    Storefront,
    Admin,
}

/// Pick the surface for the path the webview was opened on.
pub fn route_for_path(path: &str) -> Surface {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    if path == ADMIN_PATH {
        Surface::Admin
    } else {
        Surface::Storefront
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "screen", rename_all = "lowercase")]
pub enum Screen {
    #[default]
    Home,
    Cart,
    Confirmation {
        #[serde(rename = "orderId", alias = "order_id")]
        order_id: String,
    },
    Tracking,
}

impl Screen {
    pub fn name(&self) -> &'static str {
        match self {
            Screen::Home => "home",
            Screen::Cart => "cart",
            Screen::Confirmation { .. } => "confirmation",
            Screen::Tracking => "tracking",
        }
    }
}

/// What changed when moving between screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingTransition {
    Start,
    Stop,
    Unchanged,
}

#[derive(Debug, Clone, Default)]
pub struct Navigator {
    screen: Screen,
    admin_tab: AdminTab,
}

impl Navigator {
    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn admin_tab(&self) -> AdminTab {
        self.admin_tab
    }

    pub fn set_admin_tab(&mut self, tab: AdminTab) {
        self.admin_tab = tab;
    }

    /// Switch screens and report whether the tracking poller should start
    /// or stop.
    pub fn go(&mut self, next: Screen) -> TrackingTransition {
        let was_tracking = self.screen == Screen::Tracking;
        let is_tracking = next == Screen::Tracking;
        self.screen = next;
        match (was_tracking, is_tracking) {
            (false, true) => TrackingTransition::Start,
            (true, false) => TrackingTransition::Stop,
            _ => TrackingTransition::Unchanged,
        }
    }
}
