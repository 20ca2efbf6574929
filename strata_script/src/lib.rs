//! Strata scenario scripts.
//!
//! This library provides the JSON format used to drive Strata's stacking
//! engine from a recorded or hand-written sequence of window events.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
#[cfg(feature = "smithay")]
use smithay::utils::{Logical, Rectangle};

/// Complete scenario file.
#[derive(Deserialize, Serialize, Debug, Default)]
pub struct Scenario {
    /// Engine configuration, passed through untouched.
    #[serde(default)]
    pub config: Value,

    /// Outputs available for the entire scenario.
    #[serde(default)]
    pub outputs: Vec<OutputSpec>,

    /// Window events in dispatch order.
    #[serde(default)]
    pub events: Vec<TimedEvent>,
}

impl Scenario {
    /// Parse a scenario from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self, Box<dyn Error>> {
        let mut scenario: Self = serde_json::from_str(json)?;

        // Events are applied in timestamp order, ties keep their file order.
        scenario.events.sort_by_key(|event| event.at);

        Ok(scenario)
    }

    /// Load a scenario file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn Error>> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Output description.
#[derive(Deserialize, Serialize, PartialEq, Eq, Clone, Debug)]
pub struct OutputSpec {
    pub name: String,
    #[serde(flatten)]
    pub geometry: Geometry,
}

/// Logical rectangle.
#[derive(Deserialize, Serialize, PartialEq, Eq, Copy, Clone, Default, Debug)]
pub struct Geometry {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

#[cfg(feature = "smithay")]
impl Geometry {
    /// Convert to a Smithay rectangle.
    pub fn rectangle(&self) -> Rectangle<i32, Logical> {
        Rectangle { loc: (self.x, self.y).into(), size: (self.width, self.height).into() }
    }
}

/// Event with its dispatch time.
#[derive(Deserialize, Serialize, Debug)]
pub struct TimedEvent {
    /// Milliseconds since scenario start.
    #[serde(default)]
    pub at: u64,

    #[serde(flatten)]
    pub event: ScriptEvent,
}

/// Window management event.
///
/// Windows are referenced by the name given to them on creation.
#[derive(Deserialize, Serialize, Debug)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ScriptEvent {
    /// Create a new window; it is not stacked until shown.
    Create(WindowSpec),
    /// Map a window.
    Show { window: String },
    /// Unmap a window without destroying it.
    Hide { window: String },
    /// Destroy a window.
    Destroy { window: String },
    Raise { window: String },
    Lower { window: String },
    RaiseOrLower { window: String },
    Restack {
        window: String,
        under: String,
        #[serde(default)]
        force: bool,
    },
    RestackUnderActive { window: String },
    /// Pointer entered a window, arming its auto-raise timer.
    Hover { window: String },
    Activate { window: String },
    /// Activation was requested but not yet confirmed.
    RequestFocus { window: String },
    KeepAbove { window: String, enabled: bool },
    KeepBelow { window: String, enabled: bool },
    Fullscreen { window: String, enabled: bool },
    SetLead {
        window: String,
        lead: Option<String>,
        #[serde(default)]
        annexed: bool,
    },
    Move { window: String, geometry: Geometry },
    SetDesktop { window: String, desktop: Option<u32> },
    SwitchDesktop { desktop: u32 },
    ShowDesktop { enabled: bool },
}

/// Initial window attributes.
#[derive(Deserialize, Serialize, Debug)]
pub struct WindowSpec {
    pub name: String,
    #[serde(default)]
    pub kind: WindowKind,
    /// Owning application.
    #[serde(default)]
    pub client: u32,
    /// Window group, if any.
    pub group: Option<u32>,
    /// Virtual desktop, `None` places the window on all desktops.
    #[serde(default = "default_desktop")]
    pub desktop: Option<u32>,
    #[serde(default)]
    pub geometry: Geometry,
    #[serde(default = "default_true")]
    pub accepts_focus: bool,
    #[serde(default)]
    pub keep_above: bool,
    #[serde(default)]
    pub keep_below: bool,
    #[serde(default)]
    pub fullscreen: bool,
    /// Map the window immediately.
    #[serde(default = "default_true")]
    pub show: bool,
}

fn default_desktop() -> Option<u32> {
    Some(1)
}

fn default_true() -> bool {
    true
}

/// Window type.
#[derive(Deserialize, Serialize, PartialEq, Eq, Copy, Clone, Default, Debug)]
#[serde(rename_all = "kebab-case")]
pub enum WindowKind {
    /// Regular application window.
    #[default]
    Normal,
    Dialog,
    Utility,
    Menu,
    Toolbar,
    /// Desktop background window.
    Desktop,
    /// Panels and similar reserved-space windows.
    Dock,
    Splash,
    Popup,
    Notification,
    CriticalNotification,
    /// Volume or brightness feedback and similar.
    OnScreenDisplay,
    AppletPopup,
    /// Override-redirect window without any window management.
    Unmanaged,
    /// Compositor-internal window.
    Internal,
    LockScreen,
}

impl FromStr for WindowKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "dialog" => Ok(Self::Dialog),
            "utility" => Ok(Self::Utility),
            "menu" => Ok(Self::Menu),
            "toolbar" => Ok(Self::Toolbar),
            "desktop" => Ok(Self::Desktop),
            "dock" => Ok(Self::Dock),
            "splash" => Ok(Self::Splash),
            "popup" => Ok(Self::Popup),
            "notification" => Ok(Self::Notification),
            "critical-notification" => Ok(Self::CriticalNotification),
            "on-screen-display" => Ok(Self::OnScreenDisplay),
            "applet-popup" => Ok(Self::AppletPopup),
            "unmanaged" => Ok(Self::Unmanaged),
            "internal" => Ok(Self::Internal),
            "lock-screen" => Ok(Self::LockScreen),
            _ => Err(format!("Got {s:?}, expected a window kind like normal, dialog, or dock")),
        }
    }
}

impl Display for WindowKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Normal => "normal",
            Self::Dialog => "dialog",
            Self::Utility => "utility",
            Self::Menu => "menu",
            Self::Toolbar => "toolbar",
            Self::Desktop => "desktop",
            Self::Dock => "dock",
            Self::Splash => "splash",
            Self::Popup => "popup",
            Self::Notification => "notification",
            Self::CriticalNotification => "critical-notification",
            Self::OnScreenDisplay => "on-screen-display",
            Self::AppletPopup => "applet-popup",
            Self::Unmanaged => "unmanaged",
            Self::Internal => "internal",
            Self::LockScreen => "lock-screen",
        };
        f.write_str(name)
    }
}
