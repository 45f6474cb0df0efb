use std::fmt;

/// Identifier of the fixed "stop" entry at the top of the menu.
pub const NO_MUSIC_ID: &str = "no-music";
/// Label shown for the "stop" entry.
pub const NO_MUSIC_LABEL: &str = "None";
pub const IDLE_TOOLTIP: &str = "Not playing";

/// Two-state icon. The variant name doubles as the icon resource name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IconState {
    #[default]
    Off,
    On,
}

impl IconState {
    pub fn resource_name(self) -> &'static str {
        match self {
            IconState::Off => "off",
            IconState::On => "on",
        }
    }

    /// File name of the icon image, e.g. `off.png`.
    pub fn file_name(self) -> String {
        format!("{}.png", self.resource_name())
    }
}

impl fmt::Display for IconState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource_name())
    }
}

/// What a menu entry selects when clicked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selection {
    NoMusic,
    Playlist(String),
}

impl Selection {
    pub fn id(&self) -> &str {
        match self {
            Selection::NoMusic => NO_MUSIC_ID,
            Selection::Playlist(id) => id,
        }
    }
}

/// One line of the popup menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub selection: Selection,
    pub label: String,
    /// Rendered as a ticked check item when set.
    pub checked: bool,
}

/// Everything the tray needs to draw itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrayView {
    pub icon: IconState,
    pub tooltip: String,
    pub entries: Vec<MenuEntry>,
}

impl Default for TrayView {
    fn default() -> Self {
        Self {
            icon: IconState::Off,
            tooltip: IDLE_TOOLTIP.to_string(),
            entries: Vec::new(),
        }
    }
}

/// Inputs from the tray into the controller loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrayEvent {
    /// The status icon was activated (left click on hosts that do not open
    /// the menu themselves).
    IconClicked,
    /// A menu entry was clicked.
    Select(Selection),
    Quit,
}
