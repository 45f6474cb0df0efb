/// StatusNotifierItem tray built on ksni.
///
/// The tray only renders the last `TrayView` it was given and turns clicks
/// into `TrayEvent`s. Icons are served by name from `icon_dir`, so the host
/// picks up `off.png` / `on.png` directly.
use std::path::PathBuf;

use ksni::menu::{CheckmarkItem, MenuItem, StandardItem};
use ksni::{ToolTip, TrayMethods};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tray_proto::protocol::{MenuEntry, TrayEvent, TrayView};

use crate::core::StatusView;

pub struct StatusTray {
    view: TrayView,
    icon_dir: PathBuf,
    events: mpsc::UnboundedSender<TrayEvent>,
}

impl StatusTray {
    pub fn new(icon_dir: PathBuf, events: mpsc::UnboundedSender<TrayEvent>) -> Self {
        Self {
            view: TrayView::default(),
            icon_dir,
            events,
        }
    }

    fn send(&self, event: TrayEvent) {
        if self.events.send(event).is_err() {
            debug!("tray: controller gone, dropping event");
        }
    }
}

/// The entry's selection is moved into its own click handler.
fn menu_item(entry: &MenuEntry) -> MenuItem<StatusTray> {
    let selection = entry.selection.clone();
    let activate = Box::new(move |tray: &mut StatusTray| {
        tray.send(TrayEvent::Select(selection.clone()));
    });

    if entry.checked {
        CheckmarkItem {
            label: entry.label.clone(),
            checked: true,
            activate,
            ..Default::default()
        }
        .into()
    } else {
        StandardItem {
            label: entry.label.clone(),
            activate,
            ..Default::default()
        }
        .into()
    }
}

impl ksni::Tray for StatusTray {
    // Left click opens the popup at the pointer.
    const MENU_ON_ACTIVATE: bool = true;

    fn id(&self) -> String {
        env!("CARGO_PKG_NAME").into()
    }

    fn title(&self) -> String {
        "Music".into()
    }

    fn icon_theme_path(&self) -> String {
        self.icon_dir.display().to_string()
    }

    fn icon_name(&self) -> String {
        self.view.icon.resource_name().into()
    }

    fn tool_tip(&self) -> ToolTip {
        ToolTip {
            title: self.view.tooltip.clone(),
            ..Default::default()
        }
    }

    fn activate(&mut self, _x: i32, _y: i32) {
        self.send(TrayEvent::IconClicked);
    }

    fn menu(&self) -> Vec<MenuItem<Self>> {
        let mut items: Vec<MenuItem<Self>> = self.view.entries.iter().map(menu_item).collect();
        items.push(MenuItem::Separator);
        items.push(
            StandardItem {
                label: "Quit".into(),
                icon_name: "application-exit".into(),
                activate: Box::new(|tray: &mut Self| tray.send(TrayEvent::Quit)),
                ..Default::default()
            }
            .into(),
        );
        items
    }
}

// ── bridge ────────────────────────────────────────────────────────────────────

/// `StatusView` half of the tray. Views are queued and applied to the ksni
/// service in order by the bridge task.
pub struct TrayBridge {
    tx: mpsc::UnboundedSender<TrayView>,
}

impl StatusView for TrayBridge {
    fn render(&mut self, view: &TrayView) {
        if self.tx.send(view.clone()).is_err() {
            warn!("tray: bridge task gone, view dropped");
        }
    }
}

/// Register the tray on the session bus and start the bridge task. The task
/// ends, and takes the tray down, once the returned `TrayBridge` is dropped.
pub async fn spawn(
    icon_dir: PathBuf,
    events: mpsc::UnboundedSender<TrayEvent>,
) -> anyhow::Result<(TrayBridge, tokio::task::JoinHandle<()>)> {
    let handle = StatusTray::new(icon_dir.clone(), events)
        .spawn()
        .await
        .map_err(|e| anyhow::anyhow!("failed to register tray icon: {}", e))?;
    info!(icon_dir = %icon_dir.display(), "tray icon registered");

    let (tx, mut rx) = mpsc::unbounded_channel::<TrayView>();
    let task = tokio::spawn(async move {
        while let Some(mut view) = rx.recv().await {
            // Only the newest queued view matters.
            while let Ok(newer) = rx.try_recv() {
                view = newer;
            }
            if handle
                .update(move |tray: &mut StatusTray| tray.view = view)
                .await
                .is_none()
            {
                warn!("tray: service stopped, no more updates");
                return;
            }
        }
        debug!("tray: shutting down");
        handle.shutdown().await;
    });

    Ok((TrayBridge { tx }, task))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ksni::Tray;
    use tray_proto::protocol::{IconState, Selection};

    fn tray_with(entries: Vec<MenuEntry>) -> (StatusTray, mpsc::UnboundedReceiver<TrayEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut tray = StatusTray::new(PathBuf::from("/usr/share/music-tray"), tx);
        tray.view = TrayView {
            icon: IconState::On,
            tooltip: "Playing Jazz FM".into(),
            entries,
        };
        (tray, rx)
    }

    fn entries() -> Vec<MenuEntry> {
        vec![
            MenuEntry {
                selection: Selection::NoMusic,
                label: "None".into(),
                checked: false,
            },
            MenuEntry {
                selection: Selection::Playlist("jazz".into()),
                label: "Jazz FM".into(),
                checked: true,
            },
            MenuEntry {
                selection: Selection::Playlist("rock".into()),
                label: "Rock FM".into(),
                checked: false,
            },
        ]
    }

    #[test]
    fn renders_icon_and_tooltip_from_view() {
        let (tray, _rx) = tray_with(entries());
        assert_eq!(tray.icon_name(), "on");
        assert_eq!(tray.icon_theme_path(), "/usr/share/music-tray");
        assert_eq!(tray.tool_tip().title, "Playing Jazz FM");
    }

    #[test]
    fn menu_marks_selected_entry_and_appends_quit() {
        let (mut tray, mut rx) = tray_with(entries());
        let items = tray.menu();
        assert_eq!(items.len(), 5);

        match &items[1] {
            MenuItem::Checkmark(item) => {
                assert_eq!(item.label, "Jazz FM");
                assert!(item.checked);
            }
            _ => panic!("selected entry should be a check item"),
        }
        assert!(matches!(items[3], MenuItem::Separator));

        match &items[2] {
            MenuItem::Standard(item) => {
                assert_eq!(item.label, "Rock FM");
                (item.activate)(&mut tray);
            }
            _ => panic!("unselected entry should be a plain item"),
        }
        assert_eq!(
            rx.try_recv().unwrap(),
            TrayEvent::Select(Selection::Playlist("rock".into()))
        );

        match &items[4] {
            MenuItem::Standard(item) => (item.activate)(&mut tray),
            _ => panic!("quit should be a plain item"),
        }
        assert_eq!(rx.try_recv().unwrap(), TrayEvent::Quit);
    }

    #[test]
    fn activation_is_forwarded() {
        let (mut tray, mut rx) = tray_with(Vec::new());
        tray.activate(10, 10);
        assert_eq!(rx.try_recv().unwrap(), TrayEvent::IconClicked);
    }
}
