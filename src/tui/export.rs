use anyhow::Result;
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;

use super::state::UiState;
use crate::simulation::DashboardView;

// Global clipboard manager channel - initialized once on first use
static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

/// Initialize the clipboard manager thread if not already initialized.
/// Each copy keeps its clipboard instance alive long enough for clipboard
/// managers on Linux to read the contents.
fn init_clipboard_manager() -> Result<&'static std_mpsc::Sender<String>> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();

        std::thread::spawn(move || {
            use arboard::Clipboard;

            for text in rx {
                if let Ok(mut clipboard) = Clipboard::new() {
                    if clipboard.set_text(&text).is_ok() {
                        std::thread::sleep(Duration::from_secs(2));
                    }
                }
            }
        });

        tx
    });

    CLIPBOARD_SENDER
        .get()
        .ok_or_else(|| anyhow::anyhow!("Failed to initialize clipboard manager"))
}

/// Queue `text` for the clipboard without blocking the UI loop.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let sender = init_clipboard_manager()?;
    sender
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("Clipboard manager channel closed"))?;
    Ok(())
}

/// Copy the most recent export path and report the result in the info line.
pub fn copy_export_path(view: &DashboardView, state: &mut UiState) {
    let Some(path) = view.last_export.as_ref() else {
        state.info = "Nothing exported yet (press e to export)".into();
        return;
    };
    let path = path.display().to_string();
    match copy_to_clipboard(&path) {
        Ok(()) => state.info = format!("Copied to clipboard: {path}"),
        Err(e) => state.info = format!("Clipboard copy failed: {e:#}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_without_export_explains_what_to_do() {
        let view = DashboardView::default();
        let mut state = UiState::default();
        copy_export_path(&view, &mut state);
        assert_eq!(state.info, "Nothing exported yet (press e to export)");
    }
}
