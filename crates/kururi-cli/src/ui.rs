use std::io::IsTerminal;
use std::sync::OnceLock;

use crate::cli::GlobalFlags;

#[derive(Clone, Copy, Debug)]
pub struct UiPrefs {
    /// Draw live progress bars (stderr is a terminal and not quiet).
    pub progress: bool,
    /// Print download notices on stderr.
    pub notices: bool,
}

static UI_PREFS: OnceLock<UiPrefs> = OnceLock::new();

pub fn init(flags: &GlobalFlags) {
    let is_tty = std::io::stderr().is_terminal();
    let _ = UI_PREFS.set(UiPrefs {
        progress: is_tty && !flags.quiet,
        notices: !flags.quiet,
    });
}

#[must_use]
pub fn prefs() -> UiPrefs {
    *UI_PREFS.get().unwrap_or(&UiPrefs {
        progress: false,
        notices: false,
    })
}
