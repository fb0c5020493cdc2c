use std::{io, panic};

use crossterm::{
    cursor, execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

pub type Term = Terminal<CrosstermBackend<io::Stdout>>;

/// Raw mode on the alternate screen. A panic puts the terminal back before
/// the message is printed.
pub fn setup_terminal() -> io::Result<Term> {
    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen, cursor::Hide)?;

    let report = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let _ = leave_screen();
        report(info);
    }));

    Terminal::new(CrosstermBackend::new(io::stdout()))
}

pub fn restore_terminal(terminal: &mut Term) -> io::Result<()> {
    leave_screen()?;
    terminal.show_cursor()
}

fn leave_screen() -> io::Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, cursor::Show)
}
