use async_trait::async_trait;
use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use std::io::Write;
use teletype_common::{
    error::Result,
    traits::TerminalFrontend,
    types::{Size, TerminalSnapshot},
};
use tracing::debug;

const PROMPT_COLOR: Color = Color::Rgb {
    r: 0x84,
    g: 0xcc,
    b: 0x16,
};
const PROMPT: &str = "$ ";
const CARET: char = '_';

/// Rows taken by a panel besides its command rows: title bar and a gap.
const PANEL_CHROME: u16 = 2;

struct Panel {
    title: String,
    top: u16,
    rows: u16,
    last: Option<TerminalSnapshot>,
}

/// Paints terminals as stacked panels on a crossterm screen
pub struct CrosstermFrontend<W: Write + Send> {
    out: W,
    panels: Vec<Panel>,
    size: Size,
}

impl<W: Write + Send> CrosstermFrontend<W> {
    /// `panels` gives each panel's title and the number of commands it
    /// will type.
    pub fn new(out: W, size: Size, panels: &[(String, usize)]) -> Self {
        let mut top = 0u16;
        let panels = panels
            .iter()
            .map(|(title, commands)| {
                let rows = u16::try_from(*commands).unwrap_or(u16::MAX).max(1);
                let panel = Panel {
                    title: title.clone(),
                    top,
                    rows,
                    last: None,
                };
                top = top.saturating_add(rows.saturating_add(PANEL_CHROME));
                panel
            })
            .collect();
        Self { out, panels, size }
    }

    fn draw_panel(&mut self, index: usize) -> Result<()> {
        let Some(panel) = self.panels.get(index) else {
            return Ok(());
        };
        if panel.top >= self.size.rows {
            return Ok(());
        }
        let width = self.size.cols as usize;

        queue!(
            self.out,
            MoveTo(0, panel.top),
            Clear(ClearType::CurrentLine),
            SetForegroundColor(Color::Red),
            Print("● "),
            SetForegroundColor(Color::Yellow),
            Print("● "),
            SetForegroundColor(Color::Green),
            Print("● "),
            SetForegroundColor(Color::DarkGrey),
            Print(clip(&panel.title, width.saturating_sub(6))),
        )?;

        let Some(snapshot) = panel.last.as_ref() else {
            return Ok(());
        };
        let text_width = width.saturating_sub(PROMPT.len() + 1);
        let rows = (panel.rows as usize).max(snapshot.visible_rows());

        for row in 0..rows {
            let y = panel.top as usize + 1 + row;
            if y >= self.size.rows as usize {
                break;
            }
            queue!(self.out, MoveTo(0, y as u16), Clear(ClearType::CurrentLine))?;
            if row >= snapshot.visible_rows() {
                continue;
            }
            queue!(
                self.out,
                SetForegroundColor(PROMPT_COLOR),
                Print(PROMPT),
                Print(clip(snapshot.line(row), text_width)),
            )?;
            if row == snapshot.caret_row && snapshot.caret_visible {
                queue!(self.out, Print(CARET))?;
            }
        }
        queue!(self.out, ResetColor)?;
        Ok(())
    }
}

#[async_trait]
impl<W: Write + Send> TerminalFrontend for CrosstermFrontend<W> {
    async fn update(&mut self, panel: usize, snapshot: &TerminalSnapshot) -> Result<()> {
        if let Some(slot) = self.panels.get_mut(panel) {
            slot.last = Some(snapshot.clone());
        }
        self.draw_panel(panel)
    }

    async fn resize(&mut self, size: Size) -> Result<()> {
        debug!("Repainting for size {:?}", size);
        self.size = size;
        queue!(self.out, Clear(ClearType::All))?;
        for index in 0..self.panels.len() {
            self.draw_panel(index)?;
        }
        Ok(())
    }

    async fn refresh(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

fn clip(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}
