//! Terminal view
//!
//! Renders chat output to a terminal. The assistant block of the running
//! session is kept as a list of segments and redrawn in place whenever it
//! changes, the same way a page would mutate its DOM node. Earlier output
//! scrolls normally.

use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use crossterm::{cursor, queue, terminal};
use nlweb_core::{ChatView, NO_RESULTS_TEXT, ResultCard, Role, results_header};
use std::io::{self, Write};
use std::sync::Mutex;
use tracing::debug;
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Copy)]
pub struct TerminalTheme {
    pub text_base: Color,
    pub text_muted: Color,
    pub primary: Color,
    pub warning: Color,
    pub danger: Color,
    pub user_accent: Color,
    pub assistant_accent: Color,
}

impl TerminalTheme {
    pub fn default_dark() -> Self {
        Self {
            text_base: Color::Grey,
            text_muted: Color::DarkGrey,
            primary: Color::Cyan,
            warning: Color::Yellow,
            danger: Color::Red,
            user_accent: Color::Blue,
            assistant_accent: Color::Cyan,
        }
    }
}

impl Default for TerminalTheme {
    fn default() -> Self {
        Self::default_dark()
    }
}

/// One printed line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StyledLine {
    pub(crate) text: String,
    pub(crate) color: Color,
    pub(crate) bold: bool,
}

impl StyledLine {
    fn new(text: impl Into<String>, color: Color) -> Self {
        Self {
            text: strip_controls(&text.into()),
            color,
            bold: false,
        }
    }

    fn bold(mut self) -> Self {
        self.bold = true;
        self
    }
}

/// Service text must not move the cursor or recolor the terminal.
fn strip_controls(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\t')
        .map(|c| if c == '\t' { ' ' } else { c })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment {
    Sites(Vec<String>),
    ResultsHeader(usize),
    Card(ResultCard),
    Answer(String),
    NoResults,
    Error(String),
}

/// The in-progress assistant block.
#[derive(Debug, Default)]
pub(crate) struct Block {
    pub(crate) segments: Vec<Segment>,
    pub(crate) loading: bool,
    /// Leading rendered lines that scrolled out of reach and are no longer
    /// redrawn.
    frozen: usize,
    /// Terminal rows the redrawable tail occupied when last drawn.
    rows: usize,
}

impl Block {
    pub(crate) fn render(&self, theme: &TerminalTheme) -> Vec<StyledLine> {
        let mut lines = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Sites(sites) => lines.push(StyledLine::new(
                    format!("Searching: {}", sites.join(", ")),
                    theme.text_muted,
                )),
                Segment::ResultsHeader(count) => {
                    lines.push(StyledLine::new(results_header(*count), theme.primary).bold())
                }
                Segment::Card(card) => {
                    lines.push(StyledLine::new(format!("  • {}", card.title), theme.primary).bold());
                    lines.push(StyledLine::new(
                        format!("    {}", card.location()),
                        theme.text_muted,
                    ));
                    if !card.description.is_empty() {
                        lines.push(StyledLine::new(
                            format!("    {}", card.description),
                            theme.text_base,
                        ));
                    }
                }
                Segment::Answer(text) => {
                    for line in text.split('\n') {
                        lines.push(StyledLine::new(line, theme.assistant_accent));
                    }
                }
                Segment::NoResults => lines.push(StyledLine::new(NO_RESULTS_TEXT, theme.warning)),
                Segment::Error(message) => lines.push(
                    StyledLine::new(format!("Error: {}", message), theme.danger).bold(),
                ),
            }
        }
        if self.loading {
            lines.push(StyledLine::new("Thinking...", theme.text_muted));
        }
        lines
    }

    fn answer_mut(&mut self) -> Option<&mut String> {
        self.segments.iter_mut().find_map(|segment| match segment {
            Segment::Answer(text) => Some(text),
            _ => None,
        })
    }
}

fn line_rows(line: &StyledLine, width: usize) -> usize {
    line.text.width().div_ceil(width).max(1)
}

/// Rows `lines` take on a terminal `width` columns wide.
pub(crate) fn rows_for(lines: &[StyledLine], width: u16) -> usize {
    let width = usize::from(width.max(1));
    lines.iter().map(|line| line_rows(line, width)).sum()
}

struct ViewState {
    out: Box<dyn Write + Send>,
    block: Option<Block>,
    /// Fixed `(columns, rows)` for tests; `None` asks the terminal.
    size: Option<(u16, u16)>,
}

pub struct TerminalView {
    state: Mutex<ViewState>,
    theme: TerminalTheme,
}

impl TerminalView {
    pub fn stdout() -> Self {
        Self::with_writer(Box::new(io::stdout()), None)
    }

    pub(crate) fn with_writer(out: Box<dyn Write + Send>, size: Option<(u16, u16)>) -> Self {
        Self {
            state: Mutex::new(ViewState {
                out,
                block: None,
                size,
            }),
            theme: TerminalTheme::default(),
        }
    }

    fn with_state(&self, f: impl FnOnce(&mut ViewState, &TerminalTheme) -> io::Result<()>) {
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = f(&mut *state, &self.theme).and_then(|_| state.out.flush()) {
            debug!("Terminal write failed: {}", e);
        }
    }

    /// Mutate the open block and redraw it. Ignored when no block is open.
    fn update_block(&self, f: impl FnOnce(&mut Block)) {
        self.with_state(|state, theme| {
            let Some(block) = state.block.as_mut() else {
                return Ok(());
            };
            f(block);
            redraw(state, theme)
        });
    }

    /// Add to the open block, or print directly when replaying history.
    fn push_segment(&self, segment: Segment) {
        self.with_state(|state, theme| match state.block.as_mut() {
            Some(block) => {
                block.segments.push(segment);
                redraw(state, theme)
            }
            None => {
                let lines = Block {
                    segments: vec![segment],
                    ..Block::default()
                }
                .render(theme);
                write_lines(&mut state.out, &lines)
            }
        });
    }
}

fn write_lines<W: Write>(out: &mut W, lines: &[StyledLine]) -> io::Result<()> {
    for line in lines {
        queue!(out, SetForegroundColor(line.color))?;
        if line.bold {
            queue!(out, SetAttribute(Attribute::Bold))?;
        }
        queue!(
            out,
            Print(&line.text),
            SetAttribute(Attribute::Reset),
            ResetColor,
            Print("\r\n")
        )?;
    }
    Ok(())
}

/// Redraw the open block in place.
///
/// The cursor can only move back within the visible screen, so once the
/// block grows past it the leading lines are frozen and only the tail that
/// still fits is redrawn on later updates.
fn redraw(state: &mut ViewState, theme: &TerminalTheme) -> io::Result<()> {
    let (width, height) = state
        .size
        .or_else(|| terminal::size().ok())
        .unwrap_or((80, 24));
    let width = usize::from(width.max(1));
    // keep one row for the cursor line below the block
    let max_rows = usize::from(height.max(2)) - 1;
    let Some(block) = state.block.as_mut() else {
        return Ok(());
    };

    queue!(state.out, cursor::MoveToColumn(0))?;
    if block.rows > 0 {
        let rows = u16::try_from(block.rows).unwrap_or(u16::MAX);
        queue!(state.out, cursor::MoveToPreviousLine(rows))?;
    }
    queue!(state.out, terminal::Clear(terminal::ClearType::FromCursorDown))?;

    let lines = block.render(theme);
    block.frozen = block.frozen.min(lines.len());
    let tail = &lines[block.frozen..];
    write_lines(&mut state.out, tail)?;

    let mut rows: usize = tail.iter().map(|line| line_rows(line, width)).sum();
    let mut frozen = block.frozen;
    // the last line stays redrawable even when it alone overflows
    while rows > max_rows && frozen + 1 < lines.len() {
        rows -= line_rows(&lines[frozen], width);
        frozen += 1;
    }
    block.frozen = frozen;
    block.rows = rows;
    Ok(())
}

impl ChatView for TerminalView {
    fn append_message(&self, role: Role, content: &str) {
        self.with_state(|state, theme| {
            // Whatever was in progress stays where it is.
            state.block = None;
            let lines: Vec<StyledLine> = match role {
                Role::User => content
                    .split('\n')
                    .map(|line| StyledLine::new(format!("> {}", line), theme.user_accent).bold())
                    .collect(),
                Role::Assistant => content
                    .split('\n')
                    .map(|line| StyledLine::new(line, theme.assistant_accent))
                    .collect(),
            };
            write_lines(&mut state.out, &lines)
        });
    }

    fn begin_assistant_message(&self) {
        self.with_state(|state, theme| {
            state.block = Some(Block {
                loading: true,
                ..Block::default()
            });
            redraw(state, theme)
        });
    }

    fn stop_loading(&self) {
        self.update_block(|block| block.loading = false);
    }

    fn create_answer(&self) {
        self.update_block(|block| block.segments.push(Segment::Answer(String::new())));
    }

    fn update_answer(&self, text: &str) {
        self.update_block(|block| match block.answer_mut() {
            Some(answer) => *answer = text.to_string(),
            None => block.segments.push(Segment::Answer(text.to_string())),
        });
    }

    fn show_sites(&self, sites: &[String]) {
        self.push_segment(Segment::Sites(sites.to_vec()));
    }

    fn show_results_header(&self, count: usize) {
        self.push_segment(Segment::ResultsHeader(count));
    }

    fn append_result_card(&self, card: &ResultCard) {
        self.push_segment(Segment::Card(card.clone()));
    }

    fn show_no_results(&self) {
        self.push_segment(Segment::NoResults);
    }

    fn show_error(&self, message: &str) {
        self.update_block(|block| {
            block.loading = false;
            block.frozen = 0;
            block.segments = vec![Segment::Error(message.to_string())];
        });
    }

    fn clear(&self) {
        self.with_state(|state, _theme| {
            state.block = None;
            queue!(
                state.out,
                terminal::Clear(terminal::ClearType::All),
                cursor::MoveTo(0, 0)
            )
        });
    }
}
