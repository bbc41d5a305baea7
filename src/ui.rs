use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Clear, Paragraph},
};
use unicode_width::UnicodeWidthStr;

use crate::card::{CardContent, CardLine, LineKind};
use crate::filter_panel::PanelView;
use crate::model::{Model, UIData};

pub const HEADER_HEIGHT: usize = 2;
pub const CONTROLS_HEIGHT: usize = 1;
pub const SUMMARY_HEIGHT: usize = 2;
pub const STATUSLINE_HEIGHT: usize = 1;
// Panel border plus the select all / clear all line
pub const PANEL_CHROME_HEIGHT: usize = 3;
const PANEL_WIDTH: u16 = 48;

const SELECTED_COLOR: Color = Color::Yellow;
const HIGHLIGHT_COLOR: Color = Color::LightYellow;
const LINK_COLOR: Color = Color::Blue;
const LABEL_COLOR: Color = Color::Cyan;

// Status line width below which the key hints are dropped
const HINTS_MIN_WIDTH: usize = 60;

/// Display column of the char position `curser_pos` in `input`.
fn cursor_column(input: &str, curser_pos: usize) -> usize {
    let end = input
        .char_indices()
        .nth(curser_pos)
        .map(|(idx, _)| idx)
        .unwrap_or(input.len());
    input[..end].width()
}

fn hints_fit(status_message: &str, width: u16) -> bool {
    width as usize >= status_message.width() + HINTS_MIN_WIDTH
}

#[derive(Debug, Default)]
pub struct DirectoryUI {}

impl DirectoryUI {
    pub fn new() -> Self {
        Self {}
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let screen = frame.area();
        let [header, controls, summary, list, statusline] = Layout::vertical([
            Constraint::Length(HEADER_HEIGHT as u16),
            Constraint::Length(CONTROLS_HEIGHT as u16),
            Constraint::Length(SUMMARY_HEIGHT as u16),
            Constraint::Min(0),
            Constraint::Length(STATUSLINE_HEIGHT as u16),
        ])
        .areas(screen);

        Self::render_header(uidata, frame, header);
        Self::render_controls(uidata, frame, controls);
        Self::render_summary(uidata, frame, summary);
        if uidata.nresults == 0 {
            Self::render_empty(frame, list);
        } else {
            Self::render_cards(uidata, frame, list);
        }
        Self::render_statusline(uidata, frame, statusline);

        if let Some(panel) = &uidata.panel {
            Self::render_panel(panel, frame, list);
        }
        if uidata.show_popup {
            Self::render_popup(&uidata.popup_message, frame, screen);
        }
    }

    fn render_header(uidata: &UIData, frame: &mut Frame, area: Rect) {
        let text = Text::from(vec![
            Line::from(Span::from(uidata.title.clone()).bold()),
            Line::from(Span::from(uidata.subtitle.clone()).dim()),
        ]);
        frame.render_widget(Paragraph::new(text).centered(), area);
    }

    fn render_controls(uidata: &UIData, frame: &mut Frame, area: Rect) {
        let search_style = if uidata.active_search {
            Style::default().fg(SELECTED_COLOR)
        } else {
            Style::default()
        };
        let search_label = " Search: ";
        let search_value = if uidata.search.input.is_empty() && !uidata.active_search {
            Span::from("<all airlines>").dim()
        } else {
            Span::styled(uidata.search.input.clone(), search_style)
        };
        let nselected = uidata
            .panel
            .as_ref()
            .map(|p| p.title.clone())
            .unwrap_or_else(|| match &uidata.filter_summary {
                Some(_) => "Filter active".to_string(),
                None => "No filter".to_string(),
            });

        let line = Line::from(vec![
            search_label.bold(),
            search_value,
            "   Sort by: ".bold(),
            uidata.sort_label.into(),
            "   ".into(),
            nselected.into(),
        ]);
        frame.render_widget(Paragraph::new(line), area);

        if uidata.active_search {
            let x = area.x
                + search_label.width() as u16
                + cursor_column(&uidata.search.input, uidata.search.curser_pos) as u16;
            frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
        }
    }

    fn render_summary(uidata: &UIData, frame: &mut Frame, area: Rect) {
        let mut lines = vec![Line::from(format!(
            " Showing {} of {} airlines",
            uidata.nresults, uidata.ntotal
        ))];
        if let Some(fields) = &uidata.filter_summary {
            lines.push(Line::from(vec![
                " Filtered by: ".into(),
                Span::from(fields.clone()).fg(HIGHLIGHT_COLOR),
            ]));
        }
        frame.render_widget(Paragraph::new(lines), area);
    }

    fn render_empty(frame: &mut Frame, area: Rect) {
        let text = Text::from(vec![
            Line::from(""),
            Line::from("No airlines found".bold()),
            Line::from("Try adjusting your search or filters"),
        ]);
        frame.render_widget(Paragraph::new(text).centered(), area);
    }

    fn card_line(line: &CardLine) -> Line<'static> {
        let mut style = match line.kind {
            LineKind::Preview | LineKind::Value => Style::default(),
            LineKind::Link => Style::default()
                .fg(LINK_COLOR)
                .add_modifier(Modifier::UNDERLINED),
            LineKind::Heading => Style::default().add_modifier(Modifier::BOLD),
            LineKind::Label => Style::default().fg(LABEL_COLOR),
        };
        if line.highlighted {
            style = style.fg(HIGHLIGHT_COLOR);
        }
        Line::styled(line.text.clone(), style)
    }

    fn render_card(card: &CardContent, selected: bool, frame: &mut Frame, area: Rect) {
        let arrow = if card.expanded { "▲" } else { "▼" };
        let mut block = Block::bordered()
            .title(Line::from(format!(" {} ", card.name)).bold())
            .title(Line::from(format!(" {} {} ", card.badge(), arrow)).right_aligned());
        if selected {
            block = block
                .border_set(border::THICK)
                .border_style(Style::default().fg(SELECTED_COLOR));
        }

        let width = area.width.saturating_sub(2) as usize;
        let lines: Vec<Line> = card.lines(width).iter().map(Self::card_line).collect();
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_cards(uidata: &UIData, frame: &mut Frame, area: Rect) {
        let mut y = area.y;
        for (idx, card) in uidata.cards.iter().enumerate() {
            if y >= area.bottom() {
                break;
            }
            let height = (card.height(area.width as usize) as u16).min(area.bottom() - y);
            let rect = Rect::new(area.x, y, area.width, height);
            Self::render_card(card, uidata.selected_card == Some(idx), frame, rect);
            y += height;
        }
    }

    fn render_panel(panel: &PanelView, frame: &mut Frame, area: Rect) {
        let width = PANEL_WIDTH.min(area.width);
        let rect = Rect::new(area.right() - width, area.y, width, area.height);
        frame.render_widget(Clear, rect);

        let mut lines: Vec<Line> = panel
            .entries
            .iter()
            .map(|e| {
                let mark = if e.checked { "[x]" } else { "[ ]" };
                let mut line = Line::from(format!("{mark} {}", e.label));
                if e.checked {
                    line = line.fg(HIGHLIGHT_COLOR);
                }
                if e.under_curser {
                    line = line.add_modifier(Modifier::REVERSED);
                }
                line
            })
            .collect();
        lines.push(Line::from(vec![
            "a".bold().blue(),
            " Select All  ".into(),
            "c".bold().blue(),
            " Clear All".into(),
        ]));

        let block = Block::bordered()
            .title(Line::from(format!(" {} ", panel.title)).centered())
            .border_set(border::ROUNDED);
        frame.render_widget(Paragraph::new(lines).block(block), rect);
    }

    fn render_popup(message: &str, frame: &mut Frame, area: Rect) {
        let height = (message.lines().count() as u16 + 2).min(area.height);
        let widest = message.lines().map(|l| l.width()).max().unwrap_or(0);
        let width = (widest as u16 + 4).min(area.width);
        let rect = Rect::new(
            area.x + (area.width - width) / 2,
            area.y + (area.height - height) / 2,
            width,
            height,
        );
        frame.render_widget(Clear, rect);
        let block = Block::bordered()
            .title(Line::from(" Help ").centered())
            .title_bottom(Line::from(" Esc to close ").centered())
            .border_set(border::THICK);
        frame.render_widget(
            Paragraph::new(message.to_string())
                .alignment(Alignment::Left)
                .block(block),
            rect,
        );
    }

    fn render_statusline(uidata: &UIData, frame: &mut Frame, area: Rect) {
        let mut spans = vec![Span::from(format!(" {} ", uidata.status_message))];
        if hints_fit(&uidata.status_message, area.width) {
            spans.extend([
                "  /".blue().bold(),
                " search ".into(),
                "f".blue().bold(),
                " filter ".into(),
                "s".blue().bold(),
                " sort ".into(),
                "?".blue().bold(),
                " help ".into(),
                "q".blue().bold(),
                " quit".into(),
            ]);
        }
        frame.render_widget(Paragraph::new(Line::from(spans)).reversed(), area);
    }
}
