use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs},
};

use logbook_core::viewport::MatchSegment;

use crate::app::App;
use crate::keymap::Mode;
use crate::ui::Theme;

/// The fixed screen areas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Region {
    Workloads,
    Containers,
    Pager,
    StatusBar,
    Input,
}

#[derive(Clone, Copy, Debug)]
pub struct Regions {
    pub workloads: Rect,
    pub containers: Rect,
    pub pager: Rect,
    pub status: Rect,
    pub input: Rect,
}

impl Regions {
    pub fn get(&self, region: Region) -> Rect {
        match region {
            Region::Workloads => self.workloads,
            Region::Containers => self.containers,
            Region::Pager => self.pager,
            Region::StatusBar => self.status,
            Region::Input => self.input,
        }
    }
}

// Layout:
// [ workloads | container tabs ]
// [ workloads | pager          ]
// [ status bar                 ]
// [ input line                 ]
pub fn layout(area: Rect) -> Regions {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),    // Main area
            Constraint::Length(1), // Status bar
            Constraint::Length(1), // Input line
        ])
        .split(area);

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25), Constraint::Percentage(75)])
        .split(outer[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(main[1]);

    Regions {
        workloads: main[0],
        containers: right[0],
        pager: right[1],
        status: outer[1],
        input: outer[2],
    }
}

pub fn render(f: &mut Frame, app: &App, theme: &Theme) {
    let regions = layout(f.area());
    render_workloads(f, regions.get(Region::Workloads), app, theme);
    render_containers(f, regions.get(Region::Containers), app, theme);
    render_pager(f, regions.get(Region::Pager), app, theme);
    render_status_bar(f, regions.get(Region::StatusBar), app, theme);
    render_input(f, regions.get(Region::Input), app, theme);
}

fn render_workloads(f: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let items: Vec<ListItem> = app
        .workloads()
        .items()
        .iter()
        .map(|item| {
            let status = item.style;
            ListItem::new(Line::from(vec![
                Span::styled(theme.status_icon(status), theme.status_style(status)),
                Span::raw(" "),
                Span::styled(item.name.clone(), theme.text_style()),
                Span::styled(format!(" {}", status.label()), theme.text_muted_style()),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::RIGHT)
                .border_style(theme.subtle_border_style()),
        )
        .highlight_style(theme.selection_style());
    let mut state = ListState::default().with_selected(app.workloads().selected());
    f.render_stateful_widget(list, area, &mut state);
}

fn render_containers(f: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let containers = app.containers();
    if containers.is_empty() {
        return;
    }

    let titles: Vec<Line> = containers
        .items()
        .iter()
        .map(|item| Line::from(item.name.clone()))
        .collect();
    let mut tabs = Tabs::new(titles)
        .style(theme.tab_style(false))
        .highlight_style(theme.tab_style(true))
        .divider(Span::styled("|", theme.subtle_border_style()));
    if let Some(selected) = containers.selected() {
        tabs = tabs.select(selected);
    }
    f.render_widget(tabs, area);
}

fn render_pager(f: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let viewport = app.viewport();
    if viewport.is_empty() {
        let hint = if app.tail_target().is_some() {
            "waiting for log lines..."
        } else if app.workloads().is_empty() {
            "no workloads in this namespace"
        } else {
            "select a workload with Ctrl-N / Ctrl-P"
        };
        f.render_widget(Paragraph::new(hint).style(theme.text_muted_style()), area);
        return;
    }

    let lines: Vec<Line> = viewport
        .visible_rows()
        .into_iter()
        .map(|row| highlight_row(row.text, &row.matches, theme))
        .collect();
    let (x, _) = viewport.offset();
    let pager = Paragraph::new(lines)
        .style(theme.text_style())
        .scroll((0, x.min(u16::MAX as usize) as u16));
    f.render_widget(pager, area);
}

/// Split a row into plain and highlighted spans.
fn highlight_row<'a>(text: &'a str, matches: &[MatchSegment], theme: &Theme) -> Line<'a> {
    if matches.is_empty() {
        return Line::from(text);
    }

    let chars: Vec<char> = text.chars().collect();
    let mut spans = Vec::with_capacity(matches.len() * 2 + 1);
    let mut pos = 0;
    for segment in matches {
        let start = segment.start.clamp(pos, chars.len());
        let end = (segment.start + segment.len).clamp(start, chars.len());
        if start > pos {
            spans.push(Span::raw(chars[pos..start].iter().collect::<String>()));
        }
        spans.push(Span::styled(
            chars[start..end].iter().collect::<String>(),
            theme.match_style(segment.active),
        ));
        pos = end;
    }
    if pos < chars.len() {
        spans.push(Span::raw(chars[pos..].iter().collect::<String>()));
    }
    Line::from(spans)
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(6)])
        .split(area);

    let mode = app.mode();
    let mut spans = vec![
        Span::styled(format!(" {} ", mode.label()), theme.mode_style(mode)),
        Span::raw(" "),
        Span::styled(
            format!("{}/{}", app.context(), app.namespace()),
            theme.accent_style(),
        ),
        Span::raw(format!("  {} pods", app.workloads().len())),
    ];
    if let Some(target) = app.tail_target() {
        spans.push(Span::raw(format!(
            "  {}/{}",
            target.workload, target.container
        )));
    }
    if let Some(message) = app.message() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(message.to_string(), theme.warn_style()));
    }

    f.render_widget(
        Paragraph::new(Line::from(spans)).style(theme.bar_style()),
        chunks[0],
    );
    f.render_widget(
        Paragraph::new(format!("{:>4}% ", app.viewport().scroll_percent()))
            .style(theme.bar_style()),
        chunks[1],
    );
}

fn render_input(f: &mut Frame, area: Rect, app: &App, theme: &Theme) {
    if app.mode() == Mode::SearchInput {
        let input = app.input();
        let line = Line::from(vec![
            Span::styled("/", theme.title_style()),
            Span::styled(input.text(), theme.text_style()),
        ]);
        f.render_widget(Paragraph::new(line), area);

        let col = (1 + input.cursor_col()).min(area.width.saturating_sub(1) as usize) as u16;
        f.set_cursor_position((area.x + col, area.y));
        return;
    }

    let viewport = app.viewport();
    if viewport.keyword().is_empty() {
        return;
    }
    let position = match viewport.active_match() {
        Some(i) => format!("[{}/{}]", i + 1, viewport.match_count()),
        None => format!("[-/{}]", viewport.match_count()),
    };
    let line = Line::from(vec![
        Span::styled(format!("/{}", viewport.keyword()), theme.text_muted_style()),
        Span::raw("  "),
        Span::styled(position, theme.text_muted_style()),
    ]);
    f.render_widget(Paragraph::new(line), area);
}
