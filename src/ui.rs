use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Position, Rect},
    style::{Style, Stylize},
    text::{Line, Span},
    widgets::{
        Block, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState, Wrap,
    },
};
use std::time::Duration;

use crate::inventory::{InventoryView, LOADING_TEXT, NO_DATA_TEXT, TableBody};
use crate::model::{Modus, Model, ViewKind};
use crate::record::DISPLAY_COLUMNS;

pub const TITLE_HEIGHT: u16 = 1;
pub const STATUSLINE_HEIGHT: u16 = 1;
pub const SEARCH_HEIGHT: u16 = 3;
pub const TABLE_HEADER_HEIGHT: u16 = 1;
/// Lines around the table body: title, statusline, search box, table borders and header.
pub const TABLE_CHROME_HEIGHT: usize =
    (TITLE_HEIGHT + STATUSLINE_HEIGHT + SEARCH_HEIGHT + 2 + TABLE_HEADER_HEIGHT) as usize;
pub const DRAWER_WIDTH: u16 = 24;
pub const EXPORT_BUTTON_WIDTH: u16 = 21;
const STATUS_MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);
const COLUMN_WIDTHS: [Constraint; 6] = [
    Constraint::Fill(3),
    Constraint::Fill(1),
    Constraint::Fill(1),
    Constraint::Fill(1),
    Constraint::Fill(2),
    Constraint::Fill(2),
];

pub fn draw(model: &Model, frame: &mut Frame) {
    let [title_area, body_area, status_area] = Layout::vertical([
        Constraint::Length(TITLE_HEIGHT),
        Constraint::Min(0),
        Constraint::Length(STATUSLINE_HEIGHT),
    ])
    .areas(frame.area());

    render_title(frame, title_area);

    let main_area = if model.drawer_open() {
        let [drawer_area, main_area] =
            Layout::horizontal([Constraint::Length(DRAWER_WIDTH), Constraint::Min(0)])
                .areas(body_area);
        render_drawer(model, frame, drawer_area);
        main_area
    } else {
        body_area
    };

    match model.selected_view() {
        ViewKind::Inventory => {
            if let Some(view) = model.inventory() {
                render_inventory(model, view, frame, main_area);
            }
        }
        ViewKind::Kubernetes => render_placeholder(frame, main_area),
    }

    render_statusline(model, frame, status_area);

    if let Some(view) = model.inventory()
        && view.detail_visible()
    {
        render_detail(view, frame);
    }
    if let Some(message) = model.popup_message() {
        render_popup(message, frame);
    }
}

fn render_title(frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![" ≡ ".bold(), "Dashboard".bold()]);
    frame.render_widget(Paragraph::new(title).style(Style::new().reversed()), area);
}

fn render_drawer(model: &Model, frame: &mut Frame, area: Rect) {
    let items: Vec<ListItem> = ViewKind::ALL
        .iter()
        .map(|v| ListItem::new(v.title()))
        .collect();
    let selected = ViewKind::ALL
        .iter()
        .position(|v| *v == model.selected_view());
    let list = List::new(items)
        .block(Block::bordered())
        .highlight_style(Style::new().bold().reversed())
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(selected);
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_placeholder(frame: &mut Frame, area: Rect) {
    let block = Block::bordered().title(Line::from(" Kubernetes Data ".bold()).centered());
    let text = Paragraph::new("Kubernetes data view will be implemented here.")
        .centered()
        .block(block);
    frame.render_widget(text, area);
}

fn render_inventory(model: &Model, view: &InventoryView, frame: &mut Frame, area: Rect) {
    let title = Line::from(" Dynamo DB Data ".bold()).centered();

    let body = view.body();
    if let TableBody::Failed(message) = body {
        let [_, message_area, _] = Layout::vertical([
            Constraint::Fill(1),
            Constraint::Length(3),
            Constraint::Fill(1),
        ])
        .areas(area);
        frame.render_widget(Block::bordered().title(title), area);
        let text = Paragraph::new(format!("Failed to load data: {message}"))
            .red()
            .bold()
            .centered()
            .wrap(Wrap { trim: true });
        frame.render_widget(text, message_area.inner(ratatui::layout::Margin::new(2, 0)));
        return;
    }

    let [top_area, table_area] =
        Layout::vertical([Constraint::Length(SEARCH_HEIGHT), Constraint::Min(0)]).areas(area);
    let [search_area, export_area] =
        Layout::horizontal([Constraint::Min(0), Constraint::Length(EXPORT_BUTTON_WIDTH)])
            .areas(top_area);

    render_search(model, view, frame, search_area);
    render_export_button(view, frame, export_area);

    let header = Row::new(DISPLAY_COLUMNS.iter().enumerate().map(|(cidx, name)| {
        let marker = match view.sort() {
            Some(order) if order.column == cidx && order.ascending => " ▲",
            Some(order) if order.column == cidx => " ▼",
            _ => "",
        };
        let cell = Cell::from(format!("{name}{marker}"));
        if cidx == view.curser_column() {
            cell.underlined()
        } else {
            cell
        }
    }))
    .style(Style::new().bold().reversed())
    .height(TABLE_HEADER_HEIGHT);

    let block = Block::bordered().title(title).title_bottom(
        Line::from(format!(
            " {} of {} ",
            view.visible_rows().len(),
            view.total_records()
        ))
        .right_aligned(),
    );
    let inner = block.inner(table_area);

    let (rows, placeholder) = match body {
        TableBody::Rows(rows) => (
            rows.into_iter()
                .map(|r| Row::new(r.cells))
                .collect::<Vec<Row>>(),
            None,
        ),
        TableBody::Loading => (Vec::new(), Some(LOADING_TEXT)),
        TableBody::Empty | TableBody::Failed(_) => (Vec::new(), Some(NO_DATA_TEXT)),
    };

    let table = Table::new(rows, COLUMN_WIDTHS)
        .header(header)
        .block(block)
        .row_highlight_style(Style::new().reversed());

    let mut state = TableState::default();
    if placeholder.is_none() && model.modus() != Modus::Search {
        state.select(Some(view.curser_row()));
    }
    frame.render_stateful_widget(table, table_area, &mut state);

    // A single line spanning all columns below the header
    if let Some(text) = placeholder
        && inner.height > TABLE_HEADER_HEIGHT
    {
        let line_area = Rect::new(inner.x, inner.y + TABLE_HEADER_HEIGHT, inner.width, 1);
        frame.render_widget(Paragraph::new(text).centered().italic(), line_area);
    }
}

fn render_search(model: &Model, view: &InventoryView, frame: &mut Frame, area: Rect) {
    let active = model.modus() == Modus::Search;
    let (text, block) = if active {
        (
            model.cmdinput().input.as_str(),
            Block::bordered().title(" Search ").yellow(),
        )
    } else {
        (
            view.search_query(),
            Block::bordered().title(" Search (/) "),
        )
    };
    frame.render_widget(Paragraph::new(text).block(block), area);

    if active {
        let max_x = area.x + area.width.saturating_sub(2);
        let x = std::cmp::min(area.x + 1 + model.cmdinput().curser_pos as u16, max_x);
        frame.set_cursor_position(Position::new(x, area.y + 1));
    }
}

fn render_export_button(view: &InventoryView, frame: &mut Frame, area: Rect) {
    let style = if view.export_enabled() {
        Style::new().bold().green()
    } else {
        Style::new().dark_gray()
    };
    let button = Paragraph::new("Export to Excel")
        .centered()
        .style(style)
        .block(Block::bordered().title(" e "));
    frame.render_widget(button, area);
}

fn render_detail(view: &InventoryView, frame: &mut Frame) {
    let area = centered_rect(frame.area(), 60, 70);
    let fields = view.detail_fields();
    let name_width = fields
        .iter()
        .map(|(name, _)| name.chars().count())
        .max()
        .unwrap_or(0) as u16;

    let rows: Vec<Row> = fields
        .into_iter()
        .map(|(name, value)| Row::new(vec![Cell::from(name).bold(), Cell::from(value)]))
        .collect();
    let block = Block::bordered()
        .title(Line::from(" Record Details ".bold()).centered())
        .title_bottom(
            Line::from(vec![
                " Close ".into(),
                "<Esc>".blue().bold(),
                " Copy ".into(),
                "<c> ".blue().bold(),
            ])
            .centered(),
        );
    let table = Table::new(rows, [Constraint::Length(name_width + 1), Constraint::Fill(1)])
        .block(block)
        .row_highlight_style(Style::new().reversed());
    let mut state = TableState::default().with_selected(Some(view.detail_row()));

    frame.render_widget(Clear, area);
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_popup(message: &str, frame: &mut Frame) {
    let area = centered_rect(frame.area(), 50, 80);
    let popup = Paragraph::new(message)
        .block(Block::bordered().title(Line::from(" Help ".bold()).centered()));
    frame.render_widget(Clear, area);
    frame.render_widget(popup, area);
}

fn render_statusline(model: &Model, frame: &mut Frame, area: Rect) {
    let line = if model.last_status_message_update().elapsed() < STATUS_MESSAGE_TIMEOUT {
        Line::from(Span::raw(format!(" {}", model.status_message())))
    } else {
        Line::from(vec![
            " Help ".into(),
            "<?>".blue().bold(),
            " Search ".into(),
            "</>".blue().bold(),
            " Quit ".into(),
            "<q> ".blue().bold(),
        ])
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn centered_rect(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [area] = Layout::vertical([Constraint::Percentage(percent_y)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::horizontal([Constraint::Percentage(percent_x)])
        .flex(Flex::Center)
        .areas(area);
    area
}
