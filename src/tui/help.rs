use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

pub fn draw_help(area: Rect, f: &mut Frame) {
    let key = Style::default().fg(Color::Magenta);
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("0-9", key),
            Span::raw("         Edit vote count"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("Enter", key),
            Span::raw("       Start voting"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("s", key),
            Span::raw(" / "),
            Span::styled("Esc", key),
            Span::raw("     Stop"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", key),
            Span::raw(" / "),
            Span::styled("Ctrl-C", key),
            Span::raw("  Quit"),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("?", key),
            Span::raw("           Show this help"),
        ]),
        Line::from(""),
        Line::from("Stop asks the server to halt; the screen keeps"),
        Line::from("updating until the final status arrives."),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(Clear, area);
    f.render_widget(p, area);
}
