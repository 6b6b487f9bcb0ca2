//! TUI widgets

pub mod agents;
pub mod alert_popup;
pub mod customers;
pub mod dashboard;
pub mod help;
pub mod list;
pub mod rename_popup;
pub mod spinner;
pub mod tabs;

/// Buffer contents as text, one line per row
#[cfg(test)]
pub(crate) fn buffer_text(buf: &ratatui::buffer::Buffer) -> String {
    let area = buf.area;
    (area.y..area.y + area.height)
        .map(|y| {
            (area.x..area.x + area.width)
                .map(|x| buf[(x, y)].symbol())
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
