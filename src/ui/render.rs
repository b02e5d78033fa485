//! 界面渲染
//!
//! 根据 UiState（phase、history、console、error）与 input_buffer 绘制：
//! 标题栏显示控制台状态与当前阶段，主体为会话历史（按角色着色、按宽度换行），
//! 底部为输入框与快捷键提示。

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::core::{ConsoleStatus, TurnPhase, UiState};
use crate::shell::TurnRole;

/// 将内容按宽度换行，支持 UTF-8（按字符数，避免在 UTF-8 中间截断）
fn wrap_text(s: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![s.to_string()];
    }
    let mut lines = Vec::new();
    for para in s.split('\n') {
        let mut line = String::new();
        for ch in para.chars() {
            if line.chars().count() >= width {
                lines.push(std::mem::take(&mut line));
            }
            line.push(ch);
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn phase_label(phase: &TurnPhase) -> &'static str {
    match phase {
        TurnPhase::Idle => "空闲",
        TurnPhase::Thinking => "思考中…",
        TurnPhase::Error => "错误",
    }
}

fn console_label(console: &ConsoleStatus) -> String {
    match console {
        ConsoleStatus::Booting => "enigma-os: 初始化中".to_string(),
        ConsoleStatus::Ready => "enigma-os: 就绪（检测到登录提示）".to_string(),
        ConsoleStatus::Unavailable(e) => format!("enigma-os: 不可用（{}）", e),
        ConsoleStatus::Stopped => "enigma-os: 已停止".to_string(),
    }
}

/// 绘制一帧：上方会话区，下方输入区；将 (总行数, 可视高度) 写入 out 供外部 clamp 滚动
pub fn draw(
    f: &mut Frame,
    state: &UiState,
    input_buffer: &str,
    conversation_scroll: usize,
    out: &mut (usize, usize),
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(3)])
        .split(f.area());

    let conv_area = chunks[0];
    let content_width = conv_area.width.saturating_sub(2) as usize;

    let title = format!(
        " Enigma Shell │ {} │ {} ",
        console_label(&state.console),
        phase_label(&state.phase)
    );
    let border_color = match state.console {
        ConsoleStatus::Ready => Color::Cyan,
        ConsoleStatus::Unavailable(_) => Color::Red,
        _ => Color::Yellow,
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let mut text_lines: Vec<Line> = Vec::new();
    for (idx, turn) in state.history.iter().enumerate() {
        if idx > 0 {
            text_lines.push(Line::from(Span::raw("")));
        }
        let (prefix, color) = match turn.role {
            TurnRole::Command => ("you ", Color::Cyan),
            TurnRole::Response => ("ai  ", Color::Green),
            TurnRole::System => ("sys ", Color::Yellow),
            TurnRole::Error => ("err ", Color::Red),
        };
        let stamp = turn.timestamp.format("%H:%M:%S");
        let wrapped = wrap_text(&turn.text, content_width.max(40));
        for (i, line) in wrapped.into_iter().enumerate() {
            let pref = if i == 0 {
                format!("{} [{}] ", prefix, stamp)
            } else {
                "    ".to_string()
            };
            text_lines.push(Line::from(vec![
                Span::styled(pref, Style::default().fg(Color::DarkGray)),
                Span::styled(line, Style::default().fg(color)),
            ]));
        }
    }
    if let Some(err) = &state.error_message {
        text_lines.push(Line::from(Span::styled(
            format!("! {}", err),
            Style::default().fg(Color::Red),
        )));
    }

    let total_lines = text_lines.len();
    let viewport_height = conv_area.height.saturating_sub(2) as usize;
    *out = (total_lines, viewport_height);

    let scroll = conversation_scroll.min(total_lines.saturating_sub(viewport_height)) as u16;
    let conversation = Paragraph::new(text_lines).block(block).scroll((scroll, 0));
    f.render_widget(conversation, conv_area);

    let placeholder = if state.input_locked {
        "等待本轮完成…"
    } else {
        "输入命令或问题，Enter 发送，Ctrl+Q 退出"
    };
    let input_text = if input_buffer.is_empty() {
        Span::styled(placeholder, Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(input_buffer, Style::default().fg(Color::White))
    };
    let input = Paragraph::new(Line::from(vec![
        Span::styled("enigma@shell:~$ ", Style::default().fg(Color::Cyan)),
        input_text,
    ]))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(input, chunks[1]);
}
