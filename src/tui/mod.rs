//! Ratatui-based terminal dashboard.
//!
//! Three tabs over one `Session`:
//! - Explore: dataset preview, daily sales chart, grouped bar charts
//! - Models: held-out accuracy, classification reports, confusion matrices
//! - Predict: a small form that runs both models on one observation
//!
//! Pages are computed on demand and kept until the user reloads (`R`) or
//! retrains (`t`).

use std::io;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{BarChart, Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Terminal,
};

use crate::app::pages::{
    explore_page, form_options, performance_page, predict_page, ExplorePage, FormOptions, ModelOutcome,
    PerformancePage, PredictionPage, Session,
};
use crate::app::pipeline::run_training;
use crate::domain::{PredictionRequest, TrainConfig};
use crate::error::AppError;
use crate::report::format::format_evaluation;

mod plotters_chart;

use plotters_chart::{date_to_x, DailySalesChart};

/// Inventory step for ←/→ on the inventory field.
const INVENTORY_STEP: u32 = 10;

/// Start the dashboard.
pub fn run(config: TrainConfig) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| AppError::Terminal(format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(config);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::Terminal(format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::Terminal(format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Explore,
    Models,
    Predict,
}

impl Tab {
    const ALL: [Tab; 3] = [Tab::Explore, Tab::Models, Tab::Predict];

    fn title(self) -> &'static str {
        match self {
            Tab::Explore => "Explore",
            Tab::Models => "Models",
            Tab::Predict => "Predict",
        }
    }

    fn index(self) -> usize {
        match self {
            Tab::Explore => 0,
            Tab::Models => 1,
            Tab::Predict => 2,
        }
    }

    fn next(self) -> Self {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }
}

/// Prediction form fields, top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Category,
    Region,
    Inventory,
    Weather,
    Holiday,
    Date,
}

impl Field {
    const ALL: [Field; 6] = [
        Field::Category,
        Field::Region,
        Field::Inventory,
        Field::Weather,
        Field::Holiday,
        Field::Date,
    ];
}

/// Form state. Choice fields index into `FormOptions`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PredictForm {
    category: usize,
    region: usize,
    weather: usize,
    inventory: u32,
    holiday: bool,
    date: NaiveDate,
    selected: usize,
}

impl PredictForm {
    fn new(today: NaiveDate) -> Self {
        Self {
            category: 0,
            region: 0,
            weather: 0,
            inventory: 100,
            holiday: false,
            date: today,
            selected: 0,
        }
    }

    fn field(&self) -> Field {
        Field::ALL[self.selected.min(Field::ALL.len() - 1)]
    }

    fn select(&mut self, delta: isize) {
        let last = Field::ALL.len() as isize - 1;
        self.selected = (self.selected as isize + delta).clamp(0, last) as usize;
    }

    /// Step the selected field. Choice fields wrap around their options.
    fn adjust(&mut self, delta: i32, options: &FormOptions) {
        fn cycle(idx: usize, len: usize, delta: i32) -> usize {
            if len == 0 {
                return 0;
            }
            (idx as i64 + i64::from(delta)).rem_euclid(len as i64) as usize
        }

        match self.field() {
            Field::Category => self.category = cycle(self.category, options.categories.len(), delta),
            Field::Region => self.region = cycle(self.region, options.regions.len(), delta),
            Field::Weather => self.weather = cycle(self.weather, options.weather_conditions.len(), delta),
            Field::Inventory => {
                self.inventory = if delta >= 0 {
                    self.inventory.saturating_add(INVENTORY_STEP)
                } else {
                    self.inventory.saturating_sub(INVENTORY_STEP)
                };
            }
            Field::Holiday => self.holiday = !self.holiday,
            Field::Date => {
                let days = chrono::Days::new(1);
                let next = if delta >= 0 {
                    self.date.checked_add_days(days)
                } else {
                    self.date.checked_sub_days(days)
                };
                self.date = next.unwrap_or(self.date);
            }
        }
    }

    fn request(&self, options: &FormOptions) -> PredictionRequest {
        let pick = |values: &[String], idx: usize| values.get(idx).cloned().unwrap_or_default();
        PredictionRequest {
            category: pick(&options.categories, self.category),
            region: pick(&options.regions, self.region),
            inventory_level: self.inventory,
            weather_condition: pick(&options.weather_conditions, self.weather),
            holiday_or_promotion: self.holiday,
            date: self.date,
        }
    }
}

struct App {
    config: TrainConfig,
    session: Session,
    tab: Tab,
    explore: Option<Result<ExplorePage, String>>,
    performance: Option<Result<PerformancePage, String>>,
    options: Option<Result<FormOptions, String>>,
    form: PredictForm,
    prediction: Option<PredictionPage>,
    editing_date: bool,
    date_input: String,
    status: String,
}

impl App {
    fn new(config: TrainConfig) -> Self {
        let session = Session::new(&config.dataset_path, &config.artifact_dir);
        Self {
            config,
            session,
            tab: Tab::Explore,
            explore: None,
            performance: None,
            options: None,
            form: PredictForm::new(Local::now().date_naive()),
            prediction: None,
            editing_date: false,
            date_input: String::new(),
            status: "Tab switch page | t train | R reload | q quit".to_string(),
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                self.ensure_page();
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::Terminal(format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::Terminal(format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::Terminal(format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Compute the current tab's page if it is not cached yet.
    fn ensure_page(&mut self) {
        match self.tab {
            Tab::Explore if self.explore.is_none() => {
                self.explore = Some(explore_page(&mut self.session).map_err(|e| e.to_string()));
            }
            Tab::Models if self.performance.is_none() => {
                self.performance = Some(performance_page(&mut self.session).map_err(|e| e.to_string()));
            }
            Tab::Predict if self.options.is_none() => {
                self.options = Some(form_options(&mut self.session).map_err(|e| e.to_string()));
            }
            _ => {}
        }
    }

    /// Returns `true` when the app should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.editing_date {
            self.handle_date_edit(code);
            return false;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab => self.tab = self.tab.next(),
            KeyCode::Char('1') => self.tab = Tab::Explore,
            KeyCode::Char('2') => self.tab = Tab::Models,
            KeyCode::Char('3') => self.tab = Tab::Predict,
            KeyCode::Char('R') | KeyCode::Char('r') => {
                self.reload();
                self.status = "Reloaded dataset and models from disk.".to_string();
            }
            KeyCode::Char('t') => self.retrain(),
            _ if self.tab == Tab::Predict => self.handle_form_key(code),
            _ => {}
        }
        false
    }

    fn handle_form_key(&mut self, code: KeyCode) {
        let Some(Ok(options)) = &self.options else {
            return;
        };
        match code {
            KeyCode::Up => self.form.select(-1),
            KeyCode::Down => self.form.select(1),
            KeyCode::Left => self.form.adjust(-1, options),
            KeyCode::Right => self.form.adjust(1, options),
            KeyCode::Enter if self.form.field() == Field::Date => {
                self.editing_date = true;
                self.date_input = self.form.date.format("%Y-%m-%d").to_string();
                self.status = "Editing date (YYYY-MM-DD). Enter to apply, Esc to cancel.".to_string();
            }
            KeyCode::Enter | KeyCode::Char('p') => {
                let request = self.form.request(options);
                let page = predict_page(&mut self.session, &request);
                let failures = page
                    .outcomes
                    .iter()
                    .filter(|o| matches!(o, ModelOutcome::Failed { .. }))
                    .count();
                self.status = if failures == 0 {
                    "Prediction done.".to_string()
                } else {
                    format!("{failures} model(s) unavailable; see the results panel.")
                };
                self.prediction = Some(page);
            }
            _ => {}
        }
    }

    fn handle_date_edit(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.editing_date = false;
                self.status = "Date edit canceled.".to_string();
            }
            KeyCode::Enter => {
                self.editing_date = false;
                match NaiveDate::parse_from_str(self.date_input.trim(), "%Y-%m-%d") {
                    Ok(date) => {
                        self.form.date = date;
                        self.status = format!("date: {date}");
                    }
                    Err(e) => self.status = format!("Invalid date '{}': {e}", self.date_input.trim()),
                }
            }
            KeyCode::Backspace => {
                self.date_input.pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() || c == '-' => self.date_input.push(c),
            _ => {}
        }
    }

    fn reload(&mut self) {
        self.session.reload();
        self.explore = None;
        self.performance = None;
        self.options = None;
        self.prediction = None;
    }

    fn retrain(&mut self) {
        match run_training(&self.config) {
            Ok(summary) => {
                let scores: Vec<String> = summary
                    .evaluations
                    .iter()
                    .map(|(kind, r)| format!("{} {:.1}%", kind.short_name(), r.accuracy * 100.0))
                    .collect();
                self.reload();
                self.status = format!("Trained on {} rows: {}", summary.rows_used, scores.join(", "));
            }
            Err(e) => {
                tracing::error!(error = %e, "training from the dashboard failed");
                self.status = format!("Training failed: {e}");
            }
        }
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
            .split(frame.area());

        self.draw_tabs(frame, chunks[0]);
        match self.tab {
            Tab::Explore => self.draw_explore(frame, chunks[1]),
            Tab::Models => self.draw_models(frame, chunks[1]),
            Tab::Predict => self.draw_predict(frame, chunks[1]),
        }
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_tabs(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let titles: Vec<Line> = Tab::ALL.iter().map(|t| Line::from(t.title())).collect();
        let tabs = Tabs::new(titles)
            .select(self.tab.index())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("demand | {}", self.session.dataset_path().display())),
            )
            .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
        frame.render_widget(tabs, area);
    }

    fn draw_explore(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let page = match &self.explore {
            Some(Ok(page)) => page,
            Some(Err(message)) => return draw_message(frame, area, message, Color::Red),
            None => return draw_message(frame, area, "Loading dataset...", Color::Yellow),
        };

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(area);
        let top = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(46), Constraint::Min(0)])
            .split(rows[0]);

        let s = &page.summary;
        let mut lines = vec![
            Line::from(format!("rows: {}  skipped: {}", s.rows, page.skipped_rows)),
            Line::from(format!("dates: {} .. {}", s.date_range.0, s.date_range.1)),
            Line::from(""),
        ];
        for c in &s.columns {
            lines.push(Line::from(Span::styled(c.name, Style::default().fg(Color::Cyan))));
            lines.push(Line::from(format!(
                "  mean {:.1}  std {:.1}  min {:.0}  max {:.0}",
                c.mean, c.std, c.min, c.max
            )));
            lines.push(Line::from(format!(
                "  25% {:.1}  50% {:.1}  75% {:.1}",
                c.q25, c.median, c.q75
            )));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("first rows", Style::default().fg(Color::Cyan))));
        for r in &page.preview {
            lines.push(Line::from(format!(
                "{} {} {} inv={} {} promo={} sold={}",
                r.date,
                r.category,
                r.region,
                r.inventory_level,
                r.weather_condition,
                u8::from(r.holiday_or_promotion),
                r.units_sold
            )));
        }
        frame.render_widget(
            Paragraph::new(Text::from(lines))
                .block(Block::default().title("Dataset").borders(Borders::ALL))
                .wrap(Wrap { trim: true }),
            top[0],
        );

        let block = Block::default().title("Units sold per day").borders(Borders::ALL);
        let inner = block.inner(top[1]);
        frame.render_widget(block, top[1]);
        frame.render_widget(Clear, inner);
        let series: Vec<(f64, f64)> = s
            .daily_units
            .iter()
            .map(|(d, u)| (date_to_x(*d), *u as f64))
            .collect();
        if let Some((x_bounds, y_bounds)) = DailySalesChart::bounds_for(&series) {
            frame.render_widget(
                DailySalesChart {
                    series: &series,
                    x_bounds,
                    y_bounds,
                },
                inner,
            );
        }

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 3), Constraint::Ratio(1, 3), Constraint::Ratio(1, 3)])
            .split(rows[1]);
        draw_groups(frame, bottom[0], "Units by category", &s.units_by_category);
        draw_groups(frame, bottom[1], "Units by region", &s.units_by_region);
        draw_groups(frame, bottom[2], "Mean units by weather", &s.mean_units_by_weather);
    }

    fn draw_models(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let page = match &self.performance {
            Some(Ok(page)) => page,
            Some(Err(message)) => {
                let hint = format!("{message}\n\nPress t to train the models.");
                return draw_message(frame, area, &hint, Color::Red);
            }
            None => return draw_message(frame, area, "Loading models...", Color::Yellow),
        };

        let constraints: Vec<Constraint> = page
            .reports
            .iter()
            .map(|_| Constraint::Ratio(1, page.reports.len().max(1) as u32))
            .collect();
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(area);

        for ((kind, report), rect) in page.reports.iter().zip(columns.iter()) {
            let title = format!("{} | {} held-out rows", kind.display_name(), page.test_rows);
            frame.render_widget(
                Paragraph::new(format_evaluation(report)).block(Block::default().title(title).borders(Borders::ALL)),
                *rect,
            );
        }
    }

    fn draw_predict(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let options = match &self.options {
            Some(Ok(options)) => options,
            Some(Err(message)) => return draw_message(frame, area, message, Color::Red),
            None => return draw_message(frame, area, "Loading form options...", Color::Yellow),
        };

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(42), Constraint::Min(0)])
            .split(area);

        let request = self.form.request(options);
        let date_value = if self.editing_date {
            format!("{}_", self.date_input)
        } else {
            request.date.to_string()
        };
        let items: Vec<ListItem> = [
            format!("Category: {}", request.category),
            format!("Region: {}", request.region),
            format!("Inventory level: {}", request.inventory_level),
            format!("Weather: {}", request.weather_condition),
            format!("Holiday/Promotion: {}", u8::from(request.holiday_or_promotion)),
            format!("Date: {date_value}"),
        ]
        .into_iter()
        .map(ListItem::new)
        .collect();

        let list = List::new(items)
            .block(Block::default().title("Observation").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");
        let mut state = ListState::default();
        state.select(Some(self.form.selected));
        frame.render_stateful_widget(list, columns[0], &mut state);

        let mut lines: Vec<Line> = Vec::new();
        match &self.prediction {
            None => lines.push(Line::from("Press p to predict.")),
            Some(page) => {
                for outcome in &page.outcomes {
                    lines.push(Line::from(Span::styled(
                        outcome.kind().display_name(),
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                    match outcome {
                        ModelOutcome::Predicted(p) => {
                            lines.push(Line::from(Span::styled(
                                format!("  -> {}", p.label.display_name()),
                                Style::default().fg(Color::Green),
                            )));
                            for (label, prob) in &p.probabilities {
                                let bar = "#".repeat((prob * 20.0).round() as usize);
                                lines.push(Line::from(format!(
                                    "     {:<7} {:>5.1}% {bar}",
                                    label.as_str(),
                                    prob * 100.0
                                )));
                            }
                        }
                        ModelOutcome::Failed { message, .. } => {
                            lines.push(Line::from(Span::styled(
                                format!("  {message}"),
                                Style::default().fg(Color::Red),
                            )));
                        }
                    }
                    lines.push(Line::from(""));
                }
            }
        }
        frame.render_widget(
            Paragraph::new(Text::from(lines))
                .block(Block::default().title("Demand level").borders(Borders::ALL))
                .wrap(Wrap { trim: false }),
            columns[1],
        );
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = match self.tab {
            Tab::Predict => "↑/↓ field  ←/→ adjust  Enter edit date  p predict  Tab page  t train  R reload  q quit",
            _ => "Tab/1-3 page  t train  R reload  q quit",
        };
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        frame.render_widget(Paragraph::new(line).block(Block::default().borders(Borders::ALL)), area);
    }
}

fn draw_message(frame: &mut ratatui::Frame<'_>, area: Rect, message: &str, color: Color) {
    let p = Paragraph::new(message.to_string())
        .style(Style::default().fg(color))
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(p, area);
}

fn draw_groups(frame: &mut ratatui::Frame<'_>, area: Rect, title: &str, groups: &[crate::data::GroupValue]) {
    let data: Vec<(&str, u64)> = groups
        .iter()
        .map(|g| (g.key.as_str(), g.value.round().max(0.0) as u64))
        .collect();
    let n = data.len().max(1) as u16;
    let inner_width = area.width.saturating_sub(2);
    let bar_width = (inner_width / n).saturating_sub(1).clamp(3, 12);

    let chart = BarChart::default()
        .block(Block::default().title(title.to_string()).borders(Borders::ALL))
        .data(data.as_slice())
        .bar_width(bar_width)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
    frame.render_widget(chart, area);
}
