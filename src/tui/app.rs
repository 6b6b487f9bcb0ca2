//! Application state and event loop

use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget, DefaultTerminal, Frame};

use crate::config::AppConfig;
use crate::gateway::Gateway;
use crate::query::{
    AgentDirectory, AgentPipeline, AgentSortField, CustomerSortField, ListEvent, ListState, Page,
    PageRequest, SortField,
};
use crate::services::dashboard::DashboardData;
use crate::services::rename::{apply_rename, RenameError, RenameForm};
use crate::session::UserProfile;
use crate::types::{AgentWithCount, CustomerRow};

use super::theme::Theme;
use super::widgets::{
    agents::AgentsView,
    alert_popup::{Alert, AlertPopup},
    customers::CustomersView,
    dashboard::DashboardView,
    help::HelpPopup,
    list::SearchBox,
    rename_popup::RenamePopup,
    spinner::{LoadingStage, Spinner},
    tabs::Tab,
};
use super::worker::{local_today, Request, Response, Worker, WorkerSettings};

/// Application state
pub enum AppState {
    /// Waiting for the first dashboard load
    Loading {
        spinner_frame: usize,
        stage: LoadingStage,
    },
    Ready { data: Box<DashboardData> },
}

/// Where typed characters go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    /// Editing the search box of the current list tab
    Search,
}

/// Agents tab: the full agent list is held locally and paged in memory
pub struct AgentsTab {
    pub list: ListState<AgentSortField>,
    pub all: Vec<AgentWithCount>,
    pub page: Page<AgentWithCount>,
    pub selected: usize,
    loaded: bool,
    loading: bool,
    generation: u64,
}

/// Customers tab: every page is a gateway round trip
pub struct CustomersTab {
    pub list: ListState<CustomerSortField>,
    pub page: Page<CustomerRow>,
    pub selected: usize,
    loaded: bool,
    loading: bool,
    generation: u64,
    directory: Option<Arc<AgentDirectory>>,
}

/// Main application
pub struct App {
    state: AppState,
    should_quit: bool,
    current_tab: Tab,
    show_help: bool,
    show_all_inactive: bool,
    spinner_frame: usize,
    theme: Theme,
    profile: UserProfile,
    input_mode: InputMode,
    search_draft: String,
    agents: AgentsTab,
    customers: CustomersTab,
    rename: Option<RenameForm>,
    alert: Option<Alert>,
    exporting: bool,
    dashboard_generation: u64,
    /// Requests waiting to be handed to the worker
    outbox: Vec<Request>,
}

impl App {
    /// Create a new app in loading state with the dashboard load queued
    pub fn new(profile: UserProfile, page_size: usize, theme: Theme) -> Self {
        let mut app = Self {
            state: AppState::Loading {
                spinner_frame: 0,
                stage: LoadingStage::Dashboard,
            },
            should_quit: false,
            current_tab: Tab::default(),
            show_help: false,
            show_all_inactive: false,
            spinner_frame: 0,
            theme,
            profile,
            input_mode: InputMode::Normal,
            search_draft: String::new(),
            agents: AgentsTab {
                list: ListState::new(page_size),
                all: Vec::new(),
                page: Page::empty(PageRequest::first(page_size)),
                selected: 0,
                loaded: false,
                loading: false,
                generation: 0,
            },
            customers: CustomersTab {
                list: ListState::new(page_size),
                page: Page::empty(PageRequest::first(page_size)),
                selected: 0,
                loaded: false,
                loading: false,
                generation: 0,
                directory: None,
            },
            rename: None,
            alert: None,
            exporting: false,
            dashboard_generation: 0,
            outbox: Vec::new(),
        };
        app.request_dashboard();
        app
    }

    /// Drain queued requests
    pub fn take_requests(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.outbox)
    }

    /// Check if app should quit
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    fn request_dashboard(&mut self) {
        self.dashboard_generation += 1;
        self.outbox.push(Request::Dashboard {
            generation: self.dashboard_generation,
        });
    }

    fn request_agents(&mut self) {
        self.agents.generation += 1;
        self.agents.loading = true;
        self.outbox.push(Request::Agents {
            generation: self.agents.generation,
        });
    }

    fn request_customers(&mut self) {
        self.customers.generation += 1;
        self.customers.loading = true;
        self.outbox.push(Request::Customers {
            generation: self.customers.generation,
            params: self.customers.list.params(),
            directory: self.customers.directory.clone(),
        });
    }

    fn switch_tab(&mut self, tab: Tab) {
        self.current_tab = tab;
        match tab {
            Tab::Agents if !self.agents.loaded && !self.agents.loading => self.request_agents(),
            Tab::Customers if !self.customers.loaded && !self.customers.loading => {
                self.request_customers()
            }
            _ => {}
        }
    }

    /// Handle keyboard events
    pub fn handle_event(&mut self, event: Event) {
        let Event::Key(key) = event else {
            return;
        };
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        if self.alert.is_some() {
            self.alert = None;
        } else if self.rename.is_some() {
            self.handle_rename_key(key);
        } else if self.show_help {
            match key.code {
                KeyCode::Char('?') | KeyCode::Esc => self.show_help = false,
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            }
        } else if self.input_mode == InputMode::Search {
            self.handle_search_key(key);
        } else {
            self.handle_normal_key(key);
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Tab => self.switch_tab(self.current_tab.next()),
            KeyCode::BackTab => self.switch_tab(self.current_tab.prev()),
            KeyCode::Char(c @ '1'..='3') => {
                if let Some(tab) = Tab::from_number(c as u8 - b'0') {
                    self.switch_tab(tab);
                }
            }
            KeyCode::Char('?') => self.show_help = true,
            _ => match self.current_tab {
                Tab::Dashboard => {
                    if key.code == KeyCode::Char('a') {
                        self.show_all_inactive = !self.show_all_inactive;
                    }
                }
                Tab::Agents | Tab::Customers => self.handle_list_key(key),
            },
        }
    }

    fn handle_list_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('/') => {
                self.search_draft = self.current_search_input().to_string();
                self.input_mode = InputMode::Search;
            }
            KeyCode::Char('c') => self.apply_list_event(ListCommand::ClearSearch),
            KeyCode::Char('s') => self.apply_list_event(ListCommand::NextSortField),
            KeyCode::Char('o') => self.apply_list_event(ListCommand::ToggleDirection),
            KeyCode::Left | KeyCode::Char('h') | KeyCode::PageUp => {
                self.apply_list_event(ListCommand::PrevPage)
            }
            KeyCode::Right | KeyCode::Char('l') | KeyCode::PageDown => {
                self.apply_list_event(ListCommand::NextPage)
            }
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Char('e') => self.start_export(),
            KeyCode::Char('f') if self.current_tab == Tab::Agents => {
                let status = self.agents.list.status.cycle();
                self.apply_agents_event(ListEvent::Status(status));
            }
            KeyCode::Char('r') if self.current_tab == Tab::Agents => self.open_rename(),
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
                self.search_draft.clear();
            }
            KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
                let input = std::mem::take(&mut self.search_draft);
                self.apply_list_event(ListCommand::Search(input));
            }
            KeyCode::Backspace => {
                self.search_draft.pop();
            }
            KeyCode::Char(c) => self.search_draft.push(c),
            _ => {}
        }
    }

    fn handle_rename_key(&mut self, key: KeyEvent) {
        let Some(form) = self.rename.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc if !form.is_saving() => self.rename = None,
            KeyCode::Enter => {
                if form.is_saving() {
                    return;
                }
                if !form.can_submit() {
                    self.alert = Some(Alert::error(RenameError::InvalidName.to_string()));
                    return;
                }
                if form.begin_submit() {
                    self.outbox.push(Request::Rename {
                        agent_id: form.agent_id,
                        name: form.input.clone(),
                    });
                }
            }
            KeyCode::Backspace => form.backspace(),
            KeyCode::Char(c) => form.push(c),
            _ => {}
        }
    }

    fn current_search_input(&self) -> &str {
        match self.current_tab {
            Tab::Agents => &self.agents.list.search_input,
            Tab::Customers => &self.customers.list.search_input,
            Tab::Dashboard => "",
        }
    }

    fn apply_list_event(&mut self, command: ListCommand) {
        match self.current_tab {
            Tab::Agents => {
                let event = command.into_event(self.agents.list.sort.field);
                self.apply_agents_event(event);
            }
            Tab::Customers => {
                let event = command.into_event(self.customers.list.sort.field);
                self.apply_customers_event(event);
            }
            Tab::Dashboard => {}
        }
    }

    fn apply_agents_event(&mut self, event: ListEvent<AgentSortField>) {
        let transition = self.agents.list.clone().reduce(event);
        self.agents.list = transition.state;
        if transition.fetch {
            self.agents.selected = 0;
            self.refresh_agents_page();
        }
    }

    /// Re-run the in-memory pipeline over the loaded agents
    fn refresh_agents_page(&mut self) {
        let tab = &mut self.agents;
        let page = AgentPipeline::query_page(&tab.all, &tab.list.params(), tab.list.status);
        tab.list = tab
            .list
            .clone()
            .reduce(ListEvent::Loaded {
                total_count: page.total_count,
                page: page.request,
            })
            .state;
        tab.selected = tab.selected.min(page.rows.len().saturating_sub(1));
        tab.page = page;
    }

    fn apply_customers_event(&mut self, event: ListEvent<CustomerSortField>) {
        let transition = self.customers.list.clone().reduce(event);
        self.customers.list = transition.state;
        if transition.fetch {
            self.customers.selected = 0;
            self.request_customers();
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let (selected, len) = match self.current_tab {
            Tab::Agents => (&mut self.agents.selected, self.agents.page.rows.len()),
            Tab::Customers => (&mut self.customers.selected, self.customers.page.rows.len()),
            Tab::Dashboard => return,
        };
        if len == 0 {
            return;
        }
        *selected = selected.saturating_add_signed(delta).min(len - 1);
    }

    fn open_rename(&mut self) {
        if let Some(row) = self.agents.page.rows.get(self.agents.selected) {
            self.rename = Some(RenameForm::new(row.agent.id, &row.agent.full_name));
        }
    }

    fn start_export(&mut self) {
        if self.exporting {
            return;
        }
        let request = match self.current_tab {
            Tab::Agents => Request::ExportAgents {
                agents: self.agents.all.clone(),
                search: self.agents.list.search(),
                status: self.agents.list.status,
                sort: self.agents.list.sort,
            },
            Tab::Customers => Request::ExportCustomers {
                search: self.customers.list.search(),
                sort: self.customers.list.sort,
                directory: self.customers.directory.clone(),
            },
            Tab::Dashboard => return,
        };
        self.exporting = true;
        self.outbox.push(request);
    }

    /// Fold a worker response into the app, dropping superseded list results
    pub fn apply_response(&mut self, response: Response) {
        match response {
            Response::Dashboard { generation, data } => {
                if generation != self.dashboard_generation {
                    tracing::debug!(generation, "Discarding stale dashboard load");
                    return;
                }
                self.state = AppState::Ready { data };
            }
            Response::Agents {
                generation,
                agents,
                alert,
            } => {
                if generation != self.agents.generation {
                    tracing::debug!(generation, "Discarding stale agent load");
                    return;
                }
                self.agents.loading = false;
                self.agents.loaded = true;
                self.agents.all = agents;
                self.refresh_agents_page();
                if let Some(message) = alert {
                    self.alert = Some(Alert::error(message));
                }
            }
            Response::Customers {
                generation,
                page,
                directory,
                alert,
            } => {
                if generation != self.customers.generation {
                    tracing::debug!(generation, "Discarding stale customer page");
                    return;
                }
                let tab = &mut self.customers;
                tab.loading = false;
                tab.loaded = true;
                tab.directory = Some(directory);
                tab.list = tab
                    .list
                    .clone()
                    .reduce(ListEvent::Loaded {
                        total_count: page.total_count,
                        page: page.request,
                    })
                    .state;
                tab.selected = tab.selected.min(page.rows.len().saturating_sub(1));
                tab.page = page;
                if let Some(message) = alert {
                    self.alert = Some(Alert::error(message));
                }
            }
            Response::Exported { result } => {
                self.exporting = false;
                self.alert = Some(match result {
                    Ok(summary) => Alert::info(format!(
                        "Exported {} rows to {}",
                        summary.rows,
                        summary.path.display()
                    )),
                    Err(message) => Alert::error(message),
                });
            }
            Response::Renamed { agent_id, result } => self.finish_rename(agent_id, result),
        }
    }

    fn finish_rename(&mut self, agent_id: i64, result: Result<String, RenameError>) {
        match result {
            Ok(name) => {
                apply_rename(&mut self.agents.all, agent_id, &name);
                self.refresh_agents_page();
                if let AppState::Ready { data } = &mut self.state {
                    apply_rename(&mut data.agents.all, agent_id, &name);
                    apply_rename(&mut data.agents.top, agent_id, &name);
                    apply_rename(&mut data.agents.inactive, agent_id, &name);
                }
                // Customer rows show agent names; refetch them on the next page load
                self.customers.directory = None;
                if self.rename.as_ref().map(|f| f.agent_id) == Some(agent_id) {
                    self.rename = None;
                }
                tracing::info!(agent_id, "Agent renamed");
            }
            Err(e) => {
                if let Some(form) = self.rename.as_mut() {
                    form.finish();
                }
                self.alert = Some(Alert::error(e.to_string()));
            }
        }
    }

    /// Update spinner animation
    pub fn tick(&mut self) {
        self.spinner_frame = Spinner::next_frame(self.spinner_frame);
        if let AppState::Loading { stage, .. } = self.state {
            self.state = AppState::Loading {
                spinner_frame: self.spinner_frame,
                stage,
            };
        }
    }

    /// Draw the application
    pub fn draw(&self, frame: &mut Frame) {
        frame.render_widget(self, frame.area());
    }

    fn search_box<'a>(&'a self, committed: &'a str) -> SearchBox<'a> {
        if self.input_mode == InputMode::Search {
            SearchBox {
                input: &self.search_draft,
                editing: true,
            }
        } else {
            SearchBox {
                input: committed,
                editing: false,
            }
        }
    }
}

/// List key actions, resolved against the current tab's sort field
enum ListCommand {
    Search(String),
    ClearSearch,
    NextSortField,
    ToggleDirection,
    NextPage,
    PrevPage,
}

impl ListCommand {
    fn into_event<F: SortField>(self, current: F) -> ListEvent<F> {
        match self {
            Self::Search(input) => ListEvent::Search(input),
            Self::ClearSearch => ListEvent::ClearSearch,
            Self::NextSortField => {
                let fields = F::all();
                let next = fields
                    .iter()
                    .position(|f| *f == current)
                    .map(|i| fields[(i + 1) % fields.len()])
                    .unwrap_or(current);
                ListEvent::SortBy(next)
            }
            Self::ToggleDirection => ListEvent::SortBy(current),
            Self::NextPage => ListEvent::NextPage,
            Self::PrevPage => ListEvent::PrevPage,
        }
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let loading = |busy: bool| busy.then_some(self.spinner_frame);
        match self.current_tab {
            Tab::Dashboard => match &self.state {
                AppState::Loading {
                    spinner_frame,
                    stage,
                } => Spinner::new(*spinner_frame, *stage, self.theme).render(area, buf),
                AppState::Ready { data } => {
                    DashboardView::new(data, &self.profile, self.theme)
                        .with_all_inactive(self.show_all_inactive)
                        .render(area, buf);
                }
            },
            Tab::Agents if !self.agents.loaded => {
                Spinner::new(self.spinner_frame, LoadingStage::Agents, self.theme)
                    .render(area, buf)
            }
            Tab::Customers if !self.customers.loaded => {
                Spinner::new(self.spinner_frame, LoadingStage::Customers, self.theme)
                    .render(area, buf)
            }
            Tab::Agents => {
                let tab = &self.agents;
                AgentsView::new(
                    &tab.page,
                    &tab.list,
                    self.search_box(&tab.list.search_input),
                    self.theme,
                )
                .with_selected((!tab.page.rows.is_empty()).then_some(tab.selected))
                .with_loading(loading(tab.loading))
                .render(area, buf);
            }
            Tab::Customers => {
                let tab = &self.customers;
                CustomersView::new(
                    &tab.page,
                    &tab.list,
                    self.search_box(&tab.list.search_input),
                    self.theme,
                )
                .with_selected((!tab.page.rows.is_empty()).then_some(tab.selected))
                .with_loading(loading(tab.loading))
                .render(area, buf);
            }
        }

        if self.show_help {
            HelpPopup::new(self.theme).render(HelpPopup::centered_area(area), buf);
        }
        if let Some(form) = &self.rename {
            RenamePopup::new(form, self.theme).render(RenamePopup::centered_area(area), buf);
        }
        if let Some(alert) = &self.alert {
            AlertPopup::new(alert, self.theme).render(AlertPopup::centered_area(area), buf);
        }
    }
}

/// Run the TUI application
pub fn run(gateway: Arc<dyn Gateway>, profile: UserProfile, config: &AppConfig) -> anyhow::Result<()> {
    // Must run before raw mode is enabled
    let theme = Theme::detect();
    let settings = WorkerSettings {
        today: local_today,
        lookback_days: config.daily_lookback_days,
        export_batch_size: config.export_batch_size,
        export_dir: config.export_dir(),
    };
    let (tx, rx) = mpsc::channel();
    let worker = Worker::new(gateway, settings, tx);
    let app = App::new(profile, config.page_size, theme);

    let mut terminal = ratatui::init();
    let result = run_app(&mut terminal, app, &worker, &rx);
    ratatui::restore();
    result
}

fn run_app(
    terminal: &mut DefaultTerminal,
    mut app: App,
    worker: &Worker,
    responses: &Receiver<Response>,
) -> anyhow::Result<()> {
    loop {
        for request in app.take_requests() {
            worker.submit(request);
        }

        terminal.draw(|frame| app.draw(frame))?;

        if app.should_quit() {
            break;
        }

        // Non-blocking: apply everything that finished since the last frame
        while let Ok(response) = responses.try_recv() {
            app.apply_response(response);
        }

        // Poll for events with 100ms timeout for spinner animation
        if event::poll(Duration::from_millis(100))? {
            app.handle_event(event::read()?);
        } else {
            app.tick();
        }
    }

    Ok(())
}
