use std::sync::Arc;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;

use crate::config::AppConfig;
use crate::gateway::{Gateway, MemoryGateway, RestGateway};
use crate::logging;
use crate::session::{Session, SessionStore};
use crate::types::Result;

mod auth;
mod list;

pub use auth::LoginArgs;
pub use list::{AgentsArgs, CustomersArgs, DashboardArgs, ExportArgs, RenameArgs};

/// Sign-in address used by demo mode
pub const DEMO_EMAIL: &str = "demo@salesdash.dev";

/// Terminal dashboard for sales agents and their customers
#[derive(Parser)]
#[command(name = "salesdash")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Use built-in sample data instead of the hosted gateway
    #[arg(long, global = true)]
    demo: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Launch interactive TUI (default)
    Tui,

    /// Sign in and store the session
    Login(LoginArgs),

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Print the dashboard summary
    Dashboard(DashboardArgs),

    /// List customers
    Customers(CustomersArgs),

    /// List agents with their customer counts
    Agents(AgentsArgs),

    /// Export a filtered list as CSV
    Export(ExportArgs),

    /// Change an agent's full name
    RenameAgent(RenameArgs),
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        let ctx = Context::init(self.demo)?;
        tracing::debug!(demo = self.demo, "Starting");

        match self.command {
            None | Some(Commands::Tui) => {
                let (session, gateway) = ctx.signed_in()?;
                crate::tui::run(gateway, session.profile(), &ctx.config)
            }
            Some(Commands::Login(args)) => args.run(&ctx),
            Some(Commands::Logout) => auth::run_logout(&ctx),
            Some(Commands::Whoami) => auth::run_whoami(&ctx),
            Some(Commands::Dashboard(args)) => args.run(&ctx),
            Some(Commands::Customers(args)) => args.run(&ctx),
            Some(Commands::Agents(args)) => args.run(&ctx),
            Some(Commands::Export(args)) => args.run(&ctx),
            Some(Commands::RenameAgent(args)) => args.run(&ctx),
        }
    }
}

/// Configuration, stored session and gateway selection shared by every command
pub struct Context {
    pub config: AppConfig,
    store: SessionStore,
    demo: bool,
    _log_guard: Option<WorkerGuard>,
}

impl Context {
    fn init(demo: bool) -> anyhow::Result<Self> {
        let config = AppConfig::load()?;
        let home = AppConfig::home_dir()?;
        let log_guard = match logging::init(&home.join("logs"), config.log_filter()) {
            Ok(guard) => Some(guard),
            Err(e) => {
                eprintln!("Warning: file logging disabled: {}", e);
                None
            }
        };
        Ok(Self {
            config,
            store: SessionStore::new(&home),
            demo,
            _log_guard: log_guard,
        })
    }

    /// Context over explicit parts, without touching the home directory
    pub fn new(config: AppConfig, store: SessionStore, demo: bool) -> Self {
        Self {
            config,
            store,
            demo,
            _log_guard: None,
        }
    }

    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn is_demo(&self) -> bool {
        self.demo
    }

    /// Gateway authorized with the anon key only, used for sign-in
    pub fn anonymous_gateway(&self) -> Result<Arc<dyn Gateway>> {
        if self.demo {
            return Ok(Arc::new(MemoryGateway::demo(self.today())));
        }
        let (url, key) = self.config.gateway_credentials()?;
        Ok(Arc::new(RestGateway::new(
            url,
            key,
            self.config.request_timeout(),
        )?))
    }

    /// The stored session and a gateway acting on its behalf. An expired
    /// session is refreshed first. Demo mode signs in to the sample data instead.
    pub fn signed_in(&self) -> Result<(Session, Arc<dyn Gateway>)> {
        if self.demo {
            let gateway = MemoryGateway::demo(self.today());
            let session = gateway.sign_in(DEMO_EMAIL, "demo")?;
            return Ok((session, Arc::new(gateway)));
        }

        let (url, key) = self.config.gateway_credentials()?;
        let gateway = RestGateway::new(url, key, self.config.request_timeout())?;
        let session = auth::resume(&gateway, &self.store)?;
        Ok((session.clone(), Arc::new(gateway.with_session(Some(&session)))))
    }
}
