//! Background gateway requests for the TUI
//!
//! Each request runs on its own thread and reports back over an mpsc
//! channel. List responses carry the generation they were issued under so
//! the app can drop results for a superseded query.

use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread;

use chrono::{Local, NaiveDate};

use crate::export::{self, ExportKind, ExportSummary};
use crate::gateway::Gateway;
use crate::query::{
    AgentDirectory, AgentPipeline, AgentSortField, CustomerPipeline, CustomerSortField,
    ListParams, Page, SearchTerm, SortSpec, StatusFilter,
};
use crate::services::dashboard::{DashboardData, DashboardLoader};
use crate::services::rename::{self, is_permission_error, RenameError, READ_PERMISSION_ALERT};
use crate::types::{AgentWithCount, CustomerRow, DashError};

/// Local calendar date at the moment of the call
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// Values the worker needs besides the request itself
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Read when each request executes, so long sessions follow the date
    pub today: fn() -> NaiveDate,
    pub lookback_days: u32,
    pub export_batch_size: usize,
    pub export_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub enum Request {
    Dashboard {
        generation: u64,
    },
    Agents {
        generation: u64,
    },
    Customers {
        generation: u64,
        params: ListParams<CustomerSortField>,
        /// Cached agent names; fetched alongside the page when absent
        directory: Option<Arc<AgentDirectory>>,
    },
    ExportCustomers {
        search: Option<SearchTerm>,
        sort: SortSpec<CustomerSortField>,
        directory: Option<Arc<AgentDirectory>>,
    },
    ExportAgents {
        agents: Vec<AgentWithCount>,
        search: Option<SearchTerm>,
        status: StatusFilter,
        sort: SortSpec<AgentSortField>,
    },
    Rename {
        agent_id: i64,
        name: String,
    },
}

#[derive(Debug)]
pub enum Response {
    Dashboard {
        generation: u64,
        data: Box<DashboardData>,
    },
    Agents {
        generation: u64,
        agents: Vec<AgentWithCount>,
        alert: Option<String>,
    },
    Customers {
        generation: u64,
        page: Page<CustomerRow>,
        directory: Arc<AgentDirectory>,
        alert: Option<String>,
    },
    Exported {
        result: Result<ExportSummary, String>,
    },
    Renamed {
        agent_id: i64,
        result: Result<String, RenameError>,
    },
}

/// Spawns one thread per request against a shared gateway
pub struct Worker {
    gateway: Arc<dyn Gateway>,
    settings: WorkerSettings,
    tx: Sender<Response>,
}

impl Worker {
    pub fn new(gateway: Arc<dyn Gateway>, settings: WorkerSettings, tx: Sender<Response>) -> Self {
        Self {
            gateway,
            settings,
            tx,
        }
    }

    pub fn submit(&self, request: Request) {
        let gateway = Arc::clone(&self.gateway);
        let settings = self.settings.clone();
        let tx = self.tx.clone();
        thread::spawn(move || {
            let response = execute(gateway.as_ref(), &settings, request);
            // Receiver is gone once the app has quit
            let _ = tx.send(response);
        });
    }
}

/// Alert text for a failed list read, if the failure is worth interrupting for
fn read_alert(error: &DashError) -> Option<String> {
    is_permission_error(error).then(|| READ_PERMISSION_ALERT.to_string())
}

/// Run a request to completion on the calling thread
pub fn execute(gateway: &dyn Gateway, settings: &WorkerSettings, request: Request) -> Response {
    match request {
        Request::Dashboard { generation } => {
            let today = (settings.today)();
            let data = DashboardLoader::new(gateway, settings.lookback_days).load(today);
            Response::Dashboard {
                generation,
                data: Box::new(data),
            }
        }
        Request::Agents { generation } => match AgentPipeline::load(gateway) {
            Ok(agents) => Response::Agents {
                generation,
                agents,
                alert: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Agent list unavailable");
                Response::Agents {
                    generation,
                    agents: Vec::new(),
                    alert: read_alert(&e),
                }
            }
        },
        Request::Customers {
            generation,
            params,
            directory,
        } => {
            let directory = directory.unwrap_or_else(|| Arc::new(AgentDirectory::load(gateway)));
            match CustomerPipeline::query_page(gateway, &params, &directory) {
                Ok(page) => Response::Customers {
                    generation,
                    page,
                    directory,
                    alert: None,
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Customer page unavailable");
                    Response::Customers {
                        generation,
                        page: Page::empty(params.page),
                        directory,
                        alert: read_alert(&e),
                    }
                }
            }
        }
        Request::ExportCustomers {
            search,
            sort,
            directory,
        } => {
            let directory = directory.unwrap_or_else(|| Arc::new(AgentDirectory::load(gateway)));
            let result = export::export_customers(
                gateway,
                &directory,
                search.as_ref(),
                sort,
                settings.export_batch_size,
            )
            .and_then(|(content, rows)| {
                export::write_export(
                    &content,
                    rows,
                    ExportKind::Customers,
                    &settings.export_dir,
                    None,
                    (settings.today)(),
                )
            });
            Response::Exported {
                result: result.map_err(|e| {
                    tracing::warn!(error = %e, "Customer export failed");
                    format!("Export failed: {}", e.message())
                }),
            }
        }
        Request::ExportAgents {
            agents,
            search,
            status,
            sort,
        } => {
            let result = export::export_agents(&agents, search.as_ref(), status, &sort).and_then(
                |(content, rows)| {
                    export::write_export(
                        &content,
                        rows,
                        ExportKind::Agents,
                        &settings.export_dir,
                        None,
                        (settings.today)(),
                    )
                },
            );
            Response::Exported {
                result: result.map_err(|e| {
                    tracing::warn!(error = %e, "Agent export failed");
                    format!("Export failed: {}", e.message())
                }),
            }
        }
        Request::Rename { agent_id, name } => Response::Renamed {
            agent_id,
            result: rename::rename_agent(gateway, agent_id, &name),
        },
    }
}
