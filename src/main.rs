use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};

use screenlets::config::{Config, ConfigStore};
use screenlets::coordination;
use screenlets::error::ScreenletError;
use screenlets::form::{FormScreenlet, FormScreenletDelegate, FormSettings, Record};
use screenlets::interactor::InteractorRunner;
use screenlets::list::{DdlEntry, DdlListSource, ListScreenlet, ListScreenletDelegate, ListSettings};
use screenlets::logging::init_tracing;
use screenlets::login::{AuthMethod, LoginScreenlet, LoginScreenletDelegate};
use screenlets::operation::MemoryCache;
use screenlets::screenlet::{run_until_idle, Coordinated};
use screenlets::session::Session;
use screenlets::transport::{HttpTransport, OperationDispatcher};

#[derive(Parser, Debug)]
#[command(name = "screenlets", version, about, long_about = None)]
struct Cli {
    /// Config file (default: screenlets/config.toml in the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug, PartialEq)]
enum CliCommand {
    /// Authenticate and print the user attributes
    Login {
        /// email, screen-name or user-id
        #[arg(long)]
        method: Option<String>,
        #[arg(long)]
        login: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Load a form structure
    LoadForm {
        #[arg(long)]
        structure_id: Option<i64>,
    },
    /// Load a record, with its structure
    LoadRecord {
        #[arg(long)]
        record_id: Option<i64>,
        #[arg(long)]
        structure_id: Option<i64>,
    },
    /// Load one page of a record set
    ListPage {
        #[arg(default_value_t = 0)]
        page: usize,
        #[arg(long)]
        record_set_id: Option<i64>,
    },
}

/// Prints delegate events as JSON lines and remembers failures.
#[derive(Clone, Default)]
struct JsonEvents {
    failed: Arc<AtomicBool>,
}

impl JsonEvents {
    fn emit(&self, event: &str, body: Value) {
        let mut line = Map::new();
        line.insert("event".to_string(), Value::String(event.to_string()));
        if let Value::Object(fields) = body {
            line.extend(fields);
        }
        println!("{}", Value::Object(line));
    }

    fn error(&self, event: &str, error: &ScreenletError) {
        self.failed.store(true, Ordering::SeqCst);
        self.emit(
            event,
            json!({"type": error.error_type(), "message": error.to_string()}),
        );
    }

    fn failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }
}

impl FormScreenletDelegate for JsonEvents {
    fn on_form_loaded(&mut self, record: &Record) {
        let fields: Vec<Value> = record
            .fields()
            .iter()
            .map(|field| json!({"name": field.name, "label": field.label, "required": field.required}))
            .collect();
        self.emit("form_loaded", json!({"structureId": record.structure_id, "fields": fields}));
    }

    fn on_form_load_error(&mut self, error: &ScreenletError) {
        self.error("form_load_error", error);
    }

    fn on_record_loaded(&mut self, record: &Record) {
        self.emit("record_loaded", json!({"record": record.to_json()}));
    }

    fn on_record_load_error(&mut self, error: &ScreenletError) {
        self.error("record_load_error", error);
    }
}

struct JsonListEvents {
    events: JsonEvents,
    label_fields: Vec<String>,
}

impl ListScreenletDelegate<DdlEntry> for JsonListEvents {
    fn on_page_loaded(&mut self, page: usize, rows: &[DdlEntry], row_count: usize) {
        let rows: Vec<Value> = rows
            .iter()
            .map(|row| {
                json!({
                    "recordId": row.record_id,
                    "title": row.title(&self.label_fields),
                    "values": row.values,
                })
            })
            .collect();
        self.events.emit(
            "page_loaded",
            json!({"page": page, "rowCount": row_count, "rows": rows}),
        );
    }

    fn on_page_error(&mut self, page: usize, error: &ScreenletError) {
        self.events.error("page_error", error);
        tracing::debug!(page, "Page error reported");
    }
}

impl LoginScreenletDelegate for JsonEvents {
    fn on_login_success(&mut self, user: &Map<String, Value>, session: &Session) {
        self.emit(
            "login_success",
            json!({"server": session.server(), "user": user}),
        );
    }

    fn on_login_error(&mut self, error: &ScreenletError) {
        self.error("login_error", error);
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<ConfigStore> {
    match path {
        Some(path) => ConfigStore::open(path).context("Failed to load config"),
        None => {
            let config = Config::load().context("Failed to load config")?;
            Ok(ConfigStore::new(config, Config::config_path()))
        }
    }
}

/// Start a screenlet on `runtime` and block until it is idle.
///
/// `start` runs on the runtime and returns whether an action was accepted.
fn run_screenlet<S, F>(runtime: &tokio::runtime::Runtime, mut screenlet: S, start: F) -> bool
where
    S: Coordinated + Send + 'static,
    F: FnOnce(&mut S) -> bool + Send + 'static,
{
    coordination::wait_for_signal(|signal| {
        runtime.spawn(async move {
            if start(&mut screenlet) {
                run_until_idle(&mut screenlet).await;
            }
            signal.fire();
        });
    })
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let store = load_config(cli.config)?;
    let mut config = store.get();
    tracing::info!(path = %store.path().display(), server = %config.server.base_url, "Starting");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let session = Session::from_config(&config);
    let transport = HttpTransport::new(session, &config.server)?;
    let dispatcher = OperationDispatcher::new(Arc::new(transport), Arc::new(MemoryCache::new()));
    let runner = InteractorRunner::new(dispatcher, runtime.handle().clone());
    let events = JsonEvents::default();

    let finished = match cli.command {
        CliCommand::Login {
            method,
            login,
            password,
        } => {
            let mut screenlet =
                LoginScreenlet::from_config(runner, &config).with_delegate(events.clone());
            if let Some(method) = method {
                let Some(method) = AuthMethod::parse(&method) else {
                    bail!("Unknown auth method '{}'", method);
                };
                screenlet.set_method(method);
            }
            if let (Some(login), Some(password)) = (login, password) {
                screenlet.set_credentials(login, password);
            }
            run_screenlet(&runtime, screenlet, LoginScreenlet::login)
        }
        CliCommand::LoadForm { structure_id } => {
            if let Some(structure_id) = structure_id {
                config.form.structure_id = structure_id;
            }
            let screenlet = FormScreenlet::new(runner, FormSettings::from_config(&config))
                .with_delegate(events.clone());
            run_screenlet(&runtime, screenlet, FormScreenlet::load_form)
        }
        CliCommand::LoadRecord {
            record_id,
            structure_id,
        } => {
            if let Some(record_id) = record_id {
                config.form.record_id = record_id;
            }
            if let Some(structure_id) = structure_id {
                config.form.structure_id = structure_id;
            }
            let screenlet = FormScreenlet::new(runner, FormSettings::from_config(&config))
                .with_delegate(events.clone());
            run_screenlet(&runtime, screenlet, FormScreenlet::load_record)
        }
        CliCommand::ListPage {
            page,
            record_set_id,
        } => {
            if let Some(record_set_id) = record_set_id {
                config.list.record_set_id = record_set_id;
            }
            let delegate = JsonListEvents {
                events: events.clone(),
                label_fields: config.list.label_fields.clone(),
            };
            let screenlet = ListScreenlet::new(
                runner,
                DdlListSource::from_config(&config),
                ListSettings::from_config(&config),
            )
            .with_delegate(delegate);
            run_screenlet(&runtime, screenlet, move |screenlet| screenlet.load_page(page))
        }
    };

    if !finished {
        bail!("Screenlet stopped before finishing");
    }
    if events.failed() {
        bail!("Operation failed");
    }
    Ok(())
}
