use crate::cli::main_types::{ConfigCommands, NciCommands, OpenArgs, RunArgs, ViewArgs};
use cli3_core::api::models::{ParamValues, Query};
use cli3_core::core::session::Session;
use cli3_core::core::table::SortOrder;
use cli3_core::core::window::{Capabilities, Capability, DocumentWindow};
use cli3_core::core::workspace::{Workspace, WorkspaceChange};
use cli3_core::display::{OutputFormat, TableDisplay, records_to_csv, records_to_json};
use cli3_core::error::{AppError, CliError, WindowError, codes};
use cli3_core::storage::config::{Config, ENV_PASSWORD};
use cli3_core::utils::validation::parse_assignment;
use std::path::PathBuf;
use std::sync::Arc;

fn invalid(message: String) -> AppError {
    AppError::Cli(CliError::InvalidArguments(message))
}

pub struct ConfigHandler {
    file_config: Config,
    path: Option<PathBuf>,
}

impl ConfigHandler {
    pub fn new(file_config: Config, path: Option<PathBuf>) -> Self {
        Self { file_config, path }
    }

    pub fn handle(self, command: ConfigCommands, effective: &Config) -> Result<(), AppError> {
        match command {
            ConfigCommands::Show => {
                println!("Current Configuration:");
                println!("=====================");
                println!("Server:   {}", effective.server);
                println!("Port:     {}", effective.port);
                println!("Schema:   {}", effective.schema);
                println!(
                    "Username: {}",
                    effective.username.as_deref().unwrap_or("(not set)")
                );
                println!("Timeout:  {}s", effective.timeout_seconds);
                match effective.resolve_cache_dir() {
                    Ok(dir) => println!("Cache:    {}", dir.display()),
                    Err(e) => println!("Cache:    unavailable ({})", e),
                }
                println!("URL:      {}", effective.base_url());
                if Config::password_from_env().is_some() {
                    println!("Password: set ({})", ENV_PASSWORD);
                } else {
                    println!("Password: prompted at login");
                }
                Ok(())
            }
            ConfigCommands::Set { key, value } => {
                let mut config = self.file_config;
                config.set(&key, &value)?;
                config.save(self.path)?;
                println!("Set {} to '{}'", key, value);
                Ok(())
            }
        }
    }
}

pub struct QueryHandler {
    session: Arc<Session>,
    display: TableDisplay,
}

impl QueryHandler {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            display: TableDisplay::new(),
        }
    }

    pub async fn tree(&self) -> Result<(), AppError> {
        let tree = self.session.fetch_tree().await?;
        println!("{}", self.display.render_tree(&tree));
        Ok(())
    }

    pub async fn describe(&self, id: &str) -> Result<(), AppError> {
        let query = self.session.fetch_query(id).await?;
        print!("{}", self.display.render_query(&query));
        Ok(())
    }

    /// `-p NAME=VALUE` arguments, checked against the query's input params.
    fn overrides(query: &Query, params: &[String]) -> Result<ParamValues, AppError> {
        let mut overrides = ParamValues::new();
        for arg in params {
            let (name, value) = parse_assignment(arg)?;
            let param = query
                .in_params()
                .find(|p| p.name.eq_ignore_ascii_case(&name))
                .ok_or_else(|| {
                    let known: Vec<&str> = query.in_params().map(|p| p.name.as_str()).collect();
                    invalid(format!(
                        "Query {} has no input parameter '{}' (known: {})",
                        query.id,
                        name,
                        if known.is_empty() {
                            "none".to_string()
                        } else {
                            known.join(", ")
                        }
                    ))
                })?;
            overrides.insert(param.name.clone(), value);
        }
        Ok(overrides)
    }

    pub async fn run(&self, args: RunArgs) -> Result<(), AppError> {
        let query = self.session.fetch_query(&args.id).await?;
        let overrides = Self::overrides(&query, &args.params)?;

        let mut workspace = Workspace::new(Arc::clone(&self.session));
        let request = self.session.send_query(query, &overrides);
        log::info!("Sent {}", request.title());

        let change = workspace.wait_for(request.id()).await;
        let index = match change {
            Some(WorkspaceChange::Opened { index, .. }) => index,
            Some(WorkspaceChange::RequestFailed { code, message, .. }) => {
                return Err(WindowError::RequestFailed {
                    id: request.id().to_string(),
                    code,
                    message,
                }
                .into());
            }
            Some(WorkspaceChange::OpenFailed { message, .. }) => {
                return Err(WindowError::RequestFailed {
                    id: request.id().to_string(),
                    code: codes::BAD_PAYLOAD,
                    message,
                }
                .into());
            }
            _ => return Err(WindowError::Unbound.into()),
        };
        if log::log_enabled!(log::Level::Info) {
            log::info!("Requests:\n{}", self.display.render_log(workspace.log()));
        }

        let window = workspace.window_mut(index).ok_or(WindowError::Unbound)?;
        if let Some(path) = &args.save {
            window.save(path)?;
            println!("Saved to {}", path.display());
        }
        self.present(window, &args.view)
    }

    pub fn open(&self, args: OpenArgs) -> Result<(), AppError> {
        let mut window = DocumentWindow::load(&args.file, Arc::clone(&self.session))?;
        self.present(&mut window, &args.view)
    }

    /// Applies filters and sort, then prints in the requested format.
    fn present(&self, window: &mut DocumentWindow, view: &ViewArgs) -> Result<(), AppError> {
        let format: OutputFormat = view.format.parse().map_err(invalid)?;

        for filter in &view.filter {
            let (name, text) = parse_assignment(filter)?;
            let model = window.table().ok_or_else(|| unsupported(window, Capability::Filter))?;
            let col = view_column(window, &name)?;
            let value = model.parse_filter_value(col, &text)?;
            window.set_filter(col, value)?;
        }

        if let Some(sort) = &view.sort {
            let (name, order) = parse_sort(sort)?;
            if window.table().is_none() {
                return Err(unsupported(window, Capability::Filter));
            }
            let col = view_column(window, &name)?;
            window.sort(col, order)?;
        }

        let output = match format {
            OutputFormat::Table => {
                let display = TableDisplay::new().with_colors(!view.no_color);
                display.render_document(window, view.limit)
            }
            OutputFormat::Json | OutputFormat::Csv => {
                let model = window
                    .table()
                    .filter(|_| window.supports(Capability::Export))
                    .ok_or_else(|| unsupported(window, Capability::Export))?;
                let mut records = model.visible_records();
                if let Some(limit) = view.limit {
                    records.rows.truncate(limit);
                }
                if format == OutputFormat::Json {
                    records_to_json(&records)?
                } else {
                    records_to_csv(&records)?
                }
            }
        };
        println!("{}", output.trim_end());
        Ok(())
    }
}

fn unsupported(window: &DocumentWindow, capability: Capability) -> AppError {
    WindowError::Unsupported {
        kind: String::from(window.kind()).to_lowercase(),
        capability: capability.as_str().to_string(),
    }
    .into()
}

fn view_column(window: &DocumentWindow, name: &str) -> Result<usize, AppError> {
    window
        .table()
        .and_then(|model| model.column_by_name(name))
        .ok_or_else(|| invalid(format!("No visible column named '{}'", name)))
}

/// `COLUMN` or `COLUMN:asc` / `COLUMN:desc`.
fn parse_sort(arg: &str) -> Result<(String, SortOrder), AppError> {
    let (name, order) = match arg.rsplit_once(':') {
        Some((name, suffix)) => {
            let order = match suffix.to_lowercase().as_str() {
                "asc" => SortOrder::Ascending,
                "desc" => SortOrder::Descending,
                _ => return Err(invalid(format!("Unknown sort order '{}' in '{}'", suffix, arg))),
            };
            (name, order)
        }
        None => (arg, SortOrder::Ascending),
    };
    if name.trim().is_empty() {
        return Err(invalid(format!("Missing column in sort '{}'", arg)));
    }
    Ok((name.trim().to_string(), order))
}

pub struct NciHandler {
    session: Arc<Session>,
    display: TableDisplay,
}

impl NciHandler {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            display: TableDisplay::new(),
        }
    }

    pub fn handle(&self, command: NciCommands) -> Result<(), AppError> {
        let reference = self.session.reference();
        match command {
            NciCommands::List => {
                let rows: Vec<Vec<String>> = reference
                    .table_names()
                    .into_iter()
                    .filter_map(|name| reference.nci(name))
                    .map(|table| {
                        vec![
                            table.name().to_string(),
                            table.columns().join(", "),
                            table.len().to_string(),
                        ]
                    })
                    .collect();
                if rows.is_empty() {
                    println!("No reference tables.");
                } else {
                    println!(
                        "{}",
                        self.display
                            .render_simple_table(&["Name", "Columns", "Rows"], &rows)
                    );
                }
                Ok(())
            }
            NciCommands::Show {
                name,
                search,
                limit,
            } => {
                let table = reference
                    .nci(&name)
                    .ok_or_else(|| invalid(format!("Unknown reference table '{}'", name)))?;
                let rows = match &search {
                    Some(text) => table.search(text, limit),
                    None => table.rows().iter().take(limit).map(Vec::as_slice).collect(),
                };
                println!("{}", self.display.render_nci(table, &rows));
                Ok(())
            }
        }
    }
}
