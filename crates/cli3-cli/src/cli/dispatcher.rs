use crate::cli::command_handlers::{ConfigHandler, NciHandler, QueryHandler};
use crate::cli::main_types::{Cli, Commands};
use cli3_core::core::session::Session;
use cli3_core::error::{AppError, CliError};
use cli3_core::storage::config::{Config, ENV_PASSWORD};
use std::path::PathBuf;
use std::sync::Arc;

pub struct Dispatcher {
    /// What the file says, for `config set`
    file_config: Config,
    /// File, then environment, then flags
    config: Config,
    config_path: Option<PathBuf>,
}

impl Dispatcher {
    pub fn new(
        file_config: Config,
        config_path: Option<PathBuf>,
        cli: &Cli,
    ) -> Result<Self, AppError> {
        let mut config = file_config.clone();
        config.apply_env()?;

        let flags = [
            ("server", &cli.server),
            ("port", &cli.port),
            ("schema", &cli.schema),
            ("username", &cli.username),
        ];
        for (key, value) in flags {
            if let Some(value) = value {
                config.set(key, value)?;
            }
        }

        Ok(Self {
            file_config,
            config,
            config_path,
        })
    }

    fn create_session(&self) -> Result<Arc<Session>, AppError> {
        log::debug!("Connecting to {}", self.config.base_url());
        Ok(Arc::new(Session::from_config(&self.config)?))
    }

    fn password(&self, username: &str) -> Result<String, AppError> {
        if let Some(password) = Config::password_from_env() {
            return Ok(password);
        }
        rpassword::prompt_password(format!("Password for {}: ", username)).map_err(|e| {
            AppError::Cli(CliError::AuthRequired {
                message: format!("Cannot read password: {}", e),
                hint: format!("Set {} when running without a terminal", ENV_PASSWORD),
            })
        })
    }

    /// Session logged in with the configured user.
    async fn login(&self) -> Result<Arc<Session>, AppError> {
        let username = self.config.username.clone().ok_or_else(|| {
            AppError::Cli(CliError::AuthRequired {
                message: "No username configured".to_string(),
                hint: "Use --username, CLI3_USERNAME or 'cli3 config set username <name>'"
                    .to_string(),
            })
        })?;
        let password = self.password(&username)?;

        let session = self.create_session()?;
        session.login(&username, &password).await?;
        Ok(session)
    }

    async fn logout(session: &Session) {
        if let Err(e) = session.logout().await {
            log::debug!("Logout failed: {}", e);
        }
    }

    pub async fn dispatch(&self, command: Commands) -> Result<(), AppError> {
        match command {
            Commands::Config { command } => {
                let handler = ConfigHandler::new(self.file_config.clone(), self.config_path.clone());
                handler.handle(command, &self.config)
            }
            Commands::Open(args) => {
                let session = if args.login {
                    self.login().await?
                } else {
                    self.create_session()?
                };
                let result = QueryHandler::new(Arc::clone(&session)).open(args);
                if session.is_logged_in() {
                    Self::logout(&session).await;
                }
                result
            }
            Commands::Tree => {
                let session = self.login().await?;
                let result = QueryHandler::new(Arc::clone(&session)).tree().await;
                Self::logout(&session).await;
                result
            }
            Commands::Describe { id } => {
                let session = self.login().await?;
                let result = QueryHandler::new(Arc::clone(&session)).describe(&id).await;
                Self::logout(&session).await;
                result
            }
            Commands::Run(args) => {
                let session = self.login().await?;
                let result = QueryHandler::new(Arc::clone(&session)).run(args).await;
                Self::logout(&session).await;
                result
            }
            Commands::Nci { command } => {
                let session = self.login().await?;
                let result = NciHandler::new(Arc::clone(&session)).handle(command);
                Self::logout(&session).await;
                result
            }
        }
    }
}
