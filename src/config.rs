use envconfig::Envconfig;

#[derive(Debug, Envconfig)]
pub struct Config {
    #[envconfig(from = "DATABASE_URL")]
    pub db_url: Option<String>,
    #[envconfig(from = "PORT", default = "3001")]
    pub port: u16,
    /// Serve in-memory sample data instead of connecting to Postgres.
    #[envconfig(from = "DEMO_MODE", default = "false")]
    pub demo_mode: bool,
    #[envconfig(from = "FRONTEND_URL")]
    pub frontend_url: Option<String>,
}

impl Config {
    /// Demo mode is forced when no database is configured.
    pub fn database_url(&self) -> Option<&str> {
        if self.demo_mode {
            return None;
        }
        self.db_url.as_deref().filter(|url| !url.is_empty())
    }

    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins = vec![
            "http://localhost:3000".to_string(),
            "http://127.0.0.1:3000".to_string(),
        ];
        origins.extend(self.frontend_url.clone());
        origins
    }
}
