use serde::Deserialize;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are StudyBuddy, an expert AI tutor designed to help students prepare for exams and understand academic concepts. Your goal is to provide clear, accurate, and helpful explanations.

Guidelines:
- Explain concepts in a clear, step-by-step manner
- Use examples and analogies to make complex topics easier to understand
- Be encouraging and supportive
- If a question is ambiguous, ask for clarification
- For math and science questions, show your work and explain each step
- Keep responses concise but thorough - typically 2-4 paragraphs
- If you don't know something, be honest about it
- Always encourage further learning and curiosity";

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally reachable base URL, used in confirmation links. Falls back
    /// to http://{host}:{port} when unset.
    pub public_url: Option<String>,
}

impl ServerConfig {
    pub fn base_url(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub api_keys: Vec<String>,
    #[serde(default = "default_token_expiry_hours")]
    pub token_expiry_hours: u32,
}

fn default_token_expiry_hours() -> u32 {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: default_system_prompt(),
        }
    }
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub llm: LlmConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    pub email: Option<EmailConfig>,
}

impl AppConfig {
    pub fn load(path: &str) -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();

        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("STUDYBUDDY").separator("__"))
            .build()?;

        let mut app_config: AppConfig = settings.try_deserialize()?;

        // Expand environment variables if present like ${GATEWAY_API_KEY}
        app_config.server.host = expand_env(&app_config.server.host);
        app_config.database.path = expand_env(&app_config.database.path);
        app_config.llm.api_key = expand_env(&app_config.llm.api_key);

        if let Some(ref mut email) = app_config.email {
            email.api_key = expand_env(&email.api_key);
        }

        Ok(app_config)
    }
}

fn expand_env(val: &str) -> String {
    if val.starts_with("${") && val.ends_with('}') {
        let var_name = &val[2..val.len() - 1];
        std::env::var(var_name).unwrap_or_else(|_| "".to_string())
    } else {
        val.to_string()
    }
}
