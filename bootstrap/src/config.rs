#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `host:port` of the Lambda Runtime API.
    pub runtime_api: String,
    /// Registered source this function serves.
    pub source_name: String,
    pub json_logs: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let runtime_api = lookup("AWS_LAMBDA_RUNTIME_API")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("missing AWS_LAMBDA_RUNTIME_API"))?;

        let source_name = lookup("LEK_SOURCE_NAME")
            .or_else(|| lookup("_HANDLER"))
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("missing LEK_SOURCE_NAME and _HANDLER"))?;

        let json_logs = lookup("AWS_LAMBDA_LOG_FORMAT")
            .is_some_and(|v| v.eq_ignore_ascii_case("json"));

        Ok(Self {
            runtime_api,
            source_name,
            json_logs,
        })
    }

    pub fn runtime_base_url(&self) -> String {
        format!("http://{}", self.runtime_api)
    }
}
