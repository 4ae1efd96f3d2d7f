use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use rhai::{Engine, Scope};

use super::api;
use crate::options::OptionService;

/// Runs Rhai init scripts against a shared option service
pub struct ConfigEngine {
    engine: Engine,
    options: Arc<RwLock<OptionService>>,
}

impl ConfigEngine {
    pub fn new(options: Arc<RwLock<OptionService>>) -> Self {
        let engine = Self::create_engine(Arc::clone(&options));

        Self { engine, options }
    }

    fn create_engine(options: Arc<RwLock<OptionService>>) -> Engine {
        let mut engine = Engine::new();

        // Limit script execution for safety
        engine.set_max_expr_depths(64, 64);
        engine.set_max_operations(100_000);

        let mut lark_module = rhai::Module::new();
        lark_module.set_sub_module("options", api::create_module(options));
        engine.register_static_module("lark", lark_module.into());

        engine.register_fn("print", |msg: &str| {
            tracing::info!(target: "lark_ex::config", "{msg}");
        });

        engine
    }

    /// Load and execute a config file
    pub fn load_file(&mut self, path: &Path) -> Result<(), String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        self.eval(&content)?;
        tracing::info!(path = %path.display(), "config loaded");
        Ok(())
    }

    /// Evaluate a Rhai script string
    pub fn eval(&mut self, script: &str) -> Result<(), String> {
        let ast = self
            .engine
            .compile(script)
            .map_err(|e| format!("Config parse error: {}", e))?;

        let mut scope = Scope::new();
        self.engine
            .run_ast_with_scope(&mut scope, &ast)
            .map_err(|e| format!("Config error: {}", e))?;
        Ok(())
    }

    /// The option service scripts write to
    pub fn options(&self) -> Arc<RwLock<OptionService>> {
        Arc::clone(&self.options)
    }

    /// Get the config directory path
    /// Uses ~/.config/lark/ on all platforms for consistency
    pub fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("lark"))
    }

    /// Get the default config file path
    pub fn config_file() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("init.rhai"))
    }

    /// Load the default config file if it exists
    pub fn load_default(&mut self) -> Result<(), String> {
        if let Some(config_file) = Self::config_file() {
            if config_file.exists() {
                return self.load_file(&config_file);
            }
        }
        Ok(()) // No config file is fine
    }
}
