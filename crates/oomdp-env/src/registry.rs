//! Environment registry for creating Taxi variants by name

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use oomdp_core::{Environment, OomdpError, Result};

use crate::layout::SMALL_LAYOUT;
use crate::taxi::{TaxiAction, TaxiConfig, TaxiEnv};

/// A boxed environment over the Taxi action set
pub type BoxedTaxiEnv = Box<dyn Environment<Action = TaxiAction> + Send>;

type EnvConstructor = Box<dyn Fn(TaxiConfig) -> Result<BoxedTaxiEnv> + Send + Sync>;

lazy_static::lazy_static! {
    static ref REGISTRY: Arc<Mutex<EnvRegistry>> = Arc::new(Mutex::new(EnvRegistry::with_builtins()));
}

/// Global environment registry
pub struct EnvRegistry {
    envs: BTreeMap<String, EnvConstructor>,
}

impl EnvRegistry {
    fn with_builtins() -> Self {
        let mut registry = Self {
            envs: BTreeMap::new(),
        };
        registry.register("taxi", |config| {
            Ok(Box::new(TaxiEnv::new(&config)?) as BoxedTaxiEnv)
        });
        registry.register("taxi-small", |mut config| {
            config.layout.get_or_insert_with(|| SMALL_LAYOUT.to_string());
            Ok(Box::new(TaxiEnv::new(&config)?) as BoxedTaxiEnv)
        });
        registry
    }

    /// Register an environment, replacing any previous one of that name
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(TaxiConfig) -> Result<BoxedTaxiEnv> + Send + Sync + 'static,
    {
        self.envs.insert(name.into(), Box::new(constructor));
    }

    /// Create an environment by name
    pub fn make(&self, name: &str, config: TaxiConfig) -> Result<BoxedTaxiEnv> {
        self.envs
            .get(name)
            .ok_or_else(|| OomdpError::Environment(format!("Unknown environment: {name}")))
            .and_then(|constructor| constructor(config))
    }

    /// Registered names, sorted
    pub fn list(&self) -> Vec<String> {
        self.envs.keys().cloned().collect()
    }
}

fn registry() -> Result<MutexGuard<'static, EnvRegistry>> {
    REGISTRY
        .lock()
        .map_err(|_| OomdpError::Environment("environment registry lock poisoned".into()))
}

/// Register an environment globally
pub fn register_env<F>(name: impl Into<String>, constructor: F) -> Result<()>
where
    F: Fn(TaxiConfig) -> Result<BoxedTaxiEnv> + Send + Sync + 'static,
{
    registry()?.register(name, constructor);
    Ok(())
}

/// Create an environment by name
pub fn make_env(name: &str, config: TaxiConfig) -> Result<BoxedTaxiEnv> {
    registry()?.make(name, config)
}

/// List all registered environments
pub fn list_envs() -> Result<Vec<String>> {
    Ok(registry()?.list())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wrappers::TimeLimit;

    #[test]
    fn test_builtins_registered() {
        let names = list_envs().unwrap();
        assert!(names.contains(&"taxi".to_string()));
        assert!(names.contains(&"taxi-small".to_string()));
    }

    #[test]
    fn test_make_small() {
        let mut env = make_env("taxi-small", TaxiConfig::default()).unwrap();
        let state = env.reset().unwrap();
        // taxi, passenger, destination and 12 boundary plus 2 internal wall faces
        assert_eq!(state.objects().len(), 3 + 14);
    }

    #[test]
    fn test_unknown_name() {
        assert!(matches!(
            make_env("helicopter", TaxiConfig::default()),
            Err(OomdpError::Environment(_))
        ));
    }

    #[test]
    fn test_register_custom() {
        register_env("taxi-short", |config| {
            Ok(Box::new(TimeLimit::new(TaxiEnv::new(&config)?, 5)) as BoxedTaxiEnv)
        })
        .unwrap();
        let mut env = make_env("taxi-short", TaxiConfig::default()).unwrap();
        env.reset().unwrap();
        let mut last = None;
        for _ in 0..5 {
            last = Some(env.step(TaxiAction::North).unwrap());
        }
        assert!(last.is_some_and(|s| s.truncated));
    }
}
