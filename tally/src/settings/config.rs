#![allow(dead_code)]

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

use tally_core::settings::{
    api_server::ApiServer, ingest::IngestSettings, sampling::SamplingSettings,
    scheduler_interval::SchedulerInterval,
};
use tally_core::tenants::Tenant;

#[derive(Debug, Deserialize, Clone)]
#[allow(unused)]
pub struct Scheduler {
    pub counter_cleanup: SchedulerInterval,
}

impl Default for Scheduler {
    fn default() -> Self {
        Scheduler {
            counter_cleanup: SchedulerInterval::Hours(1),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[allow(unused)]
pub struct Settings {
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub api: ApiServer,
    #[serde(default)]
    pub ingest: IngestSettings,
    #[serde(default)]
    pub sampling: SamplingSettings,
    #[serde(default)]
    pub scheduler: Scheduler,
    #[serde(default)]
    pub tenants: Vec<Tenant>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            debug: false,
            api: ApiServer::default(),
            ingest: IngestSettings::default(),
            sampling: SamplingSettings::default(),
            scheduler: Scheduler::default(),
            tenants: vec![],
        }
    }
}

impl Settings {
    pub fn get_environment() -> Environment {
        Environment::default()
            .prefix("TALLY")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }

    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("TALLY_RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("api.bind_address", "0.0.0.0:8080")?
            .set_default("ingest.default_source", "web")?
            // Start off by merging in the "default" configuration file
            .add_source(File::with_name("config/default"))
            // Add in the current run mode file, e.g. config/development.yaml
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Add in a local configuration file
            .add_source(File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of TALLY)
            .add_source(Self::get_environment());

        let config = builder.build()?;
        config.try_deserialize()
    }
}
