use crate::config::{OutputFormat, RunConfig};
use anyhow::Result;
use rosrl_core::{
    agents::DdpgAgent,
    cluster::{Cluster, LocalCluster},
    ddpg::{Ddpg, DefaultDdpgHooks, StopSignal},
    env::Env,
    logger::{CsvOutput, HumanOutput, TabularLogger},
};

pub type DefaultDdpg<E, A, C> = Ddpg<E, A, C, TabularLogger, DefaultDdpgHooks>;

#[derive(Default)]
pub struct DdpgBuilder {
    pub config: RunConfig,
    pub stop: StopSignal,
}

impl DdpgBuilder {
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            stop: StopSignal::new(),
        }
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Only the leader gets outputs and a log directory, followers reduce but never write.
    fn logger(&self, is_leader: bool) -> Result<TabularLogger> {
        if !is_leader {
            return Ok(TabularLogger::new(None));
        }
        let mut logger = TabularLogger::new(self.config.log_dir.clone());
        for format in &self.config.output_formats {
            logger = match (format, &self.config.log_dir) {
                (OutputFormat::Stdout, _) => logger.with_output(HumanOutput::stdout()),
                (OutputFormat::Csv, Some(dir)) => logger.with_output(CsvOutput::new(dir)?),
                (OutputFormat::Csv, None) => {
                    tracing::warn!("csv output requested without a log dir, skipping it");
                    logger
                }
            };
        }
        Ok(logger)
    }

    pub fn build<E: Env, A: DdpgAgent, C: Cluster>(
        &self,
        env: E,
        eval_env: Option<E>,
        agent: A,
        cluster: C,
    ) -> Result<DefaultDdpg<E, A, C>> {
        self.config.ddpg.validate()?;
        let sink = self.logger(cluster.is_leader())?;
        Ok(Ddpg {
            config: self.config.ddpg.clone(),
            env,
            eval_env,
            agent,
            cluster,
            sink,
            hooks: DefaultDdpgHooks::new(self.stop.clone()),
        })
    }

    pub fn build_local<E: Env, A: DdpgAgent>(
        &self,
        env: E,
        eval_env: Option<E>,
        agent: A,
    ) -> Result<DefaultDdpg<E, A, LocalCluster>> {
        self.build(env, eval_env, agent, LocalCluster)
    }
}
