//! Status — readiness of the dev, infra, build and deploy stages.

use super::Core;
use crate::directory::{AppLookup, Backend, Build, Deploy, Dev, Infra, InfraLookup};
use crate::error::{Error, Result};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

/// How long to wait before telling the user status may be slow.
pub const STATUS_NOTICE_DELAY: Duration = Duration::from_millis(150);

/// Directory records describing where the application stands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusReport {
    pub dev: Option<Dev>,
    pub infra: Option<Infra>,
    pub build: Option<Build>,
    pub deploy: Option<Deploy>,
}

impl StatusReport {
    fn gather(dir: &dyn Backend, app: &AppLookup, infra: &InfraLookup) -> Result<Self> {
        Ok(Self {
            dev: dir.get_dev(app)?,
            infra: dir.get_infra(infra)?,
            build: dir.get_build(app)?,
            deploy: dir.get_deploy(app)?,
        })
    }

    pub fn dev_status(&self) -> &'static str {
        match &self.dev {
            Some(d) if d.is_ready() => "CREATED",
            _ => "NOT CREATED",
        }
    }

    pub fn infra_status(&self) -> &'static str {
        match &self.infra {
            Some(i) if i.is_ready() => "READY",
            Some(i) if i.is_partial() => "PARTIAL",
            _ => "NOT CREATED",
        }
    }

    pub fn build_status(&self) -> &'static str {
        match self.build {
            Some(_) => "BUILD READY",
            None => "NOT BUILT",
        }
    }

    pub fn deploy_status(&self) -> &'static str {
        match &self.deploy {
            Some(d) if d.is_deployed() => "DEPLOYED",
            Some(d) if d.is_failed() => "DEPLOY FAILED",
            _ => "NOT DEPLOYED",
        }
    }
}

impl Core {
    /// Show the status of every stage of the root application and return
    /// what was found.
    pub fn status(&self) -> Result<StatusReport> {
        let infra = self
            .appfile
            .active_infrastructure()
            .ok_or_else(|| Error::NoInfrastructure {
                name: self.appfile.project.infrastructure.clone(),
            })?;
        let app_lookup = AppLookup::for_file(&self.appfile)?;
        let infra_lookup = InfraLookup {
            name: infra.name.clone(),
        };

        let report = std::thread::scope(|s| {
            let (tx, rx) = mpsc::sync_channel(1);
            let dir = self.dir.as_ref();
            let (app_lookup, infra_lookup) = (&app_lookup, &infra_lookup);
            s.spawn(move || {
                let _ = tx.send(StatusReport::gather(dir, app_lookup, infra_lookup));
            });

            match rx.recv_timeout(STATUS_NOTICE_DELAY) {
                Ok(report) => report,
                Err(RecvTimeoutError::Timeout) => {
                    self.ui.header("Loading status...");
                    self.ui.message(
                        "Depending on your configured directory backend, this may require\n\
                         network operations and can take some time. On a typical broadband\n\
                         connection, this shouldn't take more than a few seconds.",
                    );
                    rx.recv().unwrap_or_else(|_| Err(gather_stopped()))
                }
                Err(RecvTimeoutError::Disconnected) => Err(gather_stopped()),
            }
        })?;

        self.ui.header("App Info");
        self.ui.message(&format!(
            "Application:    {} ({})",
            self.appfile.application.name, self.appfile.application.app_type
        ));
        self.ui
            .message(&format!("Project:        {}", self.appfile.project.name));
        self.ui.message(&format!(
            "Infrastructure: {} ({})",
            infra.infra_type, infra.flavor
        ));

        self.ui.header("Component Status");
        self.ui
            .message(&format!("Dev environment: {}", report.dev_status()));
        self.ui
            .message(&format!("Infra:           {}", report.infra_status()));
        self.ui
            .message(&format!("Build:           {}", report.build_status()));
        self.ui
            .message(&format!("Deploy:          {}", report.deploy_status()));

        Ok(report)
    }
}

fn gather_stopped() -> Error {
    Error::Directory("status gathering stopped before reporting".to_string())
}
