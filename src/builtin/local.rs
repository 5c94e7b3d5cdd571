//! The `local` infrastructure: the machine rigging runs on.

use crate::context::Credentials;
use crate::directory::InfraLookup;
use crate::error::ProviderResult;
use crate::fsutil;
use crate::infrastructure::{CompileResult, Context, Infrastructure};
use crate::plan::{Plan, Task};
use crate::plugin::Provider;
use serde_json::json;
use std::collections::BTreeMap;

/// Infrastructure type name.
pub const INFRA_TYPE: &str = "local";

/// The only flavor.
pub const FLAVOR: &str = "default";

#[derive(Debug, Default)]
pub struct LocalInfra;

impl Provider for LocalInfra {}

impl Infrastructure for LocalInfra {
    fn creds(&self, _ctx: &Context) -> ProviderResult<Credentials> {
        let user = std::env::var("USER").unwrap_or_default();
        Ok(BTreeMap::from([("user".to_string(), user)]))
    }

    fn compile(&self, ctx: &Context) -> ProviderResult<CompileResult> {
        let foundations: Vec<&str> = ctx
            .infra
            .foundations
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        let summary = json!({
            "name": ctx.infra.name,
            "type": ctx.infra.infra_type,
            "flavor": ctx.infra.flavor,
            "foundations": foundations,
        });
        fsutil::write_json_atomic(&ctx.dir.join("infra.json"), &summary)?;

        Ok(CompileResult {
            extra: BTreeMap::from([(
                "dir".to_string(),
                json!(ctx.dir.display().to_string()),
            )]),
        })
    }

    fn plan(&self, ctx: &Context) -> ProviderResult<Vec<Plan>> {
        let lookup = InfraLookup {
            name: ctx.infra.name.clone(),
        };
        let ready = ctx
            .shared
            .directory
            .get_infra(&lookup)?
            .is_some_and(|i| i.is_ready());
        if ready {
            return Ok(Vec::new());
        }

        Ok(vec![Plan {
            description: format!("Prepare local infrastructure '{}'", ctx.infra.name),
            tasks: vec![Task {
                task_type: "local.ready".to_string(),
                description: "Mark this machine ready after the first deploy".to_string(),
                args: BTreeMap::from([("name".to_string(), ctx.infra.name.clone())]),
            }],
        }])
    }
}
