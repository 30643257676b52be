//! `app:getInfo` and `system:getInfo`.

use crate::api::{AppGetInfo, AppInfo, SystemGetInfo, SystemInfo};
use crate::error::Result;
use crate::handler::InvokeContext;

pub async fn app_info(_: AppGetInfo, ctx: InvokeContext) -> Result<AppInfo> {
    let config = ctx.host()?.config();
    Ok(AppInfo {
        name: config.app_name.clone(),
        version: config.app_version.clone(),
        environment: config.environment,
        dev_server_url: config.dev_server_url.clone(),
        open_devtools: config.devtools_enabled(),
    })
}

pub async fn system_info(_: SystemGetInfo, _ctx: InvokeContext) -> Result<SystemInfo> {
    Ok(SystemInfo {
        platform: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        family: std::env::consts::FAMILY.to_string(),
        cpus: std::thread::available_parallelism().map_or(1, |n| n.get()),
        pid: std::process::id(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_system_info() {
        let info = system_info(SystemGetInfo {}, InvokeContext::new("system:getInfo", 1, 1))
            .await
            .unwrap();
        assert_eq!(info.platform, std::env::consts::OS);
        assert!(info.cpus >= 1);
        assert_eq!(info.pid, std::process::id());
    }

    #[tokio::test]
    async fn test_app_info_needs_host() {
        let result = app_info(AppGetInfo {}, InvokeContext::new("app:getInfo", 1, 1)).await;
        assert!(result.is_err());
    }
}
