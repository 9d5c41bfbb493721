//! Serve command - run the HTTP service

use crate::cli::args::ServeArgs;
use crate::config::Config;
use crate::error::LogprepResult;
use crate::http;
use crate::service::EncodeService;
use crate::ui::{self, UiContext};
use std::sync::Arc;

/// Execute the serve command
pub async fn execute(args: ServeArgs, config: &Config) -> LogprepResult<()> {
    let ctx = UiContext::detect();
    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());

    ui::intro(&ctx, "logprep");
    ui::key_value(&ctx, "bind", &bind);
    ui::key_value(&ctx, "data dir", &config.storage.data_dir.display().to_string());

    let service = Arc::new(EncodeService::from_config(config));
    http::serve(service, &bind).await
}
