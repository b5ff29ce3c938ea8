use crate::cmd::{gateway, load_config};
use inkdesk_server::state::AppState;
use std::path::Path;

pub fn run(root: &Path, port: u16, no_open: bool, offline: bool) -> anyhow::Result<()> {
    let config = load_config(root)?;
    let gateway = gateway(&config, offline)?;
    let studio = config.studio.name.clone();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let state = AppState::new(&config, gateway);
        let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
        let actual_port = listener.local_addr()?.port();

        println!("inkdesk for '{studio}' → http://localhost:{actual_port}");

        tokio::select! {
            res = inkdesk_server::serve_on(state, listener, !no_open) => res,
            _ = tokio::signal::ctrl_c() => Ok(()),
        }
    })
}
