//! Minimal chat bot. Run it, then type `/connect localhost:8765` in a world
//! with cheats enabled.

use bedrock_ws::{events, Server};
use tracing::info;

#[tokio::main]
async fn main() -> bedrock_ws::Result<()> {
    tracing_subscriber::fmt::init();

    let app = Server::new("chat");

    app.on(events::START_CLIENT, |ctx| async move {
        info!(client = %ctx.session().id(), "game client started");
        Ok(())
    });

    app.on(events::PLAYER_MESSAGE, |ctx| async move {
        if let (Some(sender), Some(message)) = (ctx.event().sender(), ctx.event().message()) {
            info!(%sender, %message, "chat");
        }
        let response = ctx.run_command("title @a actionbar hey!").await?;
        info!(code = response.code, "command done");
        Ok(())
    });

    app.run().await
}
