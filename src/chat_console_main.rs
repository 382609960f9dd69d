use anyhow::Context;
use tokio::io::BufReader;

use ragchat_backend::console::ChatConsole;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    ragchat_backend::core::logging::init_console();

    let console = ChatConsole::from_env()?;
    tracing::debug!("Sending questions to {}", console.api_url());

    console
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
        .context("Console I/O failed")?;
    Ok(())
}
