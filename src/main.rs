use anyhow::Result;
use workdeck::app::App;
use workdeck::config::Config;
use workdeck::terminal;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    config.validate()?;

    let mut app = App::new(config);
    app.initialize().await;

    let mut term = terminal::setup()?;
    let result = app.run(&mut term).await;
    terminal::restore()?;
    result
}
