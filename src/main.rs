use colored::Colorize;
use provision_console::output::print_console;
use provision_console::{connect, Config};
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Do as little as possible in main.rs as it can't contain any tests
    log4rs::init_file("log4rs.yml", Default::default())?;
    dotenv::dotenv().ok();
    //
    log::info!("#Start main()");

    let config = Config::from_env()?;
    let mut console = connect(&config)?;

    match config.credential.clone() {
        Some(credential) => {
            if let Err(e) = console.login(credential).await {
                println!("#{}# {e}", "LOGIN".on_red());
            }
        }
        None => log::warn!("no PROVISION_TOKEN or PROVISION_USER set, requests are anonymous"),
    }

    for e in console.refresh().await {
        println!("#{}# {e}", "ERROR".on_red());
    }
    print_console(&console);

    if let Some(token) = console.session().stored_token() {
        log::info!("session token available for PROVISION_TOKEN ({} chars)", token.len());
    }
    log::info!("#End main()");
    Ok(())
}
