mod api;
mod app;
mod catalog;
mod config;
mod session;
mod ui;

use anyhow::Result;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1).peekable();
    let mut server_override = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--server" | "-s" => {
                if let Some(url) = args.next() {
                    server_override = Some(url);
                } else {
                    eprintln!("--server requires a URL");
                }
            }
            "--help" | "-h" => {
                println!("gogshelf");
                println!("  --server <url>   gogrepoc backend to talk to (default from config)");
                return Ok(());
            }
            _ => {}
        }
    }

    let mut app = app::App::initialize(server_override)?;
    ui::run(&mut app)
}
