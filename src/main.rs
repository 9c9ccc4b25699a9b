mod app;
mod config;
mod error;
mod photo;
mod scanner;
mod thumbnail;

fn main() -> iced::Result {
    env_logger::init();
    app::run()
}
