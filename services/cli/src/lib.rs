mod cli;
mod demo;
mod render;

use admissions::error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}
