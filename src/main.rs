use clap::Parser;
use ocean_series::cli::{run, Cli};
use ocean_series::ProcessingError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("Error: {:#}", err);
        let code = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<ProcessingError>())
            .map(ProcessingError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}
