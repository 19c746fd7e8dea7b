use pgshift_cli::CliError;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<CliError>> {
    pgshift_cli::main().await.map_err(Box::new)
}
