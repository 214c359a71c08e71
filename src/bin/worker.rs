#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = coursecert::run_worker().await {
        eprintln!("coursecert-worker fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
