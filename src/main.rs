#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = coursecert::run().await {
        eprintln!("coursecert fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
